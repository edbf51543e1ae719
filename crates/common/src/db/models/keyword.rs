//! Keyword entity
//!
//! At most one row per `(paper_id, keyword, source)`; enforced by a unique
//! index and `ON CONFLICT DO NOTHING` inserts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "keywords")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub paper_id: i32,

    #[sea_orm(column_type = "Text")]
    pub keyword: String,

    /// Provenance tag, e.g. "feed-category"
    #[sea_orm(column_type = "Text")]
    pub source: String,

    pub confidence: f64,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
