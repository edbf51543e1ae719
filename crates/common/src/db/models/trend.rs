//! Trend entity
//!
//! Rows are produced by the aggregation backend. Keyword is the join key;
//! there is no foreign key to papers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trends")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub keyword: String,

    /// Start-of-week anchor
    pub week_start: Date,

    pub frequency: i32,

    pub trending_score: f64,

    /// Week-over-week delta
    pub growth_rate: Option<f64>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
