//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stable identifier assigned by the external feed
    #[sea_orm(column_type = "Text", unique)]
    pub external_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Author names in feed order, as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub authors: Json,

    /// Category codes, as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: Json,

    /// NULL when the feed carried no usable publication date
    pub published_date: Option<Date>,

    #[sea_orm(column_type = "Text")]
    pub source_url: String,

    #[sea_orm(column_type = "Text")]
    pub document_url: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::keyword::Entity")]
    Keywords,

    #[sea_orm(has_many = "super::summary::Entity")]
    Summaries,
}

impl Related<super::keyword::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Keywords.def()
    }
}

impl Related<super::summary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Summaries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
