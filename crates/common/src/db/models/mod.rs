//! SeaORM entity models
//!
//! Database entities for PaperPulse

mod keyword;
mod paper;
mod summary;
mod trend;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use keyword::{
    Entity as KeywordEntity,
    Model as Keyword,
    ActiveModel as KeywordActiveModel,
    Column as KeywordColumn,
};

pub use summary::{
    Entity as SummaryEntity,
    Model as Summary,
    ActiveModel as SummaryActiveModel,
    Column as SummaryColumn,
};

pub use trend::{
    Entity as TrendEntity,
    Model as Trend,
    ActiveModel as TrendActiveModel,
    Column as TrendColumn,
};
