//! API handlers module

pub mod cron;
pub mod health;
pub mod ingest;
pub mod papers;
pub mod search;
pub mod stats;
pub mod trends;

use paperpulse_common::errors::AppError;
use validator::Validate;

/// Run derive-based validation, mapping failures to a 400 envelope
pub(crate) fn validate<T: Validate>(params: &T) -> Result<(), AppError> {
    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: e.field_errors().keys().next().map(|k| k.to_string()),
    })
}

fn default_limit() -> u64 {
    20
}
