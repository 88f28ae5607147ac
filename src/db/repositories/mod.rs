pub mod cache;
pub mod catalog_items;
pub mod catalogs;
pub mod job_items;
pub mod jobs;

use chrono::{DateTime, Utc};

use crate::core::errors::{AppError, AppResult};

pub(crate) fn parse_timestamp(value: String) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|err| AppError::Database(format!("invalid timestamp {value}: {err}")))
}

pub(crate) fn parse_optional_timestamp(value: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    value.map(parse_timestamp).transpose()
}
