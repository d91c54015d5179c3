//! Database queries for the workflow service

pub mod albums;
pub mod galleries;
pub mod outbox;
pub mod photos;
pub mod progress;
pub mod users;

use pfw_common::{Error, Result};
use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_opt_uuid(value: Option<String>, column: &str) -> Result<Option<Uuid>> {
    value.as_deref().map(|v| parse_uuid(v, column)).transpose()
}

pub(crate) fn parse_opt_datetime(
    value: Option<String>,
    column: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    value
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
        .map(|dt| dt.map(|dt| dt.with_timezone(&chrono::Utc)))
}
