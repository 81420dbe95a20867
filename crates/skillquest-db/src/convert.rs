//! Conversions between Rust domain values and `PostgreSQL` column types.
//!
//! Counters are `u32` in the domain and `INTEGER` in the schema; enums are
//! `TEXT`. Every conversion is checked and reports [`DbError::Corrupt`] or
//! [`DbError::Invalid`] instead of truncating.

use core::str::FromStr;

use skillquest_types::{Attributes, ParseEnumError};

use crate::error::DbError;

/// Convert a domain counter to an `INTEGER` bind value.
pub(crate) fn to_db_int(value: u32, field: &str) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|e| DbError::Invalid(format!("{field} out of range: {e}")))
}

/// Convert an `INTEGER` column back to a domain counter.
pub(crate) fn from_db_int(value: i32, field: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| DbError::Corrupt(format!("{field} is negative: {e}")))
}

/// Convert a `COUNT(*)` result to an unsigned count.
pub(crate) fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Convert a `SMALLINT` column to a day number.
pub(crate) fn from_db_small(value: Option<i16>, field: &str) -> Result<Option<u8>, DbError> {
    value
        .map(|v| u8::try_from(v).map_err(|e| DbError::Corrupt(format!("{field}: {e}"))))
        .transpose()
}

/// Parse a `TEXT` enum column.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, DbError>
where
    T: FromStr<Err = ParseEnumError>,
{
    value.parse().map_err(|e: ParseEnumError| DbError::Corrupt(e.to_string()))
}

/// The six attribute columns as `INTEGER` bind values, in schema order.
pub(crate) fn attributes_to_db(attributes: &Attributes) -> Result<[i32; 6], DbError> {
    Ok([
        to_db_int(attributes.programming, "programming")?,
        to_db_int(attributes.networking, "networking")?,
        to_db_int(attributes.databases, "databases")?,
        to_db_int(attributes.hardware, "hardware")?,
        to_db_int(attributes.security, "security")?,
        to_db_int(attributes.project_management, "project_management")?,
    ])
}

/// Rebuild [`Attributes`] from six `INTEGER` columns in schema order.
pub(crate) fn attributes_from_db(columns: [i32; 6]) -> Result<Attributes, DbError> {
    let [programming, networking, databases, hardware, security, project_management] = columns;
    Ok(Attributes {
        programming: from_db_int(programming, "programming")?,
        networking: from_db_int(networking, "networking")?,
        databases: from_db_int(databases, "databases")?,
        hardware: from_db_int(hardware, "hardware")?,
        security: from_db_int(security, "security")?,
        project_management: from_db_int(project_management, "project_management")?,
    })
}

#[cfg(test)]
mod tests {
    use skillquest_types::QuestStatus;

    use super::*;

    #[test]
    fn counters_round_trip_within_range() {
        assert_eq!(to_db_int(4000, "xp").ok(), Some(4000));
        assert!(to_db_int(u32::MAX, "xp").is_err());
        assert!(from_db_int(-1, "xp").is_err());
    }

    #[test]
    fn enum_columns_parse_or_report_corruption() {
        let ok: Result<QuestStatus, _> = parse_column("in_progress");
        assert_eq!(ok.ok(), Some(QuestStatus::InProgress));
        let bad: Result<QuestStatus, _> = parse_column("graded");
        assert!(matches!(bad, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn attribute_columns_keep_order() {
        let attrs = Attributes {
            programming: 1,
            networking: 2,
            databases: 3,
            hardware: 4,
            security: 5,
            project_management: 6,
        };
        let columns = attributes_to_db(&attrs).ok();
        assert_eq!(columns, Some([1, 2, 3, 4, 5, 6]));
        assert_eq!(attributes_from_db([1, 2, 3, 4, 5, 6]).ok(), Some(attrs));
    }
}
