//! Shared validation helpers for inbound HTTP adapters.

use serde_json::json;

use crate::domain::{Error, IdValidationError};

/// Default page size for list endpoints.
pub(crate) const DEFAULT_PAGE_LIMIT: usize = 50;
/// Largest page a client may request.
pub(crate) const MAX_PAGE_LIMIT: usize = 200;

/// Validation reasons reported alongside the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reason {
    MissingField,
    InvalidIdentifier,
    InvalidValue,
    OutOfRange,
}

impl Reason {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidIdentifier => "invalid_identifier",
            Self::InvalidValue => "invalid_value",
            Self::OutOfRange => "out_of_range",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub(crate) fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, reason: Reason, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "reason": reason.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    field_error(
        field,
        Reason::MissingField,
        format!("missing required field: {}", field.as_str()),
    )
}

pub(crate) fn invalid_value_error(field: FieldName, message: impl Into<String>) -> Error {
    field_error(field, Reason::InvalidValue, message.into())
}

/// Parse an identifier newtype, reporting the offending field on failure.
pub(crate) fn parse_id<T>(raw: impl Into<String>, field: FieldName) -> Result<T, Error>
where
    T: TryFrom<String, Error = IdValidationError>,
{
    T::try_from(raw.into()).map_err(|err| {
        field_error(
            field,
            Reason::InvalidIdentifier,
            format!("{} is invalid: {err}", field.as_str()),
        )
    })
}

/// Resolve the `limit` query parameter.
pub(crate) fn page_limit(raw: Option<usize>) -> Result<usize, Error> {
    match raw {
        None => Ok(DEFAULT_PAGE_LIMIT),
        Some(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => Ok(limit),
        Some(_) => Err(field_error(
            FieldName::new("limit"),
            Reason::OutOfRange,
            format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
        )),
    }
}
