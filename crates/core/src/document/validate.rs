/// Document validation utilities.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0} cannot be blank")]
    BlankField(&'static str),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("query parameter `{0}` is required")]
    MissingParameter(&'static str),
}

/// Require that a field is present and holds something other than whitespace.
pub fn require_non_blank(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        None => Err(ValidationError::MissingField(field)),
        Some(v) if v.trim().is_empty() => Err(ValidationError::BlankField(field)),
        Some(_) => Ok(()),
    }
}

/// Extract a required query parameter, rejecting absent or blank values.
pub fn require_parameter(
    name: &'static str,
    value: Option<&str>,
) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingParameter(name)),
    }
}
