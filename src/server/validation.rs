use crate::server::response::ApiError;

const MAX_FIELD_LEN: usize = 256;

/// Trims a submitted form field and rejects it if empty or oversized.
pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(ApiError::bad_request(format!(
            "{field} cannot exceed {MAX_FIELD_LEN} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(ApiError::bad_request(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(value.to_string())
}

pub fn parse_score(value: &str) -> Result<i64, ApiError> {
    let value = required("score", value)?;
    value
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("score must be an integer"))
}
