pub mod auth;
pub mod health;
pub mod notes;
pub mod users;

use super::error::ApiError;
use axum::{extract::rejection::JsonRejection, Json};
use uuid::Uuid;

/// Parse a user id path segment.
pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation(format!("invalid user id: {raw}")))
}

/// Parse a note id path segment; ids are positive integers.
pub(crate) fn parse_note_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Validation(format!("invalid note id: {raw}")))
}

/// Turn a JSON extractor rejection into a JSON error body.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_ids_must_be_positive_integers() {
        assert_eq!(parse_note_id("7"), Ok(7));
        assert!(parse_note_id("0").is_err());
        assert!(parse_note_id("-3").is_err());
        assert!(parse_note_id("abc").is_err());
        assert!(parse_note_id("1.5").is_err());
    }

    #[test]
    fn user_ids_must_be_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(&id.to_string()), Ok(id));
        assert!(parse_user_id("42").is_err());
    }
}
