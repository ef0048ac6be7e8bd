//! The WebQuery response envelope and its validation.
//!
//! Every WebQuery response has the shape
//! `{"status": {"code": 0, "message": "ok"}, "body": [{...}, ...]}`.

use serde::Deserialize;

use tswatch_types::Record;

use crate::error::{is_auth_code, QueryError};

/// A decoded WebQuery response.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub body: Option<Vec<Record>>,
}

/// The `status` sub-structure of a response.
#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Check the status code and return the body list.
///
/// A missing status or code counts as success. A missing body is an empty
/// list; whether that is acceptable is up to the caller.
pub fn validate_envelope(envelope: Envelope) -> Result<Vec<Record>, QueryError> {
    let status = envelope.status.unwrap_or_default();
    let code = status.code.unwrap_or(0);

    if code != 0 {
        let message = status
            .message
            .unwrap_or_else(|| "Unknown error".to_string());
        if is_auth_code(code) {
            return Err(QueryError::Auth(message));
        }
        return Err(QueryError::Connect(format!("API error: {}", message)));
    }

    Ok(envelope.body.unwrap_or_default())
}

/// Take the first record of a body that must not be empty.
pub fn first_record(body: Vec<Record>, what: &str) -> Result<Record, QueryError> {
    body.into_iter()
        .next()
        .ok_or_else(|| QueryError::Connect(format!("Empty {} response", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn code_zero_returns_body_unchanged() {
        let body = json!([
            {"virtualserver_clientsonline": "5", "virtualserver_maxclients": 32},
            {"other": "row"}
        ]);
        let envelope = parse(json!({"status": {"code": 0, "message": "ok"}, "body": body.clone()}));

        let records = validate_envelope(envelope).unwrap();
        let expected: Vec<Record> = serde_json::from_value(body).unwrap();
        assert_eq!(records, expected);
    }

    #[test]
    fn auth_code_is_auth_regardless_of_message() {
        for message in ["invalid apikey", "", "something else entirely"] {
            let envelope = parse(json!({"status": {"code": 3329, "message": message}}));
            match validate_envelope(envelope) {
                Err(QueryError::Auth(msg)) => assert_eq!(msg, message),
                other => panic!("expected auth failure, got {:?}", other),
            }
        }
    }

    #[test]
    fn other_codes_are_connect_with_message() {
        for code in [1, 512, 1281, 2568, 3328, 3330] {
            let envelope = parse(json!({"status": {"code": code, "message": "database empty result set"}}));
            match validate_envelope(envelope) {
                Err(QueryError::Connect(msg)) => {
                    assert!(msg.contains("database empty result set"), "{}", msg)
                }
                other => panic!("expected connect failure for {}, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn missing_message_reads_unknown_error() {
        let envelope = parse(json!({"status": {"code": 1024}}));
        assert_eq!(
            validate_envelope(envelope),
            Err(QueryError::Connect("API error: Unknown error".to_string()))
        );
    }

    #[test]
    fn missing_status_is_success() {
        let envelope = parse(json!({"body": [{"cid": "1"}]}));
        assert_eq!(validate_envelope(envelope).unwrap().len(), 1);
    }

    #[test]
    fn missing_or_null_body_is_empty() {
        let envelope = parse(json!({"status": {"code": 0, "message": "ok"}}));
        assert!(validate_envelope(envelope).unwrap().is_empty());

        let envelope = parse(json!({"status": {"code": 0}, "body": null}));
        assert!(validate_envelope(envelope).unwrap().is_empty());
    }

    #[test]
    fn first_record_of_empty_body_is_connect() {
        let err = first_record(Vec::new(), "server info").unwrap_err();
        assert_eq!(err, QueryError::Connect("Empty server info response".to_string()));
    }
}
