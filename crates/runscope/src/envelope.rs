//! Response envelope decoding.
//!
//! Every API response is wrapped as
//! `{"meta": {"status": ...}, "data": ..., "error": {...} | null}`.
//! Success bodies are decoded straight into the per-kind record; failure
//! bodies are searched for a status and message.

use crate::types::EntityKind;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A decoded response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Response metadata.
    #[serde(default)]
    pub meta: Meta,
    /// Payload: an object for item responses, an array for collections.
    pub data: T,
    /// Error details on failed requests.
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// Envelope metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    /// `success` or `error`.
    #[serde(default)]
    pub status: String,
}

/// Error details reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Status code echoed in the body.
    #[serde(default)]
    pub status: Option<u16>,
    /// Message.
    #[serde(rename = "error")]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Wrapped { error: ErrorBody },
    Bare(ErrorBody),
}

/// Decode a success envelope whose `data` is a `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Envelope<T>, String> {
    serde_json::from_slice(body).map_err(|e| e.to_string())
}

/// Decode the error details of a failed response, if the body has any.
///
/// Accepts both the full envelope (`{"error": {"status": .., "error": ..}}`)
/// and a bare error object (`{"status": .., "error": ..}`).
pub fn decode_error(body: &[u8]) -> Option<ErrorBody> {
    match serde_json::from_slice::<ErrorPayload>(body).ok()? {
        ErrorPayload::Wrapped { error } | ErrorPayload::Bare(error) => Some(error),
    }
}

/// Extract the remote-assigned identifier from a create response.
///
/// The field name depends on the kind (`key` for buckets, `id` otherwise).
/// A missing or non-string field is an error, never an empty identifier.
pub fn extract_id(body: &[u8], kind: EntityKind) -> Result<String, String> {
    let envelope: Envelope<Map<String, Value>> = decode(body)?;
    let field = kind.id_field();
    match envelope.data.get(field) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::String(_)) => Err(format!("`{field}` field is empty")),
        Some(other) => Err(format!("`{field}` field is not a string: {other}")),
        None => Err(format!("`{field}` field is missing from response data")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bucket;

    const BUCKET_RESPONSE: &str = r#"
    {
      "meta": {
        "status": "success"
      },
      "data": {
        "verify_ssl": true,
        "trigger_url": "https://api.runscope.com/radar/bucket/2e15499d-2e32-4ea8-b6c9-18468031c491/trigger",
        "name": "foo",
        "key": "6t0sd3euxlwa",
        "team": {
          "name": "form3",
          "id": "870ed937-bc6e-4d8b-a9a5-d7f9f2412fa3"
        },
        "default": false,
        "auth_token": null,
        "tests_url": "https://api.runscope.com/buckets/6t0sd3euxlwa/tests",
        "collections_url": "https://api.runscope.com/buckets/6t0sd3euxlwa/collections",
        "messages_url": "https://api.runscope.com/buckets/6t0sd3euxlwa/stream"
      },
      "error": null
    }
    "#;

    #[test]
    fn test_decode_sample_bucket() {
        let envelope: Envelope<Bucket> = decode(BUCKET_RESPONSE.as_bytes()).unwrap();
        assert_eq!(envelope.meta.status, "success");
        assert!(envelope.error.is_none());
        assert_eq!(envelope.data.key, "6t0sd3euxlwa");
        assert_eq!(envelope.data.name, "foo");
        assert_eq!(envelope.data.team.id, "870ed937-bc6e-4d8b-a9a5-d7f9f2412fa3");
        assert_eq!(envelope.data.team.name.as_deref(), Some("form3"));
    }

    #[test]
    fn test_extract_bucket_key() {
        let key = extract_id(BUCKET_RESPONSE.as_bytes(), EntityKind::Bucket).unwrap();
        assert_eq!(key, "6t0sd3euxlwa");
    }

    #[test]
    fn test_extract_id_uses_kind_field() {
        // A bucket payload has no `id`, so reading it as a test must fail.
        let err = extract_id(BUCKET_RESPONSE.as_bytes(), EntityKind::Test).unwrap_err();
        assert!(err.contains("`id`"));
    }

    #[test]
    fn test_extract_id_wrong_type() {
        let body = br#"{"meta": {"status": "success"}, "data": {"id": 42}, "error": null}"#;
        let err = extract_id(body, EntityKind::Environment).unwrap_err();
        assert!(err.contains("not a string"));
    }

    #[test]
    fn test_extract_id_malformed_json() {
        assert!(extract_id(b"<html>bad gateway</html>", EntityKind::Test).is_err());
    }

    #[test]
    fn test_decode_collection() {
        let body = br#"{"meta": {"status": "success"}, "data": [
            {"key": "a", "name": "one", "team": {"id": "T"}},
            {"key": "b", "name": "two", "team": {"id": "T"}}
        ]}"#;
        let envelope: Envelope<Vec<Bucket>> = decode(body).unwrap();
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.data[1].key, "b");
    }

    #[test]
    fn test_decode_error_wrapped() {
        let body = br#"{"meta": {"status": "error"}, "data": null,
            "error": {"status": 404, "error": "Not found"}}"#;
        let error = decode_error(body).unwrap();
        assert_eq!(error.status, Some(404));
        assert_eq!(error.message, "Not found");
    }

    #[test]
    fn test_decode_error_bare() {
        let error = decode_error(br#"{"status": 400, "error": "bad team"}"#).unwrap();
        assert_eq!(error.message, "bad team");
    }

    #[test]
    fn test_decode_error_unrecognized() {
        assert!(decode_error(b"Internal Server Error").is_none());
        assert!(decode_error(br#"{"error": null}"#).is_none());
    }
}
