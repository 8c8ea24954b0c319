//! Record parser: a pure function from one input line to a normalized
//! `Record`, or a fatal parse error. `serde_json` is used purely as the
//! parsing backend.

use crate::config::{MAX_NAMESPACE_LEN, NAMESPACE_OFFSET};
use crate::error::ReduceError;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Directory,
    Object,
}

#[derive(Clone, Debug)]
pub struct Record {
    pub owner: String,
    pub object_id: String,
    pub namespace: String,
    pub kind: RecordKind,
    pub replica_count: u64,
    pub length_bytes: u64,
}

/// Shape of one input line. Only the fields this system cares about are
/// named; unrecognized fields in the source JSON are ignored.
#[derive(Deserialize)]
struct RawRecord {
    key: String,
    #[serde(rename = "type")]
    kind: String,
    owner: String,
    sharks: Option<Vec<serde_json::Value>>,
    #[serde(rename = "contentLength")]
    content_length: Option<u64>,
    #[serde(rename = "objectId")]
    object_id: Option<String>,
}

/// Parse one NDJSON line into a `Record`. Any malformed JSON, missing
/// required field, unknown `type`, over-long namespace, or invalid key
/// layout is a fatal `RecordParse` error; there is no tolerant/skip mode.
pub fn parse_line(line: &str) -> Result<Record, ReduceError> {
    let err = |reason: &str| ReduceError::RecordParse { line: line.to_string(), reason: reason.to_string() };

    let raw: RawRecord = serde_json::from_str(line).map_err(|e| err(&format!("invalid JSON: {e}")))?;

    let kind = match raw.kind.as_str() {
        "directory" => RecordKind::Directory,
        "object" => RecordKind::Object,
        other => return Err(err(&format!("unknown record type `{other}`"))),
    };

    let namespace = extract_namespace(&raw.key).map_err(|reason| err(&reason))?;

    let (object_id, replica_count, length_bytes) = if kind == RecordKind::Object {
        let sharks = raw.sharks.as_ref().ok_or_else(|| err("object record missing `sharks`"))?;
        let content_length = raw.content_length.ok_or_else(|| err("object record missing `contentLength`"))?;
        let object_id = raw.object_id.clone().ok_or_else(|| err("object record missing `objectId`"))?;
        (object_id, sharks.len() as u64, content_length)
    } else {
        (String::new(), 0, 0)
    };

    Ok(Record { owner: raw.owner, object_id, namespace, kind, replica_count, length_bytes })
}

/// Extract the namespace component of a manifest key:
/// `/<36-byte-uuid>/<namespace>[/...]`, namespace starting at byte offset 38
/// and ending at the next '/' or end-of-string.
fn extract_namespace(key: &str) -> Result<String, String> {
    let bytes = key.as_bytes();
    if bytes.len() < NAMESPACE_OFFSET + 1 {
        return Err(format!("key `{key}` is too short to contain a namespace"));
    }

    let rest = &bytes[NAMESPACE_OFFSET..];
    let ns_bytes = match rest.iter().position(|&b| b == b'/') {
        Some(slash) => &rest[..slash],
        None => rest,
    };

    if ns_bytes.len() > MAX_NAMESPACE_LEN {
        return Err(format!("namespace in key `{key}` exceeds {MAX_NAMESPACE_LEN} bytes"));
    }

    std::str::from_utf8(ns_bytes)
        .map(str::to_string)
        .map_err(|_| format!("namespace in key `{key}` is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directory_record() {
        let line = r#"{"key":"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x","type":"directory","owner":"u1"}"#;
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.kind, RecordKind::Directory);
        assert_eq!(rec.namespace, "public");
        assert_eq!(rec.owner, "u1");
    }

    #[test]
    fn parses_object_record_with_replicas() {
        let line = r#"{"key":"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x/a","type":"object","owner":"u1","objectId":"o1","sharks":[1,2],"contentLength":100000}"#;
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.kind, RecordKind::Object);
        assert_eq!(rec.namespace, "public");
        assert_eq!(rec.object_id, "o1");
        assert_eq!(rec.replica_count, 2);
        assert_eq!(rec.length_bytes, 100_000);
    }

    #[test]
    fn namespace_ends_at_string_end_when_no_trailing_slash() {
        let line = r#"{"key":"/639e843a-6519-479e-b8d8-147ebf8f5c1a/stor","type":"directory","owner":"u1"}"#;
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.namespace, "stor");
    }

    #[test]
    fn rejects_overlong_namespace() {
        let line = r#"{"key":"/639e843a-6519-479e-b8d8-147ebf8f5c1a/this-namespace-is-too-long/x","type":"directory","owner":"u1"}"#;
        assert!(parse_line(line).is_err());
    }

    #[test]
    fn rejects_short_key() {
        let line = r#"{"key":"/too-short","type":"directory","owner":"u1"}"#;
        assert!(parse_line(line).is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        let line = r#"{"key":"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x","type":"symlink","owner":"u1"}"#;
        assert!(parse_line(line).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_line("not json").is_err());
    }

    #[test]
    fn rejects_object_missing_sharks() {
        let line = r#"{"key":"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x/a","type":"object","owner":"u1","objectId":"o1","contentLength":1}"#;
        assert!(parse_line(line).is_err());
    }
}
