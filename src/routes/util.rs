//! Shared form parsing and JSON reply helpers for route handlers.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::game::ids::ParticipantId;

/// Parse a URL-encoded form body into key-value pairs.
/// Repeated keys (`name=Ana&name=Ben`) are kept in order.
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((percent_decode(key), percent_decode(val)))
        })
        .collect()
}

/// Percent-decode a URL-encoded value. Multi-byte sequences are decoded as
/// UTF-8; anything malformed is kept as written.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).and_then(|h| core::str::from_utf8(h).ok());
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(val) => {
                        out.push(val);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a query string into key-value pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let q = query.strip_prefix('?').unwrap_or(query);
    parse_form_body(q)
}

/// First value for `key`.
pub fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Every value for `key`, in body order.
pub fn get_all<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

pub fn require_param<'a>(params: &'a [(String, String)], key: &str) -> EngineResult<&'a str> {
    get_param(params, key).ok_or_else(|| EngineError::validation(format!("Missing {key} parameter")))
}

pub fn require_id(params: &[(String, String)], key: &str) -> EngineResult<ParticipantId> {
    let raw = require_param(params, key)?;
    ParticipantId::parse(raw).ok_or_else(|| EngineError::validation(format!("Invalid {key}: {raw}")))
}

/// Absent or empty means "nobody".
pub fn optional_id(params: &[(String, String)], key: &str) -> EngineResult<Option<ParticipantId>> {
    match get_param(params, key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => ParticipantId::parse(raw)
            .map(Some)
            .ok_or_else(|| EngineError::validation(format!("Invalid {key}: {raw}"))),
    }
}

pub fn require_i32(params: &[(String, String)], key: &str) -> EngineResult<i32> {
    let raw = require_param(params, key)?;
    raw.trim()
        .parse()
        .map_err(|_| EngineError::validation(format!("{key} must be a number")))
}

pub fn require_u64(params: &[(String, String)], key: &str) -> EngineResult<u64> {
    let raw = require_param(params, key)?;
    raw.trim()
        .parse()
        .map_err(|_| EngineError::validation(format!("{key} must be a number")))
}

/// Parse a snake_case role name, e.g. `mr_white`.
pub fn parse_role<R: DeserializeOwned>(raw: &str) -> EngineResult<R> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| EngineError::validation(format!("Unknown role: {raw}")))
}

/// The participant names for a start request: repeated `name` keys, or one
/// `names` value with one name per line.
pub fn names_param(params: &[(String, String)]) -> Vec<String> {
    let repeated = get_all(params, "name");
    if !repeated.is_empty() {
        return repeated.into_iter().map(str::to_string).collect();
    }
    get_param(params, "names")
        .map(|block| block.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

// ── Replies ────────────────────────────────────────────────────────

pub fn ok<T: Serialize>(data: T) -> String {
    match serde_json::to_value(data) {
        Ok(data) => json!({ "ok": true, "data": data }).to_string(),
        Err(e) => fail(&EngineError::snapshot(format!("Cannot serialize reply: {e}"))),
    }
}

pub fn fail(err: &EngineError) -> String {
    tracing::warn!(kind = err.kind(), error = %err, "request rejected");
    json!({
        "ok": false,
        "error": { "kind": err.kind(), "message": err.to_string() },
    })
    .to_string()
}

pub fn reply<T: Serialize>(result: EngineResult<T>) -> String {
    match result {
        Ok(data) => ok(data),
        Err(e) => fail(&e),
    }
}

fn routing_error(status: u16, message: &str) -> String {
    json!({
        "ok": false,
        "status": status,
        "error": { "kind": "routing", "message": message },
    })
    .to_string()
}

pub fn not_found() -> String {
    routing_error(404, "route not found")
}

pub fn method_not_allowed() -> String {
    routing_error(405, "method not allowed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::mafia::MafiaRole;

    #[test]
    fn parse_form_body_keeps_repeated_keys() {
        let pairs = parse_form_body("name=Ana&name=Ben&total=5");
        assert_eq!(get_all(&pairs, "name"), ["Ana", "Ben"]);
        assert_eq!(get_param(&pairs, "total"), Some("5"));
    }

    #[test]
    fn parse_form_body_empty() {
        assert!(parse_form_body("").is_empty());
    }

    #[test]
    fn percent_decode_plus_and_hex() {
        assert_eq!(percent_decode("hello+world"), "hello world");
        assert_eq!(percent_decode("hello%20world"), "hello world");
    }

    #[test]
    fn percent_decode_utf8() {
        assert_eq!(percent_decode("Jos%C3%A9"), "José");
    }

    #[test]
    fn percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn parse_query_strips_prefix() {
        let pairs = parse_query("?foo=bar");
        assert_eq!(get_param(&pairs, "foo"), Some("bar"));
    }

    #[test]
    fn names_from_block() {
        let pairs = parse_form_body("names=Ana%0ABen%0ACy");
        assert_eq!(names_param(&pairs), ["Ana", "Ben", "Cy"]);
    }

    #[test]
    fn roles_parse_from_snake_case() {
        assert_eq!(parse_role::<MafiaRole>("bomber").unwrap(), MafiaRole::Bomber);
        assert!(parse_role::<MafiaRole>("wizard").unwrap_err().is_validation());
    }

    #[test]
    fn empty_id_is_nobody() {
        let pairs = parse_form_body("target=");
        assert_eq!(optional_id(&pairs, "target").unwrap(), None);
        let pairs = parse_form_body("target=nope");
        assert!(optional_id(&pairs, "target").is_err());
    }

    #[test]
    fn replies_are_tagged() {
        assert!(ok(3).contains(r#""ok":true"#));
        let err = fail(&EngineError::illegal("nope"));
        assert!(err.contains(r#""kind":"illegal_transition""#));
        assert!(not_found().contains("404"));
    }
}
