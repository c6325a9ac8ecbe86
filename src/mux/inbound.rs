//! Inbound request validation.
//!
//! Slack-style senders post either a JSON document or an urlencoded form
//! whose `payload` field carries the JSON document as a string. Both end
//! up as one JSON object: the effective body. Validation order matters
//! for the status code a client sees: a malformed body is reported (400)
//! before the endpoint is looked up (404) or the token checked (403).

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use serde_json::{Map, Value};

use super::MuxRejection;
use crate::config::model::{Endpoint, MuxConfig};

/// Inbound body after normalisation. Always a JSON object.
pub type InboundPayload = Map<String, Value>;

fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next().unwrap_or_default().trim();
    Some(essence.to_ascii_lowercase())
}

/// Decode raw request bytes according to `Content-Type`.
///
/// Returns `Ok(None)` when there is nothing to decode: an empty body or a
/// media type that is neither JSON nor urlencoded.
pub fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<Option<Value>, MuxRejection> {
    if body.is_empty() {
        return Ok(None);
    }

    match media_type(headers).as_deref() {
        Some("application/json") => serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| MuxRejection::BadRequest(format!("invalid JSON body: {e}"))),
        Some(mt) if mt.ends_with("+json") => serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| MuxRejection::BadRequest(format!("invalid JSON body: {e}"))),
        Some("application/x-www-form-urlencoded") => Ok(Some(Value::Object(decode_form(body)))),
        _ => Ok(None),
    }
}

/// Decode an urlencoded form into an object of strings.
///
/// A key seen more than once collects its values into an array.
#[must_use]
pub fn decode_form(body: &[u8]) -> Map<String, Value> {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(&*key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key.into_owned(), value);
            }
        }
    }
    fields
}

/// Unwrap the `payload` field if present and require an object.
///
/// A falsy `payload` (`null`, `false`, `0`, `""`) is treated as absent and
/// the body is used as-is. Any other non-string `payload` is malformed.
pub fn effective_body(body: Option<Value>) -> Result<InboundPayload, MuxRejection> {
    let body = body.ok_or_else(|| MuxRejection::BadRequest("missing body".into()))?;

    let unwrapped = match body.get("payload") {
        Some(Value::String(encoded)) if !encoded.is_empty() => Some(
            serde_json::from_str::<Value>(encoded)
                .map_err(|e| MuxRejection::BadRequest(format!("invalid payload field: {e}")))?,
        ),
        None | Some(Value::Null | Value::Bool(false) | Value::String(_)) => None,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(_) => {
            return Err(MuxRejection::BadRequest(
                "payload field must be a JSON-encoded string".into(),
            ))
        }
    };

    match unwrapped.unwrap_or(body) {
        Value::Object(fields) => Ok(fields),
        other => Err(MuxRejection::BadRequest(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolve `name` and check the path token against the endpoint's secret.
///
/// The endpoint stores a token *name*; the secret it must match is looked
/// up in `sourceTokens`. A name with no entry there rejects every request.
pub fn authorize<'a>(
    mux: &'a MuxConfig,
    name: &str,
    token: Option<&str>,
) -> Result<&'a Endpoint, MuxRejection> {
    let endpoint = mux
        .endpoint(name)
        .ok_or_else(|| MuxRejection::UnknownEndpoint(name.to_string()))?;

    if let Some(token_name) = endpoint.token.as_deref() {
        match (token, mux.token_value(token_name)) {
            (Some(given), Some(expected)) if given == expected => {}
            _ => return Err(MuxRejection::TokenMismatch(name.to_string())),
        }
    }

    Ok(endpoint)
}
