use serde_json::Value;
use tracing::error;

use crate::error::{AppError, Result};

/// `aggregations.<name>.buckets` of a search response.
/// A missing path usually means an empty or misconfigured index; the raw body is logged.
pub fn aggregation_buckets(raw: &Value, name: &str) -> Result<Vec<Value>> {
    match raw
        .get("aggregations")
        .and_then(|a| a.get(name))
        .and_then(|a| a.get("buckets"))
        .and_then(|b| b.as_array())
    {
        Some(buckets) => Ok(buckets.clone()),
        None => {
            let raw_text = raw.to_string();
            error!(
                aggregation = name,
                raw = %raw_text,
                "store response missing aggregation buckets"
            );
            Err(AppError::UnexpectedResponseShape {
                path: format!("aggregations.{name}.buckets"),
                raw: raw_text,
            })
        }
    }
}

/// Cursor for the next composite page, if the store returned one.
pub fn after_key(raw: &Value, name: &str) -> Option<Value> {
    raw.get("aggregations")
        .and_then(|a| a.get(name))
        .and_then(|a| a.get("after_key"))
        .filter(|k| k.is_object())
        .cloned()
}

pub fn doc_count(bucket: &Value) -> u64 {
    bucket.get("doc_count").and_then(|c| c.as_u64()).unwrap_or(0)
}

/// `key.<source>` of a composite bucket as a string.
pub fn key_str<'a>(bucket: &'a Value, source: &str) -> Option<&'a str> {
    bucket.get("key")?.get(source)?.as_str()
}

/// `key.<source>` of a composite bucket as epoch milliseconds.
pub fn key_millis(bucket: &Value, source: &str) -> Option<i64> {
    let v = bucket.get("key")?.get(source)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}
