//! Hashing - SHA-256 over canonical input and compiled output
//!
//! Same item in, same hashes out.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::schema::AssessmentItem;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Hash of the item as authored, independent of key order.
pub fn compute_item_hash(item: &AssessmentItem) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(item)?.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"y": [{"b": 1, "a": 0}]}});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":{"y":[{"a":0,"b":1}]},"z":1}"#);
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn item_hash_ignores_key_order() {
        let a = AssessmentItem::from_json(
            r#"{"identifier":"i","title":"t","body":"<p/>","feedback":{"correct":"","incorrect":""}}"#,
        )
        .unwrap();
        let b = AssessmentItem::from_json(
            r#"{"feedback":{"incorrect":"","correct":""},"body":"<p/>","title":"t","identifier":"i"}"#,
        )
        .unwrap();
        assert_eq!(compute_item_hash(&a).unwrap(), compute_item_hash(&b).unwrap());
    }
}
