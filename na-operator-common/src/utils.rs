// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use serde::Serialize;
use blake3::hash as blake3_hash;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("object is not serializable: {0}")]
    Unserializable(#[from] serde_json::Error),
}

/// Compute a hash for any serializable object
///
/// The object is first converted into a JSON value with every object's keys
/// sorted, so the resulting hex digest only depends on the object's content,
/// never on field or map insertion order.
///
/// # Arguments
/// * `object` - The object to hash
///
/// # Returns
/// The lowercase hex encoded blake3 digest of the canonical JSON form
pub fn compute_object_hash<T>(object: &T) -> Result<String, HashError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(object)?;
    let canonical = serde_json::to_vec(&sort_json(value))?;

    Ok(blake3_hash(&canonical).to_hex().to_string())
}

/// Recursively sort JSON objects
pub fn sort_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_json(v))).collect())
        },
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        _ => value,
    }
}
