// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Idempotent dictionary mutation primitives.

Every configuration step is expressed in terms of these helpers. None of
them insert duplicate array entries, so running a step twice leaves the
document unchanged.
*/

use {
    crate::error::{MamConfigError, Result},
    plist::{Dictionary, Value},
};

fn type_mismatch(key: &str, expected: &'static str) -> MamConfigError {
    MamConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// Append `value` to the array at `key` unless already present.
///
/// The array is created if `key` is missing.
pub fn add_to_unique_keyed_array(dict: &mut Dictionary, key: &str, value: Value) -> Result<()> {
    if !dict.contains_key(key) {
        dict.insert(key.to_string(), Value::Array(vec![]));
    }

    let values = dict
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| type_mismatch(key, "array"))?;

    if !values.contains(&value) {
        values.push(value);
    }

    Ok(())
}

/// Ensure `key` holds a dictionary, creating an empty one if missing.
pub fn add_unique_keyed_map<'a>(dict: &'a mut Dictionary, key: &str) -> Result<&'a mut Dictionary> {
    if !dict.contains_key(key) {
        dict.insert(key.to_string(), Value::Dictionary(Dictionary::new()));
    }

    dict.get_mut(key)
        .and_then(Value::as_dictionary_mut)
        .ok_or_else(|| type_mismatch(key, "dictionary"))
}

/// Set `key` to `value`, replacing any existing value.
pub fn add_unique_keyed_value(dict: &mut Dictionary, key: &str, value: Value) {
    dict.insert(key.to_string(), value);
}

/// Set `key` to `value` only if `key` is not present.
///
/// Returns whether the value was inserted.
pub fn add_new_unique_keyed_value(dict: &mut Dictionary, key: &str, value: Value) -> bool {
    if dict.contains_key(key) {
        false
    } else {
        dict.insert(key.to_string(), value);
        true
    }
}

/// Obtain the strings in the array at `key`.
///
/// Non-string members are ignored. A missing key yields an empty list.
pub fn string_array(dict: &Dictionary, key: &str) -> Result<Vec<String>> {
    match dict.get(key) {
        None => Ok(vec![]),
        Some(Value::Array(values)) => Ok(values
            .iter()
            .filter_map(Value::as_string)
            .map(|s| s.to_string())
            .collect()),
        Some(_) => Err(type_mismatch(key, "array")),
    }
}
