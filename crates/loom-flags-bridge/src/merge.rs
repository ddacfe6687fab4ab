// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON merge patch (RFC 7386) and the caller-JSON decoding built on it.
//!
//! Caller input never has to be complete. It is parsed, checked to be an
//! object, and patched onto a fully populated default document before being
//! deserialized, so any key the caller leaves out keeps its default.
//!
//! Patch rules:
//! - an object member in the patch is merged recursively into the target
//! - any other value replaces the target member wholesale
//! - a `null` member removes the target member

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

/// Applies `patch` to `target` in place using RFC 7386 semantics.
pub fn merge_patch(target: &mut Value, patch: &Value) {
	let Value::Object(patch_members) = patch else {
		*target = patch.clone();
		return;
	};

	if !target.is_object() {
		*target = Value::Object(Map::new());
	}

	if let Value::Object(target_members) = target {
		for (key, value) in patch_members {
			if value.is_null() {
				target_members.remove(key);
			} else {
				merge_patch(
					target_members.entry(key.clone()).or_insert(Value::Null),
					value,
				);
			}
		}
	}
}

/// Decodes caller JSON text into `T`, starting from `defaults`.
///
/// Empty text yields the defaults untouched. `field` names the argument in
/// error messages (e.g. `userJson`).
pub fn decode_with_defaults<T>(defaults: Value, raw: &str, field: &'static str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut merged = defaults;

	if !raw.is_empty() {
		let input: Value = serde_json::from_str(raw)
			.map_err(|source| BridgeError::MalformedJson { field, source })?;
		if !input.is_object() {
			return Err(BridgeError::NotAnObject { field });
		}
		merge_patch(&mut merged, &input);
	}

	serde_json::from_value(merged).map_err(|source| BridgeError::SchemaMismatch { field, source })
}
