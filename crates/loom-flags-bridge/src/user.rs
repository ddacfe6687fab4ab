// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The evaluation context handed to the core, and how it is built from
//! caller JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::merge::decode_with_defaults;

/// Name used for the user argument in error messages.
pub const USER_JSON_FIELD: &str = "userJson";

/// The user an evaluation is performed for.
///
/// JSON keys follow the host SDK wire names (`userID`, `ipAddress`,
/// `customIDs`, ...). Every field has an empty default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
	#[serde(rename = "userID")]
	pub user_id: String,
	pub email: String,
	pub ip_address: String,
	pub user_agent: String,
	pub country: String,
	pub locale: String,
	pub app_version: String,
	pub custom: HashMap<String, Value>,
	pub private_attribute: HashMap<String, Value>,
	pub statsig_environment: HashMap<String, String>,
	#[serde(rename = "customIDs")]
	pub custom_ids: HashMap<String, String>,
}

impl User {
	/// Creates an empty user with the given ID.
	pub fn new(user_id: impl Into<String>) -> Self {
		Self {
			user_id: user_id.into(),
			..Self::default()
		}
	}

	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = email.into();
		self
	}

	pub fn with_custom(mut self, key: impl Into<String>, value: Value) -> Self {
		self.custom.insert(key.into(), value);
		self
	}

	pub fn with_custom_id(mut self, kind: impl Into<String>, id: impl Into<String>) -> Self {
		self.custom_ids.insert(kind.into(), id.into());
		self
	}
}

/// The canonical default user document that caller JSON is patched onto.
pub fn default_user_json() -> Value {
	json!({
		"userID": "",
		"email": "",
		"ipAddress": "",
		"userAgent": "",
		"country": "",
		"locale": "",
		"appVersion": "",
		"custom": {},
		"privateAttribute": {},
		"statsigEnvironment": {},
		"customIDs": {},
	})
}

/// Builds a [`User`] from caller-supplied JSON text.
///
/// Empty text yields the default user. Otherwise the text must be a JSON
/// object; it is merge-patched onto [`default_user_json`] and deserialized.
pub fn parse_user_json(raw: &str) -> Result<User> {
	decode_with_defaults(default_user_json(), raw, USER_JSON_FIELD)
}
