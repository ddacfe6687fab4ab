// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Initialization options passed through to the evaluation core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::merge::decode_with_defaults;

/// Name used for the options argument in error messages.
pub const OPTIONS_JSON_FIELD: &str = "optionsJson";

/// Default interval between ruleset syncs.
pub const DEFAULT_RULESETS_SYNC_INTERVAL_MS: i32 = 10_000;
/// Default interval between event log flushes.
pub const DEFAULT_LOGGING_INTERVAL_MS: i32 = 60_000;
/// Default number of events buffered before a flush.
pub const DEFAULT_LOGGING_MAX_BUFFER_SIZE: i32 = 1_000;

/// Options for [`EvaluationCore::initialize_with_options`].
///
/// Built fresh for every initialize call and handed to the core by value; the
/// bridge never keeps a copy. Integer tunables are `i32` to match the host ABI
/// and are passed through untouched, so `0` reaches the core as `0`.
///
/// [`EvaluationCore::initialize_with_options`]: crate::EvaluationCore::initialize_with_options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitOptions {
	/// API endpoint override. `None` keeps the core's own default.
	pub api: Option<String>,
	pub local_mode: bool,
	pub rulesets_sync_interval_ms: i32,
	pub logging_interval_ms: i32,
	pub logging_max_buffer_size: i32,
}

impl Default for InitOptions {
	fn default() -> Self {
		Self {
			api: None,
			local_mode: false,
			rulesets_sync_interval_ms: DEFAULT_RULESETS_SYNC_INTERVAL_MS,
			logging_interval_ms: DEFAULT_LOGGING_INTERVAL_MS,
			logging_max_buffer_size: DEFAULT_LOGGING_MAX_BUFFER_SIZE,
		}
	}
}

impl InitOptions {
	/// Builds options from the primitive arguments a host binding passes.
	///
	/// An empty `api` means "use the core default", not an empty endpoint.
	pub fn from_host(
		api: &str,
		local_mode: bool,
		rulesets_sync_interval_ms: i32,
		logging_interval_ms: i32,
		logging_max_buffer_size: i32,
	) -> Self {
		Self {
			api: non_empty(api),
			local_mode,
			rulesets_sync_interval_ms,
			logging_interval_ms,
			logging_max_buffer_size,
		}
	}

	/// Builds options from JSON text, patched onto [`InitOptions::default`].
	pub fn from_json(raw: &str) -> Result<Self> {
		let mut options: InitOptions =
			decode_with_defaults(default_options_json(), raw, OPTIONS_JSON_FIELD)?;
		options.api = options.api.as_deref().and_then(non_empty);
		Ok(options)
	}

	pub fn with_api(mut self, api: impl Into<String>) -> Self {
		self.api = non_empty(&api.into());
		self
	}

	pub fn with_local_mode(mut self, local_mode: bool) -> Self {
		self.local_mode = local_mode;
		self
	}

	pub fn with_rulesets_sync_interval_ms(mut self, interval_ms: i32) -> Self {
		self.rulesets_sync_interval_ms = interval_ms;
		self
	}

	pub fn with_logging_interval_ms(mut self, interval_ms: i32) -> Self {
		self.logging_interval_ms = interval_ms;
		self
	}

	pub fn with_logging_max_buffer_size(mut self, size: i32) -> Self {
		self.logging_max_buffer_size = size;
		self
	}
}

fn non_empty(api: &str) -> Option<String> {
	if api.is_empty() {
		None
	} else {
		Some(api.to_string())
	}
}

fn default_options_json() -> Value {
	serde_json::json!({
		"api": null,
		"localMode": false,
		"rulesetsSyncIntervalMs": DEFAULT_RULESETS_SYNC_INTERVAL_MS,
		"loggingIntervalMs": DEFAULT_LOGGING_INTERVAL_MS,
		"loggingMaxBufferSize": DEFAULT_LOGGING_MAX_BUFFER_SIZE,
	})
}
