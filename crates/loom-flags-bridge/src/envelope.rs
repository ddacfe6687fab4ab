// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Uniform success/failure envelopes returned across the host boundary.
//!
//! Every envelope satisfies one invariant: `ok` is true exactly when `error`
//! is empty, and a failed envelope carries the zero payload (`false` or `""`).
//! Constructors are the only way the bridge builds them, so the invariant holds
//! by construction.

use serde::Serialize;

use crate::error::Result;

/// Substituted when a failure would otherwise carry an empty message.
const UNKNOWN_ERROR: &str = "unknown error";

fn failure_message(error: impl std::fmt::Display) -> String {
	let message = error.to_string();
	if message.is_empty() {
		UNKNOWN_ERROR.to_string()
	} else {
		message
	}
}

/// Envelope for operations without a payload (initialize, shutdown, log event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
	pub ok: bool,
	pub error: String,
}

impl UnitResult {
	pub fn success() -> Self {
		Self {
			ok: true,
			error: String::new(),
		}
	}

	pub fn failure(error: impl std::fmt::Display) -> Self {
		Self {
			ok: false,
			error: failure_message(error),
		}
	}
}

impl From<Result<()>> for UnitResult {
	fn from(result: Result<()>) -> Self {
		match result {
			Ok(()) => Self::success(),
			Err(e) => Self::failure(e),
		}
	}
}

/// Envelope carrying a gate value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoolResult {
	pub ok: bool,
	pub value: bool,
	pub error: String,
}

impl BoolResult {
	pub fn success(value: bool) -> Self {
		Self {
			ok: true,
			value,
			error: String::new(),
		}
	}

	pub fn failure(error: impl std::fmt::Display) -> Self {
		Self {
			ok: false,
			value: false,
			error: failure_message(error),
		}
	}
}

impl From<Result<bool>> for BoolResult {
	fn from(result: Result<bool>) -> Self {
		match result {
			Ok(value) => Self::success(value),
			Err(e) => Self::failure(e),
		}
	}
}

/// Envelope carrying JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringResult {
	pub ok: bool,
	pub value: String,
	pub error: String,
}

impl StringResult {
	pub fn success(value: impl Into<String>) -> Self {
		Self {
			ok: true,
			value: value.into(),
			error: String::new(),
		}
	}

	pub fn failure(error: impl std::fmt::Display) -> Self {
		Self {
			ok: false,
			value: String::new(),
			error: failure_message(error),
		}
	}
}

impl From<Result<String>> for StringResult {
	fn from(result: Result<String>) -> Self {
		match result {
			Ok(value) => Self::success(value),
			Err(e) => Self::failure(e),
		}
	}
}
