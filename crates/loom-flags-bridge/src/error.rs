// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the flags bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Result type alias for evaluation core calls.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the bridge.
///
/// None of these escape the boundary as panics; every public bridge operation
/// folds them into a result envelope.
#[derive(Debug, Error)]
pub enum BridgeError {
	/// The evaluation core is already running.
	#[error("flags SDK already initialized")]
	AlreadyInitialized,

	/// The evaluation core has not been initialized (or was shut down).
	#[error("flags SDK not initialized")]
	NotInitialized,

	/// The caller's JSON text could not be parsed.
	#[error("{field} is not valid JSON: {source}")]
	MalformedJson {
		field: &'static str,
		#[source]
		source: serde_json::Error,
	},

	/// The caller's JSON parsed, but is not an object.
	#[error("{field} must be a JSON object")]
	NotAnObject { field: &'static str },

	/// The merged JSON has a field of the wrong type.
	#[error("{field} does not match the expected schema: {source}")]
	SchemaMismatch {
		field: &'static str,
		#[source]
		source: serde_json::Error,
	},

	/// The evaluation core faulted while serving the call.
	#[error("{message}")]
	CoreFault { message: String },
}

impl BridgeError {
	/// Builds a [`BridgeError::CoreFault`], substituting `fallback` when the
	/// fault carries no description.
	pub fn core_fault(message: impl Into<String>, fallback: &str) -> Self {
		let message = message.into();
		if message.trim().is_empty() {
			BridgeError::CoreFault {
				message: fallback.to_string(),
			}
		} else {
			BridgeError::CoreFault { message }
		}
	}
}

/// Faults raised by an evaluation core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
	/// The core was asked to evaluate before `initialize`.
	#[error("core not initialized")]
	NotInitialized,

	/// A described fault.
	#[error("{0}")]
	Fault(String),

	/// A fault without any description.
	#[error("")]
	Unspecified,
}

impl CoreError {
	pub fn fault(message: impl Into<String>) -> Self {
		CoreError::Fault(message.into())
	}
}
