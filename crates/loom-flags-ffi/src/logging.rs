// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Opt-in log output for hosts that have no `tracing` subscriber of their own.

use std::ffi::{c_char, CStr};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

/// Picks the filter: explicit directive, then `RUST_LOG`, then `info`.
fn resolve_filter(directive: Option<&str>) -> Option<EnvFilter> {
	match directive.filter(|d| !d.trim().is_empty()) {
		Some(directive) => EnvFilter::try_new(directive).ok(),
		None => EnvFilter::try_from_default_env()
			.ok()
			.or_else(|| EnvFilter::try_new(DEFAULT_DIRECTIVE).ok()),
	}
}

/// Installs a stderr log subscriber for the bridge.
///
/// `filter` is an `EnvFilter` directive such as `loom_flags_bridge=debug`.
/// Null or empty falls back to `RUST_LOG`, then `info`. Returns `false` if
/// the directive does not parse or a global subscriber is already installed.
///
/// # Safety
///
/// `filter` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_enable_logging(filter: *const c_char) -> bool {
	let directive = if filter.is_null() {
		None
	} else {
		match CStr::from_ptr(filter).to_str() {
			Ok(directive) => Some(directive),
			Err(_) => return false,
		}
	};

	let Some(filter) = resolve_filter(directive) else {
		return false;
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init()
		.is_ok()
}
