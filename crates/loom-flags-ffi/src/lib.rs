// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! C ABI for the Loom feature flags bridge.
//!
//! The Swift binding links this crate as a static or dynamic library and calls
//! the `loom_flags_*` functions declared in `include/loom_flags.h`. All
//! semantics come from `loom-flags-bridge`; this layer only moves strings
//! across the boundary.
//!
//! ```text
//! Swift → C ABI → FlagsBridge → EvaluationCore → envelope → C structs
//! ```
//!
//! Every string inside a returned envelope is owned by Rust and must be
//! released with the matching `loom_flags_*_free` function.

mod logging;
mod types;

use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use loom_flags_bridge::{BoolResult, EvaluationCore, FlagsBridge, LocalCore, StringResult, UnitResult};
use tracing::error;

pub use logging::loom_flags_enable_logging;
pub use types::{LoomFlagsBoolResult, LoomFlagsResult, LoomFlagsStringResult};

use types::{free_c_string, read_arg};

type GlobalBridge = FlagsBridge<Box<dyn EvaluationCore>>;

static BRIDGE: OnceLock<GlobalBridge> = OnceLock::new();

/// Installs the evaluation core used by every exported function.
///
/// Must run before the first exported call; returns `false` if a core is
/// already in place (including the default [`LocalCore`]).
pub fn install_core(core: Box<dyn EvaluationCore>) -> bool {
	BRIDGE.set(FlagsBridge::new(core)).is_ok()
}

fn bridge() -> &'static GlobalBridge {
	BRIDGE.get_or_init(|| FlagsBridge::new(Box::new(LocalCore::new())))
}

/// Runs `body`, turning a panic into the failure produced by `on_panic`.
fn guard<T>(operation: &str, body: impl FnOnce() -> T, on_panic: impl FnOnce(String) -> T) -> T {
	panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
		error!(operation = %operation, "Panic in flags FFI call");
		on_panic(format!("panic during {operation}"))
	})
}

/// Returns whether the evaluation core is running.
#[no_mangle]
pub extern "C" fn loom_flags_is_initialized() -> bool {
	guard("is_initialized", || bridge().is_initialized(), |_| false)
}

/// Initializes the evaluation core with default options.
///
/// # Safety
///
/// `sdk_key` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_initialize(sdk_key: *const c_char) -> LoomFlagsResult {
	guard(
		"initialize",
		|| match read_arg(sdk_key, "sdkKey") {
			Ok(sdk_key) => bridge().initialize(sdk_key),
			Err(e) => UnitResult::failure(e),
		},
		UnitResult::failure,
	)
	.into()
}

/// Initializes the evaluation core with explicit options.
///
/// An empty or null `api` keeps the core's default endpoint.
///
/// # Safety
///
/// `sdk_key` must be a valid NUL-terminated string; `api` must be null or one.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_initialize_with_options(
	sdk_key: *const c_char,
	api: *const c_char,
	local_mode: bool,
	rulesets_sync_interval_ms: i32,
	logging_interval_ms: i32,
	logging_max_buffer_size: i32,
) -> LoomFlagsResult {
	guard(
		"initialize_with_options",
		|| {
			let sdk_key = match read_arg(sdk_key, "sdkKey") {
				Ok(sdk_key) => sdk_key,
				Err(e) => return UnitResult::failure(e),
			};
			let api = if api.is_null() {
				""
			} else {
				match read_arg(api, "api") {
					Ok(api) => api,
					Err(e) => return UnitResult::failure(e),
				}
			};
			bridge().initialize_with_options(
				sdk_key,
				api,
				local_mode,
				rulesets_sync_interval_ms,
				logging_interval_ms,
				logging_max_buffer_size,
			)
		},
		UnitResult::failure,
	)
	.into()
}

/// Initializes the evaluation core with options given as JSON text.
///
/// A null or empty `options_json` means default options.
///
/// # Safety
///
/// `sdk_key` must be a valid NUL-terminated string; `options_json` must be
/// null or one.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_initialize_with_options_json(
	sdk_key: *const c_char,
	options_json: *const c_char,
) -> LoomFlagsResult {
	guard(
		"initialize_with_options_json",
		|| {
			let sdk_key = match read_arg(sdk_key, "sdkKey") {
				Ok(sdk_key) => sdk_key,
				Err(e) => return UnitResult::failure(e),
			};
			let options_json = if options_json.is_null() {
				""
			} else {
				match read_arg(options_json, "optionsJson") {
					Ok(options_json) => options_json,
					Err(e) => return UnitResult::failure(e),
				}
			};
			bridge().initialize_with_options_json(sdk_key, options_json)
		},
		UnitResult::failure,
	)
	.into()
}

/// Shuts the evaluation core down.
#[no_mangle]
pub extern "C" fn loom_flags_shutdown() -> LoomFlagsResult {
	guard("shutdown", || bridge().shutdown(), UnitResult::failure).into()
}

/// Reads the `(userJson, name)` pair every evaluation takes.
unsafe fn read_eval_args<'a>(
	user_json: *const c_char,
	name: *const c_char,
	name_argument: &str,
) -> Result<(&'a str, &'a str), String> {
	Ok((read_arg(user_json, "userJson")?, read_arg(name, name_argument)?))
}

/// Evaluates a gate.
///
/// # Safety
///
/// Both arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_check_gate_json(
	user_json: *const c_char,
	gate_name: *const c_char,
) -> LoomFlagsBoolResult {
	guard(
		"check_gate",
		|| match read_eval_args(user_json, gate_name, "gateName") {
			Ok((user_json, gate_name)) => bridge().check_gate_json(user_json, gate_name),
			Err(e) => BoolResult::failure(e),
		},
		BoolResult::failure,
	)
	.into()
}

/// Evaluates a dynamic config; `value` is the config as JSON text.
///
/// # Safety
///
/// Both arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_get_config_json(
	user_json: *const c_char,
	config_name: *const c_char,
) -> LoomFlagsStringResult {
	guard(
		"get_config",
		|| match read_eval_args(user_json, config_name, "configName") {
			Ok((user_json, config_name)) => bridge().get_config_json(user_json, config_name),
			Err(e) => StringResult::failure(e),
		},
		StringResult::failure,
	)
	.into()
}

/// Evaluates an experiment; `value` is the experiment as JSON text.
///
/// # Safety
///
/// Both arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_get_experiment_json(
	user_json: *const c_char,
	experiment_name: *const c_char,
) -> LoomFlagsStringResult {
	guard(
		"get_experiment",
		|| match read_eval_args(user_json, experiment_name, "experimentName") {
			Ok((user_json, experiment_name)) => bridge().get_experiment_json(user_json, experiment_name),
			Err(e) => StringResult::failure(e),
		},
		StringResult::failure,
	)
	.into()
}

/// Evaluates a layer; `value` is `{"name","value","ruleID"}` as JSON text.
///
/// # Safety
///
/// Both arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_get_layer_json(
	user_json: *const c_char,
	layer_name: *const c_char,
) -> LoomFlagsStringResult {
	guard(
		"get_layer",
		|| match read_eval_args(user_json, layer_name, "layerName") {
			Ok((user_json, layer_name)) => bridge().get_layer_json(user_json, layer_name),
			Err(e) => StringResult::failure(e),
		},
		StringResult::failure,
	)
	.into()
}

/// Logs a custom event.
///
/// # Safety
///
/// Both arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_log_event_json(
	user_json: *const c_char,
	event_name: *const c_char,
) -> LoomFlagsResult {
	guard(
		"log_event",
		|| match read_eval_args(user_json, event_name, "eventName") {
			Ok((user_json, event_name)) => bridge().log_event_json(user_json, event_name),
			Err(e) => UnitResult::failure(e),
		},
		UnitResult::failure,
	)
	.into()
}

/// Releases the strings held by a [`LoomFlagsResult`].
///
/// # Safety
///
/// `result` must be null or point to an envelope returned by this library
/// whose strings have not been released by another path.
#[no_mangle]
pub unsafe extern "C" fn loom_flags_result_free(result: *mut LoomFlagsResult) {
	if let Some(result) = result.as_mut() {
		free_c_string(&mut result.error);
	}
}

/// Releases the strings held by a [`LoomFlagsBoolResult`].
///
/// # Safety
///
/// Same contract as [`loom_flags_result_free`].
#[no_mangle]
pub unsafe extern "C" fn loom_flags_bool_result_free(result: *mut LoomFlagsBoolResult) {
	if let Some(result) = result.as_mut() {
		free_c_string(&mut result.error);
	}
}

/// Releases the strings held by a [`LoomFlagsStringResult`].
///
/// # Safety
///
/// Same contract as [`loom_flags_result_free`].
#[no_mangle]
pub unsafe extern "C" fn loom_flags_string_result_free(result: *mut LoomFlagsStringResult) {
	if let Some(result) = result.as_mut() {
		free_c_string(&mut result.value);
		free_c_string(&mut result.error);
	}
}

/// Returns the library version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn loom_flags_version() -> *const c_char {
	static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
	VERSION.as_ptr() as *const c_char
}
