// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! C representations of the bridge envelopes.
//!
//! Strings are owned by Rust until the host passes the envelope back to the
//! matching `*_free` function. An empty string is represented as null.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use loom_flags_bridge::{BoolResult, StringResult, UnitResult};

/// Moves `text` onto the heap as a C string. Empty text becomes null.
///
/// Interior NUL bytes cannot be represented and are removed.
pub(crate) fn into_c_string(text: String) -> *mut c_char {
	if text.is_empty() {
		return ptr::null_mut();
	}
	let text = if text.contains('\0') {
		text.replace('\0', "")
	} else {
		text
	};
	CString::new(text)
		.map(CString::into_raw)
		.unwrap_or(ptr::null_mut())
}

/// Releases a string produced by [`into_c_string`] and nulls the slot.
///
/// # Safety
///
/// `*slot` must be null or a pointer obtained from [`into_c_string`] that has
/// not been freed yet.
pub(crate) unsafe fn free_c_string(slot: &mut *mut c_char) {
	if !slot.is_null() {
		drop(CString::from_raw(*slot));
		*slot = ptr::null_mut();
	}
}

/// Borrows a host string argument.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid for
/// the duration of the call.
pub(crate) unsafe fn read_arg<'a>(ptr: *const c_char, argument: &str) -> Result<&'a str, String> {
	if ptr.is_null() {
		return Err(format!("invalid {argument}: null pointer"));
	}
	CStr::from_ptr(ptr)
		.to_str()
		.map_err(|e| format!("invalid {argument}: {e}"))
}

/// `Result{ok, error}` for the host.
#[repr(C)]
#[derive(Debug)]
pub struct LoomFlagsResult {
	pub ok: bool,
	pub error: *mut c_char,
}

/// `BoolResult{ok, value, error}` for the host.
#[repr(C)]
#[derive(Debug)]
pub struct LoomFlagsBoolResult {
	pub ok: bool,
	pub value: bool,
	pub error: *mut c_char,
}

/// `StringResult{ok, value, error}` for the host. `value` is JSON text.
#[repr(C)]
#[derive(Debug)]
pub struct LoomFlagsStringResult {
	pub ok: bool,
	pub value: *mut c_char,
	pub error: *mut c_char,
}

impl From<UnitResult> for LoomFlagsResult {
	fn from(result: UnitResult) -> Self {
		Self {
			ok: result.ok,
			error: into_c_string(result.error),
		}
	}
}

impl From<BoolResult> for LoomFlagsBoolResult {
	fn from(result: BoolResult) -> Self {
		Self {
			ok: result.ok,
			value: result.value,
			error: into_c_string(result.error),
		}
	}
}

impl From<StringResult> for LoomFlagsStringResult {
	fn from(result: StringResult) -> Self {
		Self {
			ok: result.ok,
			value: into_c_string(result.value),
			error: into_c_string(result.error),
		}
	}
}
