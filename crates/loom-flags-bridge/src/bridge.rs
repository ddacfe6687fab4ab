// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The boundary adapter between host bindings and an evaluation core.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::envelope::{BoolResult, StringResult, UnitResult};
use crate::error::{BridgeError, CoreResult, Result};
use crate::evaluation::{EvaluationCore, Layer};
use crate::options::InitOptions;
use crate::user::{parse_user_json, User};

/// A bridge call, used for fallback messages and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Initialize,
	Shutdown,
	CheckGate,
	GetConfig,
	GetExperiment,
	GetLayer,
	LogEvent,
}

impl Operation {
	pub fn as_str(&self) -> &'static str {
		match self {
			Operation::Initialize => "initialize",
			Operation::Shutdown => "shutdown",
			Operation::CheckGate => "check_gate",
			Operation::GetConfig => "get_config",
			Operation::GetExperiment => "get_experiment",
			Operation::GetLayer => "get_layer",
			Operation::LogEvent => "log_event",
		}
	}

	/// Message reported when a core fault carries no description.
	pub fn fallback_message(&self) -> &'static str {
		match self {
			Operation::Initialize => "Failed to initialize",
			Operation::Shutdown => "Failed to shut down",
			Operation::CheckGate => "Failed to check gate",
			Operation::GetConfig => "Failed to get config",
			Operation::GetExperiment => "Failed to get experiment",
			Operation::GetLayer => "Failed to get layer",
			Operation::LogEvent => "Failed to log event",
		}
	}
}

impl std::fmt::Display for Operation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The subset of a layer the host sees, in wire order.
#[derive(Serialize)]
struct LayerView<'a> {
	name: &'a str,
	value: &'a Map<String, Value>,
	#[serde(rename = "ruleID")]
	rule_id: &'a str,
}

impl<'a> From<&'a Layer> for LayerView<'a> {
	fn from(layer: &'a Layer) -> Self {
		Self {
			name: &layer.name,
			value: &layer.value,
			rule_id: &layer.rule_id,
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		String::new()
	}
}

/// Runs one core call, turning a returned fault or a panic into a
/// [`BridgeError::CoreFault`].
fn isolate<T>(operation: Operation, call: impl FnOnce() -> CoreResult<T>) -> Result<T> {
	match panic::catch_unwind(AssertUnwindSafe(call)) {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(fault)) => Err(BridgeError::core_fault(
			fault.to_string(),
			operation.fallback_message(),
		)),
		Err(payload) => {
			let message = panic_message(payload.as_ref());
			error!(operation = %operation, panic = %message, "Evaluation core panicked");
			Err(BridgeError::core_fault(message, operation.fallback_message()))
		}
	}
}

fn to_json<T: Serialize>(operation: Operation, payload: &T) -> Result<String> {
	serde_json::to_string(payload).map_err(|e| BridgeError::CoreFault {
		message: format!("{}: {e}", operation.fallback_message()),
	})
}

fn report<T>(operation: Operation, name: &str, result: &Result<T>) {
	if let Err(e) = result {
		warn!(operation = %operation, name = %name, error = %e, "Flags bridge call failed");
	}
}

/// Adapts a typed [`EvaluationCore`] to the string/JSON calling convention of
/// a host binding.
///
/// Every operation is synchronous, runs on the caller's thread and returns an
/// envelope; nothing panics or unwinds out of it. The bridge holds no state of
/// its own: initialization is whatever the core reports at the time of the
/// call.
#[derive(Debug, Default)]
pub struct FlagsBridge<C> {
	core: C,
}

impl<C: EvaluationCore> FlagsBridge<C> {
	pub fn new(core: C) -> Self {
		Self { core }
	}

	/// The wrapped core.
	pub fn core(&self) -> &C {
		&self.core
	}

	pub fn into_core(self) -> C {
		self.core
	}

	pub fn is_initialized(&self) -> bool {
		self.core.is_initialized()
	}

	/// Initializes the core with its default options.
	///
	/// Fails if the core is already running; re-initialization is rejected,
	/// never merged.
	pub fn initialize(&self, sdk_key: &str) -> UnitResult {
		let result = self.start(|| {
			self.core.initialize(sdk_key);
			Ok(())
		});
		report(Operation::Initialize, "", &result);
		result.into()
	}

	/// Initializes the core with options given as host primitives.
	///
	/// An empty `api` keeps the core's default endpoint. The remaining values
	/// are passed through as-is.
	pub fn initialize_with_options(
		&self,
		sdk_key: &str,
		api: &str,
		local_mode: bool,
		rulesets_sync_interval_ms: i32,
		logging_interval_ms: i32,
		logging_max_buffer_size: i32,
	) -> UnitResult {
		let result = self.start(|| {
			let options = InitOptions::from_host(
				api,
				local_mode,
				rulesets_sync_interval_ms,
				logging_interval_ms,
				logging_max_buffer_size,
			);
			self.core.initialize_with_options(sdk_key, options);
			Ok(())
		});
		report(Operation::Initialize, "", &result);
		result.into()
	}

	/// Initializes the core with options given as JSON text.
	///
	/// Empty text means default options. The already-initialized check runs
	/// before the options are parsed.
	pub fn initialize_with_options_json(&self, sdk_key: &str, options_json: &str) -> UnitResult {
		let result = self.start(|| {
			let options = InitOptions::from_json(options_json)?;
			self.core.initialize_with_options(sdk_key, options);
			Ok(())
		});
		report(Operation::Initialize, "", &result);
		result.into()
	}

	fn start(&self, init: impl FnOnce() -> Result<()>) -> Result<()> {
		if self.core.is_initialized() {
			return Err(BridgeError::AlreadyInitialized);
		}
		isolate(Operation::Initialize, || Ok(init()))??;
		info!("Flags SDK initialized");
		Ok(())
	}

	pub fn shutdown(&self) -> UnitResult {
		let result = self.try_shutdown();
		report(Operation::Shutdown, "", &result);
		result.into()
	}

	fn try_shutdown(&self) -> Result<()> {
		if !self.core.is_initialized() {
			return Err(BridgeError::NotInitialized);
		}
		isolate(Operation::Shutdown, || {
			self.core.shutdown();
			Ok(())
		})?;
		info!("Flags SDK shut down");
		Ok(())
	}

	/// Checks the initialization flag, then builds the user.
	///
	/// The user JSON is not looked at until the core reports it is running.
	fn prepare(&self, operation: Operation, name: &str, user_json: &str) -> Result<User> {
		if !self.core.is_initialized() {
			return Err(BridgeError::NotInitialized);
		}
		debug!(operation = %operation, name = %name, "Evaluating");
		parse_user_json(user_json)
	}

	pub fn check_gate_json(&self, user_json: &str, gate_name: &str) -> BoolResult {
		let operation = Operation::CheckGate;
		let result = self
			.prepare(operation, gate_name, user_json)
			.and_then(|user| isolate(operation, || self.core.check_gate(&user, gate_name)));
		report(operation, gate_name, &result);
		result.into()
	}

	/// Returns the config serialized whole, as the core shaped it.
	pub fn get_config_json(&self, user_json: &str, config_name: &str) -> StringResult {
		let operation = Operation::GetConfig;
		let result = self.prepare(operation, config_name, user_json).and_then(|user| {
			let config = isolate(operation, || self.core.get_config(&user, config_name))?;
			to_json(operation, &config)
		});
		report(operation, config_name, &result);
		result.into()
	}

	/// Returns the experiment serialized whole, as the core shaped it.
	pub fn get_experiment_json(&self, user_json: &str, experiment_name: &str) -> StringResult {
		let operation = Operation::GetExperiment;
		let result = self.prepare(operation, experiment_name, user_json).and_then(|user| {
			let experiment = isolate(operation, || self.core.get_experiment(&user, experiment_name))?;
			to_json(operation, &experiment)
		});
		report(operation, experiment_name, &result);
		result.into()
	}

	/// Returns `{"name", "value", "ruleID"}` for the layer; other layer fields
	/// stay inside the core.
	pub fn get_layer_json(&self, user_json: &str, layer_name: &str) -> StringResult {
		let operation = Operation::GetLayer;
		let result = self.prepare(operation, layer_name, user_json).and_then(|user| {
			let layer = isolate(operation, || self.core.get_layer(&user, layer_name))?;
			to_json(operation, &LayerView::from(&layer))
		});
		report(operation, layer_name, &result);
		result.into()
	}

	pub fn log_event_json(&self, user_json: &str, event_name: &str) -> UnitResult {
		let operation = Operation::LogEvent;
		let result = self
			.prepare(operation, event_name, user_json)
			.and_then(|user| isolate(operation, || self.core.log_event(&user, event_name)));
		report(operation, event_name, &result);
		result.into()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::CoreError;
	use crate::evaluation::DynamicConfig;
	use serde_json::json;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::sync::Mutex;

	/// How [`FakeCore`] answers evaluation calls.
	#[derive(Debug, Clone)]
	enum Behavior {
		Answer,
		Fault(CoreError),
		Panic(&'static str),
		PanicOpaque,
	}

	#[derive(Debug)]
	struct FakeCore {
		initialized: AtomicBool,
		behavior: Behavior,
		evaluations: AtomicUsize,
		last_user: Mutex<Option<User>>,
		last_options: Mutex<Option<InitOptions>>,
	}

	impl FakeCore {
		fn new(behavior: Behavior) -> Self {
			Self {
				initialized: AtomicBool::new(false),
				behavior,
				evaluations: AtomicUsize::new(0),
				last_user: Mutex::new(None),
				last_options: Mutex::new(None),
			}
		}

		fn running(behavior: Behavior) -> Self {
			let core = Self::new(behavior);
			core.initialized.store(true, Ordering::SeqCst);
			core
		}

		fn answer<T>(&self, user: &User, value: T) -> CoreResult<T> {
			self.evaluations.fetch_add(1, Ordering::SeqCst);
			*self.last_user.lock().unwrap() = Some(user.clone());
			match &self.behavior {
				Behavior::Answer => Ok(value),
				Behavior::Fault(fault) => Err(fault.clone()),
				Behavior::Panic(message) => panic!("{}", message),
				Behavior::PanicOpaque => std::panic::panic_any(42_u8),
			}
		}
	}

	impl EvaluationCore for FakeCore {
		fn initialize(&self, _sdk_key: &str) {
			self.initialized.store(true, Ordering::SeqCst);
		}

		fn initialize_with_options(&self, _sdk_key: &str, options: InitOptions) {
			*self.last_options.lock().unwrap() = Some(options);
			self.initialized.store(true, Ordering::SeqCst);
		}

		fn shutdown(&self) {
			self.initialized.store(false, Ordering::SeqCst);
		}

		fn is_initialized(&self) -> bool {
			self.initialized.load(Ordering::SeqCst)
		}

		fn check_gate(&self, user: &User, _gate_name: &str) -> CoreResult<bool> {
			self.answer(user, true)
		}

		fn get_config(&self, user: &User, config_name: &str) -> CoreResult<DynamicConfig> {
			let mut value = Map::new();
			value.insert("limit".to_string(), json!(10));
			self.answer(user, DynamicConfig::new(config_name, value, "rule_cfg"))
		}

		fn get_experiment(&self, user: &User, experiment_name: &str) -> CoreResult<DynamicConfig> {
			let config = DynamicConfig {
				group_name: Some("Test".to_string()),
				..DynamicConfig::new(experiment_name, Map::new(), "rule_exp")
			};
			self.answer(user, config)
		}

		fn get_layer(&self, user: &User, layer_name: &str) -> CoreResult<Layer> {
			let mut value = Map::new();
			value.insert("x".to_string(), json!(1));
			let layer = Layer {
				group_name: Some("g1".to_string()),
				allocated_experiment_name: Some("exp_a".to_string()),
				..Layer::new(layer_name, value, "default")
			};
			self.answer(user, layer)
		}

		fn log_event(&self, user: &User, _event_name: &str) -> CoreResult<()> {
			self.answer(user, ())
		}
	}

	fn bridge(behavior: Behavior) -> FlagsBridge<FakeCore> {
		FlagsBridge::new(FakeCore::running(behavior))
	}

	#[test]
	fn initialize_twice_is_rejected() {
		let bridge = FlagsBridge::new(FakeCore::new(Behavior::Answer));
		assert_eq!(bridge.initialize("secret-key"), UnitResult::success());

		let second = bridge.initialize("secret-key");
		assert!(!second.ok);
		assert_eq!(second.error, BridgeError::AlreadyInitialized.to_string());
		assert!(bridge.is_initialized());
	}

	#[test]
	fn initialize_with_options_rejected_when_running() {
		let bridge = bridge(Behavior::Answer);
		let result = bridge.initialize_with_options("k", "https://x", true, 1, 2, 3);
		assert_eq!(result.error, BridgeError::AlreadyInitialized.to_string());
		assert!(bridge.core().last_options.lock().unwrap().is_none());
	}

	#[test]
	fn initialize_with_options_skips_empty_api() {
		let bridge = FlagsBridge::new(FakeCore::new(Behavior::Answer));
		assert!(bridge.initialize_with_options("k", "", false, 10, 1, 100).ok);

		let options = bridge.core().last_options.lock().unwrap().clone().unwrap();
		assert_eq!(options.api, None);
		assert!(!options.local_mode);
		assert_eq!(options.rulesets_sync_interval_ms, 10);
		assert_eq!(options.logging_interval_ms, 1);
		assert_eq!(options.logging_max_buffer_size, 100);
	}

	#[test]
	fn initialize_with_options_json_bad_options_leave_core_stopped() {
		let bridge = FlagsBridge::new(FakeCore::new(Behavior::Answer));
		let result = bridge.initialize_with_options_json("k", "[1]");
		assert_eq!(result.error, "optionsJson must be a JSON object");
		assert!(!bridge.is_initialized());

		assert!(bridge.initialize_with_options_json("k", r#"{"api":"https://y"}"#).ok);
		let options = bridge.core().last_options.lock().unwrap().clone().unwrap();
		assert_eq!(options.api.as_deref(), Some("https://y"));
	}

	#[test]
	fn shutdown_before_initialize_fails() {
		let bridge = FlagsBridge::new(FakeCore::new(Behavior::Answer));
		let result = bridge.shutdown();
		assert!(!result.ok);
		assert_eq!(result.error, BridgeError::NotInitialized.to_string());
	}

	#[test]
	fn shutdown_then_initialize_again() {
		let bridge = bridge(Behavior::Answer);
		assert!(bridge.shutdown().ok);
		assert!(!bridge.is_initialized());
		assert!(bridge.initialize("k").ok);
	}

	#[test]
	fn evaluations_before_initialize_skip_parsing() {
		let bridge = FlagsBridge::new(FakeCore::new(Behavior::Answer));
		let not_init = BridgeError::NotInitialized.to_string();

		for user_json in ["", "{}", "[]", "{broken"] {
			assert_eq!(bridge.check_gate_json(user_json, "g"), BoolResult::failure(&not_init));
			assert_eq!(bridge.get_config_json(user_json, "c"), StringResult::failure(&not_init));
			assert_eq!(bridge.get_experiment_json(user_json, "e"), StringResult::failure(&not_init));
			assert_eq!(bridge.get_layer_json(user_json, "l"), StringResult::failure(&not_init));
			assert_eq!(bridge.log_event_json(user_json, "ev"), UnitResult::failure(&not_init));
		}
		assert_eq!(bridge.core().evaluations.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn parse_failures_never_reach_core() {
		let bridge = bridge(Behavior::Answer);

		let gate = bridge.check_gate_json("[1]", "g");
		assert_eq!(gate, BoolResult::failure("userJson must be a JSON object"));

		let config = bridge.get_config_json("{", "c");
		assert!(!config.ok);
		assert!(config.error.starts_with("userJson is not valid JSON"));

		let layer = bridge.get_layer_json(r#"{"custom":"x"}"#, "l");
		assert!(!layer.ok);
		assert!(layer.error.starts_with("userJson does not match the expected schema"));

		assert_eq!(bridge.core().evaluations.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn check_gate_passes_value_and_user() {
		let bridge = bridge(Behavior::Answer);
		let result = bridge.check_gate_json(r#"{"userID":"u-7","country":"NZ"}"#, "g");
		assert_eq!(result, BoolResult::success(true));

		let user = bridge.core().last_user.lock().unwrap().clone().unwrap();
		assert_eq!(user.user_id, "u-7");
		assert_eq!(user.country, "NZ");
		assert_eq!(user.email, "");
	}

	#[test]
	fn config_is_serialized_whole() {
		let bridge = bridge(Behavior::Answer);
		let result = bridge.get_config_json("", "limits");
		assert!(result.ok);
		let json: Value = serde_json::from_str(&result.value).unwrap();
		assert_eq!(json, json!({"name": "limits", "value": {"limit": 10}, "ruleID": "rule_cfg"}));
	}

	#[test]
	fn experiment_keeps_core_fields() {
		let bridge = bridge(Behavior::Answer);
		let result = bridge.get_experiment_json("{}", "exp");
		let json: Value = serde_json::from_str(&result.value).unwrap();
		assert_eq!(json["groupName"], "Test");
		assert_eq!(json["ruleID"], "rule_exp");
	}

	#[test]
	fn layer_is_curated_to_three_fields_in_order() {
		let bridge = bridge(Behavior::Answer);
		let result = bridge.get_layer_json("{}", "my_layer");
		assert_eq!(
			result,
			StringResult::success(r#"{"name":"my_layer","value":{"x":1},"ruleID":"default"}"#)
		);
	}

	#[test]
	fn log_event_succeeds_without_payload() {
		let bridge = bridge(Behavior::Answer);
		assert_eq!(bridge.log_event_json("", "clicked"), UnitResult::success());
		assert_eq!(bridge.core().evaluations.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn core_faults_keep_their_message() {
		let bridge = bridge(Behavior::Fault(CoreError::fault("ruleset unavailable")));
		assert_eq!(bridge.check_gate_json("", "g"), BoolResult::failure("ruleset unavailable"));
		assert_eq!(bridge.get_config_json("", "c"), StringResult::failure("ruleset unavailable"));
		assert_eq!(bridge.get_experiment_json("", "e"), StringResult::failure("ruleset unavailable"));
		assert_eq!(bridge.get_layer_json("", "l"), StringResult::failure("ruleset unavailable"));
		assert_eq!(bridge.log_event_json("", "ev"), UnitResult::failure("ruleset unavailable"));
		assert!(bridge.is_initialized());
	}

	#[test]
	fn messageless_faults_use_fallback() {
		for behavior in [Behavior::Fault(CoreError::Unspecified), Behavior::PanicOpaque] {
			let bridge = bridge(behavior);
			assert_eq!(bridge.check_gate_json("", "g").error, "Failed to check gate");
			assert_eq!(bridge.get_config_json("", "c").error, "Failed to get config");
			assert_eq!(bridge.get_experiment_json("", "e").error, "Failed to get experiment");
			assert_eq!(bridge.get_layer_json("", "l").error, "Failed to get layer");
			assert_eq!(bridge.log_event_json("", "ev").error, "Failed to log event");
		}
	}

	#[test]
	fn panics_are_contained() {
		let bridge = bridge(Behavior::Panic("index out of range"));
		let gate = bridge.check_gate_json("", "g");
		assert_eq!(gate, BoolResult::failure("index out of range"));

		// Each operation is isolated on its own.
		let layer = bridge.get_layer_json("", "l");
		assert_eq!(layer, StringResult::failure("index out of range"));
		assert!(bridge.is_initialized());
	}

	#[test]
	fn operation_names() {
		assert_eq!(Operation::GetLayer.to_string(), "get_layer");
		assert_eq!(Operation::Shutdown.fallback_message(), "Failed to shut down");
	}

	#[test]
	fn panic_message_reads_string_payloads() {
		let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
		assert_eq!(panic_message(owned.as_ref()), "owned");
		let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
		assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
		let other: Box<dyn Any + Send> = Box::new(7_i32);
		assert_eq!(panic_message(other.as_ref()), "");
	}
}
