// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process evaluation core.
//!
//! [`LocalCore`] serves values from override tables instead of rulesets and
//! never touches the network. It backs local mode in the host binding and is
//! the core the FFI surface uses unless another one is installed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::evaluation::{DynamicConfig, EvaluationCore, Layer};
use crate::options::InitOptions;
use crate::user::User;

/// Rule ID reported for values served from an override.
pub const OVERRIDE_RULE_ID: &str = "override";
/// Rule ID reported when nothing matches.
pub const DEFAULT_RULE_ID: &str = "default";

/// An event recorded by [`LocalCore::log_event`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEvent {
	pub event_name: String,
	pub user: User,
	pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LocalState {
	sdk_key: Option<String>,
	options: InitOptions,
	gates: HashMap<String, bool>,
	configs: HashMap<String, Map<String, Value>>,
	layers: HashMap<String, Map<String, Value>>,
	events: VecDeque<LoggedEvent>,
}

/// Evaluation core backed by in-memory overrides.
#[derive(Debug, Default)]
pub struct LocalCore {
	initialized: AtomicBool,
	state: RwLock<LocalState>,
}

impl LocalCore {
	pub fn new() -> Self {
		Self::default()
	}

	fn read(&self) -> RwLockReadGuard<'_, LocalState> {
		self.state.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, LocalState> {
		self.state.write().unwrap_or_else(PoisonError::into_inner)
	}

	fn ensure_initialized(&self) -> CoreResult<()> {
		if self.initialized.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(CoreError::NotInitialized)
		}
	}

	/// Serves `value` for `gate_name` from now on.
	pub fn override_gate(&self, gate_name: impl Into<String>, value: bool) -> &Self {
		self.write().gates.insert(gate_name.into(), value);
		self
	}

	/// Serves `value` for the config or experiment `config_name`.
	pub fn override_config(&self, config_name: impl Into<String>, value: Map<String, Value>) -> &Self {
		self.write().configs.insert(config_name.into(), value);
		self
	}

	/// Serves `value` as the parameters of `layer_name`.
	pub fn override_layer(&self, layer_name: impl Into<String>, value: Map<String, Value>) -> &Self {
		self.write().layers.insert(layer_name.into(), value);
		self
	}

	/// Drops every override.
	pub fn clear_overrides(&self) {
		let mut state = self.write();
		state.gates.clear();
		state.configs.clear();
		state.layers.clear();
	}

	/// Options applied by the most recent initialize call.
	pub fn options(&self) -> InitOptions {
		self.read().options.clone()
	}

	/// SDK key passed to the most recent initialize call.
	pub fn sdk_key(&self) -> Option<String> {
		self.read().sdk_key.clone()
	}

	/// Takes every buffered event, oldest first.
	pub fn drain_events(&self) -> Vec<LoggedEvent> {
		self.write().events.drain(..).collect()
	}

	/// Number of buffered events.
	pub fn pending_events(&self) -> usize {
		self.read().events.len()
	}

	fn resolve_config(&self, name: &str) -> DynamicConfig {
		match self.read().configs.get(name) {
			Some(value) => DynamicConfig::new(name, value.clone(), OVERRIDE_RULE_ID),
			None => DynamicConfig::new(name, Map::new(), DEFAULT_RULE_ID),
		}
	}
}

impl EvaluationCore for LocalCore {
	fn initialize(&self, sdk_key: &str) {
		self.initialize_with_options(sdk_key, InitOptions::default());
	}

	fn initialize_with_options(&self, sdk_key: &str, options: InitOptions) {
		{
			let mut state = self.write();
			state.sdk_key = Some(sdk_key.to_string());
			state.options = options;
		}
		self.initialized.store(true, Ordering::SeqCst);
		info!("Local flags core initialized");
	}

	fn shutdown(&self) {
		self.initialized.store(false, Ordering::SeqCst);
		info!(pending_events = self.pending_events(), "Local flags core shut down");
	}

	fn is_initialized(&self) -> bool {
		self.initialized.load(Ordering::SeqCst)
	}

	fn check_gate(&self, _user: &User, gate_name: &str) -> CoreResult<bool> {
		self.ensure_initialized()?;
		Ok(self.read().gates.get(gate_name).copied().unwrap_or(false))
	}

	fn get_config(&self, _user: &User, config_name: &str) -> CoreResult<DynamicConfig> {
		self.ensure_initialized()?;
		Ok(self.resolve_config(config_name))
	}

	fn get_experiment(&self, _user: &User, experiment_name: &str) -> CoreResult<DynamicConfig> {
		self.ensure_initialized()?;
		Ok(self.resolve_config(experiment_name))
	}

	fn get_layer(&self, _user: &User, layer_name: &str) -> CoreResult<Layer> {
		self.ensure_initialized()?;
		let layer = match self.read().layers.get(layer_name) {
			Some(value) => Layer::new(layer_name, value.clone(), OVERRIDE_RULE_ID),
			None => Layer::new(layer_name, Map::new(), DEFAULT_RULE_ID),
		};
		Ok(layer)
	}

	fn log_event(&self, user: &User, event_name: &str) -> CoreResult<()> {
		self.ensure_initialized()?;

		let mut state = self.write();
		let capacity = usize::try_from(state.options.logging_max_buffer_size).unwrap_or(0);
		if capacity == 0 {
			debug!(event_name = %event_name, "Event buffer disabled, dropping event");
			return Ok(());
		}

		while state.events.len() >= capacity {
			if let Some(dropped) = state.events.pop_front() {
				warn!(
					event_name = %dropped.event_name,
					capacity,
					"Dropped event due to buffer overflow"
				);
			}
		}

		state.events.push_back(LoggedEvent {
			event_name: event_name.to_string(),
			user: user.clone(),
			timestamp: Utc::now(),
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn params(value: Value) -> Map<String, Value> {
		value.as_object().cloned().unwrap()
	}

	fn running_core() -> LocalCore {
		let core = LocalCore::new();
		core.initialize("client-local");
		core
	}

	#[test]
	fn starts_uninitialized() {
		let core = LocalCore::new();
		assert!(!core.is_initialized());
		assert_eq!(core.sdk_key(), None);
	}

	#[test]
	fn evaluation_before_initialize_faults() {
		let core = LocalCore::new();
		let user = User::default();
		assert_eq!(core.check_gate(&user, "g"), Err(CoreError::NotInitialized));
		assert_eq!(core.get_layer(&user, "l"), Err(CoreError::NotInitialized));
		assert_eq!(core.log_event(&user, "e"), Err(CoreError::NotInitialized));
	}

	#[test]
	fn initialize_records_key_and_options() {
		let core = LocalCore::new();
		let options = InitOptions::from_host("http://localhost:3000", true, 5, 6, 7);
		core.initialize_with_options("server-key", options.clone());

		assert!(core.is_initialized());
		assert_eq!(core.sdk_key().as_deref(), Some("server-key"));
		assert_eq!(core.options(), options);
	}

	#[test]
	fn shutdown_clears_flag() {
		let core = running_core();
		core.shutdown();
		assert!(!core.is_initialized());
	}

	#[test]
	fn gates_default_to_false() {
		let core = running_core();
		core.override_gate("beta_nav", true);
		let user = User::new("u");
		assert_eq!(core.check_gate(&user, "beta_nav"), Ok(true));
		assert_eq!(core.check_gate(&user, "unknown"), Ok(false));
	}

	#[test]
	fn configs_and_experiments_share_overrides() {
		let core = running_core();
		core.override_config("pricing", params(json!({"tier": "gold"})));
		let user = User::default();

		let config = core.get_config(&user, "pricing").unwrap();
		assert_eq!(config.rule_id, OVERRIDE_RULE_ID);
		assert_eq!(config.value.get("tier"), Some(&json!("gold")));

		let experiment = core.get_experiment(&user, "pricing").unwrap();
		assert_eq!(experiment, config);

		let missing = core.get_config(&user, "nothing").unwrap();
		assert_eq!(missing, DynamicConfig::new("nothing", Map::new(), DEFAULT_RULE_ID));
	}

	#[test]
	fn layers_resolve_from_overrides() {
		let core = running_core();
		core.override_layer("checkout", params(json!({"steps": 3})));
		let layer = core.get_layer(&User::default(), "checkout").unwrap();
		assert_eq!(layer.name, "checkout");
		assert_eq!(layer.rule_id, OVERRIDE_RULE_ID);
		assert_eq!(layer.value.get("steps"), Some(&json!(3)));
	}

	#[test]
	fn clear_overrides_restores_defaults() {
		let core = running_core();
		core.override_gate("g", true).override_layer("l", Map::new());
		core.clear_overrides();
		assert_eq!(core.check_gate(&User::default(), "g"), Ok(false));
		assert_eq!(core.get_layer(&User::default(), "l").unwrap().rule_id, DEFAULT_RULE_ID);
	}

	#[test]
	fn events_are_buffered_in_order() {
		let core = running_core();
		let user = User::new("u-1");
		core.log_event(&user, "signup").unwrap();
		core.log_event(&user, "purchase").unwrap();

		let events = core.drain_events();
		let names: Vec<_> = events.iter().map(|e| e.event_name.as_str()).collect();
		assert_eq!(names, ["signup", "purchase"]);
		assert_eq!(events[0].user, user);
		assert_eq!(core.pending_events(), 0);
	}

	#[test]
	fn event_buffer_drops_oldest_when_full() {
		let core = LocalCore::new();
		core.initialize_with_options("k", InitOptions::default().with_logging_max_buffer_size(2));
		let user = User::default();
		for name in ["a", "b", "c"] {
			core.log_event(&user, name).unwrap();
		}
		let names: Vec<_> = core.drain_events().into_iter().map(|e| e.event_name).collect();
		assert_eq!(names, ["b", "c"]);
	}

	#[test]
	fn non_positive_buffer_keeps_nothing() {
		for size in [0, -5] {
			let core = LocalCore::new();
			core.initialize_with_options("k", InitOptions::default().with_logging_max_buffer_size(size));
			core.log_event(&User::default(), "ignored").unwrap();
			assert_eq!(core.pending_events(), 0);
		}
	}

	#[test]
	fn events_survive_shutdown() {
		let core = running_core();
		core.log_event(&User::default(), "late").unwrap();
		core.shutdown();
		assert_eq!(core.drain_events().len(), 1);
	}
}
