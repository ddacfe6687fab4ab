// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The evaluation core seam.
//!
//! The bridge never evaluates anything itself. Gate checks, config and layer
//! resolution, background sync and event buffering all live behind
//! [`EvaluationCore`]. The core also owns the process-wide initialization
//! flag; the bridge queries it live on every call and never caches it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreResult;
use crate::options::InitOptions;
use crate::user::User;

/// A resolved dynamic config or experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicConfig {
	pub name: String,
	pub value: Map<String, Value>,
	#[serde(rename = "ruleID")]
	pub rule_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group_name: Option<String>,
}

impl DynamicConfig {
	pub fn new(name: impl Into<String>, value: Map<String, Value>, rule_id: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value,
			rule_id: rule_id.into(),
			group_name: None,
		}
	}
}

/// A resolved layer.
///
/// `group_name` and `allocated_experiment_name` are core bookkeeping; the
/// bridge does not surface them to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
	pub name: String,
	pub value: Map<String, Value>,
	#[serde(rename = "ruleID")]
	pub rule_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub allocated_experiment_name: Option<String>,
}

impl Layer {
	pub fn new(name: impl Into<String>, value: Map<String, Value>, rule_id: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value,
			rule_id: rule_id.into(),
			group_name: None,
			allocated_experiment_name: None,
		}
	}
}

/// The operations the bridge consumes from an evaluation core.
///
/// Evaluation methods may fail with a [`CoreError`](crate::CoreError); they may
/// also panic; the bridge isolates both. Lifecycle methods are expected not to
/// fail observably.
pub trait EvaluationCore: Send + Sync {
	fn initialize(&self, sdk_key: &str);

	fn initialize_with_options(&self, sdk_key: &str, options: InitOptions);

	fn shutdown(&self);

	fn is_initialized(&self) -> bool;

	fn check_gate(&self, user: &User, gate_name: &str) -> CoreResult<bool>;

	fn get_config(&self, user: &User, config_name: &str) -> CoreResult<DynamicConfig>;

	fn get_experiment(&self, user: &User, experiment_name: &str) -> CoreResult<DynamicConfig>;

	fn get_layer(&self, user: &User, layer_name: &str) -> CoreResult<Layer>;

	fn log_event(&self, user: &User, event_name: &str) -> CoreResult<()>;
}

macro_rules! forward_core {
	($wrapper:ident) => {
		impl<C: EvaluationCore + ?Sized> EvaluationCore for $wrapper<C> {
			fn initialize(&self, sdk_key: &str) {
				(**self).initialize(sdk_key)
			}

			fn initialize_with_options(&self, sdk_key: &str, options: InitOptions) {
				(**self).initialize_with_options(sdk_key, options)
			}

			fn shutdown(&self) {
				(**self).shutdown()
			}

			fn is_initialized(&self) -> bool {
				(**self).is_initialized()
			}

			fn check_gate(&self, user: &User, gate_name: &str) -> CoreResult<bool> {
				(**self).check_gate(user, gate_name)
			}

			fn get_config(&self, user: &User, config_name: &str) -> CoreResult<DynamicConfig> {
				(**self).get_config(user, config_name)
			}

			fn get_experiment(&self, user: &User, experiment_name: &str) -> CoreResult<DynamicConfig> {
				(**self).get_experiment(user, experiment_name)
			}

			fn get_layer(&self, user: &User, layer_name: &str) -> CoreResult<Layer> {
				(**self).get_layer(user, layer_name)
			}

			fn log_event(&self, user: &User, event_name: &str) -> CoreResult<()> {
				(**self).log_event(user, event_name)
			}
		}
	};
}

forward_core!(Box);
forward_core!(Arc);

/// Type alias for a shared, dynamically dispatched core.
pub type SharedEvaluationCore = Arc<dyn EvaluationCore>;
