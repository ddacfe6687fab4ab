// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Boundary adapter between host-language bindings and a feature flags
//! evaluation core.
//!
//! Host bindings (Swift, via `loom-flags-ffi`) can only pass strings and
//! primitives. This crate turns those into typed calls on an
//! [`EvaluationCore`] and turns the answers back into flat envelopes that are
//! safe to hand across a foreign-function boundary.
//!
//! ```text
//! host strings → parse_user_json (defaults + merge patch) → EvaluationCore → envelope
//! ```
//!
//! # Features
//!
//! - **Partial users**: caller JSON is merge-patched onto a complete default
//!   user, so `""` and `{}` are valid users
//! - **Uniform envelopes**: [`UnitResult`], [`BoolResult`] and [`StringResult`];
//!   `ok` is true exactly when `error` is empty
//! - **Fault isolation**: core errors and panics become failed envelopes
//! - **Curated layers**: only `name`, `value` and `ruleID` leave the bridge
//! - **Local core**: [`LocalCore`] serves overrides in-process
//!
//! # Example
//!
//! ```
//! use loom_flags_bridge::{FlagsBridge, LocalCore};
//!
//! let bridge = FlagsBridge::new(LocalCore::new());
//! bridge.core().override_gate("new_checkout", true);
//!
//! assert!(bridge.initialize("client-key").ok);
//!
//! let gate = bridge.check_gate_json(r#"{"userID":"user-123"}"#, "new_checkout");
//! assert!(gate.ok && gate.value);
//!
//! let layer = bridge.get_layer_json("", "onboarding");
//! assert_eq!(layer.value, r#"{"name":"onboarding","value":{},"ruleID":"default"}"#);
//! ```

pub mod bridge;
pub mod envelope;
pub mod error;
pub mod evaluation;
pub mod local;
pub mod merge;
pub mod options;
pub mod user;

pub use bridge::{FlagsBridge, Operation};
pub use envelope::{BoolResult, StringResult, UnitResult};
pub use error::{BridgeError, CoreError, CoreResult, Result};
pub use evaluation::{DynamicConfig, EvaluationCore, Layer, SharedEvaluationCore};
pub use local::{LocalCore, LoggedEvent, DEFAULT_RULE_ID, OVERRIDE_RULE_ID};
pub use merge::merge_patch;
pub use options::InitOptions;
pub use user::{default_user_json, parse_user_json, User};
