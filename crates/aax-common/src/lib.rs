//! # aax-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the entire AAX harness workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives that the runtime, the
//! orchestration drivers and the verification suites build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod settings;
pub mod types;
