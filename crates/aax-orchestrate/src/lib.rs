//! # aax-orchestrate
//!
//! Drivers for the two orchestration CLIs the harness exercises.
//!
//! - **Compose**: `docker compose` against the repository's compose project.
//! - **Kube**: `kubectl` against the configured cluster and namespace.
//! - **Object refs**: parsing of `kubectl -o name` output.
//! - **Parse**: decoding helpers for structured CLI output.
//!
//! Every driver operation returns the tool's raw
//! [`ExecOutput`](aax_common::types::ExecOutput); interpretation lives in
//! the parse helpers and in the verification suites.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod compose;
pub mod kube;
pub mod object_ref;
pub mod parse;
