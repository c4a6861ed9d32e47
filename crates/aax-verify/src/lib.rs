//! # aax-verify
//!
//! Verification suites for the AAX images and deployments.
//!
//! A [`Contract`](contract::Contract) describes what each suite checks:
//! which images to build and what their containers must report, which
//! compose services must come up healthy, and which cluster objects must
//! exist, become ready and be bound. The suites drive the external CLIs
//! through `aax-runtime` and `aax-orchestrate` and record one outcome per
//! check in a [`SuiteReport`](report::SuiteReport).

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cluster;
pub mod compose;
pub mod contract;
pub mod expect;
pub mod images;
pub mod plan;
pub mod report;
pub mod suite;
