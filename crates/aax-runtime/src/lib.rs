//! External process execution for the AAX harness.
//!
//! Every interaction with the container runtime and the cluster goes
//! through a [`CommandRunner`](command::CommandRunner). On top of it sit the
//! image build/run invoker, the bounded polling helper and the stack guard
//! that scopes a brought-up topology.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod command;
pub mod guard;
pub mod image;
pub mod poll;
pub mod tools;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
