// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Wicket integration tests.
//!
//! Provides mock implementations of the core collaborator seams plus a
//! harness that assembles a complete session over them.

pub mod harness;
pub mod mock_channel;
pub mod mock_store;

pub use harness::{StaticCredentials, StaticIdentity, TestHarness, TestHarnessBuilder};
pub use mock_channel::MockPushChannel;
pub use mock_store::{sample_conversation, sample_message, MockStore};
