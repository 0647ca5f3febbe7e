// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! STOMP-over-WebSocket broker client for the Wicket support-chat stack.
//!
//! Three pieces, mirroring the delivery pipeline:
//! - [`connection::BrokerConnection`] owns the logical session: connect
//!   with the bearer credential, fixed-delay reconnection, teardown.
//! - [`registry::SubscriptionRegistry`] enforces at most one live
//!   subscription per conversation and feeds per-conversation queues.
//! - [`dispatch`] decodes inbound MESSAGE frames and routes them.
//!
//! The session layer consumes all of this through the
//! [`wicket_core::traits::PushChannel`] seam.

pub mod connection;
pub mod dispatch;
pub mod frame;
pub mod registry;

pub use connection::BrokerConnection;
pub use registry::{RouteOutcome, SubscriptionRegistry};
