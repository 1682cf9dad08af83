// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue gateway for the boardq command queue.
//!
//! [`QueueGateway`] turns a raw [`boardq_core::CommandStore`] into typed
//! command operations and owns the status-transition writes.
//! [`Subscription`] is the cancellable handle returned by its snapshot
//! subscriptions.

pub mod gateway;
pub mod subscription;

pub use gateway::QueueGateway;
pub use subscription::Subscription;
