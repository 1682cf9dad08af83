// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot subscriptions driven by store change notifications.
//!
//! Each subscription owns one delivery task. On every change that may affect
//! its board the task re-reads the full snapshot and hands it to the callback,
//! skipping snapshots identical to the last one delivered. Callbacks run under
//! a delivery gate so that [`Subscription::unsubscribe`] can wait out an
//! in-flight delivery.

use std::sync::Arc;

use boardq_core::{BoardId, BoardqError, StoreChange};
use futures::future::BoxFuture;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Re-reads the current snapshot of a subscription.
pub(crate) type Fetch<T> =
    Box<dyn Fn() -> BoxFuture<'static, Result<T, BoardqError>> + Send + Sync>;

/// Handle to a live subscription.
///
/// Dropping the handle stops future deliveries without waiting for one that
/// is already running.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    gate: Arc<Mutex<()>>,
}

impl Subscription {
    /// Stops the subscription.
    ///
    /// When this returns, the callback is not running and will not be
    /// invoked again.
    pub async fn unsubscribe(&self) {
        self.cancel.cancel();
        let _gate = self.gate.lock().await;
    }

    /// Whether deliveries may still happen.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts the delivery task for one subscription.
///
/// `initial` is delivered first; `changes` must have been obtained before
/// `initial` was read so that no write slips between the two.
pub(crate) fn spawn<T, F>(
    board_id: BoardId,
    mut changes: broadcast::Receiver<StoreChange>,
    initial: T,
    fetch: Fetch<T>,
    callback: F,
) -> Subscription
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let cancel = CancellationToken::new();
    let gate = Arc::new(Mutex::new(()));
    let task_cancel = cancel.clone();
    let task_gate = Arc::clone(&gate);

    tokio::spawn(async move {
        let mut last: Option<T> = None;
        let mut next = Some(initial);

        loop {
            if let Some(snapshot) = next.take()
                && last.as_ref() != Some(&snapshot)
            {
                let _gate = task_gate.lock().await;
                if task_cancel.is_cancelled() {
                    break;
                }
                callback(snapshot.clone());
                last = Some(snapshot);
            }

            let refresh = tokio::select! {
                biased;
                _ = task_cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Ok(change) => change.affects(&board_id),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(board_id = %board_id, skipped, "subscription lagged, refreshing");
                        true
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            if !refresh {
                continue;
            }

            // One read covers every notification queued so far.
            loop {
                match changes.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }

            match fetch().await {
                Ok(snapshot) => next = Some(snapshot),
                Err(e) => {
                    warn!(board_id = %board_id, error = %e, "subscription refresh failed");
                }
            }
        }

        debug!(board_id = %board_id, "subscription closed");
    });

    Subscription { cancel, gate }
}
