//! # Timers
//!
//! `setTimeout` for deferreds. A readiness hook that wants to wait returns
//! `timers.delay(d)`; if the navigation is cancelled first, the timer task is
//! aborted instead of being left to fire into a dead deferred.

use std::time::Duration;

use futures::future::abortable;
use log::debug;

use crate::core::deferred::Deferred;

pub trait TimerSource {
    /// A deferred that resolves after `duration`. Cancelling it clears the timer.
    fn delay(&self, duration: Duration) -> Deferred<()>;
}

/// Timers backed by `tokio::time`, run as local tasks.
///
/// Must be used from inside a `tokio::task::LocalSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimers;

impl TimerSource for TokioTimers {
    fn delay(&self, duration: Duration) -> Deferred<()> {
        let deferred = Deferred::new();
        let (sleep, handle) = abortable(tokio::time::sleep(duration));

        let resolver = deferred.clone();
        tokio::task::spawn_local(async move {
            if sleep.await.is_ok() {
                resolver.resolve(());
            }
        });

        deferred.on_cancel(move |err| {
            debug!("Clearing {:?} timer: {}", duration, err);
            handle.abort();
        });
        deferred
    }
}
