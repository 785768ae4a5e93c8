/*
 * Copyright (c) 2025. Canopy Contributors
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! The event-loop capability the core consumes.
//!
//! The core never polls or sleeps itself; it asks the event loop to schedule
//! and cancel timers, and timer callbacks re-enter the system by posting an
//! envelope on a supervisor mailbox. The provided implementation rides on
//! tokio; embedders with their own loop implement [`EventLoop`] instead.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Callback run when a timer elapses. Posting a message is the expected
/// body; the callback is dropped unrun when the timer is cancelled.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation handle for one scheduled timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

/// Timer scheduling as consumed by supervisors.
pub trait EventLoop: Send + Sync + 'static {
    /// Schedules `fire` to run once `after` has elapsed.
    fn schedule_timer(&self, after: Duration, fire: TimerCallback) -> TimerHandle;

    /// Cancels a scheduled timer; a no-op if it already fired.
    fn cancel_timer(&self, handle: &TimerHandle);
}

/// The default [`EventLoop`]: one detached tokio task per timer, cancelled
/// through a [`CancellationToken`].
#[derive(Debug, Default, Clone)]
pub struct TokioEventLoop;

impl EventLoop for TokioEventLoop {
    fn schedule_timer(&self, after: Duration, fire: TimerCallback) -> TimerHandle {
        let token = CancellationToken::new();
        let guard = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {}
                _ = tokio::time::sleep(after) => fire(),
            }
        });
        TimerHandle::new(token)
    }

    fn cancel_timer(&self, handle: &TimerHandle) {
        handle.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn cancelled_timer_does_not_fire() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let event_loop = TokioEventLoop;
        let handle = event_loop.schedule_timer(
            Duration::from_millis(20),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        event_loop.cancel_timer(&handle);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn timer_fires_after_deadline() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let event_loop = TokioEventLoop;
        let _handle = event_loop.schedule_timer(
            Duration::from_millis(10),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
