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

use std::fmt;
use std::sync::Arc;

use crate::common::event_loop::{EventLoop, TokioEventLoop};
use crate::error::ExtendedError;

type ErrorSink = Box<dyn Fn(&ExtendedError) + Send + Sync>;

/// The embedder-provided environment shared by every supervisor of a
/// runtime: the event loop handle and the sink for errors nobody else
/// handles (failed child shutdowns, primarily).
pub struct SystemContext {
    event_loop: Arc<dyn EventLoop>,
    on_error: ErrorSink,
}

impl SystemContext {
    /// A context over the given event loop, reporting unhandled errors
    /// through `tracing`.
    pub fn new(event_loop: Arc<dyn EventLoop>) -> Self {
        Self {
            event_loop,
            on_error: Box::new(|error| {
                tracing::error!(%error, "unhandled actor error");
            }),
        }
    }

    /// Replaces the unhandled-error sink.
    pub fn with_error_sink(
        mut self,
        sink: impl Fn(&ExtendedError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Box::new(sink);
        self
    }

    /// The event loop supervisors schedule timers on.
    pub fn event_loop(&self) -> &Arc<dyn EventLoop> {
        &self.event_loop
    }

    /// Reports an error nobody else handled.
    pub fn on_error(&self, error: &ExtendedError) {
        (self.on_error)(error);
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new(Arc::new(TokioEventLoop))
    }
}

impl fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemContext")
    }
}
