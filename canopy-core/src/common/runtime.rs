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

//! The embedder surface: launching the system and spawning supervisors.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::time::timeout as tokio_timeout;
use tracing::{error, trace};

use crate::common::system_context::SystemContext;
use crate::common::types::SupervisorId;
use crate::supervisor::{spawn, SupervisorConfig, SupervisorHandle};

/// Entry point for launching a canopy runtime.
///
/// ```ignore
/// let runtime = CanopySystem::launch();
/// let supervisor = runtime.spawn_supervisor(SupervisorConfig::new());
/// ```
pub struct CanopySystem;

impl CanopySystem {
    /// Launches a runtime over the default (tokio) event loop.
    pub fn launch() -> Runtime {
        Runtime::default()
    }

    /// Launches a runtime over a custom system context.
    pub fn launch_with(system: SystemContext) -> Runtime {
        Runtime {
            system: Arc::new(system),
            supervisors: DashMap::new(),
        }
    }
}

/// The running system: a registry of live supervisors sharing one
/// [`SystemContext`]. Cloning is not provided; share by reference or wrap in
/// `Arc` at the embedding layer.
pub struct Runtime {
    system: Arc<SystemContext>,
    supervisors: DashMap<SupervisorId, SupervisorHandle>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            system: Arc::new(SystemContext::default()),
            supervisors: DashMap::new(),
        }
    }
}

impl Runtime {
    /// Spawns a new supervisor bound to this runtime's system context.
    pub fn spawn_supervisor(&self, config: SupervisorConfig) -> SupervisorHandle {
        let handle = spawn(config, self.system.clone());
        trace!(supervisor = %handle.id(), "supervisor spawned");
        self.supervisors.insert(handle.id(), handle.clone());
        handle
    }

    /// Number of supervisors spawned and not yet torn down by
    /// [`Runtime::shutdown_all`].
    pub fn supervisor_count(&self) -> usize {
        self.supervisors.len()
    }

    /// The shared system context.
    pub fn system(&self) -> &Arc<SystemContext> {
        &self.system
    }

    /// Gracefully stops every supervisor, waiting up to
    /// `CANOPY_SHUTDOWN_TIMEOUT_MS` (default 30s) for the whole fleet.
    /// Supervisors still running after the deadline are hard-cancelled.
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        let timeout_ms: u64 = env::var("CANOPY_SHUTDOWN_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(30_000);

        let handles: Vec<SupervisorHandle> = self
            .supervisors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        trace!(count = handles.len(), "shutting down all supervisors");

        let stop_futures = handles.iter().map(|handle| {
            let handle = handle.clone();
            async move { handle.stop(None).await }
        });

        match tokio_timeout(Duration::from_millis(timeout_ms), join_all(stop_futures)).await {
            Ok(results) => {
                for result in results {
                    if let Err(err) = result {
                        error!("error stopping supervisor during shutdown: {:?}", err);
                    }
                }
            }
            Err(_) => {
                error!(
                    "system-wide shutdown timeout expired after {} ms, cancelling",
                    timeout_ms
                );
                for handle in &handles {
                    handle.abort();
                }
                self.supervisors.clear();
                return Err(anyhow::anyhow!(
                    "timeout: not all supervisors stopped within {} ms",
                    timeout_ms
                ));
            }
        }
        self.supervisors.clear();
        Ok(())
    }
}
