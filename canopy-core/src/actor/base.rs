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

use std::time::Duration;

use crate::actor::ActorState;
use crate::common::types::{ActorId, RequestId};
use crate::error::ExtendedError;
use crate::message::Address;
use crate::plugin::{Plugin, PluginIdentity};

/// Default timeout applied to init and shutdown requests when a child spec
/// does not override them.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(5);

/// A recorded lifecycle request awaiting its confirmation reply.
#[derive(Debug, Clone)]
pub struct PendingReply {
    /// Correlation id of the request.
    pub id: RequestId,
    /// Where the confirmation must go.
    pub reply_to: Address,
}

/// The framework-owned part of every actor: identity, address, lifecycle
/// state, the plugin chain, and pending lifecycle bookkeeping.
///
/// User actors embed one of these and hand it out through
/// [`Actor::base`](crate::traits::Actor::base).
pub struct ActorBase {
    id: ActorId,
    address: Option<Address>,
    state: ActorState,
    pub(crate) plugins: Vec<Box<dyn Plugin>>,
    pub(crate) init_request: Option<PendingReply>,
    pub(crate) shutdown_request: Option<PendingReply>,
    shutdown_reason: Option<ExtendedError>,
    init_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ActorBase {
    /// A fresh base with a newly minted actor id. The address is bound by
    /// the supervisor when the actor is spawned.
    pub fn new() -> Self {
        Self {
            id: ActorId::mint(),
            address: None,
            state: ActorState::New,
            plugins: Vec::new(),
            init_request: None,
            shutdown_request: None,
            shutdown_reason: None,
            init_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            shutdown_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
        }
    }

    /// The actor's identity.
    #[inline]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// The actor's main address, once bound.
    #[inline]
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// The actor's main address. Every actor reachable by the dispatch loop
    /// has one; this is only unbound before the actor is spawned.
    pub(crate) fn bound_address(&self) -> &Address {
        self.address
            .as_ref()
            .expect("actor address is bound before dispatch")
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ActorState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ActorState) {
        self.state = state;
    }

    /// The shutdown reason recorded so far, if any.
    pub fn shutdown_reason(&self) -> Option<&ExtendedError> {
        self.shutdown_reason.as_ref()
    }

    /// Records a shutdown reason; the first non-empty reason wins.
    pub(crate) fn assign_shutdown_reason(&mut self, reason: Option<ExtendedError>) {
        if self.shutdown_reason.is_none() {
            if let Some(reason) = reason {
                self.shutdown_reason = Some(reason);
            }
        }
    }

    /// Timeout for this actor's init request.
    #[inline]
    pub fn init_timeout(&self) -> Duration {
        self.init_timeout
    }

    /// Timeout for this actor's shutdown request.
    #[inline]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub(crate) fn bind(
        &mut self,
        address: Address,
        init_timeout: Duration,
        shutdown_timeout: Duration,
    ) {
        self.address = Some(address);
        self.init_timeout = init_timeout;
        self.shutdown_timeout = shutdown_timeout;
    }

    /// Detaches the plugin with `identity` from the chain, returning its
    /// position so it can be reattached where it was. Used around plugin
    /// calls: the chain never aliases the plugin being invoked.
    pub(crate) fn detach_plugin(
        &mut self,
        identity: PluginIdentity,
    ) -> Option<(usize, Box<dyn Plugin>)> {
        let index = self
            .plugins
            .iter()
            .position(|plugin| plugin.identity() == identity)?;
        Some((index, self.plugins.remove(index)))
    }

    pub(crate) fn attach_plugin(&mut self, index: usize, plugin: Box<dyn Plugin>) {
        let index = index.min(self.plugins.len());
        self.plugins.insert(index, plugin);
    }
}

impl Default for ActorBase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActorBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorBase")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
