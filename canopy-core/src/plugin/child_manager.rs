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

//! Child creation, supervision, and shutdown fan-out.
//!
//! Installed on every supervisor. Keeps the child table (including a
//! self-entry for the supervisor's own actor, which unifies the shutdown
//! bookkeeping), drives children through init and start according to policy,
//! collects shutdown confirmations, and holds the supervisor's own init and
//! shutdown until every child has settled.

use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, trace};

use crate::actor::ActorState;
use crate::common::types::{ActorId, RequestId};
use crate::common::Context;
use crate::error::{ErrorCode, ExtendedError, ShutdownCode};
use crate::message::request::{ServiceRequest, ServiceResponse};
use crate::message::system::{
    CreateChild, InitActor, QueryState, ShutdownActor, ShutdownTrigger, StartActor, StateReport,
};
use crate::message::Address;
use crate::plugin::{Plugin, PluginIdentity, Reactions};
use crate::traits::Actor;

/// What a supervisor does when a child fails to initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupervisorPolicy {
    /// A child failing init while the supervisor is itself initializing
    /// fails the supervisor: its own init request is answered with a
    /// failure escalation, or, with no init request pending, the supervisor
    /// shuts itself down.
    #[default]
    ShutdownSelf,
    /// Only the failing child is shut down; the supervisor's own init
    /// continues.
    ShutdownFailed,
}

/// Shutdown-request progress per child, deduplicating repeated triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    None,
    Sent,
    Confirmed,
}

#[derive(Debug)]
struct ChildState {
    actor_id: ActorId,
    initialized: bool,
    started: bool,
    shutdown: RequestState,
    init_request: Option<RequestId>,
    shutdown_request: Option<RequestId>,
    shutdown_timeout: Duration,
}

impl ChildState {
    fn new(actor_id: ActorId, shutdown_timeout: Duration) -> Self {
        Self {
            actor_id,
            initialized: false,
            started: false,
            shutdown: RequestState::None,
            init_request: None,
            shutdown_request: None,
            shutdown_timeout,
        }
    }
}

/// The supervisor's child table and the logic over it.
#[derive(Debug, Default)]
pub struct ChildManagerPlugin {
    reactions: Reactions,
    actors: HashMap<Address, ChildState>,
}

impl ChildManagerPlugin {
    /// Number of live entries, the self-entry included.
    pub fn child_count(&self) -> usize {
        self.actors.len()
    }

    fn find_by_init_request(&self, id: RequestId) -> Option<Address> {
        self.actors
            .iter()
            .find(|(_, state)| state.init_request == Some(id))
            .map(|(address, _)| address.clone())
    }

    fn find_by_shutdown_request(&self, id: RequestId) -> Option<Address> {
        self.actors
            .iter()
            .find(|(_, state)| state.shutdown_request == Some(id))
            .map(|(address, _)| address.clone())
    }

    /// True while any non-self child has neither confirmed init nor moved
    /// past `Initializing`. Children whose installation is still queued
    /// count as initializing.
    fn has_initializing(&self, ctx: &Context<'_>) -> bool {
        let own = ctx.supervisor_address();
        self.actors.iter().any(|(address, state)| {
            if address == own || state.initialized {
                return false;
            }
            ctx.actor_state(address).unwrap_or(ActorState::New) <= ActorState::Initializing
        })
    }

    /// Advances the supervisor's own init once no child is initializing.
    fn init_continue(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        if actor.base().state() != ActorState::Initializing {
            return;
        }
        if actor.base().init_request.is_some() && !self.has_initializing(ctx) {
            self.reactions.remove(Reactions::INIT);
            let id = actor.base().id();
            ctx.continue_init(id);
        }
    }

    fn cancel_init(&mut self, address: &Address, ctx: &mut Context<'_>) {
        if let Some(state) = self.actors.get_mut(address) {
            if let Some(id) = state.init_request.take() {
                ctx.discard_request(id);
            }
        }
    }

    fn on_create(
        &mut self,
        actor: &mut dyn Actor,
        message: &CreateChild,
        ctx: &mut Context<'_>,
    ) {
        let Some(bundle) = message.take() else {
            trace!("create-child message already consumed");
            return;
        };
        let base = bundle.actor.base();
        let address = base.bound_address().clone();
        let init_timeout = base.init_timeout();
        debug!(child = %base.id(), address = ?address, "creating child");
        self.actors.insert(
            address.clone(),
            ChildState::new(base.id(), base.shutdown_timeout()),
        );
        ctx.install_child(bundle);
        let request = ctx.request::<InitActor>(
            &address,
            InitActor,
            init_timeout,
            ctx.supervisor_address().clone(),
        );
        if let Some(state) = self.actors.get_mut(&address) {
            state.init_request = Some(request);
        }
        if actor.base().state() == ActorState::Initializing {
            self.reactions.insert(Reactions::INIT);
        }
    }

    fn on_init(
        &mut self,
        actor: &mut dyn Actor,
        response: &ServiceResponse<InitActor>,
        ctx: &mut Context<'_>,
    ) {
        let Some(address) = self.find_by_init_request(response.id) else {
            trace!(request = %response.id, "init response for unknown child");
            return;
        };
        if let Some(state) = self.actors.get_mut(&address) {
            state.init_request = None;
        }
        let error = response.error.clone();
        let is_self = address == *ctx.supervisor_address();
        let self_state = actor.base().state();
        let mut continue_init = error.is_none() && !self.has_initializing(ctx);

        if let Some(cause) = error.clone() {
            let shutdown_self = !is_self
                && self_state == ActorState::Initializing
                && ctx.policy() == SupervisorPolicy::ShutdownSelf;
            if shutdown_self {
                continue_init = false;
                if let Some(pending) = actor.base_mut().init_request.take() {
                    ctx.respond::<InitActor>(
                        pending,
                        Err(ExtendedError::with_cause(ErrorCode::FailureEscalation, cause)),
                    );
                } else {
                    let reason = ExtendedError::with_cause(ShutdownCode::ChildInitFailed, cause);
                    self.shutdown_self(actor, Some(reason), ctx);
                }
            } else {
                let code = if is_self {
                    ShutdownCode::InitFailed
                } else {
                    ShutdownCode::ChildInitFailed
                };
                let reason = ExtendedError::with_cause(code, cause);
                self.request_shutdown(actor, &address, Some(reason), ctx);
            }
        } else if let Some(state) = self.actors.get_mut(&address) {
            state.initialized = true;
            let do_start = if is_self {
                self_state <= ActorState::Operational
            } else {
                !ctx.synchronize_start()
            };
            if do_start {
                state.started = true;
                ctx.send(&address, StartActor);
            }
        }

        if continue_init {
            self.init_continue(actor, ctx);
        }
        if !is_self {
            actor.on_child_init(&address, error.as_ref(), ctx);
        }
    }

    fn on_shutdown_trigger(
        &mut self,
        actor: &mut dyn Actor,
        message: &ShutdownTrigger,
        ctx: &mut Context<'_>,
    ) {
        if !self.actors.contains_key(&message.target) {
            trace!(subject = ?message.target, "shutdown trigger for unknown actor");
            return;
        }
        self.request_shutdown(actor, &message.target, message.reason.clone(), ctx);
    }

    fn on_shutdown_confirm(
        &mut self,
        actor: &mut dyn Actor,
        response: &ServiceResponse<ShutdownActor>,
        ctx: &mut Context<'_>,
    ) {
        let Some(address) = self.find_by_shutdown_request(response.id) else {
            trace!(request = %response.id, "shutdown response for unknown child");
            return;
        };
        let error = response.error.clone();
        let actor_id = match self.actors.get_mut(&address) {
            Some(state) => {
                state.shutdown = RequestState::Confirmed;
                state.shutdown_request = None;
                state.actor_id
            }
            None => return,
        };
        if let Some(err) = &error {
            // Nobody above us handles a failed child shutdown.
            ctx.system().on_error(err);
        }
        for point in ctx.mapped_points(actor_id) {
            ctx.unsubscribe(&point);
        }
        self.remove_child(actor, &address, ctx);
        actor.on_child_shutdown(&address, error.as_ref(), ctx);
    }

    fn on_query_state(
        &mut self,
        actor: &mut dyn Actor,
        request: &ServiceRequest<QueryState>,
        ctx: &mut Context<'_>,
    ) {
        let subject = &request.payload.subject;
        let state = if *subject == *ctx.supervisor_address() {
            Some(actor.base().state())
        } else {
            ctx.actor_state(subject)
        };
        match state {
            Some(state) => ctx.reply::<QueryState>(request, Ok(StateReport { state })),
            None => ctx.reply::<QueryState>(
                request,
                Err(ExtendedError::new(ErrorCode::UnknownService)),
            ),
        }
    }

    /// Removes a settled child, applying the init-failure backstop and
    /// advancing the supervisor's own lifecycle when warranted.
    fn remove_child(&mut self, actor: &mut dyn Actor, address: &Address, ctx: &mut Context<'_>) {
        let Some(entry) = self.actors.get(address) else {
            return;
        };
        let child_started = entry.started;
        let self_state = actor.base().state();

        if self_state == ActorState::Initializing
            && !child_started
            && ctx.policy() == SupervisorPolicy::ShutdownSelf
        {
            if let Some(pending) = actor.base_mut().init_request.take() {
                ctx.respond::<InitActor>(
                    pending,
                    Err(ExtendedError::new(ErrorCode::FailureEscalation)),
                );
            } else {
                self.shutdown_self(
                    actor,
                    Some(ExtendedError::new(ShutdownCode::ChildInitFailed)),
                    ctx,
                );
            }
        }

        self.cancel_init(address, ctx);
        if let Some(state) = self.actors.remove(address) {
            ctx.remove_actor(state.actor_id);
        }
        debug!(address = ?address, remaining = self.actors.len(), "child removed");

        if actor.base().state() == ActorState::ShuttingDown && self.actors.len() <= 1 {
            let id = actor.base().id();
            ctx.continue_shutdown(id);
        }
        self.init_continue(actor, ctx);
    }

    /// Sends (at most once) a shutdown request toward one entry of the
    /// table. A `Confirmed` entry is never downgraded back to `Sent`.
    fn request_shutdown(
        &mut self,
        actor: &mut dyn Actor,
        address: &Address,
        reason: Option<ExtendedError>,
        ctx: &mut Context<'_>,
    ) {
        let is_self = *address == *ctx.supervisor_address();
        let Some(state) = self.actors.get(address) else {
            return;
        };
        if state.shutdown != RequestState::None {
            return;
        }
        self.cancel_init(address, ctx);
        if is_self {
            self.shutdown_self(actor, reason, ctx);
        } else {
            let timeout = self
                .actors
                .get(address)
                .map(|state| state.shutdown_timeout)
                .unwrap_or_default();
            let request = ctx.request::<ShutdownActor>(
                address,
                ShutdownActor { reason },
                timeout,
                ctx.supervisor_address().clone(),
            );
            if let Some(state) = self.actors.get_mut(address) {
                state.shutdown = RequestState::Sent;
                state.shutdown_request = Some(request);
            }
        }
    }

    /// The supervisor's own shutdown: no request round-trip, just the state
    /// transition plus a shutdown fan-out to every child.
    fn shutdown_self(
        &mut self,
        actor: &mut dyn Actor,
        reason: Option<ExtendedError>,
        ctx: &mut Context<'_>,
    ) {
        if actor.base().state() >= ActorState::ShuttingDown {
            actor.base_mut().assign_shutdown_reason(reason);
            return;
        }
        actor.base_mut().assign_shutdown_reason(reason);
        actor.base_mut().set_state(ActorState::ShuttingDown);
        if let Some(state) = self.actors.get_mut(ctx.supervisor_address()) {
            if state.shutdown == RequestState::None {
                state.shutdown = RequestState::Confirmed;
            }
        }
        self.request_shutdown_children(actor, ctx);
        let id = actor.base().id();
        ctx.continue_shutdown(id);
    }

    /// Fans the shutdown out to every non-self entry, wrapping the
    /// supervisor's own reason as the children's cause.
    fn request_shutdown_children(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        let reason = match actor.base().shutdown_reason().cloned() {
            Some(cause) => ExtendedError::with_cause(ShutdownCode::SupervisorShutdown, cause),
            None => ExtendedError::new(ShutdownCode::SupervisorShutdown),
        };
        let children: Vec<Address> = self
            .actors
            .keys()
            .filter(|address| **address != *ctx.supervisor_address())
            .cloned()
            .collect();
        for address in children {
            self.request_shutdown(actor, &address, Some(reason.clone()), ctx);
        }
    }
}

impl Plugin for ChildManagerPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::of::<Self>()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reactions(&self) -> Reactions {
        self.reactions
    }

    fn activate(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        self.reactions
            .insert(Reactions::INIT | Reactions::SHUTDOWN | Reactions::START);
        let base = actor.base();
        let address = base.bound_address().clone();
        ctx.subscribe_plugin::<Self, CreateChild, _>(
            &address,
            base,
            |plugin, actor, message, ctx| plugin.on_create(actor, message, ctx),
        );
        ctx.subscribe_plugin::<Self, ServiceResponse<InitActor>, _>(
            &address,
            base,
            |plugin, actor, response, ctx| plugin.on_init(actor, response, ctx),
        );
        ctx.subscribe_plugin::<Self, ShutdownTrigger, _>(
            &address,
            base,
            |plugin, actor, message, ctx| plugin.on_shutdown_trigger(actor, message, ctx),
        );
        ctx.subscribe_plugin::<Self, ServiceResponse<ShutdownActor>, _>(
            &address,
            base,
            |plugin, actor, response, ctx| plugin.on_shutdown_confirm(actor, response, ctx),
        );
        ctx.subscribe_plugin::<Self, ServiceRequest<QueryState>, _>(
            &address,
            base,
            |plugin, actor, request, ctx| plugin.on_query_state(actor, request, ctx),
        );
        self.actors.insert(
            address.clone(),
            ChildState::new(base.id(), base.shutdown_timeout()),
        );
        actor.configure(self, ctx);

        // A supervisor is its own root: issue the self init request here,
        // after the init plumbing (earlier in the chain) has subscribed.
        let init_timeout = actor.base().init_timeout();
        let request = ctx.request::<InitActor>(
            &address,
            InitActor,
            init_timeout,
            address.clone(),
        );
        if let Some(state) = self.actors.get_mut(&address) {
            state.init_request = Some(request);
        }
    }

    fn deactivate(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        let _ = actor;
        if let Some(state) = self.actors.remove(ctx.supervisor_address()) {
            ctx.remove_actor(state.actor_id);
        }
    }

    fn handle_init(&mut self, _actor: &mut dyn Actor, ctx: &mut Context<'_>) -> bool {
        !self.has_initializing(ctx)
    }

    fn handle_shutdown(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) -> bool {
        // Dedup against a shutdown request arriving both from outside and
        // from the self path.
        if let Some(state) = self.actors.get_mut(ctx.supervisor_address()) {
            state.shutdown = RequestState::Confirmed;
        }
        self.request_shutdown_children(actor, ctx);
        if self.actors.len() <= 1 {
            self.reactions.remove(Reactions::SHUTDOWN);
            true
        } else {
            false
        }
    }

    fn handle_start(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        if ctx.synchronize_start() {
            let own = ctx.supervisor_address().clone();
            for (address, state) in self.actors.iter_mut() {
                if *address == own || state.started {
                    continue;
                }
                state.started = true;
                ctx.send(address, StartActor);
            }
        }
        let _ = actor;
        self.reactions.remove(Reactions::START);
    }
}
