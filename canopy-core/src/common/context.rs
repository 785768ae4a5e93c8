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

//! The dispatch context handed to handlers and plugins.
//!
//! A [`Context`] is a short-lived view over the supervisor's task-local
//! state, rebuilt around every handler invocation. It carries everything a
//! handler may legitimately do: send and answer messages, manage
//! subscriptions, schedule request timers, and queue lifecycle continuations
//! for the supervisor loop to run once the current handler returns.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::actor::{ActorBase, ActorState};
use crate::common::system_context::SystemContext;
use crate::common::types::{ActorId, MailboxHub, RequestId, SupervisorId};
use crate::error::{ErrorCode, ExtendedError};
use crate::handler::Handler;
use crate::message::request::{RequestPayload, ServiceRequest, ServiceResponse};
use crate::message::system::{
    ChildBundle, CommitUnsubscription, CreateChild, ExternalSubscription, ExternalUnsubscription,
    SubscriptionConfirmed, TimerFired,
};
use crate::message::{Address, Envelope};
use crate::plugin::child_manager::SupervisorPolicy;
use crate::plugin::Plugin;
use crate::supervisor::correlator::{Correlator, PendingRequest, SynthesizeFn};
use crate::supervisor::registry::{AddressMapping, OwnerTag, SubscriptionPoint, SubscriptionRegistry};
use crate::traits::{Actor, ActorMessage};

pub(crate) type ActorArena = HashMap<ActorId, Box<dyn Actor>>;

/// Work a handler asked the supervisor loop to do after it returns.
///
/// Plugins never re-enter the lifecycle driver from inside a walk; they
/// queue one of these instead.
pub(crate) enum Continuation {
    /// Install a freshly created child and activate its chain.
    Install(ChildBundle),
    /// Re-run the init gate walk for an actor.
    InitContinue(ActorId),
    /// Re-run the shutdown gate walk for an actor.
    ShutdownContinue(ActorId),
    /// Run the start walk for an actor.
    Start(ActorId),
    /// Notify SUBSCRIPTION-armed plugins of a confirmed point.
    SubscriptionNotice(ActorId, SubscriptionPoint),
    /// Tell the owner's lifetime plugin a locally owned point was removed.
    ForgetPoint(ActorId, SubscriptionPoint),
    /// Drop an actor from the arena.
    RemoveActor(ActorId),
}

/// Static per-supervisor settings exposed to plugins.
#[derive(Debug, Clone)]
pub(crate) struct SupervisorSettings {
    pub(crate) name: String,
    pub(crate) policy: SupervisorPolicy,
    pub(crate) synchronize_start: bool,
}

/// The capability surface available inside one handler invocation.
pub struct Context<'a> {
    pub(crate) supervisor_id: SupervisorId,
    pub(crate) supervisor_address: &'a Address,
    pub(crate) hub: &'a Arc<MailboxHub>,
    pub(crate) actors: &'a mut ActorArena,
    pub(crate) addresses: &'a mut HashMap<Address, ActorId>,
    pub(crate) registry: &'a mut SubscriptionRegistry,
    pub(crate) mapping: &'a mut AddressMapping,
    pub(crate) correlator: &'a mut Correlator,
    pub(crate) continuations: &'a mut VecDeque<Continuation>,
    pub(crate) system: &'a SystemContext,
    pub(crate) settings: &'a SupervisorSettings,
}

impl Context<'_> {
    /// The hosting supervisor's identity.
    #[inline]
    pub fn supervisor_id(&self) -> SupervisorId {
        self.supervisor_id
    }

    /// The hosting supervisor's main address; the target for triggers,
    /// creates, and lifecycle replies.
    #[inline]
    pub fn supervisor_address(&self) -> &Address {
        self.supervisor_address
    }

    /// The init-failure policy of the hosting supervisor.
    #[inline]
    pub fn policy(&self) -> SupervisorPolicy {
        self.settings.policy
    }

    /// Whether the hosting supervisor holds children in `Initialized` until
    /// it becomes operational itself.
    #[inline]
    pub fn synchronize_start(&self) -> bool {
        self.settings.synchronize_start
    }

    /// The shared embedder environment.
    #[inline]
    pub fn system(&self) -> &SystemContext {
        self.system
    }

    /// Sends a message to an address. Delivery to a dead address or to an
    /// address with no matching handler is a silent drop.
    pub fn send(&self, target: &Address, message: impl ActorMessage) {
        self.send_shared(target, Arc::new(message));
    }

    /// Sends an already type-erased message without recloning the payload.
    pub fn send_shared(
        &self,
        target: &Address,
        message: Arc<dyn ActorMessage + Send + Sync + 'static>,
    ) {
        target.post(Envelope::new(target.clone(), message));
    }

    /// Issues a request with a timeout, delivering the response (or a
    /// synthetic timeout response) to `reply_to`.
    pub fn request<P: RequestPayload>(
        &mut self,
        target: &Address,
        payload: P,
        timeout: Duration,
        reply_to: Address,
    ) -> RequestId {
        let id = self.correlator.allocate();
        let synthesize: SynthesizeFn = Box::new(move || {
            Arc::new(ServiceResponse::<P>::err(
                id,
                ExtendedError::new(ErrorCode::RequestTimeout),
            ))
        });
        let wake = self.supervisor_address.clone();
        let timer = self.system.event_loop().schedule_timer(
            timeout,
            Box::new(move || {
                let message = Arc::new(TimerFired { request: id });
                wake.post(Envelope::new(wake.clone(), message));
            }),
        );
        self.correlator.register(
            id,
            PendingRequest {
                reply_to: reply_to.clone(),
                timer,
                synthesize,
            },
        );
        trace!(request = %id, to = ?target, "issuing request");
        self.send(
            target,
            ServiceRequest::<P> {
                id,
                reply_to,
                payload,
            },
        );
        id
    }

    /// Answers a recorded lifecycle request.
    pub fn respond<P: RequestPayload>(
        &mut self,
        pending: crate::actor::PendingReply,
        result: Result<P::Response, ExtendedError>,
    ) {
        let response = match result {
            Ok(payload) => ServiceResponse::<P>::ok(pending.id, payload),
            Err(error) => ServiceResponse::<P>::err(pending.id, error),
        };
        pending.reply_to.post(Envelope::correlated(
            pending.reply_to.clone(),
            Arc::new(response),
            pending.id,
        ));
    }

    /// Answers a request in place.
    pub fn reply<P: RequestPayload>(
        &mut self,
        request: &ServiceRequest<P>,
        result: Result<P::Response, ExtendedError>,
    ) {
        self.respond::<P>(
            crate::actor::PendingReply {
                id: request.id,
                reply_to: request.reply_to.clone(),
            },
            result,
        );
    }

    /// Cancels a pending request without delivering anything. Used when the
    /// caller goes away before the response can matter.
    pub fn discard_request(&mut self, id: RequestId) {
        if let Some(pending) = self.correlator.settle(id) {
            self.system.event_loop().cancel_timer(&pending.timer);
            trace!(request = %id, "request discarded");
        }
    }

    /// Spawns an actor as a child of the hosting supervisor, returning its
    /// address immediately. The create message round-trips through the
    /// mailbox, so the child initializes after the current handler returns.
    pub fn create_child<A: Actor>(
        &mut self,
        mut actor: A,
        spec: crate::supervisor::ChildSpec,
    ) -> Address {
        let address = Address::mint(self.hub);
        actor
            .base_mut()
            .bind(address.clone(), spec.init_timeout, spec.shutdown_timeout);
        let bundle = ChildBundle {
            actor: Box::new(actor),
            plugins: spec.plugins,
        };
        self.send(self.supervisor_address, CreateChild::new(bundle));
        address
    }

    /// Mints a fresh address owned by `owner` on this supervisor.
    pub fn create_address(&mut self, owner: ActorId) -> Address {
        let address = Address::mint(self.hub);
        self.addresses.insert(address.clone(), owner);
        address
    }

    /// The lifecycle state of the local actor behind `address`, if any.
    /// The actor currently checked out for dispatch is not visible here.
    pub fn actor_state(&self, address: &Address) -> Option<ActorState> {
        let id = self.addresses.get(address)?;
        self.actors.get(id).map(|actor| actor.base().state())
    }

    /// The local actor owning `address`, if any.
    pub fn address_owner(&self, address: &Address) -> Option<ActorId> {
        self.addresses.get(address).copied()
    }

    /// Subscribes a handler to an address. A local address installs
    /// immediately and confirms by message; a foreign address forwards an
    /// external-subscription to its owning supervisor.
    pub fn subscribe(&mut self, target: &Address, handler: Arc<Handler>) {
        if target.supervisor() == self.supervisor_id {
            let point = SubscriptionPoint::new(target.clone(), handler, OwnerTag::Actor);
            self.install_point(point);
        } else {
            let point = SubscriptionPoint::new(target.clone(), handler, OwnerTag::Actor);
            trace!(to = ?target, "forwarding external subscription");
            self.send(target, ExternalSubscription { point });
        }
    }

    /// Subscribes an actor-method handler; see [`Handler::of_actor`].
    pub fn subscribe_actor<A, M, F>(&mut self, target: &Address, owner: &ActorBase, f: F)
    where
        A: Actor,
        M: ActorMessage,
        F: Fn(&mut A, &M, &mut Context<'_>) + Send + Sync + 'static,
    {
        let handler = Handler::of_actor::<A, M, F>(owner.id(), owner.bound_address().clone(), f);
        self.subscribe(target, handler);
    }

    /// Subscribes a plugin-method handler; see [`Handler::of_plugin`].
    pub fn subscribe_plugin<P, M, F>(&mut self, target: &Address, owner: &ActorBase, f: F)
    where
        P: Plugin,
        M: ActorMessage,
        F: Fn(&mut P, &mut dyn Actor, &M, &mut Context<'_>) + Send + Sync + 'static,
    {
        let handler = Handler::of_plugin::<P, M, F>(owner.id(), owner.bound_address().clone(), f);
        self.subscribe(target, handler);
    }

    /// Subscribes a free closure; the registering actor owns the point.
    pub fn subscribe_lambda<M, F>(&mut self, target: &Address, owner: &ActorBase, f: F)
    where
        M: ActorMessage,
        F: Fn(&M, &mut Context<'_>) + Send + Sync + 'static,
    {
        let handler = Handler::of_lambda::<M, F>(owner.id(), owner.bound_address().clone(), f);
        self.subscribe(target, handler);
    }

    pub(crate) fn install_point(&mut self, point: SubscriptionPoint) {
        if !self
            .registry
            .insert(point.address.clone(), point.handler.clone())
        {
            return;
        }
        let confirm_to = point.handler.owner_address().clone();
        self.send(&confirm_to, SubscriptionConfirmed { point });
    }

    /// Removes a subscription point, routing the removal by locality:
    /// local address and owner delete immediately and notify the owner's
    /// lifetime; a foreign handler gets a commit-unsubscription; a foreign
    /// address gets an external-unsubscription.
    pub fn unsubscribe(&mut self, point: &SubscriptionPoint) {
        if point.address.supervisor() == self.supervisor_id {
            self.registry.remove(&point.address, &point.handler);
            if point.handler.owner_supervisor() == self.supervisor_id {
                self.continuations.push_back(Continuation::ForgetPoint(
                    point.handler.owner(),
                    point.clone(),
                ));
            } else {
                if let Some(owner) = self.addresses.get(&point.address).copied() {
                    self.mapping.remove(owner, point);
                }
                let commit_to = point.handler.owner_address().clone();
                self.send(
                    &commit_to,
                    CommitUnsubscription {
                        point: point.clone(),
                    },
                );
            }
        } else {
            trace!(to = ?point.address, "forwarding external unsubscription");
            self.send(
                &point.address,
                ExternalUnsubscription {
                    point: point.clone(),
                },
            );
        }
    }

    /// Queues installation of a freshly created child.
    pub(crate) fn install_child(&mut self, bundle: ChildBundle) {
        self.continuations.push_back(Continuation::Install(bundle));
    }

    /// Queues removal of an actor from the arena.
    pub(crate) fn remove_actor(&mut self, id: ActorId) {
        self.continuations.push_back(Continuation::RemoveActor(id));
    }

    /// Requests another init gate walk for `id` after the current handler.
    pub fn continue_init(&mut self, id: ActorId) {
        self.continuations.push_back(Continuation::InitContinue(id));
    }

    /// Requests another shutdown gate walk for `id` after the current
    /// handler.
    pub fn continue_shutdown(&mut self, id: ActorId) {
        self.continuations
            .push_back(Continuation::ShutdownContinue(id));
    }

    pub(crate) fn queue_start(&mut self, id: ActorId) {
        self.continuations.push_back(Continuation::Start(id));
    }

    pub(crate) fn notice_subscription(&mut self, owner: ActorId, point: SubscriptionPoint) {
        self.continuations
            .push_back(Continuation::SubscriptionNotice(owner, point));
    }

    /// SUPERVISOR-owned points recorded against a local actor's addresses.
    pub(crate) fn mapped_points(&self, owner: ActorId) -> Vec<SubscriptionPoint> {
        self.mapping.points_for(owner)
    }
}
