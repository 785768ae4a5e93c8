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

//! Supervisors: mailbox-draining actors that host children.
//!
//! A supervisor owns one FIFO mailbox and drains it on one tokio task. Every
//! actor it hosts lives in a task-local arena and is only ever touched from
//! that task; the mailbox senders are the single cross-thread surface.
//! Dispatch resolves `(address, message-type)` against the subscription
//! registry, invokes local handlers synchronously, and forwards foreign
//! handlers as handler-call messages to their owning supervisor.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{channel, Receiver};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace, warn};

use crate::actor::{lifecycle, ActorBase, ActorState, DEFAULT_LIFECYCLE_TIMEOUT};
use crate::common::context::{ActorArena, Context, Continuation, SupervisorSettings};
use crate::common::system_context::SystemContext;
use crate::common::types::{MailboxHub, SupervisorId};
use crate::error::{ExtendedError, MessageError};
use crate::message::system::{
    ChildBundle, CreateChild, ExternalSubscription, ExternalUnsubscription, HandlerCall,
    ShutdownTrigger, SubscriptionConfirmed, TimerFired,
};
use crate::message::{Address, Envelope};
use crate::plugin::{
    ChildManagerPlugin, InitShutdownPlugin, LifetimePlugin, Plugin, PrestarterPlugin,
    SupervisorPolicy,
};
use crate::supervisor::correlator::Correlator;
use crate::supervisor::registry::{AddressMapping, OwnerTag, SubscriptionRegistry};
use crate::traits::{Actor, ActorMessage};

pub(crate) mod correlator;
pub(crate) mod registry;

pub use registry::{OwnerTag as SubscriptionOwner, SubscriptionPoint};

/// Observation hook for child init/shutdown outcomes.
pub type ChildHook = Box<dyn FnMut(&Address, Option<&ExtendedError>) + Send>;

/// Setup hook run inside the supervisor task during activation, before the
/// supervisor's own init request is issued. The place to create children
/// that should be covered by the supervisor's init (and by
/// `synchronize_start`).
pub type SetupFn = Box<dyn FnOnce(&mut Context<'_>) + Send>;

/// Per-child spawn parameters.
pub struct ChildSpec {
    pub(crate) init_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) plugins: Vec<Box<dyn Plugin>>,
}

impl ChildSpec {
    pub fn new() -> Self {
        Self {
            init_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            shutdown_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            plugins: Vec::new(),
        }
    }

    /// Timeout for the child's init request.
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Timeout for the child's shutdown request.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Appends a plugin after the default chain.
    pub fn with_plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }
}

impl Default for ChildSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for one supervisor.
pub struct SupervisorConfig {
    pub(crate) name: String,
    pub(crate) policy: SupervisorPolicy,
    pub(crate) synchronize_start: bool,
    pub(crate) init_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) mailbox_capacity: usize,
    pub(crate) setup: Option<SetupFn>,
    pub(crate) on_child_init: Option<ChildHook>,
    pub(crate) on_child_shutdown: Option<ChildHook>,
}

impl SupervisorConfig {
    pub fn new() -> Self {
        Self {
            name: "supervisor".to_string(),
            policy: SupervisorPolicy::default(),
            synchronize_start: false,
            init_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            shutdown_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            mailbox_capacity: 255,
            setup: None,
            on_child_init: None,
            on_child_shutdown: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_policy(mut self, policy: SupervisorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Holds children in `Initialized` until the supervisor itself becomes
    /// operational, then broadcasts the start.
    pub fn with_synchronize_start(mut self, synchronize_start: bool) -> Self {
        self.synchronize_start = synchronize_start;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Runs inside the supervisor task during activation; children created
    /// here initialize under the supervisor's own init.
    pub fn with_setup(mut self, setup: impl FnOnce(&mut Context<'_>) + Send + 'static) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn on_child_init(
        mut self,
        hook: impl FnMut(&Address, Option<&ExtendedError>) + Send + 'static,
    ) -> Self {
        self.on_child_init = Some(Box::new(hook));
        self
    }

    pub fn on_child_shutdown(
        mut self,
        hook: impl FnMut(&Address, Option<&ExtendedError>) + Send + 'static,
    ) -> Self {
        self.on_child_shutdown = Some(Box::new(hook));
        self
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The supervisor's own actor: all machinery lives in its plugin chain and
/// in the dispatch loop; this struct only carries the embedder hooks.
pub struct Supervisor {
    base: ActorBase,
    setup: Option<SetupFn>,
    on_child_init: Option<ChildHook>,
    on_child_shutdown: Option<ChildHook>,
}

impl Actor for Supervisor {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
        if plugin.as_any_mut().downcast_mut::<ChildManagerPlugin>().is_some() {
            if let Some(setup) = self.setup.take() {
                setup(ctx);
            }
        }
    }

    fn on_child_init(
        &mut self,
        child: &Address,
        error: Option<&ExtendedError>,
        _ctx: &mut Context<'_>,
    ) {
        if let Some(hook) = &mut self.on_child_init {
            hook(child, error);
        }
    }

    fn on_child_shutdown(
        &mut self,
        child: &Address,
        error: Option<&ExtendedError>,
        _ctx: &mut Context<'_>,
    ) {
        if let Some(hook) = &mut self.on_child_shutdown {
            hook(child, error);
        }
    }
}

/// External reference to a running supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    address: Address,
    hub: Arc<MailboxHub>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl SupervisorHandle {
    /// The supervisor's main address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The supervisor's identity.
    pub fn id(&self) -> SupervisorId {
        self.hub.id
    }

    /// Sends a message to any address, local or foreign. Delivery to an
    /// address with no matching handler is a silent drop.
    pub async fn send(
        &self,
        target: &Address,
        message: impl ActorMessage,
    ) -> Result<(), MessageError> {
        let Some(hub) = target.hub() else {
            return Err(MessageError::DeadAddress);
        };
        hub.outbox
            .send(Envelope::new(target.clone(), Arc::new(message)))
            .await?;
        Ok(())
    }

    /// Spawns an actor as a child of this supervisor, returning its address
    /// immediately; initialization proceeds asynchronously.
    pub async fn create_child<A: Actor>(
        &self,
        mut actor: A,
        spec: ChildSpec,
    ) -> Result<Address, MessageError> {
        let address = Address::mint(&self.hub);
        actor
            .base_mut()
            .bind(address.clone(), spec.init_timeout, spec.shutdown_timeout);
        let bundle = ChildBundle {
            actor: Box::new(actor),
            plugins: spec.plugins,
        };
        self.send(&self.address, CreateChild::new(bundle)).await?;
        Ok(address)
    }

    /// Triggers shutdown of one hosted actor (or of the whole subtree when
    /// `target` is the supervisor's own address).
    pub async fn trigger_shutdown(
        &self,
        target: &Address,
        reason: Option<ExtendedError>,
    ) -> Result<(), MessageError> {
        self.send(
            &self.address,
            ShutdownTrigger {
                target: target.clone(),
                reason,
            },
        )
        .await
    }

    /// Triggers shutdown of the whole subtree.
    pub async fn shutdown(&self, reason: Option<ExtendedError>) -> Result<(), MessageError> {
        let target = self.address.clone();
        self.trigger_shutdown(&target, reason).await
    }

    /// Triggers shutdown and waits for the supervisor task to finish.
    #[instrument(skip(self), fields(supervisor = %self.id()))]
    pub async fn stop(&self, reason: Option<ExtendedError>) -> anyhow::Result<()> {
        trace!("stopping supervisor");
        // A closed mailbox means the loop already finished; still wait.
        let _ = self.shutdown(reason).await;
        self.tracker.wait().await;
        trace!("supervisor stopped");
        Ok(())
    }

    /// Hard-cancels the supervisor task without the shutdown protocol.
    /// Last-resort only; actors are dropped without confirmation.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

/// Spawns a supervisor task and returns its handle.
pub(crate) fn spawn(config: SupervisorConfig, system: Arc<SystemContext>) -> SupervisorHandle {
    let id = SupervisorId::mint();
    let (outbox, inbox) = channel(config.mailbox_capacity);
    let hub = MailboxHub::new(id, outbox);
    let address = Address::mint(&hub);

    let mut base = ActorBase::new();
    base.bind(
        address.clone(),
        config.init_timeout,
        config.shutdown_timeout,
    );
    base.plugins = vec![
        Box::new(InitShutdownPlugin),
        Box::new(LifetimePlugin::new()),
        Box::new(ChildManagerPlugin::default()),
    ];
    let supervisor = Supervisor {
        base,
        setup: config.setup,
        on_child_init: config.on_child_init,
        on_child_shutdown: config.on_child_shutdown,
    };
    let supervisor_actor = supervisor.base.id();

    let mut actors: ActorArena = HashMap::new();
    actors.insert(supervisor_actor, Box::new(supervisor));
    let mut addresses = HashMap::new();
    addresses.insert(address.clone(), supervisor_actor);

    let cancel = CancellationToken::new();
    let state = SupervisorState {
        id,
        address: address.clone(),
        hub: hub.clone(),
        inbox,
        actors,
        addresses,
        registry: SubscriptionRegistry::default(),
        mapping: AddressMapping::default(),
        correlator: Correlator::default(),
        continuations: VecDeque::new(),
        system,
        settings: SupervisorSettings {
            name: config.name,
            policy: config.policy,
            synchronize_start: config.synchronize_start,
        },
        supervisor_actor,
        cancel: cancel.clone(),
    };

    let tracker = TaskTracker::new();
    tracker.spawn(state.run());
    tracker.close();

    SupervisorHandle {
        address,
        hub,
        tracker,
        cancel,
    }
}

struct SupervisorState {
    id: SupervisorId,
    address: Address,
    hub: Arc<MailboxHub>,
    inbox: Receiver<Envelope>,
    actors: ActorArena,
    addresses: HashMap<Address, crate::common::types::ActorId>,
    registry: SubscriptionRegistry,
    mapping: AddressMapping,
    correlator: Correlator,
    continuations: VecDeque<Continuation>,
    system: Arc<SystemContext>,
    settings: SupervisorSettings,
    supervisor_actor: crate::common::types::ActorId,
    cancel: CancellationToken,
}

impl SupervisorState {
    #[instrument(skip(self), fields(supervisor = %self.id, name = %self.settings.name))]
    async fn run(mut self) {
        self.startup();
        self.drain_continuations();
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("supervisor task cancelled");
                    break;
                }
                incoming = self.inbox.recv() => {
                    let Some(envelope) = incoming else { break };
                    self.process(envelope);
                    self.drain_continuations();
                    if self.finished() {
                        trace!("supervisor shut down, closing mailbox");
                        self.inbox.close();
                        break;
                    }
                }
            }
        }
        for pending in self.correlator.drain() {
            self.system.event_loop().cancel_timer(&pending.timer);
        }
        debug!("supervisor loop finished");
    }

    fn startup(&mut self) {
        let root = self.supervisor_actor;
        self.invoke_checked_out(root, |actor, ctx| lifecycle::activate(actor, ctx));
    }

    fn finished(&self) -> bool {
        match self.actors.get(&self.supervisor_actor) {
            Some(actor) => actor.base().state() == ActorState::ShutDown,
            None => true,
        }
    }

    /// Checks the owner actor out of the arena, builds a context over
    /// everything else, and runs `f`. While `f` runs, the checked-out actor
    /// is invisible through the context.
    fn invoke_checked_out(
        &mut self,
        owner: crate::common::types::ActorId,
        f: impl FnOnce(&mut Box<dyn Actor>, &mut Context<'_>),
    ) {
        let Some(mut actor) = self.actors.remove(&owner) else {
            trace!(owner = %owner, "dropping work for absent actor");
            return;
        };
        let mut ctx = Context {
            supervisor_id: self.id,
            supervisor_address: &self.address,
            hub: &self.hub,
            actors: &mut self.actors,
            addresses: &mut self.addresses,
            registry: &mut self.registry,
            mapping: &mut self.mapping,
            correlator: &mut self.correlator,
            continuations: &mut self.continuations,
            system: &self.system,
            settings: &self.settings,
        };
        f(&mut actor, &mut ctx);
        self.actors.insert(owner, actor);
    }

    fn with_ctx<R>(&mut self, f: impl FnOnce(&mut Context<'_>) -> R) -> R {
        let mut ctx = Context {
            supervisor_id: self.id,
            supervisor_address: &self.address,
            hub: &self.hub,
            actors: &mut self.actors,
            addresses: &mut self.addresses,
            registry: &mut self.registry,
            mapping: &mut self.mapping,
            correlator: &mut self.correlator,
            continuations: &mut self.continuations,
            system: &self.system,
            settings: &self.settings,
        };
        f(&mut ctx)
    }

    fn process(&mut self, envelope: Envelope) {
        // Responses correlate before anything else; unknown ids are stale.
        if let Some(id) = envelope.request_id {
            let Some(pending) = self.correlator.settle(id) else {
                trace!(request = %id, "dropping stale response");
                return;
            };
            self.system.event_loop().cancel_timer(&pending.timer);
            self.dispatch(envelope);
            return;
        }

        let message = envelope.message.clone();
        if let Some(timer) = message.as_any().downcast_ref::<TimerFired>() {
            self.on_timer(timer.request);
            return;
        }
        if let Some(call) = message.as_any().downcast_ref::<HandlerCall>() {
            self.on_handler_call(call);
            return;
        }
        if let Some(subscription) = message.as_any().downcast_ref::<ExternalSubscription>() {
            self.on_external_subscription(subscription);
            return;
        }
        if let Some(unsubscription) = message.as_any().downcast_ref::<ExternalUnsubscription>() {
            let point = unsubscription.point.clone();
            self.with_ctx(|ctx| ctx.unsubscribe(&point));
            return;
        }
        self.dispatch(envelope);
    }

    /// Resolves the handler set for the envelope and invokes or forwards
    /// each handler. No matching handler is a silent drop.
    fn dispatch(&mut self, envelope: Envelope) {
        let type_id = envelope.message.as_any().type_id();
        let handlers = self.registry.lookup(&envelope.target, type_id);
        if handlers.is_empty() {
            trace!(to = ?envelope.target, "no handler for message, dropping");
            return;
        }
        for handler in handlers {
            if handler.owner_supervisor() == self.id {
                let owner = handler.owner();
                let handler = handler.clone();
                let envelope = envelope.clone();
                self.invoke_checked_out(owner, move |actor, ctx| {
                    handler.invoke(actor, &envelope, ctx);
                });
            } else {
                trace!(handler = ?handler, "forwarding to foreign supervisor");
                let call = HandlerCall {
                    origin: envelope.target.clone(),
                    message: envelope.message.clone(),
                    handler: handler.clone(),
                };
                let target = handler.owner_address().clone();
                target.post(Envelope::new(target.clone(), Arc::new(call)));
            }
        }
    }

    /// A request timer fired: synthesize the timeout response and deliver it
    /// to the stored reply address. A settled request ignores the wake.
    fn on_timer(&mut self, request: crate::common::types::RequestId) {
        let Some(pending) = self.correlator.settle(request) else {
            trace!(request = %request, "timer fired for settled request");
            return;
        };
        debug!(request = %request, "request timed out");
        let response = (pending.synthesize)();
        self.dispatch(Envelope::new(pending.reply_to.clone(), response));
    }

    /// Foreign delivery: invoke the wrapped handler on the wrapped message.
    fn on_handler_call(&mut self, call: &HandlerCall) {
        let handler = call.handler.clone();
        if handler.owner_supervisor() != self.id {
            trace!("handler call for foreign owner, dropping");
            return;
        }
        let original = Envelope::new(call.origin.clone(), call.message.clone());
        let owner = handler.owner();
        self.invoke_checked_out(owner, move |actor, ctx| {
            handler.invoke(actor, &original, ctx);
        });
    }

    /// Install a foreign handler on a local address: registry entry, a
    /// SUPERVISOR-owned point in the address mapping, and a confirmation
    /// back to the handler's owner.
    fn on_external_subscription(&mut self, subscription: &ExternalSubscription) {
        let point = &subscription.point;
        if point.address.supervisor() != self.id {
            trace!(point = ?point, "external subscription for foreign address, dropping");
            return;
        }
        if !self
            .registry
            .insert(point.address.clone(), point.handler.clone())
        {
            return;
        }
        if let Some(owner) = self.addresses.get(&point.address).copied() {
            self.mapping.add(
                owner,
                SubscriptionPoint::new(
                    point.address.clone(),
                    point.handler.clone(),
                    OwnerTag::Supervisor,
                ),
            );
        }
        let confirmed = SubscriptionConfirmed {
            point: SubscriptionPoint::new(
                point.address.clone(),
                point.handler.clone(),
                OwnerTag::Actor,
            ),
        };
        let to = point.handler.owner_address().clone();
        to.post(Envelope::new(to.clone(), Arc::new(confirmed)));
    }

    fn drain_continuations(&mut self) {
        while let Some(continuation) = self.continuations.pop_front() {
            match continuation {
                Continuation::Install(bundle) => self.install(bundle),
                Continuation::InitContinue(id) => {
                    self.invoke_checked_out(id, lifecycle::init_continue)
                }
                Continuation::ShutdownContinue(id) => {
                    self.invoke_checked_out(id, lifecycle::shutdown_continue)
                }
                Continuation::Start(id) => self.invoke_checked_out(id, lifecycle::start),
                Continuation::SubscriptionNotice(id, point) => {
                    self.invoke_checked_out(id, move |actor, ctx| {
                        lifecycle::on_subscription(actor, &point, ctx);
                    })
                }
                Continuation::ForgetPoint(id, point) => {
                    self.invoke_checked_out(id, move |actor, ctx| {
                        lifetime_forget(actor, &point, ctx);
                    })
                }
                Continuation::RemoveActor(id) => {
                    self.addresses.retain(|_, owner| *owner != id);
                    if self.actors.remove(&id).is_some() {
                        trace!(actor = %id, "actor dropped");
                    }
                }
            }
        }
    }

    /// Installs a created child: default chain plus extras, address
    /// registration, and the activation walk.
    fn install(&mut self, bundle: ChildBundle) {
        let mut actor = bundle.actor;
        let mut chain: Vec<Box<dyn Plugin>> = vec![
            Box::new(InitShutdownPlugin),
            Box::new(LifetimePlugin::new()),
            Box::new(PrestarterPlugin::new()),
        ];
        chain.extend(bundle.plugins);
        actor.base_mut().plugins = chain;

        let id = actor.base().id();
        let address = actor.base().bound_address().clone();
        self.addresses.insert(address, id);
        self.actors.insert(id, actor);
        self.invoke_checked_out(id, |actor, ctx| lifecycle::activate(actor, ctx));
    }
}

/// Routes a forgotten point into the owner's lifetime plugin.
fn lifetime_forget(actor: &mut Box<dyn Actor>, point: &SubscriptionPoint, ctx: &mut Context<'_>) {
    use crate::plugin::PluginIdentity;
    let Some((index, mut plugin)) = actor
        .base_mut()
        .detach_plugin(PluginIdentity::of::<LifetimePlugin>())
    else {
        return;
    };
    if let Some(lifetime) = plugin.as_any_mut().downcast_mut::<LifetimePlugin>() {
        lifetime.forget_point(actor.as_mut(), point, ctx);
    }
    actor.base_mut().attach_plugin(index, plugin);
}
