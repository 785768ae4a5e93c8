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

//! The lifecycle driver: chain walks over an actor's plugins.
//!
//! All walks detach the chain from the actor for their duration, so plugin
//! code never observes itself through the actor it is handed. Plugins that
//! finish asynchronous work request another walk through
//! [`Context::continue_init`] / [`Context::continue_shutdown`]; the
//! supervisor loop runs those continuations between envelopes.

use std::mem;

use tracing::{instrument, trace};

use crate::actor::ActorState;
use crate::common::Context;
use crate::message::system::{InitActor, InitConfirmed, ShutdownActor, ShutdownConfirmed};
use crate::plugin::Reactions;
use crate::supervisor::SubscriptionPoint;
use crate::traits::Actor;

/// Walks the chain in order, activating each plugin. Called once, when the
/// actor is installed into its supervisor's arena.
#[instrument(skip_all, fields(actor = %actor.base().id()))]
pub(crate) fn activate(actor: &mut Box<dyn Actor>, ctx: &mut Context<'_>) {
    let mut chain = mem::take(&mut actor.base_mut().plugins);
    for plugin in chain.iter_mut() {
        plugin.activate(actor.as_mut(), ctx);
    }
    actor.base_mut().plugins = chain;
    trace!("actor activated");
}

/// Consults INIT gates in chain order; finishes init when none blocks.
///
/// A blocking plugin keeps its reaction armed and is responsible for
/// requesting continuation once its asynchronous work completes.
#[instrument(skip_all, fields(actor = %actor.base().id()))]
pub(crate) fn init_continue(actor: &mut Box<dyn Actor>, ctx: &mut Context<'_>) {
    if actor.base().state() != ActorState::Initializing || actor.base().init_request.is_none() {
        return;
    }
    let mut chain = mem::take(&mut actor.base_mut().plugins);
    let mut blocked = false;
    for plugin in chain.iter_mut() {
        if plugin.reactions().contains(Reactions::INIT)
            && !plugin.handle_init(actor.as_mut(), ctx)
        {
            trace!(plugin = ?plugin.identity(), "init blocked");
            blocked = true;
            break;
        }
    }
    actor.base_mut().plugins = chain;
    if !blocked {
        init_finish(actor, ctx);
    }
}

fn init_finish(actor: &mut Box<dyn Actor>, ctx: &mut Context<'_>) {
    let base = actor.base_mut();
    base.set_state(ActorState::Initialized);
    if let Some(pending) = base.init_request.take() {
        let id = pending.id;
        ctx.respond::<InitActor>(pending, Ok(InitConfirmed));
        trace!(request = %id, "init confirmed");
    }
}

/// Runs START-armed plugins and transitions the actor to operational.
#[instrument(skip_all, fields(actor = %actor.base().id()))]
pub(crate) fn start(actor: &mut Box<dyn Actor>, ctx: &mut Context<'_>) {
    if actor.base().state() != ActorState::Initialized {
        trace!(state = ?actor.base().state(), "ignoring start");
        return;
    }
    let mut chain = mem::take(&mut actor.base_mut().plugins);
    for plugin in chain.iter_mut() {
        if plugin.reactions().contains(Reactions::START) {
            plugin.handle_start(actor.as_mut(), ctx);
        }
    }
    actor.base_mut().plugins = chain;
    actor.base_mut().set_state(ActorState::Operational);
    actor.on_start(ctx);
    trace!("actor operational");
}

/// Consults SHUTDOWN gates in reverse chain order; finishes shutdown when
/// none blocks.
#[instrument(skip_all, fields(actor = %actor.base().id()))]
pub(crate) fn shutdown_continue(actor: &mut Box<dyn Actor>, ctx: &mut Context<'_>) {
    if actor.base().state() != ActorState::ShuttingDown {
        return;
    }
    let mut chain = mem::take(&mut actor.base_mut().plugins);
    let mut blocked = false;
    for plugin in chain.iter_mut().rev() {
        if plugin.reactions().contains(Reactions::SHUTDOWN)
            && !plugin.handle_shutdown(actor.as_mut(), ctx)
        {
            trace!(plugin = ?plugin.identity(), "shutdown blocked");
            blocked = true;
            break;
        }
    }
    actor.base_mut().plugins = chain;
    if !blocked {
        shutdown_finish(actor, ctx);
    }
}

fn shutdown_finish(actor: &mut Box<dyn Actor>, ctx: &mut Context<'_>) {
    if let Some(pending) = actor.base_mut().shutdown_request.take() {
        let id = pending.id;
        ctx.respond::<ShutdownActor>(pending, Ok(ShutdownConfirmed));
        trace!(request = %id, "shutdown confirmed");
    }
    // Deactivate in reverse chain order; the chain is consumed.
    let mut chain = mem::take(&mut actor.base_mut().plugins);
    while let Some(mut plugin) = chain.pop() {
        plugin.deactivate(actor.as_mut(), ctx);
    }
    actor.base_mut().set_state(ActorState::ShutDown);
    trace!("actor shut down");
}

/// Notifies SUBSCRIPTION-armed plugins of one confirmed subscription point.
pub(crate) fn on_subscription(
    actor: &mut Box<dyn Actor>,
    point: &SubscriptionPoint,
    ctx: &mut Context<'_>,
) {
    let mut chain = mem::take(&mut actor.base_mut().plugins);
    for plugin in chain.iter_mut() {
        if plugin.reactions().contains(Reactions::SUBSCRIPTION) {
            plugin.handle_subscription(actor.as_mut(), point, ctx);
        }
    }
    actor.base_mut().plugins = chain;
}
