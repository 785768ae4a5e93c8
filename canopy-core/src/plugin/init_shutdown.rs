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

//! The actor-side half of the lifecycle protocol.
//!
//! Installed first on every actor. Subscribes the actor's main address to
//! init and shutdown requests and to the start message, records the pending
//! request into the actor base, and asks the supervisor loop to run the
//! matching gate walk.

use std::any::Any;

use tracing::trace;

use crate::actor::{ActorState, PendingReply};
use crate::common::Context;
use crate::error::{ErrorCode, ExtendedError};
use crate::message::request::ServiceRequest;
use crate::message::system::{InitActor, ShutdownActor, ShutdownConfirmed, StartActor};
use crate::plugin::{Plugin, PluginIdentity, Reactions};
use crate::traits::Actor;

/// Lifecycle message plumbing; carries no gates of its own.
#[derive(Debug, Default)]
pub struct InitShutdownPlugin;

impl InitShutdownPlugin {
    fn on_init_request(
        &mut self,
        actor: &mut dyn Actor,
        request: &ServiceRequest<InitActor>,
        ctx: &mut Context<'_>,
    ) {
        let base = actor.base_mut();
        if base.state() >= ActorState::ShuttingDown {
            trace!(actor = %base.id(), "init requested while shutting down");
            ctx.reply::<InitActor>(request, Err(ExtendedError::new(ErrorCode::Cancelled)));
            return;
        }
        base.init_request = Some(PendingReply {
            id: request.id,
            reply_to: request.reply_to.clone(),
        });
        if base.state() == ActorState::New {
            base.set_state(ActorState::Initializing);
        }
        let id = base.id();
        ctx.continue_init(id);
    }

    fn on_shutdown_request(
        &mut self,
        actor: &mut dyn Actor,
        request: &ServiceRequest<ShutdownActor>,
        ctx: &mut Context<'_>,
    ) {
        let base = actor.base_mut();
        if base.state() == ActorState::ShutDown {
            ctx.reply::<ShutdownActor>(request, Ok(ShutdownConfirmed));
            return;
        }
        base.assign_shutdown_reason(request.payload.reason.clone());
        if base.shutdown_request.is_none() {
            base.shutdown_request = Some(PendingReply {
                id: request.id,
                reply_to: request.reply_to.clone(),
            });
        }
        if base.state() < ActorState::ShuttingDown {
            base.set_state(ActorState::ShuttingDown);
        }
        let id = base.id();
        ctx.continue_shutdown(id);
    }
}

impl Plugin for InitShutdownPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::of::<Self>()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reactions(&self) -> Reactions {
        Reactions::empty()
    }

    fn activate(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        let base = actor.base();
        let address = base.bound_address().clone();
        ctx.subscribe_plugin::<Self, ServiceRequest<InitActor>, _>(
            &address,
            base,
            |plugin, actor, request, ctx| plugin.on_init_request(actor, request, ctx),
        );
        ctx.subscribe_plugin::<Self, ServiceRequest<ShutdownActor>, _>(
            &address,
            base,
            |plugin, actor, request, ctx| plugin.on_shutdown_request(actor, request, ctx),
        );
        ctx.subscribe_plugin::<Self, StartActor, _>(&address, base, |_plugin, actor, _msg, ctx| {
            let id = actor.base().id();
            ctx.queue_start(id);
        });
        actor.configure(self, ctx);
    }
}
