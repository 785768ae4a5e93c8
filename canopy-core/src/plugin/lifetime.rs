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

//! Subscription-lifetime management.
//!
//! Owns the actor's list of subscription points and gates shutdown until the
//! list has drained. Points over local addresses are removed synchronously
//! by the supervisor and forgotten through a direct continuation; points
//! over foreign addresses round-trip through the external-unsubscription
//! protocol and are forgotten when the commit arrives.
//!
//! The drain runs in two phases: foreign points first, local points last.
//! Commit messages are delivered through the registry, so the plugin's own
//! local handler subscriptions must stay installed until every foreign
//! round-trip has come back.

use std::any::Any;

use tracing::trace;

use crate::common::Context;
use crate::message::system::{CommitUnsubscription, SubscriptionConfirmed};
use crate::plugin::{Plugin, PluginIdentity, Reactions};
use crate::supervisor::SubscriptionPoint;
use crate::traits::Actor;

/// Keeps every subscription point of its host actor and unwinds them during
/// shutdown.
#[derive(Debug)]
pub struct LifetimePlugin {
    reactions: Reactions,
    points: Vec<SubscriptionPoint>,
    draining: bool,
    foreign_requested: bool,
    local_requested: bool,
}

impl LifetimePlugin {
    pub fn new() -> Self {
        Self {
            reactions: Reactions::empty(),
            points: Vec::new(),
            draining: false,
            foreign_requested: false,
            local_requested: false,
        }
    }

    /// The points currently held for the host actor.
    pub fn points(&self) -> &[SubscriptionPoint] {
        &self.points
    }

    fn on_subscribed(
        &mut self,
        actor: &mut dyn Actor,
        message: &SubscriptionConfirmed,
        ctx: &mut Context<'_>,
    ) {
        trace!(point = ?message.point, "subscription recorded");
        self.points.push(message.point.clone());
        let owner = actor.base().id();
        ctx.notice_subscription(owner, message.point.clone());
    }

    /// Drops a point from the list and, mid-drain, asks for another
    /// shutdown walk so the next phase can start. Reached both by the
    /// supervisor's direct continuation (local points) and by the
    /// commit-unsubscription handler (foreign points).
    pub(crate) fn forget_point(
        &mut self,
        actor: &mut dyn Actor,
        point: &SubscriptionPoint,
        ctx: &mut Context<'_>,
    ) {
        let before = self.points.len();
        self.points.retain(|existing| !existing.matches(point));
        if self.points.len() == before {
            trace!(point = ?point, "unsubscription for unknown point");
            return;
        }
        if self.draining {
            let foreign_left = self
                .points
                .iter()
                .any(|p| p.address.supervisor() != ctx.supervisor_id());
            if self.points.is_empty() || (!foreign_left && !self.local_requested) {
                let id = actor.base().id();
                ctx.continue_shutdown(id);
            }
        }
    }
}

impl Default for LifetimePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LifetimePlugin {
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
        self.reactions.insert(Reactions::SHUTDOWN);
        let base = actor.base();
        let address = base.bound_address().clone();
        ctx.subscribe_plugin::<Self, SubscriptionConfirmed, _>(
            &address,
            base,
            |plugin, actor, message, ctx| plugin.on_subscribed(actor, message, ctx),
        );
        ctx.subscribe_plugin::<Self, CommitUnsubscription, _>(
            &address,
            base,
            |plugin, actor, message, ctx| plugin.forget_point(actor, &message.point, ctx),
        );
        actor.configure(self, ctx);
    }

    fn handle_shutdown(&mut self, _actor: &mut dyn Actor, ctx: &mut Context<'_>) -> bool {
        if self.points.is_empty() {
            self.reactions.remove(Reactions::SHUTDOWN);
            return true;
        }
        self.draining = true;
        let foreign: Vec<SubscriptionPoint> = self
            .points
            .iter()
            .filter(|point| point.address.supervisor() != ctx.supervisor_id())
            .cloned()
            .collect();
        if !foreign.is_empty() {
            if !self.foreign_requested {
                self.foreign_requested = true;
                trace!(count = foreign.len(), "draining foreign subscription points");
                for point in &foreign {
                    ctx.unsubscribe(point);
                }
            }
            return false;
        }
        if !self.local_requested {
            self.local_requested = true;
            trace!(count = self.points.len(), "draining local subscription points");
            for point in self.points.clone() {
                ctx.unsubscribe(&point);
            }
        }
        false
    }
}
