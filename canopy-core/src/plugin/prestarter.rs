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

//! Init gating on required subscriptions.

use std::any::{Any, TypeId};

use tracing::trace;

use crate::common::Context;
use crate::message::Address;
use crate::plugin::{Plugin, PluginIdentity, Reactions};
use crate::supervisor::SubscriptionPoint;
use crate::traits::{Actor, ActorMessage};

/// Holds an actor in `Initializing` until a declared set of subscription
/// points has been confirmed.
///
/// Requirements are declared during `configure`:
///
/// ```ignore
/// fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
///     if let Some(prestarter) = plugin.as_any_mut().downcast_mut::<PrestarterPlugin>() {
///         prestarter.require::<PriceTick>(&self.feed_address);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct PrestarterPlugin {
    reactions: Reactions,
    tracked: Vec<(Address, TypeId)>,
    continue_init: bool,
}

impl PrestarterPlugin {
    pub fn new() -> Self {
        Self {
            reactions: Reactions::empty(),
            tracked: Vec::new(),
            continue_init: false,
        }
    }

    /// Declares that a subscription for message type `M` on `address` must
    /// be confirmed before the host actor may finish init.
    pub fn require<M: ActorMessage>(&mut self, address: &Address) {
        self.tracked.push((address.clone(), TypeId::of::<M>()));
    }
}

impl Default for PrestarterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for PrestarterPlugin {
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
            .insert(Reactions::INIT | Reactions::SUBSCRIPTION);
        actor.configure(self, ctx);
        if self.tracked.is_empty() {
            self.reactions
                .remove(Reactions::INIT | Reactions::SUBSCRIPTION);
        }
    }

    fn handle_init(&mut self, _actor: &mut dyn Actor, _ctx: &mut Context<'_>) -> bool {
        if self.tracked.is_empty() {
            self.reactions.remove(Reactions::INIT);
            return true;
        }
        self.continue_init = true;
        false
    }

    fn handle_subscription(
        &mut self,
        actor: &mut dyn Actor,
        point: &SubscriptionPoint,
        ctx: &mut Context<'_>,
    ) -> bool {
        self.tracked.retain(|(address, message_type)| {
            *address != point.address || *message_type != point.handler.message_type()
        });
        if !self.tracked.is_empty() {
            return false;
        }
        trace!(actor = %actor.base().id(), "all required subscriptions confirmed");
        self.reactions
            .remove(Reactions::INIT | Reactions::SUBSCRIPTION);
        if self.continue_init {
            self.continue_init = false;
            let id = actor.base().id();
            ctx.continue_init(id);
        }
        true
    }
}
