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

//! Reusable slices of actor behavior.
//!
//! A plugin is a gate/observer attached to an actor's ordered chain. Plugins
//! subscribe message handlers during activation, arm *reactions* to declare
//! which lifecycle phases they gate, and release those phases by answering
//! the corresponding `handle_*` call with `true`.
//!
//! The chain is walked in order for activation and init, and in reverse
//! order for shutdown and deactivation. While a walk (or a plugin-bound
//! message handler) runs, the plugin being called is detached from the
//! chain; plugins therefore never re-enter the lifecycle driver directly and
//! instead request continuation through [`Context`].

use std::any::{Any, TypeId};
use std::fmt;

use bitflags::bitflags;

use crate::common::Context;
use crate::supervisor::SubscriptionPoint;
use crate::traits::Actor;

pub mod child_manager;
pub mod init_shutdown;
pub mod lifetime;
pub mod prestarter;

pub use child_manager::{ChildManagerPlugin, SupervisorPolicy};
pub use init_shutdown::InitShutdownPlugin;
pub use lifetime::LifetimePlugin;
pub use prestarter::PrestarterPlugin;

bitflags! {
    /// Which lifecycle phases a plugin currently gates.
    ///
    /// A phase with the matching reaction armed may not proceed past the
    /// plugin until its `handle_*` returns `true`. A reaction armed by a
    /// plugin is disarmed exactly once, by that same plugin, when it
    /// acknowledges the relevant event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Reactions: u8 {
        const INIT = 1 << 0;
        const SHUTDOWN = 1 << 1;
        const START = 1 << 2;
        const SUBSCRIPTION = 1 << 3;
    }
}

/// A stable token identifying a plugin class.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginIdentity(TypeId);

impl PluginIdentity {
    /// The identity of plugin type `P`.
    pub fn of<P: Plugin>() -> Self {
        Self(TypeId::of::<P>())
    }
}

impl fmt::Debug for PluginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginIdentity({:?})", self.0)
    }
}

/// One slice of actor behavior in the ordered plugin chain.
pub trait Plugin: Any + Send {
    /// Stable token identifying the plugin class.
    fn identity(&self) -> PluginIdentity;

    /// Downcasting access for plugin-bound handlers.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The reactions this plugin currently has armed.
    fn reactions(&self) -> Reactions;

    /// Called in chain order when the actor is installed; registers handlers
    /// and arms reactions. Conventionally ends by calling
    /// `actor.configure(self, ctx)` so the actor can parameterize the plugin.
    fn activate(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>);

    /// Called in reverse chain order once shutdown has fully completed.
    fn deactivate(&mut self, _actor: &mut dyn Actor, _ctx: &mut Context<'_>) {}

    /// Init gate; consulted in chain order while the INIT reaction is armed.
    /// Returning `false` halts init at this plugin.
    fn handle_init(&mut self, _actor: &mut dyn Actor, _ctx: &mut Context<'_>) -> bool {
        true
    }

    /// Shutdown gate; consulted in reverse chain order while the SHUTDOWN
    /// reaction is armed. Returning `false` halts shutdown at this plugin.
    fn handle_shutdown(&mut self, _actor: &mut dyn Actor, _ctx: &mut Context<'_>) -> bool {
        true
    }

    /// Start observer; called while the START reaction is armed, just before
    /// the actor becomes operational.
    fn handle_start(&mut self, _actor: &mut dyn Actor, _ctx: &mut Context<'_>) {}

    /// Subscription observer; called for each confirmed subscription point
    /// while the SUBSCRIPTION reaction is armed. Returning `true` means this
    /// plugin is done observing subscriptions.
    fn handle_subscription(
        &mut self,
        _actor: &mut dyn Actor,
        _point: &SubscriptionPoint,
        _ctx: &mut Context<'_>,
    ) -> bool {
        true
    }
}
