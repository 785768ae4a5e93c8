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

use std::any::Any;

use crate::actor::ActorBase;
use crate::common::Context;
use crate::error::ExtendedError;
use crate::message::Address;
use crate::plugin::Plugin;

/// A stateful entity driven by messages, hosted by exactly one supervisor.
///
/// Implementors embed an [`ActorBase`] and expose it through `base` /
/// `base_mut`; the framework keeps all lifecycle machinery there. The
/// remaining methods are hooks with no-op defaults.
///
/// ```ignore
/// struct Counter {
///     base: ActorBase,
///     count: u64,
/// }
///
/// impl Actor for Counter {
///     fn base(&self) -> &ActorBase { &self.base }
///     fn base_mut(&mut self) -> &mut ActorBase { &mut self.base }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
///
///     fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
///         // register handlers, declare prestart requirements, ...
///     }
/// }
/// ```
pub trait Actor: Any + Send {
    /// The framework-owned part of the actor.
    fn base(&self) -> &ActorBase;

    /// Mutable access to the framework-owned part of the actor.
    fn base_mut(&mut self) -> &mut ActorBase;

    /// Downcasting access for handler invocation.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Called once per plugin during activation, in chain order. The place
    /// to register handlers and parameterize plugins (downcast `plugin` by
    /// identity to reach a concrete plugin type).
    fn configure(&mut self, _plugin: &mut dyn Plugin, _ctx: &mut Context<'_>) {}

    /// Called when the actor transitions to operational.
    fn on_start(&mut self, _ctx: &mut Context<'_>) {}

    /// Supervisor hook: a non-self child answered its init request.
    fn on_child_init(
        &mut self,
        _child: &Address,
        _error: Option<&ExtendedError>,
        _ctx: &mut Context<'_>,
    ) {
    }

    /// Supervisor hook: a non-self child confirmed its shutdown.
    fn on_child_shutdown(
        &mut self,
        _child: &Address,
        _error: Option<&ExtendedError>,
        _ctx: &mut Context<'_>,
    ) {
    }
}
