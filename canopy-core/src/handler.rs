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

//! Type-erased message handlers.
//!
//! A handler is the `(address, message-type)` entry point bound to an actor,
//! a plugin, or a free closure. Identity is `(handler source, owner actor)`:
//! the source token is the `TypeId` of the registered closure type, which is
//! unique per registration site, so re-subscribing the same site on the same
//! actor is a no-op while distinct sites coexist on one address.

use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{error, trace};

use crate::common::types::{ActorId, SupervisorId};
use crate::common::Context;
use crate::message::{Address, Envelope};
use crate::plugin::{Plugin, PluginIdentity};
use crate::traits::{Actor, ActorMessage};

pub(crate) type InvokeFn = Box<dyn Fn(&mut Box<dyn Actor>, &Envelope, &mut Context<'_>) + Send + Sync>;

/// A concrete message-processing point on a concrete actor.
pub struct Handler {
    /// Token of the registration site (the closure's `TypeId`).
    ident: TypeId,
    /// Dispatch key: the message payload type this handler accepts.
    message_type: TypeId,
    /// The actor owning this handler.
    owner: ActorId,
    /// The owner actor's main address; routes confirmations and decides
    /// local-vs-foreign invocation.
    owner_address: Address,
    /// Precalculated hash over `(ident, owner)`.
    precalc_hash: u64,
    invoke: InvokeFn,
}

impl Handler {
    fn build(
        ident: TypeId,
        message_type: TypeId,
        owner: ActorId,
        owner_address: Address,
        invoke: InvokeFn,
    ) -> Arc<Self> {
        let mut hasher = DefaultHasher::new();
        ident.hash(&mut hasher);
        owner.hash(&mut hasher);
        Arc::new(Self {
            ident,
            message_type,
            owner,
            owner_address,
            precalc_hash: hasher.finish(),
            invoke,
        })
    }

    /// A handler bound to a method-like closure on a concrete actor type.
    /// Invocation downcasts the owner to `A`.
    pub fn of_actor<A, M, F>(owner: ActorId, owner_address: Address, f: F) -> Arc<Self>
    where
        A: Actor,
        M: ActorMessage,
        F: Fn(&mut A, &M, &mut Context<'_>) + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Box::new(move |actor, envelope, ctx| {
            let Some(message) = envelope.message.as_any().downcast_ref::<M>() else {
                error!(
                    expected = std::any::type_name::<M>(),
                    "message failed to downcast in actor handler"
                );
                return;
            };
            let Some(target) = actor.as_any_mut().downcast_mut::<A>() else {
                error!(
                    expected = std::any::type_name::<A>(),
                    "actor failed to downcast in actor handler"
                );
                return;
            };
            f(target, message, ctx);
        });
        Self::build(
            TypeId::of::<F>(),
            TypeId::of::<M>(),
            owner,
            owner_address,
            invoke,
        )
    }

    /// A handler bound to a plugin instance living in the owner actor's
    /// chain. The plugin is detached from the chain for the duration of the
    /// call, so the closure additionally receives the host actor.
    pub fn of_plugin<P, M, F>(owner: ActorId, owner_address: Address, f: F) -> Arc<Self>
    where
        P: Plugin,
        M: ActorMessage,
        F: Fn(&mut P, &mut dyn Actor, &M, &mut Context<'_>) + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Box::new(move |actor, envelope, ctx| {
            let Some(message) = envelope.message.as_any().downcast_ref::<M>() else {
                error!(
                    expected = std::any::type_name::<M>(),
                    "message failed to downcast in plugin handler"
                );
                return;
            };
            let Some((index, mut plugin)) =
                actor.base_mut().detach_plugin(PluginIdentity::of::<P>())
            else {
                trace!(
                    plugin = std::any::type_name::<P>(),
                    "plugin no longer attached; dropping message"
                );
                return;
            };
            if let Some(target) = plugin.as_any_mut().downcast_mut::<P>() {
                f(target, actor.as_mut(), message, ctx);
            }
            actor.base_mut().attach_plugin(index, plugin);
        });
        Self::build(
            TypeId::of::<F>(),
            TypeId::of::<M>(),
            owner,
            owner_address,
            invoke,
        )
    }

    /// A handler around a free closure; the registering actor owns the
    /// subscription point but is not passed to the call.
    pub fn of_lambda<M, F>(owner: ActorId, owner_address: Address, f: F) -> Arc<Self>
    where
        M: ActorMessage,
        F: Fn(&M, &mut Context<'_>) + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Box::new(move |_actor, envelope, ctx| {
            let Some(message) = envelope.message.as_any().downcast_ref::<M>() else {
                error!(
                    expected = std::any::type_name::<M>(),
                    "message failed to downcast in lambda handler"
                );
                return;
            };
            f(message, ctx);
        });
        Self::build(
            TypeId::of::<F>(),
            TypeId::of::<M>(),
            owner,
            owner_address,
            invoke,
        )
    }

    /// The message payload type this handler accepts.
    #[inline]
    pub fn message_type(&self) -> TypeId {
        self.message_type
    }

    /// The actor owning this handler.
    #[inline]
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    /// The owner actor's main address.
    #[inline]
    pub fn owner_address(&self) -> &Address {
        &self.owner_address
    }

    /// The supervisor hosting the owner actor.
    #[inline]
    pub fn owner_supervisor(&self) -> SupervisorId {
        self.owner_address.supervisor()
    }

    pub(crate) fn invoke(
        &self,
        actor: &mut Box<dyn Actor>,
        envelope: &Envelope,
        ctx: &mut Context<'_>,
    ) {
        (self.invoke)(actor, envelope, ctx);
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ident == other.ident && self.owner == other.owner
    }
}

impl Eq for Handler {}

impl Hash for Handler {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.precalc_hash);
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("owner", &self.owner)
            .field("message_type", &self.message_type)
            .finish()
    }
}
