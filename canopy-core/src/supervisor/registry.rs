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

//! Subscription bookkeeping owned by the address-owning supervisor.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use derive_new::new;
use tracing::trace;

use crate::common::types::ActorId;
use crate::handler::Handler;
use crate::message::Address;

/// Who installed a subscription point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerTag {
    /// Installed by the actor that owns the handler.
    Actor,
    /// Installed by the supervisor on behalf of a foreign handler; tracked in
    /// the address mapping and unwound through the external-unsubscription
    /// protocol.
    Supervisor,
}

/// A record of one live subscription: `(address, handler, owner)`.
#[derive(Debug, Clone, new)]
pub struct SubscriptionPoint {
    /// The address the handler listens on.
    pub address: Address,
    /// The handler invoked for matching envelopes.
    pub handler: Arc<Handler>,
    /// Who installed the point.
    pub owner_tag: OwnerTag,
}

impl SubscriptionPoint {
    /// True when both records name the same `(address, handler)` pair.
    pub fn matches(&self, other: &SubscriptionPoint) -> bool {
        self.address == other.address && self.handler == other.handler
    }
}

/// Per-address, per-type handler sets.
///
/// Accessed only from the owning supervisor's task; the cross-thread surface
/// of subscription management is the message protocol, not this map.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    entries: HashMap<(Address, TypeId), Vec<Arc<Handler>>>,
}

impl SubscriptionRegistry {
    /// Installs a handler; returns `false` if an equal handler is already
    /// subscribed to the address.
    pub(crate) fn insert(&mut self, address: Address, handler: Arc<Handler>) -> bool {
        let slot = self
            .entries
            .entry((address, handler.message_type()))
            .or_default();
        if slot.iter().any(|existing| **existing == *handler) {
            trace!(handler = ?handler, "handler already subscribed");
            return false;
        }
        slot.push(handler);
        true
    }

    /// Removes a handler; returns `false` if it was not subscribed.
    pub(crate) fn remove(&mut self, address: &Address, handler: &Handler) -> bool {
        let key = (address.clone(), handler.message_type());
        let Some(slot) = self.entries.get_mut(&key) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|existing| **existing != *handler);
        let removed = slot.len() < before;
        if slot.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }

    /// The handlers subscribed to `(address, type)`, cloned out so handlers
    /// may re-enter the registry while being invoked.
    pub(crate) fn lookup(&self, address: &Address, message_type: TypeId) -> Vec<Arc<Handler>> {
        self.entries
            .get(&(address.clone(), message_type))
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// SUPERVISOR-owned subscription points, grouped by the local actor whose
/// address they target. Drives the external-unsubscription protocol when
/// that actor shuts down.
#[derive(Debug, Default)]
pub(crate) struct AddressMapping {
    points: HashMap<ActorId, Vec<SubscriptionPoint>>,
}

impl AddressMapping {
    pub(crate) fn add(&mut self, owner: ActorId, point: SubscriptionPoint) {
        self.points.entry(owner).or_default().push(point);
    }

    pub(crate) fn remove(&mut self, owner: ActorId, point: &SubscriptionPoint) {
        if let Some(slot) = self.points.get_mut(&owner) {
            slot.retain(|existing| !existing.matches(point));
            if slot.is_empty() {
                self.points.remove(&owner);
            }
        }
    }

    /// The points recorded against one local actor, cloned out so the
    /// caller can unsubscribe them while the mapping shrinks underneath.
    pub(crate) fn points_for(&self, owner: ActorId) -> Vec<SubscriptionPoint> {
        self.points.get(&owner).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{ActorId, MailboxHub, SupervisorId};
    use crate::handler::Handler;
    use tokio::sync::mpsc::channel;

    fn test_handler(address: &Address) -> Arc<Handler> {
        Handler::of_lambda::<String, _>(ActorId::mint(), address.clone(), |_msg, _ctx| {})
    }

    #[test]
    fn resubscribe_after_unsubscribe_leaves_single_entry() {
        let (outbox, _inbox) = channel(1);
        let hub = MailboxHub::new(SupervisorId::mint(), outbox);
        let address = Address::mint(&hub);
        let handler = test_handler(&address);

        let mut registry = SubscriptionRegistry::default();
        assert!(registry.insert(address.clone(), handler.clone()));
        assert!(!registry.insert(address.clone(), handler.clone()));
        assert!(registry.remove(&address, &handler));
        assert!(!registry.remove(&address, &handler));
        assert!(registry.insert(address.clone(), handler.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry
                .lookup(&address, handler.message_type())
                .len(),
            1
        );
    }

    #[test]
    fn distinct_sites_coexist_on_one_address() {
        let (outbox, _inbox) = channel(1);
        let hub = MailboxHub::new(SupervisorId::mint(), outbox);
        let address = Address::mint(&hub);
        let owner = ActorId::mint();
        let first = Handler::of_lambda::<String, _>(owner, address.clone(), |_msg, _ctx| {});
        let second = Handler::of_lambda::<String, _>(owner, address.clone(), |_msg, _ctx| {});

        let mut registry = SubscriptionRegistry::default();
        assert!(registry.insert(address.clone(), first.clone()));
        assert!(registry.insert(address.clone(), second));
        assert_eq!(registry.lookup(&address, first.message_type()).len(), 2);
    }
}
