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

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use tracing::trace;

use crate::common::types::{AddressId, MailboxHub, SupervisorId};
use crate::message::Envelope;

/// An addressable endpoint minted by exactly one supervisor.
///
/// An address is pure identity plus a weak route back to the minting
/// supervisor's mailbox. Two addresses compare equal only when they are the
/// same minted identity. An address may outlive its supervisor, in which case
/// it becomes inert: delivery through it is a silent drop.
#[derive(Clone)]
pub struct Address {
    inner: Arc<AddressInner>,
}

struct AddressInner {
    id: AddressId,
    supervisor: SupervisorId,
    hub: Weak<MailboxHub>,
}

impl Address {
    pub(crate) fn mint(hub: &Arc<MailboxHub>) -> Self {
        Self {
            inner: Arc::new(AddressInner {
                id: AddressId::mint(),
                supervisor: hub.id,
                hub: Arc::downgrade(hub),
            }),
        }
    }

    /// The unique identity of this address.
    #[inline]
    pub fn id(&self) -> AddressId {
        self.inner.id
    }

    /// The supervisor that minted this address.
    #[inline]
    pub fn supervisor(&self) -> SupervisorId {
        self.inner.supervisor
    }

    /// Whether the minting supervisor is still alive.
    pub fn is_live(&self) -> bool {
        self.inner.hub.strong_count() > 0
    }

    /// Enqueues an envelope on the owning supervisor's mailbox.
    ///
    /// Delivery to a dead address drops silently; a full mailbox is logged
    /// and the envelope is discarded.
    pub(crate) fn post(&self, envelope: Envelope) {
        let Some(hub) = self.inner.hub.upgrade() else {
            trace!(address = %self.inner.id, "dropping envelope for dead address");
            return;
        };
        if let Err(err) = hub.outbox.try_send(envelope) {
            tracing::error!(
                address = %self.inner.id,
                supervisor = %self.inner.supervisor,
                "failed to enqueue envelope: {}",
                err
            );
        }
    }

    pub(crate) fn hub(&self) -> Option<Arc<MailboxHub>> {
        self.inner.hub.upgrade()
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}@{})", self.inner.id, self.inner.supervisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::channel;

    #[test]
    fn equality_is_identity() {
        let (outbox, _inbox) = channel(1);
        let hub = MailboxHub::new(SupervisorId::mint(), outbox);
        let a = Address::mint(&hub);
        let b = Address::mint(&hub);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn address_outlives_supervisor_as_inert() {
        let (outbox, _inbox) = channel(1);
        let hub = MailboxHub::new(SupervisorId::mint(), outbox);
        let addr = Address::mint(&hub);
        assert!(addr.is_live());
        drop(hub);
        drop(_inbox);
        assert!(!addr.is_live());
    }
}
