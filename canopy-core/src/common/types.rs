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

//! Process-unique identifiers and internal type aliases.
//!
//! Identity here is deliberately dumb: monotonically increasing integers
//! minted from process-wide counters. Two ids compare equal only when they
//! name the same entity, which is all the dispatch and bookkeeping paths
//! need.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::Sender;

use crate::message::Envelope;

static NEXT_SUPERVISOR: AtomicU64 = AtomicU64::new(1);
static NEXT_ACTOR: AtomicU64 = AtomicU64::new(1);
static NEXT_ADDRESS: AtomicU64 = AtomicU64::new(1);

/// Identity of one supervisor (one mailbox, one drain task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SupervisorId(u64);

impl SupervisorId {
    pub(crate) fn mint() -> Self {
        Self(NEXT_SUPERVISOR.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SupervisorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sup-{}", self.0)
    }
}

/// Identity of one actor hosted by some supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    pub(crate) fn mint() -> Self {
        Self(NEXT_ACTOR.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// Identity component of an [`Address`](crate::message::Address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressId(u64);

impl AddressId {
    pub(crate) fn mint() -> Self {
        Self(NEXT_ADDRESS.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr-{}", self.0)
    }
}

/// Correlation id of one in-flight request, monotone per supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Sender half of a supervisor mailbox.
pub(crate) type Outbox = Sender<Envelope>;

/// Shared view of a supervisor's mailbox: the one cross-thread surface of
/// the framework. Addresses hold this weakly; handles hold it strongly.
#[derive(Debug)]
pub struct MailboxHub {
    pub(crate) id: SupervisorId,
    pub(crate) outbox: Outbox,
}

impl MailboxHub {
    pub(crate) fn new(id: SupervisorId, outbox: Outbox) -> Arc<Self> {
        Arc::new(Self { id, outbox })
    }
}
