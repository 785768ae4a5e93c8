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

//! Request/response correlation with timeout timers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::event_loop::TimerHandle;
use crate::common::types::RequestId;
use crate::message::Address;
use crate::traits::ActorMessage;

/// Builds the synthetic timeout response for a pending request. Captured at
/// request time so the correlator can produce a correctly typed
/// `ServiceResponse<P>` without knowing `P`.
pub(crate) type SynthesizeFn =
    Box<dyn FnOnce() -> Arc<dyn ActorMessage + Send + Sync + 'static> + Send>;

pub(crate) struct PendingRequest {
    pub(crate) reply_to: Address,
    pub(crate) timer: TimerHandle,
    pub(crate) synthesize: SynthesizeFn,
}

/// Maps in-flight request ids to their pending replies.
///
/// Owned by one supervisor, touched only on its task. Ids are monotone per
/// supervisor; a response whose id is not pending is stale and gets dropped
/// by the dispatch loop.
#[derive(Default)]
pub(crate) struct Correlator {
    next: u64,
    pending: HashMap<RequestId, PendingRequest>,
}

impl Correlator {
    pub(crate) fn allocate(&mut self) -> RequestId {
        self.next += 1;
        RequestId(self.next)
    }

    pub(crate) fn register(&mut self, id: RequestId, pending: PendingRequest) {
        self.pending.insert(id, pending);
    }

    /// Settles a pending request, returning its record for timer
    /// cancellation or timeout synthesis. `None` means the id is unknown:
    /// already settled, discarded, or never ours.
    pub(crate) fn settle(&mut self, id: RequestId) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Drops every pending request, returning the records so their timers
    /// can be cancelled. Used when the supervisor winds down.
    pub(crate) fn drain(&mut self) -> Vec<PendingRequest> {
        self.pending.drain().map(|(_, pending)| pending).collect()
    }
}
