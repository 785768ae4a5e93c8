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

use std::sync::Arc;
use std::time::SystemTime;

use static_assertions::assert_impl_all;

use crate::common::types::RequestId;
use crate::message::Address;
use crate::traits::ActorMessage;

/// Represents an envelope that carries a message within the actor system.
///
/// Envelopes are immutable once enqueued. The optional `request_id` tag is
/// set only on response envelopes so the receiving supervisor's correlator
/// can match them against pending requests without downcasting the payload.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The address the message is being delivered to.
    pub target: Address,
    /// The message contained in the envelope.
    pub message: Arc<dyn ActorMessage + Send + Sync + 'static>,
    /// The time when the message was enqueued.
    pub timestamp: SystemTime,
    pub(crate) request_id: Option<RequestId>,
}

impl Envelope {
    /// Creates a new envelope carrying `message` to `target`.
    pub fn new(target: Address, message: Arc<dyn ActorMessage + Send + Sync + 'static>) -> Self {
        Envelope {
            target,
            message,
            timestamp: SystemTime::now(),
            request_id: None,
        }
    }

    pub(crate) fn correlated(
        target: Address,
        message: Arc<dyn ActorMessage + Send + Sync + 'static>,
        request_id: RequestId,
    ) -> Self {
        Envelope {
            target,
            message,
            timestamp: SystemTime::now(),
            request_id: Some(request_id),
        }
    }
}

// Ensures that Envelope implements the Send trait.
assert_impl_all!(Envelope: Send);
