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

//! Correlated request/response message wrappers.
//!
//! Every request payload type gets its own pair of dispatch tokens:
//! `ServiceRequest<P>` and `ServiceResponse<P>` are distinct concrete types
//! per `P`, so subscriptions stay fully typed while correlation runs on the
//! untyped `RequestId`.

use crate::common::types::RequestId;
use crate::error::ExtendedError;
use crate::message::Address;
use crate::traits::ActorMessage;

/// A payload that can travel as a request.
///
/// `Response` names the confirmation payload carried back on success.
pub trait RequestPayload: ActorMessage + Clone {
    /// The payload type of the corresponding response.
    type Response: ActorMessage + Clone;
}

/// A request addressed to an actor, answered by a [`ServiceResponse<P>`].
#[derive(Debug, Clone)]
pub struct ServiceRequest<P: RequestPayload> {
    /// Correlation id, unique within the requesting supervisor.
    pub id: RequestId,
    /// Where the response must be delivered.
    pub reply_to: Address,
    /// The request payload itself.
    pub payload: P,
}

/// The answer to a [`ServiceRequest<P>`]: either a typed payload or an error.
///
/// A response whose `error` is [`ErrorCode::RequestTimeout`] may be synthetic,
/// produced by the requester's own correlator when the timer fires first.
///
/// [`ErrorCode::RequestTimeout`]: crate::error::ErrorCode::RequestTimeout
#[derive(Debug, Clone)]
pub struct ServiceResponse<P: RequestPayload> {
    /// Correlation id copied from the request.
    pub id: RequestId,
    /// The failure, if the request did not succeed.
    pub error: Option<ExtendedError>,
    /// The success payload, if the request succeeded.
    pub payload: Option<P::Response>,
}

impl<P: RequestPayload> ServiceResponse<P> {
    pub(crate) fn ok(id: RequestId, payload: P::Response) -> Self {
        Self {
            id,
            error: None,
            payload: Some(payload),
        }
    }

    pub(crate) fn err(id: RequestId, error: ExtendedError) -> Self {
        Self {
            id,
            error: Some(error),
            payload: None,
        }
    }

    /// True when the request succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
