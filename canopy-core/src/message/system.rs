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

//! The message catalog of the lifecycle and subscription protocols.
//!
//! Everything the framework coordinates — child creation, init, start,
//! shutdown, subscription management, cross-supervisor delivery, timer
//! wakes — travels through these payloads on the same dispatch paths as
//! application messages.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::actor::ActorState;
use crate::common::types::RequestId;
use crate::error::ExtendedError;
use crate::handler::Handler;
use crate::message::request::RequestPayload;
use crate::message::Address;
use crate::plugin::Plugin;
use crate::supervisor::SubscriptionPoint;
use crate::traits::{Actor, ActorMessage};

/// Request: initialize the target actor.
#[derive(Debug, Clone)]
pub struct InitActor;

/// Confirmation payload of a successful init.
#[derive(Debug, Clone)]
pub struct InitConfirmed;

impl RequestPayload for InitActor {
    type Response = InitConfirmed;
}

/// Request: shut the target actor down, with an optional reason.
#[derive(Debug, Clone)]
pub struct ShutdownActor {
    /// Why the shutdown was requested; the target keeps the first non-empty
    /// reason it sees.
    pub reason: Option<ExtendedError>,
}

/// Confirmation payload of a completed shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownConfirmed;

impl RequestPayload for ShutdownActor {
    type Response = ShutdownConfirmed;
}

/// Sent to an initialized actor to make it operational.
#[derive(Debug, Clone)]
pub struct StartActor;

/// Asks the supervisor to begin shutting down the actor behind `target`.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    /// The actor to shut down; the supervisor's own address shuts down the
    /// whole subtree.
    pub target: Address,
    /// Optional reason recorded into the target's shutdown reason.
    pub reason: Option<ExtendedError>,
}

/// Request: report the lifecycle state of the actor behind `subject`.
#[derive(Debug, Clone)]
pub struct QueryState {
    /// The actor whose state is being asked for.
    pub subject: Address,
}

/// Response payload of [`QueryState`].
#[derive(Debug, Clone)]
pub struct StateReport {
    /// The subject's state at the time the query was processed.
    pub state: ActorState,
}

impl RequestPayload for QueryState {
    type Response = StateReport;
}

pub(crate) struct ChildBundle {
    pub(crate) actor: Box<dyn Actor>,
    pub(crate) plugins: Vec<Box<dyn Plugin>>,
}

/// Carries a freshly constructed child into its supervisor's task.
///
/// The boxed actor rides behind a mutex'd option so the envelope stays
/// `Clone`; the receiving side takes it exactly once.
#[derive(Clone)]
pub struct CreateChild {
    cell: Arc<Mutex<Option<ChildBundle>>>,
}

impl CreateChild {
    pub(crate) fn new(bundle: ChildBundle) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(bundle))),
        }
    }

    pub(crate) fn take(&self) -> Option<ChildBundle> {
        self.cell.lock().ok()?.take()
    }
}

impl fmt::Debug for CreateChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CreateChild")
    }
}

/// A subscription point was installed; delivered to the owner actor.
#[derive(Debug, Clone)]
pub struct SubscriptionConfirmed {
    /// The installed point.
    pub point: SubscriptionPoint,
}

/// Subscribe a foreign handler; sent to the address-owning supervisor.
#[derive(Debug, Clone)]
pub struct ExternalSubscription {
    /// The point to install; its address belongs to the receiving
    /// supervisor, its handler to the sending one.
    pub point: SubscriptionPoint,
}

/// Remove a foreign subscription; sent to the address-owning supervisor.
#[derive(Debug, Clone)]
pub struct ExternalUnsubscription {
    /// The point to remove.
    pub point: SubscriptionPoint,
}

/// The address-owning supervisor removed a foreign subscription; delivered
/// to the handler's owner actor so it can drop the point from its list.
#[derive(Debug, Clone)]
pub struct CommitUnsubscription {
    /// The removed point.
    pub point: SubscriptionPoint,
}

/// Cross-supervisor delivery: the original message wrapped together with the
/// foreign handler that must process it, addressed to the handler's owner.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    /// The address the original message was sent to.
    pub origin: Address,
    /// The original message.
    pub message: Arc<dyn ActorMessage + Send + Sync + 'static>,
    /// The handler to invoke on the receiving supervisor.
    pub handler: Arc<Handler>,
}

/// Correlator wake: the timer of a pending request fired.
#[derive(Debug, Clone)]
pub struct TimerFired {
    /// The request whose timer elapsed.
    pub request: RequestId,
}
