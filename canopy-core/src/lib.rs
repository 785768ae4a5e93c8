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

#![forbid(unsafe_code)]

//! Canopy Core Library
//!
//! The core of the canopy in-process actor framework: actors carrying
//! ordered plugin chains, supervisors draining per-task mailboxes, typed
//! subscriptions keyed by `(address, message-type)`, and request/response
//! correlation with timeouts. Lifecycle coordination — init, start,
//! shutdown, subscription management — travels as ordinary messages on the
//! same dispatch paths as application traffic.

pub mod actor;
pub mod common;
pub mod error;
pub mod handler;
pub mod message;
pub mod plugin;
pub mod supervisor;
pub mod traits;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::actor::{ActorBase, ActorState};
    pub use crate::common::{
        ActorId, CanopySystem, Context, EventLoop, RequestId, Runtime, SupervisorId,
        SystemContext, TokioEventLoop,
    };
    pub use crate::error::{Code, ErrorCode, ExtendedError, MessageError, ShutdownCode};
    pub use crate::handler::Handler;
    pub use crate::message::system::{QueryState, ShutdownTrigger, StartActor, StateReport};
    pub use crate::message::{Address, RequestPayload, ServiceRequest, ServiceResponse};
    pub use crate::plugin::{
        ChildManagerPlugin, LifetimePlugin, Plugin, PluginIdentity, PrestarterPlugin, Reactions,
        SupervisorPolicy,
    };
    pub use crate::supervisor::{
        ChildSpec, SubscriptionOwner, SubscriptionPoint, SupervisorConfig, SupervisorHandle,
    };
    pub use crate::traits::{Actor, ActorMessage};
}
