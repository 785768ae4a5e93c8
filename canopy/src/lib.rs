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
#![forbid(missing_docs)]

//! # Canopy
//!
//! An in-process actor framework built on Tokio. Independent actors
//! communicate exclusively by asynchronous messages addressed to mailboxes,
//! organized in supervision hierarchies whose lifecycle is coordinated by an
//! ordered, interruptible chain of plugins.
//!
//! ## Key Concepts
//!
//! - **Actors**: stateful entities embedding an `ActorBase`, driven entirely
//!   by messages; affine to their supervisor's task.
//! - **Supervisors**: actors that own a mailbox, dispatch messages, host
//!   children, and drive them through init, start, and shutdown.
//! - **Addresses**: supervisor-minted identities; the routing key for every
//!   send. An address outliving its supervisor is inert.
//! - **Plugins & Reactions**: reusable slices of actor behavior that gate
//!   lifecycle phases (init, shutdown, start, subscription) and release them
//!   as their asynchronous work completes.
//! - **Subscriptions**: typed handlers keyed by `(address, message-type)`,
//!   owned by actors, unwound during shutdown, and forwarded across
//!   supervisors when the target address is foreign.
//! - **Requests**: correlated request/response pairs with timeouts; a timed
//!   out request is answered by a synthetic `request_timeout` response.
//!
//! ## Quick Start
//!
//! ```ignore
//! use canopy::prelude::*;
//!
//! let runtime = CanopySystem::launch();
//! let supervisor = runtime.spawn_supervisor(SupervisorConfig::new());
//! let child = supervisor.create_child(MyActor::default(), ChildSpec::new()).await?;
//! supervisor.send(&child, MyMessage { .. }).await?;
//! ```

/// A prelude module for conveniently importing the most commonly used items.
pub mod prelude {
    pub use canopy_core::prelude::*;
}
