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

//! Actor lifecycle states.

/// The lifecycle state of an actor.
///
/// The derived ordering is load-bearing: states form a total order and an
/// actor's state is non-decreasing, except that any state may jump directly
/// to [`ActorState::ShuttingDown`] when a shutdown is triggered. The only
/// forward step past [`ActorState::Initialized`] is to
/// [`ActorState::Operational`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActorState {
    /// Constructed, not yet asked to initialize.
    New,
    /// An init request has been received; plugin gates are being consulted.
    Initializing,
    /// All init gates passed; the init confirmation has been sent.
    Initialized,
    /// Started; processing application messages.
    Operational,
    /// A shutdown has been triggered; gates are unwinding.
    ShuttingDown,
    /// Fully torn down; the actor is about to be dropped.
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_totally_ordered() {
        assert!(ActorState::New < ActorState::Initializing);
        assert!(ActorState::Initializing < ActorState::Initialized);
        assert!(ActorState::Initialized < ActorState::Operational);
        assert!(ActorState::Operational < ActorState::ShuttingDown);
        assert!(ActorState::ShuttingDown < ActorState::ShutDown);
    }
}
