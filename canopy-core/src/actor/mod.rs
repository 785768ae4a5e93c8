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

//! Actor state machinery: the embedded base, the lifecycle driver, and the
//! state enum.

pub(crate) mod base;
pub(crate) mod lifecycle;
pub(crate) mod state;

pub use base::{ActorBase, PendingReply, DEFAULT_LIFECYCLE_TIMEOUT};
pub use state::ActorState;
