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

use canopy::prelude::*;

/// A broadcast-style application message.
#[derive(Debug, Clone)]
pub struct Tick {
    pub tag: u32,
}

/// A request payload answered with [`Pong`].
#[derive(Debug, Clone)]
pub struct Ping;

#[derive(Debug, Clone)]
pub struct Pong;

impl RequestPayload for Ping {
    type Response = Pong;
}

/// Tells a silent responder to answer its stored request late.
#[derive(Debug, Clone)]
pub struct ReplyNow;

/// Tells a state probe to query one actor's lifecycle state.
#[derive(Debug, Clone)]
pub struct QueryOf {
    pub supervisor: Address,
    pub subject: Address,
}
