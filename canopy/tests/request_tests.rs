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

#![allow(dead_code)]

use std::time::Duration;

use canopy::prelude::*;
use tokio::sync::mpsc::unbounded_channel;

use crate::setup::{
    expect_quiet, initialize_tracing, next_event, ReplyNow, Requester, Responder,
};

mod setup;

/// An unanswered request is settled by a synthetic timeout response; the
/// responder's late reply is stale and gets dropped.
#[tokio::test]
async fn request_timeout_then_late_reply_is_dropped() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let supervisor = runtime.spawn_supervisor(SupervisorConfig::new());
    let responder = supervisor
        .create_child(
            Responder::new("b", events.clone(), true),
            ChildSpec::new(),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "b:started");

    let _requester = supervisor
        .create_child(
            Requester::new("a", events.clone(), responder.clone(), Duration::from_millis(50)),
            ChildSpec::new(),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "a:started");
    assert_eq!(next_event(&mut rx).await, "a:response:timeout");

    // Poke the responder into answering the stored request after the
    // timeout already settled it: the reply must not reach the requester.
    supervisor.send(&responder, ReplyNow).await?;
    expect_quiet(&mut rx, Duration::from_millis(100)).await;

    runtime.shutdown_all().await?;
    Ok(())
}

/// A request answered in time cancels its timer and delivers the payload.
#[tokio::test]
async fn request_answered_before_timeout() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let supervisor = runtime.spawn_supervisor(SupervisorConfig::new());
    let responder = supervisor
        .create_child(
            Responder::new("b", events.clone(), false),
            ChildSpec::new(),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "b:started");

    let _requester = supervisor
        .create_child(
            Requester::new("a", events.clone(), responder.clone(), Duration::from_secs(1)),
            ChildSpec::new(),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "a:started");
    assert_eq!(next_event(&mut rx).await, "a:response:ok");

    // No duplicate or synthetic response follows.
    expect_quiet(&mut rx, Duration::from_millis(100)).await;

    runtime.shutdown_all().await?;
    Ok(())
}
