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

use std::collections::HashSet;
use std::time::Duration;

use canopy::prelude::*;
use tokio::sync::mpsc::unbounded_channel;

use crate::setup::{expect_quiet, initialize_tracing, next_event, EventActor, Listener, Pong, Tick};

mod setup;

/// One send reaches every matching handler exactly once; a message type
/// nobody subscribed to is silently dropped.
#[tokio::test]
async fn send_reaches_every_matching_handler_once() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let supervisor = runtime.spawn_supervisor(SupervisorConfig::new());
    let target = supervisor
        .create_child(EventActor::new("t", events.clone()), ChildSpec::new())
        .await?;
    let _l1 = supervisor
        .create_child(
            Listener::new("l1", events.clone(), target.clone()),
            ChildSpec::new(),
        )
        .await?;
    let _l2 = supervisor
        .create_child(
            Listener::new("l2", events.clone(), target.clone()),
            ChildSpec::new(),
        )
        .await?;

    let mut started: HashSet<String> = HashSet::new();
    for _ in 0..3 {
        started.insert(next_event(&mut rx).await);
    }
    assert!(started.contains("t:started"));
    assert!(started.contains("l1:started"));
    assert!(started.contains("l2:started"));

    supervisor.send(&target, Tick { tag: 7 }).await?;
    let mut delivered: HashSet<String> = HashSet::new();
    delivered.insert(next_event(&mut rx).await);
    delivered.insert(next_event(&mut rx).await);
    assert_eq!(
        delivered,
        HashSet::from(["l1:tick:7".to_string(), "l2:tick:7".to_string()])
    );

    // Exactly once per handler; and an unsubscribed message type vanishes.
    supervisor.send(&target, Pong).await?;
    expect_quiet(&mut rx, Duration::from_millis(100)).await;

    runtime.shutdown_all().await?;
    Ok(())
}

/// Cross-supervisor subscription: an actor on one supervisor subscribes to
/// an address owned by another. Delivery forwards through a handler-call;
/// shutdown unwinds the subscription through the external-unsubscription
/// protocol, after which sends to the address stop reaching the listener.
#[tokio::test]
async fn cross_supervisor_subscription_roundtrip() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let s1 = runtime.spawn_supervisor(SupervisorConfig::new().with_name("s1"));
    let shutdown_events = events.clone();
    let s2 = runtime.spawn_supervisor(
        SupervisorConfig::new()
            .with_name("s2")
            .on_child_shutdown(move |_, _| {
                shutdown_events.send("a2-shutdown".to_string()).ok();
            }),
    );

    let alpha = s1
        .create_child(EventActor::new("a1", events.clone()), ChildSpec::new())
        .await?;
    assert_eq!(next_event(&mut rx).await, "a1:started");

    // The listener's init gates on the external subscription confirming, so
    // its start implies the cross-supervisor round-trip completed.
    let a2 = s2
        .create_child(
            Listener::new("a2", events.clone(), alpha.clone()),
            ChildSpec::new(),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "a2:started");

    s1.send(&alpha, Tick { tag: 1 }).await?;
    assert_eq!(next_event(&mut rx).await, "a2:tick:1");

    s2.trigger_shutdown(&a2, None).await?;
    assert_eq!(next_event(&mut rx).await, "a2-shutdown");

    s1.send(&alpha, Tick { tag: 2 }).await?;
    expect_quiet(&mut rx, Duration::from_millis(100)).await;

    runtime.shutdown_all().await?;
    Ok(())
}
