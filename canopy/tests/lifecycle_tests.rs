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
    expect_quiet, initialize_tracing, next_event, EventActor, QueryOf, ReasonReporter, StateProbe,
};

mod setup;

/// The happy path through one child's whole lifecycle, without
/// synchronize-start:
///
/// create → init request → init confirmation → start; then trigger →
/// shutdown request → shutdown confirmation, leaving the supervisor with
/// only its self-entry.
#[tokio::test]
async fn child_init_start_shutdown_sequence() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let init_events = events.clone();
    let shutdown_events = events.clone();
    let supervisor = runtime.spawn_supervisor(
        SupervisorConfig::new()
            .with_name("s1")
            .on_child_init(move |_, error| {
                let outcome = if error.is_none() { "ok" } else { "err" };
                init_events.send(format!("child-init:{outcome}")).ok();
            })
            .on_child_shutdown(move |_, error| {
                let outcome = if error.is_none() { "ok" } else { "err" };
                shutdown_events.send(format!("child-shutdown:{outcome}")).ok();
            }),
    );

    let child = supervisor
        .create_child(
            EventActor::new("c", events.clone()),
            ChildSpec::new()
                .with_init_timeout(Duration::from_secs(1))
                .with_shutdown_timeout(Duration::from_secs(1)),
        )
        .await?;

    assert_eq!(next_event(&mut rx).await, "child-init:ok");
    assert_eq!(next_event(&mut rx).await, "c:started");

    supervisor.trigger_shutdown(&child, None).await?;
    assert_eq!(next_event(&mut rx).await, "child-shutdown:ok");

    // The child is gone: querying its state reports an unknown service,
    // while the supervisor itself is operational.
    let probe = supervisor
        .create_child(StateProbe::new(events.clone()), ChildSpec::new())
        .await?;
    assert_eq!(next_event(&mut rx).await, "child-init:ok");

    supervisor
        .send(
            &probe,
            QueryOf {
                supervisor: supervisor.address().clone(),
                subject: child.clone(),
            },
        )
        .await?;
    assert_eq!(
        next_event(&mut rx).await,
        "state-err:the requested service name is not registered"
    );

    supervisor
        .send(
            &probe,
            QueryOf {
                supervisor: supervisor.address().clone(),
                subject: supervisor.address().clone(),
            },
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "state:Operational");

    runtime.shutdown_all().await?;
    Ok(())
}

/// Two shutdown triggers produce exactly one shutdown confirmation, and the
/// first reason wins.
#[tokio::test]
async fn repeated_shutdown_trigger_keeps_first_reason() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let shutdown_events = events.clone();
    let supervisor = runtime.spawn_supervisor(SupervisorConfig::new().on_child_shutdown(
        move |_, _| {
            shutdown_events.send("child-shutdown".to_string()).ok();
        },
    ));

    let child = supervisor
        .create_child(
            EventActor::new("c", events.clone()),
            ChildSpec::new().with_plugin(ReasonReporter::new(events.clone())),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "c:started");

    supervisor
        .trigger_shutdown(&child, Some(ExtendedError::new(ShutdownCode::UnlinkRequested)))
        .await?;
    supervisor
        .trigger_shutdown(&child, Some(ExtendedError::new(ErrorCode::Cancelled)))
        .await?;

    assert_eq!(next_event(&mut rx).await, "reason:unlink has been requested");
    assert_eq!(next_event(&mut rx).await, "child-shutdown");
    expect_quiet(&mut rx, Duration::from_millis(100)).await;

    runtime.shutdown_all().await?;
    Ok(())
}

/// Stopping a supervisor cascades to its children, recording the
/// supervisor-shutdown reason, and leaves the mailbox closed.
#[tokio::test]
async fn supervisor_stop_cascades_to_children() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let shutdown_events = events.clone();
    let supervisor = runtime.spawn_supervisor(SupervisorConfig::new().on_child_shutdown(
        move |_, _| {
            shutdown_events.send("child-shutdown".to_string()).ok();
        },
    ));

    let _child = supervisor
        .create_child(
            EventActor::new("c", events.clone()),
            ChildSpec::new().with_plugin(ReasonReporter::new(events.clone())),
        )
        .await?;
    assert_eq!(next_event(&mut rx).await, "c:started");

    supervisor.stop(None).await?;
    assert_eq!(
        next_event(&mut rx).await,
        "reason:supervisor is shutting down"
    );
    assert_eq!(next_event(&mut rx).await, "child-shutdown");

    // The loop has exited; further sends fail.
    assert!(supervisor
        .send(supervisor.address(), QueryOf {
            supervisor: supervisor.address().clone(),
            subject: supervisor.address().clone(),
        })
        .await
        .is_err());

    runtime.shutdown_all().await?;
    Ok(())
}
