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
    initialize_tracing, next_event, EventActor, QueryOf, ReasonReporter, StateProbe, StuckInit,
};

mod setup;

/// A child whose init times out is shut down alone under
/// `ShutdownFailed`; the supervisor stays operational.
#[tokio::test]
async fn init_timeout_shuts_down_only_failed_child() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let init_events = events.clone();
    let shutdown_events = events.clone();
    let supervisor = runtime.spawn_supervisor(
        SupervisorConfig::new()
            .with_policy(SupervisorPolicy::ShutdownFailed)
            .on_child_init(move |_, error| {
                let outcome = match error {
                    None => "ok".to_string(),
                    Some(error) if error.contains(ErrorCode::RequestTimeout) => {
                        "timeout".to_string()
                    }
                    Some(error) => format!("err:{error}"),
                };
                init_events.send(format!("child-init:{outcome}")).ok();
            })
            .on_child_shutdown(move |_, error| {
                let outcome = if error.is_none() { "ok" } else { "err" };
                shutdown_events.send(format!("child-shutdown:{outcome}")).ok();
            }),
    );

    let _stuck = supervisor
        .create_child(
            StuckInit::new(),
            ChildSpec::new().with_init_timeout(Duration::from_millis(10)),
        )
        .await?;

    assert_eq!(next_event(&mut rx).await, "child-init:timeout");
    assert_eq!(next_event(&mut rx).await, "child-shutdown:ok");

    // The supervisor survived and still serves requests.
    let probe = supervisor
        .create_child(StateProbe::new(events.clone()), ChildSpec::new())
        .await?;
    assert_eq!(next_event(&mut rx).await, "child-init:ok");
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

/// A child failing init while the supervisor is itself initializing, under
/// `ShutdownSelf`: the supervisor's own init is answered with a failure
/// escalation and the whole tree comes down, the child's shutdown reason
/// carrying the full causality chain back to the timeout.
#[tokio::test]
async fn child_init_failure_escalates_under_shutdown_self() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let init_events = events.clone();
    let setup_events = events.clone();
    let supervisor = runtime.spawn_supervisor(
        SupervisorConfig::new()
            .with_policy(SupervisorPolicy::ShutdownSelf)
            .with_init_timeout(Duration::from_secs(2))
            .with_setup(move |ctx| {
                ctx.create_child(
                    StuckInit::new(),
                    ChildSpec::new()
                        .with_init_timeout(Duration::from_millis(10))
                        .with_plugin(ReasonReporter::new(setup_events.clone())),
                );
            })
            .on_child_init(move |_, error| {
                let outcome = match error {
                    None => "ok".to_string(),
                    Some(error) if error.contains(ErrorCode::RequestTimeout) => {
                        "timeout".to_string()
                    }
                    Some(error) => format!("err:{error}"),
                };
                init_events.send(format!("child-init:{outcome}")).ok();
            }),
    );

    assert_eq!(next_event(&mut rx).await, "child-init:timeout");

    // The cascade reason preserves causality: supervisor shutdown, caused by
    // its failed init, caused by the escalation, caused by the timeout.
    let reason = next_event(&mut rx).await;
    assert!(reason.starts_with("reason:supervisor is shutting down"));
    assert!(reason.ends_with("request timeout"));

    // The supervisor tore itself down completely.
    supervisor.stop(None).await?;
    assert!(supervisor
        .send(
            supervisor.address(),
            QueryOf {
                supervisor: supervisor.address().clone(),
                subject: supervisor.address().clone(),
            }
        )
        .await
        .is_err());

    runtime.shutdown_all().await?;
    Ok(())
}

/// With `synchronize_start`, every child reaches `Initialized` before any
/// receives its start; the starts are broadcast only once the supervisor
/// itself becomes operational.
#[tokio::test]
async fn synchronize_start_holds_children_until_supervisor_operational() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = CanopySystem::launch();
    let (events, mut rx) = unbounded_channel();

    let init_events = events.clone();
    let setup_events = events.clone();
    let _supervisor = runtime.spawn_supervisor(
        SupervisorConfig::new()
            .with_synchronize_start(true)
            .with_setup(move |ctx| {
                ctx.create_child(EventActor::new("c1", setup_events.clone()), ChildSpec::new());
                ctx.create_child(EventActor::new("c2", setup_events.clone()), ChildSpec::new());
            })
            .on_child_init(move |_, error| {
                let outcome = if error.is_none() { "ok" } else { "err" };
                init_events.send(format!("child-init:{outcome}")).ok();
            }),
    );

    let mut observed = Vec::new();
    for _ in 0..4 {
        observed.push(next_event(&mut rx).await);
    }

    let first_start = observed
        .iter()
        .position(|event| event.ends_with(":started"))
        .expect("no start observed");
    let inits_before_start = observed[..first_start]
        .iter()
        .filter(|event| *event == "child-init:ok")
        .count();
    assert_eq!(
        inits_before_start, 2,
        "both children must initialize before either starts: {observed:?}"
    );
    assert!(observed.contains(&"c1:started".to_string()));
    assert!(observed.contains(&"c2:started".to_string()));

    runtime.shutdown_all().await?;
    Ok(())
}
