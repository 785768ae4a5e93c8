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

//! Probe actors for the integration suite. Each pushes observable events
//! into an unbounded channel the test asserts against.

use std::any::Any;
use std::time::Duration;

use canopy::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use super::messages::{Ping, Pong, QueryOf, ReplyNow, Tick};

pub type Events = UnboundedSender<String>;

/// Minimal actor that reports its start.
pub struct EventActor {
    base: ActorBase,
    label: String,
    events: Events,
}

impl EventActor {
    pub fn new(label: impl Into<String>, events: Events) -> Self {
        Self {
            base: ActorBase::new(),
            label: label.into(),
            events,
        }
    }
}

impl Actor for EventActor {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_start(&mut self, _ctx: &mut Context<'_>) {
        self.events.send(format!("{}:started", self.label)).ok();
    }
}

/// An actor whose init never completes: it requires a subscription that is
/// never installed.
pub struct StuckInit {
    base: ActorBase,
}

impl StuckInit {
    pub fn new() -> Self {
        Self {
            base: ActorBase::new(),
        }
    }
}

impl Actor for StuckInit {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn configure(&mut self, plugin: &mut dyn Plugin, _ctx: &mut Context<'_>) {
        if let Some(prestarter) = plugin.as_any_mut().downcast_mut::<PrestarterPlugin>() {
            let me = self.base.address().cloned().expect("address bound at spawn");
            prestarter.require::<Tick>(&me);
        }
    }
}

/// Subscribes to [`Tick`] on a target address (local or foreign) and gates
/// its own init on that subscription being confirmed.
pub struct Listener {
    base: ActorBase,
    label: String,
    events: Events,
    target: Address,
}

impl Listener {
    pub fn new(label: impl Into<String>, events: Events, target: Address) -> Self {
        Self {
            base: ActorBase::new(),
            label: label.into(),
            events,
            target,
        }
    }
}

impl Actor for Listener {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
        if let Some(prestarter) = plugin.as_any_mut().downcast_mut::<PrestarterPlugin>() {
            prestarter.require::<Tick>(&self.target);
            let target = self.target.clone();
            ctx.subscribe_actor::<Listener, Tick, _>(&target, &self.base, |actor, tick, _ctx| {
                actor
                    .events
                    .send(format!("{}:tick:{}", actor.label, tick.tag))
                    .ok();
            });
        }
    }

    fn on_start(&mut self, _ctx: &mut Context<'_>) {
        self.events.send(format!("{}:started", self.label)).ok();
    }
}

/// Issues one [`Ping`] request at start and reports the response outcome.
pub struct Requester {
    base: ActorBase,
    label: String,
    events: Events,
    target: Address,
    timeout: Duration,
}

impl Requester {
    pub fn new(
        label: impl Into<String>,
        events: Events,
        target: Address,
        timeout: Duration,
    ) -> Self {
        Self {
            base: ActorBase::new(),
            label: label.into(),
            events,
            target,
            timeout,
        }
    }
}

impl Actor for Requester {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
        if plugin.as_any_mut().downcast_mut::<PrestarterPlugin>().is_some() {
            let me = self.base.address().cloned().expect("address bound at spawn");
            ctx.subscribe_actor::<Requester, ServiceResponse<Ping>, _>(
                &me,
                &self.base,
                |actor, response, _ctx| {
                    let outcome = match &response.error {
                        None => "ok".to_string(),
                        Some(error) if error.contains(ErrorCode::RequestTimeout) => {
                            "timeout".to_string()
                        }
                        Some(error) => format!("err:{error}"),
                    };
                    actor
                        .events
                        .send(format!("{}:response:{}", actor.label, outcome))
                        .ok();
                },
            );
        }
    }

    fn on_start(&mut self, ctx: &mut Context<'_>) {
        self.events.send(format!("{}:started", self.label)).ok();
        let me = self.base.address().cloned().expect("address bound at spawn");
        ctx.request::<Ping>(&self.target, Ping, self.timeout, me);
    }
}

/// Answers [`Ping`] requests, either immediately or only when told to.
pub struct Responder {
    base: ActorBase,
    label: String,
    events: Events,
    silent: bool,
    stored: Option<ServiceRequest<Ping>>,
}

impl Responder {
    pub fn new(label: impl Into<String>, events: Events, silent: bool) -> Self {
        Self {
            base: ActorBase::new(),
            label: label.into(),
            events,
            silent,
            stored: None,
        }
    }
}

impl Actor for Responder {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
        if plugin.as_any_mut().downcast_mut::<PrestarterPlugin>().is_some() {
            let me = self.base.address().cloned().expect("address bound at spawn");
            ctx.subscribe_actor::<Responder, ServiceRequest<Ping>, _>(
                &me,
                &self.base,
                |actor, request, ctx| {
                    if actor.silent {
                        actor.stored = Some(request.clone());
                    } else {
                        ctx.reply::<Ping>(request, Ok(Pong));
                    }
                },
            );
            ctx.subscribe_actor::<Responder, ReplyNow, _>(&me, &self.base, |actor, _msg, ctx| {
                if let Some(request) = actor.stored.take() {
                    ctx.reply::<Ping>(&request, Ok(Pong));
                }
            });
        }
    }

    fn on_start(&mut self, _ctx: &mut Context<'_>) {
        self.events.send(format!("{}:started", self.label)).ok();
    }
}

/// Queries lifecycle states on command and reports the answers.
pub struct StateProbe {
    base: ActorBase,
    events: Events,
}

impl StateProbe {
    pub fn new(events: Events) -> Self {
        Self {
            base: ActorBase::new(),
            events,
        }
    }
}

impl Actor for StateProbe {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn configure(&mut self, plugin: &mut dyn Plugin, ctx: &mut Context<'_>) {
        if plugin.as_any_mut().downcast_mut::<PrestarterPlugin>().is_some() {
            let me = self.base.address().cloned().expect("address bound at spawn");
            ctx.subscribe_actor::<StateProbe, QueryOf, _>(&me, &self.base, |actor, query, ctx| {
                let me = actor.base.address().cloned().expect("address bound at spawn");
                ctx.request::<QueryState>(
                    &query.supervisor,
                    QueryState {
                        subject: query.subject.clone(),
                    },
                    Duration::from_secs(1),
                    me,
                );
            });
            ctx.subscribe_actor::<StateProbe, ServiceResponse<QueryState>, _>(
                &me,
                &self.base,
                |actor, response, _ctx| {
                    let event = match (&response.error, &response.payload) {
                        (Some(error), _) => format!("state-err:{error}"),
                        (None, Some(report)) => format!("state:{:?}", report.state),
                        (None, None) => "state-none".to_string(),
                    };
                    actor.events.send(event).ok();
                },
            );
        }
    }
}

/// A test plugin reporting the host actor's final shutdown reason during
/// deactivation.
pub struct ReasonReporter {
    events: Events,
}

impl ReasonReporter {
    pub fn new(events: Events) -> Self {
        Self { events }
    }
}

impl Plugin for ReasonReporter {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::of::<Self>()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reactions(&self) -> Reactions {
        Reactions::empty()
    }

    fn activate(&mut self, actor: &mut dyn Actor, ctx: &mut Context<'_>) {
        actor.configure(self, ctx);
    }

    fn deactivate(&mut self, actor: &mut dyn Actor, _ctx: &mut Context<'_>) {
        let reason = actor
            .base()
            .shutdown_reason()
            .map(|error| error.to_string())
            .unwrap_or_else(|| "none".to_string());
        self.events.send(format!("reason:{reason}")).ok();
    }
}
