//! Scheduling handlers reacting to per-train cascade events.
//!
//! Each handler declares the [`EventKind`]s it is interested in. The
//! [`HandlerRegistry`] dispatches an event to every interested handler in
//! registration order and collects the follow-up events they return.
//!
//! | Handler | Interests | Effect |
//! |---------|-----------|--------|
//! | [`FeedbackHandler`] | `Feedback` | moves the train into its next block or along its block |
//! | [`EmergencyStopHandler`] | `MovedToNextBlock`, `MovedInsideBlock` | stops a train with nowhere to go |
//! | [`StationRestartHandler`] | `Stopped`, `RestartTimerFired` | station waits and end of service |
//! | [`AutomaticRerouteHandler`] | `Stopped`, `OthersReservationChanged`, `SchedulingChanged` | routes around blocked paths |

use std::collections::BTreeMap;

use crate::config::{Config, ReservedPolicy};
use crate::error::LayoutError;
use crate::events::{EmergencyReason, EventKind, LayoutEvent, Outbox, TrainEvent};
use crate::layout::{FeedbackId, Layout, Scheduling, TrainId};
use crate::motion::{self, MotionState};
use crate::reservation;
use crate::route::Route;
use crate::router::{RouteRequest, Router};

/// Mutable state a handler works on.
pub struct HandlerContext<'a> {
    /// The layout.
    pub layout: &'a mut Layout,
    /// Controller configuration.
    pub config: &'a Config,
    /// Commands and events of the current cascade step.
    pub out: &'a mut Outbox,
}

/// A reaction to cascade events of one train.
pub trait TrainHandler: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Event kinds this handler wants to see.
    fn interests(&self) -> &'static [EventKind];

    /// Handle `event` for `train`, returning follow-up events for the same
    /// train.
    fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        event: &TrainEvent,
    ) -> Result<Vec<TrainEvent>, LayoutError>;
}

/// Handlers keyed by the event kinds they are interested in.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn TrainHandler>>,
    by_kind: BTreeMap<EventKind, Vec<usize>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(FeedbackHandler);
        registry.register(EmergencyStopHandler);
        registry.register(StationRestartHandler);
        // Runs after the station handler so a finished train is not rerouted
        registry.register(AutomaticRerouteHandler);
        registry
    }

    /// Add a handler after the ones already registered.
    pub fn register<H: TrainHandler + 'static>(&mut self, handler: H) {
        let index = self.handlers.len();
        for &kind in handler.interests() {
            self.by_kind.entry(kind).or_default().push(index);
        }
        self.handlers.push(Box::new(handler));
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler interested in `event`.
    pub fn dispatch(
        &self,
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        event: &TrainEvent,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        let mut follow_ups = Vec::new();
        let Some(indices) = self.by_kind.get(&event.kind()) else {
            return Ok(follow_ups);
        };
        for &index in indices {
            let handler = &self.handlers[index];
            log::trace!("{train}: {} handles {event:?}", handler.name());
            follow_ups.extend(handler.handle(ctx, train, event)?);
        }
        Ok(follow_ups)
    }
}

impl core::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

// ============================================================================
// Feedback
// ============================================================================

/// Moves a train on detected feedbacks.
///
/// A feedback of the first leading block moves the train into that block.
/// A feedback further along the current block advances the position. In
/// strict mode only the next expected feedback is accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeedbackHandler;

impl FeedbackHandler {
    fn feedback(
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        feedback: FeedbackId,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        let strict = ctx.config.motion.strict_feedback;
        let t = ctx.layout.train(train)?;
        let Some(current) = t.block else {
            return Ok(Vec::new());
        };
        let position = t.position;
        let direction = t.travel_direction();
        let next = t.leading.first().map(|lb| (lb.block, lb.direction));

        if let Some((block, entry_direction)) = next {
            let next_block = ctx.layout.block(block)?;
            let index = if strict {
                (next_block.entry_feedback(entry_direction) == Some(feedback)).then_some(0)
            } else {
                next_block.travel_index(feedback, entry_direction)
            };
            if let Some(index) = index {
                let position = index + 1;
                reservation::advance_to_block(
                    ctx.layout,
                    &ctx.config.reservation,
                    train,
                    block,
                    entry_direction,
                    position,
                )?;
                log::info!("{train}: entered {block} at {position}");
                ctx.out.event(LayoutEvent::MovedToNextBlock {
                    train,
                    block,
                    position,
                });
                return Ok(vec![TrainEvent::MovedToNextBlock]);
            }
        }

        let Some(index) = ctx.layout.block(current)?.travel_index(feedback, direction) else {
            return Ok(Vec::new());
        };
        let accepted = if strict {
            index == position
        } else {
            index >= position
        };
        if !accepted {
            log::debug!("{train}: ignoring {feedback} at {index} (position {position})");
            return Ok(Vec::new());
        }
        let position = index + 1;
        ctx.layout.train_mut(train)?.position = position;
        ctx.out.event(LayoutEvent::MovedInsideBlock {
            train,
            block: current,
            position,
        });
        Ok(vec![TrainEvent::MovedInsideBlock])
    }
}

impl TrainHandler for FeedbackHandler {
    fn name(&self) -> &'static str {
        "feedback"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::Feedback]
    }

    fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        event: &TrainEvent,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        match *event {
            TrainEvent::Feedback(feedback) => Self::feedback(ctx, train, feedback),
            _ => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// Emergency stop
// ============================================================================

/// Stops a moving train that has no next block and no room left.
///
/// Room runs out at the end of the current block, or immediately when the
/// wagons are pushed ahead of the locomotive.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmergencyStopHandler;

impl TrainHandler for EmergencyStopHandler {
    fn name(&self) -> &'static str {
        "emergency-stop"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::MovedToNextBlock, EventKind::MovedInsideBlock]
    }

    fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        _event: &TrainEvent,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        let t = ctx.layout.train(train)?;
        let Some(current) = t.block else {
            return Ok(Vec::new());
        };
        if !matches!(t.state, MotionState::Running | MotionState::Braking) || !t.leading.is_empty() {
            return Ok(Vec::new());
        }
        let at_end = t.position >= ctx.layout.block(current)?.feedback_count();
        if t.wagons_pushed || at_end {
            motion::emergency_stop(ctx.layout, train, EmergencyReason::NoNextBlock, ctx.out)?;
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// Station restart
// ============================================================================

/// Serves station stops and ends service for managed trains.
///
/// A managed train that stops at the end of its route, at a station while
/// finishing, or after a managed stop goes back to manual driving. A train
/// stopping at a station with a continuing route asks for a restart timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct StationRestartHandler;

impl StationRestartHandler {
    fn end_service(ctx: &mut HandlerContext<'_>, train: TrainId) -> Result<(), LayoutError> {
        log::info!("{train}: service finished");
        let t = ctx.layout.train_mut(train)?;
        t.scheduling = Scheduling::Unmanaged;
        t.route = None;
        t.route_index = 0;
        t.requested_kph = 0;
        t.awaiting_restart = false;
        Ok(())
    }

    fn stopped(ctx: &mut HandlerContext<'_>, train: TrainId) -> Result<(), LayoutError> {
        let t = ctx.layout.train(train)?;
        let finishing = match t.scheduling {
            Scheduling::Unmanaged => return Ok(()),
            Scheduling::StopManaged => return Self::end_service(ctx, train),
            Scheduling::Managed { finishing } => finishing,
        };
        if motion::at_end_of_route(t) {
            return Self::end_service(ctx, train);
        }
        let Some(current) = t.block else {
            return Ok(());
        };
        if !ctx.layout.block(current)?.is_station() || t.station_stop_done {
            return Ok(());
        }
        if finishing || t.route.is_none() {
            return Self::end_service(ctx, train);
        }

        let wait = motion::station_wait_secs(ctx.layout, t, ctx.config)?;
        let t = ctx.layout.train_mut(train)?;
        t.station_stop_done = true;
        if wait > 0 {
            log::info!("{train}: waiting {wait}s in {current}");
            t.awaiting_restart = true;
            ctx.out.event(LayoutEvent::RestartTimerRequested {
                train,
                delay_secs: wait,
            });
        }
        Ok(())
    }
}

impl TrainHandler for StationRestartHandler {
    fn name(&self) -> &'static str {
        "station-restart"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::Stopped, EventKind::RestartTimerFired]
    }

    fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        event: &TrainEvent,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        match event {
            TrainEvent::Stopped => Self::stopped(ctx, train)?,
            TrainEvent::RestartTimerFired => {
                let t = ctx.layout.train_mut(train)?;
                if t.awaiting_restart {
                    log::info!("{train}: restarting");
                    t.awaiting_restart = false;
                }
            }
            _ => {}
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// Automatic reroute
// ============================================================================

/// Rebuilds the route of a stuck automatic train.
///
/// A train is stuck when it is stopped with no leading blocks and the next
/// block of its route is held by another train or disabled. The router then
/// looks for a path around reserved elements. Without one the train keeps
/// waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutomaticRerouteHandler;

impl AutomaticRerouteHandler {
    fn is_stuck(layout: &Layout, train: TrainId) -> Result<bool, LayoutError> {
        let t = layout.train(train)?;
        let Some(route) = t.route.as_ref() else {
            return Ok(false);
        };
        if !route.is_automatic()
            || !matches!(t.scheduling, Scheduling::Managed { .. })
            || t.state != MotionState::Stopped
            || t.awaiting_restart
            || !t.leading.is_empty()
        {
            return Ok(false);
        }
        let Some((block, _, _)) = route
            .next_block_index(t.route_index)
            .and_then(|i| route.block_at(i))
        else {
            return Ok(false);
        };
        Ok(!layout.block(block)?.is_available_for(train))
    }
}

impl TrainHandler for AutomaticRerouteHandler {
    fn name(&self) -> &'static str {
        "automatic-reroute"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::Stopped,
            EventKind::OthersReservationChanged,
            EventKind::SchedulingChanged,
        ]
    }

    fn handle(
        &self,
        ctx: &mut HandlerContext<'_>,
        train: TrainId,
        _event: &TrainEvent,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        if !ctx.config.scheduling.automatic_reroute || !Self::is_stuck(ctx.layout, train)? {
            return Ok(Vec::new());
        }
        let t = ctx.layout.train(train)?;
        let (Some(current), Some(route)) = (t.block, t.route.as_ref()) else {
            return Ok(Vec::new());
        };
        let crate::route::RouteKind::Automatic { destination } = route.kind else {
            return Ok(Vec::new());
        };

        let routing = ctx
            .config
            .routing
            .clone()
            .with_reserved_policy(ReservedPolicy::Exclude);
        let request = RouteRequest {
            train,
            from: current,
            direction: t.travel_direction(),
            destination,
            min_length: 0.0,
        };
        let Some(path) = Router::new(ctx.layout, &routing).shortest_path(&request)? else {
            log::info!("{train}: no way around, waiting");
            return Ok(Vec::new());
        };
        let rerouted = Route::from_path(&path, destination);
        if route.items.get(t.route_index..) == Some(rerouted.items.as_slice()) {
            return Ok(Vec::new());
        }

        log::info!("{train}: rerouted via {:?}", path.blocks());
        let t = ctx.layout.train_mut(train)?;
        t.route = Some(rerouted);
        t.route_index = 0;
        Ok(vec![TrainEvent::Evaluate])
    }
}
