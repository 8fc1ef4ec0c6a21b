//! Layout controller that ties everything together.
//!
//! [`LayoutController`] owns the layout, the configuration, the command
//! station interface, the handler registry and the event bus. Every public
//! operation admits one change, then drains the per-train cascade queue to a
//! fixpoint before returning:
//!
//! 1. interested handlers run and may return follow-up events
//! 2. the train's reservation is refreshed
//! 3. the motion state machine is evaluated
//! 4. a changed leading reservation wakes every other train
//! 5. commands go to the interface, events to the bus
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::controller::LayoutController;
//! use rs_trainz_layout::direction::BlockDirection;
//! use rs_trainz_layout::hal::MockInterface;
//! use rs_trainz_layout::layout::{Block, Layout, SocketRef, Train};
//!
//! let mut layout = Layout::new();
//! let a = layout.add_block(Block::new("a"));
//! let b = layout.add_block(Block::new("b"));
//! layout.link(SocketRef::block_next(a), SocketRef::block_previous(b)).unwrap();
//! let train = layout.add_train(Train::new("ice"));
//!
//! let mut controller = LayoutController::new(layout, MockInterface::new());
//! controller.place_train(train, a, BlockDirection::Next).unwrap();
//! controller.set_requested_speed(train, 40).unwrap();
//!
//! assert_eq!(controller.interface().speed_of(train), Some(40));
//! ```

use crate::config::{Config, Name};
use crate::direction::{self, BlockDirection};
use crate::error::{ControlError, LayoutError};
use crate::events::{
    EmergencyReason, EventBus, InputEvent, LayoutCommand, LayoutEvent, Outbox, TrainEvent,
};
use crate::handlers::{HandlerContext, HandlerRegistry};
use crate::layout::{
    BlockId, BlockReservation, ElementId, FeedbackId, Layout, LeadingReservation, Scheduling, Train,
    TrainId, TurnoutId,
};
use crate::motion::{self, MotionState};
use crate::queue::CascadeQueue;
use crate::reservation;
use crate::route::Route;
use crate::router::{Destination, RouteRequest, Router};
use crate::traits::{LayoutInterface, LocomotiveDirection};

/// Snapshot of one train for UI/API.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainStatus {
    /// Train.
    pub id: TrainId,
    /// Display name.
    pub name: Name,
    /// Block the head is in.
    pub block: Option<BlockId>,
    /// Feedbacks passed in the current block.
    pub position: usize,
    /// Direction of travel through the current block.
    pub direction: BlockDirection,
    /// Motion state.
    pub state: MotionState,
    /// Driving mode.
    pub scheduling: Scheduling,
    /// Speed last commanded.
    pub commanded_kph: u16,
    /// Speed last reported.
    pub actual_kph: u16,
    /// Leading blocks, nearest first.
    pub leading: Vec<BlockId>,
    /// Settled leading length in centimeters.
    pub settled_length: f64,
}

impl From<&Train> for TrainStatus {
    fn from(train: &Train) -> Self {
        Self {
            id: train.id,
            name: train.name.clone(),
            block: train.block,
            position: train.position,
            direction: train.travel_direction(),
            state: train.state,
            scheduling: train.scheduling,
            commanded_kph: train.commanded_kph,
            actual_kph: train.actual_kph,
            leading: train.leading.block_ids(),
            settled_length: train.leading.settled_length,
        }
    }
}

/// Main layout controller.
///
/// # Type Parameter
///
/// - `I`: The command station implementation ([`LayoutInterface`] trait)
///
/// # Thread Safety
///
/// The controller itself is not thread-safe. Wrap it in a `Mutex` to share
/// it, or use `services::LayoutService` (requires the `runtime` feature).
pub struct LayoutController<I: LayoutInterface> {
    layout: Layout,
    config: Config,
    interface: I,
    handlers: HandlerRegistry,
    queue: CascadeQueue,
    bus: EventBus,
}

impl<I: LayoutInterface> LayoutController<I> {
    /// Create a controller with the default configuration.
    pub fn new(layout: Layout, interface: I) -> Self {
        Self::with_config(layout, Config::default(), interface)
    }

    /// Create a controller with `config` and the standard handlers.
    pub fn with_config(layout: Layout, config: Config, interface: I) -> Self {
        log::info!(
            "layout {}: {} blocks, {} turnouts, {} trains",
            config.name,
            layout.blocks().len(),
            layout.turnouts().len(),
            layout.trains().len()
        );
        Self {
            layout,
            config,
            interface,
            handlers: HandlerRegistry::standard(),
            queue: CascadeQueue::new(),
            bus: EventBus::new(),
        }
    }

    /// Replace the handler registry.
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The command station interface.
    pub fn interface(&self) -> &I {
        &self.interface
    }

    /// The command station interface, mutably.
    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.interface
    }

    /// A train.
    pub fn train(&self, train: TrainId) -> Result<&Train, LayoutError> {
        self.layout.train(train)
    }

    /// Snapshot of a train.
    pub fn train_status(&self, train: TrainId) -> Result<TrainStatus, LayoutError> {
        self.layout.train(train).map(TrainStatus::from)
    }

    /// Snapshot of every train.
    pub fn statuses(&self) -> Vec<TrainStatus> {
        self.layout.trains().iter().map(TrainStatus::from).collect()
    }

    /// Register an observer of layout events.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&LayoutEvent) + Send + 'static,
    {
        self.bus.subscribe(subscriber);
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Take every event published since the last call.
    pub fn drain_events(&mut self) -> Vec<LayoutEvent> {
        self.bus.drain_journal()
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Admit one input event and run the cascade to a fixpoint.
    pub fn handle(&mut self, input: InputEvent) -> Result<(), ControlError<I::Error>> {
        log::debug!("input {input:?}");
        match input {
            InputEvent::FeedbackTriggered { feedback, detected } => {
                self.layout.feedback_mut(feedback)?.detected = detected;
                if detected {
                    self.feedback_detected(feedback)?;
                }
            }
            InputEvent::TurnoutStateChanged { turnout, state } => {
                self.layout.turnout_mut(turnout)?.actual_state = state;
                if let Some(holder) = self.layout.holder_of(ElementId::Turnout(turnout))? {
                    self.queue.push(holder, TrainEvent::TurnoutChanged(turnout));
                }
            }
            InputEvent::SpeedChanged { train, kph } => {
                let t = self.layout.train_mut(train)?;
                t.actual_kph = kph;
                t.standstill_reported = kph == 0;
                self.queue.push(train, TrainEvent::SpeedChanged);
            }
            InputEvent::SchedulingChanged { train, mode } => {
                let t = self.layout.train_mut(train)?;
                t.scheduling = mode;
                if !mode.is_managed() {
                    t.awaiting_restart = false;
                }
                self.queue.push(train, TrainEvent::SchedulingChanged);
            }
            InputEvent::RestartTimerFired { train } => {
                self.layout.train(train)?;
                self.queue.push(train, TrainEvent::RestartTimerFired);
            }
        }
        self.drain()
    }

    fn feedback_detected(&mut self, feedback: FeedbackId) -> Result<(), ControlError<I::Error>> {
        let Some(block) = self.layout.feedback_block(feedback) else {
            log::debug!("{feedback} is not in any block");
            return self.unexpected_feedback(feedback);
        };
        let mut expected = false;
        let mut targets = Vec::new();
        for t in self.layout.trains() {
            let approaching = t.leading.first().is_some_and(|lb| lb.block == block);
            if t.block == Some(block) || approaching {
                targets.push(t.id);
            }
            expected |= t.held_blocks().contains(&block);
        }
        if targets.is_empty() && !expected {
            return self.unexpected_feedback(feedback);
        }
        for train in targets {
            self.queue.push(train, TrainEvent::Feedback(feedback));
        }
        Ok(())
    }

    fn unexpected_feedback(&mut self, feedback: FeedbackId) -> Result<(), ControlError<I::Error>> {
        if !self.config.motion.detect_unexpected_feedback {
            return Ok(());
        }
        log::warn!("unexpected {feedback}, stopping all trains");
        let mut out = Outbox::new();
        out.event(LayoutEvent::UnexpectedFeedback { feedback });
        let moving: Vec<TrainId> = self
            .layout
            .trains()
            .iter()
            .filter(|t| t.is_placed() && t.is_moving())
            .map(|t| t.id)
            .collect();
        for train in moving {
            motion::emergency_stop(
                &mut self.layout,
                train,
                EmergencyReason::UnexpectedFeedback,
                &mut out,
            )?;
        }
        self.flush(out)
    }

    // ========================================================================
    // Train operations
    // ========================================================================

    /// Put a train on the layout at the start of `block`, heading `direction`.
    pub fn place_train(
        &mut self,
        train: TrainId,
        block: BlockId,
        direction: BlockDirection,
    ) -> Result<(), ControlError<I::Error>> {
        self.place_train_at(train, block, direction, 0)
    }

    /// Put a train on the layout with `position` feedbacks of `block` passed.
    ///
    /// Fails with [`LayoutError::BlockOccupied`] if another train holds the
    /// block and with [`LayoutError::BlockDisabled`] if the block is
    /// disabled. A train already on the layout is moved.
    pub fn place_train_at(
        &mut self,
        train: TrainId,
        block: BlockId,
        direction: BlockDirection,
        position: usize,
    ) -> Result<(), ControlError<I::Error>> {
        let target = self.layout.block(block)?;
        if !target.enabled {
            return Err(LayoutError::BlockDisabled(block).into());
        }
        if let Some(holder) = target.reservation.filter(|r| r.train != train) {
            return Err(LayoutError::BlockOccupied {
                block,
                holder: holder.train,
            }
            .into());
        }
        let position = position.min(target.feedback_count());

        let mut out = Outbox::new();
        if self.layout.train(train)?.is_placed() {
            reservation::release_reservation(&mut self.layout, train, &mut out)?;
            reservation::release_all(&mut self.layout, train)?;
        }
        self.layout.block_mut(block)?.reservation = Some(BlockReservation { train, direction });

        let t = self.layout.train_mut(train)?;
        t.block = Some(block);
        t.position = position;
        t.orientation = direction::resolve(
            t.locomotive_direction,
            direction.entry_socket(),
            t.locomotive_leads_front(),
        );
        t.station_stop_done = true;
        log::info!("{train}: placed in {block} heading {direction:?}");

        self.flush(out)?;
        self.wake_others(train);
        self.queue.push(train, TrainEvent::Evaluate);
        self.drain()
    }

    /// Take a train off the layout, releasing everything it holds.
    pub fn remove_train(&mut self, train: TrainId) -> Result<(), ControlError<I::Error>> {
        let t = self.layout.train(train)?;
        if !t.is_placed() {
            return Ok(());
        }
        let was_driven = t.commanded_kph != 0;

        let mut out = Outbox::new();
        reservation::release_reservation(&mut self.layout, train, &mut out)?;
        reservation::release_all(&mut self.layout, train)?;
        let t = self.layout.train_mut(train)?;
        if t.state != MotionState::Stopped {
            out.event(LayoutEvent::StateChanged {
                train,
                from: t.state,
                to: MotionState::Stopped,
            });
        }
        t.block = None;
        t.position = 0;
        t.leading = LeadingReservation::default();
        t.state = MotionState::Stopped;
        t.scheduling = Scheduling::Unmanaged;
        t.route = None;
        t.route_index = 0;
        t.requested_kph = 0;
        t.commanded_kph = 0;
        t.awaiting_restart = false;
        if was_driven {
            out.command(LayoutCommand::SetSpeed { train, kph: 0 });
        }
        log::info!("{train}: removed");

        self.flush(out)?;
        self.wake_others(train);
        self.drain()
    }

    /// Set the speed a manual train should run at.
    pub fn set_requested_speed(&mut self, train: TrainId, kph: u16) -> Result<(), ControlError<I::Error>> {
        let t = self.layout.train_mut(train)?;
        t.requested_kph = kph.min(t.max_speed_kph);
        self.queue.push(train, TrainEvent::Evaluate);
        self.drain()
    }

    /// Reverse the locomotive of a stopped train.
    ///
    /// The position is mirrored and trailing elements are released, since
    /// they now lie ahead. Returns false if the train is moving.
    pub fn set_locomotive_direction(
        &mut self,
        train: TrainId,
        direction: LocomotiveDirection,
    ) -> Result<bool, ControlError<I::Error>> {
        let t = self.layout.train(train)?;
        if t.locomotive_direction == direction {
            return Ok(true);
        }
        if t.is_moving() {
            log::warn!("{train}: direction change refused while moving");
            return Ok(false);
        }
        let feedbacks = match t.block {
            Some(block) => self.layout.block(block)?.feedback_count(),
            None => 0,
        };

        let mut out = Outbox::new();
        reservation::release_reservation(&mut self.layout, train, &mut out)?;
        reservation::release_trailing(&mut self.layout, train)?;
        let t = self.layout.train_mut(train)?;
        t.locomotive_direction = direction;
        t.position = feedbacks.saturating_sub(t.position);
        let travel = t.travel_direction();
        if let Some(block) = t.block {
            if let Some(held) = self.layout.block_mut(block)?.reservation.as_mut() {
                held.direction = travel;
            }
        }
        out.command(LayoutCommand::SetDirection { train, direction });
        log::info!("{train}: locomotive {}", direction.as_str());

        self.flush(out)?;
        self.wake_others(train);
        self.queue.push(train, TrainEvent::Evaluate);
        self.drain()?;
        Ok(true)
    }

    /// Turn the wagons of a stopped train to the other side of the
    /// locomotive. Returns false if the train is moving.
    pub fn toggle_wagons(&mut self, train: TrainId) -> Result<bool, ControlError<I::Error>> {
        let t = self.layout.train_mut(train)?;
        if t.is_moving() {
            log::warn!("{train}: wagon toggle refused while moving");
            return Ok(false);
        }
        t.orientation = t.orientation.with_wagons_toggled();
        t.wagons_pushed = !t.wagons_pushed;
        self.queue.push(train, TrainEvent::Evaluate);
        self.drain()?;
        Ok(true)
    }

    /// Drive a train automatically along `route`.
    ///
    /// The route must contain the train's current block. Fails with
    /// [`LayoutError::NotOnRoute`] otherwise.
    pub fn start_route(&mut self, train: TrainId, route: Route) -> Result<(), ControlError<I::Error>> {
        let t = self.layout.train(train)?;
        let current = t.block.ok_or(LayoutError::TrainNotPlaced(train))?;
        let index = route.find_block(current, 0).ok_or(LayoutError::NotOnRoute {
            train,
            block: current,
        })?;

        let t = self.layout.train_mut(train)?;
        log::info!("{train}: starting route of {} items", route.items.len());
        t.route = Some(route);
        t.route_index = index;
        t.scheduling = Scheduling::Managed { finishing: false };
        // The stop in the starting block is already served
        t.station_stop_done = true;
        t.awaiting_restart = false;
        self.queue.push(train, TrainEvent::SchedulingChanged);
        self.drain()
    }

    /// Drive a train automatically to `destination` along the shortest path.
    ///
    /// Fails with [`LayoutError::NoPathFound`] if the router finds nothing.
    pub fn start_automatic(
        &mut self,
        train: TrainId,
        destination: Destination,
    ) -> Result<(), ControlError<I::Error>> {
        let t = self.layout.train(train)?;
        let from = t.block.ok_or(LayoutError::TrainNotPlaced(train))?;
        let request = RouteRequest {
            train,
            from,
            direction: t.travel_direction(),
            destination,
            min_length: 0.0,
        };
        let path = Router::new(&self.layout, &self.config.routing)
            .shortest_path(&request)?
            .ok_or(LayoutError::NoPathFound {
                train,
                destination: destination.block,
            })?;
        self.start_route(train, Route::from_path(&path, destination))
    }

    /// Stop a train: a managed train stops as soon as it can and hands back
    /// control, a manual train gets speed 0.
    pub fn stop(&mut self, train: TrainId) -> Result<(), ControlError<I::Error>> {
        let t = self.layout.train_mut(train)?;
        if t.is_managed() {
            t.scheduling = Scheduling::StopManaged;
        } else {
            t.requested_kph = 0;
        }
        self.queue.push(train, TrainEvent::Evaluate);
        self.drain()
    }

    /// Let a managed train finish at the next station.
    pub fn finish(&mut self, train: TrainId) -> Result<(), ControlError<I::Error>> {
        let t = self.layout.train_mut(train)?;
        if let Scheduling::Managed { finishing } = &mut t.scheduling {
            *finishing = true;
        }
        self.queue.push(train, TrainEvent::Evaluate);
        self.drain()
    }

    /// Re-run reservation and motion for every placed train.
    pub fn reevaluate_all(&mut self) -> Result<(), ControlError<I::Error>> {
        for train in self.placed_trains() {
            self.queue.push(train, TrainEvent::Evaluate);
        }
        self.drain()
    }

    // ========================================================================
    // Cascade
    // ========================================================================

    fn placed_trains(&self) -> Vec<TrainId> {
        self.layout
            .trains()
            .iter()
            .filter(|t| t.is_placed())
            .map(|t| t.id)
            .collect()
    }

    fn wake_others(&mut self, train: TrainId) {
        for other in self.placed_trains() {
            if other != train {
                self.queue.push(other, TrainEvent::OthersReservationChanged);
            }
        }
    }

    fn drain(&mut self) -> Result<(), ControlError<I::Error>> {
        let limit = self.config.motion.max_cascade_steps;
        let mut steps = 0;
        let mut failure = None;

        while let Some((train, event)) = self.queue.pop() {
            if steps == limit {
                log::warn!(
                    "cascade stopped after {limit} steps, {} events dropped",
                    self.queue.len() + 1
                );
                self.queue.clear();
                break;
            }
            steps += 1;

            let mut out = Outbox::new();
            match self.process(train, &event, &mut out) {
                Ok(follow_ups) => {
                    for follow_up in follow_ups {
                        self.queue.push(train, follow_up);
                    }
                }
                Err(err) if err.is_recoverable() => log::info!("{train}: {err}"),
                Err(err) => {
                    log::error!("{train}: {err} while handling {event:?}");
                    if let Err(stop_err) = motion::emergency_stop(
                        &mut self.layout,
                        train,
                        EmergencyReason::LayoutFault,
                        &mut out,
                    ) {
                        log::error!("{train}: fail-safe stop failed: {stop_err}");
                    }
                    if failure.is_none() {
                        failure = Some(ControlError::Layout(err));
                    }
                }
            }
            if let Err(err) = self.flush(out) {
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    fn process(
        &mut self,
        train: TrainId,
        event: &TrainEvent,
        out: &mut Outbox,
    ) -> Result<Vec<TrainEvent>, LayoutError> {
        if !self.layout.train(train)?.is_placed() {
            return Ok(Vec::new());
        }
        log::trace!("{train}: {event:?}");
        let footprint_before = self.footprint(train)?;

        let mut ctx = HandlerContext {
            layout: &mut self.layout,
            config: &self.config,
            out: &mut *out,
        };
        let mut follow_ups = self.handlers.dispatch(&mut ctx, train, event)?;

        if event.affects_reservation() {
            let may_run = motion::may_start(self.layout.train(train)?);
            reservation::update(&mut self.layout, &self.config.reservation, train, may_run, out)?;
        }
        if motion::evaluate(&mut self.layout, &self.config, train, out)? == Some(MotionState::Stopped) {
            follow_ups.push(TrainEvent::Stopped);
        }
        // Moving on releases elements behind the train even when the
        // leading set stays the same
        if self.footprint(train)? != footprint_before {
            self.wake_others(train);
        }
        Ok(follow_ups)
    }

    /// Everything the train holds.
    fn footprint(&self, train: TrainId) -> Result<(Vec<BlockId>, Vec<TurnoutId>), LayoutError> {
        let t = self.layout.train(train)?;
        Ok((t.held_blocks(), t.held_turnouts()))
    }

    fn flush(&mut self, out: Outbox) -> Result<(), ControlError<I::Error>> {
        let mut failure = None;
        for command in &out.commands {
            if let Err(err) = self.interface.apply(command) {
                log::error!("{command:?} failed: {err:?}");
                failure = Some(ControlError::Interface(err));
            }
        }
        for event in out.events {
            self.bus.publish(event);
        }
        failure.map_or(Ok(()), Err)
    }
}

impl<I: LayoutInterface + core::fmt::Debug> core::fmt::Debug for LayoutController<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutController")
            .field("config", &self.config)
            .field("interface", &self.interface)
            .field("handlers", &self.handlers)
            .field("pending", &self.queue.len())
            .field("bus", &self.bus)
            .finish()
    }
}
