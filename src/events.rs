//! Events entering and leaving the controller.
//!
//! - [`InputEvent`]: what the hardware or UI layer reports
//! - [`LayoutCommand`]: what the controller asks the command station to do
//! - [`LayoutEvent`]: what observers see, published on the [`EventBus`]
//! - [`TrainEvent`]: per-train work items of the internal cascade
//! - [`Outbox`]: what one cascade step produced, before it is flushed
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::events::{EventBus, LayoutEvent};
//! use rs_trainz_layout::layout::{FeedbackId};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let mut bus = EventBus::new();
//! bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
//! bus.publish(LayoutEvent::UnexpectedFeedback { feedback: FeedbackId(3) });
//!
//! assert_eq!(seen.lock().unwrap().len(), 1);
//! assert_eq!(bus.drain_journal().len(), 1);
//! ```

use crate::layout::{BlockId, FeedbackId, Scheduling, TrainId, TurnoutId, TurnoutState};
use crate::motion::MotionState;
use crate::traits::LocomotiveDirection;

// ============================================================================
// Inputs
// ============================================================================

/// An event reported by the hardware or UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputEvent {
    /// A feedback sensor changed.
    FeedbackTriggered {
        /// Sensor.
        feedback: FeedbackId,
        /// New reading.
        detected: bool,
    },
    /// The command station confirmed a turnout state.
    TurnoutStateChanged {
        /// Turnout.
        turnout: TurnoutId,
        /// Confirmed state.
        state: TurnoutState,
    },
    /// The command station reported a locomotive's actual speed.
    SpeedChanged {
        /// Train.
        train: TrainId,
        /// Actual speed in km/h.
        kph: u16,
    },
    /// The UI switched a train between manual and automatic driving.
    SchedulingChanged {
        /// Train.
        train: TrainId,
        /// New mode.
        mode: Scheduling,
    },
    /// A station restart timer elapsed.
    RestartTimerFired {
        /// Train.
        train: TrainId,
    },
}

// ============================================================================
// Outputs
// ============================================================================

/// A command for the command station.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutCommand {
    /// Request a turnout state.
    SetTurnoutState {
        /// Turnout.
        turnout: TurnoutId,
        /// Requested state.
        state: TurnoutState,
    },
    /// Set a locomotive's speed.
    SetSpeed {
        /// Train.
        train: TrainId,
        /// Speed in km/h.
        kph: u16,
    },
    /// Set a locomotive's direction.
    SetDirection {
        /// Train.
        train: TrainId,
        /// Direction.
        direction: LocomotiveDirection,
    },
}

/// Why a train was stopped outside the normal braking sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EmergencyReason {
    /// Moving with no valid next block.
    NoNextBlock,
    /// A feedback no train expected was detected.
    UnexpectedFeedback,
    /// A layout lookup failed while handling the train.
    LayoutFault,
}

/// An observable change of the layout.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutEvent {
    /// The train entered the next block.
    MovedToNextBlock {
        /// Train.
        train: TrainId,
        /// Block entered.
        block: BlockId,
        /// Position in the new block.
        position: usize,
    },
    /// The train passed a feedback inside its block.
    MovedInsideBlock {
        /// Train.
        train: TrainId,
        /// Current block.
        block: BlockId,
        /// New position.
        position: usize,
    },
    /// The train's motion state changed.
    StateChanged {
        /// Train.
        train: TrainId,
        /// Previous state.
        from: MotionState,
        /// New state.
        to: MotionState,
    },
    /// The set of leading blocks changed.
    ReservedBlocksChanged {
        /// Train.
        train: TrainId,
        /// Leading blocks, nearest first.
        blocks: Vec<BlockId>,
    },
    /// The settled part of the leading reservation changed.
    ReservedBlocksSettledLengthChanged {
        /// Train.
        train: TrainId,
        /// Settled length in centimeters.
        settled_length: f64,
    },
    /// A managed train stopped at a station and wants to leave after a delay.
    RestartTimerRequested {
        /// Train.
        train: TrainId,
        /// Delay in seconds.
        delay_secs: u32,
    },
    /// A detected feedback was not expected by any train.
    UnexpectedFeedback {
        /// Sensor.
        feedback: FeedbackId,
    },
    /// A train was stopped outside the normal braking sequence.
    EmergencyStop {
        /// Train.
        train: TrainId,
        /// Cause.
        reason: EmergencyReason,
    },
}

impl LayoutEvent {
    /// Train the event is about, if any.
    pub fn train(&self) -> Option<TrainId> {
        match self {
            Self::MovedToNextBlock { train, .. }
            | Self::MovedInsideBlock { train, .. }
            | Self::StateChanged { train, .. }
            | Self::ReservedBlocksChanged { train, .. }
            | Self::ReservedBlocksSettledLengthChanged { train, .. }
            | Self::RestartTimerRequested { train, .. }
            | Self::EmergencyStop { train, .. } => Some(*train),
            Self::UnexpectedFeedback { .. } => None,
        }
    }
}

// ============================================================================
// Cascade work items
// ============================================================================

/// Discriminant of a [`TrainEvent`], used to key handler interests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// See [`TrainEvent::Feedback`].
    Feedback,
    /// See [`TrainEvent::TurnoutChanged`].
    TurnoutChanged,
    /// See [`TrainEvent::SpeedChanged`].
    SpeedChanged,
    /// See [`TrainEvent::SchedulingChanged`].
    SchedulingChanged,
    /// See [`TrainEvent::RestartTimerFired`].
    RestartTimerFired,
    /// See [`TrainEvent::OthersReservationChanged`].
    OthersReservationChanged,
    /// See [`TrainEvent::MovedToNextBlock`].
    MovedToNextBlock,
    /// See [`TrainEvent::MovedInsideBlock`].
    MovedInsideBlock,
    /// See [`TrainEvent::Stopped`].
    Stopped,
    /// See [`TrainEvent::Evaluate`].
    Evaluate,
}

/// A unit of work for one train in the cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrainEvent {
    /// A feedback was detected.
    Feedback(FeedbackId),
    /// A turnout confirmed its state.
    TurnoutChanged(TurnoutId),
    /// The train's actual speed changed.
    SpeedChanged,
    /// The train's scheduling mode changed.
    SchedulingChanged,
    /// The train's restart timer elapsed.
    RestartTimerFired,
    /// Another train's reservation changed.
    OthersReservationChanged,
    /// The train entered its next block.
    MovedToNextBlock,
    /// The train moved inside its block.
    MovedInsideBlock,
    /// The train came to a halt.
    Stopped,
    /// Re-evaluate reservation and motion with no new input.
    Evaluate,
}

impl TrainEvent {
    /// Kind used for handler lookup.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Feedback(_) => EventKind::Feedback,
            Self::TurnoutChanged(_) => EventKind::TurnoutChanged,
            Self::SpeedChanged => EventKind::SpeedChanged,
            Self::SchedulingChanged => EventKind::SchedulingChanged,
            Self::RestartTimerFired => EventKind::RestartTimerFired,
            Self::OthersReservationChanged => EventKind::OthersReservationChanged,
            Self::MovedToNextBlock => EventKind::MovedToNextBlock,
            Self::MovedInsideBlock => EventKind::MovedInsideBlock,
            Self::Stopped => EventKind::Stopped,
            Self::Evaluate => EventKind::Evaluate,
        }
    }

    /// Returns true if the event may change what the train can reserve.
    pub const fn affects_reservation(&self) -> bool {
        !matches!(self, Self::SpeedChanged)
    }
}

// ============================================================================
// Outbox
// ============================================================================

/// Commands and events produced while handling one cascade step.
///
/// The controller flushes it to the interface and the event bus once the
/// step is complete, so no observer sees a half-applied step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outbox {
    /// Commands for the command station, in order.
    pub commands: Vec<LayoutCommand>,
    /// Events for observers, in order.
    pub events: Vec<LayoutEvent>,
}

impl Outbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command.
    pub fn command(&mut self, command: LayoutCommand) {
        self.commands.push(command);
    }

    /// Queue an event.
    pub fn event(&mut self, event: LayoutEvent) {
        self.events.push(event);
    }

    /// Returns true if nothing was produced.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }
}

// ============================================================================
// Event bus
// ============================================================================

type Subscriber = Box<dyn FnMut(&LayoutEvent) + Send>;

/// Publishes layout events to subscribers and keeps a drainable journal.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    journal: Vec<LayoutEvent>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber called for every published event.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&LayoutEvent) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Publish an event.
    pub fn publish(&mut self, event: LayoutEvent) {
        log::debug!("{event:?}");
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
        self.journal.push(event);
    }

    /// Events published since the last drain.
    pub fn journal(&self) -> &[LayoutEvent] {
        &self.journal
    }

    /// Take every journaled event.
    pub fn drain_journal(&mut self) -> Vec<LayoutEvent> {
        core::mem::take(&mut self.journal)
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}
