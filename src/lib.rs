//! # rs-trainz-layout
//!
//! Multi-train layout automation for model railways: routing, block
//! reservation and motion control on top of any digital command station.
//!
//! ## Features
//!
//! - **Layout graph**: blocks, turnouts, feedback sensors and the
//!   transitions between their sockets, stored in an arena
//! - **Routing**: Dijkstra shortest path with minimum-length and direction
//!   constraints, avoiding or penalizing elements other trains hold
//! - **Reservation**: each train holds its block, a bounded set of leading
//!   blocks with the turnouts into them, and the trailing blocks it covers
//! - **Direction algebra**: train and wagon orientation resolved from the
//!   locomotive direction and the socket a block was entered through
//! - **Motion**: `Stopped`/`Running`/`Braking`/`Stopping` state machine
//!   driven by a per-train FIFO cascade that runs to a fixpoint
//! - **Scheduling**: manual driving, fixed routes, automatic routes with
//!   rerouting, station stops with restart timers
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `layout` - Element arena and authoring API
//! - `visitor` - Walks the graph following turnout states
//! - `router` - Shortest paths between blocks
//! - `reservation` - Leading and trailing reservations
//! - `direction` - Orientation resolution
//! - `motion` - Train state machine
//! - `handlers` - Reactions to feedback, stops and timers
//! - `controller` - Cascade driver that ties everything together
//! - `hal` - Concrete interfaces (mock command station for testing)
//!
//! ## Example
//!
//! ```rust
//! use rs_trainz_layout::{
//!     BlockDirection, InputEvent, LayoutController, MotionState,
//!     hal::MockInterface,
//!     layout::{Block, Feedback, Layout, SocketRef, Train},
//! };
//!
//! // Two blocks in a row, one sensor each
//! let mut layout = Layout::new();
//! let fa = layout.add_feedback(Feedback::new("fa"));
//! let fb = layout.add_feedback(Feedback::new("fb"));
//! let a = layout.add_block(Block::new("a").with_feedbacks(&[fa]));
//! let b = layout.add_block(Block::new("b").with_feedbacks(&[fb]));
//! layout.link(SocketRef::block_next(a), SocketRef::block_previous(b)).unwrap();
//! let train = layout.add_train(Train::new("ice"));
//!
//! let mut controller = LayoutController::new(layout, MockInterface::new());
//! controller.place_train(train, a, BlockDirection::Next).unwrap();
//! controller.set_requested_speed(train, 50).unwrap();
//! assert_eq!(controller.train(train).unwrap().state, MotionState::Running);
//!
//! // The sensor in b reports the train
//! controller
//!     .handle(InputEvent::FeedbackTriggered { feedback: fb, detected: true })
//!     .unwrap();
//! assert_eq!(controller.train(train).unwrap().block, Some(b));
//! ```

#![warn(missing_docs)]

/// Shared configuration for routing, reservation, motion and scheduling.
pub mod config;
/// Layout controller that drives the cascade.
pub mod controller;
/// Block directions and orientation resolution.
pub mod direction;
/// Error types.
pub mod error;
/// Input events, commands, layout events and the event bus.
pub mod events;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Scheduling handlers keyed by event kind.
pub mod handlers;
/// Layout elements and the arena holding them.
pub mod layout;
/// Train motion state machine.
pub mod motion;
/// Per-train FIFO of cascade events.
pub mod queue;
/// Block and turnout reservation.
pub mod reservation;
/// Routes followed by managed trains.
pub mod route;
/// Shortest-path router.
pub mod router;
/// Core traits for the command station interface.
pub mod traits;
/// Graph walking along turnout states.
pub mod visitor;

/// Tokio service runner (feature-gated).
#[cfg(feature = "runtime")]
pub mod services;

// Re-exports for convenience
pub use config::{
    Config, MotionConfig, ReservationConfig, ReservedPolicy, RoutingConfig, SchedulingConfig,
};
pub use controller::{LayoutController, TrainStatus};
pub use direction::{BlockDirection, BlockSocket, Orientation};
pub use error::{ControlError, LayoutError};
pub use events::{EventBus, InputEvent, LayoutCommand, LayoutEvent};
pub use layout::Layout;
pub use motion::MotionState;
pub use route::{Route, RouteItem, RouteKind};
pub use router::{Destination, GraphPath, Router};
pub use traits::{LayoutInterface, LocomotiveDirection};
