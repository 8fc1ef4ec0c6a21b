//! Async runtime integration (requires the `runtime` feature).
//!
//! [`LayoutService`] runs a [`LayoutController`](crate::controller::LayoutController)
//! on a tokio runtime:
//!
//! - inputs arrive over a `tokio::sync::mpsc` channel, one at a time
//! - layout events are republished on a `tokio::sync::broadcast` channel
//! - station restart timers are armed with `tokio::time::sleep` and feed
//!   `RestartTimerFired` back into the input channel
//!
//! The controller sits behind a `Mutex` so UI code can also call its
//! operations directly through [`LayoutService::with_controller`].

pub mod runner;

pub use runner::*;
