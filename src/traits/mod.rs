//! Trait definitions for hardware abstraction.
//!
//! The layout core is hardware agnostic. Everything it needs from the
//! command station is expressed by [`LayoutInterface`]:
//!
//! - turnout state requests
//! - locomotive speed and direction
//!
//! Sensor input is not a trait: the platform layer converts it into
//! [`InputEvent`](crate::events::InputEvent)s and hands them to the
//! controller one at a time.

pub mod hardware;

pub use hardware::*;
