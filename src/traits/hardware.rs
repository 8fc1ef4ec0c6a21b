//! Hardware abstraction for the command station side of the layout.
//!
//! The controller never talks to a command station directly. It issues
//! abstract commands through [`LayoutInterface`], which a platform crate
//! implements on top of its vendor protocol. Sensor readings and confirmed
//! turnout states travel the other way as [`InputEvent`]s.
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`LocomotiveDirection`] | Direction the locomotive is driven in |
//! | [`LayoutInterface`] | Sends turnout, speed and direction commands |
//!
//! For tests and desktop simulation use [`crate::hal::MockInterface`].
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::traits::{LayoutInterface, LocomotiveDirection};
//! use rs_trainz_layout::hal::MockInterface;
//! use rs_trainz_layout::layout::{TrainId, TurnoutId, TurnoutState};
//!
//! let mut interface = MockInterface::new();
//! interface.set_turnout_state(TurnoutId(0), TurnoutState::Branch).unwrap();
//! interface.set_speed(TrainId(1), 40).unwrap();
//! interface.set_direction(TrainId(1), LocomotiveDirection::Backward).unwrap();
//!
//! assert_eq!(interface.speed_of(TrainId(1)), Some(40));
//! ```
//!
//! [`InputEvent`]: crate::events::InputEvent

use crate::events::LayoutCommand;
use crate::layout::{TrainId, TurnoutId, TurnoutState};

/// Direction the locomotive is driven in.
///
/// This is intrinsic to the locomotive (its decoder's direction bit) and
/// independent of how the locomotive sits on the track. How it maps onto a
/// block's orientation is resolved by [`crate::direction::resolve`].
///
/// # Default
///
/// Defaults to [`Forward`](Self::Forward).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LocomotiveDirection {
    /// Locomotive runs front first.
    #[default]
    Forward,
    /// Locomotive runs rear first.
    Backward,
}

impl LocomotiveDirection {
    /// Returns the direction as a lowercase string.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_trainz_layout::traits::LocomotiveDirection;
    ///
    /// assert_eq!(LocomotiveDirection::Forward.as_str(), "forward");
    /// assert_eq!(LocomotiveDirection::Backward.as_str(), "backward");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LocomotiveDirection::Forward => "forward",
            LocomotiveDirection::Backward => "backward",
        }
    }

    /// The other direction.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            LocomotiveDirection::Forward => LocomotiveDirection::Backward,
            LocomotiveDirection::Backward => LocomotiveDirection::Forward,
        }
    }

    /// Returns true for [`Forward`](Self::Forward).
    #[inline]
    pub const fn is_forward(self) -> bool {
        matches!(self, LocomotiveDirection::Forward)
    }
}

/// Command station interface.
///
/// Implement this for your command station. Every method is fire-and-forget
/// from the controller's point of view: the effect is confirmed later through
/// input events (`TurnoutStateChanged`, `SpeedChanged`).
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_trainz_layout::traits::{LayoutInterface, LocomotiveDirection};
///
/// struct CanBus { /* socket */ }
///
/// impl LayoutInterface for CanBus {
///     type Error = std::io::Error;
///
///     fn set_turnout_state(&mut self, turnout: TurnoutId, state: TurnoutState) -> Result<(), Self::Error> {
///         // Encode and send the accessory command...
///         Ok(())
///     }
///
///     fn set_speed(&mut self, train: TrainId, kph: u16) -> Result<(), Self::Error> {
///         // Convert kph to decoder steps and send...
///         Ok(())
///     }
///
///     fn set_direction(&mut self, train: TrainId, direction: LocomotiveDirection) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
/// ```
pub trait LayoutInterface {
    /// Error type for interface operations.
    type Error: core::fmt::Debug;

    /// Request a turnout state.
    fn set_turnout_state(
        &mut self,
        turnout: TurnoutId,
        state: TurnoutState,
    ) -> Result<(), Self::Error>;

    /// Set the target speed of a train's locomotive in km/h (scale speed).
    fn set_speed(&mut self, train: TrainId, kph: u16) -> Result<(), Self::Error>;

    /// Set the locomotive direction.
    fn set_direction(
        &mut self,
        train: TrainId,
        direction: LocomotiveDirection,
    ) -> Result<(), Self::Error>;

    /// Send a [`LayoutCommand`] through the matching method.
    fn apply(&mut self, command: &LayoutCommand) -> Result<(), Self::Error> {
        match *command {
            LayoutCommand::SetTurnoutState { turnout, state } => {
                self.set_turnout_state(turnout, state)
            }
            LayoutCommand::SetSpeed { train, kph } => self.set_speed(train, kph),
            LayoutCommand::SetDirection { train, direction } => {
                self.set_direction(train, direction)
            }
        }
    }
}
