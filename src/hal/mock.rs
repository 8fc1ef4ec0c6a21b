//! Mock command station for testing without hardware.
//!
//! [`MockInterface`] records every command it receives and keeps the last
//! turnout state, speed and direction per element, so tests and the demo can
//! inspect what the controller asked for. It never confirms anything on its
//! own: feed `TurnoutStateChanged` and `SpeedChanged` back into the
//! controller to simulate the command station's replies.
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::hal::MockInterface;
//! use rs_trainz_layout::traits::LayoutInterface;
//! use rs_trainz_layout::layout::{TurnoutId, TurnoutState};
//!
//! let mut interface = MockInterface::new();
//! interface.set_turnout_state(TurnoutId(2), TurnoutState::Branch).unwrap();
//!
//! assert_eq!(interface.turnout_state_of(TurnoutId(2)), Some(TurnoutState::Branch));
//! assert_eq!(interface.commands().len(), 1);
//! ```

use std::collections::BTreeMap;

use crate::events::LayoutCommand;
use crate::layout::{TrainId, TurnoutId, TurnoutState};
use crate::traits::{LayoutInterface, LocomotiveDirection};

/// Error returned by a [`MockInterface`] set up to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockError;

/// Mock command station.
///
/// Records all commands for verification. Use [`fail_next`](Self::fail_next)
/// to make the next command fail.
#[derive(Debug, Default)]
pub struct MockInterface {
    commands: Vec<LayoutCommand>,
    turnouts: BTreeMap<TurnoutId, TurnoutState>,
    speeds: BTreeMap<TrainId, u16>,
    directions: BTreeMap<TrainId, LocomotiveDirection>,
    failures: usize,
}

impl MockInterface {
    /// Creates a mock with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commands fail without being recorded.
    pub fn fail_next(&mut self, count: usize) {
        self.failures = count;
    }

    /// Every command received, oldest first.
    pub fn commands(&self) -> &[LayoutCommand] {
        &self.commands
    }

    /// Take every recorded command.
    pub fn take_commands(&mut self) -> Vec<LayoutCommand> {
        core::mem::take(&mut self.commands)
    }

    /// Last state requested for a turnout.
    pub fn turnout_state_of(&self, turnout: TurnoutId) -> Option<TurnoutState> {
        self.turnouts.get(&turnout).copied()
    }

    /// Last speed set for a train.
    pub fn speed_of(&self, train: TrainId) -> Option<u16> {
        self.speeds.get(&train).copied()
    }

    /// Last direction set for a train.
    pub fn direction_of(&self, train: TrainId) -> Option<LocomotiveDirection> {
        self.directions.get(&train).copied()
    }

    /// Forget everything recorded.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.turnouts.clear();
        self.speeds.clear();
        self.directions.clear();
    }

    fn record(&mut self, command: LayoutCommand) -> Result<(), MockError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(MockError);
        }
        self.commands.push(command);
        Ok(())
    }
}

impl LayoutInterface for MockInterface {
    type Error = MockError;

    fn set_turnout_state(&mut self, turnout: TurnoutId, state: TurnoutState) -> Result<(), MockError> {
        self.record(LayoutCommand::SetTurnoutState { turnout, state })?;
        self.turnouts.insert(turnout, state);
        Ok(())
    }

    fn set_speed(&mut self, train: TrainId, kph: u16) -> Result<(), MockError> {
        self.record(LayoutCommand::SetSpeed { train, kph })?;
        self.speeds.insert(train, kph);
        Ok(())
    }

    fn set_direction(&mut self, train: TrainId, direction: LocomotiveDirection) -> Result<(), MockError> {
        self.record(LayoutCommand::SetDirection { train, direction })?;
        self.directions.insert(train, direction);
        Ok(())
    }
}
