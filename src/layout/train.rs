//! Trains and their reservation bookkeeping.

use crate::config::{short_string, Name};
use crate::direction::{BlockDirection, Orientation};
use crate::motion::MotionState;
use crate::route::Route;
use crate::traits::LocomotiveDirection;

use super::{BlockId, ElementId, TrainId, TurnoutId};

/// Hard upper bound on the number of leading blocks a train can hold.
pub const MAX_LEADING_BLOCKS: usize = 8;

/// How a train is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Scheduling {
    /// Manual: the driver sets the speed.
    #[default]
    Unmanaged,
    /// Automatic: the controller drives along the route.
    Managed {
        /// Stop at the next station and hand back control.
        finishing: bool,
    },
    /// Automatic, with an immediate stop pending.
    StopManaged,
}

impl Scheduling {
    /// Returns true for the automatic modes.
    pub const fn is_managed(self) -> bool {
        !matches!(self, Scheduling::Unmanaged)
    }
}

/// A block reserved ahead of the train, with the turnouts leading into it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeadingBlock {
    /// The block.
    pub block: BlockId,
    /// Direction of travel through it.
    pub direction: BlockDirection,
    /// Turnouts between the previous block and this one, in travel order.
    pub turnouts: Vec<TurnoutId>,
    /// Length of the block plus its turnouts, in centimeters.
    pub length: f64,
}

/// The ordered set of blocks reserved ahead of a train.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeadingReservation {
    /// Reserved blocks, nearest first.
    pub blocks: heapless::Vec<LeadingBlock, MAX_LEADING_BLOCKS>,
    /// Total reserved length ahead of the train.
    pub length: f64,
    /// Part of `length` reachable through settled turnouts.
    pub settled_length: f64,
}

impl LeadingReservation {
    /// Returns true if nothing is reserved ahead.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Leading block ids, nearest first.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.block).collect()
    }

    /// Every turnout held ahead of the train.
    pub fn turnouts(&self) -> impl Iterator<Item = TurnoutId> + '_ {
        self.blocks.iter().flat_map(|b| b.turnouts.iter().copied())
    }

    /// The nearest leading block.
    pub fn first(&self) -> Option<&LeadingBlock> {
        self.blocks.first()
    }

    /// Returns true if `block` is among the leading blocks.
    pub fn contains(&self, block: BlockId) -> bool {
        self.blocks.iter().any(|b| b.block == block)
    }

    /// Forget every leading block.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.length = 0.0;
        self.settled_length = 0.0;
    }
}

/// A train known to the layout.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Train {
    /// Identity, assigned by the layout.
    pub id: TrainId,
    /// Display name.
    pub name: Name,
    /// Length in centimeters, locomotive included.
    pub length: Option<f64>,
    /// Top speed used by automatic driving, km/h.
    pub max_speed_kph: u16,
    /// Direction the locomotive is driven in.
    pub locomotive_direction: LocomotiveDirection,
    /// Locomotive pushes the wagons.
    pub wagons_pushed: bool,
    /// Block the head of the train is in. `None` when not on the layout.
    pub block: Option<BlockId>,
    /// Feedbacks passed in the current block, in travel order.
    pub position: usize,
    /// Train and wagon orientation in the current block.
    pub orientation: Orientation,
    /// Reservation ahead of the train.
    pub leading: LeadingReservation,
    /// Elements behind the head that the train still covers, nearest first.
    pub trailing: Vec<ElementId>,
    /// Motion state.
    pub state: MotionState,
    /// Driving mode.
    pub scheduling: Scheduling,
    /// Speed asked for by the driver (manual mode).
    pub requested_kph: u16,
    /// Speed last sent to the locomotive.
    pub commanded_kph: u16,
    /// Speed last reported by the command station.
    pub actual_kph: u16,
    /// A report of speed 0 arrived after the last non-zero speed command.
    pub standstill_reported: bool,
    /// Route followed in managed mode.
    pub route: Option<Route>,
    /// Index of the route item for the current block.
    pub route_index: usize,
    /// Waiting for a restart timer before leaving a station.
    pub awaiting_restart: bool,
    /// The station stop for the current block has been served.
    pub station_stop_done: bool,
}

impl Train {
    /// Create a train that is not on the layout yet.
    pub fn new(name: &str) -> Self {
        Self {
            id: TrainId(0),
            name: short_string(name),
            length: None,
            max_speed_kph: 80,
            locomotive_direction: LocomotiveDirection::Forward,
            wagons_pushed: false,
            block: None,
            position: 0,
            orientation: Orientation::default(),
            leading: LeadingReservation::default(),
            trailing: Vec::new(),
            state: MotionState::Stopped,
            scheduling: Scheduling::Unmanaged,
            requested_kph: 0,
            commanded_kph: 0,
            actual_kph: 0,
            standstill_reported: true,
            route: None,
            route_index: 0,
            awaiting_restart: false,
            station_stop_done: false,
        }
    }

    /// Set the length in centimeters
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the automatic top speed
    pub fn with_max_speed(mut self, kph: u16) -> Self {
        self.max_speed_kph = kph;
        self
    }

    /// Set whether the locomotive pushes its wagons
    pub fn with_wagons_pushed(mut self, pushed: bool) -> Self {
        self.wagons_pushed = pushed;
        self
    }

    /// Set the locomotive direction
    pub fn with_locomotive_direction(mut self, direction: LocomotiveDirection) -> Self {
        self.locomotive_direction = direction;
        self
    }

    /// Returns true if the train is on the layout.
    pub fn is_placed(&self) -> bool {
        self.block.is_some()
    }

    /// Returns true if the train is in automatic mode.
    pub fn is_managed(&self) -> bool {
        self.scheduling.is_managed()
    }

    /// Returns true unless the train is stopped.
    pub fn is_moving(&self) -> bool {
        self.state != MotionState::Stopped
    }

    /// Direction the train moves through its current block.
    pub fn travel_direction(&self) -> BlockDirection {
        self.orientation.travel(self.locomotive_direction)
    }

    /// Whether the locomotive's leading end is its front coupling.
    pub fn locomotive_leads_front(&self) -> bool {
        self.locomotive_direction.is_forward() != self.wagons_pushed
    }

    /// Every block the train holds: current, leading and trailing.
    pub fn held_blocks(&self) -> Vec<BlockId> {
        let mut blocks: Vec<BlockId> = self.block.into_iter().collect();
        blocks.extend(self.leading.blocks.iter().map(|b| b.block));
        blocks.extend(self.trailing.iter().filter_map(|e| match e {
            ElementId::Block(id) => Some(*id),
            ElementId::Turnout(_) => None,
        }));
        blocks
    }

    /// Every turnout the train holds, leading and trailing.
    pub fn held_turnouts(&self) -> Vec<TurnoutId> {
        let mut turnouts: Vec<TurnoutId> = self.leading.turnouts().collect();
        turnouts.extend(self.trailing.iter().filter_map(|e| match e {
            ElementId::Turnout(id) => Some(*id),
            ElementId::Block(_) => None,
        }));
        turnouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_train_is_off_layout() {
        let train = Train::new("ICE");
        assert!(!train.is_placed());
        assert!(!train.is_moving());
        assert!(!train.is_managed());
        assert!(train.leading.is_empty());
    }

    #[test]
    fn leads_front_depends_on_pushing() {
        let pulled = Train::new("a");
        assert!(pulled.locomotive_leads_front());

        let pushed = Train::new("b").with_wagons_pushed(true);
        assert!(!pushed.locomotive_leads_front());

        let backward = Train::new("c").with_locomotive_direction(LocomotiveDirection::Backward);
        assert!(!backward.locomotive_leads_front());
    }

    #[test]
    fn held_elements_split_by_kind() {
        let mut train = Train::new("a");
        train.block = Some(BlockId(2));
        train.trailing = vec![ElementId::Turnout(TurnoutId(0)), ElementId::Block(BlockId(1))];
        let _ = train.leading.blocks.push(LeadingBlock {
            block: BlockId(3),
            direction: BlockDirection::Next,
            turnouts: vec![TurnoutId(4)],
            length: 100.0,
        });

        assert_eq!(train.held_blocks(), vec![BlockId(2), BlockId(3), BlockId(1)]);
        assert_eq!(train.held_turnouts(), vec![TurnoutId(4), TurnoutId(0)]);
    }

    #[test]
    fn scheduling_modes() {
        assert!(!Scheduling::Unmanaged.is_managed());
        assert!(Scheduling::Managed { finishing: false }.is_managed());
        assert!(Scheduling::StopManaged.is_managed());
    }
}
