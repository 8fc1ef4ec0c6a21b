//! Turnouts: switches whose state decides which sockets are connected.
//!
//! Socket numbering per category:
//!
//! | Category | Sockets | States |
//! |---|---|---|
//! | `SingleLeft` / `SingleRight` | 0 points, 1 straight, 2 branch | `Straight` 0-1, `Branch` 0-2 |
//! | `Threeway` | 0 points, 1 straight, 2 left, 3 right | `Straight` 0-1, `BranchLeft` 0-2, `BranchRight` 0-3 |
//! | `DoubleSlip` | 0, 1 on one side, 2, 3 on the other | `Straight` 0-2 and 1-3, `Branch` 0-3 and 1-2 |

use crate::config::{short_string, Name};

use super::{SocketId, SpeedLimit, TrainId, TurnoutId};

/// Physical kind of turnout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TurnoutCategory {
    /// Simple turnout diverging to the left.
    SingleLeft,
    /// Simple turnout diverging to the right.
    SingleRight,
    /// Three-way turnout.
    Threeway,
    /// Double slip switch.
    DoubleSlip,
}

/// State of a turnout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TurnoutState {
    /// Straight route.
    #[default]
    Straight,
    /// Diverging route (single turnouts and double slips).
    Branch,
    /// Left branch of a three-way turnout.
    BranchLeft,
    /// Right branch of a three-way turnout.
    BranchRight,
}

impl TurnoutState {
    /// Returns true for any diverging state.
    pub const fn is_branch(self) -> bool {
        !matches!(self, TurnoutState::Straight)
    }
}

impl TurnoutCategory {
    /// Number of sockets.
    pub const fn socket_count(self) -> u8 {
        match self {
            Self::SingleLeft | Self::SingleRight => 3,
            Self::Threeway | Self::DoubleSlip => 4,
        }
    }

    /// States this category can take.
    pub const fn states(self) -> &'static [TurnoutState] {
        match self {
            Self::SingleLeft | Self::SingleRight | Self::DoubleSlip => {
                &[TurnoutState::Straight, TurnoutState::Branch]
            }
            Self::Threeway => &[
                TurnoutState::Straight,
                TurnoutState::BranchLeft,
                TurnoutState::BranchRight,
            ],
        }
    }

    /// Socket pairs connected in `state`. Empty if the state does not apply.
    pub const fn connections(self, state: TurnoutState) -> &'static [(u8, u8)] {
        use TurnoutState::*;
        match (self, state) {
            (Self::SingleLeft | Self::SingleRight, Straight) => &[(0, 1)],
            (Self::SingleLeft | Self::SingleRight, Branch) => &[(0, 2)],
            (Self::Threeway, Straight) => &[(0, 1)],
            (Self::Threeway, BranchLeft) => &[(0, 2)],
            (Self::Threeway, BranchRight) => &[(0, 3)],
            (Self::DoubleSlip, Straight) => &[(0, 2), (1, 3)],
            (Self::DoubleSlip, Branch) => &[(0, 3), (1, 2)],
            _ => &[],
        }
    }
}

/// A train's claim on a turnout and the socket pair it will use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnoutReservation {
    /// Holder.
    pub train: TrainId,
    /// Entry socket.
    pub from: SocketId,
    /// Exit socket.
    pub to: SocketId,
}

/// A track switch.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Turnout {
    /// Identity, assigned when the turnout is added to a layout.
    pub id: TurnoutId,
    /// Display name.
    pub name: Name,
    /// Physical kind.
    pub category: TurnoutCategory,
    /// State last requested from the command station.
    pub requested_state: TurnoutState,
    /// State last confirmed by the command station.
    pub actual_state: TurnoutState,
    /// Length in centimeters.
    pub length: Option<f64>,
    /// Current holder.
    pub reservation: Option<TurnoutReservation>,
    /// Speed limit while set to a branch.
    pub branch_speed_limit: SpeedLimit,
}

impl Turnout {
    /// Create a straight, unreserved turnout.
    pub fn new(name: &str, category: TurnoutCategory) -> Self {
        Self {
            id: TurnoutId(0),
            name: short_string(name),
            category,
            requested_state: TurnoutState::Straight,
            actual_state: TurnoutState::Straight,
            length: None,
            reservation: None,
            branch_speed_limit: SpeedLimit::Unlimited,
        }
    }

    /// Set the length in centimeters
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    /// Set both requested and actual state
    pub fn with_state(mut self, state: TurnoutState) -> Self {
        self.requested_state = state;
        self.actual_state = state;
        self
    }

    /// Set the branch speed limit
    pub fn with_branch_speed_limit(mut self, limit: SpeedLimit) -> Self {
        self.branch_speed_limit = limit;
        self
    }

    /// Returns true if the turnout has this socket.
    pub fn has_socket(&self, socket: SocketId) -> bool {
        socket.0 < self.category.socket_count()
    }

    /// Socket a train entering through `from` leaves through in `state`.
    pub fn exit_socket(&self, from: SocketId, state: TurnoutState) -> Option<SocketId> {
        self.category
            .connections(state)
            .iter()
            .find_map(|&(a, b)| {
                if a == from.0 {
                    Some(b)
                } else if b == from.0 {
                    Some(a)
                } else {
                    None
                }
            })
            .map(SocketId)
    }

    /// State connecting `from` and `to`, if any.
    pub fn state_for(&self, from: SocketId, to: SocketId) -> Option<TurnoutState> {
        self.category
            .states()
            .iter()
            .copied()
            .find(|&state| self.exit_socket(from, state) == Some(to))
    }

    /// Every exit reachable from `from`, with the state that reaches it.
    pub fn exits_from(&self, from: SocketId) -> Vec<(SocketId, TurnoutState)> {
        self.category
            .states()
            .iter()
            .filter_map(|&state| self.exit_socket(from, state).map(|to| (to, state)))
            .collect()
    }

    /// Returns true once the command station confirmed the requested state.
    pub fn is_settled(&self) -> bool {
        self.requested_state == self.actual_state
    }

    /// Speed limit applying while the turnout is in `state`.
    pub fn speed_limit(&self, state: TurnoutState) -> SpeedLimit {
        if state.is_branch() {
            self.branch_speed_limit
        } else {
            SpeedLimit::Unlimited
        }
    }

    /// Returns true if the turnout is reserved by a train other than `train`.
    pub fn is_reserved_by_other(&self, train: TrainId) -> bool {
        self.reservation.is_some_and(|r| r.train != train)
    }
}
