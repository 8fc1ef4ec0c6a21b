//! Direction algebra.
//!
//! A train on the layout carries three orientations:
//!
//! - the locomotive direction ([`LocomotiveDirection`]), set by the driver
//!   or by automation,
//! - the train direction in its block ([`Orientation::train`]), recomputed
//!   each time the train enters a block,
//! - the wagon direction in its block ([`Orientation::wagons`]), which only
//!   follows the train into new blocks and is otherwise changed by an
//!   explicit user action.
//!
//! [`resolve`] ties them together when a train enters a block:
//!
//! | Locomotive | Entry socket | Leads front | Train | Wagons |
//! |---|---|---|---|---|
//! | forward | next | yes | next | previous |
//! | forward | previous | yes | previous | next |
//! | backward | next | no | previous | previous |
//! | backward | previous | no | next | next |
//!
//! When the locomotive end that leads does not match the locomotive
//! direction (the locomotive pushes from the far end) the wagon direction
//! is flipped relative to the table.

use crate::layout::{Block, SocketId};
use crate::traits::LocomotiveDirection;

/// Direction relative to a block's natural orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BlockDirection {
    /// Toward the block's `next` socket.
    #[default]
    Next,
    /// Toward the block's `previous` socket.
    Previous,
}

impl BlockDirection {
    /// The other direction.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Next => Self::Previous,
            Self::Previous => Self::Next,
        }
    }

    /// Socket a train travelling in this direction leaves the block through.
    #[inline]
    pub const fn exit_socket(self) -> BlockSocket {
        match self {
            Self::Next => BlockSocket::Next,
            Self::Previous => BlockSocket::Previous,
        }
    }

    /// Socket a train travelling in this direction entered the block through.
    #[inline]
    pub const fn entry_socket(self) -> BlockSocket {
        self.opposite().exit_socket()
    }

    /// Direction of travel for a train entering through `socket`.
    #[inline]
    pub const fn entering_through(socket: BlockSocket) -> Self {
        match socket {
            BlockSocket::Previous => Self::Next,
            BlockSocket::Next => Self::Previous,
        }
    }
}

/// One of the two sockets of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BlockSocket {
    /// The `previous` socket (index 0).
    Previous,
    /// The `next` socket (index 1).
    Next,
}

impl BlockSocket {
    /// Socket index on the block.
    #[inline]
    pub const fn id(self) -> SocketId {
        match self {
            Self::Previous => Block::PREVIOUS,
            Self::Next => Block::NEXT,
        }
    }

    /// Converts a socket index, if it names a block socket.
    pub fn from_id(id: SocketId) -> Option<Self> {
        match id {
            Block::PREVIOUS => Some(Self::Previous),
            Block::NEXT => Some(Self::Next),
            _ => None,
        }
    }

    /// Block direction named like this socket.
    #[inline]
    const fn side(self) -> BlockDirection {
        match self {
            Self::Previous => BlockDirection::Previous,
            Self::Next => BlockDirection::Next,
        }
    }
}

/// Train and wagon orientation within the block the train occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orientation {
    /// Train direction in block.
    pub train: BlockDirection,
    /// Wagon direction in block.
    pub wagons: BlockDirection,
}

impl Orientation {
    /// Direction the train moves through the block when driven in `loco`.
    #[inline]
    pub const fn travel(self, loco: LocomotiveDirection) -> BlockDirection {
        match loco {
            LocomotiveDirection::Forward => self.train.opposite(),
            LocomotiveDirection::Backward => self.train,
        }
    }

    /// Orientation with the wagons turned around.
    #[inline]
    pub const fn with_wagons_toggled(self) -> Self {
        Self {
            train: self.train,
            wagons: self.wagons.opposite(),
        }
    }
}

/// Resolves the train and wagon direction for a train entering a block.
///
/// Pure: the result only depends on the arguments.
pub const fn resolve(
    locomotive: LocomotiveDirection,
    entry: BlockSocket,
    locomotive_leads_front: bool,
) -> Orientation {
    let side = entry.side();
    let train = match locomotive {
        LocomotiveDirection::Forward => side,
        LocomotiveDirection::Backward => side.opposite(),
    };
    let front_end_leads = locomotive.is_forward() == locomotive_leads_front;
    let wagons = if front_end_leads {
        side.opposite()
    } else {
        side
    };
    Orientation { train, wagons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LocomotiveDirection::{Backward, Forward};

    fn o(train: BlockDirection, wagons: BlockDirection) -> Orientation {
        Orientation { train, wagons }
    }

    #[test]
    fn resolve_reproduces_table() {
        use BlockDirection::{Next, Previous};

        assert_eq!(resolve(Forward, BlockSocket::Next, true), o(Next, Previous));
        assert_eq!(resolve(Forward, BlockSocket::Previous, true), o(Previous, Next));
        assert_eq!(resolve(Backward, BlockSocket::Next, false), o(Previous, Previous));
        assert_eq!(resolve(Backward, BlockSocket::Previous, false), o(Next, Next));
    }

    #[test]
    fn pushing_flips_only_the_wagons() {
        for loco in [Forward, Backward] {
            for entry in [BlockSocket::Next, BlockSocket::Previous] {
                let leads = loco.is_forward();
                let normal = resolve(loco, entry, leads);
                let pushed = resolve(loco, entry, !leads);
                assert_eq!(normal.train, pushed.train);
                assert_eq!(normal.wagons, pushed.wagons.opposite());
            }
        }
    }

    #[test]
    fn travel_leaves_through_far_socket() {
        // Whatever the locomotive direction, a train entering through one
        // socket travels toward the other one.
        for loco in [Forward, Backward] {
            for entry in [BlockSocket::Next, BlockSocket::Previous] {
                let orientation = resolve(loco, entry, loco.is_forward());
                let travel = orientation.travel(loco);
                assert_eq!(travel.entry_socket(), entry);
                assert_eq!(travel, BlockDirection::entering_through(entry));
            }
        }
    }

    #[test]
    fn reversing_locomotive_reverses_travel() {
        let orientation = resolve(Forward, BlockSocket::Previous, true);
        assert_eq!(orientation.travel(Forward), BlockDirection::Next);
        assert_eq!(orientation.travel(Backward), BlockDirection::Previous);
    }

    #[test]
    fn socket_ids_round_trip() {
        for socket in [BlockSocket::Next, BlockSocket::Previous] {
            assert_eq!(BlockSocket::from_id(socket.id()), Some(socket));
        }
        assert_eq!(BlockSocket::from_id(SocketId(3)), None);
    }

    #[test]
    fn toggling_wagons_keeps_train() {
        let orientation = o(BlockDirection::Next, BlockDirection::Previous);
        let toggled = orientation.with_wagons_toggled();
        assert_eq!(toggled.train, BlockDirection::Next);
        assert_eq!(toggled.wagons, BlockDirection::Next);
    }
}
