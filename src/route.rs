//! Routes followed by managed trains.

use crate::direction::BlockDirection;
use crate::layout::{BlockId, ElementId, SocketId, TurnoutId};
use crate::router::{Destination, GraphPath};

/// One element of a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteItem {
    /// Traverse a block, waiting there if it is a station.
    Block {
        /// The block.
        block: BlockId,
        /// Direction of travel.
        direction: BlockDirection,
        /// Wait override in seconds. `None` uses the block's wait time.
        wait_secs: Option<u32>,
    },
    /// Traverse a turnout through a socket pair.
    Turnout {
        /// The turnout.
        turnout: TurnoutId,
        /// Entry socket.
        from: SocketId,
        /// Exit socket.
        to: SocketId,
    },
}

/// Where a route came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteKind {
    /// Authored by hand.
    Fixed,
    /// Built by the router and rebuilt when the train gets stuck.
    Automatic {
        /// Target of the route.
        destination: Destination,
    },
}

/// An ordered list of route items.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Origin of the route.
    pub kind: RouteKind,
    /// Items in travel order, starting with the train's block.
    pub items: Vec<RouteItem>,
}

impl Route {
    /// A hand-authored route.
    pub fn fixed(items: Vec<RouteItem>) -> Self {
        Self {
            kind: RouteKind::Fixed,
            items,
        }
    }

    /// Convert a router path into an automatic route to `destination`.
    pub fn from_path(path: &GraphPath, destination: Destination) -> Self {
        let items = path
            .steps
            .iter()
            .filter_map(|step| match step.element {
                ElementId::Block(block) => Some(RouteItem::Block {
                    block,
                    direction: step.block_direction()?,
                    wait_secs: None,
                }),
                ElementId::Turnout(turnout) => Some(RouteItem::Turnout {
                    turnout,
                    from: step.entry?,
                    to: step.exit,
                }),
            })
            .collect();
        Self {
            kind: RouteKind::Automatic { destination },
            items,
        }
    }

    /// Returns true for router-built routes.
    pub fn is_automatic(&self) -> bool {
        matches!(self.kind, RouteKind::Automatic { .. })
    }

    /// Index of the first block item for `block` at or after `start`.
    pub fn find_block(&self, block: BlockId, start: usize) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(i, item)| match item {
                RouteItem::Block { block: b, .. } if *b == block => Some(i),
                _ => None,
            })
    }

    /// Index of the next block item after `index`.
    pub fn next_block_index(&self, index: usize) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .skip(index + 1)
            .find_map(|(i, item)| matches!(item, RouteItem::Block { .. }).then_some(i))
    }

    /// Returns true if no block item follows `index`.
    pub fn is_last_block(&self, index: usize) -> bool {
        self.next_block_index(index).is_none()
    }

    /// The block item at `index`.
    pub fn block_at(&self, index: usize) -> Option<(BlockId, BlockDirection, Option<u32>)> {
        match self.items.get(index)? {
            RouteItem::Block {
                block,
                direction,
                wait_secs,
            } => Some((*block, *direction, *wait_secs)),
            RouteItem::Turnout { .. } => None,
        }
    }
}
