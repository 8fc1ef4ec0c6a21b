//! Shortest-path router.
//!
//! Dijkstra over directed element endpoints. A node is an element together
//! with the socket a train leaves it through, so the same block can be
//! visited once in each direction. That is what lets a route run around a
//! loop and come back to its start block.
//!
//! The cost of an edge is the length of the element entered. Unknown or
//! zero lengths are replaced by the configured fallbacks.
//!
//! Elements held by another train are handled per [`ReservedPolicy`].
//! Elements another train physically covers (its current block and its
//! trailing elements) and disabled blocks are never used.
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::config::RoutingConfig;
//! use rs_trainz_layout::direction::BlockDirection;
//! use rs_trainz_layout::layout::{Block, Layout, SocketRef, Train};
//! use rs_trainz_layout::router::{Destination, RouteRequest, Router};
//!
//! let mut layout = Layout::new();
//! let a = layout.add_block(Block::new("a").with_length(100.0));
//! let b = layout.add_block(Block::new("b").with_length(250.0));
//! layout.link(SocketRef::block_next(a), SocketRef::block_previous(b)).unwrap();
//! let train = layout.add_train(Train::new("ice"));
//!
//! let config = RoutingConfig::default();
//! let router = Router::new(&layout, &config);
//! let path = router
//!     .shortest_path(&RouteRequest {
//!         train,
//!         from: a,
//!         direction: BlockDirection::Next,
//!         destination: Destination::any_direction(b),
//!         min_length: 0.0,
//!     })
//!     .unwrap()
//!     .expect("b is reachable");
//!
//! assert_eq!(path.blocks(), vec![a, b]);
//! assert_eq!(path.length, 250.0);
//! ```

use core::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::config::{ReservedPolicy, RoutingConfig};
use crate::direction::{BlockDirection, BlockSocket};
use crate::error::LayoutError;
use crate::layout::{BlockId, ElementId, Layout, SocketId, SocketRef, TrainId};

/// Where a route should end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Destination {
    /// Block to reach.
    pub block: BlockId,
    /// Required direction of travel in that block, if any.
    pub direction: Option<BlockDirection>,
}

impl Destination {
    /// Reach `block` travelling in either direction.
    pub const fn any_direction(block: BlockId) -> Self {
        Self {
            block,
            direction: None,
        }
    }

    /// Reach `block` travelling in `direction`.
    pub const fn towards(block: BlockId, direction: BlockDirection) -> Self {
        Self {
            block,
            direction: Some(direction),
        }
    }

    fn accepts(&self, block: BlockId, direction: BlockDirection) -> bool {
        self.block == block && self.direction.map_or(true, |d| d == direction)
    }
}

/// Parameters of a path search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteRequest {
    /// Train the path is for. Its own reservations never block it.
    pub train: TrainId,
    /// Start block.
    pub from: BlockId,
    /// Direction of travel in the start block.
    pub direction: BlockDirection,
    /// Where to go.
    pub destination: Destination,
    /// Minimum total length of the path, in centimeters.
    pub min_length: f64,
}

/// One element of a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathStep {
    /// Element crossed.
    pub element: ElementId,
    /// Socket entered through. `None` for the start block.
    pub entry: Option<SocketId>,
    /// Socket left through.
    pub exit: SocketId,
}

impl PathStep {
    /// Direction of travel if the element is a block.
    pub fn block_direction(&self) -> Option<BlockDirection> {
        match self.element {
            ElementId::Block(_) => BlockSocket::from_id(self.exit).map(|s| match s {
                BlockSocket::Next => BlockDirection::Next,
                BlockSocket::Previous => BlockDirection::Previous,
            }),
            ElementId::Turnout(_) => None,
        }
    }
}

/// A path found by the router, start block first.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphPath {
    /// Elements in travel order.
    pub steps: Vec<PathStep>,
    /// Sum of the lengths of every element after the start block.
    pub length: f64,
}

impl GraphPath {
    /// Blocks of the path in travel order.
    pub fn blocks(&self) -> Vec<BlockId> {
        self.steps
            .iter()
            .filter_map(|s| match s.element {
                ElementId::Block(id) => Some(id),
                ElementId::Turnout(_) => None,
            })
            .collect()
    }

    /// Returns true if the path crosses `element`.
    pub fn contains(&self, element: ElementId) -> bool {
        self.steps.iter().any(|s| s.element == element)
    }
}

/// Internal outcome of a search.
#[derive(Debug)]
enum PathSearch {
    Found(GraphPath),
    NoPath,
    TooShort(f64),
}

type Node = (ElementId, SocketId);

#[derive(Clone, Copy, Debug)]
struct Candidate {
    cost: f64,
    seq: u64,
    node: Node,
    /// Set when `node` is the destination reached from `via`.
    arrival: Option<Node>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Reversed so the max-heap pops the cheapest, oldest candidate first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Dijkstra router over a layout snapshot.
pub struct Router<'a> {
    layout: &'a Layout,
    config: &'a RoutingConfig,
}

impl<'a> Router<'a> {
    /// Create a router reading `layout`.
    pub fn new(layout: &'a Layout, config: &'a RoutingConfig) -> Self {
        Self { layout, config }
    }

    /// Lowest-cost path satisfying `request`.
    ///
    /// Returns `Ok(None)` both when nothing reaches the destination and when
    /// the destination is first reached with less than `min_length`.
    pub fn shortest_path(&self, request: &RouteRequest) -> Result<Option<GraphPath>, LayoutError> {
        match self.search(request)? {
            PathSearch::Found(path) => {
                log::debug!(
                    "path for {} from {} to {}: {:?} ({} cm)",
                    request.train,
                    request.from,
                    request.destination.block,
                    path.blocks(),
                    path.length
                );
                Ok(Some(path))
            }
            PathSearch::NoPath => {
                log::info!(
                    "no path for {} from {} to {}",
                    request.train,
                    request.from,
                    request.destination.block
                );
                Ok(None)
            }
            PathSearch::TooShort(length) => {
                log::info!(
                    "path for {} to {} too short: {} < {} cm",
                    request.train,
                    request.destination.block,
                    length,
                    request.min_length
                );
                Ok(None)
            }
        }
    }

    fn search(&self, request: &RouteRequest) -> Result<PathSearch, LayoutError> {
        self.layout.block(request.from)?;
        self.layout.block(request.destination.block)?;
        let occupied = self.occupied_by_others(request.train);

        let start: Node = (
            ElementId::Block(request.from),
            request.direction.exit_socket().id(),
        );
        let mut dist: BTreeMap<Node, f64> = BTreeMap::new();
        let mut prev: BTreeMap<Node, (Node, SocketId)> = BTreeMap::new();
        let mut heap = BinaryHeap::new();
        let mut seq = 0;

        dist.insert(start, 0.0);
        heap.push(Candidate {
            cost: 0.0,
            seq,
            node: start,
            arrival: None,
        });

        while let Some(Candidate {
            cost,
            node,
            arrival,
            ..
        }) = heap.pop()
        {
            if let Some(via) = arrival {
                if cost >= request.min_length {
                    let path = self.reconstruct(start, via, node, &prev, cost)?;
                    return Ok(PathSearch::Found(path));
                }
                return Ok(PathSearch::TooShort(cost));
            }
            if dist.get(&node).is_some_and(|&d| cost > d) {
                continue;
            }

            let socket = SocketRef {
                element: node.0,
                socket: node.1,
            };
            let Some(entry) = self
                .layout
                .transition_from(socket)
                .and_then(|t| t.other_end(socket))
            else {
                continue;
            };
            if occupied.contains(&entry.element) {
                continue;
            }
            let Some(step_cost) = self.entry_cost(request.train, entry.element)? else {
                continue;
            };

            for exit in self.exits(entry)? {
                let next: Node = (entry.element, exit);
                let next_cost = cost + step_cost;
                seq += 1;

                if let ElementId::Block(block) = entry.element {
                    let direction = exit_direction(exit);
                    if request.destination.accepts(block, direction) {
                        heap.push(Candidate {
                            cost: next_cost,
                            seq,
                            node: next,
                            arrival: Some(node),
                        });
                    }
                }

                if dist.get(&next).map_or(true, |&d| next_cost < d) {
                    dist.insert(next, next_cost);
                    prev.insert(next, (node, entry.socket));
                    heap.push(Candidate {
                        cost: next_cost,
                        seq,
                        node: next,
                        arrival: None,
                    });
                }
            }
        }

        Ok(PathSearch::NoPath)
    }

    /// Cost of entering `element`, or `None` if it cannot be used.
    fn entry_cost(&self, train: TrainId, element: ElementId) -> Result<Option<f64>, LayoutError> {
        let (length, fallback, reserved_by_other) = match element {
            ElementId::Block(id) => {
                let block = self.layout.block(id)?;
                if !block.enabled {
                    return Ok(None);
                }
                (
                    block.length,
                    self.config.fallback_block_length,
                    block.is_reserved_by_other(train),
                )
            }
            ElementId::Turnout(id) => {
                let turnout = self.layout.turnout(id)?;
                (
                    turnout.length,
                    self.config.fallback_turnout_length,
                    turnout.is_reserved_by_other(train),
                )
            }
        };

        let mut cost = match length {
            Some(l) if l > 0.0 => l,
            _ => fallback,
        };
        if reserved_by_other {
            match self.config.reserved_policy {
                ReservedPolicy::Exclude => return Ok(None),
                ReservedPolicy::Penalize => cost += self.config.reserved_penalty,
            }
        }
        Ok(Some(cost))
    }

    /// Exit sockets available when entering through `entry`.
    fn exits(&self, entry: SocketRef) -> Result<Vec<SocketId>, LayoutError> {
        Ok(match entry.element {
            ElementId::Block(_) => {
                let side = BlockSocket::from_id(entry.socket).ok_or(LayoutError::SocketNotFound {
                    element: entry.element,
                    socket: entry.socket,
                })?;
                vec![BlockDirection::entering_through(side).exit_socket().id()]
            }
            ElementId::Turnout(id) => self
                .layout
                .turnout(id)?
                .exits_from(entry.socket)
                .into_iter()
                .map(|(to, _)| to)
                .collect(),
        })
    }

    /// Elements physically covered by other trains.
    fn occupied_by_others(&self, train: TrainId) -> BTreeSet<ElementId> {
        self.layout
            .trains()
            .iter()
            .filter(|t| t.id != train)
            .flat_map(|t| {
                t.block
                    .map(ElementId::Block)
                    .into_iter()
                    .chain(t.trailing.iter().copied())
            })
            .collect()
    }

    fn reconstruct(
        &self,
        start: Node,
        via: Node,
        arrival: Node,
        prev: &BTreeMap<Node, (Node, SocketId)>,
        length: f64,
    ) -> Result<GraphPath, LayoutError> {
        let arrival_entry = self.entry_socket_from(via)?;
        let mut steps = vec![PathStep {
            element: arrival.0,
            entry: Some(arrival_entry),
            exit: arrival.1,
        }];

        let mut node = via;
        // Bounded by the number of recorded predecessors
        for _ in 0..=prev.len() {
            if node == start {
                steps.push(PathStep {
                    element: start.0,
                    entry: None,
                    exit: start.1,
                });
                steps.reverse();
                return Ok(GraphPath { steps, length });
            }
            let Some(&(before, entry)) = prev.get(&node) else {
                break;
            };
            steps.push(PathStep {
                element: node.0,
                entry: Some(entry),
                exit: node.1,
            });
            node = before;
        }

        // Predecessor chain broken: the graph changed under the search
        Err(LayoutError::SocketNotFound {
            element: node.0,
            socket: node.1,
        })
    }

    /// Socket entered when leaving `node` through its exit.
    fn entry_socket_from(&self, node: Node) -> Result<SocketId, LayoutError> {
        let socket = SocketRef {
            element: node.0,
            socket: node.1,
        };
        self.layout
            .transition_from(socket)
            .and_then(|t| t.other_end(socket))
            .map(|s| s.socket)
            .ok_or(LayoutError::SocketNotFound {
                element: node.0,
                socket: node.1,
            })
    }
}

fn exit_direction(exit: SocketId) -> BlockDirection {
    if exit == BlockDirection::Previous.exit_socket().id() {
        BlockDirection::Previous
    } else {
        BlockDirection::Next
    }
}
