//! Walks the track graph from a block in a direction of travel.
//!
//! The walk emits the start block, then each transition, turnout and block
//! in the order a train would meet them. Turnouts are crossed according to
//! their *requested* state, which is where the train will actually go once
//! the command station catches up. When a destination block is given, a
//! turnout instead takes whichever exit leads to that block through the
//! next chain of turnouts, if one does.
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::direction::BlockDirection;
//! use rs_trainz_layout::layout::{Block, Layout, SocketRef};
//! use rs_trainz_layout::visitor::{self, Visit, VisitEnd, VisitStep};
//!
//! let mut layout = Layout::new();
//! let a = layout.add_block(Block::new("a"));
//! let b = layout.add_block(Block::new("b"));
//! layout.link(SocketRef::block_next(a), SocketRef::block_previous(b)).unwrap();
//!
//! let mut blocks = Vec::new();
//! let end = visitor::visit(&layout, a, BlockDirection::Next, None, |step| {
//!     if let VisitStep::Block { block, .. } = step {
//!         blocks.push(*block);
//!     }
//!     Visit::Continue
//! })
//! .unwrap();
//!
//! assert_eq!(blocks, vec![a, b]);
//! assert_eq!(end, VisitEnd::DeadEnd);
//! ```

use crate::direction::{BlockDirection, BlockSocket};
use crate::error::LayoutError;
use crate::layout::{
    BlockId, ElementId, Layout, SocketId, SocketRef, TransitionId, TurnoutId, TurnoutState,
};

/// Turnouts followed in a row when looking for a destination block.
const MAX_TURNOUT_CHAIN: usize = 8;

/// One element met by the walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitStep {
    /// A block, with the direction of travel through it.
    Block {
        /// The block.
        block: BlockId,
        /// Direction of travel.
        direction: BlockDirection,
        /// Socket the walk entered through. `None` for the start block.
        entry: Option<SocketId>,
    },
    /// A transition crossed between two elements.
    Transition(TransitionId),
    /// A turnout and the socket pair used to cross it.
    Turnout {
        /// The turnout.
        turnout: TurnoutId,
        /// Entry socket.
        from: SocketId,
        /// Exit socket.
        to: SocketId,
        /// State connecting `from` to `to`.
        state: TurnoutState,
    },
}

/// Callback verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    /// Keep walking.
    Continue,
    /// End the walk now.
    Stop,
}

/// Why a walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitEnd {
    /// The callback returned [`Visit::Stop`].
    Stopped,
    /// The destination block was reached.
    Destination,
    /// A socket with no transition, or a turnout with no exit.
    DeadEnd,
    /// Every transition was crossed in both directions without ending.
    Limit,
}

/// Walk the graph from `from` travelling in `direction`.
///
/// With `destination` set, the walk ends when that block is entered (the
/// start block does not count). Lookup errors abort the walk.
pub fn visit<F>(
    layout: &Layout,
    from: BlockId,
    direction: BlockDirection,
    destination: Option<BlockId>,
    mut callback: F,
) -> Result<VisitEnd, LayoutError>
where
    F: FnMut(&VisitStep) -> Visit,
{
    layout.block(from)?;
    let limit = layout.transitions().len() * 2 + 1;
    let mut crossed = 0;

    let mut block = from;
    let mut travel = direction;
    let mut entry = None;

    loop {
        let step = VisitStep::Block {
            block,
            direction: travel,
            entry,
        };
        if callback(&step) == Visit::Stop {
            return Ok(VisitEnd::Stopped);
        }
        if entry.is_some() && destination == Some(block) {
            return Ok(VisitEnd::Destination);
        }

        let mut socket = SocketRef {
            element: ElementId::Block(block),
            socket: travel.exit_socket().id(),
        };

        // Cross transitions and turnouts until the next block
        loop {
            crossed += 1;
            if crossed > limit {
                return Ok(VisitEnd::Limit);
            }
            let Some(transition) = layout.transition_from(socket) else {
                return Ok(VisitEnd::DeadEnd);
            };
            if callback(&VisitStep::Transition(transition.id)) == Visit::Stop {
                return Ok(VisitEnd::Stopped);
            }
            let Some(other) = transition.other_end(socket) else {
                return Ok(VisitEnd::DeadEnd);
            };

            match other.element {
                ElementId::Block(next) => {
                    let side = BlockSocket::from_id(other.socket).ok_or(
                        LayoutError::SocketNotFound {
                            element: other.element,
                            socket: other.socket,
                        },
                    )?;
                    block = next;
                    travel = BlockDirection::entering_through(side);
                    entry = Some(other.socket);
                    break;
                }
                ElementId::Turnout(turnout) => {
                    let Some((to, state)) = turnout_exit(layout, turnout, other.socket, destination)?
                    else {
                        return Ok(VisitEnd::DeadEnd);
                    };
                    let step = VisitStep::Turnout {
                        turnout,
                        from: other.socket,
                        to,
                        state,
                    };
                    if callback(&step) == Visit::Stop {
                        return Ok(VisitEnd::Stopped);
                    }
                    socket = SocketRef {
                        element: ElementId::Turnout(turnout),
                        socket: to,
                    };
                }
            }
        }
    }
}

/// The block immediately after `block` when travelling in `direction`,
/// with the direction of travel through it.
pub fn next_block(
    layout: &Layout,
    block: BlockId,
    direction: BlockDirection,
) -> Result<Option<(BlockId, BlockDirection)>, LayoutError> {
    let mut found = None;
    visit(layout, block, direction, None, |step| match *step {
        VisitStep::Block {
            block,
            direction,
            entry: Some(_),
        } => {
            found = Some((block, direction));
            Visit::Stop
        }
        _ => Visit::Continue,
    })?;
    Ok(found)
}

/// Exit taken through a turnout entered at `from`.
fn turnout_exit(
    layout: &Layout,
    turnout: TurnoutId,
    from: SocketId,
    destination: Option<BlockId>,
) -> Result<Option<(SocketId, TurnoutState)>, LayoutError> {
    let element = layout.turnout(turnout)?;
    if let Some(target) = destination {
        for (to, state) in element.exits_from(from) {
            let exit = SocketRef {
                element: ElementId::Turnout(turnout),
                socket: to,
            };
            if leads_to(layout, exit, target, MAX_TURNOUT_CHAIN)? {
                return Ok(Some((to, state)));
            }
        }
    }
    let state = element.requested_state;
    Ok(element.exit_socket(from, state).map(|to| (to, state)))
}

/// Returns true if leaving through `socket` reaches `target` as the next
/// block, crossing at most `depth` further turnouts.
fn leads_to(
    layout: &Layout,
    socket: SocketRef,
    target: BlockId,
    depth: usize,
) -> Result<bool, LayoutError> {
    let Some(other) = layout
        .transition_from(socket)
        .and_then(|t| t.other_end(socket))
    else {
        return Ok(false);
    };
    match other.element {
        ElementId::Block(block) => Ok(block == target),
        ElementId::Turnout(_) if depth == 0 => Ok(false),
        ElementId::Turnout(turnout) => {
            for (to, _) in layout.turnout(turnout)?.exits_from(other.socket) {
                let exit = SocketRef {
                    element: ElementId::Turnout(turnout),
                    socket: to,
                };
                if leads_to(layout, exit, target, depth - 1)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Block, Turnout, TurnoutCategory};

    /// a -> t0 -> (straight) b, (branch) c
    fn fork() -> (Layout, BlockId, BlockId, BlockId, TurnoutId) {
        let mut layout = Layout::new();
        let a = layout.add_block(Block::new("a"));
        let b = layout.add_block(Block::new("b"));
        let c = layout.add_block(Block::new("c"));
        let t = layout.add_turnout(Turnout::new("t0", TurnoutCategory::SingleLeft));
        layout
            .link(SocketRef::block_next(a), SocketRef::turnout(t, 0))
            .unwrap();
        layout
            .link(SocketRef::turnout(t, 1), SocketRef::block_previous(b))
            .unwrap();
        layout
            .link(SocketRef::turnout(t, 2), SocketRef::block_next(c))
            .unwrap();
        (layout, a, b, c, t)
    }

    fn blocks_visited(
        layout: &Layout,
        from: BlockId,
        destination: Option<BlockId>,
    ) -> (Vec<(BlockId, BlockDirection)>, VisitEnd) {
        let mut blocks = Vec::new();
        let end = visit(layout, from, BlockDirection::Next, destination, |step| {
            if let VisitStep::Block {
                block, direction, ..
            } = step
            {
                blocks.push((*block, *direction));
            }
            Visit::Continue
        })
        .unwrap();
        (blocks, end)
    }

    #[test]
    fn follows_requested_state() {
        let (mut layout, a, b, c, t) = fork();
        let (blocks, end) = blocks_visited(&layout, a, None);
        assert_eq!(blocks, vec![(a, BlockDirection::Next), (b, BlockDirection::Next)]);
        assert_eq!(end, VisitEnd::DeadEnd);

        // Actual state is ignored, requested state wins
        layout.turnout_mut(t).unwrap().requested_state = TurnoutState::Branch;
        let (blocks, _) = blocks_visited(&layout, a, None);
        // c is entered through its next socket so it is travelled backward
        assert_eq!(blocks[1], (c, BlockDirection::Previous));
    }

    #[test]
    fn destination_overrides_turnout_state() {
        let (layout, a, _b, c, _t) = fork();
        let (blocks, end) = blocks_visited(&layout, a, Some(c));
        assert_eq!(blocks.last().map(|b| b.0), Some(c));
        assert_eq!(end, VisitEnd::Destination);
    }

    #[test]
    fn steps_come_in_travel_order() {
        let (layout, a, b, _c, t) = fork();
        let mut steps = Vec::new();
        visit(&layout, a, BlockDirection::Next, None, |step| {
            steps.push(*step);
            Visit::Continue
        })
        .unwrap();

        assert_eq!(steps.len(), 5);
        assert!(matches!(steps[0], VisitStep::Block { block, entry: None, .. } if block == a));
        assert!(matches!(steps[1], VisitStep::Transition(_)));
        assert!(matches!(
            steps[2],
            VisitStep::Turnout { turnout, from: SocketId(0), to: SocketId(1), .. } if turnout == t
        ));
        assert!(matches!(steps[3], VisitStep::Transition(_)));
        assert!(matches!(steps[4], VisitStep::Block { block, entry: Some(_), .. } if block == b));
    }

    #[test]
    fn callback_can_stop() {
        let (layout, a, ..) = fork();
        let end = visit(&layout, a, BlockDirection::Next, None, |_| Visit::Stop).unwrap();
        assert_eq!(end, VisitEnd::Stopped);
    }

    #[test]
    fn next_block_from_both_sides() {
        let (layout, a, b, _c, _t) = fork();
        assert_eq!(
            next_block(&layout, a, BlockDirection::Next).unwrap(),
            Some((b, BlockDirection::Next))
        );
        assert_eq!(next_block(&layout, a, BlockDirection::Previous).unwrap(), None);
        assert_eq!(
            next_block(&layout, b, BlockDirection::Previous).unwrap(),
            Some((a, BlockDirection::Previous))
        );
    }

    #[test]
    fn loop_ends_at_limit() {
        let mut layout = Layout::new();
        let a = layout.add_block(Block::new("a"));
        let b = layout.add_block(Block::new("b"));
        layout
            .link(SocketRef::block_next(a), SocketRef::block_previous(b))
            .unwrap();
        layout
            .link(SocketRef::block_next(b), SocketRef::block_previous(a))
            .unwrap();

        let (blocks, end) = blocks_visited(&layout, a, None);
        assert_eq!(end, VisitEnd::Limit);
        assert!(blocks.len() >= 3);
    }

    #[test]
    fn unknown_start_block() {
        let layout = Layout::new();
        let err = visit(&layout, BlockId(0), BlockDirection::Next, None, |_| Visit::Continue);
        assert_eq!(err.unwrap_err(), LayoutError::BlockNotFound(BlockId(0)));
    }
}
