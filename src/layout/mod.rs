//! Track graph model.
//!
//! A [`Layout`] owns every element in flat arenas indexed by id newtypes.
//! Transitions are additionally indexed by the sockets they attach to, so
//! "what is connected to this socket" is a map lookup.
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::layout::{Block, Layout, SocketRef};
//!
//! let mut layout = Layout::new();
//! let a = layout.add_block(Block::new("a").with_length(100.0));
//! let b = layout.add_block(Block::new("b").with_length(100.0));
//! layout.link(SocketRef::block_next(a), SocketRef::block_previous(b)).unwrap();
//!
//! let transition = layout.transition_from(SocketRef::block_next(a)).unwrap();
//! assert_eq!(transition.other_end(SocketRef::block_next(a)), Some(SocketRef::block_previous(b)));
//! ```

mod block;
mod feedback;
mod ids;
mod train;
mod transition;
mod turnout;

use std::collections::BTreeMap;

pub use block::{
    Block, BlockCategory, BlockReservation, DirectionalFeedback, SpeedLimit,
};
pub use feedback::Feedback;
pub use ids::{BlockId, ElementId, FeedbackId, SocketId, SocketRef, TrainId, TransitionId, TurnoutId};
pub use train::{LeadingBlock, LeadingReservation, Scheduling, Train, MAX_LEADING_BLOCKS};
pub use transition::Transition;
pub use turnout::{Turnout, TurnoutCategory, TurnoutReservation, TurnoutState};

use crate::error::LayoutError;

/// The track graph plus the trains placed on it.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    blocks: Vec<Block>,
    turnouts: Vec<Turnout>,
    feedbacks: Vec<Feedback>,
    transitions: Vec<Transition>,
    trains: Vec<Train>,
    links: BTreeMap<SocketRef, TransitionId>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Authoring
    // ========================================================================

    /// Add a block and return its id.
    pub fn add_block(&mut self, mut block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        block.id = id;
        self.blocks.push(block);
        id
    }

    /// Add a turnout and return its id.
    pub fn add_turnout(&mut self, mut turnout: Turnout) -> TurnoutId {
        let id = TurnoutId(self.turnouts.len() as u32);
        turnout.id = id;
        self.turnouts.push(turnout);
        id
    }

    /// Add a feedback and return its id.
    pub fn add_feedback(&mut self, mut feedback: Feedback) -> FeedbackId {
        let id = FeedbackId(self.feedbacks.len() as u32);
        feedback.id = id;
        self.feedbacks.push(feedback);
        id
    }

    /// Add a train (not yet placed) and return its id.
    pub fn add_train(&mut self, mut train: Train) -> TrainId {
        let id = TrainId(self.trains.len() as u32);
        train.id = id;
        self.trains.push(train);
        id
    }

    /// Connect two sockets with a transition.
    ///
    /// Fails with [`LayoutError::SocketNotFound`] if either socket does not
    /// exist on its element, or an element lookup error if the element is
    /// unknown.
    pub fn link(&mut self, a: SocketRef, b: SocketRef) -> Result<TransitionId, LayoutError> {
        self.check_socket(a)?;
        self.check_socket(b)?;

        let id = TransitionId(self.transitions.len() as u32);
        self.transitions.push(Transition { id, a, b });
        for end in [a, b] {
            if let Some(previous) = self.links.insert(end, id) {
                log::warn!("socket {end} was linked by {previous}, now by {id}");
            }
        }
        Ok(id)
    }

    fn check_socket(&self, socket: SocketRef) -> Result<(), LayoutError> {
        let exists = match socket.element {
            ElementId::Block(id) => {
                self.block(id)?;
                socket.socket == Block::PREVIOUS || socket.socket == Block::NEXT
            }
            ElementId::Turnout(id) => self.turnout(id)?.has_socket(socket.socket),
        };
        if exists {
            Ok(())
        } else {
            Err(LayoutError::SocketNotFound {
                element: socket.element,
                socket: socket.socket,
            })
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Look up a block.
    pub fn block(&self, id: BlockId) -> Result<&Block, LayoutError> {
        self.blocks
            .get(id.index())
            .ok_or(LayoutError::BlockNotFound(id))
    }

    /// Look up a block mutably.
    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, LayoutError> {
        self.blocks
            .get_mut(id.index())
            .ok_or(LayoutError::BlockNotFound(id))
    }

    /// Look up a turnout.
    pub fn turnout(&self, id: TurnoutId) -> Result<&Turnout, LayoutError> {
        self.turnouts
            .get(id.index())
            .ok_or(LayoutError::TurnoutNotFound(id))
    }

    /// Look up a turnout mutably.
    pub fn turnout_mut(&mut self, id: TurnoutId) -> Result<&mut Turnout, LayoutError> {
        self.turnouts
            .get_mut(id.index())
            .ok_or(LayoutError::TurnoutNotFound(id))
    }

    /// Look up a feedback.
    pub fn feedback(&self, id: FeedbackId) -> Result<&Feedback, LayoutError> {
        self.feedbacks
            .get(id.index())
            .ok_or(LayoutError::FeedbackNotFound(id))
    }

    /// Look up a feedback mutably.
    pub fn feedback_mut(&mut self, id: FeedbackId) -> Result<&mut Feedback, LayoutError> {
        self.feedbacks
            .get_mut(id.index())
            .ok_or(LayoutError::FeedbackNotFound(id))
    }

    /// Look up a train.
    pub fn train(&self, id: TrainId) -> Result<&Train, LayoutError> {
        self.trains
            .get(id.index())
            .ok_or(LayoutError::TrainNotFound(id))
    }

    /// Look up a train mutably.
    pub fn train_mut(&mut self, id: TrainId) -> Result<&mut Train, LayoutError> {
        self.trains
            .get_mut(id.index())
            .ok_or(LayoutError::TrainNotFound(id))
    }

    /// All blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// All turnouts.
    pub fn turnouts(&self) -> &[Turnout] {
        &self.turnouts
    }

    /// All feedbacks.
    pub fn feedbacks(&self) -> &[Feedback] {
        &self.feedbacks
    }

    /// All transitions.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// All trains, placed or not.
    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    /// Ids of all trains.
    pub fn train_ids(&self) -> Vec<TrainId> {
        self.trains.iter().map(|t| t.id).collect()
    }

    /// Transition attached to `socket`, if any.
    pub fn transition_from(&self, socket: SocketRef) -> Option<&Transition> {
        self.links
            .get(&socket)
            .and_then(|id| self.transitions.get(id.index()))
    }

    /// Block containing `feedback`.
    pub fn feedback_block(&self, feedback: FeedbackId) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|b| b.feedbacks.contains(&feedback))
            .map(|b| b.id)
    }

    /// Find a block by name.
    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks.iter().find(|b| b.name == name).map(|b| b.id)
    }

    /// Find a turnout by name.
    pub fn find_turnout(&self, name: &str) -> Option<TurnoutId> {
        self.turnouts.iter().find(|t| t.name == name).map(|t| t.id)
    }

    /// Find a feedback by name.
    pub fn find_feedback(&self, name: &str) -> Option<FeedbackId> {
        self.feedbacks.iter().find(|f| f.name == name).map(|f| f.id)
    }

    /// Recorded length of a block or turnout.
    pub fn element_length(&self, element: ElementId) -> Result<Option<f64>, LayoutError> {
        Ok(match element {
            ElementId::Block(id) => self.block(id)?.length,
            ElementId::Turnout(id) => self.turnout(id)?.length,
        })
    }

    /// Train holding `element`, if any.
    pub fn holder_of(&self, element: ElementId) -> Result<Option<TrainId>, LayoutError> {
        Ok(match element {
            ElementId::Block(id) => self.block(id)?.reservation.map(|r| r.train),
            ElementId::Turnout(id) => self.turnout(id)?.reservation.map(|r| r.train),
        })
    }

    // ========================================================================
    // Consistency
    // ========================================================================

    /// Scan every train's claims and every element's reservation.
    ///
    /// Returns the elements that are claimed by two trains, or whose recorded
    /// holder does not match the train claiming them. An empty result means
    /// no element is held twice.
    pub fn reservation_conflicts(&self) -> Vec<ElementId> {
        let mut claims: BTreeMap<ElementId, TrainId> = BTreeMap::new();
        let mut conflicts = Vec::new();

        for train in &self.trains {
            let elements = train
                .held_blocks()
                .into_iter()
                .map(ElementId::Block)
                .chain(train.held_turnouts().into_iter().map(ElementId::Turnout));
            for element in elements {
                match claims.insert(element, train.id) {
                    Some(other) if other != train.id => conflicts.push(element),
                    _ => {}
                }
                if !matches!(self.holder_of(element), Ok(Some(holder)) if holder == train.id) {
                    conflicts.push(element);
                }
            }
        }

        conflicts.sort();
        conflicts.dedup();
        conflicts
    }
}
