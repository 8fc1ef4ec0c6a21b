//! Blocks: track segments with two sockets and a row of feedback sensors.

use crate::config::{short_string, Name};
use crate::direction::BlockDirection;

use super::{BlockId, FeedbackId, SocketId, TrainId};

/// What kind of track a block is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlockCategory {
    /// Plain running track.
    #[default]
    Free,
    /// Station track where managed trains stop.
    Station,
    /// Dead-end siding.
    Sidetrack,
}

/// Speed limit attached to a block or a turnout branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpeedLimit {
    /// No restriction.
    #[default]
    Unlimited,
    /// Restricted to the configured limited speed.
    Limited,
}

/// A train's claim on a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockReservation {
    /// Holder of the block.
    pub train: TrainId,
    /// Direction the train travels through the block.
    pub direction: BlockDirection,
}

/// Feedbacks overriding the default brake or stop point, per direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionalFeedback {
    /// Feedback used when travelling toward `next`.
    pub next: Option<FeedbackId>,
    /// Feedback used when travelling toward `previous`.
    pub previous: Option<FeedbackId>,
}

impl DirectionalFeedback {
    fn get(&self, direction: BlockDirection) -> Option<FeedbackId> {
        match direction {
            BlockDirection::Next => self.next,
            BlockDirection::Previous => self.previous,
        }
    }
}

/// A track segment between two sockets.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// Identity, assigned when the block is added to a layout.
    pub id: BlockId,
    /// Display name.
    pub name: Name,
    /// Kind of track.
    pub category: BlockCategory,
    /// Physical length in centimeters.
    pub length: Option<f64>,
    /// Feedbacks ordered from the `previous` end to the `next` end.
    pub feedbacks: Vec<FeedbackId>,
    /// Current holder, if any.
    pub reservation: Option<BlockReservation>,
    /// Disabled blocks are never reserved or routed through.
    pub enabled: bool,
    /// Speed restriction inside the block.
    pub speed_limit: SpeedLimit,
    /// Seconds a managed train waits when it stops here. `None` uses the
    /// configured default.
    pub wait_secs: Option<u32>,
    /// Brake point overrides.
    pub brake_feedback: DirectionalFeedback,
    /// Stop point overrides.
    pub stop_feedback: DirectionalFeedback,
}

impl Block {
    /// The `previous` socket.
    pub const PREVIOUS: SocketId = SocketId(0);
    /// The `next` socket.
    pub const NEXT: SocketId = SocketId(1);

    /// Create an enabled, unreserved block.
    pub fn new(name: &str) -> Self {
        Self {
            id: BlockId(0),
            name: short_string(name),
            category: BlockCategory::Free,
            length: None,
            feedbacks: Vec::new(),
            reservation: None,
            enabled: true,
            speed_limit: SpeedLimit::Unlimited,
            wait_secs: None,
            brake_feedback: DirectionalFeedback::default(),
            stop_feedback: DirectionalFeedback::default(),
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: BlockCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the length in centimeters
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    /// Append feedbacks, in order from the `previous` end
    pub fn with_feedbacks(mut self, feedbacks: &[FeedbackId]) -> Self {
        self.feedbacks.extend_from_slice(feedbacks);
        self
    }

    /// Set the speed limit
    pub fn with_speed_limit(mut self, limit: SpeedLimit) -> Self {
        self.speed_limit = limit;
        self
    }

    /// Set the station wait time
    pub fn with_wait_secs(mut self, secs: u32) -> Self {
        self.wait_secs = Some(secs);
        self
    }

    /// Override the brake feedback for one direction
    pub fn with_brake_feedback(mut self, direction: BlockDirection, feedback: FeedbackId) -> Self {
        match direction {
            BlockDirection::Next => self.brake_feedback.next = Some(feedback),
            BlockDirection::Previous => self.brake_feedback.previous = Some(feedback),
        }
        self
    }

    /// Override the stop feedback for one direction
    pub fn with_stop_feedback(mut self, direction: BlockDirection, feedback: FeedbackId) -> Self {
        match direction {
            BlockDirection::Next => self.stop_feedback.next = Some(feedback),
            BlockDirection::Previous => self.stop_feedback.previous = Some(feedback),
        }
        self
    }

    /// Enable or disable the block
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Number of feedbacks in the block.
    pub fn feedback_count(&self) -> usize {
        self.feedbacks.len()
    }

    /// Index of `feedback` counted in travel order for `direction`.
    ///
    /// The first feedback a train meets when travelling in `direction` has
    /// index 0.
    pub fn travel_index(&self, feedback: FeedbackId, direction: BlockDirection) -> Option<usize> {
        let natural = self.feedbacks.iter().position(|&f| f == feedback)?;
        Some(match direction {
            BlockDirection::Next => natural,
            BlockDirection::Previous => self.feedbacks.len() - 1 - natural,
        })
    }

    /// Feedbacks in the order a train travelling in `direction` meets them.
    pub fn feedbacks_in(&self, direction: BlockDirection) -> Vec<FeedbackId> {
        let iter = self.feedbacks.iter().copied();
        match direction {
            BlockDirection::Next => iter.collect(),
            BlockDirection::Previous => iter.rev().collect(),
        }
    }

    /// First feedback met when entering in `direction`.
    pub fn entry_feedback(&self, direction: BlockDirection) -> Option<FeedbackId> {
        self.feedbacks_in(direction).first().copied()
    }

    /// Position (feedbacks passed) at which a train travelling in
    /// `direction` starts braking.
    pub fn brake_position(&self, direction: BlockDirection) -> usize {
        if let Some(pos) = self.override_position(&self.brake_feedback, direction) {
            return pos;
        }
        let n = self.feedbacks.len();
        if n >= 2 {
            n - 1
        } else {
            n
        }
    }

    /// Position (feedbacks passed) at which a train travelling in
    /// `direction` must be stopping.
    pub fn stop_position(&self, direction: BlockDirection) -> usize {
        self.override_position(&self.stop_feedback, direction)
            .unwrap_or(self.feedbacks.len())
    }

    fn override_position(
        &self,
        overrides: &DirectionalFeedback,
        direction: BlockDirection,
    ) -> Option<usize> {
        let feedback = overrides.get(direction)?;
        self.travel_index(feedback, direction).map(|i| i + 1)
    }

    /// Returns true if the block is reserved by a train other than `train`.
    pub fn is_reserved_by_other(&self, train: TrainId) -> bool {
        self.reservation.is_some_and(|r| r.train != train)
    }

    /// Returns true if `train` may reserve this block.
    pub fn is_available_for(&self, train: TrainId) -> bool {
        self.enabled && !self.is_reserved_by_other(train)
    }

    /// Returns true for station blocks.
    pub fn is_station(&self) -> bool {
        self.category == BlockCategory::Station
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_feedbacks() -> Block {
        Block::new("s1").with_feedbacks(&[FeedbackId(1), FeedbackId(2), FeedbackId(3)])
    }

    #[test]
    fn new_block_is_free() {
        let block = Block::new("s1");
        assert_eq!(block.name.as_str(), "s1");
        assert!(block.enabled);
        assert!(block.reservation.is_none());
        assert_eq!(block.category, BlockCategory::Free);
    }

    #[test]
    fn travel_index_depends_on_direction() {
        let block = three_feedbacks();
        assert_eq!(block.travel_index(FeedbackId(1), BlockDirection::Next), Some(0));
        assert_eq!(block.travel_index(FeedbackId(1), BlockDirection::Previous), Some(2));
        assert_eq!(block.travel_index(FeedbackId(3), BlockDirection::Previous), Some(0));
        assert_eq!(block.travel_index(FeedbackId(9), BlockDirection::Next), None);
    }

    #[test]
    fn entry_feedback_per_direction() {
        let block = three_feedbacks();
        assert_eq!(block.entry_feedback(BlockDirection::Next), Some(FeedbackId(1)));
        assert_eq!(block.entry_feedback(BlockDirection::Previous), Some(FeedbackId(3)));
        assert_eq!(Block::new("empty").entry_feedback(BlockDirection::Next), None);
    }

    #[test]
    fn default_brake_and_stop_positions() {
        let block = three_feedbacks();
        assert_eq!(block.brake_position(BlockDirection::Next), 2);
        assert_eq!(block.stop_position(BlockDirection::Next), 3);

        let single = Block::new("x").with_feedbacks(&[FeedbackId(1)]);
        assert_eq!(single.brake_position(BlockDirection::Next), 1);
        assert_eq!(single.stop_position(BlockDirection::Next), 1);

        let none = Block::new("y");
        assert_eq!(none.brake_position(BlockDirection::Next), 0);
        assert_eq!(none.stop_position(BlockDirection::Next), 0);
    }

    #[test]
    fn overridden_positions() {
        let block = three_feedbacks()
            .with_brake_feedback(BlockDirection::Next, FeedbackId(1))
            .with_stop_feedback(BlockDirection::Next, FeedbackId(2));
        assert_eq!(block.brake_position(BlockDirection::Next), 1);
        assert_eq!(block.stop_position(BlockDirection::Next), 2);
        // The other direction keeps the defaults
        assert_eq!(block.stop_position(BlockDirection::Previous), 3);
    }

    #[test]
    fn availability() {
        let mut block = Block::new("s1");
        assert!(block.is_available_for(TrainId(1)));

        block.reservation = Some(BlockReservation {
            train: TrainId(2),
            direction: BlockDirection::Next,
        });
        assert!(!block.is_available_for(TrainId(1)));
        assert!(block.is_available_for(TrainId(2)));

        let disabled = Block::new("d").with_enabled(false);
        assert!(!disabled.is_available_for(TrainId(1)));
    }
}
