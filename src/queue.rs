//! FIFO queue of pending per-train work for the cascade.
//!
//! The controller pushes one item per affected train and drains the queue
//! breadth first until it is empty. Re-evaluation requests that are already
//! pending are coalesced, which is what lets the cascade reach a fixpoint
//! when many trains keep nudging each other.
//!
//! ```rust
//! use rs_trainz_layout::queue::CascadeQueue;
//! use rs_trainz_layout::events::TrainEvent;
//! use rs_trainz_layout::layout::TrainId;
//!
//! let mut queue = CascadeQueue::new();
//! assert!(queue.push(TrainId(1), TrainEvent::OthersReservationChanged));
//! // Already pending: coalesced
//! assert!(!queue.push(TrainId(1), TrainEvent::OthersReservationChanged));
//! assert!(queue.push(TrainId(2), TrainEvent::MovedToNextBlock));
//!
//! assert_eq!(queue.pop(), Some((TrainId(1), TrainEvent::OthersReservationChanged)));
//! assert_eq!(queue.len(), 1);
//! ```

use std::collections::VecDeque;

use crate::events::TrainEvent;
use crate::layout::TrainId;

/// Breadth-first work queue.
#[derive(Clone, Debug, Default)]
pub struct CascadeQueue {
    pending: VecDeque<(TrainId, TrainEvent)>,
}

impl CascadeQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    ///
    /// Returns false if the item is a re-evaluation that is already pending
    /// for the same train, in which case nothing is added.
    pub fn push(&mut self, train: TrainId, event: TrainEvent) -> bool {
        let coalesce = matches!(
            event,
            TrainEvent::OthersReservationChanged | TrainEvent::Evaluate
        );
        if coalesce && self.pending.contains(&(train, event)) {
            return false;
        }
        self.pending.push_back((train, event));
        true
    }

    /// Take the oldest item.
    pub fn pop(&mut self) -> Option<(TrainId, TrainEvent)> {
        self.pending.pop_front()
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending item.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FeedbackId;

    #[test]
    fn fifo_order() {
        let mut queue = CascadeQueue::new();
        queue.push(TrainId(0), TrainEvent::Feedback(FeedbackId(1)));
        queue.push(TrainId(1), TrainEvent::Evaluate);
        queue.push(TrainId(0), TrainEvent::MovedToNextBlock);

        assert_eq!(queue.pop(), Some((TrainId(0), TrainEvent::Feedback(FeedbackId(1)))));
        assert_eq!(queue.pop(), Some((TrainId(1), TrainEvent::Evaluate)));
        assert_eq!(queue.pop(), Some((TrainId(0), TrainEvent::MovedToNextBlock)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn only_reevaluations_coalesce() {
        let mut queue = CascadeQueue::new();
        assert!(queue.push(TrainId(0), TrainEvent::MovedInsideBlock));
        assert!(queue.push(TrainId(0), TrainEvent::MovedInsideBlock));
        assert!(queue.push(TrainId(0), TrainEvent::Evaluate));
        assert!(!queue.push(TrainId(0), TrainEvent::Evaluate));
        assert!(queue.push(TrainId(1), TrainEvent::Evaluate));
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn clear_empties() {
        let mut queue = CascadeQueue::new();
        queue.push(TrainId(0), TrainEvent::Stopped);
        queue.clear();
        assert!(queue.is_empty());
    }
}
