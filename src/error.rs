//! Error types for layout lookups and routing.
//!
//! Structural lookup failures (`*NotFound`) mean the layout graph is
//! inconsistent. They abort the operation in progress, and the controller
//! stops the affected train. [`LayoutError::NoPathFound`] is an expected
//! outcome: the train simply stays where it is.

use core::fmt;

use crate::layout::{BlockId, ElementId, FeedbackId, SocketId, TrainId, TurnoutId};

/// Errors raised by layout lookups, reservations and routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// No block with this id exists.
    BlockNotFound(BlockId),
    /// No turnout with this id exists.
    TurnoutNotFound(TurnoutId),
    /// No feedback with this id exists.
    FeedbackNotFound(FeedbackId),
    /// The element has no socket with this index, or the socket pair is not
    /// connectable through any turnout state.
    SocketNotFound {
        /// Element the socket was looked up on.
        element: ElementId,
        /// The missing socket.
        socket: SocketId,
    },
    /// No train with this id exists.
    TrainNotFound(TrainId),
    /// The train is not on the layout.
    TrainNotPlaced(TrainId),
    /// The router found no path for the train.
    NoPathFound {
        /// Train the path was requested for.
        train: TrainId,
        /// Requested destination block.
        destination: BlockId,
    },
    /// The block is already reserved by another train.
    BlockOccupied {
        /// The contested block.
        block: BlockId,
        /// Train holding the block.
        holder: TrainId,
    },
    /// The block is disabled and cannot hold a train.
    BlockDisabled(BlockId),
    /// The train's block is not part of the route it was given.
    NotOnRoute {
        /// The train.
        train: TrainId,
        /// Block the train occupies.
        block: BlockId,
    },
}

impl LayoutError {
    /// Returns true if the caller should keep the train stationary and retry
    /// later rather than treat the error as a fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoPathFound { .. })
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockNotFound(id) => write!(f, "block {id} not found"),
            Self::TurnoutNotFound(id) => write!(f, "turnout {id} not found"),
            Self::FeedbackNotFound(id) => write!(f, "feedback {id} not found"),
            Self::SocketNotFound { element, socket } => {
                write!(f, "socket {socket} not found on {element}")
            }
            Self::TrainNotFound(id) => write!(f, "train {id} not found"),
            Self::TrainNotPlaced(id) => write!(f, "train {id} is not on the layout"),
            Self::NoPathFound { train, destination } => {
                write!(f, "no path found for train {train} to block {destination}")
            }
            Self::BlockOccupied { block, holder } => {
                write!(f, "block {block} is reserved by train {holder}")
            }
            Self::BlockDisabled(id) => write!(f, "block {id} is disabled"),
            Self::NotOnRoute { train, block } => {
                write!(f, "train {train} is in block {block} which is not on its route")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Error returned by controller operations.
///
/// Wraps either a layout error or an error from the hardware interface that
/// received the resulting commands.
#[derive(Debug)]
pub enum ControlError<E> {
    /// The layout rejected the operation.
    Layout(LayoutError),
    /// The hardware interface failed to accept a command.
    Interface(E),
}

impl<E> From<LayoutError> for ControlError<E> {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl<E: fmt::Debug> fmt::Display for ControlError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "{err}"),
            Self::Interface(err) => write!(f, "interface error: {err:?}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for ControlError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_no_path_is_recoverable() {
        let no_path = LayoutError::NoPathFound {
            train: TrainId(0),
            destination: BlockId(3),
        };
        assert!(no_path.is_recoverable());
        assert!(!LayoutError::BlockNotFound(BlockId(1)).is_recoverable());
        assert!(!LayoutError::TurnoutNotFound(TurnoutId(1)).is_recoverable());
    }

    #[test]
    fn display_names_the_element() {
        let err = LayoutError::BlockNotFound(BlockId(7));
        assert_eq!(err.to_string(), "block b7 not found");
        assert_eq!(LayoutError::BlockDisabled(BlockId(2)).to_string(), "block b2 is disabled");

        let err = LayoutError::SocketNotFound {
            element: ElementId::Turnout(TurnoutId(2)),
            socket: SocketId(5),
        };
        assert_eq!(err.to_string(), "socket 5 not found on turnout t2");
    }

    #[test]
    fn control_error_wraps_layout_error() {
        let err: ControlError<()> = LayoutError::FeedbackNotFound(FeedbackId(4)).into();
        assert!(matches!(
            err,
            ControlError::Layout(LayoutError::FeedbackNotFound(FeedbackId(4)))
        ));
    }
}
