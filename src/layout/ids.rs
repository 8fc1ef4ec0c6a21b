//! Stable identifiers for layout elements.
//!
//! Every element lives in an arena inside [`Layout`](super::Layout) and is
//! referred to by one of these copyable ids. Relations between elements are
//! always id lookups, never references.

use core::fmt;

macro_rules! element_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Arena index of this element.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

element_id!(
    /// Identifies a [`Block`](super::Block).
    BlockId,
    "b"
);
element_id!(
    /// Identifies a [`Turnout`](super::Turnout).
    TurnoutId,
    "t"
);
element_id!(
    /// Identifies a [`Feedback`](super::Feedback) sensor.
    FeedbackId,
    "f"
);
element_id!(
    /// Identifies a [`Transition`](super::Transition).
    TransitionId,
    "x"
);
element_id!(
    /// Identifies a [`Train`](super::Train).
    TrainId,
    "tr"
);

/// Index of a socket on a block or turnout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketId(pub u8);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A block or a turnout: the two element kinds a train can occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementId {
    /// A block.
    Block(BlockId),
    /// A turnout.
    Turnout(TurnoutId),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(id) => write!(f, "block {id}"),
            Self::Turnout(id) => write!(f, "turnout {id}"),
        }
    }
}

/// A socket on a specific element, the attachment point of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketRef {
    /// Element owning the socket.
    pub element: ElementId,
    /// Socket index on that element.
    pub socket: SocketId,
}

impl SocketRef {
    /// The `previous` socket of a block.
    pub const fn block_previous(block: BlockId) -> Self {
        Self {
            element: ElementId::Block(block),
            socket: super::Block::PREVIOUS,
        }
    }

    /// The `next` socket of a block.
    pub const fn block_next(block: BlockId) -> Self {
        Self {
            element: ElementId::Block(block),
            socket: super::Block::NEXT,
        }
    }

    /// A socket of a turnout.
    pub const fn turnout(turnout: TurnoutId, socket: u8) -> Self {
        Self {
            element: ElementId::Turnout(turnout),
            socket: SocketId(socket),
        }
    }
}

impl fmt::Display for SocketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element, self.socket)
    }
}
