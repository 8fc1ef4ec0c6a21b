//! Transitions: fixed links between two sockets.

use super::{SocketRef, TransitionId};

/// An edge between two sockets. Purely structural.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    /// Identity, assigned by the layout.
    pub id: TransitionId,
    /// One end.
    pub a: SocketRef,
    /// Other end.
    pub b: SocketRef,
}

impl Transition {
    /// The end opposite `socket`, if `socket` is one of the two ends.
    pub fn other_end(&self, socket: SocketRef) -> Option<SocketRef> {
        if self.a == socket {
            Some(self.b)
        } else if self.b == socket {
            Some(self.a)
        } else {
            None
        }
    }
}
