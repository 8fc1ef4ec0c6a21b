//! Feedback sensors.

use crate::config::{short_string, Name};

use super::FeedbackId;

/// A track sensor, typically a reed contact.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feedback {
    /// Identity, assigned by the layout.
    pub id: FeedbackId,
    /// Display name.
    pub name: Name,
    /// Last reading from the hardware layer.
    pub detected: bool,
}

impl Feedback {
    /// Create an undetected feedback.
    pub fn new(name: &str) -> Self {
        Self {
            id: FeedbackId(0),
            name: short_string(name),
            detected: false,
        }
    }
}
