//! Outcome of serializing or applying a presentation state

use log::warn;

/// What a serialization wrote and what it had to leave out
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SerializationReport {
    /// Images referenced by the state
    pub images: usize,
    pub layers: usize,
    pub annotations: usize,
    /// Overlay groups carrying overlay data in the state
    pub overlays_written: usize,
    /// Visible overlays that found no free overlay group
    pub overlays_dropped: usize,
    pub warnings: Vec<String>,
}

impl SerializationReport {
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// What applying a presentation state to images did
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct DeserializationReport {
    /// Images the state referenced and was applied to
    pub images: usize,
    /// Images passed in that the state does not reference
    pub skipped_images: usize,
    pub warnings: Vec<String>,
}

impl DeserializationReport {
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }
}
