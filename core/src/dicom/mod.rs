//! DICOM attribute access: tag constants and lenient get/put helpers

pub mod attributes;
pub mod tags;

pub use attributes::*;
