//! DICOM softcopy presentation states
//!
//! Captures how images are presented (shutters, bitmap overlays, graphic
//! layers and annotations, display geometry and lookup tables) into Grayscale
//! or Color Softcopy Presentation State data sets, and applies such data sets
//! back onto images.

pub mod api;
pub mod cli;
pub mod dicom;
pub mod error;
pub mod geometry;
pub mod graphics;
pub mod image;
pub mod overlay;
pub mod state;
pub mod types;

pub use api::{CreatedState, PresentationStateFactory, PresentationStateSummary};
pub use cli::report::TextReport;
pub use error::{PresentationStateError, Result};
pub use geometry::SpatialTransform;
pub use graphics::{GraphicsPlane, OverlayHandle, OverlayRole, ShutterRef};
pub use image::{PresentationImage, VoiLut};
pub use overlay::OverlayPlaneGraphic;
pub use state::{DeserializationReport, SerializationReport, SoftcopyPresentationState};
pub use types::*;
