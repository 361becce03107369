//! Overlay planes: bit packing, Overlay Plane module attributes and the
//! overlay graphic shown over an image

pub mod codec;
pub mod graphic;
pub mod plane_module;

pub use graphic::{decode_overlay_planes, DecodedOverlays, OverlayPlaneGraphic, SubstitutionRule};
pub use plane_module::{EmbeddedPixelData, OverlayFrame, OverlayPlaneAttributes, RoiStatistics};
