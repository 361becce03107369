//! The image side of a presentation: identity, view geometry, lookup tables
//! and the graphics plane

mod presentation_image;

pub use presentation_image::{
    read_modality_lut, read_voi_lut, ImageSop, ModalityLut, PresentationImage, VoiLut,
    DEFAULT_OVERLAY_LAYER,
};
