//! Core value types for presentation states
//!
//! - [`PhotometricInterpretation`], [`PresentationStateSopClass`] and the DICOM
//!   code-string enums used by the overlay, shutter and annotation modules
//! - [`PointF`], [`Rect`], [`RectF`] and friends: plain geometry values
//! - [`PixelSpacing`] / [`PixelAspectRatio`]: calibration values
//! - [`SerializationOptions`]: configuration for creating presentation states

mod enums;
mod geometry;
mod options;
mod pixel_spacing;

pub use enums::{
    AnnotationUnits, GraphicType, OverlayPlaneSource, OverlaySubtype, OverlayType,
    PhotometricInterpretation, PresentationLutShape, PresentationSizeMode,
    PresentationStateSopClass, ShutterShape,
};
pub use geometry::{CieLab, Point, PointF, Rect, RectF, Rgb, SizeF};
pub use options::{DisplayAreaSerializationOption, Institution, SerializationOptions};
pub use pixel_spacing::{PixelAspectRatio, PixelSpacing};
