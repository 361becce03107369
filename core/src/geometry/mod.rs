//! Geometry helpers: pixel-address rectangles, rotation/flip encoding,
//! spatial transform and displayed-area fitting

pub mod displayed_area;
pub mod pixel_address;
pub mod spatial;

pub use displayed_area::{
    displayed_rect, fit_displayed_area, visible_area, DisplayedAreaFit, VisibleArea,
};
pub use pixel_address::{
    from_pixel_address_corners, to_pixel_address_corners, to_pixel_address_rectangle,
};
pub use spatial::{
    decode_orientation, encode_orientation, normalize_rotation, DicomOrientation,
    SpatialTransform, ROTATION_FLIP_TABLE,
};
