//! Graphics composition: layers, shutters, annotations and the per-image
//! graphics plane

pub mod annotation;
pub mod layers;
pub mod plane;
pub mod shutters;

pub use annotation::{AnnotationContent, Graphic, GraphicObject, TextObject};
pub use layers::{format_layer_id, Layer, LayerCollection, INACTIVE_LAYER_ID};
pub use plane::{
    ErrorMarker, GraphicsPlane, OverlayHandle, OverlayPool, OverlayRole, PlaneId, ShutterRef,
};
pub use shutters::{DisplayShutter, GeometricShutter, GeometricShuttersGraphic};
