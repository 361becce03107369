//! Softcopy presentation states: creating them from images, writing them as
//! DICOM data sets and applying them back

mod deserialize;
mod overlay_mapping;
mod presentation_state;
mod references;
mod report;
mod serialize;

pub use deserialize::ImageModuleReader;
pub use overlay_mapping::{OverlaySlotMap, SlotCandidate};
pub use presentation_state::{generate_uid, SoftcopyPresentationState, EXPLICIT_VR_LITTLE_ENDIAN};
pub use references::{item_references_image, put_image_reference, ImageReference, SeriesReferences};
pub use report::{DeserializationReport, SerializationReport};
pub use serialize::USER_ANNOTATIONS_LAYER;
