//! Image references: the Presentation State Relationship module and the
//! Referenced Image Sequence items used by per-image modules

use crate::dicom::tags::{
    REFERENCED_FRAME_NUMBER, REFERENCED_IMAGE_SEQUENCE, REFERENCED_SERIES_SEQUENCE,
    REFERENCED_SOP_CLASS_UID, REFERENCED_SOP_INSTANCE_UID, SERIES_INSTANCE_UID,
};
use crate::dicom::{get_items, get_multi_int_value, get_non_empty_string, put_multi_is, put_sequence, put_str};
use crate::image::PresentationImage;
use dicom_core::VR;
use dicom_object::InMemDicomObject;
use std::collections::HashMap;

/// One Referenced Image Sequence item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    /// Referenced frames; empty references every frame
    pub frame_numbers: Vec<u32>,
}

impl ImageReference {
    /// Reference to the frame an image presents
    ///
    /// Frame numbers are only recorded for multi-frame images.
    pub fn to_image(image: &PresentationImage) -> Self {
        Self {
            sop_class_uid: image.sop().sop_class_uid.clone(),
            sop_instance_uid: image.sop_instance_uid().to_string(),
            frame_numbers: if image.is_multi_frame() {
                vec![image.frame_number()]
            } else {
                Vec::new()
            },
        }
    }

    pub fn read(item: &InMemDicomObject) -> Option<Self> {
        Some(Self {
            sop_class_uid: get_non_empty_string(item, REFERENCED_SOP_CLASS_UID).unwrap_or_default(),
            sop_instance_uid: get_non_empty_string(item, REFERENCED_SOP_INSTANCE_UID)?,
            frame_numbers: get_multi_int_value(item, REFERENCED_FRAME_NUMBER)
                .unwrap_or_default()
                .into_iter()
                .filter(|&n| n > 0)
                .map(|n| n as u32)
                .collect(),
        })
    }

    pub fn to_item(&self) -> InMemDicomObject {
        let mut item = InMemDicomObject::new_empty();
        put_str(&mut item, REFERENCED_SOP_CLASS_UID, VR::UI, &self.sop_class_uid);
        put_str(&mut item, REFERENCED_SOP_INSTANCE_UID, VR::UI, &self.sop_instance_uid);
        if !self.frame_numbers.is_empty() {
            let frames: Vec<i32> = self.frame_numbers.iter().map(|&n| n as i32).collect();
            put_multi_is(&mut item, REFERENCED_FRAME_NUMBER, &frames);
        }
        item
    }

    /// Returns whether this reference covers a frame of an instance
    pub fn references_frame(&self, sop_instance_uid: &str, frame_number: u32) -> bool {
        self.sop_instance_uid == sop_instance_uid
            && (self.frame_numbers.is_empty() || self.frame_numbers.contains(&frame_number))
    }
}

/// Writes a Referenced Image Sequence holding one image reference
pub fn put_image_reference(item: &mut InMemDicomObject, image: &PresentationImage) {
    put_sequence(
        item,
        REFERENCED_IMAGE_SEQUENCE,
        vec![ImageReference::to_image(image).to_item()],
    );
}

/// Returns whether the Referenced Image Sequence of an item applies to an
/// image
///
/// An item without references applies to every image of the state.
pub fn item_references_image(item: &InMemDicomObject, image: &PresentationImage) -> bool {
    match get_items(item, REFERENCED_IMAGE_SEQUENCE) {
        None | Some([]) => true,
        Some(refs) => refs
            .iter()
            .filter_map(ImageReference::read)
            .any(|r| r.references_frame(image.sop_instance_uid(), image.frame_number())),
    }
}

/// Images referenced by a presentation state, keyed by series
#[derive(Debug, Clone, Default)]
pub struct SeriesReferences {
    series: Vec<(String, Vec<ImageReference>)>,
}

impl SeriesReferences {
    /// Groups images by series, keeping first-seen order
    pub fn from_images<'a>(images: impl IntoIterator<Item = &'a PresentationImage>) -> Self {
        let mut refs = Self::default();
        for image in images {
            let reference = ImageReference::to_image(image);
            match refs
                .series
                .iter_mut()
                .find(|(uid, _)| uid == image.series_instance_uid())
            {
                Some((_, list)) => merge_reference(list, reference),
                None => refs
                    .series
                    .push((image.series_instance_uid().to_string(), vec![reference])),
            }
        }
        refs
    }

    /// Reads the Referenced Series Sequence of a presentation state
    pub fn read(dcm: &InMemDicomObject) -> Self {
        let mut by_series: HashMap<String, usize> = HashMap::new();
        let mut refs = Self::default();
        for item in get_items(dcm, REFERENCED_SERIES_SEQUENCE).unwrap_or_default() {
            let Some(uid) = get_non_empty_string(item, SERIES_INSTANCE_UID) else {
                continue;
            };
            let images: Vec<ImageReference> = get_items(item, REFERENCED_IMAGE_SEQUENCE)
                .unwrap_or_default()
                .iter()
                .filter_map(ImageReference::read)
                .collect();
            match by_series.get(&uid) {
                Some(&i) => refs.series[i].1.extend(images),
                None => {
                    by_series.insert(uid.clone(), refs.series.len());
                    refs.series.push((uid, images));
                }
            }
        }
        refs
    }

    pub fn write(&self, dcm: &mut InMemDicomObject) {
        let items = self
            .series
            .iter()
            .map(|(uid, images)| {
                let mut item = InMemDicomObject::new_empty();
                put_str(&mut item, SERIES_INSTANCE_UID, VR::UI, uid);
                put_sequence(
                    &mut item,
                    REFERENCED_IMAGE_SEQUENCE,
                    images.iter().map(ImageReference::to_item).collect(),
                );
                item
            })
            .collect();
        put_sequence(dcm, REFERENCED_SERIES_SEQUENCE, items);
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn image_count(&self) -> usize {
        self.series.iter().map(|(_, images)| images.len()).sum()
    }

    /// Returns whether a frame of an instance in a series is referenced
    pub fn references_frame(&self, series_uid: &str, sop_instance_uid: &str, frame_number: u32) -> bool {
        self.series
            .iter()
            .filter(|(uid, _)| uid == series_uid)
            .flat_map(|(_, images)| images)
            .any(|r| r.references_frame(sop_instance_uid, frame_number))
    }

    pub fn references_image(&self, image: &PresentationImage) -> bool {
        self.references_frame(
            image.series_instance_uid(),
            image.sop_instance_uid(),
            image.frame_number(),
        )
    }
}

/// Folds frames of one instance into a single reference
fn merge_reference(list: &mut Vec<ImageReference>, reference: ImageReference) {
    match list
        .iter_mut()
        .find(|r| r.sop_instance_uid == reference.sop_instance_uid)
    {
        Some(existing) if !existing.frame_numbers.is_empty() => {
            for frame in reference.frame_numbers {
                if !existing.frame_numbers.contains(&frame) {
                    existing.frame_numbers.push(frame);
                }
            }
        }
        Some(_) => {}
        None => list.push(reference),
    }
}
