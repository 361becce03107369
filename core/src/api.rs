use crate::dicom::tags::{
    DISPLAYED_AREA_SELECTION_SEQUENCE, GRAPHIC_ANNOTATION_SEQUENCE, GRAPHIC_LAYER,
    GRAPHIC_LAYER_SEQUENCE, MAX_OVERLAY_GROUPS, PRESENTATION_LUT_SHAPE, SHUTTER_SHAPE,
};
use crate::dicom::{get_items, get_multi_string_value, get_non_empty_string, get_string_value};
use crate::error::{PresentationStateError, Result};
use crate::image::PresentationImage;
use crate::overlay::OverlayPlaneAttributes;
use crate::state::{SeriesReferences, SerializationReport, SoftcopyPresentationState};
use crate::types::{
    PhotometricInterpretation, PresentationStateSopClass, SerializationOptions, ShutterShape,
};
use chrono::NaiveDateTime;
use dicom_object::InMemDicomObject;
use log::info;
use std::path::Path;

/// Entry point for creating and loading softcopy presentation states
///
/// # Example
///
/// ```
/// use softcopy_core::{PresentationImage, PresentationStateFactory};
/// use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
/// use dicom_object::InMemDicomObject;
///
/// let mut dcm = InMemDicomObject::new_empty();
/// for (tag, value) in [
///     (Tag(0x0008, 0x0016), "1.2.840.10008.5.1.4.1.1.1.2"), // SOP Class UID
///     (Tag(0x0008, 0x0018), "1.2.3.4.5"),                   // SOP Instance UID
///     (Tag(0x0020, 0x000D), "1.2.3"),                       // Study Instance UID
///     (Tag(0x0020, 0x000E), "1.2.3.4"),                     // Series Instance UID
/// ] {
///     dcm.put(DataElement::new(tag, VR::UI, PrimitiveValue::from(value)));
/// }
/// dcm.put(DataElement::new(Tag(0x0028, 0x0010), VR::US, PrimitiveValue::from(64_u16)));
/// dcm.put(DataElement::new(Tag(0x0028, 0x0011), VR::US, PrimitiveValue::from(64_u16)));
///
/// let image = PresentationImage::from_dicom(dcm, 1).unwrap();
/// let state = PresentationStateFactory::create(&image).unwrap();
///
/// assert!(state.is_sealed());
/// assert_eq!(state.sop_class().simple_name(), "grayscale");
/// ```
pub struct PresentationStateFactory;

impl PresentationStateFactory {
    /// Creates and serializes a presentation state for one image
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedImage` if the image cannot carry a presentation
    /// state, or any error raised while serializing.
    pub fn create(image: &PresentationImage) -> Result<SoftcopyPresentationState> {
        Self::create_with_options(image, SerializationOptions::default())
    }

    pub fn create_with_options(
        image: &PresentationImage,
        options: SerializationOptions,
    ) -> Result<SoftcopyPresentationState> {
        Self::check_supported(image)?;
        let mut state = SoftcopyPresentationState::for_image(image, options);
        state.serialize(std::slice::from_ref(image))?;
        Ok(state)
    }

    /// Creates the fewest presentation states covering all images
    ///
    /// Grayscale and color images cannot share a state, so at most two are
    /// created, grayscale first.
    pub fn create_batch(images: &[PresentationImage]) -> Result<Vec<CreatedState>> {
        Self::create_batch_with_options(images, SerializationOptions::default())
    }

    pub fn create_batch_with_options(
        images: &[PresentationImage],
        options: SerializationOptions,
    ) -> Result<Vec<CreatedState>> {
        for image in images {
            Self::check_supported(image)?;
        }

        let mut created = Vec::new();
        for sop_class in [PresentationStateSopClass::Grayscale, PresentationStateSopClass::Color] {
            let image_indices: Vec<usize> = images
                .iter()
                .enumerate()
                .filter(|(_, image)| image.presentation_state_sop_class() == sop_class)
                .map(|(i, _)| i)
                .collect();
            if image_indices.is_empty() {
                continue;
            }

            let selected: Vec<PresentationImage> =
                image_indices.iter().map(|&i| images[i].clone()).collect();
            let mut state = SoftcopyPresentationState::with_options(sop_class, options.clone());
            let report = state.serialize(&selected)?;
            created.push(CreatedState {
                state,
                image_indices,
                report,
            });
        }

        info!(
            "Created {} presentation states for {} images",
            created.len(),
            images.len()
        );
        Ok(created)
    }

    /// Wraps an existing presentation state data set for deserialization
    pub fn load(dcm: InMemDicomObject) -> Result<SoftcopyPresentationState> {
        SoftcopyPresentationState::from_dataset(dcm)
    }

    /// Reads a presentation state from a Part 10 file
    pub fn load_file(path: impl AsRef<Path>) -> Result<SoftcopyPresentationState> {
        SoftcopyPresentationState::open(path)
    }

    /// Checks whether an image can carry a softcopy presentation state
    pub fn is_supported(image: &PresentationImage) -> bool {
        image.photometric_interpretation() != PhotometricInterpretation::Unknown
    }

    fn check_supported(image: &PresentationImage) -> Result<()> {
        if Self::is_supported(image) {
            Ok(())
        } else {
            Err(PresentationStateError::UnsupportedImage(format!(
                "{} has an unrecognized photometric interpretation",
                image.sop_instance_uid()
            )))
        }
    }
}

/// One state of a batch together with the images it was serialized over
#[derive(Debug)]
pub struct CreatedState {
    pub state: SoftcopyPresentationState,
    /// Positions of the covered images in the input slice
    pub image_indices: Vec<usize>,
    pub report: SerializationReport,
}

/// What a presentation state data set contains
///
/// Built from a loaded or serialized state for reporting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PresentationStateSummary {
    pub sop_class: PresentationStateSopClass,
    pub sop_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub content_label: String,
    pub content_description: Option<String>,
    pub content_creator: Option<String>,
    #[cfg_attr(feature = "json", serde(serialize_with = "serialize_datetime"))]
    pub creation: Option<NaiveDateTime>,

    /// Referenced series and images
    pub referenced_series: usize,
    pub referenced_images: usize,

    pub displayed_areas: usize,
    /// Graphic layer ids in stored order
    pub layers: Vec<String>,
    pub annotations: usize,
    /// Overlay group indices carrying overlay data
    pub overlay_groups: Vec<u8>,
    /// Shutter shape code values
    pub shutter_shapes: Vec<String>,
    pub presentation_lut_shape: Option<String>,
}

impl PresentationStateSummary {
    /// Summarizes the data set of a state
    ///
    /// # Errors
    ///
    /// Returns `NotSerialized` if the state has no data set yet.
    pub fn from_state(state: &SoftcopyPresentationState) -> Result<Self> {
        let dcm = state.dataset()?;
        let references = SeriesReferences::read(dcm);
        let count = |tag| get_items(dcm, tag).map_or(0, <[InMemDicomObject]>::len);
        let shapes = get_multi_string_value(dcm, SHUTTER_SHAPE).unwrap_or_default();

        Ok(Self {
            sop_class: state.sop_class(),
            sop_instance_uid: state.sop_instance_uid().map(str::to_string),
            series_instance_uid: state.series_instance_uid().map(str::to_string),
            content_label: state.content_label().to_string(),
            content_description: state.options().content_description.clone(),
            content_creator: state.options().content_creator.clone(),
            creation: state.creation_datetime(),
            referenced_series: references.series_count(),
            referenced_images: references.image_count(),
            displayed_areas: count(DISPLAYED_AREA_SELECTION_SEQUENCE),
            layers: get_items(dcm, GRAPHIC_LAYER_SEQUENCE)
                .unwrap_or_default()
                .iter()
                .filter_map(|item| get_non_empty_string(item, GRAPHIC_LAYER))
                .collect(),
            annotations: count(GRAPHIC_ANNOTATION_SEQUENCE),
            overlay_groups: (0..MAX_OVERLAY_GROUPS)
                .filter(|&n| OverlayPlaneAttributes::is_present(dcm, n))
                .collect(),
            shutter_shapes: ShutterShape::from_codes(&shapes).codes(),
            presentation_lut_shape: get_string_value(dcm, PRESENTATION_LUT_SHAPE)
                .filter(|s| !s.is_empty()),
        })
    }

    pub fn has_shutter(&self) -> bool {
        !self.shutter_shapes.is_empty()
    }
}

#[cfg(feature = "json")]
fn serialize_datetime<S: serde::Serializer>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::put_str;
    use crate::dicom::put_us;
    use crate::dicom::tags::{
        COLUMNS, PHOTOMETRIC_INTERPRETATION, ROWS, SERIES_INSTANCE_UID, SOP_CLASS_UID,
        SOP_INSTANCE_UID, STUDY_INSTANCE_UID,
    };
    use crate::types::Rect;
    use crate::graphics::GeometricShuttersGraphic;
    use crate::graphics::{GeometricShutter, ShutterRef};
    use dicom_core::VR;
    use rstest::rstest;

    fn image(sop: &str, photometric: &str) -> PresentationImage {
        let mut dcm = InMemDicomObject::new_empty();
        put_str(&mut dcm, SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.7");
        put_str(&mut dcm, SOP_INSTANCE_UID, VR::UI, sop);
        put_str(&mut dcm, SERIES_INSTANCE_UID, VR::UI, "1.2.3.1");
        put_str(&mut dcm, STUDY_INSTANCE_UID, VR::UI, "1.2.3");
        put_us(&mut dcm, ROWS, &[32]);
        put_us(&mut dcm, COLUMNS, &[32]);
        put_str(&mut dcm, PHOTOMETRIC_INTERPRETATION, VR::CS, photometric);
        PresentationImage::from_dicom(dcm, 1).unwrap()
    }

    #[rstest]
    #[case("MONOCHROME1", true)]
    #[case("MONOCHROME2", true)]
    #[case("RGB", true)]
    #[case("YBR_FULL_422", true)]
    #[case("HSV", false)]
    fn test_is_supported(#[case] photometric: &str, #[case] expected: bool) {
        assert_eq!(
            PresentationStateFactory::is_supported(&image("1.1", photometric)),
            expected
        );
    }

    #[test]
    fn test_create_matches_image_class() {
        let state = PresentationStateFactory::create(&image("1.1", "RGB")).unwrap();
        assert_eq!(state.sop_class(), PresentationStateSopClass::Color);
        assert!(state.is_sealed());

        let err = PresentationStateFactory::create(&image("1.2", "HSV")).unwrap_err();
        assert!(matches!(err, PresentationStateError::UnsupportedImage(_)));
    }

    #[test]
    fn test_create_batch_splits_by_class() {
        let images = vec![
            image("1.1", "MONOCHROME2"),
            image("1.2", "RGB"),
            image("1.3", "MONOCHROME1"),
        ];
        let created = PresentationStateFactory::create_batch(&images).unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].state.sop_class(), PresentationStateSopClass::Grayscale);
        assert_eq!(created[0].image_indices, vec![0, 2]);
        assert_eq!(created[0].report.images, 2);
        assert_eq!(created[1].state.sop_class(), PresentationStateSopClass::Color);
        assert_eq!(created[1].image_indices, vec![1]);
    }

    #[test]
    fn test_create_batch_single_class() {
        let images = vec![image("1.1", "MONOCHROME2"), image("1.2", "MONOCHROME2")];
        let created = PresentationStateFactory::create_batch(&images).unwrap();
        assert_eq!(created.len(), 1);
        assert!(PresentationStateFactory::create_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_summary() {
        let mut img = image("1.1", "MONOCHROME2");
        let shutter = GeometricShuttersGraphic::new(32, 32);
        let index = img.graphics.add_geometric_shutter(shutter);
        img.graphics
            .geometric_shutter_mut(index)
            .unwrap()
            .add_custom_shutter(GeometricShutter::Rectangular(Rect::new(2, 2, 20, 20)));
        img.graphics
            .activate_shutter(Some(ShutterRef::Geometric(index)))
            .unwrap();

        let options = SerializationOptions::default().with_content_label("REVIEW");
        let state = PresentationStateFactory::create_with_options(&img, options).unwrap();
        let summary = PresentationStateSummary::from_state(&state).unwrap();

        assert_eq!(summary.content_label, "REVIEW");
        assert_eq!(summary.referenced_series, 1);
        assert_eq!(summary.referenced_images, 1);
        assert_eq!(summary.displayed_areas, 1);
        assert_eq!(summary.shutter_shapes, vec!["RECTANGULAR".to_string()]);
        assert!(summary.has_shutter());
        assert_eq!(summary.presentation_lut_shape.as_deref(), Some("IDENTITY"));
        assert!(summary.overlay_groups.is_empty());
    }

    #[test]
    fn test_summary_requires_data_set() {
        let state = SoftcopyPresentationState::new(PresentationStateSopClass::Grayscale);
        assert!(matches!(
            PresentationStateSummary::from_state(&state),
            Err(PresentationStateError::NotSerialized)
        ));
    }
}
