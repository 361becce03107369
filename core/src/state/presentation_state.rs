//! The softcopy presentation state instance: identity, sealing and file I/O

use crate::dicom::tags::{
    CONTENT_CREATOR_NAME, CONTENT_DESCRIPTION, CONTENT_LABEL, DEVICE_SERIAL_NUMBER,
    INSTANCE_NUMBER, INSTITUTIONAL_DEPARTMENT_NAME, INSTITUTION_ADDRESS, INSTITUTION_NAME,
    MANUFACTURER, MANUFACTURER_MODEL_NAME, PRESENTATION_CREATION_DATE,
    PRESENTATION_CREATION_TIME, SERIES_INSTANCE_UID, SERIES_NUMBER, SOFTWARE_VERSIONS,
    SOP_CLASS_UID, SOP_INSTANCE_UID, SPECIFIC_CHARACTER_SET, STATION_NAME,
};
use crate::dicom::{get_int_value, get_multi_string_value, get_non_empty_string};
use crate::error::{PresentationStateError, Result};
use crate::graphics::format_layer_id;
use crate::image::PresentationImage;
use crate::state::references::SeriesReferences;
use crate::types::{
    DisplayAreaSerializationOption, Institution, PresentationStateSopClass, SerializationOptions,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::{open_file, InMemDicomObject};
use log::{debug, info};
use std::path::Path;
use uuid::Uuid;

/// Transfer syntax of written presentation state files
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// A Grayscale or Color Softcopy Presentation State
///
/// A new state collects identity and options, then [`serialize`] captures
/// the presentation of a set of images into a data set. A loaded state wraps
/// an existing data set and is [`deserialize`]d onto images. Either way the
/// state is sealed afterwards and its identity can no longer change.
///
/// [`serialize`]: SoftcopyPresentationState::serialize
/// [`deserialize`]: SoftcopyPresentationState::deserialize
#[derive(Debug, Clone)]
pub struct SoftcopyPresentationState {
    sop_class: PresentationStateSopClass,
    options: SerializationOptions,
    series_instance_uid: Option<String>,
    sop_instance_uid: Option<String>,
    creation: Option<NaiveDateTime>,
    pub(crate) dataset: Option<InMemDicomObject>,
    sealed: bool,
}

impl SoftcopyPresentationState {
    pub fn new(sop_class: PresentationStateSopClass) -> Self {
        Self::with_options(sop_class, SerializationOptions::default())
    }

    pub fn with_options(sop_class: PresentationStateSopClass, options: SerializationOptions) -> Self {
        Self {
            sop_class,
            options,
            series_instance_uid: None,
            sop_instance_uid: None,
            creation: None,
            dataset: None,
            sealed: false,
        }
    }

    /// New state of the class matching an image
    pub fn for_image(image: &PresentationImage, options: SerializationOptions) -> Self {
        Self::with_options(image.presentation_state_sop_class(), options)
    }

    /// Wraps an existing presentation state data set
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSopClass` unless the data set is a Grayscale or
    /// Color Softcopy Presentation State.
    pub fn from_dataset(dcm: InMemDicomObject) -> Result<Self> {
        let uid = get_non_empty_string(&dcm, SOP_CLASS_UID).unwrap_or_default();
        let sop_class = PresentationStateSopClass::from_uid(&uid)
            .ok_or_else(|| PresentationStateError::UnsupportedSopClass(uid.clone()))?;

        let state = Self {
            sop_class,
            options: read_options(&dcm),
            series_instance_uid: get_non_empty_string(&dcm, SERIES_INSTANCE_UID),
            sop_instance_uid: get_non_empty_string(&dcm, SOP_INSTANCE_UID),
            creation: read_creation(&dcm),
            dataset: Some(dcm),
            sealed: true,
        };
        info!(
            "Loaded {} presentation state {} ({})",
            state.sop_class.simple_name(),
            state.sop_instance_uid.as_deref().unwrap_or("<no uid>"),
            state.options.content_label
        );
        Ok(state)
    }

    /// Reads a presentation state from a Part 10 file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = open_file(path.as_ref())?;
        let source_ae_title = file
            .meta()
            .source_application_entity_title
            .as_ref()
            .map(|s| s.trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty());
        let mut state = Self::from_dataset(file.into_inner())?;
        state.options.source_ae_title = source_ae_title;
        Ok(state)
    }

    /// Writes the serialized data set as a Part 10 file in Explicit VR
    /// Little Endian
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let dcm = self.dataset()?;
        let sop_instance_uid = self
            .sop_instance_uid
            .clone()
            .ok_or(PresentationStateError::NotSerialized)?;

        let mut meta = FileMetaTableBuilder::new()
            .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(self.sop_class.uid())
            .media_storage_sop_instance_uid(sop_instance_uid)
            .implementation_version_name(concat!("SOFTCOPY_", env!("CARGO_PKG_VERSION")));
        if let Some(ae) = &self.options.source_ae_title {
            meta = meta.source_application_entity_title(ae.as_str());
        }

        let file = dcm
            .clone()
            .with_meta(meta)
            .map_err(|e| PresentationStateError::DicomError(e.to_string()))?;
        file.write_to_file(path.as_ref())
            .map_err(|e| PresentationStateError::DicomError(e.to_string()))?;
        info!("Wrote presentation state to {}", path.as_ref().display());
        Ok(())
    }

    pub fn sop_class(&self) -> PresentationStateSopClass {
        self.sop_class
    }

    pub fn options(&self) -> &SerializationOptions {
        &self.options
    }

    pub fn series_instance_uid(&self) -> Option<&str> {
        self.series_instance_uid.as_deref()
    }

    pub fn sop_instance_uid(&self) -> Option<&str> {
        self.sop_instance_uid.as_deref()
    }

    pub fn content_label(&self) -> &str {
        &self.options.content_label
    }

    /// Presentation creation date and time, once serialized or loaded
    pub fn creation_datetime(&self) -> Option<NaiveDateTime> {
        self.creation
    }

    /// Returns whether identity fields are frozen
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The presentation state attributes
    ///
    /// # Errors
    ///
    /// Returns `NotSerialized` for a new state that has not been serialized.
    pub fn dataset(&self) -> Result<&InMemDicomObject> {
        self.dataset
            .as_ref()
            .ok_or(PresentationStateError::NotSerialized)
    }

    pub fn into_dataset(self) -> Result<InMemDicomObject> {
        self.dataset.ok_or(PresentationStateError::NotSerialized)
    }

    fn ensure_unsealed(&self) -> Result<()> {
        if self.sealed {
            Err(PresentationStateError::Sealed)
        } else {
            Ok(())
        }
    }

    pub fn set_series_instance_uid(&mut self, uid: impl Into<String>) -> Result<()> {
        self.ensure_unsealed()?;
        self.series_instance_uid = Some(uid.into()).filter(|s: &String| !s.is_empty());
        Ok(())
    }

    pub fn set_sop_instance_uid(&mut self, uid: impl Into<String>) -> Result<()> {
        self.ensure_unsealed()?;
        self.sop_instance_uid = Some(uid.into()).filter(|s: &String| !s.is_empty());
        Ok(())
    }

    /// Sets the content label, normalised like a graphic layer id
    pub fn set_content_label(&mut self, label: &str) -> Result<()> {
        self.ensure_unsealed()?;
        let label = format_layer_id(label)?;
        self.options.content_label = if label.is_empty() {
            SerializationOptions::default().content_label
        } else {
            label
        };
        Ok(())
    }

    pub fn set_content_description(&mut self, description: Option<String>) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.content_description = description;
        Ok(())
    }

    pub fn set_content_creator(&mut self, creator: Option<String>) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.content_creator = creator;
        Ok(())
    }

    pub fn set_series_number(&mut self, number: Option<i32>) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.series_number = number;
        Ok(())
    }

    pub fn set_instance_number(&mut self, number: i32) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.instance_number = number;
        Ok(())
    }

    pub fn set_specific_character_set(&mut self, charset: impl Into<String>) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.specific_character_set = charset.into();
        Ok(())
    }

    pub fn set_institution(&mut self, institution: Option<Institution>) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.institution = institution;
        Ok(())
    }

    pub fn set_source_ae_title(&mut self, ae_title: Option<String>) -> Result<()> {
        self.ensure_unsealed()?;
        self.options.source_ae_title = ae_title;
        Ok(())
    }

    /// Replaces every option at once
    pub fn set_options(&mut self, options: SerializationOptions) -> Result<()> {
        self.ensure_unsealed()?;
        self.options = options;
        Ok(())
    }

    /// Size mode recorded by the next serialization; not part of identity
    pub fn set_display_area_mode(&mut self, mode: DisplayAreaSerializationOption) {
        self.options.display_area_mode = mode;
    }

    /// Generates missing UIDs, stamps the creation time and seals the state
    pub(crate) fn seal(&mut self) -> Result<(String, String)> {
        self.ensure_unsealed()?;
        let series = self
            .series_instance_uid
            .get_or_insert_with(generate_uid)
            .clone();
        let instance = self.sop_instance_uid.get_or_insert_with(generate_uid).clone();
        self.creation = Some(chrono::Local::now().naive_local());
        self.sealed = true;
        debug!("Sealed presentation state {} in series {}", instance, series);
        Ok((series, instance))
    }

    /// Removes what this state applied from the images it references
    ///
    /// Each referenced image goes back to the presentation its own header
    /// describes.
    pub fn clear(&self, images: &mut [PresentationImage]) -> Result<usize> {
        let refs = SeriesReferences::read(self.dataset()?);
        let mut cleared = 0;
        for image in images.iter_mut().filter(|i| refs.references_image(i)) {
            image.reset_presentation()?;
            cleared += 1;
        }
        debug!("Cleared presentation state from {} images", cleared);
        Ok(cleared)
    }
}

/// UID under the 2.25 root derived from a random UUID
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

fn read_options(dcm: &InMemDicomObject) -> SerializationOptions {
    let defaults = SerializationOptions::default();
    let institution = Institution {
        name: get_non_empty_string(dcm, INSTITUTION_NAME).unwrap_or_default(),
        address: get_non_empty_string(dcm, INSTITUTION_ADDRESS).unwrap_or_default(),
        department_name: get_non_empty_string(dcm, INSTITUTIONAL_DEPARTMENT_NAME)
            .unwrap_or_default(),
    };
    SerializationOptions {
        display_area_mode: defaults.display_area_mode,
        specific_character_set: get_multi_string_value(dcm, SPECIFIC_CHARACTER_SET)
            .map(|v| v.join("\\"))
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.specific_character_set),
        content_label: get_non_empty_string(dcm, CONTENT_LABEL).unwrap_or(defaults.content_label),
        content_description: get_non_empty_string(dcm, CONTENT_DESCRIPTION),
        content_creator: get_non_empty_string(dcm, CONTENT_CREATOR_NAME),
        manufacturer: get_non_empty_string(dcm, MANUFACTURER),
        model_name: get_non_empty_string(dcm, MANUFACTURER_MODEL_NAME),
        software_versions: get_non_empty_string(dcm, SOFTWARE_VERSIONS),
        station_name: get_non_empty_string(dcm, STATION_NAME),
        device_serial_number: get_non_empty_string(dcm, DEVICE_SERIAL_NUMBER),
        institution: Some(institution).filter(|i| !i.is_empty()),
        source_ae_title: None,
        series_number: get_int_value(dcm, SERIES_NUMBER),
        instance_number: get_int_value(dcm, INSTANCE_NUMBER).unwrap_or(defaults.instance_number),
    }
}

fn read_creation(dcm: &InMemDicomObject) -> Option<NaiveDateTime> {
    let date = get_non_empty_string(dcm, PRESENTATION_CREATION_DATE)?;
    let date = NaiveDate::parse_from_str(&date, "%Y%m%d").ok()?;
    let time = get_non_empty_string(dcm, PRESENTATION_CREATION_TIME)
        .and_then(|t| NaiveTime::parse_from_str(t.get(..6).unwrap_or(&t), "%H%M%S").ok())
        .unwrap_or_default();
    Some(date.and_time(time))
}
