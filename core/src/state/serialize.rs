//! Capturing the presentation of images into presentation state attributes

use crate::dicom::tags::{
    self, overlay_group, overlay_tag, ACCESSION_NUMBER, CONTENT_CREATOR_NAME,
    CONTENT_DESCRIPTION, CONTENT_LABEL, DEVICE_SERIAL_NUMBER, DISPLAYED_AREA_BOTTOM_RIGHT_HAND_CORNER,
    DISPLAYED_AREA_SELECTION_SEQUENCE, DISPLAYED_AREA_TOP_LEFT_HAND_CORNER,
    GRAPHIC_ANNOTATION_SEQUENCE, GRAPHIC_LAYER, GRAPHIC_LAYER_DESCRIPTION, GRAPHIC_LAYER_ORDER,
    GRAPHIC_LAYER_RECOMMENDED_DISPLAY_CIELAB_VALUE,
    GRAPHIC_LAYER_RECOMMENDED_DISPLAY_GRAYSCALE_VALUE, GRAPHIC_LAYER_SEQUENCE,
    IMAGE_HORIZONTAL_FLIP, IMAGE_ROTATION, INSTANCE_CREATION_DATE, INSTANCE_CREATION_TIME,
    INSTANCE_NUMBER, INSTITUTIONAL_DEPARTMENT_NAME, INSTITUTION_ADDRESS, INSTITUTION_NAME,
    LUT_DATA, LUT_DESCRIPTOR, LUT_EXPLANATION, MANUFACTURER, MANUFACTURER_MODEL_NAME, MODALITY,
    PATIENT_BIRTH_DATE, PATIENT_ID, PATIENT_NAME, PATIENT_SEX, PRESENTATION_CREATION_DATE,
    PRESENTATION_CREATION_TIME, PRESENTATION_LUT_SHAPE, PRESENTATION_PIXEL_ASPECT_RATIO,
    PRESENTATION_PIXEL_MAGNIFICATION_RATIO, PRESENTATION_PIXEL_SPACING, PRESENTATION_SIZE_MODE,
    REFERRING_PHYSICIAN_NAME, RESCALE_INTERCEPT, RESCALE_SLOPE, RESCALE_TYPE, SERIES_DATE,
    SERIES_DESCRIPTION, SERIES_INSTANCE_UID, SERIES_NUMBER, SERIES_TIME,
    SHUTTER_OVERLAY_GROUP, SHUTTER_PRESENTATION_COLOR_CIELAB_VALUE, SHUTTER_PRESENTATION_VALUE,
    SHUTTER_SHAPE, SOFTCOPY_VOI_LUT_SEQUENCE, SOFTWARE_VERSIONS, SOP_CLASS_UID, SOP_INSTANCE_UID,
    SPECIFIC_CHARACTER_SET, STATION_NAME, STUDY_DATE, STUDY_DESCRIPTION, STUDY_ID,
    STUDY_INSTANCE_UID, STUDY_TIME, VOI_LUT_SEQUENCE, WINDOW_CENTER,
    WINDOW_CENTER_WIDTH_EXPLANATION, WINDOW_WIDTH,
};
use crate::dicom::{
    put_ds, put_empty, put_fl, put_is, put_multi_is, put_sequence, put_sl, put_str, put_strs,
    put_us, remove,
};
use crate::error::{PresentationStateError, Result};
use crate::geometry::visible_area;
use crate::graphics::{AnnotationContent, DisplayShutter, GeometricShutter, Graphic, OverlayHandle, OverlayRole};
use crate::image::{PresentationImage, VoiLut};
use crate::overlay::{OverlayPlaneAttributes, RoiStatistics};
use crate::state::overlay_mapping::{OverlaySlotMap, SlotCandidate};
use crate::state::presentation_state::SoftcopyPresentationState;
use crate::state::references::{put_image_reference, SeriesReferences};
use crate::state::report::SerializationReport;
use crate::types::{
    CieLab, DisplayAreaSerializationOption, PresentationLutShape, PresentationSizeMode,
    PresentationStateSopClass,
};
use chrono::NaiveDateTime;
use dicom_core::{Tag, VR};
use dicom_object::InMemDicomObject;
use log::{debug, info};

/// Layer holding annotations drawn directly on an image
pub const USER_ANNOTATIONS_LAYER: &str = "USER ANNOTATIONS";

const MODALITY_PR: &str = "PR";
const DEFAULT_RESCALE_TYPE: &str = "US";
const DEFAULT_WINDOW_EXPLANATION: &str = "USER DEFINED";

/// Patient and study attributes copied from the first image: tag, VR and
/// whether an empty value is written when the image lacks the attribute
const COPIED_ATTRIBUTES: [(Tag, VR, bool); 11] = [
    (PATIENT_NAME, VR::PN, true),
    (PATIENT_ID, VR::LO, true),
    (PATIENT_BIRTH_DATE, VR::DA, true),
    (PATIENT_SEX, VR::CS, true),
    (STUDY_INSTANCE_UID, VR::UI, true),
    (STUDY_DATE, VR::DA, true),
    (STUDY_TIME, VR::TM, true),
    (REFERRING_PHYSICIAN_NAME, VR::PN, true),
    (STUDY_ID, VR::SH, true),
    (ACCESSION_NUMBER, VR::SH, true),
    (STUDY_DESCRIPTION, VR::LO, false),
];

/// Key of a visible overlay: image position and the overlay's handle
type OverlayKey = (usize, OverlayHandle);

struct LayerRecord {
    id: String,
    description: String,
    grayscale: Option<u16>,
    cielab: Option<CieLab>,
}

impl SoftcopyPresentationState {
    /// Captures the current presentation of images into this state
    ///
    /// Images of the other presentation state SOP class are skipped with a
    /// warning. The state is sealed afterwards: UIDs are assigned when unset
    /// and identity setters fail from then on.
    ///
    /// # Errors
    ///
    /// Returns `Sealed` when the state was already serialized or loaded,
    /// `UnsupportedImage` when no image matches the SOP class,
    /// `MixedStudies` when images span several studies, and
    /// `InvalidGeometry` when an image shows none of its pixels.
    pub fn serialize(&mut self, images: &[PresentationImage]) -> Result<SerializationReport> {
        if self.is_sealed() {
            return Err(PresentationStateError::Sealed);
        }

        let mut report = SerializationReport::default();
        let sop_class = self.sop_class();
        let mut selected: Vec<&PresentationImage> = Vec::with_capacity(images.len());
        for image in images {
            if image.presentation_state_sop_class() == sop_class {
                selected.push(image);
            } else {
                report.warn(format!(
                    "Image {} cannot be captured by a {} presentation state; skipped",
                    image.sop_instance_uid(),
                    sop_class.simple_name()
                ));
            }
        }
        let Some(first) = selected.first().copied() else {
            return Err(PresentationStateError::UnsupportedImage(format!(
                "no image suited to a {} presentation state",
                sop_class.simple_name()
            )));
        };
        if selected
            .iter()
            .any(|i| i.study_instance_uid() != first.study_instance_uid())
        {
            return Err(PresentationStateError::MixedStudies);
        }

        let displayed_areas = selected
            .iter()
            .map(|image| displayed_area_item(image, self.options().display_area_mode, &mut report))
            .collect::<Result<Vec<_>>>()?;

        let (series_uid, instance_uid) = self.seal()?;
        let created = self.creation_datetime().unwrap_or_default();

        let mut dcm = InMemDicomObject::new_empty();
        copy_patient_and_study(&mut dcm, first.header());
        self.write_identity(&mut dcm, &series_uid, &instance_uid, created);
        self.write_equipment(&mut dcm);

        let references = SeriesReferences::from_images(selected.iter().copied());
        references.write(&mut dcm);
        report.images = references.image_count();

        let geometric_written = write_display_shutter(&mut dcm, &selected, &mut report);
        let bitmap_shutter = write_overlays(&mut dcm, &selected, &mut report)?;
        if let Some((n, value)) = bitmap_shutter {
            write_bitmap_shutter(&mut dcm, n, value, geometric_written, &mut report);
        }

        put_sequence(&mut dcm, DISPLAYED_AREA_SELECTION_SEQUENCE, displayed_areas);
        report.annotations = write_annotations(&mut dcm, &selected);
        write_spatial_transform(&mut dcm, first);
        report.layers = write_graphic_layers(&mut dcm, &selected);

        if sop_class == PresentationStateSopClass::Grayscale {
            write_modality_lut(&mut dcm, first);
            write_voi_luts(&mut dcm, &selected);
            write_presentation_lut(&mut dcm, &selected);
        }

        self.dataset = Some(dcm);
        info!(
            "Serialized {} presentation state {} over {} images ({} layers, {} annotations, {} overlays)",
            sop_class.simple_name(),
            instance_uid,
            report.images,
            report.layers,
            report.annotations,
            report.overlays_written
        );
        Ok(report)
    }

    fn write_identity(
        &self,
        dcm: &mut InMemDicomObject,
        series_uid: &str,
        instance_uid: &str,
        created: NaiveDateTime,
    ) {
        let options = self.options();
        let date = created.format("%Y%m%d").to_string();
        let time = created.format("%H%M%S").to_string();
        let charsets: Vec<String> = options
            .specific_character_set
            .split('\\')
            .map(str::to_string)
            .collect();

        put_strs(dcm, SPECIFIC_CHARACTER_SET, VR::CS, &charsets);
        put_str(dcm, SOP_CLASS_UID, VR::UI, self.sop_class().uid());
        put_str(dcm, SOP_INSTANCE_UID, VR::UI, instance_uid);
        put_str(dcm, INSTANCE_CREATION_DATE, VR::DA, &date);
        put_str(dcm, INSTANCE_CREATION_TIME, VR::TM, &time);

        put_str(dcm, MODALITY, VR::CS, MODALITY_PR);
        put_str(dcm, SERIES_INSTANCE_UID, VR::UI, series_uid);
        match options.series_number {
            Some(number) => put_is(dcm, SERIES_NUMBER, number),
            None => put_empty(dcm, SERIES_NUMBER, VR::IS),
        }
        put_str(dcm, SERIES_DATE, VR::DA, &date);
        put_str(dcm, SERIES_TIME, VR::TM, &time);
        put_str(dcm, SERIES_DESCRIPTION, VR::LO, &options.content_label);

        put_is(dcm, INSTANCE_NUMBER, options.instance_number);
        put_str(dcm, CONTENT_LABEL, VR::CS, &options.content_label);
        match &options.content_description {
            Some(description) => put_str(dcm, CONTENT_DESCRIPTION, VR::LO, description),
            None => put_empty(dcm, CONTENT_DESCRIPTION, VR::LO),
        }
        match &options.content_creator {
            Some(creator) => put_str(dcm, CONTENT_CREATOR_NAME, VR::PN, creator),
            None => put_empty(dcm, CONTENT_CREATOR_NAME, VR::PN),
        }
        put_str(dcm, PRESENTATION_CREATION_DATE, VR::DA, &date);
        put_str(dcm, PRESENTATION_CREATION_TIME, VR::TM, &time);
    }

    fn write_equipment(&self, dcm: &mut InMemDicomObject) {
        let options = self.options();
        match &options.manufacturer {
            Some(manufacturer) => put_str(dcm, MANUFACTURER, VR::LO, manufacturer),
            None => put_empty(dcm, MANUFACTURER, VR::LO),
        }
        let optional = [
            (MANUFACTURER_MODEL_NAME, VR::LO, &options.model_name),
            (SOFTWARE_VERSIONS, VR::LO, &options.software_versions),
            (STATION_NAME, VR::SH, &options.station_name),
            (DEVICE_SERIAL_NUMBER, VR::LO, &options.device_serial_number),
        ];
        for (tag, vr, value) in optional {
            if let Some(value) = value {
                put_str(dcm, tag, vr, value);
            }
        }
        if let Some(institution) = &options.institution {
            let fields = [
                (INSTITUTION_NAME, VR::LO, &institution.name),
                (INSTITUTION_ADDRESS, VR::ST, &institution.address),
                (INSTITUTIONAL_DEPARTMENT_NAME, VR::LO, &institution.department_name),
            ];
            for (tag, vr, value) in fields.into_iter().filter(|(_, _, v)| !v.is_empty()) {
                put_str(dcm, tag, vr, value);
            }
        }
    }
}

fn copy_patient_and_study(dcm: &mut InMemDicomObject, header: &InMemDicomObject) {
    for (tag, vr, required) in COPIED_ATTRIBUTES {
        match header.element(tag) {
            Ok(element) => {
                dcm.put(element.clone());
            }
            Err(_) if required => put_empty(dcm, tag, vr),
            Err(_) => {}
        }
    }
}

/// Builds the Displayed Area Selection item of one image
fn displayed_area_item(
    image: &PresentationImage,
    mode: DisplayAreaSerializationOption,
    report: &mut SerializationReport,
) -> Result<InMemDicomObject> {
    let area = visible_area(&image.spatial_transform)?;
    let mut item = InMemDicomObject::new_empty();
    put_image_reference(&mut item, image);
    put_sl(
        &mut item,
        DISPLAYED_AREA_TOP_LEFT_HAND_CORNER,
        &[area.top_left.x, area.top_left.y],
    );
    put_sl(
        &mut item,
        DISPLAYED_AREA_BOTTOM_RIGHT_HAND_CORNER,
        &[area.bottom_right.x, area.bottom_right.y],
    );

    let size_mode = match (mode, image.pixel_spacing()) {
        (DisplayAreaSerializationOption::Magnify, _) => PresentationSizeMode::Magnify,
        (DisplayAreaSerializationOption::TrueSize, Some(_)) => PresentationSizeMode::TrueSize,
        (DisplayAreaSerializationOption::TrueSize, None) => {
            report.warn(format!(
                "Image {} has no pixel spacing; displayed area recorded as scale to fit",
                image.sop_instance_uid()
            ));
            PresentationSizeMode::ScaleToFit
        }
        (DisplayAreaSerializationOption::ScaleToFit, _) => PresentationSizeMode::ScaleToFit,
    };
    put_str(&mut item, PRESENTATION_SIZE_MODE, VR::CS, size_mode.code());

    match (size_mode, image.pixel_spacing()) {
        (PresentationSizeMode::TrueSize, Some(spacing)) => {
            put_ds(&mut item, PRESENTATION_PIXEL_SPACING, &[spacing.row, spacing.col]);
        }
        _ => {
            put_multi_is(
                &mut item,
                PRESENTATION_PIXEL_ASPECT_RATIO,
                &image.pixel_aspect_ratio().to_integers(),
            );
        }
    }
    if size_mode == PresentationSizeMode::Magnify {
        put_fl(
            &mut item,
            PRESENTATION_PIXEL_MAGNIFICATION_RATIO,
            &[image.spatial_transform.effective_scale()],
        );
    }

    debug!(
        "Displayed area of {}: {:?} to {:?} ({})",
        image.sop_instance_uid(),
        area.top_left,
        area.bottom_right,
        size_mode.code()
    );
    Ok(item)
}

/// Writes the first shutter of each geometric kind found on the images
///
/// Returns whether a Display Shutter module was written.
fn write_display_shutter(
    dcm: &mut InMemDicomObject,
    images: &[&PresentationImage],
    report: &mut SerializationReport,
) -> bool {
    let mut shutter = DisplayShutter::default();
    let mut unserialized = 0;

    let active = images
        .iter()
        .filter_map(|image| image.graphics.active_geometric_shutter());
    for graphic in active {
        for s in graphic.all_shutters() {
            match s {
                GeometricShutter::Circular { center, radius } if shutter.circular.is_none() => {
                    shutter.circular = Some((*center, *radius));
                }
                GeometricShutter::Rectangular(rect) if shutter.rectangular.is_none() => {
                    shutter.rectangular = Some(*rect);
                }
                GeometricShutter::Polygonal(vertices) if shutter.polygonal.is_none() => {
                    shutter.polygonal = Some(vertices.clone());
                }
                _ => unserialized += 1,
            }
        }
    }

    if unserialized > 0 {
        report.warn(format!(
            "Only one shutter of each kind can be saved; {} shutters were left out",
            unserialized
        ));
    }
    shutter.presentation_value = Some(0);
    shutter.write(dcm);
    !shutter.is_empty()
}

/// Places visible overlays into overlay groups and writes the Overlay Plane
/// and Overlay Activation modules
///
/// Returns the group and presentation value of the bitmap shutter, if one
/// was placed.
fn write_overlays(
    dcm: &mut InMemDicomObject,
    images: &[&PresentationImage],
    report: &mut SerializationReport,
) -> Result<Option<(u8, u16)>> {
    let mut candidates: Vec<SlotCandidate<OverlayKey>> = Vec::new();
    let mut shutter_taken = false;
    for (i, image) in images.iter().enumerate() {
        let plane = &image.graphics;
        let shutter = plane.active_bitmap_shutter().filter(|_| !shutter_taken);
        shutter_taken |= shutter.is_some();
        for handle in shutter.into_iter().chain(plane.visible_layer_overlays()) {
            let graphic = plane.overlay(handle)?;
            candidates.push(SlotCandidate {
                key: (i, handle),
                source: graphic.source(),
                index: graphic.index(),
            });
        }
    }

    let map = OverlaySlotMap::assign(&candidates);
    let mut bitmap_shutter = None;

    for n in 0..tags::MAX_OVERLAY_GROUPS {
        let activation = overlay_tag(n, tags::OVERLAY_ACTIVATION_LAYER);
        let Some(candidate) = map.get(n) else {
            OverlayPlaneAttributes::delete(dcm, n);
            if images.iter().any(|i| i.graphics.image_overlay(n).is_some()) {
                // keeps a hidden header overlay hidden
                put_empty(dcm, activation, VR::CS);
            }
            continue;
        };

        let (i, handle) = candidate.key;
        let plane = &images[i].graphics;
        let graphic = plane.overlay(handle)?;
        if map.needs_encoding(n) {
            let mut attrs = graphic.to_attributes(n)?;
            attrs.roi = RoiStatistics::default();
            attrs.write(dcm);
            report.overlays_written += 1;
        } else {
            OverlayPlaneAttributes::delete(dcm, n);
        }

        match plane.role(handle)? {
            OverlayRole::Layer(id) => put_str(dcm, activation, VR::CS, id),
            OverlayRole::Shutter => {
                remove(dcm, activation);
                bitmap_shutter = Some((n, graphic.gray_presentation_value()));
            }
            OverlayRole::Unassigned => remove(dcm, activation),
        }
        debug!(
            "Overlay group {} holds {} overlay of image {}",
            n,
            candidate.source,
            images[i].sop_instance_uid()
        );
    }

    if !map.dropped().is_empty() {
        report.overlays_dropped = map.dropped().len();
        report.warn(format!(
            "More than {} visible overlays; {} overlays were not saved",
            tags::MAX_OVERLAY_GROUPS,
            map.dropped().len()
        ));
    }
    Ok(bitmap_shutter)
}

fn write_bitmap_shutter(
    dcm: &mut InMemDicomObject,
    n: u8,
    presentation_value: u16,
    replaces_geometric: bool,
    report: &mut SerializationReport,
) {
    if replaces_geometric {
        report.warn("A bitmap shutter and a geometric shutter cannot be saved together; geometric shutter dropped");
        DisplayShutter::delete(dcm);
    }
    put_strs(dcm, SHUTTER_SHAPE, VR::CS, &["BITMAP".to_string()]);
    put_us(dcm, SHUTTER_OVERLAY_GROUP, &[overlay_group(n)]);
    put_us(dcm, SHUTTER_PRESENTATION_VALUE, &[presentation_value]);
    remove(dcm, SHUTTER_PRESENTATION_COLOR_CIELAB_VALUE);
}

fn annotation_item(image: &PresentationImage, layer: &str, graphic: &Graphic) -> Option<InMemDicomObject> {
    let mut content = AnnotationContent::default();
    if !graphic.serialize(&mut content) || content.is_empty() {
        return None;
    }
    let mut item = InMemDicomObject::new_empty();
    put_image_reference(&mut item, image);
    put_str(&mut item, GRAPHIC_LAYER, VR::CS, layer);
    content.write(&mut item);
    Some(item)
}

/// Writes layer graphics and stand-alone annotations, one item per graphic
fn write_annotations(dcm: &mut InMemDicomObject, images: &[&PresentationImage]) -> usize {
    let mut items = Vec::new();
    for image in images {
        for layer in image.graphics.layers().iter().filter(|l| !l.is_inactive()) {
            items.extend(
                layer
                    .graphics
                    .iter()
                    .filter_map(|g| annotation_item(image, layer.id(), g)),
            );
        }
        items.extend(
            image
                .annotations
                .iter()
                .filter_map(|g| annotation_item(image, USER_ANNOTATIONS_LAYER, g)),
        );
    }

    let count = items.len();
    if count > 0 {
        put_sequence(dcm, GRAPHIC_ANNOTATION_SEQUENCE, items);
    }
    count
}

/// Rotation and flip of the first image stand for every image
fn write_spatial_transform(dcm: &mut InMemDicomObject, first: &PresentationImage) {
    let orientation = first.spatial_transform.dicom_orientation();
    put_us(dcm, IMAGE_ROTATION, &[orientation.rotation as u16]);
    put_str(
        dcm,
        IMAGE_HORIZONTAL_FLIP,
        VR::CS,
        if orientation.horizontal_flip { "Y" } else { "N" },
    );
}

/// Writes every active layer once, in first-seen order
fn write_graphic_layers(dcm: &mut InMemDicomObject, images: &[&PresentationImage]) -> usize {
    let mut records: Vec<LayerRecord> = Vec::new();
    for image in images {
        for layer in image.graphics.layers().iter().filter(|l| !l.is_inactive()) {
            if records.iter().all(|r| r.id != layer.id()) {
                records.push(LayerRecord {
                    id: layer.id().to_string(),
                    description: layer.description.clone(),
                    grayscale: layer.recommended_grayscale_value,
                    cielab: layer.recommended_cielab,
                });
            }
        }
        if !image.annotations.is_empty() && records.iter().all(|r| r.id != USER_ANNOTATIONS_LAYER) {
            records.push(LayerRecord {
                id: USER_ANNOTATIONS_LAYER.to_string(),
                description: String::new(),
                grayscale: None,
                cielab: None,
            });
        }
    }

    let items: Vec<InMemDicomObject> = records
        .iter()
        .zip(1..)
        .map(|(record, order)| {
            let mut item = InMemDicomObject::new_empty();
            put_str(&mut item, GRAPHIC_LAYER, VR::CS, &record.id);
            put_is(&mut item, GRAPHIC_LAYER_ORDER, order);
            if let Some(gray) = record.grayscale {
                put_us(&mut item, GRAPHIC_LAYER_RECOMMENDED_DISPLAY_GRAYSCALE_VALUE, &[gray]);
            }
            if let Some(lab) = record.cielab {
                put_us(
                    &mut item,
                    GRAPHIC_LAYER_RECOMMENDED_DISPLAY_CIELAB_VALUE,
                    &[lab.l, lab.a, lab.b],
                );
            }
            if !record.description.is_empty() {
                put_str(&mut item, GRAPHIC_LAYER_DESCRIPTION, VR::LO, &record.description);
            }
            item
        })
        .collect();

    let count = items.len();
    if count > 0 {
        put_sequence(dcm, GRAPHIC_LAYER_SEQUENCE, items);
    }
    count
}

fn write_modality_lut(dcm: &mut InMemDicomObject, first: &PresentationImage) {
    if let Some(lut) = &first.modality_lut {
        put_ds(dcm, RESCALE_INTERCEPT, &[lut.intercept]);
        put_ds(dcm, RESCALE_SLOPE, &[lut.slope]);
        put_str(
            dcm,
            RESCALE_TYPE,
            VR::LO,
            lut.rescale_type.as_deref().unwrap_or(DEFAULT_RESCALE_TYPE),
        );
    }
}

/// Writes one Softcopy VOI LUT item per image with an enabled lookup
fn write_voi_luts(dcm: &mut InMemDicomObject, images: &[&PresentationImage]) {
    let mut items = Vec::new();
    for image in images {
        let mut item = InMemDicomObject::new_empty();
        match &image.voi_lut {
            VoiLut::Linear {
                center,
                width,
                explanation,
            } => {
                put_ds(&mut item, WINDOW_CENTER, &[*center]);
                put_ds(&mut item, WINDOW_WIDTH, &[*width]);
                put_str(
                    &mut item,
                    WINDOW_CENTER_WIDTH_EXPLANATION,
                    VR::LO,
                    explanation.as_deref().unwrap_or(DEFAULT_WINDOW_EXPLANATION),
                );
            }
            VoiLut::Table {
                first_mapped_value,
                bits_per_entry,
                data,
                explanation,
            } => {
                // 65536 entries are written as 0
                let entries = if data.len() >= 65536 { 0 } else { data.len() as u16 };
                let mut lut = InMemDicomObject::new_empty();
                put_us(
                    &mut lut,
                    LUT_DESCRIPTOR,
                    &[entries, *first_mapped_value as u16, *bits_per_entry],
                );
                if let Some(explanation) = explanation {
                    put_str(&mut lut, LUT_EXPLANATION, VR::LO, explanation);
                }
                put_us(&mut lut, LUT_DATA, data);
                put_sequence(&mut item, VOI_LUT_SEQUENCE, vec![lut]);
            }
            VoiLut::Disabled => {
                debug!("Image {} has no VOI LUT to save", image.sop_instance_uid());
                continue;
            }
        }
        put_image_reference(&mut item, image);
        items.push(item);
    }

    if !items.is_empty() {
        put_sequence(dcm, SOFTCOPY_VOI_LUT_SEQUENCE, items);
    }
}

/// INVERSE only when every image is inverted
fn write_presentation_lut(dcm: &mut InMemDicomObject, images: &[&PresentationImage]) {
    let shape = if !images.is_empty() && images.iter().all(|i| i.invert) {
        PresentationLutShape::Inverse
    } else {
        PresentationLutShape::Identity
    };
    put_str(dcm, PRESENTATION_LUT_SHAPE, VR::CS, shape.code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::tags::{
        COLUMNS, OVERLAY_ACTIVATION_LAYER, PHOTOMETRIC_INTERPRETATION, REFERENCED_SERIES_SEQUENCE,
        ROWS,
    };
    use crate::dicom::{get_int_value, get_items, get_multi_int_value, get_non_empty_string, get_string_value, get_u16_value, has_element};
    use crate::graphics::{GeometricShuttersGraphic, ShutterRef};
    use crate::overlay::codec::encode_mask;
    use crate::overlay::OverlayPlaneGraphic;
    use crate::types::{PointF, Rect};

    fn header(sop: &str, study: &str, photometric: &str) -> InMemDicomObject {
        let mut dcm = InMemDicomObject::new_empty();
        put_str(&mut dcm, SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.1.2");
        put_str(&mut dcm, SOP_INSTANCE_UID, VR::UI, sop);
        put_str(&mut dcm, SERIES_INSTANCE_UID, VR::UI, "1.2.3.1");
        put_str(&mut dcm, STUDY_INSTANCE_UID, VR::UI, study);
        put_str(&mut dcm, PATIENT_NAME, VR::PN, "Doe^Jane");
        put_us(&mut dcm, ROWS, &[16]);
        put_us(&mut dcm, COLUMNS, &[16]);
        put_str(&mut dcm, PHOTOMETRIC_INTERPRETATION, VR::CS, photometric);
        dcm
    }

    fn image(sop: &str) -> PresentationImage {
        PresentationImage::from_dicom(header(sop, "1.2.3", "MONOCHROME2"), 1).unwrap()
    }

    fn with_header_overlay(sop: &str, n: u8) -> PresentationImage {
        let mut dcm = header(sop, "1.2.3", "MONOCHROME2");
        let mut mask = vec![0u8; 256];
        mask[0] = 255;
        let data = encode_mask(16, 16, false, &mask).unwrap();
        OverlayPlaneAttributes::new(n, 16, 16, data).write(&mut dcm);
        PresentationImage::from_dicom(dcm, 1).unwrap()
    }

    fn grayscale() -> SoftcopyPresentationState {
        SoftcopyPresentationState::new(PresentationStateSopClass::Grayscale)
    }

    #[test]
    fn test_serialize_writes_identity_and_references() {
        let mut state = grayscale();
        let report = state.serialize(&[image("1.1"), image("1.2")]).unwrap();
        assert_eq!(report.images, 2);
        assert!(state.is_sealed());

        let dcm = state.dataset().unwrap();
        assert_eq!(
            get_non_empty_string(dcm, SOP_CLASS_UID).as_deref(),
            Some(PresentationStateSopClass::GRAYSCALE_UID)
        );
        assert_eq!(get_non_empty_string(dcm, MODALITY).as_deref(), Some("PR"));
        assert_eq!(
            get_non_empty_string(dcm, CONTENT_LABEL).as_deref(),
            Some("FOR_PRESENTATION")
        );
        assert_eq!(get_non_empty_string(dcm, PATIENT_NAME).as_deref(), Some("Doe^Jane"));
        assert!(has_element(dcm, ACCESSION_NUMBER));
        assert!(!has_element(dcm, STUDY_DESCRIPTION));
        assert_eq!(
            get_non_empty_string(dcm, SOP_INSTANCE_UID).as_deref(),
            state.sop_instance_uid()
        );
        assert_eq!(get_items(dcm, REFERENCED_SERIES_SEQUENCE).unwrap().len(), 1);
        assert_eq!(get_items(dcm, DISPLAYED_AREA_SELECTION_SEQUENCE).unwrap().len(), 2);
    }

    #[test]
    fn test_serialize_twice_is_sealed() {
        let mut state = grayscale();
        state.serialize(&[image("1.1")]).unwrap();
        assert!(matches!(
            state.serialize(&[image("1.1")]),
            Err(PresentationStateError::Sealed)
        ));
    }

    #[test]
    fn test_serialize_rejects_mixed_studies_before_sealing() {
        let mut state = grayscale();
        let other = PresentationImage::from_dicom(header("2.1", "9.9.9", "MONOCHROME2"), 1).unwrap();
        assert!(matches!(
            state.serialize(&[image("1.1"), other]),
            Err(PresentationStateError::MixedStudies)
        ));
        assert!(!state.is_sealed());
    }

    #[test]
    fn test_serialize_skips_images_of_other_class() {
        let color = PresentationImage::from_dicom(header("3.1", "1.2.3", "RGB"), 1).unwrap();
        let mut state = grayscale();
        assert!(matches!(
            state.serialize(std::slice::from_ref(&color)),
            Err(PresentationStateError::UnsupportedImage(_))
        ));

        let report = state.serialize(&[image("1.1"), color]).unwrap();
        assert_eq!(report.images, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_first_image_transform_wins() {
        let mut first = image("1.1");
        first.spatial_transform.rotation = 90;
        let mut second = image("1.2");
        second.spatial_transform.rotation = 180;
        second.spatial_transform.flip_x = true;

        let mut state = grayscale();
        state.serialize(&[first, second]).unwrap();
        let dcm = state.dataset().unwrap();
        assert_eq!(get_u16_value(dcm, IMAGE_ROTATION), Some(90));
        assert_eq!(get_string_value(dcm, IMAGE_HORIZONTAL_FLIP).as_deref(), Some("N"));
    }

    #[test]
    fn test_mixed_invert_degrades_to_identity() {
        let mut inverted = image("1.1");
        inverted.invert = true;

        let mut state = grayscale();
        state.serialize(&[inverted.clone(), image("1.2")]).unwrap();
        assert_eq!(
            get_string_value(state.dataset().unwrap(), PRESENTATION_LUT_SHAPE).as_deref(),
            Some("IDENTITY")
        );

        let mut state = grayscale();
        state.serialize(&[inverted]).unwrap();
        assert_eq!(
            get_string_value(state.dataset().unwrap(), PRESENTATION_LUT_SHAPE).as_deref(),
            Some("INVERSE")
        );
    }

    #[test]
    fn test_unchanged_header_overlay_is_not_copied() {
        let mut state = grayscale();
        let report = state.serialize(&[with_header_overlay("1.1", 2)]).unwrap();
        let dcm = state.dataset().unwrap();

        assert_eq!(report.overlays_written, 0);
        assert!(!OverlayPlaneAttributes::is_present(dcm, 2));
        assert_eq!(
            get_string_value(dcm, overlay_tag(2, OVERLAY_ACTIVATION_LAYER)).as_deref(),
            Some("OVERLAY")
        );
    }

    #[test]
    fn test_hidden_header_overlay_gets_empty_activation() {
        let mut img = with_header_overlay("1.1", 0);
        img.graphics.deactivate_image_overlay(0).unwrap();

        let mut state = grayscale();
        state.serialize(&[img]).unwrap();
        let dcm = state.dataset().unwrap();
        let activation = overlay_tag(0, OVERLAY_ACTIVATION_LAYER);
        assert!(has_element(dcm, activation));
        assert_eq!(get_string_value(dcm, activation).unwrap_or_default(), "");
    }

    #[test]
    fn test_user_overlay_and_bitmap_shutter() {
        let mut img = with_header_overlay("1.1", 0);
        let mut user = OverlayPlaneGraphic::new_user(16, 16).unwrap();
        user.set_pixel(3, 3, true);
        let handle = img.graphics.add_user_overlay(user);
        img.graphics.activate_as_layer(handle, "marks").unwrap();

        let mut shutter = OverlayPlaneGraphic::new_user(16, 16).unwrap();
        shutter.set_gray_presentation_value(1000);
        let shutter = img.graphics.add_user_overlay(shutter);
        img.graphics.activate_as_shutter(Some(shutter)).unwrap();

        let mut state = grayscale();
        let report = state.serialize(&[img]).unwrap();
        let dcm = state.dataset().unwrap();

        // group 0 stays with the header overlay, queued overlays take 1 and 2
        assert_eq!(report.overlays_written, 2);
        assert!(OverlayPlaneAttributes::is_present(dcm, 1));
        assert!(OverlayPlaneAttributes::is_present(dcm, 2));
        assert!(!has_element(dcm, overlay_tag(1, OVERLAY_ACTIVATION_LAYER)));
        assert_eq!(
            get_string_value(dcm, overlay_tag(2, OVERLAY_ACTIVATION_LAYER)).as_deref(),
            Some("MARKS")
        );
        assert_eq!(get_string_value(dcm, SHUTTER_SHAPE).as_deref(), Some("BITMAP"));
        assert_eq!(get_u16_value(dcm, SHUTTER_OVERLAY_GROUP), Some(0x6002));
        assert_eq!(get_u16_value(dcm, SHUTTER_PRESENTATION_VALUE), Some(1000));
    }

    #[test]
    fn test_first_shutter_of_each_kind_is_kept() {
        let mut a = image("1.1");
        let mut graphic = GeometricShuttersGraphic::new(16, 16);
        graphic.add_custom_shutter(GeometricShutter::Rectangular(Rect::from_ltrb(2, 3, 10, 12)));
        let i = a.graphics.add_geometric_shutter(graphic);
        a.graphics.activate_shutter(Some(ShutterRef::Geometric(i))).unwrap();

        let mut b = image("1.2");
        let mut graphic = GeometricShuttersGraphic::new(16, 16);
        graphic.add_custom_shutter(GeometricShutter::Rectangular(Rect::from_ltrb(1, 1, 4, 4)));
        let i = b.graphics.add_geometric_shutter(graphic);
        b.graphics.activate_shutter(Some(ShutterRef::Geometric(i))).unwrap();

        let mut state = grayscale();
        let report = state.serialize(&[a, b]).unwrap();
        let dcm = state.dataset().unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(get_string_value(dcm, SHUTTER_SHAPE).as_deref(), Some("RECTANGULAR"));
        assert_eq!(get_int_value(dcm, tags::SHUTTER_LEFT_VERTICAL_EDGE), Some(2));
        assert_eq!(get_u16_value(dcm, SHUTTER_PRESENTATION_VALUE), Some(0));
    }

    #[test]
    fn test_layers_and_annotations() {
        let mut img = image("1.1");
        let layer = img.graphics.layers_mut().get_or_create("measurements").unwrap();
        layer.description = "Lengths".to_string();
        layer.graphics.push(Graphic::Polyline {
            points: vec![PointF::new(1.0, 1.0), PointF::new(5.0, 5.0)],
            closed: false,
        });
        layer.graphics.push(Graphic::Unsupported {
            kind: "ruler".to_string(),
        });
        img.annotations.push(Graphic::Point(PointF::new(3.0, 4.0)));

        let mut state = grayscale();
        let report = state.serialize(&[img]).unwrap();
        let dcm = state.dataset().unwrap();
        assert_eq!(report.annotations, 2);

        let layers = get_items(dcm, GRAPHIC_LAYER_SEQUENCE).unwrap();
        let ids: Vec<String> = layers
            .iter()
            .filter_map(|l| get_non_empty_string(l, GRAPHIC_LAYER))
            .collect();
        assert_eq!(ids, vec!["MEASUREMENTS", USER_ANNOTATIONS_LAYER]);
        assert_eq!(get_int_value(&layers[1], GRAPHIC_LAYER_ORDER), Some(2));

        let annotations = get_items(dcm, GRAPHIC_ANNOTATION_SEQUENCE).unwrap();
        assert_eq!(
            get_non_empty_string(&annotations[1], GRAPHIC_LAYER).as_deref(),
            Some(USER_ANNOTATIONS_LAYER)
        );
    }

    #[test]
    fn test_voi_and_modality_luts() {
        let mut img = image("1.1");
        img.voi_lut = VoiLut::Linear {
            center: 40.0,
            width: 400.0,
            explanation: None,
        };
        img.modality_lut = Some(crate::image::ModalityLut {
            slope: 2.0,
            intercept: -1024.0,
            rescale_type: None,
        });
        let mut disabled = image("1.2");
        disabled.voi_lut = VoiLut::Disabled;

        let mut state = grayscale();
        state.serialize(&[img, disabled]).unwrap();
        let dcm = state.dataset().unwrap();

        let vois = get_items(dcm, SOFTCOPY_VOI_LUT_SEQUENCE).unwrap();
        assert_eq!(vois.len(), 1);
        assert_eq!(
            get_non_empty_string(&vois[0], WINDOW_CENTER_WIDTH_EXPLANATION).as_deref(),
            Some(DEFAULT_WINDOW_EXPLANATION)
        );
        assert_eq!(get_non_empty_string(dcm, RESCALE_TYPE).as_deref(), Some("US"));
    }

    #[test]
    fn test_true_size_without_spacing_falls_back() {
        let mut state = SoftcopyPresentationState::with_options(
            PresentationStateSopClass::Grayscale,
            crate::types::SerializationOptions::default()
                .with_display_area_mode(DisplayAreaSerializationOption::TrueSize),
        );
        let report = state.serialize(&[image("1.1")]).unwrap();
        let dcm = state.dataset().unwrap();
        let item = &get_items(dcm, DISPLAYED_AREA_SELECTION_SEQUENCE).unwrap()[0];
        assert_eq!(
            get_string_value(item, PRESENTATION_SIZE_MODE).as_deref(),
            Some("SCALE TO FIT")
        );
        assert_eq!(
            get_multi_int_value(item, PRESENTATION_PIXEL_ASPECT_RATIO),
            Some(vec![1, 1])
        );
        assert_eq!(report.warnings.len(), 1);
    }
}
