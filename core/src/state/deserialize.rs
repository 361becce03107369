//! Applying presentation state attributes to images

use crate::dicom::tags::{
    overlay_index, overlay_tag, DISPLAYED_AREA_BOTTOM_RIGHT_HAND_CORNER,
    DISPLAYED_AREA_SELECTION_SEQUENCE, DISPLAYED_AREA_TOP_LEFT_HAND_CORNER,
    GRAPHIC_ANNOTATION_SEQUENCE, GRAPHIC_LAYER, GRAPHIC_LAYER_DESCRIPTION, GRAPHIC_LAYER_ORDER,
    GRAPHIC_LAYER_RECOMMENDED_DISPLAY_CIELAB_VALUE,
    GRAPHIC_LAYER_RECOMMENDED_DISPLAY_GRAYSCALE_VALUE, GRAPHIC_LAYER_SEQUENCE,
    IMAGE_HORIZONTAL_FLIP, IMAGE_ROTATION, MAX_OVERLAY_GROUPS, OVERLAY_ACTIVATION_LAYER,
    PRESENTATION_LUT_SHAPE, PRESENTATION_PIXEL_MAGNIFICATION_RATIO, PRESENTATION_PIXEL_SPACING,
    PRESENTATION_SIZE_MODE, SHUTTER_OVERLAY_GROUP, SHUTTER_PRESENTATION_VALUE, SHUTTER_SHAPE,
    SOFTCOPY_VOI_LUT_SEQUENCE,
};
use crate::dicom::{
    get_float_value, get_int_value, get_items, get_multi_float_value, get_multi_int_value,
    get_multi_string_value, get_multi_u16_value, get_non_empty_string, get_string_value,
    get_u16_value, has_element,
};
use crate::error::{PresentationStateError, Result};
use crate::geometry::{fit_displayed_area, from_pixel_address_corners, DicomOrientation, DisplayedAreaFit};
use crate::graphics::{format_layer_id, AnnotationContent, DisplayShutter, GeometricShuttersGraphic, ShutterRef};
use crate::image::{read_modality_lut, read_voi_lut, PresentationImage, DEFAULT_OVERLAY_LAYER};
use crate::overlay::decode_overlay_planes;
use crate::state::presentation_state::SoftcopyPresentationState;
use crate::state::references::{item_references_image, SeriesReferences};
use crate::state::report::DeserializationReport;
use crate::types::{
    CieLab, OverlayPlaneSource, Point, PresentationLutShape, PresentationSizeMode,
    PresentationStateSopClass, RectF, ShutterShape,
};
use dicom_object::InMemDicomObject;
use log::{debug, info, warn};

impl SoftcopyPresentationState {
    /// Applies this state to the images it references
    ///
    /// Each referenced image first returns to the presentation described by
    /// its own header, then takes the state's modules. Images the state does
    /// not reference, or of the other SOP class, are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotSerialized` for a new state without attributes. Damaged
    /// modules are reported as warnings instead.
    pub fn deserialize(&self, images: &mut [PresentationImage]) -> Result<DeserializationReport> {
        let dcm = self.dataset()?;
        let references = SeriesReferences::read(dcm);
        let mut report = DeserializationReport::default();

        for image in images.iter_mut() {
            if !references.references_image(image) {
                report.skipped_images += 1;
                continue;
            }
            if image.presentation_state_sop_class() != self.sop_class() {
                report.skipped_images += 1;
                report.warn(format!(
                    "Image {} cannot show a {} presentation state; skipped",
                    image.sop_instance_uid(),
                    self.sop_class().simple_name()
                ));
                continue;
            }

            image.reset_presentation()?;
            let warnings = ImageModuleReader::new(dcm, self.sop_class()).apply(image)?;
            report.warnings.extend(warnings);
            report.images += 1;
        }

        info!(
            "Applied presentation state {} to {} images ({} skipped)",
            self.sop_instance_uid().unwrap_or("<no uid>"),
            report.images,
            report.skipped_images
        );
        Ok(report)
    }
}

/// Reads the modules of a presentation state onto one image
///
/// [`apply`](Self::apply) runs every module in order. Overlay activation and
/// the bitmap shutter look up overlays placed by the overlay planes, so
/// calling either before [`read_overlay_planes`](Self::read_overlay_planes)
/// fails with `InvalidOperation`.
#[derive(Debug)]
pub struct ImageModuleReader<'a> {
    dataset: &'a InMemDicomObject,
    sop_class: PresentationStateSopClass,
    displayed_area: Option<RectF>,
    overlay_planes_read: bool,
    warnings: Vec<String>,
}

impl<'a> ImageModuleReader<'a> {
    pub fn new(dataset: &'a InMemDicomObject, sop_class: PresentationStateSopClass) -> Self {
        Self {
            dataset,
            sop_class,
            displayed_area: None,
            overlay_planes_read: false,
            warnings: Vec::new(),
        }
    }

    /// Reads every module and returns the warnings raised on the way
    pub fn apply(mut self, image: &mut PresentationImage) -> Result<Vec<String>> {
        self.read_spatial_transform(image);
        self.read_displayed_area(image);
        self.read_graphic_layers(image);
        self.read_graphic_annotations(image);
        self.read_overlay_planes(image)?;
        self.read_overlay_activation(image)?;
        self.read_bitmap_shutter(image)?;
        self.read_display_shutter(image)?;
        self.read_luts(image);
        debug!(
            "Presentation state applied to {} with {} warnings",
            image.sop_instance_uid(),
            self.warnings.len()
        );
        Ok(self.warnings)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn require_overlay_planes(&self, module: &str) -> Result<()> {
        if self.overlay_planes_read {
            Ok(())
        } else {
            Err(PresentationStateError::InvalidOperation(format!(
                "overlay planes must be read before the {}",
                module
            )))
        }
    }

    pub fn read_spatial_transform(&mut self, image: &mut PresentationImage) {
        let rotation = get_int_value(self.dataset, IMAGE_ROTATION);
        let flip = get_string_value(self.dataset, IMAGE_HORIZONTAL_FLIP);
        if rotation.is_none() && flip.is_none() {
            return;
        }
        let orientation = DicomOrientation {
            rotation: rotation.unwrap_or(0),
            horizontal_flip: flip.as_deref().map(str::trim) == Some("Y"),
        };
        image.spatial_transform.apply_dicom_orientation(orientation);
    }

    /// Fits the displayed area selected for the image into its client
    /// rectangle
    pub fn read_displayed_area(&mut self, image: &mut PresentationImage) {
        let items = get_items(self.dataset, DISPLAYED_AREA_SELECTION_SEQUENCE).unwrap_or_default();
        let Some(item) = items.iter().find(|item| item_references_image(item, image)) else {
            return;
        };

        let corner = |tag| get_multi_int_value(item, tag).filter(|v| v.len() >= 2);
        let (Some(tl), Some(br)) = (
            corner(DISPLAYED_AREA_TOP_LEFT_HAND_CORNER),
            corner(DISPLAYED_AREA_BOTTOM_RIGHT_HAND_CORNER),
        ) else {
            self.warn(format!(
                "Displayed area for {} has no corners; ignored",
                image.sop_instance_uid()
            ));
            return;
        };
        let area = from_pixel_address_corners(Point::new(tl[0], tl[1]), Point::new(br[0], br[1]));

        let size_mode = get_string_value(item, PRESENTATION_SIZE_MODE)
            .map(|s| PresentationSizeMode::from_code(&s))
            .unwrap_or_default();
        let spacing = get_multi_float_value(item, PRESENTATION_PIXEL_SPACING)
            .filter(|v| v.len() >= 2 && v[0] > 0.0);
        let true_size_scale = match (spacing, image.display_pitch_mm) {
            (Some(spacing), Some(pitch)) if pitch > 0.0 => Some(spacing[0] / pitch),
            _ => None,
        };
        if size_mode == PresentationSizeMode::TrueSize && true_size_scale.is_none() {
            self.warn(format!(
                "True size display of {} needs pixel spacing and display pitch; scaled to fit",
                image.sop_instance_uid()
            ));
        }

        let fit = DisplayedAreaFit {
            size_mode,
            magnification: get_float_value(item, PRESENTATION_PIXEL_MAGNIFICATION_RATIO),
            true_size_scale,
        };
        fit_displayed_area(&mut image.spatial_transform, area, &fit);
        self.displayed_area = Some(area);
    }

    /// Creates the declared layers in their stored order
    pub fn read_graphic_layers(&mut self, image: &mut PresentationImage) {
        let mut items: Vec<(i32, &InMemDicomObject)> = get_items(self.dataset, GRAPHIC_LAYER_SEQUENCE)
            .unwrap_or_default()
            .iter()
            .map(|item| (get_int_value(item, GRAPHIC_LAYER_ORDER).unwrap_or(i32::MAX), item))
            .collect();
        items.sort_by_key(|(order, _)| *order);

        for (_, item) in items {
            let Some(id) = get_non_empty_string(item, GRAPHIC_LAYER) else {
                self.warn("Graphic layer without an id; ignored".to_string());
                continue;
            };
            match image.graphics.layers_mut().get_or_create(&id) {
                Ok(layer) => {
                    if let Some(description) = get_non_empty_string(item, GRAPHIC_LAYER_DESCRIPTION) {
                        layer.description = description;
                    }
                    layer.recommended_grayscale_value =
                        get_u16_value(item, GRAPHIC_LAYER_RECOMMENDED_DISPLAY_GRAYSCALE_VALUE);
                    layer.recommended_cielab =
                        get_multi_u16_value(item, GRAPHIC_LAYER_RECOMMENDED_DISPLAY_CIELAB_VALUE)
                            .filter(|v| v.len() == 3)
                            .map(|v| CieLab::new(v[0], v[1], v[2]));
                }
                Err(e) => self.warn(format!("Graphic layer '{}' ignored: {}", id, e)),
            }
        }
    }

    /// Adds the annotations that reference the image to their layers
    pub fn read_graphic_annotations(&mut self, image: &mut PresentationImage) {
        let area = self.displayed_area.unwrap_or_else(|| {
            RectF::new(0.0, 0.0, image.columns() as f32, image.rows() as f32)
        });
        let items = get_items(self.dataset, GRAPHIC_ANNOTATION_SEQUENCE).unwrap_or_default();

        for item in items.iter() {
            if !item_references_image(item, image) {
                continue;
            }
            let layer_id = get_string_value(item, GRAPHIC_LAYER).unwrap_or_default();
            let Some(graphic) = AnnotationContent::read(item).to_graphic(&area) else {
                continue;
            };
            match image.graphics.layers_mut().get_or_create(&layer_id) {
                Ok(layer) => layer.graphics.push(graphic),
                Err(e) => self.warn(format!("Annotation on layer '{}' ignored: {}", layer_id, e)),
            }
        }
    }

    /// Decodes the state's overlay groups into the presentation pool
    ///
    /// Overlays that cannot be decoded are left out and mark the plane.
    pub fn read_overlay_planes(&mut self, image: &mut PresentationImage) -> Result<()> {
        let decoded = decode_overlay_planes(
            self.dataset,
            OverlayPlaneSource::PresentationState,
            image.frame_number(),
            image.number_of_frames(),
            None,
        );
        for graphic in decoded.graphics {
            image.graphics.add_presentation_overlay(graphic)?;
        }
        if !decoded.failed_groups.is_empty() {
            self.warn(format!(
                "Presentation state overlays {:?} could not be shown on {}",
                decoded.failed_groups,
                image.sop_instance_uid()
            ));
            image.graphics.set_error_marker(format!(
                "presentation state overlay groups {:?} could not be displayed",
                decoded.failed_groups
            ));
        }
        self.overlay_planes_read = true;
        Ok(())
    }

    /// Moves overlays onto their activation layers
    ///
    /// A presentation state overlay hides the image overlay of the same
    /// group. A group with no activation layer at all shows both on the
    /// default overlay layer.
    pub fn read_overlay_activation(&mut self, image: &mut PresentationImage) -> Result<()> {
        self.require_overlay_planes("overlay activation")?;

        for n in 0..MAX_OVERLAY_GROUPS {
            let tag = overlay_tag(n, OVERLAY_ACTIVATION_LAYER);
            if !has_element(self.dataset, tag) {
                image
                    .graphics
                    .activate_presentation_overlay_as_layer(n, DEFAULT_OVERLAY_LAYER)?;
                image
                    .graphics
                    .activate_image_overlay_as_layer(n, DEFAULT_OVERLAY_LAYER)?;
                continue;
            }

            let raw = get_string_value(self.dataset, tag).unwrap_or_default();
            let layer = match format_layer_id(&raw) {
                Ok(id) => id,
                Err(e) => {
                    self.warn(format!("Overlay group {} activation: {}; shown on {}", n, e, DEFAULT_OVERLAY_LAYER));
                    DEFAULT_OVERLAY_LAYER.to_string()
                }
            };

            let plane = &mut image.graphics;
            if plane.presentation_overlay(n).is_some() {
                if layer.is_empty() {
                    plane.deactivate_presentation_overlay(n)?;
                } else {
                    plane.activate_presentation_overlay_as_layer(n, &layer)?;
                }
                plane.deactivate_image_overlay(n)?;
            } else if plane.image_overlay(n).is_some() {
                if layer.is_empty() {
                    plane.deactivate_image_overlay(n)?;
                } else {
                    plane.activate_image_overlay_as_layer(n, &layer)?;
                }
            }
        }
        Ok(())
    }

    /// Activates the overlay named by a Bitmap Display Shutter
    pub fn read_bitmap_shutter(&mut self, image: &mut PresentationImage) -> Result<()> {
        self.require_overlay_planes("bitmap shutter")?;

        let codes = get_multi_string_value(self.dataset, SHUTTER_SHAPE).unwrap_or_default();
        if !ShutterShape::from_codes(&codes).bitmap {
            return Ok(());
        }
        let group = get_u16_value(self.dataset, SHUTTER_OVERLAY_GROUP);
        let Some(n) = group.and_then(overlay_index) else {
            self.warn(format!("Bitmap shutter names no overlay group ({:?})", group));
            return Ok(());
        };

        let plane = &mut image.graphics;
        let handle = if let Some(h) = plane.presentation_overlay(n) {
            plane.activate_as_shutter(Some(h))?;
            plane.deactivate_image_overlay(n)?;
            Some(h)
        } else if let Some(h) = plane.image_overlay(n) {
            plane.activate_as_shutter(Some(h))?;
            Some(h)
        } else {
            None
        };

        match handle {
            Some(h) => {
                let graphic = image.graphics.overlay_mut(h)?;
                graphic.set_color(None);
                graphic.set_gray_presentation_value(
                    get_u16_value(self.dataset, SHUTTER_PRESENTATION_VALUE).unwrap_or(0),
                );
            }
            None => self.warn(format!("Bitmap shutter overlay group {} is empty", n)),
        }
        Ok(())
    }

    /// Activates the geometric shutters of a Display Shutter module
    pub fn read_display_shutter(&mut self, image: &mut PresentationImage) -> Result<()> {
        match DisplayShutter::read(self.dataset) {
            Ok(Some(shutter)) => {
                let graphic = GeometricShuttersGraphic::from_display_shutter(
                    &shutter,
                    image.rows() as usize,
                    image.columns() as usize,
                );
                let index = image.graphics.add_geometric_shutter(graphic);
                image
                    .graphics
                    .activate_shutter(Some(ShutterRef::Geometric(index)))?;
            }
            Ok(None) => {}
            Err(e) => {
                self.warn(format!(
                    "Display shutter of {} not shown: {}",
                    image.sop_instance_uid(),
                    e
                ));
                image.graphics.set_error_marker("display shutter could not be displayed");
            }
        }
        Ok(())
    }

    /// Modality, VOI and presentation LUTs; grayscale states only
    pub fn read_luts(&mut self, image: &mut PresentationImage) {
        if self.sop_class != PresentationStateSopClass::Grayscale {
            return;
        }
        if let Some(lut) = read_modality_lut(self.dataset) {
            image.modality_lut = Some(lut);
        }
        let vois = get_items(self.dataset, SOFTCOPY_VOI_LUT_SEQUENCE).unwrap_or_default();
        if let Some(item) = vois.iter().find(|item| item_references_image(item, image)) {
            image.voi_lut = read_voi_lut(item);
        }
        if let Some(shape) = get_string_value(self.dataset, PRESENTATION_LUT_SHAPE) {
            image.invert = PresentationLutShape::from_code(&shape) == PresentationLutShape::Inverse;
        }
    }
}
