use crate::dicom::tags::{
    BITS_ALLOCATED, COLUMNS, IMAGER_PIXEL_SPACING, LUT_DATA, LUT_DESCRIPTOR, LUT_EXPLANATION,
    NUMBER_OF_FRAMES, PHOTOMETRIC_INTERPRETATION, PIXEL_ASPECT_RATIO, PIXEL_DATA, PIXEL_SPACING,
    RESCALE_INTERCEPT, RESCALE_SLOPE, RESCALE_TYPE, ROWS, SAMPLES_PER_PIXEL, SERIES_INSTANCE_UID,
    SOP_CLASS_UID, SOP_INSTANCE_UID, STUDY_INSTANCE_UID, VOI_LUT_SEQUENCE, WINDOW_CENTER,
    WINDOW_CENTER_WIDTH_EXPLANATION, WINDOW_WIDTH,
};
use crate::dicom::{
    get_bytes_value, get_float_value, get_int_value, get_items, get_multi_float_value,
    get_multi_int_value, get_multi_string_value, get_multi_u16_value, get_non_empty_string,
    get_string_value, get_u16_value,
};
use crate::error::{PresentationStateError, Result};
use crate::geometry::SpatialTransform;
use crate::graphics::{Graphic, GraphicsPlane};
use crate::overlay::{decode_overlay_planes, EmbeddedPixelData};
use crate::types::{
    OverlayPlaneSource, PhotometricInterpretation, PixelAspectRatio, PixelSpacing,
    PresentationStateSopClass, Rect, SizeF,
};
use dicom_object::{open_file, InMemDicomObject};
use log::{debug, warn};
use std::path::Path;

/// Layer image-header overlays are shown on before any presentation state
/// is applied
pub const DEFAULT_OVERLAY_LAYER: &str = "OVERLAY";

/// SOP and hierarchy identifiers of an image
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ImageSop {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub series_instance_uid: String,
    pub study_instance_uid: String,
}

/// Value-of-interest lookup installed on an image
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum VoiLut {
    /// Window center and width
    Linear {
        center: f64,
        width: f64,
        explanation: Option<String>,
    },
    /// Explicit lookup table
    Table {
        first_mapped_value: i32,
        bits_per_entry: u16,
        data: Vec<u16>,
        explanation: Option<String>,
    },
    /// No VOI transformation
    Disabled,
}

/// Rescale slope, intercept and type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ModalityLut {
    pub slope: f64,
    pub intercept: f64,
    pub rescale_type: Option<String>,
}

impl ModalityLut {
    pub fn is_identity(&self) -> bool {
        self.slope == 1.0 && self.intercept == 0.0
    }
}

/// One displayed frame of an image together with its presentation
///
/// Owns the image header, the view geometry and lookup tables, and the
/// graphics plane that presentation states read and write.
#[derive(Debug, Clone)]
pub struct PresentationImage {
    header: InMemDicomObject,
    sop: ImageSop,
    frame_number: u32,
    number_of_frames: u32,
    rows: u16,
    columns: u16,
    photometric: PhotometricInterpretation,
    pixel_spacing: Option<PixelSpacing>,
    pixel_aspect_ratio: Option<PixelAspectRatio>,
    pub spatial_transform: SpatialTransform,
    /// Size of one display pixel in mm, needed for true-size display
    pub display_pitch_mm: Option<f64>,
    pub voi_lut: VoiLut,
    pub modality_lut: Option<ModalityLut>,
    pub invert: bool,
    pub graphics: GraphicsPlane,
    /// Annotations drawn directly on the image rather than on a layer
    pub annotations: Vec<Graphic>,
}

impl PresentationImage {
    /// Builds the presentation of one 1-based frame of an image
    ///
    /// Image-header overlays for the frame are decoded into the graphics
    /// plane and shown on the default overlay layer. Overlays that cannot be
    /// decoded are skipped and leave an error marker on the plane.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedImage` when SOP, series or study identifiers or
    /// the pixel matrix size are missing, or the frame does not exist.
    pub fn from_dicom(header: InMemDicomObject, frame_number: u32) -> Result<Self> {
        let required = |tag, name: &str| {
            get_non_empty_string(&header, tag)
                .ok_or_else(|| PresentationStateError::UnsupportedImage(format!("missing {}", name)))
        };
        let sop = ImageSop {
            sop_class_uid: required(SOP_CLASS_UID, "SOP Class UID")?,
            sop_instance_uid: required(SOP_INSTANCE_UID, "SOP Instance UID")?,
            series_instance_uid: required(SERIES_INSTANCE_UID, "Series Instance UID")?,
            study_instance_uid: required(STUDY_INSTANCE_UID, "Study Instance UID")?,
        };

        let rows = get_u16_value(&header, ROWS).filter(|&r| r > 0);
        let columns = get_u16_value(&header, COLUMNS).filter(|&c| c > 0);
        let (Some(rows), Some(columns)) = (rows, columns) else {
            return Err(PresentationStateError::UnsupportedImage(format!(
                "image {} has no pixel matrix",
                sop.sop_instance_uid
            )));
        };

        let number_of_frames = get_int_value(&header, NUMBER_OF_FRAMES)
            .filter(|&n| n > 0)
            .map(|n| n as u32)
            .unwrap_or(1);
        if frame_number == 0 || frame_number > number_of_frames {
            return Err(PresentationStateError::UnsupportedImage(format!(
                "frame {} out of range 1..={}",
                frame_number, number_of_frames
            )));
        }

        let photometric = get_string_value(&header, PHOTOMETRIC_INTERPRETATION)
            .map(|s| PhotometricInterpretation::from_str(&s))
            .unwrap_or_else(|| {
                if get_int_value(&header, SAMPLES_PER_PIXEL).unwrap_or(1) > 1 {
                    PhotometricInterpretation::Rgb
                } else {
                    PhotometricInterpretation::Monochrome2
                }
            });

        let pixel_spacing = read_pixel_spacing(&header);
        let pixel_aspect_ratio = get_multi_string_value(&header, PIXEL_ASPECT_RATIO)
            .and_then(|v| PixelAspectRatio::parse(&v.join("\\")).ok());

        let spatial_transform = SpatialTransform::new(
            SizeF::new(columns as f32, rows as f32),
            Rect::new(0, 0, columns as i32, rows as i32),
        );

        let mut image = Self {
            voi_lut: read_voi_lut(&header),
            modality_lut: read_modality_lut(&header),
            invert: photometric.is_inverted(),
            header,
            sop,
            frame_number,
            number_of_frames,
            rows,
            columns,
            photometric,
            pixel_spacing,
            pixel_aspect_ratio,
            spatial_transform,
            display_pitch_mm: None,
            graphics: GraphicsPlane::new(),
            annotations: Vec::new(),
        };
        image.load_header_overlays()?;
        debug!(
            "Loaded image {} frame {}/{} ({}x{})",
            image.sop.sop_instance_uid, frame_number, number_of_frames, columns, rows
        );
        Ok(image)
    }

    /// Builds one presentation per frame of an image
    pub fn frames_from_dicom(header: InMemDicomObject) -> Result<Vec<Self>> {
        let frames = get_int_value(&header, NUMBER_OF_FRAMES)
            .filter(|&n| n > 1)
            .unwrap_or(1) as u32;
        (1..=frames)
            .map(|frame| Self::from_dicom(header.clone(), frame))
            .collect()
    }

    /// Opens an image file and presents its first frame
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dcm = open_file(path.as_ref())?;
        Self::from_dicom(dcm.into_inner(), 1)
    }

    /// Drops every presentation-state change and restores the presentation
    /// described by the image header
    ///
    /// The client rectangle, display pitch and stand-alone annotations are
    /// kept.
    pub fn reset_presentation(&mut self) -> Result<()> {
        self.spatial_transform.reset();
        self.voi_lut = read_voi_lut(&self.header);
        self.modality_lut = read_modality_lut(&self.header);
        self.invert = self.photometric.is_inverted();
        self.graphics.clear();
        self.load_header_overlays()
    }

    fn load_header_overlays(&mut self) -> Result<()> {
        let bits_allocated = get_u16_value(&self.header, BITS_ALLOCATED).unwrap_or(16);
        let pixel_bytes = get_bytes_value(&self.header, PIXEL_DATA);
        let frame_length =
            self.rows as usize * self.columns as usize * (bits_allocated as usize / 8).max(1);
        let embedded = pixel_bytes.as_deref().map(|data| EmbeddedPixelData {
            bits_allocated,
            frame_length,
            big_endian_words: false,
            data,
        });

        let decoded = decode_overlay_planes(
            &self.header,
            OverlayPlaneSource::Image,
            self.frame_number,
            self.number_of_frames,
            embedded.as_ref(),
        );

        for graphic in decoded.graphics {
            let handle = self.graphics.add_image_overlay(graphic)?;
            self.graphics
                .activate_as_layer(handle, DEFAULT_OVERLAY_LAYER)?;
        }
        if !decoded.failed_groups.is_empty() {
            warn!(
                "Image {} has undecodable overlays in groups {:?}",
                self.sop.sop_instance_uid, decoded.failed_groups
            );
            self.graphics.set_error_marker(format!(
                "overlay groups {:?} could not be displayed",
                decoded.failed_groups
            ));
        }
        Ok(())
    }

    /// Image header attributes
    pub fn header(&self) -> &InMemDicomObject {
        &self.header
    }

    pub fn sop(&self) -> &ImageSop {
        &self.sop
    }

    pub fn sop_instance_uid(&self) -> &str {
        &self.sop.sop_instance_uid
    }

    pub fn series_instance_uid(&self) -> &str {
        &self.sop.series_instance_uid
    }

    pub fn study_instance_uid(&self) -> &str {
        &self.sop.study_instance_uid
    }

    /// 1-based frame number
    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn number_of_frames(&self) -> u32 {
        self.number_of_frames
    }

    pub fn is_multi_frame(&self) -> bool {
        self.number_of_frames > 1
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn photometric_interpretation(&self) -> PhotometricInterpretation {
        self.photometric
    }

    /// Presentation state SOP class suited to this image
    pub fn presentation_state_sop_class(&self) -> PresentationStateSopClass {
        if self.photometric.is_color() {
            PresentationStateSopClass::Color
        } else {
            PresentationStateSopClass::Grayscale
        }
    }

    pub fn pixel_spacing(&self) -> Option<PixelSpacing> {
        self.pixel_spacing
    }

    pub fn set_pixel_spacing(&mut self, spacing: Option<PixelSpacing>) {
        self.pixel_spacing = spacing;
    }

    /// Pixel aspect ratio from calibration, then the explicit attribute,
    /// then square
    pub fn pixel_aspect_ratio(&self) -> PixelAspectRatio {
        self.pixel_spacing
            .and_then(|s| s.aspect_ratio())
            .or(self.pixel_aspect_ratio)
            .unwrap_or_default()
    }

    pub fn client_rectangle(&self) -> Rect {
        self.spatial_transform.client_rectangle()
    }

    pub fn set_client_rectangle(&mut self, client: Rect) {
        self.spatial_transform.set_client_rectangle(client);
    }
}

fn read_pixel_spacing(dcm: &InMemDicomObject) -> Option<PixelSpacing> {
    [PIXEL_SPACING, IMAGER_PIXEL_SPACING].into_iter().find_map(|tag| {
        get_multi_float_value(dcm, tag)
            .filter(|v| v.len() >= 2)
            .map(|v| PixelSpacing::new(v[0], v[1]))
            .or_else(|| {
                get_multi_string_value(dcm, tag).and_then(|v| PixelSpacing::parse(&v.join("\\")).ok())
            })
            .filter(PixelSpacing::is_valid)
    })
}

/// Reads the first VOI LUT of an image or presentation state data set
///
/// A window takes precedence over a lookup table.
pub fn read_voi_lut(dcm: &InMemDicomObject) -> VoiLut {
    let centers = get_multi_float_value(dcm, WINDOW_CENTER).unwrap_or_default();
    let widths = get_multi_float_value(dcm, WINDOW_WIDTH).unwrap_or_default();
    if let (Some(&center), Some(&width)) = (centers.first(), widths.first()) {
        if width >= 1.0 {
            return VoiLut::Linear {
                center,
                width,
                explanation: get_multi_string_value(dcm, WINDOW_CENTER_WIDTH_EXPLANATION)
                    .and_then(|v| v.into_iter().next())
                    .filter(|s| !s.is_empty()),
            };
        }
        warn!("Ignoring window width {} below 1", width);
    }

    if let Some(item) = get_items(dcm, VOI_LUT_SEQUENCE).and_then(|items| items.first()) {
        if let Some(lut) = read_lut_item(item) {
            return lut;
        }
    }
    VoiLut::Disabled
}

fn read_lut_item(item: &InMemDicomObject) -> Option<VoiLut> {
    let descriptor = get_multi_int_value(item, LUT_DESCRIPTOR).filter(|d| d.len() == 3)?;
    let data = get_multi_u16_value(item, LUT_DATA)?;
    let entries = if descriptor[0] == 0 { 65536 } else { descriptor[0] as usize };
    if data.len() != entries {
        warn!(
            "VOI LUT declares {} entries but holds {}; ignored",
            entries,
            data.len()
        );
        return None;
    }
    Some(VoiLut::Table {
        first_mapped_value: descriptor[1],
        bits_per_entry: descriptor[2] as u16,
        data,
        explanation: get_non_empty_string(item, LUT_EXPLANATION),
    })
}

/// Reads rescale slope and intercept, when present
pub fn read_modality_lut(dcm: &InMemDicomObject) -> Option<ModalityLut> {
    let slope = get_float_value(dcm, RESCALE_SLOPE);
    let intercept = get_float_value(dcm, RESCALE_INTERCEPT);
    if slope.is_none() && intercept.is_none() {
        return None;
    }
    Some(ModalityLut {
        slope: slope.unwrap_or(1.0),
        intercept: intercept.unwrap_or(0.0),
        rescale_type: get_non_empty_string(dcm, RESCALE_TYPE),
    })
}
