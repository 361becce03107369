//! Overlay Plane module (PS 3.3 C.9.2) attribute access for one 60xx group

use crate::dicom::tags::{self, overlay_tag};
use crate::dicom::{
    get_bytes_value, get_float_value, get_int_value, get_multi_int_value, get_non_empty_string,
    get_string_value, get_u16_value, has_element, put_ds, put_is, put_ow, put_ss, put_str,
    put_us, remove_group,
};
use crate::error::{PresentationStateError, Result};
use crate::overlay::codec::{self, PackedOverlay};
use crate::types::{OverlaySubtype, OverlayType};
use dicom_core::VR;
use dicom_object::InMemDicomObject;
use log::debug;

/// Optional ROI statistics of an ROI overlay
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct RoiStatistics {
    pub area: Option<i32>,
    pub mean: Option<f64>,
    pub standard_deviation: Option<f64>,
}

impl RoiStatistics {
    pub fn is_empty(&self) -> bool {
        self.area.is_none() && self.mean.is_none() && self.standard_deviation.is_none()
    }
}

/// Pixel data of the image, for overlays embedded in unused pixel bits
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedPixelData<'a> {
    pub bits_allocated: u16,
    /// Bytes per frame
    pub frame_length: usize,
    pub big_endian_words: bool,
    pub data: &'a [u8],
}

/// Mask of one overlay group for one image frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayFrame {
    /// Unpacked mask of `rows * columns` bytes
    Mask(Vec<u8>),
    /// No overlay frame maps to the requested image frame
    Empty,
}

impl OverlayFrame {
    pub fn is_empty(&self) -> bool {
        match self {
            OverlayFrame::Mask(mask) => mask.is_empty(),
            OverlayFrame::Empty => true,
        }
    }
}

/// Attributes of one overlay plane group
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlaneAttributes {
    /// Group index 0..16 (group 0x6000 + 2 * index)
    pub index: u8,
    pub rows: u16,
    pub columns: u16,
    pub overlay_type: OverlayType,
    pub subtype: Option<OverlaySubtype>,
    /// 1-based row of the overlay's top left pixel
    pub origin_row: i32,
    /// 1-based column of the overlay's top left pixel
    pub origin_column: i32,
    pub bits_allocated: u16,
    pub bit_position: u16,
    /// Packed overlay data; `None` when embedded in pixel data
    pub data: Option<Vec<u8>>,
    pub description: Option<String>,
    pub label: Option<String>,
    pub roi: RoiStatistics,
    pub number_of_frames: Option<u32>,
    pub image_frame_origin: Option<u32>,
}

impl OverlayPlaneAttributes {
    /// Creates attributes for a single-frame overlay with packed data
    pub fn new(index: u8, rows: u16, columns: u16, data: Vec<u8>) -> Self {
        Self {
            index,
            rows,
            columns,
            overlay_type: OverlayType::Graphics,
            subtype: None,
            origin_row: 1,
            origin_column: 1,
            bits_allocated: 1,
            bit_position: 0,
            data: Some(data),
            description: None,
            label: None,
            roi: RoiStatistics::default(),
            number_of_frames: None,
            image_frame_origin: None,
        }
    }

    /// Returns whether the data set carries an overlay plane at `index`
    pub fn is_present(dcm: &InMemDicomObject, index: u8) -> bool {
        index < tags::MAX_OVERLAY_GROUPS
            && (get_string_value(dcm, overlay_tag(index, tags::OVERLAY_BIT_POSITION))
                .map(|s| !s.is_empty())
                .unwrap_or(false)
                || has_element(dcm, overlay_tag(index, tags::OVERLAY_DATA)))
    }

    /// Reads the overlay plane at `index`
    ///
    /// Returns `Ok(None)` when the group is absent and an error when it is
    /// present but lacks its dimensions.
    pub fn read(dcm: &InMemDicomObject, index: u8) -> Result<Option<Self>> {
        if !Self::is_present(dcm, index) {
            return Ok(None);
        }

        let tag = |element| overlay_tag(index, element);
        let rows = get_u16_value(dcm, tag(tags::OVERLAY_ROWS)).ok_or_else(|| {
            PresentationStateError::TagNotFound(format!("OverlayRows in group {:04X}", tag(0).group()))
        })?;
        let columns = get_u16_value(dcm, tag(tags::OVERLAY_COLUMNS)).ok_or_else(|| {
            PresentationStateError::TagNotFound(format!(
                "OverlayColumns in group {:04X}",
                tag(0).group()
            ))
        })?;

        let origin = get_multi_int_value(dcm, tag(tags::OVERLAY_ORIGIN)).unwrap_or_default();
        // frame numbers are 1-based
        let image_frame_origin = match get_int_value(dcm, tag(tags::IMAGE_FRAME_ORIGIN)) {
            Some(n) if n < 1 => {
                return Err(PresentationStateError::InvalidValue(format!(
                    "ImageFrameOrigin {} in group {:04X}",
                    n,
                    tag(0).group()
                )))
            }
            n => n.and_then(|n| u32::try_from(n).ok()),
        };
        let data = get_bytes_value(dcm, tag(tags::OVERLAY_DATA)).filter(|d| !d.is_empty());

        let attrs = Self {
            index,
            rows,
            columns,
            overlay_type: get_string_value(dcm, tag(tags::OVERLAY_TYPE))
                .map(|s| OverlayType::from_code(&s))
                .unwrap_or_default(),
            subtype: get_string_value(dcm, tag(tags::OVERLAY_SUBTYPE))
                .and_then(|s| OverlaySubtype::from_code(&s)),
            origin_row: origin.first().copied().unwrap_or(1),
            origin_column: origin.get(1).copied().unwrap_or(1),
            bits_allocated: get_u16_value(dcm, tag(tags::OVERLAY_BITS_ALLOCATED)).unwrap_or(1),
            bit_position: get_u16_value(dcm, tag(tags::OVERLAY_BIT_POSITION)).unwrap_or(0),
            data,
            description: get_non_empty_string(dcm, tag(tags::OVERLAY_DESCRIPTION)),
            label: get_non_empty_string(dcm, tag(tags::OVERLAY_LABEL)),
            roi: RoiStatistics {
                area: get_int_value(dcm, tag(tags::ROI_AREA)),
                mean: get_float_value(dcm, tag(tags::ROI_MEAN)),
                standard_deviation: get_float_value(dcm, tag(tags::ROI_STANDARD_DEVIATION)),
            },
            number_of_frames: get_int_value(dcm, tag(tags::NUMBER_OF_FRAMES_IN_OVERLAY))
                .and_then(|n| u32::try_from(n).ok()),
            image_frame_origin,
        };

        debug!(
            "Read overlay plane {} ({}x{}, {} frame(s))",
            index,
            attrs.rows,
            attrs.columns,
            attrs.number_of_frames.unwrap_or(1)
        );
        Ok(Some(attrs))
    }

    /// Writes this overlay plane, replacing whatever the group held before
    pub fn write(&self, dcm: &mut InMemDicomObject) {
        Self::delete(dcm, self.index);
        let tag = |element| overlay_tag(self.index, element);

        put_us(dcm, tag(tags::OVERLAY_ROWS), &[self.rows]);
        put_us(dcm, tag(tags::OVERLAY_COLUMNS), &[self.columns]);
        put_str(dcm, tag(tags::OVERLAY_TYPE), VR::CS, self.overlay_type.code());
        if let Some(subtype) = &self.subtype {
            put_str(dcm, tag(tags::OVERLAY_SUBTYPE), VR::LO, subtype.code());
        }
        put_ss(
            dcm,
            tag(tags::OVERLAY_ORIGIN),
            &[clamp_i16(self.origin_row), clamp_i16(self.origin_column)],
        );
        put_us(dcm, tag(tags::OVERLAY_BITS_ALLOCATED), &[self.bits_allocated]);
        put_us(dcm, tag(tags::OVERLAY_BIT_POSITION), &[self.bit_position]);
        if let Some(data) = &self.data {
            put_ow(dcm, tag(tags::OVERLAY_DATA), data);
        }
        if let Some(description) = &self.description {
            put_str(dcm, tag(tags::OVERLAY_DESCRIPTION), VR::LO, description);
        }
        if let Some(label) = &self.label {
            put_str(dcm, tag(tags::OVERLAY_LABEL), VR::LO, label);
        }
        if let Some(area) = self.roi.area {
            put_is(dcm, tag(tags::ROI_AREA), area);
        }
        if let Some(mean) = self.roi.mean {
            put_ds(dcm, tag(tags::ROI_MEAN), &[mean]);
        }
        if let Some(sd) = self.roi.standard_deviation {
            put_ds(dcm, tag(tags::ROI_STANDARD_DEVIATION), &[sd]);
        }
        if let Some(frames) = self.number_of_frames {
            put_is(dcm, tag(tags::NUMBER_OF_FRAMES_IN_OVERLAY), frames as i32);
        }
        if let Some(origin) = self.image_frame_origin {
            put_us(dcm, tag(tags::IMAGE_FRAME_ORIGIN), &[origin.min(u16::MAX as u32) as u16]);
        }
    }

    /// Removes every attribute of the overlay group at `index`
    pub fn delete(dcm: &mut InMemDicomObject, index: u8) {
        remove_group(dcm, tags::overlay_group(index));
    }

    /// Overlay data is stored in the Overlay Data element rather than in
    /// unused bits of the pixel data
    pub fn has_overlay_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_multi_frame(&self) -> bool {
        self.number_of_frames.is_some()
    }

    /// Overlay frame count plus first frame origin fits in the image
    pub fn is_valid_multi_frame(&self, total_image_frames: u32) -> bool {
        let first = self.image_frame_origin.unwrap_or(1).max(1);
        let count = self.number_of_frames.unwrap_or(1);
        count.saturating_add(first - 1) <= total_image_frames
    }

    /// Maps a 1-based image frame number to the 1-based overlay frame that
    /// applies to it, if any
    pub fn relevant_overlay_frame(&self, image_frame: u32, total_image_frames: u32) -> Option<u32> {
        if image_frame < 1 || image_frame > total_image_frames {
            return None;
        }
        // embedded overlays are one-to-one with image frames
        if !self.has_overlay_data() {
            return Some(image_frame);
        }
        if !self.is_multi_frame() {
            return Some(1);
        }
        let origin = self.image_frame_origin.unwrap_or(1).max(1);
        let count = self.number_of_frames.unwrap_or(1);
        if image_frame >= origin && image_frame - origin < count {
            Some(image_frame - origin + 1)
        } else {
            None
        }
    }

    /// Bit offset of a 1-based overlay frame within the packed data
    pub fn bit_offset(&self, overlay_frame: u32) -> Option<usize> {
        if !self.has_overlay_data() {
            return None;
        }
        let count = self.number_of_frames.unwrap_or(1);
        if overlay_frame < 1 || overlay_frame > count {
            return None;
        }
        Some(self.rows as usize * self.columns as usize * (overlay_frame as usize - 1))
    }

    /// Unpacks the mask applying to a 1-based image frame
    pub fn frame_mask(
        &self,
        image_frame: u32,
        total_image_frames: u32,
        pixel_data: Option<&EmbeddedPixelData<'_>>,
    ) -> Result<OverlayFrame> {
        let Some(overlay_frame) = self.relevant_overlay_frame(image_frame, total_image_frames)
        else {
            return Ok(OverlayFrame::Empty);
        };

        match &self.data {
            Some(data) => {
                let offset = self.bit_offset(overlay_frame).ok_or_else(|| {
                    PresentationStateError::Codec(format!(
                        "overlay {} has no frame {}",
                        self.index, overlay_frame
                    ))
                })?;
                let packed = PackedOverlay::new(
                    self.rows as usize,
                    self.columns as usize,
                    false,
                    data.clone(),
                )
                .with_bit_offset(offset);
                Ok(OverlayFrame::Mask(packed.unpack()?))
            }
            None => {
                let pixels = pixel_data.ok_or_else(|| {
                    PresentationStateError::Codec(format!(
                        "overlay {} is embedded but no pixel data is available",
                        self.index
                    ))
                })?;
                let mask = codec::extract_from_pixel_data(
                    self.bit_position,
                    pixels.bits_allocated,
                    (overlay_frame - 1) as usize,
                    pixels.frame_length,
                    pixels.big_endian_words,
                    pixels.data,
                )?;
                Ok(OverlayFrame::Mask(mask))
            }
        }
    }
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::codec::encode_mask;
    use rstest::rstest;

    fn multi_frame(frames: u32, origin: u32) -> OverlayPlaneAttributes {
        let mut attrs = OverlayPlaneAttributes::new(0, 2, 2, vec![0; 2]);
        attrs.number_of_frames = Some(frames);
        attrs.image_frame_origin = Some(origin);
        attrs
    }

    #[rstest]
    #[case(1, None)]
    #[case(2, None)]
    #[case(3, Some(1))]
    #[case(4, Some(2))]
    #[case(5, None)]
    fn test_relevant_overlay_frame(#[case] image_frame: u32, #[case] expected: Option<u32>) {
        let attrs = multi_frame(2, 3);
        assert_eq!(attrs.relevant_overlay_frame(image_frame, 6), expected);
    }

    #[test]
    fn test_single_frame_overlay_applies_everywhere() {
        let attrs = OverlayPlaneAttributes::new(0, 2, 2, vec![0; 2]);
        assert_eq!(attrs.relevant_overlay_frame(5, 10), Some(1));
        assert_eq!(attrs.relevant_overlay_frame(11, 10), None);
    }

    #[test]
    fn test_bit_offset_and_validity() {
        let attrs = multi_frame(3, 2);
        assert_eq!(attrs.bit_offset(1), Some(0));
        assert_eq!(attrs.bit_offset(3), Some(8));
        assert_eq!(attrs.bit_offset(4), None);
        assert!(attrs.is_valid_multi_frame(4));
        assert!(!attrs.is_valid_multi_frame(3));
    }

    #[test]
    fn test_unmapped_frame_is_empty_not_error() {
        let attrs = multi_frame(1, 2);
        let frame = attrs.frame_mask(1, 2, None).unwrap();
        assert_eq!(frame, OverlayFrame::Empty);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_write_read_round_trip() {
        let mask = vec![0xFF, 0x00, 0x00, 0xFF];
        let mut attrs = OverlayPlaneAttributes::new(3, 2, 2, encode_mask(2, 2, false, &mask).unwrap());
        attrs.overlay_type = OverlayType::Roi;
        attrs.subtype = Some(OverlaySubtype::Automated);
        attrs.origin_row = 5;
        attrs.origin_column = 7;
        attrs.label = Some("LESION".to_string());
        attrs.roi.area = Some(2);

        let mut dcm = InMemDicomObject::new_empty();
        attrs.write(&mut dcm);
        assert!(OverlayPlaneAttributes::is_present(&dcm, 3));
        assert!(!OverlayPlaneAttributes::is_present(&dcm, 2));

        let read = OverlayPlaneAttributes::read(&dcm, 3).unwrap().unwrap();
        assert_eq!(read.rows, 2);
        assert_eq!(read.overlay_type, OverlayType::Roi);
        assert_eq!(read.subtype, Some(OverlaySubtype::Automated));
        assert_eq!((read.origin_row, read.origin_column), (5, 7));
        assert_eq!(read.label.as_deref(), Some("LESION"));
        assert_eq!(read.roi.area, Some(2));
        assert_eq!(read.frame_mask(1, 1, None).unwrap(), OverlayFrame::Mask(mask));

        OverlayPlaneAttributes::delete(&mut dcm, 3);
        assert!(OverlayPlaneAttributes::read(&dcm, 3).unwrap().is_none());
    }

    #[test]
    fn test_embedded_overlay_needs_pixel_data() {
        let mut attrs = OverlayPlaneAttributes::new(0, 1, 2, Vec::new());
        attrs.data = None;
        attrs.bit_position = 7;
        assert!(attrs.frame_mask(1, 1, None).is_err());

        let pixels = [0x80u8, 0x00];
        let embedded = EmbeddedPixelData {
            bits_allocated: 8,
            frame_length: 2,
            big_endian_words: false,
            data: &pixels,
        };
        assert_eq!(
            attrs.frame_mask(1, 1, Some(&embedded)).unwrap(),
            OverlayFrame::Mask(vec![0xFF, 0x00])
        );
    }

    #[test]
    fn test_zero_frame_origin_never_underflows() {
        let mut attrs = multi_frame(1, 0);
        assert!(attrs.is_valid_multi_frame(1));
        assert_eq!(attrs.relevant_overlay_frame(1, 1), Some(1));
        assert_eq!(attrs.relevant_overlay_frame(2, 2), None);

        attrs.number_of_frames = Some(0);
        assert!(attrs.is_valid_multi_frame(1));
        assert_eq!(attrs.relevant_overlay_frame(1, 1), None);
    }

    #[test]
    fn test_read_rejects_zero_frame_origin() {
        let mut attrs = OverlayPlaneAttributes::new(2, 2, 2, vec![0; 2]);
        attrs.number_of_frames = Some(1);
        attrs.image_frame_origin = Some(0);
        let mut dcm = InMemDicomObject::new_empty();
        attrs.write(&mut dcm);
        assert!(matches!(
            OverlayPlaneAttributes::read(&dcm, 2),
            Err(PresentationStateError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_read_missing_dimensions_is_error() {
        let mut dcm = InMemDicomObject::new_empty();
        put_us(&mut dcm, overlay_tag(1, tags::OVERLAY_BIT_POSITION), &[0]);
        assert!(OverlayPlaneAttributes::read(&dcm, 1).is_err());
    }
}
