//! Overlay plane graphics decoded from 60xx groups or drawn by a user

use crate::error::{PresentationStateError, Result};
use crate::overlay::codec;
use crate::overlay::plane_module::{
    EmbeddedPixelData, OverlayFrame, OverlayPlaneAttributes, RoiStatistics,
};
use crate::types::{OverlayPlaneSource, OverlaySubtype, OverlayType, PointF, Rgb};
use dicom_object::InMemDicomObject;
use log::{debug, warn};

/// How "on" mask pixels are turned into display colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionRule {
    /// Linear gray ramp up to a 16-bit presentation value
    Gray { presentation_value: u16 },
    /// Flat color, alpha blended by the mask value
    Color(Rgb),
}

impl SubstitutionRule {
    /// Maps one 8-bit mask value to a packed ARGB pixel
    pub fn argb(&self, mask_value: u8) -> u32 {
        match *self {
            SubstitutionRule::Gray { presentation_value } => {
                let pv = presentation_value.max(1) as f64;
                let v = mask_value as f64 / 255.0 * pv;
                let gray = (255.0 * v / 65535.0).round() as u32;
                let alpha = (255.0 * (v / pv).min(1.0)).round() as u32;
                (alpha << 24) | (gray << 16) | (gray << 8) | gray
            }
            SubstitutionRule::Color(c) => {
                ((mask_value as u32) << 24)
                    | ((c.r as u32) << 16)
                    | ((c.g as u32) << 8)
                    | c.b as u32
            }
        }
    }
}

/// An overlay plane rendered as an 8-bit mask over the image
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlaneGraphic {
    rows: usize,
    columns: usize,
    mask: Vec<u8>,
    origin: PointF,
    index: Option<u8>,
    frame_index: usize,
    source: OverlayPlaneSource,
    overlay_type: OverlayType,
    subtype: Option<OverlaySubtype>,
    label: String,
    description: String,
    name: String,
    roi: RoiStatistics,
    gray_presentation_value: u16,
    color: Option<Rgb>,
    visible: bool,
}

impl OverlayPlaneGraphic {
    /// Creates an empty user overlay
    pub fn new_user(rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(PresentationStateError::InvalidGeometry(format!(
                "overlay dimensions must be positive, got {}x{}",
                rows, columns
            )));
        }
        Ok(Self {
            rows,
            columns,
            mask: vec![0; rows * columns],
            origin: PointF::new(1.0, 1.0),
            index: None,
            frame_index: 0,
            source: OverlayPlaneSource::User,
            overlay_type: OverlayType::Graphics,
            subtype: None,
            label: String::new(),
            description: String::new(),
            name: "User Overlay".to_string(),
            roi: RoiStatistics::default(),
            gray_presentation_value: 0,
            color: Some(Rgb::PEACH_PUFF),
            visible: true,
        })
    }

    /// Creates an overlay from decoded plane attributes
    ///
    /// `frame_index` is the 0-based image frame the mask applies to.
    pub fn from_attributes(
        attrs: &OverlayPlaneAttributes,
        mask: Vec<u8>,
        frame_index: usize,
        source: OverlayPlaneSource,
    ) -> Result<Self> {
        let (rows, columns) = (attrs.rows as usize, attrs.columns as usize);
        if mask.len() != rows * columns {
            return Err(PresentationStateError::Codec(format!(
                "overlay {} mask has {} bytes, expected {}",
                attrs.index,
                mask.len(),
                rows * columns
            )));
        }

        let name = match &attrs.label {
            Some(label) => label.clone(),
            None if attrs.is_multi_frame() => {
                format!("{} Overlay {} (frame {})", source, attrs.index, frame_index + 1)
            }
            None => format!("{} Overlay {}", source, attrs.index),
        };

        Ok(Self {
            rows,
            columns,
            mask,
            origin: PointF::new(attrs.origin_column as f32, attrs.origin_row as f32),
            index: Some(attrs.index),
            frame_index,
            source,
            overlay_type: attrs.overlay_type,
            subtype: attrs.subtype.clone(),
            label: attrs.label.clone().unwrap_or_default(),
            description: attrs.description.clone().unwrap_or_default(),
            name,
            roi: attrs.roi,
            gray_presentation_value: 0,
            color: Some(Rgb::PEACH_PUFF),
            visible: true,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Unpacked mask, one byte per pixel
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Sets one mask pixel
    pub fn set_pixel(&mut self, row: usize, column: usize, on: bool) {
        if row < self.rows && column < self.columns {
            self.mask[row * self.columns + column] = if on { 0xFF } else { 0x00 };
        }
    }

    /// 1-based position of the overlay's top left pixel, as (column, row)
    pub fn origin(&self) -> PointF {
        self.origin
    }

    pub fn set_origin(&mut self, origin: PointF) {
        self.origin = origin;
    }

    /// Group index the overlay was read from, if any
    pub fn index(&self) -> Option<u8> {
        self.index
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn source(&self) -> OverlayPlaneSource {
        self.source
    }

    pub fn overlay_type(&self) -> OverlayType {
        self.overlay_type
    }

    pub fn subtype(&self) -> Option<&OverlaySubtype> {
        self.subtype.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roi(&self) -> &RoiStatistics {
        &self.roi
    }

    pub fn gray_presentation_value(&self) -> u16 {
        self.gray_presentation_value
    }

    pub fn set_gray_presentation_value(&mut self, value: u16) {
        self.gray_presentation_value = value;
    }

    pub fn color(&self) -> Option<Rgb> {
        self.color
    }

    /// Sets or clears the display color; clearing falls back to the gray rule
    pub fn set_color(&mut self, color: Option<Rgb>) {
        self.color = color;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn substitution_rule(&self) -> SubstitutionRule {
        match self.color {
            Some(color) => SubstitutionRule::Color(color),
            None => SubstitutionRule::Gray {
                presentation_value: self.gray_presentation_value,
            },
        }
    }

    /// Renders the mask through the current substitution rule
    pub fn render_argb(&self) -> Vec<u32> {
        let rule = self.substitution_rule();
        self.mask.iter().map(|&m| rule.argb(m)).collect()
    }

    /// Packs the mask into Overlay Data
    pub fn to_packed(&self, big_endian_words: bool) -> Result<Vec<u8>> {
        codec::encode_mask(self.rows, self.columns, big_endian_words, &self.mask)
    }

    /// Builds the attributes to write this overlay into group `index`
    pub fn to_attributes(&self, index: u8) -> Result<OverlayPlaneAttributes> {
        let rows = u16::try_from(self.rows)
            .map_err(|_| PresentationStateError::InvalidGeometry("overlay too tall".into()))?;
        let columns = u16::try_from(self.columns)
            .map_err(|_| PresentationStateError::InvalidGeometry("overlay too wide".into()))?;

        let mut attrs = OverlayPlaneAttributes::new(index, rows, columns, self.to_packed(false)?);
        attrs.overlay_type = self.overlay_type;
        attrs.subtype = self.subtype.clone();
        attrs.origin_row = self.origin.y.round() as i32;
        attrs.origin_column = self.origin.x.round() as i32;
        attrs.label = Some(self.label.clone()).filter(|s| !s.is_empty());
        attrs.description = Some(self.description.clone()).filter(|s| !s.is_empty());
        attrs.roi = self.roi;
        Ok(attrs)
    }
}

/// Overlay graphics decoded from the 16 overlay groups of a data set
#[derive(Debug, Default)]
pub struct DecodedOverlays {
    pub graphics: Vec<OverlayPlaneGraphic>,
    /// Groups whose overlay could not be decoded
    pub failed_groups: Vec<u8>,
}

/// Decodes every overlay group in `dcm` that applies to a 1-based image frame
///
/// Undecodable groups are logged and listed in `failed_groups`; decoding
/// carries on with the remaining groups.
pub fn decode_overlay_planes(
    dcm: &InMemDicomObject,
    source: OverlayPlaneSource,
    image_frame: u32,
    total_image_frames: u32,
    pixel_data: Option<&EmbeddedPixelData<'_>>,
) -> DecodedOverlays {
    let mut decoded = DecodedOverlays::default();

    for index in 0..crate::dicom::tags::MAX_OVERLAY_GROUPS {
        let result = OverlayPlaneAttributes::read(dcm, index).and_then(|attrs| match attrs {
            None => Ok(None),
            Some(attrs) => {
                if attrs.is_multi_frame() && !attrs.is_valid_multi_frame(total_image_frames) {
                    warn!(
                        "Overlay {} declares more frames than the image has ({})",
                        index, total_image_frames
                    );
                }
                match attrs.frame_mask(image_frame, total_image_frames, pixel_data)? {
                    OverlayFrame::Empty => Ok(None),
                    OverlayFrame::Mask(mask) => OverlayPlaneGraphic::from_attributes(
                        &attrs,
                        mask,
                        image_frame.saturating_sub(1) as usize,
                        source,
                    )
                    .map(Some),
                }
            }
        });

        match result {
            Ok(Some(graphic)) => {
                debug!("Decoded {} overlay {}", source, index);
                decoded.graphics.push(graphic);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to decode {} overlay {}: {}", source, index, e);
                decoded.failed_groups.push(index);
            }
        }
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::tags::{overlay_tag, OVERLAY_ROWS};
    use crate::dicom::put_us;
    use rstest::rstest;

    fn attrs_with_mask(index: u8, mask: &[u8]) -> OverlayPlaneAttributes {
        OverlayPlaneAttributes::new(index, 2, 2, codec::encode_mask(2, 2, false, mask).unwrap())
    }

    #[rstest]
    #[case(0, 255, 0)]
    #[case(255, 255, 1)]
    #[case(0, 0, 0)]
    #[case(65535, 255, 255)]
    #[case(65535, 0, 0)]
    fn test_gray_rule(#[case] pv: u16, #[case] mask: u8, #[case] gray: u32) {
        let argb = SubstitutionRule::Gray {
            presentation_value: pv,
        }
        .argb(mask);
        assert_eq!(argb & 0xFF, gray);
        let expected_alpha = if mask == 0 { 0 } else { 255 };
        assert_eq!(argb >> 24, expected_alpha);
    }

    #[test]
    fn test_gray_rule_soft_edge() {
        let rule = SubstitutionRule::Gray {
            presentation_value: 65535,
        };
        assert_eq!(rule.argb(128) >> 24, 128);
    }

    #[test]
    fn test_color_rule() {
        let rule = SubstitutionRule::Color(Rgb::new(10, 20, 30));
        assert_eq!(rule.argb(255), 0xFF0A141E);
        assert_eq!(rule.argb(0), 0x000A141E);
    }

    #[test]
    fn test_changing_rule_keeps_mask() {
        let mut g = OverlayPlaneGraphic::new_user(2, 2).unwrap();
        g.set_pixel(0, 1, true);
        let before = g.mask().to_vec();
        assert!(matches!(g.substitution_rule(), SubstitutionRule::Color(c) if c == Rgb::PEACH_PUFF));
        g.set_color(None);
        g.set_gray_presentation_value(1000);
        assert_eq!(
            g.substitution_rule(),
            SubstitutionRule::Gray {
                presentation_value: 1000
            }
        );
        assert_eq!(g.mask(), before.as_slice());
    }

    #[test]
    fn test_user_overlay_rejects_zero_size() {
        assert!(OverlayPlaneGraphic::new_user(0, 4).is_err());
    }

    #[test]
    fn test_attributes_round_trip() {
        let mut attrs = attrs_with_mask(2, &[0xFF, 0, 0, 0xFF]);
        attrs.origin_row = 3;
        attrs.origin_column = 4;
        let mask = match attrs.frame_mask(1, 1, None).unwrap() {
            OverlayFrame::Mask(m) => m,
            OverlayFrame::Empty => panic!("expected mask"),
        };
        let g = OverlayPlaneGraphic::from_attributes(&attrs, mask, 0, OverlayPlaneSource::Image).unwrap();
        assert_eq!(g.index(), Some(2));
        assert_eq!(g.origin(), PointF::new(4.0, 3.0));
        assert_eq!(g.name(), "Image Overlay 2");

        let back = g.to_attributes(5).unwrap();
        assert_eq!(back.index, 5);
        assert_eq!((back.origin_row, back.origin_column), (3, 4));
        assert_eq!(back.data, attrs.data);
    }

    #[test]
    fn test_decode_skips_broken_groups() {
        let mut dcm = InMemDicomObject::new_empty();
        attrs_with_mask(0, &[0xFF, 0, 0, 0]).write(&mut dcm);
        attrs_with_mask(4, &[0, 0, 0, 0xFF]).write(&mut dcm);
        // group 1 claims 100 rows but carries two bytes of data
        attrs_with_mask(1, &[0; 4]).write(&mut dcm);
        put_us(&mut dcm, overlay_tag(1, OVERLAY_ROWS), &[100]);

        let decoded = decode_overlay_planes(&dcm, OverlayPlaneSource::Image, 1, 1, None);
        let indices: Vec<_> = decoded.graphics.iter().filter_map(|g| g.index()).collect();
        assert_eq!(indices, vec![0, 4]);
        assert_eq!(decoded.failed_groups, vec![1]);
    }

    #[test]
    fn test_decode_skips_zero_frame_origin() {
        let mut attrs = attrs_with_mask(0, &[0xFF, 0, 0, 0]);
        attrs.number_of_frames = Some(1);
        attrs.image_frame_origin = Some(0);
        let mut dcm = InMemDicomObject::new_empty();
        attrs.write(&mut dcm);

        let decoded = decode_overlay_planes(&dcm, OverlayPlaneSource::Image, 1, 1, None);
        assert!(decoded.graphics.is_empty());
        assert_eq!(decoded.failed_groups, vec![0]);
    }
}
