//! Image spatial transform and its Spatial Transform module encoding
//!
//! The transform keeps a free rotation plus independent X/Y flips. DICOM
//! keeps one clockwise rotation (0/90/180/270) plus a horizontal flip that is
//! applied before the rotation. The mapping between the two is a fixed table.

use crate::types::{PointF, Rect, RectF, SizeF};

/// DICOM Image Rotation, indexed by `rotation / 90 + 4 * (2 * flip_x + flip_y)`
pub const ROTATION_FLIP_TABLE: [i32; 16] = [
    0, 90, 180, 270, // no flip
    0, 270, 180, 90, // flip Y
    180, 90, 0, 270, // flip X
    180, 270, 0, 90, // flip X and Y
];

/// Rotation and horizontal flip as written to the Spatial Transform module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct DicomOrientation {
    /// Image Rotation (0070,0042), clockwise degrees
    pub rotation: i32,
    /// Image Horizontal Flip (0070,0041)
    pub horizontal_flip: bool,
}

/// Normalises degrees into 0..360
pub fn normalize_rotation(degrees: i32) -> i32 {
    ((degrees % 360) + 360) % 360
}

/// Encodes a rotation and flip pair into DICOM terms
pub fn encode_orientation(rotation: i32, flip_x: bool, flip_y: bool) -> DicomOrientation {
    let quarter_turns = normalize_rotation(rotation) / 90;
    let flip_state = (if flip_x { 2 } else { 0 }) + (if flip_y { 1 } else { 0 });
    DicomOrientation {
        rotation: ROTATION_FLIP_TABLE[(quarter_turns + 4 * flip_state) as usize],
        horizontal_flip: flip_x ^ flip_y,
    }
}

/// Decodes DICOM rotation and flip into `(rotation, flip_x, flip_y)`
pub fn decode_orientation(orientation: DicomOrientation) -> (i32, bool, bool) {
    if orientation.horizontal_flip {
        (normalize_rotation(360 - orientation.rotation), false, true)
    } else {
        (normalize_rotation(orientation.rotation), false, false)
    }
}

/// Spatial transform of an image into its client rectangle
///
/// A source point `p` maps to
/// `client_center + scale * F * R * (p - image_center + translation)` where
/// `R` rotates clockwise on screen and `F` applies the flips after rotation.
/// `flip_y` mirrors across the vertical axis and `flip_x` across the
/// horizontal axis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SpatialTransform {
    image_size: SizeF,
    client_rectangle: Rect,
    pub scale: f32,
    /// Source-space translation
    pub translation: PointF,
    /// Degrees, any value
    pub rotation: i32,
    pub flip_x: bool,
    pub flip_y: bool,
    /// When set, `scale` is ignored and the image is fitted to the client area
    pub scale_to_fit: bool,
}

impl SpatialTransform {
    pub fn new(image_size: SizeF, client_rectangle: Rect) -> Self {
        Self {
            image_size,
            client_rectangle,
            scale: 1.0,
            translation: PointF::default(),
            rotation: 0,
            flip_x: false,
            flip_y: false,
            scale_to_fit: true,
        }
    }

    pub fn image_size(&self) -> SizeF {
        self.image_size
    }

    pub fn client_rectangle(&self) -> Rect {
        self.client_rectangle
    }

    pub fn set_client_rectangle(&mut self, client_rectangle: Rect) {
        self.client_rectangle = client_rectangle;
    }

    /// Returns whether the rotation is an odd multiple of 90 degrees
    pub fn is_transposed(&self) -> bool {
        let quarter_turns = ((self.rotation as f64).to_radians().sin().round()) as i32;
        quarter_turns != 0
    }

    /// Scale actually applied, honouring `scale_to_fit`
    pub fn effective_scale(&self) -> f32 {
        if !self.scale_to_fit {
            return self.scale;
        }
        let client = self.client_rectangle.to_positive();
        let (w, h) = if self.is_transposed() {
            (self.image_size.height, self.image_size.width)
        } else {
            (self.image_size.width, self.image_size.height)
        };
        if w <= 0.0 || h <= 0.0 || client.is_empty() {
            return 1.0;
        }
        (client.width as f32 / w).min(client.height as f32 / h)
    }

    /// Translation actually applied; fitting to the client area centers the image
    fn effective_translation(&self) -> PointF {
        if self.scale_to_fit {
            PointF::default()
        } else {
            self.translation
        }
    }

    /// Integer orientation matrix `F * R` as `[[a, b], [c, d]]`
    pub fn orientation_matrix(&self) -> [[i32; 2]; 2] {
        orientation_matrix(self.rotation, self.flip_x, self.flip_y)
    }

    fn matrix(&self) -> [[f64; 2]; 2] {
        let theta = (self.rotation as f64).to_radians();
        let (sin, cos) = (theta.sin(), theta.cos());
        let fx = if self.flip_y { -1.0 } else { 1.0 };
        let fy = if self.flip_x { -1.0 } else { 1.0 };
        [[fx * cos, -fx * sin], [fy * sin, fy * cos]]
    }

    fn image_center(&self) -> PointF {
        PointF::new(self.image_size.width / 2.0, self.image_size.height / 2.0)
    }

    fn client_center(&self) -> PointF {
        RectF::from(self.client_rectangle).center()
    }

    pub fn convert_to_destination(&self, p: PointF) -> PointF {
        let m = self.matrix();
        let s = self.effective_scale() as f64;
        let t = self.effective_translation();
        let ic = self.image_center();
        let cc = self.client_center();
        let vx = (p.x - ic.x + t.x) as f64;
        let vy = (p.y - ic.y + t.y) as f64;
        PointF::new(
            cc.x + (s * (m[0][0] * vx + m[0][1] * vy)) as f32,
            cc.y + (s * (m[1][0] * vx + m[1][1] * vy)) as f32,
        )
    }

    pub fn convert_to_source(&self, p: PointF) -> PointF {
        let m = self.matrix();
        let s = self.effective_scale() as f64;
        let t = self.effective_translation();
        let ic = self.image_center();
        let cc = self.client_center();
        let dx = (p.x - cc.x) as f64 / s;
        let dy = (p.y - cc.y) as f64 / s;
        // F * R is orthogonal, so its inverse is its transpose
        let vx = m[0][0] * dx + m[1][0] * dy;
        let vy = m[0][1] * dx + m[1][1] * dy;
        PointF::new(vx as f32 + ic.x - t.x, vy as f32 + ic.y - t.y)
    }

    /// Maps a rectangle; the result spans the transformed corners
    pub fn convert_rect_to_destination(&self, r: RectF) -> RectF {
        let corners = r.corners().map(|c| self.convert_to_destination(c));
        RectF::bounding(&corners).unwrap_or_default()
    }

    pub fn convert_rect_to_source(&self, r: RectF) -> RectF {
        let corners = r.corners().map(|c| self.convert_to_source(c));
        RectF::bounding(&corners).unwrap_or_default()
    }

    /// DICOM rotation and flip for this transform
    pub fn dicom_orientation(&self) -> DicomOrientation {
        encode_orientation(self.rotation, self.flip_x, self.flip_y)
    }

    /// Applies a DICOM rotation and flip, turning off scale to fit
    pub fn apply_dicom_orientation(&mut self, orientation: DicomOrientation) {
        let (rotation, flip_x, flip_y) = decode_orientation(orientation);
        self.scale_to_fit = false;
        self.rotation = rotation;
        self.flip_x = flip_x;
        self.flip_y = flip_y;
    }

    /// Restores the default fit-to-client state
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.translation = PointF::default();
        self.rotation = 0;
        self.flip_x = false;
        self.flip_y = false;
        self.scale_to_fit = true;
    }
}

/// Integer orientation matrix for a rotation (multiple of 90) and flips
pub fn orientation_matrix(rotation: i32, flip_x: bool, flip_y: bool) -> [[i32; 2]; 2] {
    let (cos, sin) = match normalize_rotation(rotation) / 90 {
        0 => (1, 0),
        1 => (0, 1),
        2 => (-1, 0),
        _ => (0, -1),
    };
    let fx = if flip_y { -1 } else { 1 };
    let fy = if flip_x { -1 } else { 1 };
    [[fx * cos, -fx * sin], [fy * sin, fy * cos]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false, false, 0, false)]
    #[case(90, false, false, 90, false)]
    #[case(180, false, false, 180, false)]
    #[case(270, false, false, 270, false)]
    #[case(0, false, true, 0, true)]
    #[case(90, false, true, 270, true)]
    #[case(180, false, true, 180, true)]
    #[case(270, false, true, 90, true)]
    #[case(0, true, false, 180, true)]
    #[case(90, true, false, 90, true)]
    #[case(180, true, false, 0, true)]
    #[case(270, true, false, 270, true)]
    #[case(0, true, true, 180, false)]
    #[case(90, true, true, 270, false)]
    #[case(180, true, true, 0, false)]
    #[case(270, true, true, 90, false)]
    fn test_rotation_flip_table(
        #[case] rotation: i32,
        #[case] flip_x: bool,
        #[case] flip_y: bool,
        #[case] dicom_rotation: i32,
        #[case] horizontal_flip: bool,
    ) {
        let encoded = encode_orientation(rotation, flip_x, flip_y);
        assert_eq!(encoded.rotation, dicom_rotation);
        assert_eq!(encoded.horizontal_flip, horizontal_flip);

        let (r, fx, fy) = decode_orientation(encoded);
        assert_eq!(
            orientation_matrix(r, fx, fy),
            orientation_matrix(rotation, flip_x, flip_y),
            "orientation changed for rotation {} flip_x {} flip_y {}",
            rotation,
            flip_x,
            flip_y
        );
    }

    #[rstest]
    #[case(-90, 270)]
    #[case(450, 90)]
    #[case(-720, 0)]
    fn test_rotation_normalised(#[case] rotation: i32, #[case] expected: i32) {
        assert_eq!(encode_orientation(rotation, false, false).rotation, expected);
    }

    #[test]
    fn test_decode_horizontal_flip() {
        let d = DicomOrientation {
            rotation: 90,
            horizontal_flip: true,
        };
        assert_eq!(decode_orientation(d), (270, false, true));
        let d = DicomOrientation {
            rotation: 0,
            horizontal_flip: true,
        };
        assert_eq!(decode_orientation(d), (0, false, true));
    }

    fn transform() -> SpatialTransform {
        SpatialTransform::new(SizeF::new(100.0, 50.0), Rect::new(0, 0, 200, 200))
    }

    #[test]
    fn test_scale_to_fit() {
        let mut t = transform();
        assert_eq!(t.effective_scale(), 2.0);
        t.rotation = 90;
        assert_eq!(t.effective_scale(), 2.0);
        t.scale_to_fit = false;
        t.scale = 3.0;
        assert_eq!(t.effective_scale(), 3.0);
    }

    #[test]
    fn test_image_fills_client_when_fitted() {
        let t = transform();
        let r = t.convert_rect_to_destination(RectF::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(r, RectF::new(0.0, 50.0, 200.0, 100.0));
    }

    #[test]
    fn test_source_destination_inverse() {
        let mut t = transform();
        t.scale_to_fit = false;
        t.scale = 1.5;
        t.rotation = 90;
        t.flip_y = true;
        t.translation = PointF::new(4.0, -3.0);
        let p = PointF::new(12.0, 33.0);
        let back = t.convert_to_source(t.convert_to_destination(p));
        assert!((back.x - p.x).abs() < 1e-3 && (back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn test_apply_dicom_orientation_disables_fit() {
        let mut t = transform();
        t.apply_dicom_orientation(DicomOrientation {
            rotation: 180,
            horizontal_flip: false,
        });
        assert!(!t.scale_to_fit);
        assert_eq!(t.rotation, 180);
        assert_eq!(t.dicom_orientation().rotation, 180);
    }
}
