//! Plain geometric value types shared by the codec, geometry helpers and
//! graphics plane.
//!
//! Rectangles keep a signed size so a rectangle drawn "backwards" (bottom-right
//! to top-left) is representable; [`Rect::to_positive`] canonicalises it.

use std::fmt;

/// A point in floating-point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: PointF) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Display for PointF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A point in integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for PointF {
    fn from(p: Point) -> Self {
        PointF::new(p.x as f32, p.y as f32)
    }
}

/// A floating-point size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeF {
    pub width: f32,
    pub height: f32,
}

impl SizeF {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An integer rectangle, possibly with negative width/height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from its edges
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Absolute area; zero when either extent is zero
    pub fn area(&self) -> i64 {
        (self.width as i64 * self.height as i64).abs()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the same rectangle with non-negative width and height
    pub fn to_positive(&self) -> Self {
        Self::from_ltrb(
            self.left().min(self.right()),
            self.top().min(self.bottom()),
            self.left().max(self.right()),
            self.top().max(self.bottom()),
        )
    }

    /// Returns whether a point lies inside the (positive) rectangle
    pub fn contains(&self, p: Point) -> bool {
        let r = self.to_positive();
        p.x >= r.left() && p.x < r.right() && p.y >= r.top() && p.y < r.bottom()
    }
}

impl From<Rect> for RectF {
    fn from(r: Rect) -> Self {
        RectF::new(r.x as f32, r.y as f32, r.width as f32, r.height as f32)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}x{}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// A floating-point rectangle, possibly with negative width/height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// Smallest rectangle containing all the given points
    pub fn bounding(points: &[PointF]) -> Option<Self> {
        let first = points.first()?;
        let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            l = l.min(p.x);
            t = t.min(p.y);
            r = r.max(p.x);
            b = b.max(p.y);
        }
        Some(Self::from_ltrb(l, t, r, b))
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> PointF {
        PointF::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    pub fn to_positive(&self) -> Self {
        Self::from_ltrb(
            self.left().min(self.right()),
            self.top().min(self.bottom()),
            self.left().max(self.right()),
            self.top().max(self.bottom()),
        )
    }

    /// Intersection of two rectangles; both are made positive first.
    /// Disjoint rectangles yield an empty rectangle.
    pub fn intersect(&self, other: &RectF) -> RectF {
        let a = self.to_positive();
        let b = other.to_positive();
        let l = a.left().max(b.left());
        let t = a.top().max(b.top());
        let r = a.right().min(b.right());
        let bo = a.bottom().min(b.bottom());
        if r <= l || bo <= t {
            return RectF::default();
        }
        RectF::from_ltrb(l, t, r, bo)
    }

    /// Expands outwards to whole-number edges
    pub fn round_inflate(&self) -> RectF {
        let p = self.to_positive();
        RectF::from_ltrb(
            p.left().floor(),
            p.top().floor(),
            p.right().ceil(),
            p.bottom().ceil(),
        )
    }

    /// Truncates each component towards zero
    pub fn truncate(&self) -> Rect {
        Rect::new(
            self.x.trunc() as i32,
            self.y.trunc() as i32,
            self.width.trunc() as i32,
            self.height.trunc() as i32,
        )
    }

    pub fn corners(&self) -> [PointF; 4] {
        [
            PointF::new(self.left(), self.top()),
            PointF::new(self.right(), self.top()),
            PointF::new(self.right(), self.bottom()),
            PointF::new(self.left(), self.bottom()),
        ]
    }
}

/// 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Default color of user-created overlays
    pub const PEACH_PUFF: Rgb = Rgb::new(255, 218, 185);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts to a DICOM-encoded CIELab triplet
    pub fn to_cielab(&self) -> CieLab {
        fn linear(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        fn f(t: f64) -> f64 {
            if t > 216.0 / 24389.0 {
                t.cbrt()
            } else {
                (24389.0 / 27.0 * t + 16.0) / 116.0
            }
        }

        let (r, g, b) = (linear(self.r), linear(self.g), linear(self.b));
        let x = (0.4124 * r + 0.3576 * g + 0.1805 * b) / WHITE_X;
        let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        let z = (0.0193 * r + 0.1192 * g + 0.9505 * b) / WHITE_Z;

        let (fx, fy, fz) = (f(x), f(y), f(z));
        CieLab::from_lab(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

const WHITE_X: f64 = 0.95047;
const WHITE_Z: f64 = 1.08883;

/// CIELab color in the DICOM encoding (PS 3.3 C.10.7.1.1): L* scaled from
/// 0..100 and a*, b* from -128..127 onto 0..65535
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct CieLab {
    pub l: u16,
    pub a: u16,
    pub b: u16,
}

impl CieLab {
    pub fn new(l: u16, a: u16, b: u16) -> Self {
        Self { l, a, b }
    }

    /// Encodes unscaled L*a*b* values
    pub fn from_lab(l: f64, a: f64, b: f64) -> Self {
        let scale = |v: f64, lo: f64, hi: f64| {
            (((v - lo) / (hi - lo)) * 65535.0).round().clamp(0.0, 65535.0) as u16
        };
        Self {
            l: scale(l, 0.0, 100.0),
            a: scale(a, -128.0, 127.0),
            b: scale(b, -128.0, 127.0),
        }
    }

    /// Decodes to unscaled L*a*b* values
    pub fn to_lab(&self) -> (f64, f64, f64) {
        let unscale = |v: u16, lo: f64, hi: f64| lo + (v as f64 / 65535.0) * (hi - lo);
        (
            unscale(self.l, 0.0, 100.0),
            unscale(self.a, -128.0, 127.0),
            unscale(self.b, -128.0, 127.0),
        )
    }

    /// Converts to the nearest sRGB color
    pub fn to_rgb(&self) -> Rgb {
        fn finv(t: f64) -> f64 {
            if t > 6.0 / 29.0 {
                t.powi(3)
            } else {
                3.0 * (6.0f64 / 29.0).powi(2) * (t - 4.0 / 29.0)
            }
        }
        fn gamma(c: f64) -> u8 {
            let c = if c <= 0.0031308 {
                12.92 * c
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            };
            (c * 255.0).round().clamp(0.0, 255.0) as u8
        }

        let (l, a, b) = self.to_lab();
        let fy = (l + 16.0) / 116.0;
        let x = WHITE_X * finv(fy + a / 500.0);
        let y = finv(fy);
        let z = WHITE_Z * finv(fy - b / 200.0);

        let r = 3.2406 * x - 1.5372 * y - 0.4986 * z;
        let g = -0.9689 * x + 1.8758 * y + 0.0415 * z;
        let bl = 0.0557 * x - 0.2040 * y + 1.0570 * z;
        Rgb::new(gamma(r), gamma(g), gamma(bl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_to_positive() {
        let r = Rect::new(10, 10, -5, -5).to_positive();
        assert_eq!(r, Rect::new(5, 5, 5, 5));
        assert_eq!(Rect::new(1, 1, 2, 3).to_positive(), Rect::new(1, 1, 2, 3));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(0, 0, 4, 4);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(3, 3)));
        assert!(!r.contains(Point::new(4, 0)));
    }

    #[test]
    fn test_rectf_intersect() {
        let a = RectF::new(0.0, 0.0, 10.0, 10.0);
        let b = RectF::new(15.0, 15.0, -10.0, -10.0);
        assert_eq!(a.intersect(&b), RectF::from_ltrb(5.0, 5.0, 10.0, 10.0));

        let disjoint = RectF::new(20.0, 20.0, 1.0, 1.0);
        assert!(a.intersect(&disjoint).is_empty());
    }

    #[test]
    fn test_round_inflate_and_truncate() {
        let r = RectF::from_ltrb(0.4, 1.6, 9.2, 9.9).round_inflate();
        assert_eq!(r, RectF::from_ltrb(0.0, 1.0, 10.0, 10.0));
        assert_eq!(r.truncate(), Rect::new(0, 1, 10, 9));
    }

    #[test]
    fn test_bounding() {
        let pts = [PointF::new(3.0, 1.0), PointF::new(-1.0, 4.0)];
        assert_eq!(
            RectF::bounding(&pts),
            Some(RectF::from_ltrb(-1.0, 1.0, 3.0, 4.0))
        );
        assert_eq!(RectF::bounding(&[]), None);
    }

    #[test]
    fn test_cielab_white_and_black() {
        let white = Rgb::WHITE.to_cielab();
        assert_eq!(white.l, 65535);
        let black = Rgb::BLACK.to_cielab();
        assert_eq!(black.l, 0);
        assert_eq!(black.to_rgb(), Rgb::BLACK);
    }

    #[test]
    fn test_cielab_round_trip_close() {
        let c = Rgb::PEACH_PUFF;
        let back = c.to_cielab().to_rgb();
        assert!((back.r as i32 - c.r as i32).abs() <= 2);
        assert!((back.g as i32 - c.g as i32).abs() <= 2);
        assert!((back.b as i32 - c.b as i32).abs() <= 2);
    }
}
