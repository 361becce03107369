//! Conversion between 0-based pixel rectangles and DICOM pixel-address
//! rectangles (1-based top left and bottom right hand corners, both inclusive)

use crate::error::{PresentationStateError, Result};
use crate::types::{Point, Rect, RectF};

/// Converts a 0-based rectangle into pixel-address form
///
/// Per axis, a positive extent moves the location by +1 and shrinks the size
/// by 1; a non-positive extent keeps the location and grows the size by 1.
/// The top left hand corner is the resulting location and the bottom right
/// hand corner is location + size. A zero-area rectangle has no pixel-address
/// form.
pub fn to_pixel_address_rectangle(rect: Rect) -> Result<Rect> {
    if rect.area() == 0 {
        return Err(PresentationStateError::InvalidGeometry(format!(
            "zero-area rectangle {} cannot be specified as a pixel address rectangle",
            rect
        )));
    }

    let (dx, dw) = if rect.width > 0 { (1, -1) } else { (0, 1) };
    let (dy, dh) = if rect.height > 0 { (1, -1) } else { (0, 1) };

    Ok(Rect::new(
        rect.x + dx,
        rect.y + dy,
        rect.width + dw,
        rect.height + dh,
    ))
}

/// Top left and bottom right hand corners of a pixel-address rectangle
pub fn to_pixel_address_corners(rect: Rect) -> Result<(Point, Point)> {
    let r = to_pixel_address_rectangle(rect)?;
    Ok((Point::new(r.left(), r.top()), Point::new(r.right(), r.bottom())))
}

/// Inverse of [`to_pixel_address_corners`]: a positive 0-based rectangle
/// covering the pixels addressed by the two corners
pub fn from_pixel_address_corners(tlhc: Point, brhc: Point) -> RectF {
    let r = RectF::from_ltrb(tlhc.x as f32, tlhc.y as f32, brhc.x as f32, brhc.y as f32)
        .to_positive();
    RectF::new(r.x - 1.0, r.y - 1.0, r.width + 1.0, r.height + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Rect::new(0, 0, 512, 512), Rect::new(1, 1, 511, 511))]
    #[case(Rect::new(10, 20, 1, 1), Rect::new(11, 21, 0, 0))]
    #[case(Rect::new(10, 20, -5, 5), Rect::new(10, 21, -4, 4))]
    #[case(Rect::new(10, 20, 5, -5), Rect::new(11, 20, 4, -4))]
    #[case(Rect::new(10, 20, -5, -5), Rect::new(10, 20, -4, -4))]
    fn test_offset_rule(#[case] input: Rect, #[case] expected: Rect) {
        assert_eq!(to_pixel_address_rectangle(input).unwrap(), expected);
    }

    #[rstest]
    #[case(Rect::new(3, 3, 0, 10))]
    #[case(Rect::new(3, 3, 10, 0))]
    #[case(Rect::new(0, 0, 0, 0))]
    fn test_zero_area_is_invalid(#[case] input: Rect) {
        let err = to_pixel_address_rectangle(input).unwrap_err();
        assert!(matches!(err, PresentationStateError::InvalidGeometry(_)));
    }

    #[test]
    fn test_whole_image_corners() {
        let (tl, br) = to_pixel_address_corners(Rect::new(0, 0, 640, 480)).unwrap();
        assert_eq!(tl, Point::new(1, 1));
        assert_eq!(br, Point::new(640, 480));
    }

    #[rstest]
    #[case(Rect::new(0, 0, 640, 480))]
    #[case(Rect::new(17, 5, 3, 9))]
    #[case(Rect::new(100, 50, 1, 1))]
    fn test_corners_invert(#[case] rect: Rect) {
        let (tl, br) = to_pixel_address_corners(rect).unwrap();
        assert_eq!(from_pixel_address_corners(tl, br), RectF::from(rect));
    }

    #[test]
    fn test_reversed_corners_are_normalised() {
        let r = from_pixel_address_corners(Point::new(640, 480), Point::new(1, 1));
        assert_eq!(r, RectF::new(0.0, 0.0, 640.0, 480.0));
    }
}
