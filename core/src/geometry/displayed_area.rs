//! Displayed Area: the visible part of an image and how it is sized into the
//! client rectangle

use crate::error::Result;
use crate::geometry::pixel_address::{from_pixel_address_corners, to_pixel_address_corners};
use crate::geometry::spatial::SpatialTransform;
use crate::types::{Point, PointF, PresentationSizeMode, RectF};
use log::debug;

/// Visible image area in pixel-address form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleArea {
    pub top_left: Point,
    pub bottom_right: Point,
}

/// Computes the pixel-address corners of the part of the image currently
/// visible in the client rectangle
///
/// Fails with `InvalidGeometry` when no pixel of the image is visible.
pub fn visible_area(transform: &SpatialTransform) -> Result<VisibleArea> {
    let size = transform.image_size();
    let image_rect = RectF::new(0.0, 0.0, size.width, size.height);

    let bounds = transform
        .convert_rect_to_destination(image_rect)
        .intersect(&RectF::from(transform.client_rectangle()))
        .to_positive();

    let visible = transform.convert_rect_to_source(bounds).round_inflate();
    let (top_left, bottom_right) = to_pixel_address_corners(visible.truncate())?;
    Ok(VisibleArea {
        top_left,
        bottom_right,
    })
}

/// Source-space rectangle selected by stored pixel-address corners
pub fn displayed_rect(area: &VisibleArea) -> RectF {
    from_pixel_address_corners(area.top_left, area.bottom_right)
}

/// Sizing parameters read from a Displayed Area Selection item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedAreaFit {
    pub size_mode: PresentationSizeMode,
    /// Presentation Pixel Magnification Ratio
    pub magnification: Option<f64>,
    /// Screen pixels per image pixel that show the image at physical size,
    /// when both the presentation pixel spacing and display pitch are known
    pub true_size_scale: Option<f64>,
}

/// Applies a displayed area to a spatial transform
///
/// Magnify uses the stored ratio (default 1). True size uses the physical
/// scale when known and otherwise behaves like scale to fit. Scale to fit
/// picks the largest scale showing the whole area, transposing the area for
/// odd quarter turns; an area equal to the whole image turns on the
/// transform's own fitting instead. Except for that case the area's center is
/// moved to the client center.
pub fn fit_displayed_area(transform: &mut SpatialTransform, area: RectF, fit: &DisplayedAreaFit) {
    let mut center_display = true;

    match (fit.size_mode, fit.true_size_scale) {
        (PresentationSizeMode::Magnify, _) => {
            transform.scale_to_fit = false;
            transform.scale = fit.magnification.unwrap_or(1.0) as f32;
        }
        (PresentationSizeMode::TrueSize, Some(scale)) => {
            transform.scale_to_fit = false;
            transform.scale = scale as f32;
        }
        _ => {
            let size = transform.image_size();
            if area == RectF::new(0.0, 0.0, size.width, size.height) {
                transform.scale_to_fit = true;
                center_display = false;
            } else {
                let client = RectF::from(transform.client_rectangle()).to_positive();
                let (w, h) = if transform.is_transposed() {
                    (area.height, area.width)
                } else {
                    (area.width, area.height)
                };
                transform.scale_to_fit = false;
                if w > 0.0 && h > 0.0 {
                    transform.scale = (client.width / w).min(client.height / h);
                }
            }
        }
    }

    if center_display {
        let image_center = PointF::new(
            transform.image_size().width / 2.0,
            transform.image_size().height / 2.0,
        );
        let area_center = area.center();
        transform.translation = PointF::new(
            image_center.x - area_center.x,
            image_center.y - area_center.y,
        );
    }

    debug!(
        "Displayed area {:?} applied: scale {} (fit {}), translation {}",
        area, transform.scale, transform.scale_to_fit, transform.translation
    );
}
