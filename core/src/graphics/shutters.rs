//! Geometric shutters and the Display Shutter module

use crate::dicom::tags::{
    CENTER_OF_CIRCULAR_SHUTTER, RADIUS_OF_CIRCULAR_SHUTTER, SHUTTER_LEFT_VERTICAL_EDGE,
    SHUTTER_LOWER_HORIZONTAL_EDGE, SHUTTER_PRESENTATION_COLOR_CIELAB_VALUE,
    SHUTTER_PRESENTATION_VALUE, SHUTTER_RIGHT_VERTICAL_EDGE, SHUTTER_SHAPE,
    SHUTTER_UPPER_HORIZONTAL_EDGE, VERTICES_OF_POLYGONAL_SHUTTER,
};
use crate::dicom::{
    get_int_value, get_multi_int_value, get_multi_string_value, get_multi_u16_value,
    get_u16_value, put_is, put_multi_is, put_strs, put_us, remove,
};
use crate::error::{PresentationStateError, Result};
use crate::types::{CieLab, Point, Rect, Rgb, ShutterShape};
use dicom_core::VR;
use dicom_object::InMemDicomObject;

/// One geometric shutter shape, in 1-based image pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum GeometricShutter {
    Circular { center: Point, radius: i32 },
    Rectangular(Rect),
    Polygonal(Vec<Point>),
}

impl GeometricShutter {
    pub fn kind(&self) -> &'static str {
        match self {
            GeometricShutter::Circular { .. } => "circular",
            GeometricShutter::Rectangular(_) => "rectangular",
            GeometricShutter::Polygonal(_) => "polygonal",
        }
    }

    /// Returns whether a pixel is left visible by this shutter
    pub fn exposes(&self, p: Point) -> bool {
        match self {
            GeometricShutter::Circular { center, radius } => {
                let (dx, dy) = ((p.x - center.x) as i64, (p.y - center.y) as i64);
                dx * dx + dy * dy <= (*radius as i64) * (*radius as i64)
            }
            GeometricShutter::Rectangular(r) => {
                let r = r.to_positive();
                p.x >= r.left() && p.x <= r.right() && p.y >= r.top() && p.y <= r.bottom()
            }
            GeometricShutter::Polygonal(vertices) => point_in_polygon(p, vertices),
        }
    }
}

fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let (px, py) = (p.x as f64, p.y as f64);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].x as f64, vertices[i].y as f64);
        let (xj, yj) = (vertices[j].x as f64, vertices[j].y as f64);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A set of geometric shutters applied together
///
/// Shutters read from a presentation state are kept apart from shutters
/// drawn by the user; both apply while the graphic is the active shutter.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricShuttersGraphic {
    rows: usize,
    columns: usize,
    dicom_shutters: Vec<GeometricShutter>,
    custom_shutters: Vec<GeometricShutter>,
    pub presentation_value: u16,
    pub color: Option<Rgb>,
}

impl GeometricShuttersGraphic {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            dicom_shutters: Vec::new(),
            custom_shutters: Vec::new(),
            presentation_value: 0,
            color: None,
        }
    }

    /// Builds the graphic for a decoded Display Shutter module
    pub fn from_display_shutter(shutter: &DisplayShutter, rows: usize, columns: usize) -> Self {
        let mut graphic = Self::new(rows, columns);
        if let Some((center, radius)) = shutter.circular {
            graphic
                .dicom_shutters
                .push(GeometricShutter::Circular { center, radius });
        }
        if let Some(rect) = shutter.rectangular {
            graphic.dicom_shutters.push(GeometricShutter::Rectangular(rect));
        }
        if let Some(vertices) = &shutter.polygonal {
            graphic
                .dicom_shutters
                .push(GeometricShutter::Polygonal(vertices.clone()));
        }
        graphic.presentation_value = shutter.presentation_value.unwrap_or(0);
        graphic.color = shutter.presentation_color.map(|c| c.to_rgb());
        graphic
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn dicom_shutters(&self) -> &[GeometricShutter] {
        &self.dicom_shutters
    }

    pub fn custom_shutters(&self) -> &[GeometricShutter] {
        &self.custom_shutters
    }

    pub fn add_custom_shutter(&mut self, shutter: GeometricShutter) {
        self.custom_shutters.push(shutter);
    }

    pub fn clear_custom_shutters(&mut self) {
        self.custom_shutters.clear();
    }

    /// Custom shutters first, then the ones read from DICOM
    pub fn all_shutters(&self) -> impl Iterator<Item = &GeometricShutter> {
        self.custom_shutters.iter().chain(self.dicom_shutters.iter())
    }

    /// Returns whether a 1-based pixel survives every shutter
    pub fn exposes(&self, p: Point) -> bool {
        self.all_shutters().all(|s| s.exposes(p))
    }
}

/// Display Shutter module values, with at most one shutter of each kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayShutter {
    /// Center as (column, row) and radius
    pub circular: Option<(Point, i32)>,
    /// Left/right vertical and upper/lower horizontal edges
    pub rectangular: Option<Rect>,
    pub polygonal: Option<Vec<Point>>,
    pub presentation_value: Option<u16>,
    pub presentation_color: Option<CieLab>,
}

impl DisplayShutter {
    pub fn is_empty(&self) -> bool {
        self.shape().is_none()
    }

    pub fn shape(&self) -> ShutterShape {
        ShutterShape {
            rectangular: self.rectangular.is_some(),
            circular: self.circular.is_some(),
            polygonal: self.polygonal.is_some(),
            bitmap: false,
        }
    }

    /// Reads the geometric part of a Display Shutter module
    ///
    /// Returns `None` when the data set declares no geometric shape. A
    /// declared shape with missing or malformed values is an error.
    pub fn read(dcm: &InMemDicomObject) -> Result<Option<Self>> {
        let codes = get_multi_string_value(dcm, SHUTTER_SHAPE).unwrap_or_default();
        let shape = ShutterShape::from_codes(&codes);
        if !shape.is_geometric() {
            return Ok(None);
        }

        let missing = |what: &str| {
            PresentationStateError::TagNotFound(format!("{} shutter attributes", what))
        };

        let mut shutter = DisplayShutter::default();
        if shape.circular {
            let center = get_multi_int_value(dcm, CENTER_OF_CIRCULAR_SHUTTER)
                .filter(|v| v.len() >= 2)
                .ok_or_else(|| missing("circular"))?;
            let radius =
                get_int_value(dcm, RADIUS_OF_CIRCULAR_SHUTTER).ok_or_else(|| missing("circular"))?;
            shutter.circular = Some((Point::new(center[1], center[0]), radius));
        }
        if shape.rectangular {
            let edge = |tag| get_int_value(dcm, tag).ok_or_else(|| missing("rectangular"));
            shutter.rectangular = Some(Rect::from_ltrb(
                edge(SHUTTER_LEFT_VERTICAL_EDGE)?,
                edge(SHUTTER_UPPER_HORIZONTAL_EDGE)?,
                edge(SHUTTER_RIGHT_VERTICAL_EDGE)?,
                edge(SHUTTER_LOWER_HORIZONTAL_EDGE)?,
            ));
        }
        if shape.polygonal {
            let values = get_multi_int_value(dcm, VERTICES_OF_POLYGONAL_SHUTTER)
                .filter(|v| v.len() >= 6 && v.len() % 2 == 0)
                .ok_or_else(|| missing("polygonal"))?;
            shutter.polygonal = Some(
                values
                    .chunks(2)
                    .map(|rc| Point::new(rc[1], rc[0]))
                    .collect(),
            );
        }
        shutter.presentation_value = get_u16_value(dcm, SHUTTER_PRESENTATION_VALUE);
        shutter.presentation_color = get_multi_u16_value(dcm, SHUTTER_PRESENTATION_COLOR_CIELAB_VALUE)
            .filter(|v| v.len() == 3)
            .map(|v| CieLab::new(v[0], v[1], v[2]));
        Ok(Some(shutter))
    }

    /// Writes the module, or removes it when no shape is set
    pub fn write(&self, dcm: &mut InMemDicomObject) {
        Self::delete(dcm);
        if self.is_empty() {
            return;
        }

        put_strs(dcm, SHUTTER_SHAPE, VR::CS, &self.shape().codes());
        if let Some((center, radius)) = self.circular {
            put_multi_is(dcm, CENTER_OF_CIRCULAR_SHUTTER, &[center.y, center.x]);
            put_is(dcm, RADIUS_OF_CIRCULAR_SHUTTER, radius);
        }
        if let Some(r) = self.rectangular {
            put_is(dcm, SHUTTER_LEFT_VERTICAL_EDGE, r.left());
            put_is(dcm, SHUTTER_RIGHT_VERTICAL_EDGE, r.right());
            put_is(dcm, SHUTTER_UPPER_HORIZONTAL_EDGE, r.top());
            put_is(dcm, SHUTTER_LOWER_HORIZONTAL_EDGE, r.bottom());
        }
        if let Some(vertices) = &self.polygonal {
            let values: Vec<i32> = vertices.iter().flat_map(|p| [p.y, p.x]).collect();
            put_multi_is(dcm, VERTICES_OF_POLYGONAL_SHUTTER, &values);
        }
        put_us(
            dcm,
            SHUTTER_PRESENTATION_VALUE,
            &[self.presentation_value.unwrap_or(0)],
        );
        if let Some(c) = self.presentation_color {
            put_us(dcm, SHUTTER_PRESENTATION_COLOR_CIELAB_VALUE, &[c.l, c.a, c.b]);
        }
    }

    /// Removes every Display Shutter attribute
    pub fn delete(dcm: &mut InMemDicomObject) {
        for tag in [
            SHUTTER_SHAPE,
            CENTER_OF_CIRCULAR_SHUTTER,
            RADIUS_OF_CIRCULAR_SHUTTER,
            SHUTTER_LEFT_VERTICAL_EDGE,
            SHUTTER_RIGHT_VERTICAL_EDGE,
            SHUTTER_UPPER_HORIZONTAL_EDGE,
            SHUTTER_LOWER_HORIZONTAL_EDGE,
            VERTICES_OF_POLYGONAL_SHUTTER,
        ] {
            remove(dcm, tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rect_shutter() -> DisplayShutter {
        DisplayShutter {
            rectangular: Some(Rect::from_ltrb(10, 20, 100, 200)),
            presentation_value: Some(0),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_read_rectangular() {
        let mut dcm = InMemDicomObject::new_empty();
        rect_shutter().write(&mut dcm);
        assert_eq!(get_int_value(&dcm, SHUTTER_LEFT_VERTICAL_EDGE), Some(10));
        assert_eq!(get_int_value(&dcm, SHUTTER_LOWER_HORIZONTAL_EDGE), Some(200));
        assert_eq!(DisplayShutter::read(&dcm).unwrap(), Some(rect_shutter()));
    }

    #[test]
    fn test_circle_and_polygon_use_row_column_order() {
        let shutter = DisplayShutter {
            circular: Some((Point::new(30, 40), 25)),
            polygonal: Some(vec![Point::new(1, 2), Point::new(10, 2), Point::new(5, 9)]),
            presentation_value: Some(0),
            ..Default::default()
        };
        let mut dcm = InMemDicomObject::new_empty();
        shutter.write(&mut dcm);
        assert_eq!(
            get_multi_int_value(&dcm, CENTER_OF_CIRCULAR_SHUTTER),
            Some(vec![40, 30])
        );
        assert_eq!(
            get_multi_int_value(&dcm, VERTICES_OF_POLYGONAL_SHUTTER),
            Some(vec![2, 1, 2, 10, 9, 5])
        );
        assert_eq!(DisplayShutter::read(&dcm).unwrap(), Some(shutter));
    }

    #[test]
    fn test_empty_shutter_removes_module() {
        let mut dcm = InMemDicomObject::new_empty();
        rect_shutter().write(&mut dcm);
        DisplayShutter::default().write(&mut dcm);
        assert!(DisplayShutter::read(&dcm).unwrap().is_none());
        assert!(get_int_value(&dcm, SHUTTER_LEFT_VERTICAL_EDGE).is_none());
    }

    #[test]
    fn test_declared_shape_without_values_is_error() {
        let mut dcm = InMemDicomObject::new_empty();
        put_strs(&mut dcm, SHUTTER_SHAPE, VR::CS, &["CIRCULAR".to_string()]);
        assert!(DisplayShutter::read(&dcm).is_err());
    }

    #[test]
    fn test_bitmap_only_is_not_geometric() {
        let mut dcm = InMemDicomObject::new_empty();
        put_strs(&mut dcm, SHUTTER_SHAPE, VR::CS, &["BITMAP".to_string()]);
        assert!(DisplayShutter::read(&dcm).unwrap().is_none());
    }

    #[rstest]
    #[case(Point::new(50, 50), true)]
    #[case(Point::new(10, 20), true)]
    #[case(Point::new(9, 50), false)]
    #[case(Point::new(50, 201), false)]
    fn test_rectangular_exposes(#[case] p: Point, #[case] expected: bool) {
        let s = GeometricShutter::Rectangular(Rect::from_ltrb(10, 20, 100, 200));
        assert_eq!(s.exposes(p), expected);
    }

    #[test]
    fn test_graphic_combines_shutters() {
        let mut g = GeometricShuttersGraphic::from_display_shutter(&rect_shutter(), 256, 256);
        assert_eq!(g.dicom_shutters().len(), 1);
        g.add_custom_shutter(GeometricShutter::Circular {
            center: Point::new(50, 50),
            radius: 10,
        });
        assert!(g.exposes(Point::new(55, 55)));
        assert!(!g.exposes(Point::new(90, 90)));
        assert_eq!(g.all_shutters().next().map(|s| s.kind()), Some("circular"));
    }
}
