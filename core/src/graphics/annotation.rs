//! Vector annotations and their Graphic Annotation encoding
//!
//! Each [`Graphic`] variant knows how to write itself into the graphic and
//! text objects of one Graphic Annotation Sequence item, and how it is
//! rebuilt from them. Graphics with no DICOM form are kept as
//! [`Graphic::Unsupported`] and skipped when writing.

use crate::dicom::tags::{
    ANCHOR_POINT, ANCHOR_POINT_ANNOTATION_UNITS, ANCHOR_POINT_VISIBILITY,
    BOUNDING_BOX_ANNOTATION_UNITS, BOUNDING_BOX_BOTTOM_RIGHT_HAND_CORNER,
    BOUNDING_BOX_TEXT_HORIZONTAL_JUSTIFICATION, BOUNDING_BOX_TOP_LEFT_HAND_CORNER,
    GRAPHIC_ANNOTATION_UNITS, GRAPHIC_DATA, GRAPHIC_DIMENSIONS, GRAPHIC_FILLED,
    GRAPHIC_OBJECT_SEQUENCE, GRAPHIC_TYPE, NUMBER_OF_GRAPHIC_POINTS, TEXT_OBJECT_SEQUENCE,
    UNFORMATTED_TEXT_VALUE,
};
use crate::dicom::{
    get_items, get_multi_float_value, get_string_value, put_fl, put_sequence, put_str, put_us,
};
use crate::error::{PresentationStateError, Result};
use crate::types::{AnnotationUnits, GraphicType, PointF, RectF};
use dicom_core::VR;
use dicom_object::InMemDicomObject;
use log::{debug, warn};

/// Offset of a callout's text from its subject when no bounding box is given
const CALLOUT_TEXT_OFFSET: f32 = 30.0;

/// Tolerance for comparing the end points of a closed outline
const POINT_TOLERANCE: f32 = 1e-4;

/// A vector annotation in image (source) coordinates
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum Graphic {
    /// Open or closed outline; a closed outline does not repeat its first
    /// vertex
    Polyline { points: Vec<PointF>, closed: bool },
    /// Curve through the given points
    Interpolated { points: Vec<PointF> },
    Point(PointF),
    Circle { center: PointF, radius: f32 },
    Ellipse {
        major_axis: [PointF; 2],
        minor_axis: [PointF; 2],
    },
    Text { location: PointF, text: String },
    Callout {
        anchor: PointF,
        text_location: PointF,
        text: String,
    },
    /// Several graphics stored in one annotation item
    Annotation(Vec<Graphic>),
    /// A graphic with no Graphic Annotation form
    Unsupported { kind: String },
}

impl Graphic {
    /// Short name used in log messages
    pub fn kind(&self) -> &str {
        match self {
            Graphic::Polyline { .. } => "polyline",
            Graphic::Interpolated { .. } => "interpolated",
            Graphic::Point(_) => "point",
            Graphic::Circle { .. } => "circle",
            Graphic::Ellipse { .. } => "ellipse",
            Graphic::Text { .. } => "text",
            Graphic::Callout { .. } => "callout",
            Graphic::Annotation(_) => "annotation",
            Graphic::Unsupported { kind } => kind.as_str(),
        }
    }

    /// Appends this graphic's objects to an annotation item
    ///
    /// Returns whether anything was written. Unsupported graphics and
    /// graphics with too few points write nothing.
    pub fn serialize(&self, content: &mut AnnotationContent) -> bool {
        match self {
            Graphic::Polyline { points, closed } => {
                let mut data = points.clone();
                if *closed {
                    if let (Some(first), Some(last)) = (points.first(), points.last()) {
                        if !same_point(*first, *last) {
                            data.push(*first);
                        }
                    }
                }
                content.push_graphic(GraphicType::Polyline, data)
            }
            Graphic::Interpolated { points } => {
                content.push_graphic(GraphicType::Interpolated, points.clone())
            }
            Graphic::Point(p) => content.push_graphic(GraphicType::Point, vec![*p]),
            Graphic::Circle { center, radius } => {
                let edge = PointF::new(center.x + radius, center.y);
                content.push_graphic(GraphicType::Circle, vec![*center, edge])
            }
            Graphic::Ellipse {
                major_axis,
                minor_axis,
            } => content.push_graphic(
                GraphicType::Ellipse,
                vec![major_axis[0], major_axis[1], minor_axis[0], minor_axis[1]],
            ),
            Graphic::Text { location, text } => {
                content.text_objects.push(TextObject {
                    text: text.clone(),
                    bounding_box: Some((*location, *location)),
                    ..Default::default()
                });
                true
            }
            Graphic::Callout {
                anchor,
                text_location,
                text,
            } => {
                content.text_objects.push(TextObject {
                    text: text.clone(),
                    bounding_box: Some((*text_location, *text_location)),
                    anchor: Some(*anchor),
                    anchor_visible: true,
                    ..Default::default()
                });
                true
            }
            Graphic::Annotation(children) => children
                .iter()
                .fold(false, |written, child| child.serialize(content) | written),
            Graphic::Unsupported { kind } => {
                debug!("No graphic annotation form for {} graphic, skipped", kind);
                false
            }
        }
    }

    /// Points that define the graphic's extent
    pub fn control_points(&self) -> Vec<PointF> {
        match self {
            Graphic::Polyline { points, .. } | Graphic::Interpolated { points } => points.clone(),
            Graphic::Point(p) => vec![*p],
            Graphic::Circle { center, radius } => vec![
                PointF::new(center.x - radius, center.y - radius),
                PointF::new(center.x + radius, center.y + radius),
            ],
            Graphic::Ellipse {
                major_axis,
                minor_axis,
            } => vec![major_axis[0], major_axis[1], minor_axis[0], minor_axis[1]],
            Graphic::Text { location, .. } => vec![*location],
            Graphic::Callout {
                anchor,
                text_location,
                ..
            } => vec![*anchor, *text_location],
            Graphic::Annotation(children) => {
                children.iter().flat_map(|c| c.control_points()).collect()
            }
            Graphic::Unsupported { .. } => Vec::new(),
        }
    }

    /// Builds the graphic for one graphic object
    ///
    /// Points must already be in source coordinates.
    pub fn from_graphic_object(graphic_type: GraphicType, points: &[PointF]) -> Result<Self> {
        if points.len() < graphic_type.min_points() {
            return Err(PresentationStateError::InvalidValue(format!(
                "graphic type {} requires at least {} coordinates, got {}",
                graphic_type.code(),
                graphic_type.min_points(),
                points.len()
            )));
        }

        Ok(match graphic_type {
            GraphicType::Point => Graphic::Point(points[0]),
            GraphicType::Polyline => {
                let closed = is_closed(points);
                let mut vertices = points.to_vec();
                if closed {
                    vertices.pop();
                }
                Graphic::Polyline {
                    points: vertices,
                    closed,
                }
            }
            GraphicType::Interpolated => Graphic::Interpolated {
                points: points.to_vec(),
            },
            GraphicType::Circle => Graphic::Circle {
                center: points[0],
                radius: points[0].distance(points[1]),
            },
            GraphicType::Ellipse => Graphic::Ellipse {
                major_axis: [points[0], points[1]],
                minor_axis: [points[2], points[3]],
            },
        })
    }
}

fn same_point(a: PointF, b: PointF) -> bool {
    (a.x - b.x).abs() <= POINT_TOLERANCE && (a.y - b.y).abs() <= POINT_TOLERANCE
}

fn is_closed(points: &[PointF]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 2 => same_point(*first, *last),
        _ => false,
    }
}

/// Maps a point in DISPLAY units onto the displayed area
pub fn display_to_source(displayed_area: &RectF, p: PointF) -> PointF {
    PointF::new(
        displayed_area.x + displayed_area.width * p.x,
        displayed_area.y + displayed_area.height * p.y,
    )
}

/// One item of the Graphic Object Sequence
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicObject {
    pub units: AnnotationUnits,
    pub graphic_type: GraphicType,
    pub points: Vec<PointF>,
    pub filled: bool,
}

impl GraphicObject {
    pub fn read(item: &InMemDicomObject) -> Result<Self> {
        let code = get_string_value(item, GRAPHIC_TYPE)
            .ok_or_else(|| PresentationStateError::TagNotFound("Graphic Type".into()))?;
        let graphic_type = GraphicType::from_code(&code).ok_or_else(|| {
            PresentationStateError::InvalidValue(format!("unknown graphic type '{}'", code))
        })?;
        let data = get_multi_float_value(item, GRAPHIC_DATA)
            .ok_or_else(|| PresentationStateError::TagNotFound("Graphic Data".into()))?;
        if data.len() % 2 != 0 {
            return Err(PresentationStateError::InvalidValue(
                "Graphic Data must hold (column, row) pairs".into(),
            ));
        }

        Ok(Self {
            units: get_string_value(item, GRAPHIC_ANNOTATION_UNITS)
                .map(|s| AnnotationUnits::from_code(&s))
                .unwrap_or_default(),
            graphic_type,
            points: data
                .chunks(2)
                .map(|xy| PointF::new(xy[0] as f32, xy[1] as f32))
                .collect(),
            filled: get_string_value(item, GRAPHIC_FILLED).as_deref() == Some("Y"),
        })
    }

    pub fn to_item(&self) -> InMemDicomObject {
        let mut item = InMemDicomObject::new_empty();
        put_str(&mut item, GRAPHIC_ANNOTATION_UNITS, VR::CS, self.units.code());
        put_us(&mut item, GRAPHIC_DIMENSIONS, &[2]);
        put_us(&mut item, NUMBER_OF_GRAPHIC_POINTS, &[self.points.len() as u16]);
        let data: Vec<f32> = self.points.iter().flat_map(|p| [p.x, p.y]).collect();
        put_fl(&mut item, GRAPHIC_DATA, &data);
        put_str(&mut item, GRAPHIC_TYPE, VR::CS, self.graphic_type.code());
        put_str(&mut item, GRAPHIC_FILLED, VR::CS, if self.filled { "Y" } else { "N" });
        item
    }

    /// Graphic data in source coordinates
    pub fn source_points(&self, displayed_area: &RectF) -> Vec<PointF> {
        match self.units {
            AnnotationUnits::Pixel => self.points.clone(),
            AnnotationUnits::Display => self
                .points
                .iter()
                .map(|p| display_to_source(displayed_area, *p))
                .collect(),
        }
    }
}

/// One item of the Text Object Sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextObject {
    pub text: String,
    /// Top left and bottom right hand corners
    pub bounding_box: Option<(PointF, PointF)>,
    pub bounding_box_units: AnnotationUnits,
    pub anchor: Option<PointF>,
    pub anchor_units: AnnotationUnits,
    pub anchor_visible: bool,
}

impl TextObject {
    pub fn read(item: &InMemDicomObject) -> Result<Self> {
        let point = |tag| {
            get_multi_float_value(item, tag)
                .filter(|v| v.len() >= 2)
                .map(|v| PointF::new(v[0] as f32, v[1] as f32))
        };
        let units = |tag| {
            get_string_value(item, tag)
                .map(|s| AnnotationUnits::from_code(&s))
                .unwrap_or_default()
        };

        let bounding_box = match (
            point(BOUNDING_BOX_TOP_LEFT_HAND_CORNER),
            point(BOUNDING_BOX_BOTTOM_RIGHT_HAND_CORNER),
        ) {
            (Some(tl), Some(br)) => Some((tl, br)),
            _ => None,
        };

        Ok(Self {
            text: get_string_value(item, UNFORMATTED_TEXT_VALUE).unwrap_or_default(),
            bounding_box,
            bounding_box_units: units(BOUNDING_BOX_ANNOTATION_UNITS),
            anchor: point(ANCHOR_POINT),
            anchor_units: units(ANCHOR_POINT_ANNOTATION_UNITS),
            anchor_visible: get_string_value(item, ANCHOR_POINT_VISIBILITY).as_deref() == Some("Y"),
        })
    }

    pub fn to_item(&self) -> InMemDicomObject {
        let mut item = InMemDicomObject::new_empty();
        put_str(&mut item, UNFORMATTED_TEXT_VALUE, VR::ST, &self.text);
        if let Some((tl, br)) = self.bounding_box {
            put_str(
                &mut item,
                BOUNDING_BOX_ANNOTATION_UNITS,
                VR::CS,
                self.bounding_box_units.code(),
            );
            put_fl(&mut item, BOUNDING_BOX_TOP_LEFT_HAND_CORNER, &[tl.x, tl.y]);
            put_fl(&mut item, BOUNDING_BOX_BOTTOM_RIGHT_HAND_CORNER, &[br.x, br.y]);
            put_str(&mut item, BOUNDING_BOX_TEXT_HORIZONTAL_JUSTIFICATION, VR::CS, "LEFT");
        }
        if let Some(anchor) = self.anchor {
            put_str(
                &mut item,
                ANCHOR_POINT_ANNOTATION_UNITS,
                VR::CS,
                self.anchor_units.code(),
            );
            put_fl(&mut item, ANCHOR_POINT, &[anchor.x, anchor.y]);
            put_str(
                &mut item,
                ANCHOR_POINT_VISIBILITY,
                VR::CS,
                if self.anchor_visible { "Y" } else { "N" },
            );
        }
        item
    }

    /// Builds the text or callout graphic for this object
    ///
    /// `annotation_bounds` covers the graphic objects of the same item and
    /// places a callout's text when no bounding box is given.
    pub fn to_graphic(&self, annotation_bounds: Option<RectF>, displayed_area: &RectF) -> Result<Graphic> {
        let to_source = |p: PointF, units: AnnotationUnits| match units {
            AnnotationUnits::Pixel => p,
            AnnotationUnits::Display => display_to_source(displayed_area, p),
        };
        let box_midpoint = self.bounding_box.map(|(tl, br)| {
            let (tl, br) = (
                to_source(tl, self.bounding_box_units),
                to_source(br, self.bounding_box_units),
            );
            PointF::new((tl.x + br.x) / 2.0, (tl.y + br.y) / 2.0)
        });

        match (self.anchor, box_midpoint) {
            (Some(anchor), midpoint) => {
                let anchor = to_source(anchor, self.anchor_units);
                let text_location = midpoint.unwrap_or_else(|| {
                    let origin = annotation_bounds
                        .filter(|b| !b.is_empty())
                        .map(|b| PointF::new(b.x, b.y))
                        .unwrap_or(anchor);
                    PointF::new(origin.x - CALLOUT_TEXT_OFFSET, origin.y - CALLOUT_TEXT_OFFSET)
                });
                Ok(Graphic::Callout {
                    anchor,
                    text_location,
                    text: self.text.clone(),
                })
            }
            (None, Some(location)) => Ok(Graphic::Text {
                location,
                text: self.text.clone(),
            }),
            (None, None) => Err(PresentationStateError::InvalidValue(
                "text object defines neither an anchor point nor a bounding box".into(),
            )),
        }
    }
}

/// Graphic and text objects of one Graphic Annotation Sequence item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationContent {
    pub graphic_objects: Vec<GraphicObject>,
    pub text_objects: Vec<TextObject>,
}

impl AnnotationContent {
    pub fn is_empty(&self) -> bool {
        self.graphic_objects.is_empty() && self.text_objects.is_empty()
    }

    fn push_graphic(&mut self, graphic_type: GraphicType, points: Vec<PointF>) -> bool {
        if points.len() < graphic_type.min_points() {
            debug!(
                "Skipping {} with {} points",
                graphic_type.code(),
                points.len()
            );
            return false;
        }
        self.graphic_objects.push(GraphicObject {
            units: AnnotationUnits::Pixel,
            graphic_type,
            points,
            filled: false,
        });
        true
    }

    /// Reads the object sequences of an annotation item
    ///
    /// Objects that cannot be read are logged and skipped.
    pub fn read(item: &InMemDicomObject) -> Self {
        let mut content = Self::default();
        for obj in get_items(item, GRAPHIC_OBJECT_SEQUENCE).unwrap_or_default() {
            match GraphicObject::read(obj) {
                Ok(g) => content.graphic_objects.push(g),
                Err(e) => warn!("Skipping unreadable graphic object: {}", e),
            }
        }
        for obj in get_items(item, TEXT_OBJECT_SEQUENCE).unwrap_or_default() {
            match TextObject::read(obj) {
                Ok(t) => content.text_objects.push(t),
                Err(e) => warn!("Skipping unreadable text object: {}", e),
            }
        }
        content
    }

    /// Writes the object sequences into an annotation item
    pub fn write(&self, item: &mut InMemDicomObject) {
        if !self.graphic_objects.is_empty() {
            put_sequence(
                item,
                GRAPHIC_OBJECT_SEQUENCE,
                self.graphic_objects.iter().map(GraphicObject::to_item).collect(),
            );
        }
        if !self.text_objects.is_empty() {
            put_sequence(
                item,
                TEXT_OBJECT_SEQUENCE,
                self.text_objects.iter().map(TextObject::to_item).collect(),
            );
        }
    }

    /// Rebuilds the annotation described by this item
    ///
    /// Every object that fails to convert is logged and left out. Returns
    /// `None` when nothing usable remains.
    pub fn to_graphic(&self, displayed_area: &RectF) -> Option<Graphic> {
        let mut graphics = Vec::new();
        let mut data_points = Vec::new();

        for obj in &self.graphic_objects {
            let points = obj.source_points(displayed_area);
            match Graphic::from_graphic_object(obj.graphic_type, &points) {
                Ok(g) => {
                    graphics.push(g);
                    data_points.extend(points);
                }
                Err(e) => warn!(
                    "Presentation state graphic object ({}) not deserialized: {}",
                    obj.graphic_type.code(),
                    e
                ),
            }
        }

        let bounds = RectF::bounding(&data_points);
        for obj in &self.text_objects {
            match obj.to_graphic(bounds, displayed_area) {
                Ok(g) => graphics.push(g),
                Err(e) => warn!("Presentation state text object not deserialized: {}", e),
            }
        }

        match graphics.len() {
            0 => None,
            1 => graphics.pop(),
            _ => Some(Graphic::Annotation(graphics)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn area() -> RectF {
        RectF::new(0.0, 0.0, 512.0, 512.0)
    }

    fn round_trip(graphic: &Graphic) -> Option<Graphic> {
        let mut content = AnnotationContent::default();
        assert!(graphic.serialize(&mut content));
        let mut item = InMemDicomObject::new_empty();
        content.write(&mut item);
        AnnotationContent::read(&item).to_graphic(&area())
    }

    #[rstest]
    #[case(Graphic::Point(PointF::new(3.0, 4.0)))]
    #[case(Graphic::Polyline { points: vec![PointF::new(0.0, 0.0), PointF::new(10.0, 5.0)], closed: false })]
    #[case(Graphic::Polyline {
        points: vec![PointF::new(0.0, 0.0), PointF::new(10.0, 0.0), PointF::new(10.0, 10.0)],
        closed: true,
    })]
    #[case(Graphic::Circle { center: PointF::new(50.0, 50.0), radius: 12.0 })]
    #[case(Graphic::Callout {
        anchor: PointF::new(5.0, 5.0),
        text_location: PointF::new(40.0, 40.0),
        text: "lesion".into(),
    })]
    fn test_graphic_survives_annotation_item(#[case] graphic: Graphic) {
        assert_eq!(round_trip(&graphic), Some(graphic));
    }

    #[test]
    fn test_closed_polyline_repeats_first_vertex() {
        let graphic = Graphic::Polyline {
            points: vec![PointF::new(0.0, 0.0), PointF::new(4.0, 0.0), PointF::new(4.0, 4.0)],
            closed: true,
        };
        let mut content = AnnotationContent::default();
        graphic.serialize(&mut content);
        let obj = &content.graphic_objects[0];
        assert_eq!(obj.points.len(), 4);
        assert_eq!(obj.points[3], PointF::new(0.0, 0.0));
    }

    #[test]
    fn test_unsupported_graphic_writes_nothing() {
        let mut content = AnnotationContent::default();
        let graphic = Graphic::Unsupported {
            kind: "ruler".into(),
        };
        assert!(!graphic.serialize(&mut content));
        assert!(content.is_empty());
    }

    #[test]
    fn test_display_units_map_onto_displayed_area() {
        let obj = GraphicObject {
            units: AnnotationUnits::Display,
            graphic_type: GraphicType::Point,
            points: vec![PointF::new(0.5, 0.25)],
            filled: false,
        };
        let displayed = RectF::new(100.0, 100.0, 200.0, 400.0);
        assert_eq!(obj.source_points(&displayed), vec![PointF::new(200.0, 200.0)]);
    }

    #[rstest]
    #[case(GraphicType::Point, 0)]
    #[case(GraphicType::Polyline, 1)]
    #[case(GraphicType::Circle, 1)]
    #[case(GraphicType::Ellipse, 3)]
    fn test_too_few_points_is_error(#[case] graphic_type: GraphicType, #[case] count: usize) {
        let points = vec![PointF::new(1.0, 1.0); count];
        assert!(Graphic::from_graphic_object(graphic_type, &points).is_err());
    }

    #[test]
    fn test_circle_radius_is_distance() {
        let g = Graphic::from_graphic_object(
            GraphicType::Circle,
            &[PointF::new(0.0, 0.0), PointF::new(3.0, 4.0)],
        )
        .unwrap();
        assert_eq!(
            g,
            Graphic::Circle {
                center: PointF::new(0.0, 0.0),
                radius: 5.0
            }
        );
    }

    #[test]
    fn test_callout_without_box_is_offset_from_bounds() {
        let text = TextObject {
            text: "note".into(),
            anchor: Some(PointF::new(100.0, 100.0)),
            ..Default::default()
        };
        let bounds = RectF::new(50.0, 60.0, 10.0, 10.0);
        match text.to_graphic(Some(bounds), &area()).unwrap() {
            Graphic::Callout { text_location, .. } => {
                assert_eq!(text_location, PointF::new(20.0, 30.0))
            }
            other => panic!("unexpected {:?}", other),
        }
        match text.to_graphic(None, &area()).unwrap() {
            Graphic::Callout { text_location, .. } => {
                assert_eq!(text_location, PointF::new(70.0, 70.0))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_text_without_anchor_or_box_is_error() {
        let text = TextObject {
            text: "orphan".into(),
            ..Default::default()
        };
        assert!(text.to_graphic(None, &area()).is_err());
    }

    #[test]
    fn test_bad_objects_are_skipped() {
        let content = AnnotationContent {
            graphic_objects: vec![
                GraphicObject {
                    units: AnnotationUnits::Pixel,
                    graphic_type: GraphicType::Ellipse,
                    points: vec![PointF::new(0.0, 0.0)],
                    filled: false,
                },
                GraphicObject {
                    units: AnnotationUnits::Pixel,
                    graphic_type: GraphicType::Point,
                    points: vec![PointF::new(7.0, 8.0)],
                    filled: false,
                },
            ],
            text_objects: vec![TextObject::default()],
        };
        assert_eq!(
            content.to_graphic(&area()),
            Some(Graphic::Point(PointF::new(7.0, 8.0)))
        );
    }

    #[test]
    fn test_composite_annotation() {
        let graphic = Graphic::Annotation(vec![
            Graphic::Point(PointF::new(1.0, 2.0)),
            Graphic::Text {
                location: PointF::new(9.0, 9.0),
                text: "A".into(),
            },
        ]);
        assert_eq!(round_trip(&graphic), Some(graphic));
    }
}
