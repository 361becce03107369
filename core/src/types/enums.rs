use std::fmt;

/// Photometric interpretation enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum PhotometricInterpretation {
    Unknown,
    Monochrome1,
    Monochrome2,
    PaletteColor,
    Rgb,
    YbrFull,
    YbrFull422,
    YbrPartial422,
    YbrPartial420,
    YbrIct,
    YbrRct,
}

impl PhotometricInterpretation {
    /// Returns whether this is a monochrome interpretation
    pub fn is_monochrome(&self) -> bool {
        matches!(
            self,
            PhotometricInterpretation::Monochrome1 | PhotometricInterpretation::Monochrome2
        )
    }

    /// Returns whether this is inverted (MONOCHROME1)
    pub fn is_inverted(&self) -> bool {
        matches!(self, PhotometricInterpretation::Monochrome1)
    }

    /// Returns whether pixels of this interpretation are rendered in color
    pub fn is_color(&self) -> bool {
        !self.is_monochrome() && !matches!(self, PhotometricInterpretation::Unknown)
    }

    /// Parses photometric interpretation from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "MONOCHROME1" => PhotometricInterpretation::Monochrome1,
            "MONOCHROME2" => PhotometricInterpretation::Monochrome2,
            "PALETTE COLOR" => PhotometricInterpretation::PaletteColor,
            "RGB" => PhotometricInterpretation::Rgb,
            "YBR_FULL" => PhotometricInterpretation::YbrFull,
            "YBR_FULL_422" => PhotometricInterpretation::YbrFull422,
            "YBR_PARTIAL_422" => PhotometricInterpretation::YbrPartial422,
            "YBR_PARTIAL_420" => PhotometricInterpretation::YbrPartial420,
            "YBR_ICT" => PhotometricInterpretation::YbrIct,
            "YBR_RCT" => PhotometricInterpretation::YbrRct,
            _ => PhotometricInterpretation::Unknown,
        }
    }
}

impl fmt::Display for PhotometricInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhotometricInterpretation::Unknown => "UNKNOWN",
            PhotometricInterpretation::Monochrome1 => "MONOCHROME1",
            PhotometricInterpretation::Monochrome2 => "MONOCHROME2",
            PhotometricInterpretation::PaletteColor => "PALETTE COLOR",
            PhotometricInterpretation::Rgb => "RGB",
            PhotometricInterpretation::YbrFull => "YBR_FULL",
            PhotometricInterpretation::YbrFull422 => "YBR_FULL_422",
            PhotometricInterpretation::YbrPartial422 => "YBR_PARTIAL_422",
            PhotometricInterpretation::YbrPartial420 => "YBR_PARTIAL_420",
            PhotometricInterpretation::YbrIct => "YBR_ICT",
            PhotometricInterpretation::YbrRct => "YBR_RCT",
        };
        write!(f, "{}", name)
    }
}

/// Softcopy presentation state SOP classes handled by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum PresentationStateSopClass {
    /// Grayscale Softcopy Presentation State Storage (PS 3.3 A.33.1)
    Grayscale,
    /// Color Softcopy Presentation State Storage (PS 3.3 A.33.2)
    Color,
}

impl PresentationStateSopClass {
    pub const GRAYSCALE_UID: &'static str = "1.2.840.10008.5.1.4.1.1.11.1";
    pub const COLOR_UID: &'static str = "1.2.840.10008.5.1.4.1.1.11.2";

    /// Returns the SOP class UID
    pub fn uid(&self) -> &'static str {
        match self {
            PresentationStateSopClass::Grayscale => Self::GRAYSCALE_UID,
            PresentationStateSopClass::Color => Self::COLOR_UID,
        }
    }

    /// Looks up a supported SOP class by UID
    pub fn from_uid(uid: &str) -> Option<Self> {
        match uid.trim_end_matches('\0').trim() {
            Self::GRAYSCALE_UID => Some(PresentationStateSopClass::Grayscale),
            Self::COLOR_UID => Some(PresentationStateSopClass::Color),
            _ => None,
        }
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            PresentationStateSopClass::Grayscale => "grayscale",
            PresentationStateSopClass::Color => "color",
        }
    }
}

impl fmt::Display for PresentationStateSopClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Where an overlay plane was obtained from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum OverlayPlaneSource {
    /// Overlay plane module of the image header
    Image,
    /// Overlay plane module of a presentation state
    PresentationState,
    /// Created by a user
    User,
}

impl fmt::Display for OverlayPlaneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlayPlaneSource::Image => "Image",
            OverlayPlaneSource::PresentationState => "PresentationState",
            OverlayPlaneSource::User => "User",
        };
        write!(f, "{}", name)
    }
}

/// Overlay Type (60xx,0040)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum OverlayType {
    #[default]
    Graphics,
    Roi,
}

impl OverlayType {
    /// Returns the DICOM code string
    pub fn code(&self) -> &'static str {
        match self {
            OverlayType::Graphics => "G",
            OverlayType::Roi => "R",
        }
    }

    /// Parses the DICOM code string, defaulting to graphics
    pub fn from_code(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("R") {
            OverlayType::Roi
        } else {
            OverlayType::Graphics
        }
    }
}

/// Overlay Subtype (60xx,0045) defined terms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum OverlaySubtype {
    User,
    Automated,
    Other(String),
}

impl OverlaySubtype {
    /// Returns the DICOM defined term
    pub fn code(&self) -> &str {
        match self {
            OverlaySubtype::User => "USER",
            OverlaySubtype::Automated => "AUTOMATED",
            OverlaySubtype::Other(s) => s.as_str(),
        }
    }

    /// Parses a defined term; empty input yields `None`
    pub fn from_code(s: &str) -> Option<Self> {
        let s = s.trim().to_uppercase();
        match s.as_str() {
            "" => None,
            "USER" => Some(OverlaySubtype::User),
            "AUTOMATED" => Some(OverlaySubtype::Automated),
            _ => Some(OverlaySubtype::Other(s)),
        }
    }
}

/// Presentation Size Mode (0070,0100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum PresentationSizeMode {
    #[default]
    ScaleToFit,
    TrueSize,
    Magnify,
}

impl PresentationSizeMode {
    /// Returns the DICOM code string
    pub fn code(&self) -> &'static str {
        match self {
            PresentationSizeMode::ScaleToFit => "SCALE TO FIT",
            PresentationSizeMode::TrueSize => "TRUE SIZE",
            PresentationSizeMode::Magnify => "MAGNIFY",
        }
    }

    /// Parses the DICOM code string; unknown values fall back to scale to fit
    pub fn from_code(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "TRUE SIZE" => PresentationSizeMode::TrueSize,
            "MAGNIFY" => PresentationSizeMode::Magnify,
            _ => PresentationSizeMode::ScaleToFit,
        }
    }
}

/// Presentation LUT Shape (2050,0020)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum PresentationLutShape {
    #[default]
    Identity,
    Inverse,
}

impl PresentationLutShape {
    /// Returns the DICOM code string
    pub fn code(&self) -> &'static str {
        match self {
            PresentationLutShape::Identity => "IDENTITY",
            PresentationLutShape::Inverse => "INVERSE",
        }
    }

    /// Parses the DICOM code string
    pub fn from_code(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("INVERSE") {
            PresentationLutShape::Inverse
        } else {
            PresentationLutShape::Identity
        }
    }
}

/// Shutter Shape (0018,1600) value set
///
/// The attribute is multi-valued, so shapes combine as flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ShutterShape {
    pub rectangular: bool,
    pub circular: bool,
    pub polygonal: bool,
    pub bitmap: bool,
}

impl ShutterShape {
    pub const NONE: ShutterShape = ShutterShape {
        rectangular: false,
        circular: false,
        polygonal: false,
        bitmap: false,
    };

    /// Returns whether no shape is set
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Returns whether any geometric shape is set
    pub fn is_geometric(&self) -> bool {
        self.rectangular || self.circular || self.polygonal
    }

    /// Returns the DICOM code strings in canonical order
    pub fn codes(&self) -> Vec<String> {
        let mut codes = Vec::new();
        if self.rectangular {
            codes.push("RECTANGULAR".to_string());
        }
        if self.circular {
            codes.push("CIRCULAR".to_string());
        }
        if self.polygonal {
            codes.push("POLYGONAL".to_string());
        }
        if self.bitmap {
            codes.push("BITMAP".to_string());
        }
        codes
    }

    /// Parses the DICOM code strings, ignoring unknown values
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Self {
        let mut shape = Self::NONE;
        for code in codes {
            match code.as_ref().trim().to_uppercase().as_str() {
                "RECTANGULAR" => shape.rectangular = true,
                "CIRCULAR" => shape.circular = true,
                "POLYGONAL" => shape.polygonal = true,
                "BITMAP" => shape.bitmap = true,
                _ => {}
            }
        }
        shape
    }
}

/// Graphic Type (0070,0023)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum GraphicType {
    Point,
    Polyline,
    Interpolated,
    Circle,
    Ellipse,
}

impl GraphicType {
    /// Returns the DICOM code string
    pub fn code(&self) -> &'static str {
        match self {
            GraphicType::Point => "POINT",
            GraphicType::Polyline => "POLYLINE",
            GraphicType::Interpolated => "INTERPOLATED",
            GraphicType::Circle => "CIRCLE",
            GraphicType::Ellipse => "ELLIPSE",
        }
    }

    /// Parses the DICOM code string
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "POINT" => Some(GraphicType::Point),
            "POLYLINE" => Some(GraphicType::Polyline),
            "INTERPOLATED" => Some(GraphicType::Interpolated),
            "CIRCLE" => Some(GraphicType::Circle),
            "ELLIPSE" => Some(GraphicType::Ellipse),
            _ => None,
        }
    }

    /// Minimum number of points required by this graphic type
    pub fn min_points(&self) -> usize {
        match self {
            GraphicType::Point => 1,
            GraphicType::Polyline | GraphicType::Interpolated | GraphicType::Circle => 2,
            GraphicType::Ellipse => 4,
        }
    }
}

/// Annotation units for graphic data, anchor points and bounding boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum AnnotationUnits {
    #[default]
    Pixel,
    /// Fractions of the displayed area
    Display,
}

impl AnnotationUnits {
    /// Returns the DICOM code string
    pub fn code(&self) -> &'static str {
        match self {
            AnnotationUnits::Pixel => "PIXEL",
            AnnotationUnits::Display => "DISPLAY",
        }
    }

    /// Parses the DICOM code string
    pub fn from_code(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("DISPLAY") {
            AnnotationUnits::Display
        } else {
            AnnotationUnits::Pixel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photometric_interpretation() {
        assert!(PhotometricInterpretation::from_str("MONOCHROME2").is_monochrome());
        assert!(PhotometricInterpretation::from_str(" monochrome1 ").is_inverted());
        assert!(PhotometricInterpretation::from_str("RGB").is_color());
        assert!(!PhotometricInterpretation::from_str("bogus").is_color());
        assert_eq!(
            PhotometricInterpretation::YbrFull422.to_string(),
            "YBR_FULL_422"
        );
    }

    #[test]
    fn test_sop_class_lookup() {
        assert_eq!(
            PresentationStateSopClass::from_uid("1.2.840.10008.5.1.4.1.1.11.1\0"),
            Some(PresentationStateSopClass::Grayscale)
        );
        assert_eq!(
            PresentationStateSopClass::from_uid(PresentationStateSopClass::COLOR_UID),
            Some(PresentationStateSopClass::Color)
        );
        assert_eq!(PresentationStateSopClass::from_uid("1.2.3"), None);
    }

    #[test]
    fn test_shutter_shape_codes() {
        let shape = ShutterShape::from_codes(&["circular", "RECTANGULAR", "junk"]);
        assert!(shape.circular && shape.rectangular);
        assert!(!shape.polygonal && !shape.bitmap);
        assert_eq!(shape.codes(), vec!["RECTANGULAR", "CIRCULAR"]);
        assert!(ShutterShape::from_codes::<&str>(&[]).is_none());
    }

    #[test]
    fn test_code_strings() {
        assert_eq!(OverlayType::from_code("R"), OverlayType::Roi);
        assert_eq!(OverlayType::from_code("x"), OverlayType::Graphics);
        assert_eq!(OverlaySubtype::from_code(""), None);
        assert_eq!(
            OverlaySubtype::from_code("custom"),
            Some(OverlaySubtype::Other("CUSTOM".to_string()))
        );
        assert_eq!(
            PresentationSizeMode::from_code("TRUE SIZE"),
            PresentationSizeMode::TrueSize
        );
        assert_eq!(
            PresentationLutShape::from_code("INVERSE"),
            PresentationLutShape::Inverse
        );
        assert_eq!(GraphicType::from_code("ellipse"), Some(GraphicType::Ellipse));
        assert_eq!(GraphicType::from_code("SPLINE"), None);
        assert_eq!(AnnotationUnits::from_code("DISPLAY"), AnnotationUnits::Display);
    }
}
