use crate::error::{PresentationStateError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Reads the first two numbers of a loosely formatted value pair
///
/// Backslash, space or bracketed list separators all work, as does
/// exponential notation.
fn parse_pair(s: &str, what: &str) -> Result<(f64, f64)> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| {
        Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("Failed to compile regex")
    });

    let invalid = || PresentationStateError::InvalidValue(format!("{} '{}'", what, s));
    let mut numbers = re.find_iter(s).map(|m| m.as_str().parse::<f64>());
    match (numbers.next(), numbers.next()) {
        (Some(Ok(first)), Some(Ok(second))) => Ok((first, second)),
        _ => Err(invalid()),
    }
}

/// Physical distance between pixel centers in mm, row then column
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PixelSpacing {
    pub row: f64,
    pub col: f64,
}

impl PixelSpacing {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Parses a spacing string such as `0.1\0.1` or `[0.1, 0.1]`
    pub fn parse(s: &str) -> Result<Self> {
        let (row, col) = parse_pair(s, "pixel spacing")?;
        Ok(Self::new(row, col))
    }

    /// True size display and calibration need both spacings positive
    pub fn is_valid(&self) -> bool {
        self.row > 0.0 && self.col > 0.0
    }

    /// Aspect ratio implied by the spacing
    pub fn aspect_ratio(&self) -> Option<PixelAspectRatio> {
        self.is_valid()
            .then(|| PixelAspectRatio::new(self.row, self.col))
    }
}

impl fmt::Display for PixelSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} mm", self.row, self.col)
    }
}

/// Pixel Aspect Ratio (0028,0034): vertical size to horizontal size
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PixelAspectRatio {
    pub row: f64,
    pub col: f64,
}

impl PixelAspectRatio {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    pub fn square() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn is_square(&self) -> bool {
        (self.row - self.col).abs() < f64::EPSILON
    }

    /// Parses an aspect ratio string such as `4\3`
    pub fn parse(s: &str) -> Result<Self> {
        let (row, col) = parse_pair(s, "pixel aspect ratio")?;
        if row <= 0.0 || col <= 0.0 {
            return Err(PresentationStateError::InvalidValue(format!(
                "non-positive pixel aspect ratio '{}'",
                s
            )));
        }
        Ok(Self::new(row, col))
    }

    /// Integer pair for the attribute, which is stored as IS
    pub fn to_integers(&self) -> [i32; 2] {
        if self.is_square() {
            return [1, 1];
        }
        // keep three significant decimals of the ratio
        let scale = 1000.0 / self.row.min(self.col);
        [
            (self.row * scale).round() as i32,
            (self.col * scale).round() as i32,
        ]
    }
}

impl Default for PixelAspectRatio {
    fn default() -> Self {
        Self::square()
    }
}

impl fmt::Display for PixelAspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0.1\\0.1", 0.1, 0.1)]
    #[case("0.194 0.2", 0.194, 0.2)]
    #[case("[0.1, 0.3]", 0.1, 0.3)]
    #[case("1.5e-1\\1.5e+1", 0.15, 15.0)]
    fn test_parse_spacing(#[case] input: &str, #[case] row: f64, #[case] col: f64) {
        assert_eq!(PixelSpacing::parse(input).unwrap(), PixelSpacing::new(row, col));
    }

    #[rstest]
    #[case("")]
    #[case("invalid")]
    #[case("0.1")]
    fn test_parse_spacing_invalid(#[case] input: &str) {
        assert!(matches!(
            PixelSpacing::parse(input),
            Err(PresentationStateError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_aspect_ratio_from_spacing() {
        let ar = PixelSpacing::new(0.2, 0.1).aspect_ratio().unwrap();
        assert_eq!(ar.to_integers(), [2000, 1000]);
        assert!(PixelSpacing::new(0.0, 0.1).aspect_ratio().is_none());
    }

    #[test]
    fn test_aspect_ratio_parse() {
        let ar = PixelAspectRatio::parse("1\\1").unwrap();
        assert!(ar.is_square());
        assert_eq!(ar.to_integers(), [1, 1]);
        assert_eq!(PixelAspectRatio::parse("4\\3").unwrap().to_integers(), [1333, 1000]);
        assert!(PixelAspectRatio::parse("0\\1").is_err());
        assert!(PixelAspectRatio::parse("x").is_err());
    }
}
