//! Graphic layers: named, ordered groups of annotations and overlays

use crate::error::{PresentationStateError, Result};
use crate::graphics::annotation::Graphic;
use crate::types::CieLab;

/// Id of the layer that holds hidden content
pub const INACTIVE_LAYER_ID: &str = "";

/// Maximum length of a Graphic Layer (CS) value
const MAX_LAYER_ID_LEN: usize = 16;

/// Normalises a user-supplied layer name into a Graphic Layer id
///
/// The name is trimmed, uppercased and reduced to letters, digits, spaces and
/// underscores, then truncated to 16 characters. An empty name selects the
/// inactive layer; a non-empty name with no valid character is rejected.
pub fn format_layer_id(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Ok(INACTIVE_LAYER_ID.to_string());
    }

    let id: String = trimmed
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_')
        .take(MAX_LAYER_ID_LEN)
        .collect();
    let id = id.trim_end().to_string();

    if id.is_empty() {
        return Err(PresentationStateError::InvalidLayerId(name.to_string()));
    }
    Ok(id)
}

/// One graphic layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    id: String,
    pub description: String,
    visible: bool,
    pub graphics: Vec<Graphic>,
    pub recommended_grayscale_value: Option<u16>,
    pub recommended_cielab: Option<CieLab>,
}

impl Layer {
    fn new(id: String) -> Self {
        let visible = id != INACTIVE_LAYER_ID;
        Self {
            id,
            description: String::new(),
            visible,
            graphics: Vec::new(),
            recommended_grayscale_value: None,
            recommended_cielab: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_inactive(&self) -> bool {
        self.id == INACTIVE_LAYER_ID
    }

    /// The inactive layer is never visible
    pub fn visible(&self) -> bool {
        self.visible && !self.is_inactive()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Ordered layers of a graphics plane
///
/// Layers keep the order they were created in; the inactive layer is created
/// on first use like any other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerCollection {
    layers: Vec<Layer>,
}

impl LayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut()
    }

    /// Looks up a layer by name after id formatting
    pub fn get(&self, name: &str) -> Option<&Layer> {
        let id = format_layer_id(name).ok()?;
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        let id = format_layer_id(name).ok()?;
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Returns the named layer, appending it when absent
    pub fn get_or_create(&mut self, name: &str) -> Result<&mut Layer> {
        let id = format_layer_id(name)?;
        let pos = match self.layers.iter().position(|l| l.id == id) {
            Some(pos) => pos,
            None => {
                self.layers.push(Layer::new(id));
                self.layers.len() - 1
            }
        };
        Ok(&mut self.layers[pos])
    }

    /// Removes the named layer together with its annotations
    pub fn remove(&mut self, name: &str) -> Option<Layer> {
        let id = format_layer_id(name).ok()?;
        let pos = self.layers.iter().position(|l| l.id == id)?;
        Some(self.layers.remove(pos))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Total number of annotations across all layers
    pub fn graphic_count(&self) -> usize {
        self.layers.iter().map(|l| l.graphics.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  findings ", "FINDINGS")]
    #[case("Layer-1!", "LAYER1")]
    #[case("my_layer name", "MY_LAYER NAME")]
    #[case("a very long layer identifier", "A VERY LONG LAYE")]
    #[case("", "")]
    #[case("   ", "")]
    fn test_format_layer_id(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(format_layer_id(input).unwrap(), expected);
    }

    #[test]
    fn test_all_invalid_layer_id_is_error() {
        let err = format_layer_id("-*-").unwrap_err();
        assert!(matches!(err, PresentationStateError::InvalidLayerId(_)));
    }

    #[test]
    fn test_get_or_create_deduplicates() {
        let mut layers = LayerCollection::new();
        layers.get_or_create("Overlay").unwrap().description = "first".into();
        layers.get_or_create("OVERLAY ").unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.get("overlay").unwrap().description, "first");
    }

    #[test]
    fn test_inactive_layer_is_never_visible() {
        let mut layers = LayerCollection::new();
        let inactive = layers.get_or_create("").unwrap();
        inactive.set_visible(true);
        assert!(inactive.is_inactive());
        assert!(!inactive.visible());
        assert!(layers.get_or_create("A").unwrap().visible());
    }

    #[test]
    fn test_layers_keep_creation_order() {
        let mut layers = LayerCollection::new();
        for name in ["b", "a", "c"] {
            layers.get_or_create(name).unwrap();
        }
        let ids: Vec<_> = layers.iter().map(|l| l.id().to_string()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert!(layers.remove("a").is_some());
        assert_eq!(layers.len(), 2);
    }
}
