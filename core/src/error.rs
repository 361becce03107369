use thiserror::Error;

/// Result type for presentation state operations
pub type Result<T> = std::result::Result<T, PresentationStateError>;

/// Error types for presentation state operations
#[derive(Error, Debug)]
pub enum PresentationStateError {
    /// DICOM reading or writing error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// Tag not found in DICOM data set
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Invalid tag value
    #[error("Invalid tag value: {0}")]
    InvalidValue(String),

    /// Geometry that cannot be expressed in DICOM terms
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Layer id with no valid characters
    #[error("Invalid graphic layer id: '{0}'")]
    InvalidLayerId(String),

    /// Overlay handle belongs to another graphics plane
    #[error("Overlay belongs to a different graphics plane")]
    ForeignOverlay,

    /// Data set is not a supported presentation state SOP class
    #[error("Unsupported SOP class: {0}")]
    UnsupportedSopClass(String),

    /// Image cannot carry a presentation state
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Images of a single presentation state span several studies
    #[error("All images of a presentation state must belong to the same study")]
    MixedStudies,

    /// Identity fields were edited after serialization or loading
    #[error("Presentation state is sealed and can no longer be modified")]
    Sealed,

    /// Presentation state has no backing data set yet
    #[error("Presentation state has not been serialized")]
    NotSerialized,

    /// Operation called out of order
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Overlay bit-packing error
    #[error("Overlay codec error: {0}")]
    Codec(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for PresentationStateError {
    fn from(s: String) -> Self {
        PresentationStateError::InvalidValue(s)
    }
}

impl From<&str> for PresentationStateError {
    fn from(s: &str) -> Self {
        PresentationStateError::InvalidValue(s.to_string())
    }
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for PresentationStateError {
    fn from(e: dicom_object::ReadError) -> Self {
        PresentationStateError::DicomError(format!("{}", e))
    }
}

impl From<dicom_core::value::ConvertValueError> for PresentationStateError {
    fn from(e: dicom_core::value::ConvertValueError) -> Self {
        PresentationStateError::InvalidValue(format!("{}", e))
    }
}
