use std::fmt;

/// Which size mode the Displayed Area module records on serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayAreaSerializationOption {
    /// Record the visible area only; readers fit it to their viewport
    #[default]
    ScaleToFit,
    /// Record the pixel spacing so the area is shown at physical size
    TrueSize,
    /// Record the current magnification ratio
    Magnify,
}

impl DisplayAreaSerializationOption {
    /// Parses a command line value
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "scaletofit" | "fit" => Some(Self::ScaleToFit),
            "truesize" => Some(Self::TrueSize),
            "magnify" => Some(Self::Magnify),
            _ => None,
        }
    }
}

impl fmt::Display for DisplayAreaSerializationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScaleToFit => "scale-to-fit",
            Self::TrueSize => "true-size",
            Self::Magnify => "magnify",
        };
        write!(f, "{}", name)
    }
}

/// Institution identity written to the General Equipment module
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Institution {
    pub name: String,
    pub address: String,
    pub department_name: String,
}

impl Institution {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.address.is_empty() && self.department_name.is_empty()
    }
}

/// Options applied when a presentation state is created and serialized
///
/// # Example
///
/// ```
/// use softcopy_core::{DisplayAreaSerializationOption, SerializationOptions};
///
/// let options = SerializationOptions::default()
///     .with_content_label("KEY_IMAGES")
///     .with_display_area_mode(DisplayAreaSerializationOption::Magnify);
///
/// assert_eq!(options.content_label, "KEY_IMAGES");
/// assert_eq!(options.specific_character_set, "ISO_IR 192");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SerializationOptions {
    /// Size mode recorded in the Displayed Area module
    pub display_area_mode: DisplayAreaSerializationOption,

    /// Specific Character Set (0008,0005)
    pub specific_character_set: String,

    /// Content Label (0070,0080); normalised like a layer id on assignment
    pub content_label: String,

    /// Content Description (0070,0081)
    pub content_description: Option<String>,

    /// Content Creator's Name (0070,0084)
    pub content_creator: Option<String>,

    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub software_versions: Option<String>,
    pub station_name: Option<String>,
    pub device_serial_number: Option<String>,
    pub institution: Option<Institution>,
    pub source_ae_title: Option<String>,

    /// Series Number (0020,0011); unset leaves the attribute empty
    pub series_number: Option<i32>,

    /// Instance Number (0020,0013)
    pub instance_number: i32,
}

impl Default for SerializationOptions {
    fn default() -> Self {
        Self {
            display_area_mode: DisplayAreaSerializationOption::ScaleToFit,
            specific_character_set: "ISO_IR 192".to_string(),
            content_label: "FOR_PRESENTATION".to_string(),
            content_description: None,
            content_creator: None,
            manufacturer: None,
            model_name: None,
            software_versions: Some(env!("CARGO_PKG_VERSION").to_string()),
            station_name: None,
            device_serial_number: None,
            institution: None,
            source_ae_title: None,
            series_number: None,
            instance_number: 1,
        }
    }
}

impl SerializationOptions {
    /// Builder: Set the displayed-area size mode
    pub fn with_display_area_mode(mut self, mode: DisplayAreaSerializationOption) -> Self {
        self.display_area_mode = mode;
        self
    }

    /// Builder: Set the content label
    ///
    /// # Example
    ///
    /// ```
    /// use softcopy_core::SerializationOptions;
    ///
    /// let options = SerializationOptions::default().with_content_label("REVIEW");
    /// assert_eq!(options.content_label, "REVIEW");
    /// ```
    pub fn with_content_label(mut self, label: impl Into<String>) -> Self {
        self.content_label = label.into();
        self
    }

    pub fn with_content_description(mut self, description: impl Into<String>) -> Self {
        self.content_description = Some(description.into());
        self
    }

    pub fn with_content_creator(mut self, creator: impl Into<String>) -> Self {
        self.content_creator = Some(creator.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_station_name(mut self, station: impl Into<String>) -> Self {
        self.station_name = Some(station.into());
        self
    }

    pub fn with_institution(mut self, institution: Institution) -> Self {
        self.institution = Some(institution);
        self
    }

    pub fn with_source_ae_title(mut self, ae_title: impl Into<String>) -> Self {
        self.source_ae_title = Some(ae_title.into());
        self
    }

    pub fn with_specific_character_set(mut self, charset: impl Into<String>) -> Self {
        self.specific_character_set = charset.into();
        self
    }

    pub fn with_series_number(mut self, number: i32) -> Self {
        self.series_number = Some(number);
        self
    }

    pub fn with_instance_number(mut self, number: i32) -> Self {
        self.instance_number = number;
        self
    }
}
