use crate::api::PresentationStateSummary;
use crate::state::SerializationReport;
use std::fmt;

/// Text report formatter for a presentation state summary
pub struct TextReport<'a> {
    summary: &'a PresentationStateSummary,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(summary: &'a PresentationStateSummary) -> Self {
        Self { summary }
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "Presentation State")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(f, "Class:          {}", s.sop_class.simple_name())?;
        writeln!(f, "SOP Instance:   {}", or_unknown(s.sop_instance_uid.as_deref()))?;
        writeln!(f, "Series:         {}", or_unknown(s.series_instance_uid.as_deref()))?;
        writeln!(f, "Label:          {}", s.content_label)?;
        writeln!(
            f,
            "Description:    {}",
            s.content_description.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "Creator:        {}",
            s.content_creator.as_deref().unwrap_or("-")
        )?;
        match s.creation {
            Some(dt) => writeln!(f, "Created:        {}", dt.format("%Y-%m-%d %H:%M:%S"))?,
            None => writeln!(f, "Created:        unknown")?,
        }
        writeln!(f)?;

        writeln!(f, "Content")?;
        writeln!(f, "-------")?;
        writeln!(
            f,
            "References:     {} images in {} series",
            s.referenced_images, s.referenced_series
        )?;
        writeln!(f, "Display Areas:  {}", s.displayed_areas)?;
        if s.layers.is_empty() {
            writeln!(f, "Layers:         none")?;
        } else {
            writeln!(f, "Layers:         {}", s.layers.join(", "))?;
        }
        writeln!(f, "Annotations:    {}", s.annotations)?;
        if s.overlay_groups.is_empty() {
            writeln!(f, "Overlays:       none")?;
        } else {
            let groups: Vec<String> = s
                .overlay_groups
                .iter()
                .map(|&n| format!("{:04X}", 0x6000 + 2 * n as u16))
                .collect();
            writeln!(f, "Overlays:       {}", groups.join(", "))?;
        }
        if s.has_shutter() {
            writeln!(f, "Shutter:        {}", s.shutter_shapes.join(", "))?;
        } else {
            writeln!(f, "Shutter:        none")?;
        }
        writeln!(
            f,
            "LUT Shape:      {}",
            s.presentation_lut_shape.as_deref().unwrap_or("-")
        )?;

        Ok(())
    }
}

/// One line per written presentation state
pub struct CreationReport<'a> {
    entries: &'a [(String, SerializationReport)],
}

impl<'a> CreationReport<'a> {
    /// Creates a report over written file names and their serialization
    /// reports
    pub fn new(entries: &'a [(String, SerializationReport)]) -> Self {
        Self { entries }
    }
}

impl<'a> fmt::Display for CreationReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (file, report) in self.entries {
            writeln!(
                f,
                "{}: {} images, {} layers, {} annotations, {} overlays",
                file, report.images, report.layers, report.annotations, report.overlays_written
            )?;
            if report.overlays_dropped > 0 {
                writeln!(f, "  {} overlays dropped", report.overlays_dropped)?;
            }
            for warning in &report.warnings {
                writeln!(f, "  warning: {}", warning)?;
            }
        }
        Ok(())
    }
}
