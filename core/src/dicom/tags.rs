use dicom_core::Tag;

// SOP Common / identification
pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
pub const INSTANCE_CREATION_DATE: Tag = Tag(0x0008, 0x0012);
pub const INSTANCE_CREATION_TIME: Tag = Tag(0x0008, 0x0013);
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const REFERRING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x0090);
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);

// General Equipment
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const INSTITUTION_NAME: Tag = Tag(0x0008, 0x0080);
pub const INSTITUTION_ADDRESS: Tag = Tag(0x0008, 0x0081);
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);
pub const INSTITUTIONAL_DEPARTMENT_NAME: Tag = Tag(0x0008, 0x1040);
pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
pub const DEVICE_SERIAL_NUMBER: Tag = Tag(0x0018, 0x1000);
pub const SOFTWARE_VERSIONS: Tag = Tag(0x0018, 0x1020);
pub const SOURCE_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0016);

// References
pub const REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x0008, 0x1115);
pub const REFERENCED_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x1140);
pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008, 0x1150);
pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x1155);
pub const REFERENCED_FRAME_NUMBER: Tag = Tag(0x0008, 0x1160);

// Patient / Study
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);

// Image Pixel
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const PIXEL_ASPECT_RATIO: Tag = Tag(0x0028, 0x0034);
pub const IMAGER_PIXEL_SPACING: Tag = Tag(0x0018, 0x1164);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

// Modality / VOI LUT
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
pub const RESCALE_TYPE: Tag = Tag(0x0028, 0x1054);
pub const WINDOW_CENTER_WIDTH_EXPLANATION: Tag = Tag(0x0028, 0x1055);
pub const LUT_DESCRIPTOR: Tag = Tag(0x0028, 0x3002);
pub const LUT_EXPLANATION: Tag = Tag(0x0028, 0x3003);
pub const LUT_DATA: Tag = Tag(0x0028, 0x3006);
pub const VOI_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3010);
pub const SOFTCOPY_VOI_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3110);
pub const PRESENTATION_LUT_SHAPE: Tag = Tag(0x2050, 0x0020);

// Display Shutter / Bitmap Display Shutter / Presentation State Shutter
pub const SHUTTER_SHAPE: Tag = Tag(0x0018, 0x1600);
pub const SHUTTER_LEFT_VERTICAL_EDGE: Tag = Tag(0x0018, 0x1602);
pub const SHUTTER_RIGHT_VERTICAL_EDGE: Tag = Tag(0x0018, 0x1604);
pub const SHUTTER_UPPER_HORIZONTAL_EDGE: Tag = Tag(0x0018, 0x1606);
pub const SHUTTER_LOWER_HORIZONTAL_EDGE: Tag = Tag(0x0018, 0x1608);
pub const CENTER_OF_CIRCULAR_SHUTTER: Tag = Tag(0x0018, 0x1610);
pub const RADIUS_OF_CIRCULAR_SHUTTER: Tag = Tag(0x0018, 0x1612);
pub const VERTICES_OF_POLYGONAL_SHUTTER: Tag = Tag(0x0018, 0x1620);
pub const SHUTTER_PRESENTATION_VALUE: Tag = Tag(0x0018, 0x1622);
pub const SHUTTER_OVERLAY_GROUP: Tag = Tag(0x0018, 0x1623);
pub const SHUTTER_PRESENTATION_COLOR_CIELAB_VALUE: Tag = Tag(0x0018, 0x1624);

// Graphic Annotation / Graphic Layer / Displayed Area / Spatial Transform
pub const GRAPHIC_ANNOTATION_SEQUENCE: Tag = Tag(0x0070, 0x0001);
pub const GRAPHIC_LAYER: Tag = Tag(0x0070, 0x0002);
pub const BOUNDING_BOX_ANNOTATION_UNITS: Tag = Tag(0x0070, 0x0003);
pub const ANCHOR_POINT_ANNOTATION_UNITS: Tag = Tag(0x0070, 0x0004);
pub const GRAPHIC_ANNOTATION_UNITS: Tag = Tag(0x0070, 0x0005);
pub const UNFORMATTED_TEXT_VALUE: Tag = Tag(0x0070, 0x0006);
pub const TEXT_OBJECT_SEQUENCE: Tag = Tag(0x0070, 0x0008);
pub const GRAPHIC_OBJECT_SEQUENCE: Tag = Tag(0x0070, 0x0009);
pub const BOUNDING_BOX_TOP_LEFT_HAND_CORNER: Tag = Tag(0x0070, 0x0010);
pub const BOUNDING_BOX_BOTTOM_RIGHT_HAND_CORNER: Tag = Tag(0x0070, 0x0011);
pub const BOUNDING_BOX_TEXT_HORIZONTAL_JUSTIFICATION: Tag = Tag(0x0070, 0x0012);
pub const ANCHOR_POINT: Tag = Tag(0x0070, 0x0014);
pub const ANCHOR_POINT_VISIBILITY: Tag = Tag(0x0070, 0x0015);
pub const GRAPHIC_DIMENSIONS: Tag = Tag(0x0070, 0x0020);
pub const NUMBER_OF_GRAPHIC_POINTS: Tag = Tag(0x0070, 0x0021);
pub const GRAPHIC_DATA: Tag = Tag(0x0070, 0x0022);
pub const GRAPHIC_TYPE: Tag = Tag(0x0070, 0x0023);
pub const GRAPHIC_FILLED: Tag = Tag(0x0070, 0x0024);
pub const IMAGE_HORIZONTAL_FLIP: Tag = Tag(0x0070, 0x0041);
pub const IMAGE_ROTATION: Tag = Tag(0x0070, 0x0042);
pub const DISPLAYED_AREA_TOP_LEFT_HAND_CORNER: Tag = Tag(0x0070, 0x0052);
pub const DISPLAYED_AREA_BOTTOM_RIGHT_HAND_CORNER: Tag = Tag(0x0070, 0x0053);
pub const DISPLAYED_AREA_SELECTION_SEQUENCE: Tag = Tag(0x0070, 0x005A);
pub const GRAPHIC_LAYER_SEQUENCE: Tag = Tag(0x0070, 0x0060);
pub const GRAPHIC_LAYER_ORDER: Tag = Tag(0x0070, 0x0062);
pub const GRAPHIC_LAYER_RECOMMENDED_DISPLAY_GRAYSCALE_VALUE: Tag = Tag(0x0070, 0x0066);
pub const GRAPHIC_LAYER_DESCRIPTION: Tag = Tag(0x0070, 0x0068);
pub const CONTENT_LABEL: Tag = Tag(0x0070, 0x0080);
pub const CONTENT_DESCRIPTION: Tag = Tag(0x0070, 0x0081);
pub const PRESENTATION_CREATION_DATE: Tag = Tag(0x0070, 0x0082);
pub const PRESENTATION_CREATION_TIME: Tag = Tag(0x0070, 0x0083);
pub const CONTENT_CREATOR_NAME: Tag = Tag(0x0070, 0x0084);
pub const PRESENTATION_SIZE_MODE: Tag = Tag(0x0070, 0x0100);
pub const PRESENTATION_PIXEL_SPACING: Tag = Tag(0x0070, 0x0101);
pub const PRESENTATION_PIXEL_ASPECT_RATIO: Tag = Tag(0x0070, 0x0102);
pub const PRESENTATION_PIXEL_MAGNIFICATION_RATIO: Tag = Tag(0x0070, 0x0103);
pub const GRAPHIC_LAYER_RECOMMENDED_DISPLAY_CIELAB_VALUE: Tag = Tag(0x0070, 0x0401);

// Overlay Plane elements; the group is chosen with `overlay_tag`
pub const OVERLAY_GROUP_BASE: u16 = 0x6000;
pub const OVERLAY_ROWS: u16 = 0x0010;
pub const OVERLAY_COLUMNS: u16 = 0x0011;
pub const NUMBER_OF_FRAMES_IN_OVERLAY: u16 = 0x0015;
pub const OVERLAY_DESCRIPTION: u16 = 0x0022;
pub const OVERLAY_TYPE: u16 = 0x0040;
pub const OVERLAY_SUBTYPE: u16 = 0x0045;
pub const OVERLAY_ORIGIN: u16 = 0x0050;
pub const IMAGE_FRAME_ORIGIN: u16 = 0x0051;
pub const OVERLAY_BITS_ALLOCATED: u16 = 0x0100;
pub const OVERLAY_BIT_POSITION: u16 = 0x0102;
pub const OVERLAY_ACTIVATION_LAYER: u16 = 0x1001;
pub const ROI_AREA: u16 = 0x1301;
pub const ROI_MEAN: u16 = 0x1302;
pub const ROI_STANDARD_DEVIATION: u16 = 0x1303;
pub const OVERLAY_LABEL: u16 = 0x1500;
pub const OVERLAY_DATA: u16 = 0x3000;

/// Number of overlay groups (60xx) a data set can carry
pub const MAX_OVERLAY_GROUPS: u8 = 16;

/// Builds the tag of an overlay plane element for group index `n` (0..16)
pub fn overlay_tag(n: u8, element: u16) -> Tag {
    Tag(overlay_group(n), element)
}

/// Group number 0x6000 + 2n for overlay index `n`
pub fn overlay_group(n: u8) -> u16 {
    OVERLAY_GROUP_BASE + 2 * n as u16
}

/// Inverse of [`overlay_group`]; `None` when the group is not an overlay group
pub fn overlay_index(group: u16) -> Option<u8> {
    if (OVERLAY_GROUP_BASE..=OVERLAY_GROUP_BASE + 0x1E).contains(&group) && group % 2 == 0 {
        Some(((group - OVERLAY_GROUP_BASE) / 2) as u8)
    } else {
        None
    }
}
