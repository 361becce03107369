//! Attribute get/put helpers over `InMemDicomObject`
//!
//! Readers are lenient: a missing or unconvertible attribute yields `None`.
//! Writers replace any existing element with the same tag.

use dicom_core::value::DataSetSequence;
use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_object::InMemDicomObject;

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
}

/// Like [`get_string_value`] but treats an empty value as absent
pub fn get_non_empty_string(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    get_string_value(dcm, tag).filter(|s| !s.is_empty())
}

/// Helper to get integer value from DICOM tag
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

/// Helper to get u16 value from DICOM tag
pub fn get_u16_value(dcm: &InMemDicomObject, tag: Tag) -> Option<u16> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<u16>().ok())
}

/// Helper to get a floating point value from DICOM tag
pub fn get_float_value(dcm: &InMemDicomObject, tag: Tag) -> Option<f64> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_float64().ok())
}

/// Helper to get multi-string value from DICOM tag
pub fn get_multi_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<String>> {
    dcm.element(tag).ok().and_then(|elem| {
        if let Ok(strs) = elem.to_multi_str() {
            Some(strs.iter().map(|s| s.trim().to_string()).collect())
        } else {
            elem.to_str()
                .ok()
                .map(|s| s.split('\\').map(|part| part.trim().to_string()).collect())
        }
    })
}

/// Helper to get a multi-valued integer attribute
pub fn get_multi_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<i32>> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_multi_int::<i32>().ok())
}

/// Helper to get a multi-valued floating point attribute
pub fn get_multi_float_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_multi_float64().ok())
}

/// Helper to get a list of unsigned 16-bit words (US or OW)
pub fn get_multi_u16_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<u16>> {
    let elem = dcm.element(tag).ok()?;
    match elem.value().primitive() {
        Some(PrimitiveValue::U16(words)) => Some(words.to_vec()),
        Some(PrimitiveValue::U8(bytes)) => Some(
            bytes
                .chunks(2)
                .map(|c| u16::from_le_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                .collect(),
        ),
        _ => elem.to_multi_int::<u16>().ok(),
    }
}

/// Helper to get the raw bytes of an OB/OW attribute
///
/// Word values are flattened little-endian, which matches the byte order of
/// data read from an Explicit VR Little Endian file.
pub fn get_bytes_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<u8>> {
    let elem = dcm.element(tag).ok()?;
    match elem.value().primitive()? {
        PrimitiveValue::U16(words) => Some(words.iter().flat_map(|w| w.to_le_bytes()).collect()),
        other => Some(other.to_bytes().into_owned()),
    }
}

/// Helper to get the items of a sequence attribute
pub fn get_items(dcm: &InMemDicomObject, tag: Tag) -> Option<&[InMemDicomObject]> {
    dcm.element(tag).ok().and_then(|elem| elem.items())
}

/// Returns whether an element with the given tag is present
pub fn has_element(dcm: &InMemDicomObject, tag: Tag) -> bool {
    dcm.element(tag).is_ok()
}

pub fn put_str(dcm: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    dcm.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

pub fn put_strs(dcm: &mut InMemDicomObject, tag: Tag, vr: VR, values: &[String]) {
    dcm.put(DataElement::new(
        tag,
        vr,
        PrimitiveValue::Strs(values.iter().cloned().collect()),
    ));
}

/// Writes an element with no value
pub fn put_empty(dcm: &mut InMemDicomObject, tag: Tag, vr: VR) {
    dcm.put(DataElement::empty(tag, vr));
}

/// Writes an Integer String
pub fn put_is(dcm: &mut InMemDicomObject, tag: Tag, value: i32) {
    put_str(dcm, tag, VR::IS, &value.to_string());
}

/// Writes a multi-valued Integer String
pub fn put_multi_is(dcm: &mut InMemDicomObject, tag: Tag, values: &[i32]) {
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    put_strs(dcm, tag, VR::IS, &values);
}

/// Writes a (multi-valued) Decimal String
pub fn put_ds(dcm: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    let values: Vec<String> = values.iter().map(|v| format_ds(*v)).collect();
    put_strs(dcm, tag, VR::DS, &values);
}

pub fn put_us(dcm: &mut InMemDicomObject, tag: Tag, values: &[u16]) {
    dcm.put(DataElement::new(
        tag,
        VR::US,
        PrimitiveValue::U16(values.iter().copied().collect()),
    ));
}

pub fn put_ss(dcm: &mut InMemDicomObject, tag: Tag, values: &[i16]) {
    dcm.put(DataElement::new(
        tag,
        VR::SS,
        PrimitiveValue::I16(values.iter().copied().collect()),
    ));
}

pub fn put_sl(dcm: &mut InMemDicomObject, tag: Tag, values: &[i32]) {
    dcm.put(DataElement::new(
        tag,
        VR::SL,
        PrimitiveValue::I32(values.iter().copied().collect()),
    ));
}

pub fn put_fl(dcm: &mut InMemDicomObject, tag: Tag, values: &[f32]) {
    dcm.put(DataElement::new(
        tag,
        VR::FL,
        PrimitiveValue::F32(values.iter().copied().collect()),
    ));
}

/// Writes packed bytes as Other Word, padding to an even length
pub fn put_ow(dcm: &mut InMemDicomObject, tag: Tag, bytes: &[u8]) {
    let words: Vec<u16> = bytes
        .chunks(2)
        .map(|c| u16::from_le_bytes([c[0], *c.get(1).unwrap_or(&0)]))
        .collect();
    dcm.put(DataElement::new(tag, VR::OW, PrimitiveValue::U16(words.into())));
}

pub fn put_sequence(dcm: &mut InMemDicomObject, tag: Tag, items: Vec<InMemDicomObject>) {
    dcm.put(DataElement::new(tag, VR::SQ, DataSetSequence::from(items)));
}

pub fn remove(dcm: &mut InMemDicomObject, tag: Tag) {
    dcm.remove_element(tag);
}

/// Removes every element in the given group
pub fn remove_group(dcm: &mut InMemDicomObject, group: u16) {
    let tags: Vec<Tag> = (&*dcm)
        .into_iter()
        .map(|elem| elem.header().tag)
        .filter(|tag| tag.group() == group)
        .collect();
    for tag in tags {
        dcm.remove_element(tag);
    }
}

/// Formats a Decimal String value within the 16 character limit
pub fn format_ds(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let plain = format!("{}", value);
    if plain.len() <= 16 {
        return plain;
    }
    for precision in (0..=14).rev() {
        let s = format!("{:.*}", precision, value);
        if s.len() <= 16 {
            return s.trim_end_matches('0').trim_end_matches('.').to_string();
        }
    }
    format!("{:.6e}", value)
}
