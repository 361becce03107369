//! Bit packing for overlay data
//!
//! DICOM stores overlays one bit per pixel, row-major, least significant bit
//! first. Data read as 16-bit big endian words has each pair of bytes swapped
//! relative to the little endian layout, so those streams are walked one word
//! at a time. Unpacked masks hold one byte per pixel, 0x00 or 0xFF.

use crate::error::{PresentationStateError, Result};

const ON: u8 = 0xFF;
const OFF: u8 = 0x00;

/// Packed overlay bits with the geometry needed to unpack one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedOverlay {
    bit_offset: usize,
    rows: usize,
    columns: usize,
    big_endian_words: bool,
    raw: Vec<u8>,
}

impl PackedOverlay {
    pub fn new(rows: usize, columns: usize, big_endian_words: bool, raw: Vec<u8>) -> Self {
        Self {
            bit_offset: 0,
            rows,
            columns,
            big_endian_words,
            raw,
        }
    }

    /// Selects the frame starting at `bit_offset` in a multi-frame stream
    pub fn with_bit_offset(mut self, bit_offset: usize) -> Self {
        self.bit_offset = bit_offset;
        self
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    /// Unpacks to an 8-bit mask of `rows * columns` bytes
    pub fn unpack(&self) -> Result<Vec<u8>> {
        decode(
            &self.raw,
            self.bit_offset,
            self.rows,
            self.columns,
            self.big_endian_words,
        )
    }
}

/// Number of bytes needed to pack `pixels` bits, rounded up to an even length
pub fn packed_length(pixels: usize) -> usize {
    let bytes = pixels.div_ceil(8);
    bytes + bytes % 2
}

/// Packs an unpacked overlay into DICOM overlay data
///
/// `raw` holds one sample per pixel, 8 or 16 bits wide as given by
/// `bits_allocated` (16-bit samples are little endian). A pixel is on when any
/// of the `bits_stored` bits ending at `high_bit` is set.
pub fn encode(
    rows: usize,
    columns: usize,
    bits_stored: u16,
    bits_allocated: u16,
    high_bit: u16,
    big_endian_words: bool,
    raw: &[u8],
) -> Result<Vec<u8>> {
    if bits_allocated != 8 && bits_allocated != 16 {
        return Err(codec_error("bits allocated must be either 8 or 16"));
    }
    if bits_stored == 0
        || bits_stored > bits_allocated
        || high_bit >= bits_allocated
        || high_bit + 1 < bits_stored
    {
        return Err(codec_error(format!(
            "invalid bits stored {} / high bit {}",
            bits_stored, high_bit
        )));
    }

    let length = rows * columns;
    let mask = ((1u32 << bits_stored) - 1) << (high_bit + 1 - bits_stored);
    let mut packed = vec![0u8; packed_length(length)];

    if bits_allocated == 8 {
        let mask = mask as u8;
        if mask == 0 {
            return Err(codec_error("input mask was not specified"));
        }
        if raw.len() < length {
            return Err(codec_error(
                "input does not contain sufficient information",
            ));
        }
        pack_bits(|i| raw[i] & mask != 0, &mut packed, 0, length, big_endian_words)?;
    } else {
        let mask = mask as u16;
        if mask == 0 {
            return Err(codec_error("input mask was not specified"));
        }
        if raw.len() < length * 2 {
            return Err(codec_error(
                "input does not contain sufficient information",
            ));
        }
        pack_bits(
            |i| u16::from_le_bytes([raw[2 * i], raw[2 * i + 1]]) & mask != 0,
            &mut packed,
            0,
            length,
            big_endian_words,
        )?;
    }

    Ok(packed)
}

/// Packs an 8-bit mask (0 or non-zero per pixel)
pub fn encode_mask(rows: usize, columns: usize, big_endian_words: bool, mask: &[u8]) -> Result<Vec<u8>> {
    encode(rows, columns, 8, 8, 7, big_endian_words, mask)
}

/// Unpacks `rows * columns` bits starting at `bit_offset`
pub fn decode(
    packed: &[u8],
    bit_offset: usize,
    rows: usize,
    columns: usize,
    big_endian_words: bool,
) -> Result<Vec<u8>> {
    let length = rows * columns;
    if big_endian_words && packed.len() % 2 == 1 {
        return Err(codec_error("input must be even-length"));
    }
    if packed.len() * 8 < bit_offset + length {
        return Err(codec_error(format!(
            "{} bytes of overlay data cannot hold {} bits at offset {}",
            packed.len(),
            length,
            bit_offset
        )));
    }

    let mut out = vec![OFF; length];
    let mut out_pos = 0;

    if big_endian_words {
        let mut bit_mask: u32 = 1 << (bit_offset % 16);
        let mut in_pos = 2 * (bit_offset / 16);
        while out_pos < length && in_pos + 1 < packed.len() {
            let window = ((packed[in_pos] as u32) << 8) | packed[in_pos + 1] as u32;
            while bit_mask <= 0x8000 && out_pos < length {
                out[out_pos] = if window & bit_mask != 0 { ON } else { OFF };
                out_pos += 1;
                bit_mask <<= 1;
            }
            bit_mask = 1;
            in_pos += 2;
        }
    } else {
        let mut bit_mask: u32 = 1 << (bit_offset % 8);
        let mut in_pos = bit_offset / 8;
        while out_pos < length && in_pos < packed.len() {
            let window = packed[in_pos] as u32;
            while bit_mask <= 0x80 && out_pos < length {
                out[out_pos] = if window & bit_mask != 0 { ON } else { OFF };
                out_pos += 1;
                bit_mask <<= 1;
            }
            bit_mask = 1;
            in_pos += 1;
        }
    }

    Ok(out)
}

/// Extracts an overlay embedded in the unused high bits of pixel data
///
/// `frame_length` is the size of one frame in bytes; the result holds one
/// mask byte per pixel of the frame at `frame_index`.
pub fn extract_from_pixel_data(
    bit_position: u16,
    bits_allocated: u16,
    frame_index: usize,
    frame_length: usize,
    big_endian_words: bool,
    pixel_data: &[u8],
) -> Result<Vec<u8>> {
    if bits_allocated != 8 && bits_allocated != 16 {
        return Err(codec_error("bits allocated must be either 8 or 16"));
    }
    if bit_position >= bits_allocated {
        return Err(codec_error(format!(
            "bit position {} must be below bits allocated {}",
            bit_position, bits_allocated
        )));
    }
    if bits_allocated == 16 && big_endian_words && pixel_data.len() % 2 == 1 {
        return Err(codec_error("input must be even-length"));
    }

    let bytes_per_pixel = (bits_allocated / 8) as usize;
    let length = frame_length / bytes_per_pixel;
    let offset = frame_index * frame_length;
    if pixel_data.len() < offset + length * bytes_per_pixel {
        return Err(codec_error(format!(
            "pixel data too short for frame {}",
            frame_index
        )));
    }

    let frame = &pixel_data[offset..offset + length * bytes_per_pixel];
    let out = if bits_allocated == 16 {
        let bit_mask = 1u16 << bit_position;
        frame
            .chunks_exact(2)
            .map(|w| {
                let word = if big_endian_words {
                    u16::from_be_bytes([w[0], w[1]])
                } else {
                    u16::from_le_bytes([w[0], w[1]])
                };
                if word & bit_mask != 0 {
                    ON
                } else {
                    OFF
                }
            })
            .collect()
    } else {
        let bit_mask = 1u8 << bit_position;
        frame
            .iter()
            .map(|b| if b & bit_mask != 0 { ON } else { OFF })
            .collect()
    };

    Ok(out)
}

fn pack_bits<F>(
    is_on: F,
    packed: &mut [u8],
    offset: usize,
    length: usize,
    big_endian_words: bool,
) -> Result<()>
where
    F: Fn(usize) -> bool,
{
    if big_endian_words && packed.len() % 2 == 1 {
        return Err(codec_error("output must be even-length"));
    }
    if packed.len() * 8 < offset + length {
        return Err(codec_error("output does not have sufficient room"));
    }

    let mut in_pos = 0;
    if big_endian_words {
        let mut bit_mask: u32 = 1 << (offset % 16);
        let mut out_pos = 2 * (offset / 16);
        while in_pos < length && out_pos + 1 < packed.len() {
            let mut window = ((packed[out_pos] as u32) << 8) | packed[out_pos + 1] as u32;
            while bit_mask <= 0x8000 && in_pos < length {
                if is_on(in_pos) {
                    window |= bit_mask;
                } else {
                    window &= !bit_mask;
                }
                in_pos += 1;
                bit_mask <<= 1;
            }
            packed[out_pos] = ((window >> 8) & 0xFF) as u8;
            packed[out_pos + 1] = (window & 0xFF) as u8;
            bit_mask = 1;
            out_pos += 2;
        }
    } else {
        let mut bit_mask: u32 = 1 << (offset % 8);
        let mut out_pos = offset / 8;
        while in_pos < length && out_pos < packed.len() {
            let mut window = packed[out_pos] as u32;
            while bit_mask <= 0x80 && in_pos < length {
                if is_on(in_pos) {
                    window |= bit_mask;
                } else {
                    window &= !bit_mask;
                }
                in_pos += 1;
                bit_mask <<= 1;
            }
            packed[out_pos] = window as u8;
            bit_mask = 1;
            out_pos += 1;
        }
    }
    Ok(())
}

fn codec_error(msg: impl Into<String>) -> PresentationStateError {
    PresentationStateError::Codec(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn checkerboard(rows: usize, columns: usize) -> Vec<u8> {
        (0..rows * columns)
            .map(|i| if (i / columns + i % columns) % 2 == 0 { ON } else { OFF })
            .collect()
    }

    fn stripes(rows: usize, columns: usize) -> Vec<u8> {
        (0..rows * columns)
            .map(|i| if i % 3 == 0 || i % 7 == 0 { ON } else { OFF })
            .collect()
    }

    #[test]
    fn test_packed_length_is_even() {
        assert_eq!(packed_length(0), 0);
        assert_eq!(packed_length(1), 2);
        assert_eq!(packed_length(16), 2);
        assert_eq!(packed_length(17), 4);
        assert_eq!(packed_length(10 * 10), 14);
    }

    #[test]
    fn test_encode_little_endian_bit_order() {
        let mask = [ON, OFF, OFF, OFF, OFF, OFF, OFF, OFF, ON, ON];
        let packed = encode_mask(1, 10, false, &mask).unwrap();
        assert_eq!(packed, vec![0x01, 0x03]);
    }

    #[test]
    fn test_encode_big_endian_words() {
        let mask = [ON, OFF, OFF, OFF, OFF, OFF, OFF, OFF, ON, ON];
        let packed = encode_mask(1, 10, true, &mask).unwrap();
        assert_eq!(packed, vec![0x03, 0x01]);
    }

    #[rstest]
    #[case(1, 1, false)]
    #[case(7, 9, false)]
    #[case(16, 16, false)]
    #[case(33, 5, false)]
    #[case(1, 1, true)]
    #[case(7, 9, true)]
    #[case(16, 16, true)]
    #[case(33, 5, true)]
    fn test_round_trip(#[case] rows: usize, #[case] columns: usize, #[case] big_endian: bool) {
        for mask in [checkerboard(rows, columns), stripes(rows, columns)] {
            let packed = encode_mask(rows, columns, big_endian, &mask).unwrap();
            assert_eq!(packed.len(), packed_length(rows * columns));
            let unpacked = decode(&packed, 0, rows, columns, big_endian).unwrap();
            assert_eq!(unpacked, mask);
        }
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_multi_frame_offset(#[case] big_endian: bool) {
        let frame1 = checkerboard(3, 3);
        let frame2 = stripes(3, 3);
        let all: Vec<u8> = frame1.iter().chain(frame2.iter()).copied().collect();
        let packed = encode_mask(6, 3, big_endian, &all).unwrap();

        let overlay = PackedOverlay::new(3, 3, big_endian, packed.clone());
        assert_eq!(overlay.unpack().unwrap(), frame1);
        let overlay = PackedOverlay::new(3, 3, big_endian, packed).with_bit_offset(9);
        assert_eq!(overlay.unpack().unwrap(), frame2);
    }

    #[test]
    fn test_encode_16_bit_samples_with_mask() {
        // bits stored 1 at high bit 12: only bit 12 counts
        let samples: Vec<u8> = [0x1000u16, 0x0FFF, 0x1001, 0x0000]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        let packed = encode(2, 2, 1, 16, 12, false, &samples).unwrap();
        assert_eq!(decode(&packed, 0, 2, 2, false).unwrap(), vec![ON, OFF, ON, OFF]);
    }

    #[test]
    fn test_encode_rejects_bad_bits_allocated() {
        let err = encode(1, 1, 1, 12, 0, false, &[0]).unwrap_err();
        assert!(matches!(err, PresentationStateError::Codec(_)));
    }

    #[rstest]
    #[case(8, 8)]
    #[case(8, 200)]
    #[case(16, 16)]
    #[case(16, u16::MAX)]
    fn test_encode_rejects_high_bit_outside_sample(#[case] bits_allocated: u16, #[case] high_bit: u16) {
        let err = encode(1, 1, 1, bits_allocated, high_bit, false, &[0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, PresentationStateError::Codec(_)));
    }

    #[test]
    fn test_encode_rejects_short_input() {
        assert!(encode_mask(2, 2, false, &[ON, ON]).is_err());
    }

    #[test]
    fn test_decode_rejects_short_data() {
        assert!(decode(&[0xFF], 0, 3, 3, false).is_err());
        assert!(decode(&[0xFF, 0xFF], 9, 3, 3, false).is_err());
        assert!(decode(&[0xFF], 0, 1, 1, true).is_err());
    }

    #[test]
    fn test_extract_8_bit() {
        let pixels = [0x80, 0x00, 0x80, 0x7F];
        let mask = extract_from_pixel_data(7, 8, 0, 4, false, &pixels).unwrap();
        assert_eq!(mask, vec![ON, OFF, ON, OFF]);
    }

    #[rstest]
    #[case(false, vec![0x00, 0x10, 0xFF, 0x0F])]
    #[case(true, vec![0x10, 0x00, 0x0F, 0xFF])]
    fn test_extract_16_bit(#[case] big_endian: bool, #[case] pixels: Vec<u8>) {
        let mask = extract_from_pixel_data(12, 16, 0, 4, big_endian, &pixels).unwrap();
        assert_eq!(mask, vec![ON, OFF]);
    }

    #[test]
    fn test_extract_second_frame() {
        let pixels = [0x00, 0x00, 0x01, 0x00];
        let mask = extract_from_pixel_data(0, 8, 1, 2, false, &pixels).unwrap();
        assert_eq!(mask, vec![ON, OFF]);
        assert!(extract_from_pixel_data(0, 8, 2, 2, false, &pixels).is_err());
        assert!(extract_from_pixel_data(8, 8, 0, 2, false, &pixels).is_err());
    }
}
