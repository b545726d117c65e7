//! Variable-width LZW as used by GIF image data.
//!
//! Codes are packed least-significant bit first. The stream opens with a
//! clear code, widens one bit whenever the next free code no longer fits,
//! stops growing at 12 bits, and emits a clear code to restart once all
//! 4096 codes are taken.

use std::collections::HashMap;

use super::InspectError;

/// Widest code GIF allows.
pub const MAX_CODE_BITS: u32 = 12;
const MAX_CODES: u32 = 1 << MAX_CODE_BITS;
const NO_PREFIX: u32 = u32::MAX;

struct BitWriter {
    data: Vec<u8>,
    current: u32,
    bits: u32,
}

impl BitWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            current: 0,
            bits: 0,
        }
    }

    fn write(&mut self, code: u32, width: u32) {
        self.current |= code << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.data.push(self.current as u8);
            self.current >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.data.push(self.current as u8);
        }
        self.data
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    current: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            current: 0,
            bits: 0,
        }
    }

    fn read(&mut self, width: u32) -> Option<u32> {
        while self.bits < width {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.current |= (byte as u32) << self.bits;
            self.bits += 8;
        }
        let code = self.current & ((1 << width) - 1);
        self.current >>= width;
        self.bits -= width;
        Some(code)
    }
}

/// Compresses palette indices. `min_code_size` must cover every index.
pub fn compress(indices: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u32 << min_code_size;
    let end = clear + 1;
    let reset_width = min_code_size as u32 + 1;

    let mut out = BitWriter::with_capacity(indices.len() / 2 + 16);
    let mut table: HashMap<(u32, u8), u32> = HashMap::with_capacity(MAX_CODES as usize);
    let mut width = reset_width;
    let mut next = end + 1;

    out.write(clear, width);

    let Some((&first, rest)) = indices.split_first() else {
        out.write(end, width);
        return out.finish();
    };

    let mut prefix = first as u32;
    for &byte in rest {
        if let Some(&code) = table.get(&(prefix, byte)) {
            prefix = code;
            continue;
        }

        out.write(prefix, width);
        if next < MAX_CODES {
            table.insert((prefix, byte), next);
            next += 1;
            if next > (1 << width) && width < MAX_CODE_BITS {
                width += 1;
            }
        } else {
            out.write(clear, width);
            table.clear();
            width = reset_width;
            next = end + 1;
        }
        prefix = byte as u32;
    }

    out.write(prefix, width);
    out.write(end, width);
    out.finish()
}

/// Decompresses a GIF LZW stream, producing at most `expected` indices.
pub fn decompress(data: &[u8], min_code_size: u8, expected: usize) -> Result<Vec<u8>, InspectError> {
    if !(2..=8).contains(&min_code_size) {
        return Err(InspectError::InvalidCodeSize(min_code_size));
    }
    let clear = 1u32 << min_code_size;
    let end = clear + 1;
    let reset_width = min_code_size as u32 + 1;

    // Each entry is (prefix code, last byte); roots have no prefix.
    let mut table: Vec<(u32, u8)> = Vec::with_capacity(MAX_CODES as usize);
    let reset_table = |table: &mut Vec<(u32, u8)>| {
        table.clear();
        table.extend((0..clear).map(|c| (NO_PREFIX, c as u8)));
        // Slots of the clear and end codes.
        table.push((NO_PREFIX, 0));
        table.push((NO_PREFIX, 0));
    };
    reset_table(&mut table);

    let mut reader = BitReader::new(data);
    let mut out = Vec::with_capacity(expected);
    let mut width = reset_width;
    let mut prev: Option<u32> = None;
    let mut scratch = Vec::new();

    loop {
        let code = reader.read(width).ok_or(InspectError::UnexpectedEnd)?;

        if code == clear {
            reset_table(&mut table);
            width = reset_width;
            prev = None;
            continue;
        }
        if code == end {
            break;
        }

        let next = table.len() as u32;
        let Some(p) = prev else {
            if code >= clear {
                return Err(InspectError::InvalidCode(code));
            }
            expand(&table, code, &mut scratch);
            out.extend_from_slice(&scratch);
            prev = Some(code);
            continue;
        };

        if code < next {
            expand(&table, code, &mut scratch);
        } else if code == next {
            expand(&table, p, &mut scratch);
            let head = scratch[0];
            scratch.push(head);
        } else {
            return Err(InspectError::InvalidCode(code));
        }
        out.extend_from_slice(&scratch);

        if next < MAX_CODES {
            table.push((p, scratch[0]));
            if table.len() as u32 == (1 << width) && width < MAX_CODE_BITS {
                width += 1;
            }
        }
        prev = Some(code);

        if out.len() > expected {
            return Err(InspectError::PixelCountMismatch {
                expected,
                actual: out.len(),
            });
        }
    }

    Ok(out)
}

/// Writes the string for `code` into `buf`.
fn expand(table: &[(u32, u8)], code: u32, buf: &mut Vec<u8>) {
    buf.clear();
    let mut c = code;
    loop {
        let (prefix, byte) = table[c as usize];
        buf.push(byte);
        if prefix == NO_PREFIX {
            break;
        }
        c = prefix;
    }
    buf.reverse();
}

/// Splits data into GIF sub-blocks of at most 255 bytes plus terminator.
pub fn write_sub_blocks(data: &[u8], out: &mut Vec<u8>) {
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        // clear(4) and end(5) at 3 bits: 100 101 -> 0b00101100
        assert_eq!(compress(&[], 2), vec![0x2C]);
        assert_eq!(decompress(&[0x2C], 2, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_single_index() {
        // clear(4), 1, end(5): 100 001 101 -> bits 0..9 = 0b101_001_100
        assert_eq!(compress(&[1], 2), vec![0x4C, 0x01]);
    }

    #[test]
    fn test_long_run_roundtrip() {
        let data = vec![3u8; 100_000];
        let packed = compress(&data, 2);
        assert!(packed.len() < 2_000);
        assert_eq!(decompress(&packed, 2, data.len()).unwrap(), data);
    }

    #[test]
    fn test_table_reset_roundtrip() {
        // Enough distinct sequences to fill the dictionary several times.
        let data: Vec<u8> = (0..200_000u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();
        let packed = compress(&data, 8);
        assert_eq!(decompress(&packed, 8, data.len()).unwrap(), data);
    }

    #[test]
    fn test_sub_blocks() {
        let mut out = Vec::new();
        write_sub_blocks(&[7u8; 300], &mut out);
        assert_eq!(out.len(), 1 + 255 + 1 + 45 + 1);
        assert_eq!(out[0], 255);
        assert_eq!(out[256], 45);
        assert_eq!(*out.last().unwrap(), 0);
    }

    #[test]
    fn test_invalid_code_rejected() {
        // clear(4) then code 7, which is not yet defined.
        let packed = [0b0011_1100, 0];
        assert!(matches!(
            decompress(&packed, 2, 10),
            Err(InspectError::InvalidCode(7))
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(data in proptest::collection::vec(0u8..16, 0..5000)) {
            let packed = compress(&data, 4);
            prop_assert_eq!(decompress(&packed, 4, data.len()).unwrap(), data);
        }
    }
}
