//! Structural reader for GIF streams.
//!
//! Walks every block of a stream, LZW-decodes the image data and reports
//! what it found. Used to verify encoder output and by the `inspect`
//! command.

use super::encoder::{DisposalMethod, LoopCount, GIF_TRAILER};
use super::lzw::decompress;
use super::InspectError;

/// One decoded image of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifFrame {
    /// Left offset on the logical screen.
    pub left: u16,
    /// Top offset on the logical screen.
    pub top: u16,
    /// Image width in pixels.
    pub width: u16,
    /// Image height in pixels.
    pub height: u16,
    /// Delay before the next frame, in centiseconds.
    pub delay_cs: u16,
    /// Disposal method from the graphic control extension.
    pub disposal: DisposalMethod,
    /// LZW minimum code size.
    pub min_code_size: u8,
    /// Size of the compressed image data, excluding sub-block headers.
    pub compressed_bytes: usize,
    /// Decoded color table indices, row-major.
    pub indices: Vec<u8>,
}

/// What a GIF stream contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifSummary {
    /// Version from the signature (`87a` or `89a`).
    pub version: String,
    /// Logical screen width.
    pub width: u16,
    /// Logical screen height.
    pub height: u16,
    /// Number of entries in the global color table (0 if absent).
    pub global_table_size: usize,
    /// Global color table entries.
    pub global_table: Vec<[u8; 3]>,
    /// Loop count from the NETSCAPE2.0 block, if present.
    pub loop_count: Option<LoopCount>,
    /// Decoded images in stream order.
    pub frames: Vec<GifFrame>,
    /// Bytes consumed up to and including the trailer.
    pub total_bytes: usize,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, InspectError> {
        let v = *self
            .bytes
            .get(self.pos)
            .ok_or(InspectError::Truncated { offset: self.pos })?;
        self.pos += 1;
        Ok(v)
    }

    fn u16(&mut self) -> Result<u16, InspectError> {
        let lo = self.u8()?;
        let hi = self.u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], InspectError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or(InspectError::Truncated { offset: self.pos })?;
        self.pos += n;
        Ok(slice)
    }

    /// Concatenates data sub-blocks up to the terminator.
    fn sub_blocks(&mut self) -> Result<Vec<u8>, InspectError> {
        let mut data = Vec::new();
        loop {
            let len = self.u8()? as usize;
            if len == 0 {
                return Ok(data);
            }
            data.extend_from_slice(self.take(len)?);
        }
    }
}

/// Parses a GIF stream and decodes every frame.
pub fn inspect(bytes: &[u8]) -> Result<GifSummary, InspectError> {
    let mut r = Reader { bytes, pos: 0 };

    let signature = r.take(6)?;
    if &signature[..3] != b"GIF" || !matches!(&signature[3..], b"87a" | b"89a") {
        return Err(InspectError::InvalidSignature);
    }
    let version = String::from_utf8_lossy(&signature[3..]).into_owned();

    let width = r.u16()?;
    let height = r.u16()?;
    let packed = r.u8()?;
    let _background = r.u8()?;
    let _aspect = r.u8()?;

    let (global_table_size, global_table) = if packed & 0x80 != 0 {
        let size = 2usize << (packed & 0x07);
        (size, read_table(&mut r, size)?)
    } else {
        (0, Vec::new())
    };

    let mut loop_count = None;
    let mut frames = Vec::new();
    let mut delay_cs = 0u16;
    let mut disposal = DisposalMethod::Unspecified;

    loop {
        let offset = r.pos;
        match r.u8()? {
            0x21 => {
                let label = r.u8()?;
                let body = r.sub_blocks()?;
                match label {
                    0xF9 if body.len() >= 4 => {
                        disposal = DisposalMethod::from_u8((body[0] >> 2) & 0x07)
                            .unwrap_or(DisposalMethod::Unspecified);
                        delay_cs = u16::from_le_bytes([body[1], body[2]]);
                    }
                    0xFF if body.starts_with(b"NETSCAPE2.0") && body.len() >= 14 && body[11] == 0x01 => {
                        // The identifier block and the data block are
                        // concatenated: [id(11)] [0x01 lo hi].
                        loop_count = Some(LoopCount::from_wire(u16::from_le_bytes([body[12], body[13]])));
                    }
                    _ => {}
                }
            }
            0x2C => {
                let left = r.u16()?;
                let top = r.u16()?;
                let w = r.u16()?;
                let h = r.u16()?;
                let flags = r.u8()?;
                if flags & 0x80 != 0 {
                    read_table(&mut r, 2usize << (flags & 0x07))?;
                }
                let min_code_size = r.u8()?;
                let data = r.sub_blocks()?;

                let expected = w as usize * h as usize;
                let indices = decompress(&data, min_code_size, expected)?;
                if indices.len() != expected {
                    return Err(InspectError::PixelCountMismatch {
                        expected,
                        actual: indices.len(),
                    });
                }

                frames.push(GifFrame {
                    left,
                    top,
                    width: w,
                    height: h,
                    delay_cs,
                    disposal,
                    min_code_size,
                    compressed_bytes: data.len(),
                    indices,
                });
                delay_cs = 0;
                disposal = DisposalMethod::Unspecified;
            }
            GIF_TRAILER => break,
            tag => return Err(InspectError::UnknownBlock { offset, tag }),
        }
    }

    Ok(GifSummary {
        version,
        width,
        height,
        global_table_size,
        global_table,
        loop_count,
        frames,
        total_bytes: r.pos,
    })
}

fn read_table(r: &mut Reader<'_>, size: usize) -> Result<Vec<[u8; 3]>, InspectError> {
    let raw = r.take(size * 3)?;
    Ok(raw.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimatedImageEncoder, AnimationConfig};
    use crate::palette::Palette;
    use crate::tensor::CubeTensor;
    use std::sync::Arc;

    fn noisy_tensor(size: usize) -> CubeTensor {
        let colors: Vec<[u8; 3]> = (0..5u8).map(|i| [i * 50, 255 - i * 50, 7]).collect();
        let indices = (0..size.pow(3))
            .map(|i: usize| (i.wrapping_mul(2654435761) >> 13) as u8 % 5)
            .collect();
        CubeTensor {
            size,
            indices,
            palette: Arc::new(Palette::new(&colors).unwrap()),
            raw: None,
        }
    }

    #[test]
    fn test_encoder_roundtrip() {
        let tensor = noisy_tensor(12);
        let encoder = AnimatedImageEncoder::new(AnimationConfig {
            frame_delay_cs: 9,
            loop_count: LoopCount::Finite(2),
            ..Default::default()
        })
        .unwrap();
        let bytes = encoder.encode(&tensor).unwrap();
        let summary = inspect(&bytes).unwrap();

        assert_eq!(summary.version, "89a");
        assert_eq!((summary.width, summary.height), (12, 12));
        assert_eq!(summary.global_table_size, 8);
        assert_eq!(summary.global_table[..5], tensor.palette.colors()[..]);
        assert_eq!(summary.global_table[7], [0, 0, 0]);
        assert_eq!(summary.loop_count, Some(LoopCount::Finite(2)));
        assert_eq!(summary.frames.len(), 12);
        assert_eq!(summary.total_bytes, bytes.len());

        for (z, frame) in summary.frames.iter().enumerate() {
            assert_eq!(frame.delay_cs, 9);
            assert_eq!(frame.disposal, DisposalMethod::Keep);
            assert_eq!(frame.min_code_size, 3);
            assert_eq!(frame.indices, tensor.slice(z));
        }
    }

    #[test]
    fn test_large_slices_roundtrip() {
        // 96² indices per slice overflow the 4096-code dictionary.
        let tensor = noisy_tensor(96);
        let bytes = AnimatedImageEncoder::default().encode(&tensor).unwrap();
        let summary = inspect(&bytes).unwrap();
        assert_eq!(summary.loop_count, Some(LoopCount::Infinite));
        for (z, frame) in summary.frames.iter().enumerate() {
            assert_eq!(frame.indices, tensor.slice(z));
        }
    }

    #[test]
    fn test_bad_signature() {
        assert!(matches!(
            inspect(b"PNG89a\0\0\0\0\0\0\0"),
            Err(InspectError::InvalidSignature)
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = AnimatedImageEncoder::default().encode(&noisy_tensor(4)).unwrap();
        assert!(inspect(&bytes[..bytes.len() - 5]).is_err());
    }

    #[test]
    fn test_unknown_block() {
        let mut bytes = AnimatedImageEncoder::default().encode(&noisy_tensor(2)).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0x99;
        assert!(matches!(
            inspect(&bytes),
            Err(InspectError::UnknownBlock { tag: 0x99, .. })
        ));
    }
}
