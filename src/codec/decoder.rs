//! Raster decoder.

use super::{color_hash, FormatError, Op, RasterHeader, CACHE_SIZE, END_MARKER, HEADER_SIZE};

/// A decoded raster together with its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    /// Raw pixel bytes, `channels` per pixel, row-major.
    pub pixels: Vec<u8>,
    /// Header the stream declared.
    pub header: RasterHeader,
}

impl DecodedRaster {
    /// Returns the raster width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Returns the raster height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Returns the channel count.
    #[inline]
    pub fn channels(&self) -> u8 {
        self.header.channels
    }
}

/// Decodes a raster stream produced by [`super::encode`].
///
/// Replays the encoder's cache and previous-pixel state machine. The output
/// has as many channels as the header declares.
pub fn decode(bytes: &[u8]) -> Result<DecodedRaster, FormatError> {
    let header = RasterHeader::read_from(bytes)?;

    if bytes.len() < HEADER_SIZE + END_MARKER.len() {
        return Err(FormatError::Truncated { offset: bytes.len() });
    }
    let chunks = &bytes[..bytes.len() - END_MARKER.len()];

    let channels = header.channels as usize;
    let pixel_count = header.pixel_count();
    let mut pixels = Vec::with_capacity(header.buffer_len());

    let mut cache = [[0u8; 4]; CACHE_SIZE];
    let mut prev = [0u8, 0, 0, 255];
    let mut pos = HEADER_SIZE;
    let mut run = 0u8;

    for _ in 0..pixel_count {
        let px = if run > 0 {
            run -= 1;
            prev
        } else {
            let op = Op::read(chunks, &mut pos)?;
            if let Op::Run(len) = op {
                run = len - 1;
            }
            op.apply(prev, &cache)
        };

        cache[color_hash(px)] = px;
        prev = px;
        pixels.extend_from_slice(&px[..channels]);
    }

    if bytes.get(pos..pos + END_MARKER.len()) != Some(&END_MARKER[..]) {
        return Err(FormatError::MissingEndMarker);
    }

    Ok(DecodedRaster { pixels, header })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use proptest::prelude::*;

    #[test]
    fn test_all_white_roundtrip() {
        let pixels = [255u8; 16];
        let decoded = decode(&encode(&pixels, 2, 2, 4).unwrap()).unwrap();
        assert_eq!(decoded.pixels, pixels.to_vec());
        assert_eq!((decoded.width(), decoded.height(), decoded.channels()), (2, 2, 4));
    }

    #[test]
    fn test_rgb_roundtrip_gradient() {
        let pixels: Vec<u8> = (0..32 * 32 * 3).map(|i| (i * 7 % 251) as u8).collect();
        let decoded = decode(&encode(&pixels, 32, 32, 3).unwrap()).unwrap();
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn test_bad_magic() {
        let mut encoded = encode(&[0u8; 12], 2, 2, 3).unwrap();
        encoded[0] = b'x';
        assert_eq!(decode(&encoded), Err(FormatError::InvalidMagic));
    }

    #[test]
    fn test_truncated_body() {
        let pixels: Vec<u8> = (0..64 * 4).map(|i| (i * 31) as u8).collect();
        let encoded = encode(&pixels, 8, 8, 4).unwrap();
        let cut = &encoded[..encoded.len() / 2];
        assert!(decode(cut).is_err());
    }

    #[test]
    fn test_missing_end_marker() {
        let mut encoded = encode(&[9u8; 12], 2, 2, 3).unwrap();
        let len = encoded.len();
        encoded[len - 1] = 0;
        assert_eq!(decode(&encoded), Err(FormatError::MissingEndMarker));
    }

    #[test]
    fn test_header_only_is_truncated() {
        let encoded = encode(&[1u8; 12], 2, 2, 3).unwrap();
        assert!(matches!(
            decode(&encoded[..HEADER_SIZE]),
            Err(FormatError::Truncated { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_rgba_roundtrip(w in 1u32..24, h in 1u32..24, seed in any::<u64>(), palette in 1usize..8) {
            // A small palette makes runs and cache hits likely.
            let colors: Vec<[u8; 4]> = (0..palette)
                .map(|i| {
                    let v = seed.rotate_left(i as u32 * 8).to_le_bytes();
                    [v[0], v[1], v[2], v[3]]
                })
                .collect();
            let pixels: Vec<u8> = (0..(w * h) as usize)
                .flat_map(|i| colors[(i * 7).wrapping_add(seed as usize) % palette])
                .collect();

            let decoded = decode(&encode(&pixels, w, h, 4).unwrap()).unwrap();
            prop_assert_eq!(decoded.pixels, pixels);
        }

        #[test]
        fn prop_arbitrary_rgb_roundtrip(pixels in proptest::collection::vec(any::<u8>(), 3..600)) {
            let count = pixels.len() / 3;
            let pixels = &pixels[..count * 3];
            let decoded = decode(&encode(pixels, count as u32, 1, 3).unwrap()).unwrap();
            prop_assert_eq!(&decoded.pixels[..], pixels);
        }
    }
}
