//! Raster encoder.

use super::{color_hash, FormatError, Op, RasterHeader, CACHE_SIZE, END_MARKER, HEADER_SIZE, MAX_RUN};

/// Encodes an RGB or RGBA raster with the sRGB colorspace tag.
pub fn encode(pixels: &[u8], width: u32, height: u32, channels: u8) -> Result<Vec<u8>, FormatError> {
    encode_with(pixels, &RasterHeader::new(width, height, channels))
}

/// Encodes a raster described by an explicit header.
pub fn encode_with(pixels: &[u8], header: &RasterHeader) -> Result<Vec<u8>, FormatError> {
    header.validate()?;
    if pixels.len() != header.buffer_len() {
        return Err(FormatError::BufferSizeMismatch {
            expected: header.buffer_len(),
            actual: pixels.len(),
        });
    }

    let channels = header.channels as usize;
    let pixel_count = header.pixel_count();

    // Initial guess for a typical frame; the buffer grows past it as needed.
    let mut out = Vec::with_capacity(HEADER_SIZE + pixel_count / 2 + END_MARKER.len());
    header.write_to(&mut out);

    let mut cache = [[0u8; 4]; CACHE_SIZE];
    let mut prev = [0u8, 0, 0, 255];
    let mut run = 0u8;

    for (i, chunk) in pixels.chunks_exact(channels).enumerate() {
        let px = if channels == 4 {
            [chunk[0], chunk[1], chunk[2], chunk[3]]
        } else {
            [chunk[0], chunk[1], chunk[2], 255]
        };

        if px == prev {
            run += 1;
            if run == MAX_RUN || i + 1 == pixel_count {
                Op::Run(run).write_to(&mut out);
                run = 0;
            }
        } else {
            if run > 0 {
                Op::Run(run).write_to(&mut out);
                run = 0;
            }

            let slot = color_hash(px);
            let op = if cache[slot] == px {
                Op::Index(slot as u8)
            } else {
                Op::delta_or_literal(prev, px)
            };
            op.write_to(&mut out);
        }

        cache[color_hash(px)] = px;
        prev = px;
    }

    out.extend_from_slice(&END_MARKER);

    tracing::trace!(
        width = header.width,
        height = header.height,
        raw_bytes = pixels.len(),
        encoded_bytes = out.len(),
        "Encoded raster"
    );

    Ok(out)
}
