//! Fitting captured frames to the cube side length.
//!
//! Capture sources usually deliver rasters larger than the cube. Shrinking
//! uses an area average so fine sensor noise does not alias into the
//! palette; enlarging falls back to nearest-neighbour.

use super::frame::{Frame, FRAME_CHANNELS};

/// Resamples a square frame to `size`×`size`, keeping its temporal index.
///
/// The frame must satisfy [`Frame::is_valid`].
pub fn fit_to_cube(frame: &Frame, size: u32) -> Frame {
    let src = frame.size();
    if src == size || size == 0 || src == 0 {
        return frame.clone();
    }

    let out_side = size as usize;
    let mut pixels = Vec::with_capacity(out_side * out_side * FRAME_CHANNELS);

    for oy in 0..size {
        let (y0, y1) = span(oy, src, size);
        for ox in 0..size {
            let (x0, x1) = span(ox, src, size);

            let mut acc = [0u32; 4];
            let mut n = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    let px = frame.pixel(x, y);
                    for c in 0..4 {
                        acc[c] += px[c] as u32;
                    }
                    n += 1;
                }
            }
            for value in acc {
                pixels.push(((value + n / 2) / n) as u8);
            }
        }
    }

    Frame::new(pixels, size, frame.index())
}

/// Source pixel range covered by output pixel `o`; never empty.
fn span(o: u32, src: u32, dst: u32) -> (u32, u32) {
    let start = (o as u64 * src as u64 / dst as u64) as u32;
    let end = ((o as u64 + 1) * src as u64 / dst as u64) as u32;
    (start.min(src - 1), end.max(start + 1).min(src))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_size_is_identity() {
        let frame = Frame::uniform(8, 2, [1, 2, 3, 4]);
        let fitted = fit_to_cube(&frame, 8);
        assert_eq!(fitted.pixels(), frame.pixels());
        assert_eq!(fitted.index(), 2);
    }

    #[test]
    fn test_downsample_averages_blocks() {
        // 4x4 checkerboard of black/white 2x2 blocks -> 2x2 of black/white
        let mut pixels = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                let v = if (x / 2 + y / 2) % 2 == 0 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let frame = Frame::new(pixels, 4, 0);
        let fitted = fit_to_cube(&frame, 2);

        assert!(fitted.is_valid());
        assert_eq!(fitted.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(fitted.pixel(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_uneven_ratio_stays_valid() {
        let frame = Frame::uniform(7, 0, [50, 60, 70, 255]);
        let fitted = fit_to_cube(&frame, 3);
        assert!(fitted.is_valid());
        assert_eq!(fitted.pixel(2, 2), [50, 60, 70, 255]);
    }

    #[test]
    fn test_upsample_nearest() {
        let frame = Frame::uniform(2, 0, [9, 9, 9, 9]);
        let fitted = fit_to_cube(&frame, 5);
        assert!(fitted.is_valid());
        assert_eq!(fitted.pixel(4, 4), [9, 9, 9, 9]);
    }
}
