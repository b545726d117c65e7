//! Opcode set of the intermediate raster stream.
//!
//! Every chunk in the stream starts with a tag byte. The two 8-bit tags
//! (`RGB`, `RGBA`) take precedence over the 2-bit tags, which is why a run
//! can never be longer than 62 pixels.

use super::FormatError;

/// 8-bit tag for an RGB literal.
const TAG_RGB: u8 = 0xFE;
/// 8-bit tag for an RGBA literal.
const TAG_RGBA: u8 = 0xFF;
/// 2-bit tag for a cache reference.
const TAG_INDEX: u8 = 0x00;
/// 2-bit tag for a small per-channel delta.
const TAG_DIFF: u8 = 0x40;
/// 2-bit tag for a luma-based delta.
const TAG_LUMA: u8 = 0x80;
/// 2-bit tag for a run of the previous pixel.
const TAG_RUN: u8 = 0xC0;
/// Mask selecting the 2-bit tag.
const TAG_MASK: u8 = 0xC0;

/// Longest run a single chunk can encode.
pub const MAX_RUN: u8 = 62;

/// One decoded chunk of the raster stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Reference to a slot of the rolling color cache (0..64).
    Index(u8),
    /// Per-channel delta against the previous pixel, each in -2..=1.
    Diff {
        /// Red delta.
        dr: i8,
        /// Green delta.
        dg: i8,
        /// Blue delta.
        db: i8,
    },
    /// Green delta in -32..=31 with red/blue expressed relative to it (-8..=7).
    Luma {
        /// Green delta.
        dg: i8,
        /// Red delta minus green delta.
        dr_dg: i8,
        /// Blue delta minus green delta.
        db_dg: i8,
    },
    /// Repeat the previous pixel 1..=62 times.
    Run(u8),
    /// Literal color keeping the previous alpha.
    Rgb([u8; 3]),
    /// Literal color including alpha.
    Rgba([u8; 4]),
}

impl Op {
    /// Picks the delta or literal opcode that turns `prev` into `px`.
    ///
    /// Deltas are only possible when alpha is unchanged.
    pub fn delta_or_literal(prev: [u8; 4], px: [u8; 4]) -> Self {
        if px[3] != prev[3] {
            return Op::Rgba(px);
        }

        let dr = px[0].wrapping_sub(prev[0]) as i8;
        let dg = px[1].wrapping_sub(prev[1]) as i8;
        let db = px[2].wrapping_sub(prev[2]) as i8;

        if (-2..=1).contains(&dr) && (-2..=1).contains(&dg) && (-2..=1).contains(&db) {
            return Op::Diff { dr, dg, db };
        }

        let dr_dg = dr.wrapping_sub(dg);
        let db_dg = db.wrapping_sub(dg);
        if (-32..=31).contains(&dg) && (-8..=7).contains(&dr_dg) && (-8..=7).contains(&db_dg) {
            return Op::Luma { dg, dr_dg, db_dg };
        }

        Op::Rgb([px[0], px[1], px[2]])
    }

    /// Appends the encoded chunk to `out`.
    pub fn write_to(self, out: &mut Vec<u8>) {
        match self {
            Op::Index(slot) => out.push(TAG_INDEX | (slot & 0x3F)),
            Op::Diff { dr, dg, db } => {
                let bias = |d: i8| ((d + 2) as u8) & 0x03;
                out.push(TAG_DIFF | (bias(dr) << 4) | (bias(dg) << 2) | bias(db));
            }
            Op::Luma { dg, dr_dg, db_dg } => {
                out.push(TAG_LUMA | (((dg + 32) as u8) & 0x3F));
                out.push(((((dr_dg + 8) as u8) & 0x0F) << 4) | (((db_dg + 8) as u8) & 0x0F));
            }
            Op::Run(len) => out.push(TAG_RUN | ((len - 1) & 0x3F)),
            Op::Rgb(rgb) => {
                out.push(TAG_RGB);
                out.extend_from_slice(&rgb);
            }
            Op::Rgba(rgba) => {
                out.push(TAG_RGBA);
                out.extend_from_slice(&rgba);
            }
        }
    }

    /// Reads one chunk starting at `*pos`, advancing the cursor.
    ///
    /// `bytes` must already exclude the end marker so that a stream cut
    /// short is reported as truncation rather than decoded from padding.
    pub fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, FormatError> {
        let tag = take(bytes, pos, 1)?[0];

        let op = match tag {
            TAG_RGB => {
                let b = take(bytes, pos, 3)?;
                Op::Rgb([b[0], b[1], b[2]])
            }
            TAG_RGBA => {
                let b = take(bytes, pos, 4)?;
                Op::Rgba([b[0], b[1], b[2], b[3]])
            }
            _ => match tag & TAG_MASK {
                TAG_INDEX => Op::Index(tag & 0x3F),
                TAG_DIFF => Op::Diff {
                    dr: ((tag >> 4) & 0x03) as i8 - 2,
                    dg: ((tag >> 2) & 0x03) as i8 - 2,
                    db: (tag & 0x03) as i8 - 2,
                },
                TAG_LUMA => {
                    let b = take(bytes, pos, 1)?[0];
                    Op::Luma {
                        dg: (tag & 0x3F) as i8 - 32,
                        dr_dg: (b >> 4) as i8 - 8,
                        db_dg: (b & 0x0F) as i8 - 8,
                    }
                }
                _ => Op::Run((tag & 0x3F) + 1),
            },
        };

        Ok(op)
    }

    /// Applies this chunk to the decoder state, returning the new pixel.
    ///
    /// Runs are handled by the caller; for them this returns `prev`.
    pub fn apply(self, prev: [u8; 4], cache: &[[u8; 4]; 64]) -> [u8; 4] {
        match self {
            Op::Index(slot) => cache[slot as usize & 0x3F],
            Op::Diff { dr, dg, db } => [
                prev[0].wrapping_add(dr as u8),
                prev[1].wrapping_add(dg as u8),
                prev[2].wrapping_add(db as u8),
                prev[3],
            ],
            Op::Luma { dg, dr_dg, db_dg } => {
                let dr = dr_dg.wrapping_add(dg);
                let db = db_dg.wrapping_add(dg);
                [
                    prev[0].wrapping_add(dr as u8),
                    prev[1].wrapping_add(dg as u8),
                    prev[2].wrapping_add(db as u8),
                    prev[3],
                ]
            }
            Op::Run(_) => prev,
            Op::Rgb([r, g, b]) => [r, g, b, prev[3]],
            Op::Rgba(rgba) => rgba,
        }
    }
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], FormatError> {
    let end = *pos + n;
    let slice = bytes.get(*pos..end).ok_or(FormatError::Truncated { offset: *pos })?;
    *pos = end;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(op: Op) -> Op {
        let mut buf = Vec::new();
        op.write_to(&mut buf);
        let mut pos = 0;
        let decoded = Op::read(&buf, &mut pos).unwrap();
        assert_eq!(pos, buf.len());
        decoded
    }

    #[test]
    fn test_tag_layout() {
        let mut buf = Vec::new();
        Op::Run(1).write_to(&mut buf);
        Op::Run(62).write_to(&mut buf);
        Op::Index(63).write_to(&mut buf);
        Op::Diff { dr: 0, dg: 0, db: 0 }.write_to(&mut buf);
        assert_eq!(buf, vec![0xC0, 0xFD, 0x3F, 0x6A]);
    }

    #[test]
    fn test_extremes_survive() {
        for op in [
            Op::Diff { dr: -2, dg: 1, db: -1 },
            Op::Luma { dg: -32, dr_dg: 7, db_dg: -8 },
            Op::Luma { dg: 31, dr_dg: -8, db_dg: 7 },
            Op::Run(62),
            Op::Rgb([1, 2, 3]),
            Op::Rgba([4, 5, 6, 7]),
        ] {
            assert_eq!(roundtrip(op), op);
        }
    }

    #[test]
    fn test_delta_selection() {
        let prev = [100, 100, 100, 255];
        assert!(matches!(
            Op::delta_or_literal(prev, [101, 99, 98, 255]),
            Op::Diff { .. }
        ));
        assert!(matches!(
            Op::delta_or_literal(prev, [110, 105, 100, 255]),
            Op::Luma { .. }
        ));
        assert!(matches!(
            Op::delta_or_literal(prev, [0, 200, 50, 255]),
            Op::Rgb(_)
        ));
        assert!(matches!(
            Op::delta_or_literal(prev, [100, 100, 100, 0]),
            Op::Rgba(_)
        ));
    }

    #[test]
    fn test_diff_wraps_around() {
        let prev = [255, 0, 128, 255];
        let px = [0, 255, 128, 255];
        let op = Op::delta_or_literal(prev, px);
        assert_eq!(op, Op::Diff { dr: 1, dg: -1, db: 0 });
        assert_eq!(op.apply(prev, &[[0; 4]; 64]), px);
    }

    #[test]
    fn test_truncated_literal() {
        let mut pos = 0;
        assert!(matches!(
            Op::read(&[0xFF, 1, 2], &mut pos),
            Err(FormatError::Truncated { .. })
        ));
    }
}
