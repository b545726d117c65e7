//! Symmetric complementary-color pairing.
//!
//! The ideal complement of a color is its 180° hue rotation. Snapping each
//! entry independently to its nearest neighbour does not give a symmetric
//! relation, so the pairing is solved once for the whole palette: every
//! candidate pair (including an entry paired with itself) is scored by how
//! well each side approximates the other's ideal complement, and pairs are
//! accepted greedily from cheapest to most expensive.

use crate::color::{delta_e_76, rgb_to_lab, rotate_hue, Lab};

/// Hue rotation defining a complement.
pub const COMPLEMENT_HUE_SHIFT: f32 = 180.0;

/// Ideal complement of an sRGB color, in Lab.
pub fn ideal_complement(rgb: [u8; 3]) -> Lab {
    rgb_to_lab(rotate_hue(rgb, COMPLEMENT_HUE_SHIFT))
}

/// Computes a symmetric partner index for every color.
///
/// The result satisfies `pairs[pairs[i]] == i` for all `i`.
pub(crate) fn pair_complements(colors: &[[u8; 3]], labs: &[Lab]) -> Vec<u8> {
    let n = colors.len();
    let targets: Vec<Lab> = colors.iter().map(|&c| ideal_complement(c)).collect();

    let mut candidates = Vec::with_capacity(n * (n + 1) / 2);
    for i in 0..n {
        for j in i..n {
            let cost = delta_e_76(targets[i], labs[j]) + delta_e_76(targets[j], labs[i]);
            candidates.push((cost, i, j));
        }
    }
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut pairs: Vec<Option<u8>> = vec![None; n];
    let mut remaining = n;
    for (_, i, j) in candidates {
        if remaining == 0 {
            break;
        }
        if pairs[i].is_some() || pairs[j].is_some() {
            continue;
        }
        pairs[i] = Some(j as u8);
        pairs[j] = Some(i as u8);
        remaining -= if i == j { 1 } else { 2 };
    }

    // Every self-pair is a candidate, so each slot is filled.
    pairs
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.unwrap_or(i as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pair(colors: &[[u8; 3]]) -> Vec<u8> {
        let labs: Vec<Lab> = colors.iter().map(|&c| rgb_to_lab(c)).collect();
        pair_complements(colors, &labs)
    }

    #[test]
    fn test_primaries_pair_with_secondaries() {
        let colors = [
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [0, 255, 255],
            [255, 0, 255],
            [255, 255, 0],
        ];
        assert_eq!(pair(&colors), vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn test_single_entry_is_own_complement() {
        assert_eq!(pair(&[[200, 30, 30]]), vec![0]);
    }

    #[test]
    fn test_grays_pair_with_themselves() {
        assert_eq!(pair(&[[0, 0, 0], [128, 128, 128], [255, 255, 255]]), vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn prop_pairing_is_an_involution(colors in proptest::collection::vec(any::<[u8; 3]>(), 1..40)) {
            let pairs = pair(&colors);
            prop_assert_eq!(pairs.len(), colors.len());
            for (i, &j) in pairs.iter().enumerate() {
                prop_assert_eq!(pairs[j as usize] as usize, i);
            }
        }
    }
}
