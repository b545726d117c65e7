//! sRGB ↔ CIE L*a*b* (D65) conversion and ΔE metrics.

use serde::{Deserialize, Serialize};

/// D65 reference white.
const WHITE_X: f64 = 0.950_47;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.088_83;

const EPSILON: f64 = 216.0 / 24389.0;
const KAPPA: f64 = 24389.0 / 27.0;

/// A color in CIE L*a*b*.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lab {
    /// Lightness, [0, 100].
    pub l: f32,
    /// Green-red axis.
    pub a: f32,
    /// Blue-yellow axis.
    pub b: f32,
}

impl Lab {
    /// Creates a color from its components.
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    /// Chroma (distance from the neutral axis).
    #[inline]
    pub fn chroma(&self) -> f32 {
        self.a.hypot(self.b)
    }
}

/// Color difference formula used for palette lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean distance in Lab.
    #[default]
    Cie76,
    /// CIEDE2000 with unit weights.
    Ciede2000,
}

impl DistanceMetric {
    /// Returns the difference between two colors under this metric.
    #[inline]
    pub fn distance(self, x: Lab, y: Lab) -> f32 {
        match self {
            DistanceMetric::Cie76 => delta_e_76(x, y),
            DistanceMetric::Ciede2000 => delta_e_2000(x, y),
        }
    }
}

#[inline]
fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
fn lab_f_inv(t: f64) -> f64 {
    let t3 = t * t * t;
    if t3 > EPSILON {
        t3
    } else {
        (116.0 * t - 16.0) / KAPPA
    }
}

/// Converts an 8-bit sRGB color to Lab.
pub fn rgb_to_lab(rgb: [u8; 3]) -> Lab {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y / WHITE_Y);
    let fz = lab_f(z / WHITE_Z);

    Lab {
        l: (116.0 * fy - 16.0) as f32,
        a: (500.0 * (fx - fy)) as f32,
        b: (200.0 * (fy - fz)) as f32,
    }
}

/// Converts Lab back to 8-bit sRGB, clamping out-of-gamut values.
pub fn lab_to_rgb(lab: Lab) -> [u8; 3] {
    let fy = (lab.l as f64 + 16.0) / 116.0;
    let fx = fy + lab.a as f64 / 500.0;
    let fz = fy - lab.b as f64 / 200.0;

    let x = lab_f_inv(fx) * WHITE_X;
    let y = lab_f_inv(fy) * WHITE_Y;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}

/// CIE76 color difference.
#[inline]
pub fn delta_e_76(x: Lab, y: Lab) -> f32 {
    let dl = x.l - y.l;
    let da = x.a - y.a;
    let db = x.b - y.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// CIEDE2000 color difference (kL = kC = kH = 1).
pub fn delta_e_2000(x: Lab, y: Lab) -> f32 {
    use std::f64::consts::PI;
    const TWO_PI: f64 = 2.0 * PI;
    const POW25_7: f64 = 6_103_515_625.0;

    let (l1, a1, b1) = (x.l as f64, x.a as f64, x.b as f64);
    let (l2, a2, b2) = (y.l as f64, y.a as f64, y.b as f64);

    let c_bar = (a1.hypot(b1) + a2.hypot(b2)) / 2.0;
    let c_bar_7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar_7 / (c_bar_7 + POW25_7)).sqrt());

    let a1p = a1 * (1.0 + g);
    let a2p = a2 * (1.0 + g);
    let c1p = a1p.hypot(b1);
    let c2p = a2p.hypot(b2);

    let hue = |b: f64, ap: f64| {
        if ap == 0.0 && b == 0.0 {
            0.0
        } else {
            let h = b.atan2(ap);
            if h < 0.0 {
                h + TWO_PI
            } else {
                h
            }
        }
    };
    let h1p = hue(b1, a1p);
    let h2p = hue(b2, a2p);

    let dlp = l2 - l1;
    let dcp = c2p - c1p;
    let dhp = if c1p * c2p == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff > PI {
            diff - TWO_PI
        } else if diff < -PI {
            diff + TWO_PI
        } else {
            diff
        }
    };
    let dh_big = 2.0 * (c1p * c2p).sqrt() * (dhp / 2.0).sin();

    let l_bar = (l1 + l2) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar = if c1p * c2p == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= PI {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < TWO_PI {
        (h1p + h2p + TWO_PI) / 2.0
    } else {
        (h1p + h2p - TWO_PI) / 2.0
    };

    let deg = PI / 180.0;
    let t = 1.0 - 0.17 * (h_bar - 30.0 * deg).cos()
        + 0.24 * (2.0 * h_bar).cos()
        + 0.32 * (3.0 * h_bar + 6.0 * deg).cos()
        - 0.20 * (4.0 * h_bar - 63.0 * deg).cos();

    let l_mid = (l_bar - 50.0).powi(2);
    let sl = 1.0 + 0.015 * l_mid / (20.0 + l_mid).sqrt();
    let sc = 1.0 + 0.045 * c_bar_p;
    let sh = 1.0 + 0.015 * c_bar_p * t;

    let d_theta = 30.0 * deg * (-((h_bar / deg - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let rc = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let rt = -rc * (2.0 * d_theta).sin();

    let dl_term = dlp / sl;
    let dc_term = dcp / sc;
    let dh_term = dh_big / sh;

    (dl_term * dl_term + dc_term * dc_term + dh_term * dh_term + rt * dc_term * dh_term)
        .max(0.0)
        .sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_white_and_black() {
        let white = rgb_to_lab([255, 255, 255]);
        assert!(close(white.l, 100.0, 0.01));
        assert!(close(white.a, 0.0, 0.01));
        assert!(close(white.b, 0.0, 0.01));

        let black = rgb_to_lab([0, 0, 0]);
        assert!(close(black.l, 0.0, 1e-4));
    }

    #[test]
    fn test_pure_red() {
        let red = rgb_to_lab([255, 0, 0]);
        assert!(close(red.l, 53.24, 0.05));
        assert!(close(red.a, 80.09, 0.1));
        assert!(close(red.b, 67.20, 0.1));
    }

    #[test]
    fn test_lab_roundtrip() {
        for rgb in [[0, 0, 0], [255, 0, 0], [12, 200, 77], [128, 128, 128], [250, 3, 240]] {
            let back = lab_to_rgb(rgb_to_lab(rgb));
            for c in 0..3 {
                assert!((back[c] as i32 - rgb[c] as i32).abs() <= 1, "{rgb:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn test_ciede2000_reference_pair() {
        // First pair of the Sharma et al. test data set.
        let x = Lab::new(50.0, 2.6772, -79.7751);
        let y = Lab::new(50.0, 0.0, -82.7485);
        assert!(close(delta_e_2000(x, y), 2.0425, 1e-3));
    }

    #[test]
    fn test_ciede2000_symmetric_and_zero() {
        let x = rgb_to_lab([30, 90, 200]);
        let y = rgb_to_lab([200, 90, 30]);
        assert!(close(delta_e_2000(x, y), delta_e_2000(y, x), 1e-4));
        assert_eq!(delta_e_2000(x, x), 0.0);
    }

    #[test]
    fn test_metric_dispatch() {
        // Saturated colors: CIEDE2000 discounts chroma differences.
        let x = Lab::new(50.0, 60.0, 0.0);
        let y = Lab::new(50.0, 70.0, 0.0);
        assert!(close(DistanceMetric::Cie76.distance(x, y), 10.0, 1e-4));
        assert!(DistanceMetric::Ciede2000.distance(x, y) < 5.0);
    }
}
