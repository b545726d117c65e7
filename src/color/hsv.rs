//! RGB ↔ HSV, used for hue rotation.

/// A color in HSV. Hue in degrees [0, 360), saturation and value in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
    /// Hue in degrees, [0, 360).
    pub h: f32,
    /// Saturation, [0, 1].
    pub s: f32,
    /// Value, [0, 1].
    pub v: f32,
}

/// Converts 8-bit sRGB to HSV.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    Hsv {
        h: h.rem_euclid(360.0),
        s,
        v: max,
    }
}

/// Converts HSV back to 8-bit sRGB.
pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let h = hsv.h.rem_euclid(360.0) / 60.0;
    let c = hsv.v * hsv.s;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = hsv.v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [r, g, b].map(|v| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Rotates the hue of an sRGB color by `degrees`, keeping S and V.
pub fn rotate_hue(rgb: [u8; 3], degrees: f32) -> [u8; 3] {
    let mut hsv = rgb_to_hsv(rgb);
    hsv.h = (hsv.h + degrees).rem_euclid(360.0);
    hsv_to_rgb(hsv)
}
