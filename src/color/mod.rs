//! Color space conversions.
//!
//! Palette construction and dithering compare colors in CIE L*a*b* (D65).
//! HSV is only used to rotate hues when deriving complements.

mod hsv;
mod lab;

pub use hsv::{hsv_to_rgb, rgb_to_hsv, rotate_hue, Hsv};
pub use lab::{delta_e_2000, delta_e_76, lab_to_rgb, rgb_to_lab, DistanceMetric, Lab};
