//! Chart colours and fonts

use crate::sources::kp::g_level;
use plotters::style::RGBColor;

pub const BACKGROUND: RGBColor = RGBColor(0x20, 0x2a, 0x37);
pub const AXES: RGBColor = RGBColor(0xEE, 0xEE, 0xEE);
pub const LABEL: RGBColor = RGBColor(0xBB, 0xBB, 0xBB);
pub const INK: RGBColor = RGBColor(0x10, 0x10, 0x10);
pub const GRID: RGBColor = RGBColor(0xC8, 0xC8, 0xC8);

pub const SUN: RGBColor = RGBColor(0xFF, 0xD7, 0x00);
pub const MOON: RGBColor = RGBColor(0x1F, 0x77, 0xB4);
pub const DEWPOINT: RGBColor = RGBColor(0xFF, 0x7F, 0x0E);
pub const GUST: RGBColor = RGBColor(0xDC, 0x14, 0x3C);
pub const PRECIPITATION: RGBColor = RGBColor(0x80, 0x80, 0x80);
/// Sun below the horizon
pub const NIGHT: RGBColor = RGBColor(0x80, 0x80, 0x80);
/// Sun more than 18 degrees below the horizon
pub const ASTRONOMICAL_NIGHT: RGBColor = RGBColor(0x33, 0x33, 0x33);

pub const FONT: &str = "sans-serif";
pub const TITLE_SIZE: u32 = 26;
pub const LABEL_SIZE: u32 = 15;
pub const TICK_SIZE: u32 = 13;
pub const ANNOTATION_SIZE: u32 = 11;

/// Anchors of the diverging blue-grey-red scale, sampled from "coolwarm"
const COOLWARM: [(f64, (u8, u8, u8)); 5] = [
    (0.0, (59, 76, 192)),
    (0.25, (124, 159, 249)),
    (0.5, (221, 220, 220)),
    (0.75, (245, 156, 125)),
    (1.0, (180, 4, 38)),
];

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round().clamp(0.0, 255.0) as u8
}

/// Blue at 0, light grey at 0.5, red at 1; input is clamped
#[must_use]
pub fn coolwarm(x: f64) -> RGBColor {
    let x = if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.5 };
    let upper = COOLWARM.iter().position(|(stop, _)| *stop >= x).unwrap_or(COOLWARM.len() - 1).max(1);
    let (x0, c0) = COOLWARM[upper - 1];
    let (x1, c1) = COOLWARM[upper];
    let t = (x - x0) / (x1 - x0);
    RGBColor(lerp(c0.0, c1.0, t), lerp(c0.1, c1.1, t), lerp(c0.2, c1.2, t))
}

/// Cloud cover percentage to colour: clear is blue, overcast red
#[must_use]
pub fn cloud_color(percent: f64) -> RGBColor {
    coolwarm(percent / 100.0)
}

/// Seeing or transparency class (1 poor to 5 excellent): excellent is blue
#[must_use]
pub fn sky_quality_color(level: f64) -> RGBColor {
    coolwarm(1.0 - (level - 1.0) / 4.0)
}

/// NOAA storm palette colour for a Kp bar
#[must_use]
pub fn kp_color(k: f64) -> RGBColor {
    let (r, g, b) = g_level(k).color;
    RGBColor(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, RGBColor(59, 76, 192))]
    #[case(0.5, RGBColor(221, 220, 220))]
    #[case(1.0, RGBColor(180, 4, 38))]
    #[case(-3.0, RGBColor(59, 76, 192))]
    #[case(7.0, RGBColor(180, 4, 38))]
    fn test_coolwarm_anchors(#[case] x: f64, #[case] expected: RGBColor) {
        assert_eq!(coolwarm(x), expected);
    }

    #[test]
    fn test_coolwarm_between_anchors() {
        let RGBColor(r, _, b) = coolwarm(0.125);
        assert!(r > 59 && r < 124);
        assert!(b > 192);
    }

    #[test]
    fn test_sky_quality_reversed() {
        assert_eq!(sky_quality_color(5.0), coolwarm(0.0));
        assert_eq!(sky_quality_color(1.0), coolwarm(1.0));
        assert_eq!(cloud_color(100.0), coolwarm(1.0));
    }

    #[test]
    fn test_kp_color_follows_storm_scale() {
        assert_eq!(kp_color(2.0), RGBColor(0x92, 0xd0, 0x50));
        assert_eq!(kp_color(5.0), RGBColor(0xf6, 0xeb, 0x14));
        assert_eq!(kp_color(9.0), RGBColor(0xc8, 0x00, 0x00));
    }
}
