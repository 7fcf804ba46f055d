//! The minimum we need from a color: its red, green, and blue components.

/// Anything that can yield red, green, and blue components in `[0, 1]`.
pub trait Color {
    fn rgb(&self) -> (f64, f64, f64);
}

/// An opaque RGB color.
///
/// ```
/// use slack_hook::attachment::{hex_rgb, Rgb};
///
/// assert_eq!(hex_rgb(&Rgb::new(0.215, 0.222, 0.830)), "#3638d3");
/// assert_eq!(hex_rgb(&Rgb::from_u8(255, 0, 128)), "#ff0080");
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    red: f64,
    green: f64,
    blue: f64,
}

impl Rgb {
    /// Components are clamped to `[0, 1]`. `NaN` becomes `0`.
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Rgb {
            red: clamp_unit(red),
            green: clamp_unit(green),
            blue: clamp_unit(blue),
        }
    }

    pub fn from_u8(red: u8, green: u8, blue: u8) -> Self {
        Rgb::new(
            f64::from(red) / 255.0,
            f64::from(green) / 255.0,
            f64::from(blue) / 255.0,
        )
    }
}

impl Color for Rgb {
    fn rgb(&self) -> (f64, f64, f64) {
        (self.red, self.green, self.blue)
    }
}

impl From<(f64, f64, f64)> for Rgb {
    fn from((r, g, b): (f64, f64, f64)) -> Self {
        Rgb::new(r, g, b)
    }
}

/// Capture any [Color] as an [Rgb], so it can be set on an attachment.
impl<C: Color + ?Sized> From<&C> for Rgb {
    fn from(color: &C) -> Self {
        let (r, g, b) = color.rgb();
        Rgb::new(r, g, b)
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Format a color as `#rrggbb`, truncating each scaled component rather than
/// rounding it.
pub fn hex_rgb<C: Color + ?Sized>(color: &C) -> String {
    let (r, g, b) = color.rgb();

    format!("#{:02x}{:02x}{:02x}", to_byte(r), to_byte(g), to_byte(b))
}

fn to_byte(component: f64) -> u8 {
    // `as` saturates, so out of range components from foreign `Color`
    // implementations still land in 0..=255.
    (component * 255.0).floor() as u8
}
