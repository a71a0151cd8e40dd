use crate::core::models::ColorTier;

pub const OK_RGB: (u8, u8, u8) = (0, 255, 0);
pub const WARN_RGB: (u8, u8, u8) = (255, 255, 0);
pub const ALERT_RGB: (u8, u8, u8) = (255, 0, 0);
pub const NEUTRAL_RGB: (u8, u8, u8) = (255, 255, 255);

pub const RESET: &str = "\x1b[0m";

pub fn tier_rgb(tier: Option<ColorTier>) -> (u8, u8, u8) {
    match tier {
        Some(ColorTier::Ok) => OK_RGB,
        Some(ColorTier::Warn) => WARN_RGB,
        Some(ColorTier::Alert) => ALERT_RGB,
        None => NEUTRAL_RGB,
    }
}

pub fn muted_rgb(color: (u8, u8, u8)) -> (u8, u8, u8) {
    let (r, g, b) = color;
    (
        (r as f32 * 0.35) as u8,
        (g as f32 * 0.35) as u8,
        (b as f32 * 0.35) as u8,
    )
}

/// Truecolor foreground escape sequence.
pub fn ansi_fg(color: (u8, u8, u8)) -> String {
    let (r, g, b) = color;
    format!("\x1b[38;2;{r};{g};{b}m")
}
