use crate::model::{FontMode, StyleSettings};

pub const MIN_AUTO_REM: f32 = 2.2;
pub const MAX_AUTO_REM: f32 = 8.5;

/// Pixels per rem in the 1920x1080 reference frame.
pub const REM_PX: f32 = 16.0;

/// Body size in rem for a text of `len` characters. Short verses get large
/// type, long passages shrink logarithmically down to a readable floor.
pub fn auto_font_size(len: usize) -> f32 {
    let len = len.max(1) as f32;
    (10.0 - 1.1 * len.ln()).clamp(MIN_AUTO_REM, MAX_AUTO_REM)
}

/// Body size in rem for `body` under `style`.
pub fn body_font_rem(style: &StyleSettings, body: &str) -> f32 {
    match style.font_mode {
        FontMode::Auto => auto_font_size(body.chars().count()),
        FontMode::Manual => style.font_size,
    }
}
