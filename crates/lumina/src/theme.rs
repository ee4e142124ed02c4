use eframe::egui::Color32;

use crate::model::ThemeMode;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub mode: ThemeMode,
    pub background: Color32,
    pub foreground: Color32,
    /// Reference line above the verse body.
    pub reference: Color32,
    pub accent: Color32,
    /// Backdrop for chips, toasts and the loading overlay.
    pub surface: Color32,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            mode: ThemeMode::Classic,
            background: Color32::from_rgb(0x1E, 0x3A, 0x8A),
            foreground: Color32::WHITE,
            reference: Color32::from_rgb(0xBF, 0xDB, 0xFE),
            accent: Color32::from_rgb(0x60, 0xA5, 0xFA),
            surface: Color32::from_rgb(0x17, 0x25, 0x54),
        }
    }

    pub fn modern() -> Self {
        Self {
            mode: ThemeMode::Modern,
            background: Color32::from_rgb(0x0F, 0x17, 0x2A),
            foreground: Color32::from_rgb(0xF8, 0xFA, 0xFC),
            reference: Color32::from_rgb(0xBF, 0xDB, 0xFE),
            accent: Color32::from_rgb(0x38, 0xBD, 0xF8),
            surface: Color32::from_rgb(0x1E, 0x29, 0x3B),
        }
    }

    pub fn nature() -> Self {
        Self {
            mode: ThemeMode::Nature,
            background: Color32::from_rgb(0x02, 0x2C, 0x22),
            foreground: Color32::from_rgb(0xEC, 0xFD, 0xF5),
            reference: Color32::from_rgb(0xA7, 0xF3, 0xD0),
            accent: Color32::from_rgb(0x34, 0xD3, 0x99),
            surface: Color32::from_rgb(0x06, 0x4E, 0x3B),
        }
    }

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            background: Color32::BLACK,
            foreground: Color32::WHITE,
            reference: Color32::from_rgb(0xBF, 0xDB, 0xFE),
            accent: Color32::from_rgb(0x52, 0x94, 0xE2),
            surface: Color32::from_rgb(0x1E, 0x1E, 0x1E),
        }
    }

    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            background: Color32::WHITE,
            foreground: Color32::from_rgb(0x11, 0x18, 0x27),
            reference: Color32::from_rgb(0x1E, 0x40, 0xAF),
            accent: Color32::from_rgb(0x0F, 0x34, 0x60),
            surface: Color32::from_rgb(0xF3, 0xF4, 0xF6),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Classic => Self::classic(),
            ThemeMode::Modern => Self::modern(),
            ThemeMode::Nature => Self::nature(),
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        let alpha = (opacity.clamp(0.0, 1.0) * color.a() as f32) as u8;
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mode_has_its_own_palette() {
        for mode in ThemeMode::all() {
            let theme = Theme::for_mode(*mode);
            assert_eq!(theme.mode, *mode);
            assert_ne!(theme.background, theme.foreground);
        }
        assert_ne!(Theme::classic().background, Theme::modern().background);
    }

    #[test]
    fn test_with_opacity() {
        let c = Theme::with_opacity(Color32::WHITE, 0.5);
        assert_eq!(c.a(), 127);
        assert_eq!(Theme::with_opacity(Color32::WHITE, 2.0).a(), 255);
    }
}
