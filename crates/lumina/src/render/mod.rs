pub mod entrance;
pub mod font;
pub mod text;

use eframe::egui::{self, FontId, Pos2};

use crate::model::{Alignment, SlideContent, StyleSettings};
use crate::theme::Theme;

pub const REFERENCE_WIDTH: f32 = 1920.0;
pub const REFERENCE_HEIGHT: f32 = 1080.0;

pub const IDLE_TITLE: &str = "Ready to present.";
pub const DEFAULT_LOADING_LABEL: &str = "SEARCHING";

/// Everything the projector shows for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub slide: Option<&'a SlideContent>,
    pub style: &'a StyleSettings,
    /// Loading label while a lookup is in flight.
    pub loading: Option<&'a str>,
}

pub fn compute_scale(rect: egui::Rect) -> f32 {
    (rect.width() / REFERENCE_WIDTH).min(rect.height() / REFERENCE_HEIGHT)
}

/// Largest 16:9 rect centred in `outer`.
pub fn letterbox(outer: egui::Rect) -> egui::Rect {
    let scale = compute_scale(outer);
    egui::Rect::from_center_size(
        outer.center(),
        egui::vec2(REFERENCE_WIDTH * scale, REFERENCE_HEIGHT * scale),
    )
}

/// Paint `scene` into `rect`. `opacity` and `rise` come from the entrance
/// animation; `rise` is in reference pixels.
pub fn render_scene(ui: &egui::Ui, scene: &Scene, rect: egui::Rect, opacity: f32, rise: f32) {
    let theme = Theme::for_mode(scene.style.theme);
    let scale = compute_scale(rect);
    ui.painter().rect_filled(rect, 0.0, theme.background);

    match scene.slide {
        Some(slide) => draw_verse(ui, slide, scene.style, &theme, rect, opacity, rise * scale, scale),
        None => draw_idle(ui, &theme, rect, opacity, scale),
    }

    if let Some(label) = scene.loading {
        draw_loading(ui, label, &theme, rect, scale);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_verse(
    ui: &egui::Ui,
    slide: &SlideContent,
    style: &StyleSettings,
    theme: &Theme,
    rect: egui::Rect,
    opacity: f32,
    rise: f32,
    scale: f32,
) {
    let padding = 120.0 * scale;
    let column = rect.shrink2(egui::vec2(padding, padding * 0.6));
    let gap = 36.0 * scale;

    let body_size = font::body_font_rem(style, &slide.body) * font::REM_PX * scale;
    let body = text::layout(
        ui,
        &slide.body,
        body_size,
        Theme::with_opacity(theme.foreground, opacity),
        column,
        style.alignment,
    );

    let (reference, source) = if style.show_reference {
        let reference = text::layout(
            ui,
            &slide.reference,
            2.25 * font::REM_PX * scale,
            Theme::with_opacity(theme.reference, opacity),
            column,
            style.alignment,
        );
        let source = (!slide.source_label.is_empty()).then(|| {
            text::layout(
                ui,
                &slide.source_label.to_uppercase(),
                1.1 * font::REM_PX * scale,
                Theme::with_opacity(theme.foreground, opacity * 0.55),
                column,
                style.alignment,
            )
        });
        (Some(reference), source)
    } else {
        (None, None)
    };

    // Centre the whole block vertically, then push it down by the rise.
    let mut total = body.rect.height();
    if let Some(r) = &reference {
        total += r.rect.height() + gap;
    }
    if let Some(s) = &source {
        total += s.rect.height() + gap;
    }
    let mut y = (column.center().y - total / 2.0).max(column.top()) + rise;

    if let Some(r) = reference {
        let h = r.rect.height();
        let pos = text::block_origin(&r, column, y, style.alignment);
        ui.painter().galley(pos, r, theme.reference);
        y += h + gap;
    }

    let h = body.rect.height();
    let pos = text::block_origin(&body, column, y, style.alignment);
    ui.painter().galley(pos, body, theme.foreground);
    y += h + gap;

    if let Some(s) = source {
        // Short rule between body and source, following the alignment.
        let rule_w = 80.0 * scale;
        let rule_x = match style.alignment {
            Alignment::Left => column.left(),
            Alignment::Center => column.center().x - rule_w / 2.0,
            Alignment::Right => column.right() - rule_w,
        };
        let rule = egui::Rect::from_min_size(
            Pos2::new(rule_x, y - gap / 2.0),
            egui::vec2(rule_w, 2.0 * scale),
        );
        ui.painter()
            .rect_filled(rule, 1.0, Theme::with_opacity(theme.accent, opacity * 0.8));
        let pos = text::block_origin(&s, column, y, style.alignment);
        ui.painter().galley(pos, s, theme.foreground);
    }
}

fn draw_idle(ui: &egui::Ui, theme: &Theme, rect: egui::Rect, opacity: f32, scale: f32) {
    text::draw_centered_line(
        ui,
        IDLE_TITLE,
        FontId::proportional(56.0 * scale),
        Theme::with_opacity(theme.foreground, opacity * 0.35),
        rect.center(),
    );
}

fn draw_loading(ui: &egui::Ui, label: &str, theme: &Theme, rect: egui::Rect, scale: f32) {
    ui.painter()
        .rect_filled(rect, 0.0, Theme::with_opacity(theme.surface, 0.75));
    let spaced: String = label
        .chars()
        .flat_map(|c| [c, '\u{2009}'])
        .collect::<String>()
        .trim_end()
        .to_string();
    text::draw_centered_line(
        ui,
        &spaced,
        FontId::monospace(28.0 * scale),
        Theme::with_opacity(theme.foreground, 0.85),
        rect.center(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_fits_reference_frame() {
        let rect = egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(960.0, 540.0));
        assert_eq!(compute_scale(rect), 0.5);

        let tall = egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(960.0, 2000.0));
        assert_eq!(compute_scale(tall), 0.5);
    }

    #[test]
    fn test_letterbox_keeps_aspect() {
        let outer = egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(1000.0, 1000.0));
        let frame = letterbox(outer);
        assert!((frame.width() / frame.height() - 16.0 / 9.0).abs() < 1e-3);
        assert_eq!(frame.center(), outer.center());
        assert_eq!(frame.width(), 1000.0);
    }
}
