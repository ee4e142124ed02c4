use std::sync::Arc;

use eframe::egui::{self, Align, Color32, FontFamily, FontId, Pos2};

use crate::model::Alignment;

/// Create a wrapped LayoutJob whose rows follow `alignment`.
pub fn text_job(
    text: &str,
    font_size: f32,
    color: Color32,
    max_width: f32,
    alignment: Alignment,
) -> egui::text::LayoutJob {
    let mut job = egui::text::LayoutJob::default();
    job.wrap.max_width = max_width;
    job.halign = halign(alignment);
    let format = egui::text::TextFormat {
        font_id: FontId::new(font_size, FontFamily::Proportional),
        color,
        ..Default::default()
    };
    job.append(text, 0.0, format);
    job
}

pub fn halign(alignment: Alignment) -> Align {
    match alignment {
        Alignment::Left => Align::LEFT,
        Alignment::Center => Align::Center,
        Alignment::Right => Align::RIGHT,
    }
}

/// Top-left paint position that puts the galley's block against the left
/// edge, centre or right edge of `column`, with its top at `top`.
pub fn block_origin(
    galley: &egui::Galley,
    column: egui::Rect,
    top: f32,
    alignment: Alignment,
) -> Pos2 {
    let bounds = galley.rect;
    let x = match alignment {
        Alignment::Left => column.left() - bounds.left(),
        Alignment::Center => column.center().x - bounds.center().x,
        Alignment::Right => column.right() - bounds.right(),
    };
    Pos2::new(x, top - bounds.top())
}

/// Layout `text` within `column`. The galley is returned so callers can
/// measure a whole block before painting it.
pub fn layout(
    ui: &egui::Ui,
    text: &str,
    font_size: f32,
    color: Color32,
    column: egui::Rect,
    alignment: Alignment,
) -> Arc<egui::Galley> {
    let job = text_job(text, font_size, color, column.width(), alignment);
    ui.painter().layout_job(job)
}

/// Draw a single unwrapped line centred on `center`. Returns its height.
pub fn draw_centered_line(
    ui: &egui::Ui,
    text: &str,
    font: FontId,
    color: Color32,
    center: Pos2,
) -> f32 {
    let galley = ui.painter().layout_no_wrap(text.to_string(), font, color);
    let height = galley.rect.height();
    let pos = Pos2::new(
        center.x - galley.rect.width() / 2.0,
        center.y - height / 2.0,
    );
    ui.painter().galley(pos, galley, color);
    height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_carries_alignment_and_width() {
        let job = text_job("Jesus wept.", 40.0, Color32::WHITE, 800.0, Alignment::Right);
        assert_eq!(job.halign, Align::RIGHT);
        assert_eq!(job.wrap.max_width, 800.0);
        assert_eq!(job.text, "Jesus wept.");
    }
}
