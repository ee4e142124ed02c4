use std::time::Instant;

use eframe::egui;

use super::{DOUBLE_PRESS_SECS, Toast, draw_toast, waker};
use crate::model::Role;
use crate::render::entrance::Entrance;
use crate::render::{self, Scene};
use crate::store::StateStore;
use crate::sync::{SyncOptions, SyncSession, Transports};
use crate::theme::Theme;

pub(super) struct DisplayApp {
    store: StateStore,
    session: SyncSession,
    entrance: Entrance,
    toast: Option<Toast>,
    last_esc: Option<Instant>,
    last_ctrl_c: Option<Instant>,
}

impl DisplayApp {
    pub(super) fn new(cc: &eframe::CreationContext<'_>, transports: Transports) -> Self {
        let mut store = StateStore::display();
        let session = SyncSession::start(
            Role::Display,
            &mut store,
            transports,
            SyncOptions {
                wake: waker(&cc.egui_ctx),
                ..SyncOptions::default()
            },
        );
        Self {
            store,
            session,
            // Whatever the bootstrap read found still gets its entrance.
            entrance: Entrance::new(0),
            toast: None,
            last_esc: None,
            last_ctrl_c: None,
        }
    }

    fn status_label(&self) -> String {
        let mut label = if self.session.has_contact() {
            "Live Signal Active".to_string()
        } else {
            "Waiting for operator".to_string()
        };
        if !self.session.has_fanout() {
            label.push_str(" \u{00b7} storage sync only");
        }
        label
    }

    fn draw_status_chip(&self, ui: &egui::Ui, rect: egui::Rect, scale: f32) {
        let connected = self.session.has_contact();
        let galley = ui.painter().layout_no_wrap(
            self.status_label(),
            egui::FontId::monospace(14.0 * scale.max(0.75)),
            egui::Color32::from_gray(160),
        );
        let padding = egui::vec2(12.0, 6.0);
        let dot = 8.0;
        let size = egui::vec2(
            dot + 8.0 + galley.rect.width() + padding.x * 2.0,
            galley.rect.height() + padding.y * 2.0,
        );
        let chip = egui::Rect::from_min_size(
            egui::pos2(rect.left() + 16.0, rect.bottom() - 16.0 - size.y),
            size,
        );
        ui.painter()
            .rect_filled(chip, 4.0, egui::Color32::from_black_alpha(128));

        let dot_color = if connected {
            egui::Color32::from_rgb(34, 197, 94)
        } else {
            egui::Color32::from_rgb(239, 68, 68)
        };
        ui.painter().circle_filled(
            egui::pos2(chip.left() + padding.x + dot / 2.0, chip.center().y),
            dot / 2.0,
            dot_color,
        );
        ui.painter().galley(
            egui::pos2(
                chip.left() + padding.x + dot + 8.0,
                chip.center().y - galley.rect.height() / 2.0,
            ),
            galley,
            egui::Color32::from_gray(160),
        );
    }
}

impl eframe::App for DisplayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.pump(&mut self.store);
        let now = Instant::now();
        self.entrance.observe(self.store.epoch(), now);

        // Sent after the input closure; sending inside it deadlocks.
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Q) {
                viewport_cmds.push(egui::ViewportCommand::Close);
                return;
            }

            if i.modifiers.ctrl && i.key_pressed(egui::Key::C) {
                if let Some(last) = self.last_ctrl_c {
                    if last.elapsed().as_secs_f32() < DOUBLE_PRESS_SECS {
                        viewport_cmds.push(egui::ViewportCommand::Close);
                        return;
                    }
                }
                self.last_ctrl_c = Some(Instant::now());
                self.toast = Some(Toast::new("Press Ctrl+C again to quit"));
                return;
            }

            if i.key_pressed(egui::Key::Escape) {
                if let Some(last) = self.last_esc {
                    if last.elapsed().as_secs_f32() < DOUBLE_PRESS_SECS {
                        viewport_cmds.push(egui::ViewportCommand::Close);
                        return;
                    }
                }
                self.last_esc = Some(Instant::now());
                self.toast = Some(Toast::new("Press Esc again to exit"));
                return;
            }

            if i.key_pressed(egui::Key::F) {
                viewport_cmds.push(egui::ViewportCommand::Fullscreen(
                    !i.viewport().fullscreen.unwrap_or(false),
                ));
            }
        });

        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }

        let theme = Theme::for_mode(self.store.style().theme);
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::BLACK).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let frame = render::letterbox(rect);
                let scale = render::compute_scale(frame);
                let (opacity, rise) = self.entrance.frame(now);

                let scene = Scene {
                    slide: self.store.slide().map(|s| s.as_ref()),
                    style: self.store.style(),
                    loading: None,
                };
                render::render_scene(ui, &scene, frame, opacity, rise);

                if scene.slide.is_none() {
                    self.draw_status_chip(ui, rect, scale);
                }

                let toast_visible = self
                    .toast
                    .as_ref()
                    .is_some_and(|toast| draw_toast(ui, toast, &theme, frame, scale));
                if !toast_visible {
                    self.toast = None;
                }
            });

        if self.entrance.is_running(now) {
            ctx.request_repaint();
        }
    }
}
