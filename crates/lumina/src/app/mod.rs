//! The two eframe front ends: the operator console and the live display.

mod display;
mod operator;

use std::sync::Arc;
use std::time::Instant;

use eframe::egui;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::{Role, StylePatch};
use crate::sync::Transports;
use crate::theme::Theme;
use crate::transport::{
    CHANNEL_NAME, FanoutChannel, FileSlots, LoopbackChannel, SlotStore, UnavailableSlots,
};

const TOAST_DURATION: f32 = 1.5;
const TOAST_FADE_START: f32 = 1.0;

/// Double-press window for Esc and Ctrl+C.
const DOUBLE_PRESS_SECS: f32 = 1.0;

pub(crate) struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        if elapsed < TOAST_FADE_START {
            1.0
        } else if elapsed < TOAST_DURATION {
            1.0 - (elapsed - TOAST_FADE_START) / (TOAST_DURATION - TOAST_FADE_START)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= TOAST_DURATION
    }
}

/// Paint `toast` near the bottom of `rect`. Returns `false` once it has
/// faded out, so the caller can drop it.
fn draw_toast(ui: &egui::Ui, toast: &Toast, theme: &Theme, rect: egui::Rect, scale: f32) -> bool {
    if toast.is_expired() {
        return false;
    }
    let opacity = toast.opacity();
    let color = Theme::with_opacity(theme.foreground, opacity * 0.9);
    let background = Theme::with_opacity(theme.surface, opacity * 0.9);
    let galley = ui.painter().layout_no_wrap(
        toast.message.clone(),
        egui::FontId::proportional(20.0 * scale),
        color,
    );
    let padding = 16.0 * scale;
    let toast_rect = egui::Rect::from_min_size(
        egui::pos2(
            rect.center().x - galley.rect.width() / 2.0 - padding,
            rect.bottom() - 80.0 * scale,
        ),
        egui::vec2(
            galley.rect.width() + padding * 2.0,
            galley.rect.height() + padding * 2.0,
        ),
    );
    ui.painter().rect_filled(toast_rect, 8.0 * scale, background);
    let text_pos = egui::pos2(toast_rect.left() + padding, toast_rect.top() + padding);
    ui.painter().galley(text_pos, galley, color);
    ui.ctx().request_repaint();
    true
}

/// Storage problems are not fatal: the window keeps its state in memory and
/// syncs over fan-out only.
fn open_slots(config: &Config) -> Arc<dyn SlotStore> {
    let dir = match config.slots_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "No storage directory, keeping state in memory");
            return Arc::new(UnavailableSlots);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!(dir = %dir.display(), error = %e, "Storage unavailable, keeping state in memory");
        return Arc::new(UnavailableSlots);
    }
    Arc::new(FileSlots::new(dir))
}

/// Open the fan-out channel and fallback storage shared by both roles.
fn open_transports(config: &Config) -> Transports {
    let slots = open_slots(config);

    let fanout = match LoopbackChannel::open(CHANNEL_NAME, &LoopbackChannel::default_base()) {
        Ok(channel) => Some(Arc::new(channel) as Arc<dyn FanoutChannel>),
        Err(e) => {
            warn!(error = %e, "Fan-out channel unavailable");
            None
        }
    };
    Transports { fanout, slots }
}

/// Launch the window for `role` and block until it is closed.
pub fn run(role: Role, windowed: bool, style: StylePatch) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let transports = open_transports(&config);
    info!(role = role.name(), windowed, "Starting window");

    let result = match role {
        Role::Operator => {
            let title = "Lumina Console";
            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1440.0, 860.0])
                    .with_min_inner_size([960.0, 600.0])
                    .with_title(title),
                ..Default::default()
            };
            eframe::run_native(
                title,
                options,
                Box::new(move |cc| {
                    Ok(Box::new(operator::OperatorApp::new(
                        cc, config, transports, style,
                    )))
                }),
            )
        }
        Role::Display => {
            let title = "Lumina Live";
            let viewport = if windowed {
                egui::ViewportBuilder::default()
                    .with_inner_size([1280.0, 720.0])
                    .with_title(title)
            } else {
                egui::ViewportBuilder::default()
                    .with_fullscreen(true)
                    .with_title(title)
            };
            let options = eframe::NativeOptions {
                viewport,
                ..Default::default()
            };
            eframe::run_native(
                title,
                options,
                Box::new(move |cc| Ok(Box::new(display::DisplayApp::new(cc, transports)))),
            )
        }
    };
    result.map_err(|e| anyhow::anyhow!("{e}"))
}

/// Repaint callback handed to the sync session's background threads.
fn waker(ctx: &egui::Context) -> Arc<dyn Fn() + Send + Sync> {
    let ctx = ctx.clone();
    Arc::new(move || ctx.request_repaint())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{library, reference::parse_query};
    use crate::store::StateStore;
    use crate::transport::slots::{LIVE_STATE_KEY, SETTINGS_KEY};

    #[test]
    fn test_toast_starts_opaque() {
        let toast = Toast::new("Verse not found.");
        assert_eq!(toast.opacity(), 1.0);
        assert!(!toast.is_expired());
    }

    #[test]
    fn test_toast_fades_then_expires() {
        let toast = Toast {
            message: String::new(),
            start: Instant::now() - std::time::Duration::from_millis(1250),
        };
        let opacity = toast.opacity();
        assert!(opacity > 0.0 && opacity < 1.0);

        let old = Toast {
            message: String::new(),
            start: Instant::now() - std::time::Duration::from_secs(2),
        };
        assert_eq!(old.opacity(), 0.0);
        assert!(old.is_expired());
    }

    #[test]
    fn test_unusable_storage_dir_keeps_running_in_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not_a_dir");
        std::fs::write(&file, "").unwrap();
        let mut config = Config::default();
        config
            .set("storage.dir", &file.join("slots").to_string_lossy())
            .unwrap();

        let slots = open_slots(&config);
        assert!(slots.get(LIVE_STATE_KEY).is_err());
        assert!(slots.set(LIVE_STATE_KEY, "{}").is_err());

        let mut store = StateStore::operator(slots);
        let slide = library::lookup(&parse_query("1 Nephi 3:7").unwrap()).unwrap();
        store.present(slide);
        assert_eq!(store.slide().unwrap().reference, "1 Nephi 3:7");
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_usable_storage_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("slots");
        let mut config = Config::default();
        config.set("storage.dir", &dir.to_string_lossy()).unwrap();

        let slots = open_slots(&config);
        slots.set(SETTINGS_KEY, "{}").unwrap();
        assert!(dir.join("lumina_settings.json").exists());
    }
}
