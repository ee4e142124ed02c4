use std::process::{Child, Command};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use anyhow::Context;
use eframe::egui::{self, Align2, Color32, FontId, RichText};
use tracing::{debug, info, warn};

use super::{Toast, draw_toast, waker};
use crate::commentary::{self, Insight};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::model::{
    Alignment, FontMode, MAX_MANUAL_FONT_SIZE, MIN_MANUAL_FONT_SIZE, Role, SlideContent,
    StylePatch, ThemeMode,
};
use crate::render::entrance::Entrance;
use crate::render::{self, Scene};
use crate::resolver::{Direction, ResolveError, Resolver, step};
use crate::store::StateStore;
use crate::sync::{SyncOptions, SyncSession, Transports};
use crate::theme::Theme;

const SIDE_PANEL_WIDTH: f32 = 380.0;
const HEADER_HEIGHT: f32 = 44.0;
const HISTORY_SNIPPET_CHARS: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Search,
    Manual,
    Insights,
    Settings,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Search, Tab::Manual, Tab::Insights, Tab::Settings];

    fn title(&self) -> &'static str {
        match self {
            Tab::Search => "Search",
            Tab::Manual => "Manual",
            Tab::Insights => "Insights",
            Tab::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lookup {
    Search,
    Step(Direction),
}

/// Results handed back by worker threads.
enum JobResult {
    Resolved {
        lookup: Lookup,
        result: Result<SlideContent, ResolveError>,
    },
    Insight {
        slide: Arc<SlideContent>,
        insight: Insight,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum InsightState {
    /// Nothing requested, e.g. for custom slides.
    Idle,
    Loading,
    Ready(Insight),
}

/// Console state and actions, independent of drawing.
struct Console {
    store: StateStore,
    session: SyncSession,
    resolver: Arc<Resolver>,
    gemini: Option<GeminiClient>,
    jobs_tx: Sender<JobResult>,
    jobs: Receiver<JobResult>,
    wake: Arc<dyn Fn() + Send + Sync>,
    /// Loading label while a lookup is in flight.
    loading: Option<&'static str>,
    insight: InsightState,
    toast: Option<Toast>,
}

impl Console {
    fn new(
        store: StateStore,
        session: SyncSession,
        resolver: Arc<Resolver>,
        gemini: Option<GeminiClient>,
        wake: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        let (jobs_tx, jobs) = mpsc::channel();
        Self {
            store,
            session,
            resolver,
            gemini,
            jobs_tx,
            jobs,
            wake,
            loading: None,
            insight: InsightState::Idle,
            toast: None,
        }
    }

    fn search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() || self.loading.is_some() {
            return;
        }
        self.spawn_resolve(query.to_string(), Lookup::Search);
    }

    fn navigate(&mut self, direction: Direction) {
        if self.loading.is_some() {
            return;
        }
        let Some(current) = self.store.slide() else {
            return;
        };
        let Some(query) = step(&current.reference, direction) else {
            return;
        };
        self.spawn_resolve(query, Lookup::Step(direction));
    }

    fn spawn_resolve(&mut self, query: String, lookup: Lookup) {
        self.loading = Some(self.resolver.loading_label(&query));
        debug!(query, ?lookup, "Resolving");

        let resolver = self.resolver.clone();
        let tx = self.jobs_tx.clone();
        let wake = self.wake.clone();
        let spawned = thread::Builder::new()
            .name("lumina-resolve".to_string())
            .spawn(move || {
                let result = resolver.resolve(&query);
                if tx.send(JobResult::Resolved { lookup, result }).is_ok() {
                    wake();
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Cannot start lookup thread");
            self.loading = None;
            self.toast = Some(Toast::new("Could not start the lookup."));
        }
    }

    fn present(&mut self, slide: SlideContent) {
        self.store.present(slide);
        self.request_insight();
    }

    /// Present operator-typed text. Both fields are required.
    fn present_manual(&mut self, reference: &str, body: &str) -> bool {
        let (reference, body) = (reference.trim(), body.trim());
        if reference.is_empty() || body.is_empty() {
            return false;
        }
        self.store.present(SlideContent::manual(reference, body));
        self.insight = InsightState::Idle;
        true
    }

    fn select_history(&mut self, id: u64) {
        if self.store.select_history(id).is_some() {
            self.request_insight();
        }
    }

    fn clear(&mut self) {
        self.store.clear();
        self.insight = InsightState::Idle;
    }

    fn update_style(&mut self, patch: &StylePatch) {
        self.store.update_style(patch);
    }

    /// Commentary for the current slide, fetched after it is already showing.
    fn request_insight(&mut self) {
        let Some(slide) = self.store.slide().cloned() else {
            self.insight = InsightState::Idle;
            return;
        };
        self.insight = InsightState::Loading;

        let client = self.gemini.clone();
        let tx = self.jobs_tx.clone();
        let wake = self.wake.clone();
        let spawned = thread::Builder::new()
            .name("lumina-insight".to_string())
            .spawn(move || {
                let insight = commentary::generate(client.as_ref(), &slide.reference, &slide.body);
                if tx.send(JobResult::Insight { slide, insight }).is_ok() {
                    wake();
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Cannot start insight thread");
            self.insight = InsightState::Ready(Insight::unavailable());
        }
    }

    /// Apply finished background work.
    fn poll_jobs(&mut self) {
        while let Ok(job) = self.jobs.try_recv() {
            match job {
                JobResult::Resolved { lookup, result } => {
                    self.loading = None;
                    match result {
                        Ok(slide) => self.present(slide),
                        Err(e) => {
                            warn!(error = %e, ?lookup, "Lookup failed");
                            let message = match lookup {
                                Lookup::Search => e.to_string(),
                                Lookup::Step(direction) => format!(
                                    "Cannot go to the {} verse: {e}",
                                    direction_name(direction)
                                ),
                            };
                            self.toast = Some(Toast::new(message));
                        }
                    }
                }
                JobResult::Insight { slide, insight } => {
                    let current = self
                        .store
                        .slide()
                        .is_some_and(|s| s.is_equivalent(&slide));
                    if current {
                        self.insight = InsightState::Ready(insight);
                    } else {
                        debug!(reference = %slide.reference, "Dropping insight for a replaced slide");
                    }
                }
            }
        }
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Next => "next",
        Direction::Prev => "previous",
    }
}

/// First `max` characters of `text`, with an ellipsis when cut.
fn snippet(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}\u{2026}", head.trim_end())
    } else {
        head
    }
}

/// Start a display process next to this console.
fn spawn_display() -> anyhow::Result<Child> {
    let exe = std::env::current_exe().context("Cannot locate the lumina executable")?;
    Command::new(exe)
        .args(["--mode", "live", "--windowed"])
        .spawn()
        .context("Failed to start the live window")
}

pub(super) struct OperatorApp {
    console: Console,
    tab: Tab,
    query: String,
    manual_reference: String,
    manual_body: String,
    entrance: Entrance,
    displays: Vec<Child>,
}

impl OperatorApp {
    pub(super) fn new(
        cc: &eframe::CreationContext<'_>,
        config: Config,
        transports: Transports,
        style: StylePatch,
    ) -> Self {
        let wake = waker(&cc.egui_ctx);
        let mut store = StateStore::operator(transports.slots.clone());
        let session = SyncSession::start(
            Role::Operator,
            &mut store,
            transports,
            SyncOptions {
                wake: wake.clone(),
                ..SyncOptions::default()
            },
        );

        // A new console starts blank; live state from an earlier run must
        // not linger on displays that are still open.
        store.clear();
        store.update_style(&style);

        let gemini = GeminiClient::from_config(&config);
        let resolver = Arc::new(Resolver::new(gemini.clone()));
        info!(ai = resolver.has_ai(), "Operator console ready");

        Self {
            console: Console::new(store, session, resolver, gemini, wake),
            tab: Tab::Search,
            query: String::new(),
            manual_reference: String::new(),
            manual_body: String::new(),
            entrance: Entrance::new(0),
            displays: Vec::new(),
        }
    }

    fn launch_live(&mut self) {
        match spawn_display() {
            Ok(child) => {
                info!(pid = child.id(), "Live window launched");
                self.displays.push(child);
                self.console.session.publish_current(&self.console.store);
            }
            Err(e) => {
                warn!(error = %e, "Live window launch failed");
                self.console.toast = Some(Toast::new(format!("{e:#}")));
            }
        }
    }

    /// Forget display processes that have exited.
    fn reap_displays(&mut self) {
        self.displays
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.heading(RichText::new("Lumina").strong().color(Color32::from_rgb(56, 189, 248)));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(RichText::new("OPERATOR").small().weak());
            });
        });
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let launch = ui
                .add_sized([250.0, 32.0], egui::Button::new(RichText::new("Launch Live").strong()))
                .on_hover_text("Open a separate window for the projector");
            if launch.clicked() {
                self.launch_live();
            }
            let clear = ui
                .add_sized([100.0, 32.0], egui::Button::new("Clear"))
                .on_hover_text("Blank the live screen");
            if clear.clicked() {
                self.console.clear();
            }
        });
        let ai = if self.console.resolver.has_ai() {
            "AI lookups enabled"
        } else {
            "Offline and public sources only"
        };
        ui.label(RichText::new(ai).small().weak());

        ui.separator();
        ui.horizontal(|ui| {
            for tab in Tab::ALL {
                ui.selectable_value(&mut self.tab, tab, tab.title());
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match self.tab {
                Tab::Search => self.search_tab(ui),
                Tab::Manual => self.manual_tab(ui),
                Tab::Insights => self.insights_tab(ui),
                Tab::Settings => self.settings_tab(ui),
            });
    }

    fn search_tab(&mut self, ui: &mut egui::Ui) {
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.query)
                .hint_text("Ex: John 3:16, 1 Nephi 3:7...")
                .desired_width(f32::INFINITY),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        let busy = self.console.loading.is_some();
        let clicked = ui
            .add_enabled(!busy, egui::Button::new("Search"))
            .clicked();
        if clicked || submitted {
            let query = self.query.clone();
            self.console.search(&query);
        }
        ui.label(
            RichText::new("Supports Bible, Book of Mormon, D&C, and PGP")
                .small()
                .weak(),
        );

        if let Some(current) = self.console.store.slide().cloned() {
            ui.add_space(8.0);
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    if ui
                        .button("\u{25C0}")
                        .on_hover_text("Previous verse (Arrow Left)")
                        .clicked()
                    {
                        self.console.navigate(Direction::Prev);
                    }
                    ui.vertical(|ui| {
                        ui.label(RichText::new("CURRENT VERSE").small().strong());
                        ui.label(&current.reference);
                    });
                    if ui
                        .button("\u{25B6}")
                        .on_hover_text("Next verse (Arrow Right)")
                        .clicked()
                    {
                        self.console.navigate(Direction::Next);
                    }
                });
            });
        }

        if self.console.store.history().is_empty() {
            return;
        }
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label(RichText::new("RECENT VERSES").small().strong().weak());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("Clear history").clicked() {
                    self.console.store.clear_history();
                }
            });
        });

        let mut selected = None;
        for entry in self.console.store.history() {
            let text = format!(
                "{}\n\u{201C}{}\u{201D}",
                entry.slide.reference,
                snippet(&entry.slide.body, HISTORY_SNIPPET_CHARS)
            );
            let button = egui::Button::new(text).min_size(egui::vec2(ui.available_width(), 0.0));
            if ui.add(button).clicked() {
                selected = Some(entry.id);
            }
        }
        if let Some(id) = selected {
            self.console.select_history(id);
        }
    }

    fn manual_tab(&mut self, ui: &mut egui::Ui) {
        ui.label(RichText::new("Use this mode when offline or for custom text.").weak());
        ui.add_space(8.0);
        ui.label("Reference");
        ui.add(
            egui::TextEdit::singleline(&mut self.manual_reference)
                .hint_text("e.g. Hymn 301")
                .desired_width(f32::INFINITY),
        );
        ui.label("Text");
        ui.add(
            egui::TextEdit::multiline(&mut self.manual_body)
                .desired_rows(8)
                .desired_width(f32::INFINITY),
        );
        let ready = !self.manual_reference.trim().is_empty() && !self.manual_body.trim().is_empty();
        if ui
            .add_enabled(ready, egui::Button::new("Present Now"))
            .clicked()
        {
            let (reference, body) = (self.manual_reference.clone(), self.manual_body.clone());
            self.console.present_manual(&reference, &body);
        }
    }

    fn insights_tab(&mut self, ui: &mut egui::Ui) {
        if self.console.store.slide().is_none() {
            ui.add_space(24.0);
            ui.vertical_centered(|ui| ui.label(RichText::new("Select a verse to see insights.").weak()));
            return;
        }
        match &self.console.insight {
            InsightState::Idle => {
                ui.label(RichText::new("No insights for custom slides.").weak());
            }
            InsightState::Loading => {
                ui.add_space(24.0);
                ui.vertical_centered(|ui| {
                    ui.spinner();
                    ui.label("Asking Gemini for insights...");
                    ui.label(RichText::new("(Requires Internet)").small().weak());
                });
            }
            InsightState::Ready(insight) => {
                for (title, text) in insight.sections() {
                    ui.group(|ui| {
                        ui.set_width(ui.available_width());
                        ui.label(
                            RichText::new(title.to_uppercase())
                                .small()
                                .strong()
                                .color(Color32::from_rgb(56, 189, 248)),
                        );
                        ui.label(text);
                    });
                    ui.add_space(6.0);
                }
            }
        }
    }

    fn settings_tab(&mut self, ui: &mut egui::Ui) {
        let style = self.console.store.style().clone();
        let mut patch = StylePatch::default();

        ui.label(RichText::new("THEME").small().strong().weak());
        egui::Grid::new("themes").num_columns(2).show(ui, |ui| {
            for (i, mode) in ThemeMode::all().iter().enumerate() {
                if ui.selectable_label(style.theme == *mode, mode.name()).clicked() {
                    patch = StylePatch::theme(*mode);
                }
                if i % 2 == 1 {
                    ui.end_row();
                }
            }
        });

        ui.add_space(12.0);
        ui.label(RichText::new("ALIGNMENT").small().strong().weak());
        ui.horizontal(|ui| {
            for alignment in Alignment::all() {
                if ui
                    .selectable_label(style.alignment == *alignment, alignment.name())
                    .clicked()
                {
                    patch = StylePatch::alignment(*alignment);
                }
            }
        });

        ui.add_space(12.0);
        ui.label(RichText::new("FONT SIZE").small().strong().weak());
        ui.horizontal(|ui| {
            for mode in [FontMode::Auto, FontMode::Manual] {
                if ui.radio(style.font_mode == mode, mode.name()).clicked() {
                    patch.font_mode = Some(mode);
                }
            }
        });
        if style.font_mode == FontMode::Manual {
            let mut size = style.font_size;
            let slider = egui::Slider::new(&mut size, MIN_MANUAL_FONT_SIZE..=MAX_MANUAL_FONT_SIZE)
                .step_by(0.1)
                .suffix(" rem");
            if ui.add(slider).changed() {
                patch.font_size = Some(size);
            }
        } else {
            ui.label(
                RichText::new("Font size is adjusted to fit the slide.")
                    .small()
                    .weak(),
            );
        }

        ui.add_space(12.0);
        let mut show_reference = style.show_reference;
        if ui.checkbox(&mut show_reference, "Show reference").changed() {
            patch.show_reference = Some(show_reference);
        }

        self.console.update_style(&patch);
    }

    fn preview(&mut self, ui: &mut egui::Ui, now: Instant) {
        let rect = ui.max_rect();
        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, Color32::from_gray(17));

        let header = egui::Rect::from_min_max(rect.min, egui::pos2(rect.right(), rect.top() + HEADER_HEIGHT));
        painter.rect_filled(header, 0.0, Color32::from_gray(24));
        painter.text(
            egui::pos2(header.left() + 16.0, header.center().y),
            Align2::LEFT_CENTER,
            "LIVE PREVIEW CONSOLE",
            FontId::proportional(12.0),
            Color32::from_gray(150),
        );
        let status = match (self.console.session.has_fanout(), self.displays.len()) {
            (false, _) => "\u{25CF} Storage sync only".to_string(),
            (true, 0) => "\u{25CF} System Active".to_string(),
            (true, n) => format!("\u{25CF} System Active \u{00b7} {n} live"),
        };
        painter.text(
            egui::pos2(header.right() - 16.0, header.center().y),
            Align2::RIGHT_CENTER,
            status,
            FontId::proportional(12.0),
            Color32::from_rgb(34, 197, 94),
        );

        let stage = egui::Rect::from_min_max(egui::pos2(rect.left(), header.bottom()), rect.max).shrink(24.0);
        let frame = render::letterbox(stage);
        let scale = render::compute_scale(frame);
        let (opacity, rise) = self.entrance.frame(now);
        let scene = Scene {
            slide: self.console.store.slide().map(|s| s.as_ref()),
            style: self.console.store.style(),
            loading: self.console.loading,
        };
        render::render_scene(ui, &scene, frame, opacity, rise);
        ui.painter().rect_stroke(
            frame,
            0.0,
            egui::Stroke::new(2.0, Color32::from_gray(55)),
            egui::StrokeKind::Outside,
        );
        ui.painter().text(
            frame.right_bottom() - egui::vec2(12.0, 10.0),
            Align2::RIGHT_BOTTOM,
            "1920x1080 SCALED PREVIEW",
            FontId::proportional(11.0),
            Color32::from_white_alpha(26),
        );

        let toast_visible = self
            .console
            .toast
            .as_ref()
            .is_some_and(|toast| draw_toast(ui, toast, &Theme::dark(), frame, scale.max(0.6)));
        if !toast_visible {
            self.console.toast = None;
        }
    }
}

impl eframe::App for OperatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.console.session.pump(&mut self.console.store);
        self.console.poll_jobs();
        self.reap_displays();

        let now = Instant::now();
        self.entrance.observe(self.console.store.epoch(), now);

        // Arrow keys belong to text fields while one has focus.
        if !ctx.wants_keyboard_input() {
            let (next, prev) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::ArrowRight),
                    i.key_pressed(egui::Key::ArrowLeft),
                )
            });
            if next {
                self.console.navigate(Direction::Next);
            } else if prev {
                self.console.navigate(Direction::Prev);
            }
        }

        egui::SidePanel::left("console")
            .exact_width(SIDE_PANEL_WIDTH)
            .resizable(false)
            .show(ctx, |ui| self.side_panel(ui));
        egui::CentralPanel::default()
            .frame(egui::Frame::new().inner_margin(0.0))
            .show(ctx, |ui| self.preview(ui, now));

        if self.entrance.is_running(now) {
            ctx.request_repaint();
        }
    }
}
