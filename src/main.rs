//! Main application window and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::{Column, TableBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::info;

mod app;
use app::{AppError, Outcome, RestoreOptions, TrainingState};
mod exercises;
mod session;
mod storage;
use storage::Persistence;
mod workouts;
use workouts::DEFAULT_DATE_FORMAT;

const NO_SELECTED_EXERCISE: &str = "Select exercise\u{2026}";
const TOAST_DURATION: Duration = Duration::from_secs(3);

fn default_true() -> bool {
    true
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Persistent configuration for user preferences.
///
/// Stored as JSON in the user's config directory. Every field has a serde
/// default so older or partial files still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    /// Start each session with the exercises of the most recent workout.
    #[serde(default = "default_true")]
    prefill_from_last_workout: bool,
    /// Directory holding the stored exercise and workout lists.
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default = "default_date_format")]
    date_format: String,
    #[serde(default)]
    show_raw_json: bool,
}

impl Settings {
    const FILE: &'static str = "training_log_settings.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings from the JSON configuration file.
    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring unreadable settings {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(self) {
                Ok(data) => {
                    if let Err(e) = std::fs::write(&path, data) {
                        log::error!("Failed to save settings: {e}");
                    }
                }
                Err(e) => log::error!("Failed to serialize settings: {e}"),
            }
        }
    }

    fn restore_options(&self) -> RestoreOptions {
        RestoreOptions {
            prefill_from_last_workout: self.prefill_from_last_workout,
            date_format: self.date_format.clone(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefill_from_last_workout: true,
            data_dir: None,
            date_format: default_date_format(),
            show_raw_json: false,
        }
    }
}

struct TrainingApp {
    state: TrainingState,
    settings: Settings,
    settings_dirty: bool,
    show_settings: bool,
    toast: Option<(String, bool, Instant)>,
}

impl Default for TrainingApp {
    fn default() -> Self {
        let settings = Settings::load();
        let store = Persistence::open_default(settings.data_dir.as_deref());
        Self::with_store(settings, store)
    }
}

impl TrainingApp {
    fn with_store(settings: Settings, store: Persistence) -> Self {
        let state = TrainingState::restore(store, &settings.restore_options());
        info!(
            "Loaded {} exercises and {} workouts",
            state.exercises.len(),
            state.workouts.len()
        );
        Self {
            state,
            settings,
            settings_dirty: false,
            show_settings: false,
            toast: None,
        }
    }

    /// Show the result of a user action as a short-lived message.
    fn report(&mut self, result: Result<Outcome, AppError>) {
        match result {
            Ok(outcome) => {
                let failed = outcome.write_error.is_some();
                if failed {
                    log::warn!("{outcome}");
                } else {
                    info!("{outcome}");
                }
                self.toast = Some((outcome.to_string(), failed, Instant::now()));
            }
            Err(e) if e.is_no_op() => log::debug!("Nothing to do: {e}"),
            Err(e) => {
                log::warn!("{e}");
                self.toast = Some((e.to_string(), true, Instant::now()));
            }
        }
    }

    fn delete_button(ui: &mut egui::Ui, text: &str) -> bool {
        ui.add(
            egui::Button::new(egui::RichText::new(text).color(egui::Color32::WHITE))
                .fill(egui::Color32::DARK_RED),
        )
        .clicked()
    }

    fn exercise_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Exercises");
        ui.horizontal(|ui| {
            let input = ui.add(
                egui::TextEdit::singleline(&mut self.state.new_exercise_name)
                    .hint_text("New exercise")
                    .desired_width(140.0),
            );
            let submitted =
                input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Add").clicked() || submitted {
                let result = self.state.add_named_exercise();
                self.report(result);
            }
        });
        ui.separator();
        if self.state.exercises.is_empty() {
            ui.weak("Name an exercise to make it selectable.");
        }

        let mut remove: Option<String> = None;
        egui::ScrollArea::vertical()
            .id_source("exercise_list")
            .show(ui, |ui| {
                for option in self.state.exercises.options() {
                    ui.push_id(option.id, |ui| {
                        ui.horizontal(|ui| {
                            if Self::delete_button(ui, "\u{2715}") {
                                remove = Some(option.name.clone());
                            }
                            ui.label(&option.name);
                        });
                    });
                }
            });
        if let Some(name) = remove {
            let result = self.state.remove_named_exercise(&name);
            self.report(result);
        }
    }

    fn session_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Session");
        ui.horizontal(|ui| {
            let selected = self
                .state
                .selection
                .clone()
                .unwrap_or_else(|| NO_SELECTED_EXERCISE.to_string());
            egui::ComboBox::from_id_source("main_exercise_selector")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.state.selection, None, NO_SELECTED_EXERCISE);
                    for option in self.state.exercises.options() {
                        ui.selectable_value(
                            &mut self.state.selection,
                            Some(option.name.clone()),
                            &option.name,
                        );
                    }
                });
            if ui.button("Add to session").clicked() {
                let result = self.state.add_to_session();
                self.report(result);
            }
        });

        let mut remove: Option<u64> = None;
        let row_height = ui.spacing().interact_size.y;
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .column(Column::auto().at_least(100.0))
            .columns(Column::auto().at_least(70.0), 3)
            .column(Column::remainder().at_least(120.0))
            .column(Column::auto())
            .header(row_height, |mut header| {
                for title in ["Exercise", "Weight", "Reps", "Break", "Comments", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for row in self.state.session.rows_mut() {
                    let id = row.id();
                    body.row(row_height, |mut table_row| {
                        table_row.col(|ui| {
                            ui.label(row.name());
                        });
                        for field in [&mut row.weight, &mut row.reps, &mut row.rest] {
                            table_row.col(|ui| {
                                ui.add(egui::TextEdit::singleline(field).desired_width(60.0));
                            });
                        }
                        table_row.col(|ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut row.comments)
                                    .desired_width(f32::INFINITY),
                            );
                        });
                        table_row.col(|ui| {
                            if Self::delete_button(ui, "Delete") {
                                remove = Some(id);
                            }
                        });
                    });
                }
            });
        if let Some(id) = remove {
            let result = self.state.remove_session_row(id);
            self.report(result);
        }

        if self.state.session.is_empty() {
            ui.weak("Pick an exercise above and add it to the session.");
        }
        ui.add_space(8.0);
        if ui.button("Finish workout").clicked() {
            let result = self.state.finish_workout(Utc::now());
            self.report(result);
        }
    }

    fn previous_workouts(&mut self, ui: &mut egui::Ui) {
        ui.heading("Previous workouts");
        if self.state.workouts.is_empty() {
            ui.weak("No finished workouts yet.");
        }
        let mut delete = None;
        egui::ScrollArea::vertical()
            .id_source("previous_workout_list")
            .show(ui, |ui| {
                for logged in self.state.workouts.iter().rev() {
                    let summary = &logged.summary;
                    ui.horizontal(|ui| {
                        egui::CollapsingHeader::new(&summary.title)
                            .id_source(summary.id)
                            .show(ui, |ui| {
                                egui::Grid::new(summary.id.with("grid"))
                                    .striped(true)
                                    .show(ui, |ui| {
                                        for title in ["Exercise", "Weight", "Reps", "Break", "Comments"]
                                        {
                                            ui.strong(title);
                                        }
                                        ui.end_row();
                                        for e in &logged.workout.exercises {
                                            ui.label(&e.name);
                                            ui.label(&e.weight);
                                            ui.label(&e.reps);
                                            ui.label(&e.rest);
                                            ui.label(&e.comments);
                                            ui.end_row();
                                        }
                                    });
                                if self.settings.show_raw_json {
                                    ui.monospace(&summary.body);
                                }
                            });
                        if Self::delete_button(ui, "Delete") {
                            delete = Some(logged.workout.date);
                        }
                    });
                }
            });
        if let Some(date) = delete {
            let result = self.state.delete_workout(date);
            self.report(result);
        }
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                if ui
                    .checkbox(
                        &mut self.settings.prefill_from_last_workout,
                        "Start sessions from the last workout",
                    )
                    .changed()
                {
                    self.settings_dirty = true;
                }
                if ui
                    .checkbox(&mut self.settings.show_raw_json, "Show stored workout text")
                    .changed()
                {
                    self.settings_dirty = true;
                }
                ui.horizontal(|ui| {
                    ui.label("Date format:");
                    if ui
                        .text_edit_singleline(&mut self.settings.date_format)
                        .changed()
                    {
                        self.settings_dirty = true;
                    }
                });
                ui.label("Date format and storage directory apply on next start.");
            });
        self.show_settings = open;
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.state.notices.first().cloned() else {
            return;
        };
        let mut acknowledged = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(notice);
                if ui.button("OK").clicked() {
                    acknowledged = true;
                }
            });
        if acknowledged {
            self.state.notices.remove(0);
        }
    }
}

impl App for TrainingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        let blocked = !self.state.notices.is_empty();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Training Log");
                if ui.button("Settings").clicked() {
                    self.show_settings = true;
                }
                if let Some((msg, is_error, start)) = &self.toast {
                    if start.elapsed() < TOAST_DURATION {
                        let color = if *is_error {
                            egui::Color32::LIGHT_RED
                        } else {
                            egui::Color32::LIGHT_GREEN
                        };
                        ui.colored_label(color, msg);
                        ctx.request_repaint_after(Duration::from_millis(200));
                    }
                }
            });
        });
        if self
            .toast
            .as_ref()
            .is_some_and(|(_, _, start)| start.elapsed() >= TOAST_DURATION)
        {
            self.toast = None;
        }

        egui::SidePanel::left("exercise_panel").show(ctx, |ui| {
            ui.add_enabled_ui(!blocked, |ui| self.exercise_panel(ui));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!blocked, |ui| {
                self.session_panel(ui);
                ui.separator();
                self.previous_workouts(ui);
            });
        });

        if self.show_settings {
            self.settings_window(ctx);
        }
        self.notice_window(ctx);

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions::default();
    eframe::run_native(
        "Training Log",
        options,
        Box::new(|_cc| Box::new(TrainingApp::default())),
    )
}
