use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use rusty_prism::camera;
use rusty_prism::settings::Settings;
use rusty_prism::state::Model;

use crate::ui::{ViewState, panels, plot};

/// Repaint interval while frames are streaming in.
const LIVE_REPAINT: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyPrismApp {
    pub model: Model,
    pub view: ViewState,
    settings_path: PathBuf,
}

impl RustyPrismApp {
    /// Restore the last session from `settings_path` and reopen its camera.
    pub fn new(settings_path: PathBuf) -> Self {
        let mut app = Self {
            model: Model::new(),
            view: ViewState::default(),
            settings_path,
        };
        app.load_settings();
        app
    }

    fn load_settings(&mut self) {
        let settings = match Settings::load(&self.settings_path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                log::warn!("No settings at {}, using defaults", self.settings_path.display());
                return;
            }
            Err(e) => {
                log::error!("Failed to load settings: {e:#}");
                self.view.status_message = Some(format!("Settings not loaded: {e:#}"));
                return;
            }
        };

        if let Err(e) = self.model.apply_settings(&settings) {
            log::error!("Ignoring settings {}: {e}", self.settings_path.display());
            self.view.status_message = Some(format!("Settings ignored: {e}"));
            return;
        }
        log::info!("Loaded settings from {}", self.settings_path.display());

        if let Some(id) = settings.selected_camera_id {
            select_camera(&mut self.model, &mut self.view, Some(id));
        }
    }

    fn store_settings(&self) {
        match self.model.create_settings().write_json(&self.settings_path) {
            Ok(()) => log::info!("Stored settings to {}", self.settings_path.display()),
            Err(e) => log::error!("Failed to store settings: {e:#}"),
        }
    }
}

/// Switch to camera `id` (or none) and start streaming.
pub fn select_camera(model: &mut Model, view: &mut ViewState, id: Option<u32>) {
    let Some(id) = id else {
        model.set_camera(None);
        return;
    };
    match camera::open_grabber(id) {
        Ok(grabber) => {
            model.set_camera(Some(grabber));
            model.set_camera_paused(false);
            view.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to open camera {id}: {e:#}");
            view.status_message = Some(format!("Camera {id}: {e:#}"));
        }
    }
}

impl eframe::App for RustyPrismApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.model.poll_camera();
        if self.model.camera().is_some() && !self.model.is_camera_paused() {
            ctx.request_repaint_after(LIVE_REPAINT);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.model, &mut self.view);
        });

        // ---- Left side panel: processing and calibration ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.model, &mut self.view);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::spectrum_plot(ui, &mut self.model, &mut self.view);
        });
    }
}

impl Drop for RustyPrismApp {
    fn drop(&mut self) {
        self.store_settings();
    }
}
