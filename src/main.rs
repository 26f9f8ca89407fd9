mod app;
mod ui;

use app::RustyPrismApp;
use eframe::egui;
use rusty_prism::settings::Settings;

fn main() -> eframe::Result {
    env_logger::init();

    let settings_path = Settings::default_path();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Prism – Spectrometer",
        options,
        Box::new(|_cc| Ok(Box::new(RustyPrismApp::new(settings_path)))),
    )
}
