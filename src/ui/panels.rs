use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};
use egui_extras::{Column, TableBuilder};
use rusty_prism::camera;
use rusty_prism::color::color_for_wave_length;
use rusty_prism::data::calibration::{Calibration, CalibrationPoint};
use rusty_prism::data::{files, known};
use rusty_prism::state::Model;

use super::{SPECTRUM_DATA, ViewState};
use crate::app::select_camera;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, model: &mut Model, view: &mut ViewState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Load spectrum…").clicked() {
                load_spectrum_dialog(model, view);
                ui.close_menu();
            }
            if ui
                .add_enabled(model.raw_spectrum().is_some(), egui::Button::new("Save spectrum…"))
                .clicked()
            {
                save_spectrum_dialog(model, view);
                ui.close_menu();
            }
        });

        ui.separator();

        // ---- Camera selection ----
        let current = model.camera_id();
        let current_name = model
            .camera()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "No camera".to_string());
        let mut selected = current;
        egui::ComboBox::from_id_salt("camera")
            .selected_text(current_name)
            .show_ui(ui, |ui: &mut Ui| {
                ui.selectable_value(&mut selected, None, "No camera");
                for (id, name) in camera::available_cameras() {
                    ui.selectable_value(&mut selected, Some(id), name);
                }
            });
        if selected != current {
            select_camera(model, view, selected);
            view.edit_calibration(&model.calibration());
        }

        let has_camera = model.camera().is_some();
        let mut paused = model.is_camera_paused();
        if ui
            .add_enabled(has_camera, egui::SelectableLabel::new(paused, "⏸ Pause"))
            .clicked()
        {
            paused = !paused;
            model.set_camera_paused(paused);
        }
        if ui
            .add_enabled(has_camera && paused, egui::Button::new("Single frame"))
            .clicked()
        {
            if let Err(e) = model.grab_single_frame() {
                log::error!("Single frame failed: {e:#}");
                view.status_message = Some(format!("{e:#}"));
            }
        }

        if let Some(props) = model.camera_props() {
            let mut exposure = props.exposure;
            if ui
                .add(Slider::new(&mut exposure, -8.0..=4.0).step_by(0.25).text("Exposure"))
                .changed()
            {
                model.set_camera_props(props.with_exposure(exposure));
            }
        }

        ui.separator();

        if let (Some(nm), Some(spectrum)) = (model.hover_cursor_nano_meters(), model.spectrum()) {
            ui.label(
                RichText::new(format!("{nm:.1} nm  {:.3}", spectrum.value_at_nano_meters(nm)))
                    .color(color_for_wave_length(nm))
                    .monospace(),
            );
        }

        if let Some(msg) = &view.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – processing and calibration
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, model: &mut Model, view: &mut ViewState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            egui::CollapsingHeader::new(RichText::new("Sampling").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| sampling_section(ui, model));

            egui::CollapsingHeader::new(RichText::new("Processing").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| processing_section(ui, model, view));

            egui::CollapsingHeader::new(RichText::new("Wavelength calibration").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| calibration_section(ui, model, view));

            egui::CollapsingHeader::new(RichText::new("Sensitivity calibration").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| sensitivity_section(ui, model, view));

            egui::CollapsingHeader::new(RichText::new("Peaks").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| peak_table(ui, model));
        });
}

fn sampling_section(ui: &mut Ui, model: &mut Model) {
    let params = model.params();

    let mut ratio = params.sample_row_pos_ratio;
    if ui
        .add(Slider::new(&mut ratio, 0.0..=1.0).text("Row position"))
        .changed()
    {
        model.set_sample_row_pos_ratio(ratio);
    }

    let mut rows = params.sample_rows;
    if ui.add(Slider::new(&mut rows, 1..=100).text("Rows")).changed() {
        model.set_sample_rows(rows);
    }
}

fn processing_section(ui: &mut Ui, model: &mut Model, view: &mut ViewState) {
    let params = model.params();

    let mut factor = params.time_averaging_factor;
    if ui
        .add(Slider::new(&mut factor, 0.0..=0.99).text("Time averaging"))
        .changed()
    {
        model.set_time_averaging_factor(factor);
    }

    let mut peak_hold = params.peak_hold;
    if ui.checkbox(&mut peak_hold, "Peak hold").changed() {
        model.set_peak_hold(peak_hold);
    }

    let mut sigma = params.smooth_index_steps;
    if ui
        .add(Slider::new(&mut sigma, 0.0..=10.0).text("Smoothing"))
        .changed()
    {
        model.set_smooth_index_steps(sigma);
    }

    let mut normalize = params.normalize_sample_values;
    if ui.checkbox(&mut normalize, "Normalize").changed() {
        model.set_normalize_sample_values(normalize);
    }

    ui.checkbox(&mut view.show_raw, "Show raw");
}

fn calibration_section(ui: &mut Ui, model: &mut Model, view: &mut ViewState) {
    ui.label(format!("Current: {}", model.calibration()));
    ui.separator();

    let known = known::common_wave_lengths();
    for (i, point) in view.calibration_points.iter_mut().enumerate() {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(format!("#{}", i + 1));
            ui.add(
                egui::DragValue::new(&mut point.ratio)
                    .range(0.0..=1.0)
                    .speed(0.001)
                    .fixed_decimals(4),
            );
            egui::ComboBox::from_id_salt(("known_wave_length", i))
                .selected_text(format!("{:.1} nm", point.nano_meters))
                .show_ui(ui, |ui: &mut Ui| {
                    for wave_length in &known {
                        ui.selectable_value(
                            &mut point.nano_meters,
                            wave_length.nano_meters,
                            RichText::new(wave_length.label(true))
                                .color(color_for_wave_length(wave_length.nano_meters)),
                        );
                    }
                });
            let picking = view.picking_point == Some(i);
            if ui.selectable_label(picking, "Pick").on_hover_text("Click the line in the plot").clicked() {
                view.picking_point = if picking { None } else { Some(i) };
            }
        });
    }

    let has_camera = model.camera_id().is_some();
    ui.horizontal(|ui: &mut Ui| {
        if ui.add_enabled(has_camera, egui::Button::new("Apply")).clicked() {
            let points = view
                .calibration_points
                .map(|p| CalibrationPoint::new(p.ratio, p.nano_meters));
            match Calibration::new(points) {
                Ok(calibration) => {
                    model.set_calibration(calibration);
                    view.status_message = None;
                }
                Err(e) => view.status_message = Some(e.to_string()),
            }
        }
        if ui.add_enabled(has_camera, egui::Button::new("Default")).clicked() {
            if let Some(id) = model.camera_id() {
                model.set_calibration_for(id, None);
            }
            view.edit_calibration(&model.calibration());
        }
    });
}

fn sensitivity_section(ui: &mut Ui, model: &mut Model, view: &mut ViewState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Reference black body");
        ui.add(
            egui::DragValue::new(&mut view.black_body_kelvin)
                .range(1000.0..=12000.0)
                .speed(10.0)
                .suffix(" K"),
        );
    });
    ui.checkbox(&mut view.show_reference, "Show reference");
    ui.checkbox(&mut view.show_sensitivity, "Show correction factors");

    let has_camera = model.camera_id().is_some();
    ui.horizontal(|ui: &mut Ui| {
        if ui.add_enabled(has_camera, egui::Button::new("Calibrate")).clicked() {
            if let Some(reference) = view.reference_spectrum(&model.calibration()) {
                match model.calibrate_sensitivity_with_reference_light(&reference) {
                    Ok(()) => view.status_message = None,
                    Err(e) => view.status_message = Some(e.to_string()),
                }
            }
        }
        if ui
            .add_enabled(model.sensitivity_calibration().is_some(), egui::Button::new("Reset"))
            .clicked()
        {
            model.set_sensitivity_calibration(None);
        }
    });
}

fn peak_table(ui: &mut Ui, model: &Model) {
    let (Some(spectrum), Some(extrema)) = (model.spectrum(), model.extrema()) else {
        ui.label("No spectrum.");
        return;
    };

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(70.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("Wavelength");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Level %");
            });
        })
        .body(|mut body| {
            for extremum in &extrema.maxima {
                let nm = spectrum.nano_meters_at_index(extremum.index);
                body.row(16.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.label(RichText::new(format!("{nm:.1} nm")).color(color_for_wave_length(nm)));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.1}", extremum.level));
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn spectrum_file_dialog(model: &Model, title: &str) -> rfd::FileDialog {
    let dialog = rfd::FileDialog::new()
        .set_title(title)
        .add_filter("CSV", &["csv"]);
    match model.last_used_directory(SPECTRUM_DATA) {
        Some(dir) => dialog.set_directory(dir),
        None => dialog,
    }
}

fn remember_directory(model: &mut Model, path: &Path) {
    model.set_last_used_directory(SPECTRUM_DATA, path.parent().map(Path::to_path_buf));
}

/// Load a spectrum file in place of the camera picture. The camera is paused
/// so the next frame does not replace it.
pub fn load_spectrum_dialog(model: &mut Model, view: &mut ViewState) {
    let Some(path) = spectrum_file_dialog(model, "Load spectrum").pick_file() else {
        return;
    };
    match files::read_csv(&path) {
        Ok(spectra) => {
            log::info!("Loaded spectrum with {} samples from {}", spectra.raw.len(), path.display());
            model.load_raw_sample_line(spectra.raw.sample_line().clone());
            remember_directory(model, &path);
            view.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to load spectrum: {e:#}");
            view.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

pub fn save_spectrum_dialog(model: &mut Model, view: &mut ViewState) {
    let Some(raw) = model.raw_spectrum().cloned() else {
        return;
    };
    let Some(path) = spectrum_file_dialog(model, "Save spectrum")
        .set_file_name("spectrum.csv")
        .save_file()
    else {
        return;
    };
    match files::write_csv(&raw, model.spectrum(), &path) {
        Ok(()) => {
            log::info!("Saved spectrum to {}", path.display());
            remember_directory(model, &path);
            view.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to save spectrum: {e:#}");
            view.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
