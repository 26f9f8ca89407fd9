use eframe::egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Line, LineStyle, MarkerShape, Plot, PlotPoint, PlotPoints, Points, Text, VLine};
use rusty_prism::color::{color_for_wave_length, translucent};
use rusty_prism::data::model::Spectrum;
use rusty_prism::state::Model;

use super::ViewState;

// ---------------------------------------------------------------------------
// Spectrum plot (central panel)
// ---------------------------------------------------------------------------

/// Render the processed spectrum with peaks, the hover cursor and optional
/// raw / reference / correction curves. Clicking while a calibration point
/// is being picked places that point.
pub fn spectrum_plot(ui: &mut Ui, model: &mut Model, view: &mut ViewState) {
    let Some(spectrum) = model.spectrum().cloned() else {
        model.set_hover_cursor_nano_meters(None);
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Select a camera or load a spectrum  (File → Load spectrum…)");
        });
        return;
    };

    let raw = view.show_raw.then(|| model.raw_spectrum().cloned()).flatten();
    let corrections = view
        .show_sensitivity
        .then(|| model.sensitivity_calibration().cloned())
        .flatten();
    let reference = view
        .show_reference
        .then(|| view.reference_spectrum(spectrum.calibration()))
        .flatten();
    let peaks: Vec<(f64, f64)> = model
        .extrema()
        .map(|extrema| {
            extrema
                .maxima
                .iter()
                .map(|e| (spectrum.nano_meters_at_index(e.index), spectrum.value_at_index(e.index)))
                .collect()
        })
        .unwrap_or_default();
    let hover = model.hover_cursor_nano_meters();

    let response = Plot::new("spectrum_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Wavelength [nm]")
        .y_axis_label("Intensity")
        .include_y(0.0)
        .include_y(1.0)
        .label_formatter(|name, value| {
            if name.is_empty() {
                format!("{:.1} nm\n{:.3}", value.x, value.y)
            } else {
                format!("{name}\n{:.1} nm\n{:.3}", value.x, value.y)
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(colored_fill(&spectrum));

            if let Some(raw) = &raw {
                plot_ui.line(
                    Line::new(raw.points().collect::<PlotPoints>())
                        .name("Raw")
                        .color(Color32::GRAY)
                        .width(1.0),
                );
            }
            if let Some(reference) = &reference {
                plot_ui.line(
                    Line::new(reference.points().collect::<PlotPoints>())
                        .name("Reference")
                        .color(Color32::YELLOW)
                        .style(LineStyle::dashed_loose()),
                );
            }
            if let Some(corrections) = &corrections {
                plot_ui.line(
                    Line::new(corrections.points().collect::<PlotPoints>())
                        .name("Correction")
                        .color(Color32::LIGHT_BLUE)
                        .style(LineStyle::dashed_dense()),
                );
            }

            plot_ui.line(
                Line::new(spectrum.points().collect::<PlotPoints>())
                    .name("Spectrum")
                    .color(Color32::WHITE)
                    .width(1.5),
            );

            let over_exposed: PlotPoints = spectrum
                .points()
                .enumerate()
                .filter(|(i, _)| spectrum.sample_line().is_over_exposed(*i))
                .map(|(_, point)| point)
                .collect();
            plot_ui.points(
                Points::new(over_exposed)
                    .name("Over-exposed")
                    .color(Color32::RED)
                    .radius(1.5),
            );

            for &(nm, level) in &peaks {
                plot_ui.points(
                    Points::new(vec![[nm, level]])
                        .shape(MarkerShape::Down)
                        .color(color_for_wave_length(nm))
                        .radius(4.0),
                );
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(nm, level + 0.02),
                        RichText::new(format!("{nm:.1}")).color(color_for_wave_length(nm)),
                    )
                    .anchor(Align2::CENTER_BOTTOM),
                );
            }

            if let Some(nm) = hover {
                plot_ui.vline(VLine::new(nm).color(color_for_wave_length(nm)).width(1.0));
            }

            plot_ui.pointer_coordinate()
        });

    let pointer = response.inner;
    let hovered = response.response.hovered();
    model.set_hover_cursor_nano_meters(pointer.filter(|_| hovered).map(|p| p.x));

    if response.response.clicked() {
        if let (Some(index), Some(pointer)) = (view.picking_point, pointer) {
            view.calibration_points[index].ratio =
                spectrum.calibration().nano_meters_to_ratio(pointer.x).clamp(0.0, 1.0);
            view.picking_point = None;
        }
    }
}

/// Area under the spectrum, each sample in the colour of its wavelength.
fn colored_fill(spectrum: &Spectrum) -> BarChart {
    let width = (spectrum.calibration().nano_meter_range() / spectrum.len().max(1) as f64).max(f64::EPSILON);
    let bars = spectrum
        .points()
        .map(|[nm, value]| {
            Bar::new(nm, value)
                .width(width)
                .fill(translucent(color_for_wave_length(nm), 140))
                .stroke(Stroke::NONE)
        })
        .collect();
    BarChart::new(bars)
}
