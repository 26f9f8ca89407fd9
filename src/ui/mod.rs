pub mod panels;
pub mod plot;

use rusty_prism::data::calibration::Calibration;
use rusty_prism::data::known;
use rusty_prism::data::model::Spectrum;

/// Samples of the black body reference drawn and calibrated against.
const REFERENCE_SAMPLES: usize = 100;
/// Content name under which the spectrum file directory is remembered.
pub const SPECTRUM_DATA: &str = "Spectrum Data";

/// One editable point of the wavelength calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEdit {
    pub ratio: f64,
    pub nano_meters: f64,
}

/// UI-only state, independent of the model.
pub struct ViewState {
    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
    pub show_raw: bool,
    pub show_sensitivity: bool,
    /// Calibration points being edited, applied on request.
    pub calibration_points: [PointEdit; 2],
    /// Calibration point the next plot click places.
    pub picking_point: Option<usize>,
    pub black_body_kelvin: f64,
    pub show_reference: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        let mut view = Self {
            status_message: None,
            show_raw: false,
            show_sensitivity: false,
            calibration_points: [PointEdit {
                ratio: 0.0,
                nano_meters: 0.0,
            }; 2],
            picking_point: None,
            black_body_kelvin: 2800.0,
            show_reference: false,
        };
        view.edit_calibration(&Calibration::default());
        view
    }
}

impl ViewState {
    /// Start editing from the outer points of `calibration`.
    pub fn edit_calibration(&mut self, calibration: &Calibration) {
        let points = calibration.points();
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            self.calibration_points = [first, last].map(|p| PointEdit {
                ratio: p.ratio,
                nano_meters: p.nano_meters,
            });
        }
    }

    /// Ideal spectrum of the configured black body over the range of
    /// `calibration`.
    pub fn reference_spectrum(&self, calibration: &Calibration) -> Option<Spectrum> {
        match known::black_body_spectrum(
            REFERENCE_SAMPLES,
            self.black_body_kelvin,
            calibration.min_nano_meters(),
            calibration.max_nano_meters(),
        ) {
            Ok(spectrum) => Some(spectrum),
            Err(e) => {
                log::warn!("No reference spectrum: {e}");
                None
            }
        }
    }
}
