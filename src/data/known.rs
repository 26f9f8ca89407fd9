//! Spectral data of real-world light sources.

use std::sync::Arc;

use super::calibration::Calibration;
use super::model::Spectrum;
use super::sample_line::SampleLine;
use crate::error::Result;

/// A wavelength with a human readable name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWaveLength {
    pub name: &'static str,
    pub nano_meters: f64,
}

impl NamedWaveLength {
    pub const fn new(name: &'static str, nano_meters: f64) -> Self {
        Self { name, nano_meters }
    }

    pub fn label(&self, with_unit: bool) -> String {
        if with_unit {
            format!("{:.1} nm {}", self.nano_meters, self.name)
        } else {
            format!("{:.1} {}", self.nano_meters, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedWaveLengthGroup {
    pub name: &'static str,
    pub wave_lengths: &'static [NamedWaveLength],
}

/// Main emission lines of common fluorescent tubes.
pub const FLUORESCENT_LAMP: NamedWaveLengthGroup = NamedWaveLengthGroup {
    name: "Fluorescent Lamp",
    wave_lengths: &[
        NamedWaveLength::new("Hg Purple", 404.7),
        NamedWaveLength::new("Hg Bright Blue", 435.8),
        NamedWaveLength::new("Tb³⁺ Broad Cyan Peak", 487.5),
        NamedWaveLength::new("Tb³⁺ Bright Green Left", 543.0),
        NamedWaveLength::new("Hg Brightest Green Right", 546.1),
        NamedWaveLength::new("Eu³⁺ Highest Yellow Peak", 587.0),
        NamedWaveLength::new("Eu³⁺ Bright Red-Orange", 611.0),
        NamedWaveLength::new("Eu³⁺ Red", 660.0),
        NamedWaveLength::new("Eu³⁺ Dark Red", 710.0),
        NamedWaveLength::new("Ar Infrared", 760.0),
    ],
};

/// Absorption lines of the solar spectrum.
pub const FRAUNHOFER: NamedWaveLengthGroup = NamedWaveLengthGroup {
    name: "Fraunhofer",
    wave_lengths: &[
        NamedWaveLength::new("K Ca⁺", 393.0),
        NamedWaveLength::new("H Ca⁺", 397.0),
        NamedWaveLength::new("G Ca/Fe", 431.0),
        NamedWaveLength::new("F H", 486.0),
        NamedWaveLength::new("b2 Mg", 517.0),
        NamedWaveLength::new("b1 Mg", 518.0),
        NamedWaveLength::new("E Fe", 527.0),
        NamedWaveLength::new("D2 Na", 589.0),
        NamedWaveLength::new("D1 Na", 590.0),
        NamedWaveLength::new("C H", 656.0),
        NamedWaveLength::new("B O₂", 687.0),
        NamedWaveLength::new("A O₂", 759.0),
    ],
};

pub const GROUPS: [&NamedWaveLengthGroup; 2] = [&FLUORESCENT_LAMP, &FRAUNHOFER];

/// All known wavelengths, sorted.
pub fn common_wave_lengths() -> Vec<&'static NamedWaveLength> {
    let mut all: Vec<_> = GROUPS.iter().flat_map(|g| g.wave_lengths.iter()).collect();
    all.sort_by(|a, b| a.nano_meters.total_cmp(&b.nano_meters));
    all
}

// ---------------------------------------------------------------------------
// Black body radiation
// ---------------------------------------------------------------------------

/// Spectral radiance of a black body (Planck's law), unscaled.
fn plancks_law(temperature_kelvin: f64, wave_length_meter: f64) -> f64 {
    const C1: f64 = 3.741771e-16;
    const C2: f64 = 1.438776e-2;
    (C1 / wave_length_meter.powi(5)) / ((C2 / (wave_length_meter * temperature_kelvin)).exp() - 1.0)
}

/// Black body spectrum with `length` samples from `begin_nm` to `end_nm`,
/// normalized to a maximum of 1.0. Used as the ideal reference of an
/// incandescent light for sensitivity calibration.
pub fn black_body_spectrum(
    length: usize,
    temperature_kelvin: f64,
    begin_nm: f64,
    end_nm: f64,
) -> Result<Spectrum> {
    let calibration = Calibration::spanning(begin_nm, end_nm)?;
    let values: Vec<f64> = (0..length)
        .map(|i| plancks_law(temperature_kelvin, calibration.index_to_nano_meters(length, i) * 1e-9))
        .collect();
    let max = values.iter().copied().fold(0.0, f64::max);
    let values = if max > 0.0 {
        values.into_iter().map(|v| v / max).collect()
    } else {
        values
    };

    Ok(Spectrum::new(SampleLine::new(values), Arc::new(calibration)))
}
