use std::sync::Arc;

use super::calibration::Calibration;
use super::sample_line::SampleLine;

// ---------------------------------------------------------------------------
// Spectrum – a sample line bound to a wavelength calibration
// ---------------------------------------------------------------------------

/// A [`SampleLine`] over a range of wavelengths.
///
/// The calibration is a shared snapshot; replacing the model's calibration
/// never touches spectra created before.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    sample_line: SampleLine,
    calibration: Arc<Calibration>,
}

impl Spectrum {
    pub fn new(sample_line: SampleLine, calibration: Arc<Calibration>) -> Self {
        Self {
            sample_line,
            calibration,
        }
    }

    pub fn sample_line(&self) -> &SampleLine {
        &self.sample_line
    }

    pub fn calibration(&self) -> &Arc<Calibration> {
        &self.calibration
    }

    pub fn len(&self) -> usize {
        self.sample_line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_line.is_empty()
    }

    pub fn value_at_index(&self, index: usize) -> f64 {
        self.sample_line.value(index)
    }

    pub fn nano_meters_at_index(&self, index: usize) -> f64 {
        self.calibration.index_to_nano_meters(self.len(), index)
    }

    /// Value at an arbitrary wavelength, linearly interpolated between the two
    /// nearest samples. Outside the sampled range the end values are held.
    pub fn value_at_nano_meters(&self, nano_meters: f64) -> f64 {
        let len = self.len();
        if len == 0 {
            return 0.0;
        }
        let last = (len - 1) as f64;
        let index = (last * self.calibration.nano_meters_to_ratio(nano_meters)).clamp(0.0, last);

        let floor = index.floor();
        let ceil = index.ceil();
        let lower = self.value_at_index(floor as usize);
        if floor == ceil {
            return lower;
        }
        let upper = self.value_at_index(ceil as usize);
        lower + (upper - lower) * (index - floor)
    }

    /// `(wavelength, value)` pairs in index order, ready for plotting.
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        (0..self.len()).map(|i| [self.nano_meters_at_index(i), self.value_at_index(i)])
    }
}

// ---------------------------------------------------------------------------
// Extrema – local peaks and dips of a sample line
// ---------------------------------------------------------------------------

/// A local maximum (positive level) or minimum (negative level).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub index: usize,
    /// Prominence above (or below) the local background, in percent.
    pub level: f64,
}

impl Extremum {
    pub fn is_minimum(&self) -> bool {
        self.level < 0.0
    }

    pub fn is_maximum(&self) -> bool {
        self.level > 0.0
    }
}

/// Minima and maxima, each ordered by descending absolute level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extrema {
    pub minima: Vec<Extremum>,
    pub maxima: Vec<Extremum>,
}

impl Extrema {
    /// All extrema, maxima first.
    pub fn iter(&self) -> impl Iterator<Item = &Extremum> {
        self.maxima.iter().chain(self.minima.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::calibration::CalibrationPoint;

    fn spectrum(values: Vec<f64>, begin: f64, end: f64) -> Spectrum {
        Spectrum::new(
            SampleLine::new(values),
            Arc::new(Calibration::spanning(begin, end).unwrap()),
        )
    }

    #[test]
    fn interpolates_between_samples() {
        let sp = spectrum(vec![0.0, 1.0, 3.0], 400.0, 600.0);
        assert_eq!(0.0, sp.value_at_nano_meters(400.0));
        assert_eq!(1.0, sp.value_at_nano_meters(500.0));
        assert!((sp.value_at_nano_meters(450.0) - 0.5).abs() < 1e-12);
        assert!((sp.value_at_nano_meters(575.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn clamps_outside_range() {
        let sp = spectrum(vec![0.2, 1.0, 0.7], 400.0, 600.0);
        assert_eq!(0.2, sp.value_at_nano_meters(100.0));
        assert_eq!(0.7, sp.value_at_nano_meters(2000.0));
    }

    #[test]
    fn descending_calibration_lookup() {
        let sp = spectrum(vec![0.0, 1.0, 3.0], 600.0, 400.0);
        assert_eq!(3.0, sp.value_at_nano_meters(400.0));
        assert_eq!(0.0, sp.value_at_nano_meters(600.0));
        assert_eq!(3.0, sp.value_at_nano_meters(300.0));
    }

    #[test]
    fn index_wavelengths_follow_calibration() {
        let cal = Calibration::new([CalibrationPoint::new(0.0, 400.0), CalibrationPoint::new(1.0, 500.0)])
            .unwrap();
        let sp = Spectrum::new(SampleLine::new(vec![0.0; 11]), Arc::new(cal));
        assert!((sp.nano_meters_at_index(5) - 450.0).abs() < 1e-9);
        let points: Vec<[f64; 2]> = sp.points().collect();
        assert_eq!(11, points.len());
        assert!((points[10][0] - 500.0).abs() < 1e-9);
    }

    #[test]
    fn extremum_sign() {
        assert!(Extremum { index: 1, level: 2.0 }.is_maximum());
        assert!(Extremum { index: 1, level: -2.0 }.is_minimum());
        let zero = Extremum { index: 1, level: 0.0 };
        assert!(!zero.is_maximum() && !zero.is_minimum());
    }
}
