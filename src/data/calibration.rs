use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// CalibrationPoint – one (ratio, wavelength) anchor
// ---------------------------------------------------------------------------

/// Anchor of the position → wavelength mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationPoint {
    /// Position on the sample line, 0.0 = first column, 1.0 = last column.
    pub ratio: f64,
    pub nano_meters: f64,
}

impl CalibrationPoint {
    pub fn new(ratio: f64, nano_meters: f64) -> Self {
        Self { ratio, nano_meters }
    }
}

// ---------------------------------------------------------------------------
// Calibration – piecewise-linear ratio ↔ wavelength mapping
// ---------------------------------------------------------------------------

/// Immutable piecewise-linear mapping between the normalized position on a
/// sample line and wavelengths in nanometers.
///
/// Points are stored sorted by ratio. Both axes are strictly monotonic, the
/// wavelength axis may run in either direction (a mirrored camera image simply
/// yields descending wavelengths). Outside the outermost points the mapping is
/// extrapolated linearly with the slope of the edge pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    points: Vec<CalibrationPoint>,
}

impl Default for Calibration {
    /// Rough mapping for a typical webcam spectroscope: Ca-K near the left
    /// and H-alpha a bit right of the center.
    fn default() -> Self {
        Self {
            points: vec![
                CalibrationPoint::new(0.15234, 393.0),
                CalibrationPoint::new(0.72656, 656.0),
            ],
        }
    }
}

impl Calibration {
    /// Build a calibration from at least two points.
    ///
    /// The points must be strictly monotonic on both axes in the order given,
    /// i.e. no duplicates and no zig-zag. They are stored sorted by ratio.
    pub fn new(points: impl Into<Vec<CalibrationPoint>>) -> Result<Self> {
        let mut points = points.into();

        if points.len() < 2 {
            return Err(SpectrumError::InvalidCalibration(format!(
                "at least 2 points required, got {}",
                points.len()
            )));
        }
        if let Some(p) = points
            .iter()
            .find(|p| !p.ratio.is_finite() || !p.nano_meters.is_finite())
        {
            return Err(SpectrumError::InvalidCalibration(format!(
                "non-finite point ({}, {})",
                p.ratio, p.nano_meters
            )));
        }
        if !strictly_monotonic(points.iter().map(|p| p.ratio)) {
            return Err(SpectrumError::InvalidCalibration(
                "ratios must be distinct and monotonic".to_string(),
            ));
        }
        if !strictly_monotonic(points.iter().map(|p| p.nano_meters)) {
            return Err(SpectrumError::InvalidCalibration(
                "wavelengths must be distinct and monotonic".to_string(),
            ));
        }

        points.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));
        Ok(Self { points })
    }

    /// Two-point calibration spanning the whole sample line.
    pub fn spanning(begin_nano_meters: f64, end_nano_meters: f64) -> Result<Self> {
        Self::new([
            CalibrationPoint::new(0.0, begin_nano_meters),
            CalibrationPoint::new(1.0, end_nano_meters),
        ])
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    // -- ratio / index helpers --

    pub fn index_to_ratio(length: usize, index: usize) -> f64 {
        if length < 2 {
            return 0.0;
        }
        index as f64 / (length - 1) as f64
    }

    pub fn ratio_to_index(length: usize, ratio: f64) -> i64 {
        (ratio * length.saturating_sub(1) as f64).round() as i64
    }

    // -- mapping --

    pub fn ratio_to_nano_meters(&self, ratio: f64) -> f64 {
        let (a, b) = self.segment(ratio, |p| p.ratio);
        a.nano_meters + (ratio - a.ratio) * (b.nano_meters - a.nano_meters) / (b.ratio - a.ratio)
    }

    pub fn nano_meters_to_ratio(&self, nano_meters: f64) -> f64 {
        let (a, b) = self.segment(nano_meters, |p| p.nano_meters);
        a.ratio + (nano_meters - a.nano_meters) * (b.ratio - a.ratio) / (b.nano_meters - a.nano_meters)
    }

    pub fn index_to_nano_meters(&self, length: usize, index: usize) -> f64 {
        self.ratio_to_nano_meters(Self::index_to_ratio(length, index))
    }

    /// Nearest index for a wavelength. Not clamped: wavelengths outside the
    /// sampled range yield negative indices or indices `>= length`.
    pub fn nano_meters_to_index(&self, length: usize, nano_meters: f64) -> i64 {
        Self::ratio_to_index(length, self.nano_meters_to_ratio(nano_meters))
    }

    /// Nearest valid index for a wavelength, clamped to `[0, length)`.
    pub fn nano_meters_to_next_index(&self, length: usize, nano_meters: f64) -> usize {
        let max = length.saturating_sub(1) as i64;
        self.nano_meters_to_index(length, nano_meters).clamp(0, max) as usize
    }

    // -- range --

    pub fn begin_nano_meters(&self) -> f64 {
        self.ratio_to_nano_meters(0.0)
    }

    pub fn end_nano_meters(&self) -> f64 {
        self.ratio_to_nano_meters(1.0)
    }

    pub fn min_nano_meters(&self) -> f64 {
        self.begin_nano_meters().min(self.end_nano_meters())
    }

    pub fn max_nano_meters(&self) -> f64 {
        self.begin_nano_meters().max(self.end_nano_meters())
    }

    pub fn nano_meter_range(&self) -> f64 {
        self.max_nano_meters() - self.min_nano_meters()
    }

    /// Pair of adjacent points whose `key` range brackets `x`, or the edge pair
    /// on the side `x` lies beyond.
    fn segment(
        &self,
        x: f64,
        key: impl Fn(&CalibrationPoint) -> f64,
    ) -> (&CalibrationPoint, &CalibrationPoint) {
        let points = &self.points;
        let last = points.len() - 1;

        for pair in points.windows(2) {
            let (lo, hi) = min_max(key(&pair[0]), key(&pair[1]));
            if lo <= x && x <= hi {
                return (&pair[0], &pair[1]);
            }
        }

        let ascending = key(&points[0]) < key(&points[last]);
        let before_first = if ascending {
            x < key(&points[0])
        } else {
            x > key(&points[0])
        };
        if before_first {
            (&points[0], &points[1])
        } else {
            (&points[last - 1], &points[last])
        }
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}→{:.1} nm", p.ratio, p.nano_meters)?;
        }
        Ok(())
    }
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn strictly_monotonic(values: impl Iterator<Item = f64>) -> bool {
    let values: Vec<f64> = values.collect();
    let increasing = values.windows(2).all(|w| w[0] < w[1]);
    let decreasing = values.windows(2).all(|w| w[0] > w[1]);
    increasing || decreasing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f64, actual: f64, tolerance: f64) {
        assert!(
            (expected - actual).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    fn cal_400_800() -> Calibration {
        Calibration::new([
            CalibrationPoint::new(Calibration::index_to_ratio(400, 100), 400.0),
            CalibrationPoint::new(Calibration::index_to_ratio(400, 299), 800.0),
        ])
        .unwrap()
    }

    #[test]
    fn index_to_ratio() {
        assert_eq!(0.0, Calibration::index_to_ratio(400, 0));
        assert_eq!(1.0, Calibration::index_to_ratio(400, 399));
    }

    #[test]
    fn ratio_to_index() {
        assert_eq!(0, Calibration::ratio_to_index(400, 0.0));
        assert_eq!(100, Calibration::ratio_to_index(400, 0.25));
        assert_eq!(200, Calibration::ratio_to_index(400, 0.5));
        assert_eq!(299, Calibration::ratio_to_index(400, 0.75));
        assert_eq!(399, Calibration::ratio_to_index(400, 1.0));
    }

    #[test]
    fn index_to_nano_meters_interpolation() {
        let cal = cal_400_800();
        assert_close(200.0, cal.index_to_nano_meters(400, 0), 1.5);
        assert_close(400.0, cal.index_to_nano_meters(400, 100), 1e-9);
        assert_close(600.0, cal.index_to_nano_meters(400, 200), 1.5);
        assert_close(800.0, cal.index_to_nano_meters(400, 299), 1e-9);
        assert_close(1000.0, cal.index_to_nano_meters(400, 399), 1.5);
    }

    #[test]
    fn nano_meters_to_index() {
        let cal = cal_400_800();
        assert_eq!(0, cal.nano_meters_to_index(400, 200.0));
        assert_eq!(100, cal.nano_meters_to_index(400, 400.0));
        assert_eq!(200, cal.nano_meters_to_index(400, 600.0));
        assert_eq!(299, cal.nano_meters_to_index(400, 800.0));
        assert_eq!(399, cal.nano_meters_to_index(400, 1000.0));
        assert_eq!(0, cal.nano_meters_to_next_index(400, 10.0));
        assert_eq!(399, cal.nano_meters_to_next_index(400, 5000.0));
    }

    #[test]
    fn index_round_trip_within_one() {
        let cals = [
            Calibration::default(),
            cal_400_800(),
            Calibration::new([CalibrationPoint::new(0.2, 400.0), CalibrationPoint::new(0.1, 800.0)])
                .unwrap(),
        ];
        for cal in &cals {
            for length in [2usize, 17, 640, 1280] {
                for i in 0..length {
                    let nm = cal.index_to_nano_meters(length, i);
                    let back = cal.nano_meters_to_index(length, nm);
                    assert!((back - i as i64).abs() <= 1, "{cal}: {i} -> {nm} -> {back}");
                }
            }
        }
    }

    #[test]
    fn rejects_too_few_points() {
        assert!(matches!(
            Calibration::new(vec![]),
            Err(SpectrumError::InvalidCalibration(_))
        ));
        assert!(matches!(
            Calibration::new([CalibrationPoint::new(0.5, 500.0)]),
            Err(SpectrumError::InvalidCalibration(_))
        ));
    }

    #[test]
    fn accepts_consistently_descending_wavelengths() {
        let cal = Calibration::new([CalibrationPoint::new(0.2, 400.0), CalibrationPoint::new(0.1, 800.0)])
            .unwrap();
        assert_eq!(0.1, cal.points()[0].ratio);
        assert_close(1200.0, cal.begin_nano_meters(), 1e-9);
        assert_close(-2800.0, cal.end_nano_meters(), 1e-6);
        assert_close(cal.nano_meter_range(), 4000.0, 1e-6);
    }

    #[test]
    fn rejects_zig_zag_and_duplicates() {
        let zig_zag = Calibration::new([
            CalibrationPoint::new(0.2, 400.0),
            CalibrationPoint::new(0.4, 300.0),
            CalibrationPoint::new(0.1, 900.0),
        ]);
        assert!(matches!(zig_zag, Err(SpectrumError::InvalidCalibration(_))));

        let same_ratio =
            Calibration::new([CalibrationPoint::new(0.3, 400.0), CalibrationPoint::new(0.3, 500.0)]);
        assert!(same_ratio.is_err());

        let same_wavelength =
            Calibration::new([CalibrationPoint::new(0.3, 400.0), CalibrationPoint::new(0.6, 400.0)]);
        assert!(same_wavelength.is_err());

        let nan = Calibration::new([CalibrationPoint::new(0.3, f64::NAN), CalibrationPoint::new(0.6, 400.0)]);
        assert!(nan.is_err());
    }

    #[test]
    fn piecewise_segments_and_edge_extrapolation() {
        let cal = Calibration::new([
            CalibrationPoint::new(0.0, 400.0),
            CalibrationPoint::new(0.5, 500.0),
            CalibrationPoint::new(1.0, 700.0),
        ])
        .unwrap();
        assert_close(450.0, cal.ratio_to_nano_meters(0.25), 1e-9);
        assert_close(600.0, cal.ratio_to_nano_meters(0.75), 1e-9);
        // beyond the ends the edge slopes continue
        assert_close(380.0, cal.ratio_to_nano_meters(-0.1), 1e-9);
        assert_close(740.0, cal.ratio_to_nano_meters(1.1), 1e-9);
        assert_close(0.75, cal.nano_meters_to_ratio(600.0), 1e-12);
        assert_close(-0.1, cal.nano_meters_to_ratio(380.0), 1e-12);
        assert_close(1.1, cal.nano_meters_to_ratio(740.0), 1e-12);
    }

    #[test]
    fn default_range() {
        let cal = Calibration::default();
        assert!(cal.begin_nano_meters() < 393.0);
        assert!(cal.end_nano_meters() > 656.0);
        assert_eq!(cal.min_nano_meters(), cal.begin_nano_meters());
        assert_eq!(cal.max_nano_meters(), cal.end_nano_meters());
    }
}
