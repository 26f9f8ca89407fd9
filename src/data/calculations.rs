//! Pure transforms on sample lines and spectra.

use std::f64::consts::PI;

use super::model::{Extrema, Extremum, Spectrum};
use super::sample_line::SampleLine;

/// Extremum levels are reported in percent of full scale.
const LEVEL_FACTOR: f64 = 100.0;
/// Minimum prominence (in percent) for a local extremum to be reported.
const LEVEL_LIMIT: f64 = 0.3;
/// Lower bound of a sensitivity correction factor.
const MIN_CORRECTION_FACTOR: f64 = 0.01;
/// Smoothing applied to a measured spectrum before deriving corrections.
const SENSITIVITY_SMOOTH_SIGMA: f64 = 3.0;

// ---------------------------------------------------------------------------
// Sensitivity calibration
// ---------------------------------------------------------------------------

/// Multiply every sample by the correction factor at its wavelength.
pub fn apply_sensitivity_calibration(spectrum: &Spectrum, corrections: &Spectrum) -> Spectrum {
    let values = (0..spectrum.len())
        .map(|i| spectrum.value_at_index(i) * corrections.value_at_nano_meters(spectrum.nano_meters_at_index(i)))
        .collect();

    Spectrum::new(
        spectrum.sample_line().derive(values),
        spectrum.calibration().clone(),
    )
}

/// Derive per-sample correction factors by comparing a measured spectrum with
/// the ideal spectrum of a reference light.
///
/// Factors inside `[cal_begin_nm, cal_end_nm]` are scaled so that the largest
/// one becomes 1.0; outside that window the edge factors are held.
pub fn calc_sensitivity_calibration(
    measured: &Spectrum,
    reference: &Spectrum,
    cal_begin_nm: f64,
    cal_end_nm: f64,
) -> Spectrum {
    let length = measured.len();
    if length == 0 {
        return measured.clone();
    }

    let calibration = measured.calibration();
    let a = calibration.nano_meters_to_next_index(length, cal_begin_nm);
    let b = calibration.nano_meters_to_next_index(length, cal_end_nm);
    let (begin, end) = (a.min(b), a.max(b));

    let smoothed = gaussian_smooth(measured.sample_line(), SENSITIVITY_SMOOTH_SIGMA);

    let mut factors = vec![0.0; length];
    let mut max_in_range = 0.0_f64;
    for (i, factor) in factors.iter_mut().enumerate() {
        let target = reference.value_at_nano_meters(measured.nano_meters_at_index(i));
        let camera = smoothed.value(i);
        // a dark sample carries no information about the sensitivity
        *factor = if camera > 0.0 {
            (target / camera).max(MIN_CORRECTION_FACTOR)
        } else {
            MIN_CORRECTION_FACTOR
        };
        if (begin..=end).contains(&i) {
            max_in_range = max_in_range.max(*factor);
        }
    }

    for factor in &mut factors[begin..=end] {
        *factor = (*factor / max_in_range).min(1.0);
    }
    let (begin_factor, end_factor) = (factors[begin], factors[end]);
    factors[..begin].fill(begin_factor);
    factors[end + 1..].fill(end_factor);

    Spectrum::new(SampleLine::new(factors), calibration.clone())
}

// ---------------------------------------------------------------------------
// Normalization and time averaging
// ---------------------------------------------------------------------------

/// Scale so that the maximum becomes 1.0. Lines with a maximum `<= 0` are
/// returned unchanged.
pub fn normalize(input: &SampleLine) -> SampleLine {
    let max = input.max_value();
    if max <= 0.0 {
        return input.clone();
    }
    input.derive(input.values().iter().map(|v| v / max).collect())
}

/// Exponential time averaging of successive sample lines.
///
/// `factor` is the share kept from the previous average: 0.0 uses the new
/// sample only, 1.0 freezes the average. With `peak_hold` a rising value is
/// taken over immediately and only decays through the averaging.
pub fn time_average(
    new_sample: &SampleLine,
    last_averaged: Option<&SampleLine>,
    factor: f64,
    peak_hold: bool,
) -> SampleLine {
    let Some(last) = last_averaged.filter(|last| last.len() == new_sample.len()) else {
        return new_sample.clone();
    };

    let values = last
        .values()
        .iter()
        .zip(new_sample.values())
        .map(|(&old, &new)| {
            if peak_hold && new > old {
                new
            } else {
                old * factor + new * (1.0 - factor)
            }
        })
        .collect();

    new_sample.derive(values)
}

// ---------------------------------------------------------------------------
// Gaussian smoothing
// ---------------------------------------------------------------------------

/// Convolve with a Gaussian of `sigma` index steps, clamping at the edges.
pub fn gaussian_smooth(input: &SampleLine, sigma: f64) -> SampleLine {
    gaussian_convolve(input, sigma, true)
}

/// Like [`gaussian_smooth`] but leaving out the center sample: a local
/// background estimate that ignores the value itself.
pub fn gaussian_neighbourhood(input: &SampleLine, sigma: f64) -> SampleLine {
    gaussian_convolve(input, sigma, false)
}

fn gaussian_convolve(input: &SampleLine, sigma: f64, include_center: bool) -> SampleLine {
    if !sigma.is_finite() || sigma <= 0.0 || input.is_empty() {
        return input.clone();
    }

    let kernel = gaussian_half_kernel(sigma, input.len());
    let side_sum: f64 = kernel[1..].iter().sum();
    let sum = if include_center {
        kernel[0] + 2.0 * side_sum
    } else {
        2.0 * side_sum
    };

    let values = input.values();
    let last = values.len() - 1;
    let result = (0..values.len())
        .map(|i| {
            let center = if include_center { kernel[0] * values[i] } else { 0.0 };
            let sides: f64 = kernel
                .iter()
                .enumerate()
                .skip(1)
                .map(|(j, k)| k * (values[i.saturating_sub(j)] + values[(i + j).min(last)]))
                .sum();
            (center + sides) / sum
        })
        .collect();

    input.derive(result)
}

/// Normal density at 0, 1, 2, … index steps; radius `floor(3 sigma) + 2`,
/// at most one more than the line length.
fn gaussian_half_kernel(sigma: f64, line_length: usize) -> Vec<f64> {
    let length = ((sigma * 3.0) as usize).min(line_length) + 2;
    let norm = 1.0 / (sigma * (2.0 * PI).sqrt());
    (0..length)
        .map(|i| {
            let x = i as f64;
            norm * (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Extrema
// ---------------------------------------------------------------------------

/// Find local peaks and dips.
///
/// The line is denoised with `noise_sigma`; a strict local maximum of the
/// denoised line counts if it rises above both the narrow (`base_sigma`) and
/// the wide (`5 * base_sigma`) neighbourhood background. Minima likewise.
/// Results are ranked by descending absolute level and truncated.
pub fn find_local_extrema(
    input: &SampleLine,
    noise_sigma: f64,
    base_sigma: f64,
    max_minima: usize,
    max_maxima: usize,
) -> Extrema {
    let denoised = gaussian_smooth(input, noise_sigma);
    let base_narrow = gaussian_neighbourhood(input, base_sigma);
    let base_wide = gaussian_neighbourhood(input, base_sigma * 5.0);

    let mut minima = Vec::new();
    let mut maxima = Vec::new();

    let d = denoised.values();
    for i in 1..d.len().saturating_sub(1) {
        let above_narrow = d[i] - base_narrow.value(i);
        let above_wide = d[i] - base_wide.value(i);

        if d[i - 1] < d[i] && d[i] > d[i + 1] {
            let level = LEVEL_FACTOR * above_narrow.max(above_wide);
            if level >= LEVEL_LIMIT {
                maxima.push(Extremum { index: i, level });
            }
        }
        if d[i - 1] > d[i] && d[i] < d[i + 1] {
            let level = LEVEL_FACTOR * above_narrow.min(above_wide);
            if level <= -LEVEL_LIMIT {
                minima.push(Extremum { index: i, level });
            }
        }
    }

    minima.sort_by(|a, b| a.level.total_cmp(&b.level));
    minima.truncate(max_minima);
    maxima.sort_by(|a, b| b.level.total_cmp(&a.level));
    maxima.truncate(max_maxima);

    Extrema { minima, maxima }
}
