use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::calibration::Calibration;
use super::model::Spectrum;
use super::sample_line::SampleLine;

// ---------------------------------------------------------------------------
// Spectrum data files (CSV)
// ---------------------------------------------------------------------------

/// One CSV row:
///
/// ```text
/// index,wavelength,intensityRaw,intensityProcessed
/// 0,323.2,0.0123,0.0456
/// ```
///
/// `intensityProcessed` may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataPoint {
    index: usize,
    wavelength: f64,
    intensity_raw: f64,
    intensity_processed: Option<f64>,
}

/// Raw spectrum and, if stored, its processed counterpart.
#[derive(Debug, Clone)]
pub struct Spectra {
    pub raw: Spectrum,
    pub processed: Option<Spectrum>,
}

/// Write a raw and an optional processed spectrum of the same length.
pub fn write_csv(raw: &Spectrum, processed: Option<&Spectrum>, path: &Path) -> Result<()> {
    if let Some(processed) = processed {
        if processed.len() != raw.len() {
            bail!(
                "raw and processed spectrum must have equal length but have {} and {}",
                raw.len(),
                processed.len()
            );
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV {}", path.display()))?;
    for i in 0..raw.len() {
        writer
            .serialize(DataPoint {
                index: i,
                wavelength: raw.nano_meters_at_index(i),
                intensity_raw: raw.value_at_index(i),
                intensity_processed: processed.map(|p| p.value_at_index(i)),
            })
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;

    Ok(())
}

/// Read spectra written by [`write_csv`].
///
/// The calibration spans the first to the last wavelength of the file. The
/// processed spectrum is only returned if every row has a value.
pub fn read_csv(path: &Path) -> Result<Spectra> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let points = reader
        .deserialize()
        .enumerate()
        .map(|(row_no, record)| record.with_context(|| format!("CSV row {row_no}")))
        .collect::<Result<Vec<DataPoint>>>()?;

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        bail!("{} contains no data points", path.display());
    };
    if points.len() < 2 {
        bail!("{} must contain at least two data points", path.display());
    }

    let calibration = Arc::new(
        Calibration::spanning(first.wavelength, last.wavelength)
            .with_context(|| format!("wavelength range of {}", path.display()))?,
    );

    let raw: Vec<f64> = points.iter().map(|p| p.intensity_raw).collect();
    let processed: Option<Vec<f64>> = points.iter().map(|p| p.intensity_processed).collect();

    Ok(Spectra {
        raw: Spectrum::new(SampleLine::new(raw), calibration.clone()),
        processed: processed.map(|values| Spectrum::new(SampleLine::new(values), calibration)),
    })
}
