/// Spectral data layer: value types, transforms and file storage.
///
/// Architecture:
/// ```text
///   camera Frame
///        │
///        ▼
///   ┌────────────┐
///   │ sample_line │  pixel strip → SampleLine (+ over-exposure flags)
///   └────────────┘
///        │          ┌─────────────┐
///        ▼          │ calibration  │  ratio ↔ wavelength
///   ┌──────────┐    └─────────────┘
///   │  model    │◄────────┘          Spectrum = SampleLine + Calibration
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ calculations  │  smoothing, averaging, sensitivity, extrema
///   └──────────────┘
/// ```
///
/// `known` holds reference spectra and named wavelengths, `files` the CSV
/// storage of measured spectra.

pub mod calculations;
pub mod calibration;
pub mod files;
pub mod known;
pub mod model;
pub mod sample_line;
