//! Core of the rusty-prism spectrometer.
//!
//! A camera looks at a diffraction pattern; one horizontal pixel strip is
//! reduced to an intensity line, mapped to wavelengths by a [`Calibration`]
//! and pushed through the processing pipeline held by [`state::Model`].
//!
//! [`Calibration`]: data::calibration::Calibration

pub mod camera;
pub mod color;
pub mod data;
pub mod error;
pub mod observers;
pub mod settings;
pub mod state;

pub use error::SpectrumError;
