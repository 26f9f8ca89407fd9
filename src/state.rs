use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::camera::{CameraProps, Frame, FrameGrabber};
use crate::camera::grabber::GrabOutcome;
use crate::data::calculations;
use crate::data::calibration::Calibration;
use crate::data::model::{Extrema, Spectrum};
use crate::data::sample_line::{ChannelReduction, SampleLine};
use crate::error::{Result, SpectrumError};
use crate::observers::Observers;
use crate::settings::{CalibrationSettings, SensitivityCalibrationSettings, Settings};

/// Line length the extrema parameters were tuned for.
const EXTREMA_REFERENCE_LENGTH: f64 = 1280.0;
const MAX_EXTREMA: usize = 16;

// ---------------------------------------------------------------------------
// Processing parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingParams {
    /// Vertical position of the sampled strip, 0.0 top to 1.0 bottom.
    pub sample_row_pos_ratio: f64,
    /// Thickness of the sampled strip in pixel rows.
    pub sample_rows: usize,
    /// Share of the previous average kept per frame, `[0, 1]`.
    pub time_averaging_factor: f64,
    pub peak_hold: bool,
    /// Gaussian smoothing sigma in index steps, 0.0 disables smoothing.
    pub smooth_index_steps: f64,
    pub normalize_sample_values: bool,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            sample_row_pos_ratio: 0.5,
            sample_rows: 10,
            time_averaging_factor: 0.0,
            peak_hold: false,
            smooth_index_steps: 0.0,
            normalize_sample_values: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// The spectrometer state and its recomputation pipeline.
///
/// ```text
///   frame ──sample strip──► raw ──time average──► purified
///                                                   │
///     sensitivity correction ─► gaussian smooth ─► normalize ─► spectrum
/// ```
///
/// Calibration, camera properties and sensitivity corrections are kept per
/// camera id and survive camera switches. Changing any processing input of
/// the active camera recomputes the pipeline from the last raw sample line.
/// Setters that would store an equal value do nothing.
///
/// All methods run on the owner thread. Blocking frame grabs happen on the
/// [`FrameGrabber`] worker and are picked up by [`Model::poll_camera`].
pub struct Model {
    camera: Option<FrameGrabber>,
    camera_paused: bool,
    /// Buffer handed to the grabber with the next request.
    spare_frame: Option<Frame>,
    current_frame: Frame,

    camera_props_by_id: BTreeMap<u32, CameraProps>,
    calibration_by_id: BTreeMap<u32, Arc<Calibration>>,
    sensitivity_by_id: BTreeMap<u32, Spectrum>,
    default_calibration: Arc<Calibration>,

    params: ProcessingParams,
    hover_cursor_nano_meters: Option<f64>,

    /// Spectrum as it came from the last frame.
    raw_spectrum: Option<Spectrum>,
    /// Time averaged raw spectrum.
    purified_spectrum: Option<Spectrum>,
    /// Corrected, smoothed and normalized spectrum for display.
    spectrum: Option<Spectrum>,

    last_used_directories: BTreeMap<String, PathBuf>,

    camera_observers: Observers<Option<u32>>,
    camera_paused_observers: Observers<bool>,
    frame_grabbed_observers: Observers<Frame>,
    camera_props_observers: Observers<Option<CameraProps>>,
    calibration_observers: Observers<Arc<Calibration>>,
    spectrum_observers: Observers<Option<Spectrum>>,
    normalize_observers: Observers<bool>,
    hover_cursor_observers: Observers<Option<f64>>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            camera: None,
            camera_paused: true,
            spare_frame: None,
            current_frame: Frame::default(),
            camera_props_by_id: BTreeMap::new(),
            calibration_by_id: BTreeMap::new(),
            sensitivity_by_id: BTreeMap::new(),
            default_calibration: Arc::new(Calibration::default()),
            params: ProcessingParams::default(),
            hover_cursor_nano_meters: None,
            raw_spectrum: None,
            purified_spectrum: None,
            spectrum: None,
            last_used_directories: BTreeMap::new(),
            camera_observers: Observers::new("camera"),
            camera_paused_observers: Observers::new("camera paused"),
            frame_grabbed_observers: Observers::new("frame grabbed"),
            camera_props_observers: Observers::new("camera props"),
            calibration_observers: Observers::new("calibration"),
            spectrum_observers: Observers::new("spectrum"),
            normalize_observers: Observers::new("normalize"),
            hover_cursor_observers: Observers::new("hover cursor"),
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // -- observers --

    pub fn camera_observers(&mut self) -> &mut Observers<Option<u32>> {
        &mut self.camera_observers
    }

    pub fn camera_paused_observers(&mut self) -> &mut Observers<bool> {
        &mut self.camera_paused_observers
    }

    pub fn frame_grabbed_observers(&mut self) -> &mut Observers<Frame> {
        &mut self.frame_grabbed_observers
    }

    pub fn camera_props_observers(&mut self) -> &mut Observers<Option<CameraProps>> {
        &mut self.camera_props_observers
    }

    pub fn calibration_observers(&mut self) -> &mut Observers<Arc<Calibration>> {
        &mut self.calibration_observers
    }

    pub fn spectrum_observers(&mut self) -> &mut Observers<Option<Spectrum>> {
        &mut self.spectrum_observers
    }

    pub fn normalize_observers(&mut self) -> &mut Observers<bool> {
        &mut self.normalize_observers
    }

    pub fn hover_cursor_observers(&mut self) -> &mut Observers<Option<f64>> {
        &mut self.hover_cursor_observers
    }

    // -- camera --

    pub fn camera(&self) -> Option<&FrameGrabber> {
        self.camera.as_ref()
    }

    pub fn camera_id(&self) -> Option<u32> {
        self.camera.as_ref().map(FrameGrabber::id)
    }

    /// Replace the active camera. The previous camera is closed.
    ///
    /// Stored properties are pushed to the new device, then the camera,
    /// calibration and properties observers see the new camera's values and
    /// a frame is requested unless paused. Removing the camera clears the
    /// current frame and with it the spectrum.
    pub fn set_camera(&mut self, camera: Option<FrameGrabber>) {
        let old_id = self.camera_id();
        self.camera = camera;
        let new_id = self.camera_id();

        if let Some(id) = new_id {
            if let Some(props) = self.camera_props_by_id.get(&id).copied() {
                if let Some(camera) = &mut self.camera {
                    camera.set_camera_props(props);
                }
            }
        }

        if old_id != new_id {
            log::info!("Active camera {old_id:?} -> {new_id:?}");
            self.camera_observers.fire(&new_id);
            let calibration = self.calibration();
            self.calibration_observers.fire(&calibration);
            let props = self.camera_props();
            self.camera_props_observers.fire(&props);
        }

        if new_id.is_none() {
            self.clear_current_frame();
        }
        self.trigger_next_frame_if_not_paused();
    }

    pub fn is_camera_paused(&self) -> bool {
        self.camera_paused
    }

    pub fn set_camera_paused(&mut self, paused: bool) {
        if self.camera_paused == paused {
            return;
        }
        self.camera_paused = paused;
        self.camera_paused_observers.fire(&paused);
        self.trigger_next_frame_if_not_paused();
    }

    /// Pick up a finished grab and schedule the next one unless paused.
    /// Returns whether a new frame was taken over.
    pub fn poll_camera(&mut self) -> bool {
        let Some(outcome) = self.camera.as_mut().and_then(FrameGrabber::try_take_frame) else {
            return false;
        };
        let grabbed = self.take_grab_outcome(outcome);
        self.trigger_next_frame_if_not_paused();
        grabbed
    }

    /// Grab one frame and wait for it, regardless of the paused flag. A live
    /// camera keeps streaming afterwards.
    pub fn grab_single_frame(&mut self) -> anyhow::Result<()> {
        let result = self.grab_frame_and_wait();
        self.trigger_next_frame_if_not_paused();
        result
    }

    fn grab_frame_and_wait(&mut self) -> anyhow::Result<()> {
        let Some(camera) = self.camera.as_mut() else {
            anyhow::bail!(SpectrumError::NoCamera);
        };
        // finish a grab that is already on its way
        if let Some(outcome) = camera.wait_frame() {
            self.take_grab_outcome(outcome);
        }

        let buffer = self.spare_frame.take().unwrap_or_default();
        let Some(camera) = self.camera.as_mut() else {
            anyhow::bail!(SpectrumError::NoCamera);
        };
        if let Some(rejected) = camera.request_frame(buffer) {
            self.spare_frame = Some(rejected);
            anyhow::bail!("camera {} does not accept grab requests", camera.id());
        }
        let Some(GrabOutcome { frame, result }) = camera.wait_frame() else {
            anyhow::bail!("camera {} stopped while grabbing", camera.id());
        };
        match result {
            Ok(()) => {
                self.set_current_frame(frame);
                Ok(())
            }
            Err(err) => {
                self.spare_frame = Some(frame);
                Err(err.context("grabbing single frame"))
            }
        }
    }

    fn take_grab_outcome(&mut self, outcome: GrabOutcome) -> bool {
        match outcome.result {
            Ok(()) => {
                self.set_current_frame(outcome.frame);
                true
            }
            Err(err) => {
                log::warn!("Frame grab failed: {err:#}");
                self.spare_frame = Some(outcome.frame);
                false
            }
        }
    }

    fn trigger_next_frame_if_not_paused(&mut self) {
        if !self.camera_paused {
            self.trigger_next_frame();
        }
    }

    fn trigger_next_frame(&mut self) {
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        if camera.is_grab_pending() {
            return;
        }
        let buffer = self.spare_frame.take().unwrap_or_default();
        self.spare_frame = camera.request_frame(buffer);
    }

    pub fn current_frame(&self) -> &Frame {
        &self.current_frame
    }

    /// Take over a freshly grabbed frame and sample it. The previous frame
    /// becomes the buffer for the next grab.
    pub fn set_current_frame(&mut self, frame: Frame) {
        let previous = std::mem::replace(&mut self.current_frame, frame);
        self.spare_frame = Some(previous);
        self.update_sample_line_from_current_frame();
        self.frame_grabbed_observers.fire(&self.current_frame);
    }

    pub fn clear_current_frame(&mut self) {
        self.set_current_frame(Frame::default());
    }

    fn update_sample_line_from_current_frame(&mut self) {
        let line = if self.current_frame.is_empty() {
            None
        } else {
            let center_row = (self.current_frame.rows() as f64 * self.params.sample_row_pos_ratio) as usize;
            Some(SampleLine::from_frame(
                &self.current_frame,
                center_row,
                self.params.sample_rows,
                ChannelReduction::Average,
            ))
        };
        self.set_raw_sample_line(line);
    }

    // -- camera properties --

    pub fn camera_props_for(&self, camera_id: u32) -> Option<CameraProps> {
        self.camera_props_by_id.get(&camera_id).copied()
    }

    /// Stored properties of the active camera, else what the device reports.
    pub fn camera_props(&self) -> Option<CameraProps> {
        let camera = self.camera.as_ref()?;
        self.camera_props_for(camera.id())
            .or_else(|| Some(camera.camera_props()))
    }

    pub fn set_camera_props_for(&mut self, camera_id: u32, props: CameraProps) {
        let old = self.camera_props_by_id.insert(camera_id, props);
        if self.camera_id() != Some(camera_id) || old == Some(props) {
            return;
        }
        if let Some(camera) = &mut self.camera {
            camera.set_camera_props(props);
        }
        self.camera_props_observers.fire(&Some(props));
    }

    pub fn set_camera_props(&mut self, props: CameraProps) {
        if let Some(id) = self.camera_id() {
            self.set_camera_props_for(id, props);
        }
    }

    // -- wavelength calibration --

    pub fn calibration_for(&self, camera_id: u32) -> Option<&Arc<Calibration>> {
        self.calibration_by_id.get(&camera_id)
    }

    /// Calibration of the active camera, the default one if none is stored.
    pub fn calibration(&self) -> Arc<Calibration> {
        self.camera_id()
            .and_then(|id| self.calibration_for(id))
            .unwrap_or(&self.default_calibration)
            .clone()
    }

    /// Store a camera's calibration, `None` to fall back to the default.
    pub fn set_calibration_for(&mut self, camera_id: u32, calibration: Option<Calibration>) {
        let old = match calibration {
            Some(calibration) => self.calibration_by_id.insert(camera_id, Arc::new(calibration)),
            None => self.calibration_by_id.remove(&camera_id),
        };
        if self.camera_id() != Some(camera_id) {
            return;
        }
        let old = old.unwrap_or_else(|| self.default_calibration.clone());
        let new = self.calibration();
        if old == new {
            return;
        }
        log::info!("Camera {camera_id}: wavelength calibration {new}");
        self.recalc_from_raw();
        self.calibration_observers.fire(&new);
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        if let Some(id) = self.camera_id() {
            self.set_calibration_for(id, Some(calibration));
        }
    }

    // -- sensitivity correction --

    pub fn sensitivity_calibration_for(&self, camera_id: u32) -> Option<&Spectrum> {
        self.sensitivity_by_id.get(&camera_id)
    }

    pub fn sensitivity_calibration(&self) -> Option<&Spectrum> {
        self.camera_id().and_then(|id| self.sensitivity_calibration_for(id))
    }

    /// Store a camera's correction factors, `None` resets to no correction.
    pub fn set_sensitivity_calibration_for(&mut self, camera_id: u32, corrections: Option<Spectrum>) {
        let old = match &corrections {
            Some(corrections) => self.sensitivity_by_id.insert(camera_id, corrections.clone()),
            None => self.sensitivity_by_id.remove(&camera_id),
        };
        if self.camera_id() == Some(camera_id) && old != corrections {
            match corrections {
                Some(_) => log::info!("Camera {camera_id}: sensitivity calibration applied"),
                None => log::info!("Camera {camera_id}: sensitivity calibration reset"),
            }
            self.recalc_from_raw();
        }
    }

    pub fn set_sensitivity_calibration(&mut self, corrections: Option<Spectrum>) {
        if let Some(id) = self.camera_id() {
            self.set_sensitivity_calibration_for(id, corrections);
        }
    }

    /// Derive the active camera's sensitivity correction from the current
    /// purified spectrum, assuming the camera looks at `reference` light.
    /// The correction is normalized over the reference's wavelength range.
    pub fn calibrate_sensitivity_with_reference_light(&mut self, reference: &Spectrum) -> Result<()> {
        let camera_id = self.camera_id().ok_or(SpectrumError::NoCamera)?;
        let measured = self.purified_spectrum.as_ref().ok_or(SpectrumError::NoSpectrum)?;
        let corrections = calculations::calc_sensitivity_calibration(
            measured,
            reference,
            reference.calibration().begin_nano_meters(),
            reference.calibration().end_nano_meters(),
        );
        self.set_sensitivity_calibration_for(camera_id, Some(corrections));
        Ok(())
    }

    // -- processing parameters --

    pub fn params(&self) -> ProcessingParams {
        self.params
    }

    pub fn set_sample_row_pos_ratio(&mut self, ratio: f64) {
        let ratio = ratio.clamp(0.0, 1.0);
        if self.params.sample_row_pos_ratio != ratio {
            self.params.sample_row_pos_ratio = ratio;
            self.resample_current_frame();
        }
    }

    pub fn set_sample_rows(&mut self, rows: usize) {
        let rows = rows.max(1);
        if self.params.sample_rows != rows {
            self.params.sample_rows = rows;
            self.resample_current_frame();
        }
    }

    pub fn set_time_averaging_factor(&mut self, factor: f64) {
        let factor = factor.clamp(0.0, 1.0);
        if self.params.time_averaging_factor != factor {
            self.params.time_averaging_factor = factor;
            self.recalc_from_raw();
        }
    }

    pub fn set_peak_hold(&mut self, peak_hold: bool) {
        if self.params.peak_hold != peak_hold {
            self.params.peak_hold = peak_hold;
            self.recalc_from_raw();
        }
    }

    pub fn set_smooth_index_steps(&mut self, sigma: f64) {
        if !sigma.is_finite() {
            log::warn!("Ignoring smoothing sigma {sigma}");
            return;
        }
        let sigma = sigma.max(0.0);
        if self.params.smooth_index_steps != sigma {
            self.params.smooth_index_steps = sigma;
            self.recalc_from_raw();
        }
    }

    pub fn set_normalize_sample_values(&mut self, normalize: bool) {
        if self.params.normalize_sample_values != normalize {
            self.params.normalize_sample_values = normalize;
            self.recalc_from_raw();
            self.normalize_observers.fire(&normalize);
        }
    }

    fn resample_current_frame(&mut self) {
        if !self.current_frame.is_empty() {
            self.update_sample_line_from_current_frame();
        }
    }

    // -- pipeline --

    pub fn raw_spectrum(&self) -> Option<&Spectrum> {
        self.raw_spectrum.as_ref()
    }

    pub fn purified_spectrum(&self) -> Option<&Spectrum> {
        self.purified_spectrum.as_ref()
    }

    /// The fully processed spectrum.
    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    /// Run a new raw sample line through the pipeline and notify the
    /// spectrum observers. `None` drops all stages ("no data").
    pub fn set_raw_sample_line(&mut self, line: Option<SampleLine>) {
        let Some(line) = line else {
            if self.spectrum.is_some() {
                self.raw_spectrum = None;
                self.purified_spectrum = None;
                self.spectrum = None;
                self.spectrum_observers.fire(&None);
            }
            return;
        };

        let calibration = self.calibration();
        let params = self.params;

        let purified_line = calculations::time_average(
            &line,
            self.purified_spectrum.as_ref().map(Spectrum::sample_line),
            params.time_averaging_factor,
            params.peak_hold,
        );
        let raw = Spectrum::new(line, calibration.clone());
        let purified = Spectrum::new(purified_line, calibration.clone());

        let corrected = match self.sensitivity_calibration() {
            Some(corrections) => calculations::apply_sensitivity_calibration(&purified, corrections),
            None => purified.clone(),
        };
        let smoothed = calculations::gaussian_smooth(corrected.sample_line(), params.smooth_index_steps);
        let processed = if params.normalize_sample_values {
            calculations::normalize(&smoothed)
        } else {
            smoothed
        };

        self.raw_spectrum = Some(raw);
        self.purified_spectrum = Some(purified);
        self.spectrum = Some(Spectrum::new(processed, calibration));
        self.spectrum_observers.fire(&self.spectrum);
    }

    /// Show a sample line that did not come from the camera, e.g. a loaded
    /// file. The camera is paused, a grab in flight is discarded and the
    /// current frame is dropped so nothing resamples over the line.
    pub fn load_raw_sample_line(&mut self, line: SampleLine) {
        self.set_camera_paused(true);
        if let Some(camera) = self.camera.as_mut() {
            if let Some(outcome) = camera.wait_frame() {
                self.spare_frame = Some(outcome.frame);
            }
        }
        self.clear_current_frame();
        self.set_raw_sample_line(Some(line));
    }

    fn recalc_from_raw(&mut self) {
        if let Some(raw) = &self.raw_spectrum {
            let line = raw.sample_line().clone();
            self.set_raw_sample_line(Some(line));
        }
    }

    /// Peaks and dips of the processed spectrum.
    pub fn extrema(&self) -> Option<Extrema> {
        let spectrum = self.spectrum.as_ref()?;
        let length_ratio = spectrum.len() as f64 / EXTREMA_REFERENCE_LENGTH;
        Some(calculations::find_local_extrema(
            spectrum.sample_line(),
            0.6 * length_ratio,
            2.0 * length_ratio,
            MAX_EXTREMA,
            MAX_EXTREMA,
        ))
    }

    // -- view state --

    pub fn hover_cursor_nano_meters(&self) -> Option<f64> {
        self.hover_cursor_nano_meters
    }

    pub fn set_hover_cursor_nano_meters(&mut self, nano_meters: Option<f64>) {
        if self.hover_cursor_nano_meters != nano_meters {
            self.hover_cursor_nano_meters = nano_meters;
            self.hover_cursor_observers.fire(&nano_meters);
        }
    }

    pub fn last_used_directory(&self, content_name: &str) -> Option<&Path> {
        self.last_used_directories.get(content_name).map(PathBuf::as_path)
    }

    pub fn set_last_used_directory(&mut self, content_name: &str, directory: Option<PathBuf>) {
        match directory {
            Some(directory) => {
                self.last_used_directories.insert(content_name.to_string(), directory);
            }
            None => {
                self.last_used_directories.remove(content_name);
            }
        }
    }

    // -- settings --

    /// Snapshot of everything worth persisting.
    pub fn create_settings(&self) -> Settings {
        let mut settings = Settings {
            selected_camera_id: self.camera_id(),
            processing: Some(self.params),
            last_used_directories: self.last_used_directories.clone(),
            ..Settings::default()
        };
        for (&id, props) in &self.camera_props_by_id {
            settings.camera_mut(id).properties = Some(*props);
        }
        for (&id, calibration) in &self.calibration_by_id {
            settings.camera_mut(id).calibration = Some(CalibrationSettings::from(calibration.as_ref()));
        }
        for (&id, corrections) in &self.sensitivity_by_id {
            settings.camera_mut(id).sensitivity_calibration = Some(SensitivityCalibrationSettings::from(corrections));
        }
        settings
    }

    /// Load a snapshot. Every calibration in it is validated before anything
    /// is applied, so a broken snapshot leaves the model untouched.
    ///
    /// The selected camera is not opened here; that is up to the caller.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<()> {
        let mut cameras = Vec::with_capacity(settings.cameras.len());
        for camera in &settings.cameras {
            let calibration = camera
                .calibration
                .as_ref()
                .map(Calibration::try_from)
                .transpose()?;
            let sensitivity = camera
                .sensitivity_calibration
                .as_ref()
                .map(Spectrum::try_from)
                .transpose()?;
            cameras.push((camera.id, camera.properties, calibration, sensitivity));
        }

        for (id, props, calibration, sensitivity) in cameras {
            if let Some(props) = props {
                self.set_camera_props_for(id, props);
            }
            if calibration.is_some() {
                self.set_calibration_for(id, calibration);
            }
            if sensitivity.is_some() {
                self.set_sensitivity_calibration_for(id, sensitivity);
            }
        }

        if let Some(params) = settings.processing {
            self.set_sample_row_pos_ratio(params.sample_row_pos_ratio);
            self.set_sample_rows(params.sample_rows);
            self.set_time_averaging_factor(params.time_averaging_factor);
            self.set_peak_hold(params.peak_hold);
            self.set_smooth_index_steps(params.smooth_index_steps);
            self.set_normalize_sample_values(params.normalize_sample_values);
        }

        self.last_used_directories
            .extend(settings.last_used_directories.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::camera::SyntheticCamera;
    use crate::camera::synthetic::Light;
    use crate::data::calibration::CalibrationPoint;

    fn assert_close(expected: f64, actual: f64) {
        assert!((expected - actual).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    fn model_with_camera(id: u32) -> Model {
        let mut model = Model::new();
        model.set_camera(Some(grabber(id)));
        model
    }

    fn grabber(id: u32) -> FrameGrabber {
        let camera = SyntheticCamera::new(id, Light::FluorescentLamp).without_delay();
        FrameGrabber::spawn(Box::new(camera)).unwrap()
    }

    fn line(values: &[f64]) -> SampleLine {
        SampleLine::new(values.to_vec())
    }

    /// Collects every value a spectrum observer receives.
    fn record_spectra(model: &mut Model) -> Rc<RefCell<Vec<Option<Spectrum>>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        model.spectrum_observers().add(move |spectrum: &Option<Spectrum>| {
            sink.borrow_mut().push(spectrum.clone());
            Ok(())
        });
        seen
    }

    fn calibration(a: (f64, f64), b: (f64, f64)) -> Calibration {
        Calibration::new(vec![CalibrationPoint::new(a.0, a.1), CalibrationPoint::new(b.0, b.1)]).unwrap()
    }

    #[test]
    fn raw_line_flows_through_pipeline() {
        let mut model = Model::new();
        let seen = record_spectra(&mut model);

        model.set_raw_sample_line(Some(line(&[0.1, 0.4, 0.2])));

        let spectrum = model.spectrum().unwrap();
        assert_eq!(&[0.1, 0.4, 0.2], spectrum.sample_line().values());
        assert_eq!(Calibration::default(), **spectrum.calibration());
        assert_eq!(1, seen.borrow().len());
    }

    #[test]
    fn time_averaging_blends_with_previous_purified() {
        let mut model = Model::new();
        model.set_time_averaging_factor(0.5);
        model.set_raw_sample_line(Some(line(&[0.0, 1.0])));
        model.set_raw_sample_line(Some(line(&[1.0, 0.0])));

        let purified = model.purified_spectrum().unwrap().sample_line();
        assert_close(0.5, purified.value(0));
        assert_close(0.5, purified.value(1));
        assert_eq!(&[1.0, 0.0], model.raw_spectrum().unwrap().sample_line().values());
    }

    #[test]
    fn normalize_scales_processed_only() {
        let mut model = Model::new();
        model.set_raw_sample_line(Some(line(&[0.1, 0.5, 0.25])));
        model.set_normalize_sample_values(true);

        assert_eq!(&[0.2, 1.0, 0.5], model.spectrum().unwrap().sample_line().values());
        assert_eq!(&[0.1, 0.5, 0.25], model.purified_spectrum().unwrap().sample_line().values());
    }

    #[test]
    fn none_clears_once() {
        let mut model = Model::new();
        let seen = record_spectra(&mut model);

        model.set_raw_sample_line(None);
        assert!(seen.borrow().is_empty());

        model.set_raw_sample_line(Some(line(&[0.3, 0.3])));
        model.set_raw_sample_line(None);
        model.set_raw_sample_line(None);

        assert_eq!(2, seen.borrow().len());
        assert_eq!(None, seen.borrow()[1]);
        assert!(model.raw_spectrum().is_none());
        assert!(model.purified_spectrum().is_none());
    }

    #[test]
    fn non_finite_smoothing_is_ignored() {
        let mut model = Model::new();
        model.set_raw_sample_line(Some(line(&[0.1, 0.9, 0.1])));
        model.set_smooth_index_steps(f64::INFINITY);
        model.set_smooth_index_steps(f64::NAN);
        assert_eq!(0.0, model.params().smooth_index_steps);
        assert_eq!(&[0.1, 0.9, 0.1], model.spectrum().unwrap().sample_line().values());
    }

    #[test]
    fn equal_values_do_not_notify() {
        let mut model = Model::new();
        model.set_raw_sample_line(Some(line(&[0.3, 0.6])));
        let seen = record_spectra(&mut model);

        model.set_peak_hold(false);
        model.set_smooth_index_steps(0.0);
        model.set_time_averaging_factor(0.0);
        model.set_normalize_sample_values(false);
        assert!(seen.borrow().is_empty());

        model.set_smooth_index_steps(1.5);
        assert_eq!(1, seen.borrow().len());
    }

    #[test]
    fn calibration_change_recomputes_from_raw() {
        let mut model = model_with_camera(0);
        model.set_raw_sample_line(Some(line(&[0.2, 0.4, 0.6])));
        let seen = record_spectra(&mut model);
        let calibrations = Rc::new(RefCell::new(0));
        let counter = calibrations.clone();
        model.calibration_observers().add(move |_: &Arc<Calibration>| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        let new = calibration((0.0, 400.0), (1.0, 800.0));
        model.set_calibration(new.clone());
        model.set_calibration(new.clone());

        assert_eq!(1, seen.borrow().len());
        assert_eq!(1, *calibrations.borrow());
        let spectrum = model.spectrum().unwrap();
        assert_close(600.0, spectrum.nano_meters_at_index(1));
        assert_eq!(&[0.2, 0.4, 0.6], model.raw_spectrum().unwrap().sample_line().values());
    }

    #[test]
    fn inactive_camera_changes_are_silent() {
        let mut model = model_with_camera(0);
        model.set_raw_sample_line(Some(line(&[0.2, 0.4])));
        let seen = record_spectra(&mut model);

        model.set_calibration_for(7, Some(calibration((0.0, 300.0), (1.0, 900.0))));
        model.set_sensitivity_calibration_for(
            7,
            Some(Spectrum::new(line(&[0.5, 0.5]), Arc::new(Calibration::default()))),
        );
        model.set_camera_props_for(7, CameraProps::default().with_exposure(1.0));

        assert!(seen.borrow().is_empty());
        assert!(model.calibration_for(7).is_some());
        assert_eq!(Calibration::default(), *model.calibration());
    }

    #[test]
    fn sensitivity_correction_applied_and_reset() {
        let mut model = model_with_camera(0);
        model.set_raw_sample_line(Some(line(&[0.4, 0.4, 0.4])));

        let corrections = Spectrum::new(line(&[0.5, 0.5, 0.5]), model.calibration());
        model.set_sensitivity_calibration(Some(corrections));
        assert_close(0.2, model.spectrum().unwrap().value_at_index(1));

        model.set_sensitivity_calibration(None);
        assert_close(0.4, model.spectrum().unwrap().value_at_index(1));
        assert!(model.sensitivity_calibration().is_none());
    }

    #[test]
    fn reference_light_calibration_needs_data() {
        let mut model = Model::new();
        let reference = Spectrum::new(line(&[1.0, 1.0]), Arc::new(Calibration::default()));
        assert_eq!(
            Err(SpectrumError::NoCamera),
            model.calibrate_sensitivity_with_reference_light(&reference)
        );

        let mut model = model_with_camera(0);
        assert_eq!(
            Err(SpectrumError::NoSpectrum),
            model.calibrate_sensitivity_with_reference_light(&reference)
        );
    }

    #[test]
    fn reference_light_calibration_flattens_response() {
        let mut model = model_with_camera(0);
        model.set_raw_sample_line(Some(line(&[0.2, 0.4, 0.8, 0.4, 0.2])));
        let reference = Spectrum::new(line(&[1.0, 1.0]), model.calibration());

        model.calibrate_sensitivity_with_reference_light(&reference).unwrap();

        let corrections = model.sensitivity_calibration().unwrap();
        assert_eq!(5, corrections.len());
        let max = corrections.sample_line().max_value();
        assert_close(1.0, max);
        assert!(model.spectrum().is_some());
    }

    #[test]
    fn camera_switch_notifies_and_pushes_props() {
        let mut model = Model::new();
        let props = CameraProps::default().with_frame_size(64, 16);
        model.set_camera_props_for(1, props);

        let cameras = Rc::new(RefCell::new(Vec::new()));
        let sink = cameras.clone();
        model.camera_observers().add(move |id: &Option<u32>| {
            sink.borrow_mut().push(*id);
            Ok(())
        });
        let seen_props = Rc::new(RefCell::new(Vec::new()));
        let sink = seen_props.clone();
        model.camera_props_observers().add(move |props: &Option<CameraProps>| {
            sink.borrow_mut().push(*props);
            Ok(())
        });
        let own_calibration = calibration((0.1, 410.0), (0.9, 690.0));
        model.set_calibration_for(1, Some(own_calibration.clone()));
        let calibrations = Rc::new(RefCell::new(Vec::new()));
        let sink = calibrations.clone();
        model.calibration_observers().add(move |calibration: &Arc<Calibration>| {
            sink.borrow_mut().push(calibration.as_ref().clone());
            Ok(())
        });

        model.set_camera(Some(grabber(1)));
        assert_eq!(vec![Some(1)], *cameras.borrow());
        assert_eq!(vec![Some(props)], *seen_props.borrow());
        assert_eq!(vec![own_calibration.clone()], *calibrations.borrow());
        assert_eq!(Some(props), model.camera().map(FrameGrabber::camera_props));

        model.set_camera(None);
        assert_eq!(vec![Some(1), None], *cameras.borrow());
        assert_eq!(vec![own_calibration, Calibration::default()], *calibrations.borrow());
        assert!(model.camera_props().is_none());
    }

    #[test]
    fn single_frame_keeps_live_stream_running() {
        let mut model = Model::new();
        model.set_camera_props_for(0, CameraProps::default().with_frame_size(64, 16));
        model.set_camera(Some(grabber(0)));
        model.set_camera_paused(false);

        model.grab_single_frame().unwrap();
        assert!(model.camera().unwrap().is_grab_pending());

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        let mut frames = 0;
        while frames < 2 && std::time::Instant::now() < deadline {
            if model.poll_camera() {
                frames += 1;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(2, frames);
    }

    #[test]
    fn loaded_line_survives_camera_and_resampling() {
        let mut model = Model::new();
        model.set_camera_props_for(0, CameraProps::default().with_frame_size(64, 16));
        model.set_camera(Some(grabber(0)));
        model.grab_single_frame().unwrap();
        // a grab in flight when the line is loaded
        model.set_camera_paused(false);
        assert!(model.camera().unwrap().is_grab_pending());

        model.load_raw_sample_line(line(&[0.1; 10]));

        assert!(model.is_camera_paused());
        assert!(model.current_frame().is_empty());
        assert!(!model.camera().unwrap().is_grab_pending());
        assert!(!model.poll_camera());

        model.set_sample_rows(3);
        model.set_sample_row_pos_ratio(0.2);
        assert_eq!(10, model.raw_spectrum().unwrap().len());
        assert_eq!(10, model.spectrum().unwrap().len());
    }

    #[test]
    fn frame_observers_fire_after_the_spectrum_update() {
        let mut model = Model::new();
        model.set_camera_props_for(0, CameraProps::default().with_frame_size(48, 16));
        model.set_camera(Some(grabber(0)));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        model.spectrum_observers().add(move |spectrum: &Option<Spectrum>| {
            sink.borrow_mut().push(format!("spectrum {}", spectrum.as_ref().map_or(0, Spectrum::len)));
            Ok(())
        });
        let sink = events.clone();
        model.frame_grabbed_observers().add(move |frame: &Frame| {
            sink.borrow_mut().push(format!("frame {}", frame.cols()));
            Ok(())
        });
        model.grab_single_frame().unwrap();

        assert_eq!(vec!["spectrum 48".to_string(), "frame 48".to_string()], *events.borrow());
    }

    #[test]
    fn single_frame_produces_spectrum() {
        let mut model = Model::new();
        model.set_camera_props_for(0, CameraProps::default().with_frame_size(128, 32));
        model.set_camera(Some(grabber(0)));

        model.grab_single_frame().unwrap();

        assert_eq!((32, 128), (model.current_frame().rows(), model.current_frame().cols()));
        assert_eq!(128, model.spectrum().unwrap().len());

        model.clear_current_frame();
        assert!(model.spectrum().is_none());
    }

    #[test]
    fn sample_row_change_resamples_frame() {
        let mut model = Model::new();
        model.set_camera_props_for(0, CameraProps::default().with_frame_size(64, 40));
        model.set_camera(Some(grabber(0)));
        model.grab_single_frame().unwrap();
        let centered = model.raw_spectrum().unwrap().sample_line().max_value();

        model.set_sample_row_pos_ratio(0.0);
        let edge = model.raw_spectrum().unwrap().sample_line().max_value();
        assert!(edge < centered, "edge {edge} vs center {centered}");
    }

    #[test]
    fn paused_by_default() {
        let mut model = model_with_camera(0);
        assert!(model.is_camera_paused());
        assert!(!model.camera().unwrap().is_grab_pending());

        model.set_camera_paused(false);
        assert!(model.camera().unwrap().is_grab_pending());
    }

    #[test]
    fn extrema_of_processed_spectrum() {
        let mut model = Model::new();
        assert!(model.extrema().is_none());

        let mut values = vec![0.1; 1280];
        values[640] = 0.9;
        model.set_raw_sample_line(Some(line(&values)));

        let extrema = model.extrema().unwrap();
        assert_eq!(640, extrema.maxima[0].index);
    }

    #[test]
    fn hover_cursor_and_directories() {
        let mut model = Model::new();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        model.hover_cursor_observers().add(move |_: &Option<f64>| {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        model.set_hover_cursor_nano_meters(Some(500.0));
        model.set_hover_cursor_nano_meters(Some(500.0));
        model.set_hover_cursor_nano_meters(None);
        assert_eq!(2, *seen.borrow());

        model.set_last_used_directory("Spectrum Data", Some(PathBuf::from("/data")));
        assert_eq!(Some(Path::new("/data")), model.last_used_directory("Spectrum Data"));
        model.set_last_used_directory("Spectrum Data", None);
        assert!(model.last_used_directory("Spectrum Data").is_none());
    }

    #[test]
    fn settings_round_trip() {
        let mut model = Model::new();
        model.set_calibration_for(2, Some(calibration((0.1, 420.0), (0.9, 680.0))));
        model.set_camera_props_for(2, CameraProps::default().with_exposure(-1.0));
        model.set_sensitivity_calibration_for(
            3,
            Some(Spectrum::new(line(&[0.5, 1.0]), Arc::new(calibration((0.0, 400.0), (1.0, 700.0))))),
        );
        model.set_smooth_index_steps(2.0);
        model.set_last_used_directory("Spectrum Data", Some(PathBuf::from("/data")));

        let settings = model.create_settings();

        let mut restored = Model::new();
        restored.apply_settings(&settings).unwrap();
        assert_eq!(settings, restored.create_settings());
        assert_eq!(2.0, restored.params().smooth_index_steps);
    }

    #[test]
    fn invalid_settings_change_nothing() {
        let mut settings = Settings::default();
        settings.camera_mut(1).properties = Some(CameraProps::default().with_exposure(2.0));
        settings.camera_mut(2).calibration = Some(CalibrationSettings {
            wave_length_points: vec![CalibrationPoint::new(0.5, 500.0)],
        });

        let mut model = Model::new();
        assert!(model.apply_settings(&settings).is_err());
        assert!(model.camera_props_for(1).is_none());
    }
}
