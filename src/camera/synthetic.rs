use std::time::Duration;

use anyhow::Result;

use super::{CameraProps, Frame, FrameSource};
use crate::data::calibration::Calibration;
use crate::data::known::{self, FLUORESCENT_LAMP};

/// Time a synthetic grab blocks, like a 30 fps webcam.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Relative strength of the fluorescent lamp lines, in line table order.
const FLUORESCENT_AMPLITUDES: [f64; 10] = [0.35, 0.8, 0.3, 0.45, 1.0, 0.55, 0.9, 0.25, 0.15, 0.1];

// ---------------------------------------------------------------------------
// Light – what the synthetic camera is looking at
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    FluorescentLamp,
    Incandescent,
}

impl Light {
    pub const ALL: [Light; 2] = [Light::FluorescentLamp, Light::Incandescent];

    pub fn name(self) -> &'static str {
        match self {
            Light::FluorescentLamp => "Synthetic fluorescent lamp",
            Light::Incandescent => "Synthetic incandescent bulb",
        }
    }

    /// Emitted power at a wavelength, roughly within `[0, 1]`.
    fn emission(self, nano_meters: f64) -> f64 {
        match self {
            Light::FluorescentLamp => {
                let lines: f64 = FLUORESCENT_LAMP
                    .wave_lengths
                    .iter()
                    .zip(FLUORESCENT_AMPLITUDES)
                    .map(|(line, amplitude)| gaussian(nano_meters, line.nano_meters, 1.8, amplitude))
                    .sum();
                lines + gaussian(nano_meters, 580.0, 60.0, 0.04)
            }
            Light::Incandescent => 0.0,
        }
    }
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Silicon sensor behind a Bayer filter: blue, green, red response.
fn channel_response(nano_meters: f64) -> [f64; 3] {
    [
        gaussian(nano_meters, 455.0, 35.0, 0.85),
        gaussian(nano_meters, 540.0, 40.0, 1.0),
        gaussian(nano_meters, 610.0, 45.0, 0.9),
    ]
}

// ---------------------------------------------------------------------------
// SimpleRng – deterministic sensor noise
// ---------------------------------------------------------------------------

/// Minimal deterministic PRNG (xoshiro256**)
pub(crate) struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    pub(crate) fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// SyntheticCamera
// ---------------------------------------------------------------------------

/// Frame source rendering the image a webcam behind a diffraction grating
/// would see: a horizontal band whose brightness along the columns follows
/// the light's spectrum, with sensor noise and saturation.
///
/// Columns map to wavelengths through the default [`Calibration`], so an
/// uncalibrated model already shows the lines at their true position.
pub struct SyntheticCamera {
    id: u32,
    light: Light,
    props: CameraProps,
    rng: SimpleRng,
    frame_interval: Duration,
    /// Per-column BGR intensity before exposure, rebuilt on width changes.
    column_profile: Vec<[f64; 3]>,
}

impl SyntheticCamera {
    pub fn new(id: u32, light: Light) -> Self {
        Self {
            id,
            light,
            props: CameraProps::default(),
            rng: SimpleRng::new(42 + id as u64),
            frame_interval: FRAME_INTERVAL,
            column_profile: Vec::new(),
        }
    }

    /// Grab without the artificial device latency; for tests and batch use.
    pub fn without_delay(mut self) -> Self {
        self.frame_interval = Duration::ZERO;
        self
    }

    fn rebuild_column_profile(&mut self) {
        let cols = self.props.frame_width as usize;
        let calibration = Calibration::default();
        let incandescent = known::black_body_spectrum(
            cols.max(2),
            2800.0,
            calibration.begin_nano_meters(),
            calibration.end_nano_meters(),
        )
        .ok();

        self.column_profile = (0..cols)
            .map(|col| {
                let nm = calibration.index_to_nano_meters(cols, col);
                let power = match (&incandescent, self.light) {
                    (Some(sp), Light::Incandescent) => 0.9 * sp.value_at_index(col),
                    _ => self.light.emission(nm),
                };
                channel_response(nm).map(|response| power * response)
            })
            .collect();
    }
}

impl FrameSource for SyntheticCamera {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        self.light.name()
    }

    fn grab_next_frame(&mut self, target: &mut Frame) -> Result<()> {
        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }

        let rows = self.props.frame_height as usize;
        let cols = self.props.frame_width as usize;
        if self.column_profile.len() != cols {
            self.rebuild_column_profile();
        }
        target.reshape(rows, cols, 3);

        let gain = 2f64.powf(self.props.exposure);
        let band_center = rows as f64 / 2.0;
        let band_sigma = (rows as f64 / 10.0).max(1.0);

        for row in 0..rows {
            let band = gaussian(row as f64, band_center, band_sigma, 1.0);
            for col in 0..cols {
                let profile = self.column_profile[col];
                let pixel = target.get_mut(row, col);
                for (channel, &intensity) in pixel.iter_mut().zip(profile.iter()) {
                    let value = 255.0 * gain * band * intensity + self.rng.gauss(2.0, 1.5);
                    *channel = value.round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        Ok(())
    }

    fn camera_props(&self) -> CameraProps {
        self.props
    }

    fn set_camera_props(&mut self, props: &CameraProps) {
        if self.props != *props {
            log::debug!("Camera {}: properties {:?}", self.id, props);
            self.props = *props;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_line::{ChannelReduction, SampleLine};

    fn small_camera(light: Light) -> SyntheticCamera {
        let mut camera = SyntheticCamera::new(0, light).without_delay();
        camera.set_camera_props(&CameraProps::default().with_frame_size(320, 60));
        camera
    }

    #[test]
    fn renders_requested_frame_size() {
        let mut camera = small_camera(Light::FluorescentLamp);
        let mut frame = Frame::default();
        camera.grab_next_frame(&mut frame).unwrap();
        assert_eq!((60, 320, 3), (frame.rows(), frame.cols(), frame.channels()));
    }

    #[test]
    fn brightest_column_near_mercury_green() {
        let mut camera = small_camera(Light::FluorescentLamp);
        let mut frame = Frame::default();
        camera.grab_next_frame(&mut frame).unwrap();

        let line = SampleLine::from_frame(&frame, 30, 5, ChannelReduction::Average);
        let (peak, _) = line
            .values()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        let nm = Calibration::default().index_to_nano_meters(320, peak);
        assert!((nm - 546.1).abs() < 4.0, "peak at {nm} nm");
    }

    #[test]
    fn over_exposure_saturates() {
        let mut camera = small_camera(Light::FluorescentLamp);
        camera.set_camera_props(&camera.camera_props().with_exposure(4.0));
        let mut frame = Frame::default();
        camera.grab_next_frame(&mut frame).unwrap();
        let line = SampleLine::from_frame(&frame, 30, 3, ChannelReduction::Max);
        assert!((0..line.len()).any(|i| line.is_over_exposed(i)));
    }

    #[test]
    fn noise_is_deterministic() {
        let mut a = SimpleRng::new(7);
        let mut b = SimpleRng::new(7);
        for _ in 0..10 {
            assert_eq!(a.gauss(0.0, 1.0), b.gauss(0.0, 1.0));
        }
    }
}
