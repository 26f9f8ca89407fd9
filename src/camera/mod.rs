/// Camera collaborators: pixel buffers, device properties, frame sources and
/// the worker thread that grabs frames off the owner thread.
///
/// ```text
///   ┌──────────────┐  Grab(Frame)   ┌──────────────┐
///   │ FrameGrabber  │ ─────────────► │ worker thread │  FrameSource::grab_next_frame
///   │ (owner side)  │ ◄───────────── │               │  (blocking)
///   └──────────────┘  Grabbed(Frame) └──────────────┘
/// ```
pub mod grabber;
pub mod synthetic;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub use grabber::FrameGrabber;
pub use synthetic::SyntheticCamera;

// ---------------------------------------------------------------------------
// Frame – reusable pixel buffer
// ---------------------------------------------------------------------------

/// Row-major `rows × cols × channels` byte buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    rows: usize,
    cols: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(rows: usize, cols: usize, channels: usize) -> Self {
        Self {
            rows,
            cols,
            channels,
            data: vec![0; rows * cols * channels],
        }
    }

    pub fn from_bytes(rows: usize, cols: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != rows * cols * channels {
            bail!(
                "{rows}×{cols}×{channels} frame needs {} bytes, got {}",
                rows * cols * channels,
                data.len()
            );
        }
        Ok(Self {
            rows,
            cols,
            channels,
            data,
        })
    }

    /// Change the dimensions, keeping the allocation where possible.
    pub fn reshape(&mut self, rows: usize, cols: usize, channels: usize) {
        self.rows = rows;
        self.cols = cols;
        self.channels = channels;
        self.data.resize(rows * cols * channels, 0);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> &[u8] {
        let start = (row * self.cols + col) * self.channels;
        &self.data[start..start + self.channels]
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut [u8] {
        let start = (row * self.cols + col) * self.channels;
        &mut self.data[start..start + self.channels]
    }
}

// ---------------------------------------------------------------------------
// CameraProps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraProps {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Exposure in stops, 0.0 is the device default.
    pub exposure: f64,
}

impl Default for CameraProps {
    fn default() -> Self {
        Self {
            frame_width: 1280,
            frame_height: 720,
            exposure: 0.0,
        }
    }
}

impl CameraProps {
    pub fn with_exposure(self, exposure: f64) -> Self {
        Self { exposure, ..self }
    }

    pub fn with_frame_size(self, frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSource – the device contract
// ---------------------------------------------------------------------------

/// A camera device. `grab_next_frame` may block on the hardware and is only
/// ever called from the grabber's worker thread.
pub trait FrameSource: Send {
    fn id(&self) -> u32;

    fn name(&self) -> &str;

    /// Fill `target` with the next frame, reshaping it as needed.
    fn grab_next_frame(&mut self, target: &mut Frame) -> Result<()>;

    /// Properties as currently set on the device.
    fn camera_props(&self) -> CameraProps;

    fn set_camera_props(&mut self, props: &CameraProps);
}

/// Cameras that can be opened with [`open`].
pub fn available_cameras() -> Vec<(u32, &'static str)> {
    synthetic::Light::ALL
        .iter()
        .enumerate()
        .map(|(id, light)| (id as u32, light.name()))
        .collect()
}

/// Open the camera with the given id.
pub fn open(id: u32) -> Result<Box<dyn FrameSource>> {
    let Some(light) = synthetic::Light::ALL.get(id as usize) else {
        bail!("no camera with id {id}");
    };
    log::info!("Opened camera {id} ({})", light.name());
    Ok(Box::new(SyntheticCamera::new(id, *light)))
}

/// Open a camera and start its grabber thread.
pub fn open_grabber(id: u32) -> Result<FrameGrabber> {
    FrameGrabber::spawn(open(id)?)
}
