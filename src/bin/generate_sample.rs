//! Headless capture: average a few frames of a synthetic camera through the
//! processing pipeline and write the spectrum as CSV.
//!
//! ```text
//! generate_sample [CAMERA_ID] [FRAMES] [OUTPUT]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rusty_prism::camera;
use rusty_prism::data::files;
use rusty_prism::state::Model;

const DEFAULT_FRAMES: usize = 20;
const DEFAULT_OUTPUT: &str = "sample_spectrum.csv";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let camera_id: u32 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid camera id {arg:?}"))?,
        None => 0,
    };
    let frames: usize = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid frame count {arg:?}"))?,
        None => DEFAULT_FRAMES,
    };
    let output = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));
    if frames == 0 {
        bail!("need at least one frame");
    }

    let mut model = Model::new();
    model.set_time_averaging_factor(0.8);
    model.set_smooth_index_steps(1.0);
    model.set_camera(Some(camera::open_grabber(camera_id)?));

    for frame in 0..frames {
        model
            .grab_single_frame()
            .with_context(|| format!("grabbing frame {frame}"))?;
    }

    let Some(raw) = model.purified_spectrum() else {
        bail!("camera {camera_id} delivered no spectrum");
    };
    files::write_csv(raw, model.spectrum(), &output)?;

    if let (Some(spectrum), Some(extrema)) = (model.spectrum(), model.extrema()) {
        for peak in extrema.maxima.iter().take(5) {
            println!(
                "peak {:7.1} nm  level {:5.1} %",
                spectrum.nano_meters_at_index(peak.index),
                peak.level
            );
        }
    }
    println!("Wrote {frames} averaged frames of camera {camera_id} to {}", output.display());

    Ok(())
}
