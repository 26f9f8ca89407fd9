use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use super::{CameraProps, Frame, FrameSource};

enum Command {
    Grab(Frame),
    SetProps(CameraProps),
}

/// A finished grab. The buffer comes back even if grabbing failed so it can
/// be reused for the next request.
pub struct GrabOutcome {
    pub frame: Frame,
    pub result: Result<()>,
}

/// Owner-side handle of a camera running on its own worker thread.
///
/// Frame buffers move to the worker with each request and come back with the
/// outcome; nothing is shared between the threads. At most one grab is in
/// flight at a time.
pub struct FrameGrabber {
    id: u32,
    name: String,
    props: CameraProps,
    commands: Option<Sender<Command>>,
    outcomes: Receiver<GrabOutcome>,
    worker: Option<JoinHandle<()>>,
    pending: bool,
}

impl FrameGrabber {
    /// Move `source` onto a new worker thread.
    pub fn spawn(source: Box<dyn FrameSource>) -> Result<Self> {
        let id = source.id();
        let name = source.name().to_string();
        let props = source.camera_props();

        let (command_tx, command_rx) = channel();
        let (outcome_tx, outcome_rx) = channel();
        let worker = thread::Builder::new()
            .name(format!("camera-{id}"))
            .spawn(move || run_worker(source, command_rx, outcome_tx))
            .with_context(|| format!("spawning worker for camera {id}"))?;

        Ok(Self {
            id,
            name,
            props,
            commands: Some(command_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
            pending: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties last pushed to the device.
    pub fn camera_props(&self) -> CameraProps {
        self.props
    }

    pub fn set_camera_props(&mut self, props: CameraProps) {
        self.props = props;
        self.send(Command::SetProps(props));
    }

    pub fn is_grab_pending(&self) -> bool {
        self.pending
    }

    /// Ask the worker to grab the next frame into `buffer`. Returns the
    /// buffer back if a grab is already in flight or the worker is gone.
    pub fn request_frame(&mut self, buffer: Frame) -> Option<Frame> {
        if self.pending {
            return Some(buffer);
        }
        let Some(commands) = &self.commands else {
            return Some(buffer);
        };
        match commands.send(Command::Grab(buffer)) {
            Ok(()) => {
                self.pending = true;
                None
            }
            Err(err) => {
                log::error!("Camera {} worker is gone", self.id);
                match err.0 {
                    Command::Grab(buffer) => Some(buffer),
                    Command::SetProps(_) => None,
                }
            }
        }
    }

    /// Outcome of the pending grab if it has finished.
    pub fn try_take_frame(&mut self) -> Option<GrabOutcome> {
        match self.outcomes.try_recv() {
            Ok(outcome) => {
                self.pending = false;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = false;
                None
            }
        }
    }

    /// Wait for the pending grab to finish.
    pub fn wait_frame(&mut self) -> Option<GrabOutcome> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.outcomes.recv().ok()
    }

    fn send(&self, command: Command) {
        if let Some(commands) = &self.commands {
            if commands.send(command).is_err() {
                log::error!("Camera {} worker is gone", self.id);
            }
        }
    }
}

impl Drop for FrameGrabber {
    fn drop(&mut self) {
        // closing the command channel ends the worker after its current grab
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Camera {} worker panicked", self.id);
            }
        }
        log::info!("Closed camera {}", self.id);
    }
}

fn run_worker(mut source: Box<dyn FrameSource>, commands: Receiver<Command>, outcomes: Sender<GrabOutcome>) {
    while let Ok(command) = commands.recv() {
        match command {
            Command::SetProps(props) => source.set_camera_props(&props),
            Command::Grab(mut frame) => {
                let result = source.grab_next_frame(&mut frame);
                if outcomes.send(GrabOutcome { frame, result }).is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("Camera {} worker stopped", source.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SyntheticCamera;
    use crate::camera::synthetic::Light;

    fn grabber() -> FrameGrabber {
        let camera = SyntheticCamera::new(3, Light::FluorescentLamp).without_delay();
        let mut grabber = FrameGrabber::spawn(Box::new(camera)).unwrap();
        grabber.set_camera_props(CameraProps::default().with_frame_size(64, 16));
        grabber
    }

    #[test]
    fn grabs_on_worker_and_returns_buffer() {
        let mut grabber = grabber();
        assert_eq!(3, grabber.id());
        assert!(grabber.request_frame(Frame::default()).is_none());
        assert!(grabber.is_grab_pending());

        let outcome = grabber.wait_frame().unwrap();
        assert!(outcome.result.is_ok());
        assert_eq!((16, 64), (outcome.frame.rows(), outcome.frame.cols()));
        assert!(!grabber.is_grab_pending());
    }

    #[test]
    fn one_request_in_flight() {
        let mut grabber = grabber();
        assert!(grabber.request_frame(Frame::default()).is_none());
        let rejected = grabber.request_frame(Frame::new(1, 1, 1));
        assert_eq!(Some(Frame::new(1, 1, 1)), rejected);
        assert!(grabber.wait_frame().is_some());
        assert!(grabber.wait_frame().is_none());
    }

    #[test]
    fn props_are_tracked_on_owner_side() {
        let mut grabber = grabber();
        let props = grabber.camera_props().with_exposure(-2.0);
        grabber.set_camera_props(props);
        assert_eq!(props, grabber.camera_props());
    }
}
