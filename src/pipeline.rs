//! Moves detection results off the inference thread and turns them into overlays.
//!
//! Results produced by a [`LandmarkerService`] (or delivered by a live stream landmarker) are
//! submitted to an [`OverlayPipeline`]. A worker thread maps them into view space with a
//! [`CoordinateMapper`] and passes the finished [`OverlayUpdate`]s to the render side through an
//! [`OverlayReceiver`].
//!
//! [`LandmarkerService`]: crate::service::LandmarkerService

use std::{
    io, panic,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, RecvError, Sender, TryRecvError};

use crate::{
    error::OverlayError,
    fit::ContentFitPolicy,
    orientation::OrientationTransform,
    overlay::{CoordinateMapper, HolisticOverlay},
    resolution::Dimensions,
    service::{LiveStreamEvent, ResultBundle},
    timer::FpsCounter,
};

const WORKER_NAME: &str = "overlay";

/// Display parameters needed to map a result into the overlay view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Size of the image the detector ran on.
    pub image: Dimensions,
    /// Size of the overlay view.
    pub view: Dimensions,
    pub fit: ContentFitPolicy,
    pub orientation: OrientationTransform,
}

impl ViewState {
    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.image, self.view, self.fit, self.orientation)
    }
}

/// A freshly mapped overlay, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayUpdate {
    /// `None` if nothing was detected; the previous overlay should be cleared.
    pub overlay: Option<HolisticOverlay>,
    pub inference_time_ms: f64,
}

struct Message {
    bundle: ResultBundle,
    view: ViewState,
}

/// Worker thread converting [`ResultBundle`]s into [`OverlayUpdate`]s.
///
/// At most one result waits in the queue while the worker maps the previous one, so
/// [`OverlayPipeline::submit`] blocks when the producer outpaces the mapper. Dropping the
/// pipeline finishes the queued results and joins the worker. A panic on the worker is
/// propagated to the thread that submits to or drops the pipeline.
pub struct OverlayPipeline {
    sender: Option<Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl OverlayPipeline {
    /// Spawns the worker thread and returns the pipeline with its output receiver.
    pub fn spawn() -> io::Result<(Self, OverlayReceiver)> {
        let (sender, recv) = channel::unbounded();
        let pipeline = Self::spawn_with(overlay_handler(sender))?;
        Ok((pipeline, OverlayReceiver { recv }))
    }

    fn spawn_with<F>(mut handler: F) -> io::Result<Self>
    where
        F: FnMut(Message) + Send + 'static,
    {
        let (sender, recv) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || {
                log::trace!("{WORKER_NAME} worker starting");
                for message in recv {
                    handler(message);
                }
                log::trace!("{WORKER_NAME} worker exiting");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Submits a detection result to be mapped with `view`.
    ///
    /// Only the first result of the bundle is used.
    pub fn submit(&mut self, bundle: ResultBundle, view: ViewState) {
        let sent = match &self.sender {
            Some(sender) => sender.send(Message { bundle, view }).is_ok(),
            None => false,
        };
        if !sent {
            // The worker hung up, which only happens when it panicked.
            self.join();
        }
    }

    /// Submits a live stream event. Landmarker errors are logged and skipped.
    pub fn submit_event(&mut self, event: LiveStreamEvent, view: ViewState) {
        match event.result {
            Ok(bundle) => self.submit(bundle, view),
            Err(e) => log::warn!(
                "landmarker failed on frame at {}ms: {e:#}",
                event.timestamp_ms
            ),
        }
    }

    fn join(&mut self) {
        self.sender = None;
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                if !thread::panicking() {
                    panic::resume_unwind(payload);
                }
            }
        }
    }
}

impl Drop for OverlayPipeline {
    fn drop(&mut self) {
        self.join();
    }
}

fn overlay_handler(
    sender: Sender<Result<OverlayUpdate, OverlayError>>,
) -> impl FnMut(Message) + Send + 'static {
    let mut fps = FpsCounter::new(WORKER_NAME);
    move |Message { bundle, view }| {
        let overlay = match bundle.first() {
            Some(result) => {
                result.log_diagnostics();
                view.mapper().build_overlay(result)
            }
            None => Ok(None),
        };
        let update = overlay.map(|overlay| OverlayUpdate {
            overlay,
            inference_time_ms: bundle.inference_time_ms,
        });
        if let Err(e) = &update {
            log::warn!("failed to build overlay: {e}");
        }

        fps.tick();
        if sender.send(update).is_err() {
            log::trace!("overlay receiver closed");
        }
    }
}

/// Render-side end of an [`OverlayPipeline`].
pub struct OverlayReceiver {
    recv: Receiver<Result<OverlayUpdate, OverlayError>>,
}

impl OverlayReceiver {
    /// Blocks until the next update arrives.
    ///
    /// Returns an error once the pipeline has been dropped and all updates were received.
    pub fn recv(&self) -> Result<Result<OverlayUpdate, OverlayError>, RecvError> {
        self.recv.recv()
    }

    /// Returns the most recent pending update, discarding older ones.
    pub fn latest(&self) -> Option<Result<OverlayUpdate, OverlayError>> {
        let mut latest = None;
        loop {
            match self.recv.try_recv() {
                Ok(update) => latest = Some(update),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return latest,
            }
        }
    }
}
