//! Running a holistic landmarker on still images, videos, and live camera streams.
//!
//! The landmarker itself is an external collaborator: a [`Backend`] builds a [`Landmarker`]
//! from [`LandmarkerOptions`], and [`LandmarkerService`] drives it in one of three
//! [`RunningMode`]s.
//!
//! * [`RunningMode::Image`]: [`LandmarkerService::detect_image`] runs synchronously.
//! * [`RunningMode::Video`]: [`LandmarkerService::detect_video`] samples a [`VideoSource`] at a
//!   fixed interval and collects one result per sampled frame.
//! * [`RunningMode::LiveStream`]: [`LandmarkerService::detect_async`] hands frames to the
//!   landmarker, which delivers results later through a [`LiveStreamSink`]. They arrive on the
//!   [`LiveStreamResults`] receiver returned by [`LandmarkerService::live_stream`].

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crossbeam::channel::{self, Receiver, RecvError, Sender, TryRecvError};

use crate::{
    config::InferenceConfig, error::ServiceError, landmark::HolisticResult,
    orientation::ImageOrientation, resolution::Dimensions, timer::Timer,
};

/// How the landmarker is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunningMode {
    Image,
    Video,
    LiveStream,
}

/// An image handed to the landmarker.
///
/// The pixel data is opaque to this crate; only the [`Backend`] interprets it.
#[derive(Debug, Clone)]
pub struct Frame {
    dimensions: Dimensions,
    orientation: ImageOrientation,
    data: Arc<[u8]>,
}

impl Frame {
    pub fn new<D: Into<Arc<[u8]>>>(dimensions: Dimensions, data: D) -> Self {
        Self {
            dimensions,
            orientation: ImageOrientation::Up,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn with_orientation(self, orientation: ImageOrientation) -> Self {
        Self {
            orientation,
            ..self
        }
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    #[inline]
    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Everything a [`Backend`] needs to build a [`Landmarker`].
#[derive(Debug, Clone)]
pub struct LandmarkerOptions {
    pub config: InferenceConfig,
    pub running_mode: RunningMode,
    pub model_path: PathBuf,
    /// Where asynchronous results go. Only set for [`RunningMode::LiveStream`].
    pub live_stream: Option<LiveStreamSink>,
}

/// Factory for [`Landmarker`]s.
pub trait Backend {
    fn create(&self, options: LandmarkerOptions) -> anyhow::Result<Box<dyn Landmarker>>;
}

/// A holistic landmark detector.
pub trait Landmarker: Send {
    /// Detects landmarks in a still image.
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<HolisticResult>;

    /// Detects landmarks in a video frame. Timestamps must increase monotonically.
    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: u64,
    ) -> anyhow::Result<HolisticResult> {
        let _ = (frame, timestamp_ms);
        anyhow::bail!("video mode is not supported by this landmarker")
    }

    /// Queues a live camera frame. The result is delivered through the [`LiveStreamSink`] passed
    /// in [`LandmarkerOptions::live_stream`].
    fn detect_async(&mut self, frame: Frame, timestamp_ms: u64) -> anyhow::Result<()> {
        let _ = (frame, timestamp_ms);
        anyhow::bail!("live stream mode is not supported by this landmarker")
    }
}

/// Returns the current wall-clock time in milliseconds since the UNIX epoch.
///
/// Live stream frames should be timestamped with this clock so that the measured inference time
/// is meaningful.
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Landmarker results together with timing information.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBundle {
    /// Average time spent per processed frame, in milliseconds.
    pub inference_time_ms: f64,
    /// One entry per processed frame. `None` for frames that could not be processed.
    pub results: Vec<Option<HolisticResult>>,
    /// Size of the processed video frames. Only set for [`RunningMode::Video`].
    pub size: Option<Dimensions>,
}

impl ResultBundle {
    /// Returns the first result, which is the only one for images and live stream frames.
    pub fn first(&self) -> Option<&HolisticResult> {
        self.results.first()?.as_ref()
    }

    /// Returns the video result that should be displayed at `playback_ms`, if results were
    /// collected every `interval_ms` milliseconds.
    pub fn result_at(&self, playback_ms: f64, interval_ms: f64) -> Option<&HolisticResult> {
        if !(interval_ms > 0.0) || !(playback_ms >= 0.0) {
            return None;
        }
        let index = (playback_ms / interval_ms).floor() as usize;
        self.results.get(index)?.as_ref()
    }
}

/// A live stream result, or the error the landmarker reported for that frame.
#[derive(Debug)]
pub struct LiveStreamEvent {
    pub timestamp_ms: u64,
    pub result: anyhow::Result<ResultBundle>,
}

/// Handed to the [`Backend`] in live stream mode to deliver asynchronous results.
#[derive(Debug, Clone)]
pub struct LiveStreamSink {
    sender: Sender<LiveStreamEvent>,
}

impl LiveStreamSink {
    /// Delivers the result for the frame submitted with `frame_timestamp_ms`.
    ///
    /// The inference time is measured from the frame's timestamp (see [`timestamp_ms`]). If the
    /// receiving side is gone, the result is dropped.
    pub fn deliver(
        &self,
        result: anyhow::Result<Option<HolisticResult>>,
        frame_timestamp_ms: u64,
    ) {
        let inference_time_ms = timestamp_ms().saturating_sub(frame_timestamp_ms) as f64;
        let event = LiveStreamEvent {
            timestamp_ms: frame_timestamp_ms,
            result: result.map(|result| ResultBundle {
                inference_time_ms,
                results: vec![result],
                size: None,
            }),
        };
        if self.sender.send(event).is_err() {
            log::trace!(
                "live stream receiver closed, dropping result for {frame_timestamp_ms}ms"
            );
        }
    }
}

/// Receiving end for live stream results.
pub struct LiveStreamResults {
    recv: Receiver<LiveStreamEvent>,
}

impl LiveStreamResults {
    /// Blocks until the next result arrives.
    pub fn recv(&self) -> Result<LiveStreamEvent, RecvError> {
        self.recv.recv()
    }

    pub fn try_recv(&self) -> Result<LiveStreamEvent, TryRecvError> {
        self.recv.try_recv()
    }

    pub fn iter(&self) -> impl Iterator<Item = LiveStreamEvent> + '_ {
        self.recv.iter()
    }
}

/// Source of frames for [`LandmarkerService::detect_video`].
pub trait VideoSource {
    /// Decodes the frame at (or near) `timestamp_ms`.
    fn frame_at(&mut self, timestamp_ms: u64) -> anyhow::Result<Frame>;
}

/// Progress callbacks for [`LandmarkerService::detect_video`].
pub trait VideoProgress {
    fn will_begin(&mut self, frame_count: usize) {
        let _ = frame_count;
    }

    fn did_finish_frame(&mut self, index: usize) {
        let _ = index;
    }
}

/// Ignores progress.
impl VideoProgress for () {}

/// Drives a [`Landmarker`] in a fixed [`RunningMode`].
pub struct LandmarkerService {
    landmarker: Box<dyn Landmarker>,
    running_mode: RunningMode,
    config: InferenceConfig,
    live_stream: Option<LiveStreamSink>,
    t_infer: Timer,
}

impl LandmarkerService {
    /// Creates a service for [`RunningMode::Image`].
    pub fn still_image<B: Backend + ?Sized>(
        backend: &B,
        config: &InferenceConfig,
    ) -> Result<Self, ServiceError> {
        Self::new(backend, config, RunningMode::Image, None)
    }

    /// Creates a service for [`RunningMode::Video`].
    pub fn video<B: Backend + ?Sized>(
        backend: &B,
        config: &InferenceConfig,
    ) -> Result<Self, ServiceError> {
        Self::new(backend, config, RunningMode::Video, None)
    }

    /// Creates a service for [`RunningMode::LiveStream`], along with the receiver its results
    /// will be delivered to.
    pub fn live_stream<B: Backend + ?Sized>(
        backend: &B,
        config: &InferenceConfig,
    ) -> Result<(Self, LiveStreamResults), ServiceError> {
        let (sender, recv) = channel::unbounded();
        let sink = LiveStreamSink { sender };
        let service = Self::new(backend, config, RunningMode::LiveStream, Some(sink))?;
        Ok((service, LiveStreamResults { recv }))
    }

    fn new<B: Backend + ?Sized>(
        backend: &B,
        config: &InferenceConfig,
        running_mode: RunningMode,
        live_stream: Option<LiveStreamSink>,
    ) -> Result<Self, ServiceError> {
        let landmarker = Self::create_landmarker(backend, config, running_mode, &live_stream)?;
        Ok(Self {
            landmarker,
            running_mode,
            config: config.clone(),
            live_stream,
            t_infer: Timer::new("infer"),
        })
    }

    fn create_landmarker<B: Backend + ?Sized>(
        backend: &B,
        config: &InferenceConfig,
        running_mode: RunningMode,
        live_stream: &Option<LiveStreamSink>,
    ) -> Result<Box<dyn Landmarker>, ServiceError> {
        config.validate()?;
        let model_path = config.model_path().ok_or(ServiceError::MissingModelPath)?;
        log::debug!(
            "creating {:?} landmarker from {} on {}",
            running_mode,
            model_path.display(),
            config.delegate
        );
        backend
            .create(LandmarkerOptions {
                config: config.clone(),
                running_mode,
                model_path,
                live_stream: live_stream.clone(),
            })
            .map_err(ServiceError::Backend)
    }

    /// Replaces the landmarker with one built from `config`, keeping the running mode.
    ///
    /// Live stream results keep arriving on the same [`LiveStreamResults`]. If building the new
    /// landmarker fails, the old one stays in place.
    pub fn reconfigure<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        config: &InferenceConfig,
    ) -> Result<(), ServiceError> {
        self.landmarker =
            Self::create_landmarker(backend, config, self.running_mode, &self.live_stream)?;
        self.config = config.clone();
        Ok(())
    }

    #[inline]
    pub fn running_mode(&self) -> RunningMode {
        self.running_mode
    }

    #[inline]
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    fn expect_mode(&self, expected: RunningMode) -> Result<(), ServiceError> {
        if self.running_mode == expected {
            Ok(())
        } else {
            Err(ServiceError::WrongRunningMode {
                expected,
                actual: self.running_mode,
            })
        }
    }

    /// Detects landmarks in a still image.
    pub fn detect_image(&mut self, frame: &Frame) -> Result<ResultBundle, ServiceError> {
        self.expect_mode(RunningMode::Image)?;

        let landmarker = &mut self.landmarker;
        let (result, elapsed) = self.t_infer.measure(|| landmarker.detect(frame));
        let result = result.map_err(ServiceError::Backend)?;
        Ok(ResultBundle {
            inference_time_ms: elapsed.as_secs_f64() * 1000.0,
            results: vec![Some(result)],
            size: None,
        })
    }

    /// Submits a live camera frame captured at `timestamp_ms`.
    ///
    /// Landmarker errors are logged and the frame is dropped; the stream continues with the next
    /// frame.
    pub fn detect_async(&mut self, frame: Frame, timestamp_ms: u64) -> Result<(), ServiceError> {
        self.expect_mode(RunningMode::LiveStream)?;

        if let Err(e) = self.landmarker.detect_async(frame, timestamp_ms) {
            log::warn!("dropping live stream frame at {timestamp_ms}ms: {e:#}");
        }
        Ok(())
    }

    /// Detects landmarks in a video by sampling a frame every `interval_ms` milliseconds.
    ///
    /// `floor(duration_ms / interval_ms)` frames are processed. Frames that cannot be decoded or
    /// processed are logged and recorded as `None`, so that result indices keep matching
    /// playback time (see [`ResultBundle::result_at`]).
    pub fn detect_video(
        &mut self,
        source: &mut dyn VideoSource,
        duration_ms: f64,
        interval_ms: f64,
        progress: &mut dyn VideoProgress,
    ) -> Result<ResultBundle, ServiceError> {
        self.expect_mode(RunningMode::Video)?;
        if !(interval_ms >= 1.0) || !(duration_ms >= 0.0) || !duration_ms.is_finite() {
            return Err(ServiceError::InvalidConfig(format!(
                "cannot sample a {duration_ms}ms video every {interval_ms}ms"
            )));
        }

        let start = Instant::now();
        let frame_count = (duration_ms / interval_ms).floor() as usize;
        let step = interval_ms.floor() as u64;
        progress.will_begin(frame_count);

        let mut results = Vec::new();
        let mut size = None;
        for index in 0..frame_count {
            let timestamp = step * index as u64;
            let frame = match source.frame_at(timestamp) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("failed to decode video frame at {timestamp}ms: {e:#}");
                    results.push(None);
                    continue;
                }
            };
            size = Some(frame.dimensions());

            let landmarker = &mut self.landmarker;
            match self
                .t_infer
                .time(|| landmarker.detect_for_video(&frame, timestamp))
            {
                Ok(result) => {
                    results.push(Some(result));
                    progress.did_finish_frame(index);
                }
                Err(e) => {
                    log::warn!("landmark detection failed on video frame at {timestamp}ms: {e:#}");
                    results.push(None);
                }
            }
        }

        let inference_time_ms = if frame_count == 0 {
            0.0
        } else {
            start.elapsed().as_secs_f64() * 1000.0 / frame_count as f64
        };
        log::debug!("processed {frame_count} video frames, {}", self.t_infer);
        Ok(ResultBundle {
            inference_time_ms,
            results,
            size,
        })
    }

    /// Returns the profiling timer for landmarker invocations.
    pub fn timers(&self) -> impl IntoIterator<Item = &Timer> + '_ {
        [&self.t_infer]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::landmark::Landmarks;

    /// Reports a single landmark at the frame's first data byte, scaled to `[0, 1]`. Fails on
    /// empty frames.
    struct FakeLandmarker {
        sink: Option<LiveStreamSink>,
    }

    fn fake_result(frame: &Frame) -> anyhow::Result<HolisticResult> {
        let Some(&byte) = frame.data().first() else {
            anyhow::bail!("empty frame");
        };
        let v = f32::from(byte) / 255.0;
        Ok(HolisticResult {
            pose_landmarks: Landmarks::from_positions([[v, v, 0.0]]),
            ..Default::default()
        })
    }

    impl Landmarker for FakeLandmarker {
        fn detect(&mut self, frame: &Frame) -> anyhow::Result<HolisticResult> {
            fake_result(frame)
        }

        fn detect_for_video(
            &mut self,
            frame: &Frame,
            _timestamp_ms: u64,
        ) -> anyhow::Result<HolisticResult> {
            fake_result(frame)
        }

        fn detect_async(&mut self, frame: Frame, timestamp_ms: u64) -> anyhow::Result<()> {
            let sink = self.sink.as_ref().unwrap();
            if frame.data().is_empty() {
                anyhow::bail!("empty frame");
            }
            sink.deliver(fake_result(&frame).map(Some), timestamp_ms);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        created: Mutex<Vec<LandmarkerOptions>>,
    }

    impl Backend for FakeBackend {
        fn create(&self, options: LandmarkerOptions) -> anyhow::Result<Box<dyn Landmarker>> {
            let sink = options.live_stream.clone();
            self.created.lock().unwrap().push(options);
            Ok(Box::new(FakeLandmarker { sink }))
        }
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        fn create(&self, _: LandmarkerOptions) -> anyhow::Result<Box<dyn Landmarker>> {
            anyhow::bail!("model file is corrupt")
        }
    }

    fn config() -> InferenceConfig {
        InferenceConfig::default().with_model_dir("/models")
    }

    fn frame(byte: u8) -> Frame {
        Frame::new(Dimensions::new(640.0, 480.0).unwrap(), vec![byte])
    }

    /// Yields frames whose first byte is the timestamp / 100, except at `broken_ms`.
    struct FakeVideo {
        broken_ms: u64,
        requested: Vec<u64>,
    }

    impl VideoSource for FakeVideo {
        fn frame_at(&mut self, timestamp_ms: u64) -> anyhow::Result<Frame> {
            self.requested.push(timestamp_ms);
            if timestamp_ms == self.broken_ms {
                anyhow::bail!("decode error");
            }
            Ok(frame((timestamp_ms / 100) as u8))
        }
    }

    #[derive(Default)]
    struct Progress {
        total: Option<usize>,
        finished: Vec<usize>,
    }

    impl VideoProgress for Progress {
        fn will_begin(&mut self, frame_count: usize) {
            self.total = Some(frame_count);
        }

        fn did_finish_frame(&mut self, index: usize) {
            self.finished.push(index);
        }
    }

    #[test]
    fn passes_configuration_to_backend() {
        let backend = FakeBackend::default();
        let mut config = config();
        config.min_pose_detection_confidence = 0.8;
        LandmarkerService::still_image(&backend, &config).unwrap();

        let created = backend.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].running_mode, RunningMode::Image);
        assert_eq!(
            created[0].model_path,
            PathBuf::from("/models/holistic_landmarker.task")
        );
        assert_eq!(created[0].config.min_pose_detection_confidence, 0.8);
        assert!(created[0].live_stream.is_none());
    }

    #[test]
    fn construction_errors() {
        let backend = FakeBackend::default();
        assert!(matches!(
            LandmarkerService::still_image(&backend, &InferenceConfig::default()),
            Err(ServiceError::MissingModelPath)
        ));
        assert!(matches!(
            LandmarkerService::video(&FailingBackend, &config()),
            Err(ServiceError::Backend(_))
        ));
        assert!(backend.created.lock().unwrap().is_empty());
    }

    #[test]
    fn detect_image() {
        let backend = FakeBackend::default();
        let mut service = LandmarkerService::still_image(&backend, &config()).unwrap();
        let bundle = service.detect_image(&frame(255)).unwrap();
        assert_eq!(bundle.results.len(), 1);
        assert_eq!(bundle.first().unwrap().pose_landmarks.get(0).unwrap().x(), 1.0);
        assert!(bundle.inference_time_ms >= 0.0);
        assert_eq!(bundle.size, None);

        let empty = Frame::new(Dimensions::new(1.0, 1.0).unwrap(), Vec::new());
        assert!(matches!(
            service.detect_image(&empty),
            Err(ServiceError::Backend(_))
        ));
    }

    #[test]
    fn wrong_running_mode() {
        let mut service = LandmarkerService::video(&FakeBackend::default(), &config()).unwrap();
        assert!(matches!(
            service.detect_image(&frame(0)),
            Err(ServiceError::WrongRunningMode {
                expected: RunningMode::Image,
                actual: RunningMode::Video,
            })
        ));
        assert!(matches!(
            service.detect_async(frame(0), 0),
            Err(ServiceError::WrongRunningMode { .. })
        ));
    }

    #[test]
    fn detect_video_samples_at_interval() {
        let mut service = LandmarkerService::video(&FakeBackend::default(), &config()).unwrap();
        let mut video = FakeVideo {
            broken_ms: 600,
            requested: Vec::new(),
        };
        let mut progress = Progress::default();
        let bundle = service
            .detect_video(&mut video, 1000.0, 300.0, &mut progress)
            .unwrap();

        assert_eq!(video.requested, [0, 300, 600]);
        assert_eq!(progress.total, Some(3));
        assert_eq!(progress.finished, [0, 1]);
        assert_eq!(bundle.results.len(), 3);
        assert!(bundle.results[2].is_none());
        assert_eq!(bundle.size, Some(Dimensions::new(640.0, 480.0).unwrap()));

        let at = |ms| {
            bundle
                .result_at(ms, 300.0)
                .map(|r| r.pose_landmarks.get(0).unwrap().x())
        };
        assert_eq!(at(0.0), Some(0.0));
        assert_eq!(at(450.0), Some(3.0 / 255.0));
        assert_eq!(at(650.0), None);
        assert_eq!(at(5000.0), None);
        assert_eq!(bundle.result_at(100.0, 0.0), None);
    }

    #[test]
    fn detect_video_rejects_bad_timing() {
        let mut service = LandmarkerService::video(&FakeBackend::default(), &config()).unwrap();
        let mut video = FakeVideo {
            broken_ms: u64::MAX,
            requested: Vec::new(),
        };
        assert!(matches!(
            service.detect_video(&mut video, 1000.0, 0.0, &mut ()),
            Err(ServiceError::InvalidConfig(_))
        ));
        for duration in [f64::INFINITY, f64::NAN, -1.0] {
            assert!(matches!(
                service.detect_video(&mut video, duration, 300.0, &mut ()),
                Err(ServiceError::InvalidConfig(_))
            ));
        }
        let bundle = service.detect_video(&mut video, 100.0, 300.0, &mut ()).unwrap();
        assert!(bundle.results.is_empty());
        assert_eq!(bundle.inference_time_ms, 0.0);
        assert!(video.requested.is_empty());
    }

    #[test]
    fn live_stream_delivers_results() {
        let backend = FakeBackend::default();
        let (mut service, results) = LandmarkerService::live_stream(&backend, &config()).unwrap();
        assert!(backend.created.lock().unwrap()[0].live_stream.is_some());

        let ts = timestamp_ms();
        service.detect_async(frame(51), ts).unwrap();
        // Errors are swallowed by the service and nothing is delivered.
        service
            .detect_async(Frame::new(Dimensions::new(1.0, 1.0).unwrap(), Vec::new()), ts + 1)
            .unwrap();

        let event = results.recv().unwrap();
        assert_eq!(event.timestamp_ms, ts);
        let bundle = event.result.unwrap();
        assert!(bundle.inference_time_ms >= 0.0);
        assert_eq!(bundle.first().unwrap().pose_landmarks.get(0).unwrap().x(), 0.2);
        assert!(matches!(results.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn live_stream_inference_time_counts_from_frame_timestamp() {
        let (sender, recv) = channel::unbounded();
        let sink = LiveStreamSink { sender };
        let results = LiveStreamResults { recv };

        let ts = timestamp_ms() - 50;
        sink.deliver(Ok(None), ts);
        sink.deliver(Err(anyhow::anyhow!("no pose")), ts + 1);

        let event = results.recv().unwrap();
        assert_eq!(event.timestamp_ms, ts);
        let bundle = event.result.unwrap();
        assert!(bundle.inference_time_ms >= 50.0, "{}", bundle.inference_time_ms);
        assert_eq!(bundle.results, [None]);

        let failed = results.recv().unwrap();
        assert_eq!(failed.timestamp_ms, ts + 1);
        assert!(failed.result.is_err());

        // A timestamp from the future does not produce a negative time.
        sink.deliver(Ok(None), timestamp_ms() + 60_000);
        assert_eq!(results.recv().unwrap().result.unwrap().inference_time_ms, 0.0);
    }

    #[test]
    fn reconfigure_keeps_live_stream() {
        let backend = FakeBackend::default();
        let (mut service, results) = LandmarkerService::live_stream(&backend, &config()).unwrap();

        let mut invalid = config();
        invalid.min_face_detection_confidence = 2.0;
        assert!(service.reconfigure(&backend, &invalid).is_err());
        assert_eq!(service.config(), &config());

        let gpu = InferenceConfig {
            delegate: crate::config::Delegate::Gpu,
            ..config()
        };
        service.reconfigure(&backend, &gpu).unwrap();
        assert_eq!(service.config().delegate, crate::config::Delegate::Gpu);
        assert_eq!(backend.created.lock().unwrap().len(), 2);

        service.detect_async(frame(0), 7).unwrap();
        assert_eq!(results.recv().unwrap().timestamp_ms, 7);
    }
}
