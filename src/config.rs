//! Inference configuration and change notification.
//!
//! An [`InferenceConfig`] is a plain value describing how the landmarker should be built. A
//! [`ConfigStore`] owns the current value and publishes every change to its subscribers, which
//! typically respond by rebuilding their [`LandmarkerService`].
//!
//! [`LandmarkerService`]: crate::service::LandmarkerService

use std::{
    env,
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use itertools::Itertools;

use crate::error::ServiceError;

/// Overrides the compute [`Delegate`] (`CPU` or `GPU`).
pub const DELEGATE_ENV: &str = "LANDMARK_OVERLAY_DELEGATE";
/// Directory containing the model asset files.
pub const MODEL_DIR_ENV: &str = "LANDMARK_OVERLAY_MODEL_DIR";

/// Landmark detection model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Model {
    #[default]
    HolisticLandmarker,
}

impl Model {
    pub const ALL: &'static [Model] = &[Model::HolisticLandmarker];

    pub fn name(&self) -> &'static str {
        match self {
            Model::HolisticLandmarker => "Holistic Landmarker",
        }
    }

    /// File name of the model asset bundle.
    pub fn file_name(&self) -> &'static str {
        match self {
            Model::HolisticLandmarker => "holistic_landmarker.task",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }
}

/// Hardware the landmarker runs inference on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Delegate {
    #[default]
    Cpu,
    Gpu,
}

impl Delegate {
    pub const ALL: [Self; 2] = [Self::Cpu, Self::Gpu];

    pub fn name(&self) -> &'static str {
        match self {
            Delegate::Cpu => "CPU",
            Delegate::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Delegate {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|delegate| delegate.name() == s)
            .ok_or_else(|| {
                ServiceError::InvalidConfig(format!(
                    "unknown delegate '{s}', expected one of {}",
                    Self::ALL.iter().join(", ")
                ))
            })
    }
}

/// Settings used to build a landmarker.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    pub model: Model,
    pub delegate: Delegate,
    /// Directory to load [`Model::file_name`] from. `None` if no model asset is available.
    pub model_dir: Option<PathBuf>,
    pub min_face_detection_confidence: f32,
    pub min_face_suppression_threshold: f32,
    pub min_face_presence_confidence: f32,
    pub min_pose_detection_confidence: f32,
    pub min_pose_suppression_threshold: f32,
    pub min_pose_presence_confidence: f32,
    pub min_hand_landmarks_confidence: f32,
    pub output_face_blendshapes: bool,
    pub output_pose_segmentation_masks: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: Model::HolisticLandmarker,
            delegate: Delegate::Cpu,
            model_dir: None,
            min_face_detection_confidence: 0.5,
            min_face_suppression_threshold: 0.3,
            min_face_presence_confidence: 0.5,
            min_pose_detection_confidence: 0.5,
            min_pose_suppression_threshold: 0.3,
            min_pose_presence_confidence: 0.5,
            min_hand_landmarks_confidence: 0.5,
            output_face_blendshapes: true,
            output_pose_segmentation_masks: false,
        }
    }
}

impl InferenceConfig {
    /// Returns the default configuration with overrides from the environment applied.
    ///
    /// See [`DELEGATE_ENV`] and [`MODEL_DIR_ENV`].
    pub fn from_env() -> Result<Self, ServiceError> {
        let config = Self::from_vars(|name| env::var_os(name))?;
        log::debug!("inference config from environment: {:?}", config);
        Ok(config)
    }

    fn from_vars(var: impl Fn(&str) -> Option<OsString>) -> Result<Self, ServiceError> {
        let mut config = Self::default();
        if let Some(delegate) = var(DELEGATE_ENV) {
            config.delegate = delegate
                .to_str()
                .ok_or_else(|| {
                    ServiceError::InvalidConfig(format!("{DELEGATE_ENV} is not valid UTF-8"))
                })?
                .parse()?;
        }
        if let Some(dir) = var(MODEL_DIR_ENV) {
            config.model_dir = Some(dir.into());
        }
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_model_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        Self {
            model_dir: Some(dir.as_ref().to_path_buf()),
            ..self
        }
    }

    /// Full path of the model asset, if a model directory is configured.
    pub fn model_path(&self) -> Option<PathBuf> {
        self.model_dir
            .as_ref()
            .map(|dir| dir.join(self.model.file_name()))
    }

    fn thresholds(&self) -> [(&'static str, f32); 7] {
        [
            ("min_face_detection_confidence", self.min_face_detection_confidence),
            ("min_face_suppression_threshold", self.min_face_suppression_threshold),
            ("min_face_presence_confidence", self.min_face_presence_confidence),
            ("min_pose_detection_confidence", self.min_pose_detection_confidence),
            ("min_pose_suppression_threshold", self.min_pose_suppression_threshold),
            ("min_pose_presence_confidence", self.min_pose_presence_confidence),
            ("min_hand_landmarks_confidence", self.min_hand_landmarks_confidence),
        ]
    }

    /// Checks that every threshold lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ServiceError> {
        for (name, value) in self.thresholds() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ServiceError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const YELLOW: Self = Self([255, 255, 0, 255]);
    pub const TEAL: Self = Self([0, 127, 139, 255]);
}

/// Stroke widths and colors a renderer should use for an overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub line_width: f32,
    pub line_color: Color,
    pub point_radius: f32,
    pub point_color: Color,
    pub point_fill_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            line_color: Color::TEAL,
            point_radius: 2.0,
            point_color: Color::YELLOW,
            point_fill_color: Color::RED,
        }
    }
}

/// Owner of the current [`InferenceConfig`].
///
/// Changes made through [`ConfigStore::update`] are delivered to every live
/// [`ConfigSubscription`].
pub struct ConfigStore {
    state: Mutex<State>,
}

struct State {
    current: InferenceConfig,
    subscribers: Vec<Sender<InferenceConfig>>,
}

impl ConfigStore {
    pub fn new(config: InferenceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(State {
                current: config,
                subscribers: Vec::new(),
            }),
        })
    }

    /// Returns a copy of the current configuration.
    pub fn get(&self) -> InferenceConfig {
        self.state.lock().unwrap().current.clone()
    }

    /// Modifies the configuration.
    ///
    /// `f` runs on a copy of the current value without holding the store's lock. The modified
    /// value is validated; if it is invalid, the stored configuration is left untouched and the
    /// error is returned. Subscribers are only notified if the value actually changed. Returns
    /// whether it did.
    pub fn update(&self, f: impl FnOnce(&mut InferenceConfig)) -> Result<bool, ServiceError> {
        let mut config = self.get();
        f(&mut config);
        config.validate()?;

        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if config == state.current {
            return Ok(false);
        }

        log::debug!("inference config changed: {:?}", config);
        state.current = config;
        let current = &state.current;
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.send(current.clone()).is_ok());
        if state.subscribers.len() != before {
            log::trace!(
                "pruned {} closed config subscriptions",
                before - state.subscribers.len()
            );
        }
        Ok(true)
    }

    /// Registers a new subscriber that will receive every future configuration change.
    pub fn subscribe(&self) -> ConfigSubscription {
        let (sender, recv) = channel::unbounded();
        self.state.lock().unwrap().subscribers.push(sender);
        ConfigSubscription { recv }
    }
}

/// Receiving end of [`ConfigStore::subscribe`].
///
/// Dropping the subscription unregisters it.
pub struct ConfigSubscription {
    recv: Receiver<InferenceConfig>,
}

impl ConfigSubscription {
    /// Returns the most recent pending change, discarding older ones.
    ///
    /// Returns `None` if nothing changed since the last call.
    pub fn latest(&self) -> Option<InferenceConfig> {
        let mut latest = None;
        loop {
            match self.recv.try_recv() {
                Ok(config) => latest = Some(config),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return latest,
            }
        }
    }

    /// Blocks until the next change arrives.
    ///
    /// Returns `None` once the [`ConfigStore`] has been dropped.
    pub fn wait(&self) -> Option<InferenceConfig> {
        self.recv.recv().ok()
    }
}
