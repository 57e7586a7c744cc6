use thiserror::Error;

#[derive(Error, Debug)]
pub enum NutrilensError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl NutrilensError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures of the device motion feed.
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Motion events are not supported on this platform")]
    Unsupported,

    #[error("Motion source is already running")]
    AlreadyStarted,

    #[error("Motion source failed: {details}")]
    Source { details: String },
}

/// Failures of the live camera stream and still capture.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera access denied. Please check permissions.")]
    AccessDenied,

    #[error("No camera device is available")]
    Unavailable,

    #[error("Camera is not active")]
    NotActive,

    #[error("Frame capture failed: {details}")]
    FrameCapture { details: String },

    #[error("Still encoding failed: {details}")]
    Encoding { details: String },
}

/// Failures of the meal-scan workflow itself, as opposed to the devices
/// and services it drives.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No food detected. Please try again.")]
    NoFoodDetected,

    #[error("{action} is not allowed in the {state} state")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Scan session is closed")]
    SessionClosed,
}

/// Failures talking to the nutrition service.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{endpoint} returned a malformed response: {details}")]
    MalformedResponse {
        endpoint: &'static str,
        details: String,
    },

    #[error("Failed to encode request body: {details}")]
    Encode { details: String },
}

impl ApiError {
    /// True for failures where trying the same action again may succeed,
    /// as opposed to a response the client refuses to interpret.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

/// Failures of the local key/value store backing profiles and history.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read key '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write key '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Value under key '{key}' is not valid JSON: {details}")]
    Corrupt { key: String, details: String },

    #[error("Failed to encode value for key '{key}': {details}")]
    Encode { key: String, details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, NutrilensError>;
