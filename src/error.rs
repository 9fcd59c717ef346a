use thiserror::Error;

/// A telemetry line carried the marker token but no usable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing '=' delimiter in line: {line}")]
    MissingDelimiter { line: String },

    #[error("invalid gas value '{field}' in line: {line}")]
    InvalidValue { field: String, line: String },
}

/// Writing a reading into the distribution channel failed.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("channel is closed")]
    ChannelClosed,

    #[error("journal write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reading from the distribution channel was interrupted.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("channel is closed")]
    ChannelClosed,

    #[error("journal read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// An alarm side effect (sound, notification) failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SideEffectError {
    #[error("sound playback failed: {0}")]
    Sound(String),

    #[error("notification failed: {0}")]
    Notification(String),
}

/// An operator typed something the console does not understand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

#[derive(Error, Debug)]
pub enum GaswatchError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Serial error: {0}")]
    SerialError(#[from] tokio_serial::Error),

    #[error("Publish error: {0}")]
    PublishError(#[from] PublishError),

    #[error("Subscription error: {0}")]
    SubscriptionError(#[from] SubscriptionError),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<&str> for GaswatchError {
    fn from(error: &str) -> Self {
        GaswatchError::RuntimeError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GaswatchError>;
