use thiserror::Error;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Empty composite: {0}")]
    EmptyComposite(String),

    #[error("Invalid page spec: {0}")]
    InvalidPageSpec(String),

    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pipeline busy: {0}")]
    Busy(String),

    #[error("Worker error: {0}")]
    WorkerError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`StitchError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl StitchError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a decode failure.
    decode => DecodeFailure,
    /// Create an empty-composite error.
    empty_composite => EmptyComposite,
    /// Create an invalid page spec error.
    invalid_page_spec => InvalidPageSpec,
    /// Create an encode failure.
    encode => EncodeFailure,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a busy rejection.
    busy => Busy,
    /// Create a worker error.
    worker => WorkerError,
}

impl From<lopdf::Error> for StitchError {
    fn from(e: lopdf::Error) -> Self {
        Self::EncodeFailure(e.to_string())
    }
}

impl From<serde_yml::Error> for StitchError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<png::EncodingError> for StitchError {
    fn from(e: png::EncodingError) -> Self {
        Self::EncodeFailure(e.to_string())
    }
}

impl From<image::ImageError> for StitchError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodeFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
