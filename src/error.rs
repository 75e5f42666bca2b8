use std::fs::File;
use std::io::BufReader;

/// Error types that can occur while building or evaluating a style network
///
/// # Variants
///
/// - `ConfigurationError` - indicates an invalid run configuration, such as layer weights that select no layer, weight indices outside the convolution-block range, or a mean/channel-swap specification that does not fit the architecture
/// - `ShapeError` - indicates a tensor whose rank or dimensions do not fit the operation it was passed to
/// - `BackendError` - indicates a failure inside the network backend, such as missing pretrained weights or a malformed architecture description
/// - `InputValidationError` - indicates a layer or optimizer argument that does not meet the expected format, type, or validation rules
/// - `ProcessingError` - indicates that there is something wrong while processing
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    ConfigurationError(String),
    ShapeError(String),
    BackendError(String),
    InputValidationError(String),
    ProcessingError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::ShapeError(msg) => write!(f, "Shape error: {}", msg),
            ModelError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Input/Output error types that can occur while reading network descriptions, weights and images
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations (reading, writing, file access)
/// - `JsonError` - Wraps JSON serialization/deserialization errors for architecture and weight files
/// - `ImageError` - Wraps image decoding/encoding errors
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
    #[cfg(feature = "style_transfer")]
    ImageError(image::ImageError),
}

impl IoError {
    pub fn load_in_buf_reader(path: &str) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
            #[cfg(feature = "style_transfer")]
            IoError::ImageError(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for IoError {}

/// Any error that can abort a style transfer run
///
/// # Variants
///
/// - `Model` - The network or the optimization rejected its inputs
/// - `Io` - A file could not be read or written
#[derive(Debug)]
pub enum StyleError {
    Model(ModelError),
    Io(IoError),
}

impl std::fmt::Display for StyleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleError::Model(e) => write!(f, "{}", e),
            StyleError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StyleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StyleError::Model(e) => Some(e),
            StyleError::Io(e) => Some(e),
        }
    }
}

impl From<ModelError> for StyleError {
    fn from(e: ModelError) -> Self {
        StyleError::Model(e)
    }
}

impl From<IoError> for StyleError {
    fn from(e: IoError) -> Self {
        StyleError::Io(e)
    }
}
