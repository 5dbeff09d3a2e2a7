//! Error types for mdocx library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mdocx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A configuration layer could not be parsed or applied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error reading the Markdown source.
    #[error("Markdown parsing error: {0}")]
    Parse(String),

    /// Error parsing or rendering a chart.
    #[error("Chart error: {0}")]
    Chart(String),

    /// Error reading or embedding an image.
    #[error("Image error: {0}")]
    Image(String),

    /// Error while laying out or serializing document content.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Error writing the .docx container.
    #[error("Package error: {0}")]
    Package(#[from] zip::result::ZipError),

    /// Error serializing a package part.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::Image(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InputNotFound(PathBuf::from("missing.md"));
        assert_eq!(err.to_string(), "Input file not found: missing.md");

        let err = Error::Chart("empty data".to_string());
        assert_eq!(err.to_string(), "Chart error: empty data");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
