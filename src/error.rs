use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Page geometry that cannot produce a sensible grid.
    Config(String),
    Image(image::ImageError),
    /// Bytes that are not a PNG or JPEG, or that decode to an empty image.
    UnsupportedImage(String),
    Pdf(String),
    Json(serde_json::Error),
    /// Nothing survived intake, so there is no page to write.
    EmptyDocument,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Config(msg) => write!(f, "Invalid page configuration: {msg}"),
            Error::Image(e) => write!(f, "Image error: {e}"),
            Error::UnsupportedImage(msg) => write!(f, "Unsupported image: {msg}"),
            Error::Pdf(msg) => write!(f, "PDF error: {msg}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::EmptyDocument => write!(f, "no images to place"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Image(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
