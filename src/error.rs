use std::fmt;

#[derive(Debug)]
pub enum SynthError {
    /// A parameter combination the analyser or tuner cannot work with.
    InvalidConfig(String),
    UnknownInstrument(String),
    Io(std::io::Error),
    Wav(hound::Error),
    Image(image::ImageError),
    Json(serde_json::Error),
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            SynthError::UnknownInstrument(name) => write!(f, "Unknown instrument '{name}'"),
            SynthError::Io(e) => write!(f, "I/O error: {e}"),
            SynthError::Wav(e) => write!(f, "WAV error: {e}"),
            SynthError::Image(e) => write!(f, "Image error: {e}"),
            SynthError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthError::Io(e) => Some(e),
            SynthError::Wav(e) => Some(e),
            SynthError::Image(e) => Some(e),
            SynthError::Json(e) => Some(e),
            SynthError::InvalidConfig(_) | SynthError::UnknownInstrument(_) => None,
        }
    }
}

impl From<std::io::Error> for SynthError {
    fn from(e: std::io::Error) -> Self {
        SynthError::Io(e)
    }
}

impl From<hound::Error> for SynthError {
    fn from(e: hound::Error) -> Self {
        SynthError::Wav(e)
    }
}

impl From<image::ImageError> for SynthError {
    fn from(e: image::ImageError) -> Self {
        SynthError::Image(e)
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(e: serde_json::Error) -> Self {
        SynthError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_problem() {
        let e = SynthError::InvalidConfig("window length 1000 is not a power of two".into());
        assert_eq!(
            e.to_string(),
            "Invalid configuration: window length 1000 is not a power of two"
        );
        assert_eq!(
            SynthError::UnknownInstrument("cowbell".into()).to_string(),
            "Unknown instrument 'cowbell'"
        );
    }

    #[test]
    fn io_errors_convert_and_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wav");
        let e: SynthError = io.into();
        assert!(matches!(e, SynthError::Io(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
