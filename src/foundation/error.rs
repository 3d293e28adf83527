pub type BurnoverResult<T> = Result<T, BurnoverError>;

#[derive(thiserror::Error, Debug)]
pub enum BurnoverError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("export error: {0}")]
    Export(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BurnoverError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            BurnoverError::invalid_input("x")
                .to_string()
                .contains("invalid input:")
        );
        assert!(
            BurnoverError::metadata("x")
                .to_string()
                .contains("metadata error:")
        );
        assert!(
            BurnoverError::playback("x")
                .to_string()
                .contains("playback error:")
        );
        assert!(
            BurnoverError::surface("x")
                .to_string()
                .contains("surface error:")
        );
        assert!(
            BurnoverError::unsupported_format("x")
                .to_string()
                .contains("unsupported format:")
        );
        assert!(
            BurnoverError::export("x")
                .to_string()
                .contains("export error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BurnoverError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
