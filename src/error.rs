use std::fmt;

#[derive(Debug)]
pub enum ScoreError {
    Parse(String),
    InputTooLarge { len: usize, max: usize },
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::Parse(message) => write!(f, "html parse failed: {}", message),
            ScoreError::InputTooLarge { len, max } => {
                write!(f, "document is {} bytes, limit is {} bytes", len, max)
            }
            ScoreError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ScoreError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ScoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScoreError {
    fn from(value: std::io::Error) -> Self {
        ScoreError::Io(value)
    }
}
