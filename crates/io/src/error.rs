use std::fmt;

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or read.
    Read(String),
    /// Delimited content could not be parsed. The message never echoes row
    /// content.
    Parse(String),
    /// Output could not be written.
    Write(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(msg) => write!(f, "read error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Write(msg) => write!(f, "write error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}
