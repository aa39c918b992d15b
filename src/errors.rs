//! The `errors` module defines the common error types.

use std::error;
use std::fmt;
use std::io;

use super::Result;

/// `Error` provides an enumeration of all possible errors reported by this crate.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading or writing the audio stream.
    Io(io::Error),
    /// A `Decoder` was built or invoked with an invalid configuration.
    Config(&'static str),
    /// The HCA header was malformed, truncated, or failed its checksum.
    Header(&'static str),
    /// A block was malformed, truncated, or failed its checksum.
    Block(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Config(ref msg) => write!(f, "invalid decoder configuration: {}", msg),
            Error::Header(ref msg) => write!(f, "malformed HCA header: {}", msg),
            Error::Block(ref msg) => write!(f, "malformed HCA block: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Config(_) | Error::Header(_) | Error::Block(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// function to create a config error.
pub fn config_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Config(desc))
}

/// function to create a header error.
pub fn header_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Header(desc))
}

/// function to create a block error.
pub fn block_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Block(desc))
}
