use core::fmt;
use std::io::{Error as IoError, ErrorKind as IoErrorKind};

use http1_exchange_spec::{body_parser::BodyParseError, headers::HeaderError};

//
//
//
#[derive(Debug)]
pub enum FramingError {
    TooManyBytes { remaining: u64, attempted: usize },
    TooFewBytes { missing: u64 },
    InvalidChunk(BodyParseError),
    UnexpectedEof,
    InvalidRequestFraming(IoError),
}

#[derive(Debug)]
pub enum ExchangeError {
    Framing(FramingError),
    Sequencing(&'static str),
    Contract(&'static str),
    Transport(IoError),
}

impl ExchangeError {
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::Framing(_) | Self::Transport(_) => true,
            Self::Sequencing(_) | Self::Contract(_) => false,
        }
    }

    pub fn is_framing(&self) -> bool {
        matches!(self, Self::Framing(_))
    }
    pub fn is_sequencing(&self) -> bool {
        matches!(self, Self::Sequencing(_))
    }
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    fn io_error_kind(&self) -> IoErrorKind {
        match self {
            Self::Framing(FramingError::UnexpectedEof) => IoErrorKind::UnexpectedEof,
            Self::Framing(_) => IoErrorKind::InvalidData,
            Self::Sequencing(_) => IoErrorKind::Other,
            Self::Contract(_) => IoErrorKind::InvalidInput,
            Self::Transport(err) => err.kind(),
        }
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for ExchangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Framing(FramingError::InvalidChunk(err)) => Some(err),
            Self::Framing(FramingError::InvalidRequestFraming(err)) => Some(err),
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FramingError> for ExchangeError {
    fn from(err: FramingError) -> Self {
        Self::Framing(err)
    }
}

impl From<HeaderError> for ExchangeError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::Frozen => Self::Sequencing("response headers already sent"),
            HeaderError::InvalidName => Self::Contract("invalid header name"),
            HeaderError::InvalidValue => Self::Contract("invalid header value"),
        }
    }
}

// Stream operations report through io::Error; the exchange error rides inside it.
impl From<ExchangeError> for IoError {
    fn from(err: ExchangeError) -> IoError {
        match err {
            ExchangeError::Transport(err) => err,
            err => IoError::new(err.io_error_kind(), err),
        }
    }
}

impl From<IoError> for ExchangeError {
    fn from(err: IoError) -> Self {
        if err
            .get_ref()
            .map(|inner| inner.is::<ExchangeError>())
            .unwrap_or(false)
        {
            if let Some(inner) = err.into_inner() {
                if let Ok(err) = inner.downcast::<ExchangeError>() {
                    return *err;
                }
            }
            return Self::Transport(IoError::new(IoErrorKind::Other, "lost exchange error"));
        }
        Self::Transport(err)
    }
}
