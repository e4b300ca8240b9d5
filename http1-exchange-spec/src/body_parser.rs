use core::num::ParseIntError;
use std::io::{BufRead, Error as IoError, ErrorKind as IoErrorKind};

//
//
//
#[derive(Debug, PartialEq, Eq)]
pub enum BodyParseOutput {
    Completed(usize),
    Partial(usize),
}

impl BodyParseOutput {
    pub fn parsed_num_bytes(&self) -> usize {
        match self {
            Self::Completed(n) | Self::Partial(n) => *n,
        }
    }
}

#[derive(Debug)]
pub enum BodyParseError {
    ReadError(IoError),
    TooLongChunksOfLength,
    InvalidChunksOfLength(Option<ParseIntError>),
    TooLongTrailer,
    InvalidCRLF,
}
impl core::fmt::Display for BodyParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for BodyParseError {}
impl From<BodyParseError> for IoError {
    fn from(err: BodyParseError) -> IoError {
        IoError::new(IoErrorKind::InvalidData, err.to_string())
    }
}

//
//
//
/// Bytes read from `r` past the reported count must be fed again.
pub trait BodyParser {
    fn parse<R: BufRead>(
        &mut self,
        r: &mut R,
        body_buf: &mut Vec<u8>,
    ) -> Result<BodyParseOutput, BodyParseError>;

    fn is_completed(&self) -> bool;
}
