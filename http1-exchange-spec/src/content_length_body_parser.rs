use core::cmp::min;
use std::io::BufRead;

use crate::body_parser::{BodyParseError, BodyParseOutput, BodyParser};

//
//
//
pub struct ContentLengthBodyParser {
    length: u64,
}
impl ContentLengthBodyParser {
    pub fn with_length(length: u64) -> Self {
        Self { length }
    }
}

//
//
//
impl BodyParser for ContentLengthBodyParser {
    fn parse<R: BufRead>(
        &mut self,
        r: &mut R,
        body_buf: &mut Vec<u8>,
    ) -> Result<BodyParseOutput, BodyParseError> {
        if self.length == 0 {
            return Ok(BodyParseOutput::Completed(0));
        }

        let available = r.fill_buf().map_err(BodyParseError::ReadError)?;
        let n = min(available.len() as u64, self.length) as usize;
        body_buf.extend_from_slice(&available[..n]);
        r.consume(n);
        self.length -= n as u64;

        if self.length == 0 {
            Ok(BodyParseOutput::Completed(n))
        } else {
            Ok(BodyParseOutput::Partial(n))
        }
    }

    fn is_completed(&self) -> bool {
        self.length == 0
    }
}
