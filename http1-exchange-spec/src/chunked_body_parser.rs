use std::{
    io::{BufRead, Read},
    str,
};

use crate::body_parser::{BodyParseError, BodyParseOutput, BodyParser};
use crate::{CR, CRLF, HTAB, LF, SEMICOLON, SP};

//
//
//
const LENGTH_MAX_LEN: usize = 16; // b"FFFFFFFFFFFFFFFF"
const LINE_MAX_LEN: usize = 1024; // chunk-size + chunk-ext, or one trailer field

//
//
//
#[derive(Default)]
pub struct ChunkedBodyParser {
    //
    state: State,
    line_buf: Vec<u8>,
    length: u64,
    completed: bool,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
enum State {
    #[default]
    Idle,
    WaitLengthParse,
    WaitDataParse,
    WaitDataParsing,
    WaitCRLFParse,
    WaitTrailerParse,
}

impl ChunkedBodyParser {
    pub fn new() -> Self {
        Self {
            line_buf: Vec::with_capacity(LENGTH_MAX_LEN + 2),
            ..Default::default()
        }
    }

    fn parse_length(line: &[u8]) -> Result<u64, BodyParseError> {
        // chunk-ext is ignored
        let length_bytes = match line.iter().position(|x| x == &SEMICOLON) {
            Some(i) => &line[..i],
            None => line,
        };
        let end = length_bytes
            .iter()
            .rposition(|x| x != &SP && x != &HTAB)
            .map(|i| i + 1)
            .unwrap_or(0);
        let length_bytes = &length_bytes[..end];

        if length_bytes.len() > LENGTH_MAX_LEN {
            return Err(BodyParseError::TooLongChunksOfLength);
        }
        if length_bytes.is_empty() || !length_bytes.iter().all(|x| x.is_ascii_hexdigit()) {
            return Err(BodyParseError::InvalidChunksOfLength(None));
        }
        let length_str =
            str::from_utf8(length_bytes).map_err(|_| BodyParseError::InvalidChunksOfLength(None))?;
        u64::from_str_radix(length_str, 16)
            .map_err(|err| BodyParseError::InvalidChunksOfLength(Some(err)))
    }
}

//
//
//
impl BodyParser for ChunkedBodyParser {
    fn parse<R: BufRead>(
        &mut self,
        r: &mut R,
        body_buf: &mut Vec<u8>,
    ) -> Result<BodyParseOutput, BodyParseError> {
        let mut take = r.take(0);
        let mut parsed_num_bytes = 0_usize;

        loop {
            if self.state <= State::WaitLengthParse {
                if self.state == State::Idle {
                    self.completed = false;
                }

                let end_bytes_len = 2_usize;
                take.set_limit(LINE_MAX_LEN as u64 + end_bytes_len as u64);

                self.line_buf.clear();
                let n = take
                    .read_until(LF, &mut self.line_buf)
                    .map_err(BodyParseError::ReadError)?;

                if n < end_bytes_len {
                    self.state = State::WaitLengthParse;
                    return Ok(BodyParseOutput::Partial(parsed_num_bytes));
                }
                if !self.line_buf[..n].ends_with(&[LF]) {
                    if n >= LINE_MAX_LEN {
                        return Err(BodyParseError::TooLongChunksOfLength);
                    } else {
                        self.state = State::WaitLengthParse;
                        return Ok(BodyParseOutput::Partial(parsed_num_bytes));
                    }
                }
                if !self.line_buf[..n - 1].ends_with(&[CR]) {
                    return Err(BodyParseError::InvalidCRLF);
                }
                let length = Self::parse_length(&self.line_buf[..n - end_bytes_len])?;

                self.length = length;
                parsed_num_bytes += n;

                if length == 0 {
                    self.state = State::WaitTrailerParse;
                } else {
                    self.state = State::WaitDataParse;
                }
            }

            if self.state <= State::WaitDataParsing {
                take.set_limit(self.length);

                let available = take.fill_buf().map_err(BodyParseError::ReadError)?;
                let n = available.len();
                body_buf.extend_from_slice(available);
                take.consume(n);

                self.length -= n as u64;
                parsed_num_bytes += n;

                if self.length == 0 {
                    self.state = State::WaitCRLFParse;
                } else {
                    self.state = State::WaitDataParsing;

                    return Ok(BodyParseOutput::Partial(parsed_num_bytes));
                }
            }

            if self.state == State::WaitCRLFParse {
                let end_bytes_len = 2_usize;
                take.set_limit(end_bytes_len as u64);

                self.line_buf.clear();
                let n = take
                    .read_until(LF, &mut self.line_buf)
                    .map_err(BodyParseError::ReadError)?;
                if n < end_bytes_len {
                    return Ok(BodyParseOutput::Partial(parsed_num_bytes));
                }
                if &self.line_buf[..n] != CRLF {
                    return Err(BodyParseError::InvalidCRLF);
                }
                parsed_num_bytes += n;

                self.state = State::WaitLengthParse;
                continue;
            }

            if self.state == State::WaitTrailerParse {
                let end_bytes_len = 2_usize;
                take.set_limit(LINE_MAX_LEN as u64 + end_bytes_len as u64);

                self.line_buf.clear();
                let n = take
                    .read_until(LF, &mut self.line_buf)
                    .map_err(BodyParseError::ReadError)?;
                if n < end_bytes_len {
                    return Ok(BodyParseOutput::Partial(parsed_num_bytes));
                }
                if !self.line_buf[..n].ends_with(&[LF]) {
                    if n >= LINE_MAX_LEN {
                        return Err(BodyParseError::TooLongTrailer);
                    } else {
                        return Ok(BodyParseOutput::Partial(parsed_num_bytes));
                    }
                }
                if !self.line_buf[..n - 1].ends_with(&[CR]) {
                    return Err(BodyParseError::InvalidCRLF);
                }
                parsed_num_bytes += n;

                // trailer fields are discarded
                if n == end_bytes_len {
                    self.state = State::Idle;
                    self.completed = true;

                    break Ok(BodyParseOutput::Completed(parsed_num_bytes));
                }
                continue;
            }

            unreachable!()
        }
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}
