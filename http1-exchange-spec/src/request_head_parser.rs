use std::io::BufRead;

use http::{Method, Uri, Version};

use crate::{
    head_parser::{
        parse_header_line, parse_http_version, parse_method, parse_uri, HeadParseConfig,
        HeadParseError, HeadParseOutput, HeaderLine,
    },
    headers::Headers,
};

//
//
//
#[derive(Default)]
pub struct RequestHeadParser {
    pub method: Method,
    pub uri: Uri,
    pub http_version: Version,
    pub headers: Headers,
    //
    config: HeadParseConfig,
    next: Next,
    buf: Vec<u8>,
    headers_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Next {
    #[default]
    Method,
    Uri,
    HttpVersion,
    Header,
}

impl RequestHeadParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HeadParseConfig) -> Self {
        Self {
            buf: Vec::with_capacity(config.buf_capacity()),
            config,
            ..Default::default()
        }
    }

    pub fn take_headers(&mut self) -> Headers {
        std::mem::take(&mut self.headers)
    }

    pub fn parse<R: BufRead>(&mut self, r: &mut R) -> Result<HeadParseOutput, HeadParseError> {
        let mut parsed_num_bytes = 0;

        loop {
            let n = match self.next {
                Next::Method => parse_method(r, &mut self.buf, &self.config)?.map(|(x, n)| {
                    self.method = x;
                    self.next = Next::Uri;
                    n
                }),
                Next::Uri => parse_uri(r, &mut self.buf, &self.config)?.map(|(x, n)| {
                    self.uri = x;
                    self.next = Next::HttpVersion;
                    n
                }),
                Next::HttpVersion => parse_http_version(r, &mut self.buf)?.map(|(x, n)| {
                    self.http_version = x;
                    self.headers = Headers::new();
                    self.headers_len = 0;
                    self.next = Next::Header;
                    n
                }),
                Next::Header => match parse_header_line(
                    r,
                    &mut self.buf,
                    &self.config,
                    &mut self.headers,
                    &mut self.headers_len,
                )? {
                    Some(HeaderLine::Field(n)) => Some(n),
                    Some(HeaderLine::End(n)) => {
                        self.next = Next::Method;
                        return Ok(HeadParseOutput::Completed(parsed_num_bytes + n));
                    }
                    None => None,
                },
            };

            match n {
                Some(n) => parsed_num_bytes += n,
                None => return Ok(HeadParseOutput::Partial(parsed_num_bytes)),
            }
        }
    }
}
