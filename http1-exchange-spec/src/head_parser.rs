use std::{
    cmp, error, fmt,
    io::{self, BufRead, Read as _},
};

use http::{
    header::{HeaderName, InvalidHeaderName},
    method::InvalidMethod,
    uri::InvalidUri,
    Method, Uri, Version,
};

use crate::{headers::Headers, COLON, CR, CRLF, HTAB, HTTP_VERSION_10, HTTP_VERSION_11, LF, SP};

//
//
//
const HTTP_VERSION_LEN: usize = 8;

const HEADERS_MAX_LEN: usize = 65535;
const URI_MAX_LEN: usize = 8192;

#[derive(Debug, Clone)]
pub struct HeadParseConfig {
    header_max_len: usize,
    headers_max_len: usize,
    method_max_len: usize,
    uri_max_len: usize,
}
impl Default for HeadParseConfig {
    fn default() -> Self {
        Self {
            header_max_len: 1024,
            headers_max_len: 8192,
            method_max_len: 16,
            uri_max_len: 2048,
        }
    }
}
impl HeadParseConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn buf_capacity(&self) -> usize {
        cmp::max(self.header_max_len, self.uri_max_len) + CRLF.len()
    }

    pub fn set_header_max_len(&mut self, value: u16) -> &mut Self {
        self.header_max_len = value as usize;
        self
    }
    pub fn get_header_max_len(&self) -> usize {
        self.header_max_len
    }
    pub fn set_headers_max_len(&mut self, value: u16) -> &mut Self {
        self.headers_max_len = cmp::min(value as usize, HEADERS_MAX_LEN);
        self
    }
    pub fn get_headers_max_len(&self) -> usize {
        self.headers_max_len
    }
    pub fn set_method_max_len(&mut self, value: u8) -> &mut Self {
        self.method_max_len = value as usize;
        self
    }
    pub fn get_method_max_len(&self) -> usize {
        self.method_max_len
    }
    pub fn set_uri_max_len(&mut self, value: u16) -> &mut Self {
        self.uri_max_len = cmp::min(value as usize, URI_MAX_LEN);
        self
    }
    pub fn get_uri_max_len(&self) -> usize {
        self.uri_max_len
    }
}

//
//
//
#[derive(Debug, PartialEq, Eq)]
pub enum HeadParseOutput {
    Completed(usize),
    Partial(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadPart {
    Method,
    Uri,
    HttpVersion,
    Header,
}

#[derive(Debug)]
pub enum HeadParseError {
    ReadError(io::Error),
    TooLong(HeadPart),
    TooLongHeaders,
    InvalidCRLF,
    InvalidMethod(InvalidMethod),
    InvalidUri(InvalidUri),
    InvalidHttpVersion,
    InvalidHeader,
    InvalidHeaderName(InvalidHeaderName),
    InvalidHeaderValue,
}
impl fmt::Display for HeadParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
impl error::Error for HeadParseError {}
impl From<HeadParseError> for io::Error {
    fn from(err: HeadParseError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
    }
}

//
//
//
enum Token {
    Complete(usize),
    Incomplete,
    Overflow,
}

fn read_token<R: BufRead>(
    r: &mut R,
    buf: &mut Vec<u8>,
    delimiter: u8,
    limit: usize,
) -> Result<Token, HeadParseError> {
    buf.clear();
    let n = r
        .by_ref()
        .take(limit as u64)
        .read_until(delimiter, buf)
        .map_err(HeadParseError::ReadError)?;

    Ok(if buf.last() == Some(&delimiter) {
        Token::Complete(n)
    } else if n >= limit {
        Token::Overflow
    } else {
        Token::Incomplete
    })
}

fn read_line<R: BufRead>(
    r: &mut R,
    buf: &mut Vec<u8>,
    max_len: usize,
    part: HeadPart,
) -> Result<Option<usize>, HeadParseError> {
    match read_token(r, buf, LF, max_len + CRLF.len())? {
        Token::Complete(n) if n >= CRLF.len() && buf[n - CRLF.len()] == CR => Ok(Some(n)),
        Token::Complete(_) => Err(HeadParseError::InvalidCRLF),
        Token::Incomplete => Ok(None),
        Token::Overflow => Err(HeadParseError::TooLong(part)),
    }
}

pub(crate) fn parse_method<R: BufRead>(
    r: &mut R,
    buf: &mut Vec<u8>,
    config: &HeadParseConfig,
) -> Result<Option<(Method, usize)>, HeadParseError> {
    match read_token(r, buf, SP, config.get_method_max_len() + 1)? {
        Token::Complete(n) => {
            let method = Method::from_bytes(&buf[..n - 1]).map_err(HeadParseError::InvalidMethod)?;
            Ok(Some((method, n)))
        }
        Token::Incomplete => Ok(None),
        Token::Overflow => Err(HeadParseError::TooLong(HeadPart::Method)),
    }
}

pub(crate) fn parse_uri<R: BufRead>(
    r: &mut R,
    buf: &mut Vec<u8>,
    config: &HeadParseConfig,
) -> Result<Option<(Uri, usize)>, HeadParseError> {
    match read_token(r, buf, SP, config.get_uri_max_len() + 1)? {
        Token::Complete(n) => {
            let uri = Uri::try_from(&buf[..n - 1]).map_err(HeadParseError::InvalidUri)?;
            Ok(Some((uri, n)))
        }
        Token::Incomplete => Ok(None),
        Token::Overflow => Err(HeadParseError::TooLong(HeadPart::Uri)),
    }
}

pub(crate) fn parse_http_version<R: BufRead>(
    r: &mut R,
    buf: &mut Vec<u8>,
) -> Result<Option<(Version, usize)>, HeadParseError> {
    let n = match read_line(r, buf, HTTP_VERSION_LEN, HeadPart::HttpVersion)? {
        Some(n) => n,
        None => return Ok(None),
    };
    let version = match &buf[..n - CRLF.len()] {
        HTTP_VERSION_10 => Version::HTTP_10,
        HTTP_VERSION_11 => Version::HTTP_11,
        _ => return Err(HeadParseError::InvalidHttpVersion),
    };
    Ok(Some((version, n)))
}

pub(crate) enum HeaderLine {
    Field(usize),
    End(usize),
}

pub(crate) fn parse_header_line<R: BufRead>(
    r: &mut R,
    buf: &mut Vec<u8>,
    config: &HeadParseConfig,
    headers: &mut Headers,
    headers_len: &mut usize,
) -> Result<Option<HeaderLine>, HeadParseError> {
    let n = match read_line(r, buf, config.get_header_max_len(), HeadPart::Header)? {
        Some(n) => n,
        None => return Ok(None),
    };

    *headers_len += n;
    if *headers_len > config.get_headers_max_len() {
        return Err(HeadParseError::TooLongHeaders);
    }

    let line = &buf[..n - CRLF.len()];
    if line.is_empty() {
        return Ok(Some(HeaderLine::End(n)));
    }
    if line[0] == SP || line[0] == HTAB {
        return Err(HeadParseError::InvalidHeader);
    }

    let colon = line
        .iter()
        .position(|x| *x == COLON)
        .ok_or(HeadParseError::InvalidHeader)?;
    let name = HeaderName::from_bytes(&line[..colon]).map_err(HeadParseError::InvalidHeaderName)?;
    let value = String::from_utf8_lossy(trim_ows(&line[colon + 1..]));

    headers
        .add(name.as_str(), value)
        .map_err(|_| HeadParseError::InvalidHeaderValue)?;
    Ok(Some(HeaderLine::Field(n)))
}

fn trim_ows(bytes: &[u8]) -> &[u8] {
    let is_ows = |x: &u8| *x == SP || *x == HTAB;
    let start = bytes.iter().position(|x| !is_ows(x)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|x| !is_ows(x)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error;

    fn header_line(bytes: &[u8]) -> Result<(Headers, usize), HeadParseError> {
        let mut buf = Vec::new();
        let mut headers = Headers::new();
        let mut headers_len = 0;
        parse_header_line(
            &mut &bytes[..],
            &mut buf,
            &HeadParseConfig::default(),
            &mut headers,
            &mut headers_len,
        )?;
        Ok((headers, headers_len))
    }

    #[test]
    fn header_with_multi_colon() -> Result<(), Box<dyn Error>> {
        let (headers, headers_len) = header_line(b"Foo: Bar:Bar \r\n")?;
        assert_eq!(headers.get("foo"), Some(&["Bar:Bar".to_owned()][..]));
        assert_eq!(headers_len, 15);

        Ok(())
    }

    #[test]
    fn header_with_empty_value() -> Result<(), Box<dyn Error>> {
        let (headers, _) = header_line(b"Cookie:\r\n")?;
        assert_eq!(headers.first("Cookie"), Some(""));

        Ok(())
    }

    #[test]
    fn header_errors() {
        assert!(matches!(
            header_line(b"Foo\r\n"),
            Err(HeadParseError::InvalidHeader)
        ));
        assert!(matches!(
            header_line(b"Foo: x\n"),
            Err(HeadParseError::InvalidCRLF)
        ));
        assert!(matches!(
            header_line(b"Fo o: x\r\n"),
            Err(HeadParseError::InvalidHeaderName(_))
        ));
        let long = [&[b'a'; 2000][..], b": x\r\n"].concat();
        assert!(matches!(
            header_line(&long),
            Err(HeadParseError::TooLong(HeadPart::Header))
        ));
    }

    #[test]
    fn method_too_long() {
        let mut buf = Vec::new();
        assert!(matches!(
            parse_method(
                &mut &b"ABCDEFGHIJKLMNOPQRSTUVWXYZ / HTTP/1.1\r\n"[..],
                &mut buf,
                &HeadParseConfig::default()
            ),
            Err(HeadParseError::TooLong(HeadPart::Method))
        ));
    }

    #[test]
    fn trim() {
        assert_eq!(trim_ows(b" \tfoo bar\t "), b"foo bar");
        assert_eq!(trim_ows(b"   "), b"");
        assert_eq!(trim_ows(b""), b"");
    }
}
