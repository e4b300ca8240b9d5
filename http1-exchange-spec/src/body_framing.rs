use std::io;

use http::Version;

use crate::{headers::Headers, CHUNKED};

//
//
//
// ref https://github.com/apple/swift-nio/blob/2.20.2/Sources/NIOHTTP1/HTTPEncoder.swift#L89
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BodyFraming {
    ContentLength(u64),
    Chunked,
    Neither,
}

impl BodyFraming {
    /// Decodes the single-integer response length contract:
    /// `> 0` fixed length, `0` chunked, `<= -1` no body.
    pub fn from_response_length(value: i64) -> Self {
        match value {
            n if n > 0 => Self::ContentLength(n as u64),
            0 => Self::Chunked,
            _ => Self::Neither,
        }
    }

    pub fn has_body(&self) -> bool {
        match self {
            Self::ContentLength(n) => *n > 0,
            Self::Chunked => true,
            Self::Neither => false,
        }
    }
}

//
//
//
pub trait BodyFramingDetector {
    fn detect(&self) -> io::Result<BodyFraming>;
}
impl BodyFramingDetector for (&Headers, &Version) {
    fn detect(&self) -> io::Result<BodyFraming> {
        let (headers, version) = *self;

        if let Some(values) = headers.get("Transfer-Encoding") {
            if version != &Version::HTTP_11 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Transfer-Encoding only valid in HTTP/1.1",
                ));
            }
            let last_coding = values
                .iter()
                .flat_map(|value| value.split(','))
                .map(|x| x.trim())
                .filter(|x| !x.is_empty())
                .last();
            return match last_coding {
                Some(coding) if coding.eq_ignore_ascii_case(CHUNKED) => Ok(BodyFraming::Chunked),
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Transfer-Encoding without final chunked",
                )),
            };
        }

        if let Some(values) = headers.get("Content-Length") {
            let mut content_length: Option<u64> = None;
            for value in values.iter().flat_map(|value| value.split(',')) {
                let value = value.trim();
                if value.is_empty() || !value.bytes().all(|x| x.is_ascii_digit()) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "invalid Content-Length",
                    ));
                }
                let n: u64 = value
                    .parse()
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
                match content_length {
                    Some(prev) if prev != n => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "conflicting Content-Length",
                        ))
                    }
                    _ => content_length = Some(n),
                }
            }
            if let Some(n) = content_length {
                return Ok(BodyFraming::ContentLength(n));
            }
        }

        Ok(BodyFraming::Neither)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect() -> io::Result<()> {
        let mut headers = Headers::new();

        headers.set("Content-Length", "1").unwrap();
        assert_eq!(
            (&headers, &Version::HTTP_11).detect()?,
            BodyFraming::ContentLength(1)
        );

        let mut headers = Headers::new();
        headers.set("Transfer-Encoding", "gzip, Chunked").unwrap();
        headers.set("Content-Length", "10").unwrap();
        assert_eq!(
            (&headers, &Version::HTTP_11).detect()?,
            BodyFraming::Chunked
        );
        assert!((&headers, &Version::HTTP_10).detect().is_err());

        assert_eq!(
            (&Headers::new(), &Version::HTTP_11).detect()?,
            BodyFraming::Neither
        );

        Ok(())
    }

    #[test]
    fn detect_invalid() {
        let mut headers = Headers::new();
        headers.set("Transfer-Encoding", "chunked, gzip").unwrap();
        assert!((&headers, &Version::HTTP_11).detect().is_err());

        let mut headers = Headers::new();
        headers.add("Content-Length", "3").unwrap();
        headers.add("Content-Length", "4").unwrap();
        assert!((&headers, &Version::HTTP_11).detect().is_err());

        let mut headers = Headers::new();
        headers.add("Content-Length", "3, 3").unwrap();
        assert_eq!(
            (&headers, &Version::HTTP_11).detect().unwrap(),
            BodyFraming::ContentLength(3)
        );

        let mut headers = Headers::new();
        headers.add("Content-Length", "+3").unwrap();
        assert!((&headers, &Version::HTTP_11).detect().is_err());
    }

    #[test]
    fn response_length() {
        assert_eq!(
            BodyFraming::from_response_length(5),
            BodyFraming::ContentLength(5)
        );
        assert_eq!(BodyFraming::from_response_length(0), BodyFraming::Chunked);
        assert_eq!(BodyFraming::from_response_length(-1), BodyFraming::Neither);
        assert_eq!(BodyFraming::from_response_length(-42), BodyFraming::Neither);
    }
}
