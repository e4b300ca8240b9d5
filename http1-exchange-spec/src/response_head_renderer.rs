use std::io;

use http::StatusCode;

use crate::{headers::Headers, COLON, CRLF, HTTP_VERSION_11, SP};

//
//
//
#[derive(Debug)]
pub struct ResponseHead<'a> {
    pub status_code: u16,
    pub reason_phrase: Option<&'a str>,
    pub headers: &'a Headers,
}

#[derive(Default)]
pub struct ResponseHeadRenderer {}

impl ResponseHeadRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, head: ResponseHead<'_>, buf: &mut Vec<u8>) -> io::Result<()> {
        if !(100..=999).contains(&head.status_code) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "status code out of range",
            ));
        }

        buf.extend_from_slice(HTTP_VERSION_11);
        buf.extend_from_slice(&[SP]);
        buf.extend_from_slice(head.status_code.to_string().as_bytes());
        buf.extend_from_slice(&[SP]);
        if let Some(reason_phrase) = head.reason_phrase.or_else(|| {
            StatusCode::from_u16(head.status_code)
                .ok()
                .and_then(|x| x.canonical_reason())
        }) {
            buf.extend_from_slice(reason_phrase.as_bytes());
        }
        buf.extend_from_slice(CRLF);

        for (name, values) in head.headers.iter() {
            for value in values {
                buf.extend_from_slice(name.as_bytes());
                buf.extend_from_slice(&[COLON, SP]);
                buf.extend_from_slice(value.as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }

        buf.extend_from_slice(CRLF);

        Ok(())
    }
}
