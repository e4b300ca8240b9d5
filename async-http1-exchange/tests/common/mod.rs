#![allow(dead_code)]

use core::{
    pin::Pin,
    task::{Context, Poll},
};
use std::{
    io,
    sync::{Arc, Mutex},
};

use futures_util::{io::Cursor, AsyncWrite};

use async_http1_exchange::{
    http1_exchange_spec::{
        head_parser::HeadParseOutput,
        request_head_parser::RequestHeadParser,
    },
    HttpExchange, RequestHead, Wire,
};

//
//
//
/// Collects everything written to it; clones share the same buffer.
#[derive(Clone, Default)]
pub struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
    pub fn string(&self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }
}

impl AsyncWrite for SharedWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub fn wire(input: impl Into<Vec<u8>>) -> (Wire, SharedWriter) {
    let writer = SharedWriter::default();
    let wire = Wire::new(Cursor::new(input.into()), writer.clone());
    (wire, writer)
}

/// Parses the request head out of `input`; whatever follows it is left
/// on the wire for the body.
pub fn exchange(input: impl Into<Vec<u8>>) -> (HttpExchange, SharedWriter) {
    let input = input.into();

    let mut parser = RequestHeadParser::new();
    let n = match parser.parse(&mut &input[..]).unwrap() {
        HeadParseOutput::Completed(n) => n,
        HeadParseOutput::Partial(_) => panic!("incomplete request head"),
    };
    let head = RequestHead {
        method: parser.method.clone(),
        uri: parser.uri.clone(),
        version: parser.http_version,
        headers: parser.take_headers(),
    };

    let (wire, writer) = wire(input[n..].to_vec());
    let exchange = HttpExchange::builder(head, wire).build().unwrap();
    (exchange, writer)
}

/// Splits a response into head and body at the first empty line.
pub fn split_response(output: &str) -> (&str, &str) {
    output.split_once("\r\n\r\n").unwrap()
}
