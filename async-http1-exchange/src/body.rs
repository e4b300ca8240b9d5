use core::{
    cmp::min,
    pin::Pin,
    task::{Context, Poll},
};
use std::{
    io::{Error as IoError, ErrorKind as IoErrorKind},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures_io::{AsyncRead, AsyncWrite};
use futures_util::ready;
use http1_exchange_spec::{
    body_framing::BodyFraming,
    body_parser::{BodyParseOutput, BodyParser},
    chunked_body_parser::ChunkedBodyParser,
    chunked_body_renderer::{render_chunk, render_last_chunk},
    content_length_body_parser::ContentLengthBodyParser,
};
use tracing::{debug, trace, warn};

use crate::{
    error::{ExchangeError, FramingError},
    state::{ExchangeState, Phase, RequestBodyState},
    wire::Wire,
};

const DRAIN_CHUNK_LEN: usize = 4 * 1024;

//
//
//
enum RequestDecoder {
    ContentLength(ContentLengthBodyParser),
    Chunked(ChunkedBodyParser),
    Neither,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseEncoder {
    Pending,
    ContentLength { remaining: u64 },
    Chunked,
    CloseDelimited,
    Neither,
}

pub(crate) struct Transaction {
    wire: Wire,
    state: ExchangeState,
    //
    decoder: RequestDecoder,
    decoded: Vec<u8>,
    decoded_pos: usize,
    request_done: bool,
    read_failed: bool,
    request_closed: bool,
    //
    encoder: ResponseEncoder,
    out_buf: Vec<u8>,
    out_pos: usize,
    last_chunk_queued: bool,
    write_failed: bool,
    //
    drained: u64,
    drain_limit: u64,
}

impl Transaction {
    pub(crate) fn new(wire: Wire, request_framing: BodyFraming, drain_limit: u64) -> Self {
        let (decoder, request_done) = match request_framing {
            BodyFraming::ContentLength(0) | BodyFraming::Neither => (RequestDecoder::Neither, true),
            BodyFraming::ContentLength(n) => (
                RequestDecoder::ContentLength(ContentLengthBodyParser::with_length(n)),
                false,
            ),
            BodyFraming::Chunked => (RequestDecoder::Chunked(ChunkedBodyParser::new()), false),
        };

        let mut state = ExchangeState::new();
        if request_done {
            state.request_body_read(0, true);
        }

        Self {
            wire,
            state,
            decoder,
            decoded: Vec::new(),
            decoded_pos: 0,
            request_done,
            read_failed: false,
            request_closed: false,
            encoder: ResponseEncoder::Pending,
            out_buf: Vec::new(),
            out_pos: 0,
            last_chunk_queued: false,
            write_failed: false,
            drained: 0,
            drain_limit,
        }
    }

    pub(crate) fn state(&self) -> &ExchangeState {
        &self.state
    }
    pub(crate) fn state_mut(&mut self) -> &mut ExchangeState {
        &mut self.state
    }

    pub(crate) fn into_wire(self) -> Wire {
        self.wire
    }

    pub(crate) fn close_request(&mut self) {
        if self.request_closed {
            return;
        }
        self.request_closed = true;
        if !self.request_done {
            self.state.abandon_request_body();
        }
    }

    //
    fn fail_read(&mut self, err: ExchangeError) -> IoError {
        warn!(error = %err, "request body failed");
        self.read_failed = true;
        self.state.mark_broken();
        self.state.abandon_request_body();
        err.into()
    }

    fn fail_write(&mut self, err: ExchangeError) -> IoError {
        warn!(error = %err, "response body failed");
        self.write_failed = true;
        self.state.mark_broken();
        err.into()
    }

    pub(crate) fn poll_read_body(
        &mut self,
        cx: &mut Context<'_>,
        out: &mut [u8],
    ) -> Poll<Result<usize, IoError>> {
        if self.read_failed {
            return Poll::Ready(Err(IoError::new(
                IoErrorKind::BrokenPipe,
                "request body failed",
            )));
        }
        if self.request_closed {
            if self.state.request_body_state() == RequestBodyState::Abandoned {
                return Poll::Ready(Err(IoError::new(
                    IoErrorKind::BrokenPipe,
                    "request body abandoned",
                )));
            }
            return Poll::Ready(Ok(0));
        }
        if out.is_empty() {
            return Poll::Ready(Ok(0));
        }

        loop {
            if self.decoded_pos < self.decoded.len() {
                let n = min(out.len(), self.decoded.len() - self.decoded_pos);
                out[..n].copy_from_slice(&self.decoded[self.decoded_pos..self.decoded_pos + n]);
                self.decoded_pos += n;

                let completed = self.request_done && self.decoded_pos == self.decoded.len();
                self.state.request_body_read(n, completed);
                return Poll::Ready(Ok(n));
            }
            if self.request_done {
                self.state.request_body_read(0, true);
                return Poll::Ready(Ok(0));
            }

            self.decoded.clear();
            self.decoded_pos = 0;

            if self.wire.has_unparsed_bytes() {
                let mut unparsed = self.wire.unparsed();
                let output = match &mut self.decoder {
                    RequestDecoder::ContentLength(p) => p.parse(&mut unparsed, &mut self.decoded),
                    RequestDecoder::Chunked(p) => p.parse(&mut unparsed, &mut self.decoded),
                    RequestDecoder::Neither => Ok(BodyParseOutput::Completed(0)),
                };
                match output {
                    Ok(output) => {
                        let n_parsed = output.parsed_num_bytes();
                        self.wire.consume(n_parsed);
                        if let BodyParseOutput::Completed(_) = output {
                            self.request_done = true;
                        }
                        if n_parsed > 0 || self.request_done {
                            continue;
                        }
                    }
                    Err(err) => {
                        return Poll::Ready(Err(
                            self.fail_read(FramingError::InvalidChunk(err).into())
                        ));
                    }
                }
            }

            match ready!(self.wire.poll_fill(cx)) {
                Ok(0) => {
                    return Poll::Ready(Err(self.fail_read(FramingError::UnexpectedEof.into())));
                }
                Ok(_) => continue,
                Err(err) => return Poll::Ready(Err(self.fail_read(ExchangeError::Transport(err)))),
            }
        }
    }

    //
    pub(crate) fn start_response(
        &mut self,
        status_code: u16,
        framing: BodyFraming,
        encoder: ResponseEncoder,
        head: Vec<u8>,
    ) -> Result<(), ExchangeError> {
        self.state.send_headers(status_code, framing)?;
        self.encoder = encoder;
        self.out_buf.extend_from_slice(&head);
        Ok(())
    }

    fn poll_write_pending(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        self.wire
            .poll_write_pending(cx, &mut self.out_buf, &mut self.out_pos)
    }

    pub(crate) fn poll_flush_head(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        if self.write_failed {
            return Poll::Ready(Err(IoError::new(
                IoErrorKind::BrokenPipe,
                "response body failed",
            )));
        }
        if let Err(err) = ready!(self.poll_write_pending(cx)) {
            return Poll::Ready(Err(self.fail_write(ExchangeError::Transport(err))));
        }
        if let Err(err) = ready!(self.wire.poll_flush(cx)) {
            return Poll::Ready(Err(self.fail_write(ExchangeError::Transport(err))));
        }
        Poll::Ready(Ok(()))
    }

    fn check_writable(&self) -> Result<(), ExchangeError> {
        self.state.ensure_headers_sent()?;
        if self.state.phase() >= Phase::OutputClosed {
            return Err(ExchangeError::Sequencing("response body already closed"));
        }
        Ok(())
    }

    pub(crate) fn poll_write_body(
        &mut self,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<Result<usize, IoError>> {
        if self.write_failed {
            return Poll::Ready(Err(IoError::new(
                IoErrorKind::BrokenPipe,
                "response body failed",
            )));
        }
        if let Err(err) = self.check_writable() {
            return Poll::Ready(Err(err.into()));
        }
        if self.encoder == ResponseEncoder::Neither {
            return Poll::Ready(Err(
                ExchangeError::Contract("response has no body").into()
            ));
        }
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }

        if let Err(err) = ready!(self.poll_write_pending(cx)) {
            return Poll::Ready(Err(self.fail_write(ExchangeError::Transport(err))));
        }

        match self.encoder {
            ResponseEncoder::ContentLength { remaining } => {
                if data.len() as u64 > remaining {
                    return Poll::Ready(Err(self.fail_write(
                        FramingError::TooManyBytes {
                            remaining,
                            attempted: data.len(),
                        }
                        .into(),
                    )));
                }
                match ready!(self.wire.poll_write(cx, data)) {
                    Ok(n) => {
                        self.encoder = ResponseEncoder::ContentLength {
                            remaining: remaining - n as u64,
                        };
                        Poll::Ready(Ok(n))
                    }
                    Err(err) => Poll::Ready(Err(self.fail_write(ExchangeError::Transport(err)))),
                }
            }
            ResponseEncoder::Chunked => {
                render_chunk(data, &mut self.out_buf);
                trace!(len = data.len(), "chunk queued");
                if let Poll::Ready(Err(err)) = self.poll_write_pending(cx) {
                    return Poll::Ready(Err(self.fail_write(ExchangeError::Transport(err))));
                }
                Poll::Ready(Ok(data.len()))
            }
            ResponseEncoder::CloseDelimited => match ready!(self.wire.poll_write(cx, data)) {
                Ok(n) => Poll::Ready(Ok(n)),
                Err(err) => Poll::Ready(Err(self.fail_write(ExchangeError::Transport(err)))),
            },
            ResponseEncoder::Neither | ResponseEncoder::Pending => Poll::Ready(Err(
                ExchangeError::Sequencing("response headers not sent").into(),
            )),
        }
    }

    pub(crate) fn poll_flush_body(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        if self.write_failed {
            return Poll::Ready(Err(IoError::new(
                IoErrorKind::BrokenPipe,
                "response body failed",
            )));
        }
        if self.state.ensure_headers_sent().is_err() {
            return Poll::Ready(Ok(()));
        }
        self.poll_flush_head(cx)
    }

    pub(crate) fn poll_close_body(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        if self.state.phase() >= Phase::OutputClosed {
            return Poll::Ready(Ok(()));
        }
        if let Err(err) = self.state.ensure_headers_sent() {
            return Poll::Ready(Err(err.into()));
        }
        if self.write_failed {
            self.state.output_closed(false);
            self.close_request();
            return Poll::Ready(Ok(()));
        }

        match self.encoder {
            ResponseEncoder::ContentLength { remaining } if remaining > 0 => {
                self.state.output_closed(false);
                self.close_request();
                return Poll::Ready(Err(self.fail_write(
                    FramingError::TooFewBytes { missing: remaining }.into(),
                )));
            }
            ResponseEncoder::Chunked if !self.last_chunk_queued => {
                render_last_chunk(&mut self.out_buf);
                self.last_chunk_queued = true;
            }
            _ => {}
        }

        if let Err(err) = ready!(self.poll_flush_head(cx)) {
            self.state.output_closed(false);
            self.close_request();
            return Poll::Ready(Err(err));
        }

        ready!(self.poll_drain(cx));
        self.close_request();

        let exact = self.encoder != ResponseEncoder::CloseDelimited;
        self.state.output_closed(exact);
        debug!(
            status = self.state.status_code(),
            drained = self.drained,
            request_body = ?self.state.request_body_state(),
            "response body closed"
        );

        Poll::Ready(Ok(()))
    }

    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let mut scratch = [0u8; DRAIN_CHUNK_LEN];
        loop {
            if self.read_failed {
                return Poll::Ready(());
            }
            if self.drained > self.drain_limit && !self.request_done {
                debug!(drained = self.drained, "request body abandoned");
                self.state.abandon_request_body();
                return Poll::Ready(());
            }
            match ready!(self.poll_read_body(cx, &mut scratch)) {
                Ok(0) => return Poll::Ready(()),
                Ok(n) => self.drained += n as u64,
                Err(_) => return Poll::Ready(()),
            }
        }
    }
}

//
//
//
#[derive(Clone)]
pub(crate) struct SharedTransaction(Arc<Mutex<Transaction>>);

impl SharedTransaction {
    pub(crate) fn new(transaction: Transaction) -> Self {
        Self(Arc::new(Mutex::new(transaction)))
    }

    // One exchange is driven by one task; a poisoned lock only means a
    // panic already unwound through it.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Transaction> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn try_unwrap(self) -> Option<Transaction> {
        Arc::try_unwrap(self.0)
            .ok()
            .map(|x| x.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

pub struct RequestBody {
    transaction: SharedTransaction,
}

impl RequestBody {
    pub(crate) fn new(transaction: SharedTransaction) -> Self {
        Self { transaction }
    }
}

impl AsyncRead for RequestBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<Result<usize, IoError>> {
        self.transaction.lock().poll_read_body(cx, buf)
    }
}

pub struct ResponseBody {
    transaction: SharedTransaction,
}

impl ResponseBody {
    pub(crate) fn new(transaction: SharedTransaction) -> Self {
        Self { transaction }
    }
}

impl AsyncWrite for ResponseBody {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, IoError>> {
        self.transaction.lock().poll_write_body(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        self.transaction.lock().poll_flush_body(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        self.transaction.lock().poll_close_body(cx)
    }
}
