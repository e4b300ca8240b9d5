use core::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};

use async_sleep::{rw::AsyncReadWithTimeoutExt as _, Sleepble};
use futures_io::{AsyncRead, AsyncWrite};
use futures_util::{ready, AsyncWriteExt as _};

use crate::config::BUF_CAPACITY_DEFAULT;

//
//
//
pub type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

pub struct Wire {
    reader: BoxedRead,
    writer: BoxedWrite,
    buf: Vec<u8>,
    offset_read: usize,
    offset_parsed: usize,
}

impl core::fmt::Debug for Wire {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Wire")
            .field("buf_capacity", &self.buf.len())
            .field("offset_read", &self.offset_read)
            .field("offset_parsed", &self.offset_parsed)
            .finish()
    }
}

impl Wire {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_capacity(reader, writer, BUF_CAPACITY_DEFAULT)
    }

    pub fn with_capacity<R, W>(reader: R, writer: W, buf_capacity: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            buf: vec![0u8; buf_capacity],
            offset_read: 0,
            offset_parsed: 0,
        }
    }

    pub fn has_unparsed_bytes(&self) -> bool {
        self.offset_read > self.offset_parsed
    }

    //
    pub(crate) fn unparsed(&self) -> &[u8] {
        &self.buf[self.offset_parsed..self.offset_read]
    }

    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(self.offset_parsed + n <= self.offset_read);
        self.offset_parsed += n;
        if self.offset_parsed == self.offset_read {
            self.offset_parsed = 0;
            self.offset_read = 0;
        }
    }

    fn rotate_offset(&mut self) -> Result<(), IoError> {
        if self.offset_parsed > 0 {
            self.buf
                .copy_within(self.offset_parsed..self.offset_read, 0);
            self.offset_read -= self.offset_parsed;
            self.offset_parsed = 0;
        }
        if self.offset_read >= self.buf.len() {
            return Err(IoError::new(IoErrorKind::InvalidInput, "override buf"));
        }
        Ok(())
    }

    /// Reads more bytes into the buffer. `Ok(0)` means the peer closed.
    pub(crate) fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<Result<usize, IoError>> {
        self.rotate_offset()?;

        let n = ready!(Pin::new(&mut self.reader).poll_read(cx, &mut self.buf[self.offset_read..]))?;
        self.offset_read += n;
        Poll::Ready(Ok(n))
    }

    pub(crate) async fn fill_with_timeout<SLEEP: Sleepble>(
        &mut self,
        dur: Duration,
    ) -> Result<usize, IoError> {
        self.rotate_offset()?;

        let n = self
            .reader
            .read_with_timeout::<SLEEP>(&mut self.buf[self.offset_read..], dur)
            .await?;
        self.offset_read += n;
        Ok(n)
    }

    //
    pub(crate) fn poll_write(
        &mut self,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, IoError>> {
        Pin::new(&mut self.writer).poll_write(cx, buf)
    }

    pub(crate) fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        Pin::new(&mut self.writer).poll_flush(cx)
    }

    pub(crate) fn poll_write_pending(
        &mut self,
        cx: &mut Context<'_>,
        out: &mut Vec<u8>,
        pos: &mut usize,
    ) -> Poll<Result<(), IoError>> {
        while *pos < out.len() {
            let n = ready!(self.poll_write(cx, &out[*pos..]))?;
            if n == 0 {
                return Poll::Ready(Err(IoError::new(IoErrorKind::WriteZero, "write 0")));
            }
            *pos += n;
        }
        out.clear();
        *pos = 0;
        Poll::Ready(Ok(()))
    }

    pub(crate) async fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    pub(crate) async fn close(&mut self) -> Result<(), IoError> {
        self.writer.close().await
    }
}
