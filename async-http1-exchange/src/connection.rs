use core::marker::PhantomData;
use std::{
    io::{Error as IoError, ErrorKind as IoErrorKind},
    net::SocketAddr,
    sync::Arc,
};

use async_sleep::Sleepble;
use async_trait::async_trait;
use futures_io::{AsyncRead, AsyncWrite};
use http::Version;
use http1_exchange_spec::{
    body_framing::BodyFramingDetector as _,
    head_parser::{HeadParseError, HeadParseOutput},
    headers::Headers,
    request_head_parser::RequestHeadParser,
    response_head_renderer::{ResponseHead, ResponseHeadRenderer},
    CLOSE, CRLF,
};
use tracing::{debug, info, warn};

use crate::{
    config::ExchangeConfig,
    error::ExchangeError,
    exchange::{HttpContext, HttpExchange, RequestHead},
    principal::HttpPrincipal,
    wire::Wire,
};

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

//
//
//
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, exchange: &mut HttpExchange) -> Result<(), ExchangeError>;
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, head: &RequestHead) -> Option<HttpPrincipal>;
}

enum ReadHeadError {
    Parse(HeadParseError),
    Io(IoError),
}

//
//
//
pub struct Http1Connection<SLEEP> {
    wire: Option<Wire>,
    remote_address: SocketAddr,
    local_address: SocketAddr,
    config: ExchangeConfig,
    head_parser: RequestHeadParser,
    authenticator: Option<Arc<dyn Authenticator>>,
    context: Option<HttpContext>,
    served: usize,
    phantom: PhantomData<SLEEP>,
}

impl<SLEEP> core::fmt::Debug for Http1Connection<SLEEP> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Http1Connection")
            .field("remote_address", &self.remote_address)
            .field("local_address", &self.local_address)
            .field("served", &self.served)
            .finish()
    }
}

impl<SLEEP> Http1Connection<SLEEP>
where
    SLEEP: Sleepble,
{
    pub fn new(wire: Wire, remote_address: SocketAddr, local_address: SocketAddr) -> Self {
        Self::with_config(wire, remote_address, local_address, Default::default())
    }

    pub fn with_config(
        wire: Wire,
        remote_address: SocketAddr,
        local_address: SocketAddr,
        config: ExchangeConfig,
    ) -> Self {
        let head_parser = RequestHeadParser::with_config(config.get_head_parse_config().clone());
        Self {
            wire: Some(wire),
            remote_address,
            local_address,
            config,
            head_parser,
            authenticator: None,
            context: None,
            served: 0,
            phantom: PhantomData,
        }
    }

    pub fn from_io<R, W>(
        reader: R,
        writer: W,
        remote_address: SocketAddr,
        local_address: SocketAddr,
        config: ExchangeConfig,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let wire = Wire::with_capacity(reader, writer, config.get_buf_capacity());
        Self::with_config(wire, remote_address, local_address, config)
    }

    pub fn set_authenticator(&mut self, authenticator: Arc<dyn Authenticator>) -> &mut Self {
        self.authenticator = Some(authenticator);
        self
    }
    pub fn set_context(&mut self, context: HttpContext) -> &mut Self {
        self.context = Some(context);
        self
    }

    pub fn served(&self) -> usize {
        self.served
    }

    pub async fn serve<H>(&mut self, handler: &H) -> Result<(), ExchangeError>
    where
        H: Handler + ?Sized,
    {
        while let Some(mut wire) = self.wire.take() {
            let head = match self.read_head(&mut wire).await {
                Ok(Some(head)) => head,
                Ok(None) => {
                    debug!(remote = %self.remote_address, "connection closed by peer");
                    let _ = wire.close().await;
                    return Ok(());
                }
                Err(ReadHeadError::Io(err)) => {
                    debug!(remote = %self.remote_address, error = %err, "reading request head failed");
                    let _ = wire.close().await;
                    return match err.kind() {
                        IoErrorKind::TimedOut => Ok(()),
                        _ => Err(ExchangeError::Transport(err)),
                    };
                }
                Err(ReadHeadError::Parse(err)) => {
                    warn!(remote = %self.remote_address, error = %err, "invalid request head");
                    let status_code = match err {
                        HeadParseError::InvalidHttpVersion => 505,
                        _ => 400,
                    };
                    reject(&mut wire, status_code).await;
                    return Ok(());
                }
            };

            if let Err(err) = (&head.headers, &head.version).detect() {
                warn!(remote = %self.remote_address, error = %err, "invalid request framing");
                reject(&mut wire, 400).await;
                return Ok(());
            }

            if head.version == Version::HTTP_11
                && head.headers.contains_token("Expect", "100-continue")
            {
                wire.write_all(CONTINUE).await?;
            }

            let principal = self
                .authenticator
                .as_ref()
                .and_then(|x| x.authenticate(&head));

            info!(
                remote = %self.remote_address,
                method = %head.method,
                uri = %head.uri,
                "request"
            );

            let mut exchange = HttpExchange::builder(head, wire)
                .remote_address(self.remote_address)
                .local_address(self.local_address)
                .principal(principal)
                .context(self.context.clone())
                .drain_limit(self.config.get_drain_limit())
                .build()?;

            if let Err(err) = handler.handle(&mut exchange).await {
                warn!(error = %err, "handler failed");
            }
            if let Err(err) = exchange.close().await {
                debug!(error = %err, "closing exchange failed");
            }
            self.served += 1;

            let reusable = exchange.is_reusable();
            match exchange.into_wire() {
                Some(wire) if reusable => self.wire = Some(wire),
                Some(mut wire) => {
                    debug!(remote = %self.remote_address, "connection not reusable");
                    let _ = wire.close().await;
                }
                None => {
                    debug!(remote = %self.remote_address, "response stream still held");
                }
            }
        }

        Ok(())
    }

    /// `Ok(None)` when the peer closed cleanly between requests.
    async fn read_head(&mut self, wire: &mut Wire) -> Result<Option<RequestHead>, ReadHeadError> {
        let mut started = false;
        loop {
            // Tolerate empty lines ahead of a request line.
            while !started && wire.unparsed().starts_with(CRLF) {
                wire.consume(CRLF.len());
            }

            if wire.has_unparsed_bytes() {
                started = true;

                let mut unparsed = wire.unparsed();
                match self.head_parser.parse(&mut unparsed) {
                    Ok(HeadParseOutput::Completed(n)) => {
                        wire.consume(n);

                        let head = RequestHead {
                            method: self.head_parser.method.clone(),
                            uri: self.head_parser.uri.clone(),
                            version: self.head_parser.http_version,
                            headers: self.head_parser.take_headers(),
                        };
                        return Ok(Some(head));
                    }
                    Ok(HeadParseOutput::Partial(n)) => {
                        wire.consume(n);
                    }
                    Err(err) => return Err(ReadHeadError::Parse(err)),
                }
            }

            let n = wire
                .fill_with_timeout::<SLEEP>(self.config.get_idle_timeout())
                .await
                .map_err(ReadHeadError::Io)?;
            if n == 0 {
                if !started {
                    return Ok(None);
                }
                return Err(ReadHeadError::Io(IoError::new(
                    IoErrorKind::UnexpectedEof,
                    "request head incomplete",
                )));
            }
        }
    }
}

async fn reject(wire: &mut Wire, status_code: u16) {
    let mut headers = Headers::new();
    let mut buf = Vec::new();
    let rendered = headers
        .set("Content-Length", "0")
        .and_then(|_| headers.set("Connection", CLOSE))
        .map_err(IoError::from)
        .and_then(|_| {
            ResponseHeadRenderer::new().render(
                ResponseHead {
                    status_code,
                    reason_phrase: None,
                    headers: &headers,
                },
                &mut buf,
            )
        });

    if let Err(err) = rendered {
        warn!(error = %err, "rendering rejection failed");
    } else if let Err(err) = wire.write_all(&buf).await {
        debug!(error = %err, "sending rejection failed");
    }
    let _ = wire.close().await;
}
