use core::{any::Any, future::poll_fn};
use std::{net::SocketAddr, sync::Arc, time::SystemTime};

use futures_util::io::AsyncWriteExt as _;
use http::{Method, Uri, Version};
use http1_exchange_spec::{
    body_framing::{BodyFraming, BodyFramingDetector as _},
    headers::Headers,
    response_head_renderer::{ResponseHead, ResponseHeadRenderer},
    CHUNKED, CLOSE, KEEP_ALIVE,
};
use tracing::{debug, warn};

use crate::{
    attributes::{AttributeValue, Attributes},
    body::{RequestBody, ResponseBody, ResponseEncoder, SharedTransaction, Transaction},
    config::DRAIN_LIMIT_DEFAULT,
    error::{ExchangeError, FramingError},
    principal::HttpPrincipal,
    state::{Phase, RequestBodyState},
    wire::{BoxedRead, BoxedWrite, Wire},
};

pub type HttpContext = Arc<dyn Any + Send + Sync>;

#[derive(Debug)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
}

//
//
//
pub struct HttpExchangeBuilder {
    head: RequestHead,
    wire: Wire,
    remote_address: SocketAddr,
    local_address: SocketAddr,
    principal: Option<HttpPrincipal>,
    context: Option<HttpContext>,
    drain_limit: u64,
}

impl HttpExchangeBuilder {
    pub fn remote_address(mut self, addr: SocketAddr) -> Self {
        self.remote_address = addr;
        self
    }
    pub fn local_address(mut self, addr: SocketAddr) -> Self {
        self.local_address = addr;
        self
    }
    pub fn principal(mut self, principal: Option<HttpPrincipal>) -> Self {
        self.principal = principal;
        self
    }
    pub fn context(mut self, context: Option<HttpContext>) -> Self {
        self.context = context;
        self
    }
    pub fn drain_limit(mut self, value: u64) -> Self {
        self.drain_limit = value;
        self
    }

    pub fn build(self) -> Result<HttpExchange, ExchangeError> {
        let Self {
            head,
            wire,
            remote_address,
            local_address,
            principal,
            context,
            drain_limit,
        } = self;

        if head.version != Version::HTTP_10 && head.version != Version::HTTP_11 {
            return Err(ExchangeError::Contract("unsupported protocol version"));
        }

        let request_framing = (&head.headers, &head.version)
            .detect()
            .map_err(FramingError::InvalidRequestFraming)?;

        let keep_alive = if head.version == Version::HTTP_10 {
            head.headers.contains_token("Connection", KEEP_ALIVE)
        } else {
            !head.headers.contains_token("Connection", CLOSE)
        };

        let mut transaction = Transaction::new(wire, request_framing, drain_limit);
        if !keep_alive {
            transaction.state_mut().request_close();
        }

        let mut request_headers = head.headers;
        request_headers.freeze();

        Ok(HttpExchange {
            method: head.method,
            uri: head.uri,
            version: head.version,
            remote_address,
            local_address,
            principal,
            context,
            request_headers,
            response_headers: Headers::new(),
            attributes: Attributes::new(),
            transaction: SharedTransaction::new(transaction),
            request_body: None,
            response_body: None,
            closed: false,
        })
    }
}

//
//
//
pub struct HttpExchange {
    method: Method,
    uri: Uri,
    version: Version,
    remote_address: SocketAddr,
    local_address: SocketAddr,
    principal: Option<HttpPrincipal>,
    context: Option<HttpContext>,
    //
    request_headers: Headers,
    response_headers: Headers,
    attributes: Attributes,
    //
    transaction: SharedTransaction,
    request_body: Option<BoxedRead>,
    response_body: Option<BoxedWrite>,
    closed: bool,
}

impl core::fmt::Debug for HttpExchange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpExchange")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("remote_address", &self.remote_address)
            .field("phase", &self.phase())
            .finish()
    }
}

impl HttpExchange {
    pub fn builder(head: RequestHead, wire: Wire) -> HttpExchangeBuilder {
        let unspecified = SocketAddr::from(([0, 0, 0, 0], 0));
        HttpExchangeBuilder {
            head,
            wire,
            remote_address: unspecified,
            local_address: unspecified,
            principal: None,
            context: None,
            drain_limit: DRAIN_LIMIT_DEFAULT,
        }
    }

    //
    pub fn request_method(&self) -> &Method {
        &self.method
    }
    pub fn request_uri(&self) -> &Uri {
        &self.uri
    }
    pub fn version(&self) -> Version {
        self.version
    }
    pub fn protocol(&self) -> &'static str {
        if self.version == Version::HTTP_10 {
            "HTTP/1.0"
        } else {
            "HTTP/1.1"
        }
    }
    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }
    pub fn local_address(&self) -> SocketAddr {
        self.local_address
    }
    pub fn principal(&self) -> Option<&HttpPrincipal> {
        self.principal.as_ref()
    }
    pub fn http_context(&self) -> Option<&HttpContext> {
        self.context.as_ref()
    }

    pub fn request_headers(&self) -> &Headers {
        &self.request_headers
    }
    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }
    pub fn set_response_header(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), ExchangeError> {
        self.response_headers.set(name, value)?;
        Ok(())
    }
    pub fn add_response_header(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), ExchangeError> {
        self.response_headers.add(name, value)?;
        Ok(())
    }
    pub fn remove_response_header(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<String>>, ExchangeError> {
        Ok(self.response_headers.remove(name)?)
    }

    /// `-1` until response headers are sent.
    pub fn response_code(&self) -> i32 {
        self.transaction.lock().state().status_code()
    }
    pub fn phase(&self) -> Phase {
        self.transaction.lock().state().phase()
    }
    pub fn request_body_state(&self) -> RequestBodyState {
        self.transaction.lock().state().request_body_state()
    }
    pub fn is_reusable(&self) -> bool {
        self.transaction.lock().state().is_reusable()
    }

    //
    pub fn attribute(&self, name: &str) -> Result<Option<&(dyn Any + Send + Sync)>, ExchangeError> {
        self.attributes.get(name)
    }
    pub fn attribute_as<T: Any>(&self, name: &str) -> Result<Option<&T>, ExchangeError> {
        self.attributes.get_as(name)
    }
    pub fn set_attribute<T>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<Option<AttributeValue>, ExchangeError>
    where
        T: Any + Send + Sync,
    {
        self.attributes.set(name, value)
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    //
    pub fn request_body(&mut self) -> &mut BoxedRead {
        let transaction = &self.transaction;
        self.request_body
            .get_or_insert_with(|| Box::new(RequestBody::new(transaction.clone())))
    }

    pub fn response_body(&mut self) -> Result<&mut BoxedWrite, ExchangeError> {
        self.transaction.lock().state().ensure_headers_sent()?;

        let transaction = &self.transaction;
        Ok(self
            .response_body
            .get_or_insert_with(|| Box::new(ResponseBody::new(transaction.clone()))))
    }

    pub fn wrap_request_body<F>(&mut self, f: F)
    where
        F: FnOnce(BoxedRead) -> BoxedRead,
    {
        let current: BoxedRead = match self.request_body.take() {
            Some(x) => x,
            None => Box::new(RequestBody::new(self.transaction.clone())),
        };
        self.request_body = Some(f(current));
    }

    pub fn wrap_response_body<F>(&mut self, f: F)
    where
        F: FnOnce(BoxedWrite) -> BoxedWrite,
    {
        let current: BoxedWrite = match self.response_body.take() {
            Some(x) => x,
            None => Box::new(ResponseBody::new(self.transaction.clone())),
        };
        self.response_body = Some(f(current));
    }

    pub fn set_streams(&mut self, request_body: Option<BoxedRead>, response_body: Option<BoxedWrite>) {
        if let Some(x) = request_body {
            self.request_body = Some(x);
        }
        if let Some(x) = response_body {
            self.response_body = Some(x);
        }
    }

    //
    /// `length > 0` fixed, `0` chunked, `-1` no body.
    pub async fn send_response_headers(
        &mut self,
        status_code: u16,
        length: i64,
    ) -> Result<(), ExchangeError> {
        self.transaction.lock().state().ensure_created()?;
        if !(100..=999).contains(&status_code) {
            return Err(ExchangeError::Contract("status code out of range"));
        }

        let requested = BodyFraming::from_response_length(length);
        let is_http_10 = self.version == Version::HTTP_10;

        let no_content = self.method == Method::HEAD
            || (100..200).contains(&status_code)
            || status_code == 204
            || status_code == 304;

        let (framing, encoder, close) = if no_content {
            if requested.has_body() {
                warn!(
                    status = status_code,
                    length, "response body ignored, response carries no content"
                );
            }
            (BodyFraming::Neither, ResponseEncoder::Neither, false)
        } else {
            match requested {
                BodyFraming::ContentLength(n) => {
                    self.response_headers.remove("Transfer-Encoding")?;
                    self.response_headers.set("Content-Length", n.to_string())?;
                    (requested, ResponseEncoder::ContentLength { remaining: n }, false)
                }
                BodyFraming::Chunked if !is_http_10 => {
                    self.response_headers.remove("Content-Length")?;
                    self.response_headers.set("Transfer-Encoding", CHUNKED)?;
                    (requested, ResponseEncoder::Chunked, false)
                }
                BodyFraming::Chunked => {
                    self.response_headers.remove("Content-Length")?;
                    self.response_headers.remove("Transfer-Encoding")?;
                    (requested, ResponseEncoder::CloseDelimited, true)
                }
                BodyFraming::Neither => {
                    self.response_headers.remove("Transfer-Encoding")?;
                    self.response_headers.set("Content-Length", "0")?;
                    (requested, ResponseEncoder::Neither, false)
                }
            }
        };

        if !self.response_headers.contains("Date") {
            self.response_headers
                .set("Date", httpdate::fmt_http_date(SystemTime::now()))?;
        }

        let close = close
            || self.transaction.lock().state().is_close_requested()
            || self.response_headers.contains_token("Connection", CLOSE);
        if close {
            if !self.response_headers.contains_token("Connection", CLOSE) {
                self.response_headers.set("Connection", CLOSE)?;
            }
        } else if is_http_10 {
            self.response_headers.set("Connection", KEEP_ALIVE)?;
        }

        let mut head = Vec::new();
        ResponseHeadRenderer::new()
            .render(
                ResponseHead {
                    status_code,
                    reason_phrase: None,
                    headers: &self.response_headers,
                },
                &mut head,
            )
            .map_err(|_| ExchangeError::Contract("invalid response head"))?;

        {
            let mut transaction = self.transaction.lock();
            transaction.start_response(status_code, framing, encoder, head)?;
            if close {
                transaction.state_mut().request_close();
            }
        }
        self.response_headers.freeze();
        debug!(status = status_code, ?framing, close, "response headers sent");

        let transaction = &self.transaction;
        poll_fn(|cx| transaction.lock().poll_flush_head(cx))
            .await
            .map_err(ExchangeError::from)
    }

    pub async fn close(&mut self) -> Result<(), ExchangeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = if self.phase() < Phase::HeadersSent {
            debug!("exchange closed before response headers were sent");
            let mut transaction = self.transaction.lock();
            transaction.state_mut().mark_broken();
            transaction.state_mut().abandon_request_body();
            transaction.close_request();
            Ok(())
        } else {
            let transaction = &self.transaction;
            let response_body = self
                .response_body
                .get_or_insert_with(|| Box::new(ResponseBody::new(transaction.clone())));
            let wrapped = response_body.close().await.map_err(ExchangeError::from);

            // A replacement stream may not forward close.
            let direct = poll_fn(|cx| transaction.lock().poll_close_body(cx))
                .await
                .map_err(ExchangeError::from);
            wrapped.and(direct)
        };

        let mut transaction = self.transaction.lock();
        transaction.state_mut().terminate();
        debug!(
            reusable = transaction.state().is_reusable(),
            "exchange terminated"
        );

        result
    }

    pub fn into_wire(self) -> Option<Wire> {
        let Self {
            transaction,
            request_body,
            response_body,
            ..
        } = self;
        drop(request_body);
        drop(response_body);

        transaction.try_unwrap().map(Transaction::into_wire)
    }
}
