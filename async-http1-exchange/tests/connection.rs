use std::sync::Arc;

use async_sleep::impl_async_io::Timer;
use async_trait::async_trait;
use futures_lite::future::block_on;
use futures_util::{AsyncReadExt as _, AsyncWriteExt as _};

use async_http1_exchange::{
    Authenticator, ExchangeConfig, ExchangeError, Handler, Http1Connection, HttpExchange,
    HttpPrincipal, RequestHead,
};

mod common;
use common::wire;

/// Answers with `<method> <path> <body>`.
struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, exchange: &mut HttpExchange) -> Result<(), ExchangeError> {
        let mut request_body = String::new();
        exchange
            .request_body()
            .read_to_string(&mut request_body)
            .await?;

        let principal = exchange
            .principal()
            .map(|x| format!(" {}", x.name()))
            .unwrap_or_default();
        let body = format!(
            "{} {} {}{}",
            exchange.request_method(),
            exchange.request_uri().path(),
            request_body,
            principal
        );

        exchange
            .send_response_headers(200, body.len() as i64)
            .await?;
        exchange.response_body()?.write_all(body.as_bytes()).await?;
        exchange.close().await
    }
}

fn connection(input: &str) -> (Http1Connection<Timer>, common::SharedWriter) {
    let (wire, output) = wire(input);
    let connection = Http1Connection::new(
        wire,
        "127.0.0.1:50000".parse().unwrap(),
        "127.0.0.1:80".parse().unwrap(),
    );
    (connection, output)
}

#[test]
fn keep_alive() -> Result<(), Box<dyn std::error::Error>> {
    block_on(async {
        let (mut connection, output) = connection(
            "GET /a HTTP/1.1\r\nHost: x\r\n\r\n\r\nPOST /b HTTP/1.1\r\nHost: x\r\nContent-Length: 3\r\n\r\nfoo",
        );

        connection.serve(&Echo).await?;
        assert_eq!(connection.served(), 2);

        let output = output.string();
        assert_eq!(output.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert!(output.contains("\r\n\r\nGET /a HTTP/1.1 200 OK"));
        assert!(output.ends_with("\r\n\r\nPOST /b foo"));

        Ok(())
    })
}

#[test]
fn http_10_closes_after_one_exchange() -> Result<(), Box<dyn std::error::Error>> {
    block_on(async {
        let (mut connection, output) =
            connection("GET /a HTTP/1.0\r\n\r\nGET /b HTTP/1.0\r\n\r\n");

        connection.serve(&Echo).await?;
        assert_eq!(connection.served(), 1);

        let output = output.string();
        assert!(output.contains("\r\nConnection: close\r\n"));
        assert!(!output.contains("/b"));

        Ok(())
    })
}

#[test]
fn bad_request() -> Result<(), Box<dyn std::error::Error>> {
    block_on(async {
        let (mut connection, output) = connection("GET / HTTP/1.1\r\nno colon\r\n\r\n");

        connection.serve(&Echo).await?;
        assert_eq!(connection.served(), 0);

        let output = output.string();
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(output.contains("\r\nConnection: close\r\n"));

        Ok(())
    })
}

#[test]
fn conflicting_content_length() -> Result<(), Box<dyn std::error::Error>> {
    block_on(async {
        let (mut connection, output) = connection(
            "POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\nfoo",
        );

        connection.serve(&Echo).await?;
        assert_eq!(connection.served(), 0);
        assert!(output.string().starts_with("HTTP/1.1 400 Bad Request\r\n"));

        Ok(())
    })
}

#[test]
fn unsupported_version() -> Result<(), Box<dyn std::error::Error>> {
    block_on(async {
        let (mut connection, output) = connection("GET / HTTP/2.0\r\n\r\n");

        connection.serve(&Echo).await?;
        assert!(output
            .string()
            .starts_with("HTTP/1.1 505 HTTP Version Not Supported\r\n"));

        Ok(())
    })
}

#[test]
fn expect_continue() -> Result<(), Box<dyn std::error::Error>> {
    block_on(async {
        let (mut connection, output) = connection(
            "PUT /c HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 3\r\n\r\nbar",
        );

        connection.serve(&Echo).await?;

        let output = output.string();
        assert!(output.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with("PUT /c bar"));

        Ok(())
    })
}

#[test]
fn unread_body_does_not_break_keep_alive() -> Result<(), Box<dyn std::error::Error>> {
    struct Ignore;

    #[async_trait]
    impl Handler for Ignore {
        async fn handle(&self, exchange: &mut HttpExchange) -> Result<(), ExchangeError> {
            exchange.send_response_headers(204, -1).await
        }
    }

    block_on(async {
        let (mut connection, output) = connection(
            "POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nfoo\r\n0\r\n\r\nGET / HTTP/1.1\r\n\r\n",
        );

        connection.serve(&Ignore).await?;
        assert_eq!(connection.served(), 2);
        assert_eq!(output.string().matches("HTTP/1.1 204 No Content\r\n").count(), 2);

        Ok(())
    })
}

#[test]
fn handler_error_closes_connection() -> Result<(), Box<dyn std::error::Error>> {
    struct Fail;

    #[async_trait]
    impl Handler for Fail {
        async fn handle(&self, _exchange: &mut HttpExchange) -> Result<(), ExchangeError> {
            Err(ExchangeError::Contract("nope"))
        }
    }

    block_on(async {
        let (mut connection, output) =
            connection("GET / HTTP/1.1\r\n\r\nGET / HTTP/1.1\r\n\r\n");

        connection.serve(&Fail).await?;
        assert_eq!(connection.served(), 1);
        assert!(output.bytes().is_empty());

        Ok(())
    })
}

#[test]
fn authenticator() -> Result<(), Box<dyn std::error::Error>> {
    struct Basic;

    impl Authenticator for Basic {
        fn authenticate(&self, head: &RequestHead) -> Option<HttpPrincipal> {
            head.headers
                .first("X-User")
                .map(|x| HttpPrincipal::new(x, "test"))
        }
    }

    block_on(async {
        let (mut connection, output) = connection("GET /d HTTP/1.1\r\nX-User: bob\r\n\r\n");
        connection.set_authenticator(Arc::new(Basic));

        connection.serve(&Echo).await?;
        assert!(output.string().ends_with("GET /d  test:bob"));

        Ok(())
    })
}

#[test]
fn drain_limit_from_config() -> Result<(), Box<dyn std::error::Error>> {
    struct Ignore;

    #[async_trait]
    impl Handler for Ignore {
        async fn handle(&self, exchange: &mut HttpExchange) -> Result<(), ExchangeError> {
            exchange.send_response_headers(200, -1).await
        }
    }

    block_on(async {
        let mut input = b"POST / HTTP/1.1\r\nContent-Length: 10000\r\n\r\n".to_vec();
        input.extend(vec![b'x'; 10000]);
        input.extend(b"GET / HTTP/1.1\r\n\r\n");

        let output = common::SharedWriter::default();
        let mut config = ExchangeConfig::new();
        config.set_drain_limit(1024);

        let mut connection: Http1Connection<Timer> = Http1Connection::from_io(
            futures_util::io::Cursor::new(input),
            output.clone(),
            "127.0.0.1:50000".parse()?,
            "127.0.0.1:80".parse()?,
            config,
        );

        connection.serve(&Ignore).await?;
        assert_eq!(connection.served(), 1);
        assert_eq!(output.string().matches("HTTP/1.1 200 OK\r\n").count(), 1);

        Ok(())
    })
}
