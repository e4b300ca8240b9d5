/*
RUST_LOG=debug cargo run -p async-http1-exchange-demo-async-net --bin async_http1_exchange_demo_async_net_server 127.0.0.1:8080

curl -v http://127.0.0.1:8080/hello
curl -v -d 'foo=bar' http://127.0.0.1:8080/echo
*/

use std::{env, thread, time::Duration};

use async_net::TcpListener;
use async_sleep::impl_async_io::Timer;
use async_trait::async_trait;
use futures_lite::future::block_on;
use futures_util::{AsyncReadExt as _, AsyncWriteExt as _};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use async_http1_exchange::{
    ExchangeConfig, ExchangeError, Handler, Http1Connection, HttpExchange, Method,
};

struct Demo;

#[async_trait]
impl Handler for Demo {
    async fn handle(&self, exchange: &mut HttpExchange) -> Result<(), ExchangeError> {
        exchange.set_response_header("Content-Type", "text/plain")?;

        match (exchange.request_method(), exchange.request_uri().path()) {
            (&Method::GET, "/hello") => {
                let body = b"hello\n";
                exchange
                    .send_response_headers(200, body.len() as i64)
                    .await?;
                exchange.response_body()?.write_all(body).await?;
            }
            (&Method::POST, "/echo") => {
                let mut body = Vec::new();
                exchange.request_body().read_to_end(&mut body).await?;

                // Length unknown up front; goes out chunked.
                exchange.send_response_headers(200, 0).await?;
                let response_body = exchange.response_body()?;
                for chunk in body.chunks(4) {
                    response_body.write_all(chunk).await?;
                }
            }
            _ => {
                exchange.send_response_headers(404, -1).await?;
            }
        }

        exchange.close().await
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "async_http1_exchange=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    block_on(run())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| env::var("LISTEN_ADDR").unwrap_or("127.0.0.1:8080".to_owned()));

    let listener = TcpListener::bind(addr).await?;
    let local_address = listener.local_addr()?;
    tracing::info!(%local_address, "listening");

    let mut config = ExchangeConfig::new();
    config
        .set_idle_timeout(Duration::from_secs(30))
        .set_drain_limit(1024 * 1024);

    loop {
        let (stream, remote_address) = listener.accept().await?;
        let config = config.clone();

        thread::spawn(move || {
            let mut connection: Http1Connection<Timer> = Http1Connection::from_io(
                stream.clone(),
                stream,
                remote_address,
                local_address,
                config,
            );

            if let Err(err) = block_on(connection.serve(&Demo)) {
                tracing::warn!(%remote_address, error = %err, "connection failed");
            }
        });
    }
}
