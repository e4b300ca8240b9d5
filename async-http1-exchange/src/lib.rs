pub mod attributes;
pub mod body;
pub mod config;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod principal;
pub mod state;
pub mod wire;

pub use attributes::Attributes;
pub use body::{RequestBody, ResponseBody};
pub use config::ExchangeConfig;
pub use connection::{Authenticator, Handler, Http1Connection};
pub use error::{ExchangeError, FramingError};
pub use exchange::{HttpContext, HttpExchange, HttpExchangeBuilder, RequestHead};
pub use principal::HttpPrincipal;
pub use state::{Phase, RequestBodyState};
pub use wire::{BoxedRead, BoxedWrite, Wire};

//
//
//
pub use http::{Method, StatusCode, Uri, Version};
pub use http1_exchange_spec;
pub use http1_exchange_spec::headers::Headers;
