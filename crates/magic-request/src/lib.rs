//! A small HTTP request controller.
//!
//! This crate issues GET, POST and form POST requests against a fixed base
//! URL and delivers the outcome to a completion callback:
//!
//! - **URL assembly**: `base + "/" + path`, plus a percent-encoded query string
//! - **Default headers**: applied to every request at dispatch time
//! - **Bodies**: JSON (`post`) or `application/x-www-form-urlencoded` (`post_form`)
//! - **Decoding**: JSON replies for `get`/`post`, raw bytes for `get_data`/`post_form`
//! - **Redirect observation**: a hook run before each redirect is followed
//!
//! # Example
//!
//! ```ignore
//! use magic_request::RequestController;
//!
//! let mut controller = RequestController::parse("https://api.example.com")?;
//! controller.set_header("Accept", "application/json")?;
//!
//! controller.get("items", |result| match result {
//!     Ok(reply) => println!("items: {}", reply.body),
//!     Err(err) => eprintln!("request failed: {err}"),
//! });
//!
//! controller.post_form("login", [("user", "bob"), ("pass", "x")], |result| {
//!     if let Ok(reply) = result {
//!         println!("login: HTTP {}", reply.status());
//!     }
//! });
//!
//! controller.set_redirect_handler(|event| {
//!     println!("{} redirect {} -> {}", event.status, event.from, event.to);
//! });
//! ```
//!
//! # Transports
//!
//! Requests are executed by a [`Transport`]. The default is
//! [`ReqwestTransport`]; tests and embedders can inject their own through
//! [`RequestController::builder`].

mod config;
mod controller;
mod encoding;
mod entity;
mod error;
pub mod logging;
mod redirect;
mod request;
mod response;
pub mod runtime;
mod transport;

pub use config::TransportConfig;
pub use controller::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, RequestController, RequestControllerBuilder, RequestId,
};
pub use encoding::{encode_form, encode_query, encode_query_component};
pub use entity::{Dictionary, Entity};
pub use error::{RequestError, Result, TransportError};
pub use redirect::{RedirectEvent, RedirectHandler, RedirectObserver};
pub use request::{FormBody, HttpMethod, TransportRequest};
pub use response::{Reply, ResponseMeta, TransportResponse};
pub use transport::{ReqwestTransport, Transport};
