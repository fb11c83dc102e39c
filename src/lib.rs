//! # verdict
//!
//! Request execution for HTTP services: every invocation ends in exactly one
//! outcome, and exactly one response reaches the wire.
//!
//! ## The contract
//!
//! A handler does not write to the transport. It receives a [`Context`] and
//! finishes by reporting one outcome: [`Context::complete`],
//! [`Context::redirect`] or [`Context::error`]. The engine races that report
//! against request cancellation, renders the winner, and commits it to a
//! write-once [`Writer`]:
//!
//! - **Success** renders as `text/plain` or `application/json`
//! - **Redirect** sets `location` (plus a link body for `GET`)
//! - **Invalid** input is answered before the handler runs (400, 422 or 503)
//! - **Exception** sends only its status and public message; the rest is logged
//! - **Cancelled** requests get no write at all
//!
//! Around the engine sit request-scoped values ([`keystore`]), a decorator
//! stack ([`middleware`]) and a hyper-based [`Server`] with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use verdict::middleware::{Decorator, Middlewares, Path, ServerName, Service, Versioning};
//! use verdict::{Config, Context, Exception, Request, Server, Success, Writer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), verdict::Error> {
//!     let config = Config::from_env()?;
//!     verdict::logging::init(config.log_format)?;
//!
//!     let mut stack = Middlewares::new();
//!     stack.add([
//!         Decorator::from(Path),
//!         Decorator::from(Service::new("users")),
//!         Decorator::from(Versioning::new("1.4.0")),
//!         Decorator::from(ServerName::new("edge")),
//!     ]);
//!
//!     Server::from_config(&config)?.serve(stack.handler(user)).await
//! }
//!
//! async fn user(req: Request) -> Writer {
//!     let mut writer = Writer::new();
//!     verdict::process(req, &mut writer, |ctx: Context| async move {
//!         match ctx.request().header("x-user-id") {
//!             Some(id) => ctx.complete(Success::new(StatusCode::OK, format!("user {id}"))),
//!             None => ctx.error(Exception::new(StatusCode::UNAUTHORIZED).message("who are you?")),
//!         };
//!     })
//!     .await;
//!     writer
//! }
//! ```

mod context;
mod engine;
mod error;
mod handler;
mod outcome;
mod request;
mod response;
mod server;
mod writer;

pub mod config;
pub mod cookies;
pub mod headers;
pub mod keystore;
pub mod logging;
pub mod metadata;
pub mod middleware;
pub mod validation;

pub use config::{Config, Environment};
pub use context::Context;
pub use engine::{Terminal, process, validate};
pub use error::Error;
pub use handler::{Chain, Handler};
pub use outcome::{Exception, Invalid, Outcome, Payload, Redirect, Success};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use server::Server;
pub use writer::Writer;
