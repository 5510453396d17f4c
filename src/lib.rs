//! emberapi - Concurrent, security-first REST API server framework
//!
//! A performance-oriented HTTP server with a built-in credential store,
//! endpoint dispatch (routing, auth, rate limiting) and optional TLS
//! termination, built on the same zero-allocation request/response core as
//! the HTTP layer it's built on.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1**: Full protocol with persistent connections
//! - **HTTP/1.0**: Basic protocol support for legacy clients and simple requests
//! - **HTTP/0.9+**: [High-performance variant with keep-alive and query support](limits::Http09Limits)
//! - **TLS**: Optional, via [`ServerBuilder::tls`] and [`TlsConfig`]
//!
//! # Features
//!
//! ## 🔒 Security & Protection
//! - **Built-in DoS/DDoS protection** - enabled by default, with no performance penalty.
//! - **Fully configurable limits and timeouts** for requests, responses, and connections.
//! - **Custom connection filtering** - implement the [`ConnectionFilter`] trait to
//!   reject unwanted connections at the TCP level.
//! - **Credential store** - file-backed users, API keys and access tokens; see
//!   [`CredentialStore`].
//! - **Endpoint auth chain & rate limiting** - see [`rest::RestDispatcher`].
//!
//! ## 🚀 Performance & Memory
//! - **Zero-allocation** - no memory allocations after server startup.
//! - **Pre-allocated memory for each connection** - linear and transparent scaling.
//!
//! ## 🌐 Protocol & Management
//! - **Full HTTP stack** - `HTTP/1.1`, `HTTP/1.0`, [`HTTP/0.9+`
//!   ](https://docs.rs/emberapi/latest/emberapi/limits/struct.Http09Limits.html)
//!   with keep-alive.
//! - **Automatic protocol detection for each request** - keep-alive eliminates
//!   the need for manual protocol selection.
//! - **Storing data between requests** - ability to store data between requests in a
//!   single connection using the [`ConnectionData`] trait.
//!
//! ## 🏭 Production Ready
//! - **Graceful performance degradation** - automatic 503 responses when overloaded.
//! - [**Custom error format**
//!   ](https://docs.rs/emberapi/latest/emberapi/limits/struct.ServerLimits.html#structfield.json_errors) -
//!   structured JSON (with codes/descriptions) or a plain HTTP response.
//! - **Resource protection** - automatic closure of connections exceeding set limits.
//!
//! # Quick Start
//!
//! ## 1. Installation
//!
//! Add `emberapi` and [`tokio`](https://crates.io/crates/tokio) to your `Cargo.toml`:
//!
//! ```bash
//! cargo add emberapi tokio --features tokio/full
//! ```
//! Or manually:
//! ```toml
//! [dependencies]
//! emberapi = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## 2. Usage example
//! ```no_run
//! use emberapi::{Server, Handler, Request, Response, Handled, StatusCode};
//! use tokio::net::TcpListener;
//!
//! struct MyHandler;
//!
//! impl Handler for MyHandler {
//!     async fn handle(&self, _: &mut (), _: &Request, resp: &mut Response) -> Handled {
//!         resp.status(StatusCode::Ok).body("Hello World!")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .handler(MyHandler)
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! For a full REST API with a credential store, auth chain and rate limiting,
//! see the [`rest_api`](https://github.com/AmakeSashaDev/emberapi/tree/main/demos/rest_api.rs)
//! demo.
//!
//! # Use Cases
//!
//! - **High-throughput microservices** - configurable for specific workloads
//! - **Resource-constrained environments** - predictable memory usage
//! - **Internal APIs** - security-conscious defaults, built-in auth
//! - **Performance-critical applications** - zero-allocation design
//! - **Legacy system integration** - HTTP/1.0 compatibility
pub(crate) mod http {
    pub mod query;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
    pub(crate) mod stream;
}
pub(crate) mod errors;
pub mod credentials;
pub mod limits;
pub mod rest;

pub use crate::{
    credentials::{CredentialStore, UserData},
    http::{
        query,
        request::Request,
        response::{
            write::{BodyWriter, WriteBuffer},
            Handled, Response,
        },
        types::{Method, StatusCode, Url, Version},
    },
    rest::{auth, Endpoint, RateLimit, RestDispatcher, RestError},
    server::{
        connection::{ConnectionData, ConnectionFilter},
        server_impl::{Handler, Server, ServerBuilder, TlsConfig},
    },
};

#[doc(hidden)]
pub fn run_test<F: FnOnce(&Request, &mut Response) -> Handled>(f: F) {
    f(
        &Request::new(&crate::limits::ReqLimits::default()),
        &mut Response::new(&crate::limits::RespLimits::default()),
    );
}

#[doc(hidden)]
#[macro_export]
macro_rules! impt_default_handler {
    ($name:ident) => {
        use emberapi::{Handled, Handler, Request, Response, StatusCode};
        struct $name;

        // `<()>` to check functionality
        impl Handler<()> for $name {
            async fn handle(&self, _: &mut (), _: &Request, resp: &mut Response) -> Handled {
                resp.status(StatusCode::Ok).body("Hello world!")
            }
        }
    };
}
