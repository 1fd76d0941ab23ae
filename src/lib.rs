//! Blocking HTTP/1.1 request engine.
//!
//! A [`WebRequest`] runs one logical HTTP operation: it opens the
//! connection (through a proxy, a `CONNECT` tunnel and TLS as needed), sends
//! the request head and body, reads the response and then follows redirects
//! and answers authentication challenges until it has a final response.
//!
//! ```no_run
//! use std::io::Read;
//! use webrequest::WebRequest;
//!
//! let mut request = WebRequest::new("http://example.test/page")?;
//! request.set_user_agent("my-app/1.0")?;
//!
//! let mut response = request.get_response()?;
//! println!("{} {}", response.status(), response.reason());
//!
//! let mut body = String::new();
//! response.read_to_string(&mut body)?;
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! Redirects and `401`/`403`/`407` challenges are not errors. When the
//! request gives up following them, the last response is returned as is and
//! the caller inspects the status code.
//!
//! The collaborators the engine talks to (name resolution, sockets, TLS and
//! authentication modules) are traits bundled in [`Services`], so they can be
//! replaced, e.g. by in-memory fakes in tests.

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod error;
pub use error::{Error, TransportStatus};

mod util;
pub use util::Deadline;

mod ext;

mod headers;
pub use headers::HeaderCollection;

pub mod parser;

pub mod body;

mod config;
pub use config::{Config, RedirectAuthHeaders};

pub mod auth;

pub mod proxy;

pub mod net;

pub mod client;
pub use client::{Response, WebRequest};
pub use client::{AbortHandle, ResponseHandle, Services};

pub use http;
