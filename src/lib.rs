//! # nm_bridge
//!
//! A **native messaging bridge host**: the small process a browser extension
//! launches with `connectNative`, talking length-prefixed JSON over the
//! process's **stdin/stdout**.
//!
//! - Read frames robustly from pipes that deliver bytes in arbitrary fragments
//! - Tell framing failures (stream is broken) apart from request failures
//!   (answer `ok: false` and carry on)
//! - Hand out the local daemon's bootstrap token without touching storage
//! - Install, verify and remove the host manifest for Chromium-family browsers
//!   and Firefox
//!
//! ---
//!
//! ## Wire format
//!
//! ```text
//! frame := len (4 bytes, u32, little-endian) || payload (len bytes)
//! ```
//!
//! The payload is UTF-8 JSON and must be an **object**. There is no terminator
//! and no maximum enforced by the codec itself; [`host::read_message_capped`]
//! lets callers add one (the session uses [`config::Config::max_message_len`]).
//!
//! ### How a read can end
//!
//! | Result                              | Meaning                                   |
//! |-------------------------------------|-------------------------------------------|
//! | `Ok(Some(msg))`                     | one fully decoded message                 |
//! | `Ok(None)`                          | EOF at a frame boundary: shut down cleanly |
//! | `Err(FrameError::UnexpectedEof{..})`| peer closed mid-frame: fatal              |
//! | `Err(FrameError::InvalidPayload(_))`| not UTF-8 / not JSON / not an object: fatal |
//!
//! ```rust
//! use nm_bridge::host::{encode_message, read_message};
//! use serde_json::json;
//! use std::io::Cursor;
//!
//! let frame = encode_message(&json!({"type": "GET_TOKEN"})).unwrap();
//! let mut cur = Cursor::new(frame);
//! let msg = read_message(&mut cur).unwrap().unwrap();
//! assert_eq!(msg["type"], "GET_TOKEN");
//! assert!(read_message(&mut cur).unwrap().is_none()); // clean EOF
//! ```
//!
//! ---
//!
//! ## Requests
//!
//! | `type`      | Storage | Reply                                        |
//! |-------------|---------|----------------------------------------------|
//! | `GET_TOKEN` | never   | `{"ok": true, "token": ..., "port": ...}`    |
//! | `TEST_PATH` | yes     | `{"ok": true, "outputDir": ...}`             |
//! | `LOG`       | yes     | `{"ok": true, "count": n}`                   |
//! | `DUMP`      | yes     | `{"ok": true, "path": ...}`                  |
//! | *(none)*, `tweets: [...]` | yes | `{"ok": true, "count": n}`         |
//!
//! Anything else gets `{"ok": false, "error": "unknown message type: ..."}`.
//! The host never exits because of a bad request, only because the stream broke.
//!
//! ```rust
//! use nm_bridge::{config::Config, dispatch::Dispatcher, session::Session, storage::FsStorage};
//! use nm_bridge::host::{encode_message, read_message};
//! use serde_json::json;
//! use std::io::Cursor;
//!
//! let config = Config { port: 9999, ..Config::default() };
//! let dispatcher = Dispatcher::new(config, "tok123".to_string(), FsStorage);
//!
//! let input = encode_message(&json!({"type": "GET_TOKEN"})).unwrap();
//! let report = Session::new(Cursor::new(input), Vec::new(), dispatcher).run();
//! assert!(report.outcome.is_clean());
//!
//! let reply = read_message(&mut Cursor::new(report.writer)).unwrap().unwrap();
//! assert_eq!(serde_json::Value::Object(reply), json!({"ok": true, "token": "tok123", "port": 9999}));
//! ```
//!
//! ---
//!
//! ## Best practices for hosts
//!
//! **Never write to stdout** except through the codec. The binary sends all
//! `tracing` output to stderr; if you embed the library, do the same.
//!
//! ---
//!
//! ## Crate layout
//!
//! - [`host`]: framing codec, stdio entry points, async helpers (`tokio` feature).
//! - [`dispatch`]: request routing, [`dispatch::Response`].
//! - [`session`]: the `AwaitingFrame → Dispatching → Terminated` state machine.
//! - [`config`]: explicit configuration (TOML file + `NM_BRIDGE_*` env).
//! - [`secret`], [`storage`]: injectable collaborators.
//! - [`install`]: manifest installer (`install` feature).
//! - [`error`]: [`FrameError`], [`HandlerError`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod secret;
pub mod session;
pub mod storage;

#[cfg(feature = "install")]
pub mod install;

// -------- Re-exports --------

#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use dispatch::{Dispatcher, Response};
#[doc(inline)]
pub use error::{FrameError, HandlerError};
#[doc(inline)]
pub use host::{encode_message, read_message, run_stdio, write_message, Message};
#[doc(inline)]
pub use session::{Outcome, Session};

#[cfg(feature = "install")]
#[doc(inline)]
pub use install::{install, remove, verify_installed, Browser, Scope};
