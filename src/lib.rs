//! # docvault
//!
//! A multi-user document vault. Users register, log in for a time-bound
//! bearer token, upload PDF or DOCX files whose text is extracted and
//! stored, then search, rename, delete and chat over their own documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  axum    │──▶│ token gate   │──▶│  services     │
//! │  router  │   │ (auth)       │   │ ingest/docs/  │
//! └──────────┘   └──────────────┘   │ chat          │
//!                                   └──────┬───────┘
//!                     ┌────────────────────┼──────────────┐
//!                     ▼                    ▼              ▼
//!               ┌──────────┐        ┌────────────┐  ┌──────────┐
//!               │  SQLite  │        │ extractors │  │  Gemini  │
//!               │  store   │        │ PDF/DOCX   │  │  (SSE)   │
//!               └──────────┘        └────────────┘  └──────────┘
//! ```
//!
//! Records, errors and the repository traits live in the `docvault-core`
//! crate so that alternative stores can be plugged in without this crate's
//! HTTP and extraction stack.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the store traits |
//! | [`auth`] | Tokens, password hashing, register/login |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`convert`] | External DOCX → PDF conversion |
//! | [`ingest`] | Upload pipeline |
//! | [`documents`] | Owner-scoped search, rename, delete, content edits |
//! | [`chat`] | Chat over a user's documents |
//! | [`server`] | HTTP routes |
//! | [`logging`] | Tracing subscriber setup |

pub mod auth;
pub mod chat;
pub mod config;
pub mod convert;
pub mod db;
pub mod documents;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod sqlite_store;

pub use docvault_core::{models, store, VaultError, VaultResult};
