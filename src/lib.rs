//! Interactive session controller for a command-line mail backend.
//!
//! Every mail operation is a call to an external backend program. This crate
//! builds those calls, classifies their output, renders listings as
//! delimiter-separated tables and tracks the session (account, mailbox,
//! page, draft) the user is working in.

pub mod app;
pub mod config;
pub mod controller;
pub mod draft;
pub mod error;
pub mod himalaya;
pub mod picker;
pub mod session;
pub mod status;
pub mod ui;

pub use error::{Error, Result};
