//! Core types and trait definitions for the gibreg registry mirror.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Every other crate in the workspace depends on it.

#![allow(async_fn_in_trait)]

pub mod entry;
pub mod error;
pub mod store;

pub use error::{Error, Result};
