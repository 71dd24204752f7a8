//! Quire: the in-memory content cache of a self-hosted publishing platform.
//!
//! Content is loaded once from a [`application::repos::ContentRepo`], indexed
//! by tag, series and month, and kept current one record at a time. The
//! series and archive pages are regenerated in the background.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
