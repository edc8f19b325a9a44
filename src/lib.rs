//! # Minnow
//!
//! The decoding core of a RESP-speaking server, built from scratch in Rust.
//!
//! Minnow reads the RESP2 wire format — simple strings, binary-safe bulk
//! strings, and nested arrays — incrementally off any buffered byte source,
//! and ships with a stub TCP server that decodes each request and answers
//! with a fixed `+PONG`. Command dispatch, storage, and response encoding
//! are left to a future layer.

pub mod config;
pub mod resp;
pub mod server;
