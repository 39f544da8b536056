//! tasknest library
//!
//! Nested personal todos with image attachments, AI-assisted task suggestions
//! and live snapshots. Exposed as a library for testing and for front ends
//! other than the bundled CLI.

pub mod ai;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod dialog;
pub mod error;
pub mod format;
pub mod logging;
pub mod storage;
pub mod store;
pub mod subscriptions;
pub mod suggest;
pub mod tree;
pub mod types;
