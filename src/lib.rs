//! A keyboard-driven terminal dashboard for browsing cloud resources.
//!
//! Resource kinds (like `ec2/instances` or `sqs/queues`) are registered on a [`service::Registry`] along with a data
//! fetcher and a display formatter. Each kind is browsed on a table that can be filtered, sorted and paginated, and
//! declares the actions and cross-kind navigations available on its resources.
//!
//! # Features
//!
//! - Fuzzy text, tag and field filters, stable multi-type sorting and incremental pagination
//! - Actions guarded by a read-only mode, shell-safe variable substitution and typed confirmations
//! - Navigation between related kinds, detail views and field-by-field comparisons
//! - Concurrent fetch across several profiles, merging whatever succeeded

#![forbid(unsafe_code)]

pub mod action;
pub mod app;
pub mod browser;
pub mod catalog;
pub mod cli;
pub mod component;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod process;
pub mod service;
pub mod tui;
pub mod utils;
pub mod widgets;
