//! mkdocs2notion - publish a Markdown / MkDocs docs tree to Notion
//!
//! This crate provides the core functionality for the `mkdocs2notion` CLI.
//!
//! # Architecture
//!
//! - [`markdown`] - Markdown parser producing an element tree plus warnings
//! - [`loaders`] - docs directory discovery, MkDocs nav, publish plan
//! - [`notion`] - block serializer, remote store trait, HTTP client, rate limit and retry
//! - [`sync`] - identity map, change detection and the sync engine
//! - [`config`] - settings from env and `~/.mkdocs2notion/config.json`
//! - [`cli`] - command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod loaders;
pub mod markdown;
pub mod notion;
pub mod sync;

pub use error::{Error, Result};
