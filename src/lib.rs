//! Glassify service code
//!
//! Accepts a face photo and a glasses photo and produces a composite image of
//! the face wearing the glasses. Uses the Gemini image API when a key is
//! configured, with a deterministic compositing fallback when it isn't.

#![allow(clippy::multiple_crate_versions)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::disallowed_methods)]
#![deny(clippy::expect_used)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::panic)]
#![deny(clippy::perf)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::unreachable)]
#![deny(clippy::unwrap_used)]
#![deny(warnings)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod compositor;
pub mod config;
pub mod constants;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod store;
pub mod validate;
pub mod web;
