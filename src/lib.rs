//! # frelon_ccd
//!
//! Command translation and validation layer for a Frelon CCD device server.
//!
//! Remote clients speak a flat vocabulary: integer codes, bitmasks, string
//! arrays and whitespace-separated parameter strings. The acquisition engine
//! underneath speaks structured configuration (trigger modes, binning, ROIs,
//! file streams) and checks none of the rules that tie those fields together.
//! This crate sits between the two.
//!
//! ## Layout
//!
//! - [`core`]: value types shared with the engine
//! - [`hardware`]: the [`AcquisitionEngine`](hardware::AcquisitionEngine)
//!   interface and an in-memory [`MockEngine`](hardware::MockEngine)
//! - [`translator`]: [`FrelonTranslator`](translator::FrelonTranslator), one
//!   method per remote operation
//! - [`command`]: JSON wire commands and their dispatch
//! - [`config`], [`tracing_setup`]: ambient setup for the `frelon-ccd` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use frelon_ccd::hardware::MockEngine;
//! use frelon_ccd::translator::FrelonTranslator;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), frelon_ccd::error::CcdError> {
//! let translator = FrelonTranslator::new(Arc::new(MockEngine::new()));
//! translator.set_binning([2, 2]).await?;
//! translator.set_exp_time(0.5).await?;
//! translator.set_trigger(1).await?;
//! assert_eq!(translator.get_trigger().await?, 1);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod core;
pub mod error;
pub mod hardware;
pub mod tracing_setup;
pub mod translator;
