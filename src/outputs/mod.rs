//! Report generation.
//!
//! - [`html`]: renders a [`RunResult`](crate::models::RunResult) as a single
//!   static page and writes it to the configured output path
//!
//! The page is rebuilt from scratch on every run; there is no incremental patching.

pub mod html;
