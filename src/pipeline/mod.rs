//! Pipeline stages that turn a document into table lines.
//!
//! Each submodule implements exactly one step before reconstruction.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ normalize ──▶ crate::table
//! (path)    (pdfium)    (spaces)      (boundaries, grid, CSV)
//! ```
//!
//! 1. [`input`]     — validate the path and classify it as PDF or text
//! 2. [`extract`]   — pull page text out of a PDF; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`normalize`] — map Unicode space variants and tabs to ASCII spaces so
//!    column offsets line up

pub mod extract;
pub mod input;
pub mod normalize;
