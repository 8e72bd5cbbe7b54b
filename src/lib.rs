//! Map poster library
//!
//! Turns a street network, water bodies and parks into a layered poster.
//! Re-exports modules for use by the binary and integration tests.

pub mod canvas;
pub mod classify;
pub mod compose;
pub mod config;
pub mod features;
pub mod font;
pub mod labels;
pub mod provider;
pub mod raster;
pub mod render;
pub mod theme;
