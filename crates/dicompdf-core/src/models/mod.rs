//! Data models for the conversion pipeline.

pub mod config;
pub mod pixels;
