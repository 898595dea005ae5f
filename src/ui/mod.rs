//! UI components
//!
//! View functions for each screen plus the image handle caches they draw from.

pub mod image_cache;
pub mod screens;
