//! CoDress client
//!
//! The synchronization engine behind the wardrobe screen: which images are
//! authoritative, how uploads and searches land, and how state is handed
//! between screens. The `codress` binary hosts it in an iced application.

pub mod api;
pub mod config;
pub mod error;
pub mod gallery;
pub mod preview;
pub mod state;
pub mod telemetry;
