//! State management module
//!
//! This module holds all synchronization state of the wardrobe screen:
//! - Shared data structures and wire payloads (data.rs)
//! - The authoritative image registry and its generation counter (registry.rs)
//! - Upload selection, previews and submission (upload.rs)
//! - Ephemeral search results (search.rs)
//! - One-shot registry seeding across screens (handoff.rs)
//! - The explicit login session and its local store (session.rs)

pub mod data;
pub mod handoff;
pub mod registry;
pub mod search;
pub mod session;
pub mod upload;
