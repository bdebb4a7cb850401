//! Storage abstractions for service layer
//!
//! Contains the reusable file-backed list store that persists an ordered
//! collection as a single JSON document.

pub mod json_list_store;
