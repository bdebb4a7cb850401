//! Service layer for the pin board.
//! - Owns the persisted pin collection and its read-modify-write cycle.
//! - Provides clear error types the HTTP layer maps onto responses.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod file;
