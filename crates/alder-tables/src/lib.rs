//! Pre-compiled LR parse-table format for the Alder parse engine.
//!
//! This crate contains:
//! - The bit-packed action encoding ([`action`])
//! - The parse-table data model and its accessors ([`table`])
//! - Dialect resolution ([`dialect`])
//! - A programmatic table assembler ([`encode`])
//! - Binary and JSON (de)serialization of table blobs ([`binary`], [`json`])
//!
//! Tables are produced ahead of time by a grammar compiler; this crate only
//! defines the format those tables must follow and the dense lookups the
//! runtime performs against them.

pub mod action;
pub mod binary;
pub mod dialect;
pub mod encode;
pub mod json;
pub mod table;

#[cfg(test)]
mod action_tests;

// Re-export commonly used items at crate root
pub use binary::{MAGIC, TableError, VERSION};
pub use dialect::{Dialect, DialectSpec};
pub use encode::{StateSpec, TableBuilder, TokenDfaBuilder, TokenState};
pub use table::{
    DEFAULT_BUFFER_LENGTH, GOTO_NONE, ParseTable, STATE_SIZE, StateFlag, StateSlot, TERM_ERR, seq,
};

/// LR state id.
pub type StateId = u32;

/// Term id. Terminals and node types share one id space; `0` is reserved
/// for the error term.
pub type Term = u16;

/// Bit-packed parse action. See [`action`] for the layout.
pub type Action = u32;
