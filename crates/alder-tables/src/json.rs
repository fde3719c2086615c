//! JSON serialization for parse tables.
//!
//! The JSON form is the debuggable twin of the binary blob: generators can
//! emit it for inspection and the runtime can load either.

use crate::binary::TableError;
use crate::ParseTable;

impl ParseTable {
    /// Parse a table from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        serde_json::from_str(json).map_err(TableError::Json)
    }

    /// Serialize the table to pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("serialization should not fail")
    }
}
