//! Dialect definitions and resolved dialect state.

use serde::{Deserialize, Serialize};

use crate::Term;

/// A dialect definition carried on the table: a name and the terms that
/// only exist when the dialect is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectSpec {
    pub name: String,
    pub terms: Vec<Term>,
}

/// A resolved dialect selection, built by [`crate::ParseTable::dialect`].
#[derive(Debug, Clone, Default)]
pub struct Dialect {
    /// Per-dialect enabled flags, in table definition order.
    pub(crate) flags: Vec<bool>,
    /// Per-term disabled markers, or `None` when nothing is disabled.
    pub(crate) disabled: Option<Vec<u8>>,
}

impl Dialect {
    /// Whether `term` is allowed under this selection.
    #[inline]
    pub fn allows(&self, term: Term) -> bool {
        match &self.disabled {
            None => true,
            Some(disabled) => disabled[term as usize] == 0,
        }
    }

    /// Whether the dialect with the given definition index is enabled.
    #[inline]
    pub fn flag(&self, dialect_id: usize) -> bool {
        self.flags.get(dialect_id).copied().unwrap_or(false)
    }
}
