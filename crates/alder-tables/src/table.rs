//! Parse-table data model and dense lookups.
//!
//! A table is a handful of flat integer arrays. States are fixed-size
//! records in `states`; action and skip sequences live in `data` as
//! `(term, action-lo, action-hi)` triples with sentinel terminators; the
//! goto table groups source states per `(term, target)` edge.

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, DialectSpec};
use crate::{Action, StateId, Term, action};

/// The error term. Every table reserves id 0 for it.
pub const TERM_ERR: Term = 0;

/// Words per state record in [`ParseTable::states`].
pub const STATE_SIZE: usize = 6;

/// Target marker for goto padding groups (terms below the covered range
/// that have no goto entries of their own).
pub const GOTO_NONE: u16 = 0xFFFF;

/// Default for [`ParseTable::buffer_length`].
pub const DEFAULT_BUFFER_LENGTH: u32 = 1024;

/// Slot indices within a state record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum StateSlot {
    /// State flag bits, see [`StateFlag`].
    Flags = 0,
    /// Offset of the action sequence in `data`.
    Actions = 1,
    /// Offset of the skip sequence in `data`.
    Skip = 2,
    /// Bit mask of tokenizer groups to run in this state.
    TokenizerMask = 3,
    /// Reduction applied without consulting the token, or 0.
    DefaultReduce = 4,
    /// Reduction forced during error recovery, or 0.
    ForcedReduce = 5,
}

/// State flag bits stored in [`StateSlot::Flags`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum StateFlag {
    /// The state only matches skipped content; shifts into it do not move
    /// the reduction boundary.
    Skipped = 1,
    /// Reaching this state completes a top rule.
    Accepting = 2,
}

/// Sentinel markers terminating action sequences in `data`.
pub mod seq {
    /// End-of-sequence term marker.
    pub const END: u16 = 0xFFFF;
    /// Plain terminator.
    pub const DONE: u16 = 0;
    /// Terminator whose trailing pair is the offset of a continuation block.
    pub const NEXT: u16 = 1;
    /// Terminator whose trailing pair is a catch-all action.
    pub const OTHER: u16 = 2;
}

/// Read a little-endian `u32` stored as two `u16` words at `off`.
#[inline]
pub(crate) fn pair(data: &[u16], off: usize) -> u32 {
    data[off] as u32 | (data[off + 1] as u32) << 16
}

/// A pre-compiled LR(1) parse table.
///
/// All arrays are read-only at parse time; the engine never mutates a
/// table. Construction goes through [`crate::TableBuilder`] or
/// [`ParseTable::from_binary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTable {
    /// Per-state records, [`STATE_SIZE`] words each.
    pub states: Vec<u32>,
    /// Shared action and skip sequences.
    pub data: Vec<u16>,
    /// Goto table: a term-indexed header followed by grouped source lists.
    pub goto: Vec<u16>,
    /// Packed tokenizer DFA shared by the table's token groups.
    pub token_data: Vec<u16>,
    /// Entry state for the default top rule.
    pub top_state: StateId,
    /// First repeat term id. Terms at or above it are repeat balancing
    /// nodes and never appear in output buffers on zero-depth reductions.
    pub min_repeat_term: Term,
    /// Highest term id that appears as a node in output buffers.
    pub max_node: Term,
    /// Highest term id in the grammar.
    pub max_term: Term,
    /// Driver hint: buffer size (in records) at which materializing the
    /// top node into a reusable subtree pays off.
    pub buffer_length: u32,
    /// Specialization order: earlier terms override later ones when two
    /// tokenizers claim the same region.
    pub specialized: Vec<Term>,
    /// Per-term dynamic precedence values, applied to stack scores.
    pub dynamic_precedences: Vec<(Term, i32)>,
    /// Dialect definitions, each gating a set of terms.
    pub dialects: Vec<DialectSpec>,
}

impl ParseTable {
    /// Number of states in the table.
    pub fn state_count(&self) -> usize {
        self.states.len() / STATE_SIZE
    }

    /// Read one slot of a state record.
    #[inline]
    pub fn state_slot(&self, state: StateId, slot: StateSlot) -> u32 {
        self.states[state as usize * STATE_SIZE + slot as usize]
    }

    /// Query a state flag bit.
    #[inline]
    pub fn state_flag(&self, state: StateId, flag: StateFlag) -> bool {
        self.state_slot(state, StateSlot::Flags) & flag as u32 != 0
    }

    /// Look up the action for `terminal` in `state`, searching the action
    /// sequence and then the skip sequence. Returns 0 when none applies.
    ///
    /// Entries listed under the error term apply to every terminal.
    pub fn has_action(&self, state: StateId, terminal: Term) -> Action {
        let data = &self.data;
        for set in 0..2 {
            let slot = if set == 0 {
                StateSlot::Actions
            } else {
                StateSlot::Skip
            };
            let mut i = self.state_slot(state, slot) as usize;
            loop {
                let mut next = data[i];
                if next == seq::END {
                    if data[i + 1] == seq::NEXT {
                        i = pair(data, i + 2) as usize;
                        next = data[i];
                    } else if data[i + 1] == seq::OTHER {
                        return pair(data, i + 2);
                    } else {
                        break;
                    }
                }
                if next == terminal || next == TERM_ERR {
                    return pair(data, i + 1);
                }
                i += 3;
            }
        }
        0
    }

    /// Whether `action` is the default reduction or listed in the action
    /// sequence of `state`.
    pub fn valid_action(&self, state: StateId, action: Action) -> bool {
        if action == self.state_slot(state, StateSlot::DefaultReduce) {
            return true;
        }
        let data = &self.data;
        let mut i = self.state_slot(state, StateSlot::Actions) as usize;
        loop {
            if data[i] == seq::END {
                if data[i + 1] == seq::NEXT {
                    i = pair(data, i + 2) as usize;
                    continue;
                }
                return false;
            }
            if action == pair(data, i + 1) {
                return true;
            }
            i += 3;
        }
    }

    /// Goto table lookup.
    ///
    /// With `loose` set, a group marked last answers for any source state;
    /// this is how reductions resolve their target without re-listing every
    /// base state.
    pub fn get_goto(&self, state: StateId, term: Term, loose: bool) -> Option<StateId> {
        let table = &self.goto;
        if term as usize >= table[0] as usize {
            return None;
        }
        let mut pos = table[term as usize + 1] as usize;
        loop {
            let group_tag = table[pos];
            let target = table[pos + 1];
            pos += 2;
            let last = group_tag & 1 != 0;
            if last && loose {
                return (target != GOTO_NONE).then_some(target as StateId);
            }
            let end = pos + (group_tag >> 1) as usize;
            while pos < end {
                if table[pos] as StateId == state {
                    return (target != GOTO_NONE).then_some(target as StateId);
                }
                pos += 1;
            }
            if last {
                return None;
            }
        }
    }

    /// Enumerate the shift edges of `state` as `(term, target)` pairs,
    /// deduplicated by target. Used for recovery candidates.
    pub fn next_states(&self, state: StateId) -> Vec<(Term, StateId)> {
        let data = &self.data;
        let mut result: Vec<(Term, StateId)> = Vec::new();
        let mut i = self.state_slot(state, StateSlot::Actions) as usize;
        loop {
            if data[i] == seq::END {
                if data[i + 1] == seq::NEXT {
                    i = pair(data, i + 2) as usize;
                    continue;
                }
                break;
            }
            if data[i + 2] & (action::REDUCE_FLAG >> 16) as u16 == 0 {
                let value = data[i + 1];
                if !result.iter().any(|&(_, s)| s == value as StateId) {
                    result.push((data[i], value as StateId));
                }
            }
            i += 3;
        }
        result
    }

    /// Dynamic precedence for `term`, or 0.
    pub fn dynamic_precedence(&self, term: Term) -> i32 {
        self.dynamic_precedences
            .iter()
            .find(|&&(t, _)| t == term)
            .map_or(0, |&(_, p)| p)
    }

    /// Whether a newly recognized `token` takes precedence over a `prev`
    /// token covering the same region.
    pub fn overrides(&self, token: Term, prev: Term) -> bool {
        let offset = |t: Term| self.specialized.iter().position(|&s| s == t);
        match offset(prev) {
            None => true,
            Some(p) => offset(token).is_none_or(|n| n < p),
        }
    }

    /// Resolve a dialect selection. Terms gated by dialects that are not in
    /// `enabled` are disabled.
    pub fn dialect(&self, enabled: &[&str]) -> Dialect {
        let flags: Vec<bool> = self
            .dialects
            .iter()
            .map(|d| enabled.contains(&d.name.as_str()))
            .collect();
        let mut disabled: Option<Vec<u8>> = None;
        for (spec, &on) in self.dialects.iter().zip(&flags) {
            if on {
                continue;
            }
            for &term in &spec.terms {
                disabled.get_or_insert_with(|| vec![0; self.max_term as usize + 1])
                    [term as usize] = 1;
            }
        }
        Dialect { flags, disabled }
    }
}
