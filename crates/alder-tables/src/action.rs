//! Bit-packed parse action encoding.
//!
//! The layout is a wire contract shared with table generators, so it is kept
//! as documented constants rather than a richer enum:
//!
//! - Bit 16: reduce flag. Actions without it are shifts, and their low bits
//!   are the target state.
//! - Bits 0-15: value payload (the reduced term for reduces, the target
//!   state for shifts and gotos).
//! - Bit 17: repeat flag on reduces, goto flag on shifts. A goto shift is a
//!   non-consuming state change.
//! - Bit 18: stay flag. On shifts it marks a skipped-token shift that does
//!   not push a state; on reduces it keeps the recorded state instead of
//!   consulting the goto table.
//! - Bits 19 and up: reduction depth.

use crate::{Action, StateId, Term};

/// Marks an action as a reduction.
pub const REDUCE_FLAG: Action = 1 << 16;

/// Extracts the term or state payload of an action.
pub const VALUE_MASK: Action = 0xFFFF;

/// On reduce actions: the reduced term is a repeat term.
pub const REPEAT_FLAG: Action = 1 << 17;

/// On shift actions: non-consuming goto.
pub const GOTO_FLAG: Action = 1 << 17;

/// Skipped-token shift, or stay reduction.
pub const STAY_FLAG: Action = 1 << 18;

/// Shift amount for the reduction depth.
pub const REDUCE_DEPTH_SHIFT: u32 = 19;

/// Encode a plain shift to `state`.
#[inline]
pub fn shift(state: StateId) -> Action {
    state
}

/// Encode a non-consuming goto to `state`.
#[inline]
pub fn goto_shift(state: StateId) -> Action {
    GOTO_FLAG | state
}

/// Encode a skipped-token shift to `state`.
#[inline]
pub fn stay_shift(state: StateId) -> Action {
    STAY_FLAG | state
}

/// Encode a reduction of `depth` frames producing `term`.
#[inline]
pub fn reduce(term: Term, depth: u32) -> Action {
    REDUCE_FLAG | term as Action | (depth << REDUCE_DEPTH_SHIFT)
}

#[inline]
pub fn is_reduce(action: Action) -> bool {
    action & REDUCE_FLAG != 0
}

#[inline]
pub fn is_goto(action: Action) -> bool {
    !is_reduce(action) && action & GOTO_FLAG != 0
}

#[inline]
pub fn is_stay(action: Action) -> bool {
    action & STAY_FLAG != 0
}

#[inline]
pub fn has_repeat(action: Action) -> bool {
    is_reduce(action) && action & REPEAT_FLAG != 0
}

/// The term or state payload of an action.
#[inline]
pub fn value(action: Action) -> Term {
    (action & VALUE_MASK) as Term
}

/// The number of frames a reduction collapses.
#[inline]
pub fn depth(action: Action) -> u32 {
    action >> REDUCE_DEPTH_SHIFT
}
