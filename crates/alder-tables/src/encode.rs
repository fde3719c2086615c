//! Programmatic table assembly.
//!
//! The builder does not compile grammars; it lays out explicitly-given
//! states, actions, and goto edges into the flat arrays the runtime reads.
//! Generators and tests construct tables through it instead of hand-packing
//! offsets.

use crate::table::{GOTO_NONE, STATE_SIZE, seq};
use crate::{Action, ParseTable, StateId, Term};

/// Everything that makes up one state record.
#[derive(Debug, Clone, Default)]
pub struct StateSpec {
    /// Flag bits, see [`crate::StateFlag`].
    pub flags: u32,
    /// Per-terminal actions, in lookup order.
    pub actions: Vec<(Term, Action)>,
    /// Catch-all action appended after the listed ones.
    pub other: Option<Action>,
    /// Skip actions for tokens that do not take part in reductions.
    pub skip: Vec<(Term, Action)>,
    /// Reduction applied without consulting the token, or 0.
    pub default_reduce: Action,
    /// Reduction forced during error recovery, or 0.
    pub forced_reduce: Action,
    /// Bit mask of tokenizer groups active in this state.
    pub tokenizer_mask: u32,
}

/// Assembles a [`ParseTable`] from state specs and goto edges.
#[derive(Debug, Default)]
pub struct TableBuilder {
    states: Vec<StateSpec>,
    /// `(term, target, sources)` goto edges in definition order.
    goto: Vec<(Term, StateId, Vec<StateId>)>,
    pub token_data: Vec<u16>,
    pub top_state: StateId,
    pub min_repeat_term: Term,
    pub max_node: Term,
    pub max_term: Term,
    pub buffer_length: u32,
    pub specialized: Vec<Term>,
    pub dynamic_precedences: Vec<(Term, i32)>,
    pub dialects: Vec<crate::DialectSpec>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            // No repeat terms unless the caller lowers this.
            min_repeat_term: Term::MAX,
            buffer_length: crate::table::DEFAULT_BUFFER_LENGTH,
            ..Self::default()
        }
    }

    /// Add a state record, returning its id.
    pub fn add_state(&mut self, spec: StateSpec) -> StateId {
        self.states.push(spec);
        self.states.len() as StateId - 1
    }

    /// Add a goto edge: reducing `term` with any of `sources` on top moves
    /// to `target`.
    pub fn add_goto(&mut self, term: Term, target: StateId, sources: &[StateId]) {
        self.goto.push((term, target, sources.to_vec()));
    }

    pub fn finish(self) -> ParseTable {
        // Shared empty sequence for states without actions or skips.
        let mut data: Vec<u16> = vec![seq::END, seq::DONE, 0];
        let empty_seq = 0u32;

        let mut states = Vec::with_capacity(self.states.len() * STATE_SIZE);
        for spec in &self.states {
            let actions = emit_seq(&mut data, &spec.actions, spec.other, empty_seq);
            let skip = emit_seq(&mut data, &spec.skip, None, empty_seq);
            states.extend([
                spec.flags,
                actions,
                skip,
                spec.tokenizer_mask,
                spec.default_reduce,
                spec.forced_reduce,
            ]);
        }

        let goto = emit_goto(&self.goto);

        ParseTable {
            states,
            data,
            goto,
            token_data: self.token_data,
            top_state: self.top_state,
            min_repeat_term: self.min_repeat_term,
            max_node: self.max_node,
            max_term: self.max_term,
            buffer_length: self.buffer_length,
            specialized: self.specialized,
            dynamic_precedences: self.dynamic_precedences,
            dialects: self.dialects,
        }
    }
}

/// Emit one `(term, action)` sequence into `data`, returning its offset.
fn emit_seq(
    data: &mut Vec<u16>,
    entries: &[(Term, Action)],
    other: Option<Action>,
    empty_seq: u32,
) -> u32 {
    if entries.is_empty() && other.is_none() {
        return empty_seq;
    }
    let off = data.len() as u32;
    for &(term, act) in entries {
        data.extend([term, act as u16, (act >> 16) as u16]);
    }
    match other {
        Some(act) => data.extend([seq::END, seq::OTHER, act as u16, (act >> 16) as u16]),
        None => data.extend([seq::END, seq::DONE, 0]),
    }
    off
}

/// Lay out the goto table: a term-indexed header, then one block chain per
/// term. Terms below the covered range without edges of their own point at
/// a shared padding group.
fn emit_goto(edges: &[(Term, StateId, Vec<StateId>)]) -> Vec<u16> {
    let Some(max_term) = edges.iter().map(|&(t, _, _)| t).max() else {
        return vec![0];
    };
    let header = max_term as usize + 2;
    let mut table = vec![0u16; header];
    table[0] = max_term + 1;

    // Shared padding group: last, no sources, no target.
    let padding = table.len() as u16;
    table.extend([1, GOTO_NONE]);

    for term in 0..=max_term {
        let groups: Vec<_> = edges.iter().filter(|&&(t, _, _)| t == term).collect();
        if groups.is_empty() {
            table[term as usize + 1] = padding;
            continue;
        }
        table[term as usize + 1] = table.len() as u16;
        for (i, group) in groups.iter().enumerate() {
            let (_, target, sources) = &**group;
            let last = (i == groups.len() - 1) as u16;
            table.push((sources.len() as u16) << 1 | last);
            table.push(*target as u16);
            table.extend(sources.iter().map(|&s| s as u16));
        }
    }
    assert!(table.len() <= u16::MAX as usize, "goto table overflow");
    table
}

/// One tokenizer DFA state for [`TokenDfaBuilder`].
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    /// Bit mask of the token groups reachable through this state.
    pub group_mask: u16,
    /// `(term, group mask)` pairs accepted in this state.
    pub accepts: Vec<(Term, u16)>,
    /// Half-open byte ranges `[from, to)` with target state indices.
    pub edges: Vec<(u16, u16, usize)>,
}

/// Packs tokenizer states into the flat `u16` layout the group interpreter
/// walks: per state `[group mask, accept end, edge count, accepts…, edges…]`
/// with edge targets resolved to flat offsets.
#[derive(Debug, Default)]
pub struct TokenDfaBuilder {
    states: Vec<TokenState>,
}

impl TokenDfaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state, returning its index for use in edge targets.
    pub fn add_state(&mut self, state: TokenState) -> usize {
        self.states.push(state);
        self.states.len() - 1
    }

    pub fn encode(&self) -> Vec<u16> {
        // First pass: flat offset of every state.
        let mut offsets = Vec::with_capacity(self.states.len());
        let mut off = 0usize;
        for state in &self.states {
            offsets.push(off as u16);
            off += 3 + 2 * state.accepts.len() + 3 * state.edges.len();
        }

        let mut data = Vec::with_capacity(off);
        for (state, &state_off) in self.states.iter().zip(&offsets) {
            let acc_end = state_off + 3 + 2 * state.accepts.len() as u16;
            data.extend([state.group_mask, acc_end, state.edges.len() as u16]);
            for &(term, mask) in &state.accepts {
                data.extend([term, mask]);
            }
            let mut edges = state.edges.clone();
            edges.sort_by_key(|&(from, _, _)| from);
            for &(from, to, target) in &edges {
                data.extend([from, to, offsets[target]]);
            }
        }
        data
    }
}
