//! Tokenizers: the packed group DFA interpreter and user recognizers.
//!
//! Grammar tables carry one packed DFA shared by all token groups; each
//! [`TokenGroup`] walks it with its own group mask so states and accepts
//! belonging to other groups are invisible to it. User-supplied
//! [`ExternalTokenizer`]s wrap arbitrary recognition over the stream.

use alder_tables::{Dialect, ParseTable, Term};

use crate::input::InputStream;
use crate::stack::Stack;

/// One token recognizer in the parse's tokenizer cascade.
pub trait Tokenizer {
    /// Read one token at the stream's position, reporting it through
    /// [`InputStream::accept_token`] or
    /// [`InputStream::accept_token_to`].
    fn token(
        &self,
        input: &mut InputStream<'_>,
        stack: &Stack,
        table: &ParseTable,
        dialect: &Dialect,
    );

    /// The result depends on the stack and must not be cached across
    /// stacks.
    fn contextual(&self) -> bool {
        false
    }

    /// Runs only when a higher-precedence tokenizer produced a token the
    /// current state does not accept.
    fn fallback(&self) -> bool {
        false
    }

    /// Does not stop the tokenizer cascade after producing a token.
    fn extend(&self) -> bool {
        false
    }
}

/// Walk the packed DFA in `data` for token group `group`.
///
/// Layout per state: `[group mask, accept end, edge count,
/// (term, group mask)…, (from, to, target)…]` where accept pairs run up to
/// `accept end` (an absolute offset), edges are sorted half-open byte
/// ranges, and targets are flat offsets into `data`.
pub fn read_token(
    data: &[u16],
    input: &mut InputStream<'_>,
    table: &ParseTable,
    dialect: &Dialect,
    group: u16,
) {
    let mut state = 0usize;
    let group_mask = 1u16 << group;
    loop {
        if data[state] & group_mask == 0 {
            // No token of this group is reachable from here.
            break;
        }
        let acc_end = data[state + 1] as usize;
        // Accept at most one token per state, possibly replacing a shorter
        // or overridden one read earlier.
        let mut i = state + 3;
        while i < acc_end {
            if data[i + 1] & group_mask != 0 {
                let term = data[i];
                if dialect.allows(term)
                    && (input.token.value == -1
                        || input.token.value == term as i32
                        || table.overrides(term, input.token.value as Term))
                {
                    input.accept_token(term);
                    break;
                }
            }
            i += 2;
        }
        let next = input.next;
        if next < 0 {
            break;
        }
        // Binary search the outgoing edges for `next`.
        let mut lo = 0usize;
        let mut hi = data[state + 2] as usize;
        let mut target = None;
        while lo < hi {
            let mid = (lo + hi) >> 1;
            let index = acc_end + mid * 3;
            let from = data[index] as i32;
            let to = data[index + 1] as i32;
            if next < from {
                hi = mid;
            } else if next >= to {
                lo = mid + 1;
            } else {
                target = Some(data[index + 2] as usize);
                break;
            }
        }
        match target {
            Some(t) => {
                state = t;
                input.advance();
            }
            None => break,
        }
    }
}

/// A tokenizer that reads one token group from a packed DFA.
#[derive(Debug, Clone)]
pub struct TokenGroup {
    data: Vec<u16>,
    id: u16,
}

impl TokenGroup {
    pub fn new(data: Vec<u16>, id: u16) -> Self {
        Self { data, id }
    }

    /// A group reading the table's shared tokenizer data.
    pub fn from_table(table: &ParseTable, id: u16) -> Self {
        Self::new(table.token_data.clone(), id)
    }
}

impl Tokenizer for TokenGroup {
    fn token(
        &self,
        input: &mut InputStream<'_>,
        _stack: &Stack,
        table: &ParseTable,
        dialect: &Dialect,
    ) {
        read_token(&self.data, input, table, dialect, self.id);
    }
}

/// Options adopted by an [`ExternalTokenizer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalOptions {
    pub contextual: bool,
    pub fallback: bool,
    pub extend: bool,
}

/// A user-supplied token recognizer.
pub struct ExternalTokenizer {
    read: Box<dyn Fn(&mut InputStream<'_>, &Stack)>,
    options: ExternalOptions,
}

impl ExternalTokenizer {
    pub fn new(
        read: impl Fn(&mut InputStream<'_>, &Stack) + 'static,
        options: ExternalOptions,
    ) -> Self {
        Self {
            read: Box::new(read),
            options,
        }
    }
}

impl Tokenizer for ExternalTokenizer {
    fn token(
        &self,
        input: &mut InputStream<'_>,
        stack: &Stack,
        _table: &ParseTable,
        _dialect: &Dialect,
    ) {
        (self.read)(input, stack);
    }

    fn contextual(&self) -> bool {
        self.options.contextual
    }

    fn fallback(&self) -> bool {
        self.options.fallback
    }

    fn extend(&self) -> bool {
        self.options.extend
    }
}
