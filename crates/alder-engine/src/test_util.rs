//! Shared fixtures for engine tests: a small hand-assembled expression
//! grammar and minimal tree-builder plumbing.

use std::rc::Rc;

use alder_tables::{ParseTable, StateFlag, StateSpec, TableBuilder, action};

use crate::context::{Context, ContextTracker};
use crate::cursor::StackBufferCursor;
use crate::input::InputStream;
use crate::run::{TreeBuilder, TreeHandle};
use crate::stack::Stack;

pub const PLUS: u16 = 1;
pub const SPACE: u16 = 2;
pub const ATOM: u16 = 3;
pub const SEMI: u16 = 4;
pub const TOP: u16 = 5;
pub const EOF: u16 = 6;

/// `Top -> atom | atom '+' atom`, spaces skipped, an optional semicolon
/// after a completed top rule. States:
///
/// - s0: start
/// - s1: after the first atom
/// - s2: after '+'
/// - s3: goto(s0, Top), accepting
/// - s4: after `atom '+' atom`
/// - s5: default-reduces Top (for shift scans)
/// - s6: dead end (no actions at all)
/// - s7: after the optional semicolon
/// - s8: forced reduction that is not a valid action
/// - s9: stay-flagged default reduction (for shift scans)
pub fn expr_table() -> ParseTable {
    let mut b = TableBuilder::new();
    b.max_node = TOP;
    b.max_term = EOF;

    let skip_space = vec![(SPACE, action::stay_shift(0))];
    b.add_state(StateSpec {
        actions: vec![(ATOM, action::shift(1))],
        skip: skip_space.clone(),
        ..StateSpec::default()
    });
    b.add_state(StateSpec {
        actions: vec![(PLUS, action::shift(2)), (EOF, action::reduce(TOP, 1))],
        skip: skip_space.clone(),
        forced_reduce: action::reduce(TOP, 1),
        ..StateSpec::default()
    });
    b.add_state(StateSpec {
        actions: vec![(ATOM, action::shift(4))],
        skip: skip_space.clone(),
        ..StateSpec::default()
    });
    b.add_state(StateSpec {
        flags: StateFlag::Accepting as u32,
        actions: vec![(SEMI, action::shift(7))],
        ..StateSpec::default()
    });
    b.add_state(StateSpec {
        actions: vec![(EOF, action::reduce(TOP, 3))],
        skip: skip_space,
        forced_reduce: action::reduce(TOP, 3),
        ..StateSpec::default()
    });
    b.add_state(StateSpec {
        default_reduce: action::reduce(TOP, 1),
        ..StateSpec::default()
    });
    b.add_state(StateSpec::default());
    b.add_state(StateSpec::default());
    b.add_state(StateSpec {
        forced_reduce: action::reduce(TOP, 1),
        ..StateSpec::default()
    });
    b.add_state(StateSpec {
        default_reduce: action::reduce(TOP, 1) | action::STAY_FLAG,
        ..StateSpec::default()
    });

    b.add_goto(TOP, 3, &[0]);
    b.finish()
}

/// All records of a stack's logical buffer, oldest first.
pub fn records(stack: &Stack) -> Vec<[i32; 4]> {
    let mut cursor = StackBufferCursor::new(stack);
    let mut out = Vec::new();
    while cursor.pos() > 0 {
        out.push([cursor.id(), cursor.start(), cursor.end(), cursor.size()]);
        cursor.next();
    }
    out.reverse();
    out
}

pub struct LeafHandle(pub u32);

impl TreeHandle for LeafHandle {
    fn len(&self) -> u32 {
        self.0
    }
}

pub fn leaf(len: u32) -> Rc<dyn TreeHandle> {
    Rc::new(LeafHandle(len))
}

/// Tree builder that records what it was asked to build, newest record
/// first, and returns a handle covering the top record's range.
#[derive(Default)]
pub struct ListBuilder {
    pub records: Vec<[i32; 4]>,
}

impl TreeBuilder for ListBuilder {
    fn build(
        &mut self,
        mut cursor: StackBufferCursor<'_>,
        len: usize,
        _reused: &[Rc<dyn TreeHandle>],
    ) -> Rc<dyn TreeHandle> {
        let span = (cursor.end() - cursor.start()) as u32;
        let mut remaining = len;
        while remaining > 0 {
            self.records
                .push([cursor.id(), cursor.start(), cursor.end(), cursor.size()]);
            remaining -= 4;
            cursor.next();
        }
        Rc::new(LeafHandle(span))
    }
}

/// Tracker whose context counts shifted terminals.
pub struct CountingTracker;

impl ContextTracker for CountingTracker {
    fn start(&self) -> Context {
        Rc::new(0i64)
    }

    fn shift(
        &self,
        context: &Context,
        _term: u16,
        _stack: &Stack,
        _input: &mut InputStream<'_>,
    ) -> Context {
        let count = *context.downcast_ref::<i64>().expect("counting context");
        Rc::new(count + 1)
    }

    fn hash(&self, context: &Context) -> u32 {
        *context.downcast_ref::<i64>().expect("counting context") as u32
    }
}
