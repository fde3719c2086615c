//! State owned by one parse and shared by all its live stacks.

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;

use alder_tables::{Dialect, ParseTable, Term};

use crate::context::ContextTracker;
use crate::cursor::StackBufferCursor;
use crate::input::{Gap, Input, InputStream};
use crate::trace::{NoopTracer, Tracer};

/// A prebuilt subtree installed into output buffers by reference.
///
/// The engine only needs the input length a subtree covers; everything else
/// belongs to the tree builder that produced it.
pub trait TreeHandle {
    /// Length of input the subtree covers.
    fn len(&self) -> u32;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Materializes buffer records into a reusable subtree. Implemented by the
/// external tree builder.
pub trait TreeBuilder {
    /// Build a handle from the `len / 4` words ending at `cursor`'s
    /// position. `reused` resolves reused-subtree records the slice may
    /// contain.
    fn build(
        &mut self,
        cursor: StackBufferCursor<'_>,
        len: usize,
        reused: &[Rc<dyn TreeHandle>],
    ) -> Rc<dyn TreeHandle>;
}

/// A nestable subrange recorded while a stack parsed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestRange {
    pub term: Term,
    pub from: u32,
    pub to: u32,
}

/// Shared per-parse state: the table, the stream, the tables every stack
/// appends into, and the per-stack side state. Only the stack currently
/// being advanced mutates any of it.
pub struct ParseRun<'p, T: Tracer = NoopTracer> {
    pub parser: &'p ParseTable,
    pub dialect: Dialect,
    pub stream: InputStream<'p>,
    /// Prebuilt subtrees referenced by `size = -1` buffer records.
    pub reused: Vec<Rc<dyn TreeHandle>>,
    /// Property values referenced by `size = -2` buffer records.
    pub prop_values: Vec<Rc<dyn Any>>,
    /// Context tracker applied to every stack started under this run.
    pub tracker: Option<Rc<dyn ContextTracker>>,
    /// Terms whose completed ranges may host a nested parse.
    pub nested_terms: Vec<Term>,
    /// Node type standing in for gapped regions, defined once per parse.
    pub placeholder: Term,
    pub tracer: T,
    /// Latest nestable range per stack id.
    nesting: IndexMap<u32, NestRange>,
    next_stack_id: u32,
}

impl<'p> ParseRun<'p, NoopTracer> {
    pub fn new(parser: &'p ParseTable, input: &'p dyn Input) -> Self {
        Self::with_tracer(parser, input, NoopTracer)
    }
}

impl<'p, T: Tracer> ParseRun<'p, T> {
    pub fn with_tracer(parser: &'p ParseTable, input: &'p dyn Input, tracer: T) -> Self {
        Self {
            parser,
            dialect: parser.dialect(&[]),
            stream: InputStream::new(input),
            reused: Vec::new(),
            prop_values: Vec::new(),
            tracker: None,
            nested_terms: Vec::new(),
            placeholder: 0,
            tracer,
            nesting: IndexMap::new(),
            next_stack_id: 0,
        }
    }

    /// Skip `gaps` in the input, reporting them as `placeholder` nodes.
    pub fn gaps(mut self, gaps: Vec<Gap>, placeholder: Term) -> Self {
        self.placeholder = placeholder;
        self.stream = InputStream::with_gaps(self.stream.source(), gaps);
        self
    }

    /// Select grammar dialects by name.
    pub fn dialect(mut self, enabled: &[&str]) -> Self {
        self.dialect = self.parser.dialect(enabled);
        self
    }

    /// Track context on every stack started under this run.
    pub fn tracker(mut self, tracker: Rc<dyn ContextTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Terms whose completed ranges are recorded for nested parsing.
    pub fn nested(mut self, terms: Vec<Term>) -> Self {
        self.nested_terms = terms;
        self
    }

    pub(crate) fn alloc_stack_id(&mut self) -> u32 {
        let id = self.next_stack_id;
        self.next_stack_id += 1;
        id
    }

    pub(crate) fn record_nest(&mut self, stack: u32, range: NestRange) {
        self.nesting.insert(stack, range);
    }

    /// Latest nestable range recorded for `stack`, if any.
    pub fn nest_range(&self, stack: u32) -> Option<NestRange> {
        self.nesting.get(&stack).copied()
    }

    /// Drop per-stack side state when the driver retires a stack.
    pub fn retire(&mut self, stack: u32) {
        self.nesting.shift_remove(&stack);
    }
}
