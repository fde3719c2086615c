//! Context trackers: user values plumbed through shift, reduce, and reuse.
//!
//! A tracker partitions stacks that would otherwise look equal (same state,
//! same frames) but carry different parse context, such as indentation
//! depth. The engine treats the value as opaque; only identity and the
//! tracker's hash matter to it.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use alder_tables::Term;

use crate::input::InputStream;
use crate::run::TreeHandle;
use crate::stack::Stack;

/// Opaque context value carried on a stack.
pub type Context = Rc<dyn Any>;

/// User-supplied tracker plumbed through stack operations.
pub trait ContextTracker {
    /// Context for a freshly started stack.
    fn start(&self) -> Context;

    /// Context after shifting `term`.
    fn shift(
        &self,
        context: &Context,
        term: Term,
        stack: &Stack,
        input: &mut InputStream<'_>,
    ) -> Context {
        let _ = (term, stack, input);
        context.clone()
    }

    /// Context after a reduction producing `term`.
    fn reduce(
        &self,
        context: &Context,
        term: Term,
        stack: &Stack,
        input: &mut InputStream<'_>,
    ) -> Context {
        let _ = (term, stack, input);
        context.clone()
    }

    /// Context after installing a prebuilt subtree.
    fn reuse(
        &self,
        context: &Context,
        node: &Rc<dyn TreeHandle>,
        stack: &Stack,
        input: &mut InputStream<'_>,
    ) -> Context {
        let _ = (node, stack, input);
        context.clone()
    }

    /// Hash of a context value. Stacks with equal hashes are considered
    /// context-equal by the driver.
    fn hash(&self, context: &Context) -> u32;

    /// Strict trackers flush context markers into the buffer so incremental
    /// reuse can invalidate on context changes.
    fn strict(&self) -> bool {
        true
    }
}

/// A tracker paired with its current value and hash.
#[derive(Clone)]
pub struct StackContext {
    pub(crate) tracker: Rc<dyn ContextTracker>,
    pub(crate) context: Context,
    pub(crate) hash: u32,
}

impl StackContext {
    pub(crate) fn new(tracker: Rc<dyn ContextTracker>, context: Context) -> Self {
        let hash = if tracker.strict() {
            tracker.hash(&context)
        } else {
            0
        };
        Self {
            tracker,
            context,
            hash,
        }
    }

    /// The current context value.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The tracker's hash of the current value (0 for non-strict trackers).
    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl fmt::Debug for StackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackContext")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}
