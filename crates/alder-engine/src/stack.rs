//! The parse stack: states, output buffer, context, and recovery.
//!
//! # Design: shared-suffix buffers
//!
//! Stacks fork constantly while the driver explores ambiguous or broken
//! input, so the output buffer is a cactus structure: every stack owns a
//! mutable tail of records, and the settled history lives in a chain of
//! frozen [`BufferSlab`]s shared through `Rc`. `split` freezes the records
//! at or before `reduce_pos` into a slab and clones only the outstanding
//! tail, so forking is cheap and ancestors are immutable from every
//! descendant's viewpoint. The one place that wants to touch a frozen
//! record (error coalescing) goes through `Rc::make_mut`, which clones a
//! shared slab instead of mutating it under a sibling.
//!
//! # Buffer record layout
//!
//! Records are four `i32` words `(term, start, end, size)`. `size` is the
//! number of words the node covers including its own record, or a negative
//! sentinel: -1 reused subtree (`term` indexes the run's `reused` table),
//! -2 property attachment (`term` indexes `prop_values`, `end` is the
//! property id), -3 context-hash marker, -4 lookahead marker.

use std::rc::Rc;

use alder_tables::table::seq;
use alder_tables::{
    Action, ParseTable, StateFlag, StateId, StateSlot, TERM_ERR, Term, action,
};

use crate::context::{Context, StackContext};
use crate::run::{NestRange, ParseRun, TreeBuilder, TreeHandle};
use crate::simulate::SimulatedStack;
use crate::trace::Tracer;

/// Recovery costs and fanout limits.
pub mod recover {
    /// Score penalty for recovering by token insertion.
    pub const INSERT: i32 = 200;
    /// Score penalty for recovering by token deletion.
    pub const DELETE: i32 = 190;
    /// Score penalty for a forced reduction with an invalid action.
    pub const REDUCE: i32 = 100;
    /// Maximum stacks forked per insertion-recovery step.
    pub const MAX_NEXT: usize = 4;
    /// Frame depth (in flat words) beyond which insertion recovery stops.
    pub const MAX_INSERT_STACK_DEPTH: usize = 300;
    /// Frame depth (in flat words) beyond which insertion candidates are
    /// restricted to states that can act on the next token.
    pub const DAMPEN_INSERT_STACK_DEPTH: usize = 120;
}

/// One historical push: the state that was current, the input position the
/// push covers from, and the logical buffer length at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub state: StateId,
    pub start: u32,
    pub buffer_base: u32,
}

/// A frozen run of buffer records shared between forked stacks.
#[derive(Debug, Clone)]
pub(crate) struct BufferSlab {
    /// Absolute word offset this slab starts at.
    pub base: u32,
    pub data: Vec<i32>,
    pub parent: Option<Rc<BufferSlab>>,
}

/// A parse stack.
///
/// All mutation during parsing goes through [`Stack::apply`] and the
/// recovery operations; the driver holds several stacks and advances them
/// one at a time against the shared [`ParseRun`].
#[derive(Debug)]
pub struct Stack {
    /// Stable identity token, used to key per-stack side tables.
    id: u32,
    /// Current LR state.
    pub state: StateId,
    frames: Vec<Frame>,
    /// Input position consumed up to.
    pos: u32,
    /// Position the next reduction nominally ends at. Trails `pos` only
    /// while skipped tokens have been shifted but not yet absorbed.
    reduce_pos: u32,
    /// Dynamic precedence and recovery penalties; higher is better.
    score: i32,
    /// Mutable tail of the output buffer.
    buffer: Vec<i32>,
    /// Absolute word offset where `buffer` begins.
    buffer_base: u32,
    parent: Option<Rc<BufferSlab>>,
    context: Option<StackContext>,
    /// Maximum position that influenced decisions on this stack.
    look_ahead: u32,
}

impl Stack {
    /// Start a stack at `state`, with an empty buffer and the run's context
    /// tracker (if any) started.
    pub fn start<T: Tracer>(run: &mut ParseRun<'_, T>, state: StateId, pos: u32) -> Self {
        let context = run.tracker.clone().map(|tracker| {
            let value = tracker.start();
            StackContext::new(tracker, value)
        });
        Self {
            id: run.alloc_stack_id(),
            state,
            frames: Vec::new(),
            pos,
            reduce_pos: pos,
            score: 0,
            buffer: Vec::new(),
            buffer_base: 0,
            parent: None,
            context,
            look_ahead: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    pub fn reduce_pos(&self) -> u32 {
        self.reduce_pos
    }

    #[inline]
    pub fn score(&self) -> i32 {
        self.score
    }

    #[inline]
    pub fn look_ahead(&self) -> u32 {
        self.look_ahead
    }

    /// Number of frames on the stack.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The mutable tail of the buffer (records past the last split).
    #[inline]
    pub fn buffer(&self) -> &[i32] {
        &self.buffer
    }

    /// Absolute word offset the local buffer begins at.
    #[inline]
    pub fn buffer_base(&self) -> u32 {
        self.buffer_base
    }

    /// Logical buffer length in words, ancestors included.
    #[inline]
    pub fn total_buffer_len(&self) -> usize {
        self.buffer_base as usize + self.buffer.len()
    }

    pub(crate) fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn parent_slab(&self) -> Option<&BufferSlab> {
        self.parent.as_deref()
    }

    /// The context value and hash, when a tracker is active.
    pub fn context(&self) -> Option<&StackContext> {
        self.context.as_ref()
    }

    /// Push a frame recording the current state and move to `state`.
    pub fn push_state(&mut self, state: StateId, start: u32) {
        self.frames.push(Frame {
            state: self.state,
            start,
            buffer_base: self.buffer_base + self.buffer.len() as u32,
        });
        self.state = state;
    }

    /// Apply a parse action: dispatch to [`Stack::reduce`] or
    /// [`Stack::shift`]. These are the only mutating entry points the
    /// driver uses during regular parsing.
    pub fn apply<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        act: Action,
        next: Term,
        next_end: u32,
    ) {
        if action::is_reduce(act) {
            self.reduce(run, act);
        } else {
            self.shift(run, act, next, next_end);
        }
    }

    /// Shift `next`, or perform a non-consuming goto.
    pub fn shift<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        act: Action,
        next: Term,
        next_end: u32,
    ) {
        let start = self.pos;
        if act & action::GOTO_FLAG != 0 {
            // Non-consuming state change.
            self.push_state(action::value(act) as StateId, self.pos);
            run.tracer.trace_shift(self.id, self.state, next, start, start);
        } else if act & action::STAY_FLAG == 0 {
            // Regular shift.
            let next_state = action::value(act) as StateId;
            let parser = run.parser;
            if next_end > self.pos || next <= parser.max_node {
                self.pos = next_end;
                if !parser.state_flag(next_state, StateFlag::Skipped) {
                    self.reduce_pos = next_end;
                }
            }
            self.push_state(next_state, start);
            self.shift_context(run, next, start);
            if next <= parser.max_node {
                self.emit_terminal(run, next, start, next_end);
            }
            run.tracer.trace_shift(self.id, self.state, next, start, next_end);
        } else {
            // Skipped token: consume input without pushing a state.
            self.pos = next_end;
            self.shift_context(run, next, start);
            if next <= run.parser.max_node {
                self.emit_terminal(run, next, start, next_end);
            }
        }
    }

    /// Perform a reduction.
    pub fn reduce<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>, act: Action) {
        let depth = action::depth(act) as usize;
        let term = action::value(act);
        let parser = run.parser;

        let d_prec = parser.dynamic_precedence(term);
        if d_prec != 0 {
            self.score += d_prec;
        }

        if depth == 0 {
            let target = parser
                .get_goto(self.state, term, true)
                .expect("missing goto after zero-depth reduction");
            self.push_state(target, self.reduce_pos);
            // Zero-depth reductions add a padding node, except for repeat
            // terms.
            if term < parser.min_repeat_term {
                self.store_node(run, term, self.reduce_pos, self.reduce_pos, 4, true);
            }
            self.reduce_context(run, term, self.reduce_pos);
            run.tracer.trace_reduce(self.id, term, 0, self.state);
            return;
        }

        // Base frame index. Stay reductions consume two extra frames: the
        // dummy parent for the skipped expression and the state being
        // stayed in.
        let stay = act & action::STAY_FLAG != 0;
        let base = (self.frames.len() + 1)
            .checked_sub(depth + if stay { 2 } else { 0 })
            .expect("reduction deeper than the stack");
        let (start, base_buffer) = if base > 0 {
            let frame = self.frames[base - 1];
            (frame.start, frame.buffer_base)
        } else {
            (0, 0)
        };
        let count = self.buffer_base + self.buffer.len() as u32 - base_buffer;

        // Store normal terms and repeat-balance reductions.
        if term < parser.min_repeat_term || act & action::REPEAT_FLAG != 0 {
            let end = if parser.state_flag(self.state, StateFlag::Skipped) {
                self.pos
            } else {
                self.reduce_pos
            };
            self.store_node(run, term, start, end, count as i32 + 4, true);
        }

        if stay {
            self.state = self.frames[base].state;
        } else {
            let base_state = self.frames[base - 1].state;
            self.state = parser
                .get_goto(base_state, term, true)
                .expect("missing goto after reduction");
        }
        self.frames.truncate(base);
        self.reduce_context(run, term, start);
        run.tracer.trace_reduce(self.id, term, depth as u32, self.state);
    }

    /// Append a node record, coalescing adjacent error nodes and keeping
    /// records ordered by `end` when a reduction closes before already
    /// emitted skipped tokens.
    pub fn store_node<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        term: Term,
        start: u32,
        end: u32,
        size: i32,
        is_reduce: bool,
    ) {
        if term == TERM_ERR {
            // Adjacent error nodes merge instead of accumulating. The most
            // recent record may live in the parent slab when the local
            // buffer is empty.
            if !self.buffer.is_empty() {
                let top = self.buffer.len();
                if self.buffer[top - 4] == TERM_ERR as i32 && self.buffer[top - 1] >= 0 {
                    if start == end {
                        return;
                    }
                    if self.buffer[top - 2] >= start as i32 {
                        self.buffer[top - 2] = end as i32;
                        return;
                    }
                }
            } else if let Some(parent) = &self.parent {
                let top = parent.data.len();
                let top_is_err =
                    parent.data[top - 4] == TERM_ERR as i32 && parent.data[top - 1] >= 0;
                let top_end = parent.data[top - 2];
                if top_is_err {
                    if start == end {
                        return;
                    }
                    if top_end >= start as i32 {
                        // Clones the slab when a sibling still shares it.
                        let parent = self.parent.as_mut().unwrap();
                        Rc::make_mut(parent).data[top - 2] = end as i32;
                        return;
                    }
                }
            }
        }

        let mut size = size;
        if !is_reduce || self.pos == end {
            self.buffer
                .extend([term as i32, start as i32, end as i32, size]);
        } else {
            // The reduction ends before already emitted skipped tokens;
            // slide them forward and insert in `end` order.
            let mut index = self.buffer.len();
            if index > 0 && self.buffer[index - 4] != TERM_ERR as i32 {
                let mut must_move = false;
                let mut scan = index;
                while scan > 0 && self.buffer[scan - 2] > end as i32 {
                    if self.buffer[scan - 1] >= 0 {
                        must_move = true;
                        break;
                    }
                    scan -= 4;
                }
                if must_move {
                    self.buffer.extend([0; 4]);
                    while index > 0 && self.buffer[index - 2] > end as i32 {
                        self.buffer[index] = self.buffer[index - 4];
                        self.buffer[index + 1] = self.buffer[index - 3];
                        self.buffer[index + 2] = self.buffer[index - 2];
                        self.buffer[index + 3] = self.buffer[index - 1];
                        index -= 4;
                        // Moved records leave the new node's coverage.
                        if size > 4 {
                            size -= 4;
                        }
                    }
                }
            }
            if index == self.buffer.len() {
                self.buffer
                    .extend([term as i32, start as i32, end as i32, size]);
            } else {
                self.buffer[index] = term as i32;
                self.buffer[index + 1] = start as i32;
                self.buffer[index + 2] = end as i32;
                self.buffer[index + 3] = size;
            }
        }
        self.check_nest(run, term, start, end);
    }

    /// Append a terminal record, inserting placeholder nodes for any gaps
    /// the shifted region crosses.
    fn emit_terminal<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        term: Term,
        start: u32,
        end: u32,
    ) {
        let mut size = 4;
        if !run.stream.gaps().is_empty() {
            size += self.maybe_insert_gap_nodes(run, start, end);
        }
        self.buffer
            .extend([term as i32, start as i32, end as i32, size]);
        self.check_nest(run, term, start, end);
    }

    /// Emit placeholder records for gaps inside `[start, end)`; returns the
    /// extra size the covering record absorbs.
    fn maybe_insert_gap_nodes<T: Tracer>(
        &mut self,
        run: &ParseRun<'_, T>,
        start: u32,
        end: u32,
    ) -> i32 {
        let mut extra = 0;
        let placeholder = run.placeholder;
        for gap in run.stream.gaps() {
            if gap.from >= start && gap.from < end {
                self.buffer
                    .extend([placeholder as i32, gap.from as i32, gap.to as i32, 4]);
                extra += 4;
            }
        }
        extra
    }

    /// Record the range when `term` can host a nested parse.
    fn check_nest<T: Tracer>(&self, run: &mut ParseRun<'_, T>, term: Term, start: u32, end: u32) {
        if run.nested_terms.contains(&term) {
            run.record_nest(self.id, NestRange { term, from: start, to: end });
        }
    }

    /// Fork this stack. The settled buffer prefix (records ending at or
    /// before `reduce_pos`) is frozen into a shared slab; only outstanding
    /// skipped-token records are copied into the child so ancestors stay
    /// immutable.
    pub fn split<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>) -> Stack {
        let mut off = self.buffer.len();
        while off > 0 && self.buffer[off - 2] > self.reduce_pos as i32 {
            off -= 4;
        }
        if off > 0 {
            let frozen: Vec<i32> = self.buffer.drain(..off).collect();
            self.parent = Some(Rc::new(BufferSlab {
                base: self.buffer_base,
                data: frozen,
                parent: self.parent.take(),
            }));
            self.buffer_base += off as u32;
        }
        let child = Stack {
            id: run.alloc_stack_id(),
            state: self.state,
            frames: self.frames.clone(),
            pos: self.pos,
            reduce_pos: self.reduce_pos,
            score: self.score,
            buffer: self.buffer.clone(),
            buffer_base: self.buffer_base,
            parent: self.parent.clone(),
            context: self.context.clone(),
            look_ahead: self.look_ahead,
        };
        run.tracer.trace_split(self.id, child.id);
        child
    }

    /// Whether some sequence of default reductions from the current state
    /// ends in an explicit shift of `term`. Never mutates the stack.
    pub fn can_shift(&self, parser: &ParseTable, term: Term) -> bool {
        let mut sim = SimulatedStack::new(self);
        loop {
            let default = parser.state_slot(sim.state, StateSlot::DefaultReduce);
            let act = if default != 0 {
                default
            } else {
                parser.has_action(sim.state, term)
            };
            if act == 0 {
                return false;
            }
            if !action::is_reduce(act) {
                return true;
            }
            sim.reduce(parser, act);
        }
    }

    /// Start position of the topmost frame whose forced reduction produces
    /// one of `terms`, restricted to starts before `before` when given.
    pub fn start_of(&self, parser: &ParseTable, terms: &[Term], before: Option<u32>) -> Option<u32> {
        for frame in self.frames.iter().rev() {
            let force = parser.state_slot(frame.state, StateSlot::ForcedReduce);
            if action::is_reduce(force)
                && terms.contains(&action::value(force))
                && before.is_none_or(|b| frame.start < b)
            {
                return Some(frame.start);
            }
        }
        None
    }

    /// Earliest position at which a reduction producing one of the run's
    /// nestable terms begins. Used to decide whether nested parsing is
    /// worth attempting.
    pub fn may_nest_from<T: Tracer>(&self, run: &ParseRun<'_, T>) -> Option<u32> {
        for frame in &self.frames {
            let force = run.parser.state_slot(frame.state, StateSlot::ForcedReduce);
            if action::is_reduce(force) && run.nested_terms.contains(&action::value(force)) {
                return Some(frame.start);
            }
        }
        None
    }

    /// Fork up to [`recover::MAX_NEXT`] stacks that recover by inserting a
    /// token: each candidate pushes one of the state's follow edges and a
    /// zero-width error node.
    pub fn recover_by_insert<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        next: Term,
    ) -> Vec<Stack> {
        if self.frames.len() * 3 >= recover::MAX_INSERT_STACK_DEPTH {
            return Vec::new();
        }
        let mut next_states = run.parser.next_states(self.state);
        if next_states.len() > recover::MAX_NEXT
            || self.frames.len() * 3 >= recover::DAMPEN_INSERT_STACK_DEPTH
        {
            // Prefer states that can act on the next token.
            let mut best: Vec<(Term, StateId)> = next_states
                .iter()
                .copied()
                .filter(|&(_, s)| s != self.state && run.parser.has_action(s, next) != 0)
                .collect();
            if self.frames.len() * 3 < recover::DAMPEN_INSERT_STACK_DEPTH {
                for &(term, s) in &next_states {
                    if best.len() >= recover::MAX_NEXT {
                        break;
                    }
                    if !best.iter().any(|&(_, b)| b == s) {
                        best.push((term, s));
                    }
                }
            }
            next_states = best;
        }
        let mut result = Vec::new();
        for &(term, s) in &next_states {
            if result.len() >= recover::MAX_NEXT {
                break;
            }
            if s == self.state {
                continue;
            }
            let mut stack = self.split(run);
            stack.push_state(s, self.pos);
            stack.store_node(run, TERM_ERR, stack.pos, stack.pos, 4, true);
            stack.shift_context(run, term, self.pos);
            stack.reduce_pos = self.pos;
            stack.score -= recover::INSERT;
            run.tracer.trace_recover_insert(stack.id, term, s);
            result.push(stack);
        }
        result
    }

    /// Recover by deleting the next token: emit it (when it is a node)
    /// under an error node and move past it.
    pub fn recover_by_delete<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        next: Term,
        next_end: u32,
    ) {
        let is_node = next <= run.parser.max_node;
        if is_node {
            self.store_node(run, next, self.pos, next_end, 4, false);
        }
        let start = self.pos;
        self.store_node(run, TERM_ERR, start, next_end, if is_node { 8 } else { 4 }, false);
        self.pos = next_end;
        self.reduce_pos = next_end;
        self.score -= recover::DELETE;
        run.tracer.trace_recover_delete(self.id, next, start, next_end);
    }

    /// Apply the state's forced reduction. When the action is not valid
    /// for the state, an error node is emitted first and the score
    /// penalized. Returns whether any reduction was applied.
    pub fn force_reduce<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>) -> bool {
        let parser = run.parser;
        let reduce = parser.state_slot(self.state, StateSlot::ForcedReduce);
        if !action::is_reduce(reduce) {
            return false;
        }
        if !parser.valid_action(self.state, reduce) {
            let depth = action::depth(reduce) as usize;
            let term = action::value(reduce);
            if depth == 0 || depth > self.frames.len() {
                return false;
            }
            let base_state = self.frames[self.frames.len() - depth].state;
            if parser.get_goto(base_state, term, false).is_none() {
                return false;
            }
            self.store_node(run, TERM_ERR, self.pos, self.pos, 4, true);
            self.score -= recover::REDUCE;
            run.tracer.trace_force_reduce(self.id, self.state);
        }
        self.reduce_pos = self.pos;
        self.reduce(run, reduce);
        true
    }

    /// Iterate forced reductions until the state is accepting. Stacks that
    /// get stuck receive a final error node.
    pub fn force_all<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>) -> &mut Self {
        while !run.parser.state_flag(self.state, StateFlag::Accepting) {
            if !self.force_reduce(run) {
                self.store_node(run, TERM_ERR, self.pos, self.pos, 4, true);
                break;
            }
        }
        self
    }

    /// Install a prebuilt subtree: record it in the run's `reused` table
    /// (deduplicated against the last entry), emit a reused record, and
    /// move past the covered input.
    pub fn use_node<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        value: &Rc<dyn TreeHandle>,
        next: StateId,
    ) {
        let index = match run.reused.last() {
            Some(last) if Rc::ptr_eq(last, value) => run.reused.len() - 1,
            _ => {
                run.reused.push(value.clone());
                run.reused.len() - 1
            }
        };
        let start = self.pos;
        self.pos = start + value.len();
        self.reduce_pos = self.pos;
        self.push_state(next, start);
        self.buffer
            .extend([index as i32, start as i32, self.pos as i32, -1]);
        if let Some(cx) = &self.context {
            let (tracker, context) = (cx.tracker.clone(), cx.context.clone());
            let next = tracker.reuse(&context, value, self, &mut run.stream);
            self.update_context(next);
        }
        run.tracer.trace_reuse(self.id, start, self.pos);
    }

    /// Convert the top buffer record and its covered descendants into a
    /// reused-subtree entry built by `builder`. When the covered slice
    /// reaches into ancestor slabs, the stack is rerooted past the
    /// consumed region.
    pub fn materialize_top_node<T: Tracer>(
        &mut self,
        run: &mut ParseRun<'_, T>,
        builder: &mut dyn TreeBuilder,
    ) {
        let total = self.total_buffer_len();
        let (start, end, size) = {
            let cursor = crate::cursor::StackBufferCursor::new(self);
            (cursor.start(), cursor.end(), cursor.size())
        };
        if size < 4 {
            return;
        }
        let len = size as usize;
        let cut = total - len;

        let handle = {
            let cursor = crate::cursor::StackBufferCursor::new(self);
            builder.build(cursor, len, &run.reused)
        };

        if cut >= self.buffer_base as usize {
            self.buffer.truncate(cut - self.buffer_base as usize);
        } else {
            // Reroot past the consumed region.
            let mut parent = self.parent.take();
            loop {
                let Some(slab) = parent.take() else { break };
                let base = slab.base as usize;
                if base >= cut {
                    // Slab fully consumed.
                    parent = slab.parent.clone();
                } else if base + slab.data.len() > cut {
                    // Partially consumed; keep the prefix below the cut.
                    parent = Some(Rc::new(BufferSlab {
                        base: slab.base,
                        data: slab.data[..cut - base].to_vec(),
                        parent: slab.parent.clone(),
                    }));
                    break;
                } else {
                    parent = Some(slab);
                    break;
                }
            }
            self.parent = parent;
            self.buffer.clear();
            self.buffer_base = cut as u32;
        }

        run.reused.push(handle);
        let index = run.reused.len() - 1;
        self.buffer.extend([index as i32, start, end, -1]);
    }

    /// Attach a mounted-tree property to the current node.
    pub fn mount<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>, prop: u16, value: Rc<dyn std::any::Any>) {
        run.prop_values.push(value);
        let index = run.prop_values.len() - 1;
        self.buffer
            .extend([index as i32, self.reduce_pos as i32, prop as i32, -2]);
    }

    /// Flush context and lookahead markers so downstream incremental reuse
    /// can invalidate correctly.
    pub fn close(&mut self) {
        let strict = self.context.as_ref().is_some_and(|cx| cx.tracker.strict());
        if strict {
            self.emit_context();
        }
        if self.look_ahead > 0 {
            self.emit_look_ahead();
        }
    }

    /// Record that positions up to `look_ahead` influenced decisions on
    /// this stack. The previous extent is flushed first so records already
    /// in the buffer keep the lookahead they were parsed under.
    pub fn set_look_ahead(&mut self, look_ahead: u32) {
        if look_ahead > self.look_ahead {
            if self.look_ahead > 0 {
                self.emit_look_ahead();
            }
            self.look_ahead = look_ahead;
        }
    }

    fn emit_context(&mut self) {
        let hash = self.context.as_ref().map_or(0, |cx| cx.hash);
        let len = self.buffer.len();
        if len > 0 && self.buffer[len - 1] == -3 {
            // A marker covering no records is refreshed in place.
            self.buffer[len - 4] = hash as i32;
            return;
        }
        self.buffer.extend([
            hash as i32,
            self.reduce_pos as i32,
            self.reduce_pos as i32,
            -3,
        ]);
    }

    fn emit_look_ahead(&mut self) {
        let len = self.buffer.len();
        if len > 0 && self.buffer[len - 1] == -4 {
            self.buffer[len - 4] = self.look_ahead as i32;
            return;
        }
        self.buffer.extend([
            self.look_ahead as i32,
            self.reduce_pos as i32,
            self.reduce_pos as i32,
            -4,
        ]);
    }

    fn shift_context<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>, term: Term, start: u32) {
        if let Some(cx) = &self.context {
            let (tracker, context) = (cx.tracker.clone(), cx.context.clone());
            run.stream.reset(start, false);
            let next = tracker.shift(&context, term, self, &mut run.stream);
            self.update_context(next);
        }
    }

    fn reduce_context<T: Tracer>(&mut self, run: &mut ParseRun<'_, T>, term: Term, start: u32) {
        if let Some(cx) = &self.context {
            let (tracker, context) = (cx.tracker.clone(), cx.context.clone());
            run.stream.reset(start, false);
            let next = tracker.reduce(&context, term, self, &mut run.stream);
            self.update_context(next);
        }
    }

    fn update_context(&mut self, next: Context) {
        let Some(cx) = &self.context else { return };
        if Rc::ptr_eq(&cx.context, &next) {
            return;
        }
        let (tracker, old_hash) = (cx.tracker.clone(), cx.hash);
        let new_cx = StackContext::new(tracker, next);
        if new_cx.hash != old_hash {
            // Flush the outgoing context so earlier records keep it.
            self.emit_context();
        }
        self.context = Some(new_cx);
    }

    /// True only when the stack is at its initial depth and the current
    /// state has no actions at all.
    pub fn dead_end(&self, parser: &ParseTable) -> bool {
        if self.frames.len() != 1 {
            return false;
        }
        parser.data[self.actions_offset(parser)] == seq::END
            && parser.state_slot(self.state, StateSlot::DefaultReduce) == 0
    }

    fn actions_offset(&self, parser: &ParseTable) -> usize {
        parser.state_slot(self.state, StateSlot::Actions) as usize
    }

    /// Reset to the base state, dropping all frames. Used by the driver
    /// when recovery decides to start over at the current position.
    pub fn restart(&mut self) {
        if let Some(frame) = self.frames.first() {
            self.state = frame.state;
        }
        self.frames.clear();
    }

    /// Whether two stacks are in the same state with the same frame states.
    pub fn same_state(&self, other: &Stack) -> bool {
        if self.state != other.state || self.frames.len() != other.frames.len() {
            return false;
        }
        self.frames
            .iter()
            .zip(&other.frames)
            .all(|(a, b)| a.state == b.state)
    }

    /// Whether the dialect with the given definition index is enabled for
    /// this parse.
    pub fn dialect_enabled<T: Tracer>(&self, run: &ParseRun<'_, T>, dialect_id: usize) -> bool {
        run.dialect.flag(dialect_id)
    }
}
