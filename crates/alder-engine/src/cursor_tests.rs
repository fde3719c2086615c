//! Tests for the reverse buffer cursor.

use alder_tables::action;

use crate::cursor::StackBufferCursor;
use crate::run::ParseRun;
use crate::stack::Stack;
use crate::test_util::*;

#[test]
fn walks_records_in_reverse_insertion_order() {
    let table = expr_table();
    let mut run = ParseRun::new(&table, &"x+x");
    let mut stack = Stack::start(&mut run, 0, 0);
    stack.apply(&mut run, action::shift(1), ATOM, 1);
    stack.apply(&mut run, action::shift(2), PLUS, 2);
    stack.apply(&mut run, action::shift(4), ATOM, 3);

    let mut cursor = StackBufferCursor::new(&stack);
    let mut ids = Vec::new();
    while cursor.pos() > 0 {
        ids.push(cursor.id());
        cursor.next();
    }
    assert_eq!(ids, vec![3, 1, 3]);
    assert_eq!(cursor.pos(), 0);
}

#[test]
fn visits_every_record_across_slab_chains() {
    let table = expr_table();
    let mut run = ParseRun::new(&table, &"x+x");
    let mut stack = Stack::start(&mut run, 0, 0);
    stack.apply(&mut run, action::shift(1), ATOM, 1);
    let _first_fork = stack.split(&mut run);
    stack.apply(&mut run, action::shift(2), PLUS, 2);
    let _second_fork = stack.split(&mut run);
    stack.apply(&mut run, action::shift(4), ATOM, 3);

    // Two frozen slabs plus one local record.
    assert_eq!(stack.buffer_base(), 8);
    assert_eq!(stack.buffer().len(), 4);

    let walked = records(&stack);
    assert_eq!(
        walked,
        vec![[3, 0, 1, 4], [1, 1, 2, 4], [3, 2, 3, 4]]
    );
    // Exactly total_buffer_len / 4 records were visited.
    assert_eq!(walked.len(), stack.total_buffer_len() / 4);
}

#[test]
fn fork_leaves_the_original_in_place() {
    let table = expr_table();
    let mut run = ParseRun::new(&table, &"x+");
    let mut stack = Stack::start(&mut run, 0, 0);
    stack.apply(&mut run, action::shift(1), ATOM, 1);
    stack.apply(&mut run, action::shift(2), PLUS, 2);

    let cursor = StackBufferCursor::new(&stack);
    let mut fork = cursor.fork();
    fork.next();
    assert_eq!(fork.id(), 3);
    assert_eq!(cursor.id(), 1);
    assert_eq!(cursor.pos(), 8);
    assert_eq!(fork.pos(), 4);
}

#[test]
fn cursor_positions_inside_ancestor_slabs() {
    let table = expr_table();
    let mut run = ParseRun::new(&table, &"x+x");
    let mut stack = Stack::start(&mut run, 0, 0);
    stack.apply(&mut run, action::shift(1), ATOM, 1);
    let _fork = stack.split(&mut run);
    stack.apply(&mut run, action::shift(2), PLUS, 2);

    // Position 4 is the end of the first (frozen) record.
    let cursor = StackBufferCursor::at(&stack, 4);
    assert_eq!(
        [cursor.id(), cursor.start(), cursor.end(), cursor.size()],
        [3, 0, 1, 4]
    );
}
