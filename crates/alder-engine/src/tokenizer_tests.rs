//! Tests for the token-group DFA interpreter and external tokenizers.

use alder_tables::{DialectSpec, ParseTable, TableBuilder, TokenDfaBuilder, TokenState};

use crate::input::InputStream;
use crate::run::ParseRun;
use crate::stack::Stack;
use crate::test_util::*;
use crate::tokenizer::{ExternalOptions, ExternalTokenizer, TokenGroup, Tokenizer, read_token};

/// Group-0 lexer: identifiers `[x-z]+`, `+`, and a single space.
fn lexer_data() -> Vec<u16> {
    let mut b = TokenDfaBuilder::new();
    // s0: dispatch
    b.add_state(TokenState {
        group_mask: 1,
        accepts: vec![],
        edges: vec![
            (b'x' as u16, b'z' as u16 + 1, 1),
            (b'+' as u16, b'+' as u16 + 1, 2),
            (b' ' as u16, b' ' as u16 + 1, 3),
        ],
    });
    // s1: inside an identifier
    b.add_state(TokenState {
        group_mask: 1,
        accepts: vec![(ATOM, 1)],
        edges: vec![(b'x' as u16, b'z' as u16 + 1, 1)],
    });
    // s2: after '+'
    b.add_state(TokenState {
        group_mask: 1,
        accepts: vec![(PLUS, 1)],
        edges: vec![],
    });
    // s3: after a space
    b.add_state(TokenState {
        group_mask: 1,
        accepts: vec![(SPACE, 1)],
        edges: vec![],
    });
    b.encode()
}

#[test]
fn reads_the_longest_identifier() {
    let table = expr_table();
    let dialect = table.dialect(&[]);
    let data = lexer_data();
    let mut stream = InputStream::new(&"xy+");
    stream.reset(0, true);
    read_token(&data, &mut stream, &table, &dialect, 0);
    assert_eq!(stream.token.value, ATOM as i32);
    assert_eq!((stream.token.start, stream.token.end), (0, 2));

    stream.reset(2, true);
    read_token(&data, &mut stream, &table, &dialect, 0);
    assert_eq!(stream.token.value, PLUS as i32);
    assert_eq!(stream.token.end, 3);
}

#[test]
fn no_match_leaves_the_token_empty() {
    let table = expr_table();
    let dialect = table.dialect(&[]);
    let data = lexer_data();
    let mut stream = InputStream::new(&"?");
    stream.reset(0, true);
    read_token(&data, &mut stream, &table, &dialect, 0);
    assert_eq!(stream.token.value, -1);
}

#[test]
fn group_masks_hide_foreign_states() {
    let mut b = TokenDfaBuilder::new();
    b.add_state(TokenState {
        group_mask: 0b11,
        accepts: vec![],
        edges: vec![
            (b'+' as u16, b'+' as u16 + 1, 2),
            (b'x' as u16, b'x' as u16 + 1, 1),
        ],
    });
    b.add_state(TokenState {
        group_mask: 0b01,
        accepts: vec![(ATOM, 0b01)],
        edges: vec![],
    });
    b.add_state(TokenState {
        group_mask: 0b10,
        accepts: vec![(PLUS, 0b10)],
        edges: vec![],
    });
    let data = b.encode();
    let table = expr_table();
    let dialect = table.dialect(&[]);

    // Group 0 cannot reach the '+' accept state.
    let mut stream = InputStream::new(&"+");
    stream.reset(0, true);
    read_token(&data, &mut stream, &table, &dialect, 0);
    assert_eq!(stream.token.value, -1);

    stream.reset(0, true);
    read_token(&data, &mut stream, &table, &dialect, 1);
    assert_eq!(stream.token.value, PLUS as i32);
}

#[test]
fn dialects_gate_token_acceptance() {
    let mut b = TableBuilder::new();
    b.max_term = EOF;
    b.dialects = vec![DialectSpec {
        name: "math".into(),
        terms: vec![PLUS],
    }];
    let table = b.finish();
    let data = lexer_data();

    let plain = table.dialect(&[]);
    let mut stream = InputStream::new(&"+");
    stream.reset(0, true);
    read_token(&data, &mut stream, &table, &plain, 0);
    assert_eq!(stream.token.value, -1);

    let math = table.dialect(&["math"]);
    stream.reset(0, true);
    read_token(&data, &mut stream, &table, &math, 0);
    assert_eq!(stream.token.value, PLUS as i32);
}

fn specialize_table() -> ParseTable {
    let mut b = TableBuilder::new();
    b.max_term = EOF;
    // SEMI plays the role of a keyword specializing ATOM.
    b.specialized = vec![SEMI, ATOM];
    b.finish()
}

fn accepting_state(term: u16) -> Vec<u16> {
    let mut b = TokenDfaBuilder::new();
    b.add_state(TokenState {
        group_mask: 1,
        accepts: vec![(term, 1)],
        edges: vec![],
    });
    b.encode()
}

#[test]
fn specialized_token_overrides_the_general_one() {
    let table = specialize_table();
    let dialect = table.dialect(&[]);
    let mut stream = InputStream::new(&"x");
    stream.reset(0, true);
    stream.token.value = ATOM as i32;
    read_token(&accepting_state(SEMI), &mut stream, &table, &dialect, 0);
    assert_eq!(stream.token.value, SEMI as i32);
}

#[test]
fn general_token_does_not_override_the_specialized_one() {
    let table = specialize_table();
    let dialect = table.dialect(&[]);
    let mut stream = InputStream::new(&"x");
    stream.reset(0, true);
    stream.token.value = SEMI as i32;
    read_token(&accepting_state(ATOM), &mut stream, &table, &dialect, 0);
    assert_eq!(stream.token.value, SEMI as i32);
}

#[test]
fn token_group_reads_from_table_data() {
    let mut b = TableBuilder::new();
    b.max_term = EOF;
    b.max_node = TOP;
    b.token_data = lexer_data();
    b.add_state(alder_tables::StateSpec::default());
    let table = b.finish();

    let mut run = ParseRun::new(&table, &"zz");
    let stack = Stack::start(&mut run, 0, 0);
    let group = TokenGroup::from_table(&table, 0);
    let dialect = table.dialect(&[]);

    run.stream.reset(0, true);
    group.token(&mut run.stream, &stack, &table, &dialect);
    assert_eq!(run.stream.token.value, ATOM as i32);
    assert_eq!(run.stream.token.end, 2);
    assert!(!group.contextual() && !group.fallback() && !group.extend());
}

#[test]
fn external_tokenizer_wraps_user_recognition() {
    let table = expr_table();
    let dialect = table.dialect(&[]);
    let mut run = ParseRun::new(&table, &"12+");
    let stack = Stack::start(&mut run, 0, 0);

    let digits = ExternalTokenizer::new(
        |input, _stack| {
            let mut seen = false;
            while input.next >= b'0' as i32 && input.next <= b'9' as i32 {
                seen = true;
                input.advance();
            }
            if seen {
                input.accept_token(SEMI);
            }
        },
        ExternalOptions {
            contextual: true,
            fallback: false,
            extend: true,
        },
    );

    run.stream.reset(0, true);
    digits.token(&mut run.stream, &stack, &table, &dialect);
    assert_eq!(run.stream.token.value, SEMI as i32);
    assert_eq!(run.stream.token.end, 2);
    assert!(digits.contextual());
    assert!(!digits.fallback());
    assert!(digits.extend());
}
