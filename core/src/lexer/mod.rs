//! Lexer: source text -> token stream.
//!
//! A linear scan with one-character lookahead. Identifiers resolve against
//! the keyword table, numeric literals classify by their `u`/`l`/`f` suffix
//! combination, and the `+ - * / % = ! < >` family pairs with a trailing `=`
//! into the compound form. `&`, `|` and `^` additionally recognize their
//! doubled forms. `//` starts a line comment.
//!
//! Character and string literals take their bytes verbatim; there is no
//! escape handling. An unterminated literal is reported to the diagnostic
//! sink and lexing continues.

mod lexer;

#[cfg(test)]
mod lexer_test;

pub use lexer::{Lexer, Token, TokenKind};
