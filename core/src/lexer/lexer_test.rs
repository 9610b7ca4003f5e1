use pretty_assertions::assert_eq;

use super::{Lexer, Token, TokenKind};
use crate::diagnostics::Diagnostics;

fn lex(source: &str) -> Vec<Token<'_>> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex(source, &mut diagnostics);
    assert!(
        !diagnostics.has_errors(),
        "unexpected diagnostics: {:?}",
        diagnostics.iter().collect::<Vec<_>>()
    );
    tokens
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).iter().map(|t| t.kind).collect()
}

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        kinds("while x do y if else for struct extern self"),
        vec![
            TokenKind::While,
            TokenKind::Identifier,
            TokenKind::Do,
            TokenKind::Identifier,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::For,
            TokenKind::Struct,
            TokenKind::Extern,
            TokenKind::SelfKw,
        ]
    );
}

#[test]
fn test_primitive_type_keywords() {
    assert_eq!(
        kinds("void bool char uchar short ushort int uint long ulong float double string"),
        vec![
            TokenKind::Void,
            TokenKind::Bool,
            TokenKind::Char,
            TokenKind::UChar,
            TokenKind::Short,
            TokenKind::UShort,
            TokenKind::Int,
            TokenKind::UInt,
            TokenKind::Long,
            TokenKind::ULong,
            TokenKind::Float,
            TokenKind::Double,
            TokenKind::String,
        ]
    );
}

#[test]
fn test_identifier_with_digits_and_underscores() {
    let tokens = lex("loop_counter2");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].data, "loop_counter2");
}

#[test]
fn test_numeric_suffix_classification() {
    // The suffix table from the scanner: u/l/f in any combination.
    let cases = [
        ("42", TokenKind::IntLit),
        ("42u", TokenKind::UIntLit),
        ("42l", TokenKind::LongLit),
        ("42ul", TokenKind::ULongLit),
        ("42lu", TokenKind::ULongLit),
        ("4.2", TokenKind::DoubleLit),
        ("4.2f", TokenKind::FloatLit),
        ("42f", TokenKind::IntLit), // `f` without `.` falls through to integer
    ];

    for (source, expected) in cases {
        let tokens = lex(source);
        assert_eq!(tokens.len(), 1, "source: {source}");
        assert_eq!(tokens[0].kind, expected, "source: {source}");
    }
}

#[test]
fn test_numeric_data_excludes_suffix() {
    let tokens = lex("123ul");
    assert_eq!(tokens[0].data, "123");
}

#[test]
fn test_operator_eq_pairing() {
    assert_eq!(
        kinds("+ += - -= * *= / /= % %= = == ! != < <= > >="),
        vec![
            TokenKind::Plus,
            TokenKind::PlusEq,
            TokenKind::Minus,
            TokenKind::MinusEq,
            TokenKind::Star,
            TokenKind::StarEq,
            TokenKind::Slash,
            TokenKind::SlashEq,
            TokenKind::Percent,
            TokenKind::PercentEq,
            TokenKind::Eq,
            TokenKind::IsEq,
            TokenKind::Not,
            TokenKind::IsNotEq,
            TokenKind::Less,
            TokenKind::LessOrEq,
            TokenKind::Greater,
            TokenKind::GreaterOrEq,
        ]
    );
}

#[test]
fn test_doubled_operators() {
    assert_eq!(
        kinds("& &= && | |= || ^ ^= ^^"),
        vec![
            TokenKind::Ampersand,
            TokenKind::AmpersandEq,
            TokenKind::DoubleAmpersand,
            TokenKind::Pipe,
            TokenKind::PipeEq,
            TokenKind::DoublePipe,
            TokenKind::Caret,
            TokenKind::CaretEq,
            TokenKind::DoubleCaret,
        ]
    );
}

#[test]
fn test_line_comment_consumes_to_newline() {
    assert_eq!(
        kinds("int a; // int b;\nint c;"),
        vec![
            TokenKind::Int,
            TokenKind::Identifier,
            TokenKind::Semi,
            TokenKind::Int,
            TokenKind::Identifier,
            TokenKind::Semi,
        ]
    );
}

#[test]
fn test_char_literal_verbatim() {
    let tokens = lex("'a'");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::CharLit);
    assert_eq!(tokens[0].data, "a");
}

#[test]
fn test_string_literal_no_escapes() {
    let tokens = lex(r#""hello \n world""#);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::StrLit);
    // Backslashes pass through untouched.
    assert_eq!(tokens[0].data, r"hello \n world");
}

#[test]
fn test_unterminated_string_reports_and_continues() {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex("\"oops", &mut diagnostics);
    assert!(diagnostics.has_errors());
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::StrLit);
}

#[test]
fn test_unterminated_char_reports_and_continues() {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex("'a + b", &mut diagnostics);
    assert!(diagnostics.has_errors());
    assert!(tokens.iter().any(|t| t.kind == TokenKind::CharLit));
}

#[test]
fn test_ranges_delimit_matched_text() {
    let source = "int answer = 40 + 2;";
    for token in lex(source) {
        assert_eq!(
            token.range.text(source),
            &source[token.range.start_byte..token.range.end_byte]
        );
        if token.kind == TokenKind::Identifier {
            assert_eq!(token.range.text(source), token.data);
        }
    }
}

#[test]
fn test_line_and_column_tracking() {
    let source = "int a;\nint bee;";
    let tokens = lex(source);

    let bee = tokens
        .iter()
        .find(|t| t.data == "bee")
        .expect("bee token present");
    assert_eq!(bee.range.start.line, 2);
    assert_eq!(bee.range.start.column, 5);
}

#[test]
fn test_lexing_is_deterministic() {
    let source = "int While() { int i = 0; while (i < 10) { i += 1; } return i - 1; }";
    assert_eq!(lex(source), lex(source));
}
