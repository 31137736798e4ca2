//! Pattern tokenizer
//!
//! The lexical grammar lives in `pattern.pest`. [`Tokenizer`] runs it one
//! token at a time, so tokens are produced lazily; the stream always ends
//! with exactly one [`TokenKind::Eof`].

use log::trace;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "pattern.pest"]
struct PatternLexer;

/// Error during tokenization
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Lex error: unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Lex error: unterminated {found} starting at position {position}")]
    Unterminated { found: &'static str, position: usize },
}

/// Token kind, with the decoded payload where the literal text needs decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// Quoted label, escapes removed
    Str(String),
    /// `/pattern/flags`, with `\/` unescaped
    Regex {
        pattern: String,
        flags: String,
    },
    Root,
    Wildcard,
    Relation,
    Number,
    OrRel,
    Pipe,
    Bang,
    Question,
    Amp,
    At,
    Equals,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl TokenKind {
    /// Name used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::Str(_) => "string",
            TokenKind::Regex { .. } => "regex",
            TokenKind::Root => "'_ROOT_'",
            TokenKind::Wildcard => "'__'",
            TokenKind::Relation => "relation",
            TokenKind::Number => "number",
            TokenKind::OrRel => "'||'",
            TokenKind::Pipe => "'|'",
            TokenKind::Bang => "'!'",
            TokenKind::Question => "'?'",
            TokenKind::Amp => "'&'",
            TokenKind::At => "'@'",
            TokenKind::Equals => "'='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Eof => "end of pattern",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal source text
    pub text: String,
    /// Byte offset in the pattern
    pub position: usize,
}

impl Token {
    /// How the token is shown in error messages
    pub fn display(&self) -> String {
        match self.kind {
            TokenKind::Eof => self.kind.describe().to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Lazy token stream over a pattern string
pub struct Tokenizer<'a> {
    input: &'a str,
    offset: usize,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            done: false,
        }
    }

    /// Classify a failure at the current offset
    fn error(&self) -> LexError {
        let rest = &self.input[self.offset..];
        let skipped = rest.len() - rest.trim_start().len();
        let position = self.offset + skipped;
        match rest[skipped..].chars().next() {
            Some('/') => LexError::Unterminated {
                found: "regex",
                position,
            },
            Some('"') => LexError::Unterminated {
                found: "string",
                position,
            },
            Some(found) => LexError::UnexpectedChar { found, position },
            None => LexError::UnexpectedChar {
                found: '\0',
                position,
            },
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.input[self.offset..];
        let pair = PatternLexer::parse(Rule::lexeme, rest)
            .ok()
            .and_then(|mut pairs| pairs.next())
            .and_then(|lexeme| lexeme.into_inner().next());
        let Some(pair) = pair else {
            self.done = true;
            return Some(Err(self.error()));
        };

        let span = pair.as_span();
        let position = self.offset + span.start();
        let text = pair.as_str().to_string();

        let kind = match pair.as_rule() {
            Rule::EOI => {
                self.done = true;
                TokenKind::Eof
            }
            Rule::regex => {
                let mut inner = pair.into_inner();
                let pattern = inner.next().map_or("", |p| p.as_str()).replace("\\/", "/");
                let flags = inner.next().map_or("", |p| p.as_str()).to_string();
                TokenKind::Regex { pattern, flags }
            }
            Rule::string => {
                let body = pair.into_inner().next().map_or("", |p| p.as_str());
                TokenKind::Str(unescape(body))
            }
            Rule::root => TokenKind::Root,
            Rule::wildcard => TokenKind::Wildcard,
            Rule::relation => TokenKind::Relation,
            Rule::number => TokenKind::Number,
            Rule::or_rel => TokenKind::OrRel,
            Rule::pipe => TokenKind::Pipe,
            Rule::bang => TokenKind::Bang,
            Rule::question => TokenKind::Question,
            Rule::amp => TokenKind::Amp,
            Rule::at => TokenKind::At,
            Rule::equals => TokenKind::Equals,
            Rule::lparen => TokenKind::LParen,
            Rule::rparen => TokenKind::RParen,
            Rule::lbracket => TokenKind::LBracket,
            Rule::rbracket => TokenKind::RBracket,
            _ => TokenKind::Ident,
        };
        self.offset += span.end();

        trace!("token {:?} {:?} at {}", kind, text, position);
        Some(Ok(Token {
            kind,
            text,
            position,
        }))
    }
}

/// Tokenize a whole pattern
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(input).collect()
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_simple_pattern() {
        let tokens = tokenize("NP < NN").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].text, "NP");
        assert_eq!(tokens[1].kind, TokenKind::Relation);
        assert_eq!(tokens[1].position, 3);
        assert_eq!(tokens[2].text, "NN");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
        assert_eq!(tokens[3].position, 7);
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(texts("A <<, B"), vec!["A", "<<,", "B", ""]);
        assert_eq!(texts("A $++ B $+ C"), vec!["A", "$++", "B", "$+", "C", ""]);
        assert_eq!(texts("A<<B"), vec!["A", "<<", "B", ""]);
        assert_eq!(texts("A .. B . C"), vec!["A", "..", "B", ".", "C", ""]);
    }

    #[test]
    fn test_child_index() {
        assert_eq!(
            kinds("VP <-2 NP"),
            vec![
                TokenKind::Ident,
                TokenKind::Relation,
                TokenKind::Number,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
        assert_eq!(texts("VP <-2 NP")[1], "<-");
    }

    #[test]
    fn test_regex_and_string() {
        let tokens = tokenize(r#"/^VB.\/x/ix "a \"b\"""#).unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Regex {
                pattern: "^VB./x".to_string(),
                flags: "ix".to_string()
            }
        );
        assert_eq!(tokens[1].kind, TokenKind::Str("a \"b\"".to_string()));
    }

    #[test]
    fn test_punctuation_tokens() {
        assert_eq!(
            kinds("!@NP=x || ?(__ | _ROOT_) & [ ]"),
            vec![
                TokenKind::Bang,
                TokenKind::At,
                TokenKind::Ident,
                TokenKind::Equals,
                TokenKind::Ident,
                TokenKind::OrRel,
                TokenKind::Question,
                TokenKind::LParen,
                TokenKind::Wildcard,
                TokenKind::Pipe,
                TokenKind::Root,
                TokenKind::RParen,
                TokenKind::Amp,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_characters() {
        assert_eq!(texts("NP-SBJ-1 -NONE-"), vec!["NP-SBJ-1", "-NONE-", ""]);
        assert_eq!(texts("NP_2"), vec!["NP_2", ""]);
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("NP # NN"),
            Err(LexError::UnexpectedChar {
                found: '#',
                position: 3
            })
        );
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(
            tokenize("NP < /VB"),
            Err(LexError::Unterminated {
                found: "regex",
                position: 5
            })
        );
        assert_eq!(
            tokenize("\"abc"),
            Err(LexError::Unterminated {
                found: "string",
                position: 0
            })
        );
    }

    #[test]
    fn test_lazy_stream_ends_once() {
        let mut tokenizer = Tokenizer::new("  ");
        let eof = tokenizer.next().unwrap().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.position, 2);
        assert!(tokenizer.next().is_none());

        let mut tokenizer = Tokenizer::new("A # B");
        assert!(tokenizer.next().unwrap().is_ok());
        assert!(tokenizer.next().unwrap().is_err());
        assert!(tokenizer.next().is_none());
    }
}
