//! Pattern language parser
//!
//! Recursive descent over the token vector produced by the tokenizer,
//! with an explicit cursor and one token of lookahead (two where `!`/`?`
//! must be told apart from a clause modifier). Precedence, loosest first:
//! `||`, conjunction (`&` or juxtaposition), `!`/`?`, relation clauses,
//! atoms.
//!
//! A chain `A op1 B op2 C` nests on the left,
//! `Relation(Relation(A, op1, B), op2, C)`, so every clause is evaluated at
//! the node `A` matched. Capture markers (`=name`) are postfix and bind the
//! node the preceding atom matched.

use log::trace;
use thiserror::Error;

use crate::config::Config;
use crate::lexer::{Token, TokenKind};
use crate::pattern::{Expr, LabelMatcher, NodeTest, RelationMode, VarId};
use crate::relation::{Operator, Relation};

/// Error type for parse failures
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error: expected {expected}, found {found} at position {position}")]
    Unexpected {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Parse error: capture '{name}' declared twice (again at position {position})")]
    DuplicateCapture { name: String, position: usize },

    #[error("Parse error: invalid regex /{pattern}/ at position {position}: {source}")]
    InvalidRegex {
        pattern: String,
        position: usize,
        #[source]
        source: regex::Error,
    },

    #[error("Parse error: unsupported relation '{op}' at position {position}")]
    UnsupportedRelation { op: String, position: usize },

    #[error("Parse error: invalid child index {index} at position {position}")]
    InvalidChildIndex { index: String, position: usize },

    #[error("Parse error: pattern nests deeper than {limit} levels at position {position}")]
    TooDeep { limit: usize, position: usize },
}

/// Parser output: the AST and the capture names indexed by [`VarId`]
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPattern {
    pub expr: Expr,
    pub var_names: Vec<String>,
}

/// A parsed sub-expression with the captures it declares (and where)
struct Fragment {
    expr: Expr,
    declared: Vec<(VarId, usize)>,
}

impl Fragment {
    fn plain(expr: Expr) -> Self {
        Self {
            expr,
            declared: Vec::new(),
        }
    }
}

/// Parser state
pub struct Parser<'c> {
    tokens: Vec<Token>,
    pos: usize,
    config: &'c Config,
    vars: Vec<String>,
    /// Current nesting level, bounded by `config.max_depth`
    depth: usize,
}

impl<'c> Parser<'c> {
    pub fn new(mut tokens: Vec<Token>, config: &'c Config) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let position = tokens.last().map_or(0, |t| t.position + t.text.len());
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position,
            });
        }
        Self {
            tokens,
            pos: 0,
            config,
            vars: Vec::new(),
            depth: 0,
        }
    }

    /// Parse a complete pattern
    pub fn parse(mut self) -> Result<ParsedPattern, ParseError> {
        let fragment = self.parse_disjunction()?;
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("end of pattern"));
        }
        trace!("parsed {:?}", fragment.expr);
        Ok(ParsedPattern {
            expr: fragment.expr,
            var_names: self.vars,
        })
    }
}

// ==================== TOKEN HELPERS ====================

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // `new` guarantees a trailing Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_second(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Position of the most recently consumed token
    fn previous_position(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map_or(0, |i| self.tokens[i].position)
    }

    /// Enter one more nesting level, opened by the token at `position`
    fn deepen(&mut self, position: usize) -> Result<(), ParseError> {
        if self.depth >= self.config.max_depth {
            return Err(ParseError::TooDeep {
                limit: self.config.max_depth,
                position,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one level deeper than the token just consumed
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.deepen(self.previous_position())?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: token.display(),
            position: token.position,
        }
    }

    fn starts_unary(&self) -> bool {
        use TokenKind::*;
        matches!(
            self.peek().kind,
            Bang | Question | At | Ident | Str(_) | Regex { .. } | Wildcard | Root | Equals | LParen
        )
    }

    fn starts_clause(&self) -> bool {
        let opens_clause =
            |kind: &TokenKind| matches!(kind, TokenKind::Relation | TokenKind::LBracket);
        match self.peek().kind {
            TokenKind::Bang | TokenKind::Question => opens_clause(&self.peek_second().kind),
            ref kind => opens_clause(kind),
        }
    }
}

// ==================== CAPTURE SCOPES ====================

impl Parser<'_> {
    fn var_id(&mut self, name: &str) -> VarId {
        match self.vars.iter().position(|v| v == name) {
            Some(id) => id,
            None => {
                self.vars.push(name.to_string());
                self.vars.len() - 1
            }
        }
    }

    /// Declarations of two conjoined parts; a name may appear only once
    fn conjoin_declared(
        &self,
        mut left: Vec<(VarId, usize)>,
        right: Vec<(VarId, usize)>,
    ) -> Result<Vec<(VarId, usize)>, ParseError> {
        for (var, position) in right {
            if left.iter().any(|&(v, _)| v == var) {
                return Err(ParseError::DuplicateCapture {
                    name: self.vars[var].clone(),
                    position,
                });
            }
            left.push((var, position));
        }
        Ok(left)
    }

    fn conjoin(&self, items: Vec<Fragment>) -> Result<Fragment, ParseError> {
        let mut declared = Vec::new();
        let mut exprs = Vec::with_capacity(items.len());
        for item in items {
            declared = self.conjoin_declared(declared, item.declared)?;
            exprs.push(item.expr);
        }
        let expr = if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::And(exprs)
        };
        Ok(Fragment { expr, declared })
    }

    /// Alternatives may each declare the same names
    fn disjoin(&self, branches: Vec<Fragment>) -> Fragment {
        let mut declared: Vec<(VarId, usize)> = Vec::new();
        let mut exprs = Vec::with_capacity(branches.len());
        for branch in branches {
            for (var, position) in branch.declared {
                if !declared.iter().any(|&(v, _)| v == var) {
                    declared.push((var, position));
                }
            }
            exprs.push(branch.expr);
        }
        Fragment {
            expr: Expr::Or(exprs),
            declared,
        }
    }
}

// ==================== GRAMMAR ====================

impl Parser<'_> {
    /// disjunction := conjunction ("||" conjunction)*
    fn parse_disjunction(&mut self) -> Result<Fragment, ParseError> {
        let first = self.parse_conjunction()?;
        if !self.check(&TokenKind::OrRel) {
            return Ok(first);
        }
        let mut branches = vec![first];
        while self.check(&TokenKind::OrRel) {
            self.advance();
            branches.push(self.parse_conjunction()?);
        }
        Ok(self.disjoin(branches))
    }

    /// conjunction := unary ("&"? unary)*
    fn parse_conjunction(&mut self) -> Result<Fragment, ParseError> {
        let mut items = vec![self.parse_unary()?];
        loop {
            if self.check(&TokenKind::Amp) {
                self.advance();
            } else if !self.starts_unary() {
                break;
            }
            items.push(self.parse_unary()?);
        }
        self.conjoin(items)
    }

    /// unary := "!" unary | "?" unary | chain
    fn parse_unary(&mut self) -> Result<Fragment, ParseError> {
        match self.peek().kind {
            TokenKind::Bang => {
                self.advance();
                let inner = self.nested(Self::parse_unary)?;
                Ok(Fragment {
                    expr: Expr::Not(Box::new(inner.expr)),
                    declared: inner.declared,
                })
            }
            TokenKind::Question => {
                self.advance();
                let inner = self.nested(Self::parse_unary)?;
                Ok(Fragment {
                    expr: Expr::Optional(Box::new(inner.expr)),
                    declared: inner.declared,
                })
            }
            _ => self.parse_chain(),
        }
    }

    /// chain := atom clause*
    ///
    /// Each clause wraps the chain so far, so it counts as one more level.
    fn parse_chain(&mut self) -> Result<Fragment, ParseError> {
        let base = self.depth;
        let mut current = self.parse_atom()?;
        while self.starts_clause() {
            self.deepen(self.peek().position)?;
            current = self.parse_clause(current)?;
        }
        self.depth = base;
        Ok(current)
    }

    /// clause := ("!"|"?")? relation target | ("!"|"?")? "[" clause_or "]"
    fn parse_clause(&mut self, left: Fragment) -> Result<Fragment, ParseError> {
        let mode = match self.peek().kind {
            TokenKind::Bang => {
                self.advance();
                RelationMode::Negated
            }
            TokenKind::Question => {
                self.advance();
                RelationMode::Optional
            }
            _ => RelationMode::Exists,
        };

        if self.check(&TokenKind::LBracket) {
            self.advance();
            let group = self.nested(Self::parse_clause_or)?;
            self.expect(&TokenKind::RBracket, "']'")?;

            let group_expr = match mode {
                RelationMode::Exists => group.expr,
                RelationMode::Negated => Expr::Not(Box::new(group.expr)),
                RelationMode::Optional => Expr::Optional(Box::new(group.expr)),
            };
            let declared = self.conjoin_declared(left.declared, group.declared)?;
            let expr = match left.expr {
                Expr::And(mut items) => {
                    items.push(group_expr);
                    Expr::And(items)
                }
                other => Expr::And(vec![other, group_expr]),
            };
            return Ok(Fragment { expr, declared });
        }

        let relation = self.parse_relation()?;
        let right = self.parse_target()?;
        let declared = self.conjoin_declared(left.declared, right.declared)?;
        Ok(Fragment {
            expr: Expr::Relation {
                left: Box::new(left.expr),
                relation,
                right: Box::new(right.expr),
                mode,
            },
            declared,
        })
    }

    /// clause_or := clause_and ("||" clause_and)*
    fn parse_clause_or(&mut self) -> Result<Fragment, ParseError> {
        let first = self.parse_clause_and()?;
        if !self.check(&TokenKind::OrRel) {
            return Ok(first);
        }
        let mut branches = vec![first];
        while self.check(&TokenKind::OrRel) {
            self.advance();
            branches.push(self.parse_clause_and()?);
        }
        Ok(self.disjoin(branches))
    }

    /// clause_and := clause ("&"? clause)*, each on a wildcard left operand
    fn parse_clause_and(&mut self) -> Result<Fragment, ParseError> {
        let wildcard = || Fragment::plain(Expr::NodeTest(NodeTest::any()));

        if !self.starts_clause() {
            return Err(self.unexpected("relation or '['"));
        }
        let mut items = vec![self.parse_clause(wildcard())?];
        loop {
            if self.check(&TokenKind::Amp) {
                self.advance();
                if !self.starts_clause() {
                    return Err(self.unexpected("relation or '['"));
                }
            } else if !self.starts_clause() {
                break;
            }
            items.push(self.parse_clause(wildcard())?);
        }
        self.conjoin(items)
    }

    /// relation := REL NUMBER? | REL_ARG "(" node_test ")"
    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        let token = self.expect(&TokenKind::Relation, "relation")?;
        let operator = self.config.relations.get(&token.text).cloned().ok_or_else(|| {
            ParseError::UnsupportedRelation {
                op: token.text.clone(),
                position: token.position,
            }
        })?;

        match operator {
            Operator::Simple(relation) => Ok(relation),
            Operator::Indexable { ref plain, .. } => {
                if !self.check(&TokenKind::Number) {
                    return Ok(plain.clone());
                }
                let number = self.advance();
                let invalid = || ParseError::InvalidChildIndex {
                    index: number.text.clone(),
                    position: number.position,
                };
                let n: u32 = number.text.parse().map_err(|_| invalid())?;
                operator.with_index(n).ok_or_else(invalid)
            }
            Operator::Chained(chain) => {
                self.expect(&TokenKind::LParen, "'('")?;
                let test = self.parse_node_test(true)?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Relation::Unbroken(chain, test))
            }
        }
    }

    /// target := "!" node_test capture? | "!" target | atom
    ///
    /// `!NN` is a negated node description, so a capture on it binds the
    /// node that matched.
    fn parse_target(&mut self) -> Result<Fragment, ParseError> {
        use TokenKind::*;

        if !self.check(&Bang) {
            return self.parse_atom();
        }
        if matches!(
            self.peek_second().kind,
            At | Ident | Str(_) | Regex { .. } | Wildcard | Root
        ) {
            let test = self.parse_node_test(true)?;
            return self.parse_capture(Fragment::plain(Expr::NodeTest(test)));
        }
        self.advance();
        let inner = self.nested(Self::parse_target)?;
        Ok(Fragment {
            expr: Expr::Not(Box::new(inner.expr)),
            declared: inner.declared,
        })
    }

    /// atom := node_test capture? | "=" NAME | "(" disjunction ")" capture?
    fn parse_atom(&mut self) -> Result<Fragment, ParseError> {
        use TokenKind::*;

        match self.peek().kind {
            Equals => {
                self.advance();
                let name = self.expect(&Ident, "capture name")?;
                let var = self.var_id(&name.text);
                Ok(Fragment::plain(Expr::BackReference(var)))
            }
            LParen => {
                self.advance();
                let inner = self.nested(Self::parse_disjunction)?;
                self.expect(&RParen, "')'")?;
                self.parse_capture(inner)
            }
            At | Ident | Str(_) | Regex { .. } | Wildcard | Root => {
                let test = self.parse_node_test(false)?;
                self.parse_capture(Fragment::plain(Expr::NodeTest(test)))
            }
            _ => Err(self.unexpected("node description")),
        }
    }

    /// capture := "=" NAME
    fn parse_capture(&mut self, inner: Fragment) -> Result<Fragment, ParseError> {
        if !self.check(&TokenKind::Equals) {
            return Ok(inner);
        }
        self.advance();
        let name = self.expect(&TokenKind::Ident, "capture name")?;
        let var = self.var_id(&name.text);
        let declared = self.conjoin_declared(inner.declared, vec![(var, name.position)])?;
        Ok(Fragment {
            expr: Expr::Capture {
                var,
                expr: Box::new(inner.expr),
            },
            declared,
        })
    }

    /// node_test := "!"? "@"? label ("|" label)*
    ///
    /// The leading `!` is only accepted in relation arguments (`<+(!VP)`)
    /// and relation targets (`< !NN`).
    fn parse_node_test(&mut self, allow_negation: bool) -> Result<NodeTest, ParseError> {
        let negated = allow_negation && self.check(&TokenKind::Bang);
        if negated {
            self.advance();
        }
        let basic_category = self.check(&TokenKind::At);
        if basic_category {
            self.advance();
        }

        let mut alternatives = vec![self.parse_label()?];
        while self.check(&TokenKind::Pipe) {
            self.advance();
            alternatives.push(self.parse_label()?);
        }

        Ok(NodeTest {
            alternatives,
            basic_category,
            negated,
        })
    }

    /// label := IDENT | STR | REGEX | "__" | "_ROOT_"
    fn parse_label(&mut self) -> Result<LabelMatcher, ParseError> {
        let token = self.peek().clone();
        let label = match token.kind {
            TokenKind::Ident => LabelMatcher::Exact(token.text),
            TokenKind::Str(s) => LabelMatcher::Exact(s),
            TokenKind::Regex { pattern, flags } => LabelMatcher::regex(&pattern, &flags)
                .map_err(|source| ParseError::InvalidRegex {
                    pattern,
                    position: token.position,
                    source,
                })?,
            TokenKind::Wildcard => LabelMatcher::Any,
            TokenKind::Root => LabelMatcher::Root,
            _ => return Err(self.unexpected("label")),
        };
        self.advance();
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationTable;
    use crate::lexer::tokenize;
    use crate::relation::Chain;

    fn parse_with(input: &str, config: &Config) -> Result<ParsedPattern, ParseError> {
        Parser::new(tokenize(input).unwrap(), config).parse()
    }

    fn parse(input: &str) -> Result<ParsedPattern, ParseError> {
        parse_with(input, &Config::default())
    }

    fn test(label: &str) -> Box<Expr> {
        Box::new(Expr::NodeTest(NodeTest::exact(label)))
    }

    fn rel(left: Box<Expr>, relation: Relation, right: Box<Expr>) -> Expr {
        Expr::Relation {
            left,
            relation,
            right,
            mode: RelationMode::Exists,
        }
    }

    #[test]
    fn test_parse_relation() {
        let parsed = parse("NP < NN").unwrap();
        assert_eq!(parsed.expr, rel(test("NP"), Relation::ParentOf, test("NN")));
        assert!(parsed.var_names.is_empty());
    }

    #[test]
    fn test_chain_nests_on_the_left() {
        let parsed = parse("VP < VBZ < NP").unwrap();
        let inner = rel(test("VP"), Relation::ParentOf, test("VBZ"));
        assert_eq!(
            parsed.expr,
            rel(Box::new(inner), Relation::ParentOf, test("NP"))
        );
    }

    #[test]
    fn test_boolean_structure() {
        let parsed = parse("A B").unwrap();
        assert_eq!(parsed.expr, Expr::And(vec![*test("A"), *test("B")]));

        let parsed = parse("A & B || C").unwrap();
        assert_eq!(
            parsed.expr,
            Expr::Or(vec![Expr::And(vec![*test("A"), *test("B")]), *test("C")])
        );

        let parsed = parse("!NP < NN").unwrap();
        assert_eq!(
            parsed.expr,
            Expr::Not(Box::new(rel(test("NP"), Relation::ParentOf, test("NN"))))
        );
    }

    #[test]
    fn test_relation_modes() {
        let parsed = parse("NN !< DT").unwrap();
        assert!(matches!(
            parsed.expr,
            Expr::Relation {
                mode: RelationMode::Negated,
                ..
            }
        ));
        let parsed = parse("NN ?< DT=d").unwrap();
        assert!(matches!(
            parsed.expr,
            Expr::Relation {
                mode: RelationMode::Optional,
                ..
            }
        ));
    }

    #[test]
    fn test_negated_target() {
        let mut not_nn = NodeTest::exact("NN");
        not_nn.negated = true;

        let parsed = parse("NP < !NN").unwrap();
        assert_eq!(
            parsed.expr,
            rel(test("NP"), Relation::ParentOf, Box::new(Expr::NodeTest(not_nn.clone())))
        );

        let parsed = parse("NP < !NN=x").unwrap();
        assert_eq!(
            parsed.expr,
            rel(
                test("NP"),
                Relation::ParentOf,
                Box::new(Expr::Capture {
                    var: 0,
                    expr: Box::new(Expr::NodeTest(not_nn)),
                })
            )
        );
        assert_eq!(parsed.var_names, vec!["x"]);

        let parsed = parse("NP < !(NN < DT)").unwrap();
        assert_eq!(
            parsed.expr,
            rel(
                test("NP"),
                Relation::ParentOf,
                Box::new(Expr::Not(Box::new(rel(test("NN"), Relation::ParentOf, test("DT")))))
            )
        );
    }

    #[test]
    fn test_clause_groups() {
        let any = || Box::new(Expr::NodeTest(NodeTest::any()));

        let parsed = parse("NP [< NN || < NNS]").unwrap();
        assert_eq!(
            parsed.expr,
            Expr::And(vec![
                *test("NP"),
                Expr::Or(vec![
                    rel(any(), Relation::ParentOf, test("NN")),
                    rel(any(), Relation::ParentOf, test("NNS")),
                ]),
            ])
        );

        let parsed = parse("NP ![< DT] ?[$ VP]").unwrap();
        assert_eq!(
            parsed.expr,
            Expr::And(vec![
                *test("NP"),
                Expr::Not(Box::new(rel(any(), Relation::ParentOf, test("DT")))),
                Expr::Optional(Box::new(rel(any(), Relation::SisterOf, test("VP")))),
            ])
        );
    }

    #[test]
    fn test_captures_and_back_references() {
        let parsed = parse("VP=v < VBZ").unwrap();
        assert_eq!(parsed.var_names, vec!["v"]);
        assert_eq!(
            parsed.expr,
            rel(
                Box::new(Expr::Capture { var: 0, expr: test("VP") }),
                Relation::ParentOf,
                test("VBZ")
            )
        );

        let parsed = parse("NN=x $ =x").unwrap();
        assert_eq!(
            parsed.expr,
            rel(
                Box::new(Expr::Capture { var: 0, expr: test("NN") }),
                Relation::SisterOf,
                Box::new(Expr::BackReference(0))
            )
        );
    }

    #[test]
    fn test_duplicate_capture() {
        let err = parse("NP=x < NN=x").unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateCapture { ref name, position: 10 } if name == "x"
        ));
        assert!(parse("NP=x NN=x").is_err());

        // Alternatives may reuse a name
        let parsed = parse("NP=x || VP=x").unwrap();
        assert_eq!(parsed.var_names, vec!["x"]);
        assert!(parse("(NP=x || VP=x) < NN=y").is_ok());
    }

    #[test]
    fn test_child_indices() {
        let relation = |input: &str| match parse(input).unwrap().expr {
            Expr::Relation { relation, .. } => relation,
            other => panic!("not a relation: {other:?}"),
        };
        assert_eq!(relation("VP <2 NP"), Relation::HasIthChild(2));
        assert_eq!(relation("VP <-1 NP"), Relation::HasIthChild(-1));
        assert_eq!(relation("VP <- NP"), Relation::HasLastChild);
        assert_eq!(relation("VP >2 S"), Relation::IthChildOf(2));
        assert_eq!(relation("VP >-2 S"), Relation::IthChildOf(-2));
        assert!(matches!(
            parse("VP <0 NP"),
            Err(ParseError::InvalidChildIndex { .. })
        ));
        assert!(matches!(
            parse("VP << 2"),
            Err(ParseError::Unexpected { .. })
        ));
    }

    #[test]
    fn test_unbroken_relation() {
        let parsed = parse("S <+(VP|NP) VB").unwrap();
        let Expr::Relation { relation, .. } = parsed.expr else {
            panic!("expected a relation");
        };
        let Relation::Unbroken(Chain::Dominates, arg) = relation else {
            panic!("expected an unbroken chain");
        };
        assert_eq!(arg.alternatives.len(), 2);
        assert!(!arg.negated);

        let parsed = parse("S <+(!NP) VB").unwrap();
        let Expr::Relation {
            relation: Relation::Unbroken(_, arg),
            ..
        } = parsed.expr
        else {
            panic!("expected an unbroken chain");
        };
        assert!(arg.negated);
    }

    #[test]
    fn test_node_descriptions() {
        let parsed = parse("@NP|/^VP/i|\"a b\"").unwrap();
        let Expr::NodeTest(node) = parsed.expr else {
            panic!("expected a node test");
        };
        assert!(node.basic_category);
        assert_eq!(node.alternatives.len(), 3);
        assert_eq!(node.alternatives[2], LabelMatcher::Exact("a b".to_string()));
        assert!(matches!(parse("__ < _ROOT_"), Ok(_)));
    }

    #[test]
    fn test_unexpected_tokens() {
        match parse("NP < (") {
            Err(ParseError::Unexpected {
                expected,
                found,
                position,
            }) => {
                assert_eq!(expected, "node description");
                assert_eq!(found, "end of pattern");
                assert_eq!(position, 6);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(parse("NP )"), Err(ParseError::Unexpected { .. })));
        assert!(matches!(parse(""), Err(ParseError::Unexpected { .. })));
        assert!(matches!(parse("NP [ ]"), Err(ParseError::Unexpected { .. })));
        assert!(matches!(parse("NP ="), Err(ParseError::Unexpected { .. })));
        assert!(matches!(parse("NP <+ VP"), Err(ParseError::Unexpected { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let too_deep = |result: Result<ParsedPattern, ParseError>| {
            matches!(result, Err(ParseError::TooDeep { limit: 128, .. }))
        };

        assert!(too_deep(parse(&format!("NP < {}", "(".repeat(3000)))));
        assert!(too_deep(parse(&format!(
            "{}NP{}",
            "(".repeat(2000),
            ")".repeat(2000)
        ))));
        assert!(too_deep(parse(&format!("{}NP", "!".repeat(10_000)))));
        assert!(too_deep(parse(&format!("NP < {}NN", "!".repeat(10_000)))));
        assert!(too_deep(parse(&format!("NP{}", " < A".repeat(1000)))));
        assert!(too_deep(parse(&format!(
            "NP {}{}",
            "[< A ".repeat(1000),
            "]".repeat(1000)
        ))));

        assert!(parse(&format!("{}NP{}", "(".repeat(100), ")".repeat(100))).is_ok());
        assert!(parse(&format!("NP{}", " < A".repeat(100))).is_ok());
    }

    #[test]
    fn test_configured_nesting_limit() {
        let config = Config::default().with_max_depth(2);
        assert!(parse_with("((NP))", &config).is_ok());
        assert!(matches!(
            parse_with("(((NP)))", &config),
            Err(ParseError::TooDeep { limit: 2, position: 2 })
        ));
        assert!(matches!(
            parse_with("NP < DT < NN < JJ", &config),
            Err(ParseError::TooDeep { limit: 2, position: 13 })
        ));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            parse("NP < /[/"),
            Err(ParseError::InvalidRegex { position: 5, .. })
        ));
    }

    #[test]
    fn test_unsupported_relation() {
        let config = Config::default().with_relations(RelationTable::tregex().without(":"));
        assert!(matches!(
            parse_with("NP : VP", &config),
            Err(ParseError::UnsupportedRelation { ref op, position: 3 }) if op == ":"
        ));
        assert!(parse("NP : VP").is_ok());
    }
}
