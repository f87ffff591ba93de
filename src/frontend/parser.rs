//! Recursive-descent parser for static control parts.
//!
//! Accepted statements:
//!
//! ```text
//! item := 'for' '(' [type] iter '=' affine ';' cond ';' step ')' item
//!       | 'if' '(' cond ')' item
//!       | '{' item* '}'
//!       | ';'
//!       | <tokens up to ';'>                  -- a statement, body kept verbatim
//! cond := affine ('<' | '<=' | '>' | '>=' | '==') affine ('&&' ...)*
//! step := iter '++' | '++' iter | iter '--' | '--' iter
//!       | iter ('+=' | '-=') int | iter '=' iter ('+' | '-') int
//! ```
//!
//! Loops must have unit stride. Identifiers in affine positions that are not
//! enclosing iterators become parameters, in order of first appearance.

use log::trace;

use super::affine::{Affine, AffineConstraint};
use super::lexer::{Tok, Token};
use super::ExtractError;

const TYPE_KEYWORDS: &[&str] = &["int", "long", "unsigned", "signed", "short", "size_t", "register", "const"];
const UNSUPPORTED_KEYWORDS: &[&str] = &["while", "do", "switch", "goto", "return", "break", "continue", "else"];

/// A statement as seen by the parser, before column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    /// Enclosing iterators, outermost first.
    pub iterators: Vec<String>,
    /// Domain constraints over iterators and parameters.
    pub constraints: Vec<AffineConstraint>,
    /// Statement text, verbatim from the source.
    pub expression: String,
    pub line: usize,
}

#[derive(Debug, Default)]
struct Scope {
    iterator: Option<String>,
    constraints: Vec<AffineConstraint>,
}

pub struct Parser<'a> {
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
    scopes: Vec<Scope>,
    params: Vec<String>,
    statements: Vec<ParsedStatement>,
}

impl<'a> Parser<'a> {
    /// `tokens` must have been produced from `src`.
    pub fn new(src: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
            scopes: Vec::new(),
            params: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Parses every item and returns the parameters and the statements.
    pub fn parse(mut self) -> Result<(Vec<String>, Vec<ParsedStatement>), ExtractError> {
        while self.peek().is_some() {
            self.parse_item()?;
        }
        Ok((self.params, self.statements))
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_tok(&self) -> Option<&'a Tok> {
        self.peek().map(|t| &t.tok)
    }

    fn peek_is(&self, p: &str) -> bool {
        matches!(self.peek_tok(), Some(Tok::Punct(q)) if *q == p)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.line)
    }

    fn unexpected(&self, expected: &str) -> ExtractError {
        match self.peek() {
            Some(token) => ExtractError::Unexpected {
                line: token.line,
                expected: expected.to_string(),
                found: token.tok.to_string(),
            },
            None => ExtractError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, p: &str) -> Result<&'a Token, ExtractError> {
        if self.peek_is(p) {
            Ok(self.bump().ok_or_else(|| self.unexpected(p))?)
        } else {
            Err(self.unexpected(&format!("'{}'", p)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ExtractError> {
        match self.peek_tok() {
            Some(Tok::Ident(name)) => {
                self.pos += 1;
                Ok(name.clone())
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn is_iterator(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.iterator.as_deref() == Some(name))
    }

    fn iterators(&self) -> Vec<String> {
        self.scopes.iter().filter_map(|s| s.iterator.clone()).collect()
    }

    fn note_name(&mut self, name: &str) {
        if !self.is_iterator(name) && !self.params.iter().any(|p| p == name) {
            trace!("New parameter {}", name);
            self.params.push(name.to_string());
        }
    }

    fn overflow(&self) -> ExtractError {
        ExtractError::Overflow { line: self.line() }
    }

    fn parse_item(&mut self) -> Result<(), ExtractError> {
        let line = self.line();
        match self.peek_tok() {
            Some(Tok::Ident(kw)) if kw == "for" => self.parse_for(),
            Some(Tok::Ident(kw)) if kw == "if" => self.parse_if(),
            Some(Tok::Ident(kw)) if UNSUPPORTED_KEYWORDS.contains(&kw.as_str()) => Err(ExtractError::Unsupported {
                line,
                construct: kw.clone(),
            }),
            Some(Tok::Punct("{")) => {
                self.pos += 1;
                while !self.peek_is("}") {
                    if self.peek().is_none() {
                        return Err(self.unexpected("'}'"));
                    }
                    self.parse_item()?;
                }
                self.pos += 1;
                Ok(())
            }
            Some(Tok::Punct(";")) => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => self.parse_statement(),
            None => Err(self.unexpected("statement")),
        }
    }

    fn parse_statement(&mut self) -> Result<(), ExtractError> {
        let first = self.pos;
        let mut depth = 0i64;
        loop {
            let token = self.bump().ok_or_else(|| self.unexpected("';'"))?;
            match token.tok {
                Tok::Punct("(") | Tok::Punct("[") | Tok::Punct("{") => depth += 1,
                Tok::Punct(")") | Tok::Punct("]") | Tok::Punct("}") => depth -= 1,
                Tok::Punct(";") if depth <= 0 => break,
                _ => {}
            }
        }
        let start = self.tokens[first].start;
        let end = self.tokens[self.pos - 1].end;
        let line = self.tokens[first].line;

        let constraints = self.scopes.iter().flat_map(|s| s.constraints.iter().cloned()).collect();
        let statement = ParsedStatement {
            iterators: self.iterators(),
            constraints,
            expression: self.src[start..end].to_string(),
            line,
        };
        trace!("Statement at line {}: {}", line, statement.expression);
        self.statements.push(statement);
        Ok(())
    }

    fn parse_for(&mut self) -> Result<(), ExtractError> {
        let line = self.line();
        self.pos += 1; // 'for'
        self.expect("(")?;

        while let Some(Tok::Ident(kw)) = self.peek_tok() {
            if TYPE_KEYWORDS.contains(&kw.as_str()) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let iterator = self.expect_ident()?;
        if self.is_iterator(&iterator) {
            return Err(ExtractError::UnsupportedLoop {
                line,
                reason: format!("iterator '{}' shadows an enclosing iterator", iterator),
            });
        }
        self.expect("=")?;
        let init = self.parse_affine()?;
        if init.coeff(&iterator) != 0 {
            return Err(ExtractError::UnsupportedLoop {
                line,
                reason: format!("initial value of '{}' refers to itself", iterator),
            });
        }
        self.expect(";")?;

        // The condition and the body see the iterator.
        self.scopes.push(Scope {
            iterator: Some(iterator.clone()),
            constraints: Vec::new(),
        });
        let cond = self.parse_condition()?;
        self.expect(";")?;
        let step = self.parse_step(&iterator)?;
        self.expect(")")?;

        let it = Affine::var(&iterator);
        let lower = match step {
            1 => it.sub(&init),
            _ => init.sub(&it),
        }
        .ok_or_else(|| self.overflow())?;

        let mut bounded = false;
        for c in &cond {
            let coeff = c.expr.coeff(&iterator);
            let wrong_side = c.kind.is_equality() || (step == 1 && coeff > 0) || (step == -1 && coeff < 0);
            if coeff != 0 && wrong_side {
                return Err(ExtractError::UnsupportedLoop {
                    line,
                    reason: format!("condition '{}' does not bound '{}' in the step direction", c, iterator),
                });
            }
            bounded |= coeff != 0;
        }
        if !bounded {
            return Err(ExtractError::UnsupportedLoop {
                line,
                reason: format!("condition does not involve '{}'", iterator),
            });
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.constraints.push(AffineConstraint::ge_zero(lower));
            scope.constraints.extend(cond);
        }
        self.parse_item()?;
        self.scopes.pop();
        Ok(())
    }

    fn parse_if(&mut self) -> Result<(), ExtractError> {
        self.pos += 1; // 'if'
        self.expect("(")?;
        let cond = self.parse_condition()?;
        self.expect(")")?;

        self.scopes.push(Scope {
            iterator: None,
            constraints: cond,
        });
        self.parse_item()?;
        self.scopes.pop();

        if let Some(Tok::Ident(kw)) = self.peek_tok() {
            if kw == "else" {
                return Err(ExtractError::Unsupported {
                    line: self.line(),
                    construct: "else".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Parses the step of a loop over `iterator`, returning `1` or `-1`.
    fn parse_step(&mut self, iterator: &str) -> Result<i64, ExtractError> {
        let line = self.line();
        let step = if self.peek_is("++") || self.peek_is("--") {
            let inc = self.peek_is("++");
            self.pos += 1;
            self.expect_step_iterator(iterator)?;
            if inc {
                1
            } else {
                -1
            }
        } else {
            self.expect_step_iterator(iterator)?;
            let op = match self.bump().map(|t| &t.tok) {
                Some(Tok::Punct(op)) => *op,
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.unexpected("loop step"));
                }
            };
            match op {
                "++" => 1,
                "--" => -1,
                "+=" | "-=" => {
                    let k = self.parse_affine()?.as_constant().ok_or_else(|| ExtractError::UnsupportedLoop {
                        line,
                        reason: "non-constant step".to_string(),
                    })?;
                    if op == "+=" {
                        k
                    } else {
                        -k
                    }
                }
                "=" => {
                    let rhs = self.parse_affine()?;
                    let delta = rhs.sub(&Affine::var(iterator)).ok_or_else(|| self.overflow())?;
                    if rhs.coeff(iterator) != 1 {
                        return Err(ExtractError::UnsupportedLoop {
                            line,
                            reason: format!("step '{} = {}' is not a translation", iterator, rhs),
                        });
                    }
                    delta.as_constant().ok_or_else(|| ExtractError::UnsupportedLoop {
                        line,
                        reason: "non-constant step".to_string(),
                    })?
                }
                _ => {
                    return Err(ExtractError::Unexpected {
                        line,
                        expected: "loop step".to_string(),
                        found: format!("'{}'", op),
                    })
                }
            }
        };
        if step != 1 && step != -1 {
            return Err(ExtractError::UnsupportedLoop {
                line,
                reason: format!("non-unit stride {}", step),
            });
        }
        Ok(step)
    }

    fn expect_step_iterator(&mut self, iterator: &str) -> Result<(), ExtractError> {
        let line = self.line();
        let name = self.expect_ident()?;
        if name != iterator {
            return Err(ExtractError::UnsupportedLoop {
                line,
                reason: format!("step updates '{}' instead of '{}'", name, iterator),
            });
        }
        Ok(())
    }

    /// Conjunction of affine comparisons.
    fn parse_condition(&mut self) -> Result<Vec<AffineConstraint>, ExtractError> {
        let mut constraints = self.parse_conjunct()?;
        while self.peek_is("&&") {
            self.pos += 1;
            constraints.extend(self.parse_conjunct()?);
        }
        Ok(constraints)
    }

    fn parse_conjunct(&mut self) -> Result<Vec<AffineConstraint>, ExtractError> {
        if self.peek_is("(") {
            // Either a parenthesised condition or an affine operand like `(N - 1) >= i`.
            let save = self.pos;
            self.pos += 1;
            if let Ok(inner) = self.parse_condition() {
                if self.peek_is(")") {
                    self.pos += 1;
                    return Ok(inner);
                }
            }
            self.pos = save;
        }
        Ok(vec![self.parse_comparison()?])
    }

    fn parse_comparison(&mut self) -> Result<AffineConstraint, ExtractError> {
        let lhs = self.parse_affine()?;
        let op = match self.peek_tok() {
            Some(Tok::Punct(op @ ("<" | "<=" | ">" | ">=" | "=="))) => *op,
            _ => return Err(self.unexpected("comparison")),
        };
        self.pos += 1;
        let rhs = self.parse_affine()?;

        let c = match op {
            "<" => rhs.sub(&lhs).and_then(|e| e.add_constant(-1)).map(AffineConstraint::ge_zero),
            "<=" => rhs.sub(&lhs).map(AffineConstraint::ge_zero),
            ">" => lhs.sub(&rhs).and_then(|e| e.add_constant(-1)).map(AffineConstraint::ge_zero),
            ">=" => lhs.sub(&rhs).map(AffineConstraint::ge_zero),
            _ => lhs.sub(&rhs).map(AffineConstraint::eq_zero),
        };
        c.ok_or_else(|| self.overflow())
    }

    /// `affine := ['+'|'-'] term (('+'|'-') term)*`
    fn parse_affine(&mut self) -> Result<Affine, ExtractError> {
        let mut acc = self.parse_term()?;
        loop {
            let sign = if self.peek_is("+") {
                1
            } else if self.peek_is("-") {
                -1
            } else {
                break;
            };
            self.pos += 1;
            let term = self.parse_term()?.scale(sign).ok_or_else(|| self.overflow())?;
            acc = acc.add(&term).ok_or_else(|| self.overflow())?;
        }
        Ok(acc)
    }

    /// `term := unary ('*' unary)*`, at most one non-constant factor.
    fn parse_term(&mut self) -> Result<Affine, ExtractError> {
        let mut acc = self.parse_unary()?;
        loop {
            if self.peek_is("*") {
                self.pos += 1;
                let line = self.line();
                let rhs = self.parse_unary()?;
                acc = match (acc.as_constant(), rhs.as_constant()) {
                    (Some(k), _) => rhs.scale(k),
                    (_, Some(k)) => acc.scale(k),
                    _ => {
                        return Err(ExtractError::NonAffine {
                            line,
                            reason: format!("product of '{}' and '{}'", acc, rhs),
                        })
                    }
                }
                .ok_or_else(|| self.overflow())?;
            } else if self.peek_is("/") || self.peek_is("%") {
                return Err(ExtractError::NonAffine {
                    line: self.line(),
                    reason: "division or modulo".to_string(),
                });
            } else {
                break;
            }
        }
        Ok(acc)
    }

    fn parse_unary(&mut self) -> Result<Affine, ExtractError> {
        if self.peek_is("-") {
            self.pos += 1;
            return self.parse_unary()?.scale(-1).ok_or_else(|| self.overflow());
        }
        if self.peek_is("+") {
            self.pos += 1;
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Affine, ExtractError> {
        let line = self.line();
        match self.peek_tok() {
            Some(Tok::Int(value)) => {
                self.pos += 1;
                Ok(Affine::constant(*value))
            }
            Some(Tok::Ident(name)) => {
                self.pos += 1;
                if self.peek_is("(") || self.peek_is("[") {
                    return Err(ExtractError::NonAffine {
                        line,
                        reason: format!("call or array access '{}'", name),
                    });
                }
                self.note_name(name);
                Ok(Affine::var(name))
            }
            Some(Tok::Punct("(")) => {
                self.pos += 1;
                let inner = self.parse_affine()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(Tok::Float(text)) => Err(ExtractError::NonAffine {
                line,
                reason: format!("floating-point literal {}", text),
            }),
            _ => Err(self.unexpected("affine expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::frontend::lexer::tokenize;

    fn parse(src: &str) -> Result<(Vec<String>, Vec<ParsedStatement>), ExtractError> {
        let tokens = tokenize(src, 1)?;
        Parser::new(src, &tokens).parse()
    }

    fn constraint_strings(stmt: &ParsedStatement) -> Vec<String> {
        stmt.constraints.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_single_loop() {
        let (params, stmts) = parse("for (i = 0; i < N; i++) x[i] = x[i] + 1;").unwrap();
        assert_eq!(params, vec!["N".to_string()]);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].iterators, vec!["i".to_string()]);
        assert_eq!(stmts[0].expression, "x[i] = x[i] + 1;");
        assert_eq!(constraint_strings(&stmts[0]), vec!["i >= 0", "N - i - 1 >= 0"]);
    }

    #[test]
    fn test_nest_and_blocks() {
        let src = "
            for (int i = 0; i <= N - 1; ++i) {
                s[i] = 0;
                for (int j = i + 1; j < M; j += 1)
                    s[i] = s[i] + a[i][j];
            }";
        let (params, stmts) = parse(src).unwrap();
        assert_eq!(params, vec!["N".to_string(), "M".to_string()]);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].iterators, vec!["i".to_string()]);
        assert_eq!(stmts[0].line, 3);
        assert_eq!(stmts[1].iterators, vec!["i".to_string(), "j".to_string()]);
        assert_eq!(
            constraint_strings(&stmts[1]),
            vec!["i >= 0", "N - i - 1 >= 0", "-i + j - 1 >= 0", "M - j - 1 >= 0"]
        );
    }

    #[test]
    fn test_decreasing_loop() {
        let (_, stmts) = parse("for (i = N - 1; i >= 0; i--) y[i] = 2 * y[i];").unwrap();
        assert_eq!(constraint_strings(&stmts[0]), vec!["N - i - 1 >= 0", "i >= 0"]);
    }

    #[test]
    fn test_if_guard() {
        let (params, stmts) = parse("for (i = 0; i < N; i++) if (i == K && 2*i >= M) z = z + i;").unwrap();
        assert_eq!(params, vec!["N".to_string(), "K".to_string(), "M".to_string()]);
        assert_eq!(
            constraint_strings(&stmts[0]),
            vec!["i >= 0", "N - i - 1 >= 0", "-K + i = 0", "-M + 2i >= 0"]
        );
    }

    #[test]
    fn test_affine_coefficients() {
        let (_, stmts) = parse("for (i = 0; i < 2 * (N + 1) - 3; i = i + 1) a = b;").unwrap();
        assert_eq!(constraint_strings(&stmts[0]), vec!["i >= 0", "2N - i - 2 >= 0"]);
    }

    #[test]
    fn test_non_affine_bound() {
        assert!(matches!(
            parse("for (i = 0; i < N * N; i++) a = b;"),
            Err(ExtractError::NonAffine { line: 1, .. })
        ));
        assert!(matches!(
            parse("for (i = 0; i < N / 2; i++) a = b;"),
            Err(ExtractError::NonAffine { .. })
        ));
        assert!(matches!(
            parse("for (i = 0; i < f(N); i++) a = b;"),
            Err(ExtractError::NonAffine { .. })
        ));
    }

    #[test]
    fn test_unsupported_loops() {
        assert!(matches!(
            parse("for (i = 0; i < N; i += 2) a = b;"),
            Err(ExtractError::UnsupportedLoop { .. })
        ));
        assert!(matches!(
            parse("for (i = 0; i < N; j++) a = b;"),
            Err(ExtractError::UnsupportedLoop { .. })
        ));
        assert!(matches!(
            parse("for (i = 0; i > N; i++) a = b;"),
            Err(ExtractError::UnsupportedLoop { .. })
        ));
        assert!(matches!(
            parse("for (i = 0; N > 0; i++) a = b;"),
            Err(ExtractError::UnsupportedLoop { .. })
        ));
    }

    #[test]
    fn test_unsupported_constructs() {
        assert!(matches!(
            parse("while (x) a = b;"),
            Err(ExtractError::Unsupported { .. })
        ));
        assert!(matches!(
            parse("if (i < N) a = b; else a = c;"),
            Err(ExtractError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            parse("for (i = 0; i < N; i++) { a = b;"),
            Err(ExtractError::UnexpectedEof { .. })
        ));
        assert!(matches!(parse("a = b"), Err(ExtractError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_statement_with_calls() {
        let (params, stmts) = parse("for (i = 0; i < N; i++) y[i] = sqrt(x[i]) * (a + b);").unwrap();
        assert_eq!(params, vec!["N".to_string()]);
        assert_eq!(stmts[0].expression, "y[i] = sqrt(x[i]) * (a + b);");
    }

    #[test]
    fn test_parenthesized_comparison() {
        let (_, stmts) = parse("for (i = 0; (i < N); i++) a = b;").unwrap();
        assert_eq!(constraint_strings(&stmts[0]), vec!["i >= 0", "N - i - 1 >= 0"]);
        let (_, stmts) = parse("for (i = 0; (N - 1) >= i; i++) a = b;").unwrap();
        assert_eq!(constraint_strings(&stmts[0]), vec!["i >= 0", "N - i - 1 >= 0"]);
        let (_, stmts) = parse("for (i = 0; (i < N && i <= M); i++) a = b;").unwrap();
        assert_eq!(
            constraint_strings(&stmts[0]),
            vec!["i >= 0", "N - i - 1 >= 0", "M - i >= 0"]
        );
    }
}
