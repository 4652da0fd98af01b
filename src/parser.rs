use std::rc::Rc;

use crate::ast::{
    Arglist, AugOp, BinOp, CompClause, CompOp, Decorator, DottedName, ExceptClause, Expr, ExprList,
    Literal, NameAlias, Param, Params, Stmt, Suite, UnaryOp,
};
use crate::lexer;
use crate::token::{Token, TokenKind};

mod error;

pub use error::{ParseError, ParseResult};

/// Parses a complete source text into a statement suite.
pub fn parse(source: &str) -> ParseResult<Suite> {
    Parser::new(lexer::tokenize(source)?).parse_file()
}

/// Parses a single expression list, the input form of `eval`.
pub fn parse_eval(source: &str) -> ParseResult<ExprList> {
    let mut parser = Parser::new(lexer::tokenize(source)?);
    let exprs = parser.parse_test_list()?;
    parser.eat(&TokenKind::Newline);
    parser.expect(TokenKind::End)?;
    Ok(exprs)
}

/// Recursive-descent parser over the token stream. Each grammar
/// production is one method; the parser looks at most one token ahead
/// of the current one.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last(),
            Some(Token {
                kind: TokenKind::End,
                ..
            })
        ));
        Self { tokens, pos: 0 }
    }

    pub fn parse_file(mut self) -> ParseResult<Suite> {
        let mut suite = Suite::default();
        while !self.at(&TokenKind::End) {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            self.parse_stmt(&mut suite)?;
        }
        Ok(suite)
    }

    // ------------------------------------------------------------------
    // Statements

    fn parse_stmt(&mut self, suite: &mut Suite) -> ParseResult<()> {
        let stmt = match self.current_kind() {
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Try => self.parse_try()?,
            TokenKind::With => self.parse_with()?,
            TokenKind::At | TokenKind::Def | TokenKind::Class => self.parse_decorated()?,
            _ => return self.parse_simple_line(suite),
        };
        suite.push(stmt);
        Ok(())
    }

    /// One physical line of `;`-separated small statements.
    fn parse_simple_line(&mut self, suite: &mut Suite) -> ParseResult<()> {
        loop {
            suite.push(self.parse_small_stmt()?);
            if !self.eat(&TokenKind::Semicolon) || self.at_line_end() {
                break;
            }
        }
        self.expect_newline()
    }

    fn parse_small_stmt(&mut self) -> ParseResult<Stmt> {
        match self.current_kind() {
            TokenKind::Pass => {
                self.advance();
                Ok(Stmt::Pass)
            }
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Stmt::Continue)
            }
            TokenKind::Del => {
                self.advance();
                Ok(Stmt::Del(self.parse_target_list()?))
            }
            TokenKind::Return => {
                self.advance();
                let exprs = if self.can_start_test() {
                    self.parse_test_list()?
                } else {
                    ExprList::single(Expr::Lit(Literal::None))
                };
                Ok(Stmt::Return(exprs))
            }
            TokenKind::Raise => {
                self.advance();
                let exception = if self.can_start_test() {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                let from = if exception.is_some() && self.eat(&TokenKind::From) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(Stmt::Raise { exception, from })
            }
            TokenKind::Yield => {
                self.advance();
                let exprs = if self.can_start_test() {
                    self.parse_test_list()?
                } else {
                    ExprList::single(Expr::Lit(Literal::None))
                };
                Ok(Stmt::Yield(exprs))
            }
            TokenKind::Import => self.parse_import(),
            TokenKind::From => self.parse_from(),
            TokenKind::Global => {
                self.advance();
                Ok(Stmt::Global(self.parse_name_list()?))
            }
            TokenKind::Nonlocal => {
                self.advance();
                Ok(Stmt::Nonlocal(self.parse_name_list()?))
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_test()?;
                let message = if self.eat(&TokenKind::Comma) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(Stmt::Assert { test, message })
            }
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_expr_stmt(&mut self) -> ParseResult<Stmt> {
        let first = self.parse_test_list()?;
        if let Some(op) = self.aug_op() {
            if !first.is_single() || matches!(first.exprs[0], Expr::Star(_)) {
                return Err(ParseError::InvalidAugmentedTarget { line: self.line() });
            }
            self.advance();
            let mut exprs = first.exprs;
            let target = exprs.remove(0);
            let value = self.parse_test_list()?;
            return Ok(Stmt::AugAssign { target, op, value });
        }
        if !self.at(&TokenKind::Assign) {
            return Ok(Stmt::Expr(first));
        }
        let mut targets = vec![first];
        loop {
            self.advance();
            let next = self.parse_test_list()?;
            if self.at(&TokenKind::Assign) {
                targets.push(next);
            } else {
                return Ok(Stmt::Assign {
                    targets,
                    value: next,
                });
            }
        }
    }

    fn aug_op(&self) -> Option<AugOp> {
        let op = match self.current_kind() {
            TokenKind::PlusAssign => AugOp::Add,
            TokenKind::MinusAssign => AugOp::Sub,
            TokenKind::StarAssign => AugOp::Mul,
            TokenKind::SlashAssign => AugOp::Div,
            TokenKind::FloorDivAssign => AugOp::FloorDiv,
            TokenKind::PercentAssign => AugOp::Mod,
            TokenKind::PowerAssign => AugOp::Power,
            TokenKind::ShlAssign => AugOp::Shl,
            TokenKind::ShrAssign => AugOp::Shr,
            TokenKind::AmpAssign => AugOp::BitAnd,
            TokenKind::CaretAssign => AugOp::BitXor,
            TokenKind::PipeAssign => AugOp::BitOr,
            _ => return None,
        };
        Some(op)
    }

    fn parse_import(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let mut names = Vec::new();
        loop {
            let path = self.parse_dotted()?;
            let alias = if self.eat(&TokenKind::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push(DottedName { path, alias });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Stmt::Import(names))
    }

    fn parse_from(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let module = self.parse_dotted()?;
        self.expect(TokenKind::Import)?;
        let mut names = Vec::new();
        if self.eat(&TokenKind::Star) {
            return Ok(Stmt::From { module, names });
        }
        let parenthesized = self.eat(&TokenKind::LParen);
        loop {
            let name = self.expect_name()?;
            let alias = if self.eat(&TokenKind::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push(NameAlias { name, alias });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            if parenthesized && self.at(&TokenKind::RParen) {
                break;
            }
        }
        if parenthesized {
            self.expect(TokenKind::RParen)?;
        }
        Ok(Stmt::From { module, names })
    }

    fn parse_dotted(&mut self) -> ParseResult<Vec<String>> {
        let mut path = vec![self.expect_name()?];
        while self.eat(&TokenKind::Dot) {
            path.push(self.expect_name()?);
        }
        Ok(path)
    }

    fn parse_name_list(&mut self) -> ParseResult<Vec<String>> {
        let mut names = vec![self.expect_name()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_name()?);
        }
        Ok(names)
    }

    // ------------------------------------------------------------------
    // Compound statements

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.parse_if_tail()
    }

    /// Everything after `if`/`elif`. An `elif` chain nests as the else
    /// branch of the enclosing conditional; a missing else becomes a
    /// `pass` suite.
    fn parse_if_tail(&mut self) -> ParseResult<Stmt> {
        let test = self.parse_test()?;
        self.expect(TokenKind::Colon)?;
        let then = self.parse_suite()?;
        let orelse = if self.at(&TokenKind::Elif) {
            self.advance();
            Suite(vec![self.parse_if_tail()?])
        } else if self.eat(&TokenKind::Else) {
            self.expect(TokenKind::Colon)?;
            self.parse_suite()?
        } else {
            Suite(vec![Stmt::Pass])
        };
        Ok(Stmt::If { test, then, orelse })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let test = self.parse_test()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_suite()?;
        Ok(Stmt::While { test, body, orelse })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let targets = self.parse_target_list()?;
        self.expect(TokenKind::In)?;
        let items = self.parse_test_list()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_suite()?;
        Ok(Stmt::For {
            targets,
            items,
            body,
            orelse,
        })
    }

    fn parse_else_suite(&mut self) -> ParseResult<Option<Suite>> {
        if self.eat(&TokenKind::Else) {
            self.expect(TokenKind::Colon)?;
            Ok(Some(self.parse_suite()?))
        } else {
            Ok(None)
        }
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;
        let mut excepts = Vec::new();
        while self.eat(&TokenKind::Except) {
            let clause = if self.at(&TokenKind::Colon) {
                None
            } else {
                Some(self.parse_test()?)
            };
            let binding = if self.eat(&TokenKind::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            self.expect(TokenKind::Colon)?;
            let body = self.parse_suite()?;
            excepts.push(ExceptClause {
                clause,
                binding,
                body,
            });
        }
        let orelse = if !excepts.is_empty() {
            self.parse_else_suite()?
        } else {
            None
        };
        let finally = if self.eat(&TokenKind::Finally) {
            self.expect(TokenKind::Colon)?;
            Some(self.parse_suite()?)
        } else {
            None
        };
        if excepts.is_empty() && finally.is_none() {
            return Err(self.unexpected("`except` or `finally`"));
        }
        Ok(Stmt::Try {
            body,
            excepts,
            orelse,
            finally,
        })
    }

    fn parse_with(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let expr = self.parse_test()?;
        let binding = if self.eat(&TokenKind::As) {
            Some(self.parse_target()?)
        } else {
            None
        };
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;
        Ok(Stmt::With {
            expr,
            binding,
            body,
        })
    }

    fn parse_decorated(&mut self) -> ParseResult<Stmt> {
        let mut decorators = Vec::new();
        while self.eat(&TokenKind::At) {
            let dotted_name = self.parse_dotted()?;
            let arglist = if self.eat(&TokenKind::LParen) {
                Some(self.parse_arglist()?)
            } else {
                None
            };
            self.expect_newline()?;
            decorators.push(Decorator {
                dotted_name,
                arglist,
            });
        }
        match self.current_kind() {
            TokenKind::Def => self.parse_func_def(decorators),
            TokenKind::Class => self.parse_class_def(decorators),
            _ => Err(self.unexpected("`def` or `class`")),
        }
    }

    fn parse_func_def(&mut self, decorators: Vec<Decorator>) -> ParseResult<Stmt> {
        self.advance();
        let name = self.expect_name()?;
        self.expect(TokenKind::LParen)?;
        let mut params = self.parse_params(true)?;
        if self.eat(&TokenKind::Arrow) {
            params.return_type = Some(self.parse_test()?);
        }
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;
        Ok(Stmt::FuncDef {
            name,
            params: Rc::new(params),
            body: Rc::new(body),
            decorators,
        })
    }

    fn parse_class_def(&mut self, decorators: Vec<Decorator>) -> ParseResult<Stmt> {
        self.advance();
        let name = self.expect_name()?;
        let bases = if self.eat(&TokenKind::LParen) {
            self.parse_arglist()?
        } else {
            Arglist::default()
        };
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;
        Ok(Stmt::ClassDef {
            name,
            bases,
            body,
            decorators,
        })
    }

    /// Parameter list of a `def` (parenthesized, up to `)`) or a
    /// `lambda` (bare, up to `:`). Annotations only exist in the
    /// parenthesized form.
    fn parse_params(&mut self, parenthesized: bool) -> ParseResult<Params> {
        let mut params = Params::default();
        let mut seen_default = false;
        loop {
            let done = if parenthesized {
                self.at(&TokenKind::RParen)
            } else {
                self.at(&TokenKind::Colon)
            };
            if done {
                break;
            }
            if self.eat(&TokenKind::Star) {
                if params.rest_positional.is_some() || params.rest_keyword.is_some() {
                    return Err(ParseError::InvalidParameterList { line: self.line() });
                }
                params.rest_positional = Some(self.parse_param(parenthesized, false)?);
            } else if self.eat(&TokenKind::Power) {
                if params.rest_keyword.is_some() {
                    return Err(ParseError::InvalidParameterList { line: self.line() });
                }
                params.rest_keyword = Some(self.parse_param(parenthesized, false)?);
            } else {
                if params.rest_keyword.is_some() {
                    return Err(ParseError::InvalidParameterList { line: self.line() });
                }
                let param = self.parse_param(parenthesized, true)?;
                if param.default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    return Err(ParseError::ParameterWithoutDefault { line: self.line() });
                }
                params.params.push(param);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if parenthesized {
            self.expect(TokenKind::RParen)?;
        }
        Ok(params)
    }

    fn parse_param(&mut self, annotated: bool, defaulted: bool) -> ParseResult<Param> {
        let name = self.expect_name()?;
        let annotation = if annotated && self.eat(&TokenKind::Colon) {
            Some(self.parse_test()?)
        } else {
            None
        };
        let default = if defaulted && self.eat(&TokenKind::Assign) {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(Param {
            name,
            annotation,
            default,
        })
    }

    /// Either an indented block or the rest of the current line.
    fn parse_suite(&mut self) -> ParseResult<Suite> {
        let mut suite = Suite::default();
        if self.eat(&TokenKind::Newline) {
            self.expect(TokenKind::Indent)?;
            while !self.at(&TokenKind::Dedent) {
                self.parse_stmt(&mut suite)?;
            }
            self.advance();
        } else {
            self.parse_simple_line(&mut suite)?;
        }
        Ok(suite)
    }

    // ------------------------------------------------------------------
    // Expressions

    /// A comma-separated expression list; `*expr` elements are allowed.
    fn parse_test_list(&mut self) -> ParseResult<ExprList> {
        let first = self.parse_test_or_star()?;
        if !self.eat(&TokenKind::Comma) {
            return Ok(ExprList::single(first));
        }
        let mut exprs = vec![first];
        while self.can_start_test() {
            exprs.push(self.parse_test_or_star()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(ExprList::new(exprs))
    }

    fn parse_test_or_star(&mut self) -> ParseResult<Expr> {
        if self.eat(&TokenKind::Star) {
            Ok(Expr::Star(Box::new(self.parse_expr()?)))
        } else {
            self.parse_test()
        }
    }

    /// Assignment targets and `for`/`del` targets; same shape as a test
    /// list but elements stop below the conditional operator, and the
    /// list never takes the parenthesized single form.
    fn parse_target_list(&mut self) -> ParseResult<ExprList> {
        let first = self.parse_target()?;
        if !self.eat(&TokenKind::Comma) {
            return Ok(ExprList::new(vec![first]));
        }
        let mut exprs = vec![first];
        while self.can_start_test() {
            exprs.push(self.parse_target()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(ExprList::new(exprs))
    }

    fn parse_target(&mut self) -> ParseResult<Expr> {
        if self.eat(&TokenKind::Star) {
            Ok(Expr::Star(Box::new(self.parse_expr()?)))
        } else {
            self.parse_expr()
        }
    }

    fn parse_test(&mut self) -> ParseResult<Expr> {
        if self.at(&TokenKind::Lambda) {
            return self.parse_lambda();
        }
        let then = self.parse_or_test()?;
        if !self.eat(&TokenKind::If) {
            return Ok(then);
        }
        let test = self.parse_or_test()?;
        self.expect(TokenKind::Else)?;
        let orelse = self.parse_test()?;
        Ok(Expr::IfElse {
            test: Box::new(test),
            then: Box::new(then),
            orelse: Box::new(orelse),
        })
    }

    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        self.advance();
        let params = self.parse_params(false)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda {
            params: Rc::new(params),
            body: Rc::new(body),
        })
    }

    fn parse_or_test(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_test()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and_test()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_test(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not_test()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not_test()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not_test(&mut self) -> ParseResult<Expr> {
        if self.eat(&TokenKind::Not) {
            Ok(Expr::Not(Box::new(self.parse_not_test()?)))
        } else {
            self.parse_comparison()
        }
    }

    /// Any run of comparison operators folds into a single node so the
    /// evaluator can thread each operand to its neighbor exactly once.
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_expr()?;
        let mut comps = Vec::new();
        while let Some(op) = self.comp_op()? {
            comps.push((op, self.parse_expr()?));
        }
        if comps.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Comparison {
                left: Box::new(left),
                comps,
            })
        }
    }

    fn comp_op(&mut self) -> ParseResult<Option<CompOp>> {
        let op = match self.current_kind() {
            TokenKind::Less => CompOp::Lt,
            TokenKind::Greater => CompOp::Gt,
            TokenKind::LessEq => CompOp::Le,
            TokenKind::GreaterEq => CompOp::Ge,
            TokenKind::Eq => CompOp::Eq,
            TokenKind::NotEq => CompOp::Ne,
            TokenKind::In => CompOp::In,
            TokenKind::Is => {
                self.advance();
                return Ok(Some(if self.eat(&TokenKind::Not) {
                    CompOp::IsNot
                } else {
                    CompOp::Is
                }));
            }
            TokenKind::Not if matches!(self.peek_kind(), TokenKind::In) => {
                self.advance();
                self.advance();
                return Ok(Some(CompOp::NotIn));
            }
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(op))
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_xor_expr()?;
        while self.eat(&TokenKind::Pipe) {
            left = binary(BinOp::BitOr, left, self.parse_xor_expr()?);
        }
        Ok(left)
    }

    fn parse_xor_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.eat(&TokenKind::Caret) {
            left = binary(BinOp::BitXor, left, self.parse_and_expr()?);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_shift_expr()?;
        while self.eat(&TokenKind::Amp) {
            left = binary(BinOp::BitAnd, left, self.parse_shift_expr()?);
        }
        Ok(left)
    }

    fn parse_shift_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_arith_expr()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            left = binary(op, left, self.parse_arith_expr()?);
        }
        Ok(left)
    }

    fn parse_arith_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            left = binary(op, left, self.parse_term()?);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::FloorDiv => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            left = binary(op, left, self.parse_factor()?);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let op = match self.current_kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        Ok(Expr::Unary {
            op,
            operand: Box::new(self.parse_factor()?),
        })
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_trailers()?;
        if self.eat(&TokenKind::Power) {
            // right associative, and the exponent may carry a sign
            Ok(binary(BinOp::Power, base, self.parse_factor()?))
        } else {
            Ok(base)
        }
    }

    fn parse_trailers(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                let args = self.parse_arglist()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args: Box::new(args),
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.parse_subscript_list()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::GetItem {
                    obj: Box::new(expr),
                    index,
                };
            } else if self.eat(&TokenKind::Dot) {
                let name = self.expect_name()?;
                expr = Expr::GetAttr {
                    obj: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_subscript_list(&mut self) -> ParseResult<ExprList> {
        let first = self.parse_subscript()?;
        if !self.eat(&TokenKind::Comma) {
            return Ok(ExprList::new(vec![first]));
        }
        let mut exprs = vec![first];
        while !self.at(&TokenKind::RBracket) {
            exprs.push(self.parse_subscript()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(ExprList::new(exprs))
    }

    fn parse_subscript(&mut self) -> ParseResult<Expr> {
        let start = if self.at(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_test()?)
        };
        if !self.eat(&TokenKind::Colon) {
            return match start {
                Some(index) => Ok(index),
                None => Err(self.unexpected("an expression")),
            };
        }
        let stop = if self.can_start_test() {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        let step = if self.eat(&TokenKind::Colon) {
            if self.can_start_test() {
                Some(Box::new(self.parse_test()?))
            } else {
                None
            }
        } else {
            None
        };
        Ok(Expr::Slice {
            start: start.map(Box::new),
            stop,
            step,
        })
    }

    /// Call arguments, including the class-definition base list. The
    /// opening parenthesis is already consumed; this eats through `)`.
    fn parse_arglist(&mut self) -> ParseResult<Arglist> {
        let mut args = Arglist::default();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            if self.eat(&TokenKind::Star) {
                if args.rest_positional.is_some() || args.rest_keyword.is_some() {
                    return Err(ParseError::InvalidArgumentList { line: self.line() });
                }
                args.rest_positional = Some(self.parse_test()?);
            } else if self.eat(&TokenKind::Power) {
                if args.rest_keyword.is_some() {
                    return Err(ParseError::InvalidArgumentList { line: self.line() });
                }
                args.rest_keyword = Some(self.parse_test()?);
            } else {
                if args.rest_keyword.is_some() {
                    return Err(ParseError::InvalidArgumentList { line: self.line() });
                }
                let keyword = match self.current_kind() {
                    TokenKind::Name(name) if matches!(self.peek_kind(), TokenKind::Assign) => {
                        Some(name.clone())
                    }
                    _ => None,
                };
                if let Some(name) = keyword {
                    self.advance();
                    self.advance();
                    args.keyword.push((name, self.parse_test()?));
                } else {
                    let value = self.parse_test()?;
                    if self.at(&TokenKind::For) && args == Arglist::default() {
                        let clauses = self.parse_comp_clauses()?;
                        args.positional.push(Expr::GeneratorCompr {
                            expr: Box::new(value),
                            clauses,
                        });
                        self.expect(TokenKind::RParen)?;
                        return Ok(args);
                    }
                    args.positional.push(value);
                }
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            if self.at(&TokenKind::RParen) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_comp_clauses(&mut self) -> ParseResult<Vec<CompClause>> {
        let mut clauses = Vec::new();
        loop {
            if self.eat(&TokenKind::For) {
                let targets = self.parse_target_list()?;
                self.expect(TokenKind::In)?;
                let source = self.parse_or_test()?;
                clauses.push(CompClause::For { targets, source });
            } else if self.eat(&TokenKind::If) {
                clauses.push(CompClause::If(self.parse_or_test()?));
            } else {
                return Ok(clauses);
            }
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let kind = self.current_kind().clone();
        match kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Lit(Literal::Int(value)))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Lit(Literal::Float(value)))
            }
            TokenKind::Str(mut value) => {
                self.advance();
                // adjacent string literals concatenate
                while let TokenKind::Str(next) = self.current_kind() {
                    value.push_str(next);
                    self.advance();
                }
                Ok(Expr::Lit(Literal::Str(value)))
            }
            TokenKind::Name(name) => {
                self.advance();
                Ok(Expr::Var(name))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::Lit(Literal::None))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Lit(Literal::Int(1)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Lit(Literal::Int(0)))
            }
            TokenKind::Ellipsis => {
                self.advance();
                Ok(Expr::Lit(Literal::Ellipsis))
            }
            TokenKind::Lambda => self.parse_lambda(),
            TokenKind::LParen => self.parse_paren_atom(),
            TokenKind::LBracket => self.parse_bracket_atom(),
            TokenKind::LBrace => self.parse_brace_atom(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_paren_atom(&mut self) -> ParseResult<Expr> {
        self.advance();
        if self.eat(&TokenKind::RParen) {
            return Ok(Expr::TupleConstr(ExprList::new(Vec::new())));
        }
        if self.eat(&TokenKind::Yield) {
            let exprs = if self.can_start_test() {
                self.parse_test_list()?
            } else {
                ExprList::single(Expr::Lit(Literal::None))
            };
            self.expect(TokenKind::RParen)?;
            return Ok(Expr::Yield(exprs));
        }
        let first = self.parse_test_or_star()?;
        if self.at(&TokenKind::For) {
            let clauses = self.parse_comp_clauses()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expr::GeneratorCompr {
                expr: Box::new(first),
                clauses,
            });
        }
        if self.eat(&TokenKind::Comma) {
            let mut exprs = vec![first];
            while self.can_start_test() {
                exprs.push(self.parse_test_or_star()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            return Ok(Expr::TupleConstr(ExprList::new(exprs)));
        }
        self.expect(TokenKind::RParen)?;
        Ok(first)
    }

    fn parse_bracket_atom(&mut self) -> ParseResult<Expr> {
        self.advance();
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::ListConstr(ExprList::new(Vec::new())));
        }
        let first = self.parse_test_or_star()?;
        if self.at(&TokenKind::For) {
            let clauses = self.parse_comp_clauses()?;
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::ListCompr {
                expr: Box::new(first),
                clauses,
            });
        }
        let mut exprs = vec![first];
        if self.eat(&TokenKind::Comma) {
            while self.can_start_test() {
                exprs.push(self.parse_test_or_star()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::ListConstr(ExprList::new(exprs)))
    }

    fn parse_brace_atom(&mut self) -> ParseResult<Expr> {
        self.advance();
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::DictConstr(ExprList::new(Vec::new())));
        }
        let first = self.parse_test()?;
        if self.eat(&TokenKind::Colon) {
            let value = self.parse_test()?;
            if self.at(&TokenKind::For) {
                let clauses = self.parse_comp_clauses()?;
                self.expect(TokenKind::RBrace)?;
                return Ok(Expr::DictCompr {
                    key: Box::new(first),
                    value: Box::new(value),
                    clauses,
                });
            }
            let mut exprs = vec![kv(first, value)];
            while self.eat(&TokenKind::Comma) {
                if !self.can_start_test() {
                    break;
                }
                let key = self.parse_test()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_test()?;
                exprs.push(kv(key, value));
            }
            self.expect(TokenKind::RBrace)?;
            return Ok(Expr::DictConstr(ExprList::new(exprs)));
        }
        if self.at(&TokenKind::For) {
            let clauses = self.parse_comp_clauses()?;
            self.expect(TokenKind::RBrace)?;
            return Ok(Expr::SetCompr {
                expr: Box::new(first),
                clauses,
            });
        }
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !self.can_start_test() {
                break;
            }
            exprs.push(self.parse_test()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::SetConstr(ExprList::new(exprs)))
    }

    // ------------------------------------------------------------------
    // Token plumbing

    fn current_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_kind(&self) -> &TokenKind {
        let next = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[next].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{kind}`")))
        }
    }

    fn expect_name(&mut self) -> ParseResult<String> {
        if let TokenKind::Name(name) = self.current_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("a name"))
        }
    }

    /// Statement terminator. A dedent or the end of input closes the
    /// line as well; those stay in the stream for the suite parser.
    fn expect_newline(&mut self) -> ParseResult<()> {
        if self.eat(&TokenKind::Newline) || self.at_line_end() {
            Ok(())
        } else {
            Err(self.unexpected("a newline"))
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::End
        )
    }

    fn can_start_test(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Name(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::None
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Ellipsis
                | TokenKind::Not
                | TokenKind::Lambda
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Tilde
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Star
        )
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current_kind().to_string(),
            line: self.line(),
        }
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn kv(key: Expr, value: Expr) -> Expr {
    Expr::KV {
        key: Box::new(key),
        value: Box::new(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn dump(source: &str) -> String {
        parse(source).expect("parse failed").to_string()
    }

    #[test]
    fn parses_assignment_and_call() {
        let source = indoc! {"
            a = 1
            print(a + 2)
        "};
        assert_eq!(
            dump(source),
            "Suite[Assign((Var(a)), (Lit(1))), \
             Expr(Call(Var(print), [Add(Var(a), Lit(2))]))]"
        );
    }

    #[test]
    fn parses_chained_assignment() {
        assert_eq!(
            dump("a = b = 1\n"),
            "Suite[Assign((Var(a)), (Var(b)), (Lit(1)))]"
        );
    }

    #[test]
    fn single_expressions_dump_in_parentheses() {
        assert_eq!(dump("a = 1\n"), "Suite[Assign((Var(a)), (Lit(1)))]");
        assert_eq!(dump("a = 1,\n"), "Suite[Assign((Var(a)), [Lit(1)])]");
        assert_eq!(dump("a, = 1\n"), "Suite[Assign([Var(a)], (Lit(1)))]");
        assert_eq!(
            dump("a, b = 1, 2\n"),
            "Suite[Assign([Var(a), Var(b)], [Lit(1), Lit(2)])]"
        );
    }

    #[test]
    fn parses_augmented_assignment() {
        assert_eq!(dump("a += 1\n"), "Suite[AddAssign(Var(a), (Lit(1)))]");
        assert_eq!(dump("a //= 2\n"), "Suite[IntDivAssign(Var(a), (Lit(2)))]");
        assert_eq!(dump("a <<= 1\n"), "Suite[LshiftAssign(Var(a), (Lit(1)))]");
        assert_eq!(dump("a += 1, 2\n"), "Suite[AddAssign(Var(a), [Lit(1), Lit(2)])]");
    }

    #[test]
    fn rejects_augmented_assignment_to_list() {
        assert_eq!(
            parse("a, b += 1\n"),
            Err(ParseError::InvalidAugmentedTarget { line: 1 })
        );
    }

    #[test]
    fn parses_arithmetic_precedence() {
        assert_eq!(
            dump("1 + 2 * 3\n"),
            "Suite[Expr(Add(Lit(1), Mul(Lit(2), Lit(3))))]"
        );
        assert_eq!(
            dump("2 ** 3 ** 2\n"),
            "Suite[Expr(Power(Lit(2), Power(Lit(3), Lit(2))))]"
        );
        assert_eq!(dump("-2 ** 2\n"), "Suite[Expr(UnaryMinus(Power(Lit(2), Lit(2))))]");
        assert_eq!(
            dump("1 | 2 ^ 3 & 4\n"),
            "Suite[Expr(BitOr(Lit(1), BitXor(Lit(2), BitAnd(Lit(3), Lit(4)))))]"
        );
    }

    #[test]
    fn folds_comparison_chain_into_one_node() {
        assert_eq!(
            dump("1 < b < 2\n"),
            "Suite[Expr(Comparison(Lit(1) < Var(b) < Lit(2)))]"
        );
        assert_eq!(
            dump("a is not b\n"),
            "Suite[Expr(Comparison(Var(a) is not Var(b)))]"
        );
        assert_eq!(
            dump("a not in b\n"),
            "Suite[Expr(Comparison(Var(a) not in Var(b)))]"
        );
    }

    #[test]
    fn parses_boolean_operators() {
        assert_eq!(
            dump("a and b or not c\n"),
            "Suite[Expr(Or(And(Var(a), Var(b)), Not(Var(c))))]"
        );
    }

    #[test]
    fn desugars_elif_into_nested_if() {
        let source = indoc! {"
            if a:
                pass
            elif b:
                pass
            else:
                pass
        "};
        assert_eq!(
            dump(source),
            "Suite[If(Var(a), Suite[Pass], \
             Suite[If(Var(b), Suite[Pass], Suite[Pass])])]"
        );
    }

    #[test]
    fn if_without_else_gets_a_pass_branch() {
        let source = indoc! {"
            if 1:
                pass
        "};
        assert_eq!(dump(source), "Suite[If(Lit(1), Suite[Pass], Suite[Pass])]");
    }

    #[test]
    fn parses_def_with_parameter_shapes() {
        let source = "def f(a, b: str, c: int = 1, *d, **e): pass\n";
        assert_eq!(
            dump(source),
            "Suite[Def(f, [a, b:Var(str), c:Var(int)=Lit(1), *d, **e], Suite[Pass])]"
        );
        assert_eq!(
            dump("def f(x: int, *z: str) -> str: pass\n"),
            "Suite[Def(f, [x:Var(int), *z:Var(str)]:Var(str), Suite[Pass])]"
        );
    }

    #[test]
    fn rejects_parameter_without_default_after_default() {
        assert_eq!(
            parse("def f(a=1, b): pass\n"),
            Err(ParseError::ParameterWithoutDefault { line: 1 })
        );
        // the rule stays in force past a *rest parameter
        assert_eq!(
            parse("def f(a=1, *b, c): pass\n"),
            Err(ParseError::ParameterWithoutDefault { line: 1 })
        );
    }

    #[test]
    fn rejects_conflicting_rest_parameters() {
        for source in [
            "def f(*a, *b): pass\n",
            "def f(**a, **b): pass\n",
            "def f(**a, *b): pass\n",
            "def f(**a, b): pass\n",
        ] {
            assert_eq!(
                parse(source),
                Err(ParseError::InvalidParameterList { line: 1 }),
                "accepted {source:?}"
            );
        }
    }

    #[test]
    fn rejects_conflicting_rest_arguments() {
        for source in [
            "f(*a, *b)\n",
            "f(**a, **b)\n",
            "f(**a, *b)\n",
            "f(**a, 1)\n",
        ] {
            assert_eq!(
                parse(source),
                Err(ParseError::InvalidArgumentList { line: 1 }),
                "accepted {source:?}"
            );
        }
    }

    #[test]
    fn parses_decorators_in_source_order() {
        let source = indoc! {"
            @a
            @b(1)
            def f(): pass
        "};
        assert_eq!(dump(source), "Suite[Def(f, [], Suite[Pass], [@a, @b[Lit(1)]])]");
    }

    #[test]
    fn parses_class_with_bases() {
        assert_eq!(
            dump("class A(B, meta=C): pass\n"),
            "Suite[Class(A, [Var(B), meta=Var(C)], Suite[Pass])]"
        );
        assert_eq!(dump("class A: pass\n"), "Suite[Class(A, [], Suite[Pass])]");
    }

    #[test]
    fn parses_loops_with_else() {
        let source = indoc! {"
            while a:
                break
            else:
                pass
            for i, j in x:
                continue
        "};
        assert_eq!(
            dump(source),
            "Suite[While(Var(a), Suite[Break], Suite[Pass]), \
             For([Var(i), Var(j)], (Var(x)), Suite[Continue])]"
        );
        assert_eq!(
            dump("for a in items: pass\n"),
            "Suite[For([Var(a)], (Var(items)), Suite[Pass])]"
        );
    }

    #[test]
    fn parses_try_except_else_finally() {
        let source = indoc! {"
            try:
                pass
            except E as e:
                pass
            except:
                pass
            else:
                pass
            finally:
                pass
        "};
        assert_eq!(
            dump(source),
            "Suite[Try(Suite[Pass], [Except(Var(E), e, Suite[Pass]), \
             Except(Suite[Pass])], Suite[Pass], Suite[Pass])]"
        );
    }

    #[test]
    fn try_dump_omits_absent_clauses() {
        assert_eq!(
            dump("try: pass\nexcept: pass\n"),
            "Suite[Try(Suite[Pass], [Except(Suite[Pass])])]"
        );
        assert_eq!(
            dump("try: pass\nfinally: pass\n"),
            "Suite[Try(Suite[Pass], [], null, Suite[Pass])]"
        );
        assert_eq!(
            dump("try: pass\nexcept: pass\nelse: pass\n"),
            "Suite[Try(Suite[Pass], [Except(Suite[Pass])], Suite[Pass])]"
        );
        assert_eq!(
            dump("try: pass\nexcept: pass\nfinally: pass\n"),
            "Suite[Try(Suite[Pass], [Except(Suite[Pass])], null, Suite[Pass])]"
        );
    }

    #[test]
    fn rejects_try_without_handler() {
        let source = indoc! {"
            try:
                pass
            pass
        "};
        assert!(matches!(
            parse(source),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn parses_import_forms() {
        assert_eq!(
            dump("import a, a.b, c as d\n"),
            "Suite[Import[a, a.b, c as d]]"
        );
        assert_eq!(
            dump("from a.b import a, a as b\n"),
            "Suite[From(a.b, [a, a as b])]"
        );
        assert_eq!(dump("from a import *\n"), "Suite[From(a, [])]");
        assert_eq!(
            dump("from a import (b, c,)\n"),
            "Suite[From(a, [b, c])]"
        );
    }

    #[test]
    fn parses_subscripts_and_slices() {
        assert_eq!(
            dump("a[0]\n"),
            "Suite[Expr(GetItem(Var(a), [Lit(0)]))]"
        );
        assert_eq!(dump("a[1:]\n"), "Suite[Expr(GetItem(Var(a), [Lit(1):]))]");
        assert_eq!(
            dump("a[1:2:3]\n"),
            "Suite[Expr(GetItem(Var(a), [Lit(1):Lit(2):Lit(3)]))]"
        );
        assert_eq!(
            dump("a[::2]\n"),
            "Suite[Expr(GetItem(Var(a), [::Lit(2)]))]"
        );
        assert_eq!(
            dump("a[1, 2]\n"),
            "Suite[Expr(GetItem(Var(a), [Lit(1), Lit(2)]))]"
        );
    }

    #[test]
    fn parses_attribute_chains() {
        assert_eq!(
            dump("a.b.c(1)\n"),
            "Suite[Expr(Call(GetAttr(GetAttr(Var(a), b), c), [Lit(1)]))]"
        );
    }

    #[test]
    fn parses_call_argument_shapes() {
        assert_eq!(
            dump("f(0, b=1 + 2, *c, **d)\n"),
            "Suite[Expr(Call(Var(f), [Lit(0), b=Add(Lit(1), Lit(2)), *Var(c), **Var(d)]))]"
        );
    }

    #[test]
    fn parses_displays_and_comprehensions() {
        assert_eq!(
            dump("[x for x in y if x]\n"),
            "Suite[Expr(ListCompr(Var(x) for [Var(x)] in Var(y) if Var(x)))]"
        );
        assert_eq!(
            dump("{k: v for k in y}\n"),
            "Suite[Expr(DictCompr(KV(Var(k), Var(v)) for [Var(k)] in Var(y)))]"
        );
        assert_eq!(
            dump("{1, 2}\n"),
            "Suite[Expr(SetConstr[Lit(1), Lit(2)])]"
        );
        assert_eq!(
            dump("{1: 2}\n"),
            "Suite[Expr(DictConstr[KV(Lit(1), Lit(2))])]"
        );
        assert_eq!(
            dump("f(x for x in y)\n"),
            "Suite[Expr(Call(Var(f), [GeneratorCompr(Var(x) for [Var(x)] in Var(y))]))]"
        );
    }

    #[test]
    fn parses_tuple_forms() {
        assert_eq!(dump("()\n"), "Suite[Expr(TupleConstr[])]");
        assert_eq!(dump("(1,)\n"), "Suite[Expr(TupleConstr[Lit(1)])]");
        assert_eq!(dump("(1)\n"), "Suite[Expr(Lit(1))]");
        assert_eq!(dump("1, 2\n"), "Suite[Expr[Lit(1), Lit(2)]]");
    }

    #[test]
    fn parses_lambda_and_conditional() {
        assert_eq!(
            dump("lambda a, b=1: a + b\n"),
            "Suite[Expr(Lambda([a, b=Lit(1)], Add(Var(a), Var(b))))]"
        );
        assert_eq!(
            dump("1 if a else 2\n"),
            "Suite[Expr(IfElse(Var(a), Lit(1), Lit(2)))]"
        );
    }

    #[test]
    fn concatenates_adjacent_string_literals() {
        assert_eq!(dump("'a' 'b' 'c'\n"), "Suite[Expr(Lit('abc'))]");
    }

    #[test]
    fn parses_semicolon_separated_statements() {
        assert_eq!(
            dump("a = 1; b = 2;\n"),
            "Suite[Assign((Var(a)), (Lit(1))), Assign((Var(b)), (Lit(2)))]"
        );
        assert_eq!(
            dump("if x: a = 1; b = 2\n"),
            "Suite[If(Var(x), Suite[Assign((Var(a)), (Lit(1))), \
             Assign((Var(b)), (Lit(2)))], Suite[Pass])]"
        );
    }

    #[test]
    fn parses_yield_statement_forms() {
        assert_eq!(dump("yield\n"), "Suite[Yield(Lit(None))]");
        assert_eq!(dump("yield 1\n"), "Suite[Yield(Lit(1))]");
        assert_eq!(dump("yield 1, 2\n"), "Suite[Yield[Lit(1), Lit(2)]]");
        assert_eq!(
            dump("a = (yield 1)\n"),
            "Suite[Assign((Var(a)), (Yield(Lit(1))))]"
        );
        assert_eq!(
            dump("a = (yield)\n"),
            "Suite[Assign((Var(a)), (Yield(Lit(None))))]"
        );
    }

    #[test]
    fn parses_return_forms() {
        let source = indoc! {"
            def f():
                return
            def g():
                return 1
            def h():
                return 1, 2
        "};
        assert_eq!(
            dump(source),
            "Suite[Def(f, [], Suite[Return(Lit(None))]), \
             Def(g, [], Suite[Return(Lit(1))]), \
             Def(h, [], Suite[Return[Lit(1), Lit(2)]])]"
        );
    }

    #[test]
    fn accepts_block_without_trailing_newline() {
        assert_eq!(
            dump("if x:\n    pass"),
            "Suite[If(Var(x), Suite[Pass], Suite[Pass])]"
        );
    }

    #[test]
    fn reports_unexpected_token_with_line() {
        let source = indoc! {"
            a = 1
            b = = 2
        "};
        assert_eq!(
            parse(source),
            Err(ParseError::UnexpectedToken {
                expected: "an expression".to_string(),
                found: "=".to_string(),
                line: 2,
            })
        );
    }

    #[test]
    fn parses_eval_input() {
        assert_eq!(parse_eval("1 + 2").expect("parse failed").to_string(), "(Add(Lit(1), Lit(2)))");
        let pair = parse_eval("1, 2").expect("parse failed");
        assert!(!pair.is_single());
        assert_eq!(pair.to_string(), "[Lit(1), Lit(2)]");
    }
}
