use std::fmt;
use std::rc::Rc;

/// An ordered sequence of statements forming one block. The tree is built
/// once per parse, owned top-down, and never mutated afterwards; loop
/// bodies and repeated calls re-walk the same nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Suite(pub Vec<Stmt>);

impl Suite {
    pub fn push(&mut self, stmt: Stmt) {
        self.0.push(stmt);
    }
}

/// A list of expressions. `single` marks a one-element list that was
/// written without a trailing comma; the dump renders that form in
/// parentheses and every other form in brackets (`return 1` vs
/// `return 1,`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExprList {
    pub exprs: Vec<Expr>,
    pub single: bool,
}

impl ExprList {
    pub fn new(exprs: Vec<Expr>) -> Self {
        Self {
            exprs,
            single: false,
        }
    }

    pub fn single(expr: Expr) -> Self {
        Self {
            exprs: vec![expr],
            single: true,
        }
    }

    pub fn is_single(&self) -> bool {
        self.single && self.exprs.len() == 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Ellipsis,
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    FloorDiv,
    Power,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
}

impl BinOp {
    pub fn dump_name(self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Sub",
            BinOp::Mul => "Mul",
            BinOp::Div => "Div",
            BinOp::Mod => "Mod",
            BinOp::FloorDiv => "IntDiv",
            BinOp::Power => "Power",
            BinOp::BitOr => "BitOr",
            BinOp::BitXor => "BitXor",
            BinOp::BitAnd => "BitAnd",
            BinOp::Shl => "BitShiftLeft",
            BinOp::Shr => "BitShiftRight",
        }
    }

    /// Operator spelling used by runtime error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::FloorDiv => "//",
            BinOp::Power => "**",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Invert,
}

impl UnaryOp {
    pub fn dump_name(self) -> &'static str {
        match self {
            UnaryOp::Plus => "UnaryPlus",
            UnaryOp::Minus => "UnaryMinus",
            UnaryOp::Invert => "BitNeg",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Invert => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompOp::Lt => "<",
            CompOp::Gt => ">",
            CompOp::Le => "<=",
            CompOp::Ge => ">=",
            CompOp::Eq => "==",
            CompOp::Ne => "!=",
            CompOp::In => "in",
            CompOp::NotIn => "not in",
            CompOp::Is => "is",
            CompOp::IsNot => "is not",
        }
    }
}

/// The augmented-assignment operator set. Dump names follow the
/// `<Op>Assign` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Power,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
}

impl AugOp {
    pub fn dump_name(self) -> &'static str {
        match self {
            AugOp::Add => "Add",
            AugOp::Sub => "Sub",
            AugOp::Mul => "Mul",
            AugOp::Div => "Div",
            AugOp::FloorDiv => "IntDiv",
            AugOp::Mod => "Mod",
            AugOp::Power => "Power",
            AugOp::Shl => "Lshift",
            AugOp::Shr => "Rshift",
            AugOp::BitAnd => "And",
            AugOp::BitXor => "Xor",
            AugOp::BitOr => "Or",
        }
    }

    pub fn bin_op(self) -> BinOp {
        match self {
            AugOp::Add => BinOp::Add,
            AugOp::Sub => BinOp::Sub,
            AugOp::Mul => BinOp::Mul,
            AugOp::Div => BinOp::Div,
            AugOp::FloorDiv => BinOp::FloorDiv,
            AugOp::Mod => BinOp::Mod,
            AugOp::Power => BinOp::Power,
            AugOp::Shl => BinOp::Shl,
            AugOp::Shr => BinOp::Shr,
            AugOp::BitAnd => BinOp::BitAnd,
            AugOp::BitXor => BinOp::BitXor,
            AugOp::BitOr => BinOp::BitOr,
        }
    }
}

/// One parameter: name plus optional type annotation and default
/// expression. Defaults are *expressions* here; the evaluator computes
/// their values once, at definition time.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

/// The parameter list of a function, method, or lambda.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    pub params: Vec<Param>,
    pub rest_positional: Option<Param>,
    pub rest_keyword: Option<Param>,
    pub return_type: Option<Expr>,
}

/// All arguments of a call or class definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arglist {
    pub positional: Vec<Expr>,
    pub keyword: Vec<(String, Expr)>,
    pub rest_positional: Option<Expr>,
    pub rest_keyword: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    pub dotted_name: Vec<String>,
    pub arglist: Option<Arglist>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DottedName {
    pub path: Vec<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameAlias {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptClause {
    pub clause: Option<Expr>,
    pub binding: Option<String>,
    pub body: Suite,
}

/// One link of the `for`/`if` clause chain shared by all comprehension
/// forms, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum CompClause {
    For { targets: ExprList, source: Expr },
    If(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Literal),
    Var(String),
    Lambda {
        params: Rc<Params>,
        body: Rc<Expr>,
    },
    IfElse {
        test: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// A chained comparison: one node holding the left operand and an
    /// ordered list of (operator, right operand) links.
    Comparison {
        left: Box<Expr>,
        comps: Vec<(CompOp, Expr)>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        // boxed: Arglist holds Exprs, so the inline form would recurse
        args: Box<Arglist>,
    },
    GetItem {
        obj: Box<Expr>,
        index: ExprList,
    },
    GetAttr {
        obj: Box<Expr>,
        name: String,
    },
    Slice {
        start: Option<Box<Expr>>,
        stop: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Star(Box<Expr>),
    TupleConstr(ExprList),
    ListConstr(ExprList),
    SetConstr(ExprList),
    /// Dict literal; every element is a `KV` pair.
    DictConstr(ExprList),
    KV {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ListCompr {
        expr: Box<Expr>,
        clauses: Vec<CompClause>,
    },
    SetCompr {
        expr: Box<Expr>,
        clauses: Vec<CompClause>,
    },
    GeneratorCompr {
        expr: Box<Expr>,
        clauses: Vec<CompClause>,
    },
    DictCompr {
        key: Box<Expr>,
        value: Box<Expr>,
        clauses: Vec<CompClause>,
    },
    Yield(ExprList),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Break,
    Continue,
    Pass,
    Del(ExprList),
    Return(ExprList),
    Raise {
        exception: Option<Expr>,
        from: Option<Expr>,
    },
    /// A yield at statement position; a bare `yield` carries `None`.
    Yield(ExprList),
    Import(Vec<DottedName>),
    /// `from module import names`; an empty name list means `*`.
    From {
        module: Vec<String>,
        names: Vec<NameAlias>,
    },
    Global(Vec<String>),
    Nonlocal(Vec<String>),
    Assert {
        test: Expr,
        message: Option<Expr>,
    },
    /// `a = b = value`: every target list before the final expression
    /// list is a target; the right-hand side is evaluated once.
    Assign {
        targets: Vec<ExprList>,
        value: ExprList,
    },
    AugAssign {
        target: Expr,
        op: AugOp,
        value: ExprList,
    },
    Expr(ExprList),
    /// An `if` always carries an else branch; the parser synthesizes a
    /// `pass` suite when the source has none.
    If {
        test: Expr,
        then: Suite,
        orelse: Suite,
    },
    While {
        test: Expr,
        body: Suite,
        orelse: Option<Suite>,
    },
    For {
        targets: ExprList,
        items: ExprList,
        body: Suite,
        orelse: Option<Suite>,
    },
    Try {
        body: Suite,
        excepts: Vec<ExceptClause>,
        orelse: Option<Suite>,
        finally: Option<Suite>,
    },
    With {
        expr: Expr,
        binding: Option<Expr>,
        body: Suite,
    },
    FuncDef {
        name: String,
        params: Rc<Params>,
        body: Rc<Suite>,
        decorators: Vec<Decorator>,
    },
    ClassDef {
        name: String,
        bases: Arglist,
        body: Suite,
        decorators: Vec<Decorator>,
    },
}

// ---------------------------------------------------------------------------
// Structural dump. The Display output below is a compatibility surface:
// drivers compare it byte-for-byte against golden strings (tests/syntax.rs).

/// Renders `Some(value)` through Display and `None` as `null`.
struct OrNull<'a, T>(Option<&'a T>);

impl<T: fmt::Display> fmt::Display for OrNull<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("null"),
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Suite[")?;
        write_joined(f, &self.0, ", ")?;
        f.write_str("]")
    }
}

impl fmt::Display for ExprList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            return write!(f, "({})", self.exprs[0]);
        }
        f.write_str("[")?;
        write_joined(f, &self.exprs, ", ")?;
        f.write_str("]")
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Ellipsis => f.write_str("Ellipsis"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value:?}"),
            Literal::Str(value) => write!(f, "'{value}'"),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(annotation) = &self.annotation {
            write!(f, ":{annotation}")?;
        }
        if let Some(default) = &self.default {
            write!(f, "={default}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        let mut first = true;
        for param in &self.params {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{param}")?;
        }
        if let Some(rest) = &self.rest_positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "*{rest}")?;
        }
        if let Some(rest) = &self.rest_keyword {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "**{rest}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Arglist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        let mut first = true;
        for arg in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{arg}")?;
        }
        for (name, value) in &self.keyword {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        if let Some(rest) = &self.rest_positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "*{rest}")?;
        }
        if let Some(rest) = &self.rest_keyword {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "**{rest}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.dotted_name.join("."))?;
        if let Some(arglist) = &self.arglist {
            write!(f, "{arglist}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DottedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join("."))?;
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        Ok(())
    }
}

impl fmt::Display for NameAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ExceptClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Except(")?;
        if let Some(clause) = &self.clause {
            write!(f, "{clause}, ")?;
            if let Some(binding) = &self.binding {
                write!(f, "{binding}, ")?;
            }
        }
        write!(f, "{})", self.body)
    }
}

impl fmt::Display for CompClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompClause::For { targets, source } => {
                write!(f, " for {targets} in {source}")
            }
            CompClause::If(cond) => write!(f, " if {cond}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(literal) => write!(f, "Lit({literal})"),
            Expr::Var(name) => write!(f, "Var({name})"),
            Expr::Lambda { params, body } => write!(f, "Lambda({params}, {body})"),
            Expr::IfElse { test, then, orelse } => {
                write!(f, "IfElse({test}, {then}, {orelse})")
            }
            Expr::Or(left, right) => write!(f, "Or({left}, {right})"),
            Expr::And(left, right) => write!(f, "And({left}, {right})"),
            Expr::Not(test) => write!(f, "Not({test})"),
            Expr::Comparison { left, comps } => {
                write!(f, "Comparison({left}")?;
                for (op, right) in comps {
                    write!(f, " {} {right}", op.symbol())?;
                }
                f.write_str(")")
            }
            Expr::Binary { op, left, right } => {
                write!(f, "{}({left}, {right})", op.dump_name())
            }
            Expr::Unary { op, operand } => write!(f, "{}({operand})", op.dump_name()),
            Expr::Call { callee, args } => write!(f, "Call({callee}, {args})"),
            Expr::GetItem { obj, index } => write!(f, "GetItem({obj}, {index})"),
            Expr::GetAttr { obj, name } => write!(f, "GetAttr({obj}, {name})"),
            Expr::Slice { start, stop, step } => {
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
            Expr::Star(expr) => write!(f, "Star({expr})"),
            Expr::TupleConstr(exprs) => write!(f, "TupleConstr{exprs}"),
            Expr::ListConstr(exprs) => write!(f, "ListConstr{exprs}"),
            Expr::SetConstr(exprs) => write!(f, "SetConstr{exprs}"),
            Expr::DictConstr(exprs) => write!(f, "DictConstr{exprs}"),
            Expr::KV { key, value } => write!(f, "KV({key}, {value})"),
            Expr::ListCompr { expr, clauses } => {
                write!(f, "ListCompr({expr}")?;
                for clause in clauses {
                    write!(f, "{clause}")?;
                }
                f.write_str(")")
            }
            Expr::SetCompr { expr, clauses } => {
                write!(f, "SetCompr({expr}")?;
                for clause in clauses {
                    write!(f, "{clause}")?;
                }
                f.write_str(")")
            }
            Expr::GeneratorCompr { expr, clauses } => {
                write!(f, "GeneratorCompr({expr}")?;
                for clause in clauses {
                    write!(f, "{clause}")?;
                }
                f.write_str(")")
            }
            Expr::DictCompr {
                key,
                value,
                clauses,
            } => {
                write!(f, "DictCompr(KV({key}, {value})")?;
                for clause in clauses {
                    write!(f, "{clause}")?;
                }
                f.write_str(")")
            }
            Expr::Yield(exprs) => write!(f, "Yield{exprs}"),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Break => f.write_str("Break"),
            Stmt::Continue => f.write_str("Continue"),
            Stmt::Pass => f.write_str("Pass"),
            Stmt::Del(exprs) => write!(f, "Del{exprs}"),
            Stmt::Return(exprs) => write!(f, "Return{exprs}"),
            Stmt::Raise { exception, from } => match (exception, from) {
                (None, _) => f.write_str("Raise()"),
                (Some(exception), None) => write!(f, "Raise({exception})"),
                (Some(exception), Some(from)) => write!(f, "Raise({exception}, {from})"),
            },
            Stmt::Yield(exprs) => write!(f, "Yield{exprs}"),
            Stmt::Import(names) => {
                f.write_str("Import[")?;
                write_joined(f, names, ", ")?;
                f.write_str("]")
            }
            Stmt::From { module, names } => {
                write!(f, "From({}, [", module.join("."))?;
                write_joined(f, names, ", ")?;
                f.write_str("])")
            }
            Stmt::Global(names) => write!(f, "Global[{}]", names.join(", ")),
            Stmt::Nonlocal(names) => write!(f, "Nonlocal[{}]", names.join(", ")),
            Stmt::Assert { test, message } => match message {
                None => write!(f, "Assert({test})"),
                Some(message) => write!(f, "Assert({test}, {message})"),
            },
            Stmt::Assign { targets, value } => {
                f.write_str("Assign(")?;
                for target in targets {
                    write!(f, "{target}, ")?;
                }
                write!(f, "{value})")
            }
            Stmt::AugAssign { target, op, value } => {
                write!(f, "{}Assign({target}, {value})", op.dump_name())
            }
            Stmt::Expr(exprs) => write!(f, "Expr{exprs}"),
            Stmt::If { test, then, orelse } => {
                write!(f, "If({test}, {then}, {orelse})")
            }
            Stmt::While { test, body, orelse } => match orelse {
                None => write!(f, "While({test}, {body})"),
                Some(orelse) => write!(f, "While({test}, {body}, {orelse})"),
            },
            Stmt::For {
                targets,
                items,
                body,
                orelse,
            } => match orelse {
                None => write!(f, "For({targets}, {items}, {body})"),
                Some(orelse) => write!(f, "For({targets}, {items}, {body}, {orelse})"),
            },
            Stmt::Try {
                body,
                excepts,
                orelse,
                finally,
            } => {
                write!(f, "Try({body}, [")?;
                write_joined(f, excepts, ", ")?;
                f.write_str("]")?;
                match (orelse, finally) {
                    (None, None) => {}
                    (Some(orelse), None) => write!(f, ", {orelse}")?,
                    (orelse, Some(finally)) => {
                        write!(f, ", {}, {finally}", OrNull(orelse.as_ref()))?;
                    }
                }
                f.write_str(")")
            }
            Stmt::With {
                expr,
                binding,
                body,
            } => match binding {
                None => write!(f, "With({expr}, {body})"),
                Some(binding) => write!(f, "With({expr}, {binding}, {body})"),
            },
            Stmt::FuncDef {
                name,
                params,
                body,
                decorators,
            } => {
                write!(f, "Def({name}, {params}")?;
                if let Some(return_type) = &params.return_type {
                    write!(f, ":{return_type}")?;
                }
                write!(f, ", {body}")?;
                if !decorators.is_empty() {
                    f.write_str(", [")?;
                    write_joined(f, decorators, ", ")?;
                    f.write_str("]")?;
                }
                f.write_str(")")
            }
            Stmt::ClassDef {
                name,
                bases,
                body,
                decorators,
            } => {
                write!(f, "Class({name}, {bases}, {body}")?;
                if !decorators.is_empty() {
                    f.write_str(", [")?;
                    write_joined(f, decorators, ", ")?;
                    f.write_str("]")?;
                }
                f.write_str(")")
            }
        }
    }
}
