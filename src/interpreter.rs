use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{
    Arglist, BinOp, CompClause, CompOp, Decorator, Expr, ExprList, Literal, Stmt, Suite, UnaryOp,
};
use crate::builtins::{self, BuiltinFunction};
use crate::runtime::{
    BoundMethod, Dict, EvalError, EvalResult, Frame, FuncBody, Function, Instance, Key, Namespace,
    TypeObject, Value,
};

/// How a statement finished. Loops absorb `Break` and `Continue`,
/// function calls absorb `Return`; anything else propagates outward
/// until a construct claims it.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking evaluator. The module namespace persists across `run`
/// and `eval` calls; printed lines collect in an output buffer that
/// `run` drains.
pub struct Interpreter {
    globals: Rc<RefCell<Namespace>>,
    output: Vec<String>,
    handling: Vec<Value>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: Rc::new(RefCell::new(Namespace::default())),
            output: Vec::new(),
            handling: Vec::new(),
        }
    }

    /// Executes a program and returns everything it printed.
    pub fn run(&mut self, suite: &Suite) -> Result<String, EvalError> {
        let mut frame = Frame::module(Rc::clone(&self.globals));
        let completion = self.exec_suite(suite, &mut frame)?;
        check_escaped(completion)?;
        Ok(std::mem::take(&mut self.output).join("\n"))
    }

    /// Evaluates an expression list against the module namespace. A
    /// single expression yields its value; a longer list yields a list.
    pub fn eval(&mut self, exprs: &ExprList) -> EvalResult<Value> {
        let mut frame = Frame::module(Rc::clone(&self.globals));
        self.eval_list_value(exprs, &mut frame)
    }

    /// Output printed so far; useful after a failed `run`.
    pub fn output(&self) -> String {
        self.output.join("\n")
    }

    // ------------------------------------------------------------------
    // Statements

    fn exec_suite(&mut self, suite: &Suite, frame: &mut Frame) -> EvalResult<Completion> {
        for stmt in &suite.0 {
            match self.exec_stmt(stmt, frame)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> EvalResult<Completion> {
        match stmt {
            Stmt::Pass => Ok(Completion::Normal),
            Stmt::Break => Ok(Completion::Break),
            Stmt::Continue => Ok(Completion::Continue),
            Stmt::Expr(exprs) => {
                self.eval_list_value(exprs, frame)?;
                Ok(Completion::Normal)
            }
            Stmt::Assign { targets, value } => {
                let value = self.eval_list_value(value, frame)?;
                for target in targets {
                    self.assign_list(target, value.clone(), frame)?;
                }
                Ok(Completion::Normal)
            }
            // the target's object and index expressions are evaluated
            // once; read and write go through the same values
            Stmt::AugAssign { target, op, value } => {
                match target {
                    Expr::Var(name) => {
                        let current = self.eval_var(name, frame)?;
                        let operand = self.eval_list_value(value, frame)?;
                        let result = self.binary_op(op.bin_op(), &current, &operand)?;
                        frame.assign(name, result);
                    }
                    Expr::GetItem { obj, index } => {
                        let obj = self.eval_expr(obj, frame)?;
                        let index = self.eval_index(index, frame)?;
                        let current = obj.get_item(&index)?;
                        let operand = self.eval_list_value(value, frame)?;
                        let result = self.binary_op(op.bin_op(), &current, &operand)?;
                        obj.set_item(&index, result)?;
                    }
                    Expr::GetAttr { obj, name } => {
                        let obj = self.eval_expr(obj, frame)?;
                        let current = get_attr(&obj, name)?;
                        let operand = self.eval_list_value(value, frame)?;
                        let result = self.binary_op(op.bin_op(), &current, &operand)?;
                        set_attr(&obj, name, result)?;
                    }
                    _ => {
                        return Err(EvalError::type_mismatch(
                            "cannot assign to this expression".to_string(),
                        ));
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Del(targets) => {
                for target in &targets.exprs {
                    match target {
                        Expr::Var(name) => frame.delete(name)?,
                        _ => {
                            return Err(EvalError::Unsupported {
                                operation: "deleting items or attributes",
                            });
                        }
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Return(exprs) => {
                let value = self.eval_list_value(exprs, frame)?;
                Ok(Completion::Return(value))
            }
            Stmt::Raise { exception, from } => {
                if let Some(from) = from {
                    // evaluated for effect; exception chaining is dropped
                    self.eval_expr(from, frame)?;
                }
                let value = match exception {
                    Some(expr) => self.eval_expr(expr, frame)?,
                    None => match self.handling.last() {
                        Some(value) => value.clone(),
                        None => {
                            return Err(EvalError::Unsupported {
                                operation: "re-raising outside an except block",
                            });
                        }
                    },
                };
                Err(EvalError::Raised { value })
            }
            Stmt::Assert { test, message } => {
                if self.eval_expr(test, frame)?.truth() {
                    return Ok(Completion::Normal);
                }
                let message = match message {
                    Some(message) => self.eval_expr(message, frame)?.display(),
                    None => "assertion failed".to_string(),
                };
                Err(EvalError::AssertionFailed { message })
            }
            Stmt::Global(names) => {
                for name in names {
                    frame.declare_global(name);
                }
                Ok(Completion::Normal)
            }
            // scoping is flat, there is no enclosing function scope for
            // nonlocal to reach; the declaration is accepted and ignored
            Stmt::Nonlocal(_) => Ok(Completion::Normal),
            // scripts are single-module; imports parse but bind nothing
            Stmt::Import(_) | Stmt::From { .. } => Ok(Completion::Normal),
            Stmt::Yield(_) => Err(EvalError::Unsupported {
                operation: "generators",
            }),
            Stmt::If { test, then, orelse } => {
                if self.eval_expr(test, frame)?.truth() {
                    self.exec_suite(then, frame)
                } else {
                    self.exec_suite(orelse, frame)
                }
            }
            Stmt::While { test, body, orelse } => {
                let mut broke = false;
                while self.eval_expr(test, frame)?.truth() {
                    match self.exec_suite(body, frame)? {
                        Completion::Normal | Completion::Continue => {}
                        Completion::Break => {
                            broke = true;
                            break;
                        }
                        escape @ Completion::Return(_) => return Ok(escape),
                    }
                }
                if !broke {
                    if let Some(orelse) = orelse {
                        return self.exec_suite(orelse, frame);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::For {
                targets,
                items,
                body,
                orelse,
            } => {
                let source = self.eval_list_value(items, frame)?;
                let mut broke = false;
                for item in source.iterate()? {
                    self.bind_targets(targets, item, frame)?;
                    match self.exec_suite(body, frame)? {
                        Completion::Normal | Completion::Continue => {}
                        Completion::Break => {
                            broke = true;
                            break;
                        }
                        escape @ Completion::Return(_) => return Ok(escape),
                    }
                }
                if !broke {
                    if let Some(orelse) = orelse {
                        return self.exec_suite(orelse, frame);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Try {
                body,
                excepts,
                orelse,
                finally,
            } => {
                let outcome = self.exec_try(body, excepts, orelse.as_ref(), frame);
                if let Some(finally) = finally {
                    let cleanup = self.exec_suite(finally, frame)?;
                    if !matches!(cleanup, Completion::Normal) {
                        return Ok(cleanup);
                    }
                }
                outcome
            }
            Stmt::With {
                expr,
                binding,
                body,
            } => {
                // no enter/exit protocol; the context value is produced
                // and optionally bound, then the body runs
                let value = self.eval_expr(expr, frame)?;
                if let Some(binding) = binding {
                    self.assign_target(binding, value, frame)?;
                }
                self.exec_suite(body, frame)
            }
            Stmt::FuncDef {
                name,
                params,
                body,
                decorators,
            } => {
                let function = self.make_function(
                    name.clone(),
                    Rc::clone(params),
                    FuncBody::Suite(Rc::clone(body)),
                    frame,
                )?;
                let value = self.apply_decorators(decorators, Value::Func(function), frame)?;
                frame.assign(name, value);
                Ok(Completion::Normal)
            }
            Stmt::ClassDef {
                name,
                bases,
                body,
                decorators,
            } => {
                let value = self.exec_class_def(name, bases, body, frame)?;
                let value = self.apply_decorators(decorators, value, frame)?;
                frame.assign(name, value);
                Ok(Completion::Normal)
            }
        }
    }

    fn exec_try(
        &mut self,
        body: &Suite,
        excepts: &[crate::ast::ExceptClause],
        orelse: Option<&Suite>,
        frame: &mut Frame,
    ) -> EvalResult<Completion> {
        let error = match self.exec_suite(body, frame) {
            Ok(Completion::Normal) => {
                return match orelse {
                    Some(orelse) => self.exec_suite(orelse, frame),
                    None => Ok(Completion::Normal),
                };
            }
            Ok(other) => return Ok(other),
            Err(error) => error,
        };
        for handler in excepts {
            if self.except_matches(handler.clause.as_ref(), &error, frame)? {
                let value = exception_value(&error);
                if let Some(binding) = &handler.binding {
                    frame.assign(binding, value.clone());
                }
                self.handling.push(value);
                let result = self.exec_suite(&handler.body, frame);
                self.handling.pop();
                return result;
            }
        }
        Err(error)
    }

    fn except_matches(
        &mut self,
        clause: Option<&Expr>,
        error: &EvalError,
        frame: &mut Frame,
    ) -> EvalResult<bool> {
        let Some(clause) = clause else {
            return Ok(true);
        };
        let matcher = self.eval_expr(clause, frame)?;
        matches_exception(&matcher, error)
    }

    fn exec_class_def(
        &mut self,
        name: &str,
        bases: &Arglist,
        body: &Suite,
        frame: &mut Frame,
    ) -> EvalResult<Value> {
        if !bases.keyword.is_empty() || bases.rest_keyword.is_some() {
            return Err(EvalError::Unsupported {
                operation: "class keyword arguments",
            });
        }
        let mut base_types = Vec::new();
        for base in &bases.positional {
            match self.eval_expr(base, frame)? {
                Value::Type(class) => base_types.push(class),
                other => {
                    return Err(EvalError::type_mismatch(format!(
                        "class base must be a type, not '{}'",
                        other.type_name()
                    )));
                }
            }
        }
        let mut class_frame = Frame::call(Namespace::default(), frame.globals());
        match self.exec_suite(body, &mut class_frame)? {
            Completion::Normal => {}
            _ => {
                return Err(EvalError::Unsupported {
                    operation: "control flow in a class body",
                });
            }
        }
        let attributes = class_frame.locals().borrow().clone();
        Ok(Value::Type(Rc::new(TypeObject {
            name: name.to_string(),
            bases: base_types,
            attributes: RefCell::new(attributes),
        })))
    }

    fn make_function(
        &mut self,
        name: String,
        params: Rc<crate::ast::Params>,
        body: FuncBody,
        frame: &mut Frame,
    ) -> EvalResult<Rc<Function>> {
        // default expressions are evaluated here, once, at definition
        // time; every call sees the same values
        let mut defaults = Vec::with_capacity(params.params.len());
        for param in &params.params {
            let default = match &param.default {
                Some(expr) => Some(self.eval_expr(expr, frame)?),
                None => None,
            };
            defaults.push(default);
        }
        Ok(Rc::new(Function {
            name,
            params,
            body,
            defaults,
            globals: frame.globals(),
        }))
    }

    /// Decorators apply innermost first: the one written closest to the
    /// definition receives the raw function.
    fn apply_decorators(
        &mut self,
        decorators: &[Decorator],
        value: Value,
        frame: &mut Frame,
    ) -> EvalResult<Value> {
        let mut decorated = value;
        for decorator in decorators.iter().rev() {
            let mut target = self.eval_var(&decorator.dotted_name[0], frame)?;
            for segment in &decorator.dotted_name[1..] {
                target = get_attr(&target, segment)?;
            }
            if let Some(arglist) = &decorator.arglist {
                let (positional, keywords) = self.eval_arglist(arglist, frame)?;
                target = self.call_value(target, positional, keywords)?;
            }
            decorated = self.call_value(target, vec![decorated], Vec::new())?;
        }
        Ok(decorated)
    }

    // ------------------------------------------------------------------
    // Assignment targets

    fn assign_list(&mut self, targets: &ExprList, value: Value, frame: &mut Frame) -> EvalResult<()> {
        if targets.is_single() {
            return self.assign_target(&targets.exprs[0], value, frame);
        }
        self.assign_unpack(&targets.exprs, value, frame)
    }

    /// Binds a `for`-loop or comprehension target list to one item. The
    /// grammar never marks these lists as single, so a lone target takes
    /// the item itself; anything longer unpacks it.
    fn bind_targets(&mut self, targets: &ExprList, value: Value, frame: &mut Frame) -> EvalResult<()> {
        match targets.exprs.as_slice() {
            [target] if !matches!(target, Expr::Star(_)) => {
                self.assign_target(target, value, frame)
            }
            _ => self.assign_unpack(&targets.exprs, value, frame),
        }
    }

    fn assign_unpack(&mut self, targets: &[Expr], value: Value, frame: &mut Frame) -> EvalResult<()> {
        let values = value.iterate()?;
        let star = targets
            .iter()
            .position(|target| matches!(target, Expr::Star(_)));
        match star {
            None => {
                if values.len() != targets.len() {
                    return Err(unpack_error(targets.len(), values.len()));
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign_target(target, value, frame)?;
                }
                Ok(())
            }
            Some(position) => {
                let after = targets.len() - position - 1;
                if values.len() < position + after {
                    return Err(unpack_error(position + after, values.len()));
                }
                let mut values = values;
                let tail: Vec<Value> = values.split_off(values.len() - after);
                let middle: Vec<Value> = values.split_off(position);
                for (target, value) in targets[..position].iter().zip(values) {
                    self.assign_target(target, value, frame)?;
                }
                if let Expr::Star(inner) = &targets[position] {
                    self.assign_target(inner, Value::list(middle), frame)?;
                }
                for (target, value) in targets[position + 1..].iter().zip(tail) {
                    self.assign_target(target, value, frame)?;
                }
                Ok(())
            }
        }
    }

    fn assign_target(&mut self, target: &Expr, value: Value, frame: &mut Frame) -> EvalResult<()> {
        match target {
            Expr::Var(name) => {
                frame.assign(name, value);
                Ok(())
            }
            Expr::GetItem { obj, index } => {
                let obj = self.eval_expr(obj, frame)?;
                let index = self.eval_index(index, frame)?;
                obj.set_item(&index, value)
            }
            Expr::GetAttr { obj, name } => {
                let obj = self.eval_expr(obj, frame)?;
                set_attr(&obj, name, value)
            }
            Expr::TupleConstr(targets) | Expr::ListConstr(targets) => {
                self.assign_unpack(&targets.exprs, value, frame)
            }
            _ => Err(EvalError::type_mismatch(
                "cannot assign to this expression".to_string(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Expressions

    fn eval_expr(&mut self, expr: &Expr, frame: &mut Frame) -> EvalResult<Value> {
        match expr {
            Expr::Lit(literal) => Ok(eval_literal(literal)),
            Expr::Var(name) => self.eval_var(name, frame),
            Expr::Lambda { params, body } => {
                let function = self.make_function(
                    "<lambda>".to_string(),
                    Rc::clone(params),
                    FuncBody::Expr(Rc::clone(body)),
                    frame,
                )?;
                Ok(Value::Func(function))
            }
            Expr::IfElse { test, then, orelse } => {
                if self.eval_expr(test, frame)?.truth() {
                    self.eval_expr(then, frame)
                } else {
                    self.eval_expr(orelse, frame)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval_expr(left, frame)?;
                if left.truth() {
                    Ok(left)
                } else {
                    self.eval_expr(right, frame)
                }
            }
            Expr::And(left, right) => {
                let left = self.eval_expr(left, frame)?;
                if left.truth() {
                    self.eval_expr(right, frame)
                } else {
                    Ok(left)
                }
            }
            Expr::Not(test) => {
                let truth = self.eval_expr(test, frame)?.truth();
                Ok(Value::int((!truth) as i64))
            }
            Expr::Comparison { left, comps } => {
                let mut left = self.eval_expr(left, frame)?;
                for (op, right_expr) in comps {
                    let right = self.eval_expr(right_expr, frame)?;
                    if !compare_values(*op, &left, &right)? {
                        return Ok(Value::int(0));
                    }
                    left = right;
                }
                Ok(Value::int(1))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left, frame)?;
                let right = self.eval_expr(right, frame)?;
                self.binary_op(*op, &left, &right)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand, frame)?;
                match op {
                    UnaryOp::Plus => operand.pos(),
                    UnaryOp::Minus => operand.neg(),
                    UnaryOp::Invert => operand.invert(),
                }
            }
            Expr::Call { callee, args } => {
                let callee = self.eval_expr(callee, frame)?;
                let (positional, keywords) = self.eval_arglist(args, frame)?;
                self.call_value(callee, positional, keywords)
            }
            Expr::GetItem { obj, index } => {
                let obj = self.eval_expr(obj, frame)?;
                let index = self.eval_index(index, frame)?;
                obj.get_item(&index)
            }
            Expr::GetAttr { obj, name } => {
                let obj = self.eval_expr(obj, frame)?;
                get_attr(&obj, name)
            }
            Expr::Slice { .. } => Err(EvalError::Unsupported {
                operation: "slicing",
            }),
            Expr::Star(_) => Err(EvalError::type_mismatch(
                "starred expression outside of assignment or call".to_string(),
            )),
            Expr::TupleConstr(exprs) | Expr::ListConstr(exprs) => {
                Ok(Value::list(self.eval_elements(exprs, frame)?))
            }
            Expr::DictConstr(exprs) => {
                let mut dict = Dict::default();
                for entry in &exprs.exprs {
                    let Expr::KV { key, value } = entry else {
                        return Err(EvalError::Unsupported {
                            operation: "dictionary unpacking",
                        });
                    };
                    let key = self.eval_expr(key, frame)?.to_key()?;
                    let value = self.eval_expr(value, frame)?;
                    dict.insert(key, value);
                }
                Ok(Value::Dict(Rc::new(RefCell::new(dict))))
            }
            Expr::KV { .. } => Err(EvalError::Unsupported {
                operation: "key-value pairs outside dictionaries",
            }),
            Expr::ListCompr { expr, clauses } => {
                let mut items = Vec::new();
                self.eval_comp_clauses(clauses, frame, &mut |interp, frame| {
                    items.push(interp.eval_expr(expr, frame)?);
                    Ok(())
                })?;
                Ok(Value::list(items))
            }
            Expr::DictCompr {
                key,
                value,
                clauses,
            } => {
                let dict = Rc::new(RefCell::new(Dict::default()));
                let sink = Rc::clone(&dict);
                self.eval_comp_clauses(clauses, frame, &mut |interp, frame| {
                    let entry_key = interp.eval_expr(key, frame)?.to_key()?;
                    let entry_value = interp.eval_expr(value, frame)?;
                    sink.borrow_mut().insert(entry_key, entry_value);
                    Ok(())
                })?;
                Ok(Value::Dict(dict))
            }
            Expr::SetConstr(_) | Expr::SetCompr { .. } => Err(EvalError::Unsupported {
                operation: "set values",
            }),
            Expr::GeneratorCompr { .. } | Expr::Yield(_) => Err(EvalError::Unsupported {
                operation: "generators",
            }),
        }
    }

    fn eval_var(&mut self, name: &str, frame: &Frame) -> EvalResult<Value> {
        if let Some(value) = frame.lookup(name) {
            return Ok(value);
        }
        builtins::lookup(name).ok_or_else(|| EvalError::NameNotFound {
            name: name.to_string(),
        })
    }

    /// The value form of an expression list: a lone expression is
    /// itself, anything else collects into a list.
    fn eval_list_value(&mut self, exprs: &ExprList, frame: &mut Frame) -> EvalResult<Value> {
        if exprs.is_single() && !matches!(exprs.exprs[0], Expr::Star(_)) {
            self.eval_expr(&exprs.exprs[0], frame)
        } else {
            Ok(Value::list(self.eval_elements(exprs, frame)?))
        }
    }

    fn eval_elements(&mut self, exprs: &ExprList, frame: &mut Frame) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.exprs.len());
        for expr in &exprs.exprs {
            match expr {
                Expr::Star(inner) => {
                    values.extend(self.eval_expr(inner, frame)?.iterate()?);
                }
                _ => values.push(self.eval_expr(expr, frame)?),
            }
        }
        Ok(values)
    }

    /// Subscript lists never carry the single marker, so a lone index
    /// expression is the key itself; a longer list keys by tuple.
    fn eval_index(&mut self, index: &ExprList, frame: &mut Frame) -> EvalResult<Value> {
        if index
            .exprs
            .iter()
            .any(|expr| matches!(expr, Expr::Slice { .. }))
        {
            return Err(EvalError::Unsupported {
                operation: "slicing",
            });
        }
        match index.exprs.as_slice() {
            [expr] if !matches!(expr, Expr::Star(_)) => self.eval_expr(expr, frame),
            _ => Ok(Value::list(self.eval_elements(index, frame)?)),
        }
    }

    fn eval_comp_clauses(
        &mut self,
        clauses: &[CompClause],
        frame: &mut Frame,
        emit: &mut dyn FnMut(&mut Self, &mut Frame) -> EvalResult<()>,
    ) -> EvalResult<()> {
        match clauses.split_first() {
            None => emit(self, frame),
            Some((CompClause::For { targets, source }, rest)) => {
                let items = self.eval_expr(source, frame)?.iterate()?;
                for item in items {
                    self.bind_targets(targets, item, frame)?;
                    self.eval_comp_clauses(rest, frame, emit)?;
                }
                Ok(())
            }
            Some((CompClause::If(cond), rest)) => {
                if self.eval_expr(cond, frame)?.truth() {
                    self.eval_comp_clauses(rest, frame, emit)?;
                }
                Ok(())
            }
        }
    }

    fn binary_op(&self, op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
        match op {
            BinOp::Add => left.add(right),
            BinOp::Sub => left.sub(right),
            BinOp::Mul => left.mul(right),
            BinOp::Div => left.true_div(right),
            BinOp::Mod => left.rem(right),
            BinOp::FloorDiv => left.floor_div(right),
            BinOp::Power => left.power(right),
            BinOp::BitOr => left.bit_or(right),
            BinOp::BitXor => left.bit_xor(right),
            BinOp::BitAnd => left.bit_and(right),
            BinOp::Shl => left.shl(right),
            BinOp::Shr => left.shr(right),
        }
    }

    // ------------------------------------------------------------------
    // Calls

    fn eval_arglist(
        &mut self,
        args: &Arglist,
        frame: &mut Frame,
    ) -> EvalResult<(Vec<Value>, Vec<(String, Value)>)> {
        let mut positional = Vec::with_capacity(args.positional.len());
        for arg in &args.positional {
            positional.push(self.eval_expr(arg, frame)?);
        }
        if let Some(rest) = &args.rest_positional {
            positional.extend(self.eval_expr(rest, frame)?.iterate()?);
        }
        let mut keywords = Vec::with_capacity(args.keyword.len());
        for (name, arg) in &args.keyword {
            keywords.push((name.clone(), self.eval_expr(arg, frame)?));
        }
        if let Some(rest) = &args.rest_keyword {
            match self.eval_expr(rest, frame)? {
                Value::Dict(entries) => {
                    for (key, value) in entries.borrow().entries() {
                        let Key::Str(name) = key else {
                            return Err(EvalError::type_mismatch(
                                "keywords must be strings".to_string(),
                            ));
                        };
                        keywords.push((name.to_string(), value.clone()));
                    }
                }
                other => {
                    return Err(EvalError::type_mismatch(format!(
                        "argument after ** must be a mapping, not {}",
                        other.type_name()
                    )));
                }
            }
        }
        Ok((positional, keywords))
    }

    fn call_value(
        &mut self,
        callee: Value,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        match callee {
            Value::Func(function) => self.call_function(&function, positional, keywords),
            Value::Method(method) => {
                let mut args = Vec::with_capacity(positional.len() + 1);
                args.push(method.receiver.clone());
                args.extend(positional);
                self.call_function(&method.function, args, keywords)
            }
            Value::Builtin(function) => self.call_builtin(function, positional, keywords),
            Value::Type(class) => self.instantiate(class, positional, keywords),
            other => Err(EvalError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        let locals = bind_arguments(function, positional, keywords)?;
        let mut frame = Frame::call(locals, Rc::clone(&function.globals));
        match &function.body {
            FuncBody::Suite(suite) => match self.exec_suite(suite, &mut frame)? {
                Completion::Return(value) => Ok(value),
                Completion::Normal => Ok(Value::None),
                Completion::Break | Completion::Continue => Err(EvalError::Unsupported {
                    operation: "'break' or 'continue' outside a loop",
                }),
            },
            FuncBody::Expr(expr) => self.eval_expr(expr, &mut frame),
        }
    }

    fn call_builtin(
        &mut self,
        function: BuiltinFunction,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        if !keywords.is_empty() {
            return Err(EvalError::type_mismatch(format!(
                "{}() takes no keyword arguments",
                function.name()
            )));
        }
        match function {
            BuiltinFunction::Print => {
                let line: Vec<String> = positional.iter().map(Value::display).collect();
                self.output.push(line.join(" "));
                Ok(Value::None)
            }
            BuiltinFunction::Len => {
                expect_arity(function, &positional, 1)?;
                positional[0].length().map(Value::int)
            }
            BuiltinFunction::Repr => {
                expect_arity(function, &positional, 1)?;
                Ok(Value::str(positional[0].repr()))
            }
            BuiltinFunction::Range => {
                let mut bounds = Vec::with_capacity(positional.len());
                for arg in &positional {
                    match arg {
                        Value::Int(value) => bounds.push(**value),
                        other => {
                            return Err(EvalError::type_mismatch(format!(
                                "'{}' object cannot be interpreted as an integer",
                                other.type_name()
                            )));
                        }
                    }
                }
                let (start, stop, step) = match bounds.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => {
                        return Err(EvalError::type_mismatch(format!(
                            "range expected 1 to 3 arguments, got {}",
                            positional.len()
                        )));
                    }
                };
                if step == 0 {
                    return Err(EvalError::ValueMismatch {
                        message: "range() arg 3 must not be zero".to_string(),
                    });
                }
                let mut items = Vec::new();
                let mut current = start;
                while (step > 0 && current < stop) || (step < 0 && current > stop) {
                    items.push(Value::int(current));
                    current += step;
                }
                Ok(Value::list(items))
            }
        }
    }

    fn instantiate(
        &mut self,
        class: Rc<TypeObject>,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        let instance = Rc::new(Instance {
            class: Rc::clone(&class),
            attributes: RefCell::new(Namespace::default()),
        });
        match class.lookup("__init__") {
            Some(Value::Func(init)) => {
                let mut args = Vec::with_capacity(positional.len() + 1);
                args.push(Value::Instance(Rc::clone(&instance)));
                args.extend(positional);
                self.call_function(&init, args, keywords)?;
            }
            _ => {
                if !keywords.is_empty() {
                    return Err(EvalError::type_mismatch(format!(
                        "{}() takes no keyword arguments",
                        class.name
                    )));
                }
                if !positional.is_empty() {
                    instance
                        .attributes
                        .borrow_mut()
                        .insert("args".to_string(), Value::list(positional));
                }
            }
        }
        Ok(Value::Instance(instance))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::None => Value::None,
        Literal::Ellipsis => Value::Ellipsis,
        Literal::Int(value) => Value::int(*value),
        Literal::Float(value) => Value::Float(*value),
        Literal::Str(value) => Value::str(value.as_str()),
    }
}

fn compare_values(op: CompOp, left: &Value, right: &Value) -> EvalResult<bool> {
    use std::cmp::Ordering;
    match op {
        CompOp::Eq => Ok(left.eq_value(right)),
        CompOp::Ne => Ok(!left.eq_value(right)),
        CompOp::Is => Ok(left.is_identical(right)),
        CompOp::IsNot => Ok(!left.is_identical(right)),
        CompOp::In => right.contains(left),
        CompOp::NotIn => Ok(!right.contains(left)?),
        CompOp::Lt | CompOp::Le | CompOp::Gt | CompOp::Ge => {
            let Some(ordering) = left.compare(right, op.symbol())? else {
                return Ok(false);
            };
            Ok(match op {
                CompOp::Lt => ordering == Ordering::Less,
                CompOp::Le => ordering != Ordering::Greater,
                CompOp::Gt => ordering == Ordering::Greater,
                CompOp::Ge => ordering != Ordering::Less,
                _ => unreachable!(),
            })
        }
    }
}

fn matches_exception(matcher: &Value, error: &EvalError) -> EvalResult<bool> {
    match matcher {
        Value::Type(class) => Ok(error_matches_class(error, class)),
        // a parenthesized clause evaluates to a list of types
        Value::List(items) => {
            for item in items.borrow().iter() {
                if matches_exception(item, error)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(EvalError::type_mismatch(
            "catching classes that do not inherit from Exception is not allowed".to_string(),
        )),
    }
}

fn error_matches_class(error: &EvalError, class: &TypeObject) -> bool {
    match error {
        EvalError::Raised { value } => match value {
            Value::Instance(instance) => instance.class.is_subtype_of(class),
            Value::Type(raised) => raised.is_subtype_of(class),
            _ => class.name == "Exception",
        },
        _ => class.name == "Exception" || class.name == error.exception_type(),
    }
}

/// The value an `except ... as name` binding receives. Script-raised
/// values pass through; built-in failures bind their message text.
fn exception_value(error: &EvalError) -> Value {
    match error {
        EvalError::Raised { value } => value.clone(),
        _ => Value::str(error.to_string()),
    }
}

fn get_attr(obj: &Value, name: &str) -> EvalResult<Value> {
    match obj {
        Value::Instance(instance) => {
            if let Some(value) = instance.attributes.borrow().get(name) {
                return Ok(value.clone());
            }
            match instance.class.lookup(name) {
                Some(Value::Func(function)) => Ok(Value::Method(Rc::new(BoundMethod {
                    receiver: obj.clone(),
                    function,
                }))),
                Some(value) => Ok(value),
                None => Err(attribute_error(&instance.class.name, name)),
            }
        }
        Value::Type(class) => class
            .lookup(name)
            .ok_or_else(|| attribute_error(&class.name, name)),
        _ => Err(attribute_error(&obj.type_name(), name)),
    }
}

fn set_attr(obj: &Value, name: &str, value: Value) -> EvalResult<()> {
    match obj {
        Value::Instance(instance) => {
            instance
                .attributes
                .borrow_mut()
                .insert(name.to_string(), value);
            Ok(())
        }
        Value::Type(class) => {
            class.attributes.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        _ => Err(EvalError::type_mismatch(format!(
            "cannot set attributes of '{}' object",
            obj.type_name()
        ))),
    }
}

fn attribute_error(type_name: &str, attribute: &str) -> EvalError {
    EvalError::AttributeNotFound {
        type_name: type_name.to_string(),
        attribute: attribute.to_string(),
    }
}

fn bind_arguments(
    function: &Rc<Function>,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
) -> EvalResult<Namespace> {
    let params = &function.params;
    let mut locals = Namespace::default();
    let mut remaining = keywords;
    let mut positional = positional.into_iter();
    for (index, param) in params.params.iter().enumerate() {
        if let Some(value) = positional.next() {
            if remaining.iter().any(|(name, _)| name == &param.name) {
                return Err(EvalError::type_mismatch(format!(
                    "{}() got multiple values for argument '{}'",
                    function.name, param.name
                )));
            }
            locals.insert(param.name.clone(), value);
            continue;
        }
        if let Some(position) = remaining.iter().position(|(name, _)| name == &param.name) {
            let (_, value) = remaining.remove(position);
            locals.insert(param.name.clone(), value);
            continue;
        }
        if let Some(Some(default)) = function.defaults.get(index) {
            locals.insert(param.name.clone(), default.clone());
            continue;
        }
        return Err(EvalError::type_mismatch(format!(
            "{}() missing required argument: '{}'",
            function.name, param.name
        )));
    }
    let extra: Vec<Value> = positional.collect();
    match &params.rest_positional {
        Some(rest) => {
            locals.insert(rest.name.clone(), Value::list(extra));
        }
        None if !extra.is_empty() => {
            return Err(EvalError::type_mismatch(format!(
                "{}() takes {} positional arguments but {} were given",
                function.name,
                params.params.len(),
                params.params.len() + extra.len()
            )));
        }
        None => {}
    }
    match &params.rest_keyword {
        Some(rest) => {
            let mut dict = Dict::default();
            for (name, value) in remaining {
                dict.insert(Key::Str(Rc::from(name.as_str())), value);
            }
            locals.insert(rest.name.clone(), Value::Dict(Rc::new(RefCell::new(dict))));
        }
        None => {
            if let Some((name, _)) = remaining.first() {
                return Err(EvalError::type_mismatch(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    function.name, name
                )));
            }
        }
    }
    Ok(locals)
}

fn expect_arity(function: BuiltinFunction, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::type_mismatch(format!(
            "{}() takes exactly {} argument ({} given)",
            function.name(),
            expected,
            args.len()
        )))
    }
}

fn unpack_error(expected: usize, got: usize) -> EvalError {
    if got < expected {
        EvalError::ValueMismatch {
            message: format!("not enough values to unpack (expected {expected}, got {got})"),
        }
    } else {
        EvalError::ValueMismatch {
            message: format!("too many values to unpack (expected {expected})"),
        }
    }
}

fn check_escaped(completion: Completion) -> EvalResult<()> {
    match completion {
        Completion::Normal => Ok(()),
        Completion::Break | Completion::Continue => Err(EvalError::Unsupported {
            operation: "'break' or 'continue' outside a loop",
        }),
        Completion::Return(_) => Err(EvalError::Unsupported {
            operation: "'return' outside a function",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use indoc::indoc;

    fn run(source: &str) -> String {
        let suite = parser::parse(source).expect("parse failed");
        Interpreter::new().run(&suite).expect("run failed")
    }

    fn run_err(source: &str) -> EvalError {
        let suite = parser::parse(source).expect("parse failed");
        Interpreter::new().run(&suite).expect_err("run succeeded")
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(run("print(3 + 4)\n"), "7");
        assert_eq!(run("print(7 // 2, 7 % 2, -7 // 2)\n"), "3 1 -4");
        assert_eq!(run("print(3 / 2)\n"), "1.5");
        assert_eq!(run("print(2 ** 10)\n"), "1024");
    }

    #[test]
    fn defaults_are_evaluated_at_definition_time() {
        let source = indoc! {"
            x = 1
            def f(a=x):
                return a
            x = 2
            print(f())
        "};
        assert_eq!(run(source), "1");
    }

    #[test]
    fn mutable_default_is_shared_between_calls() {
        let source = indoc! {"
            def f(xs=[0]):
                xs[0] = xs[0] + 1
                return xs[0]
            print(f())
            print(f())
        "};
        assert_eq!(run(source), "1\n2");
    }

    #[test]
    fn for_else_runs_unless_broken() {
        let source = indoc! {"
            for i in range(5):
                if i == 3:
                    break
            else:
                print('completed')
            print(i)
        "};
        assert_eq!(run(source), "3");

        let source = indoc! {"
            for i in range(3):
                pass
            else:
                print('completed')
        "};
        assert_eq!(run(source), "completed");
    }

    #[test]
    fn while_loop_with_continue() {
        let source = indoc! {"
            total = 0
            n = 0
            while n < 10:
                n = n + 1
                if n % 2 == 0:
                    continue
                total = total + n
            print(total)
        "};
        assert_eq!(run(source), "25");
    }

    #[test]
    fn chained_comparison_short_circuits() {
        assert_eq!(run("print(1 < 2 < 3)\n"), "1");
        assert_eq!(run("print(1 < 2 > 5)\n"), "0");
        let source = indoc! {"
            def boom():
                assert 0
            print(2 < 1 < boom())
        "};
        assert_eq!(run(source), "0");
    }

    #[test]
    fn boolean_operators_return_operands() {
        assert_eq!(run("print(0 or 'x')\n"), "x");
        assert_eq!(run("print('' and 'x')\n"), "");
        let source = indoc! {"
            def boom():
                assert 0
            print(0 and boom())
        "};
        assert_eq!(run(source), "0");
    }

    #[test]
    fn decorators_apply_nearest_first() {
        let source = indoc! {"
            order = []
            def a(f):
                order[0] = order[0] + 'a'
                return f
            def b(f):
                order[0] = order[0] + 'b'
                return f
            order = ['']
            @a
            @b
            def f():
                pass
            print(order[0])
        "};
        assert_eq!(run(source), "ba");
    }

    #[test]
    fn except_matches_by_type() {
        let source = indoc! {"
            try:
                x = 1 // 0
            except TypeError:
                print('type')
            except ZeroDivisionError as e:
                print('zero:', e)
        "};
        assert_eq!(run(source), "zero: integer division or modulo by zero");
    }

    #[test]
    fn unmatched_exception_propagates() {
        let source = indoc! {"
            try:
                x = 1 // 0
            except TypeError:
                print('type')
        "};
        let error = run_err(source);
        assert_eq!(error.exception_type(), "ZeroDivisionError");
    }

    #[test]
    fn finally_runs_on_the_way_out() {
        let source = indoc! {"
            def f():
                try:
                    return 1
                finally:
                    print('cleanup')
            print(f())
        "};
        assert_eq!(run(source), "cleanup\n1");
    }

    #[test]
    fn try_else_runs_without_exception() {
        let source = indoc! {"
            try:
                x = 1
            except Exception:
                print('handler')
            else:
                print('else')
            finally:
                print('finally')
        "};
        assert_eq!(run(source), "else\nfinally");
    }

    #[test]
    fn user_exception_classes_match_subtypes() {
        let source = indoc! {"
            class MyError(Exception):
                pass
            try:
                raise MyError('boom')
            except MyError as e:
                print('caught')
        "};
        assert_eq!(run(source), "caught");

        let source = indoc! {"
            class MyError(Exception):
                pass
            try:
                raise MyError('boom')
            except Exception:
                print('base caught')
        "};
        assert_eq!(run(source), "base caught");
    }

    #[test]
    fn bare_raise_rethrows_current_exception() {
        let source = indoc! {"
            try:
                try:
                    x = 1 // 0
                except ZeroDivisionError:
                    raise
            except Exception:
                print('outer')
        "};
        assert_eq!(run(source), "outer");
    }

    #[test]
    fn unpacking_with_star_target() {
        let source = indoc! {"
            a, b, *rest = range(5)
            print(a, b, rest)
        "};
        assert_eq!(run(source), "0 1 [2, 3, 4]");
    }

    #[test]
    fn unpack_length_mismatch_is_an_error() {
        let error = run_err("a, b = range(3)\n");
        assert_eq!(error.exception_type(), "ValueError");
    }

    #[test]
    fn classes_bind_methods_through_instances() {
        let source = indoc! {"
            class Point:
                def __init__(self, x, y):
                    self.x = x
                    self.y = y
                def total(self):
                    return self.x + self.y
            p = Point(3, 4)
            print(p.total())
        "};
        assert_eq!(run(source), "7");
    }

    #[test]
    fn small_integer_results_are_identical() {
        assert_eq!(run("print(10 + 20 is 30)\n"), "1");
        assert_eq!(run("print(100000 + 1 is 100001)\n"), "0");
    }

    #[test]
    fn global_declaration_writes_to_module_namespace() {
        let source = indoc! {"
            x = 1
            def bump():
                global x
                x = x + 1
            bump()
            print(x)
        "};
        assert_eq!(run(source), "2");
    }

    #[test]
    fn function_locals_do_not_leak() {
        let source = indoc! {"
            def f():
                y = 10
                return y
            f()
            print(y)
        "};
        let error = run_err(source);
        assert_eq!(error.exception_type(), "NameError");
    }

    #[test]
    fn keyword_and_rest_parameters_bind() {
        let source = indoc! {"
            def f(a, b, *rest, **kw):
                return [a, b, rest, kw]
            print(f(1, 2, 3, c=4))
        "};
        assert_eq!(run(source), "[1, 2, [3], {'c': 4}]");
    }

    #[test]
    fn splat_arguments_forward() {
        let source = indoc! {"
            def f(a, b, c):
                return a + b + c
            args = [2, 3]
            print(f(1, *args))
            print(f(*args, c=4))
        "};
        assert_eq!(run(source), "6\n9");
    }

    #[test]
    fn assert_failure_raises_assertion_error() {
        let error = run_err("assert 1 == 2, 'nope'\n");
        assert_eq!(error.exception_type(), "AssertionError");
        assert_eq!(error.to_string(), "nope");
    }

    #[test]
    fn lambda_with_default() {
        let source = indoc! {"
            add = lambda a, b=2: a + b
            print(add(1))
            print(add(1, 10))
        "};
        assert_eq!(run(source), "3\n11");
    }

    #[test]
    fn list_comprehension_with_filter() {
        assert_eq!(run("print([x * x for x in range(5) if x % 2])\n"), "[1, 9]");
    }

    #[test]
    fn dict_comprehension_preserves_order() {
        assert_eq!(
            run("print({k: k * 2 for k in range(3)})\n"),
            "{0: 0, 1: 2, 2: 4}"
        );
    }

    #[test]
    fn membership_and_len_builtins() {
        assert_eq!(run("print(2 in [1, 2, 3], 'a' in 'cat', 5 in [1])\n"), "1 1 0");
        assert_eq!(run("print(len('hello'), len([1, 2]), len({1: 2}))\n"), "5 2 1");
    }

    #[test]
    fn repr_quotes_strings() {
        assert_eq!(run("print(repr(\"it's\"))\n"), "\"it's\"");
        assert_eq!(run("print(repr('plain'))\n"), "'plain'");
    }

    #[test]
    fn augmented_assignment_through_subscript() {
        let source = indoc! {"
            xs = [1, 2, 3]
            xs[0] += 10
            d = {'k': 1}
            d['k'] += 1
            print(xs, d)
        "};
        assert_eq!(run(source), "[11, 2, 3] {'k': 2}");
    }

    #[test]
    fn augmented_assignment_evaluates_target_once() {
        let source = indoc! {"
            calls = [0]
            def idx():
                calls[0] = calls[0] + 1
                return 0
            xs = [5]
            xs[idx()] += 10
            print(xs[0], calls[0])
        "};
        assert_eq!(run(source), "15 1");
    }

    #[test]
    fn augmented_assignment_evaluates_attribute_object_once() {
        let source = indoc! {"
            class Box:
                pass
            calls = [0]
            def pick(b):
                calls[0] = calls[0] + 1
                return b
            b = Box()
            b.n = 1
            pick(b).n += 2
            print(b.n, calls[0])
        "};
        assert_eq!(run(source), "3 1");
    }

    #[test]
    fn imports_run_as_no_ops() {
        let source = indoc! {"
            import os, sys as system
            from os.path import join, split as s
            from os import *
            print('ok')
        "};
        assert_eq!(run(source), "ok");
    }

    #[test]
    fn imports_bind_nothing() {
        let error = run_err("import os\nprint(os)\n");
        assert_eq!(error.exception_type(), "NameError");
    }

    #[test]
    fn user_raised_stop_iteration_is_catchable() {
        let source = indoc! {"
            try:
                raise StopIteration('done')
            except StopIteration:
                print('stopped')
        "};
        assert_eq!(run(source), "stopped");
    }

    #[test]
    fn calling_a_non_callable_fails() {
        let error = run_err("x = 3\nx()\n");
        assert_eq!(error.to_string(), "'int' object is not callable");
    }

    #[test]
    fn undefined_name_reports_name_error() {
        let error = run_err("print(missing)\n");
        assert_eq!(error.to_string(), "name 'missing' is not defined");
    }

    #[test]
    fn conditional_expression_picks_branch() {
        assert_eq!(run("print(1 if 0 else 2)\n"), "2");
    }

    #[test]
    fn output_accumulates_in_order() {
        let source = indoc! {"
            def greet(name):
                print('hello', name)
            greet('a')
            greet('b')
        "};
        assert_eq!(run(source), "hello a\nhello b");
    }
}
