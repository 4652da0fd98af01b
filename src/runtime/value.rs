use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{Expr, Params, Suite};
use crate::builtins::BuiltinFunction;

use super::error::{EvalError, EvalResult};

/// A name-to-value map; used for globals, locals, and attribute sets.
pub type Namespace = FxHashMap<String, Value>;

/// A runtime value. Compound values share their payload through `Rc`,
/// so cloning a `Value` aliases rather than copies; `is` compares these
/// pointers. Integers live behind `Rc` too, which gives the small-int
/// cache observable identity.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Ellipsis,
    Int(Rc<i64>),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Func(Rc<Function>),
    Method(Rc<BoundMethod>),
    Type(Rc<TypeObject>),
    Instance(Rc<Instance>),
    Builtin(BuiltinFunction),
}

const SMALL_INT_MIN: i64 = -2;
const SMALL_INT_MAX: i64 = 1000;

thread_local! {
    static SMALL_INTS: Vec<Rc<i64>> =
        (SMALL_INT_MIN..=SMALL_INT_MAX).map(Rc::new).collect();
}

/// An insertion-ordered mapping. Lookups are linear, which is fine for
/// the dictionary sizes scripts build, and iteration order matches the
/// order keys were first written.
#[derive(Debug, Default)]
pub struct Dict {
    entries: Vec<(Key, Value)>,
}

impl Dict {
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn insert(&mut self, key: Key, value: Value) {
        for (existing, slot) in &mut self.entries {
            if *existing == key {
                *slot = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Key, Value)] {
        &self.entries
    }
}

/// A dictionary key. Only immutable values hash; everything else is
/// rejected at insertion time.
#[derive(Debug, Clone)]
pub enum Key {
    None,
    Ellipsis,
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::None, Key::None) => true,
            (Key::Ellipsis, Key::Ellipsis) => true,
            (Key::Int(a), Key::Int(b)) => a == b,
            (Key::Int(a), Key::Float(b)) | (Key::Float(b), Key::Int(a)) => *a as f64 == *b,
            (Key::Float(a), Key::Float(b)) => a == b,
            (Key::Str(a), Key::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Key {
    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Ellipsis => Value::Ellipsis,
            Key::Int(value) => Value::int(*value),
            Key::Float(value) => Value::Float(*value),
            Key::Str(value) => Value::Str(Rc::clone(value)),
        }
    }

    pub fn repr(&self) -> String {
        self.to_value().repr()
    }
}

/// A user-defined function or lambda. Defaults are evaluated once when
/// the definition executes and shared by every call.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Rc<Params>,
    pub body: FuncBody,
    pub defaults: Vec<Option<Value>>,
    pub globals: Rc<RefCell<Namespace>>,
}

#[derive(Debug)]
pub enum FuncBody {
    Suite(Rc<Suite>),
    Expr(Rc<Expr>),
}

/// A function retrieved through an instance; calling it prepends the
/// receiver.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub function: Rc<Function>,
}

/// A class object. Attributes hold whatever the class body assigned,
/// methods included.
#[derive(Debug)]
pub struct TypeObject {
    pub name: String,
    pub bases: Vec<Rc<TypeObject>>,
    pub attributes: RefCell<Namespace>,
}

impl TypeObject {
    /// Identity-based subtype walk. Every type lives behind an `Rc`, so
    /// addresses are stable.
    pub fn is_subtype_of(&self, ancestor: &TypeObject) -> bool {
        std::ptr::eq(self, ancestor) || self.bases.iter().any(|base| base.is_subtype_of(ancestor))
    }

    /// Attribute lookup through the base chain, depth first.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attributes.borrow().get(name) {
            return Some(value.clone());
        }
        self.bases.iter().find_map(|base| base.lookup(name))
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<TypeObject>,
    pub attributes: RefCell<Namespace>,
}

impl Value {
    /// Integer constructor; values in -2..=1000 come from a per-thread
    /// cache so repeated small results are pointer-identical.
    pub fn int(value: i64) -> Value {
        if (SMALL_INT_MIN..=SMALL_INT_MAX).contains(&value) {
            SMALL_INTS.with(|cache| Value::Int(Rc::clone(&cache[(value - SMALL_INT_MIN) as usize])))
        } else {
            Value::Int(Rc::new(value))
        }
    }

    pub fn str(value: impl Into<Rc<str>>) -> Value {
        Value::Str(value.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Ellipsis => "ellipsis".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Func(_) | Value::Method(_) => "function".to_string(),
            Value::Type(_) => "type".to_string(),
            Value::Instance(instance) => instance.class.name.clone(),
            Value::Builtin(_) => "builtin_function_or_method".to_string(),
        }
    }

    /// Truth protocol: `None`, numeric zero, and empty containers are
    /// false; everything else is true.
    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Int(value) => **value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Ellipsis => "Ellipsis".to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => format_float(*value),
            Value::Str(value) => repr_str(value),
            Value::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Dict(entries) => {
                let parts: Vec<String> = entries
                    .borrow()
                    .entries()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Func(function) => format!("<function {}>", function.name),
            Value::Method(method) => format!("<bound method {}>", method.function.name),
            Value::Type(class) => format!("<class '{}'>", class.name),
            Value::Instance(instance) => format!("<{} object>", instance.class.name),
            Value::Builtin(function) => {
                format!("<built-in function {}>", function.name())
            }
        }
    }

    /// Conversion to display text: strings print their raw contents,
    /// everything else its repr.
    pub fn display(&self) -> String {
        match self {
            Value::Str(value) => value.to_string(),
            _ => self.repr(),
        }
    }

    /// Message text when this value is raised as an exception.
    pub fn error_message(&self) -> String {
        match self {
            Value::Type(class) => class.name.clone(),
            Value::Instance(instance) => {
                let args = instance.attributes.borrow().get("args").cloned();
                match args {
                    Some(Value::List(items)) if items.borrow().len() == 1 => {
                        items.borrow()[0].display()
                    }
                    Some(args) => format!("{}: {}", instance.class.name, args.display()),
                    None => instance.class.name.clone(),
                }
            }
            _ => self.display(),
        }
    }

    pub fn length(&self) -> EvalResult<i64> {
        match self {
            Value::Str(value) => Ok(value.chars().count() as i64),
            Value::List(items) => Ok(items.borrow().len() as i64),
            Value::Dict(entries) => Ok(entries.borrow().len() as i64),
            _ => Err(EvalError::type_mismatch(format!(
                "object of type '{}' has no len()",
                self.type_name()
            ))),
        }
    }

    /// Structural equality with numeric cross-type comparison.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Ellipsis, Value::Ellipsis) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                **a as f64 == *b
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.entries().iter().all(|(key, value)| {
                        b.get(key).is_some_and(|other| value.eq_value(other))
                    })
            }
            _ => self.is_identical(other),
        }
    }

    /// Pointer identity, the meaning of `is`.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Ellipsis, Value::Ellipsis) => true,
            (Value::Int(a), Value::Int(b)) => Rc::ptr_eq(a, b),
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering for `<`-family operators. `None` means the operands are
    /// unordered (NaN); mismatched types are an error.
    pub fn compare(&self, other: &Value, op: &str) -> EvalResult<Option<Ordering>> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
            (Value::Int(a), Value::Float(b)) => Ok((**a as f64).partial_cmp(b)),
            (Value::Float(a), Value::Int(b)) => Ok(a.partial_cmp(&(**b as f64))),
            (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.eq_value(y) {
                        return x.compare(y, op);
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => Err(EvalError::type_mismatch(format!(
                "'{op}' not supported between instances of '{}' and '{}'",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Membership test, the meaning of `in`.
    pub fn contains(&self, item: &Value) -> EvalResult<bool> {
        match self {
            Value::List(items) => Ok(items.borrow().iter().any(|other| item.eq_value(other))),
            Value::Dict(entries) => Ok(entries.borrow().get(&item.to_key()?).is_some()),
            Value::Str(text) => match item {
                Value::Str(needle) => Ok(text.contains(&**needle)),
                _ => Err(EvalError::type_mismatch(format!(
                    "'in <string>' requires string as left operand, not {}",
                    item.type_name()
                ))),
            },
            _ => Err(EvalError::type_mismatch(format!(
                "argument of type '{}' is not iterable",
                self.type_name()
            ))),
        }
    }

    /// Snapshot iteration: lists yield elements, strings one-character
    /// strings, dictionaries their keys.
    pub fn iterate(&self) -> EvalResult<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Str(text) => Ok(text
                .chars()
                .map(|ch| Value::str(ch.to_string()))
                .collect()),
            Value::Dict(entries) => Ok(entries
                .borrow()
                .entries()
                .iter()
                .map(|(key, _)| key.to_value())
                .collect()),
            _ => Err(EvalError::type_mismatch(format!(
                "'{}' object is not iterable",
                self.type_name()
            ))),
        }
    }

    pub fn to_key(&self) -> EvalResult<Key> {
        match self {
            Value::None => Ok(Key::None),
            Value::Ellipsis => Ok(Key::Ellipsis),
            Value::Int(value) => Ok(Key::Int(**value)),
            Value::Float(value) => Ok(Key::Float(*value)),
            Value::Str(value) => Ok(Key::Str(Rc::clone(value))),
            _ => Err(EvalError::UnhashableKey {
                type_name: self.type_name(),
            }),
        }
    }

    pub fn get_item(&self, index: &Value) -> EvalResult<Value> {
        match (self, index) {
            (Value::List(items), Value::Int(position)) => {
                let items = items.borrow();
                let position = normalize_index(**position, items.len())?;
                Ok(items[position].clone())
            }
            (Value::Str(text), Value::Int(position)) => {
                let chars: Vec<char> = text.chars().collect();
                let position = normalize_index(**position, chars.len())?;
                Ok(Value::str(chars[position].to_string()))
            }
            (Value::Dict(entries), _) => {
                let key = index.to_key()?;
                entries
                    .borrow()
                    .get(&key)
                    .cloned()
                    .ok_or(EvalError::KeyNotFound { key: key.repr() })
            }
            (Value::List(_) | Value::Str(_), _) => Err(EvalError::type_mismatch(format!(
                "{} indices must be integers, not {}",
                self.type_name(),
                index.type_name()
            ))),
            _ => Err(EvalError::type_mismatch(format!(
                "'{}' object is not subscriptable",
                self.type_name()
            ))),
        }
    }

    pub fn set_item(&self, index: &Value, value: Value) -> EvalResult<()> {
        match (self, index) {
            (Value::List(items), Value::Int(position)) => {
                let mut items = items.borrow_mut();
                let position = normalize_index(**position, items.len())?;
                items[position] = value;
                Ok(())
            }
            (Value::Dict(entries), _) => {
                entries.borrow_mut().insert(index.to_key()?, value);
                Ok(())
            }
            (Value::List(_), _) => Err(EvalError::type_mismatch(format!(
                "list indices must be integers, not {}",
                index.type_name()
            ))),
            _ => Err(EvalError::type_mismatch(format!(
                "'{}' object does not support item assignment",
                self.type_name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Arithmetic. Integer add/sub/mul wrap; `**` reports overflow; `/`
    // always produces a float.

    pub fn add(&self, other: &Value) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::int(a.wrapping_add(**b))),
            (Value::Str(a), Value::Str(b)) => {
                let mut text = a.to_string();
                text.push_str(b);
                Ok(Value::str(text))
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            _ => self.float_op(other, "+", |a, b| a + b),
        }
    }

    pub fn sub(&self, other: &Value) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::int(a.wrapping_sub(**b))),
            _ => self.float_op(other, "-", |a, b| a - b),
        }
    }

    pub fn mul(&self, other: &Value) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::int(a.wrapping_mul(**b))),
            (Value::Str(text), Value::Int(count)) | (Value::Int(count), Value::Str(text)) => {
                Ok(Value::str(text.repeat((**count).max(0) as usize)))
            }
            (Value::List(items), Value::Int(count)) | (Value::Int(count), Value::List(items)) => {
                let items = items.borrow();
                let mut result = Vec::with_capacity(items.len() * (**count).max(0) as usize);
                for _ in 0..(**count).max(0) {
                    result.extend(items.iter().cloned());
                }
                Ok(Value::list(result))
            }
            _ => self.float_op(other, "*", |a, b| a * b),
        }
    }

    /// True division: always a float, even between integers.
    pub fn true_div(&self, other: &Value) -> EvalResult<Value> {
        let (a, b) = self.numeric_pair(other, "/")?;
        if b == 0.0 {
            return Err(EvalError::DivisionByZero {
                message: "division by zero",
            });
        }
        Ok(Value::Float(a / b))
    }

    /// Floor division, rounding toward negative infinity.
    pub fn floor_div(&self, other: &Value) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if **b == 0 {
                    return Err(EvalError::DivisionByZero {
                        message: "integer division or modulo by zero",
                    });
                }
                Ok(Value::int(floor_div_i64(**a, **b)))
            }
            _ => {
                let (a, b) = self.numeric_pair(other, "//")?;
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero {
                        message: "float floor division by zero",
                    });
                }
                Ok(Value::Float((a / b).floor()))
            }
        }
    }

    /// Remainder with the sign of the divisor.
    pub fn rem(&self, other: &Value) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if **b == 0 {
                    return Err(EvalError::DivisionByZero {
                        message: "integer division or modulo by zero",
                    });
                }
                Ok(Value::int(floor_mod_i64(**a, **b)))
            }
            _ => {
                let (a, b) = self.numeric_pair(other, "%")?;
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero {
                        message: "float modulo",
                    });
                }
                let result = a - (a / b).floor() * b;
                Ok(Value::Float(result))
            }
        }
    }

    pub fn power(&self, other: &Value) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) if **b >= 0 => {
                let exponent = u32::try_from(**b)
                    .map_err(|_| EvalError::Overflow { operation: "**" })?;
                a.checked_pow(exponent)
                    .map(Value::int)
                    .ok_or(EvalError::Overflow { operation: "**" })
            }
            _ => {
                let (a, b) = self.numeric_pair(other, "**")?;
                Ok(Value::Float(a.powf(b)))
            }
        }
    }

    pub fn bit_and(&self, other: &Value) -> EvalResult<Value> {
        self.int_op(other, "&", |a, b| Ok(a & b))
    }

    pub fn bit_or(&self, other: &Value) -> EvalResult<Value> {
        self.int_op(other, "|", |a, b| Ok(a | b))
    }

    pub fn bit_xor(&self, other: &Value) -> EvalResult<Value> {
        self.int_op(other, "^", |a, b| Ok(a ^ b))
    }

    pub fn shl(&self, other: &Value) -> EvalResult<Value> {
        self.int_op(other, "<<", |a, b| {
            let shift = check_shift(b)?;
            a.checked_shl(shift)
                .ok_or(EvalError::Overflow { operation: "<<" })
        })
    }

    pub fn shr(&self, other: &Value) -> EvalResult<Value> {
        self.int_op(other, ">>", |a, b| {
            let shift = check_shift(b)?;
            a.checked_shr(shift)
                .ok_or(EvalError::Overflow { operation: ">>" })
        })
    }

    pub fn neg(&self) -> EvalResult<Value> {
        match self {
            Value::Int(value) => Ok(Value::int(value.wrapping_neg())),
            Value::Float(value) => Ok(Value::Float(-value)),
            _ => Err(self.unary_type_error("-")),
        }
    }

    pub fn pos(&self) -> EvalResult<Value> {
        match self {
            Value::Int(_) | Value::Float(_) => Ok(self.clone()),
            _ => Err(self.unary_type_error("+")),
        }
    }

    pub fn invert(&self) -> EvalResult<Value> {
        match self {
            Value::Int(value) => Ok(Value::int(!**value)),
            _ => Err(self.unary_type_error("~")),
        }
    }

    fn float_op(
        &self,
        other: &Value,
        op: &str,
        apply: impl FnOnce(f64, f64) -> f64,
    ) -> EvalResult<Value> {
        let (a, b) = self.numeric_pair(other, op)?;
        Ok(Value::Float(apply(a, b)))
    }

    fn int_op(
        &self,
        other: &Value,
        op: &str,
        apply: impl FnOnce(i64, i64) -> EvalResult<i64>,
    ) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => apply(**a, **b).map(Value::int),
            _ => Err(binary_type_error(op, self, other)),
        }
    }

    fn numeric_pair(&self, other: &Value, op: &str) -> EvalResult<(f64, f64)> {
        let a = match self {
            Value::Int(value) => **value as f64,
            Value::Float(value) => *value,
            _ => return Err(binary_type_error(op, self, other)),
        };
        let b = match other {
            Value::Int(value) => **value as f64,
            Value::Float(value) => *value,
            _ => return Err(binary_type_error(op, self, other)),
        };
        Ok((a, b))
    }

    fn unary_type_error(&self, op: &str) -> EvalError {
        EvalError::type_mismatch(format!(
            "bad operand type for unary {op}: '{}'",
            self.type_name()
        ))
    }
}

fn binary_type_error(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn normalize_index(index: i64, len: usize) -> EvalResult<usize> {
    let len = len as i64;
    let position = if index < 0 { index + len } else { index };
    if (0..len).contains(&position) {
        Ok(position as usize)
    } else {
        Err(EvalError::IndexOutOfRange)
    }
}

fn check_shift(count: i64) -> EvalResult<u32> {
    if count < 0 {
        return Err(EvalError::ValueMismatch {
            message: "negative shift count".to_string(),
        });
    }
    u32::try_from(count).map_err(|_| EvalError::Overflow { operation: "<<" })
}

fn floor_div_i64(a: i64, b: i64) -> i64 {
    let quotient = a.wrapping_div(b);
    if a % b != 0 && (a < 0) != (b < 0) {
        quotient - 1
    } else {
        quotient
    }
}

fn floor_mod_i64(a: i64, b: i64) -> i64 {
    let remainder = a % b;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        remainder + b
    } else {
        remainder
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value == value.trunc() && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// String repr: prefer single quotes; fall back to double quotes only
/// when the text contains a single quote but no double quote.
fn repr_str(value: &str) -> String {
    let double = value.contains('\'') && !value.contains('"');
    let quote = if double { '"' } else { '\'' };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\'' if !double => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_share_identity() {
        let a = Value::int(7);
        let b = Value::int(3).add(&Value::int(4)).expect("add failed");
        assert!(a.is_identical(&b));

        let big_a = Value::int(100_000);
        let big_b = Value::int(100_000);
        assert!(big_a.eq_value(&big_b));
        assert!(!big_a.is_identical(&big_b));
    }

    #[test]
    fn string_repr_picks_quotes() {
        assert_eq!(Value::str("hello").repr(), "'hello'");
        assert_eq!(Value::str("it's").repr(), "\"it's\"");
        assert_eq!(Value::str("both \" and '").repr(), "'both \" and \\''");
        assert_eq!(Value::str("a\nb").repr(), "'a\\nb'");
    }

    #[test]
    fn truthiness_of_values() {
        assert!(!Value::None.truth());
        assert!(!Value::int(0).truth());
        assert!(!Value::Float(0.0).truth());
        assert!(!Value::str("").truth());
        assert!(!Value::list(Vec::new()).truth());
        assert!(Value::int(-1).truth());
        assert!(Value::str("x").truth());
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        assert_eq!(floor_div_i64(7, 2), 3);
        assert_eq!(floor_div_i64(-7, 2), -4);
        assert_eq!(floor_div_i64(7, -2), -4);
        assert_eq!(floor_mod_i64(-7, 2), 1);
        assert_eq!(floor_mod_i64(7, -2), -1);
    }

    #[test]
    fn true_division_of_integers_yields_float() {
        let result = Value::int(3).true_div(&Value::int(2)).expect("div failed");
        assert!(matches!(result, Value::Float(v) if v == 1.5));
        assert!(Value::int(1).true_div(&Value::int(0)).is_err());
    }

    #[test]
    fn dict_preserves_insertion_order() {
        let mut dict = Dict::default();
        dict.insert(Key::Str(Rc::from("b")), Value::int(1));
        dict.insert(Key::Str(Rc::from("a")), Value::int(2));
        dict.insert(Key::Str(Rc::from("b")), Value::int(3));
        let value = Value::Dict(Rc::new(RefCell::new(dict)));
        assert_eq!(value.repr(), "{'b': 3, 'a': 2}");
    }

    #[test]
    fn mixed_numeric_equality_and_ordering() {
        assert!(Value::int(1).eq_value(&Value::Float(1.0)));
        let order = Value::int(1)
            .compare(&Value::Float(1.5), "<")
            .expect("compare failed");
        assert_eq!(order, Some(std::cmp::Ordering::Less));
        assert!(Value::int(1).compare(&Value::str("a"), "<").is_err());
    }

    #[test]
    fn unhashable_values_are_rejected_as_keys() {
        let err = Value::list(Vec::new()).to_key().unwrap_err();
        assert_eq!(err.to_string(), "unhashable type: 'list'");
    }

    #[test]
    fn float_repr_keeps_a_fraction() {
        assert_eq!(Value::Float(1.0).repr(), "1.0");
        assert_eq!(Value::Float(1.5).repr(), "1.5");
    }
}
