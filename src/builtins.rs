use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::runtime::{Namespace, TypeObject, Value};

/// The built-in function vocabulary. Resolution happens by name, after
/// local and global lookup both miss, so scripts can shadow any of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunction {
    Print,
    Len,
    Range,
    Repr,
}

impl BuiltinFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "print" => Some(BuiltinFunction::Print),
            "len" => Some(BuiltinFunction::Len),
            "range" => Some(BuiltinFunction::Range),
            "repr" => Some(BuiltinFunction::Repr),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Print => "print",
            BuiltinFunction::Len => "len",
            BuiltinFunction::Range => "range",
            BuiltinFunction::Repr => "repr",
        }
    }
}

/// The built-in exception hierarchy is flat: every type except the root
/// derives from `Exception`.
const EXCEPTION_NAMES: &[&str] = &[
    "TypeError",
    "ValueError",
    "NameError",
    "IndexError",
    "KeyError",
    "AttributeError",
    "ZeroDivisionError",
    "OverflowError",
    "AssertionError",
    "RuntimeError",
    "StopIteration",
];

thread_local! {
    static EXCEPTION_TYPES: RefCell<FxHashMap<&'static str, Rc<TypeObject>>> =
        RefCell::new(FxHashMap::default());
}

/// The type object for a built-in exception name. Types are cached per
/// thread, so repeated lookups return the identical object and subtype
/// checks by pointer hold up.
pub fn exception_type(name: &str) -> Option<Rc<TypeObject>> {
    let name = EXCEPTION_NAMES
        .iter()
        .chain(std::iter::once(&"Exception"))
        .find(|known| **known == name)?;
    Some(EXCEPTION_TYPES.with(|types| {
        let mut types = types.borrow_mut();
        if let Some(existing) = types.get(name) {
            return Rc::clone(existing);
        }
        let bases = if *name == "Exception" {
            Vec::new()
        } else {
            vec![root_exception(&mut types)]
        };
        let class = Rc::new(TypeObject {
            name: name.to_string(),
            bases,
            attributes: RefCell::new(Namespace::default()),
        });
        types.insert(name, Rc::clone(&class));
        class
    }))
}

fn root_exception(types: &mut FxHashMap<&'static str, Rc<TypeObject>>) -> Rc<TypeObject> {
    if let Some(existing) = types.get("Exception") {
        return Rc::clone(existing);
    }
    let root = Rc::new(TypeObject {
        name: "Exception".to_string(),
        bases: Vec::new(),
        attributes: RefCell::new(Namespace::default()),
    });
    types.insert("Exception", Rc::clone(&root));
    root
}

/// Name resolution fallback for the built-in namespace.
pub fn lookup(name: &str) -> Option<Value> {
    if let Some(function) = BuiltinFunction::from_name(name) {
        return Some(Value::Builtin(function));
    }
    exception_type(name).map(Value::Type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_functions_by_name() {
        assert_eq!(BuiltinFunction::from_name("print"), Some(BuiltinFunction::Print));
        assert_eq!(BuiltinFunction::from_name("len"), Some(BuiltinFunction::Len));
        assert_eq!(BuiltinFunction::from_name("missing"), None);
    }

    #[test]
    fn exception_types_are_cached_and_subtype_exception() {
        let first = exception_type("TypeError").expect("missing type");
        let second = exception_type("TypeError").expect("missing type");
        assert!(Rc::ptr_eq(&first, &second));

        let root = exception_type("Exception").expect("missing type");
        assert!(first.is_subtype_of(&root));
        assert!(!root.is_subtype_of(&first));
    }

    #[test]
    fn lookup_covers_functions_and_exception_types() {
        assert!(matches!(lookup("range"), Some(Value::Builtin(_))));
        assert!(matches!(lookup("KeyError"), Some(Value::Type(_))));
        assert!(lookup("nothing_here").is_none());
    }
}
