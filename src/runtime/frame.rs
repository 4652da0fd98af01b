use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use super::error::{EvalError, EvalResult};
use super::value::{Namespace, Value};

/// One activation record. Lookup is flat: locals first, then globals.
/// At module level both maps are the same object, so assignments land
/// in the module namespace directly. A `global` declaration redirects
/// a name's writes to the global map for the rest of the frame.
pub struct Frame {
    locals: Rc<RefCell<Namespace>>,
    globals: Rc<RefCell<Namespace>>,
    global_names: FxHashSet<String>,
}

impl Frame {
    pub fn module(globals: Rc<RefCell<Namespace>>) -> Self {
        Self {
            locals: Rc::clone(&globals),
            globals,
            global_names: FxHashSet::default(),
        }
    }

    pub fn call(locals: Namespace, globals: Rc<RefCell<Namespace>>) -> Self {
        Self {
            locals: Rc::new(RefCell::new(locals)),
            globals,
            global_names: FxHashSet::default(),
        }
    }

    pub fn globals(&self) -> Rc<RefCell<Namespace>> {
        Rc::clone(&self.globals)
    }

    pub fn locals(&self) -> Rc<RefCell<Namespace>> {
        Rc::clone(&self.locals)
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.locals.borrow().get(name) {
            return Some(value.clone());
        }
        self.globals.borrow().get(name).cloned()
    }

    pub fn assign(&self, name: &str, value: Value) {
        if self.global_names.contains(name) {
            self.globals.borrow_mut().insert(name.to_string(), value);
        } else {
            self.locals.borrow_mut().insert(name.to_string(), value);
        }
    }

    pub fn delete(&self, name: &str) -> EvalResult<()> {
        let target = if self.global_names.contains(name) {
            &self.globals
        } else {
            &self.locals
        };
        if target.borrow_mut().remove(name).is_some() {
            return Ok(());
        }
        // fall through to the module namespace for reads of globals
        if !Rc::ptr_eq(&self.locals, &self.globals)
            && self.globals.borrow_mut().remove(name).is_some()
        {
            return Ok(());
        }
        Err(EvalError::NameNotFound {
            name: name.to_string(),
        })
    }

    pub fn declare_global(&mut self, name: &str) {
        self.global_names.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals() -> Rc<RefCell<Namespace>> {
        Rc::new(RefCell::new(Namespace::default()))
    }

    #[test]
    fn call_frame_shadows_globals() {
        let globals = globals();
        globals.borrow_mut().insert("x".to_string(), Value::int(1));
        let frame = Frame::call(Namespace::default(), Rc::clone(&globals));

        assert!(frame.lookup("x").expect("missing").eq_value(&Value::int(1)));
        frame.assign("x", Value::int(2));
        assert!(frame.lookup("x").expect("missing").eq_value(&Value::int(2)));
        assert!(
            globals
                .borrow()
                .get("x")
                .expect("missing")
                .eq_value(&Value::int(1))
        );
    }

    #[test]
    fn global_declaration_redirects_writes() {
        let globals = globals();
        globals.borrow_mut().insert("x".to_string(), Value::int(1));
        let mut frame = Frame::call(Namespace::default(), Rc::clone(&globals));
        frame.declare_global("x");

        frame.assign("x", Value::int(5));
        assert!(
            globals
                .borrow()
                .get("x")
                .expect("missing")
                .eq_value(&Value::int(5))
        );
    }

    #[test]
    fn delete_removes_and_reports_missing_names() {
        let globals = globals();
        let frame = Frame::module(Rc::clone(&globals));
        frame.assign("x", Value::int(1));
        frame.delete("x").expect("delete failed");
        assert!(frame.lookup("x").is_none());
        assert!(frame.delete("x").is_err());
    }
}
