//! Host-side values handed to calls.

use std::rc::Rc;

use serde_json::Value;

use crate::variable::Variable;

/// A value the host passes as self or as an argument.
///
/// Variables are borrowed under their lock; JSON values are lent as
/// transient mutable refs that own nothing.
#[derive(Debug)]
pub enum Object {
    Variable(Rc<Variable>),
    Json(Value),
}

impl Object {
    /// The variable behind this object, if it is one.
    pub fn as_variable(&self) -> Option<&Rc<Variable>> {
        match self {
            Object::Variable(v) => Some(v),
            Object::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Object::Json(v) => Some(v),
            Object::Variable(_) => None,
        }
    }
}

impl From<Rc<Variable>> for Object {
    fn from(v: Rc<Variable>) -> Self {
        Object::Variable(v)
    }
}

impl From<Variable> for Object {
    fn from(v: Variable) -> Self {
        Object::Variable(Rc::new(v))
    }
}

impl From<Value> for Object {
    fn from(v: Value) -> Self {
        Object::Json(v)
    }
}
