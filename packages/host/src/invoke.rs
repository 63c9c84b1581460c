//! Calling into the registry on behalf of the host.

use std::rc::Rc;

use rebind_core::{Ref, Registry, RegistryConfig, Status, Strategies, Target};

use crate::error::HostError;
use crate::object::Object;
use crate::tuple_lock::{split_self_mode, TupleLock};
use crate::variable::Variable;

/// The target long-lived results are written into.
///
/// Results must be owned; a returned reference is copied when its type
/// allows it.
pub fn variable_target<'a>(config: &RegistryConfig) -> Target<'a> {
    Target::new(
        None,
        config.inline_capacity,
        Strategies::STACK | Strategies::HEAP | Strategies::TRIVIAL,
    )
}

/// Call `this` (or its method) and store the result in `out`.
///
/// A call that produces nothing leaves `out` empty.
pub fn call_to_variable<'a>(
    registry: &Registry,
    out: &Variable,
    this: Ref<'a>,
    method: Option<&str>,
    args: &mut [Ref<'a>],
) -> Result<(), HostError> {
    let name = this.name();
    let given = args.len();
    let mut target = variable_target(registry.config());
    let status = match method {
        Some(method) => registry.dispatch_method(this, method, &mut target, args),
        None => registry.dispatch(this, &mut target, args),
    };
    tracing::debug!(this = name, ?method, %status, "host call returned");
    match status {
        Status::None => out.reset(),
        Status::Stack | Status::Heap => match target.take().into_static() {
            Ok(value) => out.populate(value),
            Err(_) => Err(HostError::Internal(format!(
                "status {} with a borrowed result",
                status
            ))),
        },
        Status::Read | Status::Write => Err(HostError::Internal(format!(
            "variable target received a reference ({})",
            status
        ))),
        Status::Impossible
        | Status::WrongNumber
        | Status::WrongType
        | Status::WrongReturn
        | Status::Exception
        | Status::OutOfMemory => Err(HostError::from_status(status, &mut target, name, given)),
    }
}

/// Lock `this` and `args`, call, and return the result as a new variable.
///
/// `mode` is `"<self><sep><args>"`: the first character locks self, and
/// the rest (after one separator) holds one character per argument.
///
/// # Example
///
/// ```rust
/// use rebind_core::{Overload, Registry, Returned};
/// use rebind_host::{call_object, Object, Variable};
///
/// let registry = Registry::builder()
///     .with_builtins()
///     .method::<i64>(
///         "twice",
///         Overload::new(vec![], |frame| Ok(Returned::value(frame.this::<i64>()? * 2))),
///     )
///     .build()
///     .unwrap();
/// let mut this = Object::from(Variable::owned(3_i64));
/// let out = call_object(&registry, &mut this, Some("twice"), &mut [], "").unwrap();
/// assert_eq!(out.load::<i64>(&registry).unwrap(), Some(6));
/// ```
pub fn call_object(
    registry: &Registry,
    this: &mut Object,
    method: Option<&str>,
    args: &mut [Object],
    mode: &str,
) -> Result<Rc<Variable>, HostError> {
    let (kind, arg_mode) = split_self_mode(mode);
    let mut self_lock = TupleLock::with_kinds(std::slice::from_mut(this), &[kind])?;
    let mut arg_lock = TupleLock::new(args, arg_mode)?;
    let this = self_lock.refs().into_iter().next().unwrap_or_default();
    let mut refs = arg_lock.refs();
    let out = Variable::new();
    call_to_variable(registry, &out, this, method, &mut refs)?;
    Ok(Rc::new(out))
}
