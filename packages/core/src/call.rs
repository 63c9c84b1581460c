//! Overloads, the body-side `Frame`, and first-class `Function` values.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use rebind_ll::{Binding, Index, Qualifier};

use crate::exception::Exception;
use crate::reference::Ref;
use crate::registry::Registry;

/// One declared parameter: the type it wants and how it binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    index: Index,
    binding: Binding,
}

impl Param {
    pub fn new(index: Index, binding: Binding) -> Self {
        Self { index, binding }
    }

    /// A by-value `T`: owned arguments are moved, borrows are copied, and
    /// other types are converted.
    pub fn value<T: 'static>() -> Self {
        Self::new(Index::of::<T>(), Binding::Value)
    }

    /// A `&T`.
    pub fn read<T: 'static>() -> Self {
        Self::new(Index::of::<T>(), Binding::Const)
    }

    /// A `&mut T`; only `Write` arguments bind.
    pub fn write<T: 'static>() -> Self {
        Self::new(Index::of::<T>(), Binding::Lvalue)
    }

    /// A moved `T`; only owned arguments bind.
    pub fn owned<T: 'static>() -> Self {
        Self::new(Index::of::<T>(), Binding::Rvalue)
    }

    pub fn index(&self) -> Index {
        self.index
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }
}

/// What a body hands back to the dispatcher.
///
/// `Read` and `Write` may only point into the call's self, which is what
/// the `'a` lifetime enforces.
#[derive(Debug)]
pub enum Returned<'a> {
    Nothing,
    Value(Ref<'static>),
    Read(Ref<'a>),
    Write(Ref<'a>),
}

impl<'a> Returned<'a> {
    /// An owned result; `()` is `Nothing`.
    pub fn value<T: 'static>(value: T) -> Self {
        if Index::of::<T>().is_void() {
            Returned::Nothing
        } else {
            Returned::Value(Ref::owned(value))
        }
    }

    pub fn read<T: 'static>(value: &'a T) -> Self {
        Returned::Read(Ref::read(value))
    }

    pub fn write<T: 'static>(value: &'a mut T) -> Self {
        Returned::Write(Ref::write(value))
    }

    /// The result as a ref, or `None` for `Nothing`.
    pub fn into_ref(self) -> Option<Ref<'a>> {
        match self {
            Returned::Nothing => None,
            Returned::Value(r) => Some(r),
            Returned::Read(r) | Returned::Write(r) => Some(r),
        }
    }
}

/// Body-side view of one call.
///
/// Arguments are already bound: every `Param::value` position holds an owned
/// value of the declared type, missing trailing positions hold their
/// fallbacks.
pub struct Frame<'r, 'a> {
    registry: &'r Registry,
    this: &'r mut Ref<'a>,
    args: Vec<Ref<'r>>,
}

fn missing(what: &str, i: usize) -> Exception {
    Exception::msg(format!("no argument {} ({})", i, what))
}

impl<'r, 'a> Frame<'r, 'a> {
    pub(crate) fn new(registry: &'r Registry, this: &'r mut Ref<'a>, args: Vec<Ref<'r>>) -> Self {
        Self {
            registry,
            this,
            args,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Number of bound arguments, fallbacks included.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn arg<T: 'static>(&self, i: usize) -> Result<&T, Exception> {
        self.args
            .get(i)
            .and_then(|r| r.get::<T>())
            .ok_or_else(|| missing(type_name::<T>(), i))
    }

    pub fn arg_mut<T: 'static>(&mut self, i: usize) -> Result<&mut T, Exception> {
        self.args
            .get_mut(i)
            .and_then(|r| r.get_mut::<T>())
            .ok_or_else(|| missing(type_name::<T>(), i))
    }

    /// Move an owned argument out.
    pub fn take<T: 'static>(&mut self, i: usize) -> Result<T, Exception> {
        self.args
            .get_mut(i)
            .and_then(|r| r.take::<T>())
            .ok_or_else(|| missing(type_name::<T>(), i))
    }

    pub fn this<T: 'static>(&self) -> Result<&T, Exception> {
        self.this
            .get::<T>()
            .ok_or_else(|| Exception::msg(format!("self is not a {}", type_name::<T>())))
    }

    pub fn this_mut<T: 'static>(&mut self) -> Result<&mut T, Exception> {
        self.this
            .get_mut::<T>()
            .ok_or_else(|| Exception::msg(format!("self is not a mutable {}", type_name::<T>())))
    }

    /// A shared reference into a borrowed self that outlives the call.
    ///
    /// A `Write` self is downgraded to `Read` for the rest of the call.
    pub fn leak_this<T: 'static>(&mut self) -> Result<&'a T, Exception> {
        if !self.this.index().equals::<T>() {
            return Err(Exception::msg(format!("self is not a {}", type_name::<T>())));
        }
        self.this
            .leak()
            .and_then(|any| any.downcast_ref::<T>())
            .ok_or_else(|| Exception::msg("cannot reference into an owned self"))
    }

    /// A mutable reference into a `Write` self that outlives the call.
    ///
    /// Self is unavailable to the body afterwards.
    pub fn leak_this_mut<T: 'static>(&mut self) -> Result<&'a mut T, Exception> {
        if !self.this.index().equals::<T>() || self.this.qualifier() != Some(Qualifier::Write) {
            return Err(Exception::msg(format!(
                "self is not a mutably borrowed {}",
                type_name::<T>()
            )));
        }
        self.this
            .leak_mut()
            .and_then(|any| any.downcast_mut::<T>())
            .ok_or_else(|| Exception::msg("self was already released"))
    }

    /// Move an owned self out.
    pub fn take_this<T: 'static>(&mut self) -> Result<T, Exception> {
        self.this
            .take::<T>()
            .ok_or_else(|| Exception::msg(format!("self is not an owned {}", type_name::<T>())))
    }
}

/// Type-erased body of an overload.
pub type Body = Arc<
    dyn for<'r, 'a> Fn(&mut Frame<'r, 'a>) -> Result<Returned<'a>, Exception> + Send + Sync,
>;

type Fallback = Arc<dyn Fn() -> Ref<'static> + Send + Sync>;

fn erase<F>(f: F) -> Body
where
    F: for<'r, 'a> Fn(&mut Frame<'r, 'a>) -> Result<Returned<'a>, Exception>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

macro_rules! typed_function {
    ($name:ident, $($arg:ident : $i:tt),+) => {
        #[doc = concat!("Adapt a closure taking owned parameters (", stringify!($name), ").")]
        pub fn $name<$($arg,)* R, F>(f: F) -> Overload
        where
            $($arg: 'static,)*
            R: 'static,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
        {
            Overload::new(vec![$(Param::value::<$arg>()),*], move |frame| {
                Ok(Returned::value(f($(frame.take::<$arg>($i)?),*)))
            })
        }
    };
}

/// One callable signature: parameters, trailing fallbacks, the binding it
/// requires of self, and the body.
///
/// An overload of arity `A` with `K` fallbacks accepts between `A - K` and
/// `A` arguments.
///
/// # Example
///
/// ```rust
/// use rebind_core::Overload;
///
/// let add = Overload::function2(|a: i64, b: i64| a + b).with_default(0_i64);
/// assert_eq!(add.arity(), 2);
/// assert!(add.accepts_count(1));
/// assert!(!add.accepts_count(0));
/// ```
#[derive(Clone)]
pub struct Overload {
    params: Vec<Param>,
    fallbacks: Vec<Fallback>,
    self_binding: Binding,
    body: Body,
}

impl Overload {
    pub fn new<F>(params: Vec<Param>, f: F) -> Self
    where
        F: for<'r, 'a> Fn(&mut Frame<'r, 'a>) -> Result<Returned<'a>, Exception>
            + Send
            + Sync
            + 'static,
    {
        Self {
            params,
            fallbacks: Vec::new(),
            self_binding: Binding::Const,
            body: erase(f),
        }
    }

    /// Adapt a closure taking no parameters.
    pub fn function0<R, F>(f: F) -> Overload
    where
        R: 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        Overload::new(Vec::new(), move |_| Ok(Returned::value(f())))
    }

    typed_function!(function1, A: 0);
    typed_function!(function2, A: 0, B: 1);
    typed_function!(function3, A: 0, B: 1, C: 2);
    typed_function!(function4, A: 0, B: 1, C: 2, D: 3);

    /// Declare one more trailing fallback.
    ///
    /// Fallbacks are given in parameter order: after `K` calls they cover
    /// the last `K` parameters. Each call receives a clone of `value`.
    pub fn with_default<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.fallbacks
            .push(Arc::new(move || Ref::owned(value.clone())));
        self
    }

    /// Require this binding of self (default `Const`, which accepts any).
    pub fn on_self(mut self, binding: Binding) -> Self {
        self.self_binding = binding;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of trailing fallbacks.
    pub fn defaults(&self) -> usize {
        self.fallbacks.len()
    }

    pub fn min_arity(&self) -> usize {
        self.arity().saturating_sub(self.defaults())
    }

    /// Check if `n` arguments fall in this overload's arity window.
    pub fn accepts_count(&self, n: usize) -> bool {
        (self.min_arity()..=self.arity()).contains(&n)
    }

    pub fn self_binding(&self) -> Binding {
        self.self_binding
    }

    /// The fallback value for parameter `position`, if it has one.
    pub(crate) fn fallback(&self, position: usize) -> Option<Ref<'static>> {
        let k = position.checked_sub(self.min_arity())?;
        self.fallbacks.get(k).map(|make| make())
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("params", &self.params)
            .field("defaults", &self.defaults())
            .field("self_binding", &self.self_binding)
            .finish()
    }
}

/// A first-class erased callable.
///
/// Dispatching with a `Function` as self runs its own overloads instead of
/// a registered call table.
#[derive(Clone, Debug)]
pub struct Function {
    overloads: Arc<[Overload]>,
}

impl Function {
    pub fn new(overloads: Vec<Overload>) -> Self {
        Self {
            overloads: overloads.into(),
        }
    }

    pub fn overloads(&self) -> &[Overload] {
        &self.overloads
    }

    pub(crate) fn shared(&self) -> Arc<[Overload]> {
        Arc::clone(&self.overloads)
    }
}

impl From<Overload> for Function {
    fn from(overload: Overload) -> Self {
        Self::new(vec![overload])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryConfig;

    fn run<'a>(
        overload: &Overload,
        this: &mut Ref<'a>,
        args: Vec<Ref<'static>>,
    ) -> Result<Returned<'a>, Exception> {
        let registry = Registry::init(RegistryConfig::default()).unwrap();
        let mut frame = Frame::new(&registry, this, args);
        (overload.body())(&mut frame)
    }

    #[test]
    fn arity_window() {
        let o = Overload::function3(|a: i64, b: i64, c: i64| a + b + c)
            .with_default(1_i64)
            .with_default(2_i64);
        assert_eq!(o.arity(), 3);
        assert_eq!(o.min_arity(), 1);
        assert!(!o.accepts_count(0));
        assert!(o.accepts_count(1));
        assert!(o.accepts_count(3));
        assert!(!o.accepts_count(4));
    }

    #[test]
    fn fallbacks_cover_the_tail_in_order() {
        let o = Overload::function3(|a: i64, b: i64, c: i64| a + b + c)
            .with_default(10_i64)
            .with_default(20_i64);
        assert!(o.fallback(0).is_none());
        assert_eq!(o.fallback(1).unwrap().get::<i64>(), Some(&10));
        assert_eq!(o.fallback(2).unwrap().get::<i64>(), Some(&20));
        assert!(o.fallback(3).is_none());
    }

    #[test]
    fn typed_params() {
        let o = Overload::function2(|a: u8, s: String| s.len() + a as usize);
        assert_eq!(o.params(), &[Param::value::<u8>(), Param::value::<String>()]);
        assert_eq!(o.self_binding(), Binding::Const);
        assert_eq!(Param::write::<u8>().binding(), Binding::Lvalue);
        assert_eq!(Param::owned::<u8>().binding(), Binding::Rvalue);
    }

    #[test]
    fn typed_bodies_take_their_arguments() {
        let o = Overload::function2(|a: i64, b: i64| a * b);
        let mut this = Ref::owned(Function::from(o.clone()));
        let out = run(&o, &mut this, vec![Ref::owned(6_i64), Ref::owned(7_i64)]).unwrap();
        assert_eq!(out.into_ref().unwrap().get::<i64>(), Some(&42));
    }

    #[test]
    fn unit_results_are_nothing() {
        let o = Overload::function1(|_: i64| ());
        let mut this = Ref::empty();
        let out = run(&o, &mut this, vec![Ref::owned(1_i64)]).unwrap();
        assert!(matches!(out, Returned::Nothing));
    }

    #[test]
    fn missing_arguments_raise() {
        let o = Overload::function1(|x: i64| x);
        let mut this = Ref::empty();
        let err = run(&o, &mut this, vec![Ref::owned(1_u8)]).unwrap_err();
        assert!(err.to_string().contains("no argument 0"));
    }

    #[test]
    fn references_into_self() {
        let first = Overload::new(vec![], |frame| {
            let v = frame.leak_this::<Vec<i64>>()?;
            Ok(Returned::read(&v[0]))
        });
        let items = vec![3_i64, 4];
        let mut this = Ref::read(&items);
        let out = run(&first, &mut this, vec![]).unwrap();
        let r = out.into_ref().unwrap();
        assert_eq!(r.qualifier(), Some(Qualifier::Read));
        assert_eq!(r.get::<i64>(), Some(&3));

        let mut owned = Ref::owned(vec![1_i64]);
        assert!(run(&first, &mut owned, vec![]).is_err());
    }

    #[test]
    fn mutable_references_into_self() {
        let last = Overload::new(vec![], |frame| {
            let v = frame.leak_this_mut::<Vec<i64>>()?;
            match v.last_mut() {
                Some(x) => Ok(Returned::write(x)),
                None => Err(Exception::msg("empty")),
            }
        })
        .on_self(Binding::Lvalue);
        let mut items = vec![3_i64, 4];
        {
            let mut this = Ref::write(&mut items);
            let out = run(&last, &mut this, vec![]).unwrap();
            *out.into_ref().unwrap().get_mut::<i64>().unwrap() = 9;
        }
        assert_eq!(items, vec![3, 9]);

        let mut empty: Vec<i64> = Vec::new();
        let mut this = Ref::write(&mut empty);
        assert_eq!(run(&last, &mut this, vec![]).unwrap_err().to_string(), "empty");
    }

    #[test]
    fn functions_share_overloads() {
        let f = Function::new(vec![
            Overload::function0(|| 1_i64),
            Overload::function1(|x: i64| x),
        ]);
        let g = f.clone();
        assert_eq!(g.overloads().len(), 2);
        assert!(Arc::ptr_eq(&f.shared(), &g.shared()));
    }
}
