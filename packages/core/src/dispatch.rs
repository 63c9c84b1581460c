//! Overload resolution and the status-coded calling convention.
//!
//! A call names a self `Ref`, an optional method, a `Target` for the result
//! and an argument array. Candidates are narrowed in order: by arity window
//! (`WrongNumber`), by self binding (`Impossible`), then by binding every
//! argument (`WrongType`). The first candidate that binds runs.

use std::sync::Arc;

use rebind_ll::{Binding, Index, LoadStatus, Status};

use crate::call::{Frame, Function, Overload, Returned};
use crate::error::Error;
use crate::exception::Exception;
use crate::reference::Ref;
use crate::registry::Registry;
use crate::target::Target;

/// How one argument reaches the body.
enum Plan {
    Borrow,
    BorrowMut,
    Move,
    Owned(Ref<'static>),
}

/// Why a candidate did not bind.
enum Unbound {
    Mismatch,
    Raised(Exception),
    OutOfMemory,
}

/// Build the argument list for the body from the caller's array.
fn apply<'r, 'a>(args: &'r mut [Ref<'a>], plans: Vec<Plan>) -> Vec<Ref<'r>> {
    let mut bound: Vec<Ref<'r>> = Vec::with_capacity(plans.len());
    let mut plans = plans.into_iter();
    for (arg, plan) in args.iter_mut().zip(plans.by_ref()) {
        bound.push(match plan {
            Plan::Borrow => arg.reborrow(),
            Plan::BorrowMut => arg.reborrow_mut(),
            Plan::Move => std::mem::take(arg),
            Plan::Owned(value) => value,
        });
    }
    bound.extend(plans.filter_map(|plan| match plan {
        Plan::Owned(value) => Some(value),
        Plan::Borrow | Plan::BorrowMut | Plan::Move => None,
    }));
    bound
}

impl Registry {
    /// Call `this` with `args`, writing the result into `target`.
    ///
    /// A `Function` self runs its own overloads; any other self runs the
    /// call table registered for its type.
    pub fn dispatch<'a>(
        &self,
        this: Ref<'a>,
        target: &mut Target<'a>,
        args: &mut [Ref<'a>],
    ) -> Status {
        let function: Option<Arc<[Overload]>> = this.get::<Function>().map(Function::shared);
        let overloads: &[Overload] = match &function {
            Some(shared) => &shared[..],
            None => match self.table(this.index()) {
                Some(table) => table.call.as_slice(),
                None => &[],
            },
        };
        self.resolve(this, overloads, target, args)
    }

    /// Call the method `name` of `this`.
    pub fn dispatch_method<'a>(
        &self,
        this: Ref<'a>,
        name: &str,
        target: &mut Target<'a>,
        args: &mut [Ref<'a>],
    ) -> Status {
        let overloads = self
            .table(this.index())
            .and_then(|table| table.methods.get(name));
        match overloads {
            Some(overloads) => self.resolve(this, overloads, target, args),
            None => {
                tracing::debug!(this = %this.index(), method = name, "no such method");
                Status::Impossible
            }
        }
    }

    fn resolve<'a>(
        &self,
        this: Ref<'a>,
        overloads: &[Overload],
        target: &mut Target<'a>,
        args: &mut [Ref<'a>],
    ) -> Status {
        let index = this.index();
        let given = args.len();
        if overloads.is_empty() {
            tracing::debug!(this = %index, "nothing to call");
            return Status::Impossible;
        }

        let counted: Vec<&Overload> = overloads
            .iter()
            .filter(|o| o.accepts_count(given))
            .collect();
        if counted.is_empty() {
            tracing::debug!(this = %index, given, "no overload takes this many arguments");
            return Status::WrongNumber;
        }

        let Some(q) = this.qualifier() else {
            return Status::Impossible;
        };
        let copyable = self.is_copyable(index);
        let candidates: Vec<&Overload> = counted
            .into_iter()
            .filter(|o| o.self_binding().accepts(q, copyable))
            .collect();
        if candidates.is_empty() {
            tracing::debug!(this = %index, qualifier = %q, "no overload accepts this self");
            return Status::Impossible;
        }

        for overload in candidates {
            match self.bind(overload, args) {
                Ok(plans) => return self.invoke(overload, this, plans, target, args),
                Err(Unbound::Mismatch) => continue,
                Err(Unbound::Raised(e)) => {
                    target.set_exception(e);
                    return Status::Exception;
                }
                Err(Unbound::OutOfMemory) => return Status::OutOfMemory,
            }
        }
        tracing::debug!(this = %index, given, "no overload binds these arguments");
        Status::WrongType
    }

    /// Decide how every parameter of `overload` is fed, without touching
    /// the arguments.
    fn bind(&self, overload: &Overload, args: &[Ref<'_>]) -> Result<Vec<Plan>, Unbound> {
        let mut plans = Vec::with_capacity(overload.arity());
        for (param, arg) in overload.params().iter().zip(args) {
            plans.push(self.bind_one(param.index(), param.binding(), arg)?);
        }
        for (position, param) in overload.params().iter().enumerate().skip(args.len()) {
            let fallback = overload.fallback(position).ok_or(Unbound::Mismatch)?;
            if fallback.index() == param.index() {
                plans.push(Plan::Owned(fallback));
            } else {
                plans.push(Plan::Owned(self.load_owned(fallback, param.index())?));
            }
        }
        Ok(plans)
    }

    fn bind_one(&self, index: Index, binding: Binding, arg: &Ref<'_>) -> Result<Plan, Unbound> {
        let Some(q) = arg.qualifier() else {
            return Err(Unbound::Mismatch);
        };
        if arg.index() == index {
            if !binding.accepts(q, self.is_copyable(index)) {
                return Err(Unbound::Mismatch);
            }
            return Ok(match binding {
                Binding::Const => Plan::Borrow,
                Binding::Lvalue => Plan::BorrowMut,
                Binding::Rvalue => Plan::Move,
                Binding::Value if q.is_owned() => Plan::Move,
                Binding::Value => Plan::Owned(self.copy(arg).ok_or(Unbound::Mismatch)?),
            });
        }
        match binding {
            Binding::Value | Binding::Const => self.load_owned(arg.reborrow(), index).map(Plan::Owned),
            Binding::Lvalue | Binding::Rvalue => Err(Unbound::Mismatch),
        }
    }

    fn load_owned(&self, source: Ref<'_>, index: Index) -> Result<Ref<'static>, Unbound> {
        let mut target = self.owned_target(index);
        match self.convert(source, &mut target) {
            LoadStatus::Stack | LoadStatus::Heap => {
                target.take().into_static().map_err(|_| Unbound::Mismatch)
            }
            LoadStatus::Exception => Err(target
                .take_exception()
                .map_or(Unbound::Mismatch, Unbound::Raised)),
            LoadStatus::OutOfMemory => Err(Unbound::OutOfMemory),
            LoadStatus::None | LoadStatus::Mutable | LoadStatus::Const => Err(Unbound::Mismatch),
        }
    }

    fn invoke<'a>(
        &self,
        overload: &Overload,
        mut this: Ref<'a>,
        plans: Vec<Plan>,
        target: &mut Target<'a>,
        args: &mut [Ref<'a>],
    ) -> Status {
        let index = this.index();
        let result = {
            let mut frame = Frame::new(self, &mut this, apply(args, plans));
            (overload.body())(&mut frame)
        };
        let status = self.write_return(result, target);
        tracing::debug!(this = %index, %status, "dispatched");
        status
    }

    fn write_return<'a>(
        &self,
        result: Result<Returned<'a>, Exception>,
        target: &mut Target<'a>,
    ) -> Status {
        let returned = match result {
            Ok(returned) => returned,
            Err(e) if e.is_out_of_memory() => return Status::OutOfMemory,
            Err(e) => {
                target.set_exception(e);
                return Status::Exception;
            }
        };
        if target.is_void() {
            return Status::None;
        }
        match returned.into_ref() {
            None if target.index().is_none() => Status::None,
            None => Status::WrongReturn,
            Some(r) => self.convert(r, target).into_status(),
        }
    }

    /// Call and return an owned `T`; every non-success status is an error.
    ///
    /// `T = ()` calls for effect only.
    pub fn call<'a, T: 'static>(
        &self,
        this: Ref<'a>,
        method: Option<&str>,
        args: &mut [Ref<'a>],
    ) -> Result<T, Error> {
        let name = this.name();
        let given = args.len();
        let mut target = Target::of::<T>();
        let status = self.run(this, method, &mut target, args);
        match status {
            Status::Stack | Status::Heap => target.take_value::<T>().ok_or(Error::WrongReturn {
                expected: target.name(),
            }),
            // Only a void target reports `None` here.
            Status::None => Ref::owned(()).take::<T>().ok_or(Error::WrongReturn {
                expected: target.name(),
            }),
            status => Err(Error::from_status(status, &mut target, name, given)),
        }
    }

    /// Like `call`, but shape mismatches are `Ok(None)`.
    pub fn get<'a, T: 'static>(
        &self,
        this: Ref<'a>,
        method: Option<&str>,
        args: &mut [Ref<'a>],
    ) -> Result<Option<T>, Error> {
        match self.call::<T>(this, method, args) {
            Ok(value) => Ok(Some(value)),
            Err(
                Error::Impossible { .. }
                | Error::WrongNumber { .. }
                | Error::WrongType { .. }
                | Error::WrongReturn { .. },
            ) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Call and discard any result.
    pub fn call_void<'a>(
        &self,
        this: Ref<'a>,
        method: Option<&str>,
        args: &mut [Ref<'a>],
    ) -> Result<(), Error> {
        let name = this.name();
        let given = args.len();
        let mut target = Target::none();
        match self.run(this, method, &mut target, args) {
            Status::None => Ok(()),
            status => Err(Error::from_status(status, &mut target, name, given)),
        }
    }

    fn run<'a>(
        &self,
        this: Ref<'a>,
        method: Option<&str>,
        target: &mut Target<'a>,
        args: &mut [Ref<'a>],
    ) -> Status {
        match method {
            Some(name) => self.dispatch_method(this, name, target, args),
            None => self.dispatch(this, target, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Param;
    use rebind_ll::{Qualifier, Strategies};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        hits: i64,
    }

    fn registry() -> Registry {
        Registry::builder()
            .with_builtins()
            .register::<Counter>()
            .call::<Counter>(Overload::function0(|| String::from("counter")))
            .method::<Counter>(
                "hits",
                Overload::new(vec![], |frame| {
                    Ok(Returned::value(frame.this::<Counter>()?.hits))
                }),
            )
            .method::<Counter>(
                "bump",
                Overload::new(vec![Param::value::<i64>()], |frame| {
                    let by = frame.take::<i64>(0)?;
                    frame.this_mut::<Counter>()?.hits += by;
                    Ok(Returned::Nothing)
                })
                .with_default(1_i64)
                .on_self(Binding::Lvalue),
            )
            .method::<Counter>(
                "hits_ref",
                Overload::new(vec![], |frame| {
                    Ok(Returned::read(&frame.leak_this::<Counter>()?.hits))
                }),
            )
            .method::<Counter>(
                "fail",
                Overload::new(vec![], |_| Err(Exception::msg("counter jammed"))),
            )
            .method::<Counter>(
                "oom",
                Overload::new(vec![], |_| Err(Exception::out_of_memory())),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn call_table() {
        let r = registry();
        let c = Counter { hits: 0 };
        let s: String = r.call(Ref::read(&c), None, &mut []).unwrap();
        assert_eq!(s, "counter");
    }

    #[test]
    fn methods_see_self() {
        let r = registry();
        let mut c = Counter { hits: 2 };
        r.call_void(Ref::write(&mut c), Some("bump"), &mut [Ref::owned(3_i64)])
            .unwrap();
        r.call_void(Ref::write(&mut c), Some("bump"), &mut []).unwrap();
        assert_eq!(c.hits, 6);
        let hits: i64 = r.call(Ref::read(&c), Some("hits"), &mut []).unwrap();
        assert_eq!(hits, 6);
    }

    #[test]
    fn const_self_cannot_mutate() {
        let r = registry();
        let c = Counter { hits: 0 };
        let mut t = Target::none();
        let status = r.dispatch_method(Ref::read(&c), "bump", &mut t, &mut []);
        assert_eq!(status, Status::Impossible);
    }

    #[test]
    fn unknown_methods_and_tables_are_impossible() {
        let r = registry();
        let c = Counter { hits: 0 };
        let mut t = Target::none();
        assert_eq!(
            r.dispatch_method(Ref::read(&c), "nope", &mut t, &mut []),
            Status::Impossible
        );
        assert_eq!(
            r.dispatch(Ref::owned(1_u8), &mut t, &mut []),
            Status::Impossible
        );
        assert_eq!(
            r.dispatch(Ref::empty(), &mut t, &mut []),
            Status::Impossible
        );
    }

    #[test]
    fn arguments_convert_to_value_params() {
        let r = registry();
        let mut c = Counter { hits: 0 };
        r.call_void(Ref::write(&mut c), Some("bump"), &mut [Ref::owned(4_u8)])
            .unwrap();
        let x = 2.0_f64;
        r.call_void(Ref::write(&mut c), Some("bump"), &mut [Ref::read(&x)])
            .unwrap();
        assert_eq!(c.hits, 6);

        let mut t = Target::none();
        let status = r.dispatch_method(
            Ref::write(&mut c),
            "bump",
            &mut t,
            &mut [Ref::owned(String::from("x"))],
        );
        assert_eq!(status, Status::WrongType);
    }

    #[test]
    fn results_follow_the_target() {
        let r = registry();
        let c = Counter { hits: 7 };

        let mut t = Target::new(Some(Index::of::<i64>()), 0, Strategies::READ);
        let status = r.dispatch_method(Ref::read(&c), "hits_ref", &mut t, &mut []);
        assert_eq!(status, Status::Read);
        assert_eq!(t.get::<i64>(), Some(&7));

        let mut t = Target::of::<f64>();
        let status = r.dispatch_method(Ref::read(&c), "hits", &mut t, &mut []);
        assert_eq!(status, Status::Stack);
        assert_eq!(t.get::<f64>(), Some(&7.0));

        let mut t = Target::of::<Counter>();
        let status = r.dispatch_method(Ref::read(&c), "hits", &mut t, &mut []);
        assert_eq!(status, Status::WrongReturn);

        let mut t = Target::of::<i64>();
        let mut c = Counter { hits: 0 };
        let status = r.dispatch_method(Ref::write(&mut c), "bump", &mut t, &mut []);
        assert_eq!(status, Status::WrongReturn);
    }

    #[test]
    fn exceptions_and_oom() {
        let r = registry();
        let c = Counter { hits: 0 };
        let mut t = Target::of::<i64>();
        let status = r.dispatch_method(Ref::read(&c), "fail", &mut t, &mut []);
        assert_eq!(status, Status::Exception);
        assert_eq!(t.take_exception().unwrap().to_string(), "counter jammed");

        let mut t = Target::of::<i64>();
        let status = r.dispatch_method(Ref::read(&c), "oom", &mut t, &mut []);
        assert_eq!(status, Status::OutOfMemory);
        assert!(t.exception().is_none());

        let err = r
            .call::<i64>(Ref::read(&c), Some("fail"), &mut [])
            .unwrap_err();
        assert_eq!(err.to_string(), "counter jammed");
    }

    #[test]
    fn get_tolerates_mismatches() {
        let r = registry();
        let c = Counter { hits: 3 };
        assert_eq!(r.get::<i64>(Ref::read(&c), Some("hits"), &mut []).unwrap(), Some(3));
        assert_eq!(r.get::<i64>(Ref::read(&c), Some("nope"), &mut []).unwrap(), None);
        assert_eq!(
            r.get::<i64>(Ref::read(&c), Some("hits"), &mut [Ref::owned(1_i64)])
                .unwrap(),
            None
        );
        assert!(r.get::<i64>(Ref::read(&c), Some("fail"), &mut []).is_err());
    }

    #[test]
    fn function_values_are_callable() {
        let r = registry();
        let f = Function::new(vec![
            Overload::function1(|x: i64| x * 2),
            Overload::function2(|a: String, b: String| a + &b),
        ]);
        let doubled: i64 = r.call(Ref::read(&f), None, &mut [Ref::owned(21_i64)]).unwrap();
        assert_eq!(doubled, 42);
        let joined: String = r
            .call(
                Ref::owned(f.clone()),
                None,
                &mut [Ref::owned(String::from("a")), Ref::owned(String::from("b"))],
            )
            .unwrap();
        assert_eq!(joined, "ab");
        let err = r
            .call::<i64>(Ref::read(&f), None, &mut [])
            .unwrap_err();
        assert!(matches!(err, Error::WrongNumber { given: 0, .. }));
    }

    #[test]
    fn owned_arguments_move_and_borrows_stay() {
        struct Drops(Rc<Cell<usize>>);
        impl Drop for Drops {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let r = Registry::builder()
            .register_opaque::<Drops>()
            .call::<()>(Overload::new(vec![Param::owned::<Drops>()], |frame| {
                let _taken = frame.take::<Drops>(0)?;
                Ok(Returned::Nothing)
            }))
            .call::<()>(Overload::new(vec![Param::read::<Drops>()], |frame| {
                frame.arg::<Drops>(0)?;
                Ok(Returned::Nothing)
            }))
            .build()
            .unwrap();

        let drops = Rc::new(Cell::new(0));
        let mut args = [Ref::owned(Drops(drops.clone()))];
        r.call_void(Ref::owned(()), None, &mut args).unwrap();
        assert_eq!(drops.get(), 1);
        assert!(!args[0].has_value());

        let kept = Drops(drops.clone());
        let mut args = [Ref::read(&kept)];
        r.call_void(Ref::owned(()), None, &mut args).unwrap();
        assert_eq!(args[0].qualifier(), Some(Qualifier::Read));
        assert_eq!(drops.get(), 1);
    }
}
