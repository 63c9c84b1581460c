use std::cell::Cell;
use std::rc::Rc;

use rebind_core::{Binding, Exception, LockKind, Overload, Param, Ref, Registry, Returned};
use rebind_host::{
    call_object, call_to_variable, json, HostError, Object, Projection, TupleLock, Variable,
    VariableState,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Account {
    owner: String,
    balance: i64,
}

fn balance() -> Projection {
    Projection::new(
        |a: &Account| Some(&a.balance),
        |a: &mut Account| Some(&mut a.balance),
    )
}

fn registry() -> Registry {
    json::register_serde::<Account>(json::install(Registry::builder().with_builtins()))
        .call::<Account>(Overload::function2(|owner: String, balance: i64| Account {
            owner,
            balance,
        }))
        .method::<Account>(
            "deposit",
            Overload::new(vec![Param::value::<i64>()], |frame| {
                let amount = frame.take::<i64>(0)?;
                if amount < 0 {
                    return Err(Exception::msg("negative deposit"));
                }
                let account = frame.this_mut::<Account>()?;
                account.balance += amount;
                Ok(Returned::value(account.balance))
            })
            .on_self(Binding::Lvalue),
        )
        .build()
        .unwrap()
}

#[test]
fn test_readers_exclude_writer() {
    let v = Variable::from_ref(Ref::owned(5_i64)).unwrap();
    let first = v.acquire(LockKind::Read).unwrap();
    let second = v.acquire(LockKind::Read).unwrap();
    assert_eq!(v.use_count(), 2);

    let err = v.acquire(LockKind::Write).unwrap_err();
    assert!(err.is_busy());
    assert_eq!(err.to_string(), "cannot mutate object which is already referenced");

    drop(first);
    drop(second);
    assert_eq!(v.use_count(), 0);
    let _w = v.acquire(LockKind::Write).unwrap();
    assert_eq!(v.use_count(), -1);
}

#[test]
fn test_lock_returns_to_free_on_every_path() {
    let r = registry();
    let account = Rc::new(Variable::owned(Account {
        owner: "ann".into(),
        balance: 0,
    }));
    let mut this = Object::from(account.clone());

    let out = call_object(&r, &mut this, Some("deposit"), &mut [Object::from(json!(10))], "w")
        .unwrap();
    assert_eq!(out.load::<i64>(&r).unwrap(), Some(10));
    assert_eq!(account.use_count(), 0);

    let err = call_object(&r, &mut this, Some("deposit"), &mut [Object::from(json!(-1))], "w")
        .unwrap_err();
    assert_eq!(err.to_string(), "negative deposit");
    assert_eq!(account.use_count(), 0);

    let err = call_object(&r, &mut this, Some("deposit"), &mut [], "w").unwrap_err();
    assert!(matches!(err, HostError::Type(_)));
    assert_eq!(account.use_count(), 0);
}

#[test]
fn test_views_share_the_root_lock() {
    let root = Rc::new(Variable::owned(Account {
        owner: "bo".into(),
        balance: 3,
    }));
    let view = Rc::new(Variable::view(&root, balance()).unwrap());
    assert_eq!(view.state(), VariableState::HeapAlias);

    let held = view.acquire(LockKind::Write).unwrap();
    assert_eq!(root.use_count(), -1);
    assert!(root.acquire(LockKind::Read).unwrap_err().is_busy());
    drop(held);

    let r = registry();
    let mut args = [Object::from(view.clone())];
    let mut lock = TupleLock::new(&mut args, "r").unwrap();
    assert_eq!(root.use_count(), 1);
    let mut refs = lock.refs();
    let exported = json::export(&r, refs.remove(0)).unwrap();
    assert_eq!(exported, json!(3));
}

struct Tracked(Rc<Cell<usize>>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_payload_dropped_exactly_once() {
    let drops = Rc::new(Cell::new(0));
    let root = Rc::new(Variable::owned((Tracked(drops.clone()), 1_u8)));
    let views: Vec<Variable> = (0..3)
        .map(|_| {
            Variable::view(
                &root,
                Projection::new(
                    |t: &(Tracked, u8)| Some(&t.1),
                    |t: &mut (Tracked, u8)| Some(&mut t.1),
                ),
            )
            .unwrap()
        })
        .collect();
    drop(views);
    assert_eq!(drops.get(), 0);
    drop(root);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_tuple_lock_unwinds_partial_acquisition() {
    let a = Rc::new(Variable::owned(1_i64));
    let b = Rc::new(Variable::owned(2_i64));
    let mut args = [
        Object::from(a.clone()),
        Object::from(json!("free")),
        Object::from(b.clone()),
    ];
    let blocker = b.acquire(LockKind::Read).unwrap();
    assert!(TupleLock::new(&mut args, "wrw").is_err());
    assert_eq!(a.use_count(), 0);
    assert_eq!(b.use_count(), 1);
    drop(blocker);
    assert!(TupleLock::new(&mut args, "wrw").is_ok());
}

#[test]
fn test_constructor_through_json_arguments() {
    let r = registry();
    let out = Variable::new();
    let template = Account {
        owner: String::new(),
        balance: 0,
    };
    let mut args = [json::import(json!("cy")), json::import(json!(40))];
    call_to_variable(&r, &out, Ref::read(&template), None, &mut args).unwrap();
    assert!(out.index().equals::<Account>());
    let acquired = out.acquire(LockKind::Read).unwrap();
    assert_eq!(
        acquired.get::<Account>(),
        Some(&Account {
            owner: "cy".into(),
            balance: 40
        })
    );
    drop(acquired);

    let mut acquired = out.acquire(LockKind::Read).unwrap();
    let exported = json::export(&r, acquired.to_ref()).unwrap();
    assert_eq!(exported, json!({"owner": "cy", "balance": 40}));
}

#[test]
fn test_repopulating_drops_the_old_value() {
    let drops = Rc::new(Cell::new(0));
    let v = Variable::owned(Tracked(drops.clone()));
    v.populate(Ref::owned(Tracked(drops.clone()))).unwrap();
    assert_eq!(drops.get(), 1);
    v.reset().unwrap();
    assert_eq!(drops.get(), 2);
    assert!(!v.has_value());
}

#[test]
fn test_aliased_write_is_busy() {
    let v = Rc::new(Variable::owned(5_i64));
    let held = v.acquire(LockKind::Write).unwrap();
    assert!(v.acquire(LockKind::Read).unwrap_err().is_busy());
    assert!(v.index().equals::<i64>());
    drop(held);

    let mut args = [Object::from(v.clone()), Object::from(v.clone())];
    let err = TupleLock::new(&mut args, "wr").err().unwrap();
    assert!(err.is_busy());
    assert_eq!(v.use_count(), 0);
}
