use rebind_core::{
    Binding, Error, Exception, Function, Index, LoadStatus, Overload, Param, Qualifier, Ref,
    Registry, RegistryConfig, Returned, Status, Strategies, Target, DEFAULT_INLINE_CAPACITY,
};

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct Pair(i64, i64);

#[derive(Debug, Clone, PartialEq)]
struct Label(String);

fn registry() -> Registry {
    Registry::builder()
        .with_builtins()
        .register::<Point>()
        .register::<Pair>()
        .register::<Label>()
        .dump(|p: &Point| Some(Pair(p.x, p.y)))
        .load(|p: &Point| Some(Label(format!("({}, {})", p.x, p.y))))
        .call::<Point>(
            Overload::function2(|x: i64, y: i64| Point { x, y }).with_default(0_i64),
        )
        .method::<Point>(
            "translate",
            Overload::new(vec![Param::value::<i64>(), Param::value::<i64>()], |frame| {
                let dx = frame.take::<i64>(0)?;
                let dy = frame.take::<i64>(1)?;
                let p = frame.this_mut::<Point>()?;
                p.x += dx;
                p.y += dy;
                Ok(Returned::Nothing)
            })
            .on_self(Binding::Lvalue),
        )
        .method::<Point>(
            "divide",
            Overload::function1(|by: i64| by).with_default(1_i64),
        )
        .method::<Point>(
            "ratio",
            Overload::new(vec![], |frame| {
                let p = frame.this::<Point>()?;
                if p.y == 0 {
                    return Err(Exception::msg("division by zero"));
                }
                Ok(Returned::value(p.x / p.y))
            }),
        )
        .build()
        .unwrap()
}

#[test]
fn test_optional_trailing_argument() {
    let r = registry();
    let origin = Point { x: 0, y: 0 };

    let mut t = Target::of::<Point>();
    let status = r.dispatch(Ref::read(&origin), &mut t, &mut [Ref::owned(5_i64)]);
    assert_eq!(status, Status::Stack);
    assert_eq!(t.get::<Point>(), Some(&Point { x: 5, y: 0 }));

    let mut t = Target::of::<Point>();
    let status = r.dispatch(
        Ref::read(&origin),
        &mut t,
        &mut [Ref::owned(5_i64), Ref::owned(6_i64)],
    );
    assert_eq!(status, Status::Stack);
    assert_eq!(t.get::<Point>(), Some(&Point { x: 5, y: 6 }));

    let mut t = Target::of::<Point>();
    assert_eq!(
        r.dispatch(Ref::read(&origin), &mut t, &mut []),
        Status::WrongNumber
    );
    let mut three = [Ref::owned(1_i64), Ref::owned(2_i64), Ref::owned(3_i64)];
    assert_eq!(
        r.dispatch(Ref::read(&origin), &mut t, &mut three),
        Status::WrongNumber
    );
    assert!(!t.has_value());
}

#[test]
fn test_integer_into_stack_only_float() {
    let r = registry();
    let mut t = Target::new(
        Some(Index::of::<f64>()),
        DEFAULT_INLINE_CAPACITY,
        Strategies::STACK,
    );
    assert_eq!(r.convert(Ref::owned(42_i64), &mut t), LoadStatus::Stack);
    assert_eq!(t.landed(), Some(Qualifier::Stack));
    assert_eq!(t.take_value::<f64>(), Some(42.0));
}

#[test]
fn test_const_self_against_mutating_overload() {
    let r = registry();
    let p = Point { x: 1, y: 1 };
    let mut t = Target::none();
    let status = r.dispatch_method(
        Ref::read(&p),
        "translate",
        &mut t,
        &mut [Ref::owned(1_i64), Ref::owned(1_i64)],
    );
    assert_eq!(status, Status::Impossible);

    let mut p = Point { x: 1, y: 1 };
    let status = r.dispatch_method(
        Ref::write(&mut p),
        "translate",
        &mut t,
        &mut [Ref::owned(2_i64), Ref::owned(3_i64)],
    );
    assert_eq!(status, Status::None);
    assert_eq!(p, Point { x: 3, y: 4 });
}

#[test]
fn test_exception_message_is_preserved() {
    let r = registry();
    let p = Point { x: 1, y: 0 };
    let mut t = Target::of::<i64>();
    let status = r.dispatch_method(Ref::read(&p), "ratio", &mut t, &mut []);
    assert_eq!(status, Status::Exception);
    assert!(!t.has_value());

    let err = Error::from_status(status, &mut t, "Point", 0);
    assert_eq!(err.to_string(), "division by zero");

    let err = r.call::<i64>(Ref::read(&p), Some("ratio"), &mut []).unwrap_err();
    assert!(matches!(err, Error::Exception(_)));
    assert_eq!(err.to_string(), "division by zero");
}

#[test]
fn test_dump_then_load_fallback() {
    let r = registry();
    let p = Point { x: 2, y: 3 };

    let mut pair = Target::of::<Pair>();
    assert_eq!(r.convert(Ref::read(&p), &mut pair), LoadStatus::Stack);
    assert_eq!(pair.get::<Pair>(), Some(&Pair(2, 3)));

    let label = r.load::<Label>(Ref::read(&p)).unwrap();
    assert_eq!(label, Some(Label("(2, 3)".into())));

    let mut back = Target::of::<Point>();
    assert_eq!(
        r.convert(Ref::owned(Label("x".into())), &mut back),
        LoadStatus::None
    );
    assert!(!back.has_value());
}

fn identity<T: Clone + PartialEq + std::fmt::Debug + 'static>(r: &Registry, value: T) {
    let mut t = Target::of::<T>();
    assert!(r.convert(Ref::owned(value.clone()), &mut t).is_success());
    assert_eq!(t.take_value::<T>(), Some(value));
}

#[test]
fn test_numeric_identity_round_trips() {
    let r = registry();
    identity(&r, i8::MIN);
    identity(&r, i16::MAX);
    identity(&r, -123_456_i32);
    identity(&r, i64::MIN);
    identity(&r, i128::MAX);
    identity(&r, -3_isize);
    identity(&r, u8::MAX);
    identity(&r, 60_000_u16);
    identity(&r, u32::MAX);
    identity(&r, u64::MAX);
    identity(&r, u128::MAX);
    identity(&r, 7_usize);
    identity(&r, f32::MAX);
    identity(&r, -0.5_f64);
    identity(&r, true);
}

#[test]
fn test_defaults_are_fixed_at_registration() {
    let r = registry();
    let p = Point { x: 0, y: 0 };
    for _ in 0..3 {
        let by: i64 = r.call(Ref::read(&p), Some("divide"), &mut []).unwrap();
        assert_eq!(by, 1);
    }
    let by: i64 = r
        .call(Ref::read(&p), Some("divide"), &mut [Ref::owned(4_i64)])
        .unwrap();
    assert_eq!(by, 4);
}

#[test]
fn test_first_class_function() {
    let r = registry();
    let f = Function::from(Overload::function2(|a: i64, b: f64| a as f64 * b));
    let out: f64 = r
        .call(
            Ref::owned(f),
            None,
            &mut [Ref::owned(3_u8), Ref::owned(2_i32)],
        )
        .unwrap();
    assert_eq!(out, 6.0);
}

#[test]
fn test_config_without_builtins() {
    let config = RegistryConfig::from_json(r#"{"builtins": false}"#).unwrap();
    let r = Registry::init(config).unwrap();
    assert_eq!(r.load::<f64>(Ref::owned(1_i64)).unwrap(), None);
    assert_eq!(r.load::<i64>(Ref::owned(1_i64)).unwrap(), Some(1));
    r.shutdown();
}
