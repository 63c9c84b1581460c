//! Numeric, boolean and string defaults.
//!
//! Every integral type dumps to `Integer` and then `Float`, and loads through
//! `Integer`. Every floating type dumps to `Float` and then `Integer`, and
//! loads through `Float`. Only the one canonical pair is ever chained through.

use rebind_ll::{Float, Index, Integer};

use crate::registry::RegistryBuilder;

/// Canonical conversions of a primitive number.
trait Number: Copy + Send + Sync + 'static {
    fn to_integer(self) -> Option<Integer>;
    fn to_float(self) -> Option<Float>;
    fn from_integer(i: Integer) -> Option<Self>;
    fn from_float(f: Float) -> Option<Self>;
}

macro_rules! integral {
    ($($t:ty),*) => {
        $(impl Number for $t {
            fn to_integer(self) -> Option<Integer> {
                Integer::try_from(self).ok()
            }

            fn to_float(self) -> Option<Float> {
                Some(self as Float)
            }

            fn from_integer(i: Integer) -> Option<Self> {
                <$t>::try_from(i).ok()
            }

            fn from_float(f: Float) -> Option<Self> {
                Self::from_integer(f.to_integer()?)
            }
        })*
    };
}

macro_rules! floating {
    ($($t:ty),*) => {
        $(impl Number for $t {
            // Truncates toward zero; values outside the `Integer` range
            // (and NaN) have no integer form.
            fn to_integer(self) -> Option<Integer> {
                let f = self as Float;
                (f >= Integer::MIN as Float && f < -(Integer::MIN as Float))
                    .then(|| f as Integer)
            }

            fn to_float(self) -> Option<Float> {
                Some(self as Float)
            }

            fn from_integer(i: Integer) -> Option<Self> {
                Some(i as $t)
            }

            fn from_float(f: Float) -> Option<Self> {
                Some(f as $t)
            }
        })*
    };
}

integral!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
floating!(f32, f64);

fn is<A: 'static, B: 'static>() -> bool {
    Index::of::<A>() == Index::of::<B>()
}

fn integral_type<T: Number>(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = builder.register::<T>();
    let builder = if is::<T, Integer>() {
        builder
    } else {
        builder
            .dump(|x: &T| x.to_integer())
            .load_via(|i: Integer| T::from_integer(i))
    };
    builder.dump(|x: &T| x.to_float())
}

fn floating_type<T: Number>(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = builder.register::<T>();
    let builder = if is::<T, Float>() {
        builder
    } else {
        builder
            .dump(|x: &T| x.to_float())
            .load_via(|f: Float| T::from_float(f))
    };
    builder.dump(|x: &T| x.to_integer())
}

pub(crate) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = [
        integral_type::<i8>,
        integral_type::<i16>,
        integral_type::<i32>,
        integral_type::<i64>,
        integral_type::<i128>,
        integral_type::<isize>,
        integral_type::<u8>,
        integral_type::<u16>,
        integral_type::<u32>,
        integral_type::<u64>,
        integral_type::<u128>,
        integral_type::<usize>,
        floating_type::<f32>,
        floating_type::<f64>,
    ]
    .into_iter()
    .fold(builder, |builder, install| install(builder));

    builder
        .register::<bool>()
        .dump(|b: &bool| Some(Integer::from(*b)))
        .register::<String>()
        .register::<&'static str>()
        .dump(|s: &&'static str| Some(s.to_string()))
        .register::<Vec<u8>>()
}

#[cfg(test)]
mod tests {
    use crate::{Ref, Registry, RegistryConfig, Target};
    use rebind_ll::{LoadStatus, Strategies, DEFAULT_INLINE_CAPACITY};

    fn registry() -> Registry {
        Registry::init(RegistryConfig::default()).unwrap()
    }

    macro_rules! round_trip {
        ($r:expr, $($t:ty => $v:expr),*) => {
            $(assert_eq!($r.load::<$t>(Ref::owned($v as $t)).unwrap(), Some($v as $t));)*
        };
    }

    #[test]
    fn identity_round_trips() {
        let r = registry();
        round_trip!(r,
            i8 => -5, i16 => 300, i32 => -70000, i64 => 1_i64 << 40, i128 => 7,
            isize => -1, u8 => 255, u16 => 65535, u32 => 4_000_000_000_u32,
            u64 => u64::MAX, u128 => 9, usize => 12,
            f32 => 1.5, f64 => -0.25
        );
        assert_eq!(r.load::<bool>(Ref::owned(true)).unwrap(), Some(true));
    }

    #[test]
    fn integer_to_float_lands_inline() {
        let r = registry();
        let mut t = Target::new(
            Some(rebind_ll::Index::of::<f64>()),
            DEFAULT_INLINE_CAPACITY,
            Strategies::STACK,
        );
        assert_eq!(r.convert(Ref::owned(42_i64), &mut t), LoadStatus::Stack);
        assert_eq!(t.get::<f64>(), Some(&42.0));
    }

    #[test]
    fn integral_widening_and_narrowing() {
        let r = registry();
        assert_eq!(r.load::<i64>(Ref::owned(7_u8)).unwrap(), Some(7));
        assert_eq!(r.load::<u16>(Ref::owned(7_i8)).unwrap(), Some(7));
        assert_eq!(r.load::<u8>(Ref::owned(-1_i32)).unwrap(), None);
        assert_eq!(r.load::<i64>(Ref::owned(u64::MAX)).unwrap(), None);
    }

    #[test]
    fn floats_go_through_the_canonical_pair() {
        let r = registry();
        assert_eq!(r.load::<f64>(Ref::owned(2.5_f32)).unwrap(), Some(2.5));
        assert_eq!(r.load::<f32>(Ref::owned(3_i32)).unwrap(), Some(3.0));
        assert_eq!(r.load::<i64>(Ref::owned(-2.9_f64)).unwrap(), Some(-2));
        assert_eq!(r.load::<i64>(Ref::owned(f64::NAN)).unwrap(), None);
    }

    #[test]
    fn out_of_range_floats_do_not_saturate() {
        let r = registry();
        assert_eq!(r.load::<i64>(Ref::owned(1e30_f64)).unwrap(), None);
        assert_eq!(r.load::<i64>(Ref::owned(-1e30_f64)).unwrap(), None);
        assert_eq!(r.load::<i64>(Ref::owned(1e30_f32)).unwrap(), None);
        assert_eq!(r.load::<u8>(Ref::owned(1e30_f64)).unwrap(), None);
        assert_eq!(r.load::<i64>(Ref::owned(f64::INFINITY)).unwrap(), None);
        assert_eq!(
            r.load::<i64>(Ref::owned(-9_223_372_036_854_775_808.0_f64)).unwrap(),
            Some(i64::MIN)
        );
        assert_eq!(r.load::<i64>(Ref::owned(9_223_372_036_854_775_808.0_f64)).unwrap(), None);
    }

    #[test]
    fn bool_and_strings() {
        let r = registry();
        assert_eq!(r.load::<i64>(Ref::owned(true)).unwrap(), Some(1));
        assert_eq!(r.load::<f64>(Ref::owned(false)).unwrap(), None);
        assert_eq!(
            r.load::<String>(Ref::owned("hello")).unwrap().as_deref(),
            Some("hello")
        );
        assert_eq!(r.load::<String>(Ref::owned(1_i64)).unwrap(), None);
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Color {
        Red = 1,
        Green = 2,
    }

    fn color(v: u8) -> Option<Color> {
        match v {
            1 => Some(Color::Red),
            2 => Some(Color::Green),
            _ => None,
        }
    }

    #[test]
    fn enums_use_their_underlying_type() {
        let r = Registry::builder()
            .with_builtins()
            .register_enum(|c: &Color| *c as u8, color)
            .build()
            .unwrap();
        assert_eq!(r.load::<u8>(Ref::owned(Color::Green)).unwrap(), Some(2));
        assert_eq!(r.load::<i64>(Ref::owned(Color::Red)).unwrap(), Some(1));
        assert_eq!(r.load::<Color>(Ref::owned(2_u8)).unwrap(), Some(Color::Green));
        assert_eq!(r.load::<Color>(Ref::owned(1_i32)).unwrap(), Some(Color::Red));
        assert_eq!(r.load::<Color>(Ref::owned(9_i64)).unwrap(), None);
    }
}
