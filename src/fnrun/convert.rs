//! Primitive conversion service.
//!
//! A table keyed by [`TypeId`] mapping each known "simple" type to a parse and a render
//! function. Whether a type has an entry here is what decides, at runtime, that a payload is
//! converted as a plain value rather than decoded through a codec.

use crate::error::{FnError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

type ParseFn = Box<dyn Fn(&str) -> Option<Box<dyn Any>> + Send + Sync>;
type RenderFn = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

struct Converter {
    type_name: &'static str,
    parse: ParseFn,
    render: RenderFn,
}

pub struct ConversionService {
    converters: HashMap<TypeId, Converter>,
}

macro_rules! register_primitives {
    ($service:expr, $($ty:ty),+ $(,)?) => {
        $( $service.register::<$ty>(); )+
    };
}

impl Default for ConversionService {
    fn default() -> Self {
        let mut service = Self::empty();
        register_primitives!(
            service, String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
            usize, f32, f64,
        );
        service
    }
}

impl ConversionService {
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registers `T` using its `FromStr` and `Display` implementations.
    pub fn register<T>(&mut self)
    where
        T: FromStr + Display + Any,
    {
        self.register_with::<T, _, _>(|s| s.parse::<T>().ok(), |v| v.to_string());
    }

    pub fn register_with<T, P, R>(&mut self, parse: P, render: R)
    where
        T: Any,
        P: Fn(&str) -> Option<T> + Send + Sync + 'static,
        R: Fn(&T) -> String + Send + Sync + 'static,
    {
        let converter = Converter {
            type_name: std::any::type_name::<T>(),
            parse: Box::new(move |s| parse(s).map(|v| Box::new(v) as Box<dyn Any>)),
            render: Box::new(move |v| v.downcast_ref::<T>().map(&render)),
        };
        self.converters.insert(TypeId::of::<T>(), converter);
    }

    pub fn can_convert<T: Any>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// Converts `data` into `T`.
    pub fn convert<T: Any>(&self, data: &str) -> Result<T> {
        let converter = self.converters.get(&TypeId::of::<T>()).ok_or_else(|| {
            FnError::unconvertible::<T>(data, Some("no converter registered".to_string()))
        })?;

        (converter.parse)(data)
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
            .ok_or_else(|| {
                FnError::unconvertible::<T>(
                    data,
                    Some(format!("not a valid {}", converter.type_name)),
                )
            })
    }

    /// Textual form of `value`, or `None` when `T` has no converter.
    pub fn render<T: Any>(&self, value: &T) -> Option<String> {
        let converter = self.converters.get(&TypeId::of::<T>())?;
        (converter.render)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn converts_primitives() {
        let service = ConversionService::default();
        assert_eq!(service.convert::<i64>("42").unwrap(), 42);
        assert_eq!(service.convert::<u8>("255").unwrap(), 255);
        assert!(service.convert::<bool>("true").unwrap());
        assert_eq!(service.convert::<char>("x").unwrap(), 'x');
        assert_eq!(service.convert::<f64>("1.5").unwrap(), 1.5);
        assert_eq!(service.convert::<String>("{\"x\":1}").unwrap(), "{\"x\":1}");
    }

    #[test]
    fn conversion_failure_is_unconvertible() {
        let service = ConversionService::default();
        let err = service.convert::<i32>("notanumber").unwrap_err();
        match err {
            FnError::Unconvertible { data, target, reason } => {
                assert_eq!(data, "notanumber");
                assert_eq!(target, "i32");
                assert_eq!(reason.as_deref(), Some("not a valid i32"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(service.convert::<u8>("256").is_err());
        assert!(service.convert::<bool>("yes").is_err());
    }

    #[test]
    fn unknown_types_are_not_convertible() {
        let service = ConversionService::default();
        assert!(!service.can_convert::<Vec<i32>>());
        assert!(service.convert::<Vec<i32>>("[1]").is_err());
        assert_eq!(service.render(&vec![1]), None);
    }

    #[test]
    fn integers_and_booleans_round_trip_through_text() {
        let service = ConversionService::default();
        for payload in ["0", "-17", "42", "9223372036854775807"] {
            let value: i64 = service.convert(payload).unwrap();
            assert_eq!(service.render(&value).as_deref(), Some(payload));
        }
        for payload in ["true", "false"] {
            let value: bool = service.convert(payload).unwrap();
            assert_eq!(service.render(&value).as_deref(), Some(payload));
        }
    }

    #[test]
    fn custom_types_can_be_registered() {
        let mut service = ConversionService::default();
        assert!(!service.can_convert::<Ipv4Addr>());
        service.register::<Ipv4Addr>();
        let addr: Ipv4Addr = service.convert("10.0.0.1").unwrap();
        assert_eq!(addr, Ipv4Addr::new(10, 0, 0, 1));
    }
}
