//! Functions hosted by the `fnrun` binary.
//!
//! | name        | input            | output               | media type   |
//! |-------------|------------------|----------------------|--------------|
//! | `echo`      | any JSON value   | the same JSON text   | `application/json` |
//! | `increment` | integer          | integer + 1          | `application/json` |
//! | `greet`     | `{"name": ...}`  | `{"message": ...}`   | `application/json` |
//! | `shout`     | text             | upper-cased text     | `text/plain` |

use fnrun::codec::MediaType;
use fnrun::error::{FnError, Result};
use fnrun::executor::LocalFunction;
use fnrun::exit::Exit;
use fnrun::registry::FunctionRegistry;
use fnrun::FunctionInitializer;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::ffi::OsString;

pub(super) fn registry() -> FunctionRegistry {
    FunctionRegistry::new()
        .with("echo", MediaType::json())
        .with("increment", MediaType::json())
        .with("greet", MediaType::json())
        .with("shout", MediaType::text())
}

/// Runs the built-in called `name`, or returns `None` if there is no such function.
pub(super) fn dispatch(
    name: &str,
    initializer: &FunctionInitializer<'_>,
    argv: Vec<OsString>,
) -> Option<Exit> {
    let exit = match name {
        "echo" => initializer.execute(argv, &LocalFunction::new(echo)),
        "increment" => initializer.execute(argv, &LocalFunction::new(increment)),
        "greet" => initializer.execute(argv, &LocalFunction::new(greet)),
        "shout" => initializer.execute(argv, &LocalFunction::new(shout)),
        _ => return None,
    };
    Some(exit)
}

fn echo(value: Box<RawValue>) -> Result<Box<RawValue>> {
    Ok(value)
}

fn increment(n: i64) -> Result<i64> {
    n.checked_add(1)
        .ok_or_else(|| FnError::function(format!("{} + 1 overflows a 64-bit integer", n)))
}

#[derive(Debug, Deserialize)]
struct GreetRequest {
    name: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct Greeting {
    message: String,
}

fn greet(request: GreetRequest) -> Result<Greeting> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(FnError::function("name must not be empty"));
    }
    Ok(Greeting {
        message: format!("Hello, {}!", name),
    })
}

fn shout(text: String) -> Result<String> {
    Ok(text.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let registry = registry();
        let names: Vec<&str> = registry.names().collect();
        for name in ["echo", "greet", "increment", "shout"] {
            assert!(names.contains(&name), "{} missing", name);
        }
        assert_eq!(registry.media_type_for("shout"), MediaType::text());
    }

    #[test]
    fn echo_returns_json_text_unchanged() {
        let payload = r#"{"b":18446744073709551616,"a":[1.50,true]}"#;
        let value: Box<RawValue> = serde_json::from_str(payload).unwrap();
        assert_eq!(echo(value).unwrap().get(), payload);
    }

    #[test]
    fn increment_adds_one() {
        assert_eq!(increment(41).unwrap(), 42);
        assert!(matches!(increment(i64::MAX), Err(FnError::Function(_))));
    }

    #[test]
    fn greet_rejects_blank_names() {
        let greeting = greet(GreetRequest {
            name: " Ada ".into(),
        })
        .unwrap();
        assert_eq!(greeting.message, "Hello, Ada!");
        assert!(greet(GreetRequest { name: "  ".into() }).is_err());
    }

    #[test]
    fn shout_upper_cases() {
        assert_eq!(shout("hey there".into()).unwrap(), "HEY THERE");
    }

    #[test]
    fn unknown_names_are_not_dispatched() {
        let initializer = FunctionInitializer::new(()).unwrap();
        assert!(dispatch("nope", &initializer, Vec::new()).is_none());
    }
}
