//! # Invocation Context
//!
//! Everything one call of the function knows about its input: the raw `--data` payload, the
//! `--debug` flag and an id used to correlate log lines. The context is built once from argv
//! and never changes afterwards. Decoding is lazy: nothing is parsed until the function asks
//! for a typed value with [`InvocationContext::get`].
//!
//! A missing payload is not an error until a value is demanded. At that point `get` returns
//! [`FnError::NoData`] without attempting any decode, and the initializer reports it through
//! the dedicated no-data exit path.

use crate::decoder::ValueDecoder;
use crate::error::{FnError, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::ffi::OsString;
use uuid::Uuid;

/// The argument surface of a function process. argv is expected without the program name.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "fnrun",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct InvocationArgs {
    /// Print full error detail on failure
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Input payload handed to the function
    #[arg(short = 'x', long, allow_hyphen_values = true)]
    pub data: Option<String>,
}

impl InvocationArgs {
    pub fn parse_argv<I, T>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::try_parse_from(argv)?)
    }
}

#[derive(Clone)]
pub struct InvocationContext {
    raw_payload: Option<String>,
    debug: bool,
    invocation_id: Uuid,
    started_at: DateTime<Utc>,
    decoder: ValueDecoder,
}

impl InvocationContext {
    pub fn new(args: InvocationArgs, decoder: ValueDecoder) -> Self {
        Self {
            raw_payload: args.data,
            debug: args.debug,
            invocation_id: Uuid::new_v4(),
            started_at: Utc::now(),
            decoder,
        }
    }

    pub fn parse<I, T>(argv: I, decoder: ValueDecoder) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::new(InvocationArgs::parse_argv(argv)?, decoder))
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw_payload.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.raw_payload.is_some()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn decoder(&self) -> &ValueDecoder {
        &self.decoder
    }

    /// Decodes the payload as `T`.
    ///
    /// Returns [`FnError::NoData`] when no payload was supplied and
    /// [`FnError::Unconvertible`] when it does not decode as `T`.
    pub fn get<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Any,
    {
        match &self.raw_payload {
            None => {
                tracing::debug!(
                    target: "fnrun::context",
                    invocation = %self.invocation_id,
                    "No payload supplied"
                );
                Err(FnError::NoData)
            }
            Some(data) => self.decoder.decode(data),
        }
    }

    /// Like [`get`](Self::get), but a missing payload is `Ok(None)`.
    pub fn get_optional<T>(&self) -> Result<Option<T>>
    where
        T: DeserializeOwned + Any,
    {
        match &self.raw_payload {
            None => Ok(None),
            Some(data) => self.decoder.decode(data).map(Some),
        }
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("raw_payload", &self.raw_payload)
            .field("debug", &self.debug)
            .field("invocation_id", &self.invocation_id)
            .field("started_at", &self.started_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::convert::ConversionService;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        x: i32,
    }

    fn decoder() -> ValueDecoder {
        ValueDecoder::new(
            Arc::new(ConversionService::default()),
            Arc::new(CodecRegistry::default()),
        )
    }

    fn context(argv: &[&str]) -> InvocationContext {
        InvocationContext::parse(argv.iter().copied(), decoder()).unwrap()
    }

    #[test]
    fn parses_long_and_short_options() {
        let args = InvocationArgs::parse_argv(["--data", "42", "--debug"]).unwrap();
        assert_eq!(
            args,
            InvocationArgs {
                debug: true,
                data: Some("42".into())
            }
        );

        let args = InvocationArgs::parse_argv(["-x", "hi", "-d"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.data.as_deref(), Some("hi"));

        let args = InvocationArgs::parse_argv(Vec::<String>::new()).unwrap();
        assert_eq!(args, InvocationArgs::default());
    }

    #[test]
    fn payload_may_start_with_a_hyphen() {
        let ctx = context(&["--data", "-5"]);
        assert_eq!(ctx.get::<i32>().unwrap(), -5);
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        assert!(matches!(
            InvocationArgs::parse_argv(["--bogus"]),
            Err(FnError::Args(_))
        ));
        assert!(InvocationArgs::parse_argv(["--help"]).is_err());
    }

    #[test]
    fn decodes_integer_payload() {
        let ctx = context(&["--data", "42"]);
        assert!(!ctx.is_debug());
        assert_eq!(ctx.get::<i64>().unwrap(), 42);
    }

    #[test]
    fn decodes_record_payload() {
        let ctx = context(&["--data", "{\"x\":1}"]);
        assert_eq!(ctx.get::<Record>().unwrap(), Record { x: 1 });
    }

    #[test]
    fn missing_payload_is_no_data() {
        let ctx = context(&[]);
        assert!(!ctx.has_data());
        assert!(matches!(ctx.get::<i64>(), Err(FnError::NoData)));
        assert!(matches!(ctx.get::<Record>(), Err(FnError::NoData)));
        assert_eq!(ctx.get_optional::<i64>().unwrap(), None);
    }

    #[test]
    fn bad_payload_is_unconvertible() {
        let ctx = context(&["--data", "notanumber", "--debug"]);
        assert!(ctx.is_debug());
        assert!(matches!(
            ctx.get::<i64>(),
            Err(FnError::Unconvertible { .. })
        ));
        assert!(ctx.get_optional::<i64>().is_err());
    }

    #[test]
    fn each_context_gets_its_own_id() {
        let first = context(&[]);
        let second = context(&[]);
        assert_ne!(first.invocation_id(), second.invocation_id());
    }
}
