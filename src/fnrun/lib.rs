//! # fnrun Architecture
//!
//! fnrun turns an in-process function (one input value in, one output value out) into a
//! process a host can invoke once per request: the input arrives as `--data <DATA>` on argv,
//! the encoded output goes to stdout and the outcome is signalled through the exit code.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Binary (cli/, wired by main.rs)                            │
//! │  - Loads function.json, sets up logging                     │
//! │  - Picks a built-in function, main returns its ExitCode     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Lifecycle (initializer.rs)                                 │
//! │  - Owns or borrows the container, injects the function      │
//! │  - One invocation: context → body → encode → exit handler   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Invocation (context.rs, executor/, exit.rs)                │
//! │  - Parsed argv, lazy typed access to the payload            │
//! │  - FunctionExecutor<I, O, C> adapters                       │
//! │  - Exit classes and diagnostics                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collaborators (container, decoder, convert, codec, ...)    │
//! │  - Type-keyed bean container with start/close hooks         │
//! │  - Primitive conversion table and media-type codecs         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decoding
//!
//! A payload is decoded through exactly one of two strategies, chosen by the requested type:
//! types registered in the [`convert::ConversionService`] (integers, floats, `bool`, `char`,
//! `String`) are parsed directly from the text, every other type goes through a codec
//! (JSON unless the function is registered with another media type). `--data 42` is the
//! number 42, `--data '{"x":1}'` is a record.
//!
//! ## Exit protocol
//!
//! Every invocation ends in exactly one exit handler call: success, error or no data. The
//! handler returns an [`exit::Exit`] instead of terminating the process, so the caller can
//! close the container before exiting. Default codes are 0, 1 and 2.
//!
//! ## Module Overview
//!
//! - [`initializer`]: The lifecycle driver and entry point for hosts
//! - [`context`]: argv parsing and typed payload access
//! - [`executor`]: The executor trait, plain closures and the stream executor
//! - [`exit`]: Exit handlers and diagnostics
//! - [`decoder`]: Strategy selection between conversion and codecs
//! - [`convert`]: Primitive conversion table
//! - [`codec`]: Media types and codecs
//! - [`container`]: The bean container
//! - [`registry`]: Function name to media type
//! - [`config`]: `function.json`
//! - [`logging`]: tracing setup for the binary
//! - [`error`]: Error types
//! - `cli`: Built-in functions and dispatch for the binary (not part of the lib API)

pub mod codec;
pub mod config;
pub mod container;
pub mod context;
pub mod convert;
pub mod decoder;
pub mod error;
pub mod executor;
pub mod exit;
pub mod initializer;
pub mod logging;
pub mod registry;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use container::{BeanContext, Injectable};
pub use context::InvocationContext;
pub use error::{FnError, Result};
pub use executor::FunctionExecutor;
pub use exit::{Exit, ExitHandler, ExitStatus};
pub use initializer::FunctionInitializer;
