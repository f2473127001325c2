//! # Executors
//!
//! [`FunctionExecutor`] is the seam between a transport and a function: given a context of
//! type `C` and an input of type `I`, produce an `O` or fail. The lifecycle in
//! [`crate::initializer`] only ever talks to this trait, so a new transport is a new
//! implementation, not a change to decoding, encoding or exit reporting.
//!
//! Implementations shipped here:
//! - [`LocalFunction`]: a plain `Fn(I) -> Result<O>`, context ignored. Used for argv
//!   invocations where the initializer decodes the input.
//! - [`stream::StreamFunctionExecutor`]: reads the payload from a reader and writes the
//!   encoded result to a writer, with the container as context. Driven by
//!   [`crate::initializer::FunctionInitializer::execute_stream`].

use crate::error::Result;
use std::marker::PhantomData;

pub mod stream;

pub use stream::{encode_result, encode_value, StreamFunctionExecutor, StreamIo};

pub trait FunctionExecutor<I, O, C: ?Sized> {
    fn execute(&self, context: &C, input: I) -> Result<O>;
}

/// Adapts a closure or fn item into an executor that works with any context.
pub struct LocalFunction<F, I, O> {
    function: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<F, I, O> LocalFunction<F, I, O>
where
    F: Fn(I) -> Result<O>,
{
    pub fn new(function: F) -> Self {
        Self {
            function,
            _types: PhantomData,
        }
    }
}

impl<F, I, O, C: ?Sized> FunctionExecutor<I, O, C> for LocalFunction<F, I, O>
where
    F: Fn(I) -> Result<O>,
{
    fn execute(&self, _context: &C, input: I) -> Result<O> {
        (self.function)(input)
    }
}
