//! # Function Initializer
//!
//! Drives one invocation end to end:
//!
//! ```text
//! argv ─▶ InvocationContext ─▶ function body ─▶ encode + write ─▶ ExitHandler ─▶ Exit
//! ```
//!
//! ## Container ownership
//!
//! An initializer either builds its own [`BeanContext`] ([`FunctionInitializer::new`],
//! [`FunctionInitializer::owning`]) or works against one supplied by the host
//! ([`FunctionInitializer::with_container`], [`FunctionInitializer::borrowing`]). The choice
//! is stored as a [`ContainerHandle`] at construction and is the only thing
//! [`close`](FunctionInitializer::close) looks at:
//!
//! - owned: the container is closed exactly once, by the first `close()` or on drop
//! - borrowed: the container is never closed, the host may keep using it
//!
//! Only the owning constructor starts the container's startup hooks.
//!
//! ## Failure handling
//!
//! Every error raised while building the context, running the body (panics included) or
//! encoding the result ends in exactly one exit handler call and never escapes `run`.
//! The no-data error is routed to `exit_with_no_data`, everything else to `exit_with_error`
//! together with the context's debug flag. Errors from `close()` are returned to the caller.
//!
//! Panics are reported like any other function error. Unless the invocation runs with
//! `--debug`, the panic hook is silenced while the body runs so stderr only carries the
//! terse diagnostic.
//!
//! [`FunctionInitializer::execute_stream`] drives the same protocol for executors whose
//! input is a byte stream rather than `--data`.

use crate::config::FunctionConfig;
use crate::container::{BeanContext, Injectable};
use crate::context::InvocationContext;
use crate::decoder::ValueDecoder;
use crate::error::{FnError, Result};
use crate::executor::{encode_result, FunctionExecutor, StreamIo};
use crate::exit::{DefaultExitHandler, Exit, ExitHandler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::ffi::OsString;
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub enum ContainerHandle<'a> {
    Owned(BeanContext),
    Borrowed(&'a BeanContext),
}

impl ContainerHandle<'_> {
    pub fn get(&self) -> &BeanContext {
        match self {
            ContainerHandle::Owned(container) => container,
            ContainerHandle::Borrowed(container) => container,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ContainerHandle::Owned(_))
    }
}

/// Result of running the function body, before it is reported.
#[derive(Debug)]
pub enum InvocationOutcome<O> {
    Success(Option<O>),
    Failure { error: FnError, debug: bool },
}

pub struct FunctionInitializer<'a, F = ()> {
    container: ContainerHandle<'a>,
    function: F,
    closed: bool,
}

impl<F: Injectable> FunctionInitializer<'static, F> {
    /// Owning mode with the default beans.
    pub fn new(function: F) -> Result<Self> {
        Self::owning(function, |_| {})
    }

    /// Owning mode. `configure` may register or replace beans before the container starts.
    pub fn owning<C>(function: F, configure: C) -> Result<Self>
    where
        C: FnOnce(&mut BeanContext),
    {
        let mut container = BeanContext::with_defaults();
        configure(&mut container);
        container.start()?;

        let mut initializer = Self {
            container: ContainerHandle::Owned(container),
            function,
            closed: false,
        };
        initializer.inject_self()?;
        tracing::debug!(target: "fnrun::initializer", "Initializer created with owned container");
        Ok(initializer)
    }
}

impl<'a, F: Injectable> FunctionInitializer<'a, F> {
    /// Borrowing mode, injecting `function` from `container`.
    pub fn with_container(container: &'a BeanContext, function: F) -> Result<Self> {
        Self::borrowing(container, function, true)
    }

    /// Borrowing mode. With `inject == false` the function is used as is.
    pub fn borrowing(container: &'a BeanContext, function: F, inject: bool) -> Result<Self> {
        let mut initializer = Self {
            container: ContainerHandle::Borrowed(container),
            function,
            closed: false,
        };
        if inject {
            initializer.inject_self()?;
        }
        tracing::debug!(
            target: "fnrun::initializer",
            inject,
            "Initializer created with borrowed container"
        );
        Ok(initializer)
    }

    fn inject_self(&mut self) -> Result<()> {
        self.container.get().inject(&mut self.function)
    }
}

impl<F> FunctionInitializer<'_, F> {
    pub fn container(&self) -> &BeanContext {
        self.container.get()
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn is_owner(&self) -> bool {
        self.container.is_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Runs `body` for the invocation described by `argv`, writing any result to stdout.
    pub fn run<I, T, O, B>(&self, argv: I, body: B) -> Exit
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        O: Serialize + Any,
        B: FnOnce(&InvocationContext) -> Result<Option<O>>,
    {
        let stdout = std::io::stdout();
        let mut output = stdout.lock();
        self.run_with_output(argv, &mut output, body)
    }

    pub fn run_with_output<I, T, O, B>(&self, argv: I, output: &mut dyn Write, body: B) -> Exit
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        O: Serialize + Any,
        B: FnOnce(&InvocationContext) -> Result<Option<O>>,
    {
        let container = self.container();
        let config = container.find_bean::<FunctionConfig>().unwrap_or_default();
        let exit_handler = self.resolve_exit_handler(&config);

        let context = match ValueDecoder::from_container(container)
            .and_then(|decoder| InvocationContext::parse(argv, decoder))
        {
            Ok(context) => context,
            Err(error) => return report_failure(exit_handler.as_ref(), error, false),
        };

        let span = tracing::info_span!(
            "invocation",
            id = %context.invocation_id(),
            function = %config.function_name
        );
        let _entered = span.enter();
        tracing::debug!(has_data = context.has_data(), debug = context.is_debug(), "Invoking function");

        let exit = match invoke(&context, body) {
            InvocationOutcome::Success(Some(result)) => {
                match encode_result(container, &config.function_name, &result, output) {
                    Ok(()) => exit_handler.exit_with_success(),
                    Err(error) => report_failure(exit_handler.as_ref(), error, context.is_debug()),
                }
            }
            InvocationOutcome::Success(None) => {
                tracing::debug!("Function produced no result");
                exit_handler.exit_with_success()
            }
            InvocationOutcome::Failure { error, debug } => {
                report_failure(exit_handler.as_ref(), error, debug)
            }
        };

        tracing::info!(status = ?exit.status, code = exit.code, "Invocation finished");
        exit
    }

    /// Decodes the executor's input from the payload, runs it and reports the result.
    pub fn execute<I, T, A, B, E>(&self, argv: I, executor: &E) -> Exit
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        A: DeserializeOwned + Any,
        B: Serialize + Any,
        E: FunctionExecutor<A, B, InvocationContext>,
    {
        self.run(argv, |context| execute_with(context, executor))
    }

    pub fn execute_with_output<I, T, A, B, E>(
        &self,
        argv: I,
        output: &mut dyn Write,
        executor: &E,
    ) -> Exit
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        A: DeserializeOwned + Any,
        B: Serialize + Any,
        E: FunctionExecutor<A, B, InvocationContext>,
    {
        self.run_with_output(argv, output, |context| execute_with(context, executor))
    }

    /// Runs a stream executor against `input`/`output` with the container as context and
    /// reports the outcome through the exit handler, exactly once.
    pub fn execute_stream<E>(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        executor: &E,
        debug: bool,
    ) -> Exit
    where
        E: for<'s> FunctionExecutor<StreamIo<'s>, (), BeanContext>,
    {
        let container = self.container();
        let config = container.find_bean::<FunctionConfig>().unwrap_or_default();
        let exit_handler = self.resolve_exit_handler(&config);

        let span = tracing::info_span!("stream_invocation", function = %config.function_name);
        let _entered = span.enter();

        let outcome = guarded(debug, || {
            executor.execute(container, StreamIo::new(&mut *input, &mut *output))
        });
        let exit = match outcome {
            Ok(Ok(())) => exit_handler.exit_with_success(),
            Ok(Err(error)) => report_failure(exit_handler.as_ref(), error, debug),
            Err(error) => report_failure(exit_handler.as_ref(), error, debug),
        };

        tracing::info!(status = ?exit.status, code = exit.code, "Invocation finished");
        exit
    }

    /// Releases the container if this initializer owns it. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match &mut self.container {
            ContainerHandle::Owned(container) => {
                tracing::debug!(target: "fnrun::initializer", "Closing owned container");
                container.close()
            }
            ContainerHandle::Borrowed(_) => Ok(()),
        }
    }

    fn resolve_exit_handler(&self, config: &FunctionConfig) -> Arc<dyn ExitHandler> {
        match self.container().find_bean::<Arc<dyn ExitHandler>>() {
            Some(handler) => Arc::clone(&*handler),
            None => Arc::new(DefaultExitHandler::new(config.exit_codes)),
        }
    }
}

impl<F> Drop for FunctionInitializer<'_, F> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(target: "fnrun::initializer", error = %e, "Failed to close container");
        }
    }
}

fn execute_with<A, B, E>(context: &InvocationContext, executor: &E) -> Result<Option<B>>
where
    A: DeserializeOwned + Any,
    E: FunctionExecutor<A, B, InvocationContext>,
{
    let input = context.get::<A>()?;
    executor.execute(context, input).map(Some)
}

fn invoke<O, B>(context: &InvocationContext, body: B) -> InvocationOutcome<O>
where
    B: FnOnce(&InvocationContext) -> Result<Option<O>>,
{
    let debug = context.is_debug();
    match guarded(debug, || body(context)) {
        Ok(Ok(result)) => InvocationOutcome::Success(result),
        Ok(Err(error)) | Err(error) => InvocationOutcome::Failure { error, debug },
    }
}

/// Runs `f`, turning a panic into [`FnError::Panicked`].
///
/// Without `debug` the default hook (which prints the panic location) is swapped for one that
/// only logs at debug level, and restored afterwards.
fn guarded<R>(debug: bool, f: impl FnOnce() -> R) -> std::result::Result<R, FnError> {
    let result = if debug {
        catch_unwind(AssertUnwindSafe(f))
    } else {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(|info| {
            tracing::debug!(target: "fnrun::initializer", panic = %info, "Function panicked");
        }));
        let result = catch_unwind(AssertUnwindSafe(f));
        std::panic::set_hook(previous);
        result
    };
    result.map_err(|payload| FnError::Panicked(panic_message(payload.as_ref())))
}

fn report_failure(handler: &dyn ExitHandler, error: FnError, debug: bool) -> Exit {
    match error {
        FnError::NoData => handler.exit_with_no_data(),
        error => {
            tracing::debug!(error = %error, kind = error.kind(), "Invocation failed");
            handler.exit_with_error(&error, debug)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
