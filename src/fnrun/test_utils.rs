use crate::config::ExitCodes;
use crate::error::FnError;
use crate::exit::{Exit, ExitHandler, ExitStatus};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A cloneable in-memory writer; every clone appends to the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().expect("buffer lock poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .expect("buffer lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One call received by a [`RecordingExitHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCall {
    Success,
    Error { kind: &'static str, debug: bool },
    NoData,
}

/// Exit handler that records every call instead of writing diagnostics.
#[derive(Default)]
pub struct RecordingExitHandler {
    codes: ExitCodes,
    calls: Mutex<Vec<ExitCall>>,
}

impl RecordingExitHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<ExitCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn record(&self, call: ExitCall) {
        self.calls.lock().expect("calls lock poisoned").push(call);
    }
}

impl ExitHandler for RecordingExitHandler {
    fn exit_with_success(&self) -> Exit {
        self.record(ExitCall::Success);
        Exit::new(ExitStatus::Success, &self.codes)
    }

    fn exit_with_error(&self, error: &FnError, debug: bool) -> Exit {
        self.record(ExitCall::Error {
            kind: error.kind(),
            debug,
        });
        Exit::new(ExitStatus::Failure, &self.codes)
    }

    fn exit_with_no_data(&self) -> Exit {
        self.record(ExitCall::NoData);
        Exit::new(ExitStatus::NoData, &self.codes)
    }
}
