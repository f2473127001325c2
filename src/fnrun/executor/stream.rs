use super::FunctionExecutor;
use crate::codec::CodecRegistry;
use crate::container::BeanContext;
use crate::convert::ConversionService;
use crate::decoder::ValueDecoder;
use crate::error::{FnError, Result};
use crate::registry::FunctionRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::io::{Read, Write};
use std::marker::PhantomData;

/// Encodes a function result the way it will appear on the wire.
///
/// Types known to the conversion service are written as plain text (`42`, `true`, the string
/// itself). Everything else goes through the codec of the media type registered for
/// `function_name`, JSON when the function has no registration.
pub fn encode_value<O>(container: &BeanContext, function_name: &str, result: &O) -> Result<Vec<u8>>
where
    O: Serialize + Any,
{
    let conversions = container.get_bean::<ConversionService>()?;
    if let Some(text) = conversions.render(result) {
        return Ok(text.into_bytes());
    }

    let media = container
        .get_bean::<FunctionRegistry>()?
        .media_type_for(function_name);
    let codecs = container.get_bean::<CodecRegistry>()?;
    let codec = codecs
        .find_codec(&media)
        .ok_or_else(|| FnError::CodecNotFound(media.clone()))?;
    codec.encode_as(result)
}

/// Encodes `result` and writes it to `output` in a single write, then flushes.
pub fn encode_result<O>(
    container: &BeanContext,
    function_name: &str,
    result: &O,
    output: &mut dyn Write,
) -> Result<()>
where
    O: Serialize + Any,
{
    let bytes = encode_value(container, function_name, result)?;
    output.write_all(&bytes)?;
    output.flush()?;
    tracing::debug!(
        target: "fnrun::executor",
        function = function_name,
        bytes = bytes.len(),
        "Result written"
    );
    Ok(())
}

/// Input and output streams of one stream invocation.
pub struct StreamIo<'a> {
    pub input: &'a mut dyn Read,
    pub output: &'a mut dyn Write,
}

impl<'a> StreamIo<'a> {
    pub fn new(input: &'a mut dyn Read, output: &'a mut dyn Write) -> Self {
        Self { input, output }
    }
}

/// Runs a function against a byte stream: the whole input stream is the payload.
///
/// The payload is decoded with the media type registered for the function (JSON by
/// default). A single trailing newline is ignored and an empty stream means no data.
/// [`FunctionInitializer::execute_stream`](crate::initializer::FunctionInitializer::execute_stream)
/// runs it under the exit protocol.
pub struct StreamFunctionExecutor<F, A, B> {
    function_name: String,
    function: F,
    _types: PhantomData<fn(A) -> B>,
}

impl<F, A, B> StreamFunctionExecutor<F, A, B>
where
    F: Fn(A) -> Result<B>,
{
    pub fn new(function_name: impl Into<String>, function: F) -> Self {
        Self {
            function_name: function_name.into(),
            function,
            _types: PhantomData,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }
}

impl<'a, F, A, B> FunctionExecutor<StreamIo<'a>, (), BeanContext> for StreamFunctionExecutor<F, A, B>
where
    F: Fn(A) -> Result<B>,
    A: DeserializeOwned + Any,
    B: Serialize + Any,
{
    fn execute(&self, context: &BeanContext, io: StreamIo<'a>) -> Result<()> {
        let mut payload = String::new();
        io.input.read_to_string(&mut payload)?;
        let payload = payload
            .strip_suffix('\n')
            .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
            .unwrap_or(payload.as_str());
        if payload.is_empty() {
            return Err(FnError::NoData);
        }

        let media = context
            .get_bean::<FunctionRegistry>()?
            .media_type_for(&self.function_name);
        let input: A = ValueDecoder::from_container(context)?.decode_with(payload, &media)?;
        let output = (self.function)(input)?;
        encode_result(context, &self.function_name, &output, io.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MediaType;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize)]
    struct Point {
        x: i32,
    }

    #[derive(Debug, Serialize)]
    struct Moved {
        y: i32,
    }

    fn container() -> BeanContext {
        let mut container = BeanContext::with_defaults();
        container.register(
            FunctionRegistry::new()
                .with("move", MediaType::json())
                .with("shout", MediaType::text()),
        );
        container
    }

    fn run_stream<F, A, B>(executor: &StreamFunctionExecutor<F, A, B>, input: &str) -> Result<String>
    where
        F: Fn(A) -> Result<B>,
        A: DeserializeOwned + Any,
        B: Serialize + Any,
    {
        let container = container();
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        executor.execute(&container, StreamIo::new(&mut reader, &mut output))?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn primitives_are_written_as_text() {
        let container = container();
        assert_eq!(encode_value(&container, "any", &42i64).unwrap(), b"42");
        assert_eq!(encode_value(&container, "any", &true).unwrap(), b"true");
        assert_eq!(
            encode_value(&container, "any", &"plain".to_string()).unwrap(),
            b"plain"
        );
    }

    #[test]
    fn records_use_the_registered_codec() {
        let container = container();
        assert_eq!(
            encode_value(&container, "move", &Moved { y: 2 }).unwrap(),
            b"{\"y\":2}"
        );
        assert_eq!(
            encode_value(&container, "unregistered", &vec![1, 2]).unwrap(),
            b"[1,2]"
        );
    }

    #[derive(Debug, Serialize)]
    struct Account {
        name: String,
        balance: u128,
    }

    #[test]
    fn records_keep_field_order_and_wide_integers() {
        let container = container();
        let account = Account {
            name: "a".into(),
            balance: u128::MAX,
        };
        assert_eq!(
            String::from_utf8(encode_value(&container, "move", &account).unwrap()).unwrap(),
            format!("{{\"name\":\"a\",\"balance\":{}}}", u128::MAX)
        );
    }

    #[test]
    fn missing_codec_is_reported() {
        let mut container = container();
        container.register(CodecRegistry::empty());
        let err = encode_value(&container, "move", &Moved { y: 2 }).unwrap_err();
        assert!(matches!(err, FnError::CodecNotFound(_)));
    }

    #[test]
    fn stream_executor_round_trip() {
        let executor = StreamFunctionExecutor::new("move", |p: Point| Ok(Moved { y: p.x + 1 }));
        assert_eq!(run_stream(&executor, "{\"x\":1}\n").unwrap(), "{\"y\":2}");
    }

    #[test]
    fn stream_executor_decodes_primitives() {
        let executor = StreamFunctionExecutor::new("inc", |n: i64| Ok(n + 1));
        assert_eq!(run_stream(&executor, "41\r\n").unwrap(), "42");
    }

    #[test]
    fn stream_executor_uses_text_media_type() {
        let executor =
            StreamFunctionExecutor::new("shout", |s: String| Ok(s.to_uppercase()));
        assert_eq!(run_stream(&executor, "hello").unwrap(), "HELLO");
    }

    #[test]
    fn empty_stream_is_no_data() {
        let executor = StreamFunctionExecutor::new("inc", |n: i64| Ok(n + 1));
        assert!(matches!(run_stream(&executor, ""), Err(FnError::NoData)));
        assert!(matches!(run_stream(&executor, "\n"), Err(FnError::NoData)));
    }

    #[test]
    fn malformed_stream_payload_is_unconvertible() {
        let executor = StreamFunctionExecutor::new("move", |p: Point| Ok(Moved { y: p.x }));
        assert!(matches!(
            run_stream(&executor, "{\"x\":"),
            Err(FnError::Unconvertible { .. })
        ));
    }
}
