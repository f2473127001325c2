//! # Value Decoder
//!
//! Resolves a raw payload string into a typed value. Two strategies exist and are tried in a
//! fixed order:
//!
//! 1. [`DecodeStrategy::Conversion`]: the target type has an entry in the
//!    [`ConversionService`] (strings, numbers, booleans, chars, anything registered).
//! 2. [`DecodeStrategy::Codec`]: everything else goes through the codec of a media type,
//!    JSON unless the caller asks otherwise.
//!
//! Both paths are pure functions of `(payload, type)`. Any failure, including a missing
//! codec, is reported as [`FnError::Unconvertible`] carrying the payload and the type name.

use crate::codec::{CodecRegistry, MediaType};
use crate::container::BeanContext;
use crate::convert::ConversionService;
use crate::error::{FnError, Result};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStrategy {
    Conversion,
    Codec(MediaType),
}

#[derive(Clone)]
pub struct ValueDecoder {
    conversions: Arc<ConversionService>,
    codecs: Arc<CodecRegistry>,
}

impl ValueDecoder {
    pub fn new(conversions: Arc<ConversionService>, codecs: Arc<CodecRegistry>) -> Self {
        Self { conversions, codecs }
    }

    /// Builds a decoder from the conversion service and codec registry beans.
    pub fn from_container(container: &BeanContext) -> Result<Self> {
        Ok(Self::new(
            container.get_bean::<ConversionService>()?,
            container.get_bean::<CodecRegistry>()?,
        ))
    }

    pub fn conversions(&self) -> &ConversionService {
        &self.conversions
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn strategy_for<T: Any>(&self, structured: &MediaType) -> DecodeStrategy {
        if self.conversions.can_convert::<T>() {
            DecodeStrategy::Conversion
        } else {
            DecodeStrategy::Codec(structured.clone())
        }
    }

    /// Decodes `data` into `T`, falling back to JSON for structured types.
    pub fn decode<T>(&self, data: &str) -> Result<T>
    where
        T: DeserializeOwned + Any,
    {
        self.decode_with(data, &MediaType::json())
    }

    pub fn decode_with<T>(&self, data: &str, structured: &MediaType) -> Result<T>
    where
        T: DeserializeOwned + Any,
    {
        let strategy = self.strategy_for::<T>(structured);
        tracing::debug!(
            target: "fnrun::decoder",
            ty = std::any::type_name::<T>(),
            ?strategy,
            "Decoding payload"
        );

        match strategy {
            DecodeStrategy::Conversion => self.conversions.convert::<T>(data),
            DecodeStrategy::Codec(media) => {
                let codec = self.codecs.find_codec(&media).ok_or_else(|| {
                    FnError::unconvertible::<T>(data, Some(format!("no codec for {}", media)))
                })?;
                codec
                    .decode_as::<T>(data)
                    .map_err(|e| FnError::unconvertible::<T>(data, Some(e.to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

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

    #[test]
    fn primitives_use_conversion() {
        let decoder = decoder();
        assert_eq!(
            decoder.strategy_for::<i64>(&MediaType::json()),
            DecodeStrategy::Conversion
        );
        assert_eq!(decoder.decode::<i64>("42").unwrap(), 42);
    }

    #[test]
    fn strings_are_taken_verbatim_not_as_json() {
        let decoder = decoder();
        assert_eq!(decoder.decode::<String>("\"quoted\"").unwrap(), "\"quoted\"");
    }

    #[test]
    fn records_use_json_codec() {
        let decoder = decoder();
        assert_eq!(
            decoder.strategy_for::<Record>(&MediaType::json()),
            DecodeStrategy::Codec(MediaType::json())
        );
        assert_eq!(decoder.decode::<Record>("{\"x\":1}").unwrap(), Record { x: 1 });

        let map: HashMap<String, i32> = decoder.decode("{\"a\":1,\"b\":2}").unwrap();
        assert_eq!(map.get("b"), Some(&2));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Wide {
        x: u128,
    }

    #[test]
    fn records_with_wide_integers_decode_exactly() {
        let decoder = decoder();
        assert_eq!(
            decoder.decode::<Wide>("{\"x\":18446744073709551616}").unwrap(),
            Wide {
                x: 18_446_744_073_709_551_616
            }
        );
    }

    #[test]
    fn malformed_json_is_unconvertible() {
        let decoder = decoder();
        for payload in ["{\"x\":", "not json", "{\"x\":\"one\"}", ""] {
            let err = decoder.decode::<Record>(payload).unwrap_err();
            assert!(
                matches!(&err, FnError::Unconvertible { data, .. } if data == payload),
                "{payload}: {err:?}"
            );
        }
    }

    #[test]
    fn missing_codec_is_unconvertible() {
        let decoder = ValueDecoder::new(
            Arc::new(ConversionService::default()),
            Arc::new(CodecRegistry::empty()),
        );
        let err = decoder.decode::<Record>("{\"x\":1}").unwrap_err();
        assert_eq!(err.kind(), "unconvertible-value");
    }

    #[test]
    fn decoding_is_deterministic() {
        let decoder = decoder();
        let first: Record = decoder.decode("{\"x\":7}").unwrap();
        let second: Record = decoder.decode("{\"x\":7}").unwrap();
        assert_eq!(first, second);
    }
}
