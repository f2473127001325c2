//! # Media Types and Codecs
//!
//! A [`Codec`] translates between the wire form of one [`MediaType`] and JSON text. The
//! [`CodecRegistry`] is the bean the harness asks for "the codec of this media type".
//!
//! Typed values never pass through an intermediate `serde_json::Value`: `decode_as` hands the
//! JSON text straight to `serde_json::from_str::<T>` and `encode_as` starts from
//! `serde_json::to_string`. Integers wider than 64 bits and field order survive unchanged,
//! and codecs stay object safe so they can live behind `Box<dyn Codec>`.
//!
//! Shipped codecs:
//! - [`JsonCodec`]: `application/json`
//! - [`TextCodec`]: `text/plain`. Strings pass through verbatim, anything else is written as
//!   its JSON text.

use crate::error::{FnError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";

/// A `type/subtype` pair with optional parameters (`text/plain;charset=utf-8`).
///
/// Type and subtype are lowercased on parse; two media types match when their essence
/// (`type/subtype`) is equal, parameters are ignored for matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaType {
    essence: String,
    params: BTreeMap<String, String>,
}

impl MediaType {
    pub fn json() -> Self {
        Self::from_essence(APPLICATION_JSON)
    }

    pub fn text() -> Self {
        Self::from_essence(TEXT_PLAIN)
    }

    fn from_essence(essence: &str) -> Self {
        Self {
            essence: essence.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn matches(&self, other: &MediaType) -> bool {
        self.essence == other.essence
    }
}

impl FromStr for MediaType {
    type Err = FnError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(';');
        let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        let valid = match essence.split_once('/') {
            Some((ty, sub)) => !ty.is_empty() && !sub.is_empty() && !sub.contains('/'),
            None => false,
        };
        if !valid {
            return Err(FnError::Config(format!("Invalid media type: {}", s)));
        }

        let mut params = BTreeMap::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| FnError::Config(format!("Invalid media type parameter: {}", param)))?;
            params.insert(
                key.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            );
        }

        Ok(Self { essence, params })
    }
}

impl TryFrom<String> for MediaType {
    type Error = FnError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MediaType> for String {
    fn from(media: MediaType) -> Self {
        media.to_string()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.essence)?;
        for (key, value) in &self.params {
            write!(f, ";{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Decodes payload strings and encodes results for one media type.
pub trait Codec: Send + Sync {
    fn media_type(&self) -> MediaType;

    /// Wire payload to JSON text.
    fn to_json<'d>(&self, data: &'d str) -> Result<Cow<'d, str>>;

    /// JSON text to the bytes written on the wire.
    fn from_json(&self, json: &str) -> Result<Vec<u8>>;
}

impl<'a> dyn Codec + 'a {
    pub fn decode_as<T: DeserializeOwned>(&self, data: &str) -> Result<T> {
        let json = self.to_json(data)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn encode_as<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let json = serde_json::to_string(value)?;
        self.from_json(&json)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn media_type(&self) -> MediaType {
        MediaType::json()
    }

    fn to_json<'d>(&self, data: &'d str) -> Result<Cow<'d, str>> {
        Ok(Cow::Borrowed(data))
    }

    fn from_json(&self, json: &str) -> Result<Vec<u8>> {
        Ok(json.as_bytes().to_vec())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn media_type(&self) -> MediaType {
        MediaType::text()
    }

    fn to_json<'d>(&self, data: &'d str) -> Result<Cow<'d, str>> {
        Ok(Cow::Owned(serde_json::to_string(data)?))
    }

    fn from_json(&self, json: &str) -> Result<Vec<u8>> {
        if json.starts_with('"') {
            let text: String = serde_json::from_str(json)?;
            return Ok(text.into_bytes());
        }
        Ok(json.as_bytes().to_vec())
    }
}

/// Ordered set of codecs. Later registrations for the same media type win.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(JsonCodec);
        registry.register(TextCodec);
        registry
    }
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    pub fn register<C: Codec + 'static>(&mut self, codec: C) {
        let media = codec.media_type();
        self.codecs.retain(|existing| !existing.media_type().matches(&media));
        self.codecs.push(Box::new(codec));
    }

    pub fn find_codec(&self, media_type: &MediaType) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|codec| codec.media_type().matches(media_type))
            .map(|codec| codec.as_ref())
    }

    pub fn media_types(&self) -> Vec<MediaType> {
        self.codecs.iter().map(|codec| codec.media_type()).collect()
    }
}
