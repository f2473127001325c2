use crate::codec::MediaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named function and the media type its results are encoded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRegistration {
    pub name: String,
    #[serde(default = "MediaType::json")]
    pub media_type: MediaType,
}

impl FunctionRegistration {
    pub fn new(name: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            name: name.into(),
            media_type,
        }
    }
}

/// Registry of the functions available in this process, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionRegistration>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: FunctionRegistration) {
        self.functions
            .insert(registration.name.clone(), registration);
    }

    pub fn with(mut self, name: impl Into<String>, media_type: MediaType) -> Self {
        self.register(FunctionRegistration::new(name, media_type));
        self
    }

    pub fn find(&self, name: &str) -> Option<&FunctionRegistration> {
        self.functions.get(name)
    }

    /// Media type negotiated for `name`, JSON when the function is unknown.
    pub fn media_type_for(&self, name: &str) -> MediaType {
        self.find(name)
            .map(|registration| registration.media_type.clone())
            .unwrap_or_else(MediaType::json)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_functions_default_to_json() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.media_type_for("missing"), MediaType::json());
    }

    #[test]
    fn registered_media_type_is_used() {
        let registry = FunctionRegistry::new()
            .with("shout", MediaType::text())
            .with("echo", MediaType::json());
        assert_eq!(registry.media_type_for("shout"), MediaType::text());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["echo", "shout"]);
    }

    #[test]
    fn registration_deserializes_with_default_media_type() {
        let registration: FunctionRegistration =
            serde_json::from_str("{\"name\":\"echo\"}").unwrap();
        assert_eq!(registration.media_type, MediaType::json());
    }
}
