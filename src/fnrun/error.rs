use crate::codec::MediaType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FnError {
    #[error("No data supplied to the function")]
    NoData,

    #[error("Passed data [{data}] cannot be converted to type: {target}")]
    Unconvertible {
        data: String,
        target: &'static str,
        reason: Option<String>,
    },

    #[error("Function failed: {0}")]
    Function(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Function panicked: {0}")]
    Panicked(String),

    #[error("Invalid arguments: {0}")]
    Args(#[from] clap::Error),

    #[error("No codec registered for media type {0}")]
    CodecNotFound(MediaType),

    #[error("No bean registered for type {0}")]
    BeanNotFound(&'static str),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FnError {
    /// Wraps any error raised by a user function.
    pub fn function<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FnError::Function(err.into())
    }

    pub(crate) fn unconvertible<T: ?Sized>(data: &str, reason: Option<String>) -> Self {
        FnError::Unconvertible {
            data: data.to_string(),
            target: std::any::type_name::<T>(),
            reason,
        }
    }

    /// Short name of the variant, used in debug diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FnError::NoData => "no-data",
            FnError::Unconvertible { .. } => "unconvertible-value",
            FnError::Function(_) => "function",
            FnError::Panicked(_) => "panic",
            FnError::Args(_) => "arguments",
            FnError::CodecNotFound(_) => "codec-not-found",
            FnError::BeanNotFound(_) => "bean-not-found",
            FnError::Container(_) => "container",
            FnError::Config(_) => "config",
            FnError::Io(_) => "io",
            FnError::Serialization(_) => "serialization",
        }
    }
}

pub type Result<T> = std::result::Result<T, FnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconvertible_message_names_data_and_type() {
        let err = FnError::unconvertible::<i64>("notanumber", None);
        assert_eq!(
            err.to_string(),
            "Passed data [notanumber] cannot be converted to type: i64"
        );
        assert_eq!(err.kind(), "unconvertible-value");
    }

    #[test]
    fn function_errors_keep_their_source() {
        let err = FnError::function("boom");
        assert_eq!(err.to_string(), "Function failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
