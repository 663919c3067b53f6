use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Company,
    Position,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Company => f.write_str("company"),
            Field::Position => f.write_str("position"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Rejected `add` input. Carries one message per blank required field so the
/// form can show them next to the inputs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid job application: {}", summary(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|err| err.field == field)
            .map(|err| err.message.as_str())
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| err.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("stored value could not be decrypted")]
    Decrypt,

    #[error("store is locked after a failed decrypt; writes are refused")]
    Locked,

    #[error("encrypted storage needs a passphrase")]
    MissingPassphrase,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
