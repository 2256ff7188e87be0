// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Argon2 key derivation failed: {0}")]
    Argon2(String),
    #[error("ChaCha20Poly1305 operation failed: {0}")]
    ChaCha(String),
    #[error("Invalid key or nonce length")]
    InvalidLength,
    #[error("Hex decoding error: {0}")]
    HexDecoding(String),
    #[error("Malformed sealed value: {0}")]
    Malformed(String),
    #[error("Secret is encrypted but no passphrase was configured")]
    Locked,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("Failed to replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Import text contains no header row")]
    EmptyInput,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Password length cannot be zero")]
    ZeroLength,
    #[error("At least one character set must be selected")]
    NoCharset,
    #[error("Password length {length} is shorter than the {required} selected character sets")]
    TooShort { length: usize, required: usize },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Credential not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Cryptography error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("CLI error: {0}")]
    Cli(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ImportError> for AppError {
    fn from(e: ImportError) -> Self {
        AppError::InvalidInput(e.to_string())
    }
}

impl From<GeneratorError> for AppError {
    fn from(e: GeneratorError) -> Self {
        AppError::InvalidInput(e.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type CryptoResult<T> = Result<T, CryptoError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type ImportResult<T> = Result<T, ImportError>;
