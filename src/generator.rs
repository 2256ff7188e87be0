// src/generator.rs
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::GeneratorError;

const LOWERCASE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBER_CHARS: &[u8] = b"0123456789";
const SYMBOL_CHARS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCriteria {
    pub length: usize,
    pub use_uppercase: bool,
    pub use_lowercase: bool,
    pub use_numbers: bool,
    pub use_symbols: bool,
}

impl Default for PasswordCriteria {
    fn default() -> Self {
        PasswordCriteria {
            length: 16,
            use_uppercase: true,
            use_lowercase: true,
            use_numbers: true,
            use_symbols: true,
        }
    }
}

/// Per-request overrides on top of the configured criteria.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CriteriaOverrides {
    pub length: Option<usize>,
    pub use_uppercase: Option<bool>,
    pub use_lowercase: Option<bool>,
    pub use_numbers: Option<bool>,
    pub use_symbols: Option<bool>,
}

impl PasswordCriteria {
    pub fn with_overrides(&self, o: &CriteriaOverrides) -> Self {
        PasswordCriteria {
            length: o.length.unwrap_or(self.length),
            use_uppercase: o.use_uppercase.unwrap_or(self.use_uppercase),
            use_lowercase: o.use_lowercase.unwrap_or(self.use_lowercase),
            use_numbers: o.use_numbers.unwrap_or(self.use_numbers),
            use_symbols: o.use_symbols.unwrap_or(self.use_symbols),
        }
    }

    fn charsets(&self) -> Vec<&'static [u8]> {
        let mut sets = Vec::new();
        if self.use_lowercase {
            sets.push(LOWERCASE_CHARS);
        }
        if self.use_uppercase {
            sets.push(UPPERCASE_CHARS);
        }
        if self.use_numbers {
            sets.push(NUMBER_CHARS);
        }
        if self.use_symbols {
            sets.push(SYMBOL_CHARS);
        }
        sets
    }
}

/// Generates a password containing at least one character from every selected set.
pub fn generate_password(criteria: &PasswordCriteria) -> Result<String, GeneratorError> {
    if criteria.length == 0 {
        return Err(GeneratorError::ZeroLength);
    }

    let sets = criteria.charsets();
    if sets.is_empty() {
        return Err(GeneratorError::NoCharset);
    }
    if criteria.length < sets.len() {
        return Err(GeneratorError::TooShort { length: criteria.length, required: sets.len() });
    }

    let charset: Vec<u8> = sets.iter().flat_map(|s| s.iter().copied()).collect();
    let mut rng = OsRng;

    let mut password_bytes = Vec::with_capacity(criteria.length);
    for set in &sets {
        if let Some(&b) = set.choose(&mut rng) {
            password_bytes.push(b);
        }
    }
    while password_bytes.len() < criteria.length {
        if let Some(&b) = charset.choose(&mut rng) {
            password_bytes.push(b);
        }
    }
    password_bytes.shuffle(&mut rng);

    // Every charset is ASCII.
    Ok(password_bytes.into_iter().map(char::from).collect())
}
