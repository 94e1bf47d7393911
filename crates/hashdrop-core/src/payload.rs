//! Payload shape: fixed size, fixed alphabet, uniform sampling.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Default payload size in bytes.
pub const DEFAULT_PAYLOAD_SIZE: usize = 1024;

/// Default alphabet: ASCII upper and lower case letters, then digits.
pub const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadSpecError {
    #[error("payload size must be greater than zero")]
    ZeroSize,
    #[error("payload alphabet must not be empty")]
    EmptyAlphabet,
    #[error("payload alphabet must be ASCII")]
    NonAsciiAlphabet,
}

/// How payloads are generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSpec {
    size: usize,
    alphabet: Vec<u8>,
}

impl PayloadSpec {
    pub fn new(size: usize, alphabet: &str) -> Result<Self, PayloadSpecError> {
        if size == 0 {
            return Err(PayloadSpecError::ZeroSize);
        }
        if alphabet.is_empty() {
            return Err(PayloadSpecError::EmptyAlphabet);
        }
        if !alphabet.is_ascii() {
            return Err(PayloadSpecError::NonAsciiAlphabet);
        }
        let mut symbols = alphabet.as_bytes().to_vec();
        symbols.sort_unstable();
        symbols.dedup();
        Ok(Self {
            size,
            alphabet: symbols,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    /// True if `byte` belongs to the alphabet.
    pub fn allows(&self, byte: u8) -> bool {
        self.alphabet.binary_search(&byte).is_ok()
    }

    /// Draw a fresh payload from the thread-local RNG.
    pub fn generate(&self) -> Vec<u8> {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Draw a fresh payload from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u8> {
        (0..self.size)
            .filter_map(|_| self.alphabet.choose(rng).copied())
            .collect()
    }
}

impl Default for PayloadSpec {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAYLOAD_SIZE,
            alphabet: {
                let mut symbols = DEFAULT_ALPHABET.as_bytes().to_vec();
                symbols.sort_unstable();
                symbols
            },
        }
    }
}
