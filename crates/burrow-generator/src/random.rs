use crate::error::GeneratorError;
use crate::Generator;
use burrow_core::shortcode::{MAX_LENGTH, MIN_LENGTH};
use burrow_core::ShortCode;
use std::iter;

/// The 64 characters short codes are drawn from.
pub const ALPHABET: &[u8; 64] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

pub const DEFAULT_LENGTH: usize = 10;

/// Draws `length` characters uniformly at random from [`ALPHABET`].
///
/// Not cryptographically secure.
pub fn generate(length: i64) -> Result<String, GeneratorError> {
    let length = usize::try_from(length).map_err(|_| GeneratorError::InvalidLength(length))?;
    Ok(random_string(length))
}

fn random_string(length: usize) -> String {
    iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// Produces fixed-length random short codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Fails unless every code of `length` characters is a valid
    /// [`ShortCode`].
    pub fn new(length: i64) -> Result<Self, GeneratorError> {
        match usize::try_from(length) {
            Ok(valid @ MIN_LENGTH..=MAX_LENGTH) => Ok(Self { length: valid }),
            _ => Err(GeneratorError::LengthOutOfRange {
                length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            }),
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        ShortCode::new_unchecked(random_string(self.length))
    }
}
