pub mod error;
pub mod random;
pub mod seq;

pub use error::GeneratorError;
pub use random::{generate, RandomGenerator, ALPHABET, DEFAULT_LENGTH};
pub use seq::SeqGenerator;

use burrow_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is not guaranteed here; the store decides what a duplicate
/// means.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self) -> ShortCode;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self) -> ShortCode {
        (**self).generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_object_safe() {
        let generators: Vec<Box<dyn Generator>> = vec![
            Box::new(RandomGenerator::default()),
            Box::new(SeqGenerator::with_prefix("wh")),
        ];

        for generator in generators {
            assert!(!generator.generate().as_str().is_empty());
        }
    }

    #[test]
    fn boxed_generator_delegates() {
        let boxed: Box<dyn Generator> = Box::new(SeqGenerator::with_prefix("b"));
        assert_eq!(Generator::generate(&boxed).as_str(), "b000000");
    }
}
