use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of record payloads. Output is trusted: the engine does not check
/// that the returned string has the requested length.
pub trait DataGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Random strings over `[A-Za-z0-9]`
pub struct AlphanumericGenerator {
    seeded: Option<Mutex<StdRng>>,
}

impl AlphanumericGenerator {
    pub fn new() -> Self {
        AlphanumericGenerator { seeded: None }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        AlphanumericGenerator {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for AlphanumericGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn sample<R: Rng>(rng: &mut R, length: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

impl DataGenerator for AlphanumericGenerator {
    fn generate(&self, length: usize) -> String {
        match &self.seeded {
            Some(rng) => sample(&mut *rng.lock(), length),
            None => sample(&mut rand::thread_rng(), length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_has_requested_length_and_alphabet() {
        let generator = AlphanumericGenerator::new();
        for length in [0, 1, 100] {
            let s = generator.generate(length);
            assert_eq!(s.len(), length);
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn seeded_generators_agree() {
        let a = AlphanumericGenerator::seeded(42);
        let b = AlphanumericGenerator::seeded(42);
        assert_eq!(a.generate(32), b.generate(32));
    }
}
