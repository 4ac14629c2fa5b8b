use fxhash::hash64;

use crate::boosts::BoostTable;
use crate::EmbeddingSource;

/// Offline vector generator used whenever the live backend is unavailable.
///
/// Same text (after trimming and lowercasing) always yields the same vector within a
/// deployment; blank text yields a fresh random vector on every call.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    dimension: usize,
    range: f32,
    boosts: BoostTable,
}

impl FallbackGenerator {
    pub fn new(dimension: usize, range: f32, boosts: BoostTable) -> Self {
        Self {
            dimension,
            range,
            boosts,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Produce a vector for `text`, reporting which branch produced it.
    pub fn generate(&self, text: &str) -> (Vec<f32>, EmbeddingSource) {
        let key = text.trim().to_lowercase();
        if key.is_empty() {
            return (self.random(), EmbeddingSource::Random);
        }
        (self.seeded(&key), EmbeddingSource::Fallback)
    }

    /// Hash-seeded draw plus boosts. `key` must already be trimmed and lowercased.
    fn seeded(&self, key: &str) -> Vec<f32> {
        let mut rng = fastrand::Rng::with_seed(hash64(key.as_bytes()));
        let mut v = self.draw(&mut rng);
        self.boosts.apply(key, &mut v);
        v
    }

    fn random(&self) -> Vec<f32> {
        let mut rng = fastrand::Rng::new();
        self.draw(&mut rng)
    }

    fn draw(&self, rng: &mut fastrand::Rng) -> Vec<f32> {
        (0..self.dimension)
            .map(|_| (rng.f32() * 2.0 - 1.0) * self.range)
            .collect()
    }
}
