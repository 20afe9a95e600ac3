//! Deterministic hash-based embedder for tests and offline development.

use std::hash::Hasher;

use twox_hash::XxHash64;

use klubbsvar_core::Result;

use crate::{l2_normalize, EmbedProvider};

const DEFAULT_DIM: usize = 64;

/// Maps each whitespace token to a bucket by hash. No semantics, but the
/// same text always embeds to the same unit vector, and texts sharing
/// tokens land near each other — enough for pipeline tests.
pub struct FakeProvider {
    dim: usize,
    id: String,
}

impl FakeProvider {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            id: format!("fake:d{dim}"),
        }
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl EmbedProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let out = texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dim];
                for token in text.to_lowercase().split_whitespace() {
                    let mut hasher = XxHash64::with_seed(0);
                    hasher.write(token.as_bytes());
                    let bucket = (hasher.finish() % self.dim as u64) as usize;
                    v[bucket] += 1.0;
                }
                l2_normalize(&mut v);
                v
            })
            .collect();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_normalized() {
        let p = FakeProvider::default();
        let texts = vec!["sesongkort på Føyka".to_string()];
        let a = p.embed_batch(&texts).unwrap();
        let b = p.embed_batch(&texts).unwrap();
        assert_eq!(a, b);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_tokens_score_higher_than_disjoint() {
        let p = FakeProvider::default();
        let texts = vec![
            "billetter til kamp".to_string(),
            "billetter til konsert".to_string(),
            "helt annet innhold her".to_string(),
        ];
        let vs = p.embed_batch(&texts).unwrap();
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&vs[0], &vs[1]) > dot(&vs[0], &vs[2]));
    }

    #[test]
    fn empty_text_embeds_to_zero() {
        let p = FakeProvider::default();
        let vs = p.embed_batch(&[String::new()]).unwrap();
        assert!(vs[0].iter().all(|&x| x == 0.0));
    }
}
