//! Deterministic embedding model for grading tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatprobe_grader::{EmbeddingModel, GradeError, GradeResult};

/// Texts containing this marker fail to embed
pub const EMBED_FAIL: &str = "EMBED_FAIL";

/// Looks embeddings up in a fixed table; unknown texts map to a vector
/// orthogonal to every entry.
pub struct TableModel {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl TableModel {
    pub fn new() -> Self {
        let table = [
            ("Paris", vec![1.0, 0.0, 0.0, 0.0]),
            ("The capital of France is Paris.", vec![0.9, 0.3, 0.0, 0.0]),
            ("42", vec![0.0, 1.0, 0.0, 0.0]),
            ("42.0", vec![0.0, 0.95, 0.3, 0.0]),
            ("The answer is unrelated text about weather", vec![0.1, 0.0, 0.0, 1.0]),
        ]
        .into_iter()
        .map(|(text, vector)| (text.to_string(), vector))
        .collect();

        Self {
            table,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingModel for TableModel {
    async fn encode(&self, text: &str) -> GradeResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains(EMBED_FAIL) {
            return Err(GradeError::Embedding("model unavailable".to_string()));
        }
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 1.0, 0.0]))
    }
}
