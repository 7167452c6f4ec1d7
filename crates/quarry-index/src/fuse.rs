//! Reciprocal rank fusion of lexical and vector rankings.

use std::collections::HashMap;

use crate::chunk::SearchHit;

/// Standard RRF rank constant.
const RRF_K: f32 = 60.0;

/// Merge two ranked lists with reciprocal rank fusion.
///
/// Each item at 0-indexed rank `r` contributes `1 / (60 + r + 1)`, weighted
/// `(1 - alpha)` for the lexical list and `alpha` for the vector list, and
/// contributions are summed per chunk id. The payload comes from whichever
/// list first produced the id. An empty vector list degenerates to the
/// lexical ranking unchanged.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fuse(
    lexical: Vec<SearchHit>,
    vector: Vec<SearchHit>,
    alpha: f32,
    top_k: usize,
) -> Vec<SearchHit> {
    if vector.is_empty() {
        let mut hits = lexical;
        hits.truncate(top_k);
        return hits;
    }

    let alpha = alpha.clamp(0.0, 1.0);
    let mut fused: Vec<SearchHit> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for (weight, list) in [(1.0 - alpha, lexical), (alpha, vector)] {
        if weight <= 0.0 {
            continue;
        }
        for (rank, hit) in list.into_iter().enumerate() {
            let contribution = weight / (RRF_K + rank as f32 + 1.0);
            if let Some(&i) = index_of.get(&hit.id) {
                fused[i].score += contribution;
            } else {
                index_of.insert(hit.id.clone(), fused.len());
                fused.push(SearchHit {
                    score: contribution,
                    ..hit
                });
            }
        }
    }

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(top_k);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkMetadata;

    fn hit(id: &str, score: f32) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            content: format!("content of {id}"),
            metadata: ChunkMetadata {
                source: format!("{id}.txt"),
                kind: "text".to_string(),
                unit: "text".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                line_range: (1, 1),
                summary: String::new(),
                file_hash: "h".to_string(),
                indexed_at: chrono::Utc::now(),
            },
            score,
        }
    }

    #[test]
    fn alpha_zero_keeps_only_lexical() {
        let fused = fuse(vec![hit("lex", 0.9)], vec![hit("vec", 0.9)], 0.0, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].id, "lex");
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn alpha_one_keeps_only_vector() {
        let fused = fuse(vec![hit("lex", 0.9)], vec![hit("vec", 0.9)], 1.0, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].id, "vec");
    }

    #[test]
    fn document_in_both_lists_outranks_single_list_peers() {
        let lexical = vec![hit("both", 0.8), hit("lex-only", 0.7)];
        let vector = vec![hit("both", 0.9), hit("vec-only", 0.6)];
        let fused = fuse(lexical, vector, 0.5, 10);
        assert_eq!(fused[0].id, "both");
        assert!(fused[0].score > fused[1].score);
    }

    #[test]
    fn empty_vector_list_passthrough() {
        let lexical = vec![hit("a", 0.9), hit("b", 0.5)];
        let fused = fuse(lexical.clone(), Vec::new(), 0.5, 10);
        assert_eq!(fused.len(), 2);
        // Lexical scores survive untouched in the degenerate case.
        assert!((fused[0].score - 0.9).abs() < f32::EPSILON);
        assert_eq!(fused[0].id, "a");
    }

    #[test]
    fn payload_from_first_producing_list() {
        let mut lex_hit = hit("shared", 0.9);
        lex_hit.content = "lexical payload".to_string();
        let mut vec_hit = hit("shared", 0.8);
        vec_hit.content = "vector payload".to_string();

        let fused = fuse(vec![lex_hit], vec![vec_hit], 0.5, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].content, "lexical payload");
    }

    #[test]
    fn rank_decay_orders_within_a_list() {
        let lexical = vec![hit("first", 0.9), hit("second", 0.8), hit("third", 0.7)];
        let fused = fuse(lexical, vec![hit("other", 0.9)], 0.0, 10);
        let ids: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn top_k_truncates_fused_output() {
        let lexical = vec![hit("a", 0.9), hit("b", 0.8)];
        let vector = vec![hit("c", 0.9), hit("d", 0.8)];
        assert_eq!(fuse(lexical, vector, 0.5, 2).len(), 2);
    }

    #[test]
    fn out_of_range_alpha_clamped() {
        let fused = fuse(vec![hit("lex", 0.9)], vec![hit("vec", 0.9)], 7.5, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].id, "vec");
    }
}
