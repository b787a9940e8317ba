//! Similar-pattern lookup.

use forge_core::{Intent, PatternRecord, PatternReference, PipelineStore, Result};

/// Scores for patterns that share the request's intent.
const SAME_INTENT_SCORES: [f64; 3] = [0.9, 0.8, 0.7];
/// Scores for the most-used patterns of any intent.
const FALLBACK_SCORES: [f64; 3] = [0.5, 0.4, 0.3];

/// Up to three references to prior patterns, best first.
///
/// Patterns of the same intent are ranked by usage count, then success rate.
/// When there are none, the most-used patterns of any intent are returned with
/// lower scores.
///
/// # Errors
/// Returns an error if the store cannot be read.
pub async fn find_similar_patterns(
    store: &dyn PipelineStore,
    intent: Intent,
) -> Result<Vec<PatternReference>> {
    let mut same_intent = store.list_patterns(Some(intent)).await?;
    if !same_intent.is_empty() {
        same_intent.sort_by(|left, right| {
            right
                .usage_count
                .cmp(&left.usage_count)
                .then_with(|| right.success_rate().total_cmp(&left.success_rate()))
        });
        return Ok(to_references(&same_intent, &SAME_INTENT_SCORES));
    }

    let mut any_intent = store.list_patterns(None).await?;
    any_intent.sort_by(|left, right| right.usage_count.cmp(&left.usage_count));
    Ok(to_references(&any_intent, &FALLBACK_SCORES))
}

fn to_references(patterns: &[PatternRecord], scores: &[f64]) -> Vec<PatternReference> {
    patterns
        .iter()
        .zip(scores)
        .map(|(pattern, score)| PatternReference {
            id: pattern.id.clone(),
            similarity: *score,
            name: pattern.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::MemoryStore;

    fn pattern(id: &str, intent: Intent, usage: u64, successes: u64) -> PatternRecord {
        let mut record = PatternRecord::new(id, format!("Pattern {id}"), intent);
        record.usage_count = usage;
        record.success_count = successes;
        record.failure_count = usage - successes;
        record
    }

    #[tokio::test]
    async fn test_same_intent_ranking() -> Result<()> {
        let store = MemoryStore::new();
        for record in [
            pattern("a", Intent::Chart, 5, 1),
            pattern("b", Intent::Chart, 9, 9),
            pattern("c", Intent::Chart, 5, 5),
            pattern("d", Intent::Chart, 1, 1),
            pattern("e", Intent::Form, 50, 50),
        ] {
            store.save_pattern(record).await?;
        }

        let references = find_similar_patterns(&store, Intent::Chart).await?;
        let ids: Vec<_> = references.iter().map(|reference| reference.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert!((references[0].similarity - 0.9).abs() < f64::EPSILON);
        assert!((references[2].similarity - 0.7).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_to_most_used() -> Result<()> {
        let store = MemoryStore::new();
        store.save_pattern(pattern("x", Intent::Form, 3, 3)).await?;
        store.save_pattern(pattern("y", Intent::Table, 7, 2)).await?;

        let references = find_similar_patterns(&store, Intent::Game).await?;
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].id, "y");
        assert!((references[0].similarity - 0.5).abs() < f64::EPSILON);
        assert!((references[1].similarity - 0.4).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_patterns() -> Result<()> {
        let references = find_similar_patterns(&MemoryStore::new(), Intent::Chart).await?;
        assert!(references.is_empty());
        Ok(())
    }
}
