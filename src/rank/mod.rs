//! Candidate rankers and the two-stage reranker.

use crate::error::Result;

mod reranker;

pub use self::reranker::{
    split_ranges, CandidateFeaturizer, InitialRankerTrainer, Reranker, RerankerConfig,
    RerankerTrainer, Rescaling, SplitReport,
};

/// Orders the candidates of a query.
pub trait Ranker<Q, C> {
    /// Candidates of `query` paired with scores, best first; scores never
    /// increase along the list.
    ///
    /// When `include_correct` is set, `correct` must appear in the result
    /// even if the ranker would not otherwise propose it.
    fn evaluate(&self, query: &Q, correct: Option<&C>, include_correct: bool)
        -> Result<Vec<(C, f64)>>;

    /// 1-based position of `correct` in the ranking of `query`, if present
    fn rank_of(&self, query: &Q, correct: &C) -> Result<Option<usize>>
    where
        C: PartialEq,
    {
        let ranked = self.evaluate(query, Some(correct), false)?;
        Ok(ranked.iter().position(|(c, _)| c == correct).map(|p| p + 1))
    }
}

impl<Q, C, R: Ranker<Q, C> + ?Sized> Ranker<Q, C> for Box<R> {
    fn evaluate(
        &self,
        query: &Q,
        correct: Option<&C>,
        include_correct: bool,
    ) -> Result<Vec<(C, f64)>> {
        (**self).evaluate(query, correct, include_correct)
    }
}

/// Top-1 accuracy and mean reciprocal rank over a held-out set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankingAccuracy {
    pub examples: usize,
    /// Examples whose correct candidate ranked first
    pub correct: usize,
    pub mean_reciprocal_rank: f64,
}

impl RankingAccuracy {
    pub fn accuracy(&self) -> f64 {
        if self.examples == 0 {
            0.0
        } else {
            self.correct as f64 / self.examples as f64
        }
    }
}

/// Score `ranker` on `(query, correct candidate)` pairs; a missing correct
/// candidate contributes a reciprocal rank of 0.
pub fn evaluate_accuracy<Q, C, R>(ranker: &R, examples: &[(Q, C)]) -> Result<RankingAccuracy>
where
    C: PartialEq,
    R: Ranker<Q, C> + ?Sized,
{
    let mut result = RankingAccuracy {
        examples: examples.len(),
        ..Default::default()
    };
    let mut reciprocal_sum = 0.0;
    for (query, correct) in examples {
        if let Some(rank) = ranker.rank_of(query, correct)? {
            if rank == 1 {
                result.correct += 1;
            }
            reciprocal_sum += 1.0 / rank as f64;
        }
    }
    if !examples.is_empty() {
        result.mean_reciprocal_rank = reciprocal_sum / examples.len() as f64;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ranks candidates by their distance from the query
    struct Nearest(Vec<i32>);

    impl Ranker<i32, i32> for Nearest {
        fn evaluate(
            &self,
            query: &i32,
            _correct: Option<&i32>,
            _include_correct: bool,
        ) -> Result<Vec<(i32, f64)>> {
            let mut ranked: Vec<(i32, f64)> = self
                .0
                .iter()
                .map(|&c| (c, -((c - query).abs() as f64)))
                .collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            Ok(ranked)
        }
    }

    #[test]
    fn test_rank_of() {
        let ranker = Nearest(vec![0, 10, 20]);
        assert_eq!(ranker.rank_of(&9, &10).unwrap(), Some(1));
        assert_eq!(ranker.rank_of(&9, &20).unwrap(), Some(2));
        assert_eq!(ranker.rank_of(&9, &5).unwrap(), None);
    }

    #[test]
    fn test_evaluate_accuracy() {
        let ranker = Nearest(vec![0, 10, 20]);
        let examples = vec![(1, 0), (12, 20), (19, 20), (3, 7)];
        let acc = evaluate_accuracy(&ranker, &examples).unwrap();
        assert_eq!(acc.examples, 4);
        assert_eq!(acc.correct, 2);
        assert_eq!(acc.accuracy(), 0.5);
        assert_eq!(acc.mean_reciprocal_rank, (1.0 + 0.5 + 1.0 + 0.0) / 4.0);
    }
}
