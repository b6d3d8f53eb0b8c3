use rand::prelude::Rng;
use serde::{Deserialize, Serialize};

/// Policies choosing a parent among ranked candidates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// The best of `size` candidates drawn uniformly,
    /// with replacement.
    Tournament { size: usize },
    /// A candidate drawn with probability proportional
    /// to its fitness, or uniformly if every fitness is 0.
    FitnessProportionate,
    /// A candidate drawn uniformly from the top `fraction`
    /// of the candidates. At least one candidate is kept.
    Truncation { fraction: f32 },
}

impl SelectionPolicy {
    /// Chooses a candidate from `ranked`, a list of
    /// `(candidate, fitness)` pairs sorted from best to worst.
    ///
    /// Returns `None` only if `ranked` is empty.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::populations::SelectionPolicy;
    /// use evolvenn::rng;
    ///
    /// let ranked = [(7, 3.0), (2, 2.0), (5, 0.0)];
    /// let mut rng = rng::seeded(0);
    ///
    /// let policy = SelectionPolicy::Truncation { fraction: 0.1 };
    /// assert_eq!(policy.select(&ranked, &mut rng), Some(7));
    /// assert_eq!(policy.select(&[], &mut rng), None);
    /// ```
    pub fn select<R: Rng + ?Sized>(&self, ranked: &[(usize, f32)], rng: &mut R) -> Option<usize> {
        if ranked.is_empty() {
            return None;
        }
        let position = match *self {
            SelectionPolicy::Tournament { size } => (0..size.max(1))
                .map(|_| rng.gen_range(0..ranked.len()))
                .min()
                .unwrap_or(0),
            SelectionPolicy::FitnessProportionate => Self::roulette(ranked, rng),
            SelectionPolicy::Truncation { fraction } => {
                let kept = (ranked.len() as f32 * fraction).ceil() as usize;
                rng.gen_range(0..kept.clamp(1, ranked.len()))
            }
        };
        Some(ranked[position].0)
    }

    fn roulette<R: Rng + ?Sized>(ranked: &[(usize, f32)], rng: &mut R) -> usize {
        let total: f32 = ranked.iter().map(|(_, fitness)| fitness.max(0.0)).sum();
        if total <= 0.0 {
            return rng.gen_range(0..ranked.len());
        }
        let mut pick = rng.gen_range(0.0..total);
        for (position, (_, fitness)) in ranked.iter().enumerate() {
            let fitness = fitness.max(0.0);
            if pick < fitness {
                return position;
            }
            pick -= fitness;
        }
        // Rounding can leave a sliver past the last slot.
        ranked.iter().rposition(|(_, fitness)| *fitness > 0.0).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;

    fn ranked() -> Vec<(usize, f32)> {
        vec![(10, 4.0), (11, 3.0), (12, 1.0), (13, 0.0)]
    }

    fn tally(policy: SelectionPolicy, draws: usize) -> [usize; 4] {
        let mut rng = rng::seeded(5);
        let mut counts = [0; 4];
        for _ in 0..draws {
            let chosen = policy.select(&ranked(), &mut rng).unwrap();
            counts[chosen - 10] += 1;
        }
        counts
    }

    #[test]
    fn tournament_favours_better_ranks() {
        let counts = tally(SelectionPolicy::Tournament { size: 3 }, 4000);
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[3]);
        assert_eq!(tally(SelectionPolicy::Tournament { size: 1 }, 100).iter().sum::<usize>(), 100);
    }

    #[test]
    fn fitness_proportionate_never_picks_zero_fitness() {
        let counts = tally(SelectionPolicy::FitnessProportionate, 4000);
        assert_eq!(counts[3], 0);
        assert!(counts[0] > counts[2]);

        let mut rng = rng::seeded(1);
        let flat = [(0, 0.0), (1, 0.0)];
        let policy = SelectionPolicy::FitnessProportionate;
        assert!((0..50).all(|_| policy.select(&flat, &mut rng).is_some()));
    }

    #[test]
    fn truncation_keeps_top_fraction() {
        let counts = tally(SelectionPolicy::Truncation { fraction: 0.5 }, 1000);
        assert_eq!(counts[2] + counts[3], 0);
        assert!(counts[0] > 0 && counts[1] > 0);
        let all = tally(SelectionPolicy::Truncation { fraction: 1.0 }, 1000);
        assert!(all.iter().all(|c| *c > 0));
    }
}
