//! Fitness evaluation of a single genome.
//!
//! A genome is decoded into a [`Network`] once, and the network
//! is handed to a user-supplied [`Objective`]. Anything that goes
//! wrong along the way (an undecodable genome, a panicking objective,
//! a score that is not a finite number) is confined to
//! that genome: it receives [`MINIMAL_FITNESS`] and the fault is
//! kept in its [`FitnessRecord`].
use crate::errors::DecodeError;
use crate::genomics::{Genome, GenomeId};
use crate::networks::Network;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Fitness assigned to genomes whose evaluation faulted.
/// Lower than any score an objective can return.
pub const MINIMAL_FITNESS: f32 = f32::MIN;

/// The outcome of an objective.
///
/// Single-objective tasks only set `score`. Multi-objective
/// tasks also fill `objectives`, which are then ranked by
/// Pareto dominance, with `score` holding their mean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    pub score: f32,
    pub objectives: Vec<f32>,
}

impl Fitness {
    /// A single-objective fitness.
    pub fn scalar(score: f32) -> Fitness {
        Fitness {
            score,
            objectives: vec![],
        }
    }

    /// A multi-objective fitness. Every objective is maximized.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::evaluation::Fitness;
    ///
    /// let fitness = Fitness::multi(vec![1.0, 3.0]);
    /// assert_eq!(fitness.score, 2.0);
    /// ```
    pub fn multi(objectives: Vec<f32>) -> Fitness {
        let score = if objectives.is_empty() {
            MINIMAL_FITNESS
        } else {
            objectives.iter().sum::<f32>() / objectives.len() as f32
        };
        Fitness { score, objectives }
    }

    /// The fitness given to faulted genomes.
    pub fn minimal() -> Fitness {
        Fitness::scalar(MINIMAL_FITNESS)
    }

    /// Returns whether `self` is at least as good as `other`
    /// in every objective, and strictly better in one.
    pub fn dominates(&self, other: &Fitness) -> bool {
        if self.objectives.is_empty() || self.objectives.len() != other.objectives.len() {
            return self.score > other.score;
        }
        let pairs = self.objectives.iter().zip(&other.objectives);
        pairs.clone().all(|(a, b)| a >= b) && pairs.into_iter().any(|(a, b)| a > b)
    }

    fn check(&self) -> Result<(), Fault> {
        for &value in std::iter::once(&self.score).chain(&self.objectives) {
            if !value.is_finite() {
                return Err(Fault::NonFinite(value));
            }
        }
        Ok(())
    }
}

impl From<f32> for Fitness {
    fn from(score: f32) -> Fitness {
        Fitness::scalar(score)
    }
}

impl From<Vec<f32>> for Fitness {
    fn from(objectives: Vec<f32>) -> Fitness {
        Fitness::multi(objectives)
    }
}

/// A task networks are evaluated on. Higher fitness is better.
///
/// Objectives run concurrently on worker threads and must not
/// rely on evaluation order. Any closure taking a `&Network`
/// and returning an `f32` (or a `Vec<f32>` of objectives)
/// is an objective.
///
/// # Examples
/// ```
/// use evolvenn::evaluation::Objective;
/// use evolvenn::networks::Network;
///
/// fn assert_objective<O: Objective>(_: &O) {}
///
/// assert_objective(&|network: &Network| network.evaluate(&[1.0])[0]);
/// ```
pub trait Objective: Sync {
    fn fitness(&self, network: &Network) -> Fitness;
}

impl<F, T> Objective for F
where
    F: Fn(&Network) -> T + Sync,
    T: Into<Fitness>,
{
    fn fitness(&self, network: &Network) -> Fitness {
        self(network).into()
    }
}

/// Reasons a genome received the minimal fitness.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Fault {
    #[error("genome could not be decoded: {0}")]
    Decode(#[from] DecodeError),
    #[error("objective panicked: {0}")]
    Panicked(String),
    #[error("objective returned a non-finite value ({0})")]
    NonFinite(f32),
}

/// The fitness of one genome in one generation.
///
/// Records are never modified once created; evaluating
/// a genome again produces a new record.
#[derive(Clone, Debug, PartialEq)]
pub struct FitnessRecord {
    genome: GenomeId,
    generation: usize,
    fitness: Fitness,
    fault: Option<Fault>,
}

impl FitnessRecord {
    /// Returns the identity of the evaluated genome.
    pub fn genome(&self) -> GenomeId {
        self.genome
    }

    /// Returns the generation the evaluation belongs to.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the scalar fitness.
    pub fn score(&self) -> f32 {
        self.fitness.score
    }

    /// Returns the full fitness, objectives included.
    pub fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    /// Returns the fault that replaced the genome's fitness, if any.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Decodes `genome`, runs `objective` on the resulting network,
/// and records the outcome for `generation`.
///
/// Never fails: faults produce a record with minimal fitness.
///
/// # Examples
/// ```
/// use evolvenn::evaluation::{evaluate_genome, MINIMAL_FITNESS};
/// use evolvenn::genomics::{GeneticConfig, Genome, History};
/// use evolvenn::networks::Network;
/// use evolvenn::rng;
///
/// let config = GeneticConfig::zero();
/// let genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
///
/// let record = evaluate_genome(&genome, &|_: &Network| 2.0, 0);
/// assert_eq!(record.score(), 2.0);
///
/// let record = evaluate_genome(&genome, &|_: &Network| f32::NAN, 0);
/// assert!(record.is_fault());
/// assert_eq!(record.score(), MINIMAL_FITNESS);
/// ```
pub fn evaluate_genome<O>(genome: &Genome, objective: &O, generation: usize) -> FitnessRecord
where
    O: Objective + ?Sized,
{
    let outcome = Network::new(genome)
        .map_err(Fault::from)
        .and_then(|network| run_objective(&network, objective));

    let (fitness, fault) = match outcome {
        Ok(fitness) => (fitness, None),
        Err(fault) => {
            warn!(genome = %genome.id(), generation, %fault, "evaluation fault");
            (Fitness::minimal(), Some(fault))
        }
    };
    FitnessRecord {
        genome: genome.id(),
        generation,
        fitness,
        fault,
    }
}

/// Returns the scalar fitness of `genome` under `objective`,
/// or [`MINIMAL_FITNESS`] if the evaluation faulted.
pub fn fitness<O>(genome: &Genome, objective: &O) -> f32
where
    O: Objective + ?Sized,
{
    evaluate_genome(genome, objective, genome.origin()).score()
}

fn run_objective<O>(network: &Network, objective: &O) -> Result<Fitness, Fault>
where
    O: Objective + ?Sized,
{
    let fitness = panic::catch_unwind(AssertUnwindSafe(|| objective.fitness(network)))
        .map_err(|payload| Fault::Panicked(panic_message(payload.as_ref())))?;
    fitness.check()?;
    Ok(fitness)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{GeneticConfig, History};
    use crate::rng;

    fn genome() -> Genome {
        let config = GeneticConfig {
            initial_expression_chance: 1.0,
            ..GeneticConfig::zero()
        };
        let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
        genome.set_fitness(1.0);
        genome
    }

    #[test]
    fn scores_decoded_network() {
        let genome = genome();
        let record = evaluate_genome(&genome, &|n: &Network| n.evaluate(&[0.0])[0], 4);
        assert_eq!(record.genome(), genome.id());
        assert_eq!(record.generation(), 4);
        assert_eq!(record.score(), 0.5);
        assert!(!record.is_fault());
    }

    #[test]
    fn panicking_objective_is_a_fault() {
        let record = evaluate_genome(&genome(), &|_: &Network| -> f32 { panic!("diverged") }, 0);
        assert_eq!(record.score(), MINIMAL_FITNESS);
        assert_eq!(record.fault(), Some(&Fault::Panicked("diverged".to_string())));
    }

    #[test]
    fn invalid_scores_are_faults() {
        let genome = genome();
        let infinite = evaluate_genome(&genome, &|_: &Network| f32::INFINITY, 0);
        let bad_objective = evaluate_genome(&genome, &|_: &Network| vec![1.0, f32::NAN], 0);
        assert_eq!(infinite.fault(), Some(&Fault::NonFinite(f32::INFINITY)));
        assert!(bad_objective.is_fault());
        assert_eq!(bad_objective.fitness(), &Fitness::minimal());
    }

    #[test]
    fn negative_scores_are_valid() {
        let genome = genome();
        let record = evaluate_genome(&genome, &|_: &Network| -3.5, 0);
        assert!(!record.is_fault());
        assert_eq!(record.score(), -3.5);
        let objectives = evaluate_genome(&genome, &|_: &Network| vec![-1.0, -2.0], 0);
        assert_eq!(objectives.score(), -1.5);
        assert!(MINIMAL_FITNESS < record.score());
    }

    #[test]
    fn undecodable_genome_is_a_fault() {
        let mut value = serde_json::to_value(genome()).unwrap();
        value["genes"]["0"]["input"] = serde_json::json!(7);
        let broken: Genome = serde_json::from_value(value).unwrap();
        let record = evaluate_genome(&broken, &|_: &Network| 1.0, 0);
        assert!(matches!(record.fault(), Some(Fault::Decode(_))));
        assert_eq!(fitness(&broken, &|_: &Network| 1.0), MINIMAL_FITNESS);
    }

    #[test]
    fn pareto_dominance() {
        let a = Fitness::multi(vec![1.0, 2.0]);
        let b = Fitness::multi(vec![1.0, 1.0]);
        let c = Fitness::multi(vec![2.0, 0.0]);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        assert!(!a.dominates(&c) && !c.dominates(&a));
        assert!(!a.dominates(&a));
        assert!(Fitness::scalar(2.0).dominates(&Fitness::scalar(1.0)));
    }
}
