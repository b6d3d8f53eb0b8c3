//! Error types surfaced by the public API.

use crate::genomics::ValidityError;

use thiserror::Error;

/// Errors that stop a run from starting or continuing.
///
/// Faults confined to a single genome never surface here:
/// they become minimal-fitness records instead.
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// The run configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The evaluation worker pool could not be created.
    #[error("failed to build the evaluation worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    /// Fewer fitness records than genomes came back from the workers.
    #[error("evaluation of generation {generation} returned {received} of {expected} records")]
    IncompleteEvaluation {
        generation: usize,
        expected: usize,
        received: usize,
    },
    /// The population was bred before being evaluated and speciated.
    #[error("generation {generation} has no genome eligible for selection")]
    DegeneratePopulation { generation: usize },
}

/// A run configuration that cannot produce a meaningful run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("population size must be positive")]
    EmptyPopulation,
    #[error("worker count must be positive")]
    NoWorkers,
    #[error("elitism count {elitism} exceeds population size {population_size}")]
    ExcessiveElitism {
        elitism: usize,
        population_size: usize,
    },
    #[error("crossover rate is 0 and no mutation can alter a genome")]
    NoVariation,
    #[error("{name} must lie within [0, 1], found {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f32 },
    #[error("{name} is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("no stopping criterion is configured")]
    NoStoppingCriterion,
}

/// Failure to decode a genome into a network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("genome has no {0} nodes")]
    MissingTerminals(&'static str),
    #[error(transparent)]
    Invalid(#[from] ValidityError),
}
