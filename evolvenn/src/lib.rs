//! A neuroevolution engine, evolving the topology and weights of
//! neural networks after NeuroEvolution of Augmenting Topologies:
//! <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! A run holds a fixed-size population of [`Genome`]s. Every
//! generation, each genome is decoded into a [`Network`] and scored
//! by a user-supplied objective on a pool of worker threads; the
//! population is then ranked, optionally split into species, and bred
//! into the next generation. Runs are reproducible: all genetic
//! operators draw from a single stream seeded by the configuration.
//!
//! [`Genome`]: genomics::Genome
//! [`Network`]: networks::Network
//!
//! # Example usage: Evolution of XOR function approximator
//! ```
//! use evolvenn::genomics::{ActivationType, GeneticConfig, MutationRates};
//! use evolvenn::networks::Network;
//! use evolvenn::populations::{PopulationConfig, SelectionPolicy, SpeciationConfig};
//! use evolvenn::{create_run, RunConfig, StoppingCriteria};
//! use std::num::NonZeroUsize;
//!
//! // Allowed error margin for neural net answers.
//! const ERROR_MARGIN: f32 = 0.3;
//!
//! fn evaluate_xor(network: &Network) -> f32 {
//!     let values = [
//!         ([1.0, 0.0, 0.0], 0.0),
//!         ([1.0, 0.0, 1.0], 1.0),
//!         ([1.0, 1.0, 0.0], 1.0),
//!         ([1.0, 1.0, 1.0], 0.0),
//!     ];
//!
//!     let mut errors = [0.0, 0.0, 0.0, 0.0];
//!     for (i, (input, output)) in values.iter().enumerate() {
//!         errors[i] = (network.evaluate(input)[0] - output).abs();
//!         if errors[i] < ERROR_MARGIN {
//!             errors[i] = 0.0;
//!         }
//!     }
//!
//!     (4.0 - errors.iter().copied().sum::<f32>()).powf(2.0)
//! }
//!
//! fn main() {
//!     let config = RunConfig {
//!         genetic: GeneticConfig {
//!             input_count: NonZeroUsize::new(3).unwrap(),
//!             output_count: NonZeroUsize::new(1).unwrap(),
//!             activation_types: vec![ActivationType::Sigmoid],
//!             output_activation_types: vec![ActivationType::Sigmoid],
//!             mutation_rates: MutationRates {
//!                 weight_perturbation: 0.8,
//!                 add_connection: 0.05,
//!                 add_node: 0.03,
//!                 ..MutationRates::zero()
//!             },
//!             mate_by_averaging_chance: 0.4,
//!             suppression_reset_chance: 1.0,
//!             initial_expression_chance: 1.0,
//!             weight_bound: 5.0,
//!             weight_reset_chance: 0.2,
//!             weight_nudge_chance: 0.9,
//!             weight_mutation_power: 2.5,
//!             max_gene_addition_mutation_attempts: 20,
//!             excess_gene_factor: 1.0,
//!             disjoint_gene_factor: 1.0,
//!             common_weight_factor: 0.4,
//!             ..GeneticConfig::zero()
//!         },
//!         population: PopulationConfig {
//!             size: 150,
//!             crossover_rate: 0.6,
//!             elitism_count: 1,
//!             selection: SelectionPolicy::Truncation { fraction: 0.2 },
//!             speciation: SpeciationConfig {
//!                 enabled: true,
//!                 distance_threshold: 3.0,
//!                 stagnation_threshold: 15,
//!                 stagnation_penalty: 1.0,
//!                 interspecies_mating_chance: 0.001,
//!             },
//!         },
//!         stopping_criteria: StoppingCriteria {
//!             max_generations: Some(30),
//!             target_fitness: Some(16.0),
//!             stagnation_limit: None,
//!         },
//!         random_seed: 42,
//!         worker_count: None,
//!     };
//!
//!     let mut run = create_run(config).expect("valid configuration");
//!     let reason = run.run_to_completion(&evaluate_xor).expect("run failed");
//!
//!     let champion = run.champion().unwrap();
//!     println!("{:?} after generation {}: {}", reason, run.generation(), champion.genome);
//! }
//! ```

pub mod errors;
pub mod evaluation;
pub mod evolution;
pub mod genomics;
pub mod networks;
pub mod populations;
pub mod rng;
pub mod scheduler;

pub use errors::{ConfigError, DecodeError, EvolutionError};
pub use evaluation::{Fitness, FitnessRecord, Objective};
pub use evolution::{
    create_run, CancellationToken, Champion, EvolutionState, Phase, RunConfig, StoppingCriteria,
    TerminationReason,
};

/// Innovation numbers identify genes and nodes
/// across the genomes of a run.
pub type Innovation = usize;
