use crate::genomics::ActivationType;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Per-operator mutation probabilities.
///
/// Each operator is gated independently: a single
/// call to [`Genome::mutate`] may apply any subset
/// of them.
///
/// [`Genome::mutate`]: crate::genomics::Genome::mutate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRates {
    /// Chance of a weight mutation pass over all genes.
    pub weight_perturbation: f32,
    /// Chance of a gene (connection) addition.
    pub add_connection: f32,
    /// Chance of a gene (connection) deletion.
    pub remove_connection: f32,
    /// Chance of a node addition, splitting an existing gene.
    pub add_node: f32,
    /// Chance of a hidden node deletion.
    pub remove_node: f32,
}

impl MutationRates {
    /// Returns a set of rates that are all 0.
    pub const fn zero() -> MutationRates {
        MutationRates {
            weight_perturbation: 0.0,
            add_connection: 0.0,
            remove_connection: 0.0,
            add_node: 0.0,
            remove_node: 0.0,
        }
    }

    /// Returns each rate paired with its name.
    pub fn named(&self) -> [(&'static str, f32); 5] {
        [
            ("weight_perturbation", self.weight_perturbation),
            ("add_connection", self.add_connection),
            ("remove_connection", self.remove_connection),
            ("add_node", self.add_node),
            ("remove_node", self.remove_node),
        ]
    }
}

impl Default for MutationRates {
    fn default() -> MutationRates {
        MutationRates {
            weight_perturbation: 0.8,
            add_connection: 0.05,
            remove_connection: 0.002,
            add_node: 0.03,
            remove_node: 0.001,
        }
    }
}

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Values
/// outside of it are rejected when a run is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of inputs in a genome.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Possible activation types for hidden nodes in a genome.
    /// If an empty vector is given, nodes will default
    /// to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub activation_types: Vec<ActivationType>,
    /// Activation types of output nodes in a genome.
    /// If fewer than [`output_count`] are specified,
    /// the default is [`Sigmoid`].
    ///
    /// [`output_count`]: GeneticConfig::output_count
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub output_activation_types: Vec<ActivationType>,
    /// Per-operator mutation probabilities.
    pub mutation_rates: MutationRates,
    /// Chance that common gene weights are averaged during crossover,
    /// instead of copying the weight from a randomly chosen parent.
    pub mate_by_averaging_chance: f32,
    /// Chance a suppressed gene inherited through
    /// crossover is expressed again.
    pub suppression_reset_chance: f32,
    /// Chance that a gene between an input-output node pair
    /// is created during initial genome generation.
    pub initial_expression_chance: f32,
    /// Maximum magnitude of a gene's weight.
    pub weight_bound: f32,
    /// Chance of a gene weight being reset during a weight mutation.
    pub weight_reset_chance: f32,
    /// Chance of a gene weight being nudged during a weight mutation,
    /// if not reset.
    pub weight_nudge_chance: f32,
    /// Magnitude of bound on weight nudge uniform distribution.
    /// It is assumed to be lesser than [`weight_bound`].
    ///
    /// [`weight_bound`]: GeneticConfig::weight_bound
    pub weight_mutation_power: f32,
    /// Number of generations after which the weight nudge
    /// magnitude is halved. 0 disables the decay.
    pub weight_mutation_half_life: f32,
    /// Maximum number of gene addition attempts before
    /// the mutation returns with failure.
    pub max_gene_addition_mutation_attempts: usize,
    /// Chance that a gene closing a cycle is allowed
    /// (and tagged as recurrent) during gene addition.
    pub recursion_chance: f32,
    /// Weight of excess genes in genetic distance.
    pub excess_gene_factor: f32,
    /// Weight of disjoint genes in genetic distance.
    pub disjoint_gene_factor: f32,
    /// Weight of the common gene weight average in genetic distance.
    pub common_weight_factor: f32,
}

/// Lower bound on the decayed nudge magnitude,
/// as a fraction of [`GeneticConfig::weight_mutation_power`].
const MIN_SPREAD_FACTOR: f32 = 0.01;

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::GeneticConfig;
    ///
    /// let cfg1 = GeneticConfig::zero();
    ///
    /// let cfg2 = GeneticConfig {
    ///     // Specify some values here...
    ///     recursion_chance: 1.0,
    ///     weight_bound: 3.0,
    ///     // Default the rest...
    ///     ..GeneticConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            // SAFETY: 1 is a valid NonZeroUsize.
            input_count: unsafe { NonZeroUsize::new_unchecked(1) },
            output_count: unsafe { NonZeroUsize::new_unchecked(1) },
            activation_types: vec![],
            output_activation_types: vec![],
            mutation_rates: MutationRates::zero(),
            mate_by_averaging_chance: 0.0,
            suppression_reset_chance: 0.0,
            initial_expression_chance: 0.0,
            weight_bound: 0.0,
            weight_reset_chance: 0.0,
            weight_nudge_chance: 0.0,
            weight_mutation_power: 0.0,
            weight_mutation_half_life: 0.0,
            max_gene_addition_mutation_attempts: 0,
            recursion_chance: 0.0,
            excess_gene_factor: 0.0,
            disjoint_gene_factor: 0.0,
            common_weight_factor: 0.0,
        }
    }

    /// Returns the weight nudge magnitude for the given
    /// generation, halved every [`weight_mutation_half_life`]
    /// generations down to 1% of [`weight_mutation_power`].
    ///
    /// [`weight_mutation_half_life`]: GeneticConfig::weight_mutation_half_life
    /// [`weight_mutation_power`]: GeneticConfig::weight_mutation_power
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::GeneticConfig;
    ///
    /// let config = GeneticConfig {
    ///     weight_mutation_power: 2.0,
    ///     weight_mutation_half_life: 10.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// assert_eq!(config.weight_spread(0), 2.0);
    /// assert_eq!(config.weight_spread(10), 1.0);
    /// assert_eq!(config.weight_spread(10_000), 0.02);
    /// ```
    pub fn weight_spread(&self, generation: usize) -> f32 {
        if self.weight_mutation_half_life <= 0.0 {
            return self.weight_mutation_power;
        }
        let decay = 2f32.powf(-(generation as f32) / self.weight_mutation_half_life);
        self.weight_mutation_power * decay.max(MIN_SPREAD_FACTOR)
    }

    /// Returns whether any mutation operator can
    /// actually alter a genome under this configuration.
    pub fn can_mutate(&self) -> bool {
        let rates = &self.mutation_rates;
        let weights_change = rates.weight_perturbation > 0.0
            && (self.weight_reset_chance > 0.0
                || (self.weight_nudge_chance > 0.0 && self.weight_mutation_power > 0.0));
        weights_change
            || rates.add_connection > 0.0
            || rates.remove_connection > 0.0
            || rates.add_node > 0.0
            || rates.remove_node > 0.0
    }

    /// Returns every probability in the configuration
    /// paired with its name.
    pub(crate) fn probabilities(&self) -> Vec<(&'static str, f32)> {
        let mut probabilities = vec![
            ("mate_by_averaging_chance", self.mate_by_averaging_chance),
            ("suppression_reset_chance", self.suppression_reset_chance),
            ("initial_expression_chance", self.initial_expression_chance),
            ("weight_reset_chance", self.weight_reset_chance),
            ("weight_nudge_chance", self.weight_nudge_chance),
            ("recursion_chance", self.recursion_chance),
        ];
        probabilities.extend(self.mutation_rates.named());
        probabilities
    }
}

impl Default for GeneticConfig {
    /// Parameters close to those of the original NEAT
    /// experiments, for a single-input, single-output genome.
    fn default() -> GeneticConfig {
        GeneticConfig {
            activation_types: vec![ActivationType::Sigmoid],
            output_activation_types: vec![ActivationType::Sigmoid],
            mutation_rates: MutationRates::default(),
            mate_by_averaging_chance: 0.4,
            suppression_reset_chance: 0.25,
            initial_expression_chance: 1.0,
            weight_bound: 5.0,
            weight_reset_chance: 0.1,
            weight_nudge_chance: 0.9,
            weight_mutation_power: 2.5,
            max_gene_addition_mutation_attempts: 20,
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.4,
            ..GeneticConfig::zero()
        }
    }
}
