use super::SelectionPolicy;

use serde::{Deserialize, Serialize};

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Runs
/// are rejected at creation otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population, kept
    /// exactly across generations.
    pub size: usize,
    /// Chance that offspring will be the result of
    /// crossover followed by mutation, as opposed to
    /// mutation alone.
    pub crossover_rate: f32,
    /// Top n of the population which is copied
    /// as-is to the next generation.
    pub elitism_count: usize,
    /// How parents are chosen among the
    /// members of a species.
    pub selection: SelectionPolicy,
    /// Partitioning of the population into species.
    pub speciation: SpeciationConfig,
}

/// Configuration of the optional speciation of a population.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciationConfig {
    /// If unset, the whole population is
    /// treated as a single species.
    pub enabled: bool,
    /// Genetic distance threshold, beyond which
    /// genomes are considered as belonging to
    /// different species.
    pub distance_threshold: f32,
    /// Number of generations without a fitness increase
    /// before a species is considered _stagnated_.
    /// 0 disables stagnation penalties.
    pub stagnation_threshold: usize,
    /// Offspring allotment penalty for stagnation.
    /// Stagnated species will receive this percentage
    /// fewer offspring.
    pub stagnation_penalty: f32,
    /// Chance that genomes from different species
    /// will be selected to mate.
    pub interspecies_mating_chance: f32,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, disabled, or in the case
    /// of the selection policy, a tournament of 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::populations::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     size: 150,
    ///     elitism_count: 1,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: 0,
            crossover_rate: 0.0,
            elitism_count: 0,
            selection: SelectionPolicy::Tournament { size: 1 },
            speciation: SpeciationConfig::zero(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            size: 150,
            crossover_rate: 0.75,
            elitism_count: 1,
            selection: SelectionPolicy::Truncation { fraction: 0.2 },
            speciation: SpeciationConfig::default(),
        }
    }
}

impl SpeciationConfig {
    /// Returns a disabled speciation configuration
    /// with every value set to 0.
    pub const fn zero() -> SpeciationConfig {
        SpeciationConfig {
            enabled: false,
            distance_threshold: 0.0,
            stagnation_threshold: 0,
            stagnation_penalty: 0.0,
            interspecies_mating_chance: 0.0,
        }
    }
}

impl Default for SpeciationConfig {
    fn default() -> SpeciationConfig {
        SpeciationConfig {
            enabled: true,
            distance_threshold: 3.0,
            stagnation_threshold: 15,
            stagnation_penalty: 1.0,
            interspecies_mating_chance: 0.001,
        }
    }
}
