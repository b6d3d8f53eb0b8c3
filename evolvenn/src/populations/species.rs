use crate::evaluation::FitnessRecord;
use crate::genomics::{GeneticConfig, Genome};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize, pub usize);

impl fmt::Display for SpeciesID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

/// Species are collections of reproductively
/// compatible (within a certain [genetic distance])
/// genomes. Membership is determined by calculating
/// the genetic distance to a _representative_,
/// which is the first genome of the species to exist.
///
/// Members are held as positions in the population,
/// in rank order, and recomputed every generation.
///
/// Species will stagnate after [`stagnation_threshold`]
/// generations without improving the species' fitness,
/// and will thereafter be penalized during reproduction.
///
/// [genetic distance]: super::SpeciationConfig::distance_threshold
/// [`stagnation_threshold`]: super::SpeciationConfig::stagnation_threshold
#[derive(Debug, Clone)]
pub struct Species {
    id: SpeciesID,
    pub(super) members: Vec<usize>,
    representative: Genome,
    stagnation: usize,
    max_fitness: Option<f32>,
}

impl Species {
    /// Creates a new, memberless species with
    /// the specified ID and representative.
    pub(super) fn new(id: SpeciesID, representative: Genome) -> Species {
        Species {
            id,
            members: vec![],
            representative,
            stagnation: 0,
            max_fitness: None,
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Returns the genetic distance between the species'
    /// representative and `other`.
    pub fn genetic_distance(&self, other: &Genome, config: &GeneticConfig) -> f32 {
        self.representative.genetic_distance(other, config)
    }

    /// Returns the population positions of the
    /// species' members, best-ranked first.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Returns the number of generations the species
    /// has gone without improving its maximum fitness.
    pub fn time_stagnated(&self) -> usize {
        self.stagnation
    }

    /// Returns the highest fitness ever reached
    /// by a member of the species.
    pub fn max_fitness(&self) -> Option<f32> {
        self.max_fitness
    }

    /// Returns the mean fitness of the species' members.
    pub fn mean_fitness(&self, records: &[FitnessRecord]) -> f32 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|m| records[*m].score()).sum::<f32>() / self.members.len() as f32
    }

    /// Updates the species' record of maximum
    /// fitness, to keep track of stagnation.
    pub(super) fn update_fitness(&mut self, records: &[FitnessRecord]) {
        let generation_max = self
            .members
            .iter()
            .map(|m| records[*m].score())
            .fold(None, |max: Option<f32>, f| Some(max.map_or(f, |m| m.max(f))));
        match (generation_max, self.max_fitness) {
            (Some(new), Some(old)) if new <= old => self.stagnation += 1,
            (Some(new), _) => {
                self.max_fitness = Some(new);
                self.stagnation = 0;
            }
            (None, _) => self.stagnation += 1,
        }
    }

    /// Returns whether the species has stagnated for
    /// at least `threshold` generations. A threshold
    /// of 0 never stagnates.
    pub(super) fn is_stagnated(&self, threshold: usize) -> bool {
        threshold > 0 && self.stagnation >= threshold
    }
}
