//! A Population is an ordered collection of genomes.
//! After evaluation the genomes are ranked, optionally
//! grouped into species, and bred into a next generation
//! of exactly the same size.
mod config;
mod log;
mod offspring_factory;
mod selection;
mod species;

use crate::errors::EvolutionError;
use crate::evaluation::FitnessRecord;
use crate::genomics::{GeneticConfig, Genome, History};
use crate::rng::Chance;
pub use config::{PopulationConfig, SpeciationConfig};
pub use log::{GenerationSummary, Stats};
use offspring_factory::OffspringFactory;
pub use selection::SelectionPolicy;
pub use species::{Species, SpeciesID};

use rand::prelude::Rng;
use tracing::debug;

use std::cmp::Ordering;

/// A population of genomes.
///
/// Once ranked, `genomes()[i]` is the `i`-th best genome,
/// and `records()[i]` is its fitness record.
#[derive(Clone, Debug)]
pub struct Population {
    genomes: Vec<Genome>,
    records: Vec<FitnessRecord>,
    species: Vec<Species>,
}

impl Population {
    /// Creates a population of `size` fresh genomes.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, History};
    /// use evolvenn::populations::Population;
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut history = History::new(&config);
    ///
    /// let population = Population::new(20, &config, &mut history, &mut rng::seeded(0));
    /// assert_eq!(population.len(), 20);
    /// ```
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        config: &GeneticConfig,
        history: &mut History,
        rng: &mut R,
    ) -> Population {
        Population {
            genomes: (0..size).map(|_| Genome::new(config, history, rng)).collect(),
            records: vec![],
            species: vec![],
        }
    }

    /// Attaches this generation's fitness records and sorts the
    /// population from best to worst: by fitness (or Pareto front,
    /// for multi-objective fitness), then by genetic distance to the
    /// best genome, then by identity.
    ///
    /// `records[i]` must belong to `genomes()[i]`.
    pub(crate) fn rank(&mut self, records: Vec<FitnessRecord>, config: &GeneticConfig) {
        debug_assert_eq!(records.len(), self.genomes.len());
        for (genome, record) in self.genomes.iter_mut().zip(&records) {
            genome.set_fitness(record.score());
        }

        let fronts = pareto_fronts(&records);
        let genomes = &self.genomes;
        let by_fitness = |a: usize, b: usize| {
            fronts[a].cmp(&fronts[b]).then_with(|| {
                records[b]
                    .score()
                    .partial_cmp(&records[a].score())
                    .unwrap_or(Ordering::Equal)
            })
        };
        let best = (0..genomes.len())
            .min_by(|a, b| by_fitness(*a, *b).then_with(|| genomes[*a].id().cmp(&genomes[*b].id())));
        let distances: Vec<f32> = match best {
            Some(best) => genomes
                .iter()
                .map(|g| g.genetic_distance(&genomes[best], config))
                .collect(),
            None => vec![],
        };

        let mut order: Vec<usize> = (0..genomes.len()).collect();
        order.sort_by(|a, b| {
            by_fitness(*a, *b)
                .then_with(|| {
                    distances[*a]
                        .partial_cmp(&distances[*b])
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| genomes[*a].id().cmp(&genomes[*b].id()))
        });

        self.records.clear();
        let mut genomes: Vec<Option<Genome>> = self.genomes.drain(..).map(Some).collect();
        let mut records: Vec<Option<FitnessRecord>> = records.into_iter().map(Some).collect();
        for i in order {
            if let (Some(genome), Some(record)) = (genomes[i].take(), records[i].take()) {
                self.genomes.push(genome);
                self.records.push(record);
            }
        }
    }

    /// Partitions the ranked population into species. Each genome
    /// joins the first species whose representative lies within the
    /// distance threshold, or founds a new one. Species left without
    /// members go extinct.
    ///
    /// If speciation is disabled, the whole population
    /// is a single species.
    pub(crate) fn speciate(
        &mut self,
        generation: usize,
        genetic_config: &GeneticConfig,
        population_config: &PopulationConfig,
    ) {
        let speciation = &population_config.speciation;
        for species in &mut self.species {
            species.members.clear();
        }

        if !speciation.enabled {
            if self.species.is_empty() {
                if let Some(first) = self.genomes.first() {
                    self.species.push(Species::new(SpeciesID(generation, 0), first.clone()));
                }
            }
            self.species.truncate(1);
            if let Some(species) = self.species.first_mut() {
                species.members = (0..self.genomes.len()).collect();
            }
        } else {
            let mut new_species_count = 0;
            for (position, genome) in self.genomes.iter().enumerate() {
                let compatible = self.species.iter_mut().find(|s| {
                    s.genetic_distance(genome, genetic_config) < speciation.distance_threshold
                });
                match compatible {
                    Some(species) => species.members.push(position),
                    None => {
                        let id = SpeciesID(generation, new_species_count);
                        let mut species = Species::new(id, genome.clone());
                        species.members.push(position);
                        self.species.push(species);
                        new_species_count += 1;
                    }
                }
            }
            let before = self.species.len();
            self.species.retain(|s| !s.members.is_empty());
            debug!(
                generation,
                species = self.species.len(),
                born = new_species_count,
                extinct = before - self.species.len(),
                "speciated"
            );
        }

        let records = &self.records;
        for species in &mut self.species {
            species.update_fitness(records);
        }
    }

    /// Breeds the next generation from the ranked and
    /// speciated population: the elite are carried over
    /// unchanged, and every other genome is the offspring
    /// of parents chosen by the selection policy.
    ///
    /// Species persist into the new population, with
    /// no members until it is speciated.
    ///
    /// # Errors
    /// Returns an error if no genome can be selected
    /// as a parent.
    pub(crate) fn breed<R: Rng + ?Sized>(
        &self,
        generation: usize,
        history: &mut History,
        rng: &mut R,
        genetic_config: &GeneticConfig,
        population_config: &PopulationConfig,
    ) -> Result<Population, EvolutionError> {
        if self.records.len() != self.genomes.len() || self.species.is_empty() {
            return Err(EvolutionError::DegeneratePopulation { generation });
        }
        let genomes = OffspringFactory::new(
            self,
            generation,
            history,
            rng,
            genetic_config,
            population_config,
        )
        .generate_offspring()?;

        let mut species = self.species.clone();
        for s in &mut species {
            s.members.clear();
        }
        Ok(Population {
            genomes,
            records: vec![],
            species,
        })
    }

    /// Returns the summary of the ranked generation.
    pub(crate) fn summary(&self, generation: usize, history: &History) -> Option<GenerationSummary> {
        let best = self.genomes.first()?;
        Some(GenerationSummary {
            generation,
            fitness: Stats::from(self.records.iter().map(FitnessRecord::score)),
            gene_count: Stats::from(self.genomes.iter().map(|g| g.genes().count() as f32)),
            node_count: Stats::from(self.genomes.iter().map(|g| g.nodes().count() as f32)),
            best_genome: best.id(),
            species_count: self.species.len(),
            faults: self.records.iter().filter(|r| r.is_fault()).count(),
            max_gene_innovation: history.max_gene_innovation(),
            max_node_innovation: history.max_node_innovation(),
        })
    }

    /// Returns the best genome and its record,
    /// once the population has been ranked.
    pub fn champion(&self) -> Option<(&Genome, &FitnessRecord)> {
        self.genomes.first().zip(self.records.first())
    }

    /// Returns the population's genomes, best first
    /// once ranked.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Returns the fitness records of the current generation,
    /// aligned with [`genomes`]. Empty until evaluated.
    ///
    /// [`genomes`]: Population::genomes
    pub fn records(&self) -> &[FitnessRecord] {
        &self.records
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

/// Returns the Pareto front index of each record, 0 being the
/// non-dominated front. Single-objective records are all on front 0.
fn pareto_fronts(records: &[FitnessRecord]) -> Vec<usize> {
    let mut fronts = vec![0; records.len()];
    if records.iter().all(|r| r.fitness().objectives.is_empty()) {
        return fronts;
    }

    let mut remaining: Vec<usize> = (0..records.len()).collect();
    let mut front = 0;
    while !remaining.is_empty() {
        let (current, rest): (Vec<usize>, Vec<usize>) = remaining.iter().partition(|&&i| {
            !remaining
                .iter()
                .any(|&j| records[j].fitness().dominates(records[i].fitness()))
        });
        if current.is_empty() {
            // Dominance cycles can only arise from mixing faulted
            // and multi-objective records; close the last front.
            rest.iter().for_each(|i| fronts[*i] = front);
            break;
        }
        current.iter().for_each(|i| fronts[*i] = front);
        remaining = rest;
        front += 1;
    }
    fronts
}
