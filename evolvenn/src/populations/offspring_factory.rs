use super::*;

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs.
pub(super) struct OffspringFactory<'a, R: ?Sized> {
    population: &'a Population,
    generation: usize,
    history: &'a mut History,
    rng: &'a mut R,
    genetic_config: &'a GeneticConfig,
    population_config: &'a PopulationConfig,
}

impl<'a, R: Rng + ?Sized> OffspringFactory<'a, R> {
    pub(super) fn new(
        population: &'a Population,
        generation: usize,
        history: &'a mut History,
        rng: &'a mut R,
        genetic_config: &'a GeneticConfig,
        population_config: &'a PopulationConfig,
    ) -> OffspringFactory<'a, R> {
        OffspringFactory {
            population,
            generation,
            history,
            rng,
            genetic_config,
            population_config,
        }
    }

    /// Generates the next generation: the population's
    /// elite followed by each species' allotted offspring.
    pub(super) fn generate_offspring(mut self) -> Result<Vec<Genome>, EvolutionError> {
        let size = self.population_config.size;
        let elite = self.population_config.elitism_count.min(size);
        let mut offspring = Vec::with_capacity(size);
        offspring.extend_from_slice(&self.population.genomes[..elite.min(self.population.genomes.len())]);

        let allotted_offspring = self.allot_offspring(size - offspring.len());
        for (species_index, allotted) in allotted_offspring.iter().enumerate() {
            debug!(
                species = %self.population.species[species_index].id(),
                offspring = allotted,
                "offspring allotted"
            );
            for _ in 0..*allotted {
                let child = self.breed_child(species_index)?;
                offspring.push(child);
            }
        }

        debug_assert_eq!(offspring.len(), size);
        Ok(offspring)
    }

    /// Allots `offspring_count` offspring among species
    /// proportionally to their mean fitness, with stagnation
    /// penalties applied. Shares are floored, and the remainder
    /// goes to the species holding the population's best genome.
    ///
    /// If no species has a positive share, offspring are
    /// allotted proportionally to species size instead.
    pub(super) fn allot_offspring(&self, offspring_count: usize) -> Vec<usize> {
        let species = &self.population.species;
        let speciation = &self.population_config.speciation;
        let records = &self.population.records;

        let fitness_shares: Vec<f32> = species
            .iter()
            .map(|s| {
                let fitness = s.mean_fitness(records).max(0.0);
                if s.is_stagnated(speciation.stagnation_threshold) {
                    fitness * (1.0 - speciation.stagnation_penalty)
                } else {
                    fitness
                }
            })
            .collect();
        let shares = if fitness_shares.iter().sum::<f32>() > 0.0 {
            fitness_shares
        } else {
            species.iter().map(|s| s.members.len() as f32).collect()
        };

        let share_total: f32 = shares.iter().sum();
        let mut allotted: Vec<usize> = shares
            .iter()
            .map(|share| {
                if share_total > 0.0 {
                    (share / share_total * offspring_count as f32).floor().max(0.0) as usize
                } else {
                    0
                }
            })
            .collect();

        let remainder = offspring_count.saturating_sub(allotted.iter().sum());
        if let Some(best) = species.iter().position(|s| s.members.first() == Some(&0)) {
            allotted[best] += remainder;
        } else if let Some(first) = allotted.first_mut() {
            *first += remainder;
        }
        allotted
    }

    /// Selects parents from the species (or, rarely,
    /// from another species) and produces one child.
    fn breed_child(&mut self, species_index: usize) -> Result<Genome, EvolutionError> {
        let child_generation = self.generation + 1;
        let parent1 = self.choose_parent(species_index)?;

        let population = self.population;
        let genomes = &population.genomes;
        let child = if self.rng.chance(self.population_config.crossover_rate) {
            let mate_species = self.choose_mate_species(species_index);
            let parent2 = self.choose_parent(mate_species)?;
            genomes[parent1]
                .crossover(
                    &genomes[parent2],
                    child_generation,
                    self.history,
                    self.rng,
                    self.genetic_config,
                )
                .mutate(child_generation, self.history, self.rng, self.genetic_config)
        } else {
            genomes[parent1].mutate(child_generation, self.history, self.rng, self.genetic_config)
        };
        Ok(child)
    }

    /// Choose the current species, or another randomly
    /// selected with the interspecies mating chance.
    fn choose_mate_species(&mut self, species_index: usize) -> usize {
        let species_count = self.population.species.len();
        let interspecies = self
            .rng
            .chance(self.population_config.speciation.interspecies_mating_chance);
        if interspecies && species_count > 1 {
            let other = self.rng.gen_range(0..species_count - 1);
            if other >= species_index {
                other + 1
            } else {
                other
            }
        } else {
            species_index
        }
    }

    /// Applies the selection policy to the species' unfaulted
    /// members, or to the whole population's if the species
    /// has none. If every genome faulted, all share the minimal
    /// fitness and the parent is drawn uniformly.
    fn choose_parent(&mut self, species_index: usize) -> Result<usize, EvolutionError> {
        let population = self.population;
        let members = population.species[species_index].members.iter().copied();
        let mut candidates = eligible_parents(&population.records, members);
        if candidates.is_empty() {
            candidates = eligible_parents(&population.records, 0..population.records.len());
        }
        if candidates.is_empty() && !population.records.is_empty() {
            return Ok(self.rng.gen_range(0..population.records.len()));
        }
        self.population_config
            .selection
            .select(&candidates, self.rng)
            .ok_or(EvolutionError::DegeneratePopulation {
                generation: self.generation,
            })
    }
}

/// Pairs each unfaulted member with its fitness, keeping rank order.
fn eligible_parents(
    records: &[FitnessRecord],
    members: impl Iterator<Item = usize>,
) -> Vec<(usize, f32)> {
    members
        .filter(|m| !records[*m].is_fault())
        .map(|m| (m, records[m].score()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate_genome;
    use crate::networks::Network;
    use crate::rng;

    #[test]
    fn allotment_follows_mean_fitness() {
        let genetic = GeneticConfig::zero();
        let mut history = History::new(&genetic);
        let mut rng = rng::seeded(2);
        let mut population = Population::new(10, &genetic, &mut history, &mut rng);
        let records = population
            .genomes
            .iter()
            .enumerate()
            .map(|(i, g)| {
                let score = if i < 4 { 3.0 } else { 1.0 };
                evaluate_genome(g, &move |_: &Network| score, 0)
            })
            .collect();
        population.rank(records, &genetic);
        population.species = vec![
            Species::new(SpeciesID(0, 0), population.genomes[0].clone()),
            Species::new(SpeciesID(0, 1), population.genomes[4].clone()),
        ];
        population.species[0].members = vec![0, 1, 2, 3];
        population.species[1].members = vec![4, 5, 6, 7, 8, 9];

        let config = PopulationConfig {
            size: 10,
            ..PopulationConfig::zero()
        };
        let factory = OffspringFactory::new(&population, 0, &mut history, &mut rng, &genetic, &config);
        // Shares 3 : 1 of 9 offspring floor to 6 and 2, the best species takes the rest.
        assert_eq!(factory.allot_offspring(9), vec![7, 2]);
        assert_eq!(factory.allot_offspring(0), vec![0, 0]);
    }

    #[test]
    fn degenerate_fitness_allots_by_size() {
        let genetic = GeneticConfig::zero();
        let mut history = History::new(&genetic);
        let mut rng = rng::seeded(2);
        let mut population = Population::new(6, &genetic, &mut history, &mut rng);
        let records = population
            .genomes
            .iter()
            .map(|g| evaluate_genome(g, &|_: &Network| 0.0, 0))
            .collect();
        population.rank(records, &genetic);
        population.species = vec![
            Species::new(SpeciesID(0, 0), population.genomes[0].clone()),
            Species::new(SpeciesID(0, 1), population.genomes[2].clone()),
        ];
        population.species[0].members = vec![0, 1];
        population.species[1].members = vec![2, 3, 4, 5];

        let config = PopulationConfig {
            size: 6,
            ..PopulationConfig::zero()
        };
        let factory = OffspringFactory::new(&population, 0, &mut history, &mut rng, &genetic, &config);
        assert_eq!(factory.allot_offspring(6), vec![2, 4]);
    }

    #[test]
    fn stagnated_species_is_penalized() {
        let genetic = GeneticConfig::zero();
        let mut history = History::new(&genetic);
        let mut rng = rng::seeded(2);
        let mut population = Population::new(4, &genetic, &mut history, &mut rng);
        let records = population
            .genomes
            .iter()
            .map(|g| evaluate_genome(g, &|_: &Network| 1.0, 0))
            .collect();
        population.rank(records, &genetic);
        let mut stagnated = Species::new(SpeciesID(0, 1), population.genomes[2].clone());
        stagnated.members = vec![2, 3];
        for _ in 0..3 {
            stagnated.update_fitness(&population.records);
        }
        let mut fresh = Species::new(SpeciesID(0, 0), population.genomes[0].clone());
        fresh.members = vec![0, 1];
        population.species = vec![fresh, stagnated];

        let config = PopulationConfig {
            size: 4,
            speciation: SpeciationConfig {
                enabled: true,
                stagnation_threshold: 2,
                stagnation_penalty: 1.0,
                ..SpeciationConfig::zero()
            },
            ..PopulationConfig::zero()
        };
        let factory = OffspringFactory::new(&population, 0, &mut history, &mut rng, &genetic, &config);
        assert_eq!(factory.allot_offspring(4), vec![4, 0]);
    }
}
