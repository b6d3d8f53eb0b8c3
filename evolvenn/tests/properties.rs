//! Property-based tests for the genetic operators using proptest

use evolvenn::genomics::{GeneticConfig, Genome, History, MutationRates};
use evolvenn::networks::Network;
use evolvenn::rng;
use proptest::prelude::*;

use std::num::NonZeroUsize;

fn config(recursion_chance: f32) -> GeneticConfig {
    GeneticConfig {
        input_count: NonZeroUsize::new(3).unwrap(),
        output_count: NonZeroUsize::new(2).unwrap(),
        mutation_rates: MutationRates {
            weight_perturbation: 0.8,
            add_connection: 0.3,
            remove_connection: 0.1,
            add_node: 0.2,
            remove_node: 0.1,
        },
        mate_by_averaging_chance: 0.5,
        suppression_reset_chance: 0.5,
        initial_expression_chance: 0.7,
        weight_bound: 4.0,
        weight_reset_chance: 0.1,
        weight_nudge_chance: 0.9,
        weight_mutation_power: 1.5,
        weight_mutation_half_life: 10.0,
        max_gene_addition_mutation_attempts: 8,
        recursion_chance,
        excess_gene_factor: 1.0,
        disjoint_gene_factor: 0.8,
        common_weight_factor: 0.4,
        ..GeneticConfig::zero()
    }
}

/// Evolves a small pool of genomes for `generations` rounds of
/// mutation and crossover, returning every genome produced.
fn lineage(seed: u64, generations: usize, config: &GeneticConfig) -> Vec<Genome> {
    let mut rng = rng::seeded(seed);
    let mut history = History::new(config);
    let mut pool: Vec<Genome> = (0..4)
        .map(|_| Genome::new(config, &mut history, &mut rng))
        .collect();
    let mut produced = pool.clone();

    for generation in 1..=generations {
        let mut next = Vec::with_capacity(pool.len());
        for (i, genome) in pool.iter().enumerate() {
            let mut child = genome.mutate(generation, &mut history, &mut rng, config);
            child.set_fitness(((generation * 7 + i * 3) % 10) as f32);
            let mate = &pool[(i + 1) % pool.len()];
            let mut offspring = child.crossover(mate, generation, &mut history, &mut rng, config);
            offspring.set_fitness(((generation * 5 + i) % 10) as f32);
            produced.push(child);
            next.push(offspring);
        }
        produced.extend(next.iter().cloned());
        pool = next;
    }
    produced
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn operators_produce_valid_genomes(
        seed in any::<u64>(),
        generations in 1usize..25,
        recursion_chance in 0.0f32..=1.0,
    ) {
        let config = config(recursion_chance);
        for genome in lineage(seed, generations, &config) {
            prop_assert!(genome.validate(&config).is_ok(), "{}", genome);
            let network = Network::new(&genome);
            prop_assert!(network.is_ok());
            if let Ok(network) = network {
                let outputs = network.evaluate(&[0.5, -1.0, 2.0]);
                prop_assert_eq!(outputs.len(), 2);
                prop_assert!(outputs.iter().all(|o| o.is_finite()));
            }
        }
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self(
        seed in any::<u64>(),
        generations in 0usize..15,
        a in 0usize..16,
        b in 0usize..16,
    ) {
        let config = config(0.2);
        let genomes = lineage(seed, generations, &config);
        let a = &genomes[a % genomes.len()];
        let b = &genomes[b % genomes.len()];

        prop_assert_eq!(a.genetic_distance(a, &config), 0.0);
        prop_assert_eq!(a.genetic_distance(b, &config), b.genetic_distance(a, &config));
        prop_assert!(a.genetic_distance(b, &config) >= 0.0);
    }
}
