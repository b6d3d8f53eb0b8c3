use evolvenn::genomics::{ActivationType, GeneticConfig, MutationRates};
use evolvenn::networks::Network;
use evolvenn::populations::{PopulationConfig, SelectionPolicy, SpeciationConfig};
use evolvenn::{create_run, RunConfig, StoppingCriteria};

use clap::Parser;
use ron::ser::PrettyConfig;
use tracing::{error, info, Level};

use std::f32::consts::PI;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

const SAMPLES: usize = 100;

/// Evolves a network approximating sin(x) over [-π, π].
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// RON file holding a full run configuration.
    /// Overrides every other run option.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Maximum number of generations.
    #[arg(short, long, default_value_t = 300)]
    generations: usize,
    /// Number of genomes per generation.
    #[arg(short, long, default_value_t = 150)]
    population: usize,
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    /// Evaluation threads. Defaults to one per hardware thread.
    #[arg(short, long)]
    workers: Option<usize>,
    /// Log level filter.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

/// Scores a network by 1 / (1 + MSE) over evenly
/// spaced samples. Inputs are a bias and x / π.
fn evaluate_sine(network: &Network) -> f32 {
    let squared_error: f32 = (0..SAMPLES)
        .map(|i| {
            let x = -PI + 2.0 * PI * i as f32 / (SAMPLES - 1) as f32;
            let output = network.evaluate(&[1.0, x / PI])[0];
            (output - x.sin()).powi(2)
        })
        .sum();
    1.0 / (1.0 + squared_error / SAMPLES as f32)
}

fn run_config(args: &Args) -> RunConfig {
    RunConfig {
        genetic: GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            activation_types: vec![
                ActivationType::Sigmoid,
                ActivationType::Sinusoidal,
                ActivationType::Gaussian,
            ],
            output_activation_types: vec![ActivationType::Identity],
            mutation_rates: MutationRates {
                weight_perturbation: 0.8,
                add_connection: 0.08,
                remove_connection: 0.002,
                add_node: 0.04,
                remove_node: 0.001,
            },
            mate_by_averaging_chance: 0.4,
            suppression_reset_chance: 1.0,
            initial_expression_chance: 1.0,
            weight_bound: 5.0,
            weight_reset_chance: 0.1,
            weight_nudge_chance: 0.9,
            weight_mutation_power: 1.5,
            weight_mutation_half_life: 100.0,
            max_gene_addition_mutation_attempts: 20,
            recursion_chance: 0.0,
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.4,
        },
        population: PopulationConfig {
            size: args.population,
            crossover_rate: 0.6,
            elitism_count: 2,
            selection: SelectionPolicy::Tournament { size: 3 },
            speciation: SpeciationConfig {
                enabled: true,
                distance_threshold: 3.0,
                stagnation_threshold: 20,
                stagnation_penalty: 1.0,
                interspecies_mating_chance: 0.001,
            },
        },
        stopping_criteria: StoppingCriteria {
            max_generations: Some(args.generations),
            target_fitness: Some(0.99),
            stagnation_limit: Some(100),
        },
        random_seed: args.seed,
        worker_count: args.workers,
    }
}

fn load_config(args: &Args) -> Result<RunConfig, String> {
    match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("unable to read {}: {}", path.display(), e))?;
            ron::from_str(&text).map_err(|e| format!("unable to parse {}: {}", path.display(), e))
        }
        None => Ok(run_config(args)),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut run = match create_run(config) {
        Ok(run) => run,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let reason = match run.run_to_completion(&evaluate_sine) {
        Ok(reason) => reason,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    for summary in run.fitness_history() {
        println!("{}", summary);
    }
    info!(?reason, generation = run.generation(), "run finished");

    if let Some(champion) = run.champion() {
        println!(
            "Champion of generation {} (fitness {}):\n{}",
            champion.generation, champion.fitness.score, champion.genome
        );
        match ron::ser::to_string_pretty(champion, PrettyConfig::new()) {
            Ok(serialized) => println!("{}", serialized),
            Err(e) => error!("unable to serialize champion: {}", e),
        }
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_build_a_valid_run() {
        let args = Args::parse_from(["sine", "--generations", "12", "--workers", "2"]);
        let config = run_config(&args);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.stopping_criteria.max_generations, Some(12));
        assert_eq!(config.worker_count, Some(2));
    }

    #[test]
    fn configuration_files_are_ron() {
        let config = run_config(&Args::parse_from(["sine"]));
        let text = ron::ser::to_string_pretty(&config, PrettyConfig::new()).unwrap();
        let parsed: RunConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn silent_network_scores_by_signal_power() {
        let mut genome_config = run_config(&Args::parse_from(["sine"])).genetic;
        genome_config.initial_expression_chance = 0.0;
        let genome = evolvenn::genomics::Genome::new(
            &genome_config,
            &mut evolvenn::genomics::History::new(&genome_config),
            &mut evolvenn::rng::seeded(0),
        );
        // An unconnected identity output is 0 everywhere.
        let network = Network::new(&genome).unwrap();
        let mean_square: f32 = (0..SAMPLES)
            .map(|i| (-PI + 2.0 * PI * i as f32 / (SAMPLES - 1) as f32).sin().powi(2))
            .sum::<f32>()
            / SAMPLES as f32;
        assert!((evaluate_sine(&network) - 1.0 / (1.0 + mean_square)).abs() < 1e-5);
    }
}
