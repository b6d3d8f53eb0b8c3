//! The generational loop of a run.
//!
//! An [`EvolutionState`] moves through
//! `Initialized → Evaluating → Ranking → Breeding → Evaluating …`
//! until a stopping criterion ends it in `Terminated`. Only
//! evaluation runs concurrently; every genetic operator runs on
//! the calling thread, drawing from the run's single seeded stream.
use crate::errors::{ConfigError, EvolutionError};
use crate::evaluation::{Fitness, Objective};
use crate::genomics::{GeneticConfig, Genome, History};
use crate::populations::{GenerationSummary, Population, PopulationConfig, SelectionPolicy};
use crate::rng::{self, EvolutionRng};
use crate::scheduler::Scheduler;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Everything needed to start a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub population: PopulationConfig,
    /// Genome structure and per-operator mutation rates.
    pub genetic: GeneticConfig,
    pub stopping_criteria: StoppingCriteria,
    pub random_seed: u64,
    /// Number of evaluation workers. If `None`, one
    /// per available hardware thread.
    pub worker_count: Option<usize>,
}

/// Conditions under which a run terminates.
/// At least one must be set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoppingCriteria {
    /// Maximum number of generations evaluated.
    pub max_generations: Option<usize>,
    /// Fitness at which the run is considered solved.
    pub target_fitness: Option<f32>,
    /// Number of generations without improvement of the
    /// best fitness after which the run gives up.
    pub stagnation_limit: Option<usize>,
}

impl RunConfig {
    /// Returns a "zero-valued" configuration, built from
    /// [`PopulationConfig::zero`] and [`GeneticConfig::zero`],
    /// with no stopping criteria.
    ///
    /// # Note
    /// This value is rejected by [`create_run`] as-is.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    pub const fn zero() -> RunConfig {
        RunConfig {
            population: PopulationConfig::zero(),
            genetic: GeneticConfig::zero(),
            stopping_criteria: StoppingCriteria {
                max_generations: None,
                target_fitness: None,
                stagnation_limit: None,
            },
            random_seed: 0,
            worker_count: None,
        }
    }

    /// Checks that the configuration can produce a meaningful run.
    ///
    /// # Errors
    /// Returns the first problem found.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::errors::ConfigError;
    /// use evolvenn::RunConfig;
    ///
    /// let mut config = RunConfig::default();
    /// assert_eq!(config.validate(), Ok(()));
    ///
    /// config.population.size = 0;
    /// assert_eq!(config.validate(), Err(ConfigError::EmptyPopulation));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let population = &self.population;
        let speciation = &population.speciation;
        let genetic = &self.genetic;

        if population.size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.worker_count == Some(0) {
            return Err(ConfigError::NoWorkers);
        }
        if population.elitism_count > population.size {
            return Err(ConfigError::ExcessiveElitism {
                elitism: population.elitism_count,
                population_size: population.size,
            });
        }

        let probabilities = genetic.probabilities().into_iter().chain([
            ("crossover_rate", population.crossover_rate),
            ("stagnation_penalty", speciation.stagnation_penalty),
            ("interspecies_mating_chance", speciation.interspecies_mating_chance),
        ]);
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }

        let non_negative = [
            ("weight_bound", genetic.weight_bound),
            ("weight_mutation_power", genetic.weight_mutation_power),
            ("weight_mutation_half_life", genetic.weight_mutation_half_life),
            ("excess_gene_factor", genetic.excess_gene_factor),
            ("disjoint_gene_factor", genetic.disjoint_gene_factor),
            ("common_weight_factor", genetic.common_weight_factor),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if speciation.enabled && !(speciation.distance_threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "distance_threshold",
                value: speciation.distance_threshold,
            });
        }
        match population.selection {
            SelectionPolicy::Tournament { size: 0 } => {
                return Err(ConfigError::InvalidParameter {
                    name: "tournament size",
                    value: 0.0,
                })
            }
            SelectionPolicy::Truncation { fraction } if !(fraction > 0.0 && fraction <= 1.0) => {
                return Err(ConfigError::InvalidParameter {
                    name: "truncation fraction",
                    value: fraction,
                })
            }
            _ => {}
        }

        if population.elitism_count == population.size
            || (population.crossover_rate == 0.0 && !genetic.can_mutate())
        {
            return Err(ConfigError::NoVariation);
        }

        let criteria = &self.stopping_criteria;
        if let Some(target) = criteria.target_fitness {
            if !target.is_finite() {
                return Err(ConfigError::InvalidParameter {
                    name: "target_fitness",
                    value: target,
                });
            }
        }
        if criteria.max_generations == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "max_generations",
                value: 0.0,
            });
        }
        if criteria.max_generations.is_none()
            && criteria.target_fitness.is_none()
            && criteria.stagnation_limit.is_none()
        {
            return Err(ConfigError::NoStoppingCriterion);
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> RunConfig {
        RunConfig {
            population: PopulationConfig::default(),
            genetic: GeneticConfig::default(),
            stopping_criteria: StoppingCriteria {
                max_generations: Some(100),
                ..StoppingCriteria::default()
            },
            random_seed: 0,
            worker_count: None,
        }
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    TargetReached,
    GenerationBudget,
    Stagnation,
    Cancelled,
}

/// Where a run stands in the generational loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    Evaluating,
    Ranking,
    Breeding,
    Terminated(TerminationReason),
}

/// The best genome found so far in a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    pub genome: Genome,
    pub fitness: Fitness,
    /// Generation in which the genome reached this fitness.
    pub generation: usize,
}

/// A cooperative cancellation flag, shared between the
/// run and whoever wants to stop it. Checked once per
/// generation, after evaluation.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Requests the run to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The state of one run.
#[derive(Debug)]
pub struct EvolutionState {
    config: RunConfig,
    phase: Phase,
    generation: usize,
    population: Population,
    history: History,
    rng: EvolutionRng,
    scheduler: Scheduler,
    champion: Option<Champion>,
    last_improvement: usize,
    summaries: Vec<GenerationSummary>,
    cancellation: CancellationToken,
}

/// Starts a run: validates `config`, spawns the evaluation
/// workers, and creates the initial population.
///
/// # Errors
/// Returns an error if the configuration is rejected,
/// or if the worker pool cannot be created.
///
/// # Examples
/// ```
/// use evolvenn::{create_run, Phase, RunConfig};
///
/// let mut config = RunConfig::default();
/// config.population.size = 30;
///
/// let state = create_run(config).unwrap();
/// assert_eq!(state.phase(), Phase::Initialized);
/// assert_eq!(state.population().len(), 30);
/// ```
pub fn create_run(config: RunConfig) -> Result<EvolutionState, EvolutionError> {
    if let Err(e) = config.validate() {
        error!(error = %e, "run configuration rejected");
        return Err(e.into());
    }
    let scheduler = match config.worker_count {
        Some(workers) => Scheduler::new(workers),
        None => Scheduler::with_available_parallelism(),
    }
    .map_err(|e| {
        error!(error = %e, "worker pool unavailable");
        e
    })?;

    let mut rng = rng::seeded(config.random_seed);
    let mut history = History::new(&config.genetic);
    let population = Population::new(config.population.size, &config.genetic, &mut history, &mut rng);
    info!(
        population = config.population.size,
        workers = scheduler.worker_count(),
        seed = config.random_seed,
        "run created"
    );

    Ok(EvolutionState {
        config,
        phase: Phase::Initialized,
        generation: 0,
        population,
        history,
        rng,
        scheduler,
        champion: None,
        last_improvement: 0,
        summaries: vec![],
        cancellation: CancellationToken::new(),
    })
}

impl EvolutionState {
    /// Runs one full generation: evaluates the population,
    /// ranks and speciates it, checks the stopping criteria and,
    /// unless the run terminated, breeds the next generation.
    ///
    /// Returns the resulting phase. Once terminated, further
    /// calls do nothing.
    ///
    /// # Errors
    /// Returns an error if evaluation could not complete, or
    /// if no genome could be selected as a parent. Faults of
    /// single genomes are not errors.
    pub fn advance_generation<O>(&mut self, objective: &O) -> Result<Phase, EvolutionError>
    where
        O: Objective + ?Sized,
    {
        if let Phase::Terminated(_) = self.phase {
            return Ok(self.phase);
        }
        let generation = self.generation;

        self.phase = Phase::Evaluating;
        let records = self
            .scheduler
            .evaluate(self.population.genomes(), objective, generation)
            .map_err(|e| {
                error!(generation, error = %e, "evaluation failed");
                e
            })?;

        if self.cancellation.is_cancelled() {
            return Ok(self.terminate(TerminationReason::Cancelled));
        }

        self.phase = Phase::Ranking;
        self.population.rank(records, &self.config.genetic);
        self.population
            .speciate(generation, &self.config.genetic, &self.config.population);
        self.record_generation();

        if let Some(reason) = self.termination_reason() {
            return Ok(self.terminate(reason));
        }

        self.phase = Phase::Breeding;
        let offspring = self
            .population
            .breed(
                generation,
                &mut self.history,
                &mut self.rng,
                &self.config.genetic,
                &self.config.population,
            )
            .map_err(|e| {
                error!(generation, error = %e, "breeding failed");
                e
            })?;
        self.population = offspring;
        self.generation += 1;

        self.phase = Phase::Evaluating;
        Ok(self.phase)
    }

    /// Advances generations until the run terminates,
    /// and returns why it did.
    ///
    /// # Errors
    /// Returns the first error of [`advance_generation`].
    ///
    /// [`advance_generation`]: EvolutionState::advance_generation
    ///
    /// # Examples
    /// ```
    /// use evolvenn::networks::Network;
    /// use evolvenn::{create_run, RunConfig, TerminationReason};
    ///
    /// let mut config = RunConfig::default();
    /// config.population.size = 20;
    /// config.stopping_criteria.max_generations = Some(3);
    ///
    /// let mut state = create_run(config).unwrap();
    /// let reason = state
    ///     .run_to_completion(&|network: &Network| network.evaluate(&[1.0])[0])
    ///     .unwrap();
    ///
    /// assert_eq!(reason, TerminationReason::GenerationBudget);
    /// assert_eq!(state.fitness_history().len(), 3);
    /// assert!(state.best_genome().is_some());
    /// ```
    pub fn run_to_completion<O>(&mut self, objective: &O) -> Result<TerminationReason, EvolutionError>
    where
        O: Objective + ?Sized,
    {
        loop {
            if let Phase::Terminated(reason) = self.advance_generation(objective)? {
                return Ok(reason);
            }
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> Phase {
        info!(generation = self.generation, ?reason, "run terminated");
        self.phase = Phase::Terminated(reason);
        self.phase
    }

    /// Updates the champion and the fitness history
    /// with the freshly ranked generation.
    fn record_generation(&mut self) {
        let generation = self.generation;
        if let Some((genome, record)) = self.population.champion() {
            let improved = self
                .champion
                .as_ref()
                .map_or(true, |c| record.score() > c.fitness.score);
            if improved {
                self.champion = Some(Champion {
                    genome: genome.clone(),
                    fitness: record.fitness().clone(),
                    generation,
                });
                self.last_improvement = generation;
            }
        }
        if let Some(summary) = self.population.summary(generation, &self.history) {
            info!(
                generation,
                best = summary.best(),
                mean = summary.mean(),
                median = summary.fitness.median,
                species = summary.species_count,
                faults = summary.faults,
                "generation evaluated"
            );
            self.summaries.push(summary);
        }
    }

    fn termination_reason(&self) -> Option<TerminationReason> {
        let criteria = &self.config.stopping_criteria;
        let best = self.population.champion().map(|(_, record)| record.score());
        match (criteria.target_fitness, best) {
            (Some(target), Some(best)) if best >= target => {
                return Some(TerminationReason::TargetReached)
            }
            _ => {}
        }
        if let Some(max_generations) = criteria.max_generations {
            if self.generation + 1 >= max_generations {
                return Some(TerminationReason::GenerationBudget);
            }
        }
        if let Some(limit) = criteria.stagnation_limit {
            if self.generation - self.last_improvement >= limit {
                return Some(TerminationReason::Stagnation);
            }
        }
        None
    }

    /// Returns the run's configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, Phase::Terminated(_))
    }

    /// Returns the number of the generation currently held:
    /// the last one evaluated once terminated, the next one
    /// to evaluate otherwise.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Returns the run's innovation history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Returns the best genome found so far,
    /// or `None` before the first evaluation.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.champion.as_ref().map(|c| &c.genome)
    }

    /// Returns the best genome found so far along with its
    /// fitness and the generation it was found in.
    pub fn champion(&self) -> Option<&Champion> {
        self.champion.as_ref()
    }

    /// Returns the summaries of every evaluated generation, in order.
    pub fn fitness_history(&self) -> &[GenerationSummary] {
        &self.summaries
    }

    /// Returns a token which cancels this run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}
