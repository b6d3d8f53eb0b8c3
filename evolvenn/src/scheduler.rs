//! Parallel fitness evaluation.
//!
//! Every genome of a generation is evaluated as an independent
//! task on a bounded worker pool. Results travel back over a
//! completion channel tagged with their genome's position, so
//! the returned records are in population order no matter
//! which worker finishes first.
use crate::errors::{ConfigError, EvolutionError};
use crate::evaluation::{self, FitnessRecord, Objective};
use crate::genomics::Genome;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use std::num::NonZeroUsize;

/// A bounded pool of evaluation workers.
#[derive(Debug)]
pub struct Scheduler {
    pool: ThreadPool,
}

impl Scheduler {
    /// Creates a scheduler with `workers` threads.
    ///
    /// # Errors
    /// Returns an error if `workers` is 0, or if
    /// the threads cannot be spawned.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::scheduler::Scheduler;
    ///
    /// let scheduler = Scheduler::new(2).unwrap();
    /// assert_eq!(scheduler.worker_count(), 2);
    /// assert!(Scheduler::new(0).is_err());
    /// ```
    pub fn new(workers: usize) -> Result<Scheduler, EvolutionError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers.into());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("evolvenn-worker-{}", i))
            .build()?;
        Ok(Scheduler { pool })
    }

    /// Creates a scheduler with one worker per
    /// available hardware thread.
    pub fn with_available_parallelism() -> Result<Scheduler, EvolutionError> {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Scheduler::new(workers)
    }

    /// Returns the number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluates every genome under `objective`, blocking
    /// until all of them have a record. The `i`-th record
    /// belongs to the `i`-th genome.
    ///
    /// Faults of single genomes are captured in their records.
    ///
    /// # Errors
    /// Returns an error if some evaluation never reported
    /// back, in which case no record is returned.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History};
    /// use evolvenn::networks::Network;
    /// use evolvenn::rng;
    /// use evolvenn::scheduler::Scheduler;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut history = History::new(&config);
    /// let mut rng = rng::seeded(0);
    /// let genomes: Vec<Genome> = (0..8)
    ///     .map(|_| Genome::new(&config, &mut history, &mut rng))
    ///     .collect();
    ///
    /// let scheduler = Scheduler::new(4).unwrap();
    /// let records = scheduler
    ///     .evaluate(&genomes, &|_: &Network| 1.0, 0)
    ///     .unwrap();
    ///
    /// assert_eq!(records.len(), 8);
    /// assert!(records.iter().zip(&genomes).all(|(r, g)| r.genome() == g.id()));
    /// ```
    pub fn evaluate<O>(
        &self,
        genomes: &[Genome],
        objective: &O,
        generation: usize,
    ) -> Result<Vec<FitnessRecord>, EvolutionError>
    where
        O: Objective + ?Sized,
    {
        let (sender, receiver) = crossbeam_channel::unbounded();

        self.pool.scope(|scope| {
            for (index, genome) in genomes.iter().enumerate() {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let record = evaluation::evaluate_genome(genome, objective, generation);
                    // The receiver lives until the scope has joined.
                    let _ = sender.send((index, record));
                });
            }
        });
        drop(sender);

        let mut records: Vec<Option<FitnessRecord>> = vec![None; genomes.len()];
        for (index, record) in receiver.iter() {
            records[index] = Some(record);
        }
        let received = records.iter().filter(|r| r.is_some()).count();
        if received != genomes.len() {
            return Err(EvolutionError::IncompleteEvaluation {
                generation,
                expected: genomes.len(),
                received,
            });
        }
        debug!(generation, evaluated = received, "evaluation barrier reached");

        Ok(records.into_iter().flatten().collect())
    }
}
