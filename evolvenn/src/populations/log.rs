use crate::genomics::GenomeId;
use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt;

/// A snapshot of one evaluated generation.
/// The sequence of summaries of a run is its fitness history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub fitness: Stats,
    /// Statistics over the genomes' gene counts.
    pub gene_count: Stats,
    /// Statistics over the genomes' node counts.
    pub node_count: Stats,
    pub best_genome: GenomeId,
    pub species_count: usize,
    pub faults: usize,
    pub max_gene_innovation: Innovation,
    pub max_node_innovation: Innovation,
}

impl GenerationSummary {
    /// Returns the best fitness of the generation.
    pub fn best(&self) -> f32 {
        self.fitness.maximum
    }

    /// Returns the mean fitness of the generation.
    pub fn mean(&self) -> f32 {
        self.fitness.mean
    }
}

impl fmt::Display for GenerationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation {}: best {:.4} ({}), mean {:.4}, median {:.4}, \
            species {}, faults {}, mean genes {:.1}, mean nodes {:.1}",
            self.generation,
            self.fitness.maximum,
            self.best_genome,
            self.fitness.mean,
            self.fitness.median,
            self.species_count,
            self.faults,
            self.gene_count.mean,
            self.node_count.mean,
        )
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// An empty sequence yields all zeroes.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::populations::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Stats {
        let mut data: Vec<f32> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
            };
        }
        data.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        }
    }
}
