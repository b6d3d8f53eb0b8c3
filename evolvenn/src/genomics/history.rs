use super::{GeneticConfig, GenomeId};
use crate::Innovation;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// The innovation record of a run.
///
/// Structural mutations are identified by what they connect:
/// a new gene by its `(input node, output node)` pair, and a new
/// node by the gene it splits. Repeating a mutation anywhere in
/// the run yields the innovation numbers it was first given, so
/// that crossover can line genes up by number alone.
///
/// Genome identities are issued here as well, and are
/// never reused within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    next_gene_innovation: Innovation,
    next_node_innovation: Innovation,
    next_genome_id: u64,
    gene_innovations: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    node_innovations: HashMap<Innovation, (Innovation, Innovation, Innovation), RandomState>,
}

impl History {
    /// Creates the record for genomes built under `config`.
    ///
    /// The terminal nodes take innovation numbers `0..input_count`
    /// (sensors) followed by the actuators. Every sensor-actuator
    /// pair is pre-assigned its initial gene number, so mutations
    /// start numbering genes at `input_count ⨯ output_count`.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, History};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(3).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let history = History::new(&config);
    ///
    /// assert_eq!(history.max_gene_innovation(), 5);
    /// assert_eq!(history.max_node_innovation(), 4);
    /// ```
    pub fn new(config: &GeneticConfig) -> History {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        let gene_innovations = (0..input_count)
            .flat_map(|i| (0..output_count).map(move |o| ((i, input_count + o), o + i * output_count)))
            .collect();
        History {
            next_gene_innovation: input_count * output_count,
            next_node_innovation: input_count + output_count,
            next_genome_id: 0,
            gene_innovations,
            node_innovations: HashMap::default(),
        }
    }

    /// Returns a fresh genome identity.
    pub(crate) fn next_genome_id(&mut self) -> GenomeId {
        let id = GenomeId(self.next_genome_id);
        self.next_genome_id += 1;
        id
    }

    /// Returns the next gene innovation number, or the
    /// previously assigned number to the same gene mutation.
    pub(crate) fn next_gene_innovation(
        &self,
        input_id: Innovation,
        output_id: Innovation,
    ) -> Innovation {
        *self
            .gene_innovations
            .get(&(input_id, output_id))
            .unwrap_or(&self.next_gene_innovation)
    }

    /// Returns the next node and gene innovation numbers,
    /// or the previously assigned numbers to the same node mutation,
    /// in the format `(input gene, new node, output gene)`.
    ///
    /// If `duplicate` is `true`, the returned innovation numbers
    /// are computed as if it were a new mutation. This is needed
    /// when the mutating genome already holds the node assigned
    /// to an earlier split of the same gene.
    pub(crate) fn next_node_innovation(
        &self,
        split_gene: Innovation,
        duplicate: bool,
    ) -> (Innovation, Innovation, Innovation) {
        match self.node_innovations.get(&split_gene) {
            Some(record) if !duplicate => *record,
            _ => (
                self.next_gene_innovation,
                self.next_node_innovation,
                self.next_gene_innovation + 1,
            ),
        }
    }

    /// Adds a gene mutation to the history, if the mutation is new.
    pub(crate) fn add_gene_innovation(&mut self, input_id: Innovation, output_id: Innovation) {
        if let Entry::Vacant(entry) = self.gene_innovations.entry((input_id, output_id)) {
            entry.insert(self.next_gene_innovation);
            self.next_gene_innovation += 1;
        }
    }

    /// Adds a node mutation splitting the gene between
    /// `split_input` and `split_output` to the history, if the
    /// mutation is new or `duplicate` is set. In the latter case
    /// the new numbers substitute the previously assigned ones.
    pub(crate) fn add_node_innovation(
        &mut self,
        split_gene: Innovation,
        (split_input, split_output): (Innovation, Innovation),
        duplicate: bool,
    ) {
        if self.node_innovations.contains_key(&split_gene) && !duplicate {
            return;
        }
        let new_node = self.next_node_innovation;
        // The new node's genes are always fresh innovations,
        // as the node did not exist before.
        let new_input_gene = self.next_gene_innovation;
        self.add_gene_innovation(split_input, new_node);
        let new_output_gene = self.next_gene_innovation;
        self.add_gene_innovation(new_node, split_output);

        self.node_innovations
            .insert(split_gene, (new_input_gene, new_node, new_output_gene));
        self.next_node_innovation += 1;
    }

    /// Returns the highest gene innovation number issued.
    pub fn max_gene_innovation(&self) -> Innovation {
        self.next_gene_innovation - 1
    }

    /// Returns the highest node innovation number issued.
    pub fn max_node_innovation(&self) -> Innovation {
        self.next_node_innovation - 1
    }

    /// Iterates over `((input node, output node), gene)`
    /// for every gene innovation, in no particular order.
    pub fn gene_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.gene_innovations.iter()
    }

    /// Iterates over `(split gene, (input gene, new node, output gene))`
    /// for every node innovation, in no particular order.
    pub fn node_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&Innovation, &(Innovation, Innovation, Innovation))> {
        self.node_innovations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn initial_innovations() {
        let history = History::new(&config());
        assert_eq!(history.max_gene_innovation(), 5);
        assert_eq!(history.max_node_innovation(), 4);
        // Sensor 1 to the second actuator (node 4).
        assert_eq!(history.next_gene_innovation(1, 4), 3);
        assert_eq!(history.next_gene_innovation(4, 1), 6);
    }

    #[test]
    fn repeated_mutations_share_innovations() {
        let mut history = History::new(&config());
        history.add_gene_innovation(4, 3);
        history.add_gene_innovation(4, 3);
        assert_eq!(history.max_gene_innovation(), 6);

        let first = history.next_node_innovation(0, false);
        history.add_node_innovation(0, (0, 3), false);
        assert_eq!(history.next_node_innovation(0, false), first);
        assert_eq!(first, (7, 5, 8));

        history.add_node_innovation(0, (0, 3), true);
        assert_eq!(history.next_node_innovation(0, false), (9, 6, 10));

        // 6 initial genes, 4 -> 3, and two per split.
        assert_eq!(history.gene_innovation_history().count(), 6 + 1 + 4);
        assert_eq!(
            history.node_innovation_history().collect::<Vec<_>>(),
            vec![(&0, &(9, 6, 10))]
        );
    }

    #[test]
    fn genome_ids_are_unique() {
        let mut history = History::new(&config());
        let ids: Vec<_> = (0..5).map(|_| history.next_genome_id()).collect();
        assert_eq!(ids, (0..5).map(GenomeId).collect::<Vec<_>>());
    }
}
