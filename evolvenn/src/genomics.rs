//! Genomes are the focus of evolution.
//! They are a collection of genes and nodes that can be instantiated
//! as a phenotype (a neural network). Genomes can be progressively mutated,
//! thus adding complexity and functionality.
//!
//! Every operator draws its randomness from a caller-supplied RNG, so
//! a run driven by a single seeded stream is reproducible.

mod config;
mod errors;
mod genes;
mod history;
mod nodes;

pub use config::{GeneticConfig, MutationRates};
use errors::*;
pub use errors::ValidityError;
pub use genes::Gene;
pub use history::History;
pub use nodes::{ActivationType, Node, NodeType};

use crate::rng::Chance;
use crate::Innovation;

use ahash::RandomState;
use rand::prelude::{IteratorRandom, Rng, SliceRandom};
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt;

/// Stable identity of a genome within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenomeId(pub u64);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A collection of genes and nodes, along with
/// its identity, generation of origin and fitness.
///
/// Genetic operators never modify their receiver:
/// [`mutate`] and [`crossover`] return new genomes
/// with fresh identities.
///
/// Genes whose addition would close a cycle are tagged as
/// recurrent, so the remaining genes (suppressed ones included)
/// always form an acyclic graph.
///
/// Supports Serde for convenient genome saving and loading.
///
/// [`mutate`]: Genome::mutate
/// [`crossover`]: Genome::crossover
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Genome {
    id: GenomeId,
    origin: usize,
    genes: BTreeMap<Innovation, Gene>,
    nodes: BTreeMap<Innovation, Node>,
    node_pairings: HashSet<(Innovation, Innovation), RandomState>,
    fitness: Option<f32>,
}

impl Genome {
    /// Create a new genome with the specified configuration.
    /// Its identity is issued by `history`.
    ///
    /// Initially generated genes are given the innovation number
    /// `o + i ⨯ output_count`, where `i` is the innovation number
    /// of their input node and `o` is the index of their output node.
    /// Thus, genes created through mutation start at innovation
    /// number `input_count ⨯ output_count`.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History, NodeType};
    /// use evolvenn::rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(1));
    ///
    /// // As configured, the genome should have 3 sensors + 2 actuators.
    /// assert_eq!(genome.nodes().count(), 3 + 2);
    /// assert_eq!(genome.nodes().filter(|n| n.node_type() == NodeType::Sensor).count(), 3);
    /// assert_eq!(genome.nodes().filter(|n| n.node_type() == NodeType::Actuator).count(), 2);
    ///
    /// // And with an initial_expression_chance of 1, there is a gene for every pair of nodes.
    /// assert_eq!(genome.genes().count(), 3 * 2);
    ///
    /// // All genes should have weights within the established bound.
    /// assert!(genome.genes().all(|g| g.weight().abs() <= config.weight_bound));
    ///
    /// // The genome is not yet evaluated.
    /// assert_eq!(genome.fitness(), None);
    /// ```
    pub fn new<R: Rng + ?Sized>(
        config: &GeneticConfig,
        history: &mut History,
        rng: &mut R,
    ) -> Genome {
        let mut genome = Genome {
            id: history.next_genome_id(),
            origin: 0,
            genes: BTreeMap::new(),
            nodes: Self::generate_nodes(config),
            node_pairings: HashSet::default(),
            fitness: None,
        };
        genome.generate_initial_genes(rng, config);
        genome
    }

    fn generate_nodes(config: &GeneticConfig) -> BTreeMap<Innovation, Node> {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let sensors = (0..input_count)
            .map(|i| (i, Node::new(i, NodeType::Sensor, ActivationType::Identity)));
        let actuators = (0..output_count).map(|o| {
            let activation = config
                .output_activation_types
                .get(o)
                .copied()
                .unwrap_or(ActivationType::Sigmoid);
            let id = o + input_count;
            (id, Node::new(id, NodeType::Actuator, activation))
        });

        sensors.chain(actuators).collect()
    }

    fn generate_initial_genes<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &GeneticConfig) {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        for i in 0..input_count {
            for o in 0..output_count {
                if rng.chance(config.initial_expression_chance) {
                    let weight = Gene::random_weight(config.weight_bound, rng);
                    self.add_gene_unchecked(o + i * output_count, i, o + input_count, weight);
                }
            }
        }
    }

    /// Add a new gene to the genome.
    /// Returns a reference to the new gene.
    ///
    /// The gene is tagged as recurrent if it closes a cycle
    /// through the genome's non-recurrent genes.
    ///
    /// # Panics
    ///
    /// This function panics if the gene innovation already
    /// exists, if any of the gene's endpoints do not exist
    /// in the genome, if an identical connection already
    /// exists, or if the output endpoint is a sensor.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(1));
    /// genome.add_node(5, ActivationType::Sigmoid);
    ///
    /// let gene = genome.add_gene(42, 0, 5, 2.5);
    /// assert!(!gene.recurrent());
    ///
    /// // Closing a cycle (5 -> 3 -> 5) yields a recurrent gene.
    /// genome.add_gene(43, 5, 3, -3.0);
    /// assert!(genome.add_gene(44, 3, 5, 1.0).recurrent());
    ///
    /// // So does a self-loop.
    /// assert!(genome.add_gene(45, 5, 5, -1.0).recurrent());
    /// ```
    pub fn add_gene(
        &mut self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
        weight: f32,
    ) -> &mut Gene {
        self.check_gene_viability(gene_id, input_id, output_id)
            .unwrap_or_else(|e| panic!("{} in {}", e, self));
        self.add_gene_unchecked(gene_id, input_id, output_id, weight)
    }

    /// Add a new gene to the genome.
    /// Assumes that the gene is not a duplicate
    /// or invalid gene for the genome.
    fn add_gene_unchecked(
        &mut self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
        weight: f32,
    ) -> &mut Gene {
        let recurrent = self.closes_cycle(input_id, output_id);
        if let Some(node) = self.nodes.get_mut(&input_id) {
            let _ = node.add_output_gene(gene_id);
        }
        if let Some(node) = self.nodes.get_mut(&output_id) {
            let _ = node.add_input_gene(gene_id);
        }
        self.node_pairings.insert((input_id, output_id));

        let gene = self
            .genes
            .entry(gene_id)
            .or_insert_with(|| Gene::new(gene_id, input_id, output_id, weight));
        gene.set_recurrent(recurrent);
        gene
    }

    /// Checks whether a gene is a duplicate or
    /// is invalid for the genome.
    fn check_gene_viability(
        &self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
    ) -> Result<(), GeneViabilityError> {
        use GeneViabilityError::*;
        if self.genes.contains_key(&gene_id) {
            Err(DuplicateGeneID(gene_id, Some((input_id, output_id))))
        } else if !(self.nodes.contains_key(&input_id) && self.nodes.contains_key(&output_id)) {
            Err(NonexistantEndpoints(input_id, output_id))
        } else if self.node_pairings.contains(&(input_id, output_id)) {
            Err(DuplicateGeneWithEndpoints(gene_id, (input_id, output_id)))
        } else if self.nodes[&output_id].node_type() == NodeType::Sensor {
            Err(SensorEndpoint(output_id))
        } else {
            Ok(())
        }
    }

    /// Returns `true` if a gene from `input_id` to `output_id`
    /// would close a cycle, i.e. `input_id` is reachable from
    /// `output_id` through non-recurrent genes.
    fn closes_cycle(&self, input_id: Innovation, output_id: Innovation) -> bool {
        let mut visited = BTreeSet::new();
        let mut pending = vec![output_id];
        while let Some(current) = pending.pop() {
            if current == input_id {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                pending.extend(
                    node.output_genes()
                        .filter_map(|id| self.genes.get(id))
                        .filter(|gene| !gene.recurrent())
                        .map(Gene::output),
                );
            }
        }
        false
    }

    /// Add a new hidden node to the genome.
    /// Returns a reference to the newly created node.
    ///
    /// # Panics
    ///
    /// This function panics if a node of the
    /// same ID already existed in the genome.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History, NodeType};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(1));
    ///
    /// let inserted_node = genome.add_node(42, ActivationType::ReLU).clone();
    ///
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    /// assert_eq!(inserted_node.node_type(), NodeType::Neuron);
    /// assert_eq!(inserted_node.activation_type(), ActivationType::ReLU);
    /// ```
    pub fn add_node(&mut self, node_id: Innovation, activation_type: ActivationType) -> &mut Node {
        self.check_node_viability(node_id)
            .unwrap_or_else(|e| panic!("{} in {}", e, self));
        self.add_node_unchecked(node_id, activation_type)
    }

    fn add_node_unchecked(
        &mut self,
        node_id: Innovation,
        activation_type: ActivationType,
    ) -> &mut Node {
        self.nodes
            .entry(node_id)
            .or_insert_with(|| Node::new(node_id, NodeType::Neuron, activation_type))
    }

    fn check_node_viability(&self, node_id: Innovation) -> Result<(), NodeViabilityError> {
        if self.nodes.contains_key(&node_id) {
            Err(NodeViabilityError::DuplicateNodeID(node_id))
        } else {
            Ok(())
        }
    }

    /// Removes a gene along with every reference to it.
    fn remove_gene(&mut self, gene_id: Innovation) -> Option<Gene> {
        let gene = self.genes.remove(&gene_id)?;
        if let Some(node) = self.nodes.get_mut(&gene.input()) {
            let _ = node.remove_output_gene(gene_id);
        }
        if let Some(node) = self.nodes.get_mut(&gene.output()) {
            let _ = node.remove_input_gene(gene_id);
        }
        self.node_pairings.remove(&gene.endpoints());
        Some(gene)
    }

    /// Returns a mutated copy of the genome, with a fresh
    /// identity and `generation` as its origin.
    ///
    /// Each operator in [`config.mutation_rates`] is gated
    /// independently, in this order: node deletion, gene deletion,
    /// weight mutation, node addition and gene addition. The weight
    /// nudge magnitude follows [`GeneticConfig::weight_spread`].
    ///
    /// [`config.mutation_rates`]: GeneticConfig::mutation_rates
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History, MutationRates};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     activation_types: vec![evolvenn::genomics::ActivationType::ReLU],
    ///     mutation_rates: MutationRates {
    ///         add_node: 1.0,
    ///         ..MutationRates::zero()
    ///     },
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = rng::seeded(9);
    ///
    /// let parent = Genome::new(&config, &mut history, &mut rng);
    /// let child = parent.mutate(1, &mut history, &mut rng, &config);
    ///
    /// assert_ne!(child.id(), parent.id());
    /// assert_eq!(child.origin(), 1);
    /// assert_eq!(parent.genes().count(), 1);
    /// assert_eq!(child.genes().count(), 3);
    /// assert!(child.validate(&config).is_ok());
    /// ```
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        generation: usize,
        history: &mut History,
        rng: &mut R,
        config: &GeneticConfig,
    ) -> Genome {
        let mut child = self.offspring_of(history, generation);
        child.mutate_all(generation, history, rng, config);
        debug_assert!(child.validate(config).is_ok(), "invalid mutation: {}", child);
        child
    }

    /// Performs all gated mutations on self.
    fn mutate_all<R: Rng + ?Sized>(
        &mut self,
        generation: usize,
        history: &mut History,
        rng: &mut R,
        config: &GeneticConfig,
    ) {
        let rates = &config.mutation_rates;
        if rng.chance(rates.remove_node) {
            let _ = self.mutate_delete_node(rng);
        }
        if rng.chance(rates.remove_connection) {
            let _ = self.mutate_delete_gene(rng);
        }
        if rng.chance(rates.weight_perturbation) {
            self.mutate_weights(config.weight_spread(generation), rng, config);
        }
        if rng.chance(rates.add_node) {
            let _ = self.mutate_add_node(history, rng, config);
        }
        if rng.chance(rates.add_connection) {
            let _ = self.mutate_add_gene(history, rng, config);
        }
    }

    /// Clones the genome under a fresh identity.
    fn offspring_of(&self, history: &mut History, generation: usize) -> Genome {
        let mut child = self.clone();
        child.id = history.next_genome_id();
        child.origin = generation;
        child.fitness = None;
        child
    }

    /// Induces a _weight mutation_ in the genome.
    ///
    /// Each gene's weight is either reset to a random value in
    /// `[-weight_bound, weight_bound]`, or nudged by a random value
    /// in `[-spread, spread]` and clamped to the same range.
    /// Newer genes are more likely to be reset.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     weight_nudge_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = rng::seeded(3);
    ///
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng);
    /// let initial_weight = genome.genes().next().unwrap().weight();
    ///
    /// genome.mutate_weights(2.5, &mut rng, &config);
    /// let new_weight = genome.genes().next().unwrap().weight();
    ///
    /// assert!(new_weight.abs() <= config.weight_bound);
    /// assert!((new_weight - initial_weight).abs() <= 2.5);
    /// ```
    pub fn mutate_weights<R: Rng + ?Sized>(
        &mut self,
        spread: f32,
        rng: &mut R,
        config: &GeneticConfig,
    ) {
        let max_innovation = self.genes.keys().next_back().copied().unwrap_or_default().max(1) as f32;
        for gene in self.genes.values_mut() {
            // Older genes have a lower chance of being reset,
            // with the assumption being they've had more time
            // to settle into an optimised value.
            let reset_chance = config.weight_reset_chance
                * ((gene.innovation() + 1) as f32 / max_innovation).powi(2);
            if rng.chance(reset_chance) {
                gene.randomize_weight(config.weight_bound, rng);
            } else if rng.chance(config.weight_nudge_chance) {
                gene.nudge_weight(spread, config.weight_bound, rng);
            }
        }
    }

    /// Induces a _gene mutation_ in the genome.
    /// If successful, returns the newly added gene.
    ///
    /// Each attempt picks a node and, unless the attempt passes
    /// [`recursion_chance`], only considers outputs that keep
    /// the genome acyclic. Otherwise the new gene may close a
    /// cycle, and is then tagged as recurrent.
    ///
    /// # Errors
    ///
    /// Returns an error if no viable pair of nodes
    /// exists or [too many] attempts have failed.
    ///
    /// [`recursion_chance`]: GeneticConfig::recursion_chance
    /// [too many]: GeneticConfig::max_gene_addition_mutation_attempts
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig {
    ///     weight_bound: 5.0,
    ///     max_gene_addition_mutation_attempts: 2,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = rng::seeded(3);
    ///
    /// let mut genome = Genome::new(&config, &mut history, &mut rng);
    /// assert_eq!(genome.genes().count(), 0);
    ///
    /// let gene = genome.mutate_add_gene(&mut history, &mut rng, &config).unwrap();
    /// assert_eq!(gene.endpoints(), (0, 1));
    /// ```
    pub fn mutate_add_gene<R: Rng + ?Sized>(
        &mut self,
        history: &mut History,
        rng: &mut R,
        config: &GeneticConfig,
    ) -> Result<&Gene, Box<dyn Error>> {
        let non_sensor_nodes = self.select_non_sensor_nodes();
        let mut potential_inputs = self.select_potential_input_nodes(&non_sensor_nodes);

        if potential_inputs.is_empty() {
            return Err(GeneMutationError::AllInputsFullyConnected.into());
        }

        potential_inputs.shuffle(rng);

        match self.find_node_pair(&potential_inputs, &non_sensor_nodes, rng, config) {
            Some((source_node, dest_node)) => {
                let weight = Gene::random_weight(config.weight_bound, rng);
                Ok(self.add_gene_mutation(source_node, dest_node, weight, history))
            }
            None => Err(GeneMutationError::NoInputOutputPairFound.into()),
        }
    }

    fn select_non_sensor_nodes(&self) -> BTreeSet<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.node_type() != NodeType::Sensor)
            .map(Node::innovation)
            .collect()
    }

    fn select_potential_input_nodes(
        &self,
        non_sensor_nodes: &BTreeSet<Innovation>,
    ) -> Vec<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.output_genes().count() < non_sensor_nodes.len())
            .map(Node::innovation)
            .collect()
    }

    fn find_node_pair<R: Rng + ?Sized>(
        &self,
        potential_inputs: &[Innovation],
        potential_outputs: &BTreeSet<Innovation>,
        rng: &mut R,
        config: &GeneticConfig,
    ) -> Option<(Innovation, Innovation)> {
        for input in potential_inputs
            .iter()
            .take(config.max_gene_addition_mutation_attempts)
        {
            let allow_recurrent = rng.chance(config.recursion_chance);
            if let Some(output) =
                self.choose_output_node_for(*input, potential_outputs, allow_recurrent, rng)
            {
                return Some((*input, output));
            }
        }
        None
    }

    fn choose_output_node_for<R: Rng + ?Sized>(
        &self,
        input: Innovation,
        potential_outputs: &BTreeSet<Innovation>,
        allow_recurrent: bool,
        rng: &mut R,
    ) -> Option<Innovation> {
        let connected = self.output_nodes_of(&self.nodes[&input]);
        let candidates: Vec<Innovation> = potential_outputs
            .iter()
            .copied()
            .filter(|output| !connected.contains(output))
            .filter(|output| allow_recurrent || !self.closes_cycle(input, *output))
            .collect();
        candidates.choose(rng).copied()
    }

    fn output_nodes_of(&self, node: &Node) -> BTreeSet<Innovation> {
        node.output_genes()
            .filter_map(|id| self.genes.get(id))
            .map(Gene::output)
            .collect()
    }

    fn add_gene_mutation(
        &mut self,
        input_node: Innovation,
        output_node: Innovation,
        weight: f32,
        history: &mut History,
    ) -> &Gene {
        let gene_id = history.next_gene_innovation(input_node, output_node);
        history.add_gene_innovation(input_node, output_node);
        self.add_gene(gene_id, input_node, output_node, weight)
    }

    /// Induces a _node mutation_ in the genome.
    /// If succesful, returns the triplet (_in gene_, _new node_, _out gene_)
    /// as a tuple of references.
    ///
    /// A random expressed gene is suppressed and replaced by a
    /// new node, an _in gene_ of weight 1.0 and an _out gene_
    /// keeping the split gene's weight.
    ///
    /// # Errors
    ///
    /// This function returns an error if there are no expressed
    /// genes in the genome that could be split.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History, NodeType};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 1.0,
    ///     activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = rng::seeded(3);
    ///
    /// let mut genome = Genome::new(&config, &mut history, &mut rng);
    /// let prev_gene = genome.genes().next().unwrap().clone();
    ///
    /// let (new_input_gene, new_node, new_output_gene) =
    ///     genome.mutate_add_node(&mut history, &mut rng, &config).unwrap();
    ///
    /// assert_eq!(new_input_gene.output(), new_node.innovation());
    /// assert_eq!(new_input_gene.weight(), 1.0);
    /// assert_eq!(new_output_gene.input(), new_node.innovation());
    /// assert_eq!(new_output_gene.weight(), prev_gene.weight());
    /// assert_eq!(new_node.activation_type(), ActivationType::ReLU);
    /// assert_eq!(new_node.node_type(), NodeType::Neuron);
    ///
    /// // Old gene is suppressed.
    /// assert!(genome.gene(prev_gene.innovation()).unwrap().suppressed());
    /// ```
    pub fn mutate_add_node<R: Rng + ?Sized>(
        &mut self,
        history: &mut History,
        rng: &mut R,
        config: &GeneticConfig,
    ) -> Result<(&Gene, &Node, &Gene), Box<dyn Error>> {
        let gene_to_split = self
            .genes
            .values()
            .filter(|g| !g.suppressed())
            .map(Gene::innovation)
            .choose(rng)
            .ok_or(NodeMutationError::EmptyGenome)?;

        let (mutation, duplicate) = self.get_node_mutation_innovation_triplet(gene_to_split, history);
        let activation = config
            .activation_types
            .choose(rng)
            .copied()
            .unwrap_or(ActivationType::Sigmoid);
        Ok(self.add_node_mutation(gene_to_split, mutation, duplicate, activation, history))
    }

    fn get_node_mutation_innovation_triplet(
        &self,
        gene_to_split: Innovation,
        history: &History,
    ) -> ((Innovation, Innovation, Innovation), bool) {
        let (input_gene, new_node, output_gene) =
            history.next_node_innovation(gene_to_split, false);

        // The genome split this gene before, and the
        // resulting structure is still present.
        if self.nodes.contains_key(&new_node)
            || self.genes.contains_key(&input_gene)
            || self.genes.contains_key(&output_gene)
        {
            (history.next_node_innovation(gene_to_split, true), true)
        } else {
            ((input_gene, new_node, output_gene), false)
        }
    }

    fn add_node_mutation(
        &mut self,
        gene_to_split: Innovation,
        mutation: (Innovation, Innovation, Innovation),
        duplicate: bool,
        activation: ActivationType,
        history: &mut History,
    ) -> (&Gene, &Node, &Gene) {
        let (input_gene, new_node, output_gene) = mutation;
        let (input_node, output_node) = self.genes[&gene_to_split].endpoints();
        let weight = self.genes[&gene_to_split].weight();

        debug_assert!(!self.nodes.contains_key(&new_node));

        history.add_node_innovation(gene_to_split, (input_node, output_node), duplicate);

        if let Some(gene) = self.genes.get_mut(&gene_to_split) {
            gene.set_suppressed(true);
        }
        self.add_node_unchecked(new_node, activation);
        self.add_gene_unchecked(input_gene, input_node, new_node, 1.0);
        self.add_gene_unchecked(output_gene, new_node, output_node, weight);

        (
            &self.genes[&input_gene],
            &self.nodes[&new_node],
            &self.genes[&output_gene],
        )
    }

    /// Deletes a randomly-chosen gene from the genome.
    ///
    /// Returns `None` if the network is empty, or `Some(gene)`
    /// otherwise.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{Genome, GeneticConfig, History};
    /// use evolvenn::rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = rng::seeded(3);
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng);
    ///
    /// genome.mutate_delete_gene(&mut rng);
    ///
    /// assert_eq!(genome.genes().count(), 1);
    /// ```
    pub fn mutate_delete_gene<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Gene> {
        let innovation = self.genes.keys().copied().choose(rng)?;
        self.remove_gene(innovation)
    }

    /// Deletes a randomly-chosen hidden node, and all
    /// incident genes, from the genome.
    ///
    /// Returns `None` if the genome has no hidden nodes, or
    /// `Some((node, incident_genes))` otherwise.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut rng = rng::seeded(3);
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng);
    /// genome.add_node(42, ActivationType::Sigmoid);
    /// genome.add_gene(16, 0, 42, 1.0);
    /// genome.add_gene(17, 42, 1, 1.0);
    ///
    /// let (removed_node, removed_genes) = genome.mutate_delete_node(&mut rng).unwrap();
    ///
    /// assert_eq!(removed_node.innovation(), 42);
    /// assert_eq!(removed_genes[0].innovation(), 16);
    /// assert_eq!(removed_genes[1].innovation(), 17);
    /// assert_eq!(genome.genes().count(), 0);
    /// ```
    pub fn mutate_delete_node<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(Node, Vec<Gene>)> {
        let innovation = self
            .nodes
            .values()
            .filter(|n| n.node_type() == NodeType::Neuron)
            .map(Node::innovation)
            .choose(rng)?;

        // Self-loops appear among both inputs and outputs.
        let incident: BTreeSet<Innovation> = self.nodes[&innovation]
            .input_genes()
            .chain(self.nodes[&innovation].output_genes())
            .copied()
            .collect();
        let genes = incident
            .into_iter()
            .filter_map(|gene| self.remove_gene(gene))
            .collect();

        self.nodes.remove(&innovation).map(|node| (node, genes))
    }

    /// Combines the genome with an `other` genome and
    /// returns their _child_ genome.
    ///
    /// The child inherits the structure of the fitter parent,
    /// ties (including unevaluated parents) being broken at random.
    /// Genes present in both parents take either the average
    /// of both weights (with [`mate_by_averaging_chance`]) or,
    /// gene by gene, the weight of a randomly chosen parent.
    /// Suppressed genes are then re-expressed with
    /// [`suppression_reset_chance`].
    ///
    /// [`mate_by_averaging_chance`]: GeneticConfig::mate_by_averaging_chance
    /// [`suppression_reset_chance`]: GeneticConfig::suppression_reset_chance
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 0.5,
    ///     weight_bound: 3.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = rng::seeded(5);
    ///
    /// let mut fitter = Genome::new(&config, &mut history, &mut rng);
    /// let mut weaker = Genome::new(&config, &mut history, &mut rng);
    /// fitter.set_fitness(2.0);
    /// weaker.set_fitness(1.0);
    ///
    /// let child = weaker.crossover(&fitter, 1, &mut history, &mut rng, &config);
    ///
    /// // The child has exactly the fitter parent's genes.
    /// assert!(child.genes().map(|g| g.innovation()).eq(fitter.genes().map(|g| g.innovation())));
    /// ```
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &Genome,
        generation: usize,
        history: &mut History,
        rng: &mut R,
        config: &GeneticConfig,
    ) -> Genome {
        let self_is_fitter = match self.fitness.partial_cmp(&other.fitness) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Less) => false,
            _ => rng.gen::<bool>(),
        };
        let (fitter, weaker) = if self_is_fitter {
            (self, other)
        } else {
            (other, self)
        };

        let mut child = fitter.offspring_of(history, generation);
        if rng.chance(config.mate_by_averaging_chance) {
            child.average_common_genes(weaker);
        } else {
            child.randomly_choose_common_genes(weaker, rng);
        }
        child.reset_suppresseds(rng, config);

        debug_assert!(child.validate(config).is_ok(), "invalid crossover: {}", child);
        child
    }

    /// Combines all common genes by averaging weights.
    fn average_common_genes(&mut self, other: &Genome) {
        for (id, others_gene) in &other.genes {
            if let Some(own_gene) = self.genes.get_mut(id) {
                own_gene.set_weight((own_gene.weight() + others_gene.weight()) / 2.0);
            }
        }
    }

    /// Combines all common genes by chosing weights randomly between genomes.
    fn randomly_choose_common_genes<R: Rng + ?Sized>(&mut self, other: &Genome, rng: &mut R) {
        for (id, gene) in &other.genes {
            if let Some(own) = self.genes.get_mut(id) {
                if rng.gen::<bool>() {
                    own.set_weight(gene.weight());
                }
            }
        }
    }

    /// Unsuppresses suppressed genes with probability `config.suppression_reset_chance`.
    /// Suppressed genes take part in the acyclicity of
    /// the genome, so re-expressing them keeps it valid.
    fn reset_suppresseds<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &GeneticConfig) {
        for gene in self.genes.values_mut() {
            if gene.suppressed() && rng.chance(config.suppression_reset_chance) {
                gene.set_suppressed(false);
            }
        }
    }

    /// Calculates the _genetic distance_ between `self` and `other`,
    /// weighting gene and weight differences as specified in `config`.
    ///
    /// Unmatched genes are _excess_ if their innovation number is
    /// beyond the other genome's highest, _disjoint_ otherwise.
    /// The distance is symmetric and zero between identical genomes.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    /// use std::num::NonZeroUsize;
    ///
    /// // Completely arbitrary quantities.
    /// const EXCESS_FACTOR: f32 = 1.5;
    /// const DISJOINT_FACTOR: f32 = 0.5;
    /// const WEIGHT_FACTOR: f32 = 0.333;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(1).unwrap(),
    ///     excess_gene_factor: EXCESS_FACTOR,
    ///     disjoint_gene_factor: DISJOINT_FACTOR,
    ///     common_weight_factor: WEIGHT_FACTOR,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = rng::seeded(0);
    ///
    /// let mut genome1 = Genome::new(&config, &mut history, &mut rng);
    /// let mut genome2 = Genome::new(&config, &mut history, &mut rng);
    ///
    /// genome1.add_node(3, ActivationType::Sigmoid);
    /// genome2.add_node(3, ActivationType::Sigmoid);
    ///
    /// // Common gene, weight difference of 2.0.
    /// genome1.add_gene(0, 0, 2, 1.0);
    /// genome2.add_gene(0, 0, 2, -1.0);
    ///
    /// // Disjoint genes.
    /// genome1.add_gene(1, 1, 2, 3.0);
    /// genome2.add_gene(2, 1, 3, 1.0);
    ///
    /// // Common gene, weight_difference of 0.0.
    /// genome1.add_gene(3, 2, 3, 1.0);
    /// genome2.add_gene(3, 2, 3, 1.0);
    ///
    /// // Excess gene.
    /// genome1.add_gene(4, 2, 2, 3.0);
    ///
    /// assert_eq!(
    ///     genome1.genetic_distance(&genome2, &config),
    ///     DISJOINT_FACTOR * (1 + 1) as f32 +
    ///         EXCESS_FACTOR * (1) as f32 +
    ///         WEIGHT_FACTOR * (2.0 + 0.0) / 2.0  // Divide by number of common genes to get average.
    /// );
    /// ```
    pub fn genetic_distance(&self, other: &Genome, config: &GeneticConfig) -> f32 {
        let own_max = self.genes.keys().next_back().copied();
        let other_max = other.genes.keys().next_back().copied();

        let mut disjoint_gene_count = 0;
        let mut excess_gene_count = 0;
        let mut common_gene_count = 0;
        let mut weight_diff_total = 0.0;

        for (id, gene) in &self.genes {
            match other.genes.get(id) {
                Some(others_gene) => {
                    common_gene_count += 1;
                    weight_diff_total += (gene.weight() - others_gene.weight()).abs();
                }
                None if Some(*id) > other_max => excess_gene_count += 1,
                None => disjoint_gene_count += 1,
            }
        }
        for id in other.genes.keys().filter(|id| !self.genes.contains_key(id)) {
            if Some(*id) > own_max {
                excess_gene_count += 1;
            } else {
                disjoint_gene_count += 1;
            }
        }

        let common_weight_diff = if common_gene_count == 0 {
            0.0
        } else {
            weight_diff_total / common_gene_count as f32
        };

        config.disjoint_gene_factor * disjoint_gene_count as f32
            + config.excess_gene_factor * excess_gene_count as f32
            + config.common_weight_factor * common_weight_diff
    }

    /// Checks that the genome decodes to a well-formed network:
    /// the configured terminal nodes are present, every gene joins
    /// two existing nodes, no two genes join the same ordered pair,
    /// no gene feeds a sensor, node bookkeeping matches the genes,
    /// and the genes not tagged as recurrent form no cycle.
    ///
    /// # Errors
    ///
    /// Returns the first defect found.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
    ///
    /// assert!(genome.validate(&config).is_ok());
    /// ```
    pub fn validate(&self, config: &GeneticConfig) -> Result<(), ValidityError> {
        self.check_terminals(NodeType::Sensor, "input", config.input_count.get())?;
        self.check_terminals(NodeType::Actuator, "output", config.output_count.get())?;
        self.check_structure()
    }

    /// Performs every check of [`validate`] that does not
    /// depend on the configured number of inputs and outputs.
    ///
    /// [`validate`]: Genome::validate
    pub fn check_structure(&self) -> Result<(), ValidityError> {
        self.check_genes()?;
        self.check_node_bookkeeping()?;
        self.check_acyclic()
    }

    fn check_terminals(
        &self,
        node_type: NodeType,
        kind: &'static str,
        expected: usize,
    ) -> Result<(), ValidityError> {
        let found = self
            .nodes
            .values()
            .filter(|n| n.node_type() == node_type)
            .count();
        if found == expected {
            Ok(())
        } else {
            Err(ValidityError::MissingTerminals {
                kind,
                found,
                expected,
            })
        }
    }

    fn check_genes(&self) -> Result<(), ValidityError> {
        let mut pairings: HashMap<(Innovation, Innovation), Innovation, RandomState> =
            HashMap::default();
        for gene in self.genes.values() {
            let (id, (input, output)) = (gene.innovation(), gene.endpoints());
            let (input_node, output_node) = match (self.nodes.get(&input), self.nodes.get(&output)) {
                (Some(i), Some(o)) => (i, o),
                _ => {
                    return Err(ValidityError::DanglingGene {
                        gene: id,
                        input,
                        output,
                    })
                }
            };
            if output_node.node_type() == NodeType::Sensor {
                return Err(ValidityError::SensorEndpoint {
                    gene: id,
                    node: output,
                });
            }
            if !input_node.has_output_gene(id) {
                return Err(ValidityError::InconsistentNode {
                    node: input,
                    gene: id,
                });
            }
            if !output_node.has_input_gene(id) {
                return Err(ValidityError::InconsistentNode {
                    node: output,
                    gene: id,
                });
            }
            if let Some(first) = pairings.insert((input, output), id) {
                return Err(ValidityError::DuplicateConnection {
                    first,
                    second: id,
                    input,
                    output,
                });
            }
        }
        Ok(())
    }

    fn check_node_bookkeeping(&self) -> Result<(), ValidityError> {
        for node in self.nodes.values() {
            let node_id = node.innovation();
            let attached_inputs = node
                .input_genes()
                .map(|id| (*id, self.genes.get(id).map(Gene::output)));
            let attached_outputs = node
                .output_genes()
                .map(|id| (*id, self.genes.get(id).map(Gene::input)));
            for (gene, endpoint) in attached_inputs.chain(attached_outputs) {
                if endpoint != Some(node_id) {
                    return Err(ValidityError::InconsistentNode {
                        node: node_id,
                        gene,
                    });
                }
            }
        }
        Ok(())
    }

    /// Kahn's algorithm over the non-recurrent genes.
    fn check_acyclic(&self) -> Result<(), ValidityError> {
        let mut in_degrees: BTreeMap<Innovation, usize> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        for gene in self.genes.values().filter(|g| !g.recurrent()) {
            *in_degrees.entry(gene.output()).or_default() += 1;
        }

        let mut ready: Vec<Innovation> = in_degrees
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        while let Some(current) = ready.pop() {
            let node = &self.nodes[&current];
            for gene in node.output_genes().filter_map(|id| self.genes.get(id)) {
                if gene.recurrent() {
                    continue;
                }
                if let Some(degree) = in_degrees.get_mut(&gene.output()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(gene.output());
                    }
                }
            }
        }

        match in_degrees.iter().find(|(_, degree)| **degree > 0) {
            Some((node, _)) => Err(ValidityError::UntaggedCycle { node: *node }),
            None => Ok(()),
        }
    }

    /// Returns an iterator over the genome's genes,
    /// in ascending innovation order.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.values()
    }

    /// Returns an iterator over the genome's nodes,
    /// in ascending innovation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns the gene with the given innovation number, if present.
    pub fn gene(&self, innovation: Innovation) -> Option<&Gene> {
        self.genes.get(&innovation)
    }

    /// Returns the node with the given innovation number, if present.
    pub fn node(&self, innovation: Innovation) -> Option<&Node> {
        self.nodes.get(&innovation)
    }

    /// Returns the genome's identity.
    pub fn id(&self) -> GenomeId {
        self.id
    }

    /// Returns the generation in which the genome was created.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Records the genome's evaluated fitness.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History};
    /// use evolvenn::rng;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
    ///
    /// assert_eq!(genome.fitness(), None);
    /// genome.set_fitness(32.0);
    /// assert_eq!(genome.fitness(), Some(32.0));
    /// ```
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = Some(fitness);
    }

    /// Returns the genome's fitness, or `None` if it
    /// has not been evaluated yet.
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genes: Vec<String> = self.genes.values().map(Gene::to_string).collect();
        let nodes: Vec<String> = self.nodes.values().map(Node::to_string).collect();
        f.debug_struct("Genome")
            .field("Id", &self.id)
            .field("Origin", &self.origin)
            .field("Genes", &genes)
            .field("Nodes", &nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{self, EvolutionRng};
    use std::num::NonZeroUsize;

    fn genome_for(config: &GeneticConfig) -> (Genome, History, EvolutionRng) {
        let mut history = History::new(config);
        let mut rng = rng::seeded(17);
        let genome = Genome::new(config, &mut history, &mut rng);
        (genome, history, rng)
    }

    #[test]
    fn new_fully_connected() {
        for input_count in 1..10 {
            for output_count in 1..10 {
                let mut config = GeneticConfig::zero();
                config.initial_expression_chance = 1.0;
                config.input_count = NonZeroUsize::new(input_count).unwrap();
                config.output_count = NonZeroUsize::new(output_count).unwrap();
                config.output_activation_types = vec![
                    ActivationType::Sigmoid,
                    ActivationType::Gaussian,
                    ActivationType::Identity,
                    ActivationType::ReLU,
                    ActivationType::Sinusoidal,
                ];

                let (full_genome, ..) = genome_for(&config);
                assert_eq!(full_genome.genes.len(), input_count * output_count);
                assert_eq!(
                    full_genome
                        .nodes
                        .values()
                        .filter(|n| n.node_type() == NodeType::Sensor
                            && n.activation_type() == ActivationType::Identity)
                        .count(),
                    input_count
                );
                assert_eq!(
                    full_genome
                        .nodes
                        .values()
                        .filter(|n| n.node_type() == NodeType::Actuator
                            && n.activation_type()
                                == *config
                                    .output_activation_types
                                    .get(n.innovation() - input_count)
                                    .unwrap_or(&ActivationType::Sigmoid))
                        .count(),
                    output_count
                );
                for g in full_genome.genes.values() {
                    assert_eq!(
                        g.innovation(),
                        g.input() * output_count + (g.output() - input_count)
                    );
                    assert!(full_genome.nodes[&g.input()].has_output_gene(g.innovation()));
                    assert!(full_genome.nodes[&g.output()].has_input_gene(g.innovation()));
                    assert!(!g.recurrent());
                }
                assert!(full_genome.validate(&config).is_ok());
            }
        }
    }

    #[test]
    fn new_unconnected() {
        let config = GeneticConfig::zero();
        let (empty_genome, ..) = genome_for(&config);
        assert_eq!(empty_genome.genes.len(), 0);
        assert_eq!(empty_genome.id(), GenomeId(0));
    }

    #[test]
    fn add_gene() {
        const INNOVATION: Innovation = 631;
        const WEIGHT: f32 = 3.0;

        let (mut genome, ..) = genome_for(&GeneticConfig::zero());
        let gene = genome.add_gene(INNOVATION, 0, 1, WEIGHT).clone();

        assert_eq!(gene.endpoints(), (0, 1));
        assert_eq!(gene.weight(), WEIGHT);
        assert_eq!(genome.genes.len(), 1);
        assert_eq!(&genome.genes[&INNOVATION], &gene);
    }

    #[test]
    #[should_panic]
    fn add_gene_duplicate_gene_innovation() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;

        let (mut genome, ..) = genome_for(&config);
        genome.add_gene(0, 0, 1, 3.0);
    }

    #[test]
    #[should_panic]
    fn add_gene_duplicate_io() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;

        let (mut genome, ..) = genome_for(&config);
        genome.add_gene(555, 0, 1, 3.0);
    }

    #[test]
    #[should_panic]
    fn add_gene_invalid_input() {
        let (mut genome, ..) = genome_for(&GeneticConfig::zero());
        genome.add_gene(631, 500, 1, 3.0);
    }

    #[test]
    #[should_panic]
    fn add_gene_into_sensor() {
        let (mut genome, ..) = genome_for(&GeneticConfig::zero());
        genome.add_gene(631, 1, 0, 3.0);
    }

    #[test]
    #[should_panic]
    fn add_node_duplicate() {
        let (mut genome, ..) = genome_for(&GeneticConfig::zero());
        genome.add_node(0, ActivationType::Gaussian);
    }

    #[test]
    fn recurrent_tagging() {
        let (mut genome, ..) = genome_for(&GeneticConfig::zero());
        genome.add_node(2, ActivationType::ReLU);
        genome.add_node(3, ActivationType::ReLU);
        assert!(!genome.add_gene(10, 0, 2, 1.0).recurrent());
        assert!(!genome.add_gene(11, 2, 3, 1.0).recurrent());
        assert!(!genome.add_gene(12, 3, 1, 1.0).recurrent());
        assert!(genome.add_gene(13, 1, 2, 1.0).recurrent());
        assert!(genome.add_gene(14, 3, 2, 1.0).recurrent());
        // A suppressed gene still counts towards cycles.
        genome.genes.get_mut(&11).unwrap().set_suppressed(true);
        assert!(genome.closes_cycle(3, 2));
        assert!(genome.validate(&GeneticConfig::zero()).is_ok());
    }

    #[test]
    fn mutate_weights_reset() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.weight_reset_chance = 1.0;
        config.weight_bound = 3.0;

        let (mut genome, _, mut rng) = genome_for(&config);
        let initial_weight = genome.genes[&0].weight();
        genome.mutate_weights(0.0, &mut rng, &config);
        assert_ne!(initial_weight, genome.genes[&0].weight());
        assert!(genome.genes[&0].weight().abs() <= 3.0);
    }

    #[test]
    fn mutate_weights_nudge() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.weight_nudge_chance = 1.0;
        config.weight_bound = 5.0;

        let (mut genome, _, mut rng) = genome_for(&config);
        let initial_weight = genome.genes[&0].weight();
        genome.mutate_weights(3.0, &mut rng, &config);
        assert_ne!(initial_weight, genome.genes[&0].weight());
        assert!((initial_weight - genome.genes[&0].weight()).abs() <= 3.0);
    }

    #[test]
    fn mutate_weights_none() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.weight_bound = 5.0;

        let (mut genome, _, mut rng) = genome_for(&config);
        let initial_weight = genome.genes[&0].weight();
        genome.mutate_weights(3.0, &mut rng, &config);
        assert_eq!(initial_weight, genome.genes[&0].weight());
    }

    #[test]
    fn mutate_gene_addition() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.max_gene_addition_mutation_attempts = 20;

        let (mut genome, mut history, mut rng) = genome_for(&config);
        genome.add_node(2, ActivationType::Sigmoid);
        let gene = genome
            .mutate_add_gene(&mut history, &mut rng, &config)
            .unwrap()
            .clone();

        assert_eq!(
            gene.innovation(),
            history.next_gene_innovation(gene.input(), gene.output())
        );
        assert!((0..=2).contains(&gene.input()));
        assert!((1..=2).contains(&gene.output()));
        assert!(!gene.recurrent());
    }

    #[test]
    fn mutate_gene_addition_without_recursion_stays_acyclic() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.max_gene_addition_mutation_attempts = 20;

        let (mut genome, mut history, mut rng) = genome_for(&config);
        genome.add_node(50, ActivationType::Sigmoid);
        genome.add_node(51, ActivationType::Sigmoid);
        for _ in 0..10 {
            let _ = genome.mutate_add_gene(&mut history, &mut rng, &config);
        }
        assert!(genome.genes().all(|g| !g.recurrent()));
        assert!(genome.validate(&config).is_ok());
    }

    #[test]
    fn mutate_gene_addition_recursive() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.max_gene_addition_mutation_attempts = 20;
        config.recursion_chance = 1.0;

        let (mut genome, mut history, mut rng) = genome_for(&config);
        genome.add_node(50, ActivationType::Sigmoid);
        genome.add_gene(42, 0, 50, 2.0);
        genome.add_gene(43, 50, 1, 2.0);
        // Only recurrent connections remain: 1 -> 1, 1 -> 50, 50 -> 50.
        let gene = genome
            .mutate_add_gene(&mut history, &mut rng, &config)
            .unwrap();

        assert!(gene.recurrent());
        assert!(genome.validate(&config).is_ok());
    }

    #[test]
    #[should_panic]
    fn mutate_gene_addition_no_pairs_found() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;
        config.max_gene_addition_mutation_attempts = 20;
        config.recursion_chance = 1.0;

        let (mut genome, mut history, mut rng) = genome_for(&config);
        genome.add_gene(42, 1, 1, 5.0);

        genome
            .mutate_add_gene(&mut history, &mut rng, &config)
            .unwrap();
    }

    #[test]
    fn mutate_nodes_addition() {
        let mut config = GeneticConfig::zero();
        config.activation_types = vec![ActivationType::Sigmoid, ActivationType::ReLU];
        config.initial_expression_chance = 1.0;

        let (mut genome, mut history, mut rng) = genome_for(&config);
        let (input, node, output) = genome
            .mutate_add_node(&mut history, &mut rng, &config)
            .unwrap();

        assert_eq!(input.innovation(), *node.input_genes().next().unwrap());
        assert_eq!(output.innovation(), *node.output_genes().next().unwrap());
        assert!(config.activation_types.contains(&node.activation_type()));
        assert_eq!(node.innovation(), 2);
        assert_eq!(genome.genes.len(), 3);
        assert_eq!(genome.nodes.len(), 3);
        assert!(genome.genes[&0].suppressed());
    }

    #[test]
    fn mutate_node_addition_repeated_split() {
        let mut config = GeneticConfig::zero();
        config.initial_expression_chance = 1.0;

        let (mut genome, mut history, mut rng) = genome_for(&config);
        genome.mutate_add_node(&mut history, &mut rng, &config).unwrap();
        // Re-express the split gene and split it again.
        genome.genes.get_mut(&0).unwrap().set_suppressed(false);
        genome.genes.get_mut(&1).unwrap().set_suppressed(true);
        genome.genes.get_mut(&2).unwrap().set_suppressed(true);
        let (_, node, _) = genome.mutate_add_node(&mut history, &mut rng, &config).unwrap();

        assert_eq!(node.innovation(), 3);
        assert_eq!(genome.nodes.len(), 4);
        assert!(genome.validate(&config).is_ok());
    }

    #[test]
    fn mutate_node_addition_no_gene_found() {
        let config = GeneticConfig::zero();
        let (mut genome, mut history, mut rng) = genome_for(&config);
        assert!(genome
            .mutate_add_node(&mut history, &mut rng, &config)
            .is_err());
    }

    #[test]
    fn mutate_gene_deletion() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(5).unwrap(),
            output_count: NonZeroUsize::new(5).unwrap(),
            initial_expression_chance: 1.0,
            ..GeneticConfig::zero()
        };
        let (mut genome, _, mut rng) = genome_for(&config);
        let removed = genome.mutate_delete_gene(&mut rng).unwrap();
        assert_eq!(genome.genes().count(), 24);
        assert!(!genome.node_pairings.contains(&removed.endpoints()));
        assert!(genome.validate(&config).is_ok());
    }

    #[test]
    fn mutate_node_deletion_with_self_loop() {
        let config = GeneticConfig::zero();
        let (mut genome, _, mut rng) = genome_for(&config);
        genome.add_node(42, ActivationType::Sigmoid);
        genome.add_gene(16, 0, 42, 1.0);
        genome.add_gene(17, 42, 1, 1.0);
        genome.add_gene(18, 42, 42, 1.0);

        let (node, genes) = genome.mutate_delete_node(&mut rng).unwrap();
        assert_eq!(node.innovation(), 42);
        assert_eq!(genes.len(), 3);
        assert_eq!(genome.nodes().count(), 2);
        assert!(genome.validate(&config).is_ok());
    }

    #[test]
    fn mutate_produces_valid_genomes() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            recursion_chance: 0.2,
            mutation_rates: MutationRates {
                weight_perturbation: 0.8,
                add_connection: 0.5,
                remove_connection: 0.2,
                add_node: 0.4,
                remove_node: 0.1,
            },
            ..GeneticConfig::default()
        };
        let (mut genome, mut history, mut rng) = genome_for(&config);
        for generation in 0..200 {
            genome = genome.mutate(generation, &mut history, &mut rng, &config);
            assert_eq!(genome.validate(&config), Ok(()));
        }
    }

    #[test]
    fn crossover_keeps_fitter_structure() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            initial_expression_chance: 1.0,
            weight_bound: 5.0,
            ..GeneticConfig::zero()
        };
        let (mut weaker, mut history, mut rng) = genome_for(&config);
        let mut fitter = weaker.clone();
        fitter.add_node(3, ActivationType::Sigmoid);
        fitter.add_gene(10, 0, 3, 1.0);
        weaker.set_fitness(0.5);
        fitter.set_fitness(1.0);

        let child = weaker.crossover(&fitter, 4, &mut history, &mut rng, &config);
        assert_eq!(child.genes().count(), 3);
        assert!(child.gene(10).is_some());
        assert_eq!(child.origin(), 4);
        assert_eq!(child.fitness(), None);
        assert!(child.id() != weaker.id() && child.id() != fitter.id());
    }

    #[test]
    fn combines_genes_average() {
        let mut config = GeneticConfig::zero();
        config.input_count = NonZeroUsize::new(2).unwrap();

        let (mut genome1, ..) = genome_for(&config);
        genome1.add_node(3, ActivationType::Sigmoid);

        let mut genome2 = genome1.clone();

        genome1.add_gene(0, 0, 2, 1.0);
        genome2.add_gene(0, 0, 2, 3.0);
        genome1.add_gene(1, 0, 3, 2.0);
        genome2.add_gene(1, 0, 3, -2.0);
        genome1.add_gene(2, 3, 2, 3.0);
        genome2.add_gene(2, 3, 2, 3.5);
        genome1.add_gene(3, 1, 2, 4.0);
        genome2.add_gene(3, 1, 2, 4.0);

        genome1.average_common_genes(&genome2);

        assert_eq!(genome1.genes[&0].weight(), 2.0);
        assert_eq!(genome1.genes[&1].weight(), 0.0);
        assert_eq!(genome1.genes[&2].weight(), 3.25);
        assert_eq!(genome1.genes[&3].weight(), 4.0);
    }

    #[test]
    fn combines_genes_random_choice() {
        let mut config = GeneticConfig::zero();
        config.input_count = NonZeroUsize::new(2).unwrap();

        let (mut genome1, _, mut rng) = genome_for(&config);
        genome1.add_node(3, ActivationType::Sigmoid);

        let mut genome2 = genome1.clone();

        genome1.add_gene(0, 0, 2, 1.0);
        genome2.add_gene(0, 0, 2, 3.0);
        genome1.add_gene(1, 0, 3, 2.0);
        genome2.add_gene(1, 0, 3, -2.0);
        genome1.add_gene(2, 3, 2, 3.0);
        genome2.add_gene(2, 3, 2, 3.5);

        genome1.randomly_choose_common_genes(&genome2, &mut rng);

        assert!([1.0, 3.0].contains(&genome1.genes[&0].weight()));
        assert!([2.0, -2.0].contains(&genome1.genes[&1].weight()));
        assert!([3.0, 3.5].contains(&genome1.genes[&2].weight()));
    }

    #[test]
    fn reset_suppresseds() {
        let mut config = GeneticConfig::zero();
        config.input_count = NonZeroUsize::new(2).unwrap();
        config.suppression_reset_chance = 1.0;

        let (mut genome, _, mut rng) = genome_for(&config);
        genome.add_gene(0, 0, 2, 3.0).set_suppressed(true);
        genome.add_gene(1, 1, 2, 4.0).set_suppressed(true);
        genome.add_gene(2, 2, 2, 5.0).set_suppressed(true);

        genome.reset_suppresseds(&mut rng, &config);

        assert!(genome.genes.values().all(|g| !g.suppressed()));
    }

    #[test]
    fn genetic_distance_to() {
        const WEIGHT_FACTOR: f32 = 0.8;
        const DISJOINT_FACTOR: f32 = 0.6;
        const EXCESS_FACTOR: f32 = 0.4;
        let mut config = GeneticConfig::zero();
        config.input_count = NonZeroUsize::new(2).unwrap();
        config.common_weight_factor = WEIGHT_FACTOR;
        config.disjoint_gene_factor = DISJOINT_FACTOR;
        config.excess_gene_factor = EXCESS_FACTOR;

        let (mut genome1, ..) = genome_for(&config);
        let mut genome2 = genome1.clone();

        genome1.add_node(3, ActivationType::Sigmoid);
        genome2.add_node(4, ActivationType::Sigmoid);

        genome1.add_gene(1, 0, 2, -2.0);
        genome2.add_gene(1, 0, 2, 2.0);

        genome1.add_gene(2, 1, 3, 5.0);
        genome2.add_gene(3, 2, 4, 5.0);

        genome1.add_gene(4, 1, 2, 3.0);
        genome2.add_gene(4, 1, 2, 6.0);

        genome1.add_gene(5, 2, 2, 5.0);
        genome2.add_gene(6, 4, 4, 1.0);

        // Genes 2, 3 and 5 are disjoint, gene 6 is in excess.
        let expected =
            DISJOINT_FACTOR * 3.0 + EXCESS_FACTOR * 1.0 + WEIGHT_FACTOR * ((4.0 + 3.0) / 2.0);
        assert_eq!(genome1.genetic_distance(&genome2, &config), expected);
        assert_eq!(genome2.genetic_distance(&genome1, &config), expected);
    }

    #[test]
    fn genetic_distance_without_common_genes() {
        let mut config = GeneticConfig::zero();
        config.common_weight_factor = 1.0;
        config.excess_gene_factor = 1.0;

        let (mut genome1, ..) = genome_for(&config);
        let genome2 = genome1.clone();
        genome1.add_gene(0, 0, 1, 1.0);

        let distance = genome1.genetic_distance(&genome2, &config);
        assert_eq!(distance, 1.0);
    }

    #[test]
    fn genetic_distance_to_equal() {
        let mut config = GeneticConfig::zero();
        config.input_count = NonZeroUsize::new(2).unwrap();
        config.initial_expression_chance = 1.0;
        config.common_weight_factor = 1.0;
        config.disjoint_gene_factor = 0.5;
        config.excess_gene_factor = 0.5;

        let (mut genome, ..) = genome_for(&config);

        genome.add_node(3, ActivationType::Sigmoid);
        genome.add_node(4, ActivationType::Sigmoid);
        genome.add_gene(3, 2, 4, 5.0);
        genome.add_gene(5, 2, 2, 5.0);
        genome.add_gene(6, 4, 4, 1.0);

        assert_eq!(genome.genetic_distance(&genome.clone(), &config), 0.0);
    }

    #[test]
    fn validate_reports_defects() {
        let config = GeneticConfig {
            initial_expression_chance: 1.0,
            ..GeneticConfig::zero()
        };
        let (genome, ..) = genome_for(&config);

        let mut untagged = genome.clone();
        untagged.add_node(2, ActivationType::Sigmoid);
        untagged.add_gene(5, 1, 2, 1.0);
        untagged.add_gene(6, 2, 1, 1.0).set_recurrent(false);
        assert!(matches!(
            untagged.validate(&config),
            Err(ValidityError::UntaggedCycle { .. })
        ));

        let mut dangling = genome.clone();
        dangling.genes.insert(9, Gene::new(9, 0, 77, 1.0));
        assert!(matches!(
            dangling.validate(&config),
            Err(ValidityError::DanglingGene { gene: 9, .. })
        ));

        let mut duplicated = genome.clone();
        duplicated.genes.insert(9, Gene::new(9, 0, 1, 1.0));
        duplicated.nodes.get_mut(&0).unwrap().add_output_gene(9).unwrap();
        duplicated.nodes.get_mut(&1).unwrap().add_input_gene(9).unwrap();
        assert_eq!(
            duplicated.validate(&config),
            Err(ValidityError::DuplicateConnection {
                first: 0,
                second: 9,
                input: 0,
                output: 1
            })
        );

        let wider = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            ..config.clone()
        };
        assert!(matches!(
            genome.validate(&wider),
            Err(ValidityError::MissingTerminals { kind: "input", found: 1, expected: 2 })
        ));
    }
}
