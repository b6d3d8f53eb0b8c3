//! A Network is a simple near-isomorphism of a Genome
//! generated as the phenotype of said Genome,
//! with suppressed genes being ignored. Genes are
//! converted into connections, and genome nodes
//! into network nodes.
//!
//! Nodes live in an index-addressed arena and are computed
//! in a topological order of the feed-forward connections.
//! Recurrent connections read the activations of the
//! previous step, which a [`NetworkState`] keeps between
//! calls. A `Network` itself is immutable, so it can be
//! shared across threads during evaluation.
mod connection;

use crate::errors::DecodeError;
use crate::genomics::{ActivationType, Genome, NodeType, ValidityError};
use crate::Innovation;
use connection::Connection;

use ahash::RandomState;

use std::collections::{HashMap, VecDeque};
use std::fmt;

/// An arbitrarily-structured neural network.
#[derive(Clone, Debug)]
pub struct Network {
    input_count: usize,
    output_count: usize,
    node_ids: Box<[Innovation]>,
    activation_functions: Box<[ActivationType]>,
    evaluation_order: Box<[usize]>,
    feed_forward: Box<[Box<[Connection]>]>,
    recurrent: Box<[Box<[Connection]>]>,
}

impl Network {
    /// Decodes a network from the passed genome.
    ///
    /// # Errors
    /// Returns an error if the genome is structurally
    /// invalid, or lacks input or output nodes.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{GeneticConfig, Genome, History};
    /// use evolvenn::networks::Network;
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
    /// let genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
    ///
    /// let network = Network::new(&genome).unwrap();
    /// assert_eq!(network.input_count(), 3);
    /// assert_eq!(network.output_count(), 2);
    /// ```
    pub fn new(genome: &Genome) -> Result<Network, DecodeError> {
        genome.check_structure()?;

        let mut input_nodes = vec![];
        let mut output_nodes = vec![];
        let mut hidden_nodes = vec![];

        // Nodes come in ascending innovation order, so
        // the arena layout only depends on the genome.
        for node in genome.nodes() {
            match node.node_type() {
                NodeType::Sensor => &mut input_nodes,
                NodeType::Actuator => &mut output_nodes,
                NodeType::Neuron => &mut hidden_nodes,
            }
            .push((node.innovation(), node.activation_type()));
        }
        if input_nodes.is_empty() {
            return Err(DecodeError::MissingTerminals("input"));
        }
        if output_nodes.is_empty() {
            return Err(DecodeError::MissingTerminals("output"));
        }

        let (node_ids, activation_functions): (Vec<_>, Vec<_>) = input_nodes
            .iter()
            .chain(&output_nodes)
            .chain(&hidden_nodes)
            .copied()
            .unzip();
        let total_node_count = node_ids.len();

        let node_index_from_id: HashMap<_, _, RandomState> = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let mut feed_forward = vec![vec![]; total_node_count];
        let mut recurrent = vec![vec![]; total_node_count];

        for gene in genome.genes().filter(|g| !g.suppressed()) {
            let source = node_index_from_id[&gene.input()];
            let target = node_index_from_id[&gene.output()];
            let incoming = if gene.recurrent() {
                &mut recurrent
            } else {
                &mut feed_forward
            };
            incoming[target].push(Connection::new(source, gene.weight()));
        }

        let evaluation_order = Self::evaluation_order(input_nodes.len(), &node_ids, &feed_forward)?;

        Ok(Network {
            input_count: input_nodes.len(),
            output_count: output_nodes.len(),
            node_ids: node_ids.into(),
            activation_functions: activation_functions.into(),
            evaluation_order: evaluation_order.into(),
            feed_forward: feed_forward.into_iter().map(|v| v.into()).collect(),
            recurrent: recurrent.into_iter().map(|v| v.into()).collect(),
        })
    }

    /// Returns the non-input node indices in an order where
    /// every node comes after its feed-forward sources.
    fn evaluation_order(
        input_count: usize,
        node_ids: &[Innovation],
        feed_forward: &[Vec<Connection>],
    ) -> Result<Vec<usize>, DecodeError> {
        let mut pending: Vec<usize> = feed_forward.iter().map(Vec::len).collect();
        let mut dependants = vec![vec![]; feed_forward.len()];
        for (target, incoming) in feed_forward.iter().enumerate() {
            for connection in incoming.iter() {
                dependants[connection.source].push(target);
            }
        }

        let mut ready: VecDeque<usize> = (0..pending.len()).filter(|i| pending[*i] == 0).collect();
        let mut order = Vec::with_capacity(pending.len());
        while let Some(node) = ready.pop_front() {
            order.push(node);
            for &dependant in &dependants[node] {
                pending[dependant] -= 1;
                if pending[dependant] == 0 {
                    ready.push_back(dependant);
                }
            }
        }

        if let Some(node) = pending.iter().position(|p| *p > 0) {
            return Err(ValidityError::UntaggedCycle {
                node: node_ids[node],
            }
            .into());
        }
        Ok(order.into_iter().filter(|node| *node >= input_count).collect())
    }

    /// Runs a single step from a cleared state and
    /// returns the output node activations.
    ///
    /// # Panics
    /// This function panics if the length of `inputs`
    /// is not equal to the number of inputs in the network.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::{ActivationType, GeneticConfig, Genome, History};
    /// use evolvenn::networks::Network;
    /// use evolvenn::rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
    /// genome.add_gene(0, 0, 2, 2.5);
    /// genome.add_gene(1, 1, 2, -0.5);
    ///
    /// let network = Network::new(&genome).unwrap();
    ///
    /// assert_eq!(network.evaluate(&[1.0, 1.0]), vec![2.0]);
    /// assert_eq!(network.evaluate(&[0.0, 1.0]), vec![0.0]);
    /// ```
    pub fn evaluate(&self, inputs: &[f32]) -> Vec<f32> {
        NetworkState::new(self).activate(self, inputs)
    }

    /// Returns the number of input nodes.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the number of output nodes.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Returns the total number of nodes.
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Returns the number of expressed connections.
    pub fn connection_count(&self) -> usize {
        self.feed_forward
            .iter()
            .chain(self.recurrent.iter())
            .map(|incoming| incoming.len())
            .sum()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Debug).fmt(f)
    }
}

/// Node activations of a [`Network`] carried from one
/// step to the next, for tasks spanning multiple time-steps.
///
/// # Examples
/// ```
/// use evolvenn::genomics::{GeneticConfig, Genome, History};
/// use evolvenn::networks::{Network, NetworkState};
/// use evolvenn::rng;
///
/// let config = GeneticConfig::zero();
/// let mut genome = Genome::new(&config, &mut History::new(&config), &mut rng::seeded(0));
/// genome.add_gene(0, 0, 1, 1.0);
/// // A recurrent self-connection on the output node.
/// genome.add_gene(1, 1, 1, -1.0);
///
/// let network = Network::new(&genome).unwrap();
/// let mut state = NetworkState::new(&network);
///
/// let first = state.activate(&network, &[1.0]);
/// let second = state.activate(&network, &[1.0]);
///
/// // The second step is damped by the first step's output.
/// assert!(second[0] < first[0]);
///
/// state.clear();
/// assert_eq!(state.activate(&network, &[1.0]), first);
/// ```
#[derive(Clone, Debug)]
pub struct NetworkState {
    current: Box<[f32]>,
    previous: Box<[f32]>,
}

impl NetworkState {
    /// Returns a cleared state sized for `network`.
    pub fn new(network: &Network) -> NetworkState {
        NetworkState {
            current: vec![0.0; network.node_count()].into(),
            previous: vec![0.0; network.node_count()].into(),
        }
    }

    /// Sets the input activations, computes every other node
    /// once in evaluation order, and returns the output node
    /// activations.
    ///
    /// # Panics
    /// This function panics if the length of `inputs` is not
    /// equal to the number of inputs in the network, or if the
    /// state was created for a network of a different size.
    pub fn activate(&mut self, network: &Network, inputs: &[f32]) -> Vec<f32> {
        assert_eq!(
            inputs.len(),
            network.input_count,
            "network expects {} inputs",
            network.input_count
        );
        assert_eq!(self.current.len(), network.node_count(), "state size mismatch");

        std::mem::swap(&mut self.current, &mut self.previous);
        self.current[..network.input_count].copy_from_slice(inputs);

        for &node in network.evaluation_order.iter() {
            let feed_forward_sum: f32 = network.feed_forward[node]
                .iter()
                .map(|c| self.current[c.source] * c.weight)
                .sum();
            let recurrent_sum: f32 = network.recurrent[node]
                .iter()
                .map(|c| self.previous[c.source] * c.weight)
                .sum();
            self.current[node] = network.activation_functions[node].apply(feed_forward_sum + recurrent_sum);
        }

        self.outputs(network).to_vec()
    }

    /// Returns the output node activations of the latest step.
    pub fn outputs(&self, network: &Network) -> &[f32] {
        &self.current[network.input_count..network.input_count + network.output_count]
    }

    /// Clears the activation state of all nodes.
    pub fn clear(&mut self) {
        self.current.iter_mut().for_each(|a| *a = 0.0);
        self.previous.iter_mut().for_each(|a| *a = 0.0);
    }
}
