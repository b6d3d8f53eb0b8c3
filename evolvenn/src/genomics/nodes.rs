use super::{AbsentEntryRemoval, GeneViabilityError};
use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;

/// Activation function applied to the weighted
/// sum of a node's incoming signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ActivationType {
    // 1 / (1 + exp(-4.9x))
    Sigmoid,
    // x
    Identity,
    // max(0, x)
    ReLU,
    // exp(-x²)
    Gaussian,
    // sin(πx)
    Sinusoidal,
}

impl ActivationType {
    /// Applies the activation function to `x`.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Identity.apply(-3.0), -3.0);
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// ```
    pub fn apply(self, x: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-4.9 * x).exp()),
            ActivationType::Identity => x,
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Gaussian => (-x.powi(2)).exp(),
            ActivationType::Sinusoidal => (std::f32::consts::PI * x).sin(),
        }
    }
}

/// Role of a node in the decoded network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Receives one network input.
    Sensor,
    /// Hidden.
    Neuron,
    /// Produces one network output.
    Actuator,
}

/// A node gene. Connection genes run between nodes,
/// and each node lists the innovation numbers of the
/// genes entering and leaving it, in ascending order.
///
/// # Examples
/// ```
/// use evolvenn::genomics::{ActivationType, Node, NodeType};
///
/// let mut node = Node::new(5, NodeType::Neuron, ActivationType::Sigmoid);
/// assert_eq!(node.innovation(), 5);
///
/// node.add_input_gene(9).unwrap();
/// node.add_input_gene(2).unwrap();
/// assert!(node.add_input_gene(9).is_err());
/// assert_eq!(node.input_genes().copied().collect::<Vec<_>>(), vec![2, 9]);
///
/// assert!(node.remove_input_gene(9).is_ok());
/// assert!(node.remove_input_gene(9).is_err());
/// assert_eq!(node.output_genes().count(), 0);
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    id: Innovation,
    inputs: BTreeSet<Innovation>,
    outputs: BTreeSet<Innovation>,
    node_type: NodeType,
    activation_type: ActivationType,
}

impl Node {
    pub fn new(id: Innovation, node_type: NodeType, activation_type: ActivationType) -> Node {
        Node {
            id,
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            node_type,
            activation_type,
        }
    }

    /// Records `gene_id` as entering the node.
    ///
    /// # Errors
    /// Fails if the gene was already recorded.
    pub fn add_input_gene(&mut self, gene_id: Innovation) -> Result<(), impl Error> {
        if self.inputs.insert(gene_id) {
            Ok(())
        } else {
            Err(GeneViabilityError::DuplicateGeneID(gene_id, None))
        }
    }

    /// Forgets the entering gene `gene_id`.
    ///
    /// # Errors
    /// Fails if no such gene was recorded.
    pub fn remove_input_gene(&mut self, gene_id: Innovation) -> Result<(), impl Error> {
        if self.inputs.remove(&gene_id) {
            Ok(())
        } else {
            Err(AbsentEntryRemoval::Gene(gene_id))
        }
    }

    /// Records `gene_id` as leaving the node.
    ///
    /// # Errors
    /// Fails if the gene was already recorded.
    pub fn add_output_gene(&mut self, gene_id: Innovation) -> Result<(), impl Error> {
        if self.outputs.insert(gene_id) {
            Ok(())
        } else {
            Err(GeneViabilityError::DuplicateGeneID(gene_id, None))
        }
    }

    /// Forgets the leaving gene `gene_id`.
    ///
    /// # Errors
    /// Fails if no such gene was recorded.
    pub fn remove_output_gene(&mut self, gene_id: Innovation) -> Result<(), impl Error> {
        if self.outputs.remove(&gene_id) {
            Ok(())
        } else {
            Err(AbsentEntryRemoval::Gene(gene_id))
        }
    }

    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Genes entering the node, in ascending order.
    pub fn input_genes(&self) -> impl Iterator<Item = &Innovation> {
        self.inputs.iter()
    }

    /// Genes leaving the node, in ascending order.
    pub fn output_genes(&self) -> impl Iterator<Item = &Innovation> {
        self.outputs.iter()
    }

    pub fn has_input_gene(&self, gene_id: Innovation) -> bool {
        self.inputs.contains(&gene_id)
    }

    pub fn has_output_gene(&self, gene_id: Innovation) -> bool {
        self.outputs.contains(&gene_id)
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn activation_type(&self) -> ActivationType {
        self.activation_type
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{:?}, {:?}, IN: {:?}, OUT: {:?}]",
            self.id, self.node_type, self.activation_type, self.inputs, self.outputs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activations() {
        assert_eq!(ActivationType::ReLU.apply(2.5), 2.5);
        assert_eq!(ActivationType::Gaussian.apply(0.0), 1.0);
        assert!(ActivationType::Sinusoidal.apply(0.5) > 0.999);
        assert!(ActivationType::Sigmoid.apply(10.0) > 0.999);
        assert!(ActivationType::Sigmoid.apply(-10.0) < 0.001);
    }

    #[test]
    fn gene_lists_are_ordered() {
        let mut node = Node::new(3, NodeType::Actuator, ActivationType::Identity);
        for gene in [9, 2, 5] {
            node.add_output_gene(gene).unwrap();
        }
        assert_eq!(node.output_genes().copied().collect::<Vec<_>>(), vec![2, 5, 9]);
        assert!(node.has_output_gene(5));
        assert!(!node.has_input_gene(5));
    }
}
