use crate::Innovation;

use thiserror::Error;

/// Removal of an entry the genome does not hold.
#[derive(Debug, Error)]
pub(crate) enum AbsentEntryRemoval {
    #[error("attempted removal of nonexistant gene with id {0}")]
    Gene(Innovation),
}

/// Rejection of a gene being added to a genome.
#[derive(Debug, Error)]
pub(crate) enum GeneViabilityError {
    /// The innovation number is taken, optionally with
    /// the endpoints of the rejected gene.
    #[error("duplicate gene insertion with id {0}{}", endpoints(.1))]
    DuplicateGeneID(Innovation, Option<(Innovation, Innovation)>),
    #[error("gene insertion between nonexistant endpoint(s) {0} -> {1}")]
    NonexistantEndpoints(Innovation, Innovation),
    /// Another gene already joins the same ordered pair.
    #[error("gene {0} shadows the existing connection {}", connection(.1))]
    DuplicateGeneWithEndpoints(Innovation, (Innovation, Innovation)),
    #[error("gene insertion into sensor node {0}")]
    SensorEndpoint(Innovation),
}

fn connection((input, output): &(Innovation, Innovation)) -> String {
    format!("{} -> {}", input, output)
}

fn endpoints(pair: &Option<(Innovation, Innovation)>) -> String {
    match pair {
        Some(pair) => format!(" between endpoints {}", connection(pair)),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub(crate) enum NodeViabilityError {
    #[error("duplicate node insertion with id {0}")]
    DuplicateNodeID(Innovation),
}

/// Failure of a gene addition mutation.
#[derive(Debug, Error)]
pub(crate) enum GeneMutationError {
    #[error("gene mutation on fully-connected genome")]
    AllInputsFullyConnected,
    #[error("no viable input-output pair found for gene mutation")]
    NoInputOutputPairFound,
}

/// Failure of a node addition mutation.
#[derive(Debug, Error)]
pub(crate) enum NodeMutationError {
    #[error("node mutation on genome without expressed genes")]
    EmptyGenome,
}

/// A structural defect that keeps a genome
/// from being decoded into a network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidityError {
    /// A gene references a node absent from the genome.
    #[error("gene {gene} references missing node(s) {input} -> {output}")]
    DanglingGene {
        gene: Innovation,
        input: Innovation,
        output: Innovation,
    },
    /// Two genes connect the same ordered node pair.
    #[error("genes {first} and {second} both connect {input} -> {output}")]
    DuplicateConnection {
        first: Innovation,
        second: Innovation,
        input: Innovation,
        output: Innovation,
    },
    /// A gene feeds into an input node.
    #[error("gene {gene} feeds into sensor node {node}")]
    SensorEndpoint { gene: Innovation, node: Innovation },
    /// A node's gene bookkeeping disagrees with the genes themselves.
    #[error("node {node} lists gene {gene}, which does not attach to it")]
    InconsistentNode { node: Innovation, gene: Innovation },
    /// The genome lacks the configured input or output nodes.
    #[error("genome has {found} {kind} node(s), expected {expected}")]
    MissingTerminals {
        kind: &'static str,
        found: usize,
        expected: usize,
    },
    /// Genes not tagged as recurrent form a cycle.
    #[error("untagged cycle through node {node}")]
    UntaggedCycle { node: Innovation },
}
