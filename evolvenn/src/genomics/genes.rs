use crate::Innovation;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Genes are the principal components of genomes.
/// They are created between two nodes, and become
/// network connections in the genome's phenotype.
///
/// A gene closing a cycle among the genome's genes
/// is tagged as _recurrent_: in the network it
/// carries the previous step's activation.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Gene {
    id: Innovation,
    input: Innovation,
    output: Innovation,
    weight: f32,
    suppressed: bool,
    recurrent: bool,
}

impl Gene {
    /// Returns a new _unsuppressed_, non-recurrent
    /// gene with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::Gene;
    ///
    /// let gene = Gene::new(42, 3, 9, 2.0);
    /// ```
    pub fn new(id: Innovation, input: Innovation, output: Innovation, weight: f32) -> Gene {
        Gene {
            id,
            input,
            output,
            weight,
            suppressed: false,
            recurrent: false,
        }
    }

    /// Returns a random weight, uniformly
    /// distributed over the range ±`bound`.
    pub(crate) fn random_weight<R: Rng + ?Sized>(bound: f32, rng: &mut R) -> f32 {
        if bound <= 0.0 {
            0.0
        } else {
            rng.gen_range(-bound..=bound)
        }
    }

    /// Randomizes the gene's weight. Uses a uniform
    /// distribution over the range ±`bound`.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::Gene;
    /// use evolvenn::rng;
    ///
    /// let mut gene = Gene::new(42, 3, 9, 2.0);
    /// gene.randomize_weight(5.0, &mut rng::seeded(0));
    ///
    /// assert!(gene.weight().abs() <= 5.0);
    /// ```
    pub fn randomize_weight<R: Rng + ?Sized>(&mut self, bound: f32, rng: &mut R) {
        self.weight = Self::random_weight(bound, rng);
    }

    /// Nudges the gene's weight by a random amount. Uses
    /// a uniform distribution over the range ±`spread`.
    /// If the weight's magnitude would exceed `bound`,
    /// the weight is set to the maximum magnitude with the same
    /// sign.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::Gene;
    /// use evolvenn::rng;
    ///
    /// let mut gene = Gene::new(42, 3, 9, 3.0);
    /// gene.nudge_weight(2.5, 5.0, &mut rng::seeded(0));
    ///
    /// assert!((gene.weight() - 3.0).abs() <= 2.5);
    /// assert!(gene.weight().abs() <= 5.0);
    /// ```
    pub fn nudge_weight<R: Rng + ?Sized>(&mut self, spread: f32, bound: f32, rng: &mut R) {
        if spread > 0.0 {
            self.weight += rng.gen_range(-spread..=spread);
        }
        self.weight = self.weight.clamp(-bound.abs(), bound.abs());
    }

    /// Returns the gene's innovation number.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::Gene;
    ///
    /// let gene = Gene::new(42, 3, 9, 2.0);
    ///
    /// assert_eq!(gene.innovation(), 42);
    /// ```
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns the gene's input node's innovation number.
    pub fn input(&self) -> Innovation {
        self.input
    }

    /// Returns the gene's output node's innovation number.
    pub fn output(&self) -> Innovation {
        self.output
    }

    /// Returns the gene's weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Sets the gene's weight.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::Gene;
    ///
    /// let mut gene = Gene::new(42, 3, 9, 2.0);
    /// gene.set_weight(-5.0);
    ///
    /// assert_eq!(gene.weight(), -5.0);
    /// ```
    pub fn set_weight(&mut self, w: f32) {
        self.weight = w;
    }

    /// Returns the gene's suppression status.
    /// Suppressed genes are not expressed in the network.
    pub fn suppressed(&self) -> bool {
        self.suppressed
    }

    /// Sets the gene's suppression status.
    ///
    /// # Examples
    /// ```
    /// use evolvenn::genomics::Gene;
    ///
    /// let mut gene = Gene::new(42, 3, 9, 2.0);
    /// assert_eq!(gene.suppressed(), false);
    ///
    /// gene.set_suppressed(true);
    /// assert_eq!(gene.suppressed(), true);
    /// ```
    pub fn set_suppressed(&mut self, suppression: bool) {
        self.suppressed = suppression;
    }

    /// Returns whether the gene is tagged as recurrent.
    pub fn recurrent(&self) -> bool {
        self.recurrent
    }

    pub(super) fn set_recurrent(&mut self, recurrent: bool) {
        self.recurrent = recurrent;
    }

    /// Returns the gene's input and output's innovation numbers.
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.input, self.output)
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}{}{:?}, {:.3}]{}",
            if self.suppressed { "(" } else { "" },
            self.id,
            self.input,
            if self.recurrent { "~>" } else { "->" },
            self.output,
            self.weight,
            if self.suppressed { ")" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;

    #[test]
    fn zero_bound_weights_are_zero() {
        let mut rng = rng::seeded(3);
        assert!((0..50).all(|_| Gene::random_weight(0.0, &mut rng) == 0.0));
    }

    #[test]
    fn nudge_clamps_to_bound() {
        let mut rng = rng::seeded(11);
        let mut gene = Gene::new(0, 0, 1, 4.9);
        for _ in 0..100 {
            gene.nudge_weight(3.0, 5.0, &mut rng);
            assert!(gene.weight().abs() <= 5.0);
        }
    }

    #[test]
    fn display_marks_state() {
        let mut gene = Gene::new(7, 1, 2, 0.5);
        gene.set_recurrent(true);
        gene.set_suppressed(true);
        assert_eq!(gene.to_string(), "(7[1~>2, 0.500])");
    }
}
