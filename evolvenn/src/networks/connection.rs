use std::fmt;

/// A weighted link read by a network node,
/// addressing its source by arena index.
#[derive(Clone, Copy, PartialEq)]
pub struct Connection {
    pub source: usize,
    pub weight: f32,
}

impl Connection {
    /// Creates a new Connection with the specified
    /// source node and weight.
    pub fn new(source: usize, weight: f32) -> Connection {
        Connection { source, weight }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.9}", self.source, self.weight)
    }
}
