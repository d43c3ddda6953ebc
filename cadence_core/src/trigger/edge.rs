/// Transition observed between two consecutive samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// One bit of state: the previous sample of a boolean signal.
///
/// The first sample only seeds the detector and never reports an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    previous: Option<bool>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, now: bool) -> Option<Edge> {
        let previous = self.previous.replace(now);
        match (previous, now) {
            (Some(false), true) => Some(Edge::Rising),
            (Some(true), false) => Some(Edge::Falling),
            _ => None,
        }
    }

    pub fn previous(&self) -> Option<bool> {
        self.previous
    }
}
