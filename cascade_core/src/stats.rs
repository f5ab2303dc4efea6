//! Population counts over the graph's node states.

use serde::Serialize;
use std::fmt;

/// How many nodes sit in each state, taken from one read scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub spreading: usize,
    pub evolved: usize,
    pub leaders: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "active={} inactive={} spreading={} evolved={} (total={}, leaders={})",
            self.active, self.inactive, self.spreading, self.evolved, self.total, self.leaders
        )
    }
}
