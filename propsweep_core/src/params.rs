//! Parameter tuples and the sweep grid.

use serde::{Deserialize, Serialize};

/// One point of the sweep grid.
///
/// `root_count` only matters for the proposed method; baseline tuples carry
/// a fixed placeholder so every tuple renders the same configuration schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterTuple {
    /// Number of simulated nodes
    pub population: u32,

    /// Connections reserved for peers inside the node's own region
    pub internal_forward: u32,

    /// Root-count parameter of the proposed relay selection
    pub root_count: f64,

    /// Proposed method (true) or baseline (false)
    pub proposal: bool,
}

impl ParameterTuple {
    /// Creates a tuple for the proposed method.
    pub fn proposed(population: u32, internal_forward: u32, root_count: f64) -> Self {
        Self {
            population,
            internal_forward,
            root_count,
            proposal: true,
        }
    }

    /// Creates a baseline tuple with the given placeholder root count.
    pub fn baseline(population: u32, internal_forward: u32, placeholder_root: f64) -> Self {
        Self {
            population,
            internal_forward,
            root_count: placeholder_root,
            proposal: false,
        }
    }

    /// Directory and log label, e.g. `n500_vs4_2root` or `n500_vs4_baseline`.
    pub fn label(&self) -> String {
        if self.proposal {
            format!("n{}_vs{}_{}root", self.population, self.internal_forward, self.root_count)
        } else {
            format!("n{}_vs{}_baseline", self.population, self.internal_forward)
        }
    }

    /// Method column of the report, e.g. `proposed(2-root)` or `baseline`.
    pub fn method_label(&self) -> String {
        if self.proposal {
            format!("proposed({}-root)", self.root_count)
        } else {
            "baseline".to_string()
        }
    }

    /// Inbound/outbound ratio column of the report, e.g. `vs4`.
    pub fn ratio_label(&self) -> String {
        format!("vs{}", self.internal_forward)
    }
}

impl std::fmt::Display for ParameterTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The cartesian parameter space of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    /// Population sizes
    pub populations: Vec<u32>,

    /// Internal-forward values
    pub internal_forwards: Vec<u32>,

    /// Proposal-mode flags
    pub proposal_modes: Vec<bool>,

    /// Root counts (proposed method only)
    pub root_counts: Vec<f64>,

    /// Root count written into baseline configurations
    pub baseline_root: f64,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            populations: vec![500],
            internal_forwards: vec![7, 6, 5, 4],
            proposal_modes: vec![true, false],
            root_counts: vec![2.0, 3.0, 4.0],
            baseline_root: 1.0,
        }
    }
}

impl ParameterGrid {
    /// Enumerates every tuple in sweep order.
    ///
    /// Nesting is internal-forward, then proposal mode, then population;
    /// proposed tuples fan out over every root count, baseline tuples
    /// appear once.
    pub fn tuples(&self) -> Vec<ParameterTuple> {
        let mut tuples = Vec::new();
        for &internal in &self.internal_forwards {
            for &proposal in &self.proposal_modes {
                for &population in &self.populations {
                    if proposal {
                        for &root in &self.root_counts {
                            tuples.push(ParameterTuple::proposed(population, internal, root));
                        }
                    } else {
                        tuples.push(ParameterTuple::baseline(population, internal, self.baseline_root));
                    }
                }
            }
        }
        tuples
    }

    /// First label produced by more than one tuple, if any.
    ///
    /// Tuples sharing a label would share an output directory.
    pub fn duplicate_label(&self) -> Option<String> {
        let mut seen = std::collections::HashSet::new();
        self.tuples()
            .into_iter()
            .map(|tuple| tuple.label())
            .find(|label| !seen.insert(label.clone()))
    }

    /// Returns the number of tuples in the grid.
    pub fn len(&self) -> usize {
        let per_population: usize = self
            .proposal_modes
            .iter()
            .map(|&proposal| if proposal { self.root_counts.len() } else { 1 })
            .sum();
        self.internal_forwards.len() * self.populations.len() * per_population
    }

    /// Returns true if the grid contains no tuple.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
