use serde::{Deserialize, Serialize};
use std::fmt;

use crate::commons::NtlError;

/// Number of quantile classes
pub const CLASS_COUNT: usize = 4;

/// Nighttime-light intensity class, ordered from dimmest to brightest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NtlClass {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl NtlClass {
    pub const ALL: [NtlClass; CLASS_COUNT] = [
        NtlClass::Low,
        NtlClass::Medium,
        NtlClass::High,
        NtlClass::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NtlClass::Low => "Low",
            NtlClass::Medium => "Medium",
            NtlClass::High => "High",
            NtlClass::VeryHigh => "Very High",
        }
    }

    /// Zero-based quartile index
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for NtlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The five quartile bin edges (min, q25, q50, q75, max)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileEdges {
    edges: [f64; CLASS_COUNT + 1],
}

impl QuantileEdges {
    /// Compute edges from values sorted ascending
    fn from_sorted(sorted: &[f64]) -> Self {
        let mut edges = [0.0; CLASS_COUNT + 1];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = quantile(sorted, i as f64 / CLASS_COUNT as f64);
        }
        QuantileEdges { edges }
    }

    pub fn edges(&self) -> &[f64; CLASS_COUNT + 1] {
        &self.edges
    }

    fn is_strictly_increasing(&self) -> bool {
        self.edges.windows(2).all(|w| w[0] < w[1])
    }

    /// Class for a value; bins are right-closed and the first bin also holds
    /// the minimum, so a value on an edge gets the lower class
    pub fn label_for(&self, value: f64) -> Option<NtlClass> {
        if value.is_nan() || value < self.edges[0] || value > self.edges[CLASS_COUNT] {
            return None;
        }
        (0..CLASS_COUNT)
            .find(|&i| value <= self.edges[i + 1])
            .and_then(NtlClass::from_index)
    }
}

/// Quartile edges plus one label per input value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub edges: QuantileEdges,
    /// `None` marks a ward without data
    pub labels: Vec<Option<NtlClass>>,
}

impl Classification {
    /// Wards per class, in class order
    pub fn counts(&self) -> [usize; CLASS_COUNT] {
        let mut counts = [0; CLASS_COUNT];
        for class in self.labels.iter().flatten() {
            counts[class.index()] += 1;
        }
        counts
    }

    pub fn no_data_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }
}

/// Linear-interpolation quantile of ascending `sorted` values, `p` in [0, 1]
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Assign each mean its quartile class.
///
/// Undefined means are left out of the quartile computation and labelled
/// `None`. Fails with `ClassificationDegenerate` when fewer than four distinct
/// means exist or two quartile edges coincide.
pub fn classify(means: &[Option<f64>]) -> Result<Classification, NtlError> {
    let mut sorted: Vec<f64> = means.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() < CLASS_COUNT {
        return Err(NtlError::ClassificationDegenerate {
            distinct: distinct.len(),
            classes: CLASS_COUNT,
        });
    }

    let edges = QuantileEdges::from_sorted(&sorted);
    if !edges.is_strictly_increasing() {
        return Err(NtlError::ClassificationDegenerate {
            distinct: distinct.len(),
            classes: CLASS_COUNT,
        });
    }

    let labels = means
        .iter()
        .map(|m| m.and_then(|v| edges.label_for(v)))
        .collect();
    Ok(Classification { edges, labels })
}
