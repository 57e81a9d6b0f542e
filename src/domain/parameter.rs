// ============================================================
// Layer 3 — Parameters and the Trainable Set
// ============================================================
// Every learnable tensor in the network is identified by the
// layer it lives in and its role inside that layer:
//
//   conv1/weight, conv1/bias, ..., fc8/weight, fc8/bias
//
// The layer name is the first path segment. Selecting which
// parameters may be updated is a literal set-membership check
// of that segment against a fixed whitelist.
//
//   whitelist = ["fc8"]
//   conv1/weight  → frozen
//   fc7/bias      → frozen
//   fc8/weight    → trainable
//   fc8/bias      → trainable

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ─── ParamRole ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamRole {
    Weight,
    Bias,
}

impl ParamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamRole::Weight => "weight",
            ParamRole::Bias   => "bias",
        }
    }
}

// ─── ParameterId ──────────────────────────────────────────────────────────────
/// Identifies one parameter tensor by `(layer_name, role)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterId {
    pub layer: String,
    pub role:  ParamRole,
}

impl ParameterId {
    pub fn new(layer: impl Into<String>, role: ParamRole) -> Self {
        Self { layer: layer.into(), role }
    }

    pub fn weight(layer: impl Into<String>) -> Self {
        Self::new(layer, ParamRole::Weight)
    }

    pub fn bias(layer: impl Into<String>) -> Self {
        Self::new(layer, ParamRole::Bias)
    }

    /// The first path segment of the identifier.
    pub fn layer_name(&self) -> &str {
        &self.layer
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer, self.role.as_str())
    }
}

// ─── TrainableSet ─────────────────────────────────────────────────────────────
/// The parameters eligible for gradient updates during this run.
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainableSet {
    members: BTreeSet<ParameterId>,
}

impl TrainableSet {
    pub fn contains(&self, id: &ParameterId) -> bool {
        self.members.contains(id)
    }

    /// True when at least one parameter of `layer` is trainable.
    pub fn contains_layer(&self, layer: &str) -> bool {
        self.members.iter().any(|id| id.layer == layer)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterId> {
        self.members.iter()
    }
}

impl FromIterator<ParameterId> for TrainableSet {
    fn from_iter<T: IntoIterator<Item = ParameterId>>(iter: T) -> Self {
        Self { members: iter.into_iter().collect() }
    }
}

/// Select the trainable parameters: a parameter is included iff its
/// layer name is a literal member of `whitelist`.
pub fn select<S: AsRef<str>>(all_parameters: &[ParameterId], whitelist: &[S]) -> TrainableSet {
    all_parameters
        .iter()
        .filter(|id| whitelist.iter().any(|name| name.as_ref() == id.layer_name()))
        .cloned()
        .collect()
}

/// Split `all_parameters` into `(trainable, frozen)`.
/// Every parameter lands in exactly one of the two lists.
pub fn partition<'a>(
    all_parameters: &'a [ParameterId],
    trainable:      &TrainableSet,
) -> (Vec<&'a ParameterId>, Vec<&'a ParameterId>) {
    all_parameters.iter().partition(|id| trainable.contains(id))
}

// ─── Source ───────────────────────────────────────────────────────────────────
/// Which of the two data sources a cursor is reading from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Training,
    Validation,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Training   => write!(f, "training"),
            Source::Validation => write!(f, "validation"),
        }
    }
}
