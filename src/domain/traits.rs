// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The orchestration code only needs to know which parameters a
// network has and how to freeze the ones outside the trainable
// set. The concrete network (AlexNet in Layer 5) implements
// these; the domain layer never sees a tensor.

use crate::domain::parameter::{ParameterId, TrainableSet};

// ─── ParameterRegistry ────────────────────────────────────────────────────────
/// Any network whose parameters are addressable by `(layer, role)`.
pub trait ParameterRegistry: Sized {
    /// Every parameter the network owns, in layer order.
    fn parameter_ids(&self) -> Vec<ParameterId>;

    /// Layer names in forward order.
    fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for id in self.parameter_ids() {
            if !names.contains(&id.layer) {
                names.push(id.layer);
            }
        }
        names
    }

    /// Return the network with every parameter outside `trainable`
    /// excluded from gradient computation.
    fn freeze(self, trainable: &TrainableSet) -> Self;
}
