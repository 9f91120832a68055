//! Core functionalities.
mod env;
mod policy;
mod step;
pub use env::{BattleEnvManager, EnvManager, SlotMap};
pub use policy::{FromAction, Forward, Policy, PolicyOutput, PolicyTransition};
pub use step::{Info, JointTimestep, Timestep, Transition};

use crate::buffer::DeepClone;
use std::fmt::Debug;

/// An observation of a single environment slot.
///
/// Observations are cached by the collectors between the inference and the rollout
/// steps, see [`CachePool`](crate::buffer::CachePool). Implementors holding shared
/// handles (e.g. `Rc<RefCell<_>>`) should override [`DeepClone::deep_clone`] so that
/// `deepcopy_obs` takes effect.
pub trait Obs: DeepClone + Debug {
    /// Converts the observation into the numeric representation consumed by policies.
    ///
    /// Applied before [`Forward::forward`] when `transform_obs` is enabled in
    /// [`CollectorConfig`](crate::collector::CollectorConfig). The cached observation,
    /// which ends up in transitions, is the untransformed one.
    fn transform(self) -> Self
    where
        Self: Sized,
    {
        self
    }
}

