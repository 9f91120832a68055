//! Environment managers.
use super::{Info, JointTimestep, Obs, Timestep};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A mapping from environment slot ids to values.
///
/// Iteration is in ascending slot id, which is the order the collectors process
/// slots in.
pub type SlotMap<T> = BTreeMap<usize, T>;

/// Manages `env_num` environment instances, each identified by a slot id.
///
/// A manager may run its environments in worker processes or threads; the collectors
/// only call it synchronously and block until results are returned. Environments
/// are expected to reset themselves when an episode ends, the initial observation of
/// the next episode showing up in [`EnvManager::ready_obs`].
pub trait EnvManager {
    /// Observation of a slot.
    type Obs: Obs;

    /// Action of a slot.
    type Act: Clone + Debug;

    /// Information in the [`Timestep`] object.
    type Info: Info;

    /// The number of environment slots.
    fn env_num(&self) -> usize;

    /// Launches the environments.
    fn launch(&mut self) -> Result<()>;

    /// Resets all environments.
    fn reset(&mut self) -> Result<()>;

    /// Closes all environments.
    fn close(&mut self) -> Result<()>;

    /// Returns observations of the slots waiting for an action.
    fn ready_obs(&mut self) -> Result<SlotMap<Self::Obs>>;

    /// Applies actions and returns a timestep for each slot that finished stepping.
    fn step(&mut self, actions: &SlotMap<Self::Act>)
        -> Result<SlotMap<Timestep<Self::Obs, Self::Info>>>;
}

/// Manages environments shared by `N` policies acting simultaneously, as in self-play.
///
/// Observations, actions and timesteps carry one entry per policy.
pub trait BattleEnvManager<const N: usize> {
    /// Observation of a slot for a single policy.
    type Obs: Obs;

    /// Action of a single policy.
    type Act: Clone + Debug;

    /// Information for a single policy.
    type Info: Info;

    /// The number of environment slots.
    fn env_num(&self) -> usize;

    /// Launches the environments.
    fn launch(&mut self) -> Result<()>;

    /// Resets all environments.
    fn reset(&mut self) -> Result<()>;

    /// Closes all environments.
    fn close(&mut self) -> Result<()>;

    /// Returns the observations of each policy for the slots waiting for actions.
    fn ready_obs(&mut self) -> Result<SlotMap<[Self::Obs; N]>>;

    /// Applies the actions of all policies and returns a joint timestep per slot.
    fn step(
        &mut self,
        actions: &SlotMap<[Self::Act; N]>,
    ) -> Result<SlotMap<JointTimestep<Self::Obs, Self::Info, N>>>;
}
