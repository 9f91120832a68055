#![warn(missing_docs)]
//! Data collection core for reinforcement learning.
//!
//! The crate sits between environment managers, which run a set of environment slots,
//! and policies, which map observations to actions. Its collectors alternate policy
//! forward and environment steps, turn the results into transitions and hand them to
//! the training loop:
//!
//! * [`StepCollector`](collector::StepCollector) collects trajectory windows of a fixed
//!   number of environment steps.
//! * [`EpisodeCollector`](collector::EpisodeCollector) collects whole episodes.
//! * [`BattleCollector`](collector::BattleCollector) collects episodes of policies acting
//!   in the same environments, as in self-play.
//!
//! Environment managers implement [`EnvManager`] or [`BattleEnvManager`], policies
//! implement [`Policy`]. The buffers used by the collectors are in [`buffer`].
pub mod buffer;
pub mod collector;
pub mod dummy;
pub mod error;
pub mod record;

mod base;
pub use base::{
    BattleEnvManager, EnvManager, Forward, FromAction, Info, JointTimestep, Obs, Policy,
    PolicyOutput, PolicyTransition, SlotMap, Timestep, Transition,
};
