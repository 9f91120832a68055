//! Collectors of transitions.
//!
//! A collector drives an environment manager with one or more policies and hands the
//! resulting transitions to the training loop through a context object:
//!
//! * [`StepCollector`] collects a fixed number of environment steps into trajectory
//!   windows of [`OnlineContext`].
//! * [`EpisodeCollector`] collects a fixed number of episodes into [`OnlineContext`].
//! * [`BattleCollector`] collects episodes of policies acting in the same environments
//!   into [`BattleContext`].
//!
//! The serial collectors are compositions of [`inference`] and [`rollout`], which can
//! also be used directly to build custom collection loops.
mod battle;
mod config;
mod context;
mod functional;
mod random;
mod serial;
mod slot;
mod stat;
pub use battle::{BattleCollector, BattleCollectorContext};
pub use config::CollectorConfig;
pub use context::{BattleContext, BattleData, OnlineContext};
pub use functional::{inference, rollout};
pub use random::{discrete_random_policy_factory, DiscreteRandomPolicy, RandomPolicyFactory};
pub use serial::{EpisodeCollector, StepCollector};
pub use slot::SlotState;
pub use stat::{summarize_episodes, EpisodeStat, SlotStat};
