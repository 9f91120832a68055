//! Request/response objects shared between the training loop and the collectors.
use crate::record::Record;

/// Context of [`StepCollector`](super::StepCollector) and
/// [`EpisodeCollector`](super::EpisodeCollector).
///
/// Owned by the training loop and passed to every call of a collector.
///
/// Read by the collectors:
/// * `train_iter`, stamped on each transition as `collect_iter`.
/// * `forward_kwargs`, passed to [`Forward::forward`](crate::Forward::forward).
///
/// Read and advanced by the collectors:
/// * `env_step`, the number of environment steps taken so far.
/// * `env_episode`, the number of episodes finished so far.
///
/// Written by the collectors:
/// * `trajectories` and `trajectory_end_idx` by [`StepCollector`](super::StepCollector),
///   see [`Trajectories`](crate::buffer::Trajectories).
/// * `episodes` by [`EpisodeCollector`](super::EpisodeCollector).
#[derive(Debug, Clone)]
pub struct OnlineContext<T> {
    /// The current training iteration.
    pub train_iter: usize,

    /// Environment steps taken so far.
    pub env_step: usize,

    /// Episodes finished so far.
    pub env_episode: usize,

    /// Keyword options of policy forward.
    pub forward_kwargs: Record,

    /// Trajectory windows of the last call of a step collector.
    pub trajectories: Vec<Vec<T>>,

    /// Exclusive end of the windows of each slot in `trajectories`, one past its last
    /// window.
    pub trajectory_end_idx: Vec<usize>,

    /// Episodes of the last call of an episode collector.
    pub episodes: Vec<Vec<T>>,
}

impl<T> Default for OnlineContext<T> {
    fn default() -> Self {
        Self {
            train_iter: 0,
            env_step: 0,
            env_episode: 0,
            forward_kwargs: Record::empty(),
            trajectories: Vec::new(),
            trajectory_end_idx: Vec::new(),
            episodes: Vec::new(),
        }
    }
}

/// Data collected for one policy by [`BattleCollector`](super::BattleCollector).
#[derive(Debug, Clone, PartialEq)]
pub enum BattleData<T, S> {
    /// Whole episodes, when `get_train_sample` is disabled.
    Episodes(Vec<Vec<T>>),

    /// Training samples built by [`Policy::get_train_sample`](crate::Policy::get_train_sample).
    Samples(Vec<S>),
}

impl<T, S> BattleData<T, S> {
    /// The number of entries, episodes or samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Episodes(v) => v.len(),
            Self::Samples(v) => v.len(),
        }
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the episodes, if the data holds episodes.
    pub fn episodes(&self) -> Option<&Vec<Vec<T>>> {
        match self {
            Self::Episodes(v) => Some(v),
            Self::Samples(_) => None,
        }
    }

    /// Returns the training samples, if the data holds samples.
    pub fn samples(&self) -> Option<&Vec<S>> {
        match self {
            Self::Episodes(_) => None,
            Self::Samples(v) => Some(v),
        }
    }
}

/// Context of [`BattleCollector`](super::BattleCollector).
///
/// Read by the collector:
/// * `n_episode`, the number of episodes to collect. If `None`, the value in
///   [`CollectorConfig`](super::CollectorConfig) or the default of the first policy is
///   used and written back.
/// * `train_iter`, stamped on each transition as `collect_iter`.
/// * `forward_kwargs`, passed to each policy's forward.
///
/// Written by the collector:
/// * `return_data`, one entry per policy.
/// * `return_info`, per policy, the info of the last timestep of each episode.
/// * `total_envstep_count` and `total_episode_count`, counted since the last reset of
///   the collector.
#[derive(Debug, Clone)]
pub struct BattleContext<T, S, I> {
    /// The number of episodes to collect in a call.
    pub n_episode: Option<usize>,

    /// The current training iteration.
    pub train_iter: usize,

    /// Keyword options of policy forward.
    pub forward_kwargs: Record,

    /// Collected data of each policy.
    pub return_data: Vec<BattleData<T, S>>,

    /// Info at the end of each episode, for each policy.
    pub return_info: Vec<Vec<I>>,

    /// Environment steps since the last reset of the collector.
    pub total_envstep_count: usize,

    /// Episodes since the last reset of the collector.
    pub total_episode_count: usize,
}

impl<T, S, I> Default for BattleContext<T, S, I> {
    fn default() -> Self {
        Self {
            n_episode: None,
            train_iter: 0,
            forward_kwargs: Record::empty(),
            return_data: Vec::new(),
            return_info: Vec::new(),
            total_envstep_count: 0,
            total_episode_count: 0,
        }
    }
}
