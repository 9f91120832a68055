//! State of environment slots owned by a collector.
use super::stat::{EpisodeStat, SlotStat};
use crate::{
    buffer::{CachePool, CloneStrategy, DeepClone},
    error::CollectError,
};
use log::debug;
use std::time::Duration;

/// Caches and statistics of the environment slots of a collector.
///
/// Holds one observation pool and one output pool per policy, the running statistics
/// of each slot and the statistics of finished episodes.
pub struct SlotState<O, Out> {
    obs_pools: Vec<CachePool<O>>,
    output_pools: Vec<CachePool<Out>>,
    stats: Vec<SlotStat>,
    episode_info: Vec<EpisodeStat>,
    env_data_id: Vec<usize>,
    next_data_id: usize,
    pending: Duration,
}

impl<O: DeepClone, Out: DeepClone> SlotState<O, Out> {
    /// Creates the state of `env_num` slots shared by `n_policies` policies.
    pub fn new(env_num: usize, n_policies: usize, obs_strategy: CloneStrategy) -> Self {
        Self {
            obs_pools: (0..n_policies)
                .map(|i| CachePool::new(format!("obs_{}", i), env_num, obs_strategy))
                .collect(),
            output_pools: (0..n_policies)
                .map(|i| CachePool::new(format!("policy_output_{}", i), env_num, CloneStrategy::Shallow))
                .collect(),
            stats: (0..env_num).map(|_| SlotStat::new(n_policies)).collect(),
            episode_info: Vec::new(),
            env_data_id: (0..env_num).collect(),
            next_data_id: env_num,
            pending: Duration::ZERO,
        }
    }

    /// Observation cache of a policy.
    pub fn obs_pool_mut(&mut self, policy_id: usize) -> &mut CachePool<O> {
        &mut self.obs_pools[policy_id]
    }

    /// Output cache of a policy.
    pub fn output_pool_mut(&mut self, policy_id: usize) -> &mut CachePool<Out> {
        &mut self.output_pools[policy_id]
    }

    /// Cached observation of a slot for a policy.
    pub fn obs(&self, policy_id: usize, env_id: usize) -> Result<&O, CollectError> {
        let pool = &self.obs_pools[policy_id];
        pool.get(env_id).ok_or_else(|| CollectError::MissingCacheEntry {
            pool: pool.name().to_string(),
            env_id,
        })
    }

    /// Cached policy output of a slot for a policy.
    pub fn output(&self, policy_id: usize, env_id: usize) -> Result<&Out, CollectError> {
        let pool = &self.output_pools[policy_id];
        pool.get(env_id).ok_or_else(|| CollectError::MissingCacheEntry {
            pool: pool.name().to_string(),
            env_id,
        })
    }

    /// Running statistics of a slot.
    pub fn stat(&self, env_id: usize) -> &SlotStat {
        &self.stats[env_id]
    }

    pub(crate) fn stat_mut(&mut self, env_id: usize) -> &mut SlotStat {
        &mut self.stats[env_id]
    }

    /// Id of the episode currently running in a slot.
    pub fn env_data_id(&self, env_id: usize) -> usize {
        self.env_data_id[env_id]
    }

    /// Statistics of the episodes finished so far.
    pub fn episode_info(&self) -> &[EpisodeStat] {
        &self.episode_info
    }

    /// Adds time spent on the slots that are stepped next, e.g. in policy forward.
    pub(crate) fn add_pending_time(&mut self, d: Duration) {
        self.pending += d;
    }

    /// Takes the time accumulated with [`SlotState::add_pending_time`].
    pub(crate) fn take_pending_time(&mut self) -> Duration {
        std::mem::replace(&mut self.pending, Duration::ZERO)
    }

    /// Records the episode of a slot as finished and prepares the slot for the next one.
    pub(crate) fn finish_episode(&mut self, env_id: usize) -> &EpisodeStat {
        let episode = self.stats[env_id].to_episode_stat();
        debug!(
            "Episode {} finished in env {}: {} steps, reward {:?}",
            self.env_data_id[env_id], env_id, episode.step, episode.reward
        );
        self.episode_info.push(episode);
        self.reset_slot(env_id);
        self.env_data_id[env_id] = self.next_data_id;
        self.next_data_id += 1;
        &self.episode_info[self.episode_info.len() - 1]
    }

    /// Clears the caches and statistics of a slot.
    pub fn reset_slot(&mut self, env_id: usize) {
        self.obs_pools.iter_mut().for_each(|p| p.reset(env_id));
        self.output_pools.iter_mut().for_each(|p| p.reset(env_id));
        self.stats[env_id].reset();
    }
}
