//! Statistics of slots and collected episodes.
use crate::record::{Record, RecordValue};
use std::time::Duration;

/// Running statistics of the current episode of a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStat {
    /// Time spent on the episode so far.
    pub time: Duration,

    /// Environment steps in the episode so far.
    pub step: usize,

    /// Cumulative reward of each policy.
    pub reward: Vec<f32>,
}

impl SlotStat {
    /// Creates zeroed statistics for `n_policies` policies.
    pub fn new(n_policies: usize) -> Self {
        Self {
            time: Duration::ZERO,
            step: 0,
            reward: vec![0.; n_policies],
        }
    }

    /// Resets the statistics to zero.
    pub fn reset(&mut self) {
        self.time = Duration::ZERO;
        self.step = 0;
        self.reward.iter_mut().for_each(|r| *r = 0.);
    }

    /// Turns the statistics into the record of a finished episode.
    pub fn to_episode_stat(&self) -> EpisodeStat {
        EpisodeStat {
            reward: self.reward.clone(),
            time: self.time.as_secs_f32(),
            step: self.step,
        }
    }
}

/// Statistics of a completed episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStat {
    /// Episode return of each policy.
    pub reward: Vec<f32>,

    /// Time spent on the episode in seconds.
    pub time: f32,

    /// The number of environment steps.
    pub step: usize,
}

/// Aggregates episode statistics into a [`Record`].
///
/// Keys: `episode_count`, `envstep_count`, `avg_envstep_per_episode`,
/// `avg_time_per_episode`, `total_time`, and `reward_mean_{i}`, `reward_max_{i}`,
/// `reward_min_{i}` for each policy `i`. An empty slice gives an empty record.
pub fn summarize_episodes(episodes: &[EpisodeStat]) -> Record {
    let mut record = Record::empty();
    if episodes.is_empty() {
        return record;
    }

    let n = episodes.len() as f32;
    let envstep_count: usize = episodes.iter().map(|e| e.step).sum();
    let total_time: f32 = episodes.iter().map(|e| e.time).sum();
    record.insert("episode_count", RecordValue::Scalar(n));
    record.insert("envstep_count", RecordValue::Scalar(envstep_count as f32));
    record.insert("avg_envstep_per_episode", RecordValue::Scalar(envstep_count as f32 / n));
    record.insert("avg_time_per_episode", RecordValue::Scalar(total_time / n));
    record.insert("total_time", RecordValue::Scalar(total_time));

    let n_policies = episodes[0].reward.len();
    for i in 0..n_policies {
        let rewards = episodes.iter().map(|e| e.reward[i]);
        let mean = rewards.clone().sum::<f32>() / n;
        let max = rewards.clone().fold(f32::MIN, f32::max);
        let min = rewards.fold(f32::MAX, f32::min);
        record.insert(format!("reward_mean_{}", i), RecordValue::Scalar(mean));
        record.insert(format!("reward_max_{}", i), RecordValue::Scalar(max));
        record.insert(format!("reward_min_{}", i), RecordValue::Scalar(min));
    }

    record
}
