//! Configuration of collectors.
use crate::buffer::{CloneStrategy, TrajectoryTail};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`StepCollector`](super::StepCollector),
/// [`EpisodeCollector`](super::EpisodeCollector) and
/// [`BattleCollector`](super::BattleCollector).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CollectorConfig {
    /// Cache deep copies of observations, see [`CloneStrategy`].
    pub deepcopy_obs: bool,

    /// Apply [`Obs::transform`](crate::Obs::transform) before policy forward.
    pub transform_obs: bool,

    /// The number of training samples collected per call of a step collector.
    pub n_sample: Option<usize>,

    /// The number of episodes collected per call of an episode or battle collector.
    pub n_episode: Option<usize>,

    /// Length of trajectory windows. A training sample consists of `unroll_len` steps.
    pub unroll_len: usize,

    /// Maximum length of the per-slot trajectory buffers of the battle collector.
    /// `None` keeps whole episodes.
    pub traj_len: Option<usize>,

    /// Convert episodes into training samples with
    /// [`Policy::get_train_sample`](crate::Policy::get_train_sample) in battle mode.
    pub get_train_sample: bool,

    /// Handling of the final short trajectory window.
    pub trajectory_tail: TrajectoryTail,

    /// Prevent trajectory windows from spanning two episodes.
    pub split_at_done: bool,

    /// Keep the transitions of unfinished episodes across calls of an episode
    /// collector, so that an episode spanning two calls is returned whole. If `false`,
    /// all logged transitions are cleared after each call.
    pub keep_unfinished: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            deepcopy_obs: false,
            transform_obs: false,
            n_sample: None,
            n_episode: None,
            unroll_len: 1,
            traj_len: None,
            get_train_sample: false,
            trajectory_tail: TrajectoryTail::Drop,
            split_at_done: false,
            keep_unfinished: false,
        }
    }
}

impl CollectorConfig {
    /// Sets if observations are deep-copied when cached.
    pub fn deepcopy_obs(mut self, v: bool) -> Self {
        self.deepcopy_obs = v;
        self
    }

    /// Sets if observations are transformed before policy forward.
    pub fn transform_obs(mut self, v: bool) -> Self {
        self.transform_obs = v;
        self
    }

    /// Sets the number of training samples per call.
    pub fn n_sample(mut self, v: usize) -> Self {
        self.n_sample = Some(v);
        self
    }

    /// Sets the number of episodes per call.
    pub fn n_episode(mut self, v: usize) -> Self {
        self.n_episode = Some(v);
        self
    }

    /// Sets the length of trajectory windows.
    pub fn unroll_len(mut self, v: usize) -> Self {
        self.unroll_len = v;
        self
    }

    /// Sets the maximum length of trajectory buffers.
    pub fn traj_len(mut self, v: Option<usize>) -> Self {
        self.traj_len = v;
        self
    }

    /// Sets if episodes are converted into training samples in battle mode.
    pub fn get_train_sample(mut self, v: bool) -> Self {
        self.get_train_sample = v;
        self
    }

    /// Sets the handling of the final short trajectory window.
    pub fn trajectory_tail(mut self, v: TrajectoryTail) -> Self {
        self.trajectory_tail = v;
        self
    }

    /// Sets if trajectory windows are split at episode boundaries.
    pub fn split_at_done(mut self, v: bool) -> Self {
        self.split_at_done = v;
        self
    }

    /// Sets if unfinished episodes are kept across calls of an episode collector.
    pub fn keep_unfinished(mut self, v: bool) -> Self {
        self.keep_unfinished = v;
        self
    }

    /// Clone strategy of observation caches.
    pub fn obs_clone_strategy(&self) -> CloneStrategy {
        match self.deepcopy_obs {
            true => CloneStrategy::Deep,
            false => CloneStrategy::Shallow,
        }
    }

    /// Constructs [`CollectorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CollectorConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_collector_config() -> Result<()> {
        let config = CollectorConfig::default()
            .n_sample(64)
            .unroll_len(8)
            .deepcopy_obs(true)
            .trajectory_tail(TrajectoryTail::Pad)
            .traj_len(Some(128))
            .keep_unfinished(true);

        let dir = TempDir::new("collector_config")?;
        let path = dir.path().join("collector_config.yaml");

        config.save(&path)?;
        let config_ = CollectorConfig::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.obs_clone_strategy(), CloneStrategy::Deep);
        Ok(())
    }
}
