//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum CollectError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The requested number of episodes is smaller than the number of environment slots.
    #[error("n_episode ({n_episode}) must be greater than or equal to env_num ({env_num})")]
    InvalidEpisodeCount {
        /// Requested number of episodes.
        n_episode: usize,
        /// Number of environment slots.
        env_num: usize,
    },

    /// The number of episodes to collect is given neither in the context, the configuration
    /// nor the policy.
    #[error("Please specify collect n_episode")]
    MissingNEpisode,

    /// The number of samples to collect is not given in the configuration.
    #[error("Please specify collect n_sample")]
    MissingNSample,

    /// Trajectory windows must hold at least one transition.
    #[error("unroll_len must be positive")]
    InvalidUnrollLen,

    /// Trajectory buffers must hold at least one transition.
    #[error("traj_len must be positive or unbounded")]
    InvalidTrajLen,

    /// Battle mode needs more than one policy.
    #[error("Battle collector needs more than 1 policies, got {0}")]
    NotEnoughPolicies(usize),

    /// A cache was read for a slot that has no entry.
    #[error("No entry in cache pool '{pool}' for env {env_id}")]
    MissingCacheEntry {
        /// Name of the cache pool.
        pool: String,
        /// Slot id.
        env_id: usize,
    },

    /// A policy did not return an output for a ready slot.
    #[error("Policy {policy_id} returned no output for env {env_id}")]
    MissingPolicyOutput {
        /// Index of the policy.
        policy_id: usize,
        /// Slot id.
        env_id: usize,
    },
}
