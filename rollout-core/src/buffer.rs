//! Buffers holding data of environment slots during collection.
//!
//! * [`CachePool`] keeps the latest observation or policy output of each slot.
//! * [`TrajBuffer`] accumulates the transitions of a slot, optionally as a sliding window.
//! * [`TransitionList`] logs the transitions of all slots with episode boundaries and
//!   converts them into trajectory windows or episodes.
mod cache_pool;
mod traj_buffer;
mod transition_list;
pub use cache_pool::{CachePool, CloneStrategy, DeepClone};
pub use traj_buffer::TrajBuffer;
pub use transition_list::{TrajectoryTail, Trajectories, TransitionList};
