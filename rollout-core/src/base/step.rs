//! Environment steps and transitions.
use std::fmt::Debug;

/// Additional information attached to a [`Timestep`].
pub trait Info: Clone + Debug {}

impl Info for () {}

/// Result of an environment step on a single slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Timestep<O, I> {
    /// Observation after the step. If `done`, the environment manager may already
    /// hold the initial observation of the next episode in its ready observations.
    pub obs: O,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode ended with this step.
    pub done: bool,

    /// Information defined by the environment.
    pub info: I,
}

impl<O, I> Timestep<O, I> {
    /// Constructs a [`Timestep`].
    pub fn new(obs: O, reward: f32, done: bool, info: I) -> Self {
        Self {
            obs,
            reward,
            done,
            info,
        }
    }
}

/// Result of an environment step on a slot shared by `N` policies.
///
/// Every field but `done` holds one entry per policy. The view of a single policy is
/// obtained with [`JointTimestep::policy_view`].
#[derive(Clone, Debug, PartialEq)]
pub struct JointTimestep<O, I, const N: usize> {
    /// Observations, one per policy.
    pub obs: [O; N],

    /// Rewards, one per policy.
    pub reward: [f32; N],

    /// Flag denoting if the episode ended, shared by all policies.
    pub done: bool,

    /// Information, one per policy.
    pub info: [I; N],
}

impl<O: Clone, I: Clone, const N: usize> JointTimestep<O, I, N> {
    /// Constructs a [`JointTimestep`].
    pub fn new(obs: [O; N], reward: [f32; N], done: bool, info: [I; N]) -> Self {
        Self {
            obs,
            reward,
            done,
            info,
        }
    }

    /// Returns the timestep as seen by the policy with index `policy_id`.
    ///
    /// Panics if `policy_id >= N`.
    pub fn policy_view(&self, policy_id: usize) -> Timestep<O, I> {
        Timestep {
            obs: self.obs[policy_id].clone(),
            reward: self.reward[policy_id],
            done: self.done,
            info: self.info[policy_id].clone(),
        }
    }
}

/// A transition `(o_t, out_t, o_t+1, r_t, done_t)` with bookkeeping fields.
///
/// Transitions are created by [`Policy::process_transition`](crate::Policy::process_transition).
/// `collect_iter` and `env_data_id` are overwritten by the collectors.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<O, Out, I> {
    /// Observation the policy acted on.
    pub obs: O,

    /// Observation after the step.
    pub next_obs: O,

    /// Output of the policy, including the action.
    pub output: Out,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode ended with this transition.
    pub done: bool,

    /// Information defined by the environment.
    pub info: I,

    /// Training iteration at which the transition was collected.
    pub collect_iter: usize,

    /// Id of the episode the transition belongs to, unique within a collector.
    pub env_data_id: usize,

    /// `true` for transitions padding a trajectory window.
    pub is_null: bool,
}

impl<O: Clone, Out: Clone, I: Clone> Transition<O, Out, I> {
    /// Builds a transition from the observation, the policy output and the timestep
    /// without further processing.
    pub fn new(obs: &O, output: &Out, timestep: &Timestep<O, I>) -> Self {
        Self {
            obs: obs.clone(),
            next_obs: timestep.obs.clone(),
            output: output.clone(),
            reward: timestep.reward,
            done: timestep.done,
            info: timestep.info.clone(),
            collect_iter: 0,
            env_data_id: 0,
            is_null: false,
        }
    }

    /// Returns a null copy of this transition, used for padding.
    pub fn null_padding(&self) -> Self {
        Self {
            reward: 0.,
            done: true,
            is_null: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_view() {
        let ts = JointTimestep::new([1, 2], [0.5, -0.5], false, ["a", "b"]);
        let v0 = ts.policy_view(0);
        let v1 = ts.policy_view(1);
        assert_eq!(v0, Timestep::new(1, 0.5, false, "a"));
        assert_eq!(v1, Timestep::new(2, -0.5, false, "b"));
    }

    #[test]
    fn test_null_padding() {
        let ts = Timestep::new(3usize, 1.0, false, ());
        let mut tr = Transition::new(&2usize, &7usize, &ts);
        tr.env_data_id = 4;
        let null = tr.null_padding();
        assert!(null.is_null && null.done);
        assert_eq!(null.reward, 0.);
        assert_eq!((null.obs, null.next_obs, null.env_data_id), (2, 3, 4));
    }
}
