//! Policy.
use super::{Info, Obs, SlotMap, Timestep, Transition};
use crate::{buffer::DeepClone, record::Record};
use anyhow::Result;
use std::fmt::Debug;

/// Output of [`Forward::forward`] for a single slot.
pub trait PolicyOutput: DeepClone + Debug {
    /// Action type.
    type Act: Clone + Debug;

    /// Returns the action chosen by the policy.
    fn action(&self) -> &Self::Act;
}

/// A [`PolicyOutput`] that can be built from an action alone.
///
/// Required by policies that do not compute any auxiliary output, like
/// [`DiscreteRandomPolicy`](crate::collector::DiscreteRandomPolicy).
pub trait FromAction: PolicyOutput {
    /// Builds an output holding `act`.
    fn from_action(act: Self::Act) -> Self;
}

/// Mapping from observations to actions.
///
/// This is the only capability required during warm-up collection, where a
/// randomized policy stands in for the trained one.
pub trait Forward {
    /// Observation.
    type Obs: Obs;

    /// Output for a single slot.
    type Output: PolicyOutput;

    /// Computes outputs for the given slots.
    ///
    /// The returned map must have an entry for every slot in `obs`.
    fn forward(&mut self, obs: &SlotMap<Self::Obs>, kwargs: &Record)
        -> Result<SlotMap<Self::Output>>;
}

/// Transition type produced by a policy.
pub type PolicyTransition<P> =
    Transition<<P as Forward>::Obs, <P as Forward>::Output, <P as Policy>::Info>;

/// A policy in collect mode.
pub trait Policy: Forward {
    /// Information attached to timesteps.
    type Info: Info;

    /// Training sample built from transitions.
    type TrainSample;

    /// Builds a transition from the observation the policy acted on, its output and the
    /// resulting timestep.
    fn process_transition(
        &self,
        obs: &Self::Obs,
        output: &Self::Output,
        timestep: &Timestep<Self::Obs, Self::Info>,
    ) -> PolicyTransition<Self>;

    /// Converts the transitions of an episode into training samples.
    fn get_train_sample(&self, transitions: Vec<PolicyTransition<Self>>)
        -> Vec<Self::TrainSample>;

    /// Resets the internal state of the policy for the given slots, or for all slots
    /// if `env_ids` is `None`.
    fn reset(&mut self, env_ids: Option<&[usize]>);

    /// The default number of episodes to collect, if the policy has one.
    fn default_n_episode(&self) -> Option<usize> {
        None
    }
}

impl<F: Forward + ?Sized> Forward for Box<F> {
    type Obs = F::Obs;
    type Output = F::Output;

    fn forward(
        &mut self,
        obs: &SlotMap<Self::Obs>,
        kwargs: &Record,
    ) -> Result<SlotMap<Self::Output>> {
        (**self).forward(obs, kwargs)
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    type Info = P::Info;
    type TrainSample = P::TrainSample;

    fn process_transition(
        &self,
        obs: &Self::Obs,
        output: &Self::Output,
        timestep: &Timestep<Self::Obs, Self::Info>,
    ) -> PolicyTransition<Self> {
        (**self).process_transition(obs, output, timestep)
    }

    fn get_train_sample(
        &self,
        transitions: Vec<PolicyTransition<Self>>,
    ) -> Vec<Self::TrainSample> {
        (**self).get_train_sample(transitions)
    }

    fn reset(&mut self, env_ids: Option<&[usize]>) {
        (**self).reset(env_ids)
    }

    fn default_n_episode(&self) -> Option<usize> {
        (**self).default_n_episode()
    }
}
