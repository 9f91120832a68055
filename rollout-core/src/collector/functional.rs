//! Inference and rollout steps, the building blocks of the serial collectors.
//!
//! A collection loop alternates the two functions:
//!
//! 1. [`inference`] reads the ready observations, caches them, runs policy forward and
//!    returns the actions.
//! 2. [`rollout`] applies the actions, turns timesteps into transitions and handles the
//!    end of episodes.
use super::{OnlineContext, SlotState};
use crate::{
    buffer::TransitionList, error::CollectError, record::Record, EnvManager, Forward, Obs,
    Policy, PolicyOutput, PolicyTransition, SlotMap,
};
use anyhow::Result;
use log::trace;
use std::time::Instant;

/// Runs policy forward on the ready observations of `env` and returns the actions.
///
/// The raw observations and the outputs are cached in `slots` for [`rollout`]. If
/// `transform_obs` is set, [`Obs::transform`] is applied to the observations given to
/// the policy. The environment is not stepped.
pub fn inference<E, F>(
    transform_obs: bool,
    policy: &mut F,
    env: &mut E,
    slots: &mut SlotState<E::Obs, F::Output>,
    kwargs: &Record,
) -> Result<SlotMap<E::Act>>
where
    E: EnvManager,
    F: Forward<Obs = E::Obs> + ?Sized,
    F::Output: PolicyOutput<Act = E::Act>,
{
    let timer = Instant::now();
    let obs = env.ready_obs()?;
    slots.obs_pool_mut(0).update(&obs);

    let obs = match transform_obs {
        true => obs.into_iter().map(|(k, o)| (k, o.transform())).collect(),
        false => obs,
    };
    let outputs = policy.forward(&obs, kwargs)?;

    let actions = obs
        .keys()
        .map(|&env_id| match outputs.get(&env_id) {
            Some(output) => Ok((env_id, output.action().clone())),
            None => Err(CollectError::MissingPolicyOutput {
                policy_id: 0,
                env_id,
            }),
        })
        .collect::<Result<SlotMap<_>, _>>()?;
    slots.output_pool_mut(0).update(&outputs);
    slots.add_pending_time(timer.elapsed());
    trace!("Inference on envs {:?}", actions.keys().collect::<Vec<_>>());

    Ok(actions)
}

/// Applies `actions` to `env` and logs the resulting transitions.
///
/// For each timestep, a transition is built with [`Policy::process_transition`] from the
/// observation and output cached by [`inference`], stamped with `ctx.train_iter` and
/// the episode id of the slot, and appended to `transitions`. `ctx.env_step` is
/// advanced by the number of timesteps. At the end of an episode the policy and the
/// slot are reset and `ctx.env_episode` is advanced.
///
/// Errors of the environment manager are returned as they are.
pub fn rollout<E, P>(
    policy: &mut P,
    env: &mut E,
    slots: &mut SlotState<E::Obs, P::Output>,
    transitions: &mut TransitionList<E::Obs, P::Output, E::Info>,
    actions: &SlotMap<E::Act>,
    ctx: &mut OnlineContext<PolicyTransition<P>>,
) -> Result<()>
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    let timer = Instant::now();
    let timesteps = env.step(actions)?;
    if timesteps.is_empty() {
        return Ok(());
    }
    let interaction = (slots.take_pending_time() + timer.elapsed()) / timesteps.len() as u32;

    for (env_id, timestep) in timesteps.into_iter() {
        let timer = Instant::now();
        let mut transition =
            policy.process_transition(slots.obs(0, env_id)?, slots.output(0, env_id)?, &timestep);
        transition.collect_iter = ctx.train_iter;
        transition.env_data_id = slots.env_data_id(env_id);
        transitions.append(env_id, transition);
        ctx.env_step += 1;

        let stat = slots.stat_mut(env_id);
        stat.step += 1;
        stat.reward[0] += timestep.reward;
        stat.time += timer.elapsed() + interaction;

        if timestep.done {
            policy.reset(Some(&[env_id]));
            slots.finish_episode(env_id);
            ctx.env_episode += 1;
        }
    }

    Ok(())
}
