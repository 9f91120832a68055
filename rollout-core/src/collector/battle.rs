//! Collector for policies acting in the same environments.
use super::{summarize_episodes, BattleContext, BattleData, CollectorConfig, EpisodeStat, SlotState};
use crate::{
    buffer::TrajBuffer, error::CollectError, record::Record, BattleEnvManager, Forward, Obs,
    Policy, PolicyOutput, PolicyTransition, SlotMap,
};
use anyhow::Result;
use log::{debug, info, trace, warn};
use std::{collections::BTreeSet, time::Instant};

/// Context type of [`BattleCollector`].
pub type BattleCollectorContext<E, P, const N: usize> = BattleContext<
    PolicyTransition<P>,
    <P as Policy>::TrainSample,
    <E as BattleEnvManager<N>>::Info,
>;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Collects episodes of `N` policies acting simultaneously in the same environments.
///
/// Each slot holds a [`TrajBuffer`] per policy. When the episode of a slot ends, the
/// buffer of each policy is flushed into that policy's dataset, as a whole episode or
/// as training samples built by [`Policy::get_train_sample`] if
/// [`CollectorConfig::get_train_sample`] is set.
///
/// A call of [`BattleCollector::collect`] admits slots in ascending slot id as their
/// observations become ready, never admitting more slots than the number of episodes
/// still to be started, and returns when `n_episode` episodes have finished.
///
/// ```mermaid
/// graph TD
///     A[ready_obs] -->|admit up to remaining quota| B[ready slots]
///     B -->|obs of policy i| C[forward of policy i]
///     C -->|joint actions| D[step]
///     D -->|policy_view i| E[TrajBuffer of slot and policy i]
///     E -->|done| F[return_data of policy i]
/// ```
pub struct BattleCollector<E, P, const N: usize>
where
    E: BattleEnvManager<N>,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    config: CollectorConfig,
    env: E,
    policies: [P; N],
    traj_buffers: Vec<Vec<TrajBuffer<PolicyTransition<P>>>>,
    slots: SlotState<E::Obs, P::Output>,
    total_envstep_count: usize,
    total_episode_count: usize,
    end_flag: bool,
}

impl<E, P, const N: usize> BattleCollector<E, P, N>
where
    E: BattleEnvManager<N>,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    /// Builds the collector and launches `env`.
    ///
    /// Fails with [`CollectError::NotEnoughPolicies`] if `N < 2` and with
    /// [`CollectError::InvalidTrajLen`] if `config.traj_len == Some(0)`, in both cases
    /// before launching `env`.
    pub fn build(config: CollectorConfig, mut env: E, mut policies: [P; N]) -> Result<Self> {
        if N < 2 {
            return Err(CollectError::NotEnoughPolicies(N).into());
        }
        if config.traj_len == Some(0) {
            return Err(CollectError::InvalidTrajLen.into());
        }
        env.launch()?;
        policies.iter_mut().for_each(|p| p.reset(None));
        let env_num = env.env_num();

        Ok(Self {
            traj_buffers: Self::new_traj_buffers(env_num, config.traj_len),
            slots: SlotState::new(env_num, N, config.obs_clone_strategy()),
            config,
            env,
            policies,
            total_envstep_count: 0,
            total_episode_count: 0,
            end_flag: false,
        })
    }

    fn new_traj_buffers(
        env_num: usize,
        traj_len: Option<usize>,
    ) -> Vec<Vec<TrajBuffer<PolicyTransition<P>>>> {
        (0..env_num)
            .map(|_| (0..N).map(|_| TrajBuffer::new(traj_len)).collect())
            .collect()
    }

    /// Collects `n_episode` episodes.
    ///
    /// `n_episode` is taken from `ctx`, the configuration or the default of the first
    /// policy, in this order, and written back to `ctx`. It fails with
    /// [`CollectError::MissingNEpisode`] if none of them has one and with
    /// [`CollectError::InvalidEpisodeCount`] if it is smaller than the number of slots,
    /// in both cases before stepping the environments.
    ///
    /// `ctx.return_data` and `ctx.return_info` are overwritten with the data of this
    /// call; the total counts are those since the last reset of the collector.
    pub fn collect(&mut self, ctx: &mut BattleCollectorContext<E, P, N>) -> Result<()> {
        let env_num = self.env.env_num();
        let n_episode = ctx
            .n_episode
            .or(self.config.n_episode)
            .or_else(|| self.policies[0].default_n_episode())
            .ok_or(CollectError::MissingNEpisode)?;
        if n_episode < env_num {
            return Err(CollectError::InvalidEpisodeCount { n_episode, env_num }.into());
        }
        ctx.n_episode = Some(n_episode);

        let n_finished_before = self.slots.episode_info().len();
        let mut episodes: Vec<Vec<Vec<PolicyTransition<P>>>> = (0..N).map(|_| vec![]).collect();
        let mut samples: Vec<Vec<P::TrainSample>> = (0..N).map(|_| vec![]).collect();
        let mut return_info: Vec<Vec<E::Info>> = (0..N).map(|_| vec![]).collect();
        let mut ready = BTreeSet::<usize>::new();
        let mut remain_episode = n_episode;
        let mut collected_episode = 0;

        while collected_episode < n_episode {
            let timer = Instant::now();
            let obs = self.env.ready_obs()?;
            let new_ids = obs
                .keys()
                .filter(|env_id| !ready.contains(*env_id))
                .take(remain_episode)
                .copied()
                .collect::<Vec<_>>();
            remain_episode -= new_ids.len();
            ready.extend(new_ids);

            let obs = obs
                .into_iter()
                .filter(|(env_id, _)| ready.contains(env_id))
                .collect::<SlotMap<_>>();
            if obs.is_empty() {
                continue;
            }

            let actions = self.inference(obs, &ctx.forward_kwargs)?;
            self.slots.add_pending_time(timer.elapsed());

            let timer = Instant::now();
            let timesteps = self.env.step(&actions)?;
            if timesteps.is_empty() {
                continue;
            }
            let interaction =
                (self.slots.take_pending_time() + timer.elapsed()) / timesteps.len() as u32;

            for (env_id, timestep) in timesteps.into_iter() {
                let timer = Instant::now();
                for i in 0..N {
                    let view = timestep.policy_view(i);
                    let mut transition = self.policies[i].process_transition(
                        self.slots.obs(i, env_id)?,
                        self.slots.output(i, env_id)?,
                        &view,
                    );
                    transition.collect_iter = ctx.train_iter;
                    transition.env_data_id = self.slots.env_data_id(env_id);
                    self.traj_buffers[env_id][i].append(transition);
                    self.slots.stat_mut(env_id).reward[i] += view.reward;
                }
                self.total_envstep_count += 1;
                let stat = self.slots.stat_mut(env_id);
                stat.step += 1;
                stat.time += timer.elapsed() + interaction;

                if timestep.done {
                    for (i, info) in timestep.info.into_iter().enumerate() {
                        let buffer = &mut self.traj_buffers[env_id][i];
                        let transitions = buffer.to_vec();
                        buffer.clear();
                        if self.config.get_train_sample {
                            samples[i].extend(self.policies[i].get_train_sample(transitions));
                        } else {
                            episodes[i].push(transitions);
                        }
                        return_info[i].push(info);
                    }
                    self.policies
                        .iter_mut()
                        .for_each(|p| p.reset(Some(&[env_id])));
                    self.slots.finish_episode(env_id);
                    ready.remove(&env_id);
                    collected_episode += 1;
                    self.total_episode_count += 1;
                }
            }
        }

        ctx.return_data = match self.config.get_train_sample {
            true => samples.into_iter().map(BattleData::Samples).collect(),
            false => episodes.into_iter().map(BattleData::Episodes).collect(),
        };
        ctx.return_info = return_info;
        ctx.total_envstep_count = self.total_envstep_count;
        ctx.total_episode_count = self.total_episode_count;

        let summary = summarize_episodes(&self.slots.episode_info()[n_finished_before..]);
        info!(
            "Collected {} episodes, total {} env steps and {} episodes",
            collected_episode, self.total_envstep_count, self.total_episode_count
        );
        debug!("{:?}", summary);

        Ok(())
    }

    /// Runs forward of each policy on its own observations and returns the joint actions.
    fn inference(
        &mut self,
        obs: SlotMap<[E::Obs; N]>,
        kwargs: &Record,
    ) -> Result<SlotMap<[E::Act; N]>> {
        let env_ids = obs.keys().copied().collect::<Vec<_>>();
        let mut partitions: Vec<SlotMap<E::Obs>> = (0..N).map(|_| SlotMap::new()).collect();
        for (env_id, joint) in obs.into_iter() {
            for (i, o) in joint.into_iter().enumerate() {
                partitions[i].insert(env_id, o);
            }
        }

        let mut outputs = Vec::with_capacity(N);
        for (i, obs) in partitions.into_iter().enumerate() {
            self.slots.obs_pool_mut(i).update(&obs);
            let obs = match self.config.transform_obs {
                true => obs.into_iter().map(|(k, o)| (k, o.transform())).collect(),
                false => obs,
            };
            let output = self.policies[i].forward(&obs, kwargs)?;
            if let Some(&env_id) = env_ids.iter().find(|id| !output.contains_key(*id)) {
                return Err(CollectError::MissingPolicyOutput { policy_id: i, env_id }.into());
            }
            self.slots.output_pool_mut(i).update(&output);
            outputs.push(output);
        }
        trace!("Inference on envs {:?}", env_ids);

        Ok(env_ids
            .into_iter()
            .map(|env_id| {
                let actions = std::array::from_fn(|i| outputs[i][&env_id].action().clone());
                (env_id, actions)
            })
            .collect())
    }

    /// Resets the environments.
    ///
    /// If `env` is given, the current environments are closed and replaced by `env`,
    /// which is launched. Otherwise the current environments are reset.
    pub fn reset_env(&mut self, env: Option<E>) -> Result<()> {
        match env {
            Some(env) => {
                self.close();
                self.env = env;
                self.env.launch()?;
                self.end_flag = false;
            }
            None => self.env.reset()?,
        }
        Ok(())
    }

    /// Resets the state of the policies, replacing them first if `policies` is given.
    pub fn reset_policy(&mut self, policies: Option<[P; N]>) {
        if let Some(policies) = policies {
            self.policies = policies;
        }
        self.policies.iter_mut().for_each(|p| p.reset(None));
    }

    /// Resets the environments, the policies, the buffers and the statistics.
    ///
    /// See [`BattleCollector::reset_env`] for the handling of `env`.
    pub fn reset(&mut self, env: Option<E>) -> Result<()> {
        self.reset_env(env)?;
        self.reset_policy(None);
        let env_num = self.env.env_num();
        self.traj_buffers = Self::new_traj_buffers(env_num, self.config.traj_len);
        self.slots = SlotState::new(env_num, N, self.config.obs_clone_strategy());
        self.total_envstep_count = 0;
        self.total_episode_count = 0;
        Ok(())
    }

    /// Clears the buffers and the running statistics of a slot.
    pub fn reset_stat(&mut self, env_id: usize) {
        self.traj_buffers[env_id].iter_mut().for_each(|b| b.clear());
        self.slots.reset_slot(env_id);
    }

    /// Closes the environments. Called on drop if not called before.
    pub fn close(&mut self) {
        if self.end_flag {
            return;
        }
        self.end_flag = true;
        trace!("Closing environments");
        if let Err(e) = self.env.close() {
            warn!("Failed to close environments: {}", e);
        }
    }

    /// Statistics of the episodes finished since the last reset.
    pub fn episode_info(&self) -> &[EpisodeStat] {
        self.slots.episode_info()
    }

    /// Summary of the episodes finished since the last reset, see [`summarize_episodes`].
    pub fn summary(&self) -> Record {
        summarize_episodes(self.slots.episode_info())
    }

    /// Environment steps since the last reset.
    pub fn total_envstep_count(&self) -> usize {
        self.total_envstep_count
    }

    /// Episodes since the last reset.
    pub fn total_episode_count(&self) -> usize {
        self.total_episode_count
    }

    /// Transition buffer of a slot for a policy.
    pub fn traj_buffer(&self, env_id: usize, policy_id: usize) -> &TrajBuffer<PolicyTransition<P>> {
        &self.traj_buffers[env_id][policy_id]
    }

    /// The policies.
    pub fn policies(&self) -> &[P; N] {
        &self.policies
    }

    /// The environment manager.
    pub fn env(&self) -> &E {
        &self.env
    }
}

impl<E, P, const N: usize> Drop for BattleCollector<E, P, N>
where
    E: BattleEnvManager<N>,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    fn drop(&mut self) {
        self.close();
    }
}
