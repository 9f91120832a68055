//! Collectors driving a single policy.
use super::{
    functional::{inference, rollout},
    CollectorConfig, OnlineContext, RandomPolicyFactory, SlotState,
};
use crate::{
    buffer::TransitionList, error::CollectError, EnvManager, Forward, Policy, PolicyOutput,
    PolicyTransition,
};
use anyhow::Result;
use log::{info, trace, warn};

type RandomPolicy<P> =
    Box<dyn Forward<Obs = <P as Forward>::Obs, Output = <P as Forward>::Output>>;

/// State shared by [`StepCollector`] and [`EpisodeCollector`].
struct SerialCollector<E, P>
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    config: CollectorConfig,
    env: E,
    policy: P,
    random_collect_size: usize,
    random_policy_factory: Option<RandomPolicyFactory<P>>,
    transitions: TransitionList<E::Obs, P::Output, E::Info>,
    slots: SlotState<E::Obs, P::Output>,
    end_flag: bool,
}

impl<E, P> SerialCollector<E, P>
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    fn build(config: CollectorConfig, mut env: E, mut policy: P) -> Result<Self> {
        env.launch()?;
        policy.reset(None);
        let env_num = env.env_num();
        let slots = SlotState::new(env_num, 1, config.obs_clone_strategy());
        Ok(Self {
            config,
            env,
            policy,
            random_collect_size: 0,
            random_policy_factory: None,
            transitions: TransitionList::new(env_num),
            slots,
            end_flag: false,
        })
    }

    /// Returns the warm-up policy and the target size if `counter` is in the warm-up
    /// period.
    fn warmup(&mut self, counter: usize) -> Option<(RandomPolicy<P>, usize)> {
        if self.random_collect_size == 0 || counter >= self.random_collect_size {
            return None;
        }
        let env_num = self.env.env_num();
        let factory = self.random_policy_factory.as_mut()?;
        let policy = factory(&self.policy, env_num);
        Some((policy, self.random_collect_size - counter))
    }

    /// Runs inference and rollout until `counter(ctx)` advanced by `target_size`.
    fn run(
        &mut self,
        ctx: &mut OnlineContext<PolicyTransition<P>>,
        mut random_policy: Option<RandomPolicy<P>>,
        target_size: usize,
        counter: fn(&OnlineContext<PolicyTransition<P>>) -> usize,
    ) -> Result<()> {
        let old = counter(ctx);
        let transform_obs = self.config.transform_obs;

        loop {
            let actions = match random_policy.as_mut() {
                Some(random_policy) => inference(
                    transform_obs,
                    &mut **random_policy,
                    &mut self.env,
                    &mut self.slots,
                    &ctx.forward_kwargs,
                )?,
                None => inference(
                    transform_obs,
                    &mut self.policy,
                    &mut self.env,
                    &mut self.slots,
                    &ctx.forward_kwargs,
                )?,
            };
            rollout(
                &mut self.policy,
                &mut self.env,
                &mut self.slots,
                &mut self.transitions,
                &actions,
                ctx,
            )?;

            if counter(ctx) - old >= target_size {
                break;
            }
        }

        Ok(())
    }

    fn reset(&mut self, env: Option<E>) -> Result<()> {
        match env {
            Some(env) => {
                self.close();
                self.env = env;
                self.env.launch()?;
                self.end_flag = false;
            }
            None => self.env.reset()?,
        }
        let env_num = self.env.env_num();
        self.policy.reset(None);
        self.transitions = TransitionList::new(env_num);
        self.slots = SlotState::new(env_num, 1, self.config.obs_clone_strategy());
        Ok(())
    }

    fn close(&mut self) {
        if self.end_flag {
            return;
        }
        self.end_flag = true;
        trace!("Closing environments");
        if let Err(e) = self.env.close() {
            warn!("Failed to close environments: {}", e);
        }
    }
}

impl<E, P> Drop for SerialCollector<E, P>
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    fn drop(&mut self) {
        self.close();
    }
}

macro_rules! impl_serial_accessors {
    ($name:ident) => {
        impl<E, P> $name<E, P>
        where
            E: EnvManager,
            P: Policy<Obs = E::Obs, Info = E::Info>,
            P::Output: PolicyOutput<Act = E::Act>,
        {
            /// Substitutes a policy built by `factory` for the trained one until the
            /// collection counter reaches `random_collect_size`.
            pub fn with_random_policy(
                mut self,
                random_collect_size: usize,
                factory: RandomPolicyFactory<P>,
            ) -> Self {
                self.0.random_collect_size = random_collect_size;
                self.0.random_policy_factory = Some(factory);
                self
            }

            /// Resets the collector.
            ///
            /// If `env` is given, the current environments are closed and replaced by
            /// `env`, which is launched. Otherwise the current environments are reset.
            /// Policy state, logged transitions and slot statistics are cleared.
            pub fn reset(&mut self, env: Option<E>) -> Result<()> {
                self.0.reset(env)
            }

            /// Closes the environments. Called on drop if not called before.
            pub fn close(&mut self) {
                self.0.close()
            }

            /// Statistics of the episodes finished since the last reset.
            pub fn episode_info(&self) -> &[super::EpisodeStat] {
                self.0.slots.episode_info()
            }

            /// Summary of the episodes finished since the last reset, see
            /// [`summarize_episodes`](super::summarize_episodes).
            pub fn summary(&self) -> crate::record::Record {
                super::summarize_episodes(self.0.slots.episode_info())
            }

            /// Caches and statistics of the slots.
            pub fn slots(&self) -> &SlotState<E::Obs, P::Output> {
                &self.0.slots
            }

            /// The trained policy.
            pub fn policy(&self) -> &P {
                &self.0.policy
            }

            /// The trained policy.
            pub fn policy_mut(&mut self) -> &mut P {
                &mut self.0.policy
            }

            /// The environment manager.
            pub fn env(&self) -> &E {
                &self.0.env
            }

            /// The configuration.
            pub fn config(&self) -> &CollectorConfig {
                &self.0.config
            }
        }
    };
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Collects transitions until a number of environment steps is reached.
///
/// Each call of [`StepCollector::collect`] alternates [`inference`] and [`rollout`] until
/// `ctx.env_step` advanced by `n_sample * unroll_len`, then writes the logged
/// transitions as fixed-length windows into `ctx.trajectories` and
/// `ctx.trajectory_end_idx`, see [`TransitionList::to_trajectories`].
///
/// While `ctx.env_step < random_collect_size`, a policy built by the factory given in
/// [`StepCollector::with_random_policy`] runs forward instead of the trained policy and
/// the call stops at `random_collect_size` steps.
///
/// ```mermaid
/// graph LR
///     A[EnvManager] -->|ready_obs| B[inference]
///     B -->|forward| C[Policy]
///     C -->|actions| D[rollout]
///     D -->|step| A
///     D -->|process_transition| E[TransitionList]
///     E -->|to_trajectories| F[OnlineContext]
/// ```
pub struct StepCollector<E, P>(SerialCollector<E, P>)
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>;

impl_serial_accessors!(StepCollector);

impl<E, P> StepCollector<E, P>
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    /// Builds the collector and launches `env`.
    ///
    /// Fails with [`CollectError::MissingNSample`] if `config.n_sample` is not given and
    /// with [`CollectError::InvalidUnrollLen`] if `config.unroll_len == 0`, in both cases
    /// before launching `env`.
    pub fn build(config: CollectorConfig, env: E, policy: P) -> Result<Self> {
        if config.n_sample.is_none() {
            return Err(CollectError::MissingNSample.into());
        }
        if config.unroll_len == 0 {
            return Err(CollectError::InvalidUnrollLen.into());
        }
        Ok(Self(SerialCollector::build(config, env, policy)?))
    }

    /// Collects `n_sample * unroll_len` environment steps, or the remaining warm-up steps.
    pub fn collect(&mut self, ctx: &mut OnlineContext<PolicyTransition<P>>) -> Result<()> {
        let c = &mut self.0;
        let old = ctx.env_step;
        let (random_policy, target_size) = match c.warmup(old) {
            Some((p, target_size)) => (Some(p), target_size),
            None => {
                let n_sample = c.config.n_sample.ok_or(CollectError::MissingNSample)?;
                (None, n_sample * c.config.unroll_len)
            }
        };
        let is_random = random_policy.is_some();

        c.run(ctx, random_policy, target_size, |ctx| ctx.env_step)?;

        let trajs = c.transitions.to_trajectories(
            c.config.unroll_len,
            c.config.trajectory_tail,
            c.config.split_at_done,
        );
        c.transitions.clear();
        info!(
            "Collected {} env steps into {} trajectories{}",
            ctx.env_step - old,
            trajs.windows.len(),
            if is_random { " with random policy" } else { "" }
        );
        ctx.trajectories = trajs.windows;
        ctx.trajectory_end_idx = trajs.end_idx;

        Ok(())
    }
}

/// Collects transitions until a number of episodes is finished.
///
/// Each call of [`EpisodeCollector::collect`] alternates [`inference`] and [`rollout`]
/// until `ctx.env_episode` advanced by `n_episode`, then writes the finished episodes
/// into `ctx.episodes`, see [`TransitionList::to_episodes`]. The logged transitions are
/// then cleared, except those of episodes still running if
/// [`CollectorConfig::keep_unfinished`] is set. `n_episode` is taken from the
/// configuration, or from [`Policy::default_n_episode`].
///
/// While `ctx.env_episode < random_collect_size`, the warm-up policy runs forward
/// instead of the trained policy.
pub struct EpisodeCollector<E, P>(SerialCollector<E, P>)
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>;

impl_serial_accessors!(EpisodeCollector);

impl<E, P> EpisodeCollector<E, P>
where
    E: EnvManager,
    P: Policy<Obs = E::Obs, Info = E::Info>,
    P::Output: PolicyOutput<Act = E::Act>,
{
    /// Builds the collector and launches `env`.
    ///
    /// Fails with [`CollectError::MissingNEpisode`] if `n_episode` is neither in `config`
    /// nor a default of `policy`.
    pub fn build(mut config: CollectorConfig, env: E, policy: P) -> Result<Self> {
        let n_episode = config
            .n_episode
            .or_else(|| policy.default_n_episode())
            .ok_or(CollectError::MissingNEpisode)?;
        config.n_episode = Some(n_episode);
        Ok(Self(SerialCollector::build(config, env, policy)?))
    }

    /// Collects `n_episode` episodes, or the remaining warm-up episodes.
    pub fn collect(&mut self, ctx: &mut OnlineContext<PolicyTransition<P>>) -> Result<()> {
        let c = &mut self.0;
        let old = ctx.env_episode;
        let (random_policy, target_size) = match c.warmup(old) {
            Some((p, target_size)) => (Some(p), target_size),
            None => (
                None,
                c.config.n_episode.ok_or(CollectError::MissingNEpisode)?,
            ),
        };

        c.run(ctx, random_policy, target_size, |ctx| ctx.env_episode)?;

        let episodes = c.transitions.to_episodes();
        if c.config.keep_unfinished {
            c.transitions.clear_finished();
        } else {
            c.transitions.clear();
        }
        info!(
            "Collected {} episodes in {} env steps",
            episodes.len(),
            episodes.iter().map(Vec::len).sum::<usize>()
        );
        ctx.episodes = episodes;

        Ok(())
    }
}
