//! This module is used for tests.
//!
//! Deterministic environment managers and a policy returning a fixed action. Every
//! step gives reward `1.0` (in battle mode `1.0` to policy 0 and `-1.0` to the
//! others) and episodes of a slot last a fixed number of steps, after which the slot
//! resets itself.
use crate::{
    buffer::DeepClone, record::Record, BattleEnvManager, EnvManager, Forward, FromAction, Info,
    JointTimestep, Obs, Policy, PolicyOutput, PolicyTransition, SlotMap, Timestep, Transition,
};
use anyhow::{anyhow, Result};
use std::{cell::Cell, rc::Rc};

#[derive(Clone, Debug, PartialEq)]
/// Dummy observation, the step count of the slot in the current episode.
pub struct DummyObs {
    /// Step count in the episode.
    pub step: usize,

    /// Set by [`Obs::transform`].
    pub transformed: bool,
}

impl DummyObs {
    /// Constructs an untransformed observation.
    pub fn new(step: usize) -> Self {
        Self {
            step,
            transformed: false,
        }
    }
}

impl DeepClone for DummyObs {}

impl Obs for DummyObs {
    fn transform(self) -> Self {
        Self {
            transformed: true,
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Dummy policy output.
pub struct DummyOutput {
    /// Action.
    pub action: usize,
}

impl DeepClone for DummyOutput {}

impl PolicyOutput for DummyOutput {
    type Act = usize;

    fn action(&self) -> &usize {
        &self.action
    }
}

impl FromAction for DummyOutput {
    fn from_action(action: usize) -> Self {
        Self { action }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Dummy info.
pub struct DummyInfo {
    /// Slot id.
    pub env_id: usize,

    /// Step count in the episode, after the step.
    pub step: usize,
}

impl Info for DummyInfo {}

/// Transition of [`DummyPolicy`].
pub type DummyTransition = Transition<DummyObs, DummyOutput, DummyInfo>;

/// Lifecycle calls counted by the dummy environment managers.
///
/// Shared with the manager so that it can be inspected after the manager was moved
/// into a collector or dropped.
#[derive(Clone, Debug, Default)]
pub struct LifecycleCounter {
    /// Calls of `launch`.
    pub launch: Rc<Cell<usize>>,

    /// Calls of `reset`.
    pub reset: Rc<Cell<usize>>,

    /// Calls of `close`.
    pub close: Rc<Cell<usize>>,
}

impl LifecycleCounter {
    fn incr(c: &Cell<usize>) {
        c.set(c.get() + 1);
    }
}

/// Step counts of the slots of a dummy manager.
#[derive(Clone, Debug)]
struct Slots {
    episode_lens: Vec<usize>,
    steps: Vec<usize>,
    total_steps: usize,
    fail_after: Option<usize>,
}

impl Slots {
    fn new(episode_lens: Vec<usize>) -> Self {
        Self {
            steps: vec![0; episode_lens.len()],
            episode_lens,
            total_steps: 0,
            fail_after: None,
        }
    }

    /// Advances a slot and returns its step count and the done flag.
    fn advance(&mut self, env_id: usize) -> Result<(usize, bool)> {
        if self.fail_after.map_or(false, |n| self.total_steps >= n) {
            return Err(anyhow!("Env {} crashed", env_id));
        }
        self.total_steps += 1;
        self.steps[env_id] += 1;
        let step = self.steps[env_id];
        let done = step >= self.episode_lens[env_id];
        if done {
            self.steps[env_id] = 0;
        }
        Ok((step, done))
    }

    fn reset(&mut self) {
        self.steps.iter_mut().for_each(|s| *s = 0);
    }
}

/// Dummy environment manager.
#[derive(Clone, Debug)]
pub struct DummyEnvManager {
    slots: Slots,
    actions: Vec<SlotMap<usize>>,
    counter: LifecycleCounter,
}

impl DummyEnvManager {
    /// `env_num` slots with episodes of `episode_len` steps.
    pub fn new(env_num: usize, episode_len: usize) -> Self {
        Self::with_episode_lens(vec![episode_len; env_num])
    }

    /// A slot per entry of `episode_lens`, with episodes of the given length.
    pub fn with_episode_lens(episode_lens: Vec<usize>) -> Self {
        Self {
            slots: Slots::new(episode_lens),
            actions: vec![],
            counter: LifecycleCounter::default(),
        }
    }

    /// Fails every step after `n` steps were taken in total.
    pub fn with_fault(mut self, n: usize) -> Self {
        self.slots.fail_after = Some(n);
        self
    }

    /// Handle to the lifecycle counters.
    pub fn counter(&self) -> LifecycleCounter {
        self.counter.clone()
    }

    /// Actions of each call of `step`.
    pub fn actions(&self) -> &[SlotMap<usize>] {
        &self.actions
    }
}

impl EnvManager for DummyEnvManager {
    type Obs = DummyObs;
    type Act = usize;
    type Info = DummyInfo;

    fn env_num(&self) -> usize {
        self.slots.steps.len()
    }

    fn launch(&mut self) -> Result<()> {
        LifecycleCounter::incr(&self.counter.launch);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        LifecycleCounter::incr(&self.counter.reset);
        self.slots.reset();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        LifecycleCounter::incr(&self.counter.close);
        Ok(())
    }

    fn ready_obs(&mut self) -> Result<SlotMap<DummyObs>> {
        Ok(self
            .slots
            .steps
            .iter()
            .enumerate()
            .map(|(env_id, &step)| (env_id, DummyObs::new(step)))
            .collect())
    }

    fn step(&mut self, actions: &SlotMap<usize>) -> Result<SlotMap<Timestep<DummyObs, DummyInfo>>> {
        self.actions.push(actions.clone());
        actions
            .keys()
            .map(|&env_id| -> Result<_> {
                let (step, done) = self.slots.advance(env_id)?;
                let info = DummyInfo { env_id, step };
                Ok((env_id, Timestep::new(DummyObs::new(step), 1.0, done, info)))
            })
            .collect()
    }
}

/// Dummy environment manager shared by `N` policies.
#[derive(Clone, Debug)]
pub struct DummyBattleEnvManager<const N: usize> {
    slots: Slots,
    counter: LifecycleCounter,
}

impl<const N: usize> DummyBattleEnvManager<N> {
    /// `env_num` slots with episodes of `episode_len` steps.
    pub fn new(env_num: usize, episode_len: usize) -> Self {
        Self::with_episode_lens(vec![episode_len; env_num])
    }

    /// A slot per entry of `episode_lens`, with episodes of the given length.
    pub fn with_episode_lens(episode_lens: Vec<usize>) -> Self {
        Self {
            slots: Slots::new(episode_lens),
            counter: LifecycleCounter::default(),
        }
    }

    /// Fails every step after `n` steps were taken in total.
    pub fn with_fault(mut self, n: usize) -> Self {
        self.slots.fail_after = Some(n);
        self
    }

    /// Handle to the lifecycle counters.
    pub fn counter(&self) -> LifecycleCounter {
        self.counter.clone()
    }
}

impl<const N: usize> BattleEnvManager<N> for DummyBattleEnvManager<N> {
    type Obs = DummyObs;
    type Act = usize;
    type Info = DummyInfo;

    fn env_num(&self) -> usize {
        self.slots.steps.len()
    }

    fn launch(&mut self) -> Result<()> {
        LifecycleCounter::incr(&self.counter.launch);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        LifecycleCounter::incr(&self.counter.reset);
        self.slots.reset();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        LifecycleCounter::incr(&self.counter.close);
        Ok(())
    }

    fn ready_obs(&mut self) -> Result<SlotMap<[DummyObs; N]>> {
        Ok(self
            .slots
            .steps
            .iter()
            .enumerate()
            .map(|(env_id, &step)| (env_id, std::array::from_fn(|_| DummyObs::new(step))))
            .collect())
    }

    fn step(
        &mut self,
        actions: &SlotMap<[usize; N]>,
    ) -> Result<SlotMap<JointTimestep<DummyObs, DummyInfo, N>>> {
        actions
            .keys()
            .map(|&env_id| -> Result<_> {
                let (step, done) = self.slots.advance(env_id)?;
                let timestep = JointTimestep::new(
                    std::array::from_fn(|_| DummyObs::new(step)),
                    std::array::from_fn(|i| if i == 0 { 1.0 } else { -1.0 }),
                    done,
                    std::array::from_fn(|_| DummyInfo { env_id, step }),
                );
                Ok((env_id, timestep))
            })
            .collect()
    }
}

/// Dummy policy returning a fixed action.
///
/// Transitions are built with [`Transition::new`] and each transition is a training
/// sample.
#[derive(Clone, Debug)]
pub struct DummyPolicy {
    action: usize,
    n_episode: Option<usize>,
    missing_output: Option<usize>,
    n_forward: Rc<Cell<usize>>,
    n_transformed: Rc<Cell<usize>>,
    resets: Vec<Option<Vec<usize>>>,
}

impl DummyPolicy {
    /// Constructs a policy always choosing `action`.
    pub fn new(action: usize) -> Self {
        Self {
            action,
            n_episode: None,
            missing_output: None,
            n_forward: Rc::new(Cell::new(0)),
            n_transformed: Rc::new(Cell::new(0)),
            resets: vec![],
        }
    }

    /// Sets the default number of episodes.
    pub fn with_n_episode(mut self, n_episode: usize) -> Self {
        self.n_episode = Some(n_episode);
        self
    }

    /// Omits the output of slot `env_id` in forward.
    pub fn with_missing_output(mut self, env_id: usize) -> Self {
        self.missing_output = Some(env_id);
        self
    }

    /// Handle to the number of calls of forward.
    pub fn n_forward(&self) -> Rc<Cell<usize>> {
        self.n_forward.clone()
    }

    /// Handle to the number of transformed observations seen in forward.
    pub fn n_transformed(&self) -> Rc<Cell<usize>> {
        self.n_transformed.clone()
    }

    /// Arguments of each call of `reset`.
    pub fn resets(&self) -> &[Option<Vec<usize>>] {
        &self.resets
    }
}

impl Forward for DummyPolicy {
    type Obs = DummyObs;
    type Output = DummyOutput;

    fn forward(&mut self, obs: &SlotMap<DummyObs>, _kwargs: &Record) -> Result<SlotMap<DummyOutput>> {
        self.n_forward.set(self.n_forward.get() + 1);
        let n_transformed = obs.values().filter(|o| o.transformed).count();
        self.n_transformed.set(self.n_transformed.get() + n_transformed);

        Ok(obs
            .keys()
            .filter(|&&env_id| Some(env_id) != self.missing_output)
            .map(|&env_id| (env_id, DummyOutput::from_action(self.action)))
            .collect())
    }
}

impl Policy for DummyPolicy {
    type Info = DummyInfo;
    type TrainSample = DummyTransition;

    fn process_transition(
        &self,
        obs: &DummyObs,
        output: &DummyOutput,
        timestep: &Timestep<DummyObs, DummyInfo>,
    ) -> PolicyTransition<Self> {
        Transition::new(obs, output, timestep)
    }

    fn get_train_sample(&self, transitions: Vec<DummyTransition>) -> Vec<DummyTransition> {
        transitions
    }

    fn reset(&mut self, env_ids: Option<&[usize]>) {
        self.resets.push(env_ids.map(|ids| ids.to_vec()));
    }

    fn default_n_episode(&self) -> Option<usize> {
        self.n_episode
    }
}
