//! Randomized policies for warm-up collection.
use crate::{record::Record, FromAction, Forward, Obs, SlotMap};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::marker::PhantomData;

/// Builds the policy used in place of `P` during warm-up collection.
///
/// Called with the trained policy and the number of environment slots at the beginning
/// of each collector call that falls in the warm-up period.
pub type RandomPolicyFactory<P> = Box<
    dyn FnMut(&P, usize) -> Box<dyn Forward<Obs = <P as Forward>::Obs, Output = <P as Forward>::Output>>,
>;

/// Samples discrete actions uniformly from `0..n_actions`.
pub struct DiscreteRandomPolicy<O, Out> {
    n_actions: usize,
    rng: StdRng,
    phantom: PhantomData<(O, Out)>,
}

impl<O, Out> DiscreteRandomPolicy<O, Out> {
    /// Constructs the policy. Panics if `n_actions == 0`.
    pub fn new(n_actions: usize, seed: u64) -> Self {
        assert!(n_actions > 0, "n_actions must be positive");
        Self {
            n_actions,
            rng: StdRng::seed_from_u64(seed),
            phantom: PhantomData,
        }
    }
}

impl<O, Out> Forward for DiscreteRandomPolicy<O, Out>
where
    O: Obs,
    Out: FromAction<Act = usize>,
{
    type Obs = O;
    type Output = Out;

    fn forward(&mut self, obs: &SlotMap<O>, _kwargs: &Record) -> Result<SlotMap<Out>> {
        Ok(obs
            .keys()
            .map(|&env_id| (env_id, Out::from_action(self.rng.gen_range(0..self.n_actions))))
            .collect())
    }
}

/// Returns a factory of [`DiscreteRandomPolicy`].
///
/// The `k`-th policy built by the factory is seeded with `seed + k`.
pub fn discrete_random_policy_factory<P>(n_actions: usize, seed: u64) -> RandomPolicyFactory<P>
where
    P: Forward + 'static,
    P::Obs: 'static,
    P::Output: FromAction<Act = usize> + 'static,
{
    let mut n_built = 0;
    Box::new(move |_policy: &P, _env_num: usize| {
        let policy = DiscreteRandomPolicy::<P::Obs, P::Output>::new(n_actions, seed + n_built);
        n_built += 1;
        Box::new(policy) as Box<dyn Forward<Obs = P::Obs, Output = P::Output>>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{DummyObs, DummyOutput, DummyPolicy};
    use crate::PolicyOutput;

    #[test]
    fn test_discrete_random_policy() -> Result<()> {
        let obs: SlotMap<DummyObs> = (0..4).map(|i| (i, DummyObs::new(0))).collect();
        let mut factory = discrete_random_policy_factory::<DummyPolicy>(3, 42);
        let policy = DummyPolicy::new(0);

        let mut random = factory(&policy, 4);
        let mut actions = Vec::new();
        for _ in 0..50 {
            let outputs = random.forward(&obs, &Record::empty())?;
            assert_eq!(outputs.len(), 4);
            actions.extend(outputs.values().map(|o: &DummyOutput| *o.action()));
        }
        assert!(actions.iter().all(|&a| a < 3));
        assert!((0..3).all(|a| actions.contains(&a)));
        Ok(())
    }
}
