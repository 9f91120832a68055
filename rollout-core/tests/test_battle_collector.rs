use anyhow::Result;
use rollout_core::{
    collector::{BattleCollector, BattleCollectorContext, CollectorConfig},
    dummy::{DummyBattleEnvManager, DummyPolicy},
    error::CollectError,
};
use test_log::test;

type Env = DummyBattleEnvManager<2>;
type Collector = BattleCollector<Env, DummyPolicy, 2>;
type Context = BattleCollectorContext<Env, DummyPolicy, 2>;

fn policies() -> [DummyPolicy; 2] {
    [DummyPolicy::new(0), DummyPolicy::new(1)]
}

fn build(env: Env, n_episode: usize) -> Result<Collector> {
    let config = CollectorConfig::default().n_episode(n_episode);
    Collector::build(config, env, policies())
}

#[test]
fn test_battle_two_step_episodes() -> Result<()> {
    let mut collector = build(Env::new(2, 2), 4)?;
    let mut ctx = Context::default();
    collector.collect(&mut ctx)?;

    assert_eq!(ctx.n_episode, Some(4));
    assert_eq!(ctx.return_data.len(), 2);
    for (i, data) in ctx.return_data.iter().enumerate() {
        let episodes = data.episodes().unwrap();
        assert_eq!(episodes.len(), 4);
        assert!(episodes.iter().all(|e| e.len() == 2));
        assert!(episodes.iter().all(|e| e[1].done && !e[0].done));
        let reward = if i == 0 { 1.0 } else { -1.0 };
        assert!(episodes.iter().flatten().all(|t| t.reward == reward));
        assert!(episodes.iter().flatten().all(|t| t.output.action == i));
    }
    assert_eq!(ctx.return_info.iter().map(|v| v.len()).collect::<Vec<_>>(), vec![4, 4]);
    assert!(ctx.return_info[1].iter().all(|info| info.step == 2));
    assert_eq!(ctx.total_envstep_count, 8);
    assert_eq!(ctx.total_episode_count, 4);

    let episode_info = collector.episode_info();
    assert_eq!(episode_info.len(), 4);
    assert!(episode_info.iter().all(|e| e.step == 2 && e.reward == vec![2.0, -2.0]));
    assert_eq!(collector.summary().get_scalar("envstep_count"), Ok(8.0));

    Ok(())
}

#[test]
fn test_battle_three_policies() -> Result<()> {
    let policies = [DummyPolicy::new(0), DummyPolicy::new(1), DummyPolicy::new(2)];
    let config = CollectorConfig::default().n_episode(3);
    let env = DummyBattleEnvManager::<3>::new(3, 2);
    let mut collector = BattleCollector::build(config, env, policies)?;
    let mut ctx = BattleCollectorContext::<DummyBattleEnvManager<3>, DummyPolicy, 3>::default();
    collector.collect(&mut ctx)?;

    assert_eq!(ctx.return_data.len(), 3);
    for (i, data) in ctx.return_data.iter().enumerate() {
        let episodes = data.episodes().unwrap();
        assert_eq!(episodes.len(), 3);
        assert!(episodes.iter().all(|e| e.len() == 2 && e[1].done));
        let reward = if i == 0 { 1.0 } else { -1.0 };
        assert!(episodes.iter().flatten().all(|t| t.reward == reward));
        assert!(episodes.iter().flatten().all(|t| t.output.action == i));
    }
    assert_eq!(ctx.return_info.iter().map(|v| v.len()).collect::<Vec<_>>(), vec![3, 3, 3]);
    assert_eq!(ctx.total_envstep_count, 6);
    assert_eq!(ctx.total_episode_count, 3);
    assert!(collector
        .episode_info()
        .iter()
        .all(|e| e.reward == vec![2.0, -2.0, -2.0]));

    Ok(())
}

#[test]
fn test_battle_totals_accumulate() -> Result<()> {
    let mut collector = build(Env::new(2, 2), 5)?;
    let mut ctx = Context::default();

    collector.collect(&mut ctx)?;
    assert_eq!(ctx.return_data[0].len(), 5);
    assert_eq!(ctx.total_envstep_count, 10);
    assert_eq!(ctx.total_episode_count, 5);

    collector.collect(&mut ctx)?;
    assert_eq!(ctx.return_data[1].len(), 5);
    assert_eq!(ctx.total_envstep_count, 20);
    assert_eq!(ctx.total_episode_count, 10);

    collector.reset(None)?;
    assert_eq!(collector.total_envstep_count(), 0);
    assert!(collector.episode_info().is_empty());
    assert_eq!(collector.env().counter().reset.get(), 1);
    assert_eq!(collector.policies()[1].resets().last(), Some(&None));

    Ok(())
}

#[test]
fn test_battle_admission_order() -> Result<()> {
    let mut collector = build(Env::with_episode_lens(vec![2, 3]), 3)?;
    let mut ctx = Context::default();
    ctx.train_iter = 7;
    collector.collect(&mut ctx)?;

    // Slot 0 finishes first, is admitted again, and finishes after slot 1.
    let episodes = ctx.return_data[0].episodes().unwrap();
    assert_eq!(episodes.iter().map(|e| e.len()).collect::<Vec<_>>(), vec![2, 3, 2]);
    assert_eq!(
        episodes.iter().map(|e| e[0].env_data_id).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(episodes.iter().flatten().all(|t| t.collect_iter == 7));
    assert_eq!(ctx.total_envstep_count, 7);

    let resets = collector.policies()[0].resets();
    assert_eq!(resets[0], None);
    assert_eq!(&resets[1..], &[Some(vec![0]), Some(vec![1]), Some(vec![0])]);

    Ok(())
}

#[test]
fn test_battle_train_samples() -> Result<()> {
    let config = CollectorConfig::default().n_episode(4).get_train_sample(true);
    let mut collector = Collector::build(config, Env::new(2, 2), policies())?;
    let mut ctx = Context::default();
    collector.collect(&mut ctx)?;

    for data in ctx.return_data.iter() {
        assert!(data.episodes().is_none());
        assert_eq!(data.samples().unwrap().len(), 8);
    }
    Ok(())
}

#[test]
fn test_battle_traj_len() -> Result<()> {
    let config = CollectorConfig::default().n_episode(2).traj_len(Some(2));
    let mut collector = Collector::build(config, Env::new(2, 5), policies())?;
    let mut ctx = Context::default();
    collector.collect(&mut ctx)?;

    let episodes = ctx.return_data[0].episodes().unwrap();
    assert!(episodes.iter().all(|e| e.len() == 2));
    assert!(episodes.iter().all(|e| e[0].next_obs.step == 4 && e[1].done));
    assert_eq!(ctx.total_envstep_count, 10);
    Ok(())
}

#[test]
fn test_battle_n_episode_resolution() -> Result<()> {
    // Missing everywhere
    let mut collector = Collector::build(CollectorConfig::default(), Env::new(2, 2), policies())?;
    let err = collector.collect(&mut Context::default()).unwrap_err();
    assert_eq!(err.downcast_ref::<CollectError>(), Some(&CollectError::MissingNEpisode));
    assert_eq!(collector.total_envstep_count(), 0);

    // Default of the first policy
    let policies = [DummyPolicy::new(0).with_n_episode(3), DummyPolicy::new(1)];
    let mut collector = Collector::build(CollectorConfig::default(), Env::new(2, 2), policies)?;
    let mut ctx = Context::default();
    collector.collect(&mut ctx)?;
    assert_eq!(ctx.n_episode, Some(3));
    assert_eq!(ctx.total_episode_count, 3);

    // The context has priority
    ctx.n_episode = Some(2);
    collector.collect(&mut ctx)?;
    assert_eq!(ctx.return_data[0].len(), 2);

    Ok(())
}

#[test]
fn test_battle_config_errors() -> Result<()> {
    let env = Env::new(4, 2);
    let counter = env.counter();
    let mut collector = build(env, 3)?;
    let err = collector.collect(&mut Context::default()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CollectError>(),
        Some(&CollectError::InvalidEpisodeCount {
            n_episode: 3,
            env_num: 4
        })
    );
    assert_eq!(collector.total_envstep_count(), 0);
    drop(collector);
    assert_eq!(counter.close.get(), 1);

    let env = DummyBattleEnvManager::<1>::new(2, 2);
    let counter = env.counter();
    let config = CollectorConfig::default().n_episode(2);
    let err = BattleCollector::build(config, env, [DummyPolicy::new(0)])
        .err()
        .unwrap();
    assert_eq!(
        err.downcast_ref::<CollectError>(),
        Some(&CollectError::NotEnoughPolicies(1))
    );
    assert_eq!(counter.launch.get(), 0);

    let env = Env::new(2, 2);
    let counter = env.counter();
    let config = CollectorConfig::default().n_episode(2).traj_len(Some(0));
    let err = Collector::build(config, env, policies()).err().unwrap();
    assert_eq!(err.downcast_ref::<CollectError>(), Some(&CollectError::InvalidTrajLen));
    assert_eq!(counter.launch.get(), 0);

    Ok(())
}

#[test]
fn test_battle_env_fault() -> Result<()> {
    let mut collector = build(Env::new(2, 2).with_fault(3), 4)?;
    let err = collector.collect(&mut Context::default()).unwrap_err();
    assert!(err.to_string().contains("crashed"));
    Ok(())
}

#[test]
fn test_battle_missing_output() -> Result<()> {
    let policies = [DummyPolicy::new(0), DummyPolicy::new(1).with_missing_output(1)];
    let config = CollectorConfig::default().n_episode(2);
    let mut collector = Collector::build(config, Env::new(2, 2), policies)?;
    let err = collector.collect(&mut Context::default()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CollectError>(),
        Some(&CollectError::MissingPolicyOutput {
            policy_id: 1,
            env_id: 1
        })
    );
    Ok(())
}

#[test]
fn test_battle_close() -> Result<()> {
    let env = Env::new(2, 2);
    let counter = env.counter();
    let mut collector = build(env, 2)?;
    assert_eq!(counter.launch.get(), 1);

    collector.close();
    collector.close();
    drop(collector);
    assert_eq!(counter.close.get(), 1);

    // Replacing the env closes the old one and launches the new one
    let (env1, env2) = (Env::new(2, 2), Env::new(3, 2));
    let (counter1, counter2) = (env1.counter(), env2.counter());
    let mut collector = build(env1, 3)?;
    collector.reset(Some(env2))?;
    assert_eq!(counter1.close.get(), 1);
    assert_eq!(counter2.launch.get(), 1);

    let mut ctx = Context::default();
    collector.collect(&mut ctx)?;
    assert_eq!(ctx.total_episode_count, 3);
    assert_eq!(ctx.total_envstep_count, 6);
    drop(collector);
    assert_eq!(counter2.close.get(), 1);

    Ok(())
}
