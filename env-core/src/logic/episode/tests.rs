use std::path::Path;
use std::time::Duration;

use ndarray::{arr1, arr2, s};

use super::*;
use crate::logic::calibration::{AttackCoefficients, CoefficientSet, CoefficientStore, JsonFileStore};
use crate::logic::config::EnvConfig;
use crate::logic::error::EnvError;
use crate::logic::telemetry::stub::{snapshot, ScriptedBackend};
use crate::logic::telemetry::{host_of, RetryPolicy, StateSnapshot};

fn config(dir: &Path, stack_size: usize, delay: Duration) -> EnvConfig {
    EnvConfig {
        attack_vectors: vec!["scan_attack".to_string(), "exploit_attack".to_string()],
        cfg_dir: dir.to_path_buf(),
        delay,
        cfg_episodes: 0,
        cfg_steps: 2,
        stack_size,
        readiness_retry: RetryPolicy::immediate(3),
        score_retry: RetryPolicy::immediate(5),
        ..Default::default()
    }
}

fn cached_store(dir: &Path, backend: &ScriptedBackend) -> JsonFileStore {
    let store = JsonFileStore::new(dir);
    let mut set = CoefficientSet::new(1.5);
    set.coeff.insert("scan_attack".into(), AttackCoefficients { a: 2.0, b: 3.0 });
    set.coeff.insert("exploit_attack".into(), AttackCoefficients { a: 0.5, b: 0.25 });
    store.save(host_of(&backend.address), &set).unwrap();
    store
}

fn ab() -> StateSnapshot {
    snapshot(&["A", "B"], vec![vec![1.0, 0.0], vec![0.0, 1.0]])
}

fn bc() -> StateSnapshot {
    snapshot(&["B", "C"], vec![vec![2.0, 2.0], vec![3.0, 3.0]])
}

fn build(backend: ScriptedBackend, stack_size: usize, delay: Duration) -> (EpisodeController<ScriptedBackend>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = cached_store(dir.path(), &backend);
    let controller = EpisodeController::new(backend, config(dir.path(), stack_size, delay), &store).unwrap();
    (controller, dir)
}

#[test]
fn test_end_to_end_flow_churn_with_stack_of_two() {
    // readiness, reset, step 1, step 2
    let mut backend = ScriptedBackend::new(vec![ab(), ab(), ab(), bc()]);
    backend.flow_scores.insert("A".into(), 1.0);
    backend.flow_scores.insert("B".into(), 2.0);
    let (mut env, _dir) = build(backend, 2, Duration::ZERO);

    let (first, flows) = env.reset_with_attack("scan_attack").unwrap();
    assert_eq!(flows, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(first.shape(), &[2, 2, 2]);

    env.step(&[0, 0]).unwrap();
    let outcome = env.step(&[1, 0]).unwrap();

    assert!(!outcome.done);
    assert_eq!(outcome.info.flows, vec!["B".to_string(), "C".to_string()]);

    let stacked = outcome.observation.as_stacked().unwrap();
    assert_eq!(stacked.shape(), &[2, 2, 2]);
    assert_eq!(stacked.slice(s![0, 0, ..]), arr1(&[0.0, 1.0]));
    assert_eq!(stacked.slice(s![0, 1, ..]), arr1(&[2.0, 2.0]));
    assert_eq!(stacked.slice(s![1, 0, ..]), arr1(&[0.0, 0.0]));
    assert_eq!(stacked.slice(s![1, 1, ..]), arr1(&[3.0, 3.0]));

    // both score reads were for A,B (the flows acted upon)
    assert_eq!(outcome.rewards.get("A"), Some(1.0));
    assert_eq!(outcome.rewards.get("B"), Some(2.0));
}

#[test]
fn test_passthrough_without_stacking() {
    let mut backend = ScriptedBackend::new(vec![ab(), ab(), bc()]);
    backend.flow_scores.insert("A".into(), 0.5);
    backend.flow_scores.insert("B".into(), -1.0);
    let (mut env, _dir) = build(backend, 1, Duration::ZERO);

    let (first, _) = env.reset_with_attack("exploit_attack").unwrap();
    assert_eq!(first.as_flat().unwrap(), &arr2(&[[1.0, 0.0], [0.0, 1.0]]));

    let outcome = env.step(&[2, 1]).unwrap();
    assert_eq!(outcome.observation.as_flat().unwrap(), &arr2(&[[2.0, 2.0], [3.0, 3.0]]));
    assert_eq!(outcome.rewards.flows, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(outcome.rewards.values, vec![0.5, -1.0]);
    assert_eq!(env.flows(), &["B".to_string(), "C".to_string()]);

    let (sent_flows, sent_actions) = env.client().mutations.last().unwrap();
    assert_eq!(sent_flows, &vec!["A".to_string(), "B".to_string()]);
    assert_eq!(sent_actions, &vec![2, 1]);
}

#[test]
fn test_pacing_lower_bound() {
    let delay = Duration::from_millis(30);
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A"], 2), 1, delay);
    env.reset_with_attack("scan_attack").unwrap();

    for _ in 0..3 {
        env.step(&[0]).unwrap();
    }

    let backend = env.client();
    assert_eq!(backend.action_times.len(), 3);
    for (acted, scored) in backend.action_times.iter().zip(&backend.score_times) {
        assert!(scored.duration_since(*acted) >= delay);
    }
    assert_eq!(backend.started[0], ("scan_attack".to_string(), 0.03));
}

#[test]
fn test_unknown_attack_rejected_without_backend_calls() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A"], 2), 1, Duration::ZERO);

    match env.reset_with_attack("ddos_attack") {
        Err(EnvError::UnknownAttack { attack, available }) => {
            assert_eq!(attack, "ddos_attack");
            assert_eq!(available.len(), 2);
        }
        other => panic!("Expected UnknownAttack, got {:?}", other.map(|_| ())),
    }
    assert_eq!(env.client().resets, 0);
    assert!(env.client().started.is_empty());
}

#[test]
fn test_step_before_reset_is_config_error() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A"], 2), 1, Duration::ZERO);
    let err = env.step(&[]).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_action_count_must_match_flows() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A", "B"], 2), 1, Duration::ZERO);
    env.reset_with_attack("scan_attack").unwrap();

    match env.step(&[0]) {
        Err(EnvError::ActionMismatch { expected, actual }) => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("Expected ActionMismatch, got {:?}", other.map(|_| ())),
    }
    assert!(env.client().mutations.is_empty());
}

#[test]
fn test_cached_construction_runs_no_calibration() {
    let (env, _dir) = build(ScriptedBackend::steady(&["A"], 4), 1, Duration::ZERO);

    let backend = env.client();
    assert_eq!(backend.resets, 0);
    assert_eq!(backend.gamma, Some(1.5));
    assert_eq!(backend.coefficients.len(), 2);
    assert!(backend.coefficients.contains(&("scan_attack".to_string(), 2.0, 3.0)));
    assert_eq!(env.observation_space(), ObservationSpace { stack_size: 1, frame_size: 4 });
    assert_eq!(env.action_space().len(), 3);
}

#[test]
fn test_construction_without_cache_calibrates_and_pushes() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    let backend = ScriptedBackend::steady(&["A"], 2);

    let env = EpisodeController::new(backend, config(dir.path(), 1, Duration::ZERO), &store).unwrap();

    // two forced episodes for each of the two attacks
    assert_eq!(env.client().resets, 4);
    assert_eq!(env.client().coefficients.len(), 2);
    assert_eq!(env.client().gamma, Some(env.coefficients().gamma));
    assert!(store.load("10.9.8.7").is_some());
}

#[test]
fn test_readiness_recovers_from_transient_failures() {
    let mut backend = ScriptedBackend::steady(&["A"], 2);
    backend.state_failures = 2;
    let (env, _dir) = build(backend, 1, Duration::ZERO);
    assert_eq!(env.observation_space().frame_size, 2);
}

#[test]
fn test_readiness_budget_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::steady(&["A"], 2);
    backend.state_failures = 10;
    let store = cached_store(dir.path(), &backend);

    let result = EpisodeController::new(backend, config(dir.path(), 1, Duration::ZERO), &store);
    match result {
        Err(EnvError::BackendUnavailable { operation, attempts }) => {
            assert_eq!(operation, "readiness");
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected BackendUnavailable, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_backend_without_flows_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(vec![StateSnapshot::default()]);
    let store = cached_store(dir.path(), &backend);

    let result = EpisodeController::new(backend, config(dir.path(), 1, Duration::ZERO), &store);
    assert!(matches!(result, Err(EnvError::BackendUnavailable { .. })));
}

#[test]
fn test_score_read_retried_inside_step() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A"], 2), 1, Duration::ZERO);
    env.reset_with_attack("scan_attack").unwrap();

    env.client_mut().score_failures = 4;
    assert!(env.step(&[0]).is_ok());

    env.client_mut().score_failures = 50;
    assert!(matches!(env.step(&[0]), Err(EnvError::BackendUnavailable { .. })));
}

#[test]
fn test_garbled_score_body_is_retried() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A"], 2), 1, Duration::ZERO);
    env.reset_with_attack("scan_attack").unwrap();

    env.client_mut().garbled_scores = 2;
    assert!(env.step(&[0]).is_ok());
    assert_eq!(env.client().garbled_scores, 0);
    assert_eq!(env.client().score_queries.len(), 1);
}

#[test]
fn test_reset_clears_history() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A"], 2), 3, Duration::ZERO);
    env.reset_with_attack("scan_attack").unwrap();
    env.step(&[0]).unwrap();
    env.step(&[0]).unwrap();
    assert_eq!(env.steps_taken(), 2);

    let (observation, _) = env.reset_with_attack("exploit_attack").unwrap();
    let stacked = observation.as_stacked().unwrap();
    assert_eq!(stacked.slice(s![0, 0, ..]), arr1(&[1.0, 1.0]));
    assert!(stacked.slice(s![0, 1.., ..]).iter().all(|&v| v == 0.0));
    assert_eq!(env.steps_taken(), 0);
    assert_eq!(env.current_attack(), Some("exploit_attack"));
}

#[test]
fn test_random_reset_uses_configured_attacks() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A", "B"], 2), 1, Duration::ZERO);
    env.seed(7);

    for _ in 0..5 {
        env.reset().unwrap();
        let attack = env.current_attack().unwrap().to_string();
        assert!(attack == "scan_attack" || attack == "exploit_attack");
    }
    assert_eq!(env.client().started.len(), 5);
}

#[test]
fn test_step_reports_backend_stats() {
    let (mut env, _dir) = build(ScriptedBackend::steady(&["A", "B"], 2), 1, Duration::ZERO);
    env.reset().unwrap();

    let actions = env.sample_actions();
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|&a| a < 3));

    let outcome = env.step(&actions).unwrap();
    assert_eq!(outcome.info.stats, StepStats { n_normal: 3.0, n_attack: 1.0, n_infected: 1 });
}
