//! AIM Sensors - Environment driver
//!
//! Connects to one simulator backend, calibrates it if needed and runs a
//! uniform random policy. Learning algorithms plug in where the policy is.

use aim_sensors_env::constants;
use aim_sensors_env::{EnvConfig, EpisodeController, HttpConfig, HttpTelemetryClient, JsonFileStore};

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting AIM Sensors environment v{}...", constants::APP_VERSION);

    let config = EnvConfig::from_env();
    log::info!("   Backend: {}", config.backend_addr);
    log::info!("   Attacks: {}", config.attack_vectors.join(", "));
    log::info!("   Stack size: {}, step delay: {:?}", config.stack_size, config.delay);

    if let Err(e) = run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: EnvConfig) -> aim_sensors_env::EnvResult<()> {
    let client = HttpTelemetryClient::new(HttpConfig {
        address: config.backend_addr.clone(),
        ..Default::default()
    });
    let store = JsonFileStore::new(config.cfg_dir.clone());

    let mut env = EpisodeController::new(client, config, &store)?;
    log::info!("Observation shape per flow: {:?}, {} actions",
        env.observation_space().shape(), env.action_space().len());

    let episodes = constants::get_driver_episodes();
    let steps = constants::get_driver_episode_steps();

    for episode in 0..episodes {
        env.reset()?;
        let mut reward_sum = 0.0f64;
        let mut last_stats = None;

        for _ in 0..steps {
            let actions = env.sample_actions();
            let outcome = env.step(&actions)?;
            reward_sum += outcome.rewards.mean() as f64;
            last_stats = Some(outcome.info.stats);
        }

        let mean_reward = if steps > 0 { reward_sum / steps as f64 } else { 0.0 };
        match last_stats {
            Some(stats) => log::info!(
                "Episode {}/{} ({}): mean reward {:.4}, normal {}, attack {}, infected {}",
                episode + 1, episodes, env.current_attack().unwrap_or("-"),
                mean_reward, stats.n_normal, stats.n_attack, stats.n_infected
            ),
            None => log::info!("Episode {}/{}: no steps taken", episode + 1, episodes),
        }
    }

    Ok(())
}
