//! Fixed-cadence game loop.
//!
//! Each loop tick:
//! 1. Wait for the interval (or Ctrl-C)
//! 2. Measure the real delta and clamp it to `timing.max_delta_ms`
//! 3. Advance the game
//! 4. Log phase changes and the periodic status line
//! 5. On game over, restart or stop

use std::time::Duration;

use skeld_core::game::Game;
use skeld_types::GamePhase;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::args::EngineArgs;

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A game ended and restarts are off.
    GameOver,
    /// `--ticks` was reached.
    TickLimit,
    /// Ctrl-C.
    Interrupted,
}

/// Summary of one loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Loop ticks executed.
    pub ticks: u64,
    /// Games that reached game over.
    pub games_finished: u32,
    /// Why the loop stopped.
    pub reason: StopReason,
}

/// Drive `game` until it ends, the tick budget runs out, or Ctrl-C.
///
/// The game must already be started.
pub async fn run(game: &mut Game, args: &EngineArgs) -> RunOutcome {
    let timing = game.config().timing.clone();
    let mut ticker = interval(Duration::from_millis(timing.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticks: u64 = 0;
    let mut games_finished: u32 = 0;
    let mut last = Instant::now();
    let mut last_phase = game.phase();
    let mut next_status = timing.status_interval_ms;

    loop {
        if args.max_ticks.is_some_and(|max| ticks >= max) {
            return RunOutcome {
                ticks,
                games_finished,
                reason: StopReason::TickLimit,
            };
        }

        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "ctrl-c listener failed");
                }
                info!(ticks, "interrupted");
                return RunOutcome {
                    ticks,
                    games_finished,
                    reason: StopReason::Interrupted,
                };
            }
        }

        let now = Instant::now();
        let dt = u64::try_from(now.duration_since(last).as_millis())
            .unwrap_or(u64::MAX)
            .min(timing.max_delta_ms);
        last = now;
        game.update(dt);
        ticks = ticks.saturating_add(1);

        let phase = game.phase();
        if phase != last_phase {
            info!(from = %last_phase, to = %phase, elapsed_ms = game.elapsed_ms(), "phase change");
            last_phase = phase;
        }

        if timing.status_interval_ms > 0 && game.elapsed_ms() >= next_status {
            info!(status = %game.status_line(), "status");
            next_status = next_status.saturating_add(timing.status_interval_ms);
        }

        if phase == GamePhase::GameOver {
            games_finished = games_finished.saturating_add(1);
            info!(
                winner = ?game.winner(),
                reason = game.game_over_reason().unwrap_or_default(),
                status = %game.status_line(),
                "game finished"
            );
            if !args.restart {
                return RunOutcome {
                    ticks,
                    games_finished,
                    reason: StopReason::GameOver,
                };
            }
            game.restart();
            last_phase = game.phase();
            next_status = timing.status_interval_ms;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skeld_core::config::GameConfig;
    use skeld_core::decision::OfflineProvider;
    use skeld_types::Role;

    use super::*;

    fn make_game(yaml: &str) -> Game {
        let config = GameConfig::parse(yaml).unwrap();
        let mut game = Game::new(config, Box::new(OfflineProvider::new())).unwrap();
        assert!(game.start());
        game
    }

    fn disarm_impostors(game: &mut Game) {
        for agent in game.agents_mut() {
            if agent.role == Role::Impostor {
                agent.alive = false;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tick_limit_bounds_the_run() {
        let mut game = make_game("game:\n  seed: 5\n");
        let args = EngineArgs {
            restart: false,
            max_ticks: Some(50),
        };
        let outcome = run(&mut game, &args).await;
        assert_eq!(outcome.ticks, 50);
        assert_eq!(outcome.reason, StopReason::TickLimit);
        assert_eq!(outcome.games_finished, 0);
        assert_eq!(game.phase(), GamePhase::Starting);
    }

    #[tokio::test(start_paused = true)]
    async fn game_over_stops_without_loop() {
        let mut game = make_game("timing:\n  start_delay_ms: 0\n");
        disarm_impostors(&mut game);
        let args = EngineArgs {
            restart: false,
            max_ticks: Some(100),
        };
        let outcome = run(&mut game, &args).await;
        assert_eq!(outcome.reason, StopReason::GameOver);
        assert_eq!(outcome.games_finished, 1);
        assert_eq!(game.phase(), GamePhase::GameOver);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_flag_restarts_after_game_over() {
        let mut game = make_game("timing:\n  start_delay_ms: 0\n");
        disarm_impostors(&mut game);
        let args = EngineArgs {
            restart: true,
            max_ticks: Some(20),
        };
        let outcome = run(&mut game, &args).await;
        assert_eq!(outcome.reason, StopReason::TickLimit);
        assert_eq!(outcome.games_finished, 1);
        assert_ne!(game.phase(), GamePhase::GameOver);
        assert!(
            game.agents()
                .iter()
                .any(|a| a.role == Role::Impostor && a.alive)
        );
    }
}
