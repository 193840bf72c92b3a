//=========================================================================
// Round State Machine
//=========================================================================
//
// Owns lives, score, round number and the game state, and drives the
// round/life cycle through two countdown timers.
//
//   StartGame → StartFirstRound ─(respawn delay)→ ShipSpawned
//                                                   │
//               ┌──── PlayerDied ←─ ship destroyed ─┤ (lives left)
//               │           └─(respawn delay)→ ShipSpawned
//               │
//               └──── field cleared → RoundOver ─(next-round delay)→ StartRound
//
//   ship destroyed with no lives left → GameOver
//
// Every transition is committed before `GameStateChanged` is published.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};

//=== Internal Dependencies ===============================================

use super::events::{
    AsteroidDestroyed, AsteroidFieldCleared, EnemyShipDestroyed, GameStateChanged, LivesChanged,
    PauseChanged, PlayerShipDestroyed, ScoreChanged,
};
use super::wiring::{on_stop_weak, subscribe_weak, OwnedTimer};
use crate::core::error::CoreError;
use crate::core::event_bus::Subscription;
use crate::core::globals::GlobalContext;
use crate::core::timer::TimerVariant;

//=== GameState ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    StartGame,
    StartFirstRound,
    StartRound,
    ShipSpawned,
    PlayerDied,
    RoundOver,
    GameOver,
}

//=== Round Data ==========================================================

#[derive(Debug)]
struct RoundData {
    state: GameState,
    round: u32,
    score: u64,
    high_score: u64,
    lives: u32,
    next_extra_life: u64,
    paused: bool,
    spawn_ship_timer: Option<OwnedTimer>,
    next_round_timer: Option<OwnedTimer>,
}

struct RoundShared {
    ctx: GlobalContext,
    data: RefCell<RoundData>,
    subscriptions: RefCell<Vec<Subscription>>,
}

//=== RoundStateMachine ===================================================

/// Round/life state machine.
///
/// State is only mutated here; everything else learns about it through
/// `GameStateChanged`, `ScoreChanged` and `LivesChanged`.
pub struct RoundStateMachine {
    shared: Rc<RoundShared>,
}

impl RoundStateMachine {
    /// Creates the machine and subscribes it to scoring and lifecycle events.
    pub fn new(ctx: &GlobalContext) -> Result<Self, CoreError> {
        let shared = Rc::new(RoundShared {
            ctx: ctx.clone(),
            data: RefCell::new(RoundData {
                state: GameState::StartGame,
                round: 0,
                score: 0,
                high_score: 0,
                lives: ctx.config.round.starting_lives,
                next_extra_life: ctx.config.round.extra_life_step,
                paused: false,
                spawn_ship_timer: None,
                next_round_timer: None,
            }),
            subscriptions: RefCell::new(Vec::new()),
        });

        let bus = &ctx.bus;
        let subscriptions = vec![
            subscribe_weak(bus, &shared, |round, _: &AsteroidFieldCleared| {
                round.round_over()
            })?,
            subscribe_weak(bus, &shared, |round, _: &PlayerShipDestroyed| {
                round.player_died()
            })?,
            subscribe_weak(bus, &shared, |round, e: &AsteroidDestroyed| {
                if e.points > 0 {
                    round.add_points(e.points);
                }
            })?,
            subscribe_weak(bus, &shared, |round, e: &EnemyShipDestroyed| {
                if e.points > 0 {
                    round.add_points(e.points);
                }
            })?,
        ];
        *shared.subscriptions.borrow_mut() = subscriptions;

        Ok(Self { shared })
    }

    //--- Commands ---------------------------------------------------------

    /// Loads the persisted high score and starts the first game.
    pub fn start(&self) -> Result<(), CoreError> {
        let config = &self.shared.ctx.config.round;
        let stored = self.shared.ctx.settings.get_i64(&config.high_score_key, 0);
        self.shared.data.borrow_mut().high_score = stored.max(0) as u64;
        self.shared.start_game()
    }

    /// Abandons the current game and starts a fresh one.
    pub fn restart_game(&self) -> Result<(), CoreError> {
        info!("Restarting game");
        self.shared.release_timers();
        self.shared.start_game()
    }

    /// Awards points (zero is allowed and still publishes the score).
    pub fn add_points(&self, points: u64) {
        self.shared.add_points(points);
    }

    pub fn pause(&self) {
        self.shared.set_paused(true);
    }

    pub fn resume(&self) {
        self.shared.set_paused(false);
    }

    //--- Queries ----------------------------------------------------------

    pub fn state(&self) -> GameState {
        self.shared.data.borrow().state
    }

    pub fn round(&self) -> u32 {
        self.shared.data.borrow().round
    }

    pub fn score(&self) -> u64 {
        self.shared.data.borrow().score
    }

    pub fn high_score(&self) -> u64 {
        self.shared.data.borrow().high_score
    }

    pub fn lives(&self) -> u32 {
        self.shared.data.borrow().lives
    }

    pub fn is_paused(&self) -> bool {
        self.shared.data.borrow().paused
    }
}

//=== Transitions =========================================================

impl RoundShared {
    fn start_game(self: &Rc<Self>) -> Result<(), CoreError> {
        info!("Starting game");
        let lives = {
            let config = &self.ctx.config.round;
            let mut data = self.data.borrow_mut();
            data.lives = config.starting_lives;
            data.score = 0;
            data.round = 0;
            data.next_extra_life = config.extra_life_step;
            data.lives
        };
        self.ctx.bus.publish(LivesChanged { lives });
        self.set_paused(false);
        self.set_state(GameState::StartGame);
        self.start_first_round()
    }

    fn start_first_round(self: &Rc<Self>) -> Result<(), CoreError> {
        if self.data.borrow().state == GameState::StartFirstRound {
            return Ok(());
        }

        self.create_timers()?;
        self.data.borrow_mut().round += 1;
        self.add_points(0);
        self.set_state(GameState::StartFirstRound);
        self.start_spawn_ship_timer();
        Ok(())
    }

    fn create_timers(self: &Rc<Self>) -> Result<(), CoreError> {
        self.release_timers();
        let timers = &self.ctx.timers;

        let handle = timers.create(TimerVariant::Countdown, self.ctx.config.round.respawn_delay)?;
        let callback = on_stop_weak(timers, handle, self, |round| round.spawn_ship())?;
        let spawn_ship_timer = OwnedTimer { handle, callback };

        let handle = timers.create(TimerVariant::Countdown, self.ctx.config.round.next_round_delay)?;
        let callback = on_stop_weak(timers, handle, self, |round| round.start_next_round())?;
        let next_round_timer = OwnedTimer { handle, callback };

        let mut data = self.data.borrow_mut();
        data.spawn_ship_timer = Some(spawn_ship_timer);
        data.next_round_timer = Some(next_round_timer);
        Ok(())
    }

    fn release_timers(&self) {
        let (spawn_ship, next_round) = {
            let mut data = self.data.borrow_mut();
            (data.spawn_ship_timer.take(), data.next_round_timer.take())
        };
        for timer in [spawn_ship, next_round].into_iter().flatten() {
            timer.release(&self.ctx.timers);
        }
    }

    fn start_spawn_ship_timer(&self) {
        let timer = self.data.borrow().spawn_ship_timer;
        if let Some(timer) = timer {
            // Timers are released only alongside the state that owns them.
            let _ = self
                .ctx
                .timers
                .start(timer.handle, Some(self.ctx.config.round.respawn_delay));
        }
    }

    fn spawn_ship(&self) {
        let lives = {
            let mut data = self.data.borrow_mut();
            data.lives = data.lives.saturating_sub(1);
            data.lives
        };
        self.ctx.bus.publish(LivesChanged { lives });
        self.set_state(GameState::ShipSpawned);
        self.ctx.play_clip(&self.ctx.config.audio.game);
    }

    fn player_died(&self) {
        let (state, lives) = {
            let data = self.data.borrow();
            (data.state, data.lives)
        };
        if state == GameState::GameOver {
            return;
        }

        info!("Player died ({} lives left)", lives);
        if lives > 0 {
            self.set_state(GameState::PlayerDied);
            self.start_spawn_ship_timer();
        } else {
            self.game_over();
        }
    }

    fn game_over(&self) {
        self.release_timers();
        self.set_state(GameState::GameOver);
        self.ctx.play_clip(&self.ctx.config.audio.game_over);

        let high_score = self.data.borrow().high_score;
        self.ctx
            .settings
            .set_i64(&self.ctx.config.round.high_score_key, high_score as i64);
        info!("Game over (high score {})", high_score);
    }

    fn round_over(&self) {
        let (state, timer) = {
            let data = self.data.borrow();
            (data.state, data.next_round_timer)
        };
        if matches!(
            state,
            GameState::GameOver | GameState::StartGame | GameState::RoundOver
        ) {
            debug!("Ignoring field cleared in {:?}", state);
            return;
        }

        self.set_state(GameState::RoundOver);
        if let Some(timer) = timer {
            let _ = self
                .ctx
                .timers
                .start(timer.handle, Some(self.ctx.config.round.next_round_delay));
        }
    }

    fn start_next_round(&self) {
        let round = {
            let mut data = self.data.borrow_mut();
            data.round += 1;
            data.round
        };
        info!("Starting round {}", round);
        self.set_state(GameState::StartRound);
    }

    fn add_points(&self, points: u64) {
        let step = self.ctx.config.round.extra_life_step;
        let (score, high_score) = {
            let mut data = self.data.borrow_mut();
            data.score += points;
            data.high_score = data.high_score.max(data.score);
            (data.score, data.high_score)
        };
        self.ctx.bus.publish(ScoreChanged { score, high_score });

        if step == 0 {
            return;
        }
        loop {
            let lives = {
                let mut data = self.data.borrow_mut();
                if data.score < data.next_extra_life {
                    break;
                }
                data.next_extra_life += step;
                data.lives += 1;
                data.lives
            };
            info!("Extra life awarded ({} lives)", lives);
            self.ctx.play_clip(&self.ctx.config.audio.extra_life);
            self.ctx.bus.publish(LivesChanged { lives });
        }
    }

    fn set_paused(&self, paused: bool) {
        {
            let mut data = self.data.borrow_mut();
            if data.paused == paused {
                return;
            }
            data.paused = paused;
        }
        self.ctx.bus.publish(PauseChanged { paused });
    }

    fn set_state(&self, state: GameState) {
        let round = {
            let mut data = self.data.borrow_mut();
            data.state = state;
            data.round
        };
        debug!("Game state → {:?} (round {})", state, round);
        self.ctx.bus.publish(GameStateChanged { state, round });
    }
}

//=== Teardown ============================================================

impl Drop for RoundShared {
    fn drop(&mut self) {
        for subscription in self.subscriptions.take() {
            self.ctx.bus.unsubscribe(subscription);
        }
        self.release_timers();
    }
}

//=========================================================================
// Tests
//=========================================================================
