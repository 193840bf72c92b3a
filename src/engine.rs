//=========================================================================
// Arcade Runtime Engine
//
// Main entry point and frame driver for the runtime.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──start()──>  first game
//         │                          │
//         ├─ with_config()           └─ advance(dt) once per host frame
//         ├─ with_seed()                 ├─ drain host events
//         ├─ with_channel_capacity()     ├─ apply commands (paused → stop)
//         └─ with_presenter() / ...      └─ GlobalSystems pipeline
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;

use crossbeam_channel::{bounded, TrySendError};
use log::{info, warn};

//=== Internal Dependencies ===============================================

use crate::core::config::GameConfig;
use crate::core::error::CoreError;
use crate::core::globals::{GlobalContext, GlobalSystems};
use crate::core::input::InputSource;
use crate::core::platform_bridge::{
    AudioSink, EventCollector, HostCommand, HostEvent, HostSender, Presenter, SettingsStore,
    TickControl,
};
use crate::game::round::RoundStateMachine;
use crate::game::EntityId;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// Collaborators that are not supplied fall back to inert defaults: no
/// presentation, no audio, in-memory settings and an idle input source.
///
/// # Default Values
///
/// - **Config**: `GameConfig::default()`
/// - **Seed**: 0
/// - **Channel capacity**: 128 host events
///
/// # Examples
///
/// ```no_run
/// use arcade_runtime::prelude::*;
///
/// let mut engine = EngineBuilder::new()
///     .with_seed(7)
///     .with_channel_capacity(256)
///     .build()?;
///
/// engine.start()?;
/// while engine.advance(1.0 / 60.0)? == TickControl::Continue {}
/// # Ok::<(), arcade_runtime::core::error::CoreError>(())
/// ```
pub struct EngineBuilder {
    config: GameConfig,
    seed: u64,
    channel_capacity: usize,
    presenter: Option<Rc<dyn Presenter>>,
    audio: Option<Rc<dyn AudioSink>>,
    settings: Option<Rc<dyn SettingsStore>>,
    input: Option<Rc<dyn InputSource>>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: GameConfig::default(),
            seed: 0,
            channel_capacity: 128,
            presenter: None,
            audio: None,
            settings: None,
            input: None,
        }
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds every random gameplay decision. Equal seeds and equal inputs
    /// replay equal games.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the capacity of the host → core event channel.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    //--- Collaborators ----------------------------------------------------

    pub fn with_presenter(mut self, presenter: Rc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_audio(mut self, audio: Rc<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_settings(mut self, settings: Rc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_input(mut self, input: Rc<dyn InputSource>) -> Self {
        self.input = Some(input);
        self
    }

    /// Builds the engine and wires every component.
    ///
    /// Fails if a component cannot register its subscriptions or timers.
    pub fn build(self) -> Result<Engine, CoreError> {
        info!(
            "Building engine (seed: {}, channel: {})",
            self.seed, self.channel_capacity
        );

        let mut ctx = GlobalContext::new(self.config, self.seed);
        if let Some(presenter) = self.presenter {
            ctx = ctx.with_presenter(presenter);
        }
        if let Some(audio) = self.audio {
            ctx = ctx.with_audio(audio);
        }
        if let Some(settings) = self.settings {
            ctx = ctx.with_settings(settings);
        }
        if let Some(input) = self.input {
            ctx = ctx.with_input(input);
        }

        let (sender, receiver) = bounded(self.channel_capacity);
        let systems = GlobalSystems::new(&ctx)?;

        Ok(Engine {
            ctx,
            systems,
            collector: EventCollector::new(receiver),
            sender,
            started: false,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Arcade runtime.
///
/// Single-threaded and frame driven: the host calls [`Engine::advance`]
/// once per frame with the elapsed time, and reports collisions and
/// commands either through the direct methods or through a
/// [`HostSender`] obtained from [`Engine::host_sender`].
///
/// # Architecture
///
/// ```text
/// Host (render / physics / UI)
///   ├─► HostEvent channel ─► EventCollector ─► commands, collisions
///   └─► advance(dt)
///         └─► GlobalSystems: timers → collisions → player → movement
///                            → screen wrap → presenter sync
/// ```
pub struct Engine {
    ctx: GlobalContext,
    systems: GlobalSystems,
    collector: EventCollector,
    sender: HostSender,
    started: bool,
}

impl Engine {
    //--- Lifecycle --------------------------------------------------------

    /// Loads the high score and starts the first game. Later calls are
    /// ignored; use [`Engine::restart_game`] to begin a new game.
    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.started {
            warn!("Engine already started");
            return Ok(());
        }
        info!("Starting engine");
        self.systems.round.start()?;
        self.started = true;
        Ok(())
    }

    /// Advances the runtime by one frame of `dt` seconds.
    ///
    /// Returns [`TickControl::Exit`] once the host sent
    /// [`HostEvent::Shutdown`]. The engine keeps a sender of its own, so the
    /// channel stays open for as long as the engine lives. A paused engine
    /// drains host events and applies commands but runs no game logic.
    pub fn advance(&mut self, dt: f32) -> Result<TickControl, CoreError> {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!("Ignoring invalid frame time {}", dt);
            0.0
        };

        //--- Step 1: Gather host events ------------------------------------
        if let TickControl::Exit = self.collector.collect_frame() {
            info!("Engine exiting");
            return Ok(TickControl::Exit);
        }

        //--- Step 2: Apply commands ----------------------------------------
        for command in self.collector.take_commands() {
            match command {
                HostCommand::Restart => self.restart_game()?,
                HostCommand::Pause => self.pause(),
                HostCommand::Resume => self.resume(),
            }
        }

        if self.systems.round.is_paused() {
            return Ok(TickControl::Continue);
        }

        //--- Step 3: Run the frame -----------------------------------------
        let collisions = self.collector.take_collisions();
        self.systems.update(&self.ctx, dt, &collisions);

        Ok(TickControl::Continue)
    }

    //--- Commands ---------------------------------------------------------

    pub fn restart_game(&mut self) -> Result<(), CoreError> {
        self.started = true;
        self.systems.round.restart_game()
    }

    pub fn pause(&self) {
        self.systems.round.pause();
    }

    pub fn resume(&self) {
        self.systems.round.resume();
    }

    /// Queues a contact between two entities for the next frame. Returns
    /// false if the channel is full and the contact was dropped.
    pub fn report_collision(&self, a: EntityId, b: EntityId) -> bool {
        match self.sender.try_send(HostEvent::Collision(a, b)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Host event channel full; contact {:?} / {:?} dropped", a, b);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    //--- Accessors --------------------------------------------------------

    /// Sender the host can clone onto its own callbacks.
    pub fn host_sender(&self) -> HostSender {
        self.sender.clone()
    }

    pub fn context(&self) -> &GlobalContext {
        &self.ctx
    }

    pub fn systems(&self) -> &GlobalSystems {
        &self.systems
    }

    pub fn round(&self) -> &RoundStateMachine {
        &self.systems.round
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform_bridge::MemorySettings;
    use crate::game::events::{AsteroidDestroyed, GameStateChanged, LivesChanged, PauseChanged};
    use crate::game::round::GameState;
    use crate::game::spawners::EntitySpawner;
    use crate::game::{AsteroidSize, BulletOwner};
    use crate::testing::{record, RecordingAudio};
    use glam::Vec2;

    fn count_state(states: &[GameStateChanged], state: GameState) -> usize {
        states.iter().filter(|e| e.state == state).count()
    }

    //=====================================================================
    // EngineBuilder Tests
    //=====================================================================

    #[test]
    fn builder_defaults() {
        let builder = EngineBuilder::new();
        assert_eq!(builder.seed, 0);
        assert_eq!(builder.channel_capacity, 128);
        assert_eq!(builder.config, GameConfig::default());
    }

    #[test]
    fn builder_with_channel_capacity() {
        let builder = EngineBuilder::new().with_channel_capacity(256);
        assert_eq!(builder.channel_capacity, 256);
    }

    #[test]
    #[should_panic(expected = "Channel capacity must be positive")]
    fn builder_with_channel_capacity_panics_on_zero() {
        EngineBuilder::new().with_channel_capacity(0);
    }

    #[test]
    fn engine_builds_idle() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.round().state(), GameState::StartGame);
        assert_eq!(engine.round().lives(), 3);
        assert_eq!(engine.systems().asteroids.active_count(), 0);
    }

    //=====================================================================
    // Frame Driving Tests
    //=====================================================================

    #[test]
    fn shutdown_event_exits() {
        let mut engine = EngineBuilder::new().build().unwrap();
        engine.start().unwrap();
        assert_eq!(engine.advance(0.016).unwrap(), TickControl::Continue);

        engine.host_sender().send(HostEvent::Shutdown).unwrap();
        assert_eq!(engine.advance(0.016).unwrap(), TickControl::Exit);
    }

    #[test]
    fn pause_freezes_the_whole_frame() {
        let mut engine = EngineBuilder::new().build().unwrap();
        let pauses = record::<PauseChanged>(&engine.context().bus);
        engine.start().unwrap();

        engine.host_sender().send(HostEvent::Pause).unwrap();
        engine.advance(10.0).unwrap();
        assert_eq!(engine.round().state(), GameState::StartFirstRound);

        engine.resume();
        engine.advance(2.0).unwrap();
        assert_eq!(engine.round().state(), GameState::ShipSpawned);
        let paused: Vec<bool> = pauses.borrow().iter().map(|e| e.paused).collect();
        assert_eq!(paused, vec![true, false]);
    }

    #[test]
    fn invalid_frame_time_is_treated_as_zero() {
        let mut engine = EngineBuilder::new().build().unwrap();
        engine.start().unwrap();

        engine.advance(f32::NAN).unwrap();
        engine.advance(-1.0).unwrap();
        assert_eq!(engine.round().state(), GameState::StartFirstRound);
    }

    //=====================================================================
    // Game Flow Tests
    //=====================================================================

    #[test]
    fn three_lives_then_game_over() {
        let settings = Rc::new(MemorySettings::new());
        let audio = Rc::new(RecordingAudio::default());
        let mut engine = EngineBuilder::new()
            .with_settings(settings.clone())
            .with_audio(audio.clone())
            .build()
            .unwrap();
        let lives = record::<LivesChanged>(&engine.context().bus);
        let states = record::<GameStateChanged>(&engine.context().bus);
        engine.start().unwrap();

        for _ in 0..3 {
            // Respawn, then wait out the invulnerability window.
            engine.advance(2.0).unwrap();
            assert_eq!(engine.round().state(), GameState::ShipSpawned);
            engine.advance(3.0).unwrap();

            let rock = engine
                .systems()
                .asteroids
                .asteroids()
                .into_iter()
                .find(|id| matches!(id, EntityId::Asteroid(AsteroidSize::Large, _)))
                .unwrap();
            assert!(engine.report_collision(EntityId::Ship, rock));
            engine.advance(0.0).unwrap();
        }

        let lives: Vec<u32> = lives.borrow().iter().map(|e| e.lives).collect();
        assert_eq!(lives, vec![3, 2, 1, 0]);
        assert_eq!(count_state(&states.borrow(), GameState::GameOver), 1);
        assert_eq!(engine.round().state(), GameState::GameOver);
        assert_eq!(engine.systems().asteroids.active_count(), 0);

        let score = engine.round().score();
        assert_eq!(score, 60);
        assert_eq!(settings.get_i64("HighScore", 0), score as i64);
        assert_eq!(audio.count("GameOver"), 1);
        assert_eq!(audio.count("Game"), 3);
    }

    #[test]
    fn big_award_grants_every_extra_life() {
        let audio = Rc::new(RecordingAudio::default());
        let mut engine = EngineBuilder::new().with_audio(audio.clone()).build().unwrap();
        let lives = record::<LivesChanged>(&engine.context().bus);
        engine.start().unwrap();

        engine.round().add_points(25_000);

        let lives: Vec<u32> = lives.borrow().iter().map(|e| e.lives).collect();
        assert_eq!(lives, vec![3, 4, 5]);
        assert_eq!(audio.count("ExtraLife"), 2);
    }

    #[test]
    fn field_clears_after_the_last_small_asteroid() {
        let mut engine = EngineBuilder::new().with_seed(42).build().unwrap();
        let destroyed = record::<AsteroidDestroyed>(&engine.context().bus);
        let states = record::<GameStateChanged>(&engine.context().bus);
        engine.start().unwrap();
        engine.advance(2.0).unwrap();
        assert_eq!(engine.systems().asteroids.active_count(), 4);

        loop {
            let Some(rock) = engine.systems().asteroids.asteroids().first().copied() else {
                break;
            };
            assert_eq!(count_state(&states.borrow(), GameState::RoundOver), 0);

            let bullet = engine
                .systems()
                .projectiles
                .fire(BulletOwner::Player, Vec2::ZERO, Vec2::Y)
                .unwrap();
            engine.report_collision(bullet, rock);
            engine.advance(0.0).unwrap();
        }

        // 4 Large → 8 Medium → 16 Small.
        assert_eq!(destroyed.borrow().len(), 28);
        assert_eq!(count_state(&states.borrow(), GameState::RoundOver), 1);
        assert_eq!(engine.round().score(), 4 * 20 + 8 * 50 + 16 * 100);

        engine.advance(3.0).unwrap();
        assert_eq!(engine.round().state(), GameState::StartRound);
        assert_eq!(engine.round().round(), 2);
        assert_eq!(engine.systems().asteroids.active_count(), 5);
    }

    #[test]
    fn restart_command_starts_a_fresh_game() {
        let mut engine = EngineBuilder::new().build().unwrap();
        engine.start().unwrap();
        engine.advance(2.0).unwrap();
        engine.round().add_points(500);

        engine.host_sender().send(HostEvent::Restart).unwrap();
        engine.advance(0.0).unwrap();

        assert_eq!(engine.round().state(), GameState::StartFirstRound);
        assert_eq!(engine.round().score(), 0);
        assert_eq!(engine.round().lives(), 3);
        assert_eq!(engine.systems().asteroids.active_count(), 4);
    }
}
