//=========================================================================
// Global Context
//=========================================================================
//
// Shared world handles passed to every game component.
//
// Contains:
// - bus / timers: coordination (event bus, cooperative timers)
// - presenter / audio / settings / input: host collaborators
// - viewport / rng / config: world description and randomness
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

//=== Internal Dependencies ===============================================

use crate::core::config::GameConfig;
use crate::core::event_bus::EventBus;
use crate::core::input::{InputSource, SharedInput};
use crate::core::platform_bridge::{
    AudioSink, MemorySettings, NullPresenter, Presenter, SettingsStore, SilentAudio,
};
use crate::core::timer::TimerScheduler;
use crate::core::viewport::Viewport;

//=== GlobalContext =======================================================

/// Explicit world context replacing global singletons.
///
/// Cloning is cheap: every field is a shared handle, so all clones observe
/// the same bus, timers and collaborators. Components keep a clone and
/// never reach for each other directly.
#[derive(Clone)]
pub struct GlobalContext {
    /// Sole coordination channel between components.
    pub bus: EventBus,

    /// Frame-driven delays.
    pub timers: TimerScheduler,

    pub presenter: Rc<dyn Presenter>,
    pub audio: Rc<dyn AudioSink>,
    pub settings: Rc<dyn SettingsStore>,
    pub input: Rc<dyn InputSource>,

    pub viewport: Viewport,

    /// Seeded generator behind every random gameplay decision.
    pub rng: Rc<RefCell<StdRng>>,

    pub config: Rc<GameConfig>,
}

impl GlobalContext {
    /// Creates a context with inert collaborators.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self {
            bus: EventBus::new(),
            timers: TimerScheduler::with_default_variants(config.timer_pool_capacity),
            presenter: Rc::new(NullPresenter),
            audio: Rc::new(SilentAudio),
            settings: Rc::new(MemorySettings::new()),
            input: Rc::new(SharedInput::new()),
            viewport: Viewport::from_config(&config.viewport),
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(seed))),
            config: Rc::new(config),
        }
    }

    //--- Collaborators ----------------------------------------------------

    pub fn with_presenter(mut self, presenter: Rc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_audio(mut self, audio: Rc<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_settings(mut self, settings: Rc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_input(mut self, input: Rc<dyn InputSource>) -> Self {
        self.input = input;
        self
    }

    //--- Helpers ----------------------------------------------------------

    pub fn play_clip(&self, name: &str) {
        self.audio.play_clip(name);
    }

    /// Runs `f` with exclusive access to the shared generator.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        f(&mut self.rng.borrow_mut())
    }

    pub fn random_visible_position(&self) -> Vec2 {
        let viewport = self.viewport;
        self.with_rng(|rng| viewport.random_visible_position(rng))
    }
}

//=========================================================================
// Tests
//=========================================================================
