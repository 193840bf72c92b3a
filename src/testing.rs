//=========================================================================
// Test Doubles
//=========================================================================
//
// Recording collaborators and helpers shared by unit tests across modules.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;

//=== Internal Dependencies ===============================================

use crate::core::config::GameConfig;
use crate::core::event_bus::{Event, EventBus};
use crate::core::globals::GlobalContext;
use crate::core::input::SharedInput;
use crate::core::platform_bridge::{AudioSink, MemorySettings, Presenter};
use crate::game::EntityId;

//=== Collaborators =======================================================

/// Audio sink that remembers every clip it was asked to play.
#[derive(Default)]
pub(crate) struct RecordingAudio {
    clips: RefCell<Vec<String>>,
}

impl RecordingAudio {
    pub(crate) fn count(&self, name: &str) -> usize {
        self.clips.borrow().iter().filter(|clip| *clip == name).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play_clip(&self, name: &str) {
        self.clips.borrow_mut().push(name.to_owned());
    }
}

/// Presenter that keeps the latest visibility and transform of each entity.
#[derive(Default)]
pub(crate) struct RecordingPresenter {
    active: RefCell<HashMap<EntityId, bool>>,
    transforms: RefCell<HashMap<EntityId, (Vec2, f32)>>,
}

impl RecordingPresenter {
    pub(crate) fn is_active(&self, entity: EntityId) -> Option<bool> {
        self.active.borrow().get(&entity).copied()
    }

    pub(crate) fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.transforms.borrow().get(&entity).map(|(position, _)| *position)
    }
}

impl Presenter for RecordingPresenter {
    fn set_active(&self, entity: EntityId, active: bool) {
        self.active.borrow_mut().insert(entity, active);
    }

    fn set_transform(&self, entity: EntityId, position: Vec2, rotation: f32) {
        self.transforms.borrow_mut().insert(entity, (position, rotation));
    }
}

//=== Harness =============================================================

/// A context wired to recording doubles, plus handles to inspect them.
pub(crate) struct TestWorld {
    pub(crate) ctx: GlobalContext,
    pub(crate) audio: Rc<RecordingAudio>,
    pub(crate) presenter: Rc<RecordingPresenter>,
    pub(crate) settings: Rc<MemorySettings>,
    pub(crate) input: Rc<SharedInput>,
}

impl TestWorld {
    pub(crate) fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub(crate) fn with_config(config: GameConfig) -> Self {
        let audio = Rc::new(RecordingAudio::default());
        let presenter = Rc::new(RecordingPresenter::default());
        let settings = Rc::new(MemorySettings::new());
        let input = Rc::new(SharedInput::new());

        let ctx = GlobalContext::new(config, 0xA57E)
            .with_audio(audio.clone())
            .with_presenter(presenter.clone())
            .with_settings(settings.clone())
            .with_input(input.clone());

        Self {
            ctx,
            audio,
            presenter,
            settings,
            input,
        }
    }
}

/// Collects every `E` published on `bus` from now on.
pub(crate) fn record<E: Event + Clone>(bus: &EventBus) -> Rc<RefCell<Vec<E>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    bus.subscribe(move |event: &E| sink.borrow_mut().push(event.clone()))
        .expect("recorder subscription");
    log
}
