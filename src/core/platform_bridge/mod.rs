//=========================================================================
// Platform Bridge
//=========================================================================
//
// Bridges the host application (renderer, physics, audio, storage, UI)
// with the core.
//
// The core never talks to a concrete backend: collaborators are reached
// through narrow traits, and anything the host reports back arrives as a
// `HostEvent` on a bounded channel drained at the start of each frame.
//
// Components:
// - `interface`: Host events and collaborator traits (the contract)
// - `event_collector`: Core-side draining and batching of host events
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod event_collector;
pub(crate) mod interface;

//=== Public API ==========================================================

pub use event_collector::TickControl;
pub use interface::{
    AudioSink, HostEvent, MemorySettings, NullPresenter, Presenter, SettingsStore, SilentAudio,
};

/// Sending half of the host event channel.
pub type HostSender = crossbeam_channel::Sender<HostEvent>;

//=== Internal API ========================================================

pub(crate) use event_collector::EventCollector;
pub(crate) use interface::HostCommand;
