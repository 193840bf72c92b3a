//=========================================================================
// Event Collector
//=========================================================================
//
// Host event collector with bounded draining and shutdown detection.
//
// Architecture:
//   Receiver<HostEvent> → collect_frame() → collisions + commands → TickControl
//
// Bounded draining keeps one flooded frame from stalling the tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::{info, warn};

//=== Internal Dependencies ===============================================

use super::{HostCommand, HostEvent};
use crate::game::EntityId;

//=== TickControl =========================================================

/// Frame control signal returned by `Engine::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Exit,
}

//=== EventCollector ======================================================

/// Drains host events into per-frame collision and command batches.
pub(crate) struct EventCollector {
    receiver: Receiver<HostEvent>,
    collisions: Vec<(EntityId, EntityId)>,
    commands: Vec<HostCommand>,
}

impl EventCollector {
    const MAX_EVENTS_PER_FRAME: usize = 256;

    pub(crate) fn new(receiver: Receiver<HostEvent>) -> Self {
        Self {
            receiver,
            collisions: Vec::with_capacity(16),
            commands: Vec::with_capacity(4),
        }
    }

    /// Collects pending host events (bounded to prevent starvation).
    pub(crate) fn collect_frame(&mut self) -> TickControl {
        self.collisions.clear();
        self.commands.clear();
        let mut drained = 0;

        while drained < Self::MAX_EVENTS_PER_FRAME {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.handle_event(event) == TickControl::Exit {
                        return TickControl::Exit;
                    }
                    drained += 1;
                }
                Err(TryRecvError::Disconnected) => return TickControl::Exit,
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= Self::MAX_EVENTS_PER_FRAME {
            warn!("Host event backlog: drained {} events this frame", drained);
        }

        TickControl::Continue
    }

    /// Takes this frame's collision pairs, leaving an empty vec.
    pub(crate) fn take_collisions(&mut self) -> Vec<(EntityId, EntityId)> {
        std::mem::take(&mut self.collisions)
    }

    /// Takes this frame's commands, leaving an empty vec.
    pub(crate) fn take_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    fn handle_event(&mut self, event: HostEvent) -> TickControl {
        match event {
            HostEvent::Collision(a, b) => self.collisions.push((a, b)),
            HostEvent::Restart => self.commands.push(HostCommand::Restart),
            HostEvent::Pause => self.commands.push(HostCommand::Pause),
            HostEvent::Resume => self.commands.push(HostCommand::Resume),
            HostEvent::Shutdown => {
                info!("Host requested shutdown");
                return TickControl::Exit;
            }
        }
        TickControl::Continue
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::PoolHandle;
    use crate::game::AsteroidSize;
    use crossbeam_channel::unbounded;

    #[test]
    fn collect_handles_empty_queue() {
        let (_tx, rx) = unbounded::<HostEvent>();
        let mut collector = EventCollector::new(rx);

        assert_eq!(collector.collect_frame(), TickControl::Continue);
        assert!(collector.take_collisions().is_empty());
        assert!(collector.take_commands().is_empty());
    }

    #[test]
    fn collect_splits_collisions_from_commands() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);
        let rock = EntityId::Asteroid(AsteroidSize::Large, PoolHandle::default());

        tx.send(HostEvent::Collision(EntityId::Ship, rock)).unwrap();
        tx.send(HostEvent::Pause).unwrap();
        tx.send(HostEvent::Restart).unwrap();

        assert_eq!(collector.collect_frame(), TickControl::Continue);
        assert_eq!(collector.take_collisions(), vec![(EntityId::Ship, rock)]);
        assert_eq!(
            collector.take_commands(),
            vec![HostCommand::Pause, HostCommand::Restart]
        );
    }

    #[test]
    fn collect_clears_previous_batches() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);

        tx.send(HostEvent::Resume).unwrap();
        collector.collect_frame();
        collector.collect_frame();
        assert!(collector.take_commands().is_empty());
    }

    #[test]
    fn collect_returns_exit_on_shutdown() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);

        tx.send(HostEvent::Shutdown).unwrap();

        assert_eq!(collector.collect_frame(), TickControl::Exit);
    }

    #[test]
    fn collect_returns_exit_on_disconnect() {
        let (tx, rx) = unbounded::<HostEvent>();
        let mut collector = EventCollector::new(rx);

        drop(tx);

        assert_eq!(collector.collect_frame(), TickControl::Exit);
    }

    #[test]
    fn collect_is_bounded_per_frame() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx);

        for _ in 0..EventCollector::MAX_EVENTS_PER_FRAME + 10 {
            tx.send(HostEvent::Pause).unwrap();
        }

        collector.collect_frame();
        assert_eq!(
            collector.take_commands().len(),
            EventCollector::MAX_EVENTS_PER_FRAME
        );
        collector.collect_frame();
        assert_eq!(collector.take_commands().len(), 10);
    }
}
