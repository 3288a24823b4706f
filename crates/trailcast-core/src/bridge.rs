//! Host bridge: presence polling plus the control surface an embedding host
//! uses to drive the overlay without keyboard or mouse.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use once_cell::sync::Lazy;
use tracing::{debug, info, warn};
use trailcast_platform::PresenceSignal;

pub const PRESENCE_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Fixed-period timer driven by the frame loop. Owns its own schedule;
/// cancelling it makes every later poll return false.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next_due: Option<Instant>,
}

impl Interval {
    /// First poll fires immediately.
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: Some(now),
        }
    }

    /// True at most once per elapsed period.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    ToggleActive,
    ApplyPreset(String),
    StartRecording,
    StopRecording,
}

/// The object published for external callers. Exactly four entry points.
#[derive(Debug)]
pub struct ControlSurface {
    commands: Sender<ControlCommand>,
}

impl ControlSurface {
    pub fn toggle_active(&self) {
        self.send(ControlCommand::ToggleActive);
    }

    pub fn apply_preset(&self, id: &str) {
        self.send(ControlCommand::ApplyPreset(id.to_string()));
    }

    pub fn start_recording(&self) {
        self.send(ControlCommand::StartRecording);
    }

    pub fn stop_recording(&self) {
        self.send(ControlCommand::StopRecording);
    }

    fn send(&self, command: ControlCommand) {
        if self.commands.send(command).is_err() {
            warn!("control surface is detached, command dropped");
        }
    }
}

static GLOBAL_REGISTRY: Lazy<ControlRegistry> = Lazy::new(ControlRegistry::default);

/// Slot holding the currently published control surface.
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    slot: Arc<Mutex<Option<Arc<ControlSurface>>>>,
}

impl ControlRegistry {
    /// Process-wide registry reachable by any embedding code.
    pub fn global() -> &'static ControlRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn current(&self) -> Option<Arc<ControlSurface>> {
        self.lock().clone()
    }

    fn install(&self, surface: Arc<ControlSurface>) {
        *self.lock() = Some(surface);
    }

    /// Remove `surface` only if it is still the published one.
    fn remove_if_current(&self, surface: &Arc<ControlSurface>) -> bool {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, surface) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<ControlSurface>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct HostBridge {
    presence: Box<dyn PresenceSignal>,
    interval: Interval,
    present: bool,
    registry: ControlRegistry,
    installed: Option<Arc<ControlSurface>>,
    commands_tx: Sender<ControlCommand>,
    commands_rx: Receiver<ControlCommand>,
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBridge")
            .field("present", &self.present)
            .field("interval", &self.interval)
            .field("registered", &self.installed.is_some())
            .finish_non_exhaustive()
    }
}

impl HostBridge {
    pub fn new(presence: Box<dyn PresenceSignal>, registry: ControlRegistry) -> Self {
        Self::with_interval(presence, registry, PRESENCE_POLL_INTERVAL)
    }

    pub fn with_interval(
        presence: Box<dyn PresenceSignal>,
        registry: ControlRegistry,
        period: Duration,
    ) -> Self {
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
        Self {
            presence,
            interval: Interval::new(period, Instant::now()),
            present: false,
            registry,
            installed: None,
            commands_tx,
            commands_rx,
        }
    }

    /// Publish this bridge's control surface. Idempotent.
    pub fn register(&mut self) -> Arc<ControlSurface> {
        if let Some(surface) = &self.installed {
            return Arc::clone(surface);
        }
        let surface = Arc::new(ControlSurface {
            commands: self.commands_tx.clone(),
        });
        self.registry.install(Arc::clone(&surface));
        self.installed = Some(Arc::clone(&surface));
        info!("host control surface registered");
        surface
    }

    /// Withdraw the surface, leaving a newer bridge's surface in place.
    pub fn deregister(&mut self) {
        if let Some(surface) = self.installed.take() {
            if self.registry.remove_if_current(&surface) {
                info!("host control surface deregistered");
            } else {
                debug!("control surface already replaced by a newer bridge");
            }
        }
    }

    /// Sample the presence signal if the poll interval has elapsed.
    /// Returns the new value when it changed.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        if !self.interval.poll(now) {
            return None;
        }
        let present = self.presence.is_present();
        if present == self.present {
            return None;
        }
        self.present = present;
        info!(present, "host presence changed");
        Some(present)
    }

    pub fn is_host_present(&self) -> bool {
        self.present
    }

    /// Commands received through the control surface since the last drain.
    pub fn drain_commands(&self) -> Vec<ControlCommand> {
        self.commands_rx.try_iter().collect()
    }

    pub fn shutdown(&mut self) {
        self.interval.cancel();
        self.deregister();
    }
}

impl Drop for HostBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flag(Arc<AtomicBool>);

    impl PresenceSignal for Flag {
        fn is_present(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn bridge(registry: &ControlRegistry) -> (HostBridge, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        let bridge = HostBridge::new(Box::new(Flag(Arc::clone(&flag))), registry.clone());
        (bridge, flag)
    }

    #[test]
    fn test_interval_fires_once_per_period() {
        let start = Instant::now();
        let mut interval = Interval::new(Duration::from_millis(2000), start);
        assert!(interval.poll(start));
        assert!(!interval.poll(start + Duration::from_millis(1999)));
        assert!(interval.poll(start + Duration::from_millis(2000)));
        interval.cancel();
        assert!(!interval.poll(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_presence_is_sampled_on_interval() {
        let registry = ControlRegistry::default();
        let (mut bridge, flag) = bridge(&registry);
        let start = Instant::now();
        flag.store(true, Ordering::SeqCst);
        assert_eq!(bridge.poll(start), Some(true));
        flag.store(false, Ordering::SeqCst);
        assert_eq!(bridge.poll(start + Duration::from_millis(500)), None);
        assert!(bridge.is_host_present());
        assert_eq!(bridge.poll(start + Duration::from_millis(2500)), Some(false));
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ControlRegistry::default();
        let (mut bridge, _) = bridge(&registry);
        let first = bridge.register();
        let second = bridge.register();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&registry.current().unwrap(), &first));
    }

    #[test]
    fn test_surface_calls_arrive_as_commands() {
        let registry = ControlRegistry::default();
        let (mut bridge, _) = bridge(&registry);
        bridge.register();
        let surface = registry.current().unwrap();
        surface.toggle_active();
        surface.apply_preset("ink");
        surface.start_recording();
        surface.stop_recording();
        assert_eq!(
            bridge.drain_commands(),
            vec![
                ControlCommand::ToggleActive,
                ControlCommand::ApplyPreset("ink".into()),
                ControlCommand::StartRecording,
                ControlCommand::StopRecording,
            ]
        );
        assert!(bridge.drain_commands().is_empty());
    }

    #[test]
    fn test_stale_bridge_does_not_remove_newer_surface() {
        let registry = ControlRegistry::default();
        let (mut old, _) = bridge(&registry);
        old.register();
        let (mut new, _) = bridge(&registry);
        let newer = new.register();

        old.deregister();
        assert!(Arc::ptr_eq(&registry.current().unwrap(), &newer));
        drop(old);
        assert!(registry.current().is_some());

        new.deregister();
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_drop_deregisters() {
        let registry = ControlRegistry::default();
        let (mut bridge, _) = bridge(&registry);
        bridge.register();
        drop(bridge);
        assert!(registry.current().is_none());
    }
}
