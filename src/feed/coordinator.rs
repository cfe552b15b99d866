// =============================================================================
// PLAYBACK COORDINATOR
// =============================================================================
//
// Decides which mounted item plays. Visibility reports move the active item,
// player events complete deferred plays, and every play is preceded by pausing
// whatever else is playing, all inside the same handler call.
//
// =============================================================================

use std::collections::BTreeMap;

use crate::core::ItemKey;
use crate::feed::VisibilityReport;
use crate::video::{ControllerId, PlaybackState, PlaybackTarget, PlayerEvent, PlayerEventKind};

/// The live controllers, keyed by the row they belong to.
#[derive(Debug)]
pub struct ControllerSet<C> {
    controllers: BTreeMap<ItemKey, C>,
}

impl<C> Default for ControllerSet<C> {
    fn default() -> Self {
        Self {
            controllers: BTreeMap::new(),
        }
    }
}

impl<C: PlaybackTarget> ControllerSet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller, handing back whatever was mounted for that row.
    pub fn insert(&mut self, controller: C) -> Option<C> {
        self.controllers.insert(controller.key().clone(), controller)
    }

    pub fn remove(&mut self, key: &ItemKey) -> Option<C> {
        self.controllers.remove(key)
    }

    pub fn get(&self, key: &ItemKey) -> Option<&C> {
        self.controllers.get(key)
    }

    pub fn get_mut(&mut self, key: &ItemKey) -> Option<&mut C> {
        self.controllers.get_mut(key)
    }

    pub fn find_by_id(&mut self, id: ControllerId) -> Option<&mut C> {
        self.controllers.values_mut().find(|c| c.controller_id() == id)
    }

    /// True when `id` is the controller currently mounted for `key`.
    pub fn is_live(&self, key: &ItemKey, id: ControllerId) -> bool {
        self.controllers
            .get(key)
            .map_or(false, |c| c.controller_id() == id)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.controllers.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.controllers.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.controllers.values()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn playing_count(&self) -> usize {
        self.controllers
            .values()
            .filter(|c| c.state() == PlaybackState::Playing)
            .count()
    }
}

/// A play request waiting for its target to finish loading.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredPlay {
    pub key: ItemKey,
    /// The instance the request is bound to; `None` until one is mounted.
    pub controller: Option<ControllerId>,
}

/// Everything the coordinator remembers between events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinatorState {
    pub active: Option<ItemKey>,
    pub deferred: Option<DeferredPlay>,
}

impl CoordinatorState {
    /// State for a feed whose first row should start playing once loaded.
    pub fn starting_at(first: ItemKey) -> Self {
        Self {
            active: Some(first.clone()),
            deferred: Some(DeferredPlay {
                key: first,
                controller: None,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct PlaybackCoordinator {
    state: CoordinatorState,
}

impl PlaybackCoordinator {
    pub fn new(state: CoordinatorState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn active(&self) -> Option<&ItemKey> {
        self.state.active.as_ref()
    }

    pub fn active_item_id(&self) -> Option<&str> {
        self.state.active.as_ref().map(|key| key.id.as_str())
    }

    pub fn deferred(&self) -> Option<&DeferredPlay> {
        self.state.deferred.as_ref()
    }

    /// Adopts a first active row if none was set, e.g. when the feed was
    /// empty at construction time.
    pub fn ensure_active(&mut self, first: ItemKey) {
        if self.state.active.is_none() {
            log::info!("Active item initialised to {}", first);
            self.state = CoordinatorState::starting_at(first);
        }
    }

    /// Handles the tracker's pick. Returns the player events caused, in the
    /// order the commands were issued.
    pub fn on_visibility<C: PlaybackTarget>(
        &mut self,
        report: &VisibilityReport,
        controllers: &mut ControllerSet<C>,
    ) -> Vec<PlayerEvent> {
        if !report.is_viewable || self.state.active.as_ref() == Some(&report.key) {
            return Vec::new();
        }

        let previous = self.state.active.replace(report.key.clone());
        log::info!(
            "Active item {} -> {}",
            previous.as_ref().map_or_else(|| "none".to_string(), ToString::to_string),
            report.key
        );

        if let Some(stale) = self.state.deferred.take() {
            log::debug!("Dropping deferred play for {}", stale.key);
        }

        let mut events = Self::pause_all_except(&report.key, controllers);

        match controllers.get_mut(&report.key) {
            Some(target) if target.state().is_loaded() => {
                events.extend(target.play());
            }
            Some(target) if target.state().is_pending() => {
                log::debug!("{} still loading, play deferred", report.key);
                self.state.deferred = Some(DeferredPlay {
                    key: report.key.clone(),
                    controller: Some(target.controller_id()),
                });
            }
            Some(_) => {
                log::debug!("{} failed to load, not playing", report.key);
            }
            None => {
                log::debug!("{} not mounted yet, play deferred", report.key);
                self.state.deferred = Some(DeferredPlay {
                    key: report.key.clone(),
                    controller: None,
                });
            }
        }

        events
    }

    /// Handles a status event reported by a controller.
    pub fn on_player_event<C: PlaybackTarget>(
        &mut self,
        event: &PlayerEvent,
        controllers: &mut ControllerSet<C>,
    ) -> Vec<PlayerEvent> {
        if !controllers.is_live(&event.key, event.controller) {
            log::debug!("Ignoring {:?} from stale controller {}", event.kind, event.controller);
            return Vec::new();
        }

        match event.kind {
            PlayerEventKind::Ready => {
                if self.state.active.as_ref() != Some(&event.key) {
                    return Vec::new();
                }

                if self.state.deferred.take().is_some() {
                    log::debug!("Deferred play for {} fired", event.key);
                }

                let mut events = Self::pause_all_except(&event.key, controllers);
                if let Some(target) = controllers.get_mut(&event.key) {
                    events.extend(target.play());
                }
                events
            }
            PlayerEventKind::Error(_) => {
                if self.is_deferred_for(&event.key, event.controller) {
                    log::debug!("Deferred play for {} dropped after load error", event.key);
                    self.state.deferred = None;
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Binds a waiting play request to the instance just mounted for its row.
    pub fn on_mount(&mut self, key: &ItemKey, controller: ControllerId) {
        if let Some(deferred) = self.state.deferred.as_mut() {
            if &deferred.key == key {
                deferred.controller = Some(controller);
            }
        }
    }

    /// Cancels the subscription held for a controller being destroyed. If the
    /// row is still active, the next instance mounted for it will autoplay.
    pub fn on_unmount(&mut self, key: &ItemKey, controller: ControllerId) {
        if self.is_deferred_for(key, controller) {
            log::debug!("Cancelling deferred play for destroyed controller {}", controller);
            self.state.deferred = None;
        }

        if self.state.active.as_ref() == Some(key) {
            self.state.deferred = Some(DeferredPlay {
                key: key.clone(),
                controller: None,
            });
        }
    }

    fn is_deferred_for(&self, key: &ItemKey, controller: ControllerId) -> bool {
        self.state.deferred.as_ref().map_or(false, |d| {
            &d.key == key && d.controller.map_or(true, |id| id == controller)
        })
    }

    fn pause_all_except<C: PlaybackTarget>(
        keep: &ItemKey,
        controllers: &mut ControllerSet<C>,
    ) -> Vec<PlayerEvent> {
        controllers
            .controllers
            .iter_mut()
            .filter(|(key, c)| *key != keep && c.state() == PlaybackState::Playing)
            .filter_map(|(_, c)| c.pause())
            .collect()
    }
}
