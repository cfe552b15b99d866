// =============================================================================
// FEED SCREEN - SINGLE EVENT QUEUE FOR THE WHOLE FEED
// =============================================================================
//
// Owns the descriptor store, the mounted player controllers, the visibility
// tracker, the coordinator and the pagination controller. Everything that
// changes state arrives as a FeedEvent on one unbounded queue: layout and
// scroll updates from the renderer, load completions, playback progress from
// the media backend, and fetched batches. Handlers run one at a time on the
// thread that drives the screen, so none of the state needs a lock.
//
// Media loads and batch fetches run as spawned tasks that post their result
// back onto the same queue.
//
// =============================================================================

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::core::{DescriptorStore, FeedConfig, FeedError, ItemKey, MediaItem};
use crate::feed::{
    initial_range, measure_fixed_layout, mount_range, ContentSource, ControllerSet,
    CoordinatorState, PaginationController, PlaybackCoordinator, VisibilityMeasurement,
    VisibilityReport, VisibilityTracker,
};
use crate::video::{
    ControllerId, MediaLoader, MediaPlayerController, PlaybackState, PlaybackTarget, PlayerEvent,
};

#[derive(Debug)]
pub enum FeedEvent {
    /// Scroll settled at `offset` for a fixed-extent list.
    Scrolled { offset: f32, viewport_height: f32 },
    /// Visible fractions measured by a renderer that does its own layout.
    Layout(Vec<VisibilityMeasurement>),
    /// The renderer brought a row into its render window.
    Mounted(usize),
    /// The renderer dropped a row from its render window.
    Unmounted(usize),
    LoadFinished {
        controller: ControllerId,
        result: Result<(), FeedError>,
    },
    PlaybackStatus {
        controller: ControllerId,
        position: Duration,
        did_just_finish: bool,
    },
    BatchFetched {
        result: Result<Vec<MediaItem>, FeedError>,
    },
}

pub struct FeedScreen<L: MediaLoader, S: ContentSource> {
    config: FeedConfig,
    store: DescriptorStore,
    controllers: ControllerSet<MediaPlayerController>,
    tracker: VisibilityTracker,
    coordinator: PlaybackCoordinator,
    pagination: PaginationController,
    loader: Arc<L>,
    source: Arc<S>,
    focused: Option<usize>,
    next_controller_id: u64,
    events_tx: mpsc::UnboundedSender<FeedEvent>,
    events_rx: mpsc::UnboundedReceiver<FeedEvent>,
    player_events: broadcast::Sender<PlayerEvent>,
}

impl<L: MediaLoader, S: ContentSource> FeedScreen<L, S> {
    pub fn new(config: FeedConfig, items: Vec<MediaItem>, loader: Arc<L>, source: Arc<S>) -> Self {
        let config = config.sanitized();
        let store = DescriptorStore::new(items);
        let state = store
            .key_at(0)
            .map(CoordinatorState::starting_at)
            .unwrap_or_default();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (player_events, _) = broadcast::channel(64);

        Self {
            tracker: VisibilityTracker::new(config.visibility_threshold),
            pagination: PaginationController::new(config.end_reached_threshold),
            coordinator: PlaybackCoordinator::new(state),
            controllers: ControllerSet::new(),
            config,
            store,
            loader,
            source,
            focused: None,
            next_controller_id: 0,
            events_tx,
            events_rx,
            player_events,
        }
    }

    /// Mounts the initial rows and starts loading them. Must be called from
    /// inside a tokio runtime.
    pub fn start(&mut self) {
        let range = initial_range(self.store.len(), self.config.initial_num_to_render);
        log::info!("Starting feed with {} items, mounting {:?}", self.store.len(), range);
        self.sync_window(range);
        self.request_more_if_needed();
    }

    /// Queue handle for the renderer and media backend.
    pub fn sender(&self) -> mpsc::UnboundedSender<FeedEvent> {
        self.events_tx.clone()
    }

    /// Player status changes, for overlays such as the loading spinner.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.player_events.subscribe()
    }

    pub fn scroll_to(&mut self, offset: f32, viewport_height: f32) -> Result<(), FeedError> {
        self.dispatch(FeedEvent::Scrolled {
            offset,
            viewport_height,
        })
    }

    /// Handles one event to completion. Only batch fetch failures are
    /// reported as errors; stale or late events are dropped.
    pub fn dispatch(&mut self, event: FeedEvent) -> Result<(), FeedError> {
        let result = match event {
            FeedEvent::Scrolled {
                offset,
                viewport_height,
            } => {
                let measurements =
                    measure_fixed_layout(&self.store, offset, viewport_height, self.config.item_extent);
                self.on_layout(measurements);
                Ok(())
            }
            FeedEvent::Layout(measurements) => {
                self.on_layout(measurements);
                Ok(())
            }
            FeedEvent::Mounted(index) => {
                self.mount(index);
                Ok(())
            }
            FeedEvent::Unmounted(index) => {
                self.unmount(index);
                Ok(())
            }
            FeedEvent::LoadFinished { controller, result } => {
                self.on_load_finished(controller, result);
                Ok(())
            }
            FeedEvent::PlaybackStatus {
                controller,
                position,
                did_just_finish,
            } => {
                self.on_playback_status(controller, position, did_just_finish);
                Ok(())
            }
            FeedEvent::BatchFetched { result } => self.on_batch_fetched(result),
        };

        debug_assert!(self.controllers.playing_count() <= 1, "more than one player is playing");
        result
    }

    /// Waits for and handles one queued event.
    pub async fn next(&mut self) -> Result<(), FeedError> {
        let event = self.events_rx.recv().await.ok_or(FeedError::QueueClosed)?;
        self.dispatch(event)
    }

    /// Handles queued events until `done` holds for the screen.
    pub async fn run_until<F>(&mut self, done: F) -> Result<(), FeedError>
    where
        F: Fn(&Self) -> bool,
    {
        while !done(self) {
            self.next().await?;
        }
        Ok(())
    }

    /// Handles events until no load or fetch is outstanding.
    pub async fn settle(&mut self) -> Result<(), FeedError> {
        self.run_until(|screen| !screen.has_pending_work()).await
    }

    pub fn has_pending_work(&self) -> bool {
        self.pagination.in_flight()
            || self
                .controllers
                .iter()
                .any(|c| c.state() == PlaybackState::Loading && c.has_load_task())
    }

    // =========================================================================
    // STATE QUERIES
    // =========================================================================

    pub fn items(&self) -> Arc<Vec<MediaItem>> {
        self.store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn active_item(&self) -> Option<&ItemKey> {
        self.coordinator.active()
    }

    pub fn active_item_id(&self) -> Option<&str> {
        self.coordinator.active_item_id()
    }

    pub fn coordinator_state(&self) -> &CoordinatorState {
        self.coordinator.state()
    }

    pub fn playback_state(&self, index: usize) -> Option<PlaybackState> {
        self.controller(index).map(|c| c.state())
    }

    pub fn controller(&self, index: usize) -> Option<&MediaPlayerController> {
        let key = self.store.key_at(index)?;
        self.controllers.get(&key)
    }

    pub fn mounted(&self) -> Vec<usize> {
        self.controllers.keys().map(|key| key.index).collect()
    }

    pub fn playing_count(&self) -> usize {
        self.controllers.playing_count()
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    // =========================================================================
    // HANDLERS
    // =========================================================================

    fn on_layout(&mut self, measurements: Vec<VisibilityMeasurement>) {
        let Some(report) = self.tracker.on_layout(measurements, self.coordinator.active()) else {
            return;
        };
        self.apply_report(report);
    }

    fn apply_report(&mut self, report: VisibilityReport) {
        let focus = report.key.index;
        let events = self.coordinator.on_visibility(&report, &mut self.controllers);
        self.publish_all(events);

        if self.focused != Some(focus) {
            self.focused = Some(focus);
            self.sync_window(mount_range(focus, self.store.len(), self.config.window_size));
            self.request_more_if_needed();
        }
    }

    fn on_load_finished(&mut self, id: ControllerId, result: Result<(), FeedError>) {
        let Some(controller) = self.controllers.find_by_id(id) else {
            log::debug!("Load result for unmounted controller {} dropped", id);
            return;
        };

        if let Some(event) = controller.complete_load(result) {
            self.publish(event.clone());
            let commands = self.coordinator.on_player_event(&event, &mut self.controllers);
            self.publish_all(commands);
        }
    }

    fn on_playback_status(&mut self, id: ControllerId, position: Duration, did_just_finish: bool) {
        let Some(controller) = self.controllers.find_by_id(id) else {
            log::debug!("Playback status for unmounted controller {} dropped", id);
            return;
        };

        if let Some(event) = controller.update_position(position, did_just_finish) {
            self.publish(event);
        }
    }

    fn on_batch_fetched(&mut self, result: Result<Vec<MediaItem>, FeedError>) -> Result<(), FeedError> {
        let was_empty = self.store.is_empty();
        let appended = self.pagination.complete(result, &mut self.store)?;

        if was_empty && !appended.is_empty() {
            if let Some(first) = self.store.key_at(0) {
                self.coordinator.ensure_active(first);
            }
            let range = initial_range(self.store.len(), self.config.initial_num_to_render);
            self.sync_window(range);
        } else if let Some(focus) = self.focused {
            // Only adds rows; the window shrinks on the next scroll
            let window = mount_range(focus, self.store.len(), self.config.window_size);
            for index in appended.filter(|index| window.contains(index)) {
                self.mount(index);
            }
        }
        Ok(())
    }

    // =========================================================================
    // MOUNTING
    // =========================================================================

    fn sync_window(&mut self, range: Range<usize>) {
        let outside: Vec<usize> = self
            .controllers
            .keys()
            .map(|key| key.index)
            .filter(|index| !range.contains(index))
            .collect();
        for index in outside {
            self.unmount(index);
        }
        for index in range {
            self.mount(index);
        }
    }

    fn mount(&mut self, index: usize) {
        let Some(key) = self.store.key_at(index) else {
            log::warn!("Mount requested for index {} past the end of the feed", index);
            return;
        };
        if self.controllers.contains(&key) {
            return;
        }
        let Some(source_uri) = self.store.get(index).map(|item| item.source_uri.clone()) else {
            return;
        };

        self.next_controller_id += 1;
        let id = ControllerId(self.next_controller_id);
        let mut controller = MediaPlayerController::new(id, key.clone(), source_uri.clone());
        log::debug!("Mounting {} as controller {}", key, id);

        if let Some(event) = controller.load() {
            self.publish(event);
        }

        let loader = Arc::clone(&self.loader);
        let events_tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = loader.load(&source_uri).await;
            if events_tx
                .send(FeedEvent::LoadFinished {
                    controller: id,
                    result,
                })
                .is_err()
            {
                log::debug!("Feed closed before controller {} finished loading", id);
            }
        });
        controller.attach_load_task(task.abort_handle());

        self.controllers.insert(controller);
        self.coordinator.on_mount(&key, id);
    }

    fn unmount(&mut self, index: usize) {
        let Some(key) = self.store.key_at(index) else {
            return;
        };
        let Some(mut controller) = self.controllers.remove(&key) else {
            return;
        };

        log::debug!("Unmounting {} (controller {})", key, controller.controller_id());
        self.coordinator.on_unmount(&key, controller.controller_id());
        controller.destroy();
    }

    // =========================================================================
    // PAGINATION
    // =========================================================================

    fn request_more_if_needed(&mut self) {
        let focus = self.focused.unwrap_or(0);
        let Some(cursor) = self.pagination.poll(focus, self.store.len()) else {
            return;
        };

        let source = Arc::clone(&self.source);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_next_batch(cursor).await;
            if events_tx.send(FeedEvent::BatchFetched { result }).is_err() {
                log::debug!("Feed closed before batch after {} arrived", cursor);
            }
        });
    }

    fn publish(&self, event: PlayerEvent) {
        log::debug!("{} {:?}", event.key, event.kind);
        // No subscribers is fine
        let _ = self.player_events.send(event);
    }

    fn publish_all(&self, events: Vec<PlayerEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}
