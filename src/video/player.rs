// =============================================================================
// MEDIA PLAYER CONTROLLER - ONE PER MOUNTED FEED ITEM
// =============================================================================
//
// Explicit state machine for a single media source. Load-path events
// (load started, load finished) and command events (play, pause) drive it;
// the actual decoding backend stays outside and only reports back.
//
// Every transition returns the event it emitted, or None when the call was a
// no-op, so callers can forward events without double-reporting.
//
// =============================================================================

use std::fmt;
use std::time::Duration;
use tokio::task::AbortHandle;

use crate::core::{FeedError, ItemKey};

/// Identity of one controller instance. A remounted item gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub u64);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Finished,
    Errored,
}

impl PlaybackState {
    pub fn can_play(&self) -> bool {
        matches!(self, PlaybackState::Ready | PlaybackState::Paused)
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// Ready or any later non-error state.
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Finished
        )
    }

    /// Not loaded yet, but may still get there.
    pub fn is_pending(&self) -> bool {
        matches!(self, PlaybackState::Idle | PlaybackState::Loading)
    }

    /// Whether the overlay should show its loading spinner.
    pub fn shows_spinner(&self) -> bool {
        self.is_pending()
    }

    pub fn display_text(&self) -> &str {
        match self {
            PlaybackState::Idle => "Waiting",
            PlaybackState::Loading => "Loading video...",
            PlaybackState::Ready => "Ready",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Finished => "Finished",
            PlaybackState::Errored => "Video unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEventKind {
    LoadStart,
    Ready,
    Error(String),
    Playing,
    Paused,
    LoopRestart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEvent {
    pub controller: ControllerId,
    pub key: ItemKey,
    pub kind: PlayerEventKind,
}

/// The contract the coordinator drives. Implemented by the real controller
/// and by test doubles.
pub trait PlaybackTarget {
    fn controller_id(&self) -> ControllerId;
    fn key(&self) -> &ItemKey;
    fn state(&self) -> PlaybackState;
    fn play(&mut self) -> Option<PlayerEvent>;
    fn pause(&mut self) -> Option<PlayerEvent>;
}

#[derive(Debug)]
pub struct MediaPlayerController {
    id: ControllerId,
    key: ItemKey,
    source_uri: String,
    state: PlaybackState,
    position: Duration,
    loop_count: u32,
    error: Option<String>,
    load_task: Option<AbortHandle>,
    destroyed: bool,
}

impl MediaPlayerController {
    pub fn new(id: ControllerId, key: ItemKey, source_uri: impl Into<String>) -> Self {
        Self {
            id,
            key,
            source_uri: source_uri.into(),
            state: PlaybackState::Idle,
            position: Duration::ZERO,
            loop_count: 0,
            error: None,
            load_task: None,
            destroyed: false,
        }
    }

    fn emit(&self, kind: PlayerEventKind) -> Option<PlayerEvent> {
        Some(PlayerEvent {
            controller: self.id,
            key: self.key.clone(),
            kind,
        })
    }

    /// Idle -> Loading. The caller starts the actual fetch and hands the task
    /// over with [`attach_load_task`](Self::attach_load_task).
    pub fn load(&mut self) -> Option<PlayerEvent> {
        if self.destroyed || self.state != PlaybackState::Idle {
            log::debug!("Controller {} ignoring load in state {:?}", self.id, self.state);
            return None;
        }

        log::debug!("Controller {} loading {}", self.id, self.source_uri);
        self.state = PlaybackState::Loading;
        self.emit(PlayerEventKind::LoadStart)
    }

    pub fn attach_load_task(&mut self, handle: AbortHandle) {
        if self.destroyed {
            handle.abort();
            return;
        }
        self.load_task = Some(handle);
    }

    pub fn has_load_task(&self) -> bool {
        self.load_task.is_some()
    }

    /// Loading -> Ready, or Loading -> Errored. Errored is terminal.
    pub fn complete_load(&mut self, result: Result<(), FeedError>) -> Option<PlayerEvent> {
        if self.destroyed || self.state != PlaybackState::Loading {
            log::debug!("Controller {} ignoring load result in state {:?}", self.id, self.state);
            return None;
        }
        self.load_task = None;

        match result {
            Ok(()) => {
                log::info!("Controller {} ready ({})", self.id, self.key);
                self.state = PlaybackState::Ready;
                self.emit(PlayerEventKind::Ready)
            }
            Err(e) => {
                log::warn!("Controller {} failed to load: {}", self.id, e);
                let reason = e.to_string();
                self.state = PlaybackState::Errored;
                self.error = Some(reason.clone());
                self.emit(PlayerEventKind::Error(reason))
            }
        }
    }

    /// Progress report from the backend. Reaching the end loops back to zero.
    pub fn update_position(&mut self, position: Duration, did_just_finish: bool) -> Option<PlayerEvent> {
        if self.destroyed || self.state != PlaybackState::Playing {
            return None;
        }
        if did_just_finish {
            return self.end_of_media();
        }
        self.position = position;
        None
    }

    /// Playing -> Finished -> Playing from position zero.
    pub fn end_of_media(&mut self) -> Option<PlayerEvent> {
        if self.destroyed || self.state != PlaybackState::Playing {
            return None;
        }

        self.state = PlaybackState::Finished;
        self.position = Duration::ZERO;
        self.loop_count += 1;
        self.state = PlaybackState::Playing;

        log::debug!("Controller {} looping (restart {})", self.id, self.loop_count);
        self.emit(PlayerEventKind::LoopRestart)
    }

    /// Cancels any in-flight load and stops accepting commands.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(handle) = self.load_task.take() {
            log::debug!("Controller {} cancelling in-flight load", self.id);
            handle.abort();
        }
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl PlaybackTarget for MediaPlayerController {
    fn controller_id(&self) -> ControllerId {
        self.id
    }

    fn key(&self) -> &ItemKey {
        &self.key
    }

    fn state(&self) -> PlaybackState {
        self.state
    }

    fn play(&mut self) -> Option<PlayerEvent> {
        if self.destroyed {
            log::debug!("Play for destroyed controller {} ignored", self.id);
            return None;
        }
        if !self.state.can_play() {
            if self.state != PlaybackState::Playing {
                log::debug!("Cannot play controller {} in state {:?}", self.id, self.state);
            }
            return None;
        }

        log::info!("Controller {} play ({})", self.id, self.key);
        self.state = PlaybackState::Playing;
        self.emit(PlayerEventKind::Playing)
    }

    fn pause(&mut self) -> Option<PlayerEvent> {
        if self.destroyed || !self.state.can_pause() {
            return None;
        }

        log::info!("Controller {} pause ({})", self.id, self.key);
        self.state = PlaybackState::Paused;
        self.emit(PlayerEventKind::Paused)
    }
}

impl Drop for MediaPlayerController {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> MediaPlayerController {
        MediaPlayerController::new(ControllerId(1), ItemKey::new(0, "2"), "https://example.com/2.mp4")
    }

    fn ready_controller() -> MediaPlayerController {
        let mut c = controller();
        c.load();
        c.complete_load(Ok(()));
        c
    }

    #[test]
    fn test_display_text_for_overlay() {
        assert_eq!(PlaybackState::Loading.display_text(), "Loading video...");
        assert_eq!(PlaybackState::Errored.display_text(), "Video unavailable");
        assert_eq!(PlaybackState::Playing.display_text(), "Playing");
        assert!(PlaybackState::Loading.shows_spinner());
        assert!(!PlaybackState::Errored.shows_spinner());
    }

    #[test]
    fn test_new_controller_is_idle() {
        let c = controller();
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(c.state().shows_spinner());
        assert!(!c.state().can_play());
        assert!(!c.state().can_pause());
    }

    #[test]
    fn test_load_path() {
        let mut c = controller();

        let started = c.load().expect("load should emit");
        assert_eq!(started.kind, PlayerEventKind::LoadStart);
        assert_eq!(c.state(), PlaybackState::Loading);

        // Second load is ignored
        assert!(c.load().is_none());

        let ready = c.complete_load(Ok(())).expect("completion should emit");
        assert_eq!(ready.kind, PlayerEventKind::Ready);
        assert_eq!(c.state(), PlaybackState::Ready);
        assert!(!c.state().shows_spinner());
    }

    #[test]
    fn test_load_failure_is_terminal() {
        let mut c = controller();
        c.load();

        let err = FeedError::MediaLoad {
            uri: c.source_uri().to_string(),
            reason: "404".to_string(),
        };
        let event = c.complete_load(Err(err)).expect("failure should emit");
        assert!(matches!(event.kind, PlayerEventKind::Error(ref reason) if reason.contains("404")));
        assert_eq!(c.state(), PlaybackState::Errored);
        assert!(c.error_message().is_some());

        assert!(c.play().is_none());
        assert!(c.load().is_none());
        assert_eq!(c.state(), PlaybackState::Errored);
    }

    #[test]
    fn test_play_requires_ready() {
        let mut c = controller();
        assert!(c.play().is_none());
        c.load();
        assert!(c.play().is_none());
        assert_eq!(c.state(), PlaybackState::Loading);
    }

    #[test]
    fn test_play_pause_idempotence() {
        let mut c = ready_controller();

        assert_eq!(c.play().map(|e| e.kind), Some(PlayerEventKind::Playing));
        assert!(c.play().is_none());
        assert_eq!(c.state(), PlaybackState::Playing);

        assert_eq!(c.pause().map(|e| e.kind), Some(PlayerEventKind::Paused));
        assert!(c.pause().is_none());
        assert_eq!(c.state(), PlaybackState::Paused);

        assert_eq!(c.play().map(|e| e.kind), Some(PlayerEventKind::Playing));
    }

    #[test]
    fn test_pause_before_ready_is_a_no_op() {
        let mut c = controller();
        assert!(c.pause().is_none());
        c.load();
        assert!(c.pause().is_none());
        assert_eq!(c.state(), PlaybackState::Loading);
    }

    #[test]
    fn test_end_of_media_loops_forever() {
        let mut c = ready_controller();
        c.play();

        for expected in 1..=3 {
            c.update_position(Duration::from_secs(4), false);
            assert_eq!(c.position(), Duration::from_secs(4));

            let event = c.update_position(Duration::from_secs(5), true).expect("loop should emit");
            assert_eq!(event.kind, PlayerEventKind::LoopRestart);
            assert_eq!(c.state(), PlaybackState::Playing);
            assert_eq!(c.position(), Duration::ZERO);
            assert_eq!(c.loop_count(), expected);
        }
    }

    #[test]
    fn test_end_of_media_while_paused_does_nothing() {
        let mut c = ready_controller();
        c.play();
        c.pause();

        assert!(c.end_of_media().is_none());
        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.loop_count(), 0);
    }

    #[test]
    fn test_commands_after_destroy_are_ignored() {
        let mut c = controller();
        c.load();
        c.destroy();

        assert!(c.is_destroyed());
        assert!(c.complete_load(Ok(())).is_none());
        assert!(c.play().is_none());
        assert!(c.pause().is_none());
        assert_eq!(c.state(), PlaybackState::Loading);

        // Destroy twice is fine
        c.destroy();
    }

    #[tokio::test]
    async fn test_destroy_aborts_load_task() {
        let mut c = controller();
        c.load();

        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        c.attach_load_task(task.abort_handle());
        assert!(c.has_load_task());

        c.destroy();
        assert!(!c.has_load_task());

        let joined = task.await;
        assert!(joined.expect_err("task should be cancelled").is_cancelled());
    }
}
