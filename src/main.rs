mod core;
mod feed;
mod video;

use std::sync::Arc;
use std::time::Duration;

use crate::core::{FeedConfig, MediaItem};
use crate::feed::{FeedEvent, FeedScreen, FixedBatchSource};
use crate::video::{PlaybackTarget, PlayerEventKind, SimulatedLoader};

/// Pages the headless demo swipes through.
const DEMO_PAGES: usize = 12;

/// Viewport height used by the demo, one row per page.
const DEMO_VIEWPORT: f32 = 300.0;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = FeedConfig::load()?;
    config.item_extent = DEMO_VIEWPORT;

    let batch = match config.feed_file {
        Some(ref path) => MediaItem::load_batch(path)?,
        None => MediaItem::demo_batch(),
    };

    let loader = Arc::new(SimulatedLoader::new(Duration::from_millis(config.simulated_load_latency_ms)));
    let source = Arc::new(FixedBatchSource::new(batch.clone()));
    let mut screen = FeedScreen::new(config, batch, loader, source);

    let mut overlay = screen.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = overlay.recv().await {
            if let PlayerEventKind::Error(reason) = event.kind {
                log::warn!("Overlay: {} unavailable ({})", event.key, reason);
            }
        }
    });

    screen.start();
    screen.settle().await?;

    let backend = screen.sender();

    for page in 0..DEMO_PAGES {
        screen.scroll_to(page as f32 * DEMO_VIEWPORT, DEMO_VIEWPORT)?;
        if let Err(e) = screen.settle().await {
            log::error!("Feed update failed: {}", e);
        }

        // Let the active clip run to its end once to show it looping
        let focused_controller = screen
            .focused_index()
            .and_then(|index| screen.controller(index))
            .map(|c| c.controller_id());
        if let Some(id) = focused_controller {
            backend.send(FeedEvent::PlaybackStatus {
                controller: id,
                position: Duration::ZERO,
                did_just_finish: true,
            })?;
            screen.next().await?;
        }

        log::info!(
            "Page {}: active {:?}, {} items loaded, mounted {:?}",
            page,
            screen.active_item_id(),
            screen.len(),
            screen.mounted()
        );
    }

    println!(
        "Swiped through {} pages; feed holds {} items, active item {}",
        DEMO_PAGES,
        screen.len(),
        screen.active_item_id().unwrap_or("none")
    );
    Ok(())
}
