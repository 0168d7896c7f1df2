//! Player wiring for tests
//!
//! Everything runs headless on a `ManualClock` at a low sample rate; time
//! only moves when a test advances it.

use dreamcast_common::events::PlayerEvent;
use dreamcast_player::playback::KeepAwake;
use dreamcast_player::{
    AmbienceEngine, AudioContext, ManualClock, NarrationController, Player, PlayerConfig,
    PreviewPolicy, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Context rate used by every test session
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Wake lock that counts acquisitions and releases
#[derive(Debug, Default)]
pub struct CountingWakeLock {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CountingWakeLock {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn held(&self) -> bool {
        self.acquired() > self.released()
    }
}

impl KeepAwake for CountingWakeLock {
    fn acquire(&self) -> Result<()> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Controller on a fresh suspended context
pub fn controller_with(preview: PreviewPolicy) -> (NarrationController, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let config = PlayerConfig::default();
    let ctx = AudioContext::new(TEST_SAMPLE_RATE, clock.clone(), config.output.fft_size);
    let engine = AmbienceEngine::with_seed(config.ambience.clone(), 42);
    (
        NarrationController::new(&config, ctx, engine, preview),
        clock,
    )
}

/// Player with a counting wake lock
pub fn player_with(
    preview: PreviewPolicy,
) -> (Player, Arc<ManualClock>, Arc<CountingWakeLock>) {
    let clock = Arc::new(ManualClock::new());
    let config = PlayerConfig::default();
    let ctx = AudioContext::new(TEST_SAMPLE_RATE, clock.clone(), config.output.fft_size);
    let engine = AmbienceEngine::with_seed(config.ambience.clone(), 42);
    let wake_lock = Arc::new(CountingWakeLock::default());
    let player = Player::with_engine(
        &config,
        ctx,
        engine,
        clock.clone(),
        preview,
        wake_lock.clone(),
    );
    (player, clock, wake_lock)
}

/// Drain whatever is queued on `events`
///
/// Long runs overflow the channel with progress events; the oldest ones
/// are skipped.
pub fn collect_events(events: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut collected = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => collected.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    collected
}

/// Number of events in `events` with the given type tag
pub fn count_events(events: &[PlayerEvent], event_type: &str) -> usize {
    events
        .iter()
        .filter(|event| event.event_type() == event_type)
        .count()
}
