//! Composed player sessions: autoplay, soundscape switching, sleep timer,
//! preview paywall and teardown

mod helpers;

use std::sync::Arc;

use dreamcast_common::events::PlayerEvent;
use dreamcast_common::{AmbienceType, Story};
use dreamcast_player::ambience::VoiceState;
use dreamcast_player::{NarrationInput, PreviewPolicy};
use helpers::{collect_events, count_events, player_with, sine_buffer, TEST_SAMPLE_RATE};

fn decoded(seconds: f64) -> Option<NarrationInput> {
    Some(NarrationInput::Decoded(Arc::new(sine_buffer(
        seconds,
        TEST_SAMPLE_RATE,
    ))))
}

#[tokio::test]
async fn test_autoplay_acquires_wake_lock_once() {
    let (mut player, clock, wake_lock) = player_with(PreviewPolicy::entitled());
    player
        .open(Story::new("Stars"), decoded(60.0), true)
        .await
        .unwrap();
    assert_eq!(wake_lock.acquired(), 0);

    clock.advance(1.0);
    player.tick();
    assert!(player.controller().is_playing());

    player.pause();
    player.play();
    player.toggle_play();
    player.toggle_play();
    assert_eq!(wake_lock.acquired(), 1);
    assert!(wake_lock.held());
}

#[tokio::test]
async fn test_pause_cancels_pending_autoplay() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    player
        .open(Story::new("Stars"), decoded(60.0), true)
        .await
        .unwrap();
    player.pause();

    clock.advance(2.0);
    player.tick();
    assert!(!player.controller().is_playing());
}

#[tokio::test]
async fn test_switching_soundscape_crossfades_voices() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    let story = Story::new("Rainy night").with_ambience(AmbienceType::Rain);
    player.open(story, decoded(120.0), false).await.unwrap();
    player.play();
    clock.advance(4.0);
    player.tick();

    player.select_soundscape(AmbienceType::Waves);
    let engine = player.controller().engine();
    assert_eq!(engine.state(AmbienceType::Rain), VoiceState::FadingOut);
    assert_eq!(engine.state(AmbienceType::Waves), VoiceState::FadingIn);
    assert_eq!(engine.live_voices(), 2);

    clock.advance(0.6);
    player.tick();
    let engine = player.controller().engine();
    assert_eq!(engine.state(AmbienceType::Rain), VoiceState::Idle);
    assert_eq!(engine.live_voices(), 1);
    assert_eq!(player.controller().context().live_voices(), 1);
}

#[tokio::test]
async fn test_switching_back_before_release_revives_voice() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    let story = Story::new("Forest walk").with_ambience(AmbienceType::Forest);
    player.open(story, decoded(120.0), false).await.unwrap();
    player.play();
    let forest = player.controller().engine().voice_id(AmbienceType::Forest);

    player.select_soundscape(AmbienceType::Fire);
    clock.advance(0.2);
    player.select_soundscape(AmbienceType::Forest);

    let engine = player.controller().engine();
    assert_eq!(engine.voice_id(AmbienceType::Forest), forest);
    assert_eq!(engine.state(AmbienceType::Forest), VoiceState::FadingIn);
    assert_eq!(engine.state(AmbienceType::Fire), VoiceState::FadingOut);
}

#[tokio::test]
async fn test_switching_story_releases_previous_session() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    let rainy = Story::new("Rainy night").with_ambience(AmbienceType::Rain);
    player.open(rainy, decoded(120.0), false).await.unwrap();
    player.play();
    clock.advance(4.0);
    player.tick();
    assert_eq!(player.controller().context().live_sources(), 1);
    assert_eq!(player.controller().engine().live_voices(), 1);

    let campfire = Story::new("Campfire").with_ambience(AmbienceType::Fire);
    player.open(campfire, decoded(60.0), false).await.unwrap();

    let controller = player.controller();
    assert!(!controller.is_playing());
    assert_eq!(controller.context().live_sources(), 0);
    assert_eq!(controller.engine().live_voices(), 0);
    assert_eq!(controller.context().live_voices(), 0);
    assert_eq!(controller.engine().state(AmbienceType::Rain), VoiceState::Idle);
    assert_eq!(controller.engine().state(AmbienceType::Fire), VoiceState::Idle);
    assert!(controller.engine().voice_id(AmbienceType::Fire).is_none());
    assert_eq!(controller.mixer().ambience_type, AmbienceType::Fire);

    // Nothing left over to release later either
    clock.advance(1.0);
    player.tick();
    assert_eq!(player.controller().context().live_voices(), 0);

    player.play();
    let controller = player.controller();
    assert_eq!(controller.engine().state(AmbienceType::Fire), VoiceState::FadingIn);
    assert_eq!(controller.engine().live_voices(), 1);
    assert_eq!(controller.context().live_voices(), 1);
    assert_eq!(controller.context().live_sources(), 1);
}

#[tokio::test]
async fn test_ambience_changes_while_paused_are_stored_only() {
    let (mut player, _clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    player
        .open(Story::new("Quiet"), decoded(60.0), false)
        .await
        .unwrap();

    player.select_soundscape(AmbienceType::Fire);
    player.controller_mut().set_ambience_volume(0.9);
    assert_eq!(player.controller().engine().live_voices(), 0);

    player.play();
    let engine = player.controller().engine();
    assert_eq!(engine.state(AmbienceType::Fire), VoiceState::FadingIn);
    let expected = 0.9 * 0.3;
    let volume = engine.volume(AmbienceType::Fire).unwrap();
    assert!((volume - expected).abs() < 1e-6, "volume {}", volume);
}

#[tokio::test]
async fn test_paywall_fires_once_per_session() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::preview(30.0));
    let mut events = player.subscribe();
    player
        .open(Story::new("Long tale"), decoded(120.0), false)
        .await
        .unwrap();
    assert_eq!(player.controller().preview_marker_percent(), Some(25.0));

    player.play();
    for _ in 0..40 {
        clock.advance(1.0);
        player.tick();
    }

    assert!(!player.controller().is_playing());
    let emitted = collect_events(&mut events);
    assert_eq!(count_events(&emitted, "PaywallRequired"), 1);
    assert_eq!(count_events(&emitted, "StoryEnded"), 0);
}

#[tokio::test]
async fn test_upgrade_lifts_preview_ceiling() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::preview(30.0));
    player
        .open(Story::new("Long tale"), decoded(120.0), false)
        .await
        .unwrap();
    player.play();
    clock.advance(30.0);
    player.tick();
    assert!(!player.controller().is_playing());

    player
        .controller_mut()
        .set_preview_policy(PreviewPolicy::entitled());
    player.play();
    clock.advance(10.0);
    player.tick();
    assert!(player.controller().is_playing());
    assert!((player.controller().elapsed() - 40.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_replay_after_natural_end() {
    let (mut player, clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    player
        .open(Story::new("Short"), decoded(5.0), false)
        .await
        .unwrap();
    player.play();
    player.toggle_screensaver();

    clock.advance(5.1);
    player.tick();
    assert!(player.controller().has_ended());
    assert!(!player.is_screensaver());

    player.replay();
    assert!(player.controller().is_playing());
    assert!(!player.controller().has_ended());
    assert_eq!(player.controller().elapsed(), 0.0);
}

#[tokio::test]
async fn test_seek_percent_maps_onto_duration() {
    let (mut player, _clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    player
        .open(Story::new("Middle"), decoded(80.0), false)
        .await
        .unwrap();

    player.seek_percent(25.0);
    assert_eq!(player.controller().paused_offset(), 20.0);
    assert_eq!(player.controller().elapsed_label(), "0:20");
    assert_eq!(player.controller().remaining_label(), "1:00");

    player.seek_percent(250.0);
    assert_eq!(player.controller().paused_offset(), 80.0);
}

#[tokio::test]
async fn test_sequel_request_names_story() {
    let (mut player, _clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    let mut events = player.subscribe();
    let story = Story::new("Dragon");
    let id = story.id;
    player.open(story, decoded(10.0), false).await.unwrap();

    player.request_sequel();

    let requested: Vec<_> = collect_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::SequelRequested { story_id, .. } => Some(story_id),
            _ => None,
        })
        .collect();
    assert_eq!(requested, vec![id]);
}

#[tokio::test]
async fn test_story_without_audio_reports_failure() {
    let (mut player, _clock, _wake_lock) = player_with(PreviewPolicy::entitled());
    let mut events = player.subscribe();

    assert!(player.open(Story::new("Empty"), None, true).await.is_err());
    player.play();

    assert!(!player.controller().is_playing());
    assert_eq!(count_events(&collect_events(&mut events), "MediaLoadFailed"), 1);
}

#[tokio::test]
async fn test_drop_releases_wake_lock() {
    let (mut player, _clock, wake_lock) = player_with(PreviewPolicy::entitled());
    player
        .open(Story::new("Bye"), decoded(30.0), false)
        .await
        .unwrap();
    player.play();
    assert!(wake_lock.held());

    drop(player);
    assert!(!wake_lock.held());
    assert_eq!(wake_lock.released(), 1);
}

#[tokio::test]
async fn test_back_closes_everything() {
    let (mut player, _clock, wake_lock) = player_with(PreviewPolicy::entitled());
    let story = Story::new("Waves").with_ambience(AmbienceType::Waves);
    player.open(story, decoded(30.0), false).await.unwrap();
    player.play();

    player.back();
    player.back();

    assert!(player.controller().is_closed());
    assert_eq!(player.controller().engine().live_voices(), 0);
    assert_eq!(wake_lock.released(), 1);
}
