use super::*;
use crate::auth::AuthSession;
use crate::broadcast::LanguageBroadcaster;
use crate::client::mock::MockClient;
use crate::prefs::MemoryStore;

fn token() -> Credential {
    Credential::new("reader-token")
}

fn intro(client: &MockClient) -> ChapterController<MockClient> {
    ChapterController::mount(Arc::new(client.clone()), "intro", "Hello")
}

fn scripted() -> MockClient {
    MockClient::new()
        .always(Axis::Personalization, "Hi, beginner!")
        .always(Axis::Translation, "سلام")
}

fn signed_in_session() -> Arc<dyn CredentialSource> {
    Arc::new(AuthSession::new(AuthSnapshot::signed_in("ada", token())))
}

fn assert_not_both_pending(ctl: &ChapterController<MockClient>) {
    let state = ctl.snapshot();
    assert!(
        !(state.status(Axis::Personalization) == AxisStatus::Pending
            && state.status(Axis::Translation) == AxisStatus::Pending)
    );
}

#[tokio::test]
async fn toggle_without_token_is_unauthenticated_and_offline() {
    let client = scripted();
    let ctl = intro(&client);

    let res = ctl.toggle_personalization(None).await;

    assert_eq!(res, Err(TransformError::Unauthenticated));
    assert!(client.calls().is_empty());
    assert_eq!(ctl.displayed_content(), "Hello");
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Idle);
}

#[tokio::test]
async fn personalization_success_displays_personalized_content() {
    let client = scripted();
    let ctl = intro(&client);

    let res = ctl.toggle_personalization(Some(&token())).await;

    assert_eq!(res, Ok(Transition::Activated(Axis::Personalization)));
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Active);
    assert_eq!(ctl.displayed_content(), "Hi, beginner!");
    assert_eq!(client.calls()[0].chapter_id, "intro");
}

#[tokio::test]
async fn translation_over_personalization_then_off_refetches_personalization() {
    let client = scripted();
    let ctl = intro(&client);
    let tok = token();

    ctl.toggle_personalization(Some(&tok)).await.unwrap();
    let res = ctl.toggle_translation(Some(&tok)).await;
    assert_eq!(res, Ok(Transition::Activated(Axis::Translation)));
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Active);
    assert_eq!(ctl.displayed_content(), "سلام");
    assert!(ctl.is_rtl());

    let res = ctl.toggle_translation(Some(&tok)).await;
    assert_eq!(
        res,
        Ok(Transition::Reverted {
            axis: Axis::Translation,
            restored: Some(Axis::Personalization),
        })
    );
    assert_eq!(client.call_count(Axis::Personalization), 2);
    assert_eq!(ctl.displayed_content(), "Hi, beginner!");
    assert!(!ctl.is_rtl());
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Idle);
}

#[tokio::test]
async fn failed_translation_leaves_personalization_alone() {
    let client = MockClient::new().always_fail(Axis::Translation, "503 from service");
    let ctl = intro(&client);

    let res = ctl.toggle_translation(Some(&token())).await;

    assert!(matches!(res, Err(TransformError::TransformFailed(_))));
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Failed);
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Idle);
    assert_eq!(ctl.displayed_content(), "Hello");
    assert!(!ctl.last_error().unwrap_or_default().is_empty());
    assert!(!ctl.is_rtl());
}

#[tokio::test]
async fn failed_axis_can_be_retried_and_clears_error() {
    let client = MockClient::new();
    client.push(Axis::Translation, Err(TransformError::failed("timeout")));
    client.push(Axis::Translation, Ok("سلام".into()));
    let ctl = intro(&client);
    let tok = token();

    assert!(ctl.toggle_translation(Some(&tok)).await.is_err());
    assert!(ctl.last_error().is_some());

    let retry = ctl.toggle_translation(Some(&tok));
    assert_eq!(ctl.last_error(), None);
    assert_eq!(retry.await, Ok(Transition::Activated(Axis::Translation)));
}

#[tokio::test]
async fn double_personalization_toggle_returns_to_original() {
    let client = scripted();
    let ctl = intro(&client);
    let tok = token();

    ctl.toggle_personalization(Some(&tok)).await.unwrap();
    let res = ctl.toggle_personalization(Some(&tok)).await;

    assert_eq!(
        res,
        Ok(Transition::Reverted {
            axis: Axis::Personalization,
            restored: None,
        })
    );
    assert_eq!(ctl.displayed_content(), "Hello");
    assert_eq!(client.call_count(Axis::Personalization), 1);
}

#[tokio::test]
async fn personalization_off_with_translation_on_refetches_translation() {
    let client = scripted();
    let ctl = intro(&client);
    let tok = token();

    ctl.toggle_translation(Some(&tok)).await.unwrap();
    ctl.toggle_personalization(Some(&tok)).await.unwrap();
    assert_eq!(ctl.displayed_content(), "Hi, beginner!");
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Active);

    client.set_fallback(Axis::Translation, Err(TransformError::failed("gone")));
    let res = ctl.toggle_personalization(Some(&tok)).await;

    assert!(res.is_err());
    assert_eq!(client.call_count(Axis::Translation), 2);
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Failed);
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Idle);
    assert_eq!(ctl.displayed_content(), "Hello");
}

#[tokio::test]
async fn second_toggle_while_pending_is_rejected() {
    let client = scripted();
    client.hold();
    let ctl = intro(&client);
    let tok = token();

    let first = tokio::spawn(ctl.toggle_personalization(Some(&tok)));
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Pending);

    assert_eq!(
        ctl.toggle_translation(Some(&tok)).await,
        Err(TransformError::InvalidState(Axis::Personalization))
    );
    assert_eq!(
        ctl.toggle_personalization(Some(&tok)).await,
        Err(TransformError::InvalidState(Axis::Personalization))
    );
    assert_not_both_pending(&ctl);
    assert!(!ctl.view(&AuthSnapshot::signed_in("ada", tok.clone())).translate.enabled);

    client.release(1);
    assert_eq!(first.await.unwrap(), Ok(Transition::Activated(Axis::Personalization)));
    assert_eq!(client.call_count(Axis::Translation), 0);
}

#[tokio::test]
async fn revert_all_is_idempotent_from_any_state() {
    let client = scripted();
    let ctl = intro(&client);
    let tok = token();

    ctl.revert_all();
    assert_eq!(ctl.displayed_content(), "Hello");

    ctl.toggle_personalization(Some(&tok)).await.unwrap();
    ctl.toggle_translation(Some(&tok)).await.unwrap();
    for _ in 0..2 {
        ctl.revert_all();
        let state = ctl.snapshot();
        assert_eq!(state.displayed(), "Hello");
        assert_eq!(state.status(Axis::Personalization), AxisStatus::Idle);
        assert_eq!(state.status(Axis::Translation), AxisStatus::Idle);
        assert_eq!(state.last_error(), None);
    }
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn revert_all_discards_response_in_flight() {
    let client = scripted();
    client.hold();
    let ctl = intro(&client);

    let pending = tokio::spawn(ctl.toggle_translation(Some(&token())));
    ctl.revert_all();
    client.release(1);

    assert_eq!(pending.await.unwrap(), Err(TransformError::Superseded));
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Idle);
    assert_eq!(ctl.displayed_content(), "Hello");
}

#[tokio::test]
async fn response_for_previous_chapter_is_ignored() {
    let client = scripted();
    client.hold();
    let ctl = intro(&client);

    let pending = tokio::spawn(ctl.toggle_personalization(Some(&token())));
    ctl.remount("setup", "Setup steps");
    client.release(1);

    assert_eq!(pending.await.unwrap(), Err(TransformError::Superseded));
    let state = ctl.snapshot();
    assert_eq!(state.chapter_id(), "setup");
    assert_eq!(state.displayed(), "Setup steps");
    assert_eq!(state.cached(Axis::Personalization), None);
}

#[tokio::test]
async fn remount_with_same_chapter_keeps_state() {
    let client = scripted();
    let ctl = intro(&client);
    ctl.toggle_personalization(Some(&token())).await.unwrap();

    ctl.remount("intro", "Hello");
    assert_eq!(ctl.displayed_content(), "Hi, beginner!");

    ctl.remount("intro", "Hello, edited");
    assert_eq!(ctl.displayed_content(), "Hello, edited");
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Idle);
}

#[tokio::test]
async fn unmounted_chapter_drops_late_response() {
    let client = scripted();
    client.hold();
    let ctl = intro(&client);

    let pending = tokio::spawn(ctl.toggle_translation(Some(&token())));
    ctl.unmount();
    client.release(1);

    assert_eq!(pending.await.unwrap(), Err(TransformError::Superseded));
}

#[tokio::test]
async fn dropping_unpolled_toggle_frees_the_axis() {
    let client = scripted();
    let ctl = intro(&client);

    let fut = ctl.toggle_translation(Some(&token()));
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Pending);
    drop(fut);

    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Idle);
    assert!(ctl.toggle_personalization(Some(&token())).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn hung_request_times_out_as_failure() {
    let client = scripted();
    client.hold();
    let ctl = ChapterController::with_timeout(
        Arc::new(client.clone()),
        "intro",
        "Hello",
        Duration::from_secs(15),
    );

    let res = ctl.toggle_personalization(Some(&token())).await;

    assert!(matches!(res, Err(TransformError::TransformFailed(ref m)) if m.contains("15")));
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Failed);
    assert_eq!(ctl.displayed_content(), "Hello");
}

#[tokio::test]
async fn dismiss_error_keeps_statuses() {
    let client = MockClient::new().always_fail(Axis::Personalization, "nope");
    let ctl = intro(&client);
    let _ = ctl.toggle_personalization(Some(&token())).await;

    ctl.dismiss_error();

    assert_eq!(ctl.last_error(), None);
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Failed);
}

#[tokio::test]
async fn broadcast_drives_every_attached_chapter() {
    let client = scripted();
    client.hold();
    let broadcaster = LanguageBroadcaster::open(Box::new(MemoryStore::default()));
    let auth = signed_in_session();

    let a = intro(&client);
    let b = ChapterController::mount(Arc::new(client.clone()), "setup", "Setup");
    let c = ChapterController::mount(Arc::new(client.clone()), "ros", "ROS");
    a.attach(&broadcaster, auth.clone());
    b.attach(&broadcaster, auth.clone());
    c.attach(&broadcaster, auth.clone());
    c.detach();

    broadcaster.set_preference(true);

    // Both attached chapters moved within the notification pass itself.
    assert_eq!(a.status(Axis::Translation), AxisStatus::Pending);
    assert_eq!(b.status(Axis::Translation), AxisStatus::Pending);
    assert_eq!(c.status(Axis::Translation), AxisStatus::Idle);

    client.release(2);
    for _ in 0..50 {
        if a.status(Axis::Translation) == AxisStatus::Active
            && b.status(Axis::Translation) == AxisStatus::Active
        {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(a.displayed_content(), "سلام");
    assert_eq!(b.displayed_content(), "سلام");
    assert_eq!(c.displayed_content(), "ROS");
    assert!(a.is_rtl() && b.is_rtl());

    broadcaster.set_preference(false);
    assert_eq!(a.status(Axis::Translation), AxisStatus::Idle);
    assert_eq!(a.displayed_content(), "Hello");
    assert_eq!(client.call_count(Axis::Translation), 2);
}

#[tokio::test]
async fn english_broadcast_falls_back_to_cached_personalization() {
    let client = scripted();
    let ctl = intro(&client);
    let tok = token();
    ctl.toggle_personalization(Some(&tok)).await.unwrap();
    ctl.toggle_translation(Some(&tok)).await.unwrap();

    assert!(ctl.on_external_language_change(false, Some(&tok)).is_none());

    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Idle);
    assert_eq!(ctl.status(Axis::Personalization), AxisStatus::Active);
    assert_eq!(ctl.displayed_content(), "Hi, beginner!");
    assert_eq!(client.call_count(Axis::Personalization), 1);
}

#[tokio::test]
async fn urdu_broadcast_is_noop_when_already_translated_or_signed_out() {
    let client = scripted();
    let ctl = intro(&client);

    assert!(ctl.on_external_language_change(true, None).is_none());
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Idle);

    ctl.toggle_translation(Some(&token())).await.unwrap();
    assert!(ctl.on_external_language_change(true, Some(&token())).is_none());
    assert_eq!(client.call_count(Axis::Translation), 1);
}

#[tokio::test]
async fn english_broadcast_abandons_pending_translation() {
    let client = scripted();
    client.hold();
    let ctl = intro(&client);

    let handle = ctl
        .on_external_language_change(true, Some(&token()))
        .expect("translation started");
    ctl.on_external_language_change(false, Some(&token()));
    client.release(1);

    assert_eq!(handle.await.unwrap(), Err(TransformError::Superseded));
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Idle);
    assert_eq!(ctl.displayed_content(), "Hello");
}

#[tokio::test]
async fn dropped_controller_stops_listening() {
    let client = scripted();
    let broadcaster = LanguageBroadcaster::open(Box::new(MemoryStore::default()));
    let ctl = intro(&client);
    ctl.attach(&broadcaster, signed_in_session());
    assert_eq!(broadcaster.subscriber_count(), 1);

    drop(ctl);
    broadcaster.set_preference(true);

    assert_eq!(broadcaster.subscriber_count(), 0);
    assert!(client.calls().is_empty());
}

#[test]
fn broadcast_from_plain_thread_runs_on_mount_runtime() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let client = scripted();
    let broadcaster = LanguageBroadcaster::open(Box::new(MemoryStore::default()));
    let ctl = rt.block_on(async {
        let ctl = intro(&client);
        ctl.attach(&broadcaster, signed_in_session());
        ctl
    });

    // Outside any runtime, like a UI frame loop.
    assert!(tokio::runtime::Handle::try_current().is_err());
    broadcaster.set_preference(true);
    assert_ne!(ctl.status(Axis::Translation), AxisStatus::Failed);

    rt.block_on(async {
        for _ in 0..200 {
            if ctl.status(Axis::Translation) == AxisStatus::Active {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });
    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Active);
    assert_eq!(ctl.displayed_content(), "سلام");
    assert_eq!(ctl.last_error(), None);
    assert_eq!(client.call_count(Axis::Translation), 1);
}

#[test]
fn language_change_without_any_runtime_fails_visibly() {
    let client = scripted();
    let ctl = intro(&client);

    assert!(ctl.on_external_language_change(true, Some(&token())).is_none());

    assert_eq!(ctl.status(Axis::Translation), AxisStatus::Failed);
    assert!(client.calls().is_empty());
}
