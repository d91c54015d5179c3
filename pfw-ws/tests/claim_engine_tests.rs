//! Claim reservation engine integration tests
//!
//! Exercises the finalize transaction against a real database: exclusive
//! ownership, soft conflicts, tombstones, private sub-pool duplication and
//! loser corrections.

mod helpers;

use helpers::{seed_legacy, RecordingSender};
use pfw_ws::db::{albums, outbox, photos, progress};
use pfw_ws::workflow::finalize_claims;
use std::sync::Arc;

#[tokio::test]
async fn finalize_moves_requested_photos_exclusively() {
    // Scenario A: pool has photos [1,2,3]; user A claims and finalizes [1,2]
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();
    let requested = vec![fx.photos[0], fx.photos[1]];

    let outcome = finalize_claims(&fx.pool, &fx.user_a, &album, &requested)
        .await
        .unwrap();

    assert_eq!(outcome.moved, requested);
    assert!(outcome.conflicts.is_empty());

    // Originals stay in the parent pool, claimed by A
    for &photo_id in &requested {
        let original = photos::get_photo(&fx.pool, photo_id).await.unwrap().unwrap();
        assert_eq!(original.claimed_by, Some(fx.user_a.guid));
        assert_eq!(original.album_id, Some(fx.album_id));
    }

    // Each moved photo exists duplicated in the private sub-pool
    let private = photos::list_album_photos(&fx.pool, outcome.private_album_id)
        .await
        .unwrap();
    assert_eq!(private.len(), 2);
    for duplicate in &private {
        assert_eq!(duplicate.assigned_to, Some(fx.user_a.guid));
        let source = duplicate.source_photo_id.unwrap();
        assert!(requested.contains(&source));
        assert_eq!(outcome.id_mapping[&source], duplicate.guid);
    }

    // The third photo is untouched and still available
    let available = photos::list_available_album_photos(&fx.pool, fx.album_id)
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].guid, fx.photos[2]);
}

#[tokio::test]
async fn contested_photo_is_a_soft_conflict_not_an_error() {
    // Scenario B: A provisionally selects [1,2]; B finalizes [2,3] first
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();

    progress::upsert_for_album(
        &fx.pool,
        fx.user_a.guid,
        fx.album_id,
        &progress::ProgressPatch {
            claimed_ids: Some(vec![fx.photos[0], fx.photos[1]]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let b_outcome = finalize_claims(
        &fx.pool,
        &fx.user_b,
        &album,
        &[fx.photos[1], fx.photos[2]],
    )
    .await
    .unwrap();
    assert_eq!(b_outcome.moved, vec![fx.photos[1], fx.photos[2]]);
    assert!(b_outcome.conflicts.is_empty());

    let a_outcome = finalize_claims(
        &fx.pool,
        &fx.user_a,
        &album,
        &[fx.photos[0], fx.photos[1]],
    )
    .await
    .unwrap();
    assert_eq!(a_outcome.moved, vec![fx.photos[0]]);
    assert_eq!(a_outcome.conflicts, vec![fx.photos[1]]);

    // Overlapping successful finalizes never move the same photo
    assert!(a_outcome.moved.iter().all(|id| !b_outcome.moved.contains(id)));
}

#[tokio::test]
async fn losing_user_selections_are_corrected_and_notified() {
    // Scenario C: B's win prunes photo 2 from A's stored claims and
    // attempts a notification; a failing send never undoes the correction.
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();

    progress::upsert_for_album(
        &fx.pool,
        fx.user_a.guid,
        fx.album_id,
        &progress::ProgressPatch {
            claimed_ids: Some(vec![fx.photos[0], fx.photos[1]]),
            retouch_ids: Some(vec![fx.photos[1]]),
            final_id: Some(Some(fx.photos[1])),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let outcome = finalize_claims(
        &fx.pool,
        &fx.user_b,
        &album,
        &[fx.photos[1], fx.photos[2]],
    )
    .await
    .unwrap();

    assert_eq!(outcome.corrections.len(), 1);
    assert_eq!(outcome.corrections[0].user_id, fx.user_a.guid);
    assert_eq!(outcome.corrections[0].removed, vec![fx.photos[1]]);

    let corrected = progress::get_for_album(&fx.pool, fx.user_a.guid, fx.album_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(corrected.selection.claimed, vec![fx.photos[0]]);
    assert_eq!(corrected.claimed_count, 1);
    assert!(corrected.selection.retouch.is_empty());
    assert_eq!(corrected.retouch_count, 0);
    // The dangling final selection is cleared with the photo it pointed at
    assert_eq!(corrected.selection.final_id, None);

    // One notification was enqueued with the removed ids and winner name
    let pending = outbox::list_pending(&fx.pool, 5, 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].recipient_user_id, fx.user_a.guid);
    assert_eq!(
        pending[0].payload["winner_name"],
        serde_json::json!(fx.user_b.display_name)
    );

    // Delivery failure leaves the correction committed and the message
    // retryable
    let sender = Arc::new(RecordingSender::new(true));
    let delivered = pfw_ws::outbox::drain_once(&fx.pool, sender.as_ref())
        .await
        .unwrap();
    assert_eq!(delivered, 0);

    let still_corrected = progress::get_for_album(&fx.pool, fx.user_a.guid, fx.album_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_corrected.selection.claimed, vec![fx.photos[0]]);

    let retryable = outbox::list_pending(&fx.pool, 5, 10).await.unwrap();
    assert_eq!(retryable.len(), 1);
    assert_eq!(retryable[0].attempts, 1);

    // Next pass with a healthy relay delivers it
    sender.set_fail(false);
    let delivered = pfw_ws::outbox::drain_once(&fx.pool, sender.as_ref())
        .await
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(sender.sent_count(), 1);
    assert!(outbox::list_pending(&fx.pool, 5, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn winner_without_overlap_triggers_no_corrections() {
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();

    progress::upsert_for_album(
        &fx.pool,
        fx.user_a.guid,
        fx.album_id,
        &progress::ProgressPatch {
            claimed_ids: Some(vec![fx.photos[0]]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let outcome = finalize_claims(&fx.pool, &fx.user_b, &album, &[fx.photos[2]])
        .await
        .unwrap();

    assert!(outcome.corrections.is_empty());
    assert!(outbox::list_pending(&fx.pool, 5, 10).await.unwrap().is_empty());

    let untouched = progress::get_for_album(&fx.pool, fx.user_a.guid, fx.album_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.selection.claimed, vec![fx.photos[0]]);
}

#[tokio::test]
async fn finalize_detaches_winner_from_shared_pool() {
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();

    assert!(albums::is_album_member(&fx.pool, fx.user_a.guid, fx.album_id)
        .await
        .unwrap());

    finalize_claims(&fx.pool, &fx.user_a, &album, &[fx.photos[0]])
        .await
        .unwrap();

    assert!(!albums::is_album_member(&fx.pool, fx.user_a.guid, fx.album_id)
        .await
        .unwrap());
    // The other participant stays attached
    assert!(albums::is_album_member(&fx.pool, fx.user_b.guid, fx.album_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn finalize_rejects_private_pools() {
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();

    let outcome = finalize_claims(&fx.pool, &fx.user_a, &album, &[fx.photos[0]])
        .await
        .unwrap();
    let private = albums::get_album(&fx.pool, outcome.private_album_id)
        .await
        .unwrap()
        .unwrap();

    let err = finalize_claims(&fx.pool, &fx.user_a, &private, &[fx.photos[1]])
        .await
        .unwrap_err();
    assert!(matches!(err, pfw_common::Error::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_photo_id_is_a_conflict_for_the_caller() {
    let fx = seed_legacy().await;
    let album = albums::get_album(&fx.pool, fx.album_id).await.unwrap().unwrap();
    let stranger = uuid::Uuid::new_v4();

    let outcome = finalize_claims(&fx.pool, &fx.user_a, &album, &[fx.photos[0], stranger])
        .await
        .unwrap();

    assert_eq!(outcome.moved, vec![fx.photos[0]]);
    assert_eq!(outcome.conflicts, vec![stranger]);
}
