//! Pool visibility and selection views
//!
//! One shared step-visibility switch used by both storage generations.
//! Absent progress always yields empty defaults, never an error.

use pfw_common::db::{Photo, ProgressRow, WorkflowStep};
use uuid::Uuid;

/// The subset of a pool's photos visible to a user at a given step.
///
/// claiming/registration see the whole pool; retouch sees the user's
/// claimed photos; tablo sees the retouch picks; completed reviews the
/// claimed set. Any other combination yields an empty view.
pub fn visible_photos(photos: &[Photo], step: WorkflowStep, progress: Option<&ProgressRow>) -> Vec<Photo> {
    match step.canonical() {
        WorkflowStep::Claiming => photos.to_vec(),
        WorkflowStep::Retouch => filter_by(photos, progress, |p| &p.selection.claimed),
        WorkflowStep::Tablo => filter_by(photos, progress, |p| &p.selection.retouch),
        WorkflowStep::Completed => filter_by(photos, progress, |p| &p.selection.claimed),
        WorkflowStep::Registration => unreachable!("canonicalized above"),
    }
}

/// The raw selected-ID list for a step. The tablo step wraps the single
/// stored final id in a one-element list, or an empty list when absent.
pub fn selected_ids(step: WorkflowStep, progress: Option<&ProgressRow>) -> Vec<Uuid> {
    let Some(progress) = progress else {
        return Vec::new();
    };
    match step.canonical() {
        WorkflowStep::Claiming => progress.selection.claimed.clone(),
        WorkflowStep::Retouch => progress.selection.retouch.clone(),
        WorkflowStep::Tablo => progress.selection.final_id.into_iter().collect(),
        WorkflowStep::Completed => progress.selection.claimed.clone(),
        WorkflowStep::Registration => unreachable!("canonicalized above"),
    }
}

fn filter_by<'a, F>(photos: &[Photo], progress: Option<&'a ProgressRow>, ids: F) -> Vec<Photo>
where
    F: Fn(&'a ProgressRow) -> &'a Vec<Uuid>,
{
    let Some(progress) = progress else {
        return Vec::new();
    };
    let wanted = ids(progress);
    photos
        .iter()
        .filter(|photo| wanted.contains(&photo.guid))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfw_common::db::SelectionState;

    fn photo(guid: Uuid) -> Photo {
        Photo {
            guid,
            album_id: Some(Uuid::new_v4()),
            gallery_id: None,
            media_ref: format!("media/{}", guid),
            claimed_by: None,
            assigned_to: None,
            source_photo_id: None,
        }
    }

    fn progress_with(selection: SelectionState) -> ProgressRow {
        ProgressRow {
            guid: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            album_id: Some(Uuid::new_v4()),
            gallery_id: None,
            private_album_id: None,
            current_step: WorkflowStep::Claiming,
            claimed_count: selection.claimed.len() as u32,
            retouch_count: selection.retouch.len() as u32,
            selection,
            finalized_at: None,
            modification_count: 0,
        }
    }

    #[test]
    fn claiming_sees_the_whole_pool_without_progress() {
        let photos: Vec<Photo> = (0..3).map(|_| photo(Uuid::new_v4())).collect();
        let visible = visible_photos(&photos, WorkflowStep::Claiming, None);
        assert_eq!(visible.len(), 3);
    }

    #[test]
    fn retouch_without_progress_is_empty() {
        let photos: Vec<Photo> = (0..3).map(|_| photo(Uuid::new_v4())).collect();
        assert!(visible_photos(&photos, WorkflowStep::Retouch, None).is_empty());
        assert!(selected_ids(WorkflowStep::Retouch, None).is_empty());
    }

    #[test]
    fn retouch_sees_only_claimed_photos() {
        let photos: Vec<Photo> = (0..3).map(|_| photo(Uuid::new_v4())).collect();
        let progress = progress_with(SelectionState {
            claimed: vec![photos[0].guid, photos[2].guid],
            ..Default::default()
        });

        let visible = visible_photos(&photos, WorkflowStep::Retouch, Some(&progress));

        let ids: Vec<Uuid> = visible.iter().map(|p| p.guid).collect();
        assert_eq!(ids, vec![photos[0].guid, photos[2].guid]);
    }

    #[test]
    fn tablo_sees_the_retouch_subset() {
        let photos: Vec<Photo> = (0..3).map(|_| photo(Uuid::new_v4())).collect();
        let progress = progress_with(SelectionState {
            claimed: photos.iter().map(|p| p.guid).collect(),
            retouch: vec![photos[1].guid],
            final_id: None,
        });

        let visible = visible_photos(&photos, WorkflowStep::Tablo, Some(&progress));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].guid, photos[1].guid);
    }

    #[test]
    fn completed_reviews_the_claimed_set() {
        let photos: Vec<Photo> = (0..2).map(|_| photo(Uuid::new_v4())).collect();
        let progress = progress_with(SelectionState {
            claimed: vec![photos[1].guid],
            ..Default::default()
        });

        let visible = visible_photos(&photos, WorkflowStep::Completed, Some(&progress));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].guid, photos[1].guid);
    }

    #[test]
    fn tablo_selection_wraps_the_single_final_id() {
        let final_id = Uuid::new_v4();
        let progress = progress_with(SelectionState {
            claimed: vec![final_id],
            retouch: vec![final_id],
            final_id: Some(final_id),
        });

        assert_eq!(selected_ids(WorkflowStep::Tablo, Some(&progress)), vec![final_id]);

        let without_final = progress_with(SelectionState {
            claimed: vec![final_id],
            retouch: vec![final_id],
            final_id: None,
        });
        assert!(selected_ids(WorkflowStep::Tablo, Some(&without_final)).is_empty());
    }

    #[test]
    fn registration_mirrors_claiming() {
        let photos: Vec<Photo> = (0..2).map(|_| photo(Uuid::new_v4())).collect();
        let progress = progress_with(SelectionState {
            claimed: vec![photos[0].guid],
            ..Default::default()
        });

        assert_eq!(
            visible_photos(&photos, WorkflowStep::Registration, Some(&progress)).len(),
            visible_photos(&photos, WorkflowStep::Claiming, Some(&progress)).len(),
        );
        assert_eq!(
            selected_ids(WorkflowStep::Registration, Some(&progress)),
            selected_ids(WorkflowStep::Claiming, Some(&progress)),
        );
    }
}
