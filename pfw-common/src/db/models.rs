//! Database models and core workflow types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard default for the per-user retouch selection limit, used when neither
/// the session override, the partner default nor the pool default is set.
pub const DEFAULT_MAX_RETOUCH: u32 = 5;

/// The four-step selection workflow.
///
/// `Registration` is a display alias of `Claiming`: it parses and serializes
/// as its own value but occupies the same position in the step order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    Claiming,
    Registration,
    Retouch,
    Tablo,
    Completed,
}

impl WorkflowStep {
    /// Collapse the registration alias onto claiming.
    pub fn canonical(self) -> WorkflowStep {
        match self {
            WorkflowStep::Registration => WorkflowStep::Claiming,
            other => other,
        }
    }

    /// Position in the forward-only step order.
    pub fn position(self) -> u8 {
        match self.canonical() {
            WorkflowStep::Claiming => 0,
            WorkflowStep::Retouch => 1,
            WorkflowStep::Tablo => 2,
            WorkflowStep::Completed => 3,
            WorkflowStep::Registration => unreachable!("canonicalized above"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStep::Claiming => "claiming",
            WorkflowStep::Registration => "registration",
            WorkflowStep::Retouch => "retouch",
            WorkflowStep::Tablo => "tablo",
            WorkflowStep::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<WorkflowStep> {
        match s {
            "claiming" => Some(WorkflowStep::Claiming),
            "registration" => Some(WorkflowStep::Registration),
            "retouch" => Some(WorkflowStep::Retouch),
            "tablo" => Some(WorkflowStep::Tablo),
            "completed" => Some(WorkflowStep::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user selection state: always this flat record, never a nested map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Photo IDs the user has claimed (provisional before finalize,
    /// private-pool IDs after).
    #[serde(default)]
    pub claimed: Vec<Uuid>,
    /// Subset of claimed IDs picked for retouching.
    #[serde(default)]
    pub retouch: Vec<Uuid>,
    /// The single final-selection (tablo) photo, if chosen.
    #[serde(default)]
    pub final_id: Option<Uuid>,
}

impl SelectionState {
    /// Remove the given IDs from the claimed and retouch sets. Clears
    /// `final_id` when it points at a removed photo. Returns the IDs that
    /// were actually present and removed from the claimed set.
    pub fn remove_ids(&mut self, ids: &[Uuid]) -> Vec<Uuid> {
        let removed: Vec<Uuid> = self
            .claimed
            .iter()
            .copied()
            .filter(|id| ids.contains(id))
            .collect();
        self.claimed.retain(|id| !ids.contains(id));
        self.retouch.retain(|id| !ids.contains(id));
        if let Some(final_id) = self.final_id {
            if ids.contains(&final_id) {
                self.final_id = None;
            }
        }
        removed
    }
}

/// Partner (studio group) scope with its retouch-limit default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub guid: Uuid,
    pub name: String,
    pub default_max_retouch: Option<u32>,
}

/// Legacy project scope: one photo session run by a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSession {
    pub guid: Uuid,
    pub partner_id: Uuid,
    pub name: String,
    pub max_retouch_override: Option<u32>,
}

/// Album kind: the shared candidate pool, or a per-user private sub-pool
/// created at finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumKind {
    Shared,
    Private,
}

impl AlbumKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumKind::Shared => "shared",
            AlbumKind::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<AlbumKind> {
        match s {
            "shared" => Some(AlbumKind::Shared),
            "private" => Some(AlbumKind::Private),
            _ => None,
        }
    }
}

/// Legacy pool: an album under a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub guid: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub kind: AlbumKind,
    /// Owning user for private sub-pools.
    pub owner_user_id: Option<Uuid>,
    /// Shared parent for private sub-pools.
    pub parent_album_id: Option<Uuid>,
    pub max_retouch: Option<u32>,
}

/// Newer pool generation: a gallery under a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gallery {
    pub guid: Uuid,
    pub partner_id: Uuid,
    pub name: String,
    pub max_retouch: Option<u32>,
}

/// A candidate photo. Belongs to exactly one pool (album or gallery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub guid: Uuid,
    pub album_id: Option<Uuid>,
    pub gallery_id: Option<Uuid>,
    pub media_ref: String,
    /// Set exactly once, at finalize: the user who owns the original row.
    pub claimed_by: Option<Uuid>,
    /// Set on rows duplicated into a private sub-pool.
    pub assigned_to: Option<Uuid>,
    /// For duplicated rows, the original photo in the shared parent.
    pub source_photo_id: Option<Uuid>,
}

/// Per-(user, pool) workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRow {
    pub guid: Uuid,
    pub user_id: Uuid,
    pub album_id: Option<Uuid>,
    pub gallery_id: Option<Uuid>,
    /// Private sub-pool created at claim time (legacy generation only).
    pub private_album_id: Option<Uuid>,
    pub current_step: WorkflowStep,
    pub selection: SelectionState,
    pub claimed_count: u32,
    pub retouch_count: u32,
    pub finalized_at: Option<chrono::DateTime<chrono::Utc>>,
    pub modification_count: u32,
}

/// Participant identity. Authentication lives elsewhere; the workflow only
/// needs a display name and a notification address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: Uuid,
    pub display_name: String,
    pub email: String,
}

/// A queued best-effort notification, written in the same transaction as the
/// data correction it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub guid: Uuid,
    pub recipient_user_id: Uuid,
    pub template_key: String,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_an_alias_of_claiming() {
        assert_eq!(
            WorkflowStep::Registration.canonical(),
            WorkflowStep::Claiming
        );
        assert_eq!(
            WorkflowStep::Registration.position(),
            WorkflowStep::Claiming.position()
        );
    }

    #[test]
    fn step_order_is_forward_only() {
        assert!(WorkflowStep::Claiming.position() < WorkflowStep::Retouch.position());
        assert!(WorkflowStep::Retouch.position() < WorkflowStep::Tablo.position());
        assert!(WorkflowStep::Tablo.position() < WorkflowStep::Completed.position());
    }

    #[test]
    fn step_round_trips_through_strings() {
        for step in [
            WorkflowStep::Claiming,
            WorkflowStep::Registration,
            WorkflowStep::Retouch,
            WorkflowStep::Tablo,
            WorkflowStep::Completed,
        ] {
            assert_eq!(WorkflowStep::parse(step.as_str()), Some(step));
        }
        assert_eq!(WorkflowStep::parse("editing"), None);
    }

    #[test]
    fn remove_ids_prunes_claimed_retouch_and_final() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut selection = SelectionState {
            claimed: vec![a, b, c],
            retouch: vec![b, c],
            final_id: Some(c),
        };

        let removed = selection.remove_ids(&[b, c]);

        assert_eq!(removed, vec![b, c]);
        assert_eq!(selection.claimed, vec![a]);
        assert!(selection.retouch.is_empty());
        assert_eq!(selection.final_id, None);
    }

    #[test]
    fn remove_ids_keeps_unrelated_final() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut selection = SelectionState {
            claimed: vec![a, b],
            retouch: vec![a],
            final_id: Some(a),
        };

        selection.remove_ids(&[b]);

        assert_eq!(selection.final_id, Some(a));
        assert_eq!(selection.claimed, vec![a]);
    }
}
