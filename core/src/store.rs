use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::StoreError;
use crate::events::EngagementEvent;
use crate::profile::EngagementProfile;

/// The storage seam hosts inject their backend through.
///
/// `apply` is the only write path: a validated event folds into the
/// profile for its estimate, creating the profile on first sight.
/// Implementations must keep that read-modify-write atomic per estimate
/// id, and must not serialize writes across different ids; folds for
/// unrelated estimates happen concurrently.
///
/// `delete` is a retention hook for the embedding host. Engagement data
/// expiry is the host's policy and nothing in this engine calls it.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fold one validated event into its estimate's profile.
    async fn apply(&self, event: &EngagementEvent) -> Result<(), StoreError>;

    /// Fetch the profile for an estimate, if any events arrived yet.
    async fn get(&self, estimate_id: &str) -> Result<Option<EngagementProfile>, StoreError>;

    /// Page through profiles, most recently updated first.
    async fn list(
        &self,
        cursor: Option<ListCursor>,
        limit: usize,
    ) -> Result<ProfilePage, StoreError>;

    /// Drop an estimate's profile. Returns whether one existed.
    async fn delete(&self, estimate_id: &str) -> Result<bool, StoreError>;
}

/// Position inside the `list` ordering: most recently updated first,
/// estimate id ascending as the tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCursor {
    pub last_updated_at: DateTime<Utc>,
    pub estimate_id: String,
}

impl ListCursor {
    /// Cursor pointing just past `profile` in the list order.
    pub fn after(profile: &EngagementProfile) -> Self {
        Self {
            last_updated_at: profile.last_updated_at,
            estimate_id: profile.estimate_id.clone(),
        }
    }

    /// Whether `profile` sorts strictly after this cursor position.
    pub fn precedes(&self, profile: &EngagementProfile) -> bool {
        match profile.last_updated_at.cmp(&self.last_updated_at) {
            Ordering::Less => true,
            Ordering::Equal => profile.estimate_id > self.estimate_id,
            Ordering::Greater => false,
        }
    }
}

/// One page of profiles plus the cursor for the next one, if any.
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profiles: Vec<EngagementProfile>,
    pub next_cursor: Option<ListCursor>,
}

/// Cursor-based pagination envelope for list endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    /// Cursor for the next page. None if this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Whether there are more results after this page
    pub has_more: bool,
}

/// In-memory store backing tests and single-node deployments.
///
/// Profiles live in a sharded map keyed by estimate id, so folds for
/// different estimates never block one another. `apply` holds a single
/// key's entry for the duration of one fold, which keeps the
/// read-modify-write atomic per estimate.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<String, EngagementProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn apply(&self, event: &EngagementEvent) -> Result<(), StoreError> {
        let mut entry = self
            .profiles
            .entry(event.estimate_id.clone())
            .or_insert_with(|| {
                EngagementProfile::new(event.estimate_id.clone(), event.occurred_at)
            });
        entry.fold(event);
        Ok(())
    }

    async fn get(&self, estimate_id: &str) -> Result<Option<EngagementProfile>, StoreError> {
        Ok(self.profiles.get(estimate_id).map(|entry| entry.clone()))
    }

    async fn list(
        &self,
        cursor: Option<ListCursor>,
        limit: usize,
    ) -> Result<ProfilePage, StoreError> {
        let mut rows: Vec<EngagementProfile> = self
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            b.last_updated_at
                .cmp(&a.last_updated_at)
                .then_with(|| a.estimate_id.cmp(&b.estimate_id))
        });
        if let Some(cursor) = &cursor {
            rows.retain(|profile| cursor.precedes(profile));
        }

        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more {
            rows.last().map(ListCursor::after)
        } else {
            None
        };

        Ok(ProfilePage {
            profiles: rows,
            next_cursor,
        })
    }

    async fn delete(&self, estimate_id: &str) -> Result<bool, StoreError> {
        Ok(self.profiles.remove(estimate_id).is_some())
    }
}
