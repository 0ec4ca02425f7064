//! Group listing for observers.

use wabridge_protocol::GroupSummary;
use wabridge_session::{GroupMetadataCache, SessionConnection};

/// Image URL used when a group has no picture or its lookup fails.
pub const PLACEHOLDER_IMAGE: &str = "https://cdn-icons-png.flaticon.com/512/8184/8184182.png";

/// Lists every group on `connection`, sorted by name then id.
///
/// Never fails: a failed listing yields an empty list, and a failed
/// picture lookup yields [`PLACEHOLDER_IMAGE`] for that group only. The
/// fetched metadata is stored in `cache` after stale entries are swept.
pub(crate) async fn list_groups<C: SessionConnection>(
    connection: &C,
    cache: &GroupMetadataCache,
) -> Vec<GroupSummary> {
    let expired = cache.expire_stale().await;
    if !expired.is_empty() {
        tracing::debug!(expired = expired.len(), "dropped stale group metadata");
    }

    let groups = match connection.fetch_all_groups().await {
        Ok(groups) => groups,
        Err(e) => {
            tracing::warn!(error = %e, "group listing failed, returning empty list");
            return Vec::new();
        }
    };

    let mut summaries = Vec::with_capacity(groups.len());
    for (id, metadata) in groups {
        let image = match connection.fetch_profile_picture(&id).await {
            Ok(Some(url)) => url,
            Ok(None) => PLACEHOLDER_IMAGE.to_string(),
            Err(e) => {
                tracing::debug!(group = %id, error = %e, "picture lookup failed, placeholder");
                PLACEHOLDER_IMAGE.to_string()
            }
        };

        summaries.push(GroupSummary {
            id,
            name: metadata.subject.clone(),
            participants: metadata.size,
            image,
        });
        cache.insert(metadata).await;
    }

    summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.as_str().cmp(b.id.as_str())));
    tracing::debug!(groups = summaries.len(), "group listing complete");
    summaries
}
