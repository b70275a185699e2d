//! Field merge rules for node records
//!
//! Pure functions, no I/O. Precedence per field:
//! - registration: request, then fetched info, then default
//! - heartbeat: request, then fetched info, then stored value
//! - sweep probe: fetched info, then stored value
//!
//! `p2p_node_id` only survives while `p2p_enabled` resolves to true.

use chrono::{DateTime, Utc};
use rollcall_persistence::NodeRecord;

use crate::probe::NodeInfo;
use crate::service::AnnounceRequest;

/// Negative reported counts are stored as zero
pub fn clamp_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn pick<T: Clone>(request: Option<&T>, fetched: Option<&T>, fallback: T) -> T {
    request.or(fetched).cloned().unwrap_or(fallback)
}

fn pick_count(request: Option<i64>, fetched: Option<i64>, fallback: u64) -> u64 {
    request.or(fetched).map(clamp_count).unwrap_or(fallback)
}

fn p2p_node_id(
    enabled: bool,
    request: Option<&String>,
    fetched: Option<&String>,
    stored: Option<&String>,
) -> Option<String> {
    if enabled {
        request.or(fetched).or(stored).cloned()
    } else {
        None
    }
}

/// Longest stored name, version, country or p2p node id, in characters
pub const MAX_TEXT_CHARS: usize = 255;
/// Longest stored description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

fn truncate_chars(mut value: String, max: usize) -> String {
    if let Some((end, _)) = value.char_indices().nth(max) {
        value.truncate(end);
    }
    value
}

/// Cut reported text fields down to what the store holds
fn bounded(record: NodeRecord) -> NodeRecord {
    NodeRecord {
        name: truncate_chars(record.name, MAX_TEXT_CHARS),
        description: truncate_chars(record.description, MAX_DESCRIPTION_CHARS),
        version: truncate_chars(record.version, MAX_TEXT_CHARS),
        p2p_node_id: record.p2p_node_id.map(|id| truncate_chars(id, MAX_TEXT_CHARS)),
        country: record.country.map(|c| truncate_chars(c, MAX_TEXT_CHARS)),
        ..record
    }
}

/// Build the record for a first registration
pub fn new_record(
    id: String,
    token: String,
    domain: String,
    request: &AnnounceRequest,
    fetched: Option<&NodeInfo>,
    now: DateTime<Utc>,
) -> NodeRecord {
    let info = fetched.cloned().unwrap_or_default();
    let p2p_enabled = pick(
        request.p2p_enabled.as_ref(),
        info.p2p_enabled.as_ref(),
        false,
    );

    bounded(NodeRecord {
        id,
        domain,
        name: pick(request.name.as_ref(), info.name.as_ref(), String::new()),
        description: pick(
            request.description.as_ref(),
            info.description.as_ref(),
            String::new(),
        ),
        version: pick(request.version.as_ref(), info.version.as_ref(), String::new()),
        track_count: pick_count(request.track_count, info.track_count, 0),
        user_count: pick_count(request.user_count, info.user_count, 0),
        open_registration: pick(
            request.open_registration.as_ref(),
            info.open_registration.as_ref(),
            true,
        ),
        p2p_enabled,
        p2p_node_id: p2p_node_id(
            p2p_enabled,
            request.p2p_node_id.as_ref(),
            info.p2p_node_id.as_ref(),
            None,
        ),
        country: None,
        token,
        first_seen: now,
        last_seen: now,
        last_healthy: now,
        is_online: true,
        down_since: None,
    })
}

/// Apply an authenticated heartbeat to the stored record
///
/// Identity fields and `first_seen` are carried over untouched.
pub fn merge_heartbeat(
    existing: &NodeRecord,
    request: &AnnounceRequest,
    fetched: Option<&NodeInfo>,
    now: DateTime<Utc>,
) -> NodeRecord {
    let info = fetched.cloned().unwrap_or_default();
    let p2p_enabled = pick(
        request.p2p_enabled.as_ref(),
        info.p2p_enabled.as_ref(),
        existing.p2p_enabled,
    );

    bounded(NodeRecord {
        name: pick(request.name.as_ref(), info.name.as_ref(), existing.name.clone()),
        description: pick(
            request.description.as_ref(),
            info.description.as_ref(),
            existing.description.clone(),
        ),
        version: pick(
            request.version.as_ref(),
            info.version.as_ref(),
            existing.version.clone(),
        ),
        track_count: pick_count(request.track_count, info.track_count, existing.track_count),
        user_count: pick_count(request.user_count, info.user_count, existing.user_count),
        open_registration: pick(
            request.open_registration.as_ref(),
            info.open_registration.as_ref(),
            existing.open_registration,
        ),
        p2p_enabled,
        p2p_node_id: p2p_node_id(
            p2p_enabled,
            request.p2p_node_id.as_ref(),
            info.p2p_node_id.as_ref(),
            existing.p2p_node_id.as_ref(),
        ),
        last_seen: now,
        last_healthy: now,
        is_online: true,
        down_since: None,
        ..existing.clone()
    })
}

/// Apply a successful sweep probe to the stored record
pub fn merge_probe(existing: &NodeRecord, fetched: Option<&NodeInfo>, now: DateTime<Utc>) -> NodeRecord {
    merge_heartbeat(existing, &AnnounceRequest::default(), fetched, now)
}

/// Mark a record offline after a failed sweep probe
///
/// `down_since` is only stamped on the online to offline transition; a record
/// already offline keeps its original value (or gets `now` if it was lost).
pub fn mark_offline(existing: &NodeRecord, now: DateTime<Utc>) -> NodeRecord {
    let down_since = if existing.is_online {
        now
    } else {
        existing.down_since.unwrap_or(now)
    };

    NodeRecord {
        is_online: false,
        down_since: Some(down_since),
        ..existing.clone()
    }
}
