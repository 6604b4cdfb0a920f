//! Pure conversions and lookups for event identifiers.
//!
//! | Function               | Wrapped by                          |
//! |------------------------|-------------------------------------|
//! | [`category_from_u8`]   | `Category::from_u8()`               |
//! | [`event_id_from_i32`]  | `EventId::from_i32()`               |
//! | [`event_id_name`]      | `EventId::name()`                   |
//! | [`event_id_category`]  | `EventId::category()`               |
//! | [`lookup_name`]        | `events::lookup()` (registry scan)  |

use crate::events::{Category, EventId, EventIdentity};

/// Convert a wire category byte to a [`Category`].
///
/// Valid bytes are 1 (host), 2 (guest) and 3 (task).
pub fn category_from_u8(v: u8) -> Option<Category> {
    let result = match v {
        1 => Some(Category::Host),
        2 => Some(Category::Guest),
        3 => Some(Category::Task),
        _ => None,
    };

    // Postcondition: round-trip.
    debug_assert!(
        result.is_none() || result.map(|c| c as u8) == Some(v),
        "category_from_u8: round-trip violation for v={v}"
    );

    result
}

/// Convert a numeric event identifier to a known [`EventId`].
///
/// Returns `None` for any identifier outside the registry.  Recording never
/// validates identifiers, so `None` is an expected outcome here.
pub fn event_id_from_i32(v: i32) -> Option<EventId> {
    let result = match v {
        101 => Some(EventId::HostReceivedChangeRequest),
        102 => Some(EventId::HostAttributeChangeEnd),
        103 => Some(EventId::HostSentUpdateWithAck),
        104 => Some(EventId::HostSentUpdateWithoutAck),
        105 => Some(EventId::HostReceivedChangeWithoutAck),
        106 => Some(EventId::HostReceivedChangeWithAck),
        201 => Some(EventId::GuestReceivedUpdateWithAck),
        202 => Some(EventId::GuestReceivedUpdateWithoutAck),
        203 => Some(EventId::GuestSentChangeWithAck),
        204 => Some(EventId::GuestSentChangeWithoutAck),
        301 => Some(EventId::TaskReleaseJob),
        302 => Some(EventId::TaskFinishJob),
        _ => None,
    };

    debug_assert!(
        result.is_none() || result.map(|e| e as i32) == Some(v),
        "event_id_from_i32: round-trip violation for v={v}"
    );

    result
}

/// Display name of a known event, as stored in trace tooling.
pub fn event_id_name(id: &EventId) -> &'static str {
    let result = match id {
        EventId::HostReceivedChangeRequest => "HOST_EVENT_RCV_CHGREQ",
        EventId::HostAttributeChangeEnd => "HOST_EVENT_ATT_CHGEND",
        EventId::HostSentUpdateWithAck => "HOST_EVENT_SND_UPWIACK",
        EventId::HostSentUpdateWithoutAck => "HOST_EVENT_SND_UPWOACK",
        EventId::HostReceivedChangeWithoutAck => "HOST_EVENT_RCV_CHGWOACK",
        EventId::HostReceivedChangeWithAck => "HOST_EVENT_RCV_CHGWIACK",
        EventId::GuestReceivedUpdateWithAck => "GUEST_EVENT_RCV_UPWIACK",
        EventId::GuestReceivedUpdateWithoutAck => "GUEST_EVENT_RCV_UPWOACK",
        EventId::GuestSentChangeWithAck => "GUEST_EVENT_SND_CHGWIACK",
        EventId::GuestSentChangeWithoutAck => "GUEST_EVENT_SND_CHGWOACK",
        EventId::TaskReleaseJob => "TASK_EVENT_RELEASE_JOB",
        EventId::TaskFinishJob => "TASK_EVENT_FINISH_JOB",
    };

    debug_assert!(!result.is_empty(), "event_id_name returned empty string");

    result
}

/// The subsystem an event identifier belongs to.
///
/// Identifiers are grouped by hundreds: 1xx host, 2xx guest, 3xx task.
pub fn event_id_category(id: &EventId) -> Category {
    match *id as i32 / 100 {
        1 => Category::Host,
        2 => Category::Guest,
        _ => Category::Task,
    }
}

/// Linear scan of `table` for `event_id`.
///
/// Returns the first matching name, or `None` when the identifier is not
/// registered.  The table is small and this runs only on export paths.
pub fn lookup_name(table: &[EventIdentity], event_id: i32) -> Option<&'static str> {
    table
        .iter()
        .find(|entry| entry.id == event_id)
        .map(|entry| entry.name)
}
