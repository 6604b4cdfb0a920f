//! Event records, categories, and the identifier registry.
//!
//! [`EventRecord`] is the value stored in every ring slot.  [`RawRecord`]
//! is its on-disk shape: the C `event_record` struct layout (24 bytes,
//! host byte order) so binary traces stay interchangeable with files
//! written by existing C tooling.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
//  Category
// ═══════════════════════════════════════════════════════════════════════

/// Which subsystem produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Category {
    Host = 1,
    Guest = 2,
    Task = 3,
}

impl Category {
    /// Convert a wire byte to a [`Category`], if valid.
    pub fn from_u8(v: u8) -> Option<Self> {
        crate::verified::events::category_from_u8(v)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Host => "HOST",
            Self::Guest => "GUEST",
            Self::Task => "TASK",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Known event identifiers
// ═══════════════════════════════════════════════════════════════════════

/// Registered event identifiers.
///
/// The discriminants are part of the binary trace format and must not
/// change.  Recording accepts any `i32`; this enum only names the ones the
/// registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventId {
    HostReceivedChangeRequest = 101,
    HostAttributeChangeEnd = 102,
    HostSentUpdateWithAck = 103,
    HostSentUpdateWithoutAck = 104,
    HostReceivedChangeWithoutAck = 105,
    HostReceivedChangeWithAck = 106,
    GuestReceivedUpdateWithAck = 201,
    GuestReceivedUpdateWithoutAck = 202,
    GuestSentChangeWithAck = 203,
    GuestSentChangeWithoutAck = 204,
    TaskReleaseJob = 301,
    TaskFinishJob = 302,
}

impl EventId {
    /// Convert a raw identifier to an [`EventId`], if registered.
    pub fn from_i32(v: i32) -> Option<Self> {
        crate::verified::events::event_id_from_i32(v)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Registry display name, e.g. `TASK_EVENT_RELEASE_JOB`.
    pub fn name(&self) -> &'static str {
        crate::verified::events::event_id_name(self)
    }

    /// The subsystem this identifier is recorded under.
    pub fn category(&self) -> Category {
        crate::verified::events::event_id_category(self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════════════

/// Maximum display-name length in bytes, including a C terminator.
pub const EVENT_NAME_LEN: usize = 40;

/// One registry entry: a display name and its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventIdentity {
    pub name: &'static str,
    pub id: i32,
}

const fn entry(id: EventId, name: &'static str) -> EventIdentity {
    assert!(name.len() < EVENT_NAME_LEN);
    EventIdentity {
        name,
        id: id as i32,
    }
}

/// The fixed identifier-to-name table.
pub static EVENT_REGISTRY: [EventIdentity; 12] = [
    entry(EventId::HostReceivedChangeRequest, "HOST_EVENT_RCV_CHGREQ"),
    entry(EventId::HostAttributeChangeEnd, "HOST_EVENT_ATT_CHGEND"),
    entry(EventId::HostSentUpdateWithAck, "HOST_EVENT_SND_UPWIACK"),
    entry(EventId::HostSentUpdateWithoutAck, "HOST_EVENT_SND_UPWOACK"),
    entry(EventId::HostReceivedChangeWithoutAck, "HOST_EVENT_RCV_CHGWOACK"),
    entry(EventId::HostReceivedChangeWithAck, "HOST_EVENT_RCV_CHGWIACK"),
    entry(EventId::GuestReceivedUpdateWithAck, "GUEST_EVENT_RCV_UPWIACK"),
    entry(EventId::GuestReceivedUpdateWithoutAck, "GUEST_EVENT_RCV_UPWOACK"),
    entry(EventId::GuestSentChangeWithAck, "GUEST_EVENT_SND_CHGWIACK"),
    entry(EventId::GuestSentChangeWithoutAck, "GUEST_EVENT_SND_CHGWOACK"),
    entry(EventId::TaskReleaseJob, "TASK_EVENT_RELEASE_JOB"),
    entry(EventId::TaskFinishJob, "TASK_EVENT_FINISH_JOB"),
];

/// Look up the display name for `event_id`.
///
/// Returns `None` for unregistered identifiers; callers should fall back to
/// the raw number.
pub fn lookup(event_id: i32) -> Option<&'static str> {
    crate::verified::events::lookup_name(&EVENT_REGISTRY, event_id)
}

// ═══════════════════════════════════════════════════════════════════════
//  Event record
// ═══════════════════════════════════════════════════════════════════════

/// One recorded observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    pub category: Category,
    pub event_id: i32,
    /// 0 for host events; registration or reference id otherwise.
    pub source_id: i32,
    /// Raw cycle count at record time.
    pub timestamp: u64,
}

impl EventRecord {
    /// Placeholder for never-written slots.
    pub const EMPTY: Self = Self {
        category: Category::Host,
        event_id: 0,
        source_id: 0,
        timestamp: 0,
    };

    /// The registered event, if `event_id` is known.
    pub fn event(&self) -> Option<EventId> {
        EventId::from_i32(self.event_id)
    }

    /// Registry display name, if `event_id` is known.
    pub fn name(&self) -> Option<&'static str> {
        lookup(self.event_id)
    }

    /// Convert a decoded [`RawRecord`].
    ///
    /// Fails with the offending byte when the category is not 1, 2 or 3.
    pub fn from_raw(raw: &RawRecord) -> Result<Self, u8> {
        let category = Category::from_u8(raw.category).ok_or(raw.category)?;
        Ok(Self {
            category,
            event_id: raw.event_id,
            source_id: raw.source_id,
            timestamp: raw.timestamp,
        })
    }

    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            category: self.category.as_u8(),
            event_id: self.event_id,
            source_id: self.source_id,
            timestamp: self.timestamp,
        }
    }
}

/// Screen-dump line: `TYPE[3] SRC[7] EVENT[301] TSC[<20 cols>]`.
impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TYPE[{}] SRC[{}] EVENT[{}] TSC[{:>20}]",
            self.category.as_u8(),
            self.source_id,
            self.event_id,
            self.timestamp,
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Raw on-disk record
// ═══════════════════════════════════════════════════════════════════════

/// Binary record as laid out by the C `event_record` struct.
///
/// `category` sits at offset 0 followed by three padding bytes; the two
/// `i32` fields follow at offsets 4 and 8, then four more padding bytes
/// before the `u64` timestamp at offset 16.  Padding is written as zero
/// and ignored on read.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    pub category: u8,
    pub event_id: i32,
    pub source_id: i32,
    pub timestamp: u64,
}

/// Size of one record in a binary trace.
pub const RECORD_SIZE: usize = std::mem::size_of::<RawRecord>();

const CATEGORY_OFFSET: usize = std::mem::offset_of!(RawRecord, category);
const EVENT_ID_OFFSET: usize = std::mem::offset_of!(RawRecord, event_id);
const SOURCE_ID_OFFSET: usize = std::mem::offset_of!(RawRecord, source_id);
const TIMESTAMP_OFFSET: usize = std::mem::offset_of!(RawRecord, timestamp);

const _: () = assert!(RECORD_SIZE == 24);
const _: () = assert!(CATEGORY_OFFSET == 0);
const _: () = assert!(EVENT_ID_OFFSET == 4);
const _: () = assert!(SOURCE_ID_OFFSET == 8);
const _: () = assert!(TIMESTAMP_OFFSET == 16);

impl RawRecord {
    /// Serialize to host byte order with zeroed padding.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[CATEGORY_OFFSET] = self.category;
        out[EVENT_ID_OFFSET..EVENT_ID_OFFSET + 4].copy_from_slice(&self.event_id.to_ne_bytes());
        out[SOURCE_ID_OFFSET..SOURCE_ID_OFFSET + 4].copy_from_slice(&self.source_id.to_ne_bytes());
        out[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8].copy_from_slice(&self.timestamp.to_ne_bytes());
        out
    }

    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut i32_at = [0u8; 4];
        let mut u64_at = [0u8; 8];

        i32_at.copy_from_slice(&bytes[EVENT_ID_OFFSET..EVENT_ID_OFFSET + 4]);
        let event_id = i32::from_ne_bytes(i32_at);
        i32_at.copy_from_slice(&bytes[SOURCE_ID_OFFSET..SOURCE_ID_OFFSET + 4]);
        let source_id = i32::from_ne_bytes(i32_at);
        u64_at.copy_from_slice(&bytes[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8]);
        let timestamp = u64::from_ne_bytes(u64_at);

        Self {
            category: bytes[CATEGORY_OFFSET],
            event_id,
            source_id,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_matches_c_layout() {
        assert_eq!(RECORD_SIZE, 24);
        assert_eq!(std::mem::align_of::<RawRecord>(), 8);
    }

    #[test]
    fn registry_lookup_for_every_defined_id() {
        let expected = [
            (101, "HOST_EVENT_RCV_CHGREQ"),
            (102, "HOST_EVENT_ATT_CHGEND"),
            (103, "HOST_EVENT_SND_UPWIACK"),
            (104, "HOST_EVENT_SND_UPWOACK"),
            (105, "HOST_EVENT_RCV_CHGWOACK"),
            (106, "HOST_EVENT_RCV_CHGWIACK"),
            (201, "GUEST_EVENT_RCV_UPWIACK"),
            (202, "GUEST_EVENT_RCV_UPWOACK"),
            (203, "GUEST_EVENT_SND_CHGWIACK"),
            (204, "GUEST_EVENT_SND_CHGWOACK"),
            (301, "TASK_EVENT_RELEASE_JOB"),
            (302, "TASK_EVENT_FINISH_JOB"),
        ];
        for (id, name) in expected {
            assert_eq!(lookup(id), Some(name), "id {id}");
        }
        assert_eq!(lookup(999), None);
    }

    #[test]
    fn registry_ids_are_unique() {
        let mut ids: Vec<i32> = EVENT_REGISTRY.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EVENT_REGISTRY.len());
    }

    #[test]
    fn event_id_categories() {
        assert_eq!(EventId::HostSentUpdateWithAck.category(), Category::Host);
        assert_eq!(EventId::GuestSentChangeWithoutAck.category(), Category::Guest);
        assert_eq!(EventId::TaskFinishJob.category(), Category::Task);
    }

    #[test]
    fn display_matches_screen_dump_format() {
        let rec = EventRecord {
            category: Category::Task,
            event_id: 301,
            source_id: 7,
            timestamp: 123_456,
        };
        assert_eq!(
            rec.to_string(),
            "TYPE[3] SRC[7] EVENT[301] TSC[              123456]"
        );
    }

    #[test]
    fn display_host_record_with_max_timestamp() {
        let rec = EventRecord {
            category: Category::Host,
            event_id: 101,
            source_id: 0,
            timestamp: u64::MAX,
        };
        assert_eq!(
            rec.to_string(),
            "TYPE[1] SRC[0] EVENT[101] TSC[18446744073709551615]"
        );
    }

    #[test]
    fn encode_places_fields_at_c_offsets() {
        let raw = RawRecord {
            category: 2,
            event_id: 203,
            source_id: -5,
            timestamp: 0x0102_0304_0506_0708,
        };
        let bytes = raw.encode();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..4], &[0, 0, 0]);
        assert_eq!(&bytes[4..8], &203i32.to_ne_bytes());
        assert_eq!(&bytes[8..12], &(-5i32).to_ne_bytes());
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..24], &0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(RawRecord::decode(&bytes), raw);
    }

    #[test]
    fn decode_ignores_padding() {
        let raw = RawRecord {
            category: 1,
            event_id: 104,
            source_id: 0,
            timestamp: 99,
        };
        let mut bytes = raw.encode();
        bytes[1] = 0xAA;
        bytes[13] = 0x55;
        assert_eq!(RawRecord::decode(&bytes), raw);
    }

    #[test]
    fn from_raw_rejects_unknown_category() {
        let raw = RawRecord {
            category: 9,
            event_id: 101,
            source_id: 0,
            timestamp: 0,
        };
        assert_eq!(EventRecord::from_raw(&raw), Err(9));
    }

    #[test]
    fn unregistered_id_has_no_name() {
        let rec = EventRecord {
            category: Category::Guest,
            event_id: 250,
            source_id: 3,
            timestamp: 1,
        };
        assert!(rec.name().is_none());
        assert!(rec.event().is_none());
    }
}
