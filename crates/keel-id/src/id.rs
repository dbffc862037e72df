use core::fmt;

/// A 64-bit Snowflake ID split into a data center and a worker field.
///
/// - 1 bit reserved (sign, always zero)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 5 bits data center ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63       63 62        22 21           17 16       12 11        0
///              +----------+------------+---------------+-----------+-----------+
///  Field:      | sign (1) | stamp (41) | data center(5)| worker (5)| seq (12)  |
///              +----------+------------+---------------+-----------+-----------+
///              |<---------- MSB ------------ 64 bits ------------ LSB -------->|
/// ```
///
/// IDs compare in the same order as their raw values, so two IDs from the same
/// generator sort by creation time.
///
/// # Example
///
/// ```
/// use keel_id::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 3, 7, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.data_center_id(), 3);
/// assert_eq!(id.worker_id(), 7);
/// assert_eq!(id.sequence(), 1);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: i64,
}

impl SnowflakeId {
    /// Bitmask for the 41-bit timestamp field. Occupies bits 22 through 62.
    pub const TIMESTAMP_MASK: i64 = (1 << 41) - 1;

    /// Bitmask for the 5-bit data center field. Occupies bits 17 through 21.
    pub const DATA_CENTER_ID_MASK: i64 = (1 << 5) - 1;

    /// Bitmask for the 5-bit worker field. Occupies bits 12 through 16.
    pub const WORKER_ID_MASK: i64 = (1 << 5) - 1;

    /// Bitmask for the 12-bit sequence field. Occupies bits 0 through 11.
    pub const SEQUENCE_MASK: i64 = (1 << 12) - 1;

    /// Number of bits to shift the timestamp to its position (bit 22).
    pub const TIMESTAMP_SHIFT: u32 = 22;

    /// Number of bits to shift the data center ID to its position (bit 17).
    pub const DATA_CENTER_ID_SHIFT: u32 = 17;

    /// Number of bits to shift the worker ID to its position (bit 12).
    pub const WORKER_ID_SHIFT: u32 = 12;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u32 = 0;

    /// Largest timestamp offset representable in 41 bits.
    pub const MAX_TIMESTAMP: u64 = Self::TIMESTAMP_MASK as u64;

    /// Largest accepted data center ID.
    pub const MAX_DATA_CENTER_ID: u64 = Self::DATA_CENTER_ID_MASK as u64;

    /// Largest accepted worker ID.
    pub const MAX_WORKER_ID: u64 = Self::WORKER_ID_MASK as u64;

    /// Largest sequence value within a single millisecond.
    pub const MAX_SEQUENCE: u64 = Self::SEQUENCE_MASK as u64;

    /// Packs the given components. Values wider than their field are masked.
    pub const fn from_components(
        timestamp: u64,
        data_center_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp as i64 & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let data_center_id =
            (data_center_id as i64 & Self::DATA_CENTER_ID_MASK) << Self::DATA_CENTER_ID_SHIFT;
        let worker_id = (worker_id as i64 & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence as i64 & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | data_center_id | worker_id | sequence,
        }
    }

    /// Extracts the timestamp offset (ms since epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        ((self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK) as u64
    }

    /// Extracts the data center ID from the packed ID.
    pub const fn data_center_id(&self) -> u64 {
        ((self.id >> Self::DATA_CENTER_ID_SHIFT) & Self::DATA_CENTER_ID_MASK) as u64
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        ((self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK) as u64
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        ((self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK) as u64
    }

    /// Returns the raw signed 64-bit value.
    pub const fn to_raw(&self) -> i64 {
        self.id
    }

    /// Wraps a raw value without validation.
    pub const fn from_raw(raw: i64) -> Self {
        Self { id: raw }
    }

    /// Returns `false` if the reserved sign bit is set.
    pub const fn is_valid(&self) -> bool {
        self.id >= 0
    }

    /// Returns true if the sequence can be incremented within this
    /// millisecond.
    pub const fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::MAX_SEQUENCE
    }

    /// Returns a new ID with the sequence incremented.
    pub const fn increment_sequence(&self) -> Self {
        Self::from_components(
            self.timestamp(),
            self.data_center_id(),
            self.worker_id(),
            self.sequence() + 1,
        )
    }

    /// Returns a new ID for a newer timestamp with the sequence reset to zero.
    pub const fn rollover_to_timestamp(&self, timestamp: u64) -> Self {
        Self::from_components(timestamp, self.data_center_id(), self.worker_id(), 0)
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("data_center_id", &self.data_center_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
