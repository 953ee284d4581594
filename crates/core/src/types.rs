/// Drawing and entity ids are opaque strings chosen by the caller.
pub type RecordId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A coordinate pair. Whether it is `[lat, lng]` or `[lng, lat]` depends on
/// context; see [`crate::geometry`].
pub type CoordPair = [f64; 2];
