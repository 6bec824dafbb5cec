//! Segment tag for the 2Q fabric.
//!
//! Every key resident in [`crate::cache2q::Cache2Q`] lives in exactly one of the two
//! segments, tracked here as [`Location`]. The entry itself (key, value, position handle)
//! is a private concern of [`crate::cache2q`]; this module exists only to give that tag a
//! name shared across the crate.

/// Which segment an entry currently lives in.
///
/// Construction assigns each entry directly to one of the two segments (the first
/// `protect_cap` generated keys go to `Protected`, the rest to `Probationary` — see
/// `Cache2Q::new`); there is no entry that starts in `Probationary` and waits for its
/// first hit to be promoted for the first time. After construction, a hit while in
/// `Probationary` promotes it to `Protected`; if `Protected` is already full, its
/// least-recently-used entry demotes back down to `Probationary` rather than being
/// discarded outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The protected segment: entries assigned here at construction, or promoted here
    /// by a later hit while in `Probationary`. Bounded by the configured protected
    /// capacity.
    Protected,
    /// The probationary segment: entries assigned here at construction, or demoted
    /// here when `Protected` overflows. Eviction always happens from this segment's
    /// tail.
    Probationary,
}
