//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Identity is optional because entities are built in memory before the entity
/// store assigns them one on first persist.
pub trait Entity: Sized {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Human-readable entity type name, used in error messages.
    const KIND: &'static str;

    /// Returns the entity identifier, if one has been assigned.
    fn id(&self) -> Option<Self::Id>;

    /// A new, empty instance with no identity.
    fn blank() -> Self;
}
