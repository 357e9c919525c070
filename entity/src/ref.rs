//! The `EntityRef` trait.

/// A type wrapping a small dense index, used as the key of a
/// [`PrimaryMap`](crate::PrimaryMap) or [`SecondaryMap`](crate::SecondaryMap).
///
/// Implementors are expected to be `Copy` newtypes around a `u32`; see the
/// [`entity_impl!`](crate::entity_impl) macro for the boilerplate.
pub trait EntityRef: Copy + Eq {
    /// Create a new entity reference from a linear index.
    fn new(index: usize) -> Self;

    /// Get the index of this reference.
    fn index(self) -> usize;
}
