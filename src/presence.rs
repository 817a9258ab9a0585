//! Presence comparison of optional values.
//!
//! Most comparisons in the tree start by asking whether both, one or neither
//! side carries a value; this keeps that branching in one place.

/// Result of comparing the presence of two optional values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    BothAbsent,
    OneSideOnly,
    BothPresent,
}

impl Presence {
    pub fn of<L, R>(left: Option<L>, right: Option<R>) -> Self {
        match (left.is_some(), right.is_some()) {
            (false, false) => Presence::BothAbsent,
            (true, true) => Presence::BothPresent,
            _ => Presence::OneSideOnly,
        }
    }

    /// Resolve two optional values; `Err(bool)` carries the final answer for
    /// the absent cases, `Ok` hands both values over for a deeper comparison.
    pub fn resolve<'a, T: ?Sized>(
        left: Option<&'a T>,
        right: Option<&'a T>,
    ) -> Result<(&'a T, &'a T), bool> {
        match (left, right) {
            (Some(l), Some(r)) => Ok((l, r)),
            (None, None) => Err(true),
            _ => Err(false),
        }
    }
}
