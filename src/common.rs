use std::ops::Deref;

use crate::HerdlockError;

/// A validated time-slice width in seconds.
///
/// Slice boundaries are computed by floor-dividing seconds-since-epoch by
/// this width, so zero is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SliceSeconds(u64);

impl TryFrom<u64> for SliceSeconds {
    type Error = HerdlockError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(HerdlockError::InvalidSliceSeconds(
                "slice width must be > 0 seconds".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

impl Deref for SliceSeconds {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for SliceSeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
