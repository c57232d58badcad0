use crate::{HerdlockError, SliceSeconds};

#[test]
fn slice_seconds_rejects_zero() {
    assert!(matches!(
        SliceSeconds::try_from(0),
        Err(HerdlockError::InvalidSliceSeconds(_))
    ));
}

#[test]
fn slice_seconds_accepts_positive_widths() {
    for width in [1_u64, 60, 3600] {
        let slice_seconds = SliceSeconds::try_from(width).unwrap();
        assert_eq!(*slice_seconds, width);
    }
}
