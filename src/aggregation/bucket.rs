use crate::error::{IndexerError, Result};

/// Separator between the parent id and the bucket index in a bucket id.
pub const BUCKET_SEPARATOR: char = '-';

/// A fixed-width time bucket of one parent entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// `{parent_id}-{index}`
    pub id: String,
    /// `floor(timestamp / width)`
    pub index: i64,
    /// `index * width`, always aligned
    pub start: i64,
}

/// Maps `(timestamp, width, parent_id)` to its bucket.
///
/// The index is floored toward negative infinity, so pre-epoch timestamps land
/// in the bucket that contains them (`-1` with a day width is index `-1`,
/// start `-86400`).
///
/// Bucket ids are only injective if the parent id cannot absorb part of the
/// index, so parent ids must be non-empty and must not end with
/// [`BUCKET_SEPARATOR`]. Chain-prefixed pool and token ids always satisfy this.
pub fn derive_bucket(timestamp: i64, width: i64, parent_id: &str) -> Result<Bucket> {
    if width <= 0 {
        return Err(IndexerError::InvalidConfiguration(format!(
            "bucket width must be positive, got {width}"
        )));
    }

    if parent_id.is_empty() || parent_id.ends_with(BUCKET_SEPARATOR) {
        return Err(IndexerError::InvalidConfiguration(format!(
            "parent id {parent_id:?} cannot be used as a bucket key prefix"
        )));
    }

    let index = timestamp.div_euclid(width);
    let start = index.checked_mul(width).ok_or_else(|| {
        IndexerError::InvalidConfiguration(format!(
            "bucket start of timestamp {timestamp} with width {width} is out of range"
        ))
    })?;

    Ok(Bucket {
        id: format!("{parent_id}{BUCKET_SEPARATOR}{index}"),
        index,
        start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;
    const HOUR: i64 = 3_600;

    #[test]
    fn test_first_day_bucket() {
        let bucket = derive_bucket(1_000, DAY, "1-0xpool").unwrap();
        assert_eq!(bucket.id, "1-0xpool-0");
        assert_eq!(bucket.index, 0);
        assert_eq!(bucket.start, 0);
    }

    #[test]
    fn test_same_bucket_for_timestamps_in_one_day() {
        let a = derive_bucket(1_000, DAY, "1-0xpool").unwrap();
        let b = derive_bucket(50_000, DAY, "1-0xpool").unwrap();
        assert_eq!(a, b);

        let next = derive_bucket(90_000, DAY, "1-0xpool").unwrap();
        assert_eq!(next.id, "1-0xpool-1");
        assert_eq!(next.start, DAY);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(derive_bucket(DAY - 1, DAY, "p").unwrap().index, 0);
        assert_eq!(derive_bucket(DAY, DAY, "p").unwrap().index, 1);

        let hour = derive_bucket(7_199, HOUR, "p").unwrap();
        assert_eq!(hour.index, 1);
        assert_eq!(hour.start, HOUR);
    }

    #[test]
    fn test_pre_epoch_floors_toward_negative_infinity() {
        let bucket = derive_bucket(-1, DAY, "1-0xpool").unwrap();
        assert_eq!(bucket.index, -1);
        assert_eq!(bucket.start, -DAY);
        assert_eq!(bucket.id, "1-0xpool--1");

        let exact = derive_bucket(-DAY, DAY, "1-0xpool").unwrap();
        assert_eq!(exact.index, -1);
        assert_eq!(exact.start, -DAY);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for ts in [0, 1, 3_599, 3_600, 1_700_000_000, -42] {
            assert_eq!(
                derive_bucket(ts, HOUR, "137-0xabc").unwrap(),
                derive_bucket(ts, HOUR, "137-0xabc").unwrap()
            );
        }
    }

    #[test]
    fn test_zero_width_is_invalid_configuration() {
        let err = derive_bucket(1_000, 0, "1-0xpool").unwrap_err();
        assert!(matches!(err, IndexerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_negative_width_is_invalid_configuration() {
        let err = derive_bucket(1_000, -DAY, "1-0xpool").unwrap_err();
        assert!(matches!(err, IndexerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_ambiguous_parent_ids() {
        assert!(derive_bucket(1_000, DAY, "").is_err());
        // "1-0xpool-" with index 1 would collide with "1-0xpool" at index -1
        assert!(derive_bucket(1_000, DAY, "1-0xpool-").is_err());
    }

    #[test]
    fn test_out_of_range_start_is_rejected() {
        let err = derive_bucket(i64::MIN, DAY, "p").unwrap_err();
        assert!(matches!(err, IndexerError::InvalidConfiguration(_)));

        let max = derive_bucket(i64::MAX, DAY, "p").unwrap();
        assert_eq!(max.start, (i64::MAX / DAY) * DAY);
    }
}
