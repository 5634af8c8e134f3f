use crate::size::SizeUnit;

/// true if a disk of `total` bytes fits next to the disks already allocated
/// under `quota` bytes. `others` must not include the disk being resized.
pub fn fits_quota(others: u64, total: u64, quota: u64) -> bool {
    others.checked_add(total).map(|sum| sum <= quota).unwrap_or(false)
}

/// size given for a new or resized disk. must be a positive amount in one of
/// the disk units.
pub fn disk_size_valid(value: f64, unit: SizeUnit) -> bool {
    unit.is_disk_unit() && value.is_finite() && value > 0.0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::size::GIBI;

    #[test]
    fn quota_fit() {
        assert!(fits_quota(5 * GIBI, 5 * GIBI, 10 * GIBI));
        assert!(!fits_quota(10 * GIBI, GIBI, 10 * GIBI));
        assert!(!fits_quota(u64::MAX, 1, u64::MAX));
    }

    #[test]
    fn disk_sizes() {
        assert!(disk_size_valid(10.0, SizeUnit::GB));
        assert!(!disk_size_valid(0.0, SizeUnit::GB));
        assert!(!disk_size_valid(10.0, SizeUnit::KB));
        assert!(!disk_size_valid(f64::INFINITY, SizeUnit::TB));
    }
}
