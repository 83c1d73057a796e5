use std::num::NonZeroUsize;

/// Split `records` into consecutive print pages of at most `capacity` cards.
///
/// Order is preserved and only the last page may be short. No records, no pages.
pub fn partition<T>(records: &[T], capacity: NonZeroUsize) -> Vec<&[T]> {
    records.chunks(capacity.get()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn fourteen_records_make_two_pages() {
        let records: Vec<usize> = (1..=14).collect();
        let pages = partition(&records, cap(12));
        let sizes: Vec<usize> = pages.iter().map(|p| p.len()).collect();
        assert_eq!(sizes, vec![12, 2]);
        assert_eq!(pages[1], &[13, 14]);
    }

    #[test]
    fn exact_multiple_has_no_short_page() {
        let records: Vec<usize> = (0..24).collect();
        assert!(partition(&records, cap(12)).iter().all(|p| p.len() == 12));
    }

    #[test]
    fn empty_input_has_no_pages() {
        let records: Vec<u8> = Vec::new();
        assert!(partition(&records, cap(12)).is_empty());
    }

    #[test]
    fn flattening_restores_input() {
        let records: Vec<usize> = (0..37).collect();
        for k in 1..=40 {
            let pages = partition(&records, cap(k));
            let flat: Vec<usize> = pages.concat();
            assert_eq!(flat, records, "capacity {k}");
            assert!(pages.iter().all(|p| !p.is_empty() && p.len() <= k));
        }
    }

    #[test]
    fn partition_is_deterministic() {
        let records: Vec<usize> = (0..30).collect();
        assert_eq!(partition(&records, cap(7)), partition(&records, cap(7)));
    }
}
