use std::ops::Range;

/// Splits `0..count` into contiguous ranges, one per worker thread.
///
/// Uses `min(max_threads, ceil(count / min_per_thread))` ranges. Points that do not divide evenly
/// are handed out one per range, starting with the first range.
/// Always returns at least one range, which is empty for `count == 0`.
pub fn thread_ranges(count: usize, min_per_thread: usize, max_threads: usize) -> Vec<Range<usize>> {
    let min_per_thread = min_per_thread.max(1);
    let max_threads = max_threads.max(1);

    if count <= min_per_thread {
        return vec![0..count];
    }

    let num_threads = max_threads.min(count.div_ceil(min_per_thread));
    let per_thread = count / num_threads;
    let mut remainder = count % num_threads;

    let mut ranges = Vec::with_capacity(num_threads);
    let mut start = 0;
    for _ in 0..num_threads {
        let mut end = start + per_thread;
        if remainder > 0 {
            end += 1;
            remainder -= 1;
        }
        ranges.push(start..end);
        start = end;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_batches_use_one_range() {
        assert_eq!(thread_ranges(0, 100, 8), vec![0..0]);
        assert_eq!(thread_ranges(1, 100, 8), vec![0..1]);
        assert_eq!(thread_ranges(100, 100, 8), vec![0..100]);
    }

    #[test]
    fn remainder_goes_to_first_ranges() {
        let ranges = thread_ranges(203, 100, 8);
        assert_eq!(ranges, vec![0..68, 68..136, 136..203]);
    }

    #[test]
    fn thread_count_is_capped() {
        let ranges = thread_ranges(10_000, 100, 4);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges.first(), Some(&(0..2500)));
        assert_eq!(ranges.last(), Some(&(7500..10_000)));
    }

    #[test]
    fn ranges_are_contiguous_and_cover_everything() {
        for count in [101, 257, 999, 1234] {
            let ranges = thread_ranges(count, 100, 7);
            let mut expected_start = 0;
            for range in &ranges {
                assert_eq!(range.start, expected_start);
                assert!(!range.is_empty());
                expected_start = range.end;
            }
            assert_eq!(expected_start, count);
        }
    }
}
