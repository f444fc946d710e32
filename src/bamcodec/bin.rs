/// UCSC-style enclosing-interval bin for `[begin, end)`. `begin`/`end` can be
/// negative for an unmapped or clipped-only record, so every intermediate
/// sum stays in signed `i32` space and only the final, always-non-negative
/// bin id is cast to `u32` — casting a negative shift result to `u32` first
/// (as the bin-table offsets would otherwise be added to) overflows.
pub fn calculate_minimum_bin(begin: i32, end: i32) -> u32 {
    let end = end - 1;
    let bin = if begin >> 14 == end >> 14 {
        4681 + (begin >> 14)
    } else if begin >> 17 == end >> 17 {
        585 + (begin >> 17)
    } else if begin >> 20 == end >> 20 {
        73 + (begin >> 20)
    } else if begin >> 23 == end >> 23 {
        9 + (begin >> 23)
    } else if begin >> 26 == end >> 26 {
        1 + (begin >> 26)
    } else {
        0
    };
    bin.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_16kb_bucket_is_densest_bin() {
        assert_eq!(calculate_minimum_bin(100, 200), 4681 + (100 >> 14) as u32);
    }

    #[test]
    fn whole_chromosome_falls_to_bin_zero() {
        assert_eq!(calculate_minimum_bin(0, 1 << 29), 0);
    }

    #[test]
    fn boundary_crossing_picks_coarser_bin() {
        // begin and end land in different 16kb buckets but the same 128kb one.
        let begin = (1 << 14) - 1;
        let end = (1 << 14) + 1;
        assert_eq!(calculate_minimum_bin(begin, end), 585 + (begin >> 17) as u32);
    }

    #[test]
    fn negative_begin_and_end_does_not_overflow() {
        // An unmapped record's position is -1; end_position() stays negative
        // too when it has no reference-consuming CIGAR ops.
        assert_eq!(calculate_minimum_bin(-1, -1), 4680);
    }
}
