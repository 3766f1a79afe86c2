//! Presentation order generation.
//!
//! A sequence is a list of stimulus-kind indices. Generation lays out the
//! truncated per-kind counts, shuffles them uniformly, then runs a single
//! left-to-right repair pass that pushes a repeated deviant one slot to the
//! right. That pass can leave a pair behind (for instance at the very end of
//! the list); under [`AdjacencyRule::Strict`] such leftovers are resolved by
//! re-spacing the deviants into distinct gaps between the other stimuli.

use crate::config::AdjacencyRule;
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;

/// Builds a presentation order from per-kind `counts`.
///
/// # Panics
/// Under [`AdjacencyRule::Strict`], if the deviant count exceeds the number of
/// other stimuli plus one. [`SequenceConfig::validate`] rejects such configs.
///
/// [`SequenceConfig::validate`]: crate::SequenceConfig::validate
pub fn generate<R: Rng + ?Sized>(
    counts: &[usize],
    deviant: Option<usize>,
    rule: AdjacencyRule,
    rng: &mut R,
) -> Vec<usize> {
    let mut sequence: Vec<usize> = counts
        .iter()
        .enumerate()
        .flat_map(|(kind, &count)| std::iter::repeat_n(kind, count))
        .collect();
    sequence.shuffle(rng);

    let Some(deviant) = deviant else {
        return sequence;
    };

    repair_single_pass(&mut sequence, deviant);

    if rule == AdjacencyRule::Strict && adjacent_pairs(&sequence, deviant) > 0 {
        log::debug!("repair pass left adjacent deviants, re-spacing");
        sequence = space_deviants(&sequence, deviant, rng);
    }
    sequence
}

/// One pass over `1..len-1`: whenever `seq[i]` repeats a deviant at `seq[i-1]`,
/// swap it with `seq[i+1]`. Never increases the number of adjacent pairs.
pub fn repair_single_pass(sequence: &mut [usize], deviant: usize) {
    for i in 1..sequence.len().saturating_sub(1) {
        if sequence[i] == deviant && sequence[i - 1] == deviant {
            sequence.swap(i, i + 1);
        }
    }
}

/// Number of positions where a deviant directly follows a deviant.
pub fn adjacent_pairs(sequence: &[usize], deviant: usize) -> usize {
    sequence
        .windows(2)
        .filter(|w| w[0] == deviant && w[1] == deviant)
        .count()
}

/// Keeps the non-deviant order and drops each deviant into its own randomly
/// chosen gap, so no two deviants touch.
///
/// # Panics
/// If there are more deviants than gaps; configs are validated against this.
fn space_deviants<R: Rng + ?Sized>(sequence: &[usize], deviant: usize, rng: &mut R) -> Vec<usize> {
    let others: Vec<usize> = sequence.iter().copied().filter(|&k| k != deviant).collect();
    let deviants = sequence.len() - others.len();

    let mut gaps = vec![false; others.len() + 1];
    for gap in index::sample(rng, others.len() + 1, deviants) {
        gaps[gap] = true;
    }

    let mut spaced = Vec::with_capacity(sequence.len());
    for (gap, &take) in gaps.iter().enumerate() {
        if take {
            spaced.push(deviant);
        }
        if let Some(&other) = others.get(gap) {
            spaced.push(other);
        }
    }
    spaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const A: usize = 0;
    const B: usize = 1;

    fn count_of(sequence: &[usize], kind: usize) -> usize {
        sequence.iter().filter(|&&k| k == kind).count()
    }

    #[test]
    fn ten_stimuli_never_repeat_the_deviant() {
        for seed in 0..1000 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sequence = generate(&[8, 2], Some(B), AdjacencyRule::Strict, &mut rng);
            assert_eq!(sequence.len(), 10);
            assert_eq!(count_of(&sequence, A), 8);
            assert_eq!(count_of(&sequence, B), 2);
            assert_eq!(adjacent_pairs(&sequence, B), 0, "seed {seed}: {sequence:?}");
        }
    }

    #[test]
    fn counts_survive_shuffle_and_repair() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for rule in [AdjacencyRule::Strict, AdjacencyRule::BestEffort] {
                let sequence = generate(&[60, 25, 15], Some(2), rule, &mut rng);
                assert_eq!(sequence.len(), 100);
                assert_eq!(count_of(&sequence, 0), 60);
                assert_eq!(count_of(&sequence, 1), 25);
                assert_eq!(count_of(&sequence, 2), 15);
            }
        }
    }

    #[test]
    fn single_pass_never_adds_pairs() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let len = rng.random_range(0..40);
            let mut sequence: Vec<usize> = (0..len).map(|_| rng.random_range(0..2)).collect();
            let before = adjacent_pairs(&sequence, B);
            repair_single_pass(&mut sequence, B);
            assert!(adjacent_pairs(&sequence, B) <= before);
        }
    }

    #[test]
    fn single_pass_leaves_trailing_pair() {
        let mut sequence = vec![A, A, A, B, B];
        repair_single_pass(&mut sequence, B);
        assert_eq!(sequence, vec![A, A, A, B, B]);
        assert_eq!(adjacent_pairs(&sequence, B), 1);
    }

    #[test]
    fn single_pass_pushes_repeat_right() {
        let mut sequence = vec![B, B, A, A];
        repair_single_pass(&mut sequence, B);
        assert_eq!(sequence, vec![B, A, B, A]);
    }

    #[test]
    fn best_effort_can_leave_pairs_that_strict_removes() {
        // 2 deviants in 3 slots: only B A B is clean
        let mut best_effort_pairs = 0;
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let loose = generate(&[1, 2], Some(B), AdjacencyRule::BestEffort, &mut rng);
            best_effort_pairs += adjacent_pairs(&loose, B);

            let mut rng = StdRng::seed_from_u64(seed);
            let strict = generate(&[1, 2], Some(B), AdjacencyRule::Strict, &mut rng);
            assert_eq!(strict, vec![B, A, B]);
        }
        assert!(best_effort_pairs > 0);
    }

    #[test]
    fn spacing_keeps_standard_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let sequence = vec![0, 2, 2, 1, 0, 2, 1];
        let spaced = space_deviants(&sequence, 2, &mut rng);
        assert_eq!(adjacent_pairs(&spaced, 2), 0);
        let others: Vec<usize> = spaced.iter().copied().filter(|&k| k != 2).collect();
        assert_eq!(others, vec![0, 1, 0, 1]);
        assert_eq!(count_of(&spaced, 2), 3);
    }

    #[test]
    fn without_deviant_sequence_is_a_plain_shuffle() {
        let mut rng = StdRng::seed_from_u64(11);
        let sequence = generate(&[3, 3], None, AdjacencyRule::Strict, &mut rng);
        assert_eq!(sequence.len(), 6);
        assert_eq!(count_of(&sequence, A), 3);
    }

    #[test]
    fn empty_counts_give_empty_sequence() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate(&[0, 0], Some(B), AdjacencyRule::Strict, &mut rng).is_empty());
    }

    #[test]
    #[should_panic]
    fn strict_generation_panics_on_unseparable_counts() {
        let mut rng = StdRng::seed_from_u64(3);
        // 5 deviants, 1 standard: the single pass always leaves pairs
        generate(&[1, 5], Some(B), AdjacencyRule::Strict, &mut rng);
    }
}
