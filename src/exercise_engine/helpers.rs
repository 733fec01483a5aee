//! Number draws, seeded shuffles and item builders shared by the topic strategies.
//!
//! Every generator assembles the same pieces: draw numbers that avoid the
//! learner's recent ones, build an item from a question and a correct value,
//! and hand it to the sanitizer. These helpers centralise that work so topic
//! files focus on the arithmetic only.
//!
//! ## Determinism
//!
//! Every random decision goes through an explicitly seeded `StdRng`. Repairs
//! that happen inside the sanitizer use [`content_seed`] so the same input
//! always produces the same output, independent of the session seed.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::exercise_engine::{
    error::Exhausted,
    fraction::same_value,
    models::{AvoidSet, ExerciseItem},
    sanitizer::{sanitize_raw, RawItem},
    text::normalize,
};

/// Fisher-Yates shuffle driven by `rng`.
pub fn shuffle<T, R: Rng>(rng: &mut R, values: &mut [T]) {
    for i in (1..values.len()).rev() {
        let j = rng.gen_range(0..=i);
        values.swap(i, j);
    }
}

/// Stable 64-bit seed from a list of strings (first 8 bytes of SHA-256).
pub fn content_seed<S: AsRef<str>>(parts: &[S]) -> u64 {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_ref().as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Bounded retry: draw until `accept` passes, at most `attempts` times.
///
/// Callers decide what happens on `Err` (usually an unconstrained draw), so
/// the loop always terminates.
pub fn draw_avoiding<T, R: Rng>(
    rng: &mut R,
    attempts: usize,
    mut draw: impl FnMut(&mut R) -> T,
    mut accept: impl FnMut(&T) -> bool,
) -> Result<T, Exhausted> {
    for _ in 0..attempts {
        let candidate = draw(rng);
        if accept(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Exhausted { attempts })
}

/// Draw a fraction `a/b` from the range, avoiding recent numbers when possible.
///
/// `a != b`; the denominator range reaches a little past `max` like the
/// hand-written worksheets do.
pub fn pick_fraction<R: Rng>(
    rng: &mut R,
    (min, max): (u32, u32),
    avoid: &AvoidSet,
    attempts: usize,
) -> (u32, u32) {
    let draw = |rng: &mut R| (rng.gen_range(min..=max), rng.gen_range(min + 1..=max + 4));
    draw_avoiding(rng, attempts, draw, |&(a, b)| a != b && !avoid.contains(a) && !avoid.contains(b))
        .unwrap_or_else(|_| {
            let a = rng.gen_range(min..=max);
            let b = rng.gen_range(min + 1..=max + 4).max(a + 1);
            (a, b)
        })
}

/// Build a multiple-choice item tracking the answer by value.
///
/// Distractors equal to the correct value (as strings or as numbers, e.g.
/// `2/4` against `1/2`) are dropped; the sanitizer refills and shuffles.
pub fn mcq_by_value(
    question: impl Into<String>,
    correct: impl Into<String>,
    distractors: Vec<String>,
    explain: &str,
) -> ExerciseItem {
    let correct = correct.into();
    let key = normalize(&correct);
    let mut choices = vec![correct.clone()];
    choices.extend(
        distractors
            .into_iter()
            .filter(|d| normalize(d) != key && !same_value(d, &correct)),
    );
    sanitize_raw(&RawItem {
        kind: Some("multiple_choice".into()),
        question: Some(question.into()),
        choices,
        correct_index: Some(0),
        explain: Some(explain.to_string()),
        ..RawItem::default()
    })
}

/// Build a match-pairs item.
pub fn pairs_item(title: &str, pairs: Vec<(String, String)>, explain: &str) -> ExerciseItem {
    sanitize_raw(&RawItem {
        kind: Some("match_pairs".into()),
        title: Some(title.to_string()),
        pairs,
        explain: Some(explain.to_string()),
        ..RawItem::default()
    })
}

/// Build a drag-to-bucket item from `(value, bucket index)` assignments.
pub fn bucket_item(
    title: &str,
    buckets: &[String],
    assignments: Vec<(String, usize)>,
    explain: &str,
) -> ExerciseItem {
    let solution = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let values = assignments
                .iter()
                .filter(|(_, bi)| *bi == i)
                .map(|(v, _)| v.clone())
                .collect();
            (b.clone(), values)
        })
        .collect();
    sanitize_raw(&RawItem {
        kind: Some("drag_to_bucket".into()),
        title: Some(title.to_string()),
        items: Some(assignments.into_iter().map(|(v, _)| v).collect()),
        buckets: buckets.to_vec(),
        solution,
        explain: Some(explain.to_string()),
        ..RawItem::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn content_seed_is_stable_and_order_sensitive() {
        assert_eq!(content_seed(&["a", "b"]), content_seed(&["a", "b"]));
        assert_ne!(content_seed(&["a", "b"]), content_seed(&["b", "a"]));
        assert_ne!(content_seed(&["ab"]), content_seed(&["a", "b"]));
    }

    #[test]
    fn draw_avoiding_is_bounded() {
        let mut rng = StdRng::seed_from_u64(1);
        let res = draw_avoiding(&mut rng, 7, |r| r.gen_range(0..10u32), |_| false);
        assert_eq!(res, Err(Exhausted { attempts: 7 }));
        let ok = draw_avoiding(&mut rng, 50, |r| r.gen_range(0..10u32), |n| *n == 3);
        assert_eq!(ok, Ok(3));
    }

    #[test]
    fn pick_fraction_avoids_when_possible_and_terminates_when_not() {
        let mut rng = StdRng::seed_from_u64(9);
        let avoid: AvoidSet = [1u32, 2, 3].into_iter().collect();
        for _ in 0..50 {
            let (a, b) = pick_fraction(&mut rng, (1, 12), &avoid, 50);
            assert!(!avoid.contains(a) && !avoid.contains(b));
            assert_ne!(a, b);
        }
        let everything: AvoidSet = (0..100).collect();
        let (a, b) = pick_fraction(&mut rng, (1, 12), &everything, 10);
        assert!(b > a);
    }

    #[test]
    fn mcq_by_value_drops_equivalent_distractors() {
        let item = mcq_by_value(
            "Which fraction is equivalent to 1/2?",
            "2/4",
            vec!["1/2".into(), "4/8".into(), "1/3".into(), "2/3".into()],
            "Multiply both terms by the same number.",
        );
        let ExerciseItem::MultipleChoice(m) = item else { panic!("expected multiple choice") };
        assert!(m.is_valid());
        assert_eq!(m.correct_choice(), Some("2/4"));
        let equivalents = m.choices.iter().filter(|c| same_value(c, "2/4")).count();
        assert_eq!(equivalents, 1);
    }
}
