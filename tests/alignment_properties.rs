use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use transcript_wer::{align, edit_distance, score, BatchAggregate, OpKind, TokenSequence};

const SEED: u64 = 42;
const ROUNDS: usize = 200;
const VOCAB: [&str; 8] = ["hi", "this", "is", "ahmed", "and", "i", "love", "pancakes"];

fn random_sequence(rng: &mut StdRng, max_len: usize) -> TokenSequence {
    let len = rng.gen_range(0..=max_len);
    TokenSequence::from_words((0..len).map(|_| VOCAB[rng.gen_range(0..VOCAB.len())]))
}

/// Small random edit of `reference`, so pairs look like recognizer output.
fn perturb(rng: &mut StdRng, reference: &TokenSequence) -> TokenSequence {
    let mut words: Vec<&str> = reference.words().collect();
    for _ in 0..rng.gen_range(0..4) {
        let pick = VOCAB[rng.gen_range(0..VOCAB.len())];
        match rng.gen_range(0..3) {
            0 if !words.is_empty() => {
                let at = rng.gen_range(0..words.len());
                words[at] = pick;
            }
            1 if !words.is_empty() => {
                let at = rng.gen_range(0..words.len());
                words.remove(at);
            }
            _ => {
                let at = rng.gen_range(0..=words.len());
                words.insert(at, pick);
            }
        }
    }
    TokenSequence::from_words(words)
}

#[test]
fn self_alignment_is_all_matches() {
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..ROUNDS {
        let reference = random_sequence(&mut rng, 20);
        let alignment = align(&reference, &reference);
        assert!(alignment.ops().iter().all(|op| op.kind == OpKind::Match));
        let summary = score(&alignment, &[]);
        if reference.is_empty() {
            assert!(summary.wer_or_none().is_none());
        } else {
            assert_eq!(summary.wer().unwrap(), 0.0);
        }
    }
}

#[test]
fn edit_count_equals_minimum_edit_distance() {
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    for _ in 0..ROUNDS {
        let reference = random_sequence(&mut rng, 16);
        let hypothesis = if rng.gen_bool(0.5) {
            perturb(&mut rng, &reference)
        } else {
            random_sequence(&mut rng, 16)
        };
        let alignment = align(&hypothesis, &reference);
        assert_eq!(
            alignment.edit_count(),
            edit_distance(&hypothesis, &reference),
            "hyp={:?} ref={:?}",
            hypothesis.words().collect::<Vec<_>>(),
            reference.words().collect::<Vec<_>>()
        );
    }
}

#[test]
fn alignment_reconstructs_both_sequences() {
    let mut rng = StdRng::seed_from_u64(SEED + 2);
    for _ in 0..ROUNDS {
        let reference = random_sequence(&mut rng, 16);
        let hypothesis = perturb(&mut rng, &reference);
        let alignment = align(&hypothesis, &reference);

        let hyp: Vec<&str> = alignment.hypothesis_tokens().map(|t| t.as_str()).collect();
        let refs: Vec<&str> = alignment.reference_tokens().map(|t| t.as_str()).collect();
        assert_eq!(hyp, hypothesis.words().collect::<Vec<_>>());
        assert_eq!(refs, reference.words().collect::<Vec<_>>());

        let mut expected_hyp_index = 0;
        let mut expected_ref_index = 0;
        for op in alignment.ops() {
            if let Some(index) = op.hypothesis_index {
                assert_eq!(index, expected_hyp_index);
                expected_hyp_index += 1;
            }
            if let Some(index) = op.reference_index {
                assert_eq!(index, expected_ref_index);
                expected_ref_index += 1;
            }
        }
    }
}

#[test]
fn appending_unknown_word_never_lowers_wer() {
    let mut rng = StdRng::seed_from_u64(SEED + 3);
    for _ in 0..ROUNDS {
        let reference = random_sequence(&mut rng, 16);
        if reference.is_empty() {
            continue;
        }
        let hypothesis = perturb(&mut rng, &reference);
        let mut extended: Vec<&str> = hypothesis.words().collect();
        extended.push("zzyzx");
        let extended = TokenSequence::from_words(extended);

        let before = score(&align(&hypothesis, &reference), &[]);
        let after = score(&align(&extended, &reference), &[]);
        assert!(after.wer().unwrap() >= before.wer().unwrap());
        assert!(after.counts.errors() <= before.counts.errors() + 1);
        // Insertions minus deletions is fixed by the length difference.
        assert_eq!(
            after.counts.insertions as i64 - after.counts.deletions as i64,
            before.counts.insertions as i64 - before.counts.deletions as i64 + 1
        );
    }
}

#[test]
fn appending_unknown_word_adds_one_insertion() {
    let reference = TokenSequence::from_words(
        "hi this is ahmed and i love eating pancakes with or without a syrup".split(' '),
    );
    let hypothesis = TokenSequence::from_words(
        "hi this is amed and i love eating pancakes with or without a syrup".split(' '),
    );
    let mut extended: Vec<&str> = hypothesis.words().collect();
    extended.push("zzyzx");
    let extended = TokenSequence::from_words(extended);

    let before = score(&align(&hypothesis, &reference), &[]);
    let after = score(&align(&extended, &reference), &[]);
    assert_eq!(before.counts.insertions, 0);
    assert_eq!(after.counts.insertions, 1);
    assert_eq!(after.counts.substitutions, 1);
    assert!((after.wer().unwrap() - 2.0 / 14.0).abs() < 1e-12);
}

fn words(text: &str) -> TokenSequence {
    TokenSequence::from_words(text.split(' '))
}

fn with_unknown_word(hypothesis: &TokenSequence) -> TokenSequence {
    TokenSequence::from_words(hypothesis.words().chain(["zzyzx"]))
}

#[test]
fn appending_unknown_word_can_reshape_an_optimal_alignment() {
    let reference = words("a b b c a a a");
    let hypothesis = words("c c b a b c b");

    let before = align(&hypothesis, &reference);
    let after = align(&with_unknown_word(&hypothesis), &reference);
    assert_eq!(before.edit_string(), "SSMSSSS");
    assert_eq!(after.edit_string(), "ISMIMMDSS");
    // Same cost, so WER is unchanged, but no cost-6 alignment of the longer
    // hypothesis has fewer than two insertions.
    assert_eq!(before.edit_count(), 6);
    assert_eq!(after.edit_count(), 6);

    let before = score(&before, &[]);
    let after = score(&after, &[]);
    assert_eq!(before.wer().unwrap(), after.wer().unwrap());
    assert_eq!(before.counts.insertions, 0);
    assert_eq!(after.counts.insertions, 2);
}

#[test]
fn appending_unknown_word_after_trailing_insertion() {
    let reference = words("a b c a b");
    let hypothesis = words("c c b a b c");

    let before = align(&hypothesis, &reference);
    let after = align(&with_unknown_word(&hypothesis), &reference);
    assert_eq!(before.edit_string(), "SSSMMI");
    assert_eq!(after.edit_string(), "IIIMMMDS");

    let before = score(&before, &[]);
    let after = score(&after, &[]);
    assert_eq!(after.counts.errors(), before.counts.errors() + 1);
    assert_eq!((before.counts.insertions, before.counts.deletions), (1, 0));
    assert_eq!((after.counts.insertions, after.counts.deletions), (3, 1));
    assert!(after.wer().unwrap() > before.wer().unwrap());
}

#[test]
fn pooled_wer_differs_from_mean_of_item_wers() {
    let short_ref = TokenSequence::from_words(["a", "b"]);
    let short_hyp = TokenSequence::from_words(["a", "x"]);
    let long_ref = TokenSequence::from_words(["a", "b", "c", "d", "e", "f", "g", "h"]);

    let short = score(&align(&short_hyp, &short_ref), &[]);
    let long = score(&align(&long_ref, &long_ref), &[]);
    let aggregate: BatchAggregate = [&short, &long].into_iter().collect();

    assert!((aggregate.wer().unwrap() - 0.1).abs() < 1e-12);
    let mean = (short.wer().unwrap() + long.wer().unwrap()) / 2.0;
    assert!((mean - 0.25).abs() < 1e-12);
}

#[test]
fn pooled_counts_do_not_depend_on_order() {
    let mut rng = StdRng::seed_from_u64(SEED + 4);
    let summaries: Vec<_> = (0..50)
        .map(|_| {
            let reference = random_sequence(&mut rng, 12);
            let hypothesis = perturb(&mut rng, &reference);
            score(&align(&hypothesis, &reference), &[])
        })
        .collect();

    let forward: BatchAggregate = summaries.iter().collect();
    let backward: BatchAggregate = summaries.iter().rev().collect();
    let halves = summaries[..25]
        .iter()
        .collect::<BatchAggregate>()
        .merge(summaries[25..].iter().collect());
    assert_eq!(forward.counts, backward.counts);
    assert_eq!(forward.counts, halves.counts);
    assert_eq!(forward.item_count, 50);
}
