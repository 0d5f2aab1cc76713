use crate::types::{Alignment, AlignmentOp, OpKind, Token, TokenSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Deletion,
    Insertion,
}

/// Minimum edit distance alignment of `hypothesis` against `reference`.
///
/// Cell `(i, j)` of the grid holds the cheapest way to turn the first `i`
/// hypothesis tokens into the first `j` reference tokens. Substitution,
/// insertion and deletion all cost 1; a match costs 0.
///
/// Several optimal paths can exist. The backtrace resolves ties in a fixed
/// order so identical inputs always produce the identical alignment:
/// 1. diagonal (Match or Substitution)
/// 2. Deletion (reference token without hypothesis counterpart)
/// 3. Insertion (hypothesis token without reference counterpart)
pub fn align(hypothesis: &TokenSequence, reference: &TokenSequence) -> Alignment {
    let hyp = hypothesis.tokens();
    let refs = reference.tokens();
    let h_len = hyp.len();
    let r_len = refs.len();
    let cols = r_len + 1;
    let cost = cost_grid(hyp, refs);

    let mut ops = Vec::with_capacity(h_len.max(r_len));
    let mut i = h_len;
    let mut j = r_len;
    while i > 0 || j > 0 {
        let here = cost[i * cols + j];
        let step = if i > 0
            && j > 0
            && cost[(i - 1) * cols + (j - 1)] + usize::from(hyp[i - 1] != refs[j - 1]) == here
        {
            Step::Diagonal
        } else if j > 0 && cost[i * cols + (j - 1)] + 1 == here {
            Step::Deletion
        } else {
            debug_assert!(i > 0 && cost[(i - 1) * cols + j] + 1 == here);
            Step::Insertion
        };

        match step {
            Step::Diagonal => {
                let kind = if hyp[i - 1] == refs[j - 1] {
                    OpKind::Match
                } else {
                    OpKind::Substitution
                };
                ops.push(AlignmentOp {
                    kind,
                    hypothesis: Some(hyp[i - 1].clone()),
                    reference: Some(refs[j - 1].clone()),
                    hypothesis_index: Some(i - 1),
                    reference_index: Some(j - 1),
                });
                i -= 1;
                j -= 1;
            }
            Step::Deletion => {
                ops.push(AlignmentOp {
                    kind: OpKind::Deletion,
                    hypothesis: None,
                    reference: Some(refs[j - 1].clone()),
                    hypothesis_index: None,
                    reference_index: Some(j - 1),
                });
                j -= 1;
            }
            Step::Insertion => {
                ops.push(AlignmentOp {
                    kind: OpKind::Insertion,
                    hypothesis: Some(hyp[i - 1].clone()),
                    reference: None,
                    hypothesis_index: Some(i - 1),
                    reference_index: None,
                });
                i -= 1;
            }
        }
    }
    ops.reverse();

    debug_assert_eq!(
        ops.iter().filter(|op| op.kind.is_error()).count(),
        cost[h_len * cols + r_len],
        "backtrace must reproduce the optimal edit cost"
    );
    Alignment::new(ops, h_len, r_len)
}

/// Minimum edit cost only, computed with two rolling rows.
pub fn edit_distance(hypothesis: &TokenSequence, reference: &TokenSequence) -> usize {
    let hyp = hypothesis.tokens();
    let refs = reference.tokens();
    let mut prev: Vec<usize> = (0..=refs.len()).collect();
    let mut curr = vec![0usize; refs.len() + 1];

    for (i, h) in hyp.iter().enumerate() {
        curr[0] = i + 1;
        for (j, r) in refs.iter().enumerate() {
            let diagonal = prev[j] + usize::from(h != r);
            curr[j + 1] = diagonal.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[refs.len()]
}

fn cost_grid(hyp: &[Token], refs: &[Token]) -> Vec<usize> {
    let rows = hyp.len() + 1;
    let cols = refs.len() + 1;
    let mut cost = vec![0usize; rows * cols];

    for (j, cell) in cost.iter_mut().take(cols).enumerate() {
        *cell = j;
    }
    for i in 1..rows {
        cost[i * cols] = i;
        for j in 1..cols {
            let diagonal = cost[(i - 1) * cols + (j - 1)] + usize::from(hyp[i - 1] != refs[j - 1]);
            let insertion = cost[(i - 1) * cols + j] + 1;
            let deletion = cost[i * cols + (j - 1)] + 1;
            cost[i * cols + j] = diagonal.min(insertion).min(deletion);
        }
    }
    cost
}
