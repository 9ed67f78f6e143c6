use rayon::prelude::*;

use crate::error::{MsaError, Result};

/// 逐位一致性：相同位置字符相等的比例，取值 [0, 1]。
/// 两条序列必须等长且非空。
pub fn score_identity(a: &str, b: &str) -> Result<f64> {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a != len_b {
        return Err(MsaError::LengthMismatch { index: 1, expected: len_a, found: len_b });
    }
    if len_a == 0 {
        return Err(MsaError::InvalidInput("cannot score empty sequences".into()));
    }
    let matches = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    Ok(matches as f64 / len_a as f64)
}

/// Pairwise identity of every sequence against every other, computed on the
/// current rayon pool. The matrix is symmetric with 1.0 on the diagonal.
pub fn identity_matrix<S: AsRef<str> + Sync>(seqs: &[S]) -> Result<Vec<Vec<f64>>> {
    if let Some(first) = seqs.first() {
        let expected = first.as_ref().chars().count();
        for (index, s) in seqs.iter().enumerate() {
            let found = s.as_ref().chars().count();
            if found != expected {
                return Err(MsaError::LengthMismatch { index, expected, found });
            }
        }
    }

    let upper: Vec<Vec<f64>> = (0..seqs.len())
        .into_par_iter()
        .map(|i| {
            (i + 1..seqs.len())
                .map(|j| score_identity(seqs[i].as_ref(), seqs[j].as_ref()))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    let n = seqs.len();
    let mut m = vec![vec![1.0; n]; n];
    for (i, row) in upper.into_iter().enumerate() {
        for (k, v) in row.into_iter().enumerate() {
            let j = i + 1 + k;
            m[i][j] = v;
            m[j][i] = v;
        }
    }
    Ok(m)
}

/// Mean of the off-diagonal identities; `None` with fewer than two sequences.
pub fn mean_pairwise_identity<S: AsRef<str> + Sync>(seqs: &[S]) -> Result<Option<f64>> {
    let n = seqs.len();
    if n < 2 {
        return Ok(None);
    }
    let m = identity_matrix(seqs)?;
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += m[i][j];
        }
    }
    let pairs = n * (n - 1) / 2;
    Ok(Some(total / pairs as f64))
}
