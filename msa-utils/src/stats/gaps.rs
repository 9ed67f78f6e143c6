use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{MsaError, Result};
use crate::util::GAP;

/// 每一列含 gap 的序列百分比，取值 [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapProfile {
    values: Vec<f64>,
}

impl GapProfile {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Columns (0-based) whose gap percentage is at least `threshold`.
    pub fn gapped_columns(&self, threshold: f64) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v >= threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// TSV with a 1-based column index and the percentage to two decimals.
    pub fn write_tsv<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "#column\tgap_percent")?;
        for (i, v) in self.values.iter().enumerate() {
            writeln!(w, "{}\t{:.2}", i + 1, v)?;
        }
        Ok(())
    }
}

impl From<GapProfile> for Vec<f64> {
    fn from(p: GapProfile) -> Self {
        p.values
    }
}

/// 计算多序列比对中每一列的 gap 百分比。
/// 所有序列必须等长；长度不一致时返回 `LengthMismatch`（第一个不一致的序列下标）。
pub fn compute_gap_profile<S: AsRef<str>>(seqs: &[S]) -> Result<GapProfile> {
    let first = seqs
        .first()
        .ok_or_else(|| MsaError::InvalidInput("gap profile needs at least one sequence".into()))?;
    let len = first.as_ref().chars().count();

    let mut counts = vec![0u32; len];
    for (index, s) in seqs.iter().enumerate() {
        let s = s.as_ref();
        let found = s.chars().count();
        if found != len {
            return Err(MsaError::LengthMismatch { index, expected: len, found });
        }
        for (col, ch) in s.chars().enumerate() {
            if ch == GAP {
                counts[col] += 1;
            }
        }
    }

    let n = seqs.len() as f64;
    let values = counts.into_iter().map(|c| 100.0 * c as f64 / n).collect();
    Ok(GapProfile { values })
}
