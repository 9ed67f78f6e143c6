use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

use log::warn;

use super::header;
use crate::error::{MsaError, Result};
use crate::io::fasta::{self, FastaReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub seq: String,
}

/// 重复标识符的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// 返回 `DuplicateIdentifier` 错误
    #[default]
    Error,
    /// 记录警告，后出现的序列覆盖先前的值（保留原位置）
    WarnOverwrite,
    /// 记录警告，保留第一次出现的序列
    WarnKeepFirst,
}

/// Identifier -> aligned sequence, kept in the order the records appear in
/// the alignment output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSet {
    records: Vec<SequenceRecord>,
    index: HashMap<String, usize>,
}

impl AlignedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under `policy`. `line` is only used for reporting.
    pub fn insert(&mut self, id: String, seq: String, line: usize, policy: DuplicatePolicy) -> Result<()> {
        match self.index.get(&id) {
            None => {
                self.index.insert(id.clone(), self.records.len());
                self.records.push(SequenceRecord { id, seq });
            }
            Some(&pos) => match policy {
                DuplicatePolicy::Error => return Err(MsaError::DuplicateIdentifier { id, line }),
                DuplicatePolicy::WarnOverwrite => {
                    warn!("duplicate identifier '{}' at line {}; replacing earlier sequence", id, line);
                    self.records[pos].seq = seq;
                }
                DuplicatePolicy::WarnKeepFirst => {
                    warn!("duplicate identifier '{}' at line {}; keeping first sequence", id, line);
                }
            },
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&i| self.records[i].seq.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|r| (r.id.as_str(), r.seq.as_str()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn sequences(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.seq.as_str()).collect()
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    /// Write the set back out using the `> Seq <id>` header convention.
    pub fn write_fasta<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for r in &self.records {
            fasta::write_record(w, &header::format_header(&r.id), &r.seq)?;
        }
        Ok(())
    }

    /// 解析比对输出：每个 `>` 行开始一条新记录，标识符取 `Seq` 之后的 token，
    /// 序列行拼接（去掉空白与换行）直到下一个记录头或文件结束。
    pub fn parse<R: BufRead>(reader: R, policy: DuplicatePolicy) -> Result<Self> {
        let mut set = Self::new();
        let mut fr = FastaReader::new(reader);
        while let Some(rec) = fr.next_record()? {
            let id = header::parse_identifier(&rec)?.to_string();
            set.insert(id, rec.seq, rec.line, policy)?;
        }
        Ok(set)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, policy: DuplicatePolicy) -> Result<Self> {
        let fh = std::fs::File::open(path.as_ref())?;
        Self::parse(std::io::BufReader::new(fh), policy)
    }
}
