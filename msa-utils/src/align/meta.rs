use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::GapProfile;

/// 比对输出的元信息，与输出文件并排保存为 `<prefix>.meta`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// 实际执行的命令行（程序 + 参数）
    pub command: Vec<String>,
    pub input_records: usize,
    pub aligned_records: usize,
    /// 比对后的列数（记录为空时为 None）
    pub columns: Option<usize>,
    pub gap_profile: Option<GapProfile>,
    pub created: DateTime<Utc>,
}

impl RunMeta {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut f = std::fs::File::create(path)?;
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let meta: Self = bincode::deserialize_from(std::io::BufReader::new(f))?;
        Ok(meta)
    }
}
