//! # msa-utils
//!
//! 生物大分子序列分析的辅助工具集。
//!
//! 本 crate 提供：
//!
//! - **残基名规范化**：三字母氨基酸 / 核苷酸（含修饰核苷酸）名称转单字母代码
//! - **多序列比对编排**：写出 FASTA、调用外部比对程序（MUSCLE 风格命令行）、
//!   有界等待其完成、解析比对结果
//! - **gap 统计**：比对中每一列含 gap 的序列百分比
//! - **一致性打分**：两条等长序列的逐位一致比例
//!
//! ## 快速示例
//!
//! ```rust
//! use msa_utils::stats::{compute_gap_profile, score_identity};
//! use msa_utils::util::residue;
//!
//! let seq = residue::canonicalize_residues(["MET", "ALA", "PSU"]);
//! assert_eq!(seq, "MAU");
//!
//! let profile = compute_gap_profile(&["AC-GT", "ACTGT", "AC-G-"]).unwrap();
//! assert_eq!(profile.len(), 5);
//!
//! assert_eq!(score_identity("ACGT", "ACGA").unwrap(), 0.75);
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA 读写
//! - [`align`] — 外部比对工具编排与比对结果解析
//! - [`stats`] — gap 百分比与序列一致性
//! - [`util`] — 残基名代码表
//! - [`error`] — 错误类型

pub mod align;
pub mod error;
pub mod io;
pub mod stats;
pub mod util;

pub use error::{MsaError, Result};
