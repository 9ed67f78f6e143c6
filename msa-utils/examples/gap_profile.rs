//! 演示如何在 library 模式下使用 msa-utils：残基名转换、gap 统计、一致性打分。
//! 若本机装有 MUSCLE，还会对三条序列做一次真实比对。
//!
//! 运行方式：
//! ```bash
//! cargo run --example gap_profile
//! ```

use msa_utils::align::{self, AlignOptions};
use msa_utils::stats::{compute_gap_profile, score_identity};
use msa_utils::util::residue;

fn main() {
    // 1. 残基名 -> 单字母序列
    let chain = ["G", "PSU", "C", "7MG", "A", "OMC"];
    let seq = residue::canonicalize_residues(chain);
    println!("RNA 链: {:?} -> {}", chain, seq);

    // 2. gap 百分比
    let aligned = ["AC-GT", "ACTGT", "AC-G-"];
    match compute_gap_profile(&aligned) {
        Ok(profile) => {
            for (i, v) in profile.values().iter().enumerate() {
                println!("列 {}: {:.2}% gap", i + 1, v);
            }
        }
        Err(e) => eprintln!("gap 统计失败: {}", e),
    }

    // 3. 一致性
    match score_identity("ACGT", "ACGA") {
        Ok(s) => println!("ACGT vs ACGA 一致性: {:.2}", s),
        Err(e) => eprintln!("打分失败: {}", e),
    }

    // 4. 调用外部 MUSCLE（可选）
    let dir = std::env::temp_dir().join("msa-utils-demo");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let opt = AlignOptions { compute_gap_profile: true, ..AlignOptions::default() };
    match align::align(&["GUCAGG", "GUAGG", "GUCAGGA"], &["r1", "r2", "r3"], dir.join("demo"), &opt) {
        Ok(out) => {
            for (id, s) in out.aligned.iter() {
                println!("{}\t{}", id, s);
            }
        }
        Err(e) => println!("跳过 MUSCLE 比对: {}", e),
    }
}
