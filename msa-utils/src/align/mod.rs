//! 外部多序列比对工具的编排：写出 FASTA、运行工具、等待完成、解析比对结果。

pub mod header;
pub mod meta;
pub mod set;
pub mod tool;

use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{MsaError, Result};
use crate::io::fasta;
use crate::stats::{compute_gap_profile, GapProfile};

pub use meta::RunMeta;
pub use set::{AlignedSet, DuplicatePolicy, SequenceRecord};
pub use tool::{AlignTool, CancelToken, WaitPolicy};

#[derive(Debug, Clone, Default)]
pub struct AlignOptions {
    /// 若输出文件已存在则直接解析，不再运行比对工具
    pub reuse_existing_output: bool,
    pub compute_gap_profile: bool,
    pub duplicate_policy: DuplicatePolicy,
    pub wait: WaitPolicy,
    pub tool: AlignTool,
}

/// Files derived from a work prefix. Concurrent runs must use distinct prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub log: PathBuf,
    pub meta: PathBuf,
}

impl WorkPaths {
    pub fn new<P: AsRef<Path>>(prefix: P) -> Self {
        let with_ext = |ext: &str| {
            let mut s = OsString::from(prefix.as_ref().as_os_str());
            s.push(ext);
            PathBuf::from(s)
        };
        Self {
            input: with_ext(".fa"),
            output: with_ext(".fasta"),
            log: with_ext(".log"),
            meta: with_ext(".meta"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub aligned: AlignedSet,
    pub gap_profile: Option<GapProfile>,
    /// true when an existing output was parsed and the tool did not run
    pub reused: bool,
}

/// Align `sequences` with the external tool.
///
/// `identifiers` must be empty (records are labelled `0..n`) or parallel to
/// `sequences`. The result keeps the record order of the tool's output.
pub fn align<S, I, P>(sequences: &[S], identifiers: &[I], work_prefix: P, opt: &AlignOptions) -> Result<AlignmentOutcome>
where
    S: AsRef<str>,
    I: AsRef<str>,
    P: AsRef<Path>,
{
    align_with_cancel(sequences, identifiers, work_prefix, opt, None)
}

pub fn align_with_cancel<S, I, P>(
    sequences: &[S],
    identifiers: &[I],
    work_prefix: P,
    opt: &AlignOptions,
    cancel: Option<&CancelToken>,
) -> Result<AlignmentOutcome>
where
    S: AsRef<str>,
    I: AsRef<str>,
    P: AsRef<Path>,
{
    let paths = WorkPaths::new(work_prefix);

    if opt.reuse_existing_output && has_output(&paths.output) {
        match RunMeta::load_from_file(&paths.meta) {
            Ok(m) => info!(
                "alignment '{}' already exists (created {}), reusing it",
                paths.output.display(),
                m.created.to_rfc3339()
            ),
            Err(e) => {
                info!("alignment '{}' already exists, reusing it", paths.output.display());
                debug!("no usable run metadata at '{}': {}", paths.meta.display(), e);
            }
        }
        return finish(&paths, opt, true);
    }

    let records = label_records(sequences, identifiers)?;
    write_input(&paths.input, &records)?;
    // 旧的输出与元信息不能描述本次运行的结果
    remove_if_exists(&paths.output)?;
    remove_if_exists(&paths.meta)?;

    let mut child = tool::spawn(&opt.tool, &paths.input, &paths.output, &paths.log)?;
    let status = tool::wait(&mut child, &paths.output, opt.wait, cancel)?;
    if !status.success() {
        remove_if_exists(&paths.output)?;
        return Err(MsaError::ToolFailed { status: status.to_string(), log: paths.log });
    }
    if !has_output(&paths.output) {
        remove_if_exists(&paths.output)?;
        return Err(MsaError::MissingOutput { path: paths.output });
    }

    let outcome = finish(&paths, opt, false)?;
    if outcome.aligned.len() != records.len() {
        warn!(
            "alignment returned {} records for {} inputs",
            outcome.aligned.len(),
            records.len()
        );
    }

    let meta = RunMeta {
        command: opt.tool.command_line(&paths.input, &paths.output),
        input_records: records.len(),
        aligned_records: outcome.aligned.len(),
        columns: outcome.aligned.records().first().map(|r| r.seq.chars().count()),
        gap_profile: outcome.gap_profile.clone(),
        created: chrono::Utc::now(),
    };
    meta.save_to_file(&paths.meta)?;
    info!(
        "aligned {} sequences into '{}'",
        outcome.aligned.len(),
        paths.output.display()
    );
    Ok(outcome)
}

/// Output counts only when it is a non-empty file.
fn has_output(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn finish(paths: &WorkPaths, opt: &AlignOptions, reused: bool) -> Result<AlignmentOutcome> {
    let aligned = AlignedSet::from_file(&paths.output, opt.duplicate_policy)?;
    let gap_profile = if opt.compute_gap_profile {
        Some(compute_gap_profile(&aligned.sequences())?)
    } else {
        None
    };
    Ok(AlignmentOutcome { aligned, gap_profile, reused })
}

fn label_records<S: AsRef<str>, I: AsRef<str>>(sequences: &[S], identifiers: &[I]) -> Result<Vec<SequenceRecord>> {
    if sequences.is_empty() {
        return Err(MsaError::InvalidInput("no sequences to align".into()));
    }
    if !identifiers.is_empty() && identifiers.len() != sequences.len() {
        return Err(MsaError::InvalidInput(format!(
            "{} identifiers for {} sequences",
            identifiers.len(),
            sequences.len()
        )));
    }

    let mut records = Vec::with_capacity(sequences.len());
    for (i, s) in sequences.iter().enumerate() {
        let id = match identifiers.get(i) {
            Some(id) => id.as_ref().to_string(),
            None => i.to_string(),
        };
        header::validate_identifier(&id)?;
        records.push(SequenceRecord { id, seq: s.as_ref().to_string() });
    }
    Ok(records)
}

fn write_input(path: &Path, records: &[SequenceRecord]) -> Result<()> {
    let mut w = BufWriter::new(std::fs::File::create(path)?);
    for r in records {
        fasta::write_record(&mut w, &header::format_header(&r.id), &r.seq)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const NO_IDS: &[&str] = &[];

    #[test]
    fn work_paths_from_prefix() {
        let p = WorkPaths::new("runs/chain_A");
        assert_eq!(p.input, PathBuf::from("runs/chain_A.fa"));
        assert_eq!(p.output, PathBuf::from("runs/chain_A.fasta"));
        assert_eq!(p.log, PathBuf::from("runs/chain_A.log"));
        assert_eq!(p.meta, PathBuf::from("runs/chain_A.meta"));
    }

    #[test]
    fn positional_labels_when_ids_absent() {
        let recs = label_records(&["AC", "GT"], NO_IDS).unwrap();
        assert_eq!(recs[0].id, "0");
        assert_eq!(recs[1].id, "1");
    }

    #[test]
    fn mismatched_identifier_count_rejected() {
        let err = label_records(&["AC", "GT"], &["a"]).unwrap_err();
        assert!(matches!(err, MsaError::InvalidInput(_)));
        assert!(label_records(NO_IDS, NO_IDS).is_err());
        assert!(label_records(&["AC"], &["has space"]).is_err());
    }

    #[test]
    fn input_file_uses_header_convention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.fa");
        let recs = label_records(&["ACGU", "GGC"], &["1abc", "2xyz"]).unwrap();
        write_input(&path, &recs).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "> Seq 1abc\nACGU\n> Seq 2xyz\nGGC\n");

        let back = AlignedSet::from_file(&path, DuplicatePolicy::Error).unwrap();
        assert_eq!(back.records(), &recs[..]);
    }

    #[cfg(unix)]
    mod with_tool {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Writes an executable shell script standing in for the aligner.
        fn fake_tool(dir: &Path, name: &str, body: &str) -> AlignTool {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            AlignTool::muscle(path)
        }

        fn options(tool: AlignTool) -> AlignOptions {
            AlignOptions {
                tool,
                wait: WaitPolicy {
                    timeout: Duration::from_secs(10),
                    poll_interval: Duration::from_millis(10),
                    max_poll_interval: Duration::from_millis(100),
                },
                ..AlignOptions::default()
            }
        }

        #[test]
        fn aligns_through_tool_and_writes_meta() {
            let dir = tempfile::tempdir().unwrap();
            // reverse record order and pad the shorter sequence, like a real aligner
            let tool = fake_tool(
                dir.path(),
                "aligner",
                "printf '> Seq b\\nAC-T\\n> Seq a\\nACGT\\n' > \"$4\"",
            );
            let mut opt = options(tool);
            opt.compute_gap_profile = true;
            let prefix = dir.path().join("run");

            let out = align(&["ACGT", "ACT"], &["a", "b"], &prefix, &opt).unwrap();
            assert!(!out.reused);
            assert_eq!(out.aligned.ids().collect::<Vec<_>>(), vec!["b", "a"]);
            assert_eq!(out.aligned.get("b"), Some("AC-T"));
            let gaps = out.gap_profile.unwrap();
            assert_eq!(gaps.values(), &[0.0, 0.0, 50.0, 0.0]);

            let paths = WorkPaths::new(&prefix);
            let meta = RunMeta::load_from_file(&paths.meta).unwrap();
            assert_eq!(meta.input_records, 2);
            assert_eq!(meta.aligned_records, 2);
            assert_eq!(meta.columns, Some(4));
            assert_eq!(meta.command[1], "-align");
        }

        #[test]
        fn reuse_skips_tool_on_second_call() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "copy", "cp \"$2\" \"$4\"");
            let mut opt = options(tool);
            opt.reuse_existing_output = true;
            let prefix = dir.path().join("reuse");

            let first = align(&["MKV", "MRV"], &["x", "y"], &prefix, &opt).unwrap();
            assert!(!first.reused);

            // a tool that cannot run proves the second call never spawns it
            opt.tool = AlignTool::muscle(dir.path().join("missing-binary"));
            let second = align(&["MKV", "MRV"], &["x", "y"], &prefix, &opt).unwrap();
            assert!(second.reused);
            assert_eq!(second.aligned, first.aligned);
            let third = align(&["MKV", "MRV"], &["x", "y"], &prefix, &opt).unwrap();
            assert_eq!(third.aligned, first.aligned);
        }

        #[test]
        fn without_reuse_existing_output_is_regenerated() {
            let dir = tempfile::tempdir().unwrap();
            let prefix = dir.path().join("fresh");
            std::fs::write(WorkPaths::new(&prefix).output, "> Seq stale\nAAAA\n").unwrap();
            let tool = fake_tool(dir.path(), "copy", "cp \"$2\" \"$4\"");
            let out = align(&["GG"], NO_IDS, &prefix, &options(tool)).unwrap();
            assert_eq!(out.aligned.get("0"), Some("GG"));
            assert_eq!(out.aligned.get("stale"), None);
        }

        #[test]
        fn failing_tool_reports_log() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "fail", "echo boom >&2\nexit 3");
            let prefix = dir.path().join("bad");
            match align(&["AC"], NO_IDS, &prefix, &options(tool)) {
                Err(MsaError::ToolFailed { log, .. }) => {
                    let text = std::fs::read_to_string(log).unwrap();
                    assert!(text.contains("boom"));
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn silent_tool_is_missing_output() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "noop", "exit 0");
            let err = align(&["AC"], NO_IDS, dir.path().join("noop"), &options(tool)).unwrap_err();
            assert!(matches!(err, MsaError::MissingOutput { .. }));
        }

        #[test]
        fn hung_tool_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "hang", "printf '> Seq 0\\nA' > \"$4\"\nexec sleep 30");
            let mut opt = options(tool);
            opt.wait.timeout = Duration::from_millis(300);
            let prefix = dir.path().join("hang");
            let err = align(&["AC"], NO_IDS, &prefix, &opt).unwrap_err();
            assert!(matches!(err, MsaError::MissingOutputTimeout { .. }));
            assert!(!WorkPaths::new(&prefix).output.exists());
        }

        #[test]
        fn duplicate_output_ids_follow_policy() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(
                dir.path(),
                "dups",
                "printf '> Seq a\\nAC\\n> Seq a\\nA-\\n' > \"$4\"",
            );
            let mut opt = options(tool);
            let prefix = dir.path().join("dups");
            let err = align(&["AC", "A"], &["a", "b"], &prefix, &opt).unwrap_err();
            assert!(matches!(err, MsaError::DuplicateIdentifier { .. }));

            opt.duplicate_policy = DuplicatePolicy::WarnKeepFirst;
            let out = align(&["AC", "A"], &["a", "b"], &prefix, &opt).unwrap();
            assert_eq!(out.aligned.len(), 1);
            assert_eq!(out.aligned.get("a"), Some("AC"));
        }

        #[test]
        fn failed_run_leaves_nothing_to_reuse() {
            let dir = tempfile::tempdir().unwrap();
            let prefix = dir.path().join("partial");
            let paths = WorkPaths::new(&prefix);
            let mut opt = options(fake_tool(dir.path(), "crash", "printf '> Seq a\\nAC' > \"$4\"\nexit 1"));
            opt.reuse_existing_output = true;

            let err = align(&["AC"], &["a"], &prefix, &opt).unwrap_err();
            assert!(matches!(err, MsaError::ToolFailed { .. }));
            assert!(!paths.output.exists());

            // with nothing reusable the next call must run the tool again
            opt.tool = AlignTool::muscle(dir.path().join("missing-binary"));
            let err = align(&["AC"], &["a"], &prefix, &opt).unwrap_err();
            assert!(matches!(err, MsaError::Io(_)));
        }

        #[test]
        fn empty_output_is_not_reused() {
            let dir = tempfile::tempdir().unwrap();
            let prefix = dir.path().join("empty");
            let paths = WorkPaths::new(&prefix);
            let mut opt = options(fake_tool(dir.path(), "truncate", ": > \"$4\""));
            opt.reuse_existing_output = true;

            let err = align(&["AC"], NO_IDS, &prefix, &opt).unwrap_err();
            assert!(matches!(err, MsaError::MissingOutput { .. }));
            assert!(!paths.output.exists());

            // an empty file left by anything else is not a usable alignment either
            std::fs::write(&paths.output, b"").unwrap();
            opt.tool = fake_tool(dir.path(), "copy", "cp \"$2\" \"$4\"");
            let out = align(&["AC"], NO_IDS, &prefix, &opt).unwrap();
            assert!(!out.reused);
            assert_eq!(out.aligned.get("0"), Some("AC"));
        }

        #[test]
        fn stale_meta_removed_before_rerun() {
            let dir = tempfile::tempdir().unwrap();
            let prefix = dir.path().join("stale");
            let paths = WorkPaths::new(&prefix);
            let copy = fake_tool(dir.path(), "copy", "cp \"$2\" \"$4\"");
            align(&["AC"], NO_IDS, &prefix, &options(copy)).unwrap();
            assert!(paths.meta.exists());

            let fail = fake_tool(dir.path(), "fail", "exit 2");
            assert!(align(&["AC"], NO_IDS, &prefix, &options(fail)).is_err());
            assert!(!paths.meta.exists());
        }

        #[test]
        fn cancel_through_orchestrator() {
            let dir = tempfile::tempdir().unwrap();
            let prefix = dir.path().join("cancel");
            let paths = WorkPaths::new(&prefix);
            let tool = fake_tool(dir.path(), "slow", "printf '> Seq 0\\nA' > \"$4\"\nexec sleep 30");
            let opt = options(tool);

            let token = CancelToken::new();
            let remote = token.clone();
            let canceller = std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                remote.cancel();
            });

            let err = align_with_cancel(&["AC"], NO_IDS, &prefix, &opt, Some(&token)).unwrap_err();
            canceller.join().unwrap();
            assert!(matches!(err, MsaError::Cancelled));
            assert!(!paths.output.exists());
            assert!(!paths.meta.exists());
        }
    }
}
