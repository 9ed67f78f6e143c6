//! Record header convention used for every FASTA file the orchestrator
//! writes and reads back: `> Seq <identifier>`.
//!
//! The tool may strip the space after `>`, so `>Seq 7` parses the same as
//! `> Seq 7`. Anything after the identifier token is ignored.

use crate::error::{MsaError, Result};
use crate::io::fasta::FastaRecord;

pub const MARKER: &str = "Seq";

/// Header text (without the leading `>`) for an identifier.
pub fn format_header(id: &str) -> String {
    format!(" {} {}", MARKER, id)
}

/// 从记录头中取出标识符（`Seq` 之后的第一个 token）
pub fn parse_identifier(rec: &FastaRecord) -> Result<&str> {
    let token = if rec.id == MARKER {
        rec.desc.as_deref().and_then(|d| d.split_whitespace().next())
    } else {
        None
    };
    token.ok_or_else(|| MsaError::MalformedRecord {
        line: rec.line,
        text: match &rec.desc {
            Some(d) => format!(">{} {}", rec.id, d),
            None => format!(">{}", rec.id),
        },
    })
}

/// Identifiers are free text on the way in but must survive the header
/// round trip as a single token.
pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(MsaError::InvalidInput(format!(
            "identifier {:?} must be a non-empty token without whitespace",
            id
        )));
    }
    Ok(())
}
