use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{MsaError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: String,
    /// 1-based line number of the header
    pub line: usize,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    line_no: usize,
    peek_header: Option<(String, usize)>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            line_no: 0,
            peek_header: None,
        }
    }

    fn read_line(&mut self) -> Result<usize> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // Find header line
        let (header, line) = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                if self.read_line()? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.starts_with('>') {
                    break (self.buf[1..].trim().to_string(), self.line_no);
                }
                if !self.buf.trim().is_empty() {
                    return Err(MsaError::MalformedRecord {
                        line: self.line_no,
                        text: self.buf.trim_end().to_string(),
                    });
                }
            }
        };

        // Parse id and description
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Read sequence lines
        let mut seq = String::new();
        loop {
            if self.read_line()? == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                self.peek_header = Some((self.buf[1..].trim().to_string(), self.line_no));
                break;
            }
            seq.extend(self.buf.chars().filter(|c| !c.is_whitespace()));
        }

        Ok(Some(FastaRecord { id, desc, seq, line }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

pub fn open_fasta<P: AsRef<Path>>(path: P) -> Result<FastaReader<BufReader<File>>> {
    let fh = File::open(path.as_ref())?;
    Ok(FastaReader::new(BufReader::new(fh)))
}

/// Read every record of a FASTA file into memory.
pub fn read_fasta_file<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    open_fasta(path)?.collect()
}

/// 写出单条记录：`>` + header 一行，序列一行（不折行）
pub fn write_record<W: Write>(w: &mut W, header: &str, seq: &str) -> std::io::Result<()> {
    writeln!(w, ">{}", header)?;
    writeln!(w, "{}", seq)
}
