use std::collections::HashMap;
use std::sync::OnceLock;

/// 未知残基的占位符
pub const UNKNOWN: char = 'X';

/// 残基名 -> 单字母代码。
/// 包含 20 种标准氨基酸、核糖核苷酸，以及折叠到对应未修饰碱基的修饰核苷酸。
pub const RESIDUE_CODES: &[(&str, char)] = &[
    ("UNK", 'X'),
    // amino acids
    ("ALA", 'A'),
    ("ARG", 'R'),
    ("ASN", 'N'),
    ("ASP", 'D'),
    ("CYS", 'C'),
    ("GLN", 'Q'),
    ("GLU", 'E'),
    ("GLY", 'G'),
    ("HIS", 'H'),
    ("ILE", 'I'),
    ("LEU", 'L'),
    ("LYS", 'K'),
    ("MET", 'M'),
    ("PHE", 'F'),
    ("PRO", 'P'),
    ("SER", 'S'),
    ("THR", 'T'),
    ("TRP", 'W'),
    ("TYR", 'Y'),
    ("VAL", 'V'),
    // ribonucleotides
    ("A", 'A'),
    ("C", 'C'),
    ("U", 'U'),
    ("G", 'G'),
    // modified nucleotides
    ("2MA", 'A'),
    ("3AU", 'U'),
    ("4AC", 'C'),
    ("4OC", 'C'),
    ("4SU", 'U'),
    ("5MC", 'C'),
    ("5MU", 'U'),
    ("6IA", 'A'),
    ("6MZ", 'U'),
    ("7MG", 'G'),
    ("8AN", 'A'),
    ("CM0", 'C'),
    ("G7M", 'G'),
    ("H2U", 'U'),
    ("MIA", 'A'),
    ("OMC", 'C'),
    ("OMG", 'C'),
    ("PSU", 'U'),
    ("QUO", 'G'),
    ("T6A", 'A'),
    ("U8U", 'U'),
    ("YG", 'G'),
];

fn table() -> &'static HashMap<&'static str, char> {
    static TABLE: OnceLock<HashMap<&'static str, char>> = OnceLock::new();
    TABLE.get_or_init(|| RESIDUE_CODES.iter().copied().collect())
}

/// 残基名转单字母代码；表中不存在的名字返回 `X`。
/// 只去掉首尾空白（PDB 列宽填充），大小写必须与表中一致。
pub fn canonicalize(code: &str) -> char {
    table().get(code.trim()).copied().unwrap_or(UNKNOWN)
}

/// Build a one-letter sequence from a list of residue names.
pub fn canonicalize_residues<'a, I>(codes: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    codes.into_iter().map(canonicalize).collect()
}

pub fn residue_codes() -> impl Iterator<Item = (&'static str, char)> {
    RESIDUE_CODES.iter().copied()
}
