pub mod residue;

/// 比对结果中的 gap 字符
pub const GAP: char = '-';
