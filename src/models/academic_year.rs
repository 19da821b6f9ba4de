//! 学年度代码
//!
//! 代码为 4 个字符：前 3 位是学年，最后 1 位是学期（0 上、1 下、2 暑期），例如 `1122`。

use phf::phf_map;

use crate::error::{AppResult, VersionError};

/// 学期代码 → 学期名称
static TERM_LABELS: phf::Map<char, &'static str> = phf_map! {
    '0' => "上",
    '1' => "下",
    '2' => "暑期",
};

/// 校验学年度代码格式
///
/// # 返回
/// 代码合法时返回 (学年, 学期名称)
pub fn validate_academic_year(code: &str) -> AppResult<(String, &'static str)> {
    let invalid = || VersionError::InvalidAcademicYear {
        code: code.to_string(),
    };

    let chars: Vec<char> = code.chars().collect();
    if chars.len() != 4 {
        return Err(invalid().into());
    }

    let term = TERM_LABELS.get(&chars[3]).copied().ok_or_else(invalid)?;
    let year: String = chars[..3].iter().collect();
    Ok((year, term))
}

/// 生成学年度的可读名称，如 `1121` → `112學年度下`
pub fn academic_year_label(code: &str) -> AppResult<String> {
    let (year, term) = validate_academic_year(code)?;
    Ok(format!("{}學年度{}", year, term))
}
