//! 解析上下文
//!
//! 封装"我正在解析哪个学年度的第几页"这一信息

use std::fmt::Display;

/// 解析上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCtx {
    /// 学年度代码
    pub academic_year: String,

    /// 页码（从1开始）
    pub page_index: usize,
}

impl ParseCtx {
    /// 创建新的解析上下文
    pub fn new(academic_year: impl Into<String>, page_index: usize) -> Self {
        Self {
            academic_year: academic_year.into(),
            page_index,
        }
    }
}

impl Display for ParseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[学年 {} 第 {} 页]", self.academic_year, self.page_index)
    }
}
