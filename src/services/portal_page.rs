//! 选课系统页面识别 - 业务能力层
//!
//! 只负责从查询页 / 结果页中读出学年度、总页数和验证码是否通过

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// 验证码错误时结果页中出现的文字
pub const WRONG_CODE_MARKER: &str = "Wrong Validation Code";

static ACADEMIC_YEAR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#YRSM > option[value]:not([value=''])").expect("静态选择器必须合法")
});

static TOTAL_PAGES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Showing page \d+ of (\d+) pages").expect("静态正则必须合法")
});

/// 从查询页中找出当前学年度
///
/// # 返回
/// 第一个 value 非空的 `#YRSM` 选项，找不到时为 None
pub fn parse_academic_year_option(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&ACADEMIC_YEAR_SELECTOR)
        .filter_map(|option| option.value().attr("value"))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// 从结果页中解析总页数（取最后一处匹配）
pub fn parse_total_pages(html: &str) -> Option<u32> {
    TOTAL_PAGES_RE
        .captures_iter(html)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// 结果页是否提示验证码错误
pub fn is_wrong_validation_code(html: &str) -> bool {
    html.contains(WRONG_CODE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_year_skips_empty_option() {
        let html = r#"
            <select id="YRSM">
                <option value="">請選擇</option>
                <option value="1122">112學年度下學期</option>
                <option value="1121">112學年度上學期</option>
            </select>"#;
        assert_eq!(parse_academic_year_option(html), Some("1122".to_string()));
    }

    #[test]
    fn test_academic_year_missing() {
        let html = r#"<select id="OTHER"><option value="1122">x</option></select>"#;
        assert_eq!(parse_academic_year_option(html), None);
        assert_eq!(parse_academic_year_option(r#"<select id="YRSM"><option value="">-</option></select>"#), None);
    }

    #[test]
    fn test_total_pages_uses_last_match() {
        let html = "Showing page 1 of 3 pages ... <b>Showing page 1 of 57 pages</b>";
        assert_eq!(parse_total_pages(html), Some(57));
        assert_eq!(parse_total_pages("no pager here"), None);
        assert_eq!(parse_total_pages("Showing page 1 of 0 pages"), Some(0));
    }

    #[test]
    fn test_wrong_validation_code() {
        assert!(is_wrong_validation_code("<script>alert('Wrong Validation Code')</script>"));
        assert!(!is_wrong_validation_code("<table></table>"));
    }
}
