//! 课程解析服务 - 业务能力层
//!
//! 只负责"一行表格 → 课程记录"，解析失败时返回拒绝原因，不产生半成品记录

use std::fmt;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use crate::models::{CourseChange, CourseRecord, YearSemester};

/// 一行至少需要的栏位数
pub const MIN_COLUMNS: usize = 26;

/// 英语授课标记
pub const ENGLISH_MARKER: &str = "※英語授課";

/// 课程大纲链接所在栏位（第 8 栏）
const URL_COLUMN: usize = 7;

/// 上课时间栏位 [17, 24)
const CLASS_TIME_COLUMNS: std::ops::Range<usize> = 17..24;

/// 备注栏位（第 25 栏）
const DESCRIPTION_COLUMN: usize = 24;

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr[bgcolor]").expect("静态选择器必须合法"));
static FIRST_ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("静态选择器必须合法"));
static DETAIL_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("small a[href]").expect("静态选择器必须合法"));
static TAG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("font").expect("静态选择器必须合法"));

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 栏位不足
    InsufficientColumns { found: usize },
    /// 缺少课程大纲链接
    MissingDetailLink,
    /// 栏位值不合法
    InvalidField { field: &'static str, value: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientColumns { found } => write!(
                f,
                "insufficient columns: expected at least {}, found {}",
                MIN_COLUMNS, found
            ),
            RejectReason::MissingDetailLink => write!(f, "missing detail link"),
            RejectReason::InvalidField { field, value } => write!(f, "{} = {:?}", field, value),
        }
    }
}

/// 一行被拒绝的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 行在页面中的序号（从 0 开始）
    pub row_index: usize,
    pub reason: RejectReason,
}

/// 单页解析结果
#[derive(Debug, Default)]
pub struct PageParse {
    pub records: Vec<CourseRecord>,
    pub rejections: Vec<RowRejection>,
}

/// 解析一个结果页面中的所有课程行
///
/// 被拒绝的行不会中断解析，只会出现在 `rejections` 中。
pub fn parse_course_page(html: &str) -> PageParse {
    let document = Html::parse_document(html);
    let mut result = PageParse::default();

    for (row_index, row) in document.select(&ROW_SELECTOR).enumerate() {
        match parse_course_row(row) {
            Ok(record) => result.records.push(record),
            Err(reason) => result.rejections.push(RowRejection { row_index, reason }),
        }
    }

    result
}

/// 解析一段只包含一行 `<tr>` 的 HTML 片段
pub fn parse_row_html(fragment: &str) -> Result<CourseRecord, RejectReason> {
    let document = Html::parse_document(&format!("<table>{}</table>", fragment));
    let row = document
        .select(&FIRST_ROW_SELECTOR)
        .next()
        .ok_or(RejectReason::InsufficientColumns { found: 0 })?;
    parse_course_row(row)
}

/// 解析一行课程
///
/// # 参数
/// - `row`: `<tr>` 元素
///
/// # 返回
/// 成功时返回完整的课程记录，否则返回第一个不满足的约束
pub fn parse_course_row(row: ElementRef<'_>) -> Result<CourseRecord, RejectReason> {
    let cells: Vec<ElementRef<'_>> = row.children().filter_map(ElementRef::wrap).collect();
    if cells.len() < MIN_COLUMNS {
        return Err(RejectReason::InsufficientColumns { found: cells.len() });
    }

    let texts: Vec<String> = cells
        .iter()
        .map(|cell| element_text(*cell).trim().to_string())
        .collect();

    let (description, tags, english) = split_description(cells[DESCRIPTION_COLUMN]);

    let url = cells[URL_COLUMN]
        .select(&DETAIL_LINK_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
        .ok_or(RejectReason::MissingDetailLink)?;

    let invalid = |field: &'static str, value: &str| RejectReason::InvalidField {
        field,
        value: value.to_string(),
    };

    let change = match texts[0].as_str() {
        "" => None,
        raw => Some(CourseChange::from_marker(raw).ok_or_else(|| invalid("change", raw))?),
    };

    let multiple_compulsory = match texts[2].as_str() {
        "" => false,
        "*" => true,
        raw => return Err(invalid("multipleCompulsory", raw)),
    };

    let grade = &texts[5];
    if grade.is_empty() {
        return Err(invalid("grade", grade));
    }

    let credit = &texts[8];
    if credit.is_empty() {
        return Err(invalid("credit", credit));
    }

    let year_semester =
        YearSemester::from_marker(&texts[9]).ok_or_else(|| invalid("yearSemester", &texts[9]))?;

    let compulsory = match texts[10].as_str() {
        "必" => true,
        "選" => false,
        raw => return Err(invalid("compulsory", raw)),
    };

    let parse_int = |field: &'static str, raw: &str| raw.parse::<i64>().map_err(|_| invalid(field, raw));
    let restrict = parse_int("restrict", &texts[11])?;
    let select = parse_int("select", &texts[12])?;
    let selected = parse_int("selected", &texts[13])?;
    let remaining = parse_int("remaining", &texts[14])?;

    Ok(CourseRecord {
        url,
        change,
        change_description: optional(&texts[1]),
        multiple_compulsory,
        department: texts[3].clone(),
        id: texts[4].clone(),
        grade: grade.clone(),
        class_name: optional(&texts[6]),
        name: texts[7].clone(),
        credit: credit.clone(),
        year_semester,
        compulsory,
        restrict,
        select,
        selected,
        remaining,
        teacher: texts[15].clone(),
        room: texts[16].clone(),
        class_time: texts[CLASS_TIME_COLUMNS].to_vec(),
        description,
        tags,
        english,
    })
}

/// 去掉结尾重复出现的英语授课标记
///
/// 每次只去掉标记本身（5 个字），标记前的文字原样保留。
///
/// # 返回
/// 返回 (去掉标记并去空白后的文字, 是否去掉过标记)
pub fn strip_english_marker(text: &str) -> (String, bool) {
    let mut english = false;
    let mut working = text.trim_end();
    while let Some(rest) = working.strip_suffix(ENGLISH_MARKER) {
        english = true;
        working = rest.trim_end();
    }
    (working.trim().to_string(), english)
}

/// 拆分备注栏：`<font>` 标签文字进 tags，其余文字为备注
fn split_description(cell: ElementRef<'_>) -> (String, Vec<String>, bool) {
    let tags = cell
        .select(&TAG_SELECTOR)
        .map(element_text)
        .collect();

    let mut text = String::new();
    collect_text(cell, &mut text, true);
    let (description, english) = strip_english_marker(&text);
    (description, tags, english)
}

/// 元素的文字内容，`<br>` 视为换行
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text, false);
    text
}

fn collect_text(element: ElementRef<'_>, out: &mut String, skip_tags: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) if skip_tags && el.name() == "font" => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out, skip_tags);
                }
            }
            _ => {}
        }
    }
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
