//! 课程记录
//!
//! 选课系统结果表格中的一行，解析成功后才会生成。

use serde::{Deserialize, Serialize};

/// 异动标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourseChange {
    /// 异动
    #[serde(rename = "異動")]
    Modified,
    /// 新增
    #[serde(rename = "新增")]
    Added,
}

impl CourseChange {
    /// 从表格原始文字解析（空字符串不在此处理）
    pub fn from_marker(raw: &str) -> Option<Self> {
        match raw {
            "異動" => Some(CourseChange::Modified),
            "新增" => Some(CourseChange::Added),
            _ => None,
        }
    }

    /// 原始文字
    pub fn marker(self) -> &'static str {
        match self {
            CourseChange::Modified => "異動",
            CourseChange::Added => "新增",
        }
    }
}

/// 学年课 / 学期课
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YearSemester {
    /// 学年课
    #[serde(rename = "年")]
    Year,
    /// 学期课
    #[serde(rename = "期")]
    Semester,
}

impl YearSemester {
    /// 从表格原始文字解析
    pub fn from_marker(raw: &str) -> Option<Self> {
        match raw {
            "年" => Some(YearSemester::Year),
            "期" => Some(YearSemester::Semester),
            _ => None,
        }
    }
}

/// 课程记录
///
/// 字段顺序即输出 JSON / CSV 的列顺序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    /// 课程大纲链接
    pub url: String,
    /// 异动
    pub change: Option<CourseChange>,
    /// 异动说明
    pub change_description: Option<String>,
    /// 多门必修
    pub multiple_compulsory: bool,
    /// 系所别
    pub department: String,
    /// 课号
    pub id: String,
    /// 年级
    pub grade: String,
    /// 班别
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    /// 科目名称
    pub name: String,
    /// 学分
    pub credit: String,
    /// 学年 / 学期
    pub year_semester: YearSemester,
    /// 必修（否则为选修）
    pub compulsory: bool,
    /// 限修人数
    pub restrict: i64,
    /// 点选人数
    pub select: i64,
    /// 选上人数
    pub selected: i64,
    /// 余额
    pub remaining: i64,
    /// 授课教师
    pub teacher: String,
    /// 教室
    pub room: String,
    /// 上课时间（星期一至星期日）
    pub class_time: Vec<String>,
    /// 备注
    pub description: String,
    /// 备注中的标签
    pub tags: Vec<String>,
    /// 英语授课
    pub english: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(CourseChange::from_marker("新增"), Some(CourseChange::Added));
        assert_eq!(CourseChange::from_marker(""), None);
        assert_eq!(CourseChange::Modified.marker(), "異動");
        assert_eq!(YearSemester::from_marker("期"), Some(YearSemester::Semester));
        assert_eq!(YearSemester::from_marker("年期"), None);
    }

    #[test]
    fn test_serialized_field_names() {
        let record = CourseRecord {
            url: "syllabus.asp?id=1".to_string(),
            change: Some(CourseChange::Added),
            change_description: None,
            multiple_compulsory: true,
            department: "資工系".to_string(),
            id: "CSE101".to_string(),
            grade: "1".to_string(),
            class_name: None,
            name: "程式設計".to_string(),
            credit: "3".to_string(),
            year_semester: YearSemester::Semester,
            compulsory: true,
            restrict: 60,
            select: 10,
            selected: 8,
            remaining: 52,
            teacher: "王老師".to_string(),
            room: "EC1001".to_string(),
            class_time: vec![String::new(); 7],
            description: String::new(),
            tags: vec![],
            english: false,
        };

        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(&keys[..4], &["url", "change", "changeDescription", "multipleCompulsory"]);
        assert!(keys.contains(&"class"));
        assert!(keys.contains(&"yearSemester"));
        assert!(keys.contains(&"classTime"));
        assert_eq!(value["change"], "新增");
        assert_eq!(value["yearSemester"], "期");
        assert!(value["class"].is_null());
    }
}
