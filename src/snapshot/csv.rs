//! CSV 产物
//!
//! 每个 JSON 数组产物旁边都有一份同名 .csv，表头取第一条记录的键

use std::io::{self, Write};

use serde_json::Value;

const SEP: char = ',';

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// 写一行 CSV
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", SEP)?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// 单元格文字：字符串原样，null 为空，其余为紧凑 JSON
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 把一组记录渲染成 CSV
///
/// # 返回
/// 记录为空或第一条不是对象时返回 None
pub fn records_to_csv(records: &[Value]) -> Option<Vec<u8>> {
    let header: Vec<String> = records.first()?.as_object()?.keys().cloned().collect();

    let mut out = Vec::new();
    write_row(&mut out, &header).ok()?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|key| cell_text(record.get(key)))
            .collect();
        write_row(&mut out, &row).ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_follows_first_record() {
        let records = vec![
            json!({"id": "A", "credit": "2", "tags": ["x"], "class": null, "english": true}),
            json!({"id": "B", "credit": "3", "tags": [], "class": "甲", "english": false}),
        ];
        let csv = String::from_utf8(records_to_csv(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,credit,tags,class,english");
        assert_eq!(lines[1], r#"A,2,"[""x""]",,true"#);
        assert_eq!(lines[2], "B,3,[],甲,false");
    }

    #[test]
    fn test_multiline_cell_is_quoted() {
        let records = vec![json!({"description": "第一行\n第二行, 备注"})];
        let csv = String::from_utf8(records_to_csv(&records).unwrap()).unwrap();
        assert_eq!(csv, "description\n\"第一行\n第二行, 备注\"\n");
    }

    #[test]
    fn test_empty_records_have_no_csv() {
        assert!(records_to_csv(&[]).is_none());
    }
}
