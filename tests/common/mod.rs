//! 集成测试共用的页面样本

#![allow(dead_code)]

/// 一行合法课程的 26 个栏位
pub fn course_cells(id: &str) -> Vec<String> {
    let mut cells = vec![String::new(); 26];
    cells[3] = "資工系".to_string();
    cells[4] = id.to_string();
    cells[5] = "1".to_string();
    cells[7] = format!("<small><a href=\"syllabus.asp?id={}\">課程 {}</a></small>", id, id);
    cells[8] = "3".to_string();
    cells[9] = "期".to_string();
    cells[10] = "必".to_string();
    cells[11] = "60".to_string();
    cells[12] = "12".to_string();
    cells[13] = "10".to_string();
    cells[14] = "50".to_string();
    cells[15] = "王老師".to_string();
    cells[16] = "EC1001".to_string();
    cells[18] = "234".to_string();
    cells[24] = "備註".to_string();
    cells
}

/// 把栏位拼成一行 `<tr bgcolor>`
pub fn row(cells: &[String]) -> String {
    let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
    format!("<tr bgcolor=\"#ffffff\">{}</tr>", tds)
}

/// 一行合法课程
pub fn course_row(id: &str) -> String {
    row(&course_cells(id))
}

/// 包含表头和若干行的结果页
pub fn result_page(rows: &[String]) -> String {
    format!(
        "<html><body><p>Showing page 1 of 1 pages</p><table><tr><td>異動</td><td>課號</td></tr>{}</table></body></html>",
        rows.concat()
    )
}
