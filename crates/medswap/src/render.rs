//! Output rendering for the users page.
//!
//! HTML goes through an askama template, which escapes every interpolated
//! value. The text formats are for terminal output.

use std::fmt::Write as _;

use askama::Template;

use crate::error::Result;
use crate::record::Record;
use crate::view::{Panel, UsersPage};

#[derive(Template)]
#[template(path = "users.html")]
struct UsersTemplate<'a> {
    page: &'a UsersPage,
}

/// Render the page as an HTML fragment with both tabs and their tables.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn html(page: &UsersPage) -> Result<String> {
    Ok(UsersTemplate { page }.render()?)
}

/// One line per visible row, grouped by panel.
#[must_use]
pub fn plain(page: &UsersPage) -> String {
    let mut out = String::new();
    for panel in page.panels() {
        for row in panel.visible_rows() {
            let _ = writeln!(
                out,
                "{} {} {} {} Qty:{} Status:{}",
                row.record_id, row.name, panel.role, row.medicine, row.quantity, row.status
            );
        }
    }
    out
}

/// Aligned text tables, one per panel.
#[must_use]
pub fn table(page: &UsersPage) -> String {
    let mut out = String::new();
    for (i, panel) in page.panels().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_table(&mut out, panel);
    }
    out
}

fn write_table(out: &mut String, panel: &Panel) {
    let header = [
        "Name",
        "Contact",
        "Medicine",
        "Qty",
        panel.detail_heading,
        "Location",
        "Status",
    ];
    let rows: Vec<[&str; 7]> = panel
        .visible_rows()
        .map(|r| {
            [
                r.name.as_str(),
                r.contact.as_str(),
                r.medicine.as_str(),
                r.quantity.as_str(),
                r.detail.as_str(),
                r.location.as_str(),
                r.status.as_str(),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let _ = writeln!(out, "{} ({})", panel.label, rows.len());
    write_line(out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let rule: Vec<&str> = rule.iter().map(String::as_str).collect();
    write_line(out, &rule, &widths);
    for row in &rows {
        write_line(out, row, &widths);
    }
}

fn write_line(out: &mut String, cells: &[&str], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

/// The records whose rows are visible, as pretty JSON, in record order.
///
/// `records` must be the list `page` was built from.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn json(records: &[Record], page: &UsersPage) -> Result<String> {
    let mut visible: Vec<usize> = page
        .panels()
        .iter()
        .flat_map(Panel::visible_rows)
        .map(|r| r.record_index)
        .collect();
    visible.sort_unstable();
    let shown: Vec<&Record> = visible.iter().filter_map(|&i| records.get(i)).collect();
    Ok(serde_json::to_string_pretty(&shown)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormData;
    use crate::view::{DONORS_TAB, RECIPIENTS_TAB};

    fn record(id: i64, role: &str, name: &str, medicine: &str) -> Record {
        FormData::new()
            .with("userType", role)
            .with("name", name)
            .with("medicine", medicine)
            .with("quantity", "2")
            .with("expiry", "2031-02-03")
            .with("urgency", "4")
            .to_registration()
            .into_record(id)
    }

    fn sample() -> Vec<Record> {
        vec![
            record(1, "donor", "Alice", "Aspirin 75mg"),
            record(2, "recipient", "Bob", "Metformin 500mg"),
        ]
    }

    #[test]
    fn test_html_contains_both_tables() {
        let page = UsersPage::new(&sample(), 4);
        let out = html(&page).unwrap();

        assert!(out.contains(r#"<table id="donors""#));
        assert!(out.contains(r#"<table id="recipients""#));
        assert!(out.contains(r#"class="tab-btn active" data-tab="donors-tab""#));
        assert!(out.contains(r#"<div class="user-avatar">A</div>"#));
        assert!(out.contains("<td>2031-02-03</td>"));
        assert!(out.contains("<td>4</td>"));
        assert!(out.contains("status-pending"));
        assert_eq!(out.matches("<tr data-id=").count(), 2);
    }

    #[test]
    fn test_html_escapes_record_text() {
        let records = vec![record(
            1,
            "donor",
            "<script>alert(1)</script>",
            "\"quoted\" & more",
        )];
        let out = html(&UsersPage::new(&records, 4)).unwrap();

        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("&amp; more"));
        assert!(!out.contains("\"quoted\""));
    }

    #[test]
    fn test_html_hides_filtered_rows() {
        let mut page = UsersPage::new(&sample(), 4);
        page.search_medicines("metformin");
        let out = html(&page).unwrap();
        assert_eq!(out.matches(r#"style="display:none""#).count(), 1);
    }

    #[test]
    fn test_html_marks_active_tab() {
        let mut page = UsersPage::new(&sample(), 4);
        page.activate(RECIPIENTS_TAB);
        let out = html(&page).unwrap();
        assert!(out.contains(r#"id="recipients-tab" class="tab-content active""#));
        assert!(out.contains(r#"id="donors-tab" class="tab-content""#));
    }

    #[test]
    fn test_plain() {
        let page = UsersPage::new(&sample(), 4);
        let out = plain(&page);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "1 Alice donor Aspirin 75mg Qty:2 Status:PENDING",
                "2 Bob recipient Metformin 500mg Qty:2 Status:PENDING",
            ]
        );
    }

    #[test]
    fn test_table_alignment() {
        let page = UsersPage::new(&sample(), 4);
        let out = table(&page);

        assert!(out.contains("Donors (1)"));
        assert!(out.contains("Recipients (1)"));
        assert!(out.contains("Expiry"));
        assert!(out.contains("Urgency"));

        let header = out.lines().nth(1).unwrap();
        let row = out.lines().nth(3).unwrap();
        assert_eq!(header.find("Contact"), Some("Alice".len() + 2));
        assert!(row.starts_with("Alice  "));
    }

    #[test]
    fn test_json_only_visible_records() {
        let records = sample();
        let mut page = UsersPage::new(&records, 4);
        page.search_medicines("aspirin");

        let out = json(&records, &page).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "Alice");
        assert!(page.panel(DONORS_TAB).is_some());
    }

    #[test]
    fn test_json_with_duplicate_ids() {
        let records = vec![
            record(7, "donor", "Alice", "Aspirin 75mg"),
            record(7, "recipient", "Bob", "Metformin 500mg"),
            record(9, "donor", "Carol", "Aspirin 75mg"),
        ];
        let mut page = UsersPage::new(&records, 4);
        page.search_medicines("metformin");

        let out = json(&records, &page).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "Bob");

        page.search_medicines("");
        let out = json(&records, &page).unwrap();
        let names: Vec<String> = serde_json::from_str::<Vec<Record>>(&out)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }
}
