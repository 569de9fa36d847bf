//! Format sync reports, state status, and course listings as text.

use crate::catalog::Course;
use crate::report::{StateStatus, SyncReport};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

const RULE_WIDTH: usize = 50;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// End-of-run summary as human-readable text.
pub fn format_sync_report_text(report: &SyncReport) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    if report.cleaned_from_state > 0 {
        out.push_str(&format!(
            "Cleaned {} missing files from state\n\n",
            report.cleaned_from_state
        ));
    }

    if !report.redownloaded.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format!(
                "Re-downloaded {} deleted files:",
                report.redownloaded.len()
            )
            .blue()
        ));
        for name in &report.redownloaded {
            out.push_str(&format!("  • {}\n", name));
        }
        out.push('\n');
    }

    if !report.new_items.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format!("Found {} new items:", report.new_items.len()).green()
        ));
        for item in &report.new_items {
            out.push_str(&format!(
                "  • [{}] {} in {}\n",
                item.kind, item.name, item.course
            ));
        }
    } else if report.redownloaded.is_empty() {
        out.push_str("No new content found\n");
    }

    if !report.skipped_courses.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            format!("Skipped {} courses:", report.skipped_courses.len()).red()
        ));
        for course in &report.skipped_courses {
            out.push_str(&format!("  • {}: {}\n", course.course, course.reason));
        }
    }

    if !report.failures.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            format!("Failed to download {} files:", report.failures.len()).red()
        ));
        for failure in &report.failures {
            out.push_str(&format!(
                "  • {} ({} / {}): {}\n",
                failure.file_name, failure.course, failure.module, failure.reason
            ));
        }
    }

    out.push_str(&format!(
        "\nDownloads saved to: {}/\n",
        report.download_root.display()
    ));
    out
}

/// State file status as human-readable text.
pub fn format_state_status_text(status: &StateStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Sync State")));
    out.push_str(&format!("  State file: {}\n", status.state_file.display()));
    if !status.exists {
        out.push_str("  Synced: no\n\nRun coursemirror sync to mirror your courses.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Entry", "Count"]);
    table.add_row(vec![
        "Courses".to_string(),
        status.summary.courses.to_string(),
    ]);
    table.add_row(vec![
        "Modules seen".to_string(),
        status.summary.modules_seen.to_string(),
    ]);
    table.add_row(vec![
        "Files tracked".to_string(),
        status.summary.files_tracked.to_string(),
    ]);
    table.add_row(vec![
        "Files missing on disk".to_string(),
        status.summary.files_missing.len().to_string(),
    ]);
    out.push_str(&format!("\n{}\n", table));

    if !status.summary.files_missing.is_empty() {
        out.push_str(&format!(
            "\n{}\n\n",
            format_section_heading("Will be re-downloaded on next sync")
        ));
        for path in &status.summary.files_missing {
            out.push_str(&format!("  • {}\n", path.display()));
        }
    }
    out
}

/// Enrolled courses as a table.
pub fn format_courses_text(courses: &[Course]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Courses")));
    if courses.is_empty() {
        out.push_str("No enrolled courses.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["ID", "Short name", "Name"]);
    for course in courses {
        table.add_row(vec![
            course.id.to_string(),
            course.short_name.clone().unwrap_or_else(|| "-".to_string()),
            course.name.clone(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!("Total: {} courses.\n", courses.len()));
    out
}
