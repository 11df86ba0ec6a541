//! Plain-text report tables

use infrarun_report::{FindingRow, Report, ReportRun};
use std::io::{self, Write};

const HEADERS: [&str; 5] = ["File", "Start Line", "End Line", "Rule ID", "Message"];

/// One table per run that has findings
pub fn write_tables(report: &Report, out: &mut impl Write) -> io::Result<()> {
    for run in report.runs.iter().filter(|r| !r.results.is_empty()) {
        write_header(run, out)?;
        write_rows(&run.rows(), out)?;
    }
    Ok(())
}

fn write_header(run: &ReportRun, out: &mut impl Write) -> io::Result<()> {
    let driver = &run.tool.driver;
    writeln!(out, "\n{}", driver.display_name())?;
    if let Some(version) = &driver.version {
        writeln!(out, "{}", version)?;
    }
    if let Some(uri) = &driver.information_uri {
        writeln!(out, "Information URI: {}", uri)?;
    }
    writeln!(out)
}

fn write_rows(rows: &[FindingRow], out: &mut impl Write) -> io::Result<()> {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.file.clone(),
                row.start_line.to_string(),
                row.end_line_display(),
                row.rule_id.clone(),
                row.message.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = HEADERS.map(String::from);
    write_line(&header, &widths, out)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for row in &cells {
        write_line(row, &widths, out)?;
    }
    Ok(())
}

fn write_line(cells: &[String; 5], widths: &[usize; 5], out: &mut impl Write) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    writeln!(out, "{}", padded.join("  ").trim_end())
}
