//! Flat finding rows for presentation layers

use crate::sarif::ReportRun;

/// Width a message is cut to before `...` is appended
pub const MESSAGE_WIDTH: usize = 50;

/// One finding reduced to what a table shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingRow {
    pub file: String,
    pub start_line: i64,
    pub end_line: Option<i64>,
    pub rule_id: String,
    pub level: String,
    pub message: String,
}

impl FindingRow {
    /// End line, or `-` when the tool did not report one
    pub fn end_line_display(&self) -> String {
        self.end_line
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl ReportRun {
    /// Rows for every finding with a file, a start line and a rule id,
    /// sorted by file then start line
    pub fn rows(&self) -> Vec<FindingRow> {
        let mut rows: Vec<FindingRow> = self
            .results
            .iter()
            .filter_map(|finding| {
                let physical = finding.primary_location()?;
                let region = physical.region.as_ref()?;
                Some(FindingRow {
                    file: physical.uri()?.to_string(),
                    start_line: region.start_line?,
                    end_line: region.end_line,
                    rule_id: finding.rule_id.clone()?,
                    level: finding
                        .level
                        .clone()
                        .unwrap_or_else(|| crate::sarif::DEFAULT_LEVEL.to_string()),
                    message: summarize_message(
                        finding.message.text.as_deref().unwrap_or_default(),
                        MESSAGE_WIDTH,
                    ),
                })
            })
            .collect();

        rows.sort_by(|a, b| a.file.cmp(&b.file).then(a.start_line.cmp(&b.start_line)));
        rows
    }
}

/// Drop line breaks and other non-space whitespace, then cut to `width`
/// characters with a `...` suffix
pub fn summarize_message(text: &str, width: usize) -> String {
    let flat: String = text
        .chars()
        .filter(|c| *c == ' ' || !c.is_whitespace())
        .collect();

    if flat.chars().count() <= width {
        return flat;
    }

    let mut cut: String = flat.chars().take(width).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sarif::{Finding, Location, Region};

    #[test]
    fn test_rows_sorted_and_filtered() {
        let mut run = ReportRun::new("t");
        run.add_finding(Finding::new("B", "second file").with_location(Location::file("b.tf", 1, 1)));
        run.add_finding(Finding::new("A2", "later").with_location(Location::file("a.tf", 9, 12)));
        run.add_finding(Finding::new("A1", "earlier").with_location(Location::file("a.tf", 2, 2)));
        // no location at all
        run.add_finding(Finding::new("X", "dropped"));

        let mut open_ended = Location::file("c.tf", 4, 4);
        open_ended.physical_location.as_mut().unwrap().region = Some(Region {
            start_line: Some(4),
            ..Default::default()
        });
        run.add_finding(Finding::new("C", "no end").with_level("error").with_location(open_ended));

        let rows = run.rows();
        let keys: Vec<_> = rows.iter().map(|r| (r.file.as_str(), r.start_line)).collect();
        assert_eq!(keys, vec![("a.tf", 2), ("a.tf", 9), ("b.tf", 1), ("c.tf", 4)]);
        assert_eq!(rows[1].end_line_display(), "12");
        assert_eq!(rows[3].end_line_display(), "-");
        assert_eq!(rows[3].level, "error");
        assert_eq!(rows[0].level, "warning");
    }

    #[test]
    fn test_summarize_message() {
        assert_eq!(summarize_message("short", 50), "short");
        assert_eq!(summarize_message("line one\n\tline two", 50), "line oneline two");

        let long = "x".repeat(60);
        let cut = summarize_message(&long, 50);
        assert_eq!(cut.len(), 53);
        assert!(cut.ends_with("..."));

        // multi-byte characters are never split
        let wide = "é".repeat(51);
        assert_eq!(summarize_message(&wide, 50).chars().count(), 53);
    }
}
