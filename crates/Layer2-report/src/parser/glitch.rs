//! GLITCH line output
//!
//! One finding per line, comma separated:
//!
//! ```text
//! description,path,line,rule,context,note[,...]
//! ```
//!
//! Lines with fewer than six fields or a non-numeric line number are
//! skipped.

use crate::rewrite::path_to_uri;
use crate::sarif::{Finding, Location, Report, ReportRun};
use infrarun_foundation::{Error, Result};
use tracing::debug;

const DRIVER_NAME: &str = "GLITCH";
const INFORMATION_URI: &str = "https://github.com/sr-lab/GLITCH";
const LEVEL: &str = "warning";

#[derive(Debug, PartialEq)]
struct Record<'a> {
    description: &'a str,
    path: &'a str,
    line: i64,
    rule: &'a str,
    context: &'a str,
}

fn parse_line(line: &str) -> Option<Record<'_>> {
    let fields: Vec<&str> = line.splitn(7, ',').collect();
    if fields.len() < 6 {
        return None;
    }

    Some(Record {
        description: fields[0],
        path: fields[1],
        line: fields[2].trim().parse().ok()?,
        rule: fields[3],
        context: fields[4],
    })
}

pub fn parse_glitch(data: &[u8]) -> Result<Report> {
    let text = String::from_utf8_lossy(data);
    let mut run = ReportRun::new(DRIVER_NAME).with_information_uri(INFORMATION_URI);

    let mut skipped = 0;
    for line in text.lines() {
        let Some(record) = parse_line(line) else {
            if !line.trim().is_empty() {
                skipped += 1;
            }
            continue;
        };

        let uri = path_to_uri(record.path);
        run.add_distinct_artifact(&uri);
        run.add_rule(record.rule, record.description);
        run.add_finding(
            Finding::new(record.rule, record.context)
                .with_level(LEVEL)
                .with_location(Location::file(uri, record.line, record.line)),
        );
    }

    if skipped > 0 {
        debug!("glitch: skipped {} malformed lines", skipped);
    }

    let report = Report::new().with_run(run);
    report
        .validate()
        .map_err(|message| Error::parse("glitch", message))?;
    Ok(report)
}
