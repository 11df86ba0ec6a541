//! SARIF-native tool output

use crate::sarif::{Report, DEFAULT_LEVEL};
use infrarun_foundation::{Error, Result};
use tracing::debug;

/// Decode a SARIF document as-is
pub fn parse_sarif(data: &[u8]) -> Result<Report> {
    decode("sarif", data)
}

/// KICS writes an empty `level` on every result, which strict consumers
/// reject; those are set to `warning` before validation.
pub fn parse_kics(data: &[u8]) -> Result<Report> {
    let mut report = decode("kics", data)?;

    let mut patched = 0;
    for finding in report.runs.iter_mut().flat_map(|run| run.results.iter_mut()) {
        if finding.level.as_deref().map_or(true, str::is_empty) {
            finding.level = Some(DEFAULT_LEVEL.to_string());
            patched += 1;
        }
    }
    debug!("kics: defaulted level on {} results", patched);

    report
        .validate()
        .map_err(|message| Error::parse("kics", message))?;
    Ok(report)
}

fn decode(parser: &str, data: &[u8]) -> Result<Report> {
    Report::from_slice(data).map_err(|e| Error::parse(parser, e))
}
