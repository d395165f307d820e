//! Error detail lines shared by the text reporters.

use colored::Colorize;

use crate::result::{CheckError, ErrorKind};
use crate::stats::BLANKET_FAILURE_THRESHOLD;

/// Errors that share a checker, operation, and kind.
struct Group<'a> {
    checker: &'a str,
    operation: Option<&'a str>,
    kind: ErrorKind,
    errors: Vec<&'a CheckError>,
}

/// The operation an error is attributed to: the check, else the query.
fn operation(error: &CheckError) -> Option<&str> {
    error.check().or(error.query())
}

fn group(errors: &[CheckError]) -> Vec<Group<'_>> {
    let mut groups: Vec<Group<'_>> = Vec::new();
    for error in errors {
        let op = operation(error);
        match groups
            .iter_mut()
            .find(|g| g.checker == error.checker() && g.operation == op && g.kind == error.kind())
        {
            Some(group) => group.errors.push(error),
            None => groups.push(Group {
                checker: error.checker(),
                operation: op,
                kind: error.kind(),
                errors: vec![error],
            }),
        }
    }
    groups
}

/// Render errors as indented detail lines, grouped in first-seen order.
pub(crate) fn error_details(errors: &[CheckError], color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for group in group(errors) {
        let checker = group.checker;
        let op = group.operation.unwrap_or("?");
        let line = match group.kind {
            ErrorKind::Fail => {
                let ids: Vec<&str> = group.errors.iter().filter_map(|e| e.record_id()).collect();
                format!("  {}#{} failed for records: {}", checker, op, ids.join(", "))
            }
            ErrorKind::Exception => {
                let first = group.errors[0];
                let message = first
                    .exception()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                let noun = if group.errors.len() == 1 { "record" } else { "records" };
                format!(
                    "  {}#{} exception {} for {} {}",
                    checker,
                    op,
                    message,
                    group.errors.len(),
                    noun
                )
            }
            ErrorKind::NoQueryMethods => format!("  {}: Did not define query_methods", checker),
            ErrorKind::NoQueries => format!(
                "  {} does not report any query methods (via query_methods)",
                checker
            ),
            ErrorKind::NoCheckMethods => format!("  {}: Did not define check_methods", checker),
            ErrorKind::NoChecks => format!(
                "  {} does not report any check methods (via check_methods)",
                checker
            ),
            ErrorKind::Blanket => format!(
                "  {}: Skipping because the first {} checks all failed. Either there's a lot of bad data or there's something wrong with the checks.",
                checker, BLANKET_FAILURE_THRESHOLD
            ),
        };
        lines.push(paint(line, group.kind, color));
    }
    lines
}

fn paint(line: String, kind: ErrorKind, color: bool) -> String {
    if !color {
        return line;
    }
    match kind {
        ErrorKind::Fail | ErrorKind::Exception => line.red().to_string(),
        _ => line.yellow().to_string(),
    }
}
