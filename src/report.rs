//! Report composition.
//!
//! Exactly one email goes out per run. Zero captured failures produce the
//! success message; otherwise the subject carries the error count and the
//! body concatenates every failure message in occurrence order.

use crate::task::TaskError;

/// Subject of the success email.
const SUCCESS_SUBJECT: &str = "Backup succeeded";
/// Body of the success email.
const SUCCESS_BODY: &str = "Hope you're having a nice day :)";

/// A composed notification: subject line plus plaintext body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

/// Build the run report from the accumulated error log.
///
/// Failure messages are concatenated exactly as produced (each already ends
/// with its own framing), with only the surrounding whitespace of the whole
/// body trimmed.
pub fn compose(errors: &[TaskError]) -> Report {
    if errors.is_empty() {
        return Report {
            subject: SUCCESS_SUBJECT.to_string(),
            body: SUCCESS_BODY.to_string(),
        };
    }

    let subject = format!(
        "Backup failed! {} error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    let body = errors
        .iter()
        .map(|err| err.to_string())
        .collect::<String>()
        .trim()
        .to_string();

    Report { subject, body }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn process_error(n: u32) -> TaskError {
        TaskError::Process {
            command: format!("restic backup /dir{n}"),
            exit_code: 1,
            stdout: String::new(),
            stderr: format!("failure {n}"),
        }
    }

    #[test]
    fn zero_errors_is_the_success_report() {
        let report = compose(&[]);
        assert_eq!(report.subject, "Backup succeeded");
        assert_eq!(report.body, "Hope you're having a nice day :)");
    }

    #[test]
    fn one_error_uses_singular_subject() {
        let report = compose(&[process_error(1)]);
        assert_eq!(report.subject, "Backup failed! 1 error");
    }

    #[test]
    fn multiple_errors_use_plural_subject() {
        let errors = vec![process_error(1), process_error(2), process_error(3)];
        assert_eq!(compose(&errors).subject, "Backup failed! 3 errors");
    }

    #[test]
    fn body_preserves_occurrence_order() {
        let errors = vec![
            TaskError::Other("first\n".to_string()),
            TaskError::Other("second\n".to_string()),
            TaskError::Other("third".to_string()),
        ];
        let report = compose(&errors);
        let first = report.body.find("first").unwrap();
        let second = report.body.find("second").unwrap();
        let third = report.body.find("third").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn body_concatenates_without_added_separator_and_trims() {
        let errors = vec![
            TaskError::Other("  alpha".to_string()),
            TaskError::Other("beta  \n".to_string()),
        ];
        // Messages are joined as-is; only the surrounding whitespace goes.
        assert_eq!(compose(&errors).body, "alphabeta");
    }

    #[test]
    fn body_contains_every_message() {
        let errors: Vec<TaskError> = (0..5).map(process_error).collect();
        let report = compose(&errors);
        for n in 0..5 {
            assert!(report.body.contains(&format!("failure {n}")));
        }
    }
}
