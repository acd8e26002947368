//! Well-known column names and the salary column resolver.

pub const EXPERIENCE_LEVEL: &str = "experience_level";
pub const COMPANY_SIZE: &str = "company_size";
pub const JOB_TITLE: &str = "job_title";
pub const JOB_TYPE: &str = "job_type";

/// Salary columns in priority order: the USD-normalised field first, then
/// the legacy name.
pub const SALARY_COLUMNS: [&str; 2] = ["salary_in_usd", "salary"];

/// First name from `priority` present in `columns`.
pub fn resolve_column<'p, S: AsRef<str>>(columns: &[S], priority: &[&'p str]) -> Option<&'p str> {
    priority
        .iter()
        .copied()
        .find(|wanted| columns.iter().any(|c| c.as_ref() == *wanted))
}

/// The salary column to chart and model, if any.
pub fn resolve_salary_column<S: AsRef<str>>(columns: &[S]) -> Option<&'static str> {
    resolve_column(columns, &SALARY_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_wins_over_legacy() {
        assert_eq!(
            resolve_salary_column(&["salary", "job_title", "salary_in_usd"]),
            Some("salary_in_usd")
        );
    }

    #[test]
    fn legacy_alias_used_alone() {
        assert_eq!(resolve_salary_column(&["salary", "job_title"]), Some("salary"));
    }

    #[test]
    fn none_found() {
        assert_eq!(resolve_salary_column(&["job_title"]), None);
        assert_eq!(resolve_salary_column::<&str>(&[]), None);
    }
}
