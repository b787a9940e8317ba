//! Checks for each rule kind.

use forge_core::ResourceMetric;
use regex::Regex;

use super::imports::disallowed_imports;

/// Why a rule failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    /// What went wrong
    pub message: String,
    /// 1-based line of the offending text
    pub line: Option<usize>,
    /// 1-based column of the offending text
    pub column: Option<usize>,
}

impl RuleFailure {
    fn without_location(message: String) -> Self {
        Self {
            message,
            line: None,
            column: None,
        }
    }
}

/// Fails when `metric` of `code` exceeds `max`.
pub fn check_resource_limit(
    code: &str,
    metric: ResourceMetric,
    max: usize,
) -> Option<RuleFailure> {
    let actual = metric.measure(code);
    (actual > max).then(|| {
        RuleFailure::without_location(format!(
            "Code has {actual} {unit} (max {max})",
            unit = metric.unit()
        ))
    })
}

/// Fails when `code` imports a package outside `allowlist`.
pub fn check_allowlist(code: &str, allowlist: &[String]) -> Option<RuleFailure> {
    let disallowed = disallowed_imports(code, allowlist);
    if disallowed.is_empty() {
        return None;
    }
    Some(RuleFailure::without_location(format!(
        "Disallowed imports: {}",
        disallowed.join(", ")
    )))
}

/// Fails on the first match of `regex`, reporting where it starts.
pub fn check_pattern(code: &str, regex: &Regex) -> Option<RuleFailure> {
    let found = regex.find(code)?;
    let before = &code[..found.start()];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let column = code[line_start..found.start()].chars().count() + 1;

    Some(RuleFailure {
        message: format!("Forbidden pattern `{}` found", found.as_str()),
        line: Some(line),
        column: Some(column),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_limit_reports_actual_count() {
        let code = "x\n".repeat(501);
        let failure = check_resource_limit(&code, ResourceMetric::LineCount, 500);
        assert_eq!(
            failure.map(|found| found.message),
            Some("Code has 501 lines (max 500)".to_owned())
        );

        let at_limit = "x\n".repeat(500);
        assert_eq!(check_resource_limit(&at_limit, ResourceMetric::LineCount, 500), None);
    }

    #[test]
    fn test_pattern_location() -> Result<(), regex::Error> {
        let regex = Regex::new(r"\beval\s*\(")?;
        let code = "const a = 1;\nconst b = 2;\n  const c = eval('a');\n";

        let failure = check_pattern(code, &regex);
        assert_eq!(failure.as_ref().and_then(|found| found.line), Some(3));
        assert_eq!(failure.as_ref().and_then(|found| found.column), Some(13));
        assert_eq!(check_pattern("const evaluate = 1;", &regex), None);
        Ok(())
    }

    #[test]
    fn test_pattern_on_first_line() -> Result<(), regex::Error> {
        let regex = Regex::new("innerHTML")?;
        let failure = check_pattern("el.innerHTML = x", &regex);
        assert_eq!(
            failure.map(|found| (found.line, found.column)),
            Some((Some(1), Some(4)))
        );
        Ok(())
    }
}
