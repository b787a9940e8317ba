//! Validation policy data: rules and the verdicts produced from them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// How strongly a failing rule is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Failure makes the artifact invalid
    Block,
    /// Failure is reported as a warning
    Warn,
    /// Failure is only recorded
    Log,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Block => write!(f, "block"),
            Self::Warn => write!(f, "warn"),
            Self::Log => write!(f, "log"),
        }
    }
}

/// Metric measured by a resource-limit rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMetric {
    /// Number of source lines
    LineCount,
    /// Number of characters
    CharCount,
}

impl ResourceMetric {
    /// Measures `code`.
    #[must_use]
    pub fn measure(self, code: &str) -> usize {
        match self {
            Self::LineCount => code.lines().count(),
            Self::CharCount => code.chars().count(),
        }
    }

    /// Unit name used in messages.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::LineCount => "lines",
            Self::CharCount => "characters",
        }
    }
}

/// The check a rule performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Fails when the regex matches anywhere in the source
    Pattern {
        /// Regex source
        pattern: String,
    },
    /// Fails when the source imports a package outside the tenant allowlist
    DependencyAllowlist,
    /// Fails when a metric exceeds the threshold
    ResourceLimit {
        /// Measured quantity
        metric: ResourceMetric,
        /// Largest allowed value
        max: usize,
    },
}

/// A named policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Unique rule name
    pub name: String,
    /// Check to perform
    pub kind: RuleKind,
    /// Enforcement level
    pub severity: Severity,
    /// Message reported on failure
    #[serde(default)]
    pub error_message: Option<String>,
    /// Disabled rules are skipped entirely
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Restricts the rule to one tenant; `None` applies everywhere
    #[serde(default)]
    pub tenant_id: Option<String>,
}

const fn enabled_by_default() -> bool {
    true
}

impl ValidationRule {
    /// Creates a regex rule.
    pub fn pattern<N: Into<String>, P: Into<String>>(
        name: N,
        pattern: P,
        severity: Severity,
    ) -> Self {
        Self::new(
            name,
            RuleKind::Pattern {
                pattern: pattern.into(),
            },
            severity,
        )
    }

    /// Creates the dependency-allowlist rule.
    pub fn dependency_allowlist<N: Into<String>>(name: N, severity: Severity) -> Self {
        Self::new(name, RuleKind::DependencyAllowlist, severity)
    }

    /// Creates a line-count limit rule.
    pub fn max_lines<N: Into<String>>(name: N, max: usize, severity: Severity) -> Self {
        Self::new(
            name,
            RuleKind::ResourceLimit {
                metric: ResourceMetric::LineCount,
                max,
            },
            severity,
        )
    }

    fn new<N: Into<String>>(name: N, kind: RuleKind, severity: Severity) -> Self {
        Self {
            name: name.into(),
            kind,
            severity,
            error_message: None,
            enabled: true,
            tenant_id: None,
        }
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_message<T: Into<String>>(mut self, message: T) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Scopes the rule to one tenant.
    #[must_use]
    pub fn for_tenant<T: Into<String>>(mut self, tenant_id: T) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Whether the rule is active for `tenant_id`.
    #[must_use]
    pub fn applies_to(&self, tenant_id: &str) -> bool {
        self.enabled
            && self
                .tenant_id
                .as_deref()
                .is_none_or(|scope| scope == tenant_id)
    }
}

/// One failed rule in a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Rule that failed
    pub rule: String,
    /// Rule severity
    pub severity: Severity,
    /// What went wrong
    pub message: String,
    /// 1-based line of the offending match
    pub line: Option<usize>,
    /// 1-based column of the offending match
    pub column: Option<usize>,
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.line {
            Some(line) => write!(f, "[{}] {} (line {line})", self.rule, self.message),
            None => write!(f, "[{}] {}", self.rule, self.message),
        }
    }
}

/// Validator output for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// True iff no block-severity rule failed
    pub is_valid: bool,
    /// Block-severity failures
    pub errors: Vec<ValidationIssue>,
    /// Warn-severity failures
    pub warnings: Vec<ValidationIssue>,
    /// Passed rules divided by total rules
    pub security_score: f64,
    /// Names of rules that passed
    pub passed_rules: Vec<String>,
    /// Names of rules that failed, at any severity
    pub failed_rules: Vec<String>,
}

impl ValidationVerdict {
    /// Flattened error messages, used as repair feedback.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Packages every tenant may import.
pub const DEFAULT_ALLOWLIST: [&str; 6] = [
    "react",
    "lucide-react",
    "recharts",
    "date-fns",
    "clsx",
    "framer-motion",
];

/// The standard policy applied to generated components.
#[must_use]
pub fn default_rules(max_lines: usize) -> Vec<ValidationRule> {
    vec![
        ValidationRule::max_lines("max_lines", max_lines, Severity::Block),
        ValidationRule::pattern("no_eval", r"\beval\s*\(", Severity::Block)
            .with_message("eval() is not allowed"),
        ValidationRule::pattern(
            "no_function_constructor",
            r"\bnew\s+Function\s*\(",
            Severity::Block,
        )
        .with_message("new Function() is not allowed"),
        ValidationRule::pattern(
            "no_inner_html",
            r"\.innerHTML\s*=|dangerouslySetInnerHTML",
            Severity::Block,
        )
        .with_message("Direct HTML injection (innerHTML, dangerouslySetInnerHTML) is not allowed"),
        ValidationRule::pattern(
            "no_document_write",
            r"\bdocument\.write(ln)?\s*\(",
            Severity::Block,
        )
        .with_message("document.write() is not allowed"),
        ValidationRule::pattern(
            "no_network_access",
            r"\bfetch\s*\(|\bXMLHttpRequest\b|\bnew\s+WebSocket\b|\bnavigator\.sendBeacon\b",
            Severity::Block,
        )
        .with_message("Network access is not allowed"),
        ValidationRule::pattern(
            "no_browser_storage",
            r"\b(localStorage|sessionStorage|indexedDB)\b|\bdocument\.cookie\b",
            Severity::Block,
        )
        .with_message("Browser storage access is not allowed"),
        ValidationRule::dependency_allowlist("dependency_allowlist", Severity::Block),
        ValidationRule::pattern("no_console_log", r"\bconsole\.log\s*\(", Severity::Warn)
            .with_message("console.log left in component"),
        ValidationRule::pattern("no_todo_comments", r"//\s*(TODO|FIXME)\b", Severity::Log)
            .with_message("Unfinished work marker in component"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, to_string};

    #[test]
    fn test_rule_scope() {
        let global = ValidationRule::max_lines("max_lines", 500, Severity::Block);
        let scoped = ValidationRule::pattern("no_alert", r"\balert\(", Severity::Warn)
            .for_tenant("acme");
        let mut disabled = ValidationRule::dependency_allowlist("deps", Severity::Block);
        disabled.enabled = false;

        assert!(global.applies_to("acme"));
        assert!(scoped.applies_to("acme"));
        assert!(!scoped.applies_to("globex"));
        assert!(!disabled.applies_to("acme"));
    }

    #[test]
    fn test_rule_serialization_is_tagged() -> Result<(), serde_json::Error> {
        let rule = ValidationRule::max_lines("max_lines", 500, Severity::Block);
        let json = to_string(&rule)?;
        assert!(json.contains(r#""type":"resource_limit""#));
        assert!(json.contains(r#""metric":"line_count""#));

        let parsed: ValidationRule = from_str(
            r#"{"name":"no_eval","kind":{"type":"pattern","pattern":"eval\\("},"severity":"block"}"#,
        )?;
        assert!(parsed.enabled);
        assert_eq!(
            parsed.kind,
            RuleKind::Pattern {
                pattern: r"eval\(".to_owned()
            }
        );
        Ok(())
    }

    #[test]
    fn test_default_rules_shape() {
        let rules = default_rules(500);
        let blocking = rules
            .iter()
            .filter(|rule| rule.severity == Severity::Block)
            .count();
        assert_eq!(rules.len(), 10);
        assert_eq!(blocking, 8);
        assert!(rules.iter().all(|rule| rule.tenant_id.is_none()));
    }

    #[test]
    fn test_metric_measurement() {
        let code = "a\nb\nc\n";
        assert_eq!(ResourceMetric::LineCount.measure(code), 3);
        assert_eq!(ResourceMetric::CharCount.measure(code), 6);
    }
}
