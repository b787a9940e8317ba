//! Rule-based validation of generated components.
//!
//! Every active rule is evaluated against the source text. Only `block`
//! failures make a verdict invalid. A rule whose regex does not compile
//! counts as passed, while an unmet block rule always fails.

/// Compiled-regex cache.
pub mod cache;
/// Import extraction and package-name reduction.
pub mod imports;
/// Per-kind rule checks.
pub mod rules;

use async_trait::async_trait;
use chrono::Utc;
use forge_core::{
    AuditEntry, PipelineStore, Result, RuleKind, SessionId, Severity, ValidationConfig,
    ValidationIssue, ValidationRule, ValidationVerdict,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use cache::RegexCache;
pub use imports::{disallowed_imports, imported_packages, package_name};
pub use rules::RuleFailure;

/// Where a validation call comes from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext {
    /// Session being validated, if any
    pub session_id: Option<SessionId>,
}

impl ValidationContext {
    /// Context for a pipeline session.
    pub fn for_session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
        }
    }
}

/// Trait for validation strategies
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validates `code` for `tenant_id`.
    ///
    /// # Errors
    /// Returns an error if the rules or allowlist cannot be loaded.
    async fn validate(
        &self,
        code: &str,
        context: &ValidationContext,
        tenant_id: &str,
    ) -> Result<ValidationVerdict>;
}

/// Evaluates stored validation rules against source text.
pub struct RuleValidator {
    store: Arc<dyn PipelineStore>,
    regexes: RegexCache,
}

impl RuleValidator {
    /// Creates a validator reading rules from `store`.
    pub fn new(store: Arc<dyn PipelineStore>, config: &ValidationConfig) -> Self {
        Self {
            store,
            regexes: RegexCache::new(config.regex_size_limit),
        }
    }

    /// Evaluates `rules` against `code` without touching the store.
    ///
    /// Deterministic: the same code, rules and allowlist give the same verdict.
    pub fn evaluate(
        &self,
        code: &str,
        rules: &[ValidationRule],
        allowlist: &[String],
    ) -> ValidationVerdict {
        let mut verdict = ValidationVerdict {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            security_score: 0.0,
            passed_rules: Vec::new(),
            failed_rules: Vec::new(),
        };

        for rule in rules {
            let Some(failure) = self.check(rule, code, allowlist) else {
                verdict.passed_rules.push(rule.name.clone());
                continue;
            };

            verdict.failed_rules.push(rule.name.clone());
            let issue = ValidationIssue {
                rule: rule.name.clone(),
                severity: rule.severity,
                message: failure_message(rule, failure.message),
                line: failure.line,
                column: failure.column,
            };

            match rule.severity {
                Severity::Block => verdict.errors.push(issue),
                Severity::Warn => verdict.warnings.push(issue),
                Severity::Log => info!("Rule {} flagged: {}", issue.rule, issue.message),
            }
        }

        verdict.is_valid = verdict.errors.is_empty();
        if !rules.is_empty() {
            verdict.security_score = verdict.passed_rules.len() as f64 / rules.len() as f64;
        }
        verdict
    }

    fn check(
        &self,
        rule: &ValidationRule,
        code: &str,
        allowlist: &[String],
    ) -> Option<RuleFailure> {
        match &rule.kind {
            RuleKind::ResourceLimit { metric, max } => {
                rules::check_resource_limit(code, *metric, *max)
            }
            RuleKind::DependencyAllowlist => rules::check_allowlist(code, allowlist),
            RuleKind::Pattern { pattern } => {
                let Some(regex) = self.regexes.get(pattern) else {
                    warn!("Rule {} has an invalid pattern, treating as passed", rule.name);
                    return None;
                };
                rules::check_pattern(code, &regex)
            }
        }
    }

    async fn audit(
        &self,
        tenant_id: &str,
        context: &ValidationContext,
        verdict: &ValidationVerdict,
    ) {
        let entry = AuditEntry {
            tenant_id: tenant_id.to_owned(),
            session_id: context.session_id,
            passed: verdict.passed_rules.len(),
            failed: verdict.failed_rules.len(),
            is_valid: verdict.is_valid,
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.append_audit(entry).await {
            warn!("Failed to write validation audit entry: {err}");
        }
    }
}

/// Pattern rules report their configured message; other kinds prefix it to the details.
fn failure_message(rule: &ValidationRule, details: String) -> String {
    match (&rule.kind, &rule.error_message) {
        (_, None) => details,
        (RuleKind::Pattern { .. }, Some(custom)) => custom.clone(),
        (_, Some(custom)) => format!("{custom}: {details}"),
    }
}

#[async_trait]
impl Validator for RuleValidator {
    async fn validate(
        &self,
        code: &str,
        context: &ValidationContext,
        tenant_id: &str,
    ) -> Result<ValidationVerdict> {
        let rules = self.store.active_rules(tenant_id).await?;
        let allowlist = self.store.allowlist(tenant_id).await?;

        let verdict = self.evaluate(code, &rules, &allowlist);
        debug!(
            "Validated {} lines for {tenant_id}: {} passed, {} failed, valid={}",
            code.lines().count(),
            verdict.passed_rules.len(),
            verdict.failed_rules.len(),
            verdict.is_valid
        );

        self.audit(tenant_id, context, &verdict).await;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::MemoryStore;

    fn validator() -> RuleValidator {
        RuleValidator::new(Arc::new(MemoryStore::new()), &ValidationConfig::default())
    }

    #[test]
    fn test_severity_routing() {
        let rules = vec![
            ValidationRule::pattern("no_eval", r"\beval\(", Severity::Block),
            ValidationRule::pattern("no_console_log", r"console\.log\(", Severity::Warn),
            ValidationRule::pattern("no_todo", r"// TODO", Severity::Log),
        ];
        let code = "// TODO tidy\nconsole.log('hi');\n";

        let verdict = validator().evaluate(code, &rules, &[]);
        assert!(verdict.is_valid);
        assert!(verdict.errors.is_empty());
        assert_eq!(verdict.warnings.len(), 1);
        assert_eq!(verdict.passed_rules, vec!["no_eval"]);
        assert_eq!(verdict.failed_rules, vec!["no_console_log", "no_todo"]);
        assert!((verdict.security_score - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_regex_fails_open() {
        let rules = vec![ValidationRule::pattern("broken", "(unclosed", Severity::Block)];
        let verdict = validator().evaluate("anything (unclosed", &rules, &[]);

        assert!(verdict.is_valid);
        assert_eq!(verdict.passed_rules, vec!["broken"]);
        assert!((verdict.security_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_rule_set_scores_zero() {
        let verdict = validator().evaluate("const x = 1;", &[], &[]);
        assert!(verdict.is_valid);
        assert!(verdict.security_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_custom_messages() {
        let rules = vec![
            ValidationRule::pattern("no_eval", r"\beval\(", Severity::Block)
                .with_message("eval() is not allowed"),
            ValidationRule::max_lines("max_lines", 1, Severity::Block)
                .with_message("Component too long"),
        ];
        let verdict = validator().evaluate("eval(a)\nb\n", &rules, &[]);

        assert_eq!(verdict.errors[0].message, "eval() is not allowed");
        assert_eq!(verdict.errors[0].line, Some(1));
        assert_eq!(
            verdict.errors[1].message,
            "Component too long: Code has 2 lines (max 1)"
        );
    }
}
