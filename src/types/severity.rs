use std::fmt;

use colored::Colorize;

/// Severity levels reported by Wiz for issues and vulnerabilities.
///
/// Nodes keep severities as the raw upstream strings so responses pass
/// through unchanged; this type is for ordering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
    None,
}

impl Severity {
    /// Parse an upstream severity string. Unknown values map to `None`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            "INFORMATIONAL" | "INFO" => Severity::Informational,
            _ => Severity::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Informational => "Info",
            Severity::None => "None",
        }
    }

    /// Get the colored label for terminal output.
    pub fn colored(self) -> String {
        let label = self.label();
        match self {
            Severity::Critical => label.red().bold().to_string(),
            Severity::High => label.bright_red().to_string(),
            Severity::Medium => label.yellow().to_string(),
            Severity::Low => label.blue().to_string(),
            Severity::Informational => label.bright_black().to_string(),
            Severity::None => label.to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse("high"), Severity::High);
        assert_eq!(Severity::parse("INFORMATIONAL"), Severity::Informational);
        assert_eq!(Severity::parse("whatever"), Severity::None);
    }

    #[test]
    fn test_ordering_puts_critical_first() {
        let mut all = vec![Severity::Low, Severity::Critical, Severity::Medium];
        all.sort();
        assert_eq!(all, vec![Severity::Critical, Severity::Medium, Severity::Low]);
    }
}
