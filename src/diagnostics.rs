//! Diagnostics
//!
//! Collects advisory problems met while compiling a type graph. None of these
//! abort a pass; they attach to the type or member that caused them.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Referenced type is not part of the universe
    UnknownType,
    /// Schema directive names an implementation type that does not exist
    UnknownImplementation,
    /// Substitution table target does not exist
    CustomSchemaNotFound,
    /// Default, example or enum literal could not be parsed for its type
    CoercionFailed,
    /// Directive value has the wrong shape
    InvalidDirectiveValue,
    /// Generic placeholder without binding or bound
    UnresolvedPlaceholder,
    /// Two origins compete for one schema name
    DuplicateSchemaName,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownType => "W001",
            Self::UnknownImplementation => "W002",
            Self::CustomSchemaNotFound => "W003",
            Self::CoercionFailed => "W004",
            Self::InvalidDirectiveValue => "W005",
            Self::UnresolvedPlaceholder => "W006",
            Self::DuplicateSchemaName => "E001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateSchemaName => Severity::Error,

            Self::UnknownType
            | Self::UnknownImplementation
            | Self::CustomSchemaNotFound
            | Self::CoercionFailed
            | Self::InvalidDirectiveValue
            | Self::UnresolvedPlaceholder => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Type or `Owner.member` the diagnostic attaches to
    pub subject: String,
    /// Diagnostic code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (suggestions, raw values)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.subject
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one compilation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item, mirroring it to the log
    pub fn push(&mut self, item: DiagnosticItem) {
        match item.severity() {
            Severity::Error => tracing::error!(code = %item.code, subject = %item.subject, "{}", item.message),
            Severity::Warning => tracing::warn!(code = %item.code, subject = %item.subject, "{}", item.message),
            Severity::Info => tracing::info!(code = %item.code, subject = %item.subject, "{}", item.message),
        }
        self.items.push(item);
    }

    /// Add a warning
    pub fn warning(
        &mut self,
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) {
        self.push(DiagnosticItem::new(subject, code, message));
    }

    /// Add diagnostic for a type missing from the universe
    pub fn unknown_type(&mut self, subject: impl Into<String>, name: &str, suggestion: Option<String>) {
        let mut item = DiagnosticItem::new(
            subject,
            DiagnosticCode::UnknownType,
            format!("Type '{}' is not declared; omitting it", name),
        );
        if let Some(suggestion) = suggestion {
            item = item.with_context(format!("did you mean '{}'?", suggestion));
        }
        self.push(item);
    }

    /// Add diagnostic for a value that failed to coerce
    pub fn coercion_failed(&mut self, subject: impl Into<String>, raw: &str, reason: impl fmt::Display) {
        self.push(
            DiagnosticItem::new(
                subject,
                DiagnosticCode::CoercionFailed,
                format!("Can't convert '{}': {}", raw, reason),
            )
            .with_context("keeping the raw text"),
        );
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    /// Get all errors
    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    /// Get all warnings
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items carrying a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    /// Get all items
    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge another collection into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Format all diagnostics, one per line
    pub fn format_all(&self) -> String {
        self.items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
