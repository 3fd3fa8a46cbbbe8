// crates/mission-warden-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Mission Warden CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging and to prepare for future locales.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
///
/// # Invariants
/// - Ordering is stable for deterministic presentation.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
/// - `value` is preformatted and should be safe for display.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries loaded into the localized message bundle.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "mission-warden {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.serialize_failed", "Failed to serialize canonical JSON: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit}).",
    ),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("identity.table_failed", "Failed to build the identity table: {error}"),
    ("mission.kind.document", "mission document"),
    ("mission.kind.script", "invocation script"),
    ("mission.kind.mandate", "mandate"),
    ("mission.read_failed", "Failed to read {kind} file at {path}: {error}"),
    ("mission.parse_failed", "Failed to parse {kind} JSON at {path}: {error}"),
    ("mission.compile_failed", "Mission compilation failed for {path}: {error}"),
    ("mission.compile.plan_hash", "Plan hash: {value}"),
    ("mission.compile.ok", "Execution plan written to {path}"),
    ("mission.compile.write_failed", "Failed to write execution plan to {path}: {error}"),
    (
        "mission.compile.deprecated_alias",
        "Deprecation: agent handle {handle} resolved to {canonical} at {site}.",
    ),
    (
        "mission.execute.evidence_dir_failed",
        "Failed to create evidence directory {path}: {error}",
    ),
    ("mission.execute.dispatch_failed", "Mission dispatch failed: {error}"),
    ("mission.execute.store_failed", "Failed to persist evidence bundle {bundle_id}: {error}"),
    ("mission.execute.bundle_saved", "Evidence bundle {bundle_id} written to {path}"),
    ("mission.execute.outcome", "Mission outcome: {outcome}"),
    ("mission.execute.outcome.completed", "completed"),
    ("mission.execute.outcome.failed", "failed"),
    ("mission.execute.outcome.aborted", "aborted"),
    ("mission.execute.outcome.suspended", "suspended"),
    ("mission.execute.suspended_tasks", "Awaiting approval for: {tasks}"),
    (
        "mission.execute.approval_wait",
        "Watching mandate {path} for approval for up to {wait_ms} ms.",
    ),
    ("mission.execute.approval_detected", "Mandate approval detected; resuming dispatch."),
    (
        "mission.execute.time.negative",
        "executed_at must be a non-negative unix timestamp in milliseconds.",
    ),
    (
        "mission.execute.time.system_failed",
        "Failed to read the system time for dispatch: {error}",
    ),
    ("mission.execute.time.overflow", "The system time is out of range for dispatch."),
    ("bundle.verify.load_failed", "Failed to load evidence bundle {bundle_id}: {error}"),
    ("bundle.verify.failed", "Failed to verify the evidence bundle: {error}"),
    ("bundle.verify.status.pass", "pass"),
    ("bundle.verify.status.fail", "fail"),
    ("bundle.verify.md.header", "# Mission Warden Bundle Verification"),
    ("bundle.verify.md.status", "- Status: {status}"),
    ("bundle.verify.md.checked", "- Checked artifacts: {count}"),
    ("bundle.verify.md.errors_header", "## Errors"),
    ("bundle.verify.md.error_line", "- {error}"),
    ("bundle.verify.md.no_errors", "- None"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries loaded into the localized message bundle.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "mission-warden {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.serialize_failed", "No s'ha pogut serialitzar el JSON canònic: {error}"),
    (
        "input.read_too_large",
        "Es rebutja llegir {kind} a {path} perquè fa {size} bytes (límit {limit}).",
    ),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "Configuració vàlida."),
    ("identity.table_failed", "No s'ha pogut construir la taula d'identitats: {error}"),
    ("mission.kind.document", "document de missió"),
    ("mission.kind.script", "guió d'invocació"),
    ("mission.kind.mandate", "mandat"),
    ("mission.read_failed", "No s'ha pogut llegir el fitxer {kind} a {path}: {error}"),
    ("mission.parse_failed", "No s'ha pogut analitzar el JSON {kind} a {path}: {error}"),
    ("mission.compile_failed", "La compilació de la missió ha fallat per a {path}: {error}"),
    ("mission.compile.plan_hash", "Hash del pla: {value}"),
    ("mission.compile.ok", "Pla d'execució escrit a {path}"),
    (
        "mission.compile.write_failed",
        "No s'ha pogut escriure el pla d'execució a {path}: {error}",
    ),
    (
        "mission.compile.deprecated_alias",
        "Avís de desús: l'identificador d'agent {handle} s'ha resolt a {canonical} a {site}.",
    ),
    (
        "mission.execute.evidence_dir_failed",
        "No s'ha pogut crear el directori d'evidències {path}: {error}",
    ),
    ("mission.execute.dispatch_failed", "L'enviament de la missió ha fallat: {error}"),
    (
        "mission.execute.store_failed",
        "No s'ha pogut desar el paquet d'evidències {bundle_id}: {error}",
    ),
    ("mission.execute.bundle_saved", "Paquet d'evidències {bundle_id} escrit a {path}"),
    ("mission.execute.outcome", "Resultat de la missió: {outcome}"),
    ("mission.execute.outcome.completed", "completada"),
    ("mission.execute.outcome.failed", "fallida"),
    ("mission.execute.outcome.aborted", "avortada"),
    ("mission.execute.outcome.suspended", "suspesa"),
    ("mission.execute.suspended_tasks", "A l'espera d'aprovació per a: {tasks}"),
    (
        "mission.execute.approval_wait",
        "Es vigila el mandat {path} durant un màxim de {wait_ms} ms per a l'aprovació.",
    ),
    (
        "mission.execute.approval_detected",
        "S'ha detectat l'aprovació del mandat; es reprèn l'execució.",
    ),
    (
        "mission.execute.time.negative",
        "executed_at ha de ser una marca de temps unix en mil·lisegons no negativa.",
    ),
    (
        "mission.execute.time.system_failed",
        "No s'ha pogut llegir l'hora del sistema per a l'enviament: {error}",
    ),
    (
        "mission.execute.time.overflow",
        "L'hora del sistema està fora de rang per a l'enviament.",
    ),
    (
        "bundle.verify.load_failed",
        "No s'ha pogut carregar el paquet d'evidències {bundle_id}: {error}",
    ),
    ("bundle.verify.failed", "No s'ha pogut verificar el paquet d'evidències: {error}"),
    ("bundle.verify.status.pass", "aprovat"),
    ("bundle.verify.status.fail", "fallat"),
    ("bundle.verify.md.header", "# Verificació del Paquet d'Evidències de Mission Warden"),
    ("bundle.verify.md.status", "- Estat: {status}"),
    ("bundle.verify.md.checked", "- Artefactes comprovats: {count}"),
    ("bundle.verify.md.errors_header", "## Errors"),
    ("bundle.verify.md.error_line", "- {error}"),
    ("bundle.verify.md.no_errors", "- Cap"),
    (
        "i18n.lang.invalid_env",
        "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'.",
    ),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the raw catalog entries for the requested locale.
#[cfg(test)]
pub(crate) const fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::Ca => CATALOG_CA,
    }
}

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
