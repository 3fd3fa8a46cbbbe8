// crates/mission-warden-cli/src/main.rs
// ============================================================================
// Module: Mission Warden CLI Entry Point
// Description: Command dispatcher for mission compilation, execution, and
//              evidence bundle workflows.
// Purpose: Provide a safe, localized CLI for offline mission orchestration.
// Dependencies: clap, mission-warden-config, mission-warden-core, serde,
//               serde_jcs, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The Mission Warden CLI compiles mission documents into deterministic
//! execution plans, dispatches them offline against scripted agent outcomes,
//! and verifies the evidence bundles a dispatch leaves behind. All
//! user-facing strings are routed through the i18n catalog to prepare for
//! future localization. Security posture: inputs are untrusted and must be
//! validated before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use mission_warden_cli::i18n::Locale;
use mission_warden_cli::i18n::set_locale;
use mission_warden_cli::t;
use mission_warden_config::WardenConfig;
use mission_warden_core::AgentInvocationError;
use mission_warden_core::AgentInvoker;
use mission_warden_core::ApprovalStatus;
use mission_warden_core::BundleId;
use mission_warden_core::BundleStore;
use mission_warden_core::BundleVerifier;
use mission_warden_core::DEFAULT_HASH_ALGORITHM;
use mission_warden_core::DeprecationNotice;
use mission_warden_core::DispatchOutcome;
use mission_warden_core::Dispatcher;
use mission_warden_core::EvidenceBundleManifest;
use mission_warden_core::EvidenceRecorder;
use mission_warden_core::ExecutionPlan;
use mission_warden_core::FsBundleStore;
use mission_warden_core::HashAlgorithm;
use mission_warden_core::HashDigest;
use mission_warden_core::IdentityResolver;
use mission_warden_core::InvocationOutcome;
use mission_warden_core::InvocationRequest;
use mission_warden_core::Mandate;
use mission_warden_core::MissionDocument;
use mission_warden_core::ReportedTest;
use mission_warden_core::SharedMandate;
use mission_warden_core::TaskId;
use mission_warden_core::Timestamp;
use mission_warden_core::VerificationReport;
use mission_warden_core::VerificationStatus;
use mission_warden_core::compile;
use mission_warden_core::short_canonical_hash;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a mission document JSON input.
const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;
/// Maximum size of an invocation script JSON input.
const MAX_SCRIPT_BYTES: usize = 1024 * 1024;
/// Maximum size of a mandate JSON input.
const MAX_MANDATE_BYTES: usize = 64 * 1024;
/// Length of the short plan hash used in derived bundle identifiers.
const BUNDLE_ID_HASH_LENGTH: usize = 12;
/// Interval between mandate re-reads while a suspended run awaits approval.
const APPROVAL_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "MISSION_WARDEN_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mission-warden", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `MISSION_WARDEN_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Mission compilation and dispatch utilities.
    Mission {
        /// Selected mission subcommand.
        #[command(subcommand)]
        command: MissionCommand,
    },
    /// Evidence bundle utilities.
    Bundle {
        /// Selected bundle subcommand.
        #[command(subcommand)]
        command: BundleCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Mission subcommands.
#[derive(Subcommand, Debug)]
enum MissionCommand {
    /// Compile a mission document into a deterministic execution plan.
    Compile(MissionCompileCommand),
    /// Compile a mission document and dispatch it against scripted outcomes.
    Execute(MissionExecuteCommand),
}

/// Evidence bundle subcommands.
#[derive(Subcommand, Debug)]
enum BundleCommand {
    /// Verify a stored evidence bundle offline.
    Verify(BundleVerifyCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for mission compilation.
#[derive(Args, Debug)]
struct MissionCompileCommand {
    /// Path to the mission document JSON file.
    #[arg(long, value_name = "PATH")]
    document: PathBuf,
    /// Optional output path for the canonical execution plan (defaults to stdout).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Optional config file path (defaults to mission-warden.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for mission execution.
#[derive(Args, Debug)]
struct MissionExecuteCommand {
    /// Path to the mission document JSON file.
    #[arg(long, value_name = "PATH")]
    document: PathBuf,
    /// Path to the invocation script JSON file with scripted agent outcomes.
    #[arg(long, value_name = "PATH")]
    script: PathBuf,
    /// Optional path to a mandate JSON file authorizing the run.
    #[arg(long, value_name = "PATH")]
    mandate: Option<PathBuf>,
    /// Optional evidence bundle identifier (defaults to mission id plus plan hash).
    #[arg(long, value_name = "ID")]
    bundle_id: Option<String>,
    /// Evidence root directory (defaults to the configured evidence root).
    #[arg(long, value_name = "DIR")]
    evidence_dir: Option<PathBuf>,
    /// Root directory for artifact hashing (defaults to the configured artifact root).
    #[arg(long, value_name = "DIR")]
    artifact_root: Option<PathBuf>,
    /// Timestamp for the dispatch (unix milliseconds, defaults to system time).
    #[arg(long, value_name = "UNIX_MS")]
    executed_at_unix_ms: Option<i64>,
    /// Optional config file path (defaults to mission-warden.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for bundle verification.
#[derive(Args, Debug)]
struct BundleVerifyCommand {
    /// Evidence bundle identifier to verify.
    #[arg(long, value_name = "ID")]
    bundle_id: String,
    /// Evidence root directory (defaults to the configured evidence root).
    #[arg(long, value_name = "DIR")]
    evidence_dir: Option<PathBuf>,
    /// Root directory for artifact re-hashing (defaults to the configured artifact root).
    #[arg(long, value_name = "DIR")]
    artifact_root: Option<PathBuf>,
    /// Output format for the verification report.
    #[arg(long, value_enum, default_value_t = VerifyFormat::Json)]
    format: VerifyFormat,
    /// Optional config file path (defaults to mission-warden.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to mission-warden.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Supported CLI languages.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

/// Output formats for the verification report.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum VerifyFormat {
    /// Canonical JSON output.
    Json,
    /// Markdown summary output.
    Markdown,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a localized message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable, already-localized error message.
    message: String,
}

impl CliError {
    /// Creates a CLI error from a preformatted message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI handlers.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Mission {
            command,
        } => command_mission(command),
        Commands::Bundle {
            command,
        } => command_bundle(command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Prints top-level CLI help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Mission Commands
// ============================================================================

/// Dispatches mission subcommands.
fn command_mission(command: MissionCommand) -> CliResult<ExitCode> {
    match command {
        MissionCommand::Compile(command) => command_mission_compile(&command),
        MissionCommand::Execute(command) => command_mission_execute(&command),
    }
}

/// Executes the mission compile command.
fn command_mission_compile(command: &MissionCompileCommand) -> CliResult<ExitCode> {
    let warden_config = load_warden_config(command.config.as_deref())?;
    let resolver = build_resolver(&warden_config)?;
    let document = read_mission_document(&command.document)?;
    let compiled = compile(&document, &resolver).map_err(|err| {
        CliError::new(t!("mission.compile_failed", path = command.document.display(), error = err))
    })?;
    report_deprecations(&compiled.deprecations)?;

    let plan_hash = compiled
        .plan
        .content_hash()
        .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))?;
    let bytes = canonical_output_bytes(&compiled.plan)?;
    let summary = t!("mission.compile.plan_hash", value = format_hash_digest(&plan_hash));

    if let Some(output) = &command.output {
        fs::write(output, &bytes).map_err(|err| {
            CliError::new(t!(
                "mission.compile.write_failed",
                path = output.display(),
                error = err
            ))
        })?;
        write_stdout_line(&t!("mission.compile.ok", path = output.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        write_stdout_line(&summary).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    write_stdout_bytes_with_newline(&bytes)?;
    write_stderr_line(&summary).map_err(|err| CliError::new(output_error("stderr", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the mission execute command.
fn command_mission_execute(command: &MissionExecuteCommand) -> CliResult<ExitCode> {
    let warden_config = load_warden_config(command.config.as_deref())?;
    let resolver = build_resolver(&warden_config)?;
    let document = read_mission_document(&command.document)?;
    let script_kind = t!("mission.kind.script");
    let script: InvocationScript =
        read_json_input(&command.script, &script_kind, MAX_SCRIPT_BYTES)?;
    let mandate = read_mandate(command.mandate.as_deref())?;
    let executed_at = resolve_executed_at(command.executed_at_unix_ms)?;

    let compiled = compile(&document, &resolver).map_err(|err| {
        CliError::new(t!("mission.compile_failed", path = command.document.display(), error = err))
    })?;
    report_deprecations(&compiled.deprecations)?;

    let bundle_id = resolve_bundle_id(command.bundle_id.clone(), &compiled.plan)?;
    let evidence_dir = command
        .evidence_dir
        .clone()
        .unwrap_or_else(|| warden_config.evidence.root.clone());
    let artifact_root = command
        .artifact_root
        .clone()
        .unwrap_or_else(|| warden_config.evidence.artifact_root.clone());
    fs::create_dir_all(&evidence_dir).map_err(|err| {
        CliError::new(t!(
            "mission.execute.evidence_dir_failed",
            path = evidence_dir.display(),
            error = err
        ))
    })?;

    let manifest = EvidenceBundleManifest::new(
        bundle_id.clone(),
        Some(compiled.plan.mission_id.clone()),
        None,
        mandate.clone(),
        executed_at,
    );
    let recorder = EvidenceRecorder::new(manifest);
    let shared_mandate = SharedMandate::new(mandate);
    let invoker = ScriptedInvoker::new(&script);
    let mut dispatcher = Dispatcher::new(
        compiled,
        resolver,
        invoker,
        shared_mandate.clone(),
        recorder,
        &artifact_root,
        warden_config.dispatch.dispatcher_config(),
    );

    let mut outcome = dispatcher
        .run(executed_at)
        .map_err(|err| CliError::new(t!("mission.execute.dispatch_failed", error = err)))?;
    if matches!(outcome, DispatchOutcome::Suspended { .. }) {
        let approved = if script.approve_on_suspend {
            true
        } else {
            poll_mandate_approval(
                command.mandate.as_deref(),
                warden_config.dispatch.approval_wait_ms,
            )?
        };
        if approved {
            shared_mandate
                .set_approval(ApprovalStatus::Approved)
                .map_err(|err| CliError::new(t!("mission.execute.dispatch_failed", error = err)))?;
            outcome = dispatcher
                .run(executed_at)
                .map_err(|err| CliError::new(t!("mission.execute.dispatch_failed", error = err)))?;
        }
    }

    let manifest = dispatcher.into_manifest();
    let store = FsBundleStore::new(&evidence_dir);
    store.save(&manifest).map_err(|err| {
        CliError::new(t!(
            "mission.execute.store_failed",
            bundle_id = manifest.bundle_id,
            error = err
        ))
    })?;

    write_stdout_line(&t!(
        "mission.execute.bundle_saved",
        bundle_id = manifest.bundle_id,
        path = store.bundle_dir(&manifest.bundle_id).display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&t!("mission.execute.outcome", outcome = outcome_label(&outcome)))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    match outcome {
        DispatchOutcome::Completed => Ok(ExitCode::SUCCESS),
        DispatchOutcome::Failed | DispatchOutcome::Aborted => Ok(ExitCode::FAILURE),
        DispatchOutcome::Suspended {
            awaiting_approval,
        } => {
            write_stdout_line(&t!(
                "mission.execute.suspended_tasks",
                tasks = format_task_list(&awaiting_approval)
            ))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::from(2))
        }
    }
}

// ============================================================================
// SECTION: Bundle Commands
// ============================================================================

/// Dispatches bundle subcommands.
fn command_bundle(command: BundleCommand) -> CliResult<ExitCode> {
    match command {
        BundleCommand::Verify(command) => command_bundle_verify(&command),
    }
}

/// Executes the bundle verification command.
fn command_bundle_verify(command: &BundleVerifyCommand) -> CliResult<ExitCode> {
    let warden_config = load_warden_config(command.config.as_deref())?;
    let evidence_dir = command
        .evidence_dir
        .clone()
        .unwrap_or_else(|| warden_config.evidence.root.clone());
    let artifact_root = command
        .artifact_root
        .clone()
        .unwrap_or_else(|| warden_config.evidence.artifact_root.clone());

    let store = FsBundleStore::new(evidence_dir);
    let bundle_id = BundleId::new(command.bundle_id.clone());
    let verifier = BundleVerifier::new();
    let report = verifier.verify_stored(&store, &bundle_id, &artifact_root).map_err(|err| {
        CliError::new(t!("bundle.verify.load_failed", bundle_id = bundle_id, error = err))
    })?;

    let output = render_verification_report(command.format, &report)?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;

    let exit_code = match report.status {
        VerificationStatus::Pass => ExitCode::SUCCESS,
        VerificationStatus::Fail => ExitCode::FAILURE,
    };

    Ok(exit_code)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = WardenConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Scripted Invoker
// ============================================================================

/// Scripted stand-ins for the external collaborators of an offline dispatch.
///
/// # Invariants
///
/// - Unknown fields are rejected so a mistyped script fails closed.
/// - Tasks without an entry succeed with a null output and zero duration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InvocationScript {
    /// Scripted outcome per derived task id.
    #[serde(default)]
    responses: BTreeMap<String, ScriptEntry>,
    /// Whether the scripted approver grants approval once the run suspends.
    #[serde(default)]
    approve_on_suspend: bool,
}

/// One scripted invocation outcome.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptEntry {
    /// Output payload substituted into dependents' inputs.
    #[serde(default)]
    output: Value,
    /// Reported wall-clock duration for the call.
    #[serde(default)]
    duration_ms: u64,
    /// Cost units metered for the call.
    #[serde(default)]
    cost: Option<u64>,
    /// Unit test results the scripted agent reports.
    #[serde(default)]
    tests: Vec<ReportedTest>,
    /// Artifact paths, relative to the artifact root, the scripted agent produced.
    #[serde(default)]
    artifacts: Vec<String>,
    /// Number of leading attempts that fail before the call succeeds.
    #[serde(default)]
    fail_attempts: u32,
    /// Error message reported for failing attempts.
    #[serde(default)]
    error: Option<String>,
}

/// Agent invoker that replays scripted outcomes per task.
#[derive(Debug)]
struct ScriptedInvoker {
    /// Scripted responses keyed by derived task id.
    responses: BTreeMap<String, ScriptEntry>,
    /// Attempt counters per task id, for fail-then-succeed scripts.
    attempts: Mutex<BTreeMap<String, u32>>,
}

impl ScriptedInvoker {
    /// Creates an invoker over the parsed script.
    fn new(script: &InvocationScript) -> Self {
        Self {
            responses: script.responses.clone(),
            attempts: Mutex::new(BTreeMap::new()),
        }
    }
}

impl AgentInvoker for ScriptedInvoker {
    fn invoke(
        &self,
        request: &InvocationRequest,
    ) -> Result<InvocationOutcome, AgentInvocationError> {
        let task_id = request.task_id.to_string();
        let Some(entry) = self.responses.get(&task_id) else {
            return Ok(InvocationOutcome::new(Value::Null, 0));
        };

        let attempt = {
            let mut attempts = self.attempts.lock().map_err(|_| {
                AgentInvocationError::Failed("scripted invoker state poisoned".to_string())
            })?;
            let counter = attempts.entry(task_id).or_insert(0);
            *counter = counter.saturating_add(1);
            *counter
        };
        if attempt <= entry.fail_attempts {
            let message =
                entry.error.clone().unwrap_or_else(|| "scripted failure".to_string());
            return Err(AgentInvocationError::Failed(message));
        }

        let mut outcome = InvocationOutcome::new(entry.output.clone(), entry.duration_ms);
        outcome.cost = entry.cost;
        outcome.tests = entry.tests.clone();
        outcome.artifacts = entry.artifacts.clone();
        Ok(outcome)
    }
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let read_limit = limit.saturating_add(1);
    let mut limited = file.take(read_limit);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a JSON input file with a localized kind label.
fn read_json_input<T: DeserializeOwned>(
    path: &Path,
    kind: &str,
    max_bytes: usize,
) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => CliError::new(t!(
            "mission.read_failed",
            kind = kind,
            path = path.display(),
            error = err
        )),
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!(
            "input.read_too_large",
            kind = kind,
            path = path.display(),
            size = size,
            limit = limit
        )),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(t!("mission.parse_failed", kind = kind, path = path.display(), error = err))
    })
}

/// Reads a mission document JSON file.
fn read_mission_document(path: &Path) -> CliResult<MissionDocument> {
    let kind = t!("mission.kind.document");
    read_json_input(path, &kind, MAX_DOCUMENT_BYTES)
}

/// Reads an optional mandate JSON file.
fn read_mandate(path: Option<&Path>) -> CliResult<Option<Mandate>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let kind = t!("mission.kind.mandate");
    let mandate = read_json_input(path, &kind, MAX_MANDATE_BYTES)?;
    Ok(Some(mandate))
}

/// Loads the warden config with a localized failure message.
fn load_warden_config(path: Option<&Path>) -> CliResult<WardenConfig> {
    WardenConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Builds the identity resolver from the configured alias table.
fn build_resolver(warden_config: &WardenConfig) -> CliResult<IdentityResolver> {
    let table = warden_config
        .identity
        .alias_table()
        .map_err(|err| CliError::new(t!("identity.table_failed", error = err)))?;
    Ok(IdentityResolver::new(table))
}

// ============================================================================
// SECTION: Execution Helpers
// ============================================================================

/// Resolves the dispatch timestamp from an override or the system clock.
fn resolve_executed_at(override_unix_ms: Option<i64>) -> CliResult<Timestamp> {
    if let Some(value) = override_unix_ms {
        if value < 0 {
            return Err(CliError::new(t!("mission.execute.time.negative")));
        }
        return Ok(Timestamp::UnixMillis(value));
    }

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| CliError::new(t!("mission.execute.time.system_failed", error = err)))?;
    let millis = i64::try_from(duration.as_millis())
        .map_err(|_| CliError::new(t!("mission.execute.time.overflow")))?;
    Ok(Timestamp::UnixMillis(millis))
}

/// Resolves the bundle id from an override or the plan identity.
fn resolve_bundle_id(override_id: Option<String>, plan: &ExecutionPlan) -> CliResult<BundleId> {
    if let Some(id) = override_id {
        return Ok(BundleId::new(id));
    }
    let short = short_canonical_hash(DEFAULT_HASH_ALGORITHM, plan, BUNDLE_ID_HASH_LENGTH)
        .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))?;
    Ok(BundleId::new(format!("{}-{short}", plan.mission_id)))
}

/// Polls the mandate file for an approval grant within the configured window.
///
/// Returns `true` once the re-read mandate reports approval. Returns `false`
/// when no mandate path or wait window is configured, when the window
/// elapses, or when the mandate reports rejection (waiting longer cannot
/// reverse a rejection). An unreadable poll counts as not-yet-approved, so a
/// half-written mandate file never grants authority.
fn poll_mandate_approval(path: Option<&Path>, wait_ms: Option<u64>) -> CliResult<bool> {
    let (Some(path), Some(wait_ms)) = (path, wait_ms) else {
        return Ok(false);
    };
    if wait_ms == 0 {
        return Ok(false);
    }
    write_stderr_line(&t!(
        "mission.execute.approval_wait",
        path = path.display(),
        wait_ms = wait_ms
    ))
    .map_err(|err| CliError::new(output_error("stderr", &err)))?;

    let window = Duration::from_millis(wait_ms);
    let start = Instant::now();
    loop {
        match read_mandate(Some(path)) {
            Ok(Some(mandate)) if mandate.approval_status.is_approved() => {
                write_stderr_line(&t!("mission.execute.approval_detected"))
                    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
                return Ok(true);
            }
            Ok(Some(mandate)) if mandate.approval_status.is_rejected() => return Ok(false),
            _ => {}
        }
        let remaining = window.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return Ok(false);
        }
        thread::sleep(remaining.min(APPROVAL_POLL_INTERVAL));
    }
}

/// Writes alias deprecation notices to stderr.
fn report_deprecations(notices: &[DeprecationNotice]) -> CliResult<()> {
    for notice in notices {
        write_stderr_line(&t!(
            "mission.compile.deprecated_alias",
            handle = notice.handle,
            canonical = notice.canonical,
            site = notice.site
        ))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(())
}

/// Formats a dispatch outcome as a localized label.
fn outcome_label(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Completed => t!("mission.execute.outcome.completed"),
        DispatchOutcome::Failed => t!("mission.execute.outcome.failed"),
        DispatchOutcome::Aborted => t!("mission.execute.outcome.aborted"),
        DispatchOutcome::Suspended {
            ..
        } => t!("mission.execute.outcome.suspended"),
    }
}

/// Formats a task id list for display.
fn format_task_list(tasks: &[TaskId]) -> String {
    let ids: Vec<&str> = tasks.iter().map(TaskId::as_str).collect();
    ids.join(", ")
}

// ============================================================================
// SECTION: Report Rendering
// ============================================================================

/// Renders a verification report in the requested format.
fn render_verification_report(
    format: VerifyFormat,
    report: &VerificationReport,
) -> CliResult<String> {
    match format {
        VerifyFormat::Json => {
            let bytes = serde_jcs::to_vec(report)
                .map_err(|err| CliError::new(t!("bundle.verify.failed", error = err)))?;
            String::from_utf8(bytes)
                .map_err(|err| CliError::new(t!("bundle.verify.failed", error = err)))
        }
        VerifyFormat::Markdown => Ok(render_verification_markdown(report)),
    }
}

/// Renders a verification report as a Markdown summary.
fn render_verification_markdown(report: &VerificationReport) -> String {
    let mut output = String::new();
    output.push_str(&t!("bundle.verify.md.header"));
    output.push('\n');
    output.push('\n');
    output.push_str(&t!(
        "bundle.verify.md.status",
        status = format_verification_status(report.status)
    ));
    output.push('\n');
    output.push_str(&t!("bundle.verify.md.checked", count = report.checked_artifacts));
    output.push('\n');
    output.push('\n');
    output.push_str(&t!("bundle.verify.md.errors_header"));
    output.push('\n');

    if report.errors.is_empty() {
        output.push_str(&t!("bundle.verify.md.no_errors"));
        output.push('\n');
        return output;
    }

    for error in &report.errors {
        output.push_str(&t!("bundle.verify.md.error_line", error = error));
        output.push('\n');
    }

    output
}

/// Formats a verification status as a localized label.
fn format_verification_status(status: VerificationStatus) -> String {
    match status {
        VerificationStatus::Pass => t!("bundle.verify.status.pass"),
        VerificationStatus::Fail => t!("bundle.verify.status.fail"),
    }
}

/// Formats a hash digest with its algorithm prefix.
fn format_hash_digest(digest: &HashDigest) -> String {
    let algorithm = match digest.algorithm {
        HashAlgorithm::Sha256 => "sha256",
    };
    format!("{algorithm}:{}", digest.value)
}

// ============================================================================
// SECTION: Locale Helpers
// ============================================================================

/// Resolves the CLI locale from flags and environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

/// Converts CLI language selections into locales.
impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes raw bytes to stdout with a trailing newline.
fn write_stdout_bytes_with_newline(bytes: &[u8]) -> CliResult<()> {
    let mut buffer = bytes.to_vec();
    buffer.push(b'\n');
    write_stdout_bytes(&buffer).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Computes canonical JSON bytes for output rendering.
fn canonical_output_bytes<T: Serialize>(value: &T) -> CliResult<Vec<u8>> {
    serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
