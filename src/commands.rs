use std::path::Path;
use std::process::ExitCode;

use meshaudit::config::{MeshAuditConfig, write_config};
use meshaudit::output::{OutputMode, emit_success, error_envelope, is_quiet};
use meshaudit::snapshot::read_snapshot;
use meshaudit::storage::schema;
use meshaudit::ui::{
    Icons, header, info, repair_table, section, severity_label, stats_table, success,
    summary_row, theme, violation_table, warn,
};
use meshaudit::{AuditOutcome, AuditStatus, Severity, run_audit};
use owo_colors::OwoColorize;

const EXIT_CLEAN: u8 = 0;
const EXIT_INCONSISTENT: u8 = 1;
/// Exit code for a pass that could not complete.
const EXIT_FATAL: u8 = 2;

pub fn run_audit_command(
    model_path: &Path,
    output_mode: OutputMode,
    strict: bool,
    cluster_domain: &str,
) -> anyhow::Result<ExitCode> {
    let subject = model_path.display().to_string();
    let result = read_snapshot(model_path, cluster_domain).and_then(|model| {
        tracing::debug!(resources = model.len(), "Snapshot loaded");
        run_audit(&model)
    });

    let code = audit_exit_code(&result, strict);
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, critical = err.is_critical(), "Audit aborted");
            let status = AuditStatus::from_error(&subject, &err);
            if output_mode.is_human() {
                meshaudit::ui::error(&format!("Audit of {} aborted: {}", subject, err));
                if status.retryable {
                    summary_row("Retryable:", "yes");
                }
            } else {
                let mut envelope = error_envelope("audit", &err.to_string());
                envelope["status"] = serde_json::to_value(&status)?;
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            }
            return Ok(ExitCode::from(code));
        }
    };

    let status = AuditStatus::from_outcome(&outcome);
    if output_mode.is_human() {
        render_outcome(&subject, &outcome, &status);
    } else {
        let data = serde_json::json!({
            "consistent": outcome.is_consistent(),
            "stats": outcome.stats,
            "status": status,
        });
        emit_success(output_mode, "audit", data)?;
    }

    Ok(ExitCode::from(code))
}

/// Error-level findings fail the run; warnings only fail it under `strict`.
fn audit_exit_code(result: &meshaudit::Result<AuditOutcome>, strict: bool) -> u8 {
    match result {
        Err(_) => EXIT_FATAL,
        Ok(outcome) if outcome.report.has_errors() => EXIT_INCONSISTENT,
        Ok(outcome) if strict && !outcome.is_consistent() => EXIT_INCONSISTENT,
        Ok(_) => EXIT_CLEAN,
    }
}

fn render_outcome(subject: &str, outcome: &AuditOutcome, status: &AuditStatus) {
    header(&format!("Mesh audit: {}", subject));
    info("Loaded", &outcome.stats.to_string());

    if !is_quiet() {
        section(&format!(" {} Tables ", Icons::DATABASE));
        println!("{}", stats_table(&outcome.stats));
    }

    if outcome.is_consistent() {
        println!();
        success("Topology is consistent");
        return;
    }

    section(&format!(" {} Violations ", Icons::LINK));
    println!("{}", violation_table(&outcome.report.violations));

    if !outcome.repairs.is_empty() {
        section(&format!(" {} Suggested repairs ", Icons::WRENCH));
        println!("{}", repair_table(&outcome.repairs));
    }

    println!();
    let errors = outcome.report.count_by_severity(Severity::Error);
    let warnings = outcome.report.count_by_severity(Severity::Warning);
    summary_row(&severity_label(Severity::Error), &errors.to_string());
    summary_row(&severity_label(Severity::Warning), &warnings.to_string());
    summary_row(
        "State:",
        &status.consistency_state.as_str().style(theme().info.clone()).to_string(),
    );

    if errors == 0 {
        warn("Topology has warnings only");
    }
}

pub fn run_schema(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        println!("{}", schema::ddl());
    } else {
        let data = serde_json::json!({
            "tables": schema::TABLES,
            "statements": schema::all_schema_statements(),
        });
        emit_success(output_mode, "schema", data)?;
    }
    Ok(())
}

pub fn run_init(path: &Path, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = MeshAuditConfig::starter();
    write_config(path, &config, force)?;

    if output_mode.is_human() {
        success(&format!("Wrote {}", path.display()));
        info("Cluster domain", config.cluster_domain());
    } else {
        let data = serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        header(&format!("meshaudit {}", env!("CARGO_PKG_VERSION").bold()));
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}
