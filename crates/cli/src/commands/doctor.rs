use serde::Serialize;
use toolshare_core::config::{AppConfig, LoadOptions};
use toolshare_db::{connect_with_settings, migrations, ReferenceSeedDataset};

use crate::commands::{build_runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DATABASE_CHECKS: [&str; 3] = ["database_connectivity", "schema_migrations", "reference_data"];

/// Exit code is 0 only when every check passes.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            let details = error.to_string();
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, details));
            checks.extend(skipped(&DATABASE_CHECKS, "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(names: &[&'static str], reason: &str) -> Vec<DoctorCheck> {
    names
        .iter()
        .map(|name| {
            DoctorCheck::new(*name, CheckStatus::Skipped, format!("skipped because {reason}"))
        })
        .collect()
}

/// Connectivity, then schema, then seeded reference data. A failed step skips the rest.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            let mut checks = vec![DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            )];
            checks.extend(skipped(&DATABASE_CHECKS[1..], "the runtime did not start"));
            return checks;
        }
    };

    runtime.block_on(async {
        let mut checks = Vec::new();

        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                checks.push(DoctorCheck::new(
                    "database_connectivity",
                    CheckStatus::Fail,
                    format!("failed to connect to database: {error}"),
                ));
                checks.extend(skipped(&DATABASE_CHECKS[1..], "the database is unreachable"));
                return checks;
            }
        };
        checks.push(DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`", config.database.url),
        ));

        if let Err(error) = migrations::run_pending(&pool).await {
            let details = error.to_string();
            checks.push(DoctorCheck::new("schema_migrations", CheckStatus::Fail, details));
            checks.extend(skipped(&DATABASE_CHECKS[2..], "the schema is not current"));
            pool.close().await;
            return checks;
        }
        checks.push(DoctorCheck::new("schema_migrations", CheckStatus::Pass, "schema is current"));

        checks.push(match ReferenceSeedDataset::verify(&pool).await {
            Ok(verification) if verification.all_present => DoctorCheck::new(
                "reference_data",
                CheckStatus::Pass,
                format!("{} reference checks present", verification.checks.len()),
            ),
            Ok(verification) => {
                let missing = verification
                    .checks
                    .iter()
                    .filter_map(|(check, present)| (!present).then_some(*check))
                    .collect::<Vec<_>>();
                DoctorCheck::new(
                    "reference_data",
                    CheckStatus::Fail,
                    format!("missing or edited: {} (run `toolshare seed`)", missing.join(", ")),
                )
            }
            Err(error) => DoctorCheck::new("reference_data", CheckStatus::Fail, error.to_string()),
        });

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
