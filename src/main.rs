use clap::Parser;
use enrollment_ledger::adapters::identity::{require_student, StaticIdentity};
use enrollment_ledger::adapters::notify::{TracingNotifier, WebhookNotifier};
use enrollment_ledger::config::Command;
use enrollment_ledger::core::installments::{Cart, CartLine};
use enrollment_ledger::core::report::write_ledger_csv;
use enrollment_ledger::core::{
    AttendanceId, ConfigProvider, EnrollmentId, NewSubstitutionRequest, Notifier, OfferingId,
    PackageId, SessionId, StudentId,
};
use enrollment_ledger::utils::error::ErrorSeverity;
use enrollment_ledger::utils::{logger, validation::Validate};
use enrollment_ledger::{
    CliConfig, HttpBackend, InstallmentPolicy, LedgerApp, LedgerConfig, LedgerError,
};
use std::sync::Arc;
use std::time::Duration;

const NOTIFICATION_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

struct Runtime {
    backend: HttpBackend,
    notifier: Arc<dyn Notifier>,
    identity: StaticIdentity,
    concurrency: usize,
    max_installments: u32,
}

fn build_runtime(cli: &CliConfig) -> Result<Runtime, LedgerError> {
    match &cli.config {
        Some(path) => {
            let file = LedgerConfig::from_file(path)?;
            file.validate()?;
            let backend = HttpBackend::new(&file)?;
            let notifier: Arc<dyn Notifier> = match file.webhook_url() {
                Some(url) => Arc::new(WebhookNotifier::new(reqwest::Client::new(), url)),
                None => Arc::new(TracingNotifier),
            };
            let student = cli.student_id.or(file.student_id()).map(StudentId);
            Ok(Runtime {
                backend,
                notifier,
                identity: StaticIdentity::new(student),
                concurrency: file.concurrent_requests(),
                max_installments: file.ledger.max_installments,
            })
        }
        None => Ok(Runtime {
            backend: HttpBackend::new(cli)?,
            notifier: Arc::new(TracingNotifier),
            identity: StaticIdentity::new(cli.student_id.map(StudentId)),
            concurrency: cli.concurrent_requests(),
            max_installments: cli.max_installments,
        }),
    }
}

async fn run(cli: CliConfig) -> Result<(), LedgerError> {
    let runtime = build_runtime(&cli)?;
    let app = LedgerApp::new(
        Arc::new(runtime.backend),
        runtime.notifier,
        runtime.concurrency,
    );

    match cli.command {
        Command::Attendance { enrollment, csv } => {
            let ledger = app
                .ledger()
                .ledger_for_enrollment(EnrollmentId(enrollment))
                .await?;
            if csv {
                write_ledger_csv(&ledger, std::io::stdout())?;
            } else {
                for entry in &ledger.entries {
                    println!(
                        "#{:<6} {:<40} {}",
                        entry.attendance.id,
                        entry.session_label(),
                        entry.display_status().label()
                    );
                }
                let summary = ledger.summary;
                println!(
                    "total {} | attended {} | absent {} | pending {}",
                    summary.total, summary.attended, summary.absent, summary.pending
                );
            }
        }
        Command::Eligible { enrollment } => {
            let eligible = app
                .workflow()
                .list_eligible_attendances(EnrollmentId(enrollment))
                .await?;
            for attendance in eligible {
                println!(
                    "#{:<6} {} {}",
                    attendance.id,
                    attendance.session_date,
                    attendance.state().label()
                );
            }
        }
        Command::Candidates {
            enrollment,
            attendance,
            date,
        } => {
            let candidates = app
                .workflow()
                .candidate_replacements(EnrollmentId(enrollment), AttendanceId(attendance), date)
                .await?;
            for candidate in candidates {
                let session = &candidate.session;
                let availability = if candidate.is_selectable() {
                    format!("{} seats left", session.seats_left())
                } else {
                    candidate
                        .disabled
                        .iter()
                        .map(|reason| reason.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!(
                    "session {:<6} {}-{}  {}",
                    session.id,
                    session.start_time.format("%H:%M"),
                    session.end_time.format("%H:%M"),
                    availability
                );
            }
        }
        Command::Request {
            enrollment,
            attendance,
            session,
            reason,
        } => {
            let student_id = require_student(&runtime.identity)?;
            let created = app
                .workflow()
                .create_request(NewSubstitutionRequest {
                    student_id,
                    enrollment_id: EnrollmentId(enrollment),
                    original_attendance_id: AttendanceId(attendance),
                    replacement_session_id: SessionId(session),
                    reason,
                })
                .await?;
            println!(
                "✅ Request {} submitted ({})",
                created.id,
                created.status.label()
            );
        }
        Command::Requests => {
            let student_id = require_student(&runtime.identity)?;
            for view in app.workflow().list_requests(student_id).await? {
                println!(
                    "#{:<6} {:<9} {} -> {}",
                    view.request.id,
                    view.request.status.label(),
                    view.original,
                    view.replacement
                );
            }
        }
        Command::Mark {
            enrollment,
            present,
            absent,
        } => {
            let mut committer = app.committer();
            committer.load(EnrollmentId(enrollment)).await?;
            for id in present {
                committer.set(AttendanceId(id), true)?;
            }
            for id in absent {
                committer.set(AttendanceId(id), false)?;
            }
            let report = committer.commit().await;
            println!(
                "Committed {} change(s), {} failed",
                report.succeeded(),
                report.failed()
            );
            for outcome in report.outcomes.iter().filter(|o| o.result.is_err()) {
                if let Err(e) = &outcome.result {
                    eprintln!("❌ attendance {}: {}", outcome.attendance_id, e);
                }
            }
            report.ensure_complete()?;
        }
        Command::Installments {
            total,
            count,
            sessions,
        } => {
            let cart = Cart::new(vec![CartLine {
                package_id: PackageId(0),
                offering_id: OfferingId(0),
                sessions_selected: sessions,
                unit_price: total,
                discount: 0.0,
            }]);
            let plan = InstallmentPolicy::new(runtime.max_installments).plan(&cart, count)?;
            for installment in &plan.installments {
                println!("{}: {}", installment.number, installment.amount);
            }
            println!("total: {}", plan.total);
        }
    }

    app.workflow()
        .flush_notifications(NOTIFICATION_FLUSH_TIMEOUT)
        .await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}
