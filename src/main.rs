/*!
 * avc-audit - Main Entry Point
 *
 * Audits which statically granted SELinux permissions a running workload
 * actually exercises, so policies can be trimmed to least privilege.
 */

use anyhow::Context;
use avc_audit::core::limits::{DEFAULT_DEBUG_LOG_PATH, EVENT_CHANNEL_CAPACITY};
use avc_audit::{init_tracing, AuditError, AuditSession, DebugLog, StopToken};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

/// Runtime SELinux permission-usage auditor.
///
/// Attaches kernel instrumentation to the access-decision path and the
/// per-operation security checkpoints, then reconciles everything observed
/// against the rules `sesearch` reports for the audited type.
#[derive(Parser, Debug)]
#[command(name = "avc-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monitor a subject type and report which granted permissions it used
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Subject security type to audit (e.g. httpd_t)
    subject: String,

    /// Instrumentation object to load (or set AVC_AUDIT_BPF_OBJECT)
    #[arg(long, env = "AVC_AUDIT_BPF_OBJECT")]
    bpf_object: Option<PathBuf>,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Debug log location
    #[arg(long, default_value = DEFAULT_DEBUG_LOG_PATH)]
    debug_log: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => analyze(args).await,
    }
}

#[cfg(target_os = "linux")]
async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    use avc_audit::probe::{pids_for_context, LinuxAvcSource, ProbeConfig};

    if !nix::unistd::geteuid().is_root() {
        return Err(AuditError::PrivilegeRequired {
            reason: "attaching kernel probes requires root".into(),
        }
        .into());
    }

    let debug_log = DebugLog::at(&args.debug_log);
    debug_log.record(
        "session start",
        serde_json::json!({ "subject": &args.subject }),
    );

    info!(subject = %args.subject, "building policy snapshot");
    let snapshot =
        avc_audit::extract_rules(&args.subject).context("could not query the active policy")?;
    if snapshot.is_empty() {
        warn!(
            subject = %args.subject,
            "no allow rules found for this type; every observation will report as not granted"
        );
    }
    for rule in snapshot.rules() {
        debug_log.record(
            "policy rule",
            serde_json::json!({
                "rule": rule.key.to_string(),
                "permissions": &rule.permissions,
            }),
        );
    }

    let initial_pids = pids_for_context(&args.subject);
    if initial_pids.is_empty() {
        info!("no process currently running under this context; waiting for one to start");
    } else {
        info!(pids = ?initial_pids, "filtering for target processes");
    }

    let (sender, receiver) = flume::bounded(EVENT_CHANNEL_CAPACITY);
    let source = LinuxAvcSource::new(ProbeConfig::resolve(args.bpf_object), sender);

    let stop = StopToken::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            match interrupt.interrupt() {
                1 => info!("interrupt received, stopping after drain (press Ctrl-C again to force)"),
                _ => warn!("second interrupt, forcing report generation"),
            }
        }
    });

    info!("monitoring active; run the workload now, press Ctrl-C to generate the report");
    let session = AuditSession::new(snapshot, source, receiver, stop, debug_log);
    let report = session.run(initial_pids).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn analyze(_args: AnalyzeArgs) -> anyhow::Result<()> {
    Err(AuditError::UnsupportedPlatform {
        platform: std::env::consts::OS,
    }
    .into())
}
