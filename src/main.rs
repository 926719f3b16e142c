use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resticron::config::Config;
use resticron::exec::ProcessRunner;
use resticron::notify::{EmailConfig, Notifier, SmtpNotifier};
use resticron::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resticron=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let email = EmailConfig::from_env()
        .context("MAILBOX_ADDRESS must be set; the run cannot report without it")?;

    let runner = ProcessRunner;
    let notifier = SmtpNotifier::new(email);
    let orchestrator = Orchestrator::new(&config, &runner, &notifier);

    if let Err(err) = orchestrator.run().await {
        // The report itself could not be delivered. One last best-effort
        // notification describing exactly that one error; if this also
        // fails, the fault surfaces to the caller (non-zero exit).
        tracing::error!(%err, "Run report delivery failed");
        notifier
            .notify("Backup failed! 1 error", &err.to_string())
            .await
            .with_context(|| format!("report delivery failed ({err}), and so did the fallback notification"))?;
    }

    Ok(())
}
