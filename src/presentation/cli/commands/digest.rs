use crate::application::services::digest::{DigestOutcome, DigestScheduler};

/// Fire the digest once and report what happened.
///
/// # Errors
///
/// Returns an error if the alert or subscription store fails.
pub async fn run_digest(scheduler: &DigestScheduler) -> anyhow::Result<DigestOutcome> {
    let outcome = scheduler.fire().await?;
    match outcome {
        DigestOutcome::Skipped => println!("Another digest is already running."),
        DigestOutcome::Empty => println!("No unsent alerts in the window."),
        DigestOutcome::NoSubscribers { alerts } => {
            println!("{alerts} alert(s) pending, but nobody is subscribed.");
        }
        DigestOutcome::Delivered {
            alerts,
            recipients_ok,
            recipients_failed,
        } => println!(
            "{alerts} alert(s) mailed to {recipients_ok} recipient(s), {recipients_failed} failed."
        ),
    }
    Ok(outcome)
}
