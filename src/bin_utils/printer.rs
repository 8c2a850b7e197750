use std::io::Write;

use crate::{
    notify::{Level, Notification},
    orchestrator::LookupDisplay,
};

pub fn print_notifications<W>(output: &mut W, notifications: &[Notification]) -> anyhow::Result<()>
where
    W: Write,
{
    for notification in notifications {
        let level = match notification.level {
            Level::Info => "info",
            Level::Success => "success",
            Level::Error => "error",
        };
        let written = match &notification.description {
            Some(description) => writeln!(output, "[{level}] {}: {description}", notification.title),
            None => writeln!(output, "[{level}] {}", notification.title),
        };
        if let Err(err) = written {
            anyhow::bail!("Failed to write notification: {err}")
        }
    }
    if let Err(err) = output.flush() {
        anyhow::bail!("Failed to flush output: {err}")
    }
    Ok(())
}

pub fn print_lookup<W>(output: &mut W, display: &LookupDisplay) -> anyhow::Result<()>
where
    W: Write,
{
    let status = match display {
        LookupDisplay::Found(_) => "found",
        LookupDisplay::NotFound(_) => "not found",
        LookupDisplay::Unavailable(_) => "unavailable",
        LookupDisplay::Invalid(_) => "invalid",
    };
    if let Err(err) = writeln!(output, "[{status}] {}", display.message()) {
        anyhow::bail!("Failed to write lookup result: {err}")
    }
    Ok(())
}

pub fn print_line<W>(output: &mut W, line: &str) -> anyhow::Result<()>
where
    W: Write,
{
    if let Err(err) = writeln!(output, "{line}") {
        anyhow::bail!("Failed to write output: {err}")
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_notification() {
        let mut output = Vec::new();
        print_notifications(
            &mut output,
            &[
                Notification {
                    level: Level::Info,
                    title: "Processing transaction...".to_owned(),
                    description: None,
                },
                Notification {
                    level: Level::Error,
                    title: "Transaction Failed".to_owned(),
                    description: Some("Insufficient balance".to_owned()),
                },
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "[info] Processing transaction...\n[error] Transaction Failed: Insufficient balance\n"
        );
    }

    #[test]
    fn renders_lookup_status() {
        let mut output = Vec::new();
        print_lookup(
            &mut output,
            &LookupDisplay::NotFound("User not found".to_owned()),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "[not found] User not found\n"
        );
    }
}
