use anyhow::Context;
use clap::Parser;
use colored::*;
use log::warn;
use std::io::Read;
use std::path::Path;
use std::process;

use raft_peer_reaper::cli::{Cli, Commands};
use raft_peer_reaper::error::RuntimeApiError;
use raft_peer_reaper::{DefaultHandler, HandlerConfig, LambdaRuntime, ReaperError};

/// Exit status for errors that need operator intervention
const EXIT_FATAL: i32 = 2;
/// Exit status for reported, redeliverable failures
const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level())).init();

    let result = match cli.command() {
        Commands::Lambda => serve_lambda().await,
        Commands::Invoke { event } => invoke_once(event).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    let fatal = error.chain().any(|cause| {
        cause.downcast_ref::<ReaperError>().map_or(false, ReaperError::is_fatal)
            || matches!(cause.downcast_ref::<RuntimeApiError>(), Some(RuntimeApiError::Fatal { .. }))
    });
    if fatal {
        EXIT_FATAL
    } else {
        EXIT_FAILURE
    }
}

async fn serve_lambda() -> anyhow::Result<()> {
    let runtime = LambdaRuntime::from_env()?;
    let config = match HandlerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let e = ReaperError::from(e);
            if let Err(report) = runtime.report_init_error(&e).await {
                warn!("Could not report init failure to the runtime API: {}", report);
            }
            return Err(e.into());
        }
    };
    let handler = DefaultHandler::from_config(config);
    runtime.run(&handler).await?;
    Ok(())
}

async fn invoke_once(event: &Path) -> anyhow::Result<()> {
    let payload = read_event(event).with_context(|| format!("reading event from {}", event.display()))?;
    let config = HandlerConfig::from_env().map_err(ReaperError::from)?;
    let handler = DefaultHandler::from_config(config);
    handler.invoke(&payload).await?;
    Ok(())
}

fn read_event(path: &Path) -> std::io::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raft_peer_reaper::error::{ClientConstructionError, ValidationError};
    use std::io::Write;

    #[test]
    fn test_exit_codes() {
        let fatal = anyhow::Error::from(ReaperError::from(ClientConstructionError::UnsupportedScheme("ftp".into())));
        assert_eq!(exit_code(&fatal), EXIT_FATAL);

        let reported = anyhow::Error::from(ReaperError::from(ValidationError::EmptyNodeId));
        assert_eq!(exit_code(&reported), EXIT_FAILURE);
    }

    #[test]
    fn test_read_event_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"detail":{{"EC2InstanceId":"i-abc123"}}}}"#).unwrap();
        let payload = read_event(file.path()).unwrap();
        assert!(String::from_utf8(payload).unwrap().contains("i-abc123"));
    }
}
