use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mcpdock_agent::Toolset;
use mcpdock_registry::{ConfigError, DEFAULT_CONFIG_PATH, ServerRegistry};
use serde_json::Value;

use crate::output;

#[derive(Debug, Parser)]
#[command(name = "mcpdock", version, about = "Probe MCP tool servers and call their tools")]
pub struct Cli {
    /// The JSON file listing the tool servers.
    #[arg(short, long, env = "MCPDOCK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// How many servers to probe at the same time.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lists the servers that answered the handshake.
    Servers,
    /// Lists the tools of every usable server.
    Tools,
    /// Calls a tool and prints its text output.
    Call {
        /// Name of the tool.
        tool: String,
        /// Arguments as a JSON object.
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("tool arguments are not valid JSON: {0}")]
    Arguments(#[source] serde_json::Error),
    #[error(transparent)]
    Tool(#[from] mcpdock_agent::Error),
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        config,
        concurrency,
        command,
    } = cli;

    let arguments = match &command {
        Command::Call { arguments, .. } => {
            Some(serde_json::from_str::<Value>(arguments).map_err(CliError::Arguments)?)
        }
        Command::Servers | Command::Tools => None,
    };

    let mut registry =
        ServerRegistry::new(&config)?.with_probe_concurrency(concurrency);
    let spinner = output::spinner("🔌 Probing tool servers...");
    registry.initialize().await;
    spinner.finish_and_clear();

    match command {
        Command::Servers => output::print_servers(&registry),
        Command::Tools => {
            let toolset = Toolset::connect(&registry.get_all_servers()).await;
            output::print_tools(&toolset);
            toolset.close().await;
        }
        Command::Call { tool, .. } => {
            let toolset = Toolset::connect(&registry.get_all_servers()).await;
            let result = toolset
                .call(&tool, arguments.unwrap_or(Value::Null))
                .await;
            toolset.close().await;
            println!("{}", result?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cli = Cli::try_parse_from([
            "mcpdock",
            "--config",
            "servers.json",
            "--concurrency",
            "4",
            "call",
            "get_current_time",
            r#"{"timezone":"UTC"}"#,
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("servers.json"));
        assert_eq!(cli.concurrency, 4);
        assert!(matches!(
            cli.command,
            Command::Call { ref tool, ref arguments }
                if tool == "get_current_time" && arguments == r#"{"timezone":"UTC"}"#
        ));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mcpdock", "tools"]).unwrap();
        assert_eq!(cli.concurrency, 1);
        assert!(matches!(cli.command, Command::Tools));

        let cli = Cli::try_parse_from(["mcpdock", "call", "convert_time"]).unwrap();
        assert!(matches!(cli.command, Command::Call { ref arguments, .. } if arguments == "{}"));
    }

    #[tokio::test]
    async fn test_bad_arguments_fail_before_probing() {
        let cli = Cli::try_parse_from([
            "mcpdock",
            "--config",
            "/nonexistent/servers.json",
            "call",
            "convert_time",
            "{ nope",
        ])
        .unwrap();
        assert!(matches!(run(cli).await, Err(CliError::Arguments(_))));
    }
}
