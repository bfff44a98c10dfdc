//! bravia CLI — drive a networked TV's remote-control interfaces.

use anyhow::{bail, Context};
use bravia_session::{setup, Config, DeviceSession, MethodTable};
use bravia_types::{Namespace, DEFAULT_VERSION};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(
    name = "bravia",
    about = "Discover and control Bravia TVs on the local network",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Device host, overriding the config file.
    #[arg(long, env = "BRAVIA_HOST", global = true)]
    host: Option<String>,

    /// Device port, overriding the config file.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Pre-shared key, overriding the config file.
    #[arg(long, env = "BRAVIA_PSK", global = true)]
    psk: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the local network and print each device found as JSON.
    Discover {
        /// How long to collect answers, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Send IRCC codes, by name or raw value, in order.
    Send {
        #[arg(required = true)]
        codes: Vec<String>,
    },

    /// List the device's IRCC code table.
    Codes,

    /// Invoke a JSON-RPC method and print the reply.
    #[command(disable_version_flag = true)]
    Invoke {
        namespace: Namespace,
        method: String,
        #[arg(long, default_value = DEFAULT_VERSION)]
        version: String,
        /// Single parameter object, as JSON.
        #[arg(long)]
        params: Option<String>,
    },

    /// List protocol versions supported by a namespace.
    Versions { namespace: Namespace },

    /// List methods supported by a namespace, per version.
    #[command(disable_version_flag = true)]
    Methods {
        namespace: Namespace,
        #[arg(long)]
        version: Option<String>,
    },
}

impl Cli {
    /// File config with command-line overrides applied.
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = setup::load_config(self.config.as_deref())?;
        if let Some(host) = &self.host {
            config.device.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.device.port = port;
        }
        if let Some(psk) = &self.psk {
            config.device.psk.clone_from(psk);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    if let Commands::Discover { timeout_ms } = cli.command {
        let mut discovery = config.discovery;
        if let Some(ms) = timeout_ms {
            discovery.timeout_ms = ms;
        }
        tracing::info!(timeout_ms = discovery.timeout_ms, "discovering devices");
        for device in DeviceSession::discover(discovery.timeout()).await? {
            println!("{}", serde_json::to_string(&device)?);
        }
        return Ok(());
    }

    if config.device.host.is_empty() {
        bail!("no device host configured; pass --host or set [device] host in the config file");
    }
    let session = DeviceSession::new(config.device);

    match cli.command {
        Commands::Discover { .. } => {}
        Commands::Send { codes } => {
            tracing::info!(count = codes.len(), "sending IRCC codes");
            session.send(codes).await?;
        }
        Commands::Codes => {
            for code in session.codes().await? {
                println!("{}\t{}", code.name, code.value);
            }
        }
        Commands::Invoke {
            namespace,
            method,
            version,
            params,
        } => {
            let params = params
                .map(|p| serde_json::from_str::<Value>(&p))
                .transpose()
                .context("--params is not valid JSON")?;
            let reply = session
                .namespace(namespace)
                .invoke(&method, &version, params)
                .await?;
            println!("{}", serde_json::to_string_pretty(&reply.unwrap_or(Value::Null))?);
        }
        Commands::Versions { namespace } => {
            for version in session.namespace(namespace).get_versions().await? {
                println!("{version}");
            }
        }
        Commands::Methods { namespace, version } => {
            let table = session
                .namespace(namespace)
                .get_method_types(version.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&table_json(&table))?);
        }
    }

    Ok(())
}

fn table_json(table: &MethodTable) -> Value {
    let mut out = serde_json::Map::new();
    for entry in table.iter() {
        let methods: Vec<Value> = entry
            .methods
            .iter()
            .map(|m| {
                json!({
                    "name": m.name,
                    "params": m.params,
                    "results": m.results,
                    "version": m.version,
                })
            })
            .collect();
        out.insert(entry.version.clone(), Value::Array(methods));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_takes_many_codes() {
        let cli = Cli::try_parse_from(["bravia", "--host", "10.0.0.5", "send", "Hdmi1", "Confirm"])
            .unwrap();
        assert_eq!(cli.host.as_deref(), Some("10.0.0.5"));
        match cli.command {
            Commands::Send { codes } => assert_eq!(codes, vec!["Hdmi1", "Confirm"]),
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn send_requires_a_code() {
        assert!(Cli::try_parse_from(["bravia", "send"]).is_err());
    }

    #[test]
    fn namespace_arguments_parse() {
        let cli = Cli::try_parse_from(["bravia", "methods", "avContent", "--version", "1.1"])
            .unwrap();
        match cli.command {
            Commands::Methods { namespace, version } => {
                assert_eq!(namespace, Namespace::AvContent);
                assert_eq!(version.as_deref(), Some("1.1"));
            }
            _ => panic!("expected methods"),
        }
        assert!(Cli::try_parse_from(["bravia", "versions", "nonsense"]).is_err());
    }

    #[test]
    fn invoke_defaults_version() {
        let cli = Cli::try_parse_from(["bravia", "invoke", "system", "getPowerStatus"]).unwrap();
        match cli.command {
            Commands::Invoke { version, params, .. } => {
                assert_eq!(version, "1.0");
                assert!(params.is_none());
            }
            _ => panic!("expected invoke"),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::try_parse_from([
            "bravia",
            "--config",
            "/nonexistent/bravia-config.toml",
            "--host",
            "10.0.0.9",
            "--port",
            "8080",
            "--psk",
            "4242",
            "codes",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.device.host, "10.0.0.9");
        assert_eq!(config.device.port, 8080);
        assert_eq!(config.device.psk, "4242");
    }
}
