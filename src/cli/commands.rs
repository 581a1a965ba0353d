use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::checks::spawn_checks;
use crate::config::GatewayConfig;
use crate::format::FormatRegistry;
use crate::pipeline::{build_named, gateway_registrations, PipelineInstance, PipelineRequest, Registrations};
use crate::runtime_config::RuntimeConfig;
use crate::secondary;
use crate::server::{AppService, HttpServer};

/// Command-line interface for the detectors gateway
#[derive(Parser, Debug)]
#[command(name = "detectors", version)]
#[command(about = "Multi-format HTTP gateway for keyed lists", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the primary pipeline over HTTP and run scheduled checks
    Serve {
        /// Gateway configuration file (YAML)
        #[arg(short, long, env = "DETECTORS_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address; overrides `http.addr` from the config
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// Run one GET through the in-process secondary pipeline and print the body
    Invoke {
        /// Gateway configuration file (YAML)
        #[arg(short, long, env = "DETECTORS_CONFIG")]
        config: Option<PathBuf>,

        /// Request path including `/api`, e.g. `/api/redis/connection/local/list/k/length`
        #[arg(short, long)]
        path: String,

        /// Accept header to send
        #[arg(long)]
        accept: Option<String>,
    },
    /// Print the format token table
    Formats,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GatewayConfig> {
    match path {
        Some(path) => GatewayConfig::load(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(GatewayConfig::default())
        }
    }
}

/// Registrations for `config`, with the runtime stack size and worker
/// count applied.
pub fn registrations_for(
    config: &GatewayConfig,
    runtime: &RuntimeConfig,
) -> anyhow::Result<Registrations> {
    let catalog = Arc::new(config.catalog().context("failed to build connection catalog")?);
    Ok(
        gateway_registrations(&catalog, config.formats.default_media_type.as_deref())
            .with_stack_size(runtime.stack_size)
            .with_handler_workers(runtime.handler_workers),
    )
}

/// Build the secondary instance and install it in the process-wide slot.
pub fn install_secondary(registrations: &Registrations) -> anyhow::Result<()> {
    let instance = build_named(registrations, "secondary").context("failed to build secondary pipeline")?;
    secondary::install(instance).context("failed to install secondary pipeline")?;
    Ok(())
}

/// Build the primary instance, then the secondary from the same registrations.
pub fn start_pipelines(registrations: &Registrations) -> anyhow::Result<Arc<PipelineInstance>> {
    let primary = build_named(registrations, "primary").context("failed to build primary pipeline")?;
    install_secondary(registrations)?;
    Ok(Arc::new(primary))
}

/// `token<TAB>media type<TAB>encoder`, one line per token.
#[must_use]
pub fn format_table(registry: &FormatRegistry) -> String {
    let mut out = String::new();
    for d in registry.descriptors() {
        let encoder = registry.encoder_for(&d.media_type).map_or("-", |e| e.name());
        out.push_str(&format!("{}\t{}\t{}\n", d.token, d.media_type, encoder));
    }
    out
}

#[cfg(unix)]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGTERM, SIGINT]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => {
            let config = load_config(config.as_deref())?;
            let runtime = RuntimeConfig::from_env();
            runtime.apply();

            let registrations = registrations_for(&config, &runtime)?;
            let primary = start_pipelines(&registrations)?;
            let checks = spawn_checks(&config.checks).context("failed to schedule checks")?;

            let addr = addr.unwrap_or_else(|| config.http.addr.clone());
            let handle = HttpServer(AppService::new(primary))
                .start(addr.as_str())
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(
                addr = %handle.addr(),
                stack_size = runtime.stack_size,
                handler_workers = runtime.handler_workers,
                checks,
                "Gateway started"
            );
            wait_for_shutdown(handle)
        }
        Commands::Invoke {
            config,
            path,
            accept,
        } => {
            let config = load_config(config.as_deref())?;
            let runtime = RuntimeConfig::from_env();
            runtime.apply();
            install_secondary(&registrations_for(&config, &runtime)?)?;

            let mut request = PipelineRequest::get(path.as_str());
            if let Some(accept) = accept {
                request = request.header("accept", accept);
            }
            let resp = secondary::invoke(request)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&resp.body).context("failed to write response body")?;
            stdout.flush().context("failed to flush stdout")?;
            if !(200..300).contains(&resp.status) {
                bail!("{path} answered {}", resp.status);
            }
            Ok(())
        }
        Commands::Formats => {
            let registry = FormatRegistry::with_defaults();
            print!("{}", format_table(&registry));
            Ok(())
        }
    }
}
