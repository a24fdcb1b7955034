// ftpsave CLI Handler
//
// 레지스트리 로드 → 레코드 선택 → core Connector 호출

use anyhow::{bail, Context};

use ftpsave_core::state::{ConnectionObserver, ConnectionState};
use ftpsave_core::utils::fmt_size;
use ftpsave_core::{Connector, Registry, ServerConfig};

use crate::commands::{Cli, Command};

struct CliObserver;

impl ConnectionObserver for CliObserver {
    fn on_state_changed(&self, _prev: &ConnectionState, next: &ConnectionState) {
        tracing::debug!("[state] → {:?}", next);
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let registry = Registry::load(&cli.config)?;
    let server = cli.server.as_deref();

    match cli.command {
        Command::List => print_servers(&registry),
        Command::Test => {
            let (config, mut connector) = open(&registry, server)?;
            connector.test_connection().await?;
            println!("OK: {} ({})", config.addr(), config.protocol());
        }
        Command::Upload { local, remote } => {
            let (config, mut connector) = open(&registry, server)?;
            let remote = Command::upload_target(&local, remote.as_deref());
            let content = tokio::fs::read(&local)
                .await
                .with_context(|| format!("reading {}", local.display()))?;
            connector.upload(&remote, &content).await?;
            println!("Uploaded: {} → {} ({})",
                local.display(), config.full_path(&remote), fmt_size(content.len() as u64));
        }
        Command::Download { remote, local } => {
            let (config, mut connector) = open(&registry, server)?;
            let local = Command::download_target(&remote, local.as_deref());
            let content = connector.download(&remote).await?;
            tokio::fs::write(&local, &content)
                .await
                .with_context(|| format!("writing {}", local.display()))?;
            println!("Downloaded: {} → {} ({})",
                config.full_path(&remote), local.display(), fmt_size(content.len() as u64));
        }
    }
    Ok(())
}

fn open<'a>(registry: &'a Registry, name: Option<&str>) -> anyhow::Result<(&'a ServerConfig, Connector)> {
    let (name, config) = select(registry, name)?;
    tracing::debug!("[cli] using server '{}': {:?}", name, config);
    Ok((config, Connector::with_observer(config.clone(), Box::new(CliObserver))))
}

fn select<'a>(registry: &'a Registry, name: Option<&str>) -> anyhow::Result<(String, &'a ServerConfig)> {
    match name {
        Some(name) => Ok((name.to_string(), registry.get(name)?)),
        None => match registry.only() {
            Some((name, config)) => Ok((name.to_string(), config)),
            None if registry.is_empty() => bail!("no servers configured"),
            None => bail!("{} servers configured; pick one with --server", registry.len()),
        },
    }
}

fn print_servers(registry: &Registry) {
    for (name, c) in registry.iter() {
        println!("{:16}  {:4}  {}@{}  {}",
            name,
            c.protocol(),
            c.user.as_deref().unwrap_or("-"),
            c.addr(),
            c.home_path.as_deref().unwrap_or(""),
        );
    }
    println!("Total: {} servers", registry.len());
}
