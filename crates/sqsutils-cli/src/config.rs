use anyhow::Context;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_sqs::config::Credentials;
use std::future::Future;

const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

/// Loads AWS configuration from the environment. `--local` swaps in static
/// test credentials and defaults the endpoint to LocalStack.
pub async fn aws_config(local: bool, endpoint: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(
        // supports loading region from known env variables
        RegionProviderChain::default_provider().or_else(aws_config::Region::from_static("us-east-1")),
    );

    if local {
        loader = loader
            .credentials_provider(Credentials::new("test", "test", None, None, "static"))
            .endpoint_url(endpoint.unwrap_or(LOCALSTACK_ENDPOINT));
    } else if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

/// The command's own queue argument wins; a global `--queue` may only repeat it.
pub fn pick_queue<'a>(positional: &'a str, global: Option<&str>) -> anyhow::Result<&'a str> {
    match global {
        Some(global) if global != positional => anyhow::bail!(
            "conflicting queues: --queue {} does not match {}",
            global,
            positional
        ),
        _ => Ok(positional),
    }
}

/// Installs the Ctrl-C handler now and returns a future that resolves on the
/// first interrupt. Must be called inside the runtime.
#[cfg(unix)]
pub fn interrupted() -> anyhow::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupts =
        signal(SignalKind::interrupt()).context("unable to listen for interrupts")?;
    Ok(async move {
        interrupts.recv().await;
        log::info!("interrupt received");
    })
}

#[cfg(windows)]
pub fn interrupted() -> anyhow::Result<impl Future<Output = ()>> {
    let mut interrupts =
        tokio::signal::windows::ctrl_c().context("unable to listen for interrupts")?;
    Ok(async move {
        interrupts.recv().await;
        log::info!("interrupt received");
    })
}
