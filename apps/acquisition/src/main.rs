use anyhow::Context;
use hb_domain::config::NodeConfig;
use hb_domain::constants::BINARY_NAME;
use hb_kernel::config::{load_config, resolve_path};
use hb_logger::{FileSink, Logger, parse_level};
use heartbeat_acquisition::Node;
use tracing::info;

#[hb_runtime::main(memory_efficient)]
async fn main() -> anyhow::Result<()> {
    // Optional first argument: config file path (defaults to ./config.toml).
    let path = resolve_path(std::env::args().nth(1));
    let cfg: NodeConfig = load_config(Some(&path)).context("Critical: Configuration is malformed")?;

    let _log = Logger::builder()
        .name(BINARY_NAME)
        .level(parse_level(&cfg.log.level)?)
        .file(FileSink::new(&cfg.log.dir))
        .init()?;
    info!(path = %path.display(), config = %cfg, "Configuration loaded");

    Node::builder().config(cfg).build()?.run().await
}
