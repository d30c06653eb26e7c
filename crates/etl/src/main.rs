fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();
}


fn main() -> anyhow::Result<()> {
    let args = <betl_etl::cli::Cli as clap::Parser>::parse();

    init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(betl_etl::commands::run(&args))?;
    Ok(())
}
