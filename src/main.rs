mod abbrev;
mod commands;
mod config;
mod fetch;
mod git;
mod listing;
mod platform;
mod render;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
    commands::Cli::run()
}
