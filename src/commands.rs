use crate::config::{self, Config};
use crate::listing::{Lister, Noun};
use crate::platform::PlatformClient;
use crate::render::Format;
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hk - a fast client for the platform API"
)]
#[command(
    long_about = "A command-line client for listing apps, releases, dynos and add-ons \
    of a platform-as-a-service account."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// List apps, addons, dynos, and releases
    #[command(
        about = "List apps, addons, dynos, and releases",
        long_about = "List apps, or with a leading noun (any prefix of 'releases', \
        'addons' or 'dynos') the releases, add-ons or dynos of one app. \
        Remaining arguments restrict the listing to those names.\n\n\
        Long listings show, for apps: owner, slug size, last release time and name; \
        for releases: git ref, author, time, name and description; for add-ons: \
        type, owner, resource name and config var; for dynos: name, state, age \
        and command.",
        after_help = "Examples:\n  hk ls\n  hk ls -l -f\n  hk ls -a myapp dynos\n  \
        hk ls -l -a myapp rel v3\n  hk ls -l -a myapp addons REDIS_URL"
    )]
    Ls {
        /// Long listing
        #[arg(short = 'l', long = "long", help = "Show one detailed row per item")]
        long: bool,
        /// Follow attachments
        #[arg(
            short = 'f',
            long = "follow",
            help = "After each app, list the add-ons attached to it"
        )]
        follow: bool,
        /// App name
        #[arg(
            short = 'a',
            long = "app",
            value_name = "APP",
            help = "App to list releases, add-ons or dynos of (defaults to $HKAPP or the heroku git remote)"
        )]
        app: Option<String>,
        /// Optional noun followed by names to list
        #[arg(help = "[releases|addons|dynos] followed by names, or app names")]
        args: Vec<String>,
    },
    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Self::parse();

        match cli.command {
            Commands::Ls {
                long,
                follow,
                app,
                args,
            } => {
                let config = Config::load()?;
                let client = PlatformClient::from_config(&config);

                let (noun, _) = Noun::parse(&args);
                let app = if noun.needs_app() {
                    Some(config::resolve_app(app.as_deref())?)
                } else {
                    app
                };

                let lister = Lister::new(&client, Format::new(long, follow), app);
                lister.run(&args, io::stdout().lock())?;
            }
            Commands::Completion { shell } => {
                let mut cmd = Self::command();
                let bin_name = cmd.get_name().to_string();
                generate(shell, &mut cmd, bin_name, &mut io::stdout());
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn parse_from(args: &[&str]) -> Self {
        Self::try_parse_from(args).unwrap()
    }
}
