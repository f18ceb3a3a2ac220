mod commands;

use std::path::PathBuf;

use clap::Parser;

/// Build metadata, injected by the release pipeline at compile time.
const BUILD_TAG: Option<&str> = option_env!("RUNWAY_BUILD_TAG");
const BUILD_HASH: &str = match option_env!("RUNWAY_BUILD_HASH") {
    Some(hash) => hash,
    None => "",
};
const BUILD_DATE: &str = match option_env!("RUNWAY_BUILD_DATE") {
    Some(date) => date,
    None => "",
};

#[derive(Parser)]
#[command(
    name = "runway",
    about = "Deploy container images to Cloud Run from a CI pipeline"
)]
#[command(version, args_override_self = true)]
#[command(after_help = "Settings are read from PLUGIN_* environment variables \
    (PLUGIN_ACTION, PLUGIN_SERVICE, PLUGIN_IMAGE, PLUGIN_TOKEN, ...).")]
struct Cli {
    /// Show version and exit
    #[arg(short = 'v')]
    show_version: bool,

    /// Log every gcloud command without running it
    #[arg(long)]
    dry_run: bool,

    /// Load additional settings from a dotenv file
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// gcloud executable to invoke
    #[arg(long, default_value = runway_cloud::DEFAULT_PROGRAM)]
    program: String,

    /// Directory for the temporary credential file (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    key_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let tag = BUILD_TAG.unwrap_or("[not-tagged]");
    tracing::info!(
        version = tag,
        hash = BUILD_HASH,
        date = BUILD_DATE,
        "runway cloud run plugin"
    );

    let cli = Cli::parse();

    if cli.show_version {
        println!("runway {} ({tag})", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    commands::deploy(commands::DeployOptions {
        dry_run: cli.dry_run,
        env_file: cli.env_file,
        program: cli.program,
        key_dir: cli.key_dir,
    })
    .await
}
