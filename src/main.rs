use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use revq::cli::{Cli, CliCommand};
use revq::config::Config;
use revq::error::Result;
use revq::reconcile::reconcile;
use revq::report;
use revq::sources::azure::AzureSource;
use revq::sources::github::GitHubSource;
use revq::sources::{AnySource, CommentSource};
use revq::store::StatusStore;
use revq::{token, update};

fn init_logging(debug: bool) {
    let default = if debug { "revq=debug" } else { "revq=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli)?;
    let store = StatusStore::new(&config.working_dir);

    match &cli.command {
        CliCommand::Review {
            pr_number,
            json,
            all,
            output,
        } => {
            let source = build_source(&config)?;
            info!(pr = pr_number, platform = source.platform().key, "fetching review threads");
            let pr = source.fetch_pr(*pr_number)?;
            let threads = source.fetch_threads(*pr_number)?;
            let status_file = store.load(*pr_number)?;
            let view = reconcile(&threads, &status_file, source.platform());

            let rendered = if *json {
                report::render_json(&view)?
            } else {
                report::render_markdown(&pr, &view, *all)
            };
            match output {
                Some(path) => {
                    std::fs::write(path, &rendered)?;
                    eprintln!("report written to {path}");
                }
                None => print!("{rendered}"),
            }
        }

        CliCommand::Status {
            pr_number,
            thread_id,
            status,
            note,
            clear,
        } => {
            let outcome = update::apply(
                &store,
                config.platform,
                *pr_number,
                thread_id,
                status.as_deref(),
                note.as_deref(),
                *clear,
            )?;
            println!("{}", outcome.describe());
        }

        CliCommand::Files { pr_number, json } => {
            let source = build_source(&config)?;
            let files = source.fetch_changed_files(*pr_number)?;
            if *json {
                println!("{}", report::render_files_json(&files)?);
            } else {
                print!("{}", report::render_files_table(&files));
            }
        }

        CliCommand::Check => {
            let source = build_source(&config)?;
            println!("{}", source.check_connection()?);
        }

        CliCommand::Token => {
            let credential = token::resolve(
                config.platform,
                config.flag_token.as_deref(),
                config.config_token(),
            )?;
            println!("source: {}", credential.describe_source(config.platform));
            println!("token:  {}", token::mask(&credential.token));
        }
    }
    Ok(())
}

fn build_source(config: &Config) -> Result<AnySource> {
    let credential = token::resolve(
        config.platform,
        config.flag_token.as_deref(),
        config.config_token(),
    )?;
    Ok(if config.platform.key == "github" {
        AnySource::GitHub(GitHubSource::new(config.github()?, &credential.token))
    } else {
        AnySource::Azure(AzureSource::new(config.azure()?, &credential.token))
    })
}
