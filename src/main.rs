use clap::Parser;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use pizza_ratings::cli::{render_table, Args, Command, HELP};
use pizza_ratings::config::Config;
use pizza_ratings::remote::{MemoryStore, RatingStore, RemoteSync};
use pizza_ratings::session::Session;
use pizza_ratings::table::MemoryTable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    if args.offline {
        let store = MemoryStore::new(config.categories());
        run(&args, &config, store).await
    } else {
        let store = RemoteSync::from_config(&config);
        run(&args, &config, store).await
    }
}

async fn run<S: RatingStore>(args: &Args, config: &Config, store: S) -> Result<(), Box<dyn std::error::Error>> {
    let categories = config.categories();
    let view = MemoryTable::with_labels(args.pizzas.iter().cloned(), categories.len());
    let mut session = Session::start_with_config(view, store, config).await;

    for (label, count) in session.with_matrix(|m| m.duplicate_labels()) {
        eprintln!(
            "{} {label:?} is listed {count} times; saved ratings are matched by row order",
            "warning:".yellow()
        );
    }
    println!("{}", session.with_matrix(render_table));
    println!("{}", HELP.dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line, &categories) {
            Ok(Command::Click { row, column }) => match session.click(row, column) {
                Ok(_) => println!("{}", session.with_matrix(render_table)),
                Err(e) => eprintln!("{} {}", "error:".bright_red(), e),
            },
            Ok(Command::Set { row, category, value }) => {
                match session.set_rating(row, category, value) {
                    Ok(_) => println!("{}", session.with_matrix(render_table)),
                    Err(e) => eprintln!("{} {}", "error:".bright_red(), e),
                }
            }
            Ok(Command::Show) => println!("{}", session.with_matrix(render_table)),
            Ok(Command::Save) => match session.save_now().await {
                Some(Ok(status)) => println!("{} (HTTP {status})", "saved".bright_green()),
                Some(Err(e)) => eprintln!("{} {}", "save failed:".bright_red(), e),
                None => println!("{}", "nothing to save".dimmed()),
            },
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Err(msg) => eprintln!("{} {}", "error:".bright_red(), msg),
        }
    }

    if let Some(Err(e)) = session.shutdown().await {
        eprintln!("{} {}", "final save failed:".bright_red(), e);
    }
    Ok(())
}
