use clap::Parser;
use simplelog::{ConfigBuilder, WriteLogger};
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

use surf::browser::{HttpClient, TokioTimers};
use surf::core::config::{self, CliOverrides, ResolvedConfig};
use surf::core::{NavEvent, Topic};
use surf::demo::commands::{self, make_link};
use surf::demo::{Command, ParseError, build_page};

#[derive(Parser)]
#[command(name = "surf", about = "Single-page navigation controller demo")]
struct Args {
    /// Config file to use instead of ~/.surf/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix of app-managed URLs
    #[arg(short, long)]
    base_path: Option<String>,

    /// error, warn, info, debug or trace
    #[arg(short, long)]
    log_level: Option<String>,

    /// Path to open on start
    path: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = config::load_config(args.config.as_deref())?;
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            base_path: args.base_path,
            log_level: args.log_level,
        },
    )?;

    // Initialize file logger; stdout belongs to the prompt
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }

    log::info!("surf starting up with base path {}", resolved.base_path);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    LocalSet::new().block_on(&runtime, run(resolved, args.path))
}

async fn run(config: ResolvedConfig, start: Option<String>) -> Result<(), Box<dyn Error>> {
    let page = build_page(&config, Rc::new(TokioTimers), HttpClient::new())?;

    page.app.subscribe(Topic::Start, |event| {
        println!("START {}", event.path());
    });
    page.app.subscribe(Topic::End, |event| {
        if let NavEvent::End { path, error, .. } = event {
            match error {
                Some(err) => println!("END   {} failed: {}", path, err),
                None => println!("END   {}", path),
            }
        }
    });

    page.app.init(start.as_deref());
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        // Navigations run in the background; their events print as they land
        match command {
            Command::Go(path) => {
                page.app.navigate(&path, false);
            }
            Command::Click(href) => {
                let link = make_link(&page, &href);
                if page.document.click(&link) {
                    println!("(not handled by the app, the browser would load {})", href);
                }
                link.remove();
            }
            Command::Back => {
                if !page.history.back() {
                    println!("(already at the oldest entry)");
                }
            }
            Command::Forward => {
                if !page.history.forward() {
                    println!("(already at the newest entry)");
                }
            }
            Command::Show => print!("{}", commands::describe_page(&page)),
            Command::History => println!("{}", commands::describe_history(&page.history)),
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => break,
        }
    }

    log::info!("surf shutting down");
    page.app.dispose();
    Ok(())
}
