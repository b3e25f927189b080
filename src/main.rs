//! Line-oriented terminal client.
//!
//! Reads commands from stdin, forwards them to the feed runtime and prints the
//! feed whenever the runtime publishes a new view.
//!
//! ```text
//! search <words>          keyword search (debounced; empty clears)
//! sort <createdAt|votes> <asc|desc>
//! refresh                 re-run the current query now
//! post <text>             publish a post
//! edit <n> <text>         replace the text of post n
//! delete <n>              delete post n
//! vote <n>                toggle your vote on post n
//! list                    print the feed
//! help | quit
//! ```
//!
//! Post numbers refer to the last printed feed.

use clap::Parser;
use feedsync::domain::{FeedQuery, PostId, SortKey, SortOrder};
use feedsync::infrastructure::paths;
use feedsync::ui::{render, FeedViewModel};
use feedsync::{observability, Config, FeedError};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  search <words>                     keyword search (empty clears)
  sort <createdAt|votes> <asc|desc>  change ordering
  refresh                            re-run the current query
  post <text>                        publish a post
  edit <n> <text>                    replace the text of post n
  delete <n>                         delete post n
  vote <n>                           toggle your vote on post n
  list                               print the feed
  help                               show this help
  quit                               exit";

#[derive(Debug, Parser)]
#[command(name = "feedsync", version, about = "Terminal client for the post feed")]
struct Cli {
    /// TOML configuration file. Defaults to the platform config directory,
    /// then `FEEDSYNC_*` environment variables.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `base_url`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `session_cookie`.
    #[arg(long)]
    cookie: Option<String>,

    /// Overrides `trace_level`.
    #[arg(long)]
    trace_level: Option<String>,

    /// Export spans to the default trace file.
    #[arg(long)]
    trace: bool,

    /// Disable ANSI highlighting.
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Search(String),
    Sort(SortKey, SortOrder),
    Refresh,
    Post(String),
    Edit(usize, String),
    Delete(usize),
    Vote(usize),
    List,
    Help,
    Quit,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("feedsync: {e}");
            return ExitCode::FAILURE;
        }
    };
    observability::init_tracing(&config);

    match run(&config, !cli.no_color).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("feedsync: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> feedsync::Result<Config> {
    let mut config = match (&cli.config, paths::default_config_file()) {
        (Some(path), _) => Config::from_file(path)?,
        (None, Some(path)) if path.exists() => Config::from_file(path)?,
        _ => Config::from_env(),
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(cookie) = &cli.cookie {
        config.session_cookie = Some(cookie.clone());
    }
    if let Some(level) = &cli.trace_level {
        config.trace_level = Some(level.clone());
    }
    if cli.trace && config.trace_file.is_none() {
        config.trace_file = Some(paths::default_trace_file().display().to_string());
    }

    config.validate()?;
    Ok(config)
}

async fn run(config: &Config, color: bool) -> feedsync::Result<()> {
    let (user, mut handle, task) = feedsync::connect(config).await?;
    println!("signed in as {} <{}>. type `help` for commands.", user.username, user.email);

    let mut view = handle.subscribe();
    let mut last = view.borrow_and_update().clone();
    let mut query = FeedQuery::default();
    handle.refresh().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            Some(notice) = handle.next_notice() => {
                eprintln!("! {notice}");
                continue;
            }
            Ok(()) = view.changed() => {
                last = view.borrow_and_update().clone();
                print!("{}", render(&last, color));
                continue;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        let result = match input {
            Input::Quit => break,
            Input::Help => {
                println!("{HELP}");
                Ok(())
            }
            Input::List => {
                print!("{}", render(&last, color));
                Ok(())
            }
            Input::Search(keyword) => {
                query.keyword = keyword;
                handle.search(query.clone()).await
            }
            Input::Sort(sort_by, order) => {
                query.sort_by = sort_by;
                query.order = order;
                handle.search(query.clone()).await
            }
            Input::Refresh => handle.refresh().await,
            Input::Post(text) => handle.create_post(text).await,
            Input::Edit(n, text) => match card_id(&last, n) {
                Ok(id) => handle.edit_post(id, text).await,
                Err(e) => Err(e),
            },
            Input::Delete(n) => match card_id(&last, n) {
                Ok(id) => handle.delete_post(id).await,
                Err(e) => Err(e),
            },
            Input::Vote(n) => match card_id(&last, n) {
                Ok(id) => handle.toggle_vote(id).await,
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            eprintln!("! {e}");
        }
    }

    drop(handle);
    let _ = task.await;
    Ok(())
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "search" | "s" => Ok(Input::Search(rest.to_string())),
        "sort" => {
            let mut parts = rest.split_whitespace();
            let sort_by = parts.next().unwrap_or("createdAt");
            let order = parts.next().unwrap_or("desc");
            let query = FeedQuery::from_params("", sort_by, order).map_err(|e| e.to_string())?;
            Ok(Input::Sort(query.sort_by, query.order))
        }
        "refresh" | "r" => Ok(Input::Refresh),
        "post" | "p" => Ok(Input::Post(rest.to_string())),
        "edit" | "e" => {
            let (n, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Ok(Input::Edit(parse_number(n)?, text.trim().to_string()))
        }
        "delete" | "d" => Ok(Input::Delete(parse_number(rest)?)),
        "vote" | "v" => Ok(Input::Vote(parse_number(rest)?)),
        "list" | "l" => Ok(Input::List),
        "help" | "h" | "?" => Ok(Input::Help),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command '{other}', try `help`")),
    }
}

fn parse_number(s: &str) -> Result<usize, String> {
    s.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("expected a post number, got '{s}'"))
}

fn card_id(view: &FeedViewModel, n: usize) -> feedsync::Result<PostId> {
    view.cards
        .get(n - 1)
        .map(|card| card.id.clone())
        .ok_or_else(|| FeedError::Validation(format!("no post #{n} in the current feed")))
}
