//! Terminal front end for a running resdash server.

use clap::Parser;
use resdash::client::ApiClient;
use resdash::telemetry;
use resdash::ui::{Driver, Event, RecordKey};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse the resources table from a terminal", long_about = None)]
struct Args {
    /// Base URL of the API routes
    #[arg(long, env = "RESDASH_API_URL", default_value = "http://localhost:3001/api")]
    api_url: Url,
}

const HELP: &str = "\
Commands:
  load            load (or reload) the records
  retry           re-check the API connection
  search <term>   filter by name prefix; `search` alone clears it
  open <n>        expand or collapse record n
  help            show this help
  quit            exit";

enum Input {
    Dispatch(Event),
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match command {
        "load" => Input::Dispatch(Event::LoadRequested),
        "retry" => Input::Dispatch(Event::RetryRequested),
        // The term is taken verbatim, apart from the separating space
        "search" => Input::Dispatch(Event::SearchChanged(rest.to_string())),
        "open" => match rest.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Input::Dispatch(Event::RecordSelected(RecordKey(n - 1))),
            _ => Input::Invalid(format!("not a record number: '{}'", rest.trim())),
        },
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => Input::Invalid(format!("unknown command '{other}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
    telemetry::init_console_logging()?;

    let args = Args::parse();
    let client = ApiClient::new(args.api_url)?;

    let links = match client.portal_links().await {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!("Portal links unavailable: {}", e);
            Default::default()
        }
    };

    let mut driver = Driver::new(client, links);
    driver.dispatch(Event::Mounted).await;
    println!("{}", driver.view());
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_input(&line) {
            Input::Dispatch(event) => {
                driver.dispatch(event).await;
                println!("{}", driver.view());
            }
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Invalid(reason) => println!("{reason}. Type `help` for commands."),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_input("load"), Input::Dispatch(Event::LoadRequested)));
        assert!(matches!(parse_input("open 2"), Input::Dispatch(Event::RecordSelected(RecordKey(1)))));
        assert!(matches!(parse_input("open 0"), Input::Invalid(_)));
        assert!(matches!(parse_input("quit"), Input::Quit));
    }

    #[test]
    fn test_search_term_kept_verbatim() {
        match parse_input("search Agu T") {
            Input::Dispatch(Event::SearchChanged(term)) => assert_eq!(term, "Agu T"),
            _ => panic!("expected search"),
        }
        match parse_input("search") {
            Input::Dispatch(Event::SearchChanged(term)) => assert!(term.is_empty()),
            _ => panic!("expected search"),
        }
    }
}
