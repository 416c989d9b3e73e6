use dotenv::dotenv;
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use todolist::client::{Command, TaskClient, TodoApp};
use todolist::log;

/// Environment variable naming the API base url.
const API_URL_ENV: &str = "TODO_API_URL";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    log::setup(EnvFilter::try_from_env(log::LOG_ENV), &None)?;

    let base = env::var(API_URL_ENV).unwrap_or_else(|_| TaskClient::DEFAULT_URL.to_string());
    let mut app = TodoApp::new(TaskClient::new(&base)?);
    app.mount().await;
    print!("{}", app.render());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Add(text) => {
                app.set_input(text);
                if !app.can_add() {
                    println!("nothing to add");
                    continue;
                }
                app.add().await;
            }
            Command::Remove(id) => {
                app.remove(id).await;
            }
            Command::Reload => {
                app.refresh().await;
            }
            Command::Help => {
                println!("{}", todolist::client::HELP);
                continue;
            }
            Command::Quit => break,
            Command::Invalid(reason) => {
                println!("{}", reason);
                continue;
            }
        }
        print!("{}", app.render());
    }
    Ok(())
}
