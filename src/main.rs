use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use parley::app::App;
use parley::config::Config;
use parley::gateway::GatewayClient;
use parley::persona::Persona;
use parley::session::SessionStore;
use parley::storage::FileBackend;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Chat with a scripted persona over a streaming completion API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved conversations
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let config = Config::load()?;

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::List) => list_conversations(&config),
        None => run_chat(config).await,
    }
}

fn list_conversations(config: &Config) -> Result<()> {
    let backend = FileBackend::new(config.conversations_path());
    let store = SessionStore::load(Box::new(backend));

    if store.conversations().is_empty() {
        println!("No conversations yet. Run 'parley' to start one!");
        return Ok(());
    }

    println!("Saved conversations:\n");
    for conversation in store.conversations() {
        println!(
            "  • {}  ({} messages, started {})",
            conversation.title,
            conversation.messages.len(),
            conversation.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn run_chat(config: Config) -> Result<()> {
    // Fail fast on a missing credential, before any terminal setup.
    let gateway = GatewayClient::new(&config)?;
    let backend = FileBackend::new(config.conversations_path());
    let store = SessionStore::load(Box::new(backend));
    let persona = Persona::from_config(&config);
    let mut app = App::new(store, gateway, persona, config.model.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = app.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
