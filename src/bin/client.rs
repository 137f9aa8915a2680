//! Terminal chat client
//!
//! Keeps the conversation list on disk and streams answers from the relay.

use adk_chat::config::ClientConfig;
use adk_chat::input::InputAssembler;
use adk_chat::session::{ControllerError, HttpTransport, SessionController, SessionUpdate};
use adk_chat::store::{Conversation, ConversationStore, SqlitePersistence};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Controller = SessionController<HttpTransport, SqlitePersistence>;

const HELP: &str = "\
Commands:
  /new                    start a new conversation
  /list                   list conversations
  /switch <n|id>          switch to a conversation
  /rename <n|id> <title>  rename a conversation
  /delete <n|id>          delete a conversation
  /image <path>           attach an image to the next message
  /audio <path>           attach a voice recording to the next message
  /drop <n>               remove a staged attachment
  /help                   show this help
  /quit                   exit
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Send(String),
    New,
    List,
    Switch(String),
    Rename(String, String),
    Delete(String),
    Image(PathBuf),
    Audio(PathBuf),
    Drop(usize),
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Command::Send(line.to_string());
        };
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();

        match (name, args) {
            ("new", "") => Command::New,
            ("list", "") => Command::List,
            ("help", "") => Command::Help,
            ("quit" | "exit", "") => Command::Quit,
            ("switch", target) if !target.is_empty() => Command::Switch(target.to_string()),
            ("delete", target) if !target.is_empty() => Command::Delete(target.to_string()),
            ("rename", args) => match args.split_once(char::is_whitespace) {
                Some((target, title)) => Command::Rename(target.to_string(), title.to_string()),
                None => Command::Invalid("usage: /rename <n|id> <title>".into()),
            },
            ("image", path) if !path.is_empty() => Command::Image(PathBuf::from(path)),
            ("audio", path) if !path.is_empty() => Command::Audio(PathBuf::from(path)),
            ("drop", n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Drop(n - 1),
                _ => Command::Invalid("usage: /drop <n>".into()),
            },
            _ => Command::Invalid(format!("unknown command: /{rest} (try /help)")),
        }
    }
}

/// Resolve a 1-based list position or a conversation id
fn resolve(conversations: &[Conversation], target: &str) -> Option<String> {
    if let Ok(n) = target.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| conversations.get(i))
            .map(|c| c.id.clone());
    }
    conversations
        .iter()
        .find(|c| c.id == target)
        .map(|c| c.id.clone())
}

fn print_list(controller: &Controller) {
    let store = controller.store();
    for (i, conversation) in store.conversations().iter().enumerate() {
        let marker = if store.current_conversation_id() == Some(conversation.id.as_str()) {
            '*'
        } else {
            ' '
        };
        println!(
            "{marker} {:>2}. {}  ({})",
            i + 1,
            conversation.title,
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn render(controller: &Controller, update: &SessionUpdate) {
    match update {
        SessionUpdate::Rebound {
            conversation_id: Some(id),
        } => {
            let title = controller
                .store()
                .get(id)
                .map_or("(untitled)", |c| c.title.as_str());
            println!("-- {title} --");
        }
        SessionUpdate::Rebound {
            conversation_id: None,
        }
        | SessionUpdate::Status(_) => {}
        SessionUpdate::Delta { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        SessionUpdate::Done => println!(),
        SessionUpdate::Failed { message } => println!("\n! request failed: {message}"),
    }
}

fn report(result: Result<(), ControllerError>) {
    if let Err(e) = result {
        println!("! {e}");
    }
}

/// Returns false when the client should exit
async fn handle(
    controller: &mut Controller,
    assembler: &mut InputAssembler,
    command: Command,
) -> bool {
    match command {
        Command::Send(text) => {
            if text.trim().is_empty() && assembler.is_empty() {
                return true;
            }
            if controller.status().is_busy() {
                println!("! still answering, wait for the response to finish");
                return true;
            }
            let attachments = assembler.take();
            match controller.submit(&text, attachments.clone()) {
                Ok(()) => print!("assistant> "),
                Err(ControllerError::Rejected(e)) => {
                    assembler.restore(attachments);
                    println!("! {e}");
                }
                Err(e) => println!("! {e}"),
            }
            let _ = std::io::stdout().flush();
        }
        Command::New => report(controller.new_conversation().map(|_| ())),
        Command::List => print_list(controller),
        Command::Switch(target) => match resolve(controller.store().conversations(), &target) {
            Some(id) => report(controller.switch_conversation(&id)),
            None => println!("! no conversation {target}"),
        },
        Command::Rename(target, title) => {
            match resolve(controller.store().conversations(), &target) {
                Some(id) => match controller.rename_conversation(&id, &title) {
                    Ok(true) => println!("renamed"),
                    Ok(false) => println!("! title cannot be blank"),
                    Err(e) => println!("! {e}"),
                },
                None => println!("! no conversation {target}"),
            }
        }
        Command::Delete(target) => match resolve(controller.store().conversations(), &target) {
            Some(id) => report(controller.delete_conversation(&id)),
            None => println!("! no conversation {target}"),
        },
        Command::Image(path) => match assembler.stage_image_file(&path).await {
            Ok(()) => println!("staged image {} ({} attached)", path.display(), assembler.staged().len()),
            Err(e) => println!("! {e}"),
        },
        Command::Audio(path) => match assembler.stage_audio_file(&path).await {
            Ok(()) => println!("staged recording {} ({} attached)", path.display(), assembler.staged().len()),
            Err(e) => println!("! {e}"),
        },
        Command::Drop(index) => match assembler.remove(index) {
            Some(attachment) => println!("removed {}", attachment.label()),
            None => println!("! no attachment {}", index + 1),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Invalid(message) => println!("! {message}"),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adk_chat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    if config.token.is_none() {
        tracing::warn!("ADK_CHAT_TOKEN is not set; the relay will reject requests");
    }

    if let Some(parent) = config.state_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = ConversationStore::load(SqlitePersistence::open(&config.state_path)?)?;
    let transport = HttpTransport::new(&config)?;
    tracing::info!(endpoint = transport.endpoint(), "Using relay");

    let mut controller = SessionController::new(store, Arc::new(transport))?;
    let mut assembler = InputAssembler::new();
    println!("Connected to {} (/help for commands)", config.relay_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(&mut controller, &mut assembler, Command::parse(&line)).await {
                    break;
                }
            }
            Some(update) = controller.next_update() => render(&controller, &update),
        }
    }

    if controller.status().is_busy() {
        tracing::info!("Exiting with a response in progress");
    }
    Ok(())
}
