use std::sync::Arc;

use clap::{Parser, Subcommand};

use chatref_core::{
    commands::{self, ShowArgs},
    config::Config,
    messaging::port::MessagingPort,
    session::Session,
    Result,
};
use chatref_telegram::TelegramClient;

#[derive(Parser)]
#[command(
    name = "chatref",
    version,
    about = "Short, stable handles for Telegram chats",
    after_help = "Chats can be given as a tag, a fingerprint prefix, a numeric id or a @username.\n\nExamples:\n  chatref chats -c 20\n  chatref tag 3f9a2c work\n  chatref send work \"on my way\"\n  chatref show work -c 50 --nofiles\n  chatref show work -b @alice"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Send a text message to a chat", allow_negative_numbers = true)]
    Send { chat: String, message: String },

    #[command(about = "List recent chats with their fingerprints")]
    Chats {
        #[arg(short, long, default_value_t = 10, help = "Number of chats to list")]
        count: usize,
    },

    #[command(about = "Attach a tag to a chat", allow_negative_numbers = true)]
    Tag { chat: String, tag: String },

    #[command(name = "get-tags", about = "List all tags")]
    GetTags,

    #[command(about = "Show recent messages of a chat", allow_negative_numbers = true)]
    Show {
        chat: String,

        #[arg(short, long, default_value_t = 10, help = "Number of messages to fetch")]
        count: usize,

        #[arg(long, help = "Do not download media; show placeholders")]
        nofiles: bool,

        #[arg(short = 'b', long = "by", help = "Only messages from this sender")]
        by: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    chatref_core::logging::init("chatref")?;

    let cli = Cli::parse();
    let cfg = Config::load();
    let store = cfg.identity_store();

    let output = match cli.command {
        // Purely local; no connection needed.
        Command::GetTags => commands::get_tags(&store)?,
        Command::Send { chat, message } => {
            Session::run(telegram(&cfg)?, store, |s| {
                Box::pin(async move { commands::send(s, &chat, &message).await })
            })
            .await?
        }
        Command::Chats { count } => {
            Session::run(telegram(&cfg)?, store, |s| {
                Box::pin(async move { commands::chats(s, count).await })
            })
            .await?
        }
        Command::Tag { chat, tag } => {
            Session::run(telegram(&cfg)?, store, |s| {
                Box::pin(async move { commands::tag(s, &chat, &tag).await })
            })
            .await?
        }
        Command::Show {
            chat,
            count,
            nofiles,
            by,
        } => {
            let args = ShowArgs {
                count,
                files: !nofiles,
                by,
            };
            Session::run(telegram(&cfg)?, store, |s| {
                Box::pin(async move { commands::show(s, &chat, args).await })
            })
            .await?
        }
    };

    println!("{output}");
    Ok(())
}

fn telegram(cfg: &Config) -> Result<Arc<dyn MessagingPort>> {
    let token = cfg.require_token()?;
    Ok(Arc::new(TelegramClient::from_token(
        token,
        cfg.download_dir.clone(),
    )))
}
