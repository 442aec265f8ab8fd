//! Calculator Bot Example
//!
//! A console bot built on Gantry. Every line read from stdin is treated as a
//! chat message from the configured user; replies are printed to stdout.
//!
//! # Commands
//!
//! ```text
//! !add 2 plus 3            typed parameters around a literal placeholder
//! !sum 1 2 3 4             an implicit list
//! !distinct a b a c        a unique, implicit list
//! !echo anything at all    the remaining text
//! !daily                   a per-user cooldown
//! !clear [count]           a permission check with an optional parameter
//! ```
//!
//! Any message containing both "found" and "bug" fires the bug report trigger.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package calc-bot -- --user 1 --guild 7 --moderator 1
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use gantry::prelude::*;
use gantry::runtime::RuntimeBuilder;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "calc-bot", about = "A console calculator bot")]
struct Args {
    /// Configuration file to load instead of searching the default locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User id the console messages are sent as.
    #[arg(long, default_value_t = 1)]
    user: u64,

    #[arg(long, default_value_t = 1)]
    channel: u64,

    /// Guild id; messages are private when omitted.
    #[arg(long)]
    guild: Option<u64>,

    /// Users allowed to run moderation commands.
    #[arg(long)]
    moderator: Vec<u64>,
}

// ============================================================================
// Result sink
// ============================================================================

/// Prints replies the way a chat client would show them.
struct StdoutSink;

#[async_trait]
impl ResultSink for StdoutSink {
    async fn deliver(&self, _event: &MessageEvent, dispatched: &Dispatched) {
        match &dispatched.result {
            Ok(Value::Unit) => {}
            Ok(value) => println!("> {value}"),
            Err(e) if e.should_display() => println!("> {e}"),
            Err(_) => debug!(action = %dispatched.action, "Suppressed repeated notice"),
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

fn register_actions(builder: RuntimeBuilder, moderators: HashSet<UserId>) -> RuntimeBuilder {
    let math = CommandGroup::new("math")
        .decorate(DecoratorMarker::time(LogLevel::Debug))
        .command(
            command(["add", "plus"], |a: i64, b: i64| a + b)
                .usage("int <plus> int")
                .description("Adds two numbers"),
        )
        .command(
            command(["sum"], |numbers: Vec<i64>| numbers.iter().sum::<i64>())
                .param(0, [ParamMarker::Implicit])
                .description("Adds every number given"),
        )
        .command(
            command(["distinct"], |words: Vec<String>| words.len())
                .param(0, [ParamMarker::Unique, ParamMarker::Implicit])
                .description("Counts the distinct words given"),
        );

    builder
        .group(math)
        .command(
            command(["echo", "say"], |text: String| text)
                .param(0, [ParamMarker::Remaining])
                .description("Repeats the text back"),
        )
        .command(
            command(["daily"], |user: UserId| format!("User {user} claimed the daily reward"))
                .param(0, [ParamMarker::Source])
                .decorate(DecoratorMarker::cooldown(
                    Duration::from_secs(24 * 60 * 60),
                    CooldownScope::User,
                ))
                .decorate(DecoratorMarker::log(LogLevel::Info))
                .description("Claims the daily reward"),
        )
        .command(
            command(["clear"], |count: i64| format!("Cleared {count} messages"))
                .param(0, [ParamMarker::unrequired("10")])
                .decorate(DecoratorMarker::permission(["manage_messages"]))
                .description("Clears recent messages"),
        )
        .trigger(
            trigger("bug_report", |user: UserId| {
                format!("Thanks for the report, user {user}. We will look into it.")
            })
            .phrases(["found", "bug"])
            .require(Require::All)
            .param(0, [ParamMarker::Source]),
        )
        .permissions(move |ambient: &dyn Ambient, permission: &str| {
            permission == "manage_messages"
                && ambient
                    .user_id()
                    .is_some_and(|user| moderators.contains(&user))
        })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = GantryRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let moderators = args.moderator.iter().copied().map(UserId).collect();
    let runtime = register_actions(builder, moderators).sink(StdoutSink).build()?;

    let prefix = runtime.config().bot.prefix.clone();
    for command in runtime.dispatcher().commands().commands() {
        println!("{}", command.help(&prefix));
    }

    runtime.start();
    info!(user = args.user, guild = ?args.guild, "Reading messages from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else { break };

        let mut event = MessageEvent::new(UserId(args.user), ChannelId(args.channel), line)
            .with_author_name("console");
        if let Some(guild) = args.guild {
            event = event.in_guild(GuildId(guild));
        }
        runtime.handle(event).await;
    }

    runtime.shutdown().await;
    Ok(())
}
