//! Duologue CLI binary entry point.

use std::path::Path;

use chrono::Utc;
use clap::Parser;
use duologue::cli::{ChatArgs, Cli, Commands, ProviderArgs};
use duologue::config::Settings;
use duologue::conversation::{ConversationLoop, StopReason};
use duologue::error::DuologueError;

#[tokio::main]
async fn main() {
    let Cli {
        config,
        log_file,
        command,
    } = Cli::parse();

    if let Err(e) = duologue::cli::init_logging(log_file.as_deref()) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = match command {
        Commands::Models(args) => handle_models(config.as_deref(), args).await,
        Commands::Chat(args) => handle_chat(config.as_deref(), args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        eprintln!("Hint: {}", e.recovery_suggestion().hint());
        std::process::exit(1);
    }
}

async fn handle_models(config: Option<&Path>, args: ProviderArgs) -> Result<(), DuologueError> {
    let mut settings = Settings::load(config)?;
    args.apply(&mut settings);

    let endpoint = settings.agent("");
    let models = duologue::provider::list_models(&endpoint).await;
    if models.is_empty() {
        eprintln!(
            "No models listed at {}; pass model names with --agent1/--agent2.",
            endpoint.base_url
        );
    }
    for model in models {
        println!("{model}");
    }
    Ok(())
}

async fn handle_chat(config: Option<&Path>, args: ChatArgs) -> Result<(), DuologueError> {
    let mut settings = Settings::load(config)?;
    args.apply(&mut settings);

    if settings.agent1_model.trim().is_empty() || settings.agent2_model.trim().is_empty() {
        let models = duologue::provider::list_models(&settings.agent("")).await;
        if models.is_empty() {
            return Err(DuologueError::Configuration(
                "The server listed no models; pass model names with --agent1 and --agent2".into(),
            ));
        }
        settings.fill_models_from(&models);
    }

    let options = settings.conversation_options(args.topic.clone());
    let mut conversation = ConversationLoop::new(settings.agent_configs(), options)?
        .with_event_sink(duologue::cli::terminal_sink());

    let stop = conversation.stop_handle();
    tokio::spawn(async move {
        let interrupts = Box::pin(futures::stream::unfold((), |()| async {
            tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
        }));
        if duologue::cli::watch_interrupts(interrupts, stop).await {
            eprintln!("\nInterrupted.");
            std::process::exit(130);
        }
    });

    let state = conversation.run().await?;
    println!();
    match state.stop_reason() {
        Some(StopReason::Failed {
            speaker,
            category,
            error,
        }) => {
            eprintln!(
                "Error: {speaker} ({}) failed: {error}. The conversation has been stopped.",
                state.model(*speaker)
            );
            eprintln!("Hint: {}", category.recovery_suggestion().hint());
        }
        Some(StopReason::TimeLimit) => eprintln!("Time limit reached. Conversation stopped."),
        Some(StopReason::Manual) | None => eprintln!("Conversation stopped."),
    }

    let output = match (args.output, args.save) {
        (Some(path), _) => Some(path),
        (None, true) => Some(duologue::export::default_file_name(Utc::now()).into()),
        (None, false) => None,
    };
    if let Some(path) = output {
        tokio::fs::write(&path, duologue::export::render_markdown(&state)).await?;
        eprintln!("Saved chat to {}", path.display());
    }

    Ok(())
}
