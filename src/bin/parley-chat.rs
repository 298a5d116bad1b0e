//! Interactive chat against a text-completion API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings (reads PARLEY_API_KEY)
//! parley-chat
//!
//! # Specify a model and a local compatible server
//! parley-chat --model davinci-002 --base-url http://localhost:8080/v1/
//!
//! # Keep typing while replies are outstanding
//! parley-chat --concurrent
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/history` - Show the conversation with timestamps
//! - `/pending` - List requests still waiting on a reply
//! - `/wait` - Wait for outstanding replies
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::{Notify, mpsc};
use tracing_subscriber::EnvFilter;

use parley::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, format_history_line,
    format_stats, help_text, parse_command,
};
use parley::{ChatSession, CompletionClient, SessionState, SubmissionPolicy};

/// What the input thread saw.
enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

enum Flow {
    Continue,
    Quit,
}

/// Tracks how much of the transcript has been drawn.
struct View {
    renderer: PlainTextRenderer,
    rendered: usize,
}

impl View {
    fn sync(&mut self, session: &ChatSession) {
        for message in &session.transcript()[self.rendered..] {
            self.renderer.render_message(message);
        }
        self.rendered = session.transcript().len();
    }
}

/// Main entry point for the parley-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("parley-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let client = CompletionClient::new(None, config.client.clone())?;
    let mut session = ChatSession::new(client)
        .with_submission_policy(config.submission_policy)
        .with_failure_policy(config.failure_policy);
    let mut view = View {
        renderer: PlainTextRenderer::with_color(config.use_color),
        rendered: 0,
    };

    // Ctrl+C outside the prompt stops waiting; the request itself keeps going.
    let interrupt = Arc::new(Notify::new());
    let interrupt_clone = interrupt.clone();
    ctrlc::set_handler(move || {
        interrupt_clone.notify_waiters();
    })?;

    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = std_mpsc::channel();
    thread::spawn(move || read_lines(input_tx, ready_rx));

    println!("Chat (model: {})", config.client.model);
    println!("Type /help for commands, /quit to exit\n");
    let _ = ready_tx.send(());

    loop {
        tokio::select! {
            input = input_rx.recv() => {
                let flow = match input {
                    Some(Input::Line(line)) => {
                        handle_line(&line, &mut session, &mut view, &config, &interrupt).await
                    }
                    Some(Input::Interrupted) => Flow::Continue,
                    Some(Input::Eof) | None => {
                        println!("\nGoodbye!");
                        Flow::Quit
                    }
                    Some(Input::Failed(err)) => {
                        view.renderer.print_error(&format!("Input error: {}", err));
                        Flow::Quit
                    }
                };
                if matches!(flow, Flow::Quit) || ready_tx.send(()).is_err() {
                    break;
                }
            }
            Some(_) = session.next_completion(), if session.state() == SessionState::AwaitingResponse => {
                view.sync(&session);
            }
        }
    }

    let stats = session.stats();
    if stats.pending > 0 {
        view.renderer.print_info(&format!(
            "Leaving {} unanswered request(s) behind.",
            stats.pending
        ));
    }
    Ok(())
}

/// Runs rustyline on its own thread, prompting once per `ready` signal.
fn read_lines(input: mpsc::UnboundedSender<Input>, ready: std_mpsc::Receiver<()>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            let _ = input.send(Input::Failed(err.to_string()));
            return;
        }
    };
    while ready.recv().is_ok() {
        let event = match rl.readline("You: ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                Input::Line(line)
            }
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(err) => Input::Failed(err.to_string()),
        };
        let done = matches!(event, Input::Eof | Input::Failed(_));
        if input.send(event).is_err() || done {
            break;
        }
    }
}

async fn handle_line(
    line: &str,
    session: &mut ChatSession,
    view: &mut View,
    config: &ChatConfig,
    interrupt: &Notify,
) -> Flow {
    if let Some(cmd) = parse_command(line) {
        match cmd {
            ChatCommand::Quit => {
                println!("Goodbye!");
                return Flow::Quit;
            }
            ChatCommand::Help => {
                for line in help_text().lines() {
                    println!("    {}", line);
                }
            }
            ChatCommand::History => {
                for message in session.transcript() {
                    println!("    {}", format_history_line(message));
                }
            }
            ChatCommand::Pending => {
                if session.pending().is_empty() {
                    view.renderer.print_info("Nothing pending.");
                }
                for request in session.pending() {
                    println!(
                        "    {} ({:.1}s): {}",
                        request.id(),
                        request.elapsed().as_secs_f64(),
                        request.prompt_text()
                    );
                }
            }
            ChatCommand::Wait => {
                tokio::select! {
                    _ = session.settle() => {}
                    _ = interrupt.notified() => {
                        view.renderer.print_info("Stopped waiting.");
                    }
                }
                view.sync(session);
            }
            ChatCommand::Stats => print_stats(session),
            ChatCommand::ShowConfig => print_config(config),
            ChatCommand::Invalid(message) => view.renderer.print_error(&message),
        }
        return Flow::Continue;
    }

    let id = match session.submit(line) {
        Ok(id) => id,
        Err(err) => {
            view.renderer.print_error(&err.to_string());
            return Flow::Continue;
        }
    };
    // The prompt line already shows what the user typed.
    view.rendered = session.transcript().len();

    if session.submission_policy() == SubmissionPolicy::SingleFlight {
        if let Some(request) = session.pending().iter().find(|p| p.id() == id) {
            view.renderer.print_pending(request);
        }
        tokio::select! {
            _ = session.next_completion() => {}
            _ = interrupt.notified() => {
                view.renderer.print_info("Still waiting in the background; /wait to resume.");
            }
        }
        view.sync(session);
    }
    Flow::Continue
}

fn print_stats(session: &ChatSession) {
    for line in format_stats(&session.stats()).lines() {
        println!("    {}", line);
    }
}

fn print_config(config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Model: {}", config.client.model);
    println!("      Max tokens: {}", config.client.max_tokens);
    println!(
        "      Temperature: {}",
        config
            .client
            .temperature
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "default".to_string())
    );
    println!("      Base URL: {}", config.client.base_url);
    println!("      Timeout: {}s", config.client.timeout.as_secs());
    println!("      Submissions: {:?}", config.submission_policy);
    println!("      Failures: {:?}", config.failure_policy);
}
