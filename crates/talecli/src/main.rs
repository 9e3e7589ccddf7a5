// crates/talecli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use talecore::{node_types, Connection, DialogueEvent, GraphDocument, Value};
use taleruntime::DialogueEngine;

#[derive(Parser)]
#[command(name = "tale")]
#[command(about = "Dialogue Tree CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a dialogue file interactively
    Run {
        /// Path to dialogue JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a dialogue file
    Validate {
        /// Path to dialogue JSON file
        file: PathBuf,
    },

    /// List built-in node types
    Nodes,

    /// Create a new example dialogue
    Init {
        /// Output file path
        #[arg(short, long, default_value = "dialogue.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, verbose } => {
            // Initialize logging
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::WARN)
                    .init();
            }

            run_dialogue(file)?;
        }

        Commands::Validate { file } => {
            validate_dialogue(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_dialogue(output)?;
        }
    }

    Ok(())
}

fn run_dialogue(file: PathBuf) -> Result<()> {
    println!("🚀 Loading dialogue from: {}", file.display());

    let document = GraphDocument::load(&file)?;

    println!("📋 Nodes: {}", document.node_count());
    println!("   Connections: {}", document.connection_count());
    println!();

    let mut engine = DialogueEngine::new();
    let events = engine.subscribe();
    engine.set_document(Some(document));
    engine.start_dialogue();

    let stdin = io::stdin();

    loop {
        if drain_events(&events) {
            break;
        }

        let options = engine.input_options();

        if !options.is_empty() {
            println!();
            for (index, option) in options.iter().enumerate() {
                let label = if option.text.is_empty() {
                    "(continue)"
                } else {
                    option.text.as_str()
                };
                println!("  [{index}] {label}");
            }
        }

        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            println!("👋 Input closed, ending dialogue");
            engine.end_dialogue();
            drain_events(&events);
            break;
        }

        let line = line.trim_end_matches(['\n', '\r']);

        // A bare option number selects that option's text
        let input = match line.trim().parse::<usize>() {
            Ok(choice) if choice < options.len() => options[choice].text.clone(),
            _ => line.to_string(),
        };

        engine.send_input(&input, &[]);
    }

    Ok(())
}

/// Prints buffered events; returns whether the session ended
fn drain_events(events: &Receiver<DialogueEvent>) -> bool {
    let mut ended = false;

    while let Ok(event) = events.try_recv() {
        match event {
            DialogueEvent::Output { text, speaker, .. } => {
                if speaker.is_empty() {
                    println!("💬 {text}");
                } else {
                    println!("💬 {speaker}: {text}");
                }
            }
            DialogueEvent::Ended { .. } => {
                println!("🏁 Dialogue ended");
                ended = true;
            }
            DialogueEvent::VariableChanging { name, new_value, .. } => {
                tracing::debug!(name = %name, value = ?new_value, "Variable changing");
            }
            DialogueEvent::DocumentChanged { .. } => {}
        }
    }

    ended
}

fn validate_dialogue(file: PathBuf) -> Result<()> {
    println!("🔍 Validating dialogue: {}", file.display());

    let document = GraphDocument::load(&file)?;

    match document.validate() {
        Ok(()) => {
            println!("✅ Dialogue is valid:");
            println!("   Nodes: {}", document.node_count());
            println!("   Connections: {}", document.connection_count());

            let has_start = (0..document.node_count()).any(|index| {
                document
                    .node_type(index)
                    .map_or(false, |token| token == node_types::START)
            });

            if !has_start {
                println!("   ⚠️  No start node; sessions will end immediately");
            }
        }
        Err(problems) => {
            println!("❌ Found {} problem(s):", problems.len());
            for problem in &problems {
                println!("   • {problem}");
            }
        }
    }

    Ok(())
}

const NODE_DESCRIPTIONS: [(&str, &str); 10] = [
    (node_types::START, "Entry point; sessions begin here"),
    (node_types::OUTPUT, "Emits a dialogue line and waits for input"),
    (node_types::SWITCH, "Branches on input by case-insensitive substring"),
    (node_types::ACTION, "Fires a host-resolved action, then advances"),
    (node_types::CONDITION, "Branches on a host-resolved predicate"),
    (node_types::CALL, "Jumps to a function node by index"),
    (node_types::FUNCTION, "Addressable anchor for call nodes"),
    (node_types::VARIABLE, "Named, typed mutable value"),
    (node_types::VARIABLE_SET, "Rewrites a variable through its kind"),
    (node_types::VARIABLE_CHECK, "Branches on a variable through its kind"),
];

fn list_nodes() {
    println!("📦 Built-in node types:");
    println!();

    for (token, description) in NODE_DESCRIPTIONS {
        println!("  • {token}");
        println!("    {description}");
    }
}

fn create_example_dialogue(output: PathBuf) -> Result<()> {
    let document = GraphDocument::from_nodes(
        vec![
            (node_types::START, vec![]),
            (
                node_types::OUTPUT,
                vec![
                    Value::from("Hi there, traveller. Fancy a quest?"),
                    Value::from("Bob"),
                ],
            ),
            (node_types::SWITCH, vec![Value::from(vec!["yes", "no"])]),
            (
                node_types::OUTPUT,
                vec![
                    Value::from("Excellent! Meet me at the gate."),
                    Value::from("Bob"),
                ],
            ),
            (
                node_types::OUTPUT,
                vec![Value::from("Maybe next time then."), Value::from("Bob")],
            ),
        ],
        &[
            Connection::new(0, 0, 1, 0),
            Connection::new(1, 0, 2, 0),
            Connection::new(2, 0, 3, 0),
            Connection::new(2, 1, 4, 0),
        ],
    );

    document.save(&output)?;

    println!("✨ Created example dialogue: {}", output.display());
    println!();
    println!("Play it with:");
    println!("  tale run --file {}", output.display());

    Ok(())
}
