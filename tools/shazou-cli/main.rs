use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use shazou::diagram::PortDirection;
use shazou::interaction::available_choices;
use shazou::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::Level;

/// Mapping choice for links that need one.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChoiceCli {
    Direct,
    ElementWise,
    Singleton,
    Custom,
}

impl From<ChoiceCli> for MappingChoice {
    fn from(choice: ChoiceCli) -> Self {
        match choice {
            ChoiceCli::Direct => MappingChoice::Direct,
            ChoiceCli::ElementWise => MappingChoice::ElementWise,
            ChoiceCli::Singleton => MappingChoice::ExtractSingleton,
            ChoiceCli::Custom => MappingChoice::CustomFunction,
        }
    }
}

/// Inspect a TypeScript mapping function as a diagram and add mappings to it
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TypeScript file
    file: PathBuf,

    /// Name of the mapping function
    #[arg(short, long)]
    function: String,

    /// Optional path to a JSON mapper config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the diagram as JSON instead of a tree
    #[arg(long)]
    json: bool,

    /// Map an input field to an output field, e.g. `person.name=fullName`
    #[arg(short, long, value_name = "SRC=TGT")]
    map: Option<String>,

    /// How to resolve a mapping that needs a choice
    #[arg(long, value_enum)]
    choice: Option<ChoiceCli>,

    /// Write the updated source back to FILE instead of printing it
    #[arg(short, long)]
    write: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Persists modifications to disk or keeps them for printing.
struct FileSink {
    write: bool,
    last: Mutex<Option<String>>,
}

#[async_trait]
impl ModificationSink for FileSink {
    async fn apply_modifications(&self, path: &Path, text: String) -> std::result::Result<(), ApplyError> {
        if self.write {
            fs::write(path, &text).map_err(|e| ApplyError::Io(e.to_string()))?;
        }
        let mut last = self
            .last
            .lock()
            .map_err(|e| ApplyError::Rejected(e.to_string()))?;
        *last = Some(text);
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    run(cli).await;
}

async fn run(cli: Cli) {
    let total_start = Instant::now();

    // --- 1. File Loading ---
    let load_start = Instant::now();
    let text = fs::read_to_string(&cli.file).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read source file '{}': {}",
            cli.file.display(),
            e
        ))
    });
    let config = match &cli.config {
        Some(path) => MapperConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => MapperConfig::default(),
    };
    let load_duration = load_start.elapsed();

    // --- 2. Parsing and Diagram Build ---
    let build_start = Instant::now();
    let source = SourceFile::parse(&cli.file, text)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse source: {}", e)));
    let sink = FileSink {
        write: cli.write,
        last: Mutex::new(None),
    };
    let mut session = MapperSession::open(source, &cli.function, config, sink)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to open '{}': {}", cli.function, e)));
    let build_duration = build_start.elapsed();

    // --- 3. Mapping ---
    let map_start = Instant::now();
    if let Some(pair) = &cli.map {
        apply_mapping(&mut session, pair, cli.choice).await;
    }
    let map_duration = map_start.elapsed();

    // --- 4. Output ---
    if cli.json {
        let snapshot = DiagramSnapshot::from(session.model());
        let json = serde_json::to_string_pretty(&snapshot)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize diagram: {}", e)));
        println!("{}", json);
    } else {
        println!("{}", DiagramTree { model: session.model() });
    }

    if cli.map.is_some() && !cli.write {
        let last = session.sink().last.lock().ok().and_then(|l| l.clone());
        match last {
            Some(text) => println!("--- Updated Source ---\n{}", text),
            None => println!("--- Source unchanged ---"),
        }
    }

    if !cli.json {
        let model = session.model();
        println!("\n--- Diagram Summary ---");
        println!("Nodes:                {}", model.nodes().len());
        println!("Ports:                {}", model.ports().len());
        println!("Links:                {}", model.links().count());

        println!("\n--- Performance Summary ---");
        println!("File Loading:         {:?}", load_duration);
        println!("Parse & Build:        {:?}", build_duration);
        println!("Mapping:              {:?}", map_duration);
        println!("-----------------------------");
        println!("Total Execution:      {:?}", total_start.elapsed());
    }
}

async fn apply_mapping(session: &mut MapperSession<FileSink>, pair: &str, choice: Option<ChoiceCli>) {
    let (from, to) = pair
        .split_once('=')
        .unwrap_or_else(|| exit_with_error("--map expects SRC=TGT"));
    let model = session.model();
    let source = model
        .exact_port(PortDirection::Out, from.trim())
        .unwrap_or_else(|| exit_with_error(&format!("No input field '{}'", from)));
    let target = model
        .exact_port(PortDirection::In, to.trim())
        .unwrap_or_else(|| exit_with_error(&format!("No output field '{}'", to)));

    for port in [source, target] {
        let outcome = session
            .handle_event(InteractionEvent::MouseUp(Target::Port(port)))
            .await
            .unwrap_or_else(|e| exit_with_error(&format!("Mapping failed: {}", e)));
        match outcome {
            Some(LinkOutcome::Rejected { .. }) => {
                exit_with_error(&format!("'{}' cannot receive a mapping from '{}'", to, from))
            }
            Some(LinkOutcome::Pending(pending)) => {
                let choices = available_choices(pending.mapping_type);
                let choice = match choice {
                    Some(choice) => MappingChoice::from(choice),
                    None => {
                        let Some(first) = choices.first() else {
                            exit_with_error("No mapping choice available");
                        };
                        println!(
                            "{} mapping, using '{}' (choices: {})",
                            pending.mapping_type,
                            first,
                            choices.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                        );
                        *first
                    }
                };
                session
                    .resolve_pending(choice)
                    .await
                    .unwrap_or_else(|e| exit_with_error(&format!("Mapping failed: {}", e)));
            }
            _ => {}
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
