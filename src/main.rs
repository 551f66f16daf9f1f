// Contract-Drafter: Main Entry Point
// Interactive drafting session and one-shot DQDL translation

use anyhow::Context;
use contract_drafter::contract::{normalize, DataModels};
use contract_drafter::{
    ChatModel, Coordinator, Document, DrafterConfig, LayeredPromptStore, LlmConfig, LlmProvider,
    QualityTranslator, Session,
};
use contract_drafter::llm::ProviderType;
use serde_json::Value;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Log filter override, e.g. `CONTRACT_DRAFTER_LOG=debug`
const LOG_ENV: &str = "CONTRACT_DRAFTER_LOG";

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "--version" | "-v" => {
            print_version();
            Ok(())
        }
        "draft" => DraftArgs::parse(&args[2..]).and_then(run_draft),
        "dqdl" => DqdlArgs::parse(&args[2..]).and_then(run_dqdl),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!(
        r#"
Contract-Drafter: Data Contract Drafting Assistant
==================================================

USAGE:
    contract-drafter [COMMAND] [OPTIONS]

COMMANDS:
    draft                 Start an interactive drafting session
    dqdl <models-file>    Translate the quality checks of a data models file to DQDL

DRAFT OPTIONS:
    --seed <file>         Start from an existing contract (JSON or YAML)
    --out <file>          Write the contract here after every turn (.json, .yaml, .yml)

COMMON OPTIONS:
    --config <file>       Settings file (default: $CONTRACT_DRAFTER_CONFIG or the user config dir)
    --provider <name>     Use a provider preset: openai, anthropic, cerebras, openrouter, openai_compatible
    --verbose             Debug logging
    -h, --help            Print this help message
    -v, --version         Print version information

SESSION COMMANDS:
    /show                 Print the current contract
    /quit                 End the session
"#
    );
}

fn print_version() {
    println!("Contract-Drafter v{}", env!("CARGO_PKG_VERSION"));
}

fn init_logging(verbose: bool) {
    let level = env::var(LOG_ENV)
        .ok()
        .and_then(|l| l.parse::<tracing_subscriber::filter::LevelFilter>().ok())
        .unwrap_or(if verbose {
            tracing_subscriber::filter::LevelFilter::DEBUG
        } else {
            tracing_subscriber::filter::LevelFilter::WARN
        });
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

#[derive(Default)]
struct DraftArgs {
    seed: Option<PathBuf>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
    provider: Option<ProviderType>,
    verbose: bool,
}

impl DraftArgs {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--seed" => parsed.seed = Some(path_value(&mut iter, "--seed")?),
                "--out" => parsed.out = Some(path_value(&mut iter, "--out")?),
                "--config" => parsed.config = Some(path_value(&mut iter, "--config")?),
                "--provider" => parsed.provider = Some(provider_value(&mut iter)?),
                "--verbose" => parsed.verbose = true,
                other => anyhow::bail!("Unknown option for draft: {}", other),
            }
        }
        Ok(parsed)
    }
}

struct DqdlArgs {
    models: PathBuf,
    config: Option<PathBuf>,
    provider: Option<ProviderType>,
    verbose: bool,
}

impl DqdlArgs {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut models = None;
        let mut config = None;
        let mut provider = None;
        let mut verbose = false;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => config = Some(path_value(&mut iter, "--config")?),
                "--provider" => provider = Some(provider_value(&mut iter)?),
                "--verbose" => verbose = true,
                other if other.starts_with("--") => anyhow::bail!("Unknown option for dqdl: {}", other),
                other => models = Some(PathBuf::from(other)),
            }
        }
        let models = models.context("No models file provided\nUsage: contract-drafter dqdl <models-file>")?;
        Ok(Self { models, config, provider, verbose })
    }
}

fn path_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> anyhow::Result<PathBuf> {
    iter.next()
        .map(PathBuf::from)
        .with_context(|| format!("{} needs a file argument", flag))
}

fn provider_value<'a>(iter: &mut impl Iterator<Item = &'a String>) -> anyhow::Result<ProviderType> {
    let name = iter.next().context("--provider needs a provider name")?;
    name.parse::<ProviderType>().map_err(anyhow::Error::msg)
}

/// Settings file, with the provider preset swapped in when one was named
fn load_config(path: Option<&Path>, provider: Option<&ProviderType>) -> anyhow::Result<DrafterConfig> {
    let mut config = DrafterConfig::load(path)?;
    if let Some(provider) = provider {
        config.llm = LlmConfig::for_provider(provider.clone()).with_env_key();
    }
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read a JSON or YAML file into a JSON value
fn read_value(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = if is_yaml(path) {
        serde_yaml::from_str(&text)?
    } else {
        serde_json::from_str(&text)?
    };
    Ok(value)
}

fn write_document(document: &Document, path: &Path) -> anyhow::Result<()> {
    let rendered = if is_yaml(path) {
        serde_yaml::to_string(document)?
    } else {
        serde_json::to_string_pretty(document)?
    };
    std::fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))
}

fn build_model(config: &DrafterConfig) -> anyhow::Result<Arc<dyn ChatModel>> {
    let provider = LlmProvider::new(config.llm.clone())?;
    log::info!(
        "Using {:?} model {}",
        provider.config().provider,
        provider.config().model
    );
    Ok(Arc::new(provider))
}

fn run_draft(args: DraftArgs) -> anyhow::Result<()> {
    init_logging(args.verbose);
    let config = load_config(args.config.as_deref(), args.provider.as_ref())?;
    let model = build_model(&config)?;
    let prompts = LayeredPromptStore::with_overrides(config.prompts_dir.as_deref());

    let document = match &args.seed {
        Some(seed) => Document::from_seed(&read_value(seed)?),
        None => Document::new(),
    };
    let coordinator = Coordinator::new(model, &prompts, config.retry.clone());
    let mut session = Session::with_document(coordinator, document);

    let runtime = tokio::runtime::Runtime::new()?;
    println!("Drafting contract {}", session.document().id);
    println!("Describe your data product. /show prints the contract, /quit exits.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/show" => {
                println!("{}", serde_json::to_string_pretty(session.document())?);
                continue;
            }
            input => {
                let state = runtime.block_on(session.invoke(input));
                if let Some(reply) = state.last_reply() {
                    println!("{}", reply);
                }
                if let Some(error) = &state.error {
                    eprintln!("warning: {}", error);
                }
            }
        }

        if let Some(out) = &args.out {
            write_document(session.document(), out)?;
        }
    }

    if let Some(out) = &args.out {
        write_document(session.document(), out)?;
        println!("Contract written to {}", out.display());
    }
    Ok(())
}

fn run_dqdl(args: DqdlArgs) -> anyhow::Result<()> {
    init_logging(args.verbose);
    let config = load_config(args.config.as_deref(), args.provider.as_ref())?;

    // Either a bare models map or a whole contract
    let raw = read_value(&args.models)?;
    let body = raw
        .get("data_models")
        .or_else(|| raw.get("data_model"))
        .unwrap_or(&raw);
    let models: DataModels = normalize(body);

    let prompts = LayeredPromptStore::with_overrides(config.prompts_dir.as_deref());
    let translator = QualityTranslator::with_prompts(build_model(&config)?, &prompts)
        .with_timeout(config.retry.call_timeout());

    let runtime = tokio::runtime::Runtime::new()?;
    let rules = runtime.block_on(translator.translate_models(&models))?;
    println!("{}", rules);
    Ok(())
}
