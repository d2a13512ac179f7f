use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use codepath::config::AnswerFormat;
use codepath::format::render_answer;
use codepath::utils::analysis::graph::CodeGraph;
use codepath::utils::analysis::query::PathResolver;
use codepath::utils::analysis::store::GraphStore;
use codepath::utils::summary::{DEFAULT_DOCUMENT_LINES, write_documents};
use codepath::{GraphConfig, run, runner};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAnswerFormat {
    Json,
    #[value(alias = "md")]
    Markdown,
    Mermaid,
}

impl From<CliAnswerFormat> for AnswerFormat {
    fn from(f: CliAnswerFormat) -> Self {
        match f {
            CliAnswerFormat::Json => AnswerFormat::Json,
            CliAnswerFormat::Markdown => AnswerFormat::Markdown,
            CliAnswerFormat::Mermaid => AnswerFormat::Mermaid,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Code graph builder and query path resolver", long_about = None)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a repository and write its code graph
    Scan(ScanArgs),
    /// Connect seed node ids through the graph
    Resolve {
        /// Serialized graph
        #[arg(long)]
        graph: PathBuf,
        /// Answer format
        #[arg(short, long, value_enum)]
        format: Option<CliAnswerFormat>,
        /// Longest path, in hops, considered connected
        #[arg(long)]
        max_hops: Option<usize>,
        /// Seed node ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print graph statistics as JSON
    Stats {
        #[arg(long)]
        graph: PathBuf,
    },
    /// Print code snippets for node ids as JSON
    Snippet {
        #[arg(long)]
        graph: PathBuf,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Write one Markdown document per node
    Docs {
        #[arg(long)]
        graph: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "documents")]
        output: PathBuf,
        /// Code lines per document
        #[arg(long, default_value_t = DEFAULT_DOCUMENT_LINES)]
        max_lines: usize,
    },
    /// Rebuild the graph whenever a source file changes
    Watch {
        /// Repository root
        path: Option<PathBuf>,
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Repository root
    path: Option<PathBuf>,

    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Add ignore pattern (glob)
    #[arg(long)]
    ignore: Vec<String>,

    /// Add include pattern (glob) - only include matching files
    #[arg(long)]
    include: Vec<String>,

    /// Bytes read per file; larger files become whole-file nodes
    #[arg(long)]
    max_size: Option<u64>,

    /// Maximum directory depth to traverse
    #[arg(long)]
    max_depth: Option<usize>,

    /// Stop visiting new files after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Parser worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Parse cache file
    #[arg(long)]
    cache: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn apply_scan_args(config: &mut GraphConfig, args: ScanArgs) {
    if let Some(p) = args.path {
        config.path = p;
    }
    if let Some(o) = args.output {
        config.output = o;
    }
    if !args.ignore.is_empty() {
        // CLI ignores ADD to config ignores
        config.ignore_patterns.extend(args.ignore);
    }
    if !args.include.is_empty() {
        config.include_patterns = args.include;
    }
    if let Some(s) = args.max_size {
        config.max_file_size = s;
    }
    if let Some(d) = args.max_depth {
        config.max_depth = Some(d);
    }
    if let Some(t) = args.timeout {
        config.scan_timeout_secs = Some(t);
    }
    if let Some(t) = args.threads {
        config.threads = Some(t);
    }
    if let Some(c) = args.cache {
        config.cache = Some(c);
    }
}

fn load_graph(path: &Path) -> Result<CodeGraph> {
    CodeGraph::load(path).with_context(|| format!("Cannot load graph {:?}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load from file or default
    let mut config = GraphConfig::load_from_file().unwrap_or_default();
    if cli.verbose {
        config.verbose = true;
    }
    init_logging(config.verbose);

    // 2. Override with CLI args
    match cli.command {
        Command::Scan(args) => {
            apply_scan_args(&mut config, args);
            run(config)?;
        }
        Command::Resolve {
            graph,
            format,
            max_hops,
            ids,
        } => {
            let graph = load_graph(&graph)?;
            let answer = PathResolver::new(&graph)
                .with_max_hops(max_hops.or(config.max_path_length))
                .resolve(&ids);
            let format = format.map(AnswerFormat::from).unwrap_or_default();
            print!("{}", render_answer(&graph, &answer, format)?);
        }
        Command::Stats { graph } => {
            let graph = load_graph(&graph)?;
            println!("{}", serde_json::to_string_pretty(&graph.stats())?);
        }
        Command::Snippet { graph, ids } => {
            let graph = load_graph(&graph)?;
            println!("{}", serde_json::to_string_pretty(&graph.snippets(&ids))?);
        }
        Command::Docs {
            graph,
            output,
            max_lines,
        } => {
            let graph = load_graph(&graph)?;
            let written = write_documents(graph.nodes(), &output, max_lines)?;
            println!("Wrote {} documents to {:?}", written, output);
        }
        Command::Watch { path, output } => {
            if let Some(p) = path {
                config.path = p;
            }
            if let Some(o) = output {
                config.output = o;
            }
            let store = GraphStore::default().with_max_hops(config.max_path_length);
            runner::watch(config, &store)?;
        }
    }

    Ok(())
}
