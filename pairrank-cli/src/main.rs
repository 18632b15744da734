mod config;
mod output;
mod parse;

use clap::Parser;
use pairrank_core::constants::{
    DEFAULT_APPEARANCES, DEFAULT_BLOCK_SIZE, DEFAULT_ITEMS_PER_DESIGN, DEFAULT_RANK_MEAN,
    DEFAULT_SAMPLING_LIMIT, DEFAULT_TOLERANCE,
};
use pairrank_core::{
    rank_with_options, DesignPlanner, PairHistory, PlannerConfig, RankOptions, SamplerConfig,
    Solver, WinTally,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Fresh draws tried before giving up on one design.
const MAX_DESIGN_ATTEMPTS: usize = 5;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "pairrank", version, about = "Plan pairwise image comparisons and rank the results")]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (default: ~/.config/pairrank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Generate block designs that never repeat a pair
    Design(DesignArgs),
    /// Rank items from recorded judgments
    Rank(RankArgs),
    /// Create a default config file at ~/.config/pairrank/config.toml
    Init,
}

#[derive(Parser)]
struct DesignArgs {
    /// Items with sample counts: JSON object or "id[,count]" lines
    #[arg(long)]
    items: PathBuf,

    /// Pairs already shown: JSON array or "a,b" lines
    #[arg(long)]
    history: Option<PathBuf>,

    /// Append the new pairs to the history file
    #[arg(long, requires = "history")]
    commit: bool,

    /// Number of designs to generate
    #[arg(long, default_value_t = 1)]
    designs: usize,

    /// Candidate items drawn per design
    #[arg(long)]
    items_per_design: Option<usize>,

    /// Items per block
    #[arg(long)]
    block_size: Option<usize>,

    /// Minimum blocks per drawn item
    #[arg(long)]
    appearances: Option<usize>,

    /// Sample count at which items stop being preferred
    #[arg(long)]
    limit: Option<u64>,

    /// Seed for reproducible draws
    #[arg(long)]
    seed: Option<u64>,

    /// Output JSON instead of table
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct RankArgs {
    /// Judgments as "winner,loser" lines or a JSON array (default: stdin)
    #[arg(long)]
    outcomes: Option<PathBuf>,

    /// Items to rank even without judgments
    #[arg(long)]
    items: Option<PathBuf>,

    /// Target mean score
    #[arg(long)]
    mean: Option<f64>,

    /// Relative residual tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Linear solver
    #[arg(long, value_enum)]
    solver: Option<SolverArg>,

    /// Output JSON instead of table
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SolverArg {
    Gmres,
    Direct,
}

impl From<SolverArg> for Solver {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Gmres => Solver::Gmres,
            SolverArg::Direct => Solver::Direct,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_file(path: &Path, what: &str) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read {what} file {}: {e}", path.display())))
}

fn load_items(path: &Path) -> BTreeMap<String, u64> {
    parse::parse_items(&read_file(path, "items"))
        .unwrap_or_else(|e| bail(format!("{}: {e}", path.display())))
}

/// Load the pair history. A missing file is an empty history.
fn load_history(path: &Path) -> (PairHistory<String>, bool) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return (PairHistory::new(), false),
        Err(e) => bail(format!("Failed to read history file {}: {e}", path.display())),
    };
    let pairs = parse::parse_pairs(&content)
        .unwrap_or_else(|e| bail(format!("{}: {e}", path.display())));
    (pairs.into_iter().collect(), parse::is_json_array(&content))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Design(args) => {
            let cfg = config::load_config(&cli.config.unwrap_or_else(config::config_path));
            match args.seed {
                Some(seed) => run_design(&args, &cfg, &mut ChaCha8Rng::seed_from_u64(seed)),
                None => run_design(&args, &cfg, &mut rand::rng()),
            }
        }
        Commands::Rank(args) => {
            let cfg = config::load_config(&cli.config.unwrap_or_else(config::config_path));
            run_rank(&args, &cfg);
        }
        Commands::Init => {
            let path = config::create_default_config();
            println!("Created config at {}", path.display());
            println!("Edit it to set your default design and ranking parameters.");
        }
    }
}

fn run_design<R: Rng + ?Sized>(args: &DesignArgs, cfg: &config::PairrankConfig, rng: &mut R) {
    let items = load_items(&args.items);
    let planner_config = PlannerConfig {
        items_per_design: args
            .items_per_design
            .or(cfg.items_per_design)
            .unwrap_or(DEFAULT_ITEMS_PER_DESIGN)
            .min(items.len()),
        block_size: args.block_size.or(cfg.block_size).unwrap_or(DEFAULT_BLOCK_SIZE),
        appearances: args.appearances.or(cfg.appearances).unwrap_or(DEFAULT_APPEARANCES),
        sampling: SamplerConfig {
            limit: args.limit.or(cfg.sampling_limit).unwrap_or(DEFAULT_SAMPLING_LIMIT),
            ..SamplerConfig::default()
        },
    };
    if planner_config.items_per_design < planner_config.block_size {
        bail(format!(
            "Need at least {} items for blocks of {}, got {}",
            planner_config.block_size,
            planner_config.block_size,
            planner_config.items_per_design,
        ));
    }

    let (mut history, history_is_json) = match args.history.as_deref() {
        Some(path) => load_history(path),
        None => (PairHistory::new(), false),
    };
    info!(
        items = items.len(),
        known_pairs = history.len(),
        items_per_design = planner_config.items_per_design,
        block_size = planner_config.block_size,
        appearances = planner_config.appearances,
        "planning designs"
    );

    let mut planner = DesignPlanner::new(&items, planner_config, rng).unwrap_or_else(|e| bail(e));
    let mut designs = Vec::with_capacity(args.designs);
    let mut new_pairs: Vec<(String, String)> = Vec::new();

    for d in 0..args.designs {
        let mut attempt = 0;
        let design = loop {
            attempt += 1;
            match planner.next_design(&history, rng).unwrap_or_else(|e| bail(e)) {
                Some(design) => break design,
                None if attempt < MAX_DESIGN_ATTEMPTS => {
                    debug!(design = d + 1, attempt, "retrying with a fresh draw");
                }
                None => bail(format!(
                    "Could not generate design {} after {MAX_DESIGN_ATTEMPTS} draws. \
                     The pair history may be exhausted; try more items or fewer appearances.",
                    d + 1
                )),
            }
        };
        for pair in design.pairs() {
            let (a, b) = pair.into_inner();
            if history.insert(a.clone(), b.clone()) {
                new_pairs.push((a, b));
            }
        }
        designs.push(design);
    }

    let sampler = planner.sampler();
    info!(
        unsampled = sampler.unsampled_count(),
        samples_remaining = sampler.samples_remaining(),
        saturated = sampler.is_saturated(),
        "sampler state"
    );

    if args.commit {
        if let Some(path) = args.history.as_deref() {
            commit_history(path, &history, &new_pairs, history_is_json);
        }
    }

    if args.json {
        output::print_design_json(&designs, new_pairs.len());
    } else {
        output::print_design_table(&designs, new_pairs.len());
    }
}

/// Persist new pairs: line files are appended, JSON files rewritten whole.
fn commit_history(path: &Path, history: &PairHistory<String>, new_pairs: &[(String, String)], as_json: bool) {
    let result = if as_json {
        let mut all: Vec<(&String, &String)> = history.iter().map(|p| (p.first(), p.second())).collect();
        all.sort();
        serde_json::to_string_pretty(&all)
            .map_err(io::Error::other)
            .and_then(|text| std::fs::write(path, text + "\n"))
    } else {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(parse::format_pair_lines(new_pairs).as_bytes()))
    };
    result.unwrap_or_else(|e| bail(format!("Failed to write history file {}: {e}", path.display())));
    info!(path = %path.display(), new_pairs = new_pairs.len(), "committed pair history");
}

fn read_outcomes(args: &RankArgs) -> Vec<(String, String)> {
    let content = match args.outcomes.as_deref() {
        Some(path) => read_file(path, "outcomes"),
        None => {
            let mut stdin = io::stdin();
            if stdin.is_terminal() {
                bail("No outcomes provided. Use --outcomes <file> or pipe \"winner,loser\" lines via stdin.");
            }
            let mut content = String::new();
            stdin
                .read_to_string(&mut content)
                .unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
            content
        }
    };
    parse::parse_pairs(&content).unwrap_or_else(|e| bail(format!("outcomes: {e}")))
}

fn run_rank(args: &RankArgs, cfg: &config::PairrankConfig) {
    let options = RankOptions {
        mean: args.mean.or(cfg.mean).unwrap_or(DEFAULT_RANK_MEAN),
        tolerance: args.tolerance.or(cfg.tolerance).unwrap_or(DEFAULT_TOLERANCE),
        solver: args.solver.map(Solver::from).or(cfg.solver).unwrap_or_default(),
        ..RankOptions::default()
    };

    let outcomes = read_outcomes(args);
    let mut tally = match args.items.as_deref() {
        Some(path) => {
            let items = load_items(path);
            for id in parse::unknown_items(&outcomes, &items) {
                warn!(item = id, "judged item missing from items file");
            }
            let ids: Vec<String> = items.into_keys().collect();
            WinTally::with_items(&ids).unwrap_or_else(|e| bail(e))
        }
        None => WinTally::new(),
    };
    for (winner, loser) in &outcomes {
        tally.record(winner, loser).unwrap_or_else(|e| bail(e));
    }
    if tally.is_empty() && args.items.is_none() {
        bail("No judgments to rank.");
    }

    let (ids, w) = tally.finish().unwrap_or_else(|e| bail(e));
    info!(items = ids.len(), judgments = outcomes.len(), solver = ?options.solver, "ranking");
    let outcome = rank_with_options(&w, &options).unwrap_or_else(|e| bail(e));

    let ranked = output::ranked_items(&ids, &outcome, &w.comparisons_per_item());
    if args.json {
        output::print_rank_json(&ranked, &outcome, w.total_comparisons());
    } else {
        output::print_rank_table(&ranked, &outcome, w.total_comparisons());
    }
}
