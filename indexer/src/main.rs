mod input;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use input::DocumentStream;
use report::{render_blocks, render_comparison, render_compression, render_query, StrategyTiming};
use spimi_core::persist::{load_all, save_doc_id_map, save_index, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use spimi_core::spimi::merge_blocks;
use spimi_core::{
    Analyzer, BlockAccumulator, BlockStore, CompressionReport, DocId, IndexConfig, InvertedIndex, Pipeline, PipelineConfig,
    PostingCollector, QueryEvaluator, SpimiReport, Strategy,
};
use tracing_subscriber::{fmt, EnvFilter};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, compare and query term-to-document inverted indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct BuildOpts {
    /// JSON config file (tokenizer, pipeline, budget)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pipeline preset (`uncompressed`, `compressed`) or comma-separated stage list
    #[arg(long)]
    pipeline: Option<String>,
    /// Flush a SPIMI block after this many documents
    #[arg(long)]
    max_docs: Option<usize>,
    /// Flush a SPIMI block once it holds this many distinct terms
    #[arg(long)]
    max_terms: Option<usize>,
    /// Flush a SPIMI block once it holds this many postings
    #[arg(long)]
    max_postings: Option<usize>,
    /// NFKC-normalize text before tokenizing
    #[arg(long, default_value_t = false)]
    nfkc: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from JSON/JSONL documents and persist it
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// `traditional` or `spimi`
        #[arg(long, default_value = "spimi")]
        strategy: String,
        /// Write SPIMI blocks to disk before merging
        #[arg(long, default_value_t = false)]
        spill: bool,
        #[command(flatten)]
        opts: BuildOpts,
    },
    /// Build with both strategies, time them and check the results are identical
    Compare {
        #[arg(long)]
        input: PathBuf,
        /// Queries to run against both indexes; terms inside one query are ANDed
        #[arg(long = "query", short = 'q')]
        queries: Vec<String>,
        /// Also write the SPIMI block report as JSON
        #[arg(long)]
        report_json: Option<PathBuf>,
        #[command(flatten)]
        opts: BuildOpts,
    },
    /// Measure vocabulary reduction after each normalization stage.
    /// Uses the configured stage list (`--pipeline` or the config file), all stages when empty.
    Compress {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        opts: BuildOpts,
    },
    /// Run a term or AND query against a persisted index
    Query {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        /// Query terms (ANDed)
        #[arg(required = true)]
        terms: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, strategy, spill, opts } => {
            let strategy: Strategy = strategy.parse()?;
            let config = resolve_config(&opts)?;
            build_command(&input, &output, strategy, &config, spill)
        }
        Commands::Compare { input, queries, report_json, opts } => {
            let config = resolve_config(&opts)?;
            compare_command(&input, &config, &queries, report_json.as_deref())
        }
        Commands::Compress { input, opts } => {
            let config = resolve_config(&opts)?;
            compress_command(&input, &config)
        }
        Commands::Query { index, terms } => query_command(&index, &terms),
    }
}

/// Config file first, then command-line overrides; validated before any input is read.
fn resolve_config(opts: &BuildOpts) -> Result<IndexConfig> {
    let mut config = match &opts.config {
        Some(path) => IndexConfig::from_file(path)?,
        None => IndexConfig::default(),
    };
    if let Some(stages) = &opts.pipeline {
        let parsed = PipelineConfig::parse(stages)?;
        config.pipeline.stages = parsed.stages;
    }
    if opts.max_docs.is_some() {
        config.budget.max_docs = opts.max_docs;
    }
    if opts.max_terms.is_some() {
        config.budget.max_terms = opts.max_terms;
    }
    if opts.max_postings.is_some() {
        config.budget.max_postings = opts.max_postings;
    }
    if opts.nfkc {
        config.tokenizer.nfkc = true;
    }
    config.validate()?;
    Ok(config)
}

struct Built {
    index: InvertedIndex,
    doc_id_map: HashMap<String, DocId>,
    spimi: Option<SpimiReport>,
    elapsed: Duration,
}

fn build(input: &Path, strategy: Strategy, config: &IndexConfig, analyzer: &Analyzer, spill_dir: Option<PathBuf>) -> Result<Built> {
    let started = Instant::now();
    let mut stream = DocumentStream::open(input)?;
    let (index, spimi) = match strategy {
        Strategy::Traditional => {
            let mut collector = PostingCollector::new(analyzer);
            for record in stream.by_ref() {
                collector.add_document(&record?.doc)?;
            }
            tracing::info!(pairs = collector.len(), "collected term-document pairs");
            (collector.build(), None)
        }
        Strategy::Spimi => {
            let store = match spill_dir {
                Some(dir) => BlockStore::spill_to(dir)?,
                None => BlockStore::in_memory(),
            };
            let mut acc = BlockAccumulator::new(analyzer, config.budget, store)?;
            for record in stream.by_ref() {
                acc.add_document(&record?.doc)?;
            }
            let (store, blocks, num_docs) = acc.finish()?;
            let accumulate_elapsed = started.elapsed();
            let merge_started = Instant::now();
            let index = merge_blocks(store, num_docs)?;
            let report = SpimiReport { blocks, accumulate_elapsed, merge_elapsed: merge_started.elapsed() };
            (index, Some(report))
        }
    };
    let elapsed = started.elapsed();
    tracing::info!(strategy = strategy.as_str(), num_docs = index.num_docs(), num_terms = index.num_terms(), elapsed_ms = elapsed.as_millis() as u64, "index built");
    Ok(Built { index, doc_id_map: stream.into_doc_id_map(), spimi, elapsed })
}

fn build_command(input: &Path, output: &Path, strategy: Strategy, config: &IndexConfig, spill: bool) -> Result<()> {
    let analyzer = Analyzer::from_config(&config.tokenizer, &config.pipeline)?;
    let out_paths = IndexPaths::new(output);
    let spill_dir = spill.then(|| out_paths.blocks_dir());
    let built = build(input, strategy, config, &analyzer, spill_dir)?;
    if let Some(report) = &built.spimi {
        print!("{}", render_blocks(report));
    }

    save_index(&out_paths, &built.index)?;
    save_doc_id_map(&out_paths, &built.doc_id_map)?;
    let meta = MetaFile {
        num_docs: built.index.num_docs(),
        num_terms: built.index.num_terms(),
        num_postings: built.index.num_postings(),
        strategy: strategy.as_str().to_string(),
        config: config.clone(),
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

fn compare_command(input: &Path, config: &IndexConfig, queries: &[String], report_json: Option<&Path>) -> Result<()> {
    let analyzer = Analyzer::from_config(&config.tokenizer, &config.pipeline)?;
    let traditional = build(input, Strategy::Traditional, config, &analyzer, None)?;
    let spimi = build(input, Strategy::Spimi, config, &analyzer, None)?;
    let identical = traditional.index == spimi.index;
    if !identical {
        tracing::warn!("traditional and SPIMI indexes differ");
    }

    let timing = |name, b: &Built| StrategyTiming { name, elapsed: b.elapsed, terms: b.index.num_terms(), postings: b.index.num_postings() };
    println!("{}", render_comparison(&[timing("traditional", &traditional), timing("spimi", &spimi)], identical));
    if let Some(report) = &spimi.spimi {
        println!("{}", render_blocks(report));
        if let Some(path) = report_json {
            std::fs::write(path, serde_json::to_string_pretty(report)?).with_context(|| format!("writing {}", path.display()))?;
        }
    }

    let external = invert(&traditional.doc_id_map);
    for q in queries {
        let terms: Vec<String> = q.split_whitespace().map(str::to_string).collect();
        for (label, built) in [("traditional", &traditional), ("spimi", &spimi)] {
            let result = QueryEvaluator::new(&built.index, &analyzer).and(&terms);
            println!("{}", render_query(label, &terms, &result, |id| external.get(&id).cloned()));
        }
    }
    Ok(())
}

fn compress_command(input: &Path, config: &IndexConfig) -> Result<()> {
    // Build raw, then apply the stages to the dictionary one at a time.
    let raw = Analyzer::from_config(&config.tokenizer, &PipelineConfig::uncompressed())?;
    let built = build(input, Strategy::Traditional, config, &raw, None)?;
    let pipeline = Pipeline::from_config(&compression_stages(&config.pipeline))?;
    let report = CompressionReport::measure(&built.index, pipeline.stages());
    print!("{}", render_compression(&report));
    Ok(())
}

/// The configured stage list, or every stage when none is configured.
fn compression_stages(pipeline: &PipelineConfig) -> PipelineConfig {
    if pipeline.stages.is_empty() {
        PipelineConfig { stages: PipelineConfig::compressed().stages, ..pipeline.clone() }
    } else {
        pipeline.clone()
    }
}

fn query_command(index_dir: &Path, terms: &[String]) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let (index, meta, doc_id_map) = load_all(&paths).with_context(|| format!("loading index from {}", index_dir.display()))?;
    let analyzer = Analyzer::from_config(&meta.config.tokenizer, &meta.config.pipeline)?;
    let result = QueryEvaluator::new(&index, &analyzer).and(terms);
    let external = invert(&doc_id_map);
    println!("{}", render_query(&meta.strategy, terms, &result, |id| external.get(&id).cloned()));
    Ok(())
}

fn invert(map: &HashMap<String, DocId>) -> HashMap<DocId, String> {
    map.iter().map(|(ext, id)| (*id, ext.clone())).collect()
}
