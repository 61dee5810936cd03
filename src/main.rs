use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hedges::counters::{INFINITIVE, PARTICIPLE, matching_tokens};
use hedges::pipeline::{annotator_from_config, count_conllu_file, export_conllu, parsed_rows, repopulate, run};
use hedges::{PipelineConfig, RangeMode};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "hedges", about = "Count potential optatives in the speeches of Thucydides")]
struct Cli {
    #[command(flatten)]
    inputs: Inputs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Inputs {
    /// TEI edition of the text
    #[arg(long, global = true)]
    text: Option<PathBuf>,

    /// Speech table (TSV with start, end, speaker, location)
    #[arg(long, global = true)]
    speeches: Option<PathBuf>,

    /// Parse cache file
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Parser model name, recorded in the cache
    #[arg(long, global = true)]
    model: Option<String>,

    /// Parser program: reads passage text on stdin, writes CoNLL-U
    #[arg(long, global = true)]
    parser: Option<String>,

    /// Argument passed to the parser program (repeatable)
    #[arg(long = "parser-arg", global = true, allow_hyphen_values = true)]
    parser_args: Vec<String>,

    /// Match speeches in document order instead of level by level
    #[arg(long, global = true)]
    ordered_ranges: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the corpus, parse every passage and write the cache
    Populate,
    /// Count potential optatives, per speech or for one speech
    Count {
        /// Only report this speech
        #[arg(long)]
        speech: Option<u32>,

        /// List candidate participles and infinitives for manual review
        #[arg(long)]
        candidates: bool,
    },
    /// Write the cached parses as CoNLL-U (gzip-compressed for .gz paths)
    Export {
        /// Output file
        output: PathBuf,
    },
    /// Count potential optatives in a CoNLL-U file (plain or .gz)
    CountConllu {
        /// CoNLL-U file
        path: PathBuf,
    },
}

impl Inputs {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(text) = self.text {
            config.text_path = text;
        }
        if let Some(speeches) = self.speeches {
            config.speeches_path = speeches;
        }
        if let Some(cache) = self.cache {
            config.cache_path = cache;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(parser) = self.parser {
            config.parser_command = std::iter::once(parser).chain(self.parser_args).collect();
        }
        if self.ordered_ranges {
            config.range_mode = RangeMode::Ordered;
        }
        config
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.inputs.into_config();
    let mut annotator = annotator_from_config(&config);

    match cli.command {
        Command::Populate => {
            let rows = repopulate(&config, &mut annotator)
                .with_context(|| format!("populating {}", config.cache_path.display()))?;
            println!("parsed {} passages into {}", rows.len(), config.cache_path.display());
        }
        Command::Count { speech, candidates } => {
            let table = run(&config, &mut annotator).context("counting potential optatives")?;
            match speech {
                Some(id) => {
                    let summary = table.speech(id);
                    println!("passages\ttokens\tn_pot_opt\tn?_part_opt\tn?_inf_opt");
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        summary.passages,
                        summary.tokens,
                        summary.counts.n_pot_opt,
                        summary.counts.n_part_opt_candidate,
                        summary.counts.n_inf_opt_candidate
                    );
                }
                None => print!("{}", table.speech_report()),
            }

            if candidates {
                for row in table.filter(|r| speech.is_none() || r.parsed.row.speech_id == speech) {
                    let parse = &row.parsed.parsed_passage;
                    for (kind, test) in [("part", PARTICIPLE), ("inf", INFINITIVE)] {
                        for form in matching_tokens(parse, test) {
                            println!("{}\t{}\t{}", row.parsed.row.reference, kind, form);
                        }
                    }
                }
            }
        }
        Command::Export { output } => {
            let rows = parsed_rows(&config, &mut annotator).context("loading parses")?;
            let sentences = export_conllu(&rows, &output).with_context(|| format!("exporting {}", output.display()))?;
            println!("wrote {} sentences to {}", sentences, output.display());
        }
        Command::CountConllu { path } => {
            let counts = count_conllu_file(&path).with_context(|| format!("counting {}", path.display()))?;
            println!("n_pot_opt\tn?_part_opt\tn?_inf_opt");
            println!(
                "{}\t{}\t{}",
                counts.n_pot_opt, counts.n_part_opt_candidate, counts.n_inf_opt_candidate
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
