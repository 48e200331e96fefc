use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::fs;

use ibmalign_core::types::{Token, DEFAULT_PRECISION};
use ibmalign_core::{
    render_matrix, write_moses, AlignmentPairSet, BidirectionalModel, Corpus, TrainOptions, Vocab,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source-language sentences, one per line ("-" for stdin)
    #[arg(short = 's', long = "source")]
    source: Option<String>,
    /// Target-language sentences, one per line ("-" for stdin)
    #[arg(short = 't', long = "target")]
    target: Option<String>,
    /// Single file of "target<TAB>source" lines instead of -s/-t
    #[arg(long, conflicts_with_all = ["source", "target"])]
    tsv: Option<String>,
    #[arg(short = 'i', long, default_value_t = 10)]
    iterations: usize,
    #[arg(long, default_value_t = DEFAULT_PRECISION)]
    precision: u32,
    /// Write forward (target <- source) links here
    #[arg(short = 'f', long = "forward")]
    links_fwd: Option<String>,
    /// Write backward (source <- target) links here
    #[arg(short = 'r', long = "reverse")]
    links_rev: Option<String>,
    /// Symmetrized links
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,
    #[arg(long)]
    save_model: Option<String>,
    /// Skip training and decode with a saved model
    #[arg(long)]
    load_model: Option<String>,
    /// Print an alignment matrix per sentence to stderr
    #[arg(long, default_value_t = false)]
    matrix: bool,
    /// Train the two directions one after the other
    #[arg(long, default_value_t = false)]
    sequential: bool,
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn read_all(path: &str) -> std::io::Result<String> {
    if path == "-" {
        use std::io::Read;
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        Ok(s)
    } else {
        fs::read_to_string(path)
    }
}

fn write_all(path: &str, data: &str) -> std::io::Result<()> {
    if path == "-" {
        print!("{data}");
        Ok(())
    } else {
        fs::write(path, data)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_corpus(args: &Args) -> Result<Corpus> {
    if let Some(path) = &args.tsv {
        let text = read_all(path).with_context(|| format!("reading {path}"))?;
        return Ok(Corpus::from_tsv(&text)?);
    }
    let (Some(source), Some(target)) = (&args.source, &args.target) else {
        bail!("either --tsv or both --source and --target are required");
    };
    if source == "-" && target == "-" {
        bail!("source and target cannot both be read from stdin");
    }
    let src = read_all(source).with_context(|| format!("reading {source}"))?;
    let tgt = read_all(target).with_context(|| format!("reading {target}"))?;
    Ok(Corpus::from_parallel(&tgt, &src)?)
}

fn words<'a>(vocab: &'a Vocab, tokens: &[Token]) -> Vec<&'a str> {
    tokens.iter().map(|&t| vocab.word(t).unwrap_or("<unk>")).collect()
}

fn train(corpus: &Corpus, args: &Args) -> Result<BidirectionalModel> {
    let opts = TrainOptions {
        iterations: args.iterations,
        precision: args.precision,
        parallel: !args.sequential,
        cancel: None,
    };
    match BidirectionalModel::train(corpus, &opts) {
        Ok(m) => Ok(m),
        Err(e) if e.is_degenerate() => bail!(
            "{e}\nthe corpus has a word that never co-occurs with any partner; \
             check for empty lines or misaligned source/target files"
        ),
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let corpus = load_corpus(&args)?;
    info!("loaded {} sentence pairs ({} with an empty side)", corpus.len(), corpus.empty_pairs());

    let model = match &args.load_model {
        Some(path) => BidirectionalModel::load(path).with_context(|| format!("loading {path}"))?,
        None => train(&corpus, &args)?,
    };
    if let Some(path) = &args.save_model {
        model.save(path).with_context(|| format!("saving {path}"))?;
    }

    let texts: Vec<(String, String)> = corpus
        .pairs()
        .iter()
        .map(|p| {
            (
                words(corpus.target_vocab(), &p.target).join(" "),
                words(corpus.source_vocab(), &p.source).join(" "),
            )
        })
        .collect();

    if let Some(path) = &args.links_fwd {
        let mut sets = Vec::with_capacity(texts.len());
        for (tgt, src) in &texts {
            sets.push(model.forward_alignment(tgt, src)?.pairs().collect::<AlignmentPairSet>());
        }
        write_all(path, &write_moses(&sets))?;
    }
    if let Some(path) = &args.links_rev {
        let mut sets = Vec::with_capacity(texts.len());
        for (tgt, src) in &texts {
            let bwd = model.backward_alignment(tgt, src)?;
            sets.push(bwd.pairs().map(|(j, i)| (i, j)).collect::<AlignmentPairSet>());
        }
        write_all(path, &write_moses(&sets))?;
    }

    let merged = model.align_corpus(&corpus);
    write_all(&args.output, &write_moses(&merged))?;

    if args.matrix {
        for (pair, links) in corpus.pairs().iter().zip(&merged) {
            let tgt = words(corpus.target_vocab(), &pair.target);
            let src = words(corpus.source_vocab(), &pair.source);
            eprintln!("{}", render_matrix(&tgt, &src, links));
        }
    }

    Ok(())
}
