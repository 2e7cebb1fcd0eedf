use clap::Parser;
use framestory_ml::story::{StoryModel, TextGenerator};
use framestory_ml::{GenerateOptions, ModelSpec};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Prompt to generate from
    #[arg(
        long,
        default_value = "Write a short story: a crow drops a peanut, a squirrel catches it."
    )]
    prompt: String,

    /// Model to use
    #[arg(long, default_value = "google/flan-t5-large")]
    model: String,

    #[arg(long, default_value = "main")]
    revision: String,

    /// Max new tokens
    #[arg(long, default_value_t = 512)]
    max_new_tokens: usize,

    /// Temperature (0 = greedy)
    #[arg(long, default_value_t = 0.3)]
    temperature: f64,

    /// Top-p (optional)
    #[arg(long)]
    top_p: Option<f64>,

    /// PRNG seed
    #[arg(long, default_value_t = 299792458)]
    seed: u64,

    /// Penalty to be applied for repeating tokens (1.0 = no penalty)
    #[arg(long, default_value_t = 1.1)]
    repeat_penalty: f32,

    /// Context size considered for the repeat penalty
    #[arg(long, default_value_t = 64)]
    repeat_last_n: usize,

    #[arg(long, default_value_t = false)]
    cpu: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let args = Args::parse();

    let opts = GenerateOptions {
        max_new_tokens: args.max_new_tokens,
        temperature: args.temperature,
        top_p: args.top_p,
        seed: args.seed,
        repeat_penalty: args.repeat_penalty,
        repeat_last_n: args.repeat_last_n,
    };
    let spec = ModelSpec::new(args.model, args.revision);
    let mut model = StoryModel::load(&spec, opts, args.cpu).await?;

    let out = model.generate(&args.prompt)?;

    println!("{}", out.trim());
    Ok(())
}
