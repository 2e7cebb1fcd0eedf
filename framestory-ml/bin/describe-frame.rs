use clap::Parser;
use framestory_ml::ModelSpec;
use framestory_ml::vision::{VisionLanguageModel, VisionModel};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    input: String,

    #[arg(long, default_value = "Describe what is happening in this image.")]
    prompt: String,

    #[arg(long, default_value = "vikhyatk/moondream2")]
    model: String,

    #[arg(long, default_value = "2024-03-06")]
    revision: String,

    #[arg(long, default_value_t = 200)]
    max_new_tokens: usize,

    #[arg(long, default_value_t = false)]
    cpu: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();
    let image = image::open(&cli.input)?;

    let spec = ModelSpec::new(cli.model, cli.revision);
    let mut model = VisionModel::load(&spec, cli.cpu).await?;

    let inputs = model.prepare_inputs(&image, &cli.prompt)?;
    let tokens = model.generate(&inputs, cli.max_new_tokens)?;
    println!("{}", model.decode(&tokens)?);

    Ok(())
}
