use std::{
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use aila_index::IndexRegistry;
use aila_pipeline::{AnswerEvent, ConversationHistory, Pipeline};

#[derive(Debug, Parser)]
#[command(
	version = aila_cli::VERSION,
	rename_all = "kebab",
	styles = aila_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON array of `{"role": "user"|"assistant", "content": "..."}` turns.
	#[arg(long, value_name = "FILE")]
	pub history: Option<PathBuf>,
	/// Stream a final answer after printing the evidence bundle.
	#[arg(long)]
	pub answer: bool,
	/// Print the full run state and stage log instead of the evidence bundle.
	#[arg(long, conflicts_with = "answer")]
	pub trace: bool,
	pub query: String,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = aila_config::load(&args.config)?;
	init_tracing(&config)?;
	let history = match &args.history {
		Some(path) => load_history(path)?,
		None => Vec::new(),
	};
	let registry = IndexRegistry::from_config(&config)?;
	let pipeline = Pipeline::new(config, registry)?;

	if args.trace {
		let run = pipeline.execute(&args.query, history).await?;
		println!("{}", serde_json::to_string_pretty(&run)?);

		return Ok(());
	}

	let output = pipeline.run(&args.query, history).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);

	if args.answer {
		stream_answer(&pipeline, &args.query, &output).await?;
	}

	Ok(())
}

async fn stream_answer(
	pipeline: &Pipeline,
	user_message: &str,
	output: &aila_pipeline::RunOutput,
) -> color_eyre::Result<()> {
	let mut events = pipeline.stream_answer(user_message, output).await?;
	let mut stdout = io::stdout().lock();

	while let Some(event) = events.next().await {
		match event? {
			AnswerEvent::Delta { response } => {
				stdout.write_all(response.as_bytes())?;
				stdout.flush()?;
			},
			AnswerEvent::Done { status } => {
				writeln!(stdout)?;
				tracing::debug!(status, "Answer completed.");
			},
		}
	}

	Ok(())
}

fn load_history(path: &Path) -> color_eyre::Result<ConversationHistory> {
	let raw = fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read history {}: {err}", path.display()))?;

	Ok(serde_json::from_str(&raw)?)
}

fn init_tracing(config: &aila_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
	Ok(())
}
