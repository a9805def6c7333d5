use clap::{Args, Parser, Subcommand};
use rrdgraph_compiler::config::GraphConfig;
use rrdgraph_compiler::expr::TemplateEvaluator;
use rrdgraph_compiler::render::{RrdtoolCommand, SerializedEngine};
use rrdgraph_compiler::{CompiledGraph, ErrorClass, GraphError, ImageFormat, compile};
use tracing::info;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "rrdgraph-compile")]
#[command(about = "Compile rrdtool graph requests into engine arguments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated argument vector.
    Args {
        #[command(flatten)]
        input: Input,

        /// Print `{format, content_type, args}` as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Compile and run the engine, writing the image.
    Render {
        #[command(flatten)]
        input: Input,

        #[arg(short = 'o', long)]
        out: String,

        #[arg(long, default_value = "rrdtool")]
        rrdtool: String,
    },
}

#[derive(Args)]
struct Input {
    /// Administrator defaults (graph.json).
    #[arg(long)]
    config: String,

    /// Request query, e.g. `DEF:a=*.rrd:in:AVERAGE&LINE1:a#00ff00:In`.
    #[arg(long, default_value = "")]
    query: String,

    /// Requested file name; its extension picks the format when none is fixed.
    #[arg(long)]
    path: Option<String>,

    /// Output format, overriding configuration.
    #[arg(long)]
    format: Option<ImageFormat>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.cmd) {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<GraphError>() {
            Some(graph) => {
                let class = graph.class();
                eprintln!("{} error: {}", class.as_str(), graph);
                std::process::exit(match class {
                    ErrorClass::Request => 2,
                    ErrorClass::Server => 1,
                });
            }
            None => Err(err),
        },
    }
}

fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Args { input, json } => {
            let compiled = compile_input(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&compiled)?);
            } else {
                for arg in &compiled.args {
                    println!("{}", arg);
                }
            }
        }
        Commands::Render {
            input,
            out,
            rrdtool,
        } => {
            let compiled = compile_input(&input)?;
            let engine = SerializedEngine::new(RrdtoolCommand::new(rrdtool));
            let image = engine.render(&compiled.args)?;
            std::fs::write(&out, &image)?;
            println!("Wrote {} ({})", out, compiled.content_type);
        }
    }
    Ok(())
}

fn compile_input(input: &Input) -> Result<CompiledGraph> {
    use anyhow::bail;

    let config = GraphConfig::from_path(&input.config)?;
    let base = config.validate_and_build()?;

    let format = input
        .format
        .or(base.format)
        .or_else(|| input.path.as_deref().and_then(ImageFormat::from_path_suffix));
    let Some(format) = format else {
        bail!("no image format: configure one or request a path with a known suffix");
    };

    let evaluator = TemplateEvaluator::new()?;
    let matcher = config.matcher();
    let mut request = config.request_context();
    let compiled = compile(&base, &input.query, format, &matcher, &evaluator, &mut request)?;
    info!("compiled {} argument(s) as {}", compiled.args.len(), format);
    Ok(compiled)
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
