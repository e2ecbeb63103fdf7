use clap::Parser;
use form_filler::cli::commands::{FillOptions, cmd_fill, cmd_inspect, cmd_preview};
use form_filler::cli::config::{Cli, Commands, load_config};
use form_filler::trace::logger::TraceLogger;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let session_options = config.session_options(cli.server_script.as_deref(), cli.headed);

    match cli.command {
        Commands::Fill {
            url,
            data,
            resume,
            multi_step,
            skip_validation,
            no_match,
            threshold,
            format,
            submit,
        } => {
            let engine = config.engine_config(threshold);
            let tracer = TraceLogger::from_path(config.trace.path.as_deref());
            let opts = FillOptions {
                url: &url,
                data: &data,
                resume: resume.as_deref(),
                multi_step,
                skip_validation,
                no_match,
                format: &format,
                submit,
            };
            let success = cmd_fill(&opts, &session_options, &engine, tracer)?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Preview {
            url,
            data,
            threshold,
            format,
        } => {
            let engine = config.engine_config(threshold);
            cmd_preview(&url, &data, &format, &session_options, &engine)?;
        }
        Commands::Inspect { url, format } => {
            let engine = config.engine_config(None);
            cmd_inspect(&url, &format, &session_options, &engine)?;
        }
    }

    Ok(())
}

/// `-v` info, `-vv` debug, `-vvv` trace; `RUST_LOG` wins when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
