// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// driftprobe — adversarial image variants and score-drift evaluation.
//
// Entry point. Initialises logging, parses the command line, and dispatches
// to `generate` or `evaluate`.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use driftprobe_core::types::TransformKind;
use driftprobe_eval::Suite;

#[derive(Parser)]
#[command(name = "driftprobe")]
#[command(version, about = "Probe an image-authenticity classifier with adversarial variants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the standard variant set from a real and a fake image
    Generate {
        /// Known-authentic source image
        #[arg(long, value_name = "JPG")]
        real: PathBuf,

        /// Known-manipulated source image
        #[arg(long, value_name = "JPG")]
        fake: PathBuf,

        /// Output directory for variants and variants.json
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Configuration file (JSON); defaults apply to missing fields
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Only generate these transforms (hflip, jpeg_recompress,
        /// resize_down_up, skin_smooth, freq_inject)
        #[arg(long, value_name = "NAME", value_parser = parse_transform)]
        only: Vec<TransformKind>,

        /// Number of parallel threads
        #[arg(short = 'j', long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Submit fixtures to the detector and evaluate verdicts against baselines
    Evaluate {
        /// Data directory holding fake.jpeg, real.jpg and variants/
        #[arg(short, long, value_name = "DIR")]
        data: PathBuf,

        /// Replay table (JSON) answering detection requests offline
        #[arg(long, value_name = "FILE")]
        replay: PathBuf,

        /// Suite to run
        #[arg(short, long, value_enum, default_value_t = SuiteArg::All)]
        suite: SuiteArg,

        /// Detection service API key
        #[arg(long, env = "DRIFTPROBE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Configuration file (JSON); defaults apply to missing fields
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SuiteArg {
    All,
    Detection,
    Evasion,
    FalsePositive,
    Edge,
}

impl SuiteArg {
    fn suites(self) -> Vec<Suite> {
        match self {
            Self::All => Suite::ALL.to_vec(),
            Self::Detection => vec![Suite::Detection],
            Self::Evasion => vec![Suite::Evasion],
            Self::FalsePositive => vec![Suite::FalsePositive],
            Self::Edge => vec![Suite::Edge],
        }
    }
}

fn parse_transform(name: &str) -> Result<TransformKind, String> {
    TransformKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = TransformKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown transform '{name}' (expected one of: {})", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            real,
            fake,
            out,
            config,
            only,
            threads,
        } => commands::generate::cmd_generate(commands::generate::GenerateArgs {
            real,
            fake,
            out,
            config,
            only,
            threads,
        })
        .map(|()| ExitCode::SUCCESS),
        Commands::Evaluate {
            data,
            replay,
            suite,
            api_key,
            config,
        } => {
            commands::evaluate::cmd_evaluate(commands::evaluate::EvaluateArgs {
                data,
                replay,
                suites: suite.suites(),
                api_key,
                config,
            })
            .await
            .map(|passed| {
                if passed {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(1)
                }
            })
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "driftprobe failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
