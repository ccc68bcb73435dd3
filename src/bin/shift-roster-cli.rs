#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shift_roster::{
    io,
    scheduler::{Scheduler, Severity, SolveOptions, SolverConfig},
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Générateur de plannings mensuels en ligne de commande
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calculer un planning
    Solve {
        /// Requête JSON (year, month, targetOffDays, staff...)
        #[arg(long)]
        request: String,
        /// Réponse JSON (sinon sur stdout)
        #[arg(long)]
        out: Option<String>,
        /// Export CSV de la grille
        #[arg(long)]
        csv: Option<String>,
        /// Réglages du moteur (JSON partiel)
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Répartit les tentatives sur plusieurs threads
        #[arg(long)]
        parallel: bool,
        /// Remplace maxAttempts de la requête
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Vérifier une grille existante
    Check {
        #[arg(long)]
        request: String,
        #[arg(long)]
        response: String,
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Normaliser une liste de jours ("1,2,３")
    ParseDays { input: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    let code = match cli.cmd {
        Commands::Solve {
            request,
            out,
            csv,
            config,
            seed,
            parallel,
            max_attempts,
        } => {
            let mut request = io::load_request_json(&request)?;
            if let Some(n) = max_attempts {
                request.max_attempts = n;
            }
            let config = match config {
                Some(path) => io::load_config_json(path)?,
                None => SolverConfig::default(),
            };
            let scheduler = Scheduler::with_config(&request, config)?;
            let solution = scheduler.solve(SolveOptions { seed, parallel });
            let response = solution.to_response(scheduler.context());

            match out {
                Some(path) => io::write_response_json(path, &response)?,
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&response).context("serializing response")?
                ),
            }
            if let Some(path) = csv {
                io::export_schedule_csv(path, &response)?;
            }
            for diag in &solution.diagnostics {
                eprintln!("{diag}");
            }
            eprintln!(
                "penalty {} after {} attempt(s)",
                solution.penalty, solution.attempts
            );
            // Code 2 = planning incomplet
            if solution.has_errors() {
                2
            } else {
                0
            }
        }
        Commands::Check {
            request,
            response,
            report,
        } => {
            let request = io::load_request_json(&request)?;
            let response = io::load_response_json(&response)?;
            let scheduler = Scheduler::new(&request)?;
            let schedule = scheduler.schedule_from_response(&response)?;

            let conflicts = scheduler.detect_conflicts(&schedule);
            let diagnostics = scheduler.diagnostics(&schedule);
            for diag in diagnostics.iter().filter(|d| d.severity() >= Severity::Warning) {
                eprintln!("{diag}");
            }
            println!("penalty {}", scheduler.penalty(&schedule));

            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                for c in &conflicts {
                    eprintln!("{} day {}: {}", c.staff, c.day + 1, c.kind.as_str());
                }
                if let Some(path) = report {
                    io::export_conflicts_csv(path, &conflicts)?;
                }
                2
            }
        }
        Commands::ParseDays { input } => {
            let days: Vec<String> = io::parse_days(&input).iter().map(u32::to_string).collect();
            println!("{}", days.join(","));
            0
        }
    };

    std::process::exit(code);
}
