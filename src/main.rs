// Broken-link checker CLI.
//
// Serves the given project directory through ./serve.js, crawls it starting
// from the base URL (plus the 404 pages, which must themselves be reachable),
// and exits nonzero if anything is broken.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;

use sitecheck::policy::DocsPolicy;
use sitecheck::seeds;
use sitecheck::server::StaticServer;
use sitecheck::urlref::netloc;
use sitecheck::Checker;

/// Recursive broken-link checker for a locally served static site.
#[derive(Parser)]
#[command(name = "sitecheck", version, about)]
struct Args {
    /// Directory containing the built site to serve and check
    projdir: PathBuf,

    /// Base URL the static server listens on
    #[arg(long, default_value = "http://localhost:9000")]
    base_url: String,

    /// Seed-list file of extra pages to check
    #[arg(long)]
    seeds: Option<PathBuf>,

    /// Static-server script (defaults to serve.js next to this binary)
    #[arg(long)]
    server_script: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sitecheck: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let script = match args.server_script {
        Some(script) => script,
        None => std::env::current_exe()
            .context("cannot locate this executable")?
            .parent()
            .context("executable has no parent directory")?
            .join("serve.js"),
    };

    let base = args.base_url.trim_end_matches('/').to_string();
    let domain = netloc(&base);
    if domain.is_empty() {
        anyhow::bail!("--base-url {} has no host", args.base_url);
    }

    let extra_seeds = match &args.seeds {
        Some(path) => seeds::load(path, &base)?,
        None => Vec::new(),
    };

    let server = StaticServer::launch(&script, &args.projdir).await?;

    let mut checker = Checker::new(domain.clone(), DocsPolicy::new(domain))?;
    checker.add_seed(&format!("{base}/"));
    checker.add_seed(&format!("{base}/404.html"));
    checker.add_seed(&format!("{base}/404/"));
    for seed in extra_seeds {
        checker.add_seed(&seed);
    }

    let interrupted = tokio::select! {
        () = checker.run() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    server.shutdown().await;

    if interrupted {
        return Ok(ExitCode::from(130));
    }
    checker.print_summary();
    Ok(if checker.stats().failed() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
