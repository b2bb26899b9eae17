//! `review stream`: run one review session in the terminal

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use review_core::{
    tabulate, FixtureTransport, HttpTransport, Paginator, ReviewConfig, ReviewSession,
    ReviewStatistics, ReviewTransport, SessionController, SessionStatus,
};
use tracing::{info, warn};

use crate::render::table::{navigator_line, row_lines, separator, statistics_line};
use crate::render::{terminal_width, LiveRenderer};

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Review request identifier submitted to the backend
    pub review_id: String,

    /// Review endpoint (overrides the config file)
    #[arg(long, env = "REVIEW_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Replay a canned stream file instead of contacting the backend
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Fixture replay speed multiplier
    #[arg(long)]
    pub speed: Option<f64>,

    /// Table page to show when the review finishes
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Skip the summary table
    #[arg(long)]
    pub no_table: bool,
}

pub async fn run(args: StreamArgs, mut config: ReviewConfig) -> Result<ExitCode> {
    if let Some(speed) = args.speed {
        config.fixture.speed = speed;
    }
    let config = config.with_endpoint(args.endpoint.clone())?;
    config.validate()?;

    let transport = build_transport(&args, &config)?;
    let mut controller = SessionController::new(transport, config.session_settings());
    let mut updates = controller.subscribe();
    controller.start(&args.review_id).await;

    let stdout = io::stdout();
    let decorate = stdout.is_terminal();
    let mut renderer = LiveRenderer::new(stdout, decorate);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = updates.borrow_and_update().clone();
                renderer.render(&session)?;
                if session.status.is_finished() {
                    break;
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!("Interrupted, cancelling review");
                controller.cancel();
            }
        }
    }

    let status = controller.wait().await;
    renderer.finish()?;

    let session = controller.snapshot();
    print_report(&session, decorate);
    if !args.no_table && !session.completed_blocks.is_empty() {
        let mut paginator = config.paginator();
        print_table(&session, &mut paginator, args.page, decorate);
    }

    Ok(if status == SessionStatus::Errored {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn build_transport(args: &StreamArgs, config: &ReviewConfig) -> Result<Arc<dyn ReviewTransport>> {
    let transport: Arc<dyn ReviewTransport> = match &args.fixture {
        Some(path) => {
            info!("Using fixture {}", path.display());
            Arc::new(FixtureTransport::new(path, config.fixture_timing()))
        }
        None => {
            let http = HttpTransport::new(config.http_transport_config()?)
                .context("Failed to build HTTP transport")?;
            Arc::new(http)
        }
    };
    Ok(transport)
}

fn print_report(session: &ReviewSession, decorate: bool) {
    let blocks = session.completed_blocks.len();
    match session.status {
        SessionStatus::Completed => println!("Review completed: {} blocks", blocks),
        SessionStatus::Cancelled => println!("Review cancelled: {} blocks received", blocks),
        SessionStatus::Errored => eprintln!(
            "Review failed after {} blocks: {}",
            blocks,
            session.error.as_deref().unwrap_or("unknown error")
        ),
        other => warn!("Session ended in unexpected state: {}", other),
    }
    if session.anomaly_count > 0 {
        let note = format!("{} stream anomalies ignored", session.anomaly_count);
        if decorate {
            use crossterm::style::Stylize;
            println!("{}", note.dark_grey());
        } else {
            println!("{}", note);
        }
    }
}

fn print_table(session: &ReviewSession, paginator: &mut Paginator, page: usize, decorate: bool) {
    let width = terminal_width();
    let rows = tabulate(&session.completed_blocks);
    paginator.go_to(page, rows.len());

    println!("{}", separator(width));
    println!(
        "{}",
        statistics_line(&ReviewStatistics::from_rows(&rows), decorate)
    );
    println!("{}", separator(width));

    for row in paginator.page_slice(&rows) {
        for line in row_lines(row, width, decorate) {
            println!("{}", line);
        }
        println!();
    }

    if paginator.needs_pagination(rows.len()) {
        println!("{}", navigator_line(paginator, rows.len()));
    }
}
