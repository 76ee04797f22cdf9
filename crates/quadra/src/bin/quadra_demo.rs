//! # QUADRA Demo
//!
//! Headless walkthrough of one voting session at 60 FPS:
//!
//! ```text
//! t =    0ms  vote +1 on the first question
//! t =  100ms  vote +1 again (three credits fly, staggered)
//! t =  400ms  vote -1 (three credits fly back)
//! t = 1500ms  reset
//! ```
//!
//! Pass a session TOML path as the first argument to use your own questions.
//! Set `RUST_LOG=debug` to see every surface decision.

use std::process::ExitCode;
use std::time::Duration;

use quadra::{SessionConfig, SessionResult, VoteProvider, TARGET_FRAME_TIME};
use quadra_ledger::Question;
use quadra_shared::QuestionId;
use quadra_ui::VisualSurface;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Scripted input: `(at, question, delta)`; a zero delta means reset.
const SCRIPT: [(u64, usize, i32); 4] = [(0, 0, 1), (100, 0, 1), (400, 0, -1), (1500, 0, 0)];

/// Simulated length of the walkthrough.
const RUN_FOR: Duration = Duration::from_millis(2500);

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn demo_config() -> SessionConfig {
    SessionConfig::new(
        100,
        vec![
            Question::new(0, "Fund the new tram line?"),
            Question::new(1, "Extend library opening hours?"),
            Question::new(2, "Plant a thousand street trees?"),
        ],
    )
}

fn run() -> SessionResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(path)?,
        None => demo_config(),
    };
    let ids: Vec<QuestionId> = config.questions.iter().map(|q| q.id.clone()).collect();
    let credit_color = config.pool.credit_color;
    let mut provider = VoteProvider::from_config(config)?;

    let mut pool = provider.mount_pool((0.0, 0.0))?;
    let mut liquid = provider.mount_liquid((0.0, 80.0))?;
    let mut diamonds = Vec::with_capacity(ids.len());
    for (column, id) in (0u16..).zip(&ids) {
        let x = 120.0 + f32::from(column) * 200.0;
        diamonds.push(provider.mount_diamond(id.clone(), (x, 0.0))?);
    }

    let mut script = SCRIPT.iter().peekable();
    let mut now = Duration::ZERO;
    while now <= RUN_FOR {
        while let Some(&&(at, question, delta)) = script.peek() {
            if Duration::from_millis(at) > now {
                break;
            }
            script.next();
            let Some(id) = ids.get(question) else {
                continue;
            };
            if delta == 0 {
                provider.reset()?;
            } else {
                let outcome = provider.vote(id, delta)?;
                tracing::info!(%id, delta, ?outcome, "vote");
            }
        }

        let stats = provider.frame(now)?;
        let snapshot = provider.snapshot()?;

        pool.pump(now);
        liquid.pump(now);
        liquid.update(&snapshot, now);
        for diamond in &mut diamonds {
            diamond.pump(now);
        }

        if stats.events_published > 0 {
            let sprites = provider.sprites(now)?;
            let pool_view = pool.view(&snapshot);
            let liquid_view = liquid.view(now);
            let filled = pool_view
                .circles
                .iter()
                .filter(|c| c.fill == credit_color)
                .count();
            tracing::info!(
                t = ?now,
                published = stats.events_published,
                sprites = sprites.len(),
                pool_filled = filled,
                liquid_displayed = liquid.displayed_available(),
                core_scale = liquid_view.core_scale,
                "frame"
            );
            for diamond in &mut diamonds {
                let view = diamond.view(&snapshot);
                tracing::debug!(
                    id = %view.id,
                    level = view.vote_level,
                    shine = view.shine_active,
                    "diamond"
                );
            }
        }

        now += TARGET_FRAME_TIME;
    }

    provider.stats().log_summary();
    Ok(())
}
