use super::ui;
use crate::App;
use crate::core::leaderboard::Leaderboard;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Color};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

impl Leaderboard {
    pub fn display_as_table(&self, highlight: Option<&str>) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Rank"),
            ui::header_cell("Participant"),
            ui::header_cell("Invested"),
            ui::header_cell("Value"),
            ui::header_cell("Gain"),
            ui::header_cell("Return"),
            ui::header_cell("Picks"),
        ]);

        for entry in &self.entries {
            let valuation = &entry.valuation;
            let mut name = Cell::new(&entry.display_name);
            if highlight == Some(entry.participant_id.as_str()) {
                name = name.fg(Color::Yellow);
            }
            let picks = if valuation.is_partial() {
                format!(
                    "{} ({} unpriced)",
                    valuation.positions.len() + valuation.missing.len(),
                    valuation.missing.len()
                )
            } else {
                valuation.positions.len().to_string()
            };
            table.add_row(vec![
                Cell::new(entry.rank).set_alignment(CellAlignment::Right),
                name,
                ui::money_cell(valuation.invested),
                ui::money_cell(valuation.current),
                ui::gain_cell(valuation.gain),
                ui::change_cell(valuation.percent_gain),
                Cell::new(picks).set_alignment(CellAlignment::Right),
            ]);
        }

        table.to_string()
    }

    /// "Your ranking" footer for one participant.
    pub fn display_rank_of(&self, participant_id: &str) -> String {
        match self.rank_of(participant_id) {
            Some(entry) => format!(
                "{} #{} of {} with {:.2}%",
                ui::style_text(
                    &format!("{} is ranked", entry.display_name),
                    ui::StyleType::TotalLabel
                ),
                entry.rank,
                self.len(),
                entry.valuation.percent_gain
            ),
            None => ui::style_text(
                &format!("{participant_id} is not in this competition"),
                ui::StyleType::Error,
            ),
        }
    }
}

fn render(board: &Leaderboard, participant: Option<&str>) {
    println!(
        "{}",
        ui::style_text(
            &format!("Leaderboard for {}", board.competition_id),
            ui::StyleType::Title
        )
    );
    println!("{}", board.display_as_table(participant));
    if let Some(id) = participant {
        println!("{}", board.display_rank_of(id));
    }
    println!(
        "{}",
        ui::style_text(
            &format!("Updated {}", board.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::StyleType::Subtle
        )
    );
}

/// Ranks the competition once, or every refresh interval with `watch` until Ctrl-C.
pub async fn show_leaderboard(app: &App, watch: bool, participant: Option<&str>) -> Result<()> {
    let ctx = &app.config.competition;

    if !watch {
        let spinner = ui::new_spinner("Ranking participants");
        let published = app
            .board
            .refresh(ctx, &app.participants, &app.resolver)
            .await;
        spinner.finish_and_clear();
        if let Some(board) = published? {
            render(&board, participant);
        }
        return Ok(());
    }

    let mut ticker = interval(ctx.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                debug!("Stopping leaderboard refresh");
                return Ok(());
            }
        }

        match app
            .board
            .refresh(ctx, &app.participants, &app.resolver)
            .await
        {
            Ok(Some(board)) => {
                ui::print_separator();
                render(&board, participant);
            }
            Ok(None) => debug!("Refresh pass superseded"),
            // Keep showing the last good board until the next pass
            Err(e) => warn!("Leaderboard refresh failed: {}", e),
        }
    }
}
