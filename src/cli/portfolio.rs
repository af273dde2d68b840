use super::ui;
use crate::App;
use crate::core::holding::ParticipantStore;
use crate::core::ticker::Ticker;
use crate::core::valuation::{ParticipantValuation, value_holdings};
use anyhow::{Context, Result};
use comfy_table::Cell;

impl ParticipantValuation {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Ticker"),
            ui::header_cell("Shares"),
            ui::header_cell("Entry"),
            ui::header_cell("Current"),
            ui::header_cell("Value"),
            ui::header_cell("Gain"),
            ui::header_cell("Return"),
            ui::header_cell("Source"),
        ]);

        for position in &self.positions {
            table.add_row(vec![
                Cell::new(position.ticker.as_str()),
                Cell::new(format!("{:.4}", position.quantity)),
                ui::money_cell(position.entry_price),
                ui::money_cell(position.current_price),
                ui::money_cell(position.current_value),
                ui::gain_cell(position.gain),
                ui::change_cell(position.percent_gain),
                Cell::new(position.source.to_string()),
            ]);
        }
        for missing in &self.missing {
            table.add_row(vec![
                Cell::new(missing.ticker.as_str()),
                ui::na_cell(false),
                ui::na_cell(false),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                Cell::new(ui::style_text(&missing.error, ui::StyleType::Error)),
            ]);
        }

        table.to_string()
    }

    pub fn display_totals(&self) -> String {
        format!(
            "{} {:.2}  {} {:.2}  {} {:+.2} ({:.2}%)",
            ui::style_text("Invested:", ui::StyleType::TotalLabel),
            self.invested,
            ui::style_text("Value:", ui::StyleType::TotalLabel),
            self.current,
            ui::style_text("Gain:", ui::StyleType::TotalLabel),
            self.gain,
            self.percent_gain
        )
    }
}

/// Values one participant's picks at current prices.
pub async fn show_portfolio(app: &App, participant_id: &str) -> Result<()> {
    let ctx = &app.config.competition;
    let participant = app
        .participants
        .participants(&ctx.id)
        .await?
        .into_iter()
        .find(|p| p.id == participant_id)
        .with_context(|| format!("No participant {participant_id} in {}", ctx.id))?;

    let spinner = ui::new_spinner(&format!("Pricing {} picks", participant.holdings.len()));
    let resolver = &app.resolver;
    let valuation = value_holdings(
        &participant.holdings,
        resolver.options().concurrency,
        |ticker: Ticker| async move { resolver.resolve_current(ctx, ticker.as_str()).await },
    )
    .await;
    spinner.finish_and_clear();
    let valuation = valuation?;

    println!(
        "{}",
        ui::style_text(
            &format!("{} ({})", participant.display_name, participant.id),
            ui::StyleType::Title
        )
    );
    println!("{}", valuation.display_as_table());
    println!("{}", valuation.display_totals());
    if valuation.is_partial() {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "{} picks without a current price are left out of the totals",
                    valuation.missing.len()
                ),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}
