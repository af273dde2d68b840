use super::ui;
use crate::App;
use crate::core::holding::{PICK_ALLOCATION, quantity_for};
use crate::core::price::PriceQuote;
use crate::core::response::PriceResponse;
use crate::core::ticker::Ticker;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

fn quote_table(ticker: &str, quote: &PriceQuote) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Price"),
        ui::header_cell("Date"),
        ui::header_cell("Source"),
    ]);
    table.add_row(vec![
        Cell::new(ticker),
        ui::money_cell(quote.price),
        quote
            .as_of
            .map_or_else(|| Cell::new("latest"), |d| Cell::new(d.to_string())),
        Cell::new(quote.source.to_string()),
    ]);
    table.to_string()
}

/// Prints the current price, or the price on or before `date`.
pub async fn show_price(app: &App, ticker: &str, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let ctx = &app.config.competition;
    let result = match date {
        Some(date) => app.resolver.resolve_as_of(ctx, ticker, date).await,
        None => app.resolver.resolve_current(ctx, ticker).await,
    };

    if json {
        let body = PriceResponse::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&body)?);
        if result.is_err() {
            anyhow::bail!(
                "Price lookup failed with status {}",
                PriceResponse::status_for(&result)
            );
        }
        return Ok(());
    }

    let quote = result?;
    println!("{}", quote_table(&ticker.trim().to_uppercase(), &quote));
    Ok(())
}

/// Previews what a pick of `ticker` would record today.
pub async fn show_entry_price(app: &App, ticker: &str) -> Result<()> {
    let ctx = &app.config.competition;
    let ticker = Ticker::parse(ticker)?;
    let quote = app
        .resolver
        .resolve_as_of(ctx, ticker.as_str(), ctx.entry_price_date)
        .await?;
    let quantity = quantity_for(&ticker, quote.price)?;

    println!(
        "{}",
        ui::style_text(
            &format!("Entry price for {} in {}", ticker, ctx.name),
            ui::StyleType::Title
        )
    );
    println!("{}", quote_table(ticker.as_str(), &quote));
    println!(
        "{} {:.4} shares for {:.2}",
        ui::style_text("A pick buys", ui::StyleType::TotalLabel),
        quantity,
        PICK_ALLOCATION
    );
    if quote.as_of.is_some_and(|d| d < ctx.entry_price_date) {
        println!(
            "{}",
            ui::style_text(
                &format!("No close on {}, using the previous trading day", ctx.entry_price_date),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}
