use super::ui;
use crate::App;
use anyhow::{Context, Result};
use std::path::Path;

/// Writes the ticker's logo, or its initials badge, to `out`.
pub async fn save_logo(app: &App, ticker: &str, out: &Path) -> Result<()> {
    let logo = app.logos.logo(ticker).await?;

    std::fs::write(out, &logo.bytes)
        .with_context(|| format!("Failed to write logo to {}", out.display()))?;

    let note = if logo.fallback {
        ui::style_text(" (generated badge)", ui::StyleType::Subtle)
    } else {
        String::new()
    };
    println!(
        "Saved {} bytes of {} to {}{}",
        logo.bytes.len(),
        logo.content_type,
        out.display(),
        note
    );
    Ok(())
}
