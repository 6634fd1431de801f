use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;
use console::Term;
use std::sync::Arc;
use tracing::{debug, info};

use super::ui;
use crate::core::config::RefreshConfig;
use crate::core::format::{convert_currency, format_amount};
use crate::core::{CryptoRecord, CurrencyRecord, MarketStats};
use crate::scheduler::Scheduler;
use crate::store::{REFERENCE_CURRENCY, RefreshStore, StoreSnapshot};

fn currencies_table(currencies: &[CurrencyRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(""),
        ui::header_cell("Code"),
        ui::header_cell("Currency"),
        ui::header_cell("Bid (PLN)"),
        ui::header_cell("Ask (PLN)"),
        ui::header_cell("Rate (PLN)"),
        ui::header_cell("Change"),
    ]);

    for currency in currencies {
        table.add_row(vec![
            Cell::new(&currency.flag),
            Cell::new(&currency.code),
            Cell::new(&currency.name),
            ui::format_optional_cell(currency.bid, |v| format_amount(v, 4)),
            ui::format_optional_cell(currency.ask, |v| format_amount(v, 4)),
            ui::amount_cell(currency.rate, 4),
            ui::change_cell(currency.change),
        ]);
    }
    table.to_string()
}

fn crypto_table(cryptocurrencies: &[CryptoRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Rate (PLN)"),
        ui::header_cell("Change"),
    ]);

    for crypto in cryptocurrencies {
        table.add_row(vec![
            Cell::new(&crypto.symbol),
            Cell::new(&crypto.code),
            Cell::new(&crypto.name),
            ui::amount_cell(crypto.rate, 2),
            ui::change_cell(crypto.change),
        ]);
    }
    table.to_string()
}

/// PLN amount expressed in USD, when both sides are usable.
fn pln_to_usd(amount: Option<f64>, usd_rate: Option<f64>) -> Option<f64> {
    let converted = convert_currency(amount?, 1.0, usd_rate?);
    (converted != 0.0 && converted.is_finite()).then_some(converted)
}

fn market_stats_table(stats: &MarketStats, usd_rate: Option<f64>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Market cap (PLN)"),
        ui::header_cell("Market cap (USD)"),
        ui::header_cell("Volume 24h (PLN)"),
        ui::header_cell("BTC dominance"),
        ui::header_cell("Updated"),
    ]);
    table.add_row(vec![
        ui::format_optional_cell(stats.market_cap_pln, |v| format_amount(v, 0)),
        ui::format_optional_cell(pln_to_usd(stats.market_cap_pln, usd_rate), |v| {
            format_amount(v, 0)
        }),
        ui::format_optional_cell(stats.volume_24h_pln, |v| format_amount(v, 0)),
        ui::format_optional_cell(stats.btc_dominance, |v| format!("{}%", format_amount(v, 2))),
        ui::format_optional_cell(stats.updated_at, |t| {
            t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
        }),
    ]);
    table.to_string()
}

/// Renders the whole board for one store snapshot.
pub fn render(snapshot: &StoreSnapshot) -> String {
    let mut output = String::new();

    output.push_str(&ui::style_text("Exchange rates", ui::StyleType::Title));
    output.push_str("\n\n");
    if snapshot.currencies.is_empty() {
        output.push_str(&ui::style_text(
            "No exchange rates available",
            ui::StyleType::Subtle,
        ));
    } else {
        output.push_str(&currencies_table(&snapshot.currencies));
    }

    output.push_str("\n\n");
    output.push_str(&ui::style_text("Cryptocurrencies", ui::StyleType::Title));
    output.push_str("\n\n");
    if snapshot.cryptocurrencies.is_empty() {
        output.push_str(&ui::style_text(
            "No cryptocurrency data available",
            ui::StyleType::Subtle,
        ));
    } else {
        output.push_str(&crypto_table(&snapshot.cryptocurrencies));
    }

    output.push_str("\n\n");
    output.push_str(&ui::style_text("Crypto market", ui::StyleType::Title));
    output.push_str("\n\n");
    let usd_rate = snapshot
        .currencies
        .iter()
        .find(|c| c.code == REFERENCE_CURRENCY)
        .map(|c| c.rate);
    output.push_str(&market_stats_table(&snapshot.market_stats, usd_rate));

    if let Some(error) = &snapshot.error {
        output.push_str(&format!(
            "\n\n{} {}",
            ui::style_text("Error:", ui::StyleType::TotalLabel),
            ui::style_text(error, ui::StyleType::Error)
        ));
    }
    if snapshot.loading {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text("Refreshing...", ui::StyleType::Subtle)
        ));
    }

    output
}

/// Loads rates and market stats once and prints the board.
pub async fn show(store: &RefreshStore) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let outcome = store.init().await;
    debug!(?outcome, "Rates bootstrap finished");

    // Stats need the USD rate, so they go second.
    spinner.set_message("Fetching market stats...");
    store.fetch_market_stats().await;
    spinner.finish_and_clear();

    println!("{}", render(&store.snapshot().await));
    Ok(())
}

/// Keeps the board on screen and refreshed until Ctrl-C.
pub async fn watch(store: Arc<RefreshStore>, refresh: &RefreshConfig) -> Result<()> {
    let scheduler = Scheduler::new(Arc::clone(&store), refresh);
    let mut revisions = store.subscribe();
    let term = Term::stdout();

    let spinner = ui::new_spinner("Fetching exchange rates...");
    store.init().await;
    store.fetch_market_stats().await;
    spinner.finish_and_clear();

    scheduler.start_auto_refresh();
    scheduler.start_market_stats_auto_refresh();
    redraw(&term, &store, &scheduler).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                redraw(&term, &store, &scheduler).await?;
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping auto-refresh");
                break;
            }
        }
    }

    scheduler.stop_all();
    Ok(())
}

async fn redraw(term: &Term, store: &RefreshStore, scheduler: &Scheduler) -> Result<()> {
    let snapshot = store.snapshot().await;
    term.clear_screen()?;
    term.write_line(&render(&snapshot))?;
    term.write_line(&ui::style_text(
        &format!(
            "\nRates every {}s, market stats every {}s. Ctrl-C to quit.",
            scheduler.rates_interval().as_secs(),
            scheduler.market_stats_interval().as_secs()
        ),
        ui::StyleType::Subtle,
    ))?;
    Ok(())
}
