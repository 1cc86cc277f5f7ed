use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use std::collections::HashMap;
use tally_db::{Account, HoldingDetail, PricePoint};

pub fn format_usd(value: f64) -> String {
    format!("${:.2}", value)
}

pub fn format_timestamp(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => ts.to_string(),
    }
}

fn price_of(holding: &HoldingDetail, prices: &HashMap<i64, f64>) -> f64 {
    // A missing price renders as $0.00 rather than hiding the row
    prices.get(&holding.asset_id).copied().unwrap_or(0.0)
}

/// Portfolio as a table of holdings grouped per asset, largest position
/// first, with the total and last-update lines above it.
pub fn render_portfolio(
    holdings: &[HoldingDetail],
    prices: &HashMap<i64, f64>,
    last_update: Option<i64>,
) -> String {
    let total: f64 = holdings
        .iter()
        .map(|h| h.amount * price_of(h, prices))
        .sum();

    let mut out = String::new();
    out.push_str(&format!("Total: {}\n", format_usd(total)));
    match last_update {
        Some(ts) => out.push_str(&format!("Last update: {}\n", format_timestamp(ts))),
        None => out.push_str("Last update: never\n"),
    }

    if holdings.is_empty() {
        out.push_str("No holdings yet. Use 'add' to create one.\n");
        return out;
    }

    let mut groups: HashMap<i64, Vec<&HoldingDetail>> = HashMap::new();
    for holding in holdings {
        groups.entry(holding.asset_id).or_default().push(holding);
    }
    let mut ordered: Vec<(f64, Vec<&HoldingDetail>)> = groups
        .into_values()
        .map(|group| {
            let value = group
                .iter()
                .map(|h| h.amount * price_of(h, prices))
                .sum();
            (value, group)
        })
        .collect();
    ordered.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Asset", "Account", "Amount", "Value"]);

    for (_, group) in ordered {
        for holding in group {
            let value = holding.amount * price_of(holding, prices);
            table.add_row(vec![
                Cell::new(&holding.asset_symbol),
                Cell::new(&holding.account_name),
                Cell::new(format!("{:.4}", holding.amount)).set_alignment(CellAlignment::Right),
                Cell::new(format_usd(value)).set_alignment(CellAlignment::Right),
            ]);
        }
    }

    out.push_str(&table.to_string());
    out.push('\n');
    out
}

/// Recent price observations for one asset, newest first
pub fn render_history(symbol: &str, points: &[PricePoint]) -> String {
    if points.is_empty() {
        return format!("No recorded prices for {} yet.\n", symbol);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Recorded", "Price"]);

    for point in points {
        table.add_row(vec![
            Cell::new(format_timestamp(point.recorded_at)),
            Cell::new(format_usd(point.price_usd)).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("Price history for {}:\n{}\n", symbol, table)
}

/// Accounts with the current value of everything held in each
pub fn render_accounts(
    accounts: &[Account],
    holdings: &[HoldingDetail],
    prices: &HashMap<i64, f64>,
) -> String {
    if accounts.is_empty() {
        return "No accounts yet. Use 'add' to create one.\n".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Account", "Kind", "Value"]);

    for account in accounts {
        let value: f64 = holdings
            .iter()
            .filter(|h| h.account_id == account.id)
            .map(|h| h.amount * price_of(h, prices))
            .sum();
        table.add_row(vec![
            Cell::new(&account.name),
            Cell::new(account.kind.as_deref().unwrap_or("-")),
            Cell::new(format_usd(value)).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("{}\n", table)
}
