use crate::audit_text;
use crate::sinks::{CacheSink, HistorySink};
use crate::views;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tally_db::{AssetClass, AuditAction, AuditEntity, Database, HoldingDetail};
use tally_rates::{AssetRef, RateFetcher};

/// The interactive session: database, rate engine and the in-memory price
/// state the views render from.
pub struct App {
    db: Arc<Database>,
    fetcher: RateFetcher,
    prices: HashMap<i64, f64>,
    last_update: Option<i64>,
}

impl App {
    pub fn new(db: Arc<Database>) -> Self {
        let fetcher = RateFetcher::new()
            .with_history_sink(Arc::new(HistorySink::new(db.clone())))
            .with_cache_sink(Arc::new(CacheSink::new(db.clone())));

        Self {
            db,
            fetcher,
            prices: HashMap::new(),
            last_update: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Seed the view from the persistent cache so the first render has
        // values, then refresh over the network
        self.prices = self.db.cached_price_map().await?;
        self.last_update = self.db.last_price_update().await?;
        self.show_portfolio().await?;

        println!("Fetching prices...");
        match self.refresh().await {
            Ok(()) => self.show_portfolio().await?,
            Err(e) => log::warn!("Initial price refresh failed: {}", e),
        }

        println!("Type 'help' for commands.");
        loop {
            let line = read_line("tally> ")?;
            let line = line.trim();
            let (command, arg) = match line.split_once(' ') {
                Some((command, arg)) => (command, arg.trim()),
                None => (line, ""),
            };

            let result = match command {
                "" | "show" => self.show_portfolio().await,
                "help" => {
                    print_help();
                    Ok(())
                }
                "accounts" => self.show_accounts().await,
                "add" => self.add_holding().await,
                "edit" => self.edit_holding(arg).await,
                "delete" => self.delete_holding(arg).await,
                "refresh" => self.refresh_and_show().await,
                "history" => self.show_history(arg).await,
                "audit" => self.show_audit().await,
                "quit" | "exit" | "q" => break,
                _ => {
                    println!("Unknown command: {}", command);
                    print_help();
                    Ok(())
                }
            };

            if let Err(e) = result {
                println!("Error: {}", e);
            }
        }

        Ok(())
    }

    /// One refresh round: fetch, remember, snapshot. The fetch itself never
    /// fails; only reading our own database can.
    async fn refresh(&mut self) -> Result<()> {
        let assets = self.db.get_assets().await?;
        let refs: Vec<AssetRef> = assets
            .iter()
            .map(|asset| AssetRef {
                id: asset.id,
                symbol: asset.symbol.clone(),
                class: rate_class(asset.class),
            })
            .collect();

        self.prices = self.fetcher.fetch_prices(&refs).await;
        let now = Database::current_timestamp();
        self.last_update = Some(now);

        let holdings = self.db.get_holdings().await?;
        let total = portfolio_total(&holdings, &self.prices);
        let detail = asset_totals_json(&holdings, &self.prices);
        if let Err(e) = self.db.record_snapshot(total, detail, now).await {
            log::warn!("Could not record snapshot: {}", e);
        }

        log::info!(
            "Price refresh resolved {} of {} assets",
            self.prices.len(),
            refs.len()
        );
        Ok(())
    }

    async fn refresh_and_show(&mut self) -> Result<()> {
        println!("Fetching prices...");
        self.refresh().await?;
        self.show_portfolio().await
    }

    async fn show_portfolio(&self) -> Result<()> {
        let holdings = self.db.get_holdings().await?;
        print!(
            "{}",
            views::render_portfolio(&holdings, &self.prices, self.last_update)
        );
        Ok(())
    }

    async fn show_accounts(&self) -> Result<()> {
        let accounts = self.db.get_accounts().await?;
        let holdings = self.db.get_holdings().await?;
        print!("{}", views::render_accounts(&accounts, &holdings, &self.prices));
        Ok(())
    }

    async fn add_holding(&mut self) -> Result<()> {
        let account_name = read_line("Account: ")?;
        let account_name = account_name.trim();
        if account_name.is_empty() {
            println!("Cancelled.");
            return Ok(());
        }
        let account = match self.db.get_account_by_name(account_name).await? {
            Some(account) => account,
            None => {
                let kind = read_line("New account, kind (wallet/bank/exchange, empty for none): ")?;
                let kind = kind.trim();
                let kind = if kind.is_empty() { None } else { Some(kind) };
                self.db.create_account(account_name, kind).await?
            }
        };

        let symbol = read_line("Symbol: ")?;
        let symbol = symbol.trim();
        if symbol.is_empty() {
            println!("Cancelled.");
            return Ok(());
        }
        let asset = match self.db.get_asset_by_symbol(symbol).await? {
            Some(asset) => asset,
            None => {
                let name = read_line("New asset, full name: ")?;
                let class = read_line("Class (crypto/fiat/stock/other): ")?;
                self.db
                    .create_asset(symbol, name.trim(), AssetClass::from(class.trim()))
                    .await?
            }
        };

        let amount: f64 = read_line("Amount: ")?.trim().parse()?;
        let purchase = read_line("Purchase price in USD (empty to skip): ")?;
        let purchase = purchase.trim();
        let purchase_price = if purchase.is_empty() {
            None
        } else {
            Some(purchase.parse()?)
        };

        let holding = self
            .db
            .create_holding(account.id, asset.id, amount, purchase_price, None)
            .await?;

        self.audit(
            AuditAction::Create,
            holding.id,
            None,
            serde_json::to_string(&holding).ok(),
        )
        .await;

        println!("Added {:.4} {} to {}.", amount, asset.symbol, account.name);
        Ok(())
    }

    async fn edit_holding(&mut self, arg: &str) -> Result<()> {
        let id = parse_id(arg)?;
        let before = self
            .db
            .get_holding(id)
            .await?
            .ok_or_else(|| anyhow!("No holding with id {}", id))?;

        println!(
            "{} in {}, amount {:.4}",
            before.asset_symbol, before.account_name, before.amount
        );
        let amount: f64 = read_line("New amount: ")?.trim().parse()?;

        self.db.update_holding(id, before.account_id, amount).await?;
        let after = self.db.get_holding(id).await?;

        self.audit(
            AuditAction::Update,
            id,
            serde_json::to_string(&before).ok(),
            after.and_then(|h| serde_json::to_string(&h).ok()),
        )
        .await;

        println!("Updated holding {}.", id);
        Ok(())
    }

    async fn delete_holding(&mut self, arg: &str) -> Result<()> {
        let id = parse_id(arg)?;
        let before = self
            .db
            .get_holding(id)
            .await?
            .ok_or_else(|| anyhow!("No holding with id {}", id))?;

        let confirm = read_line(&format!(
            "Delete {:.4} {} from {}? (y/n) ",
            before.amount, before.asset_symbol, before.account_name
        ))?;
        if confirm.trim() != "y" {
            println!("Cancelled.");
            return Ok(());
        }

        self.db.delete_holding(id).await?;
        self.audit(
            AuditAction::Delete,
            id,
            serde_json::to_string(&before).ok(),
            None,
        )
        .await;

        println!("Deleted holding {}.", id);
        Ok(())
    }

    async fn show_history(&self, arg: &str) -> Result<()> {
        if arg.is_empty() {
            return Err(anyhow!("Usage: history <symbol>"));
        }
        let asset = self
            .db
            .get_asset_by_symbol(arg)
            .await?
            .ok_or_else(|| anyhow!("No asset with symbol {}", arg.to_uppercase()))?;

        let points = self.db.price_history(asset.id, 20).await?;
        print!("{}", views::render_history(&asset.symbol, &points));
        Ok(())
    }

    async fn show_audit(&self) -> Result<()> {
        let records = self.db.audit_log(50).await?;
        if records.is_empty() {
            println!("No changes recorded yet.");
            return Ok(());
        }

        let account_names: HashMap<i64, String> = self
            .db
            .get_accounts()
            .await?
            .into_iter()
            .map(|account| (account.id, account.name))
            .collect();
        let asset_symbols: HashMap<i64, String> = self
            .db
            .get_assets()
            .await?
            .into_iter()
            .map(|asset| (asset.id, asset.symbol))
            .collect();

        for record in records {
            println!(
                "[{}] {}",
                views::format_timestamp(record.created_at),
                audit_text::describe(&record, &account_names, &asset_symbols)
            );
        }
        Ok(())
    }

    /// Audit writes are best effort; losing one never fails the command
    async fn audit(
        &self,
        action: AuditAction,
        holding_id: i64,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        if let Err(e) = self
            .db
            .append_audit(action, AuditEntity::Holding, holding_id, old_value, new_value)
            .await
        {
            log::warn!("Could not write audit record: {}", e);
        }
    }
}

fn rate_class(class: AssetClass) -> tally_rates::AssetClass {
    match class {
        AssetClass::Crypto => tally_rates::AssetClass::Crypto,
        AssetClass::Fiat => tally_rates::AssetClass::Fiat,
        AssetClass::Stock => tally_rates::AssetClass::Stock,
        AssetClass::Other => tally_rates::AssetClass::Other,
    }
}

fn portfolio_total(holdings: &[HoldingDetail], prices: &HashMap<i64, f64>) -> f64 {
    holdings
        .iter()
        .map(|h| h.amount * prices.get(&h.asset_id).copied().unwrap_or(0.0))
        .sum()
}

/// Per-symbol value breakdown stored alongside each snapshot
fn asset_totals_json(holdings: &[HoldingDetail], prices: &HashMap<i64, f64>) -> Option<String> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for holding in holdings {
        let value = holding.amount * prices.get(&holding.asset_id).copied().unwrap_or(0.0);
        *totals.entry(holding.asset_symbol.as_str()).or_default() += value;
    }
    serde_json::to_string(&totals).ok()
}

fn parse_id(arg: &str) -> Result<i64> {
    arg.parse()
        .map_err(|_| anyhow!("Expected a numeric holding id, got '{}'", arg))
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn print_help() {
    println!("Commands:");
    println!("  show            render the portfolio (also the empty command)");
    println!("  accounts        list accounts with their current value");
    println!("  add             add a holding, creating account/asset as needed");
    println!("  edit <id>       change a holding's amount");
    println!("  delete <id>     remove a holding");
    println!("  refresh         fetch current prices");
    println!("  history <sym>   recent recorded prices for one asset");
    println!("  audit           recent portfolio changes");
    println!("  quit            exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(asset_id: i64, symbol: &str, amount: f64) -> HoldingDetail {
        HoldingDetail {
            id: asset_id,
            account_id: 1,
            account_name: "wallet".to_string(),
            asset_id,
            asset_symbol: symbol.to_string(),
            asset_class: AssetClass::Crypto,
            amount,
            purchase_price: None,
            purchase_date: None,
        }
    }

    #[test]
    fn test_portfolio_total_ignores_missing_prices() {
        let holdings = vec![holding(1, "BTC", 0.5), holding(2, "MYSTERY", 100.0)];
        let prices = HashMap::from([(1, 45000.0)]);

        assert_eq!(portfolio_total(&holdings, &prices), 22500.0);
    }

    #[test]
    fn test_asset_totals_merge_across_accounts() {
        let mut first = holding(1, "BTC", 0.5);
        first.account_id = 1;
        let mut second = holding(1, "BTC", 0.25);
        second.account_id = 2;

        let prices = HashMap::from([(1, 40000.0)]);
        let json = asset_totals_json(&[first, second], &prices).unwrap();
        let parsed: HashMap<String, f64> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["BTC"], 30000.0);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_rate_class_mapping_is_total() {
        assert_eq!(rate_class(AssetClass::Crypto), tally_rates::AssetClass::Crypto);
        assert_eq!(rate_class(AssetClass::Fiat), tally_rates::AssetClass::Fiat);
        assert_eq!(rate_class(AssetClass::Stock), tally_rates::AssetClass::Stock);
        assert_eq!(rate_class(AssetClass::Other), tally_rates::AssetClass::Other);
    }
}
