#[cfg(test)]
mod portfolio_flow {
    use std::collections::HashMap;
    use tally_db::{AssetClass, AuditAction, AuditEntity, Database};

    #[tokio::test]
    async fn test_full_portfolio_workflow() {
        let db = Database::new_in_memory().await.expect("Failed to create in-memory database");

        // A user sets up two accounts and three assets
        let wallet = db.create_account("hardware wallet", Some("wallet")).await.unwrap();
        let bank = db.create_account("NeoBank", Some("bank")).await.unwrap();

        let btc = db.create_asset("BTC", "Bitcoin", AssetClass::Crypto).await.unwrap();
        let eth = db.create_asset("ETH", "Ethereum", AssetClass::Crypto).await.unwrap();
        let eur = db.create_asset("EUR", "Euro", AssetClass::Fiat).await.unwrap();

        // Holdings spread across the accounts
        let h1 = db
            .create_holding(wallet.id, btc.id, 0.5, Some(40000.0), None)
            .await
            .unwrap();
        db.create_holding(wallet.id, eth.id, 10.0, None, None).await.unwrap();
        db.create_holding(bank.id, eur.id, 2000.0, None, None).await.unwrap();

        let holdings = db.get_holdings().await.unwrap();
        assert_eq!(holdings.len(), 3);

        // A price refresh lands
        let mut prices = HashMap::new();
        prices.insert(btc.id, 45000.0);
        prices.insert(eth.id, 3000.0);
        prices.insert(eur.id, 1.0869565217391304);
        db.upsert_cached_prices(&prices).await.unwrap();

        for (asset_id, price) in &prices {
            db.record_price(*asset_id, *price, Database::current_timestamp())
                .await
                .unwrap();
        }

        // Portfolio value computed from the cached map
        let cached = db.cached_price_map().await.unwrap();
        let total: f64 = holdings
            .iter()
            .map(|h| h.amount * cached.get(&h.asset_id).copied().unwrap_or(0.0))
            .sum();
        let expected = 0.5 * 45000.0 + 10.0 * 3000.0 + 2000.0 * 1.0869565217391304;
        assert!((total - expected).abs() < 1e-6);

        db.record_snapshot(total, None, Database::current_timestamp())
            .await
            .unwrap();
        assert_eq!(db.snapshots(5).await.unwrap().len(), 1);

        // The user trims the BTC position, which is audit-logged
        let before = db.get_holding(h1.id).await.unwrap().unwrap();
        db.update_holding(h1.id, wallet.id, 0.25).await.unwrap();
        let after = db.get_holding(h1.id).await.unwrap().unwrap();

        db.append_audit(
            AuditAction::Update,
            AuditEntity::Holding,
            h1.id,
            Some(serde_json::to_string(&before).unwrap()),
            Some(serde_json::to_string(&after).unwrap()),
        )
        .await
        .unwrap();

        let trail = db.audit_for_entity(AuditEntity::Holding, h1.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Update);

        // History survives for later display
        let history = db.price_history(btc.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price_usd, 45000.0);
    }

    #[tokio::test]
    async fn test_prices_survive_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tally.db");

        {
            let db = Database::open_at_path(db_path.clone()).await.unwrap();
            let btc = db.create_asset("BTC", "Bitcoin", AssetClass::Crypto).await.unwrap();
            db.upsert_cached_price(btc.id, 45000.0, 1234).await.unwrap();
        }

        // A fresh process sees the persisted cache
        let db = Database::open_at_path(db_path).await.unwrap();
        let btc = db.get_asset_by_symbol("BTC").await.unwrap().unwrap();
        let cached = db.get_cached_price(btc.id).await.unwrap().unwrap();
        assert_eq!(cached.price_usd, 45000.0);
        assert_eq!(db.last_price_update().await.unwrap(), Some(1234));
    }
}
