use serde_json::Value;
use std::collections::HashMap;
use tally_db::{AuditAction, AuditEntity, AuditRecord};

/// One audit record as a human sentence, resolving ids through the given
/// name lookups. Falls back to generic wording when the stored JSON cannot
/// be interpreted, so a damaged log line never breaks the view.
pub fn describe(
    record: &AuditRecord,
    account_names: &HashMap<i64, String>,
    asset_symbols: &HashMap<i64, String>,
) -> String {
    match record.entity_type {
        AuditEntity::Holding => describe_holding(record, account_names, asset_symbols),
        AuditEntity::Account => describe_named(record, "account", "name"),
        AuditEntity::Asset => describe_named(record, "asset", "symbol"),
    }
}

fn describe_holding(
    record: &AuditRecord,
    account_names: &HashMap<i64, String>,
    asset_symbols: &HashMap<i64, String>,
) -> String {
    let account = |value: &Value| {
        lookup(account_names, field_i64(value, "account_id"))
            .unwrap_or_else(|| "an account".to_string())
    };
    let symbol = |value: &Value| {
        lookup(asset_symbols, field_i64(value, "asset_id"))
            .unwrap_or_else(|| "an asset".to_string())
    };

    match record.action {
        AuditAction::Create => match parse(record.new_value.as_deref()) {
            Some(new) => {
                let mut line = format!(
                    "Added {:.4} {} to {}",
                    field_f64(&new, "amount").unwrap_or(0.0),
                    symbol(&new),
                    account(&new)
                );
                if let Some(price) = field_f64(&new, "purchase_price") {
                    if price > 0.0 {
                        line.push_str(&format!(" at ${:.2}", price));
                    }
                }
                line
            }
            None => fallback(record),
        },
        AuditAction::Update => match (
            parse(record.old_value.as_deref()),
            parse(record.new_value.as_deref()),
        ) {
            (Some(old), Some(new)) => {
                let mut line = format!("Updated {} in {}", symbol(&new), account(&new));
                let old_amount = field_f64(&old, "amount");
                let new_amount = field_f64(&new, "amount");
                if old_amount != new_amount {
                    line.push_str(&format!(
                        ": amount {:.4} → {:.4}",
                        old_amount.unwrap_or(0.0),
                        new_amount.unwrap_or(0.0)
                    ));
                }
                if field_i64(&old, "account_id") != field_i64(&new, "account_id") {
                    line.push_str(&format!(", moved from {}", account(&old)));
                }
                line
            }
            _ => fallback(record),
        },
        AuditAction::Delete => match parse(record.old_value.as_deref()) {
            Some(old) => format!(
                "Removed {:.4} {} from {}",
                field_f64(&old, "amount").unwrap_or(0.0),
                symbol(&old),
                account(&old)
            ),
            None => fallback(record),
        },
    }
}

fn describe_named(record: &AuditRecord, entity: &str, name_field: &str) -> String {
    let name = parse(record.new_value.as_deref())
        .or_else(|| parse(record.old_value.as_deref()))
        .and_then(|value| {
            value
                .get(name_field)
                .and_then(|v| v.as_str().map(|s| s.to_string()))
        });

    let verb = match record.action {
        AuditAction::Create => "Created",
        AuditAction::Update => "Updated",
        AuditAction::Delete => "Deleted",
    };

    match name {
        Some(name) => format!("{} {} {}", verb, entity, name),
        None => format!("{} {} #{}", verb, entity, record.entity_id),
    }
}

fn fallback(record: &AuditRecord) -> String {
    let verb = match record.action {
        AuditAction::Create => "Created",
        AuditAction::Update => "Updated",
        AuditAction::Delete => "Deleted",
    };
    format!("{} holding #{}", verb, record.entity_id)
}

fn parse(value: Option<&str>) -> Option<Value> {
    serde_json::from_str(value?).ok()
}

fn field_f64(value: &Value, field: &str) -> Option<f64> {
    value.get(field).and_then(|v| v.as_f64())
}

fn field_i64(value: &Value, field: &str) -> Option<i64> {
    value.get(field).and_then(|v| v.as_i64())
}

fn lookup(names: &HashMap<i64, String>, id: Option<i64>) -> Option<String> {
    names.get(&id?).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        action: AuditAction,
        entity_type: AuditEntity,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> AuditRecord {
        AuditRecord {
            id: 1,
            action,
            entity_type,
            entity_id: 10,
            old_value: old_value.map(|s| s.to_string()),
            new_value: new_value.map(|s| s.to_string()),
            created_at: 1700000000,
        }
    }

    fn maps() -> (HashMap<i64, String>, HashMap<i64, String>) {
        let accounts = HashMap::from([(1, "hardware wallet".to_string()), (2, "NeoBank".to_string())]);
        let assets = HashMap::from([(5, "BTC".to_string())]);
        (accounts, assets)
    }

    #[test]
    fn test_added_holding_sentence() {
        let (accounts, assets) = maps();
        let rec = record(
            AuditAction::Create,
            AuditEntity::Holding,
            None,
            Some(r#"{"account_id":1,"asset_id":5,"amount":0.5,"purchase_price":40000.0}"#),
        );

        assert_eq!(
            describe(&rec, &accounts, &assets),
            "Added 0.5000 BTC to hardware wallet at $40000.00"
        );
    }

    #[test]
    fn test_updated_amount_sentence() {
        let (accounts, assets) = maps();
        let rec = record(
            AuditAction::Update,
            AuditEntity::Holding,
            Some(r#"{"account_id":1,"asset_id":5,"amount":0.5}"#),
            Some(r#"{"account_id":1,"asset_id":5,"amount":0.25}"#),
        );

        assert_eq!(
            describe(&rec, &accounts, &assets),
            "Updated BTC in hardware wallet: amount 0.5000 → 0.2500"
        );
    }

    #[test]
    fn test_moved_holding_sentence() {
        let (accounts, assets) = maps();
        let rec = record(
            AuditAction::Update,
            AuditEntity::Holding,
            Some(r#"{"account_id":1,"asset_id":5,"amount":0.5}"#),
            Some(r#"{"account_id":2,"asset_id":5,"amount":0.5}"#),
        );

        assert_eq!(
            describe(&rec, &accounts, &assets),
            "Updated BTC in NeoBank, moved from hardware wallet"
        );
    }

    #[test]
    fn test_removed_holding_sentence() {
        let (accounts, assets) = maps();
        let rec = record(
            AuditAction::Delete,
            AuditEntity::Holding,
            Some(r#"{"account_id":1,"asset_id":5,"amount":0.5}"#),
            None,
        );

        assert_eq!(
            describe(&rec, &accounts, &assets),
            "Removed 0.5000 BTC from hardware wallet"
        );
    }

    #[test]
    fn test_unparseable_json_falls_back() {
        let (accounts, assets) = maps();
        let rec = record(
            AuditAction::Create,
            AuditEntity::Holding,
            None,
            Some("not json"),
        );

        assert_eq!(describe(&rec, &accounts, &assets), "Created holding #10");
    }

    #[test]
    fn test_unknown_ids_keep_generic_names() {
        let rec = record(
            AuditAction::Delete,
            AuditEntity::Holding,
            Some(r#"{"account_id":99,"asset_id":98,"amount":1.0}"#),
            None,
        );

        assert_eq!(
            describe(&rec, &HashMap::new(), &HashMap::new()),
            "Removed 1.0000 an asset from an account"
        );
    }

    #[test]
    fn test_account_creation_sentence() {
        let rec = record(
            AuditAction::Create,
            AuditEntity::Account,
            None,
            Some(r#"{"name":"NeoBank","kind":"bank"}"#),
        );

        assert_eq!(
            describe(&rec, &HashMap::new(), &HashMap::new()),
            "Created account NeoBank"
        );
    }
}
