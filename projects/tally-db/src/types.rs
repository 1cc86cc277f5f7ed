use serde::{Deserialize, Serialize};

// ========== Asset Types ==========

/// What kind of thing an asset is, which decides how it gets priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Crypto,
    Fiat,
    Stock,
    Other,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Crypto => "crypto",
            AssetClass::Fiat => "fiat",
            AssetClass::Stock => "stock",
            AssetClass::Other => "other",
        }
    }
}

impl From<&str> for AssetClass {
    fn from(value: &str) -> Self {
        match value {
            "crypto" => AssetClass::Crypto,
            "fiat" => AssetClass::Fiat,
            "stock" => AssetClass::Stock,
            _ => AssetClass::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub class: AssetClass,
    pub created_at: i64,
    pub updated_at: i64,
}

// ========== Account Types ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub color: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

// ========== Holding Types ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub id: i64,
    pub account_id: i64,
    pub asset_id: i64,
    pub amount: f64,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A holding joined with its account and asset, the shape the UI renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingDetail {
    pub id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub asset_id: i64,
    pub asset_symbol: String,
    pub asset_class: AssetClass,
    pub amount: f64,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<i64>,
}

// ========== Audit Types ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl From<&str> for AuditAction {
    fn from(value: &str) -> Self {
        match value {
            "UPDATE" => AuditAction::Update,
            "DELETE" => AuditAction::Delete,
            _ => AuditAction::Create,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEntity {
    Account,
    Asset,
    Holding,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Account => "ACCOUNT",
            AuditEntity::Asset => "ASSET",
            AuditEntity::Holding => "HOLDING",
        }
    }
}

impl From<&str> for AuditEntity {
    fn from(value: &str) -> Self {
        match value {
            "ACCOUNT" => AuditEntity::Account,
            "ASSET" => AuditEntity::Asset,
            _ => AuditEntity::Holding,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: i64,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: i64,
}

// ========== Price Types ==========

/// Latest known USD price for one asset, overwritten on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPrice {
    pub asset_id: i64,
    pub price_usd: f64,
    pub updated_at: i64,
}

/// One append-only price observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub id: i64,
    pub asset_id: i64,
    pub price_usd: f64,
    pub recorded_at: i64,
}

// ========== Snapshot Types ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub total_value_usd: f64,
    pub detail_json: Option<String>,
    pub taken_at: i64,
}
