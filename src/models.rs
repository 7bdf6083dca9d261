//! CoinCap feed data model
//!
//! `FeedEnvelope` mirrors the `/v2/assets` response body. Every metric stays a
//! string end to end: the feed sends them as text and the table stores them
//! as text, so no precision is lost on the way through.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map written to the table for one asset.
pub type Item = BTreeMap<String, String>;

/// Top-level `/v2/assets` document.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    pub data: Vec<AssetRecord>,
    /// Producer capture time (unix millis).
    pub timestamp: i64,
}

/// One asset row of the feed.
///
/// `null` metrics (e.g. `maxSupply` of an uncapped coin) decode to `""`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: String,
    pub rank: String,
    pub symbol: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub supply: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub max_supply: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub market_cap_usd: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub volume_usd24_hr: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_usd: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub change_percent24_hr: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub vwap24_hr: String,
    #[serde(default)]
    pub explorer: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl AssetRecord {
    /// Builds the full attribute map for an unconditional put.
    /// Attribute names match the feed's field names.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("id".into(), self.id.clone());
        item.insert("rank".into(), self.rank.clone());
        item.insert("symbol".into(), self.symbol.clone());
        item.insert("name".into(), self.name.clone());
        item.insert("supply".into(), self.supply.clone());
        item.insert("maxSupply".into(), self.max_supply.clone());
        item.insert("marketCapUsd".into(), self.market_cap_usd.clone());
        item.insert("volumeUsd24Hr".into(), self.volume_usd24_hr.clone());
        item.insert("priceUsd".into(), self.price_usd.clone());
        item.insert("changePercent24Hr".into(), self.change_percent24_hr.clone());
        item.insert("vwap24Hr".into(), self.vwap24_hr.clone());
        if let Some(explorer) = &self.explorer {
            item.insert("explorer".into(), explorer.clone());
        }
        item
    }
}

impl fmt::Display for AssetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}) id={} | price ${} | mcap ${} | vol24h ${} | chg24h {}% | vwap24h ${} | supply {} / max {}",
            self.rank,
            self.name,
            self.symbol,
            self.id,
            self.price_usd,
            self.market_cap_usd,
            self.volume_usd24_hr,
            self.change_percent24_hr,
            self.vwap24_hr,
            self.supply,
            self.max_supply,
        )
    }
}
