//! # models::depth
//!
//! Order-book (DOM) entries. The source hands back [`BookEntry`] values; the
//! depth task stamps a whole snapshot with one shared time to get
//! [`DepthLevel`] rows.

use serde::{Deserialize, Serialize};

use crate::clock::iso_millis;
use crate::storage::CsvRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookSide {
    /// `BOOK_TYPE_BUY` / `BOOK_TYPE_BUY_MARKET`
    #[serde(alias = "BUY")]
    Bid,
    /// `BOOK_TYPE_SELL` / `BOOK_TYPE_SELL_MARKET`
    #[serde(alias = "SELL")]
    Ask,
}

impl BookSide {
    pub fn as_str(self) -> &'static str {
        match self {
            BookSide::Bid => "BID",
            BookSide::Ask => "ASK",
        }
    }
}

/// One resting level from `market_book_get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    #[serde(rename = "type")]
    pub side:   BookSide,
    pub price:  f64,
    pub volume: f64,
}

/// A [`BookEntry`] tagged with the snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthLevel {
    pub time_msc: i64,
    pub time_dt:  String,
    pub side:     BookSide,
    pub price:    f64,
    pub volume:   f64,
}

impl DepthLevel {
    /// Stamp every entry of one snapshot with the same instant.
    pub fn snapshot(time_msc: i64, book: &[BookEntry]) -> Vec<DepthLevel> {
        let time_dt = iso_millis(time_msc);
        book.iter()
            .map(|entry| DepthLevel {
                time_msc,
                time_dt: time_dt.clone(),
                side:    entry.side,
                price:   entry.price,
                volume:  entry.volume,
            })
            .collect()
    }
}

impl CsvRecord for DepthLevel {
    const HEADER: &'static [&'static str] = &["time_msc", "time_dt", "side", "price", "volume"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.time_msc.to_string(),
            self.time_dt.clone(),
            self.side.as_str().to_string(),
            self.price.to_string(),
            self.volume.to_string(),
        ]
    }
}
