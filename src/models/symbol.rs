//! # models::symbol
//!
//! Contract specification snapshot (`symbol_info`) logged once an hour.
//! Every field is optional: brokers leave plenty of these unset, and a
//! missing value becomes an empty cell instead of a failed row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::CsvRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolInfo {
    pub name:                Option<String>,
    pub description:         Option<String>,
    pub currency_base:       Option<String>,
    pub currency_profit:     Option<String>,
    pub currency_margin:     Option<String>,
    pub digits:              Option<u32>,
    pub point:               Option<f64>,
    pub trade_tick_size:     Option<f64>,
    pub trade_tick_value:    Option<f64>,
    pub trade_contract_size: Option<f64>,
    pub volume_min:          Option<f64>,
    pub volume_max:          Option<f64>,
    pub volume_step:         Option<f64>,
    pub spread:              Option<i64>,
    pub spread_float:        Option<bool>,
    pub swap_long:           Option<f64>,
    pub swap_short:          Option<f64>,
    pub trade_stops_level:   Option<i64>,
    pub trade_freeze_level:  Option<i64>,
    pub margin_initial:      Option<f64>,
    pub margin_maintenance:  Option<f64>,
    pub margin_hedged:       Option<f64>,
}

/// [`SymbolInfo`] plus the time we logged it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataSnapshot {
    pub logged_at: DateTime<Utc>,
    pub info:      SymbolInfo,
}

fn cell<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl CsvRecord for MetadataSnapshot {
    const HEADER: &'static [&'static str] = &[
        "logged_at",
        "name", "description", "currency_base", "currency_profit", "currency_margin",
        "digits", "point", "trade_tick_size", "trade_tick_value",
        "trade_contract_size", "volume_min", "volume_max", "volume_step",
        "spread", "spread_float", "swap_long", "swap_short",
        "trade_stops_level", "trade_freeze_level",
        "margin_initial", "margin_maintenance", "margin_hedged",
    ];

    fn fields(&self) -> Vec<String> {
        let i = &self.info;
        vec![
            self.logged_at.to_rfc3339(),
            cell(&i.name),
            cell(&i.description),
            cell(&i.currency_base),
            cell(&i.currency_profit),
            cell(&i.currency_margin),
            cell(&i.digits),
            cell(&i.point),
            cell(&i.trade_tick_size),
            cell(&i.trade_tick_value),
            cell(&i.trade_contract_size),
            cell(&i.volume_min),
            cell(&i.volume_max),
            cell(&i.volume_step),
            cell(&i.spread),
            cell(&i.spread_float),
            cell(&i.swap_long),
            cell(&i.swap_short),
            cell(&i.trade_stops_level),
            cell(&i.trade_freeze_level),
            cell(&i.margin_initial),
            cell(&i.margin_maintenance),
            cell(&i.margin_hedged),
        ]
    }
}
