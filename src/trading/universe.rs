// src/trading/universe.rs
use crate::domain::models::SymbolInfo;

/// Visible symbols whose name contains none of the blacklisted substrings
/// (case-insensitive), in terminal order.
pub fn tradable_symbols(symbols: &[SymbolInfo], blacklist: &[String]) -> Vec<String> {
    let blacklist: Vec<String> = blacklist.iter().map(|s| s.to_uppercase()).collect();

    symbols
        .iter()
        .filter(|s| s.visible)
        .filter(|s| {
            let name = s.name.to_uppercase();
            !blacklist.iter().any(|bad| name.contains(bad.as_str()))
        })
        .map(|s| s.name.clone())
        .collect()
}
