//! Exchange symbol normalization.
//!
//! The provider addresses NSE listings as `<SYM>.NS` and BSE listings as `<SYM>.BO`.

const NSE_SUFFIX: &str = ".NS";
const BSE_SUFFIX: &str = ".BO";

/// Well-known NSE symbols
const SYMBOL_MAP: &[(&str, &str)] = &[
    ("RELIANCE", "RELIANCE.NS"),
    ("TCS", "TCS.NS"),
    ("INFY", "INFY.NS"),
    ("HDFCBANK", "HDFCBANK.NS"),
    ("ICICIBANK", "ICICIBANK.NS"),
    ("WIPRO", "WIPRO.NS"),
    ("BHARTIARTL", "BHARTIARTL.NS"),
    ("ITC", "ITC.NS"),
    ("SBIN", "SBIN.NS"),
    ("KOTAKBANK", "KOTAKBANK.NS"),
    ("LT", "LT.NS"),
    ("HINDUNILVR", "HINDUNILVR.NS"),
    ("ASIANPAINT", "ASIANPAINT.NS"),
    ("MARUTI", "MARUTI.NS"),
    ("SUNPHARMA", "SUNPHARMA.NS"),
    ("AXISBANK", "AXISBANK.NS"),
    ("BAJFINANCE", "BAJFINANCE.NS"),
    ("TATAMOTORS", "TATAMOTORS.NS"),
    ("TATASTEEL", "TATASTEEL.NS"),
    ("ADANIENT", "ADANIENT.NS"),
];

/// Convert a user-supplied symbol to the provider's format.
/// Unknown symbols without an exchange suffix default to NSE.
pub fn to_provider_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if let Some((_, mapped)) = SYMBOL_MAP.iter().find(|(name, _)| *name == upper) {
        return (*mapped).to_string();
    }
    if upper.ends_with(NSE_SUFFIX) || upper.ends_with(BSE_SUFFIX) {
        return upper;
    }
    format!("{upper}{NSE_SUFFIX}")
}

/// Upper-cased symbol without exchange suffix
pub fn display_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    strip_exchange_suffix(&upper).to_string()
}

pub(crate) fn strip_exchange_suffix(symbol: &str) -> &str {
    symbol
        .strip_suffix(NSE_SUFFIX)
        .or_else(|| symbol.strip_suffix(BSE_SUFFIX))
        .unwrap_or(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_symbols() {
        assert_eq!(to_provider_symbol("tcs"), "TCS.NS");
        assert_eq!(to_provider_symbol(" Reliance "), "RELIANCE.NS");
    }

    #[test]
    fn test_suffixed_symbols_are_kept() {
        assert_eq!(to_provider_symbol("tatapower.bo"), "TATAPOWER.BO");
        assert_eq!(to_provider_symbol("ZOMATO.NS"), "ZOMATO.NS");
    }

    #[test]
    fn test_unknown_symbols_default_to_nse() {
        assert_eq!(to_provider_symbol("zomato"), "ZOMATO.NS");
    }

    #[test]
    fn test_display_symbol() {
        assert_eq!(display_symbol("tcs.ns"), "TCS");
        assert_eq!(display_symbol("TATAPOWER.BO"), "TATAPOWER");
        assert_eq!(display_symbol("infy"), "INFY");
    }
}
