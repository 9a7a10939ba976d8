use std::collections::HashMap;

/// Exchange rates for supported order currencies, relative to USD.
///
/// The table is built once at startup and passed into the engine explicitly;
/// nothing in the order path reads rates from ambient state. An order stores
/// the rate it was priced with, so later table changes never re-price it.
#[derive(Debug, Clone)]
pub struct CurrencyTable {
    rates: HashMap<String, f64>,
}

impl CurrencyTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    /// Default USD-based rates for the storefront's supported currencies.
    pub fn with_defaults() -> Self {
        let mut rates = HashMap::new();
        for (code, rate) in [
            ("USD", 1.0),
            ("EUR", 0.92),
            ("GBP", 0.79),
            ("AED", 3.67),
            ("SAR", 3.75),
            ("QAR", 3.64),
            ("KWD", 0.31),
            ("BHD", 0.376),
            ("OMR", 0.385),
            ("JOD", 0.709),
            ("LBP", 89500.0),
            ("EGP", 48.5),
            ("IQD", 1310.0),
            ("ILS", 3.7),
        ] {
            rates.insert(code.to_string(), rate);
        }
        Self { rates }
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn supports(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    /// Override or add a rate (used by configuration overlays).
    pub fn set_rate(&mut self, code: &str, rate: f64) {
        self.rates.insert(code.to_string(), rate);
    }
}

/// Convert a minor-unit amount into another currency at the given rate,
/// rounding to the nearest minor unit.
pub fn convert_minor(base_minor: i64, rate: f64) -> i64 {
    (base_minor as f64 * rate).round() as i64
}
