// Market data module entrypoint
pub mod adapters;   // venue-specific REST ticker sources (OKX, Kraken)
pub mod normaliser; // converts wire strings -> validated Decimal quotes
pub mod feed;       // fetches both venues per cycle with timeout + retry
