pub mod bot;
pub mod engine;
pub mod market_data;
pub mod settings;
pub mod telemetry;
