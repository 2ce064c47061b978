use dotenv::dotenv;

pub struct Config {
    pub bind_addr: String,
    pub tick_interval_secs: u64,
    pub order_timeout_secs: u64,
    pub persist_interval_secs: u64,
    pub initial_balance: f64,
    pub state_file: String,
    pub okx_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        Ok(Config {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5300".to_string()),
            tick_interval_secs: std::env::var("TICK_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            order_timeout_secs: std::env::var("ORDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            persist_interval_secs: std::env::var("PERSIST_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            initial_balance: std::env::var("INITIAL_BALANCE")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000.0),
            state_file: std::env::var("STATE_FILE")
                .unwrap_or_else(|_| "./data/engine_state.json".to_string()),
            okx_base_url: std::env::var("OKX_BASE_URL")
                .unwrap_or_else(|_| "https://www.okx.com".to_string()),
        })
    }
}
