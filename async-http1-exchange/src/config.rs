use core::time::Duration;

use http1_exchange_spec::head_parser::HeadParseConfig;

//
//
//
// 64 KiB, same bound sun.net.httpserver applies to leftover request bytes.
pub(crate) const DRAIN_LIMIT_DEFAULT: u64 = 64 * 1024;
pub(crate) const BUF_CAPACITY_DEFAULT: usize = 8 * 1024;
const BUF_CAPACITY_MIN: usize = 2 * 1024;

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    drain_limit: u64,
    buf_capacity: usize,
    idle_timeout: Duration,
    head_parse_config: HeadParseConfig,
}
impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            drain_limit: DRAIN_LIMIT_DEFAULT,
            buf_capacity: BUF_CAPACITY_DEFAULT,
            idle_timeout: Duration::from_secs(5),
            head_parse_config: HeadParseConfig::default(),
        }
    }
}
impl ExchangeConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_drain_limit(&mut self, value: u64) -> &mut Self {
        self.drain_limit = value;
        self
    }
    pub fn get_drain_limit(&self) -> u64 {
        self.drain_limit
    }
    pub fn set_buf_capacity(&mut self, value: usize) -> &mut Self {
        self.buf_capacity = value.max(BUF_CAPACITY_MIN);
        self
    }
    pub fn get_buf_capacity(&self) -> usize {
        self.buf_capacity
    }
    pub fn set_idle_timeout(&mut self, dur: Duration) -> &mut Self {
        self.idle_timeout = dur;
        self
    }
    pub fn get_idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
    pub fn set_head_parse_config(&mut self, config: HeadParseConfig) -> &mut Self {
        self.head_parse_config = config;
        self
    }
    pub fn get_head_parse_config(&self) -> &HeadParseConfig {
        &self.head_parse_config
    }
}
