//! Router metrics.
//!
//! # Metrics
//! - `router_matches_total` (counter): matches by route label
//! - `router_misses_total` (counter): requests no route accepted
//! - `router_conversion_failures_total` (counter): by parameter
//! - `router_reloads_total` (counter): by outcome (`ok`, `error`)

pub fn record_match(route: &str) {
    ::metrics::counter!("router_matches_total", "route" => route.to_string()).increment(1);
}

pub fn record_miss() {
    ::metrics::counter!("router_misses_total").increment(1);
}

pub fn record_conversion_failure(param: &str) {
    ::metrics::counter!("router_conversion_failures_total", "param" => param.to_string()).increment(1);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    ::metrics::counter!("router_reloads_total", "outcome" => outcome).increment(1);
}
