//! Rate-of-change law (I4), grounded on the delta/dt helpers in the
//! teacher's `rates.rs` — but simplified to the spec's literal formula
//! rather than a counter-regression-aware delta:
//!
//! ```text
//! rate(now, last) = 0                  if last == 0
//!                  = (now - last) / last
//! ```
//!
//! Applied independently per field of a `PerfSample` against the shard
//! worker's privately-owned last-sample table (I1).

use crate::model::PerfSample;

/// `(now - last) / last`, or `0.0` when there is no prior value to compare
/// against (first sample for a host, or a prior value of exactly zero).
pub fn df64(now: f64, last: f64) -> f64 {
    if last == 0.0 {
        0.0
    } else {
        (now - last) / last
    }
}

/// Applies the rate law field-by-field, returning a `PerfSample` of rates
/// rather than absolute values.
pub fn sample_rates(now: &PerfSample, last: &PerfSample) -> PerfSample {
    PerfSample {
        cpu_percent: df64(now.cpu_percent, last.cpu_percent),
        usr_percent: df64(now.usr_percent, last.usr_percent),
        system_percent: df64(now.system_percent, last.system_percent),
        mem_used_percent: df64(now.mem_used_percent, last.mem_used_percent),
        load_avg_1: df64(now.load_avg_1, last.load_avg_1),
        disk_util_percent: df64(now.disk_util_percent, last.disk_util_percent),
        net_rcv_mib_s: df64(now.net_rcv_mib_s, last.net_rcv_mib_s),
        net_send_mib_s: df64(now.net_send_mib_s, last.net_send_mib_s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_last_yields_zero_rate() {
        assert_eq!(df64(42.0, 0.0), 0.0);
    }

    #[test]
    fn computes_relative_change() {
        assert_eq!(df64(110.0, 100.0), 0.1);
        assert_eq!(df64(90.0, 100.0), -0.1);
    }

    #[test]
    fn first_sample_for_host_has_all_zero_rates() {
        let now = PerfSample {
            cpu_percent: 55.0,
            ..Default::default()
        };
        let last = PerfSample::default();
        let rates = sample_rates(&now, &last);
        assert_eq!(rates, PerfSample::default());
    }
}
