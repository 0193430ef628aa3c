//! Host identity derivation (§3).
//!
//! `hostname + "_" + ip_address` when both are present; otherwise whichever
//! is non-empty; falling back to the sample's `name` field. A sample with
//! nothing usable is rejected rather than silently stored under an empty
//! key.

use crate::error::IdentityError;
use crate::model::MonitorInfo;

pub fn derive_host_id(info: &MonitorInfo) -> Result<String, IdentityError> {
    if let Some(host) = &info.host_info {
        let hostname = host.hostname.trim();
        let ip = host.ip_address.trim();
        match (hostname.is_empty(), ip.is_empty()) {
            (false, false) => return Ok(format!("{}_{}", hostname, ip)),
            (false, true) => return Ok(hostname.to_string()),
            (true, false) => return Ok(ip.to_string()),
            (true, true) => {}
        }
    }
    let name = info.name.trim();
    if !name.is_empty() {
        return Ok(name.to_string());
    }
    Err(IdentityError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HostInfo;

    fn info(hostname: &str, ip: &str, name: &str) -> MonitorInfo {
        MonitorInfo {
            name: name.to_string(),
            host_info: Some(HostInfo {
                hostname: hostname.to_string(),
                ip_address: ip.to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn combines_hostname_and_ip() {
        let m = info("web-01", "10.0.0.5", "");
        assert_eq!(derive_host_id(&m).unwrap(), "web-01_10.0.0.5");
    }

    #[test]
    fn falls_back_to_hostname_only() {
        let m = info("web-01", "", "");
        assert_eq!(derive_host_id(&m).unwrap(), "web-01");
    }

    #[test]
    fn falls_back_to_ip_only() {
        let m = info("", "10.0.0.5", "");
        assert_eq!(derive_host_id(&m).unwrap(), "10.0.0.5");
    }

    #[test]
    fn falls_back_to_name_when_host_info_absent() {
        let m = MonitorInfo {
            name: "legacy-host".to_string(),
            host_info: None,
            ..Default::default()
        };
        assert_eq!(derive_host_id(&m).unwrap(), "legacy-host");
    }

    #[test]
    fn rejects_sample_with_no_identity() {
        let m = info("", "", "");
        assert!(derive_host_id(&m).is_err());
    }

    #[test]
    fn whitespace_only_fields_are_treated_as_empty() {
        let m = info("  ", "  ", "  ");
        assert!(derive_host_id(&m).is_err());
    }
}
