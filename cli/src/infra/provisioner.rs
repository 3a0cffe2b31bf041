//! Infrastructure implementation of the `Provisioner` port.
//!
//! DNS, TLS and ingress live outside this process. `HostProvisioner` checks
//! that every host a record will answer on is servable and reports the
//! public URLs for the journal.

use crate::application::ports::{ProvisionTarget, Provisioner};
use crate::domain::Environment;
use crate::domain::names::is_dns_label;
use crate::domain::routing::public_url;

/// Hostnames longer than this cannot be resolved.
const MAX_HOST_LEN: usize = 253;

/// Bundled provisioner: validates and records public hosts.
#[derive(Debug, Clone, Copy)]
pub struct HostProvisioner {
    environment: Environment,
}

impl HostProvisioner {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

fn check_host(host: &str) -> Result<(), String> {
    if host.len() > MAX_HOST_LEN {
        return Err(format!("host '{host}' is longer than {MAX_HOST_LEN} characters"));
    }
    if host.split('.').count() < 2 || !host.split('.').all(is_dns_label) {
        return Err(format!("host '{host}' is not a valid DNS name"));
    }
    Ok(())
}

impl Provisioner for HostProvisioner {
    fn provision(&self, target: &ProvisionTarget) -> Result<String, String> {
        if target.hosts.is_empty() {
            return Ok(format!("{} is ready", target.key.name));
        }
        for host in &target.hosts {
            check_host(host)?;
        }
        let urls: Vec<String> = target
            .hosts
            .iter()
            .map(|host| public_url(host, self.environment))
            .collect();
        Ok(format!("serving {}", urls.join(", ")))
    }
}
