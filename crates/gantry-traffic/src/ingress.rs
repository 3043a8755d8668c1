//! `Traffic` adapter for the Kubernetes networking/v1 Ingress.
//!
//! Controller-owned fields are the rule hosts and the TLS section. Sync
//! annotation snapshots are serialized Ingress objects; endpoints come from
//! `status.loadBalancer.ingress`.

use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec, IngressTLS};

use gantry_common::{
    ResourceLike, Result, TRANSFORM_HOST_ANNOTATION, TRANSFORM_TLS_ANNOTATION,
};

use crate::dns::{targets_from_sync_annotations, Target};
use crate::transform::record_or_keep;
use crate::Traffic;

/// Hosts currently set on the ingress rules, in rule order.
fn rule_hosts(ingress: &Ingress) -> Vec<String> {
    ingress
        .spec
        .iter()
        .flat_map(|spec| spec.rules.iter().flatten())
        .filter_map(|rule| rule.host.clone())
        .collect()
}

impl Traffic for Ingress {
    fn transform(&mut self, original: &Self) -> Result<()> {
        let staged_hosts = rule_hosts(self);
        let staged_tls: Option<Vec<IngressTLS>> =
            self.spec.as_ref().and_then(|spec| spec.tls.clone());
        let original_tls: Option<Vec<IngressTLS>> =
            original.spec.as_ref().and_then(|spec| spec.tls.clone());

        let annotations = self.annotations_mut();
        record_or_keep(
            annotations,
            TRANSFORM_HOST_ANNOTATION,
            &staged_hosts,
            &rule_hosts(original),
        )?;
        record_or_keep(
            annotations,
            TRANSFORM_TLS_ANNOTATION,
            &staged_tls,
            &original_tls,
        )?;

        self.spec = original.spec.clone();
        Ok(())
    }

    fn dns_targets(&self) -> Result<Vec<Target>> {
        Ok(targets_from_sync_annotations(self, |snapshot: &Ingress| {
            let mut endpoints = Vec::new();
            let lb_ingress = snapshot
                .status
                .iter()
                .filter_map(|status| status.load_balancer.as_ref())
                .flat_map(|lb| lb.ingress.iter().flatten());
            for endpoint in lb_ingress {
                if let Some(hostname) = &endpoint.hostname {
                    endpoints.push(hostname.clone());
                }
                if let Some(ip) = &endpoint.ip {
                    endpoints.push(ip.clone());
                }
            }
            endpoints
        }))
    }

    fn set_managed_host(&mut self, host: &str) {
        let spec = self.spec.get_or_insert_with(IngressSpec::default);
        match spec.rules.as_mut().filter(|rules| !rules.is_empty()) {
            Some(rules) => {
                for rule in rules {
                    rule.host = Some(host.to_string());
                }
            }
            None => {
                spec.rules = Some(vec![IngressRule {
                    host: Some(host.to_string()),
                    http: None,
                }]);
            }
        }
    }

    fn apply_tls(&mut self, host: &str, secret: &str) {
        let spec = self.spec.get_or_insert_with(IngressSpec::default);
        spec.tls = Some(vec![IngressTLS {
            hosts: Some(vec![host.to_string()]),
            secret_name: Some(secret.to_string()),
        }]);
    }
}
