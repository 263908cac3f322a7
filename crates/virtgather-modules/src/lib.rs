//! virtgather-modules: platform collector implementations
//!
//! One module per supported platform, plus [`builtin_registry`] which wires
//! them all into a [`Registry`] for the dispatch engine.

pub mod error;
pub mod file;
pub mod kubernetes;
pub mod libvirt;
pub mod nutanix;
pub mod proxmox;

mod util;

use virtgather_core::Registry;

pub use error::CollectError;

/// Registry of all compiled-in modules
#[must_use]
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("File", || Box::new(file::FileCollector::new()));
    registry.register("Kubernetes", || {
        Box::new(kubernetes::KubernetesCollector::new())
    });
    registry.register("Libvirt", || Box::new(libvirt::LibvirtCollector::new()));
    registry.register("NutanixAHV", || Box::new(nutanix::NutanixCollector::new()));
    registry.register("Proxmox", || Box::new(proxmox::ProxmoxCollector::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let registry = builtin_registry();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["File", "Kubernetes", "Libvirt", "NutanixAHV", "Proxmox"]
        );
    }

    #[test]
    fn test_list_available_is_offline() {
        // Parameter templates come from compiled-in declarations only.
        let listing = builtin_registry().list_available();
        assert_eq!(listing.len(), 5);

        let file = listing["File"].as_object().unwrap();
        assert_eq!(file["module"], "File");
        assert_eq!(file["url"], "");

        let nutanix = listing["NutanixAHV"].as_object().unwrap();
        assert_eq!(nutanix["port"], 443);
    }
}
