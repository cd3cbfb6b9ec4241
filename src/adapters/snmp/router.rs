//! Vendor routing by enterprise-OID prefix.

use crate::domain::models::DecodedTrap;

/// `(enterprise OID prefix, vendor tag)`, checked in table order against
/// both a synthesized enterprise OID and the trap OID itself.
const VENDOR_OIDS: &[(&str, &str)] = &[
    ("1.3.6.1.4.1.6141", "ciena"),  // Ciena WWP (SAOS)
    ("1.3.6.1.4.1.1271", "ciena"),  // Ciena CES
    ("1.3.6.1.4.1.9", "cisco"),
    ("1.3.6.1.4.1.2636", "juniper"),
    ("1.3.6.1.4.1.8072", "linux"),  // Net-SNMP
    ("1.3.6.1.4.1.2021", "linux"),  // UCD-SNMP
    ("1.3.6.1.4.1.11", "hp"),
    ("1.3.6.1.4.1.674", "dell"),
];

const STANDARD_TRAPS: &[&str] = &[
    "1.3.6.1.6.3.1.1.5.1",
    "1.3.6.1.6.3.1.1.5.2",
    "1.3.6.1.6.3.1.1.5.3",
    "1.3.6.1.6.3.1.1.5.4",
    "1.3.6.1.6.3.1.1.5.5",
    "1.3.6.1.6.3.1.1.5.6",
];

const SNMP_TRAP_ENTERPRISE_OID: &str = "1.3.6.1.6.3.1.1.4.3";

pub struct TrapRouter;

impl TrapRouter {
    /// The enterprise OID carried on the trap, if any: the
    /// `snmpTrapEnterprise` varbind when present (v2c), otherwise the
    /// `trap_oid` with its last two arcs stripped — the enterprise OID is
    /// usually the prefix of the trap OID.
    fn enterprise_oid(trap: &DecodedTrap) -> Option<String> {
        if let Some(value) = trap.varbinds.get(SNMP_TRAP_ENTERPRISE_OID) {
            return Some(value.clone());
        }
        let mut arcs: Vec<&str> = trap.trap_oid.split('.').collect();
        if arcs.len() > 2 {
            arcs.truncate(arcs.len() - 2);
            Some(arcs.join("."))
        } else {
            None
        }
    }

    /// Determines which vendor handler should process this trap.
    pub fn route(trap: &DecodedTrap) -> &'static str {
        let enterprise_oid = Self::enterprise_oid(trap);

        for (prefix, vendor) in VENDOR_OIDS {
            if enterprise_oid.as_deref().is_some_or(|oid| oid.starts_with(prefix))
                || trap.trap_oid.starts_with(prefix)
            {
                return vendor;
            }
        }

        if STANDARD_TRAPS.contains(&trap.trap_oid.as_str()) {
            return "standard";
        }

        "generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn trap(trap_oid: &str, varbinds: BTreeMap<String, String>) -> DecodedTrap {
        DecodedTrap {
            source_addr: "10.2.2.2:162".parse().unwrap(),
            community: "public".to_string(),
            trap_oid: trap_oid.to_string(),
            varbinds,
        }
    }

    #[test]
    fn routes_ciena_by_trap_oid_prefix() {
        let t = trap("1.3.6.1.4.1.6141.2.60.5.0.1", BTreeMap::new());
        assert_eq!(TrapRouter::route(&t), "ciena");
    }

    #[test]
    fn routes_by_enterprise_varbind_when_trap_oid_is_standard() {
        let mut vb = BTreeMap::new();
        vb.insert(SNMP_TRAP_ENTERPRISE_OID.to_string(), "1.3.6.1.4.1.9.1.1".to_string());
        let t = trap("1.3.6.1.6.3.1.1.5.3", vb);
        assert_eq!(TrapRouter::route(&t), "cisco");
    }

    #[test]
    fn routes_standard_trap_with_no_vendor_match() {
        let t = trap("1.3.6.1.6.3.1.1.5.1", BTreeMap::new());
        assert_eq!(TrapRouter::route(&t), "standard");
    }

    #[test]
    fn falls_back_to_generic() {
        let t = trap("1.3.6.1.4.1.12345.1.2.3", BTreeMap::new());
        assert_eq!(TrapRouter::route(&t), "generic");
    }
}
