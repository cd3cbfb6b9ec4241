//! Hand-rolled BER/X.690 decoder scoped to exactly the two PDU shapes an
//! SNMP trap arrives as: v1 Trap-PDU (`[4]` context-constructed, tag
//! `0xA4`, RFC 1157) and v2c SNMPv2-Trap-PDU (`[7]` context-constructed,
//! tag `0xA7`, RFC 3416). `snmp2` (this crate's only other SNMP
//! dependency) is a client-GET library with no inbound trap-decode API, so
//! this is a deliberate, narrowly-scoped hand-rolled decoder rather than a
//! general-purpose one.
//!
//! Every other PDU type (GetRequest, GetResponse, SetRequest, ...) is
//! rejected with [`SnmpError::DecodeFailed`] rather than parsed: this
//! decoder exists to read traps, not to be a general SNMP message library.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::domain::errors::SnmpError;
use crate::domain::models::DecodedTrap;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_IP_ADDRESS: u8 = 0x40;
const TAG_COUNTER32: u8 = 0x41;
const TAG_GAUGE32: u8 = 0x42;
const TAG_TIMETICKS: u8 = 0x43;
const TAG_OPAQUE: u8 = 0x44;
const TAG_COUNTER64: u8 = 0x46;
const TAG_NO_SUCH_OBJECT: u8 = 0x80;
const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
const TAG_END_OF_MIB_VIEW: u8 = 0x82;
const TAG_TRAP_PDU_V1: u8 = 0xA4;
const TAG_TRAP_PDU_V2C: u8 = 0xA7;

/// RFC 1157 `generic-trap` values 0-5 map directly to a standard trap OID;
/// value 6 (`enterpriseSpecific`) means the real identity is
/// `{enterprise}.0.{specific-trap}`, per `TrapRouter::STANDARD_TRAPS` in
/// the original.
const GENERIC_TRAP_OIDS: [&str; 6] = [
    "1.3.6.1.6.3.1.1.5.1", // coldStart
    "1.3.6.1.6.3.1.1.5.2", // warmStart
    "1.3.6.1.6.3.1.1.5.3", // linkDown
    "1.3.6.1.6.3.1.1.5.4", // linkUp
    "1.3.6.1.6.3.1.1.5.5", // authenticationFailure
    "1.3.6.1.6.3.1.1.5.6", // egpNeighborLoss
];

/// One decoded tag/length/value triplet, with `rest` pointing past it.
struct Tlv<'a> {
    tag: u8,
    content: &'a [u8],
    rest: &'a [u8],
}

fn read_tlv(input: &[u8]) -> Result<Tlv<'_>, SnmpError> {
    let (&tag, after_tag) = input
        .split_first()
        .ok_or_else(|| SnmpError::DecodeFailed("truncated tag".to_string()))?;
    let (len, after_len) = read_length(after_tag)?;
    if after_len.len() < len {
        return Err(SnmpError::DecodeFailed("truncated value".to_string()));
    }
    let (content, rest) = after_len.split_at(len);
    Ok(Tlv { tag, content, rest })
}

fn read_length(input: &[u8]) -> Result<(usize, &[u8]), SnmpError> {
    let (&first, rest) = input
        .split_first()
        .ok_or_else(|| SnmpError::DecodeFailed("truncated length".to_string()))?;
    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }
    let num_bytes = (first & 0x7F) as usize;
    if num_bytes == 0 || num_bytes > 4 || rest.len() < num_bytes {
        return Err(SnmpError::DecodeFailed("unsupported length encoding".to_string()));
    }
    let (len_bytes, rest) = rest.split_at(num_bytes);
    let mut len = 0usize;
    for &b in len_bytes {
        len = (len << 8) | b as usize;
    }
    Ok((len, rest))
}

fn decode_integer(content: &[u8]) -> Result<i64, SnmpError> {
    if content.is_empty() {
        return Err(SnmpError::DecodeFailed("empty integer".to_string()));
    }
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | i64::from(b);
    }
    Ok(value)
}

fn decode_oid(content: &[u8]) -> Result<String, SnmpError> {
    if content.is_empty() {
        return Err(SnmpError::DecodeFailed("empty oid".to_string()));
    }
    let mut parts = vec![(content[0] / 40).to_string(), (content[0] % 40).to_string()];
    let mut acc: u64 = 0;
    for &b in &content[1..] {
        acc = (acc << 7) | u64::from(b & 0x7F);
        if b & 0x80 == 0 {
            parts.push(acc.to_string());
            acc = 0;
        }
    }
    Ok(parts.join("."))
}

fn decode_ip(content: &[u8]) -> String {
    if content.len() == 4 {
        format!("{}.{}.{}.{}", content[0], content[1], content[2], content[3])
    } else {
        hex(content)
    }
}

fn hex(content: &[u8]) -> String {
    content.iter().map(|b| format!("{b:02x}")).collect()
}

/// Stringifies a varbind value the way `DecodedTrap.varbinds` stores it:
/// numeric types print as decimal, OIDs dotted, IP addresses dotted-quad,
/// everything else as UTF-8 (lossily) or hex if it isn't valid text.
fn decode_value_str(tag: u8, content: &[u8]) -> String {
    match tag {
        TAG_INTEGER | TAG_COUNTER32 | TAG_GAUGE32 | TAG_TIMETICKS | TAG_COUNTER64 => {
            decode_integer(content).map_or_else(|_| hex(content), |v| v.to_string())
        }
        TAG_OID => decode_oid(content).unwrap_or_else(|_| hex(content)),
        TAG_IP_ADDRESS => decode_ip(content),
        TAG_NULL => String::new(),
        TAG_NO_SUCH_OBJECT => "noSuchObject".to_string(),
        TAG_NO_SUCH_INSTANCE => "noSuchInstance".to_string(),
        TAG_END_OF_MIB_VIEW => "endOfMibView".to_string(),
        TAG_OCTET_STRING | TAG_OPAQUE => std::str::from_utf8(content)
            .map(str::to_string)
            .unwrap_or_else(|_| hex(content)),
        _ => hex(content),
    }
}

/// Decodes a `SEQUENCE OF VarBind` (each a `SEQUENCE { oid, value }`) into
/// an ordered varbind list, preserving wire order (callers that need the
/// first two v2c varbinds positionally rely on this).
fn decode_varbind_list(mut content: &[u8]) -> Result<Vec<(String, String)>, SnmpError> {
    let mut out = Vec::new();
    while !content.is_empty() {
        let seq = read_tlv(content)?;
        if seq.tag != TAG_SEQUENCE {
            return Err(SnmpError::DecodeFailed("varbind is not a sequence".to_string()));
        }
        let oid_tlv = read_tlv(seq.content)?;
        if oid_tlv.tag != TAG_OID {
            return Err(SnmpError::DecodeFailed("varbind missing oid".to_string()));
        }
        let oid = decode_oid(oid_tlv.content)?;
        let value_tlv = read_tlv(oid_tlv.rest)?;
        let value = decode_value_str(value_tlv.tag, value_tlv.content);
        out.push((oid, value));
        content = seq.rest;
    }
    Ok(out)
}

/// Decodes one UDP datagram into a [`DecodedTrap`]. Accepts SNMPv1 and v2c
/// trap PDUs only.
pub fn decode_trap(datagram: &[u8], source_addr: SocketAddr) -> Result<DecodedTrap, SnmpError> {
    let message = read_tlv(datagram)?;
    if message.tag != TAG_SEQUENCE {
        return Err(SnmpError::DecodeFailed("not an snmp message".to_string()));
    }

    let version_tlv = read_tlv(message.content)?;
    if version_tlv.tag != TAG_INTEGER {
        return Err(SnmpError::DecodeFailed("missing version".to_string()));
    }
    let version = decode_integer(version_tlv.content)?;

    let community_tlv = read_tlv(version_tlv.rest)?;
    if community_tlv.tag != TAG_OCTET_STRING {
        return Err(SnmpError::DecodeFailed("missing community".to_string()));
    }
    let community = String::from_utf8_lossy(community_tlv.content).to_string();

    let pdu = read_tlv(community_tlv.rest)?;
    match (version, pdu.tag) {
        (0, TAG_TRAP_PDU_V1) => decode_v1_trap_pdu(pdu.content, source_addr, community),
        (1, TAG_TRAP_PDU_V2C) => decode_v2c_trap_pdu(pdu.content, source_addr, community),
        (_, other) => Err(SnmpError::DecodeFailed(format!(
            "unsupported pdu type 0x{other:02x} for version {version}"
        ))),
    }
}

fn decode_v1_trap_pdu(
    content: &[u8],
    source_addr: SocketAddr,
    community: String,
) -> Result<DecodedTrap, SnmpError> {
    let enterprise_tlv = read_tlv(content)?;
    let enterprise_oid = decode_oid(enterprise_tlv.content)?;

    let agent_addr_tlv = read_tlv(enterprise_tlv.rest)?;
    let generic_trap_tlv = read_tlv(agent_addr_tlv.rest)?;
    let generic_trap = decode_integer(generic_trap_tlv.content)?;

    let specific_trap_tlv = read_tlv(generic_trap_tlv.rest)?;
    let specific_trap = decode_integer(specific_trap_tlv.content)?;

    let timestamp_tlv = read_tlv(specific_trap_tlv.rest)?;
    let varbinds_tlv = read_tlv(timestamp_tlv.rest)?;
    if varbinds_tlv.tag != TAG_SEQUENCE {
        return Err(SnmpError::DecodeFailed("missing variable-bindings".to_string()));
    }
    let varbinds = decode_varbind_list(varbinds_tlv.content)?;

    let trap_oid = if (0..6).contains(&generic_trap) {
        GENERIC_TRAP_OIDS[generic_trap as usize].to_string()
    } else {
        format!("{enterprise_oid}.0.{specific_trap}")
    };

    Ok(DecodedTrap {
        source_addr,
        community,
        trap_oid,
        varbinds: varbinds.into_iter().collect::<BTreeMap<_, _>>(),
    })
}

const SYS_UP_TIME_OID: &str = "1.3.6.1.2.1.1.3.0";
const SNMP_TRAP_OID: &str = "1.3.6.1.6.3.1.1.4.1.0";

fn decode_v2c_trap_pdu(
    content: &[u8],
    source_addr: SocketAddr,
    community: String,
) -> Result<DecodedTrap, SnmpError> {
    let request_id_tlv = read_tlv(content)?;
    let error_status_tlv = read_tlv(request_id_tlv.rest)?;
    let error_index_tlv = read_tlv(error_status_tlv.rest)?;
    let varbinds_tlv = read_tlv(error_index_tlv.rest)?;
    if varbinds_tlv.tag != TAG_SEQUENCE {
        return Err(SnmpError::DecodeFailed("missing variable-bindings".to_string()));
    }

    let varbinds = decode_varbind_list(varbinds_tlv.content)?;
    let trap_oid = varbinds
        .iter()
        .find(|(oid, _)| oid == SNMP_TRAP_OID)
        .map(|(_, value)| value.clone())
        .ok_or_else(|| SnmpError::DecodeFailed("missing snmpTrapOID varbind".to_string()))?;

    let varbinds = varbinds
        .into_iter()
        .filter(|(oid, _)| oid != SYS_UP_TIME_OID && oid != SNMP_TRAP_OID)
        .collect();

    Ok(DecodedTrap {
        source_addr,
        community,
        trap_oid,
        varbinds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag, content.len() as u8];
        out.extend_from_slice(content);
        out
    }

    fn encode_oid(arcs: &[u64]) -> Vec<u8> {
        let mut out = vec![(arcs[0] * 40 + arcs[1]) as u8];
        for &arc in &arcs[2..] {
            if arc < 128 {
                out.push(arc as u8);
            } else {
                let mut bytes = Vec::new();
                let mut v = arc;
                bytes.push((v & 0x7F) as u8);
                v >>= 7;
                while v > 0 {
                    bytes.push((v & 0x7F) as u8 | 0x80);
                    v >>= 7;
                }
                bytes.reverse();
                out.extend_from_slice(&bytes);
            }
        }
        out
    }

    fn varbind(oid: &[u64], value: Vec<u8>) -> Vec<u8> {
        let oid_bytes = tlv(TAG_OID, &encode_oid(oid));
        let mut inner = oid_bytes;
        inner.extend_from_slice(&value);
        tlv(TAG_SEQUENCE, &inner)
    }

    fn addr() -> SocketAddr {
        "10.2.2.2:162".parse().unwrap()
    }

    #[test]
    fn decodes_v1_link_down_trap() {
        let enterprise = tlv(TAG_OID, &encode_oid(&[1, 3, 6, 1, 4, 1, 6141]));
        let agent_addr = tlv(TAG_IP_ADDRESS, &[10, 2, 2, 2]);
        let generic_trap = tlv(TAG_INTEGER, &[2]); // linkDown
        let specific_trap = tlv(TAG_INTEGER, &[0]);
        let timestamp = tlv(TAG_TIMETICKS, &[0]);
        let vb = varbind(&[1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 3], tlv(TAG_OCTET_STRING, b"3"));
        let mut varbinds_content = Vec::new();
        varbinds_content.extend_from_slice(&vb);
        let varbinds = tlv(TAG_SEQUENCE, &varbinds_content);

        let mut pdu_content = Vec::new();
        pdu_content.extend_from_slice(&enterprise);
        pdu_content.extend_from_slice(&agent_addr);
        pdu_content.extend_from_slice(&generic_trap);
        pdu_content.extend_from_slice(&specific_trap);
        pdu_content.extend_from_slice(&timestamp);
        pdu_content.extend_from_slice(&varbinds);
        let pdu = tlv(TAG_TRAP_PDU_V1, &pdu_content);

        let version = tlv(TAG_INTEGER, &[0]);
        let community = tlv(TAG_OCTET_STRING, b"public");
        let mut message_content = Vec::new();
        message_content.extend_from_slice(&version);
        message_content.extend_from_slice(&community);
        message_content.extend_from_slice(&pdu);
        let message = tlv(TAG_SEQUENCE, &message_content);

        let decoded = decode_trap(&message, addr()).unwrap();
        assert_eq!(decoded.trap_oid, "1.3.6.1.6.3.1.1.5.3");
        assert_eq!(decoded.community, "public");
        assert_eq!(decoded.varbinds.len(), 1);
    }

    #[test]
    fn decodes_v2c_trap_with_snmp_trap_oid_varbind() {
        let sys_uptime = varbind(&[1, 3, 6, 1, 2, 1, 1, 3, 0], tlv(TAG_TIMETICKS, &[5]));
        let trap_oid_varbind = varbind(
            &[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0],
            tlv(TAG_OID, &encode_oid(&[1, 3, 6, 1, 6, 3, 1, 1, 5, 4])),
        );
        let mut varbinds_content = Vec::new();
        varbinds_content.extend_from_slice(&sys_uptime);
        varbinds_content.extend_from_slice(&trap_oid_varbind);
        let varbinds = tlv(TAG_SEQUENCE, &varbinds_content);

        let request_id = tlv(TAG_INTEGER, &[1]);
        let error_status = tlv(TAG_INTEGER, &[0]);
        let error_index = tlv(TAG_INTEGER, &[0]);
        let mut pdu_content = Vec::new();
        pdu_content.extend_from_slice(&request_id);
        pdu_content.extend_from_slice(&error_status);
        pdu_content.extend_from_slice(&error_index);
        pdu_content.extend_from_slice(&varbinds);
        let pdu = tlv(TAG_TRAP_PDU_V2C, &pdu_content);

        let version = tlv(TAG_INTEGER, &[1]);
        let community = tlv(TAG_OCTET_STRING, b"public");
        let mut message_content = Vec::new();
        message_content.extend_from_slice(&version);
        message_content.extend_from_slice(&community);
        message_content.extend_from_slice(&pdu);
        let message = tlv(TAG_SEQUENCE, &message_content);

        let decoded = decode_trap(&message, addr()).unwrap();
        assert_eq!(decoded.trap_oid, "1.3.6.1.6.3.1.1.5.4");
        assert!(decoded.varbinds.is_empty());
    }

    #[test]
    fn rejects_non_trap_pdu() {
        let message = tlv(TAG_SEQUENCE, &tlv(TAG_INTEGER, &[0]));
        assert!(decode_trap(&message, addr()).is_err());
    }

    #[test]
    fn oid_round_trips_through_encode_decode() {
        let arcs = [1, 3, 6, 1, 4, 1, 6141, 2, 60, 5, 0, 1];
        let encoded = encode_oid(&arcs);
        let decoded = decode_oid(&encoded).unwrap();
        assert_eq!(decoded, "1.3.6.1.4.1.6141.2.60.5.0.1");
    }
}
