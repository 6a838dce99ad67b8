use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use hickory_proto::rr::rdata::{A, AAAA, CNAME, HINFO, MX, NS, PTR, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record};

use crate::dns_types::RecordType;
use crate::error::{ProxyError, Result};

/// TTL given to every locally built answer
pub const LOCAL_TTL: u32 = 86400;

/// Longest character-string a record can carry on the wire
const MAX_CHARACTER_STRING: usize = 255;

/// Build answer records for the queried name out of literal rule values.
///
/// The record type decides how each value is read:
/// - A / AAAA: an address (`10.0.0.1`, `dead:beef::1`); ANY accepts either
/// - CNAME / NS / PTR: a domain name
/// - TXT: the text itself
/// - MX: `<preference> <exchange>`
/// - SRV: `<priority> <weight> <port> <target>`
/// - HINFO: `<cpu> <os>`
pub fn create_answer_records(
    rtype: RecordType,
    name: &Name,
    values: &[String],
) -> Result<Vec<Record>> {
    values
        .iter()
        .map(|value| {
            let rdata = parse_rdata(rtype, value)?;
            Ok(Record::from_rdata(name.clone(), LOCAL_TTL, rdata))
        })
        .collect()
}

fn parse_rdata(rtype: RecordType, value: &str) -> Result<RData> {
    let invalid = || ProxyError::InvalidAnswer {
        rtype,
        value: value.to_string(),
    };

    let rdata = match rtype {
        RecordType::A => RData::A(A::from(value.parse::<Ipv4Addr>().map_err(|_| invalid())?)),
        RecordType::AAAA => {
            RData::AAAA(AAAA::from(value.parse::<Ipv6Addr>().map_err(|_| invalid())?))
        }
        RecordType::ANY => match value.parse::<IpAddr>().map_err(|_| invalid())? {
            IpAddr::V4(ip) => RData::A(A::from(ip)),
            IpAddr::V6(ip) => RData::AAAA(AAAA::from(ip)),
        },
        RecordType::CNAME => RData::CNAME(CNAME(parse_name(value).ok_or_else(invalid)?)),
        RecordType::NS => RData::NS(NS(parse_name(value).ok_or_else(invalid)?)),
        RecordType::PTR => RData::PTR(PTR(parse_name(value).ok_or_else(invalid)?)),
        RecordType::TXT => {
            RData::TXT(TXT::new(vec![character_string(value).ok_or_else(invalid)?]))
        }
        RecordType::MX => {
            let fields: Vec<&str> = value.split_whitespace().collect();
            match fields.as_slice() {
                [preference, exchange] => RData::MX(MX::new(
                    preference.parse().map_err(|_| invalid())?,
                    parse_name(exchange).ok_or_else(invalid)?,
                )),
                _ => return Err(invalid()),
            }
        }
        RecordType::SRV => {
            let fields: Vec<&str> = value.split_whitespace().collect();
            match fields.as_slice() {
                [priority, weight, port, target] => RData::SRV(SRV::new(
                    priority.parse().map_err(|_| invalid())?,
                    weight.parse().map_err(|_| invalid())?,
                    port.parse().map_err(|_| invalid())?,
                    parse_name(target).ok_or_else(invalid)?,
                )),
                _ => return Err(invalid()),
            }
        }
        RecordType::HINFO => match value.split_once(char::is_whitespace) {
            Some((cpu, os)) => RData::HINFO(HINFO::new(
                character_string(cpu).ok_or_else(invalid)?,
                character_string(os.trim()).ok_or_else(invalid)?,
            )),
            None => return Err(invalid()),
        },
        RecordType::LOC | RecordType::MINFO | RecordType::SOA | RecordType::WKS => {
            return Err(invalid())
        }
    };

    Ok(rdata)
}

fn character_string(value: &str) -> Option<String> {
    (value.len() <= MAX_CHARACTER_STRING).then(|| value.to_string())
}

fn parse_name(value: &str) -> Option<Name> {
    Name::from_ascii(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Name {
        Name::from_ascii("example.com.").unwrap()
    }

    fn rdata_strings(rtype: RecordType, values: &[&str]) -> Vec<String> {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        create_answer_records(rtype, &owner(), &values)
            .unwrap()
            .iter()
            .map(|record| record.data().map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_a_records_keep_order() {
        assert_eq!(
            rdata_strings(RecordType::A, &["10.0.0.42", "10.0.0.43"]),
            vec!["10.0.0.42", "10.0.0.43"]
        );
    }

    #[test]
    fn test_records_use_query_name_and_ttl() {
        let records =
            create_answer_records(RecordType::A, &owner(), &["10.0.0.1".to_string()]).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), &owner());
        assert_eq!(records[0].ttl(), LOCAL_TTL);
    }

    #[test]
    fn test_aaaa_record() {
        assert_eq!(rdata_strings(RecordType::AAAA, &["dead:beef::1"]), vec!["dead:beef::1"]);
    }

    #[test]
    fn test_any_accepts_both_families() {
        let records = create_answer_records(
            RecordType::ANY,
            &owner(),
            &["10.0.0.1".to_string(), "::1".to_string()],
        )
        .unwrap();

        assert!(matches!(records[0].data(), Some(RData::A(_))));
        assert!(matches!(records[1].data(), Some(RData::AAAA(_))));
    }

    #[test]
    fn test_mx_and_srv_fields() {
        let records = create_answer_records(
            RecordType::MX,
            &owner(),
            &["10 mail.example.com".to_string()],
        )
        .unwrap();
        match records[0].data() {
            Some(RData::MX(mx)) => {
                assert_eq!(mx.preference(), 10);
                assert_eq!(mx.exchange(), &Name::from_ascii("mail.example.com").unwrap());
            }
            other => panic!("expected MX, got {:?}", other),
        }

        let records = create_answer_records(
            RecordType::SRV,
            &owner(),
            &["0 5 5060 sip.example.com".to_string()],
        )
        .unwrap();
        match records[0].data() {
            Some(RData::SRV(srv)) => {
                assert_eq!(srv.priority(), 0);
                assert_eq!(srv.weight(), 5);
                assert_eq!(srv.port(), 5060);
            }
            other => panic!("expected SRV, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_literal_is_rejected() {
        let result = create_answer_records(RecordType::A, &owner(), &["dead:beef::1".to_string()]);
        assert!(matches!(
            result,
            Err(ProxyError::InvalidAnswer { rtype: RecordType::A, value }) if value == "dead:beef::1"
        ));

        let result = create_answer_records(RecordType::MX, &owner(), &["mail.example.com".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_txt_longer_than_a_character_string_is_rejected() {
        assert_eq!(rdata_strings(RecordType::TXT, &[&"x".repeat(255)]).len(), 1);

        let result = create_answer_records(RecordType::TXT, &owner(), &["x".repeat(300)]);
        assert!(matches!(
            result,
            Err(ProxyError::InvalidAnswer { rtype: RecordType::TXT, .. })
        ));

        let hinfo = format!("{} linux", "c".repeat(256));
        let result = create_answer_records(RecordType::HINFO, &owner(), &[hinfo]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_literal_types() {
        for rtype in [RecordType::SOA, RecordType::LOC, RecordType::MINFO, RecordType::WKS] {
            let result = create_answer_records(rtype, &owner(), &["anything".to_string()]);
            assert!(matches!(result, Err(ProxyError::InvalidAnswer { .. })));
        }
    }
}
