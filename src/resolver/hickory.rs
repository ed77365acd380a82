//! SRV queries and answers in [`hickory_proto`]'s message model.

use crate::{ServiceRecord, SrvRecord};
use hickory_proto::{
    error::ProtoResult,
    op::{Edns, Message, MessageType, OpCode, Query},
    rr::{rdata::SRV, Name, RData, Record, RecordType},
};

/// EDNS0 payload size advertised in queries.
pub(crate) const EDNS_PAYLOAD: u16 = 4096;

/// Parses `hostname` as a fully-qualified name, appending the root label if
/// it is missing.
pub(crate) fn fqdn(hostname: &str) -> ProtoResult<Name> {
    if hostname.ends_with('.') {
        Name::from_ascii(hostname)
    } else {
        Name::from_ascii(format!("{hostname}."))
    }
}

/// Builds a recursive SRV query for `name`, optionally advertising EDNS0.
pub(crate) fn srv_query(name: &Name, edns: bool) -> Message {
    let mut message = Message::new();
    message
        .set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name.clone(), RecordType::SRV));

    if edns {
        let mut edns = Edns::new();
        edns.set_max_payload(EDNS_PAYLOAD);
        edns.set_version(0);
        message.set_edns(edns);
    }

    message
}

/// Collects the SRV records of a response's answer section, in order.
pub(crate) fn extract_records(response: &Message) -> Vec<ServiceRecord> {
    response
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::SRV(srv)) => Some(ServiceRecord::new(
                srv.priority(),
                srv.weight(),
                srv.port(),
                srv.target().to_string(),
            )),
            _ => None,
        })
        .collect()
}

/// Returns the records with every target that names an A or AAAA record of
/// `additionals` replaced by that record's address. Only exact name matches
/// are replaced.
pub(crate) fn substitute_addresses(
    records: Vec<ServiceRecord>,
    additionals: &[Record],
) -> Vec<ServiceRecord> {
    records
        .into_iter()
        .map(|record| match address_for(&record.target, additionals) {
            Some(addr) => record.with_target(addr),
            None => record,
        })
        .collect()
}

fn address_for(target: &str, additionals: &[Record]) -> Option<String> {
    additionals.iter().find_map(|extra| {
        let addr = match extra.data() {
            Some(RData::A(a)) => a.0.to_string(),
            Some(RData::AAAA(aaaa)) => aaaa.0.to_string(),
            _ => return None,
        };
        (extra.name().to_string() == target).then_some(addr)
    })
}

impl SrvRecord for SRV {
    type Target = Name;

    fn target(&self) -> &Self::Target {
        self.target()
    }

    fn port(&self) -> u16 {
        self.port()
    }

    fn priority(&self) -> u16 {
        self.priority()
    }

    fn weight(&self) -> u16 {
        self.weight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::{A, AAAA, TXT};
    use std::{
        net::{Ipv4Addr, Ipv6Addr},
        str::FromStr,
    };

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn srv(priority: u16, weight: u16, port: u16, target: &str) -> Record {
        Record::from_rdata(
            name("_svc._tcp.test."),
            60,
            RData::SRV(SRV::new(priority, weight, port, name(target))),
        )
    }

    #[test]
    fn fqdn_appends_root() {
        assert_eq!(fqdn("_svc._tcp.test").unwrap(), name("_svc._tcp.test."));
        assert_eq!(fqdn("_svc._tcp.test.").unwrap(), name("_svc._tcp.test."));
        assert!(fqdn("_svc._tcp.test").unwrap().is_fqdn());
    }

    #[test]
    fn query_with_and_without_edns() {
        let with = srv_query(&name("_svc._tcp.test."), true);
        assert_eq!(with.queries().len(), 1);
        assert_eq!(with.queries()[0].query_type(), RecordType::SRV);
        assert!(with.recursion_desired());
        assert_eq!(with.extensions().as_ref().map(Edns::max_payload), Some(EDNS_PAYLOAD));

        let without = srv_query(&name("_svc._tcp.test."), false);
        assert!(without.extensions().is_none());
    }

    #[test]
    fn extract_keeps_srv_answers_in_order() {
        let mut response = Message::new();
        response
            .add_answer(srv(2, 0, 80, "b.test."))
            .add_answer(Record::from_rdata(
                name("_svc._tcp.test."),
                60,
                RData::TXT(TXT::new(vec!["hello".into()])),
            ))
            .add_answer(srv(1, 10, 81, "a.test."));

        assert_eq!(
            extract_records(&response),
            vec![
                ServiceRecord::new(2, 0, 80, "b.test."),
                ServiceRecord::new(1, 10, 81, "a.test."),
            ]
        );
    }

    #[test]
    fn substitution_requires_exact_name() {
        let additionals = vec![
            Record::from_rdata(
                name("host1."),
                60,
                RData::A(A(Ipv4Addr::new(10, 0, 0, 5))),
            ),
            Record::from_rdata(
                name("host2."),
                60,
                RData::AAAA(AAAA(Ipv6Addr::LOCALHOST)),
            ),
            Record::from_rdata(
                name("other.host3."),
                60,
                RData::A(A(Ipv4Addr::new(10, 0, 0, 7))),
            ),
        ];
        let records = vec![
            ServiceRecord::new(0, 0, 80, "host1."),
            ServiceRecord::new(0, 0, 80, "host2."),
            ServiceRecord::new(0, 0, 80, "host3."),
        ];

        assert_eq!(
            substitute_addresses(records, &additionals),
            vec![
                ServiceRecord::new(0, 0, 80, "10.0.0.5"),
                ServiceRecord::new(0, 0, 80, "::1"),
                ServiceRecord::new(0, 0, 80, "host3."),
            ]
        );
    }

    #[test]
    fn hickory_srv_is_a_record() {
        let record = SRV::new(3, 4, 5, name("host1."));
        assert_eq!(SrvRecord::priority(&record), 3);
        assert_eq!(SrvRecord::weight(&record), 4);
        assert_eq!(SrvRecord::port(&record), 5);
        assert_eq!(SrvRecord::target(&record).to_string(), "host1.");
    }

    #[test]
    fn selection_over_hickory_srv() {
        use crate::policy::{pick_one, sort_all};
        use rand::{rngs::StdRng, SeedableRng};

        let mut records = vec![
            SRV::new(2, 100, 80, name("backup.")),
            SRV::new(1, 0, 80, name("idle.")),
            SRV::new(1, 10, 80, name("primary.")),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let picked = pick_one(&records, &mut rng).unwrap();
            assert_eq!(picked.target(), &name("primary."));
        }

        sort_all(&mut records);
        let targets = records
            .iter()
            .map(|record| record.target().to_string())
            .collect::<Vec<_>>();
        assert_eq!(targets, vec!["primary.", "idle.", "backup."]);
    }
}
