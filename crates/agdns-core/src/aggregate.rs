//! Record aggregation
//!
//! Every managed rule holds exactly one target. External-dns expects one
//! endpoint per name with all targets, so fragments are merged here.

use crate::endpoint::Endpoint;
use std::collections::HashMap;

/// Merge single-target fragments into endpoints keyed by DNS name
///
/// Names keep the order in which they were first seen, and targets are
/// appended in encounter order. The merge key is the name alone: record type
/// and labels of the first fragment win for the merged endpoint.
pub fn aggregate<I>(fragments: I) -> Vec<Endpoint>
where
    I: IntoIterator<Item = Endpoint>,
{
    let mut endpoints: Vec<Endpoint> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        match by_name.get(&fragment.dns_name) {
            Some(&idx) => endpoints[idx].targets.extend(fragment.targets),
            None => {
                by_name.insert(fragment.dns_name.clone(), endpoints.len());
                endpoints.push(fragment);
            }
        }
    }

    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::RecordType;

    #[test]
    fn test_targets_keep_encounter_order() {
        let fragments = ["1.1.1.1", "1.2.1.1", "1.3.1.1", "1.4.1.1"]
            .into_iter()
            .map(|ip| Endpoint::new("example.com", RecordType::A, [ip]));

        let merged = aggregate(fragments);

        assert_eq!(
            merged,
            vec![Endpoint::new(
                "example.com",
                RecordType::A,
                ["1.1.1.1", "1.2.1.1", "1.3.1.1", "1.4.1.1"]
            )]
        );
    }

    #[test]
    fn test_names_keep_first_seen_order() {
        let merged = aggregate(vec![
            Endpoint::new("b.example.com", RecordType::A, ["1"]),
            Endpoint::new("a.example.com", RecordType::A, ["2"]),
            Endpoint::new("b.example.com", RecordType::A, ["3"]),
        ]);

        let names: Vec<_> = merged.iter().map(|e| e.dns_name.as_str()).collect();
        assert_eq!(names, ["b.example.com", "a.example.com"]);
        assert_eq!(merged[0].targets, ["1", "3"]);
    }

    #[test]
    fn test_mixed_types_collapse_into_first_type() {
        let merged = aggregate(vec![
            Endpoint::new("example.com", RecordType::Txt, ["owner"]),
            Endpoint::new("example.com", RecordType::A, ["1.1.1.1"]),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].record_type, RecordType::Txt);
        assert_eq!(merged[0].targets, ["owner", "1.1.1.1"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
