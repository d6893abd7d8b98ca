use crate::api::models::resources::Resource;
use crate::ui::state::RecordKey;

/// Records whose `Name` starts with `term`, ignoring case, in their original order.
///
/// An empty term matches everything, including records without a name. A non-empty
/// term never matches a record without one.
pub fn filter_records<'a>(records: &'a [Resource], term: &str) -> Vec<(RecordKey, &'a Resource)> {
    let needle = term.to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| needle.is_empty() || record.name().is_some_and(|name| name.to_lowercase().starts_with(&needle)))
        .map(|(index, record)| (RecordKey(index), record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn records(values: Vec<Value>) -> Vec<Resource> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    fn names<'a>(matches: &[(RecordKey, &'a Resource)]) -> Vec<Option<&'a str>> {
        matches.iter().map(|(_, r)| r.name()).collect()
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        let list = records(vec![json!({"Name": "Alice"}), json!({"Name": "bob"}), json!({"Name": "ALBERT"})]);

        let matches = filter_records(&list, "al");

        assert_eq!(names(&matches), vec![Some("Alice"), Some("ALBERT")]);
        assert_eq!(matches[1].0, RecordKey(2));
    }

    #[test]
    fn test_prefix_not_substring() {
        let list = records(vec![json!({"Name": "Malice"})]);
        assert!(filter_records(&list, "al").is_empty());
    }

    #[test]
    fn test_empty_term_keeps_everything() {
        let list = records(vec![json!({"Name": "Alice"}), json!({"Location": "nowhere"}), json!({"Name": null})]);
        assert_eq!(filter_records(&list, "").len(), 3);
    }

    #[test]
    fn test_unnamed_records_never_match_a_term() {
        let list = records(vec![json!({"Location": "nowhere"}), json!({"Name": null}), json!({"Name": 42})]);
        assert!(filter_records(&list, "n").is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let list = records(vec![json!({"Name": "Agu"}), json!({"Name": "Allan"}), json!({"Name": "Elis"})]);

        let once: Vec<Resource> = filter_records(&list, "A").into_iter().map(|(_, r)| r.clone()).collect();
        let twice: Vec<Resource> = filter_records(&once, "A").into_iter().map(|(_, r)| r.clone()).collect();

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_duplicate_names_keep_distinct_keys() {
        let list = records(vec![json!({"Name": "Agu"}), json!({"Name": "Agu"})]);
        let keys: Vec<RecordKey> = filter_records(&list, "agu").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![RecordKey(0), RecordKey(1)]);
    }
}
