//! Sample grouping by table name prefix.
//!
//! Tables produced by one sample run share a naming convention:
//! `<project>_<run>_<detail>`. The first two underscore separated tokens form
//! the sample key. This is a naming heuristic only; nothing in the schema
//! relates the grouped tables.

use crate::models::SampleGroup;

/// Sample key of a table name: its first two `_`-separated tokens.
///
/// Names with a single token are their own key.
pub fn sample_key(table: &str) -> String {
    table.split('_').take(2).collect::<Vec<_>>().join("_")
}

/// Partitions table names into sample groups.
///
/// Group order is the order each key is first seen; member order is input
/// order.
pub fn group_by_sample<S: AsRef<str>>(tables: &[S]) -> Vec<SampleGroup> {
    let mut groups: Vec<SampleGroup> = Vec::new();
    for table in tables {
        let table = table.as_ref();
        let key = sample_key(table);
        match groups.iter_mut().find(|group| group.key == key) {
            Some(group) => group.tables.push(table.to_string()),
            None => groups.push(SampleGroup {
                key,
                tables: vec![table.to_string()],
            }),
        }
    }
    groups
}

/// Tables whose name starts with the given sample prefix, in input order.
pub fn tables_for_sample<S: AsRef<str>>(tables: &[S], sample: &str) -> Vec<String> {
    tables
        .iter()
        .map(AsRef::as_ref)
        .filter(|table| table.starts_with(sample))
        .map(String::from)
        .collect()
}
