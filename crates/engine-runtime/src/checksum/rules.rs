//! Which collections take part in a checksum comparison and under which name.

use model::{checksum::Side, inventory::InventoryCollection};

/// System collections that are replicated between data centers.
pub const SYSTEM_COLLECTIONS: [&str; 8] = [
    "_appbundles",
    "_apps",
    "_aqlfunctions",
    "_graphs",
    "_users",
    "_analyzers",
    "_jobs",
    "_queues",
];

/// Hidden smart graph collections holding edge data. `_from_` is left out.
pub const SMART_PREFIXES: [&str; 2] = ["_local_", "_to_"];

/// System collections stored under another name on the target.
const RENAMES: [(&str, &str); 2] = [("_jobs", "_jobsbackup"), ("_queues", "_queuesbackup")];

pub fn must_synchronize(col: &InventoryCollection) -> bool {
    let name = col.name();
    if !col.parameters.is_system {
        return !col.is_smart_edge();
    }
    SYSTEM_COLLECTIONS.contains(&name)
        || SMART_PREFIXES.iter().any(|prefix| name.starts_with(*prefix))
        || RENAMES.iter().any(|(_, renamed)| *renamed == name)
}

/// Name a collection is matched under; maps a renamed collection back.
pub fn exception_name(name: &str) -> &str {
    RENAMES
        .iter()
        .find(|(_, renamed)| *renamed == name)
        .map_or(name, |(original, _)| *original)
}

/// Name a collection is stored under on the target.
pub fn renamed_name(name: &str) -> &str {
    RENAMES
        .iter()
        .find(|(original, _)| *original == name)
        .map_or(name, |(_, renamed)| *renamed)
}

/// The matching name of `col` on `side`, or `None` if it is skipped.
///
/// The source never holds the renamed copies and the target's originals are
/// not compared, the target's renamed copies stand in for them.
pub fn matching_name(col: &InventoryCollection, side: Side) -> Option<String> {
    if !must_synchronize(col) {
        return None;
    }
    let name = col.name();
    let skip = match side {
        Side::Source => exception_name(name) != name,
        Side::Target => renamed_name(name) != name,
    };
    (!skip).then(|| exception_name(name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::inventory::{CollectionParameters, CollectionType};
    use std::collections::BTreeMap;

    fn col(name: &str, is_system: bool, kind: CollectionType, is_smart: bool) -> InventoryCollection {
        InventoryCollection {
            parameters: CollectionParameters {
                name: name.into(),
                is_system,
                kind,
                is_smart,
                shards: BTreeMap::new(),
            },
        }
    }

    fn system(name: &str) -> InventoryCollection {
        col(name, true, CollectionType::Document, false)
    }

    #[test]
    fn user_collections_participate_except_smart_edges() {
        assert!(must_synchronize(&col("docs", false, CollectionType::Document, false)));
        assert!(must_synchronize(&col("edges", false, CollectionType::Edge, false)));
        assert!(must_synchronize(&col("vertices", false, CollectionType::Document, true)));
        assert!(!must_synchronize(&col("links", false, CollectionType::Edge, true)));
    }

    #[test]
    fn system_collections_follow_allow_list() {
        for name in SYSTEM_COLLECTIONS {
            assert!(must_synchronize(&system(name)), "{name}");
        }
        assert!(must_synchronize(&system("_local_links")));
        assert!(must_synchronize(&system("_to_links")));
        assert!(!must_synchronize(&system("_from_links")));
        assert!(must_synchronize(&system("_jobsbackup")));
        assert!(must_synchronize(&system("_queuesbackup")));
        assert!(!must_synchronize(&system("_statistics")));
    }

    #[test]
    fn rename_round_trips() {
        for name in ["_jobs", "_queues", "docs", "_users"] {
            assert_eq!(exception_name(renamed_name(name)), name);
        }
        assert_eq!(renamed_name("_jobs"), "_jobsbackup");
        assert_eq!(exception_name("_queuesbackup"), "_queues");
        assert_eq!(exception_name("docs"), "docs");
    }

    #[test]
    fn sides_filter_symmetrically() {
        assert_eq!(matching_name(&system("_jobs"), Side::Source).as_deref(), Some("_jobs"));
        assert_eq!(matching_name(&system("_jobsbackup"), Side::Source), None);
        assert_eq!(matching_name(&system("_jobs"), Side::Target), None);
        assert_eq!(
            matching_name(&system("_jobsbackup"), Side::Target).as_deref(),
            Some("_jobs")
        );
        assert_eq!(matching_name(&system("_users"), Side::Target).as_deref(), Some("_users"));
    }
}
