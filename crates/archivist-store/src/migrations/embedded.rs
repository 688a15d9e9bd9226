//! Embedded SQL migrations
//!
//! Migration SQL is compiled into the binary with `include_str!` so a fresh
//! database never depends on files next to the executable.

/// One embedded migration
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations, in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_initial_schema",
            sql: include_str!("../../migrations/001_initial_schema.sql"),
        },
        Migration {
            id: "002_ingest_runs",
            sql: include_str!("../../migrations/002_ingest_runs.sql"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_ordered_and_unique() {
        let ids: Vec<_> = get_migrations().iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }
}
