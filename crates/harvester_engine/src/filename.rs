use harvester_core::ProgramId;

pub const CACHE_EXTENSION: &str = "json";

/// Cache file name for a program: `{programId}.json`. Derived from the id
/// alone, so presence on disk is the whole record of completion.
pub fn cache_filename(program_id: ProgramId) -> String {
    format!("{program_id}.{CACHE_EXTENSION}")
}

/// Inverse of [`cache_filename`]; `None` for anything else in the directory,
/// including in-progress `*.partial` files.
pub fn program_id_from_filename(name: &str) -> Option<ProgramId> {
    let stem = name.strip_suffix(CACHE_EXTENSION)?.strip_suffix('.')?;
    let id = stem.parse::<ProgramId>().ok()?;
    // Reject non-canonical spellings such as `+7.json` or `007.json`.
    (cache_filename(id) == name).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_names_only() {
        assert_eq!(cache_filename(475), "475.json");
        assert_eq!(program_id_from_filename("475.json"), Some(475));
        assert_eq!(program_id_from_filename("-3.json"), Some(-3));
        assert_eq!(program_id_from_filename("007.json"), None);
        assert_eq!(program_id_from_filename("475.json.partial"), None);
        assert_eq!(program_id_from_filename(".tmpab12.partial"), None);
        assert_eq!(program_id_from_filename("notes.json"), None);
        assert_eq!(program_id_from_filename("475"), None);
    }
}
