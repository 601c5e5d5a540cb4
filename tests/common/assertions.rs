use std::path::Path;
use pgphase::report::BackupSession;

/// Assert that every marker appears in `text`, in the given order
pub fn assert_appears_in_order(text: &str, markers: &[&str]) {
    let mut last: Option<(usize, &str)> = None;
    for marker in markers {
        let position = text
            .find(marker)
            .unwrap_or_else(|| panic!("Expected to find '{}' in:\n{}", marker, text));
        if let Some((previous, previous_marker)) = last {
            assert!(
                previous < position,
                "Expected '{}' to appear before '{}'",
                previous_marker,
                marker
            );
        }
        last = Some((position, marker));
    }
}

/// Assert that a directory holds a file whose name starts with `prefix`
pub fn assert_has_file_with_prefix(dir: &Path, prefix: &str) {
    let names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        names.iter().any(|name| name.starts_with(prefix)),
        "Expected a file starting with '{}' in {}, found: {:?}",
        prefix,
        dir.display(),
        names
    );
}

/// Assert that a session recorded an operation with the given name
pub fn assert_session_has_operation(session: &BackupSession, operation: &str) {
    assert!(
        session.operations.iter().any(|op| op.operation == operation),
        "Expected operation '{}' in session, found: {:?}",
        operation,
        session.operations.iter().map(|op| &op.operation).collect::<Vec<_>>()
    );
}
