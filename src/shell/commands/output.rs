//! Shared output helpers for shell commands.
//!
//! Listings are often piped into `head` or `less`, which may close stdout
//! early. `print_line!` turns that BrokenPipe into an early `Ok(())`.

use colored::*;

use crate::vfs::ResourceDescriptor;

/// `println!` that returns `Ok(())` from the enclosing function on BrokenPipe
/// and propagates any other IO error.
#[macro_export]
macro_rules! print_line {
    ($($arg:tt)*) => {{
        use std::io::Write;
        match writeln!(std::io::stdout(), $($arg)*) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

/// Name column for a listing; directories are highlighted
pub fn display_name(entry: &ResourceDescriptor, full_path: bool) -> String {
    let name = if full_path {
        format!("/{}", entry.relative_path())
    } else {
        entry.name.clone()
    };

    if entry.kind.is_dir() {
        name.blue().bold().to_string()
    } else {
        name
    }
}

/// Size column; directories have none
pub fn display_size(entry: &ResourceDescriptor) -> String {
    match entry.size {
        Some(size) => humansize::format_size(size, humansize::BINARY),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::ResourceKind;

    #[test]
    fn test_display_columns() {
        colored::control::set_override(false);

        let file = ResourceDescriptor {
            path: "/docs/".to_string(),
            name: "a.txt".to_string(),
            size: Some(2048),
            kind: ResourceKind::File,
        };
        let dir = ResourceDescriptor {
            path: "/".to_string(),
            name: "docs/".to_string(),
            size: None,
            kind: ResourceKind::Directory,
        };

        assert_eq!(display_name(&file, false), "a.txt");
        assert_eq!(display_name(&file, true), "/docs/a.txt");
        assert_eq!(display_name(&dir, true), "/docs/");
        assert!(display_size(&file).ends_with("KiB"));
        assert_eq!(display_size(&dir), "-");
    }
}
