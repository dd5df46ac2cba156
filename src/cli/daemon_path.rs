use std::path::PathBuf;

/// Daemon binary installed next to the cli.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("dayreview-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[cfg(unix)]
    #[test]
    fn daemon_sits_next_to_cli() {
        assert_eq!(
            to_daemon_path(PathBuf::from("/usr/local/bin/dayreview")),
            PathBuf::from("/usr/local/bin/dayreview-daemon")
        );
    }
}
