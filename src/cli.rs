//! Command-line surface and config file lookup for embedding binaries.

use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "wavy", version, about = "A dynamic tiling compositor")]
pub struct Cli {
    /// Enable additional debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Disable log output from the compositor library
    #[arg(short = 'W', long)]
    pub no_wlc_output: bool,

    /// Select a config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Config file locations in search order: the XDG path first, then either
/// the `-c` override or the legacy `$HOME` path.
pub fn config_file_candidates(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
    cli_config: Option<&Path>,
) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(xdg) = xdg_config_home {
        candidates.push(xdg.join("wavy").join("config.lua"));
    }
    match cli_config {
        Some(path) => candidates.push(path.to_path_buf()),
        None => {
            if let Some(home) = home {
                candidates.push(home.join(".config").join("wavy").join("config.lua"));
            }
        }
    }
    candidates
}

/// First existing config file, if any.
pub fn find_config_file(cli_config: Option<&Path>) -> Option<PathBuf> {
    let xdg = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    config_file_candidates(xdg.as_deref(), home.as_deref(), cli_config)
        .into_iter()
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_all_flags() {
        let cli = Cli::parse_from(["wavy", "-d", "-W", "-c", "/tmp/test.lua"]);
        assert!(cli.debug);
        assert!(cli.no_wlc_output);
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/test.lua")));

        let cli = Cli::parse_from(["wavy"]);
        assert!(!cli.debug);
        assert!(cli.config.is_none());
    }

    #[test]
    fn xdg_path_is_searched_first() {
        let candidates = config_file_candidates(
            Some(Path::new("/xdg")),
            Some(Path::new("/home/user")),
            None,
        );
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/xdg/wavy/config.lua"),
                PathBuf::from("/home/user/.config/wavy/config.lua"),
            ]
        );
    }

    #[test]
    fn cli_override_replaces_the_home_fallback() {
        let candidates = config_file_candidates(
            Some(Path::new("/xdg")),
            Some(Path::new("/home/user")),
            Some(Path::new("/etc/wavy.lua")),
        );
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/xdg/wavy/config.lua"),
                PathBuf::from("/etc/wavy.lua"),
            ]
        );
    }
}
