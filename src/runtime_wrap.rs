use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name)
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Run Windows executables directly even on non-Windows hosts (binfmt setups)
pub fn skip_wine() -> bool {
    env_flag("W3LF_NO_WINE")
}

pub fn is_flatpak() -> bool {
    Path::new("/.flatpak-info").exists()
}

pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|entry| entry.join(binary))
        .find(|candidate| candidate.exists())
}

/// Wine loader to use, `W3LF_WINE` overrides the one on PATH
pub fn wine_binary() -> PathBuf {
    env::var_os("W3LF_WINE")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("wine"))
}

/// Whether `exe` has to be started through Wine on this host
pub fn needs_wine(exe: &Path) -> bool {
    if cfg!(windows) || skip_wine() {
        return false;
    }
    exe.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

/// Build a command with environment variables that survive the Flatpak sandbox.
///
/// Inside Flatpak the program runs on the host via `flatpak-spawn --host`,
/// which does not inherit `Command::env`, so variables become `--env=` flags.
pub fn build_command(program: impl AsRef<OsStr>, envs: &[(&str, String)]) -> Command {
    if is_flatpak() {
        let mut cmd = Command::new("flatpak-spawn");
        cmd.arg("--host");
        for (key, value) in envs {
            cmd.arg(format!("--env={}={}", key, value));
        }
        cmd.arg(program);
        return cmd;
    }

    let mut cmd = Command::new(program);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd
}

/// Command that runs `exe`, through Wine in `wine_prefix` when it is a Windows binary
pub fn command_for(exe: &Path, wine_prefix: Option<&Path>) -> Command {
    if !needs_wine(exe) {
        return build_command(exe, &[]);
    }

    let mut envs: Vec<(&str, String)> = Vec::new();
    if let Some(prefix) = wine_prefix {
        envs.push(("WINEPREFIX", prefix.display().to_string()));
    }
    // Keep Wine's fixme spam out of the helper's stderr
    envs.push(("WINEDEBUG", env::var("WINEDEBUG").unwrap_or_else(|_| "-all".to_string())));

    let mut cmd = build_command(wine_binary(), &envs);
    cmd.arg(exe);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exe_files_need_wine() {
        if cfg!(windows) || skip_wine() {
            return;
        }
        assert!(needs_wine(Path::new("/opt/w3l/w3l.exe")));
        assert!(needs_wine(Path::new("/opt/w3l/W3L.EXE")));
        assert!(!needs_wine(Path::new("/usr/local/bin/w3l-helper")));
    }

    #[test]
    fn native_command_runs_program_directly() {
        if is_flatpak() {
            return;
        }
        let cmd = command_for(Path::new("/usr/local/bin/w3l-helper"), None);
        assert_eq!(cmd.get_program(), "/usr/local/bin/w3l-helper");
        assert_eq!(cmd.get_args().count(), 0);
    }

    #[test]
    fn wine_command_sets_prefix() {
        if cfg!(windows) || skip_wine() || is_flatpak() {
            return;
        }
        let cmd = command_for(Path::new("/opt/w3l.exe"), Some(Path::new("/home/u/.wine")));
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec![OsStr::new("/opt/w3l.exe")]);
        assert!(cmd
            .get_envs()
            .any(|(k, v)| k == "WINEPREFIX" && v == Some(OsStr::new("/home/u/.wine"))));
    }
}
