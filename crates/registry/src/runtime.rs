use std::env;
use std::ffi::OsStr;
use std::fmt::{self, Display};
use std::path::Path;

/// A launcher that some tool providers need installed locally.
///
/// Entries whose `command` names one of these are only attempted when the
/// launcher was found on the search path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Launcher {
    /// The JavaScript package runner.
    Npx,
    /// The Python package runner.
    Uvx,
    /// The JavaScript runtime.
    Node,
}

impl Launcher {
    /// Every known launcher.
    pub const ALL: [Launcher; 3] = [Launcher::Npx, Launcher::Uvx, Launcher::Node];

    /// Returns the executable name of the launcher.
    #[inline]
    pub fn executable(self) -> &'static str {
        match self {
            Launcher::Npx => "npx",
            Launcher::Uvx => "uvx",
            Launcher::Node => "node",
        }
    }

    /// Returns the launcher a configured command refers to, if any.
    pub fn from_command(command: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|launcher| launcher.executable() == command)
    }
}

impl Display for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Availability of each [`Launcher`], captured once.
///
/// Registries keep their own copy, so tests can inject any combination
/// instead of depending on the machine they run on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RuntimeFlags {
    /// Whether `npx` was found.
    pub npx: bool,
    /// Whether `uvx` was found.
    pub uvx: bool,
    /// Whether `node` was found.
    pub node: bool,
}

impl RuntimeFlags {
    /// Looks every launcher up on the current search path.
    pub fn detect() -> Self {
        let flags = Self {
            npx: is_on_path(Launcher::Npx.executable()),
            uvx: is_on_path(Launcher::Uvx.executable()),
            node: is_on_path(Launcher::Node.executable()),
        };
        debug!("detected launchers: {flags:?}");
        flags
    }

    /// Flags with every launcher available.
    #[inline]
    pub fn all() -> Self {
        Self {
            npx: true,
            uvx: true,
            node: true,
        }
    }

    /// Returns a copy with one flag changed.
    #[inline]
    pub fn with(mut self, launcher: Launcher, available: bool) -> Self {
        match launcher {
            Launcher::Npx => self.npx = available,
            Launcher::Uvx => self.uvx = available,
            Launcher::Node => self.node = available,
        }
        self
    }

    /// Returns whether the launcher was found.
    #[inline]
    pub fn is_available(&self, launcher: Launcher) -> bool {
        match launcher {
            Launcher::Npx => self.npx,
            Launcher::Uvx => self.uvx,
            Launcher::Node => self.node,
        }
    }

    /// Returns the launcher `command` needs when that launcher is missing.
    ///
    /// Commands that are not a known launcher are never gated.
    pub fn missing_launcher(&self, command: &str) -> Option<Launcher> {
        Launcher::from_command(command).filter(|launcher| !self.is_available(*launcher))
    }
}

/// Returns whether `name` resolves to an executable on the search path.
///
/// A name containing a path separator is checked as a path instead. Not
/// finding the executable is a normal outcome, never an error.
pub fn is_on_path(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if Path::new(name).components().count() > 1 {
        return is_executable(Path::new(name));
    }
    match env::var_os("PATH") {
        Some(path_var) => find_in(name, &path_var),
        None => false,
    }
}

fn find_in(name: &str, path_var: &OsStr) -> bool {
    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .any(|dir| candidates(&dir, name).iter().any(|path| is_executable(path)))
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<std::path::PathBuf> {
    vec![dir.join(name)]
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<std::path::PathBuf> {
    let exts = env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_owned());
    std::iter::once(dir.join(name))
        .chain(exts.split(';').filter(|ext| !ext.is_empty()).map(|ext| {
            dir.join(format!("{name}{ext}"))
        }))
        .collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_launcher_from_command() {
        assert_eq!(Launcher::from_command("uvx"), Some(Launcher::Uvx));
        assert_eq!(Launcher::from_command("npx"), Some(Launcher::Npx));
        assert_eq!(Launcher::from_command("python"), None);
        assert_eq!(Launcher::from_command("/usr/bin/node"), None);
    }

    #[test]
    fn test_missing_launcher() {
        let flags = RuntimeFlags::default().with(Launcher::Node, true);
        assert_eq!(flags.missing_launcher("uvx"), Some(Launcher::Uvx));
        assert_eq!(flags.missing_launcher("node"), None);
        assert_eq!(flags.missing_launcher("docker"), None);
        assert_eq!(RuntimeFlags::all().missing_launcher("npx"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-launcher");
        fs::write(&tool, "#!/bin/sh\n").unwrap();

        let path_var = env::join_paths([dir.path()]).unwrap();
        // Not executable yet.
        assert!(!find_in("fake-launcher", &path_var));

        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(find_in("fake-launcher", &path_var));
        assert!(!find_in("other-launcher", &path_var));
        assert!(is_on_path(tool.to_str().unwrap()));
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        assert!(!is_on_path("mcpdock-definitely-missing-binary"));
        assert!(!is_on_path(""));
    }
}
