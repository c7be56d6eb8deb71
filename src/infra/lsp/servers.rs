//! Backend executable resolution
//!
//! Turns a [`Backend`] into a verified [`LaunchSpec`] before any process is
//! started, or a `BackendUnavailable` error carrying an install hint.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::capabilities::Backend;
use super::process::LaunchSpec;
use crate::error::LspError;
use crate::models::config::ServerCommands;

// ============================================================================
// Platform Detection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOS
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstallInstructions {
    pub macos: &'static str,
    pub linux: &'static str,
    pub windows: &'static str,
}

impl InstallInstructions {
    const fn same(hint: &'static str) -> Self {
        Self {
            macos: hint,
            linux: hint,
            windows: hint,
        }
    }

    pub fn current(&self) -> &'static str {
        match Platform::current() {
            Platform::MacOS => self.macos,
            Platform::Linux => self.linux,
            Platform::Windows => self.windows,
        }
    }
}

// ============================================================================
// Server Definitions
// ============================================================================

const JULIA_SERVER_SCRIPT: &str = "using LanguageServer; server = LanguageServer.LanguageServerInstance(stdin, stdout, pwd()); run(server);";

#[derive(Debug, Clone, Copy)]
pub struct ServerDefinition {
    pub backend: Backend,
    pub command: &'static str,
    pub args: &'static [&'static str],
    /// Runtime that must be on PATH besides the server itself
    pub runtime: Option<&'static str>,
    pub version_arg: &'static str,
    pub install: InstallInstructions,
}

impl ServerDefinition {
    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Clangd => Self {
                backend,
                command: "clangd",
                args: &["--background-index", "--header-insertion=never"],
                runtime: None,
                version_arg: "--version",
                install: InstallInstructions {
                    macos: "brew install llvm",
                    linux: "sudo apt install clangd",
                    windows: "winget install LLVM.LLVM",
                },
            },
            Backend::Gopls => Self {
                backend,
                command: "gopls",
                args: &[],
                runtime: Some("go"),
                version_arg: "version",
                install: InstallInstructions::same("go install golang.org/x/tools/gopls@latest"),
            },
            Backend::RustAnalyzer => Self {
                backend,
                command: "rust-analyzer",
                args: &[],
                runtime: None,
                version_arg: "--version",
                install: InstallInstructions::same("rustup component add rust-analyzer"),
            },
            Backend::Jedi => Self {
                backend,
                command: "jedi-language-server",
                args: &[],
                runtime: None,
                version_arg: "--version",
                install: InstallInstructions::same("pip install jedi-language-server"),
            },
            Backend::Metals => Self {
                backend,
                command: "metals",
                args: &[],
                runtime: Some("java"),
                version_arg: "--version",
                install: InstallInstructions {
                    macos: "brew install coursier && cs install metals",
                    linux: "cs install metals (https://get-coursier.io)",
                    windows: "cs install metals (https://get-coursier.io)",
                },
            },
            Backend::Julia => Self {
                backend,
                command: "julia",
                args: &["--startup-file=no", "--history-file=no", "-e", JULIA_SERVER_SCRIPT],
                runtime: None,
                version_arg: "--version",
                install: InstallInstructions {
                    macos: "brew install julia && julia -e 'using Pkg; Pkg.add(\"LanguageServer\")'",
                    linux: "https://julialang.org/downloads/ then julia -e 'using Pkg; Pkg.add(\"LanguageServer\")'",
                    windows: "winget install julia -s msstore then julia -e 'using Pkg; Pkg.add(\"LanguageServer\")'",
                },
            },
        }
    }

    fn unavailable(&self, executable: &str) -> LspError {
        LspError::BackendUnavailable {
            backend: self.backend.name().to_string(),
            executable: executable.to_string(),
            install_hint: self.install.current().to_string(),
        }
    }

    /// Installed version string (first non-empty output line)
    pub fn version(&self, program: &Path) -> Option<String> {
        let output = Command::new(program).arg(self.version_arg).output().ok()?;
        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stdout.trim().is_empty() { stderr } else { stdout };

        text.lines()
            .find(|line| !line.trim().is_empty())
            .map(|s| s.trim().to_string())
    }
}

fn override_for(backend: Backend, overrides: &ServerCommands) -> Option<&str> {
    let value = match backend {
        Backend::Clangd => &overrides.clangd,
        Backend::Gopls => &overrides.gopls,
        Backend::RustAnalyzer => &overrides.rust_analyzer,
        Backend::Jedi => &overrides.jedi,
        Backend::Metals => &overrides.metals,
        Backend::Julia => &overrides.julia,
    };
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Locate `name` on PATH
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    #[cfg(unix)]
    let lookup = "which";
    #[cfg(windows)]
    let lookup = "where";

    let output = Command::new(lookup).arg(name).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// Resolve the launch command for `backend` in `root`
///
/// A configured override is taken verbatim (program then whitespace
/// separated args) and skips PATH lookup of the server; required runtimes are
/// still checked.
pub fn resolve(
    backend: Backend,
    root: &Path,
    overrides: &ServerCommands,
) -> Result<LaunchSpec, LspError> {
    let definition = ServerDefinition::for_backend(backend);

    if let Some(runtime) = definition.runtime
        && find_executable(runtime).is_none()
    {
        return Err(definition.unavailable(runtime));
    }

    if let Some(command) = override_for(backend, overrides) {
        let mut parts = command.split_whitespace().map(str::to_string);
        if let Some(program) = parts.next() {
            tracing::debug!("Using configured command for {}: {}", backend, command);
            return Ok(LaunchSpec::new(program, parts.collect(), root));
        }
    }

    let program = find_executable(definition.command)
        .ok_or_else(|| definition.unavailable(definition.command))?;
    let args = definition.args.iter().map(|a| a.to_string()).collect();
    Ok(LaunchSpec::new(program, args, root))
}

/// Resolution outcome for one backend
#[derive(Debug, Clone)]
pub struct ServerHealth {
    pub backend: Backend,
    pub command: Option<String>,
    pub version: Option<String>,
    pub error: Option<String>,
}

impl ServerHealth {
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

/// Check every backend; sorted by backend name
pub fn check_all(root: &Path, overrides: &ServerCommands) -> Vec<ServerHealth> {
    let mut results: Vec<ServerHealth> = Backend::ALL
        .into_iter()
        .map(|backend| match resolve(backend, root, overrides) {
            Ok(spec) => ServerHealth {
                backend,
                version: ServerDefinition::for_backend(backend).version(&spec.program),
                command: Some(spec.display()),
                error: None,
            },
            Err(e) => ServerHealth {
                backend,
                command: None,
                version: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    results.sort_by_key(|h| h.backend.name());
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_backend_has_install_hint() {
        for backend in Backend::ALL {
            let definition = ServerDefinition::for_backend(backend);
            assert!(!definition.install.current().is_empty());
            assert!(!definition.command.is_empty());
        }
    }

    #[test]
    fn test_julia_command_line() {
        let definition = ServerDefinition::for_backend(Backend::Julia);
        assert_eq!(definition.command, "julia");
        assert_eq!(&definition.args[..3], &["--startup-file=no", "--history-file=no", "-e"]);
        assert!(definition.args[3].contains("LanguageServerInstance"));
    }

    #[test]
    fn test_missing_executable_is_backend_unavailable() {
        let definition = ServerDefinition::for_backend(Backend::Clangd);
        let err = definition.unavailable("clangd");
        let message = err.to_string();
        assert!(message.contains("clangd"));
        assert!(message.contains(definition.install.current()));
        assert!(find_executable("polylsp-definitely-not-installed").is_none());
    }

    #[test]
    fn test_override_bypasses_lookup() {
        let overrides = ServerCommands {
            rust_analyzer: Some("/opt/ra/bin/rust-analyzer --log-file /tmp/ra.log".into()),
            ..Default::default()
        };
        let spec = resolve(Backend::RustAnalyzer, Path::new("/w"), &overrides).unwrap();
        assert_eq!(spec.program, PathBuf::from("/opt/ra/bin/rust-analyzer"));
        assert_eq!(spec.args, vec!["--log-file", "/tmp/ra.log"]);
        assert_eq!(spec.cwd, PathBuf::from("/w"));
    }

    #[test]
    fn test_blank_override_ignored() {
        let overrides = ServerCommands {
            jedi: Some("   ".into()),
            ..Default::default()
        };
        assert!(override_for(Backend::Jedi, &overrides).is_none());
    }

    #[test]
    fn test_check_all_covers_every_backend() {
        let health = check_all(Path::new("."), &ServerCommands::default());
        assert_eq!(health.len(), Backend::ALL.len());
        assert!(health.iter().all(|h| h.is_available() || h.error.is_some()));
    }
}
