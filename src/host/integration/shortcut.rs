use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::utils::dir::desktop_path;

use super::{CapabilityStatus, APPLICATION_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ShortcutError {
    #[error("desktop shortcuts are not supported: {0}")]
    Unsupported(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("platform error: {0}")]
    Platform(String),
}

/// What the shortcut should launch.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutSpec {
    pub name: String,
    pub target: PathBuf,
    pub args: Vec<String>,
    pub icon: Option<PathBuf>,
    pub description: String,
}

impl ShortcutSpec {
    pub fn new(target: PathBuf, args: Vec<String>, icon: Option<PathBuf>) -> Self {
        Self {
            name: APPLICATION_NAME.into(),
            target,
            args,
            icon,
            description: APPLICATION_NAME.into(),
        }
    }
}

/// Result of `create-desktop-shortcut` as seen by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortcutOutcome {
    pub success: bool,
    #[serde(flatten)]
    pub status: CapabilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[cfg_attr(test, mockall::automock)]
pub trait ShortcutWriter {
    /// Whether [ShortcutWriter::create] has a chance to succeed.
    fn support(&self) -> CapabilityStatus;

    /// Creates the shortcut and returns its location.
    fn create(&self, spec: &ShortcutSpec) -> Result<PathBuf, ShortcutError>;
}

/// Runs `writer` and folds every failure into the outcome. Failures are logged, never returned.
pub fn create_shortcut(writer: &dyn ShortcutWriter, spec: &ShortcutSpec) -> ShortcutOutcome {
    match writer.create(spec) {
        Ok(path) => {
            info!("Created desktop shortcut {path:?}");
            ShortcutOutcome {
                success: true,
                status: CapabilityStatus::Available,
                path: Some(path),
            }
        }
        Err(ShortcutError::Unsupported(reason)) => {
            info!("Desktop shortcut unavailable: {reason}");
            ShortcutOutcome {
                success: false,
                status: CapabilityStatus::Unavailable { reason },
                path: None,
            }
        }
        Err(e) => {
            error!("Failed to create desktop shortcut {e:?}");
            ShortcutOutcome {
                success: false,
                status: CapabilityStatus::Failed {
                    error: e.to_string(),
                },
                path: None,
            }
        }
    }
}

/// Writes shortcuts onto the user's desktop using whatever the current platform offers.
pub struct DesktopShortcutWriter {
    desktop_dir: Option<PathBuf>,
}

impl DesktopShortcutWriter {
    pub fn new() -> Self {
        Self {
            desktop_dir: desktop_path(),
        }
    }

    pub fn with_desktop_dir(desktop_dir: PathBuf) -> Self {
        Self {
            desktop_dir: Some(desktop_dir),
        }
    }

    fn desktop_dir(&self) -> Result<&Path, ShortcutError> {
        self.desktop_dir
            .as_deref()
            .ok_or_else(|| ShortcutError::Unsupported("desktop directory is unknown".into()))
    }
}

impl Default for DesktopShortcutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcutWriter for DesktopShortcutWriter {
    fn support(&self) -> CapabilityStatus {
        if !PLATFORM_SUPPORTED {
            return CapabilityStatus::Unavailable {
                reason: "no shortcut format for this platform".into(),
            };
        }
        match self.desktop_dir() {
            Ok(dir) if dir.is_dir() => CapabilityStatus::Available,
            Ok(dir) => CapabilityStatus::Unavailable {
                reason: format!("desktop directory {dir:?} doesn't exist"),
            },
            Err(e) => CapabilityStatus::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    fn create(&self, spec: &ShortcutSpec) -> Result<PathBuf, ShortcutError> {
        let dir = self.desktop_dir()?;
        write_platform_shortcut(dir, spec)
    }
}

const PLATFORM_SUPPORTED: bool = cfg!(any(
    target_os = "linux",
    target_os = "macos",
    all(windows, feature = "win")
));

cfg_if::cfg_if! {
    if #[cfg(all(windows, feature = "win"))] {
        fn write_platform_shortcut(dir: &Path, spec: &ShortcutSpec) -> Result<PathBuf, ShortcutError> {
            let path = dir.join(format!("{}.lnk", spec.name));
            write_shell_link(&path, spec)?;
            Ok(path)
        }

        fn write_shell_link(path: &Path, spec: &ShortcutSpec) -> Result<(), ShortcutError> {
            use windows::{
                core::{Interface, HSTRING},
                Win32::{
                    System::Com::{
                        CoCreateInstance, CoInitializeEx, CoUninitialize, IPersistFile,
                        CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED,
                    },
                    UI::Shell::{IShellLinkW, ShellLink},
                },
            };

            let platform = |e: windows::core::Error| ShortcutError::Platform(e.to_string());

            unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
                .ok()
                .map_err(platform)?;
            let result = (|| -> windows::core::Result<()> {
                let link: IShellLinkW =
                    unsafe { CoCreateInstance(&ShellLink, None, CLSCTX_INPROC_SERVER) }?;
                unsafe {
                    link.SetPath(&HSTRING::from(spec.target.as_path()))?;
                    link.SetArguments(&HSTRING::from(windows_arguments(&spec.args)))?;
                    link.SetDescription(&HSTRING::from(spec.description.as_str()))?;
                    if let Some(icon) = &spec.icon {
                        link.SetIconLocation(&HSTRING::from(icon.as_path()), 0)?;
                    }
                    let file: IPersistFile = link.cast()?;
                    file.Save(&HSTRING::from(path), true)?;
                }
                Ok(())
            })();
            unsafe { CoUninitialize() };
            result.map_err(platform)
        }
    } else if #[cfg(target_os = "linux")] {
        fn write_platform_shortcut(dir: &Path, spec: &ShortcutSpec) -> Result<PathBuf, ShortcutError> {
            use std::os::unix::fs::PermissionsExt;

            let path = dir.join(format!("{}.desktop", spec.name));
            std::fs::write(&path, desktop_entry(spec))?;
            // Desktop environments only launch entries that are executable.
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
            Ok(path)
        }
    } else if #[cfg(target_os = "macos")] {
        fn write_platform_shortcut(dir: &Path, spec: &ShortcutSpec) -> Result<PathBuf, ShortcutError> {
            let path = dir.join(&spec.name);
            if path.symlink_metadata().is_ok() {
                std::fs::remove_file(&path)?;
            }
            std::os::unix::fs::symlink(&spec.target, &path)?;
            Ok(path)
        }
    } else {
        fn write_platform_shortcut(_dir: &Path, _spec: &ShortcutSpec) -> Result<PathBuf, ShortcutError> {
            Err(ShortcutError::Unsupported(
                "no shortcut format for this platform".into(),
            ))
        }
    }
}

/// Freedesktop entry launching `spec.target`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn desktop_entry(spec: &ShortcutSpec) -> String {
    let exec = std::iter::once(spec.target.to_string_lossy().into_owned())
        .chain(spec.args.iter().cloned())
        .map(|arg| quote_exec_arg(&arg))
        .collect::<Vec<_>>()
        .join(" ");

    let mut entry = format!(
        "[Desktop Entry]\nType=Application\nName={}\nComment={}\nExec={exec}\nTerminal=false\n",
        spec.name, spec.description
    );
    if let Some(icon) = &spec.icon {
        entry.push_str(&format!("Icon={}\n", icon.to_string_lossy()));
    }
    entry
}

/// Quoting rules of the `Exec` key.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn quote_exec_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '"' | '\'' | '\\' | '>' | '<' | '~' | '|' | '&' | ';' | '$' | '*' | '?' | '#'
                        | '(' | ')' | '`'
                )
        });
    if !needs_quotes {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Command line of a shell link. Parsed back with the `CommandLineToArgvW` rules.
#[cfg_attr(not(all(windows, feature = "win")), allow(dead_code))]
fn windows_arguments(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_windows_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg_attr(not(all(windows, feature = "win")), allow(dead_code))]
fn quote_windows_arg(arg: &str) -> String {
    let needs_quotes =
        arg.is_empty() || arg.chars().any(|c| matches!(c, ' ' | '\t' | '\n' | '\x0b' | '"'));
    if !needs_quotes {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                // Backslashes before a quote are escapes, so each of them and the quote get one.
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    // Trailing backslashes sit right before the closing quote.
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use crate::host::integration::CapabilityStatus;

    use super::{
        create_shortcut, desktop_entry, quote_exec_arg, quote_windows_arg, windows_arguments,
        MockShortcutWriter, ShortcutError, ShortcutSpec,
    };

    fn spec() -> ShortcutSpec {
        ShortcutSpec::new(
            PathBuf::from("/opt/legal time tracker/legal-time-tracker-host"),
            vec!["--dir".into(), "/data".into()],
            Some(PathBuf::from("/opt/icon.png")),
        )
    }

    #[test]
    fn test_successful_shortcut() {
        let mut writer = MockShortcutWriter::new();
        writer
            .expect_create()
            .returning(|_| Ok(PathBuf::from("/desk/Legal Time Tracker.desktop")))
            .times(1);

        let outcome = create_shortcut(&writer, &spec());

        assert!(outcome.success);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": true,
                "status": "available",
                "path": "/desk/Legal Time Tracker.desktop"
            })
        );
    }

    #[test]
    fn test_unsupported_shortcut() {
        let mut writer = MockShortcutWriter::new();
        writer
            .expect_create()
            .returning(|_| Err(ShortcutError::Unsupported("headless".into())));

        let outcome = create_shortcut(&writer, &spec());

        assert!(!outcome.success);
        assert_eq!(
            outcome.status,
            CapabilityStatus::Unavailable {
                reason: "headless".into()
            }
        );
    }

    #[test]
    fn test_failed_shortcut_is_reported() {
        let mut writer = MockShortcutWriter::new();
        writer.expect_create().returning(|_| {
            Err(ShortcutError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        });

        let outcome = create_shortcut(&writer, &spec());

        assert!(!outcome.success);
        assert!(matches!(outcome.status, CapabilityStatus::Failed { .. }));
        assert_eq!(outcome.path, None);
    }

    #[test]
    fn test_desktop_entry() {
        let entry = desktop_entry(&spec());

        assert!(entry.starts_with("[Desktop Entry]\n"));
        assert!(entry.contains("Name=Legal Time Tracker\n"));
        assert!(entry
            .contains("Exec=\"/opt/legal time tracker/legal-time-tracker-host\" --dir /data\n"));
        assert!(entry.contains("Icon=/opt/icon.png\n"));
    }

    #[test]
    fn test_exec_quoting() {
        assert_eq!(quote_exec_arg("plain"), "plain");
        assert_eq!(quote_exec_arg(""), "\"\"");
        assert_eq!(quote_exec_arg("a $b"), "\"a \\$b\"");
    }

    #[test]
    fn test_windows_quoting() {
        assert_eq!(quote_windows_arg("--dir"), "--dir");
        assert_eq!(quote_windows_arg(""), r#""""#);
        assert_eq!(quote_windows_arg(r"C:\tracker\data"), r"C:\tracker\data");
        assert_eq!(
            quote_windows_arg(r"C:\Users\First Last\"),
            r#""C:\Users\First Last\\""#
        );
        assert_eq!(quote_windows_arg(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote_windows_arg(r#"a\"b"#), r#""a\\\"b""#);
    }

    #[test]
    fn test_windows_arguments_keep_paths_with_spaces() {
        let args = [
            "--dir".to_string(),
            r"C:\Users\First Last\AppData\Roaming\legal-time-tracker".to_string(),
            "--store-name".to_string(),
            "firm".to_string(),
        ];

        assert_eq!(
            windows_arguments(&args),
            r#"--dir "C:\Users\First Last\AppData\Roaming\legal-time-tracker" --store-name firm"#
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_shortcut_file() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        use super::{DesktopShortcutWriter, ShortcutWriter};

        let desktop = tempfile::tempdir()?;
        let writer = DesktopShortcutWriter::with_desktop_dir(desktop.path().to_path_buf());
        assert_eq!(writer.support(), CapabilityStatus::Available);

        let path = writer.create(&spec())?;

        assert_eq!(path, desktop.path().join("Legal Time Tracker.desktop"));
        assert_eq!(std::fs::read_to_string(&path)?, desktop_entry(&spec()));
        assert_eq!(std::fs::metadata(&path)?.permissions().mode() & 0o777, 0o755);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_missing_desktop_dir() -> anyhow::Result<()> {
        use super::{DesktopShortcutWriter, ShortcutWriter};

        let root = tempfile::tempdir()?;
        let writer = DesktopShortcutWriter::with_desktop_dir(root.path().join("Desktop"));

        assert!(matches!(writer.support(), CapabilityStatus::Unavailable { .. }));
        assert!(matches!(writer.create(&spec()), Err(ShortcutError::Io(_))));
        Ok(())
    }
}
