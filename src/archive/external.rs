//! External archive tool strategy
//!
//! Last resort for packages none of the in-process readers can open. The tool is reached
//! through the [`ArchiveExtractor`] trait so tests can substitute a fake. The bundled
//! implementation drives 7-Zip.

use super::{ArchiveError, EntryMatcher, ExtractionStrategy, SymbolStream, decompress_entry};
use glob::{MatchOptions, Pattern};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default limit for a single list or extract call
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Command-line archive utility contract
pub trait ArchiveExtractor: Send + Sync {
    /// Entry paths stored in `archive`.
    fn list(&self, archive: &Path, timeout: Duration) -> Result<Vec<String>, ArchiveError>;

    /// Extract `entries` from `archive` below `dest`, keeping their relative paths.
    fn extract(
        &self,
        archive: &Path,
        entries: &[String],
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), ArchiveError>;
}

/// Lists, then extracts only the matching entries into a scratch directory
pub struct ExternalToolStrategy {
    extractor: Arc<dyn ArchiveExtractor>,
    timeout: Duration,
    keep_scratch: bool,
}

impl ExternalToolStrategy {
    pub fn new(extractor: Arc<dyn ArchiveExtractor>, timeout: Duration, keep_scratch: bool) -> Self {
        Self {
            extractor,
            timeout,
            keep_scratch,
        }
    }
}

impl ExtractionStrategy for ExternalToolStrategy {
    fn name(&self) -> &'static str {
        "external-tool"
    }

    fn open_symbol_streams(
        &self,
        package: &Path,
        matcher: &EntryMatcher,
    ) -> Result<Vec<SymbolStream>, ArchiveError> {
        let listed = self.extractor.list(package, self.timeout)?;
        let selected = matcher.select(&listed);
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let scratch = tempfile::Builder::new().prefix("al2sql-extract-").tempdir()?;
        self.extractor
            .extract(package, &selected, scratch.path(), self.timeout)?;

        let mut streams = Vec::with_capacity(selected.len());
        for name in selected {
            let Some(path) = locate_extracted(scratch.path(), &name) else {
                debug!(entry = %name, "Extracted entry not found in scratch directory");
                continue;
            };
            let bytes = std::fs::read(&path)?;
            match decompress_entry(&name, bytes) {
                Ok(bytes) => streams.push(SymbolStream {
                    entry_name: name,
                    bytes,
                }),
                Err(e) => debug!(error = %e, "Skipping entry"),
            }
        }

        if self.keep_scratch {
            #[allow(deprecated)]
            let kept = scratch.into_path();
            info!(path = %kept.display(), "Keeping extraction scratch directory");
        }
        Ok(streams)
    }
}

/// Path of an extracted entry: its relative path first, else any file with the same name.
fn locate_extracted(scratch: &Path, entry: &str) -> Option<PathBuf> {
    let relative = entry.replace('\\', "/");
    let direct = scratch.join(relative.trim_start_matches('/'));
    if direct.is_file() {
        return Some(direct);
    }

    let file_name = relative.rsplit('/').next()?;
    let pattern = format!(
        "{}/**/{}",
        Pattern::escape(&scratch.to_string_lossy()),
        Pattern::escape(file_name)
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    glob::glob_with(&pattern, options)
        .ok()?
        .filter_map(Result::ok)
        .find(|p| p.is_file())
}

/// 7-Zip command-line driver
#[derive(Debug, Clone, Default)]
pub struct SevenZipExtractor {
    executable: Option<PathBuf>,
}

impl SevenZipExtractor {
    /// Use a known executable.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(executable.into()),
        }
    }

    /// Locate the tool: an explicit path, the usual install locations, then `PATH`.
    ///
    /// When nothing is found every call fails with [`ArchiveError::ToolUnavailable`].
    pub fn discover(explicit: Option<&Path>) -> Self {
        let executable = explicit
            .filter(|p| p.is_file())
            .map(Path::to_path_buf)
            .or_else(|| well_known_locations().into_iter().find(|p| p.is_file()))
            .or_else(|| {
                ["7z", "7za", "7zz"]
                    .iter()
                    .find_map(|name| which::which(name).ok())
            });
        match &executable {
            Some(path) => debug!(path = %path.display(), "Found archive tool"),
            None => debug!("No archive tool found"),
        }
        Self { executable }
    }

    fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<String, ArchiveError> {
        let executable = self.executable.as_ref().ok_or(ArchiveError::ToolUnavailable)?;
        run_with_timeout(executable, args, timeout)
    }
}

impl ArchiveExtractor for SevenZipExtractor {
    fn list(&self, archive: &Path, timeout: Duration) -> Result<Vec<String>, ArchiveError> {
        let args = vec!["l".into(), "-slt".into(), "-ba".into(), archive.into()];
        let listing = self.run(args, timeout)?;
        Ok(parse_listing(&listing))
    }

    fn extract(
        &self,
        archive: &Path,
        entries: &[String],
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), ArchiveError> {
        let mut output_dir = OsString::from("-o");
        output_dir.push(dest);

        let mut args: Vec<OsString> = vec!["x".into(), "-y".into(), output_dir, archive.into()];
        args.extend(entries.iter().map(OsString::from));
        self.run(args, timeout).map(|_| ())
    }
}

fn well_known_locations() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)", "ProgramW6432"]
        .iter()
        .filter_map(std::env::var_os)
        .map(|dir| PathBuf::from(dir).join("7-Zip").join("7z.exe"))
        .collect();
    paths.extend(
        ["/usr/bin/7z", "/usr/local/bin/7z", "/opt/homebrew/bin/7z", "/usr/bin/7zz"]
            .iter()
            .map(PathBuf::from),
    );
    paths
}

/// Entry paths from `7z l -slt -ba` output, folders excluded.
pub fn parse_listing(listing: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut path: Option<String> = None;
    let mut folder = false;

    let mut flush = |path: &mut Option<String>, folder: &mut bool| {
        if let Some(p) = path.take()
            && !*folder
        {
            entries.push(p);
        }
        *folder = false;
    };

    for line in listing.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            flush(&mut path, &mut folder);
        } else if let Some(value) = line.strip_prefix("Path = ") {
            flush(&mut path, &mut folder);
            path = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Folder = ") {
            folder = value.trim() == "+";
        } else if let Some(value) = line.strip_prefix("Attributes = ") {
            folder |= value.trim_start().starts_with('D');
        }
    }
    flush(&mut path, &mut folder);
    entries
}

/// Run a command, killing it once `timeout` elapses.
///
/// Exit statuses 0 (success) and 1 (success with warnings) count as success; stdout is
/// returned.
pub fn run_with_timeout(
    program: &Path,
    args: Vec<OsString>,
    timeout: Duration,
) -> Result<String, ArchiveError> {
    let mut child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArchiveError::ToolUnavailable,
            _ => ArchiveError::Io(e),
        })?;

    // Drain both pipes on their own threads so a chatty tool cannot block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ArchiveError::ToolTimeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    match status.code() {
        Some(0) | Some(1) => Ok(String::from_utf8_lossy(&stdout).into_owned()),
        code => Err(ArchiveError::ToolFailed {
            code,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        }),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}
