use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Package directory prefix used by `winget install Gyan.FFmpeg`
const WINGET_PACKAGE_PREFIX: &str = "Gyan.FFmpeg";

/// A place ffmpeg is commonly installed
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// A fixed binary path
    File(PathBuf),
    /// A winget `Packages` directory holding versioned `Gyan.FFmpeg_*` folders
    WingetPackages(PathBuf),
}

/// Best-effort search for an ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegLocator {
    override_path: Option<PathBuf>,
    search_path: bool,
    candidates: Vec<Candidate>,
}

impl FfmpegLocator {
    /// Locator over the usual install locations, trying `override_path` first
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self::with_candidates(override_path, true, default_candidates())
    }

    pub fn with_candidates(
        override_path: Option<PathBuf>,
        search_path: bool,
        candidates: Vec<Candidate>,
    ) -> Self {
        Self {
            override_path,
            search_path,
            candidates,
        }
    }

    /// Find a working ffmpeg. A bare `ffmpeg` is returned when it is on `PATH`.
    pub async fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            if responds_to_version(path).await {
                return Some(path.clone());
            }
            tracing::warn!("Configured ffmpeg at {} does not run, searching", path.display());
        }

        if self.search_path && responds_to_version(Path::new("ffmpeg")).await {
            return Some(PathBuf::from("ffmpeg"));
        }

        for path in self.candidate_paths() {
            tracing::debug!("Trying ffmpeg candidate {}", path.display());
            if responds_to_version(&path).await {
                return Some(path);
            }
        }

        None
    }

    /// Candidate binaries that exist on disk, in search order
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        self.candidates
            .iter()
            .flat_map(|candidate| match candidate {
                Candidate::File(path) => vec![path.clone()],
                Candidate::WingetPackages(dir) => winget_binaries(dir),
            })
            .filter(|path| path.is_file())
            .collect()
    }
}

fn default_candidates() -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if let Some(local_app_data) = std::env::var_os("LOCALAPPDATA") {
        candidates.push(Candidate::WingetPackages(
            PathBuf::from(local_app_data)
                .join("Microsoft")
                .join("WinGet")
                .join("Packages"),
        ));
    }

    candidates.push(Candidate::File(PathBuf::from(
        r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
    )));

    if let Some(home) = dirs::home_dir() {
        candidates.push(Candidate::File(
            home.join("scoop").join("shims").join("ffmpeg.exe"),
        ));
    }

    for path in ["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/opt/homebrew/bin/ffmpeg"] {
        candidates.push(Candidate::File(PathBuf::from(path)));
    }

    candidates
}

/// Binaries inside `Gyan.FFmpeg_*` package folders: either at the top level or
/// under a versioned build's `bin/`
fn winget_binaries(packages: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs_err::read_dir(packages) else {
        return Vec::new();
    };

    let mut packages: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(WINGET_PACKAGE_PREFIX)
        })
        .map(|entry| entry.path())
        .collect();
    packages.sort();

    let mut binaries = Vec::new();
    for package in packages {
        binaries.push(package.join("ffmpeg.exe"));

        if let Ok(builds) = fs_err::read_dir(&package) {
            let mut builds: Vec<PathBuf> = builds.flatten().map(|entry| entry.path()).collect();
            builds.sort();
            binaries.extend(
                builds
                    .into_iter()
                    .map(|build| build.join("bin").join("ffmpeg.exe")),
            );
        }
    }

    binaries
}

/// Whether `<path> -version` runs successfully
async fn responds_to_version(path: &Path) -> bool {
    Command::new(path)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winget_layouts_are_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path();

        let flat = packages.join("Gyan.FFmpeg_Microsoft.Winget.Source_8wekyb3d8bbwe");
        fs_err::create_dir_all(&flat).unwrap();
        fs_err::write(flat.join("ffmpeg.exe"), b"").unwrap();

        let nested = packages
            .join("Gyan.FFmpeg.Essentials_abc")
            .join("ffmpeg-7.0-essentials_build")
            .join("bin");
        fs_err::create_dir_all(&nested).unwrap();
        fs_err::write(nested.join("ffmpeg.exe"), b"").unwrap();

        let unrelated = packages.join("Other.Tool_1").join("bin");
        fs_err::create_dir_all(&unrelated).unwrap();
        fs_err::write(unrelated.join("ffmpeg.exe"), b"").unwrap();

        let locator = FfmpegLocator::with_candidates(
            None,
            false,
            vec![Candidate::WingetPackages(packages.to_path_buf())],
        );

        let found = locator.candidate_paths();
        assert_eq!(
            found,
            vec![
                packages
                    .join("Gyan.FFmpeg.Essentials_abc")
                    .join("ffmpeg-7.0-essentials_build")
                    .join("bin")
                    .join("ffmpeg.exe"),
                flat.join("ffmpeg.exe"),
            ]
        );
    }

    #[test]
    fn test_missing_candidates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("ffmpeg");
        fs_err::write(&present, b"").unwrap();

        let locator = FfmpegLocator::with_candidates(
            None,
            false,
            vec![
                Candidate::File(dir.path().join("absent")),
                Candidate::WingetPackages(dir.path().join("no-packages")),
                Candidate::File(present.clone()),
            ],
        );

        assert_eq!(locator.candidate_paths(), vec![present]);
    }

    #[tokio::test]
    async fn test_locate_rejects_files_that_do_not_run() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_binary = dir.path().join("ffmpeg");
        fs_err::write(&not_a_binary, b"plain text").unwrap();

        let locator = FfmpegLocator::with_candidates(
            Some(dir.path().join("missing-override")),
            false,
            vec![Candidate::File(not_a_binary)],
        );

        assert_eq!(locator.locate().await, None);
    }
}
