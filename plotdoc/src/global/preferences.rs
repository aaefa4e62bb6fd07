//! User preferences, kept as TOML in the user's preference directory.

use std::path::{Path, PathBuf};

use anyhow::Context;

const HEADER: &str = r#"# Plotdoc preferences. Comments and formatting are rewritten by --save-preferences.
#
# history_limit: how many steps can be undone. 0 keeps every step.
# print_tree: print the widget tree of each document after its scripts have run.

"#;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreferenceValues {
    pub history_limit: usize,
    pub print_tree: bool,
}
impl Default for PreferenceValues {
    fn default() -> Self {
        Self {
            history_limit: 100,
            print_tree: true,
        }
    }
}
impl PreferenceValues {
    /// The limit as understood by the document history.
    #[must_use]
    pub fn history_limit(&self) -> Option<usize> {
        (self.history_limit != 0).then_some(self.history_limit)
    }
}

/// Where the values in use came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    /// No preference directory, or no file in it.
    Defaults,
    /// The file exists but couldn't be used. Saving will overwrite it.
    Unreadable(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Preferences {
    pub values: PreferenceValues,
    pub source: Source,
}
impl Preferences {
    const FILENAME: &'static str = "preferences.toml";

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        super::preferences_dir().map(|dir| dir.join(Self::FILENAME))
    }
    /// Loaded once, on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: std::sync::OnceLock<Preferences> = std::sync::OnceLock::new();
        GLOBAL.get_or_init(|| match Self::path() {
            Some(path) => Self::load(path),
            None => {
                log::warn!("No preference directory on this system");
                Self::defaults()
            }
        })
    }
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            values: PreferenceValues::default(),
            source: Source::Defaults,
        }
    }
    /// Read `path`, falling back to defaults if it is absent or broken.
    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        if !path.exists() {
            log::debug!("No preferences at {}", path.display());
            return Self::defaults();
        }
        match read(&path) {
            Ok(values) => Self {
                values,
                source: Source::File(path),
            },
            Err(e) => {
                log::warn!("{e:#}");
                Self {
                    values: PreferenceValues::default(),
                    source: Source::Unreadable(path),
                }
            }
        }
    }
    /// Write to the global preferences file, returning where it went.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::path().context("no preference directory on this system")?;
        self.write(&path)?;
        Ok(path)
    }
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        // Only our own directory, the preference dir itself must already exist.
        if let Some(dir) = path.parent() {
            match std::fs::create_dir(dir) {
                Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => {
                    return Err(e).with_context(|| format!("creating {}", dir.display()));
                }
                _ => (),
            }
        }
        let text = HEADER.to_owned() + &toml::ser::to_string_pretty(&self.values)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}

fn read(path: &Path) -> anyhow::Result<PreferenceValues> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("plotdoc-preferences-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let values: PreferenceValues = toml::from_str("print_tree = false").unwrap();
        assert_eq!(
            values,
            PreferenceValues {
                history_limit: 100,
                print_tree: false,
            }
        );
        assert_eq!(values.history_limit(), Some(100));
    }
    #[test]
    fn zero_is_unlimited() {
        let values = PreferenceValues {
            history_limit: 0,
            ..PreferenceValues::default()
        };
        assert_eq!(values.history_limit(), None);
    }
    #[test]
    fn written_file_loads_back() {
        let path = scratch("saved.toml");
        let preferences = Preferences {
            values: PreferenceValues {
                history_limit: 7,
                print_tree: false,
            },
            source: Source::Defaults,
        };
        preferences.write(&path).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("# Plotdoc preferences."));
        let loaded = Preferences::load(path.clone());
        assert_eq!(loaded.values, preferences.values);
        assert_eq!(loaded.source, Source::File(path));
    }
    #[test]
    fn missing_and_broken_files() {
        let missing = Preferences::load(scratch("missing.toml"));
        assert_eq!(missing.source, Source::Defaults);

        let path = scratch("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "history_limit = \"lots\"").unwrap();
        let broken = Preferences::load(path.clone());
        assert_eq!(broken.values, PreferenceValues::default());
        assert_eq!(broken.source, Source::Unreadable(path));
    }
}
