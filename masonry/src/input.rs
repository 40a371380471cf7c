//! Reading the starting wall profiles.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use crate::{
    Height, ProfileId,
    error::{BuildError, BuildResult},
};

/// Starting heights of every section, keyed by profile.
///
/// Profiles are numbered by their 1-based line in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WallData {
    profiles: BTreeMap<ProfileId, Vec<Height>>,
}

impl WallData {
    pub fn from_path(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        tracing::info!("Reading wall profiles from '{}' ...", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                BuildError::NotFound {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                BuildError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let data: Self = text.parse()?;
        tracing::info!("There are {} wall profiles.", data.profiles.len());
        Ok(data)
    }

    /// Parse profile lines. Reading stops at the first blank line.
    pub fn parse(text: &str) -> BuildResult<Self> {
        let mut profiles = BTreeMap::new();
        for (line, profile) in text.lines().map(str::trim).take_while(|l| !l.is_empty()).zip(1..) {
            let sections = line
                .split_whitespace()
                .zip(1..)
                .map(|(token, section)| {
                    token.parse::<Height>().map_err(|source| BuildError::Parse {
                        profile,
                        section,
                        token: token.to_string(),
                        source,
                    })
                })
                .collect::<BuildResult<Vec<_>>>()?;
            profiles.insert(profile, sections);
        }
        Ok(Self { profiles })
    }

    pub fn profile_ids(&self) -> impl Iterator<Item = ProfileId> + '_ {
        self.profiles.keys().copied()
    }

    /// Starting heights of `profile`'s sections, if the profile exists.
    pub fn sections(&self, profile: ProfileId) -> Option<&[Height]> {
        self.profiles.get(&profile).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileId, &[Height])> + '_ {
        self.profiles.iter().map(|(p, s)| (*p, s.as_slice()))
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn section_count(&self) -> usize {
        self.profiles.values().map(Vec::len).sum()
    }

    /// Total feet still missing across all sections.
    pub fn deficiency(&self, target: u32) -> u64 {
        self.profiles
            .values()
            .flatten()
            .map(|h| section_deficiency(*h, target))
            .fold(0, u64::saturating_add)
    }

    /// Feet missing in the lowest section, which is the serial run length.
    pub fn max_deficiency(&self, target: u32) -> u64 {
        self.profiles
            .values()
            .flatten()
            .map(|h| section_deficiency(*h, target))
            .max()
            .unwrap_or(0)
    }
}

/// Feet a section starting at `initial` needs to reach `target`; zero when it
/// already stands at or above it.
pub fn section_deficiency(initial: Height, target: u32) -> u64 {
    let missing = i128::from(target) - i128::from(initial);
    u64::try_from(missing.max(0)).unwrap_or(u64::MAX)
}

impl FromStr for WallData {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<Vec<Height>> for WallData {
    /// Number the given profiles from 1 in iteration order.
    fn from_iter<I: IntoIterator<Item = Vec<Height>>>(iter: I) -> Self {
        Self {
            profiles: (1..).zip(iter).collect(),
        }
    }
}
