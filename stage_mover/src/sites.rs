//! Saved stage positions.
//!
//! Sites are keyed by ID. The registry hands out IDs from a counter that
//! follows the highest saved ID; deleting the most recent site gives its ID
//! back.

use stage_common::consts::{DEFAULT_SITE_COLOR, DEFAULT_SITE_SIZE, NUM_AXES};
use stage_common::site::{Site, SiteId};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{StageError, StageResult};

/// Saved sites plus the ID counter.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: BTreeMap<SiteId, Site>,
    last_id: SiteId,
    default_color: [u8; 3],
    default_size: f64,
}

impl SiteRegistry {
    /// Empty registry; new sites get `default_color` and `default_size`.
    pub fn new(default_color: [u8; 3], default_size: f64) -> Self {
        Self {
            sites: BTreeMap::new(),
            last_id: 0,
            default_color,
            default_size,
        }
    }

    /// Build a site at `position` with the next ID. The site is not saved.
    pub fn create_site(&mut self, position: [f64; NUM_AXES]) -> Site {
        self.last_id += 1;
        Site::new(self.last_id, position)
            .with_color(self.default_color)
            .with_size(self.default_size)
    }

    /// Store a site, replacing any site with the same ID.
    pub fn save_site(&mut self, site: Site) -> Option<Site> {
        self.last_id = self.last_id.max(site.id);
        debug!("Saved site {} at {:?}", site.id, site.position);
        self.sites.insert(site.id, site)
    }

    /// Remove a site.
    ///
    /// If it was the most recently numbered site its ID is handed out again.
    pub fn delete_site(&mut self, id: SiteId) -> StageResult<Site> {
        let site = self.sites.remove(&id).ok_or(StageError::SiteNotFound(id))?;
        if id == self.last_id {
            self.last_id = self.last_id.saturating_sub(1);
        }
        Ok(site)
    }

    /// Look up a site.
    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(&id)
    }

    /// All sites in ascending ID order.
    pub fn all_sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    /// Whether a site with this ID is saved.
    pub fn does_site_exist(&self, id: SiteId) -> bool {
        self.sites.contains_key(&id)
    }

    /// Number of saved sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no sites are saved.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Highest ID handed out so far.
    pub fn last_id(&self) -> SiteId {
        self.last_id
    }

    /// Sites file contents, one line per site in ascending ID order.
    pub fn to_file_contents(&self) -> StageResult<String> {
        let mut out = String::new();
        for site in self.sites.values() {
            out.push_str(&site.to_line()?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Write every site to `path`, replacing its contents.
    pub fn write_to_file(&self, path: &Path) -> StageResult<()> {
        let contents = self.to_file_contents()?;
        fs::write(path, contents)?;
        info!("Wrote {} sites to {}", self.sites.len(), path.display());
        Ok(())
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_COLOR, DEFAULT_SITE_SIZE)
    }
}

/// Parse sites file contents. Blank lines are skipped.
///
/// # Errors
/// `SiteParse` with the 1-based number of the first bad line.
pub fn parse_sites(contents: &str) -> StageResult<Vec<Site>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            Site::parse_line(line).map_err(|source| StageError::SiteParse { line: i + 1, source })
        })
        .collect()
}

/// Read and parse a sites file.
pub fn read_sites_file(path: &Path) -> StageResult<Vec<Site>> {
    let contents = fs::read_to_string(path)?;
    parse_sites(&contents)
}
