//! SRTM elevation acquisition through NASA's Common Metadata Repository.
//!
//! Only the download side is implemented: archives are found (or fetched)
//! and listed, but not unpacked or read.

use crate::client::{is_zip, Credentials};
use crate::{load_boundary, FetchError, HttpFetcher, Result};
use habitat_grid::BoundingBox;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

/// CMR search API root.
pub const CMR_SEARCH_URL: &str = "https://cmr.earthdata.nasa.gov/search";

/// SRTM 1 arc-second global collection.
pub const SRTM_SHORT_NAME: &str = "SRTMGL1";

/// Keyword used to list candidate collections.
pub const SRTM_KEYWORD: &str = "SRTM DEM";

/// Local archive pattern.
pub const SRTM_ARCHIVE_PATTERN: &str = "*.hgt.zip";

/// Project boundary location relative to the data directory.
pub const PROJECT_BOUNDARY_PATH: &str = "project_file/project_boundary/project.shp";

const ENV_TOKEN: &str = "EARTHDATA_TOKEN";
const ENV_USERNAME: &str = "EARTHDATA_USERNAME";
const ENV_PASSWORD: &str = "EARTHDATA_PASSWORD";

/// Earthdata credentials from the environment.
///
/// A bearer token wins over username and password.
pub fn earthdata_credentials() -> Result<Credentials> {
    credentials_from(|name| std::env::var(name).ok())
}

fn credentials_from<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Credentials> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(ENV_TOKEN) {
        return Ok(Credentials::Token(token));
    }
    match (non_empty(ENV_USERNAME), non_empty(ENV_PASSWORD)) {
        (Some(username), Some(password)) => Ok(Credentials::Basic { username, password }),
        _ => Err(FetchError::MissingCredentials),
    }
}

#[derive(Debug, Deserialize)]
struct Feed<T> {
    feed: Entries<T>,
}

#[derive(Debug, Deserialize)]
struct Entries<T> {
    #[serde(default = "Vec::new")]
    entry: Vec<T>,
}

/// A CMR collection search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub title: String,
}

/// A CMR granule search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct Granule {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub links: Vec<GranuleLink>,
}

/// One link attached to a granule.
#[derive(Debug, Clone, Deserialize)]
pub struct GranuleLink {
    pub href: String,
    #[serde(default)]
    pub rel: String,
    /// Links copied down from the parent collection.
    #[serde(default)]
    pub inherited: bool,
}

impl Granule {
    /// Direct data download links.
    pub fn data_links(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .filter(|l| l.rel.ends_with("/data#") && !l.inherited)
            .map(|l| l.href.as_str())
    }
}

/// Client for the CMR collection and granule search endpoints.
#[derive(Debug)]
pub struct CmrClient<'a> {
    fetcher: &'a HttpFetcher,
    base_url: String,
}

impl<'a> CmrClient<'a> {
    pub fn new(fetcher: &'a HttpFetcher) -> Self {
        Self::with_base_url(fetcher, CMR_SEARCH_URL)
    }

    /// Point the client at another CMR deployment.
    pub fn with_base_url(fetcher: &'a HttpFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Collections matching a free-text keyword.
    pub fn search_datasets(&self, keyword: &str) -> Result<Vec<Collection>> {
        let url = format!("{}/collections.json", self.base_url);
        let feed: Feed<Collection> = self
            .fetcher
            .get_json(&url, &[("keyword", keyword.to_string())])?;
        Ok(feed.feed.entry)
    }

    /// Granules of `short_name` intersecting `bbox`.
    pub fn search_granules(&self, short_name: &str, bbox: &BoundingBox) -> Result<Vec<Granule>> {
        let url = format!("{}/granules.json", self.base_url);
        let [w, s, e, n] = bbox.total_bounds();
        let query = [
            ("short_name", short_name.to_string()),
            ("bounding_box", format!("{},{},{},{}", w, s, e, n)),
            ("page_size", "2000".to_string()),
        ];
        let feed: Feed<Granule> = self.fetcher.get_json(&url, &query)?;
        Ok(feed.feed.entry)
    }

    /// Download every data link of `granules` into `dir`.
    pub fn download(
        &self,
        granules: &[Granule],
        dir: &Path,
        credentials: &Credentials,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for granule in granules {
            for href in granule.data_links() {
                let name = file_name(href).unwrap_or_else(|| granule.title.clone());
                let path = dir.join(name);
                let bytes = self
                    .fetcher
                    .download_archive(href, &path, Some(credentials))?;
                debug!("{} -> {} ({} bytes)", href, path.display(), bytes);
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Last path segment of a URL.
fn file_name(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let segment = url.path_segments()?.next_back()?;
    (!segment.is_empty()).then(|| segment.to_string())
}

/// Archives matching [`SRTM_ARCHIVE_PATTERN`] in `dir`, sorted.
///
/// Files without a zip signature (e.g. a saved login page) are skipped, so
/// they get downloaded again.
pub fn local_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(SRTM_ARCHIVE_PATTERN);
    let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| {
            let valid = has_zip_signature(path);
            if !valid {
                warn!("Ignoring {}: not a zip archive", path.display());
            }
            valid
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn has_zip_signature(path: &Path) -> bool {
    let mut head = [0u8; 4];
    fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut head))
        .is_ok()
        && is_zip(&head)
}

/// Make sure SRTM archives for the project are present in `data_dir/srtm`.
///
/// When none are present yet, authenticates against Earthdata, searches CMR
/// for SRTMGL1 granules intersecting the project boundary and downloads
/// them. The boundary defaults to [`PROJECT_BOUNDARY_PATH`] under `data_dir`.
/// Returns the archive paths.
pub fn acquire_srtm(
    fetcher: &HttpFetcher,
    data_dir: &Path,
    boundary: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let srtm_dir = data_dir.join("srtm");
    fs::create_dir_all(&srtm_dir)?;

    if local_archives(&srtm_dir)?.is_empty() {
        let credentials = earthdata_credentials()?;
        let boundary_path = boundary
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join(PROJECT_BOUNDARY_PATH));
        let bbox = load_boundary(&boundary_path)?;

        let cmr = CmrClient::new(fetcher);
        for collection in cmr.search_datasets(SRTM_KEYWORD)? {
            info!("{}: {}", collection.short_name, collection.title);
        }

        let granules = cmr.search_granules(SRTM_SHORT_NAME, &bbox)?;
        info!("Found {} {} granules", granules.len(), SRTM_SHORT_NAME);
        cmr.download(&granules, &srtm_dir, &credentials)?;
    }

    let archives = local_archives(&srtm_dir)?;
    for path in &archives {
        info!("Processing file: {}", path.display());
    }
    Ok(archives)
}
