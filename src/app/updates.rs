//! Update discovery for an installed release
//!
//! Offers from the release API are compared with the installed version.
//! Release numbering treats a change in the first two components as a major
//! update and a change in the third as a minor one, so 6.7 → 6.8 is major
//! and 6.7 → 6.7.2 is minor.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::app::client::ReleaseOffer;
use crate::constants::release;

/// Kind of update an offer represents relative to the installed version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// Same major and minor number, newer patch
    Minor,
    /// Newer major or minor number
    Major,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateType::Minor => f.write_str("minor"),
            UpdateType::Major => f.write_str("major"),
        }
    }
}

/// Restricts which updates are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateFilter {
    #[default]
    All,
    MajorOnly,
    MinorOnly,
}

/// An update available for an installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableUpdate {
    pub version: String,
    pub update_type: UpdateType,
    pub package_url: String,
}

/// Compare two dotted version numbers
///
/// Missing components count as zero and a pre-release suffix such as
/// "-RC1" sorts before the release itself.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_base, a_suffix) = split_suffix(a);
    let (b_base, b_suffix) = split_suffix(b);
    let a_parts = numeric_parts(a_base);
    let b_parts = numeric_parts(b_base);

    let len = a_parts.len().max(b_parts.len());
    for i in 0..len {
        let x = a_parts.get(i).copied().unwrap_or(0);
        let y = b_parts.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (a_suffix, b_suffix) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

fn split_suffix(version: &str) -> (&str, Option<&str>) {
    match version.split_once('-') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (version, None),
    }
}

fn numeric_parts(base: &str) -> Vec<u64> {
    base.split('.')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}

/// Installed version as used for comparisons, without a "-src" marker
pub fn comparable_installed(installed: &str) -> &str {
    installed.strip_suffix("-src").unwrap_or(installed)
}

/// Classify an offer against the installed version
///
/// Returns `None` unless the offer is strictly newer.
pub fn classify(offer: &str, installed: &str) -> Option<UpdateType> {
    let installed = comparable_installed(installed);
    if compare_versions(offer, installed) != Ordering::Greater {
        return None;
    }

    let (installed_base, _) = split_suffix(installed);
    let (offer_base, _) = split_suffix(offer);
    let installed_bits: Vec<&str> = installed_base.split('.').collect();
    let offer_bits: Vec<&str> = offer_base.split('.').collect();

    let same_release_line = installed_bits.len() >= 2
        && offer_bits.len() >= 2
        && installed_bits[..2] == offer_bits[..2];

    Some(if same_release_line {
        UpdateType::Minor
    } else {
        UpdateType::Major
    })
}

/// Newest update of each type, lowest version first
pub fn available_updates(
    offers: &[ReleaseOffer],
    installed: &str,
    filter: UpdateFilter,
) -> Vec<AvailableUpdate> {
    let mut major: Option<AvailableUpdate> = None;
    let mut minor: Option<AvailableUpdate> = None;

    for offer in offers {
        let Some(update_type) = classify(&offer.version, installed) else {
            continue;
        };
        let slot = match update_type {
            UpdateType::Major => &mut major,
            UpdateType::Minor => &mut minor,
        };
        if let Some(current) = slot {
            if compare_versions(&offer.version, &current.version) != Ordering::Greater {
                continue;
            }
        }
        *slot = Some(AvailableUpdate {
            version: offer.version.clone(),
            update_type,
            package_url: offer.download_url.clone(),
        });
    }

    match filter {
        UpdateFilter::MajorOnly => major.into_iter().collect(),
        UpdateFilter::MinorOnly => minor.into_iter().collect(),
        UpdateFilter::All => minor.into_iter().chain(major).collect(),
    }
}

/// What an update should install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateTarget {
    /// Install this version
    Version(String),
    /// Nothing newer than the installed version is wanted
    UpToDate,
    /// `minor_only` was requested and no patch release is offered
    AtLatestMinor,
}

/// Pick the version an update installs
///
/// # Arguments
///
/// * `installed` - Installed version
/// * `requested` - Explicit version, "nightly" or `None` for the newest offer
/// * `offers` - Offers for the installation's locale, newest first
/// * `minor_only` - Only take a patch release of the installed line
/// * `force` - Reinstall or downgrade when the target is not newer
pub fn choose_target(
    installed: &str,
    requested: Option<&str>,
    offers: &[ReleaseOffer],
    minor_only: bool,
    force: bool,
) -> UpdateTarget {
    let candidate = match requested {
        Some(version) => {
            let is_nightly = version.eq_ignore_ascii_case(release::NIGHTLY)
                || version.eq_ignore_ascii_case(release::TRUNK);
            let newer = compare_versions(comparable_installed(installed), version) == Ordering::Less;
            if !(newer || is_nightly || force) {
                return UpdateTarget::UpToDate;
            }
            version.to_string()
        }
        None if minor_only => {
            let patch = offers
                .iter()
                .find(|offer| classify(&offer.version, installed) == Some(UpdateType::Minor));
            match patch {
                Some(offer) => offer.version.clone(),
                None => return UpdateTarget::AtLatestMinor,
            }
        }
        None => match offers.first() {
            Some(offer) => offer.version.clone(),
            None => return UpdateTarget::UpToDate,
        },
    };

    if candidate == installed && !force {
        UpdateTarget::UpToDate
    } else {
        UpdateTarget::Version(candidate)
    }
}
