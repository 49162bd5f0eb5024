//! URL resolution and destination naming
//!
//! Everything here is pure: resolution never fails, malformed input falls
//! back to the kind's default file name.

use crate::extract::DiscoveredReference;
use crate::types::{CollisionPolicy, ResourceKind, ResourceReference};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Absolute URL and local destination for one attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved_url: String,
    /// `{kind dir}/{file name}`, relative to the output root
    pub destination_path: String,
}

/// Resolve a raw attribute value against the page base URL
pub fn resolve(kind: ResourceKind, raw: &str, base: &Url) -> Resolution {
    let raw = raw.trim();
    match base.join(raw) {
        Ok(url) => Resolution {
            destination_path: destination_path(kind, &file_name(kind, &url)),
            resolved_url: url.into(),
        },
        Err(_) => Resolution {
            resolved_url: raw.to_string(),
            destination_path: destination_path(kind, kind.default_file_name()),
        },
    }
}

/// Local file name for a resolved URL
///
/// Last path segment with query and fragment dropped, percent-decoded and
/// restricted to `[A-Za-z0-9._-]`. Empty names become the kind default.
pub fn file_name(kind: ResourceKind, url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let name: String = decoded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        kind.default_file_name().to_string()
    } else {
        name
    }
}

fn destination_path(kind: ResourceKind, name: &str) -> String {
    format!("{}/{}", kind.dir(), name)
}

/// Hands out destination paths according to a collision policy
///
/// Allocation order is the order of calls, so feeding references in
/// document order gives a deterministic layout.
#[derive(Debug, Default)]
pub struct DestinationAllocator {
    policy: CollisionPolicy,
    taken: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl DestinationAllocator {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Claim `path`, or a suffixed variant of it if already claimed
    pub fn allocate(&mut self, path: String) -> String {
        if self.policy == CollisionPolicy::Overwrite || !self.taken.contains(&path) {
            self.taken.insert(path.clone());
            return path;
        }

        let (stem, ext) = split_extension(&path);
        let counter = self.next_suffix.entry(path.clone()).or_insert(1);
        loop {
            let candidate = format!("{}-{}{}", stem, counter, ext);
            *counter += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Split `css/a.min.css` into (`css/a.min`, `.css`)
fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => path.split_at(name_start + dot),
        _ => (path, ""),
    }
}

/// Resolve every discovered reference, in order
pub fn resolve_references(
    discovered: Vec<DiscoveredReference>,
    base: &Url,
    policy: CollisionPolicy,
) -> Vec<ResourceReference> {
    let mut allocator = DestinationAllocator::new(policy);

    discovered
        .into_iter()
        .map(|found| {
            let resolution = resolve(found.kind, &found.value, base);
            ResourceReference {
                kind: found.kind,
                destination_path: allocator.allocate(resolution.destination_path),
                resolved_url: resolution.resolved_url,
                original_value: found.value,
                owner: found.owner,
            }
        })
        .collect()
}
