// SPDX-License-Identifier: MIT OR Apache-2.0
//! Channel catalog: the distinct channels touched by the selected clips.

use crate::selection::Selection;
use std::collections::BTreeSet;
use stripmerge_nla::{ChannelKey, NlaHost};

/// How an entry's value is addressed on the evaluated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelShape {
    /// Single-valued property
    Scalar,
    /// One component of a vector property
    VectorComponent(usize),
}

impl ChannelShape {
    /// Resolve from the property width reported by the host.
    ///
    /// Returns `None` when the index cannot address the property.
    pub fn resolve(width: Option<usize>, index: usize) -> Option<Self> {
        match width {
            Some(1) if index == 0 => Some(Self::Scalar),
            Some(width) if width > 1 && index < width => Some(Self::VectorComponent(index)),
            Some(_) => None,
            // Unknown to the schema; reads will tell
            None if index == 0 => Some(Self::Scalar),
            None => Some(Self::VectorComponent(index)),
        }
    }

    /// Component index to read
    pub fn component(&self) -> usize {
        match self {
            Self::Scalar => 0,
            Self::VectorComponent(index) => *index,
        }
    }
}

/// One cataloged channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogEntry {
    /// Channel key
    pub key: ChannelKey,
    /// Resolved shape
    pub shape: ChannelShape,
}

/// Sorted, duplicate-free channel list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCatalog {
    entries: Vec<CatalogEntry>,
}

impl ChannelCatalog {
    /// Collect the channels of every selected clip
    pub fn build<H: NlaHost + ?Sized>(host: &H, selection: &Selection, expand_vectors: bool) -> Self {
        let mut keys = BTreeSet::new();

        for selected in selection.clips() {
            let clip = &selected.clip;
            let Some(source) = clip.source else {
                tracing::info!("Clip '{}' has no animation source - skipped", clip.name);
                continue;
            };
            let channels = match host.source_channels(source) {
                Ok(channels) => channels,
                Err(e) => {
                    tracing::warn!("Clip '{}': cannot list channels: {}", clip.name, e);
                    continue;
                }
            };
            if channels.is_empty() {
                tracing::info!("Clip '{}' has no animated channels - skipped", clip.name);
                continue;
            }

            for key in channels {
                if expand_vectors {
                    if let Some(width) = host.property_width(&key.path).filter(|w| *w > 1) {
                        keys.extend((0..width).map(|index| ChannelKey::new(key.path.clone(), index)));
                        continue;
                    }
                }
                keys.insert(key);
            }
        }

        let entries = keys
            .into_iter()
            .filter_map(|key| {
                let width = host.property_width(&key.path);
                match ChannelShape::resolve(width, key.index) {
                    Some(shape) => Some(CatalogEntry { key, shape }),
                    None => {
                        tracing::warn!(
                            "Channel {} does not fit property width {:?} - dropped",
                            key,
                            width
                        );
                        None
                    }
                }
            })
            .collect();

        Self { entries }
    }

    /// Build from explicit entries, sorting and deduplicating them
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut entries: Vec<CatalogEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries.dedup_by(|a, b| a.key == b.key);
        Self { entries }
    }

    /// Entries in catalog order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no channel is cataloged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a key in catalog order
    pub fn position(&self, key: &ChannelKey) -> Option<usize> {
        self.entries.binary_search_by(|e| e.key.cmp(key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stripmerge_nla::{Actor, AnimationSource, Channel, Clip, Keyframe, Track};

    fn source(keys: &[(&str, usize)]) -> AnimationSource {
        keys.iter().fold(AnimationSource::new("Src"), |source, (path, index)| {
            source.with_channel(
                Channel::new(ChannelKey::new(*path, *index)).with_keyframe(Keyframe::new(0, 1.0)),
            )
        })
    }

    fn actor_with(sources: Vec<Option<AnimationSource>>) -> Actor {
        let mut actor = Actor::new("Cube")
            .with_property("location", &[0.0, 0.0, 0.0])
            .with_property("influence", &[1.0]);
        for (i, source) in sources.into_iter().enumerate() {
            let mut clip = Clip::new(format!("clip{i}"), 0.0, 10.0).selected();
            if let Some(source) = source {
                clip = clip.with_source(actor.add_source(source));
            }
            actor.add_track(Track::new(format!("T{i}")).with_clip(clip).unwrap());
        }
        actor
    }

    #[test]
    fn test_shape_resolution() {
        assert_eq!(ChannelShape::resolve(Some(1), 0), Some(ChannelShape::Scalar));
        assert_eq!(ChannelShape::resolve(Some(1), 1), None);
        assert_eq!(ChannelShape::resolve(Some(3), 2), Some(ChannelShape::VectorComponent(2)));
        assert_eq!(ChannelShape::resolve(Some(3), 3), None);
        assert_eq!(ChannelShape::resolve(None, 0), Some(ChannelShape::Scalar));
        assert_eq!(ChannelShape::resolve(None, 4).map(|s| s.component()), Some(4));
    }

    #[test]
    fn test_deduplicates_shared_channels() {
        let actor = actor_with(vec![
            Some(source(&[("location", 0), ("location", 1)])),
            Some(source(&[("location", 0)])),
        ]);
        let selection = Selection::gather(&actor).unwrap();
        let catalog = ChannelCatalog::build(&actor, &selection, false);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].key, ChannelKey::new("location", 0));
        assert_eq!(catalog.entries()[0].shape, ChannelShape::VectorComponent(0));
    }

    #[test]
    fn test_sorted_by_path_then_index() {
        let actor = actor_with(vec![
            Some(source(&[("location", 2), ("influence", 0)])),
            Some(source(&[("location", 1)])),
        ]);
        let selection = Selection::gather(&actor).unwrap();
        let catalog = ChannelCatalog::build(&actor, &selection, false);
        let keys: Vec<String> = catalog.entries().iter().map(|e| e.key.to_string()).collect();
        assert_eq!(keys, vec!["influence[0]", "location[1]", "location[2]"]);
        assert_eq!(catalog.entries()[0].shape, ChannelShape::Scalar);
        assert_eq!(catalog.position(&ChannelKey::new("location", 2)), Some(2));
    }

    #[test]
    fn test_empty_sources_contribute_nothing() {
        let actor = actor_with(vec![None, Some(AnimationSource::new("Empty"))]);
        let selection = Selection::gather(&actor).unwrap();
        let catalog = ChannelCatalog::build(&actor, &selection, false);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_expand_vector_components() {
        let actor = actor_with(vec![
            Some(source(&[("location", 1)])),
            Some(source(&[("influence", 0)])),
        ]);
        let selection = Selection::gather(&actor).unwrap();
        let catalog = ChannelCatalog::build(&actor, &selection, true);
        let keys: Vec<String> = catalog.entries().iter().map(|e| e.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["influence[0]", "location[0]", "location[1]", "location[2]"]
        );
    }

    #[test]
    fn test_out_of_range_component_dropped() {
        let actor = actor_with(vec![
            Some(source(&[("influence", 1)])),
            Some(source(&[("location", 0)])),
        ]);
        let selection = Selection::gather(&actor).unwrap();
        let catalog = ChannelCatalog::build(&actor, &selection, false);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].key, ChannelKey::new("location", 0));
    }

    #[test]
    fn test_from_entries_sorts() {
        let catalog = ChannelCatalog::from_entries(vec![
            CatalogEntry { key: ChannelKey::new("y", 0), shape: ChannelShape::Scalar },
            CatalogEntry { key: ChannelKey::new("x", 0), shape: ChannelShape::Scalar },
            CatalogEntry { key: ChannelKey::new("y", 0), shape: ChannelShape::Scalar },
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].key.path, "x");
    }
}
