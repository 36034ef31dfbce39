//! Merging a chapter's slides with periodic ad breaks.

use std::num::NonZeroUsize;

use serde::Serialize;

pub const DEFAULT_ADS_FREQUENCY: usize = 6;
pub const ADS_FREQUENCY_KEY: &str = "ads_frequency";

/// How often an ad break follows a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdFrequency {
    Every(NonZeroUsize),
    Disabled,
}

impl Default for AdFrequency {
    fn default() -> Self {
        match NonZeroUsize::new(DEFAULT_ADS_FREQUENCY) {
            Some(n) => Self::Every(n),
            None => Self::Disabled,
        }
    }
}

impl AdFrequency {
    /// Reads a stored setting value. Absent or unparsable values fall back to
    /// the default; zero and negative values turn ads off.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.and_then(|v| v.trim().parse::<i64>().ok()) else {
            return Self::default();
        };
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Self::Disabled, Self::Every)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry<S, A> {
    Slide(S),
    Ad(AdBreak<A>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdBreak<A> {
    #[serde(flatten)]
    pub ad: A,
    /// Number of slides shown before this break.
    pub position: usize,
}

/// Where an ad was placed, by index into the active-ad list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub ad_index: usize,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct Interleaved<S, A> {
    pub entries: Vec<Entry<S, A>>,
    pub placements: Vec<Placement>,
    pub total_slides: usize,
}

impl<S, A> Interleaved<S, A> {
    pub fn ads_inserted(&self) -> usize {
        self.placements.len()
    }
}

/// Emits every slide in order and, after every Nth slide, one ad picked
/// round-robin from `ads`.
pub fn interleave<S, A: Clone>(
    slides: Vec<S>,
    ads: &[A],
    frequency: AdFrequency,
) -> Interleaved<S, A> {
    let total_slides = slides.len();
    let every = match frequency {
        AdFrequency::Every(n) if !ads.is_empty() => Some(n.get()),
        _ => None,
    };

    let mut entries = Vec::with_capacity(total_slides + every.map_or(0, |n| total_slides / n));
    let mut placements = Vec::new();
    let mut cursor = 0_usize;

    for (i, slide) in slides.into_iter().enumerate() {
        entries.push(Entry::Slide(slide));

        let Some(n) = every else { continue };
        if (i + 1) % n != 0 {
            continue;
        }

        let ad_index = cursor % ads.len();
        cursor += 1;
        let position = i + 1;
        entries.push(Entry::Ad(AdBreak {
            ad: ads[ad_index].clone(),
            position,
        }));
        placements.push(Placement { ad_index, position });
    }

    Interleaved {
        entries,
        placements,
        total_slides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every(n: usize) -> AdFrequency {
        AdFrequency::Every(NonZeroUsize::new(n).unwrap())
    }

    fn shape(entries: &[Entry<u32, &'static str>]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                Entry::Slide(n) => format!("s{n}"),
                Entry::Ad(b) => format!("{}@{}", b.ad, b.position),
            })
            .collect()
    }

    #[test]
    fn parse_frequency_values() {
        assert_eq!(AdFrequency::parse(None), every(6));
        assert_eq!(AdFrequency::parse(Some("4")), every(4));
        assert_eq!(AdFrequency::parse(Some(" 12 ")), every(12));
        assert_eq!(AdFrequency::parse(Some("often")), every(6));
        assert_eq!(AdFrequency::parse(Some("")), every(6));
        assert_eq!(AdFrequency::parse(Some("0")), AdFrequency::Disabled);
        assert_eq!(AdFrequency::parse(Some("-3")), AdFrequency::Disabled);
    }

    #[test]
    fn thirteen_slides_every_four_with_two_ads() {
        let slides: Vec<u32> = (1..=13).collect();
        let out = interleave(slides, &["a0", "a1"], every(4));

        assert_eq!(out.total_slides, 13);
        assert_eq!(out.ads_inserted(), 3);
        assert_eq!(
            shape(&out.entries),
            vec![
                "s1", "s2", "s3", "s4", "a0@4", "s5", "s6", "s7", "s8", "a1@8", "s9", "s10",
                "s11", "s12", "a0@12", "s13",
            ]
        );
        assert_eq!(
            out.placements,
            vec![
                Placement { ad_index: 0, position: 4 },
                Placement { ad_index: 1, position: 8 },
                Placement { ad_index: 0, position: 12 },
            ]
        );
    }

    #[test]
    fn no_ads_means_no_breaks() {
        let out = interleave((1..=20).collect::<Vec<u32>>(), &[] as &[&str], every(2));
        assert_eq!(out.ads_inserted(), 0);
        assert_eq!(out.entries.len(), 20);
    }

    #[test]
    fn disabled_frequency_means_no_breaks() {
        let out = interleave((1..=20).collect::<Vec<u32>>(), &["a"], AdFrequency::Disabled);
        assert_eq!(out.ads_inserted(), 0);
    }

    #[test]
    fn ad_count_is_floor_of_length_over_frequency() {
        let ads = ["a", "b", "c"];
        for len in 0..30_u32 {
            for n in 1..8 {
                let out = interleave((1..=len).collect::<Vec<u32>>(), &ads, every(n));
                assert_eq!(out.ads_inserted(), len as usize / n, "len {len} n {n}");
                assert_eq!(out.entries.len(), len as usize + len as usize / n);

                let order: Vec<usize> = out.placements.iter().map(|p| p.ad_index).collect();
                let want: Vec<usize> = (0..order.len()).map(|k| k % ads.len()).collect();
                assert_eq!(order, want);
            }
        }
    }

    #[test]
    fn entries_serialize_with_type_tag() {
        #[derive(Clone, Serialize)]
        struct Ad {
            id: &'static str,
        }
        let out = interleave(vec![serde_json::json!({"id": "s1"})], &[Ad { id: "x" }], every(1));
        let json = serde_json::to_value(&out.entries).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "slide", "id": "s1"},
                {"type": "ad", "id": "x", "position": 1},
            ])
        );
    }
}
