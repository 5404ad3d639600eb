//! # CRT track building
//!
//! Turns the unordered list of hits recorded in one readout window into candidate
//! [`CrtTrack`]s:
//!
//! 1. [`create_tzeros`] sorts the hits by time and clusters them with a single-link rule.
//! 2. Inside each cluster, [`average_hits`] merges nearby hits of the same tagger.
//! 3. [`create_tracks_from_tzeros`] pairs the merged hits of compatible taggers.
//!
//! Tagger compatibility follows the expected straight cosmic paths through the CRT shell:
//! top and bottom walls pair together, side walls pair together, and top walls only pair
//! with side walls when explicitly requested (see [`TaggerRole::compatible`]).
//!
//! All functions are pure and deterministic for a given input order.

use std::collections::BTreeMap;

use itertools::Itertools;
use nalgebra::Vector3;
use ordered_float::OrderedFloat;
use tracing::{debug, trace};

use crate::constants::{Centimeter, Microsecond};
use crate::crt_hit::{CrtHit, CrtTrack};

/// Position of a tagger in the CRT shell, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggerRole {
    Top,
    Bottom,
    Side,
}

impl TaggerRole {
    /// `Top` for names containing `"Top"`, `Bottom` for `"Bot"`, `Side` otherwise.
    pub fn from_tagger_name(name: &str) -> Self {
        if name.contains("Top") {
            TaggerRole::Top
        } else if name.contains("Bot") {
            TaggerRole::Bottom
        } else {
            TaggerRole::Side
        }
    }

    /// Decide whether hits of two taggers may form a straight track.
    ///
    /// Arguments
    /// -----------------
    /// * `tagger1`, `tagger2`: Tagger names of the two hits.
    /// * `use_top_plane`: Allow top ↔ side pairs.
    ///
    /// Return
    /// ----------
    /// * `false` for the same tagger, `true` for top/bottom, side/side and distinct top
    ///   walls, `use_top_plane` for top/side, `false` for every other pair.
    pub fn compatible(tagger1: &str, tagger2: &str, use_top_plane: bool) -> bool {
        if tagger1 == tagger2 {
            return false;
        }
        use TaggerRole::*;
        match (
            Self::from_tagger_name(tagger1),
            Self::from_tagger_name(tagger2),
        ) {
            (Top, Bottom) | (Bottom, Top) => true,
            (Side, Side) | (Top, Top) => true,
            (Top, Side) | (Side, Top) => use_top_plane,
            _ => false,
        }
    }
}

/// Group hits into T0 candidates.
///
/// The hits are sorted by time (stable, so equal times keep their input order) and scanned
/// once: a hit joins the current group when it is less than `time_limit` after the last
/// member, otherwise it opens a new group. Every hit of a group is therefore within
/// `time_limit` of at least one other member.
///
/// Arguments
/// -----------------
/// * `hits`: Hits of one readout window, in any order.
/// * `time_limit`: Maximum gap between time-consecutive hits of a group (µs).
///
/// Return
/// ----------
/// * The groups, ordered by their earliest time, members ordered by time.
pub fn create_tzeros(hits: &[CrtHit], time_limit: Microsecond) -> Vec<Vec<CrtHit>> {
    let mut sorted: Vec<&CrtHit> = hits.iter().collect();
    sorted.sort_by_key(|h| OrderedFloat(h.time));

    let mut groups: Vec<Vec<CrtHit>> = Vec::new();
    for hit in sorted {
        let joins = groups
            .last()
            .and_then(|group| group.last())
            .is_some_and(|last| hit.time - last.time < time_limit);
        match groups.last_mut() {
            Some(group) if joins => group.push(hit.clone()),
            _ => groups.push(vec![hit.clone()]),
        }
    }

    debug!(hits = hits.len(), groups = groups.len(), "CRT T0 groups built");
    groups
}

/// Merge nearby hits of the same tagger.
///
/// Hits are bucketed per tagger (tagger names in lexicographic order). Inside a tagger, the
/// first unused hit seeds a cluster that absorbs every unused hit closer than
/// `average_hit_dist` to the seed. The merged hit takes the mean position and time; its
/// uncertainty is the mean uncertainty widened by half the per-axis spread of the members.
///
/// Return
/// ----------
/// * One hit per cluster. Single-hit clusters are returned unchanged.
pub fn average_hits(hits: &[CrtHit], average_hit_dist: Centimeter) -> Vec<CrtHit> {
    let mut per_tagger: BTreeMap<&str, Vec<&CrtHit>> = BTreeMap::new();
    for hit in hits {
        per_tagger.entry(hit.tagger.as_str()).or_default().push(hit);
    }

    let mut averaged = Vec::with_capacity(hits.len());
    for tagger_hits in per_tagger.values() {
        let mut used = vec![false; tagger_hits.len()];
        for (i, seed) in tagger_hits.iter().enumerate() {
            if used[i] {
                continue;
            }
            let mut members: Vec<&CrtHit> = Vec::new();
            for (j, candidate) in tagger_hits.iter().enumerate().skip(i) {
                if !used[j] && seed.distance_to(candidate) < average_hit_dist {
                    used[j] = true;
                    members.push(candidate);
                }
            }
            // a hit is always at distance 0 from itself, unless average_hit_dist is 0
            if members.is_empty() {
                used[i] = true;
                members.push(seed);
            }
            averaged.push(merge_hits(&members));
        }
    }
    averaged
}

fn merge_hits(members: &[&CrtHit]) -> CrtHit {
    if let [single] = members {
        return (*single).clone();
    }

    let n = members.len() as f64;
    let mean_pos = members
        .iter()
        .fold(Vector3::zeros(), |acc, h| acc + h.position.coords)
        / n;
    let mean_err = members.iter().fold(Vector3::zeros(), |acc, h| acc + h.error) / n;
    let mean_time = members.iter().map(|h| h.time).sum::<f64>() / n;

    let spread = Vector3::from_fn(|axis, _| {
        let (lo, hi) = members
            .iter()
            .map(|h| h.position[axis])
            .minmax()
            .into_option()
            .unwrap_or((0.0, 0.0));
        hi - lo
    });

    CrtHit::new(
        mean_pos.into(),
        mean_err + spread * 0.5,
        mean_time,
        members[0].tagger.clone(),
    )
}

/// Build CRT tracks from T0 groups.
///
/// Arguments
/// -----------------
/// * `tzeros`: Groups produced by [`create_tzeros`].
/// * `average_hit_dist`: Merge radius passed to [`average_hits`] (cm).
/// * `use_top_plane`: Allow top ↔ side tagger pairs.
/// * `distance_limit`: Pairs farther apart than this are rejected (cm).
///
/// Return
/// ----------
/// * Every accepted pair as a [`CrtTrack`], group by group. Within a group the merged hits
///   are ordered by tagger name and each unordered pair is considered once, the first hit of
///   the pair becoming the track start.
///
/// See also
/// ------------
/// * [`TaggerRole::compatible`] – tagger pairing rules.
pub fn create_tracks_from_tzeros(
    tzeros: &[Vec<CrtHit>],
    average_hit_dist: Centimeter,
    use_top_plane: bool,
    distance_limit: Centimeter,
) -> Vec<CrtTrack> {
    let mut tracks = Vec::new();
    for group in tzeros {
        let merged = average_hits(group, average_hit_dist);
        for (a, b) in merged.iter().tuple_combinations() {
            if !TaggerRole::compatible(&a.tagger, &b.tagger, use_top_plane) {
                continue;
            }
            let distance = a.distance_to(b);
            trace!(
                tagger1 = a.tagger.as_str(),
                tagger2 = b.tagger.as_str(),
                distance,
                "CRT hit pair"
            );
            if distance < distance_limit {
                tracks.push(CrtTrack::from_hits(a, b));
            }
        }
    }

    debug!(groups = tzeros.len(), tracks = tracks.len(), "CRT tracks built");
    tracks
}

/// [`create_tzeros`] followed by [`create_tracks_from_tzeros`].
pub fn create_tracks(
    hits: &[CrtHit],
    time_limit: Microsecond,
    average_hit_dist: Centimeter,
    use_top_plane: bool,
    distance_limit: Centimeter,
) -> Vec<CrtTrack> {
    let tzeros = create_tzeros(hits, time_limit);
    create_tracks_from_tzeros(&tzeros, average_hit_dist, use_top_plane, distance_limit)
}

/// Mean time of each T0 group, in group order.
pub fn apa_t0s_from_hits(hits: &[CrtHit], time_limit: Microsecond) -> Vec<Microsecond> {
    create_tzeros(hits, time_limit)
        .iter()
        .map(|group| group.iter().map(|h| h.time).sum::<f64>() / group.len() as f64)
        .collect()
}

/// Time of each CRT track.
pub fn apa_t0s_from_tracks(tracks: &[CrtTrack]) -> Vec<Microsecond> {
    tracks.iter().map(|t| t.time).collect()
}
