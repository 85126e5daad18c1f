use std::cmp::Ordering;

use ahash::{AHashMap, AHashSet};

use faro_domain::chunk::StoredChunk;

pub const DEFAULT_RRF_K: u32 = 60;

/// A chunk surfaced by at least one retrieval leg, carrying its accumulated
/// reciprocal-rank score.
#[derive(Debug, Clone)]
pub struct Candidate {
	pub chunk: StoredChunk,
	pub fusion_score: f32,
}

/// Reciprocal Rank Fusion over any number of ranked lists. An item at
/// zero-based rank `r` contributes `1 / (k + r + 1)` per list it appears in,
/// so documents ranked well by several legs beat documents ranked extremely
/// well by a single one. Ties keep first-seen order; duplicate ids within one
/// list count once.
pub fn reciprocal_rank_fusion(lists: &[Vec<StoredChunk>], k: u32) -> Vec<Candidate> {
	let mut first_seen: Vec<String> = Vec::new();
	let mut scored: AHashMap<String, Candidate> = AHashMap::new();

	for list in lists {
		let mut seen_in_list: AHashSet<&str> = AHashSet::new();

		for (rank, chunk) in list.iter().enumerate() {
			if !seen_in_list.insert(chunk.id.as_str()) {
				continue;
			}

			let contribution = 1.0 / (k as f32 + rank as f32 + 1.0);

			match scored.get_mut(chunk.id.as_str()) {
				Some(candidate) => candidate.fusion_score += contribution,
				None => {
					first_seen.push(chunk.id.clone());
					scored.insert(
						chunk.id.clone(),
						Candidate { chunk: chunk.clone(), fusion_score: contribution },
					);
				},
			}
		}
	}

	let mut out: Vec<Candidate> =
		first_seen.iter().filter_map(|id| scored.remove(id.as_str())).collect();

	// Stable sort over first-seen order settles ties deterministically.
	out.sort_by(|left, right| cmp_f32_desc(left.fusion_score, right.fusion_score));

	out
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	use faro_domain::chunk::ChunkMetadata;

	fn chunk(id: &str) -> StoredChunk {
		StoredChunk {
			id: id.to_string(),
			text: format!("texto {id}"),
			metadata: ChunkMetadata::default(),
		}
	}

	fn score_map(candidates: &[Candidate]) -> HashMap<String, f32> {
		candidates
			.iter()
			.map(|candidate| (candidate.chunk.id.clone(), candidate.fusion_score))
			.collect()
	}

	#[test]
	fn empty_input_fuses_to_nothing() {
		assert!(reciprocal_rank_fusion(&[], DEFAULT_RRF_K).is_empty());
		assert!(reciprocal_rank_fusion(&[Vec::new(), Vec::new()], DEFAULT_RRF_K).is_empty());
	}

	#[test]
	fn fusion_is_commutative_in_list_order() {
		let lexical = vec![chunk("a"), chunk("b"), chunk("c")];
		let vector = vec![chunk("c"), chunk("d")];

		let forward = score_map(&reciprocal_rank_fusion(
			&[lexical.clone(), vector.clone()],
			DEFAULT_RRF_K,
		));
		let backward = score_map(&reciprocal_rank_fusion(&[vector, lexical], DEFAULT_RRF_K));

		assert_eq!(forward, backward);
	}

	#[test]
	fn dual_presence_scores_strictly_higher_than_single() {
		// "b" sits at rank 1 in both lists; "a" and "c" at rank 0 in one.
		let fused = reciprocal_rank_fusion(
			&[vec![chunk("a"), chunk("b")], vec![chunk("c"), chunk("b")]],
			DEFAULT_RRF_K,
		);
		let scores = score_map(&fused);

		assert!(scores["b"] > scores["a"]);
		assert!(scores["b"] > scores["c"]);
		assert_eq!(fused.first().map(|candidate| candidate.chunk.id.as_str()), Some("b"));
	}

	#[test]
	fn duplicate_ids_within_one_list_count_once() {
		let fused =
			reciprocal_rank_fusion(&[vec![chunk("a"), chunk("a"), chunk("a")]], DEFAULT_RRF_K);

		assert_eq!(fused.len(), 1);

		let single = reciprocal_rank_fusion(&[vec![chunk("a")]], DEFAULT_RRF_K);

		assert_eq!(fused[0].fusion_score, single[0].fusion_score);
	}

	#[test]
	fn ties_keep_first_seen_order() {
		let fused = reciprocal_rank_fusion(
			&[vec![chunk("x")], vec![chunk("y")]],
			DEFAULT_RRF_K,
		);

		assert_eq!(fused[0].chunk.id, "x");
		assert_eq!(fused[1].chunk.id, "y");
		assert_eq!(fused[0].fusion_score, fused[1].fusion_score);
	}
}
