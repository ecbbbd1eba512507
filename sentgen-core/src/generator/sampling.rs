use rand::Rng;

/// Picks an index with probability proportional to its weight.
///
/// Sums all weights, draws a uniform integer in `[0, total)` and walks the
/// cumulative sum until the draw falls inside a bucket.
///
/// This performs:
/// - an O(n) scan to compute the total
/// - an O(n) cumulative subtraction to select the bucket
///
/// Returns `None` if there are no weights or they sum to zero.
pub(crate) fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[u64]) -> Option<usize> {
	let total: u64 = weights.iter().sum();
	if total == 0 {
		return None;
	}

	let mut r = rng.random_range(0..total);
	for (index, weight) in weights.iter().enumerate() {
		if r < *weight {
			return Some(index);
		}
		r -= weight;
	}

	// Unreachable while `r < total`, kept so a bad total cannot panic.
	weights.iter().rposition(|w| *w > 0)
}
