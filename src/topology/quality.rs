use super::types::LinkQuality;

/// Map a mesh quality bar count (0-5) to a tier. Missing data counts as fair.
pub fn classify(bars: Option<u8>) -> LinkQuality {
	match bars {
		None => LinkQuality::Fair,
		Some(b) if b >= 4 => LinkQuality::Excellent,
		Some(3) => LinkQuality::Good,
		Some(2) => LinkQuality::Fair,
		Some(_) => LinkQuality::Poor,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn thresholds() {
		assert_eq!(classify(Some(5)), LinkQuality::Excellent);
		assert_eq!(classify(Some(4)), LinkQuality::Excellent);
		assert_eq!(classify(Some(3)), LinkQuality::Good);
		assert_eq!(classify(Some(2)), LinkQuality::Fair);
		assert_eq!(classify(Some(1)), LinkQuality::Poor);
		assert_eq!(classify(Some(0)), LinkQuality::Poor);
	}

	#[test]
	fn missing_bars_are_fair() {
		assert_eq!(classify(None), classify(Some(2)));
	}

	#[test]
	fn never_better_with_fewer_bars() {
		for low in 0..=5u8 {
			for high in low..=5u8 {
				assert!(classify(Some(low)) <= classify(Some(high)), "{low} vs {high}");
			}
		}
	}
}
