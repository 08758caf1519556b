/// Checking whether every configured room reported in the current cycle
use log::info;

use crate::models::{Sample, SensorRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    pub complete: bool,
    /// Expected rooms present in the sample, alphabetical
    pub captured: Vec<String>,
    pub expected: usize,
}

/// Compare the rooms in `sample` against the rooms of `registry`
///
/// Complete only when both sets are equal and the sample holds no extra keys.
pub fn check(registry: &SensorRegistry, sample: &Sample) -> Completeness {
    let expected = registry.rooms();
    let reported = sample.rooms();

    let captured: Vec<String> = reported
        .intersection(&expected)
        .map(|room| room.to_string())
        .collect();
    let complete = reported == expected && sample.len() == registry.len();

    info!(
        "Got {}/{} rooms: {:?}",
        captured.len(),
        expected.len(),
        captured
    );

    Completeness {
        complete,
        captured,
        expected: expected.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;

    fn registry() -> SensorRegistry {
        SensorRegistry::new([("a1", "A"), ("b2", "B"), ("c3", "C")]).unwrap()
    }

    fn sample(rooms: &[&str]) -> Sample {
        let mut sample = Sample::new();
        for room in rooms {
            sample.record(room, Reading { temperature: 20.0, humidity: Some(50.0) });
        }
        sample
    }

    #[test]
    fn all_rooms_reported_is_complete() {
        let result = check(&registry(), &sample(&["C", "A", "B"]));
        assert!(result.complete);
        assert_eq!(result.captured, vec!["A", "B", "C"]);
        assert_eq!(result.expected, 3);
    }

    #[test]
    fn subset_is_incomplete_and_counted() {
        for rooms in [&[][..], &["A"][..], &["A", "C"][..]] {
            let result = check(&registry(), &sample(rooms));
            assert!(!result.complete);
            assert_eq!(result.captured.len(), rooms.len());
        }
    }

    #[test]
    fn unexpected_room_is_not_complete() {
        let result = check(&registry(), &sample(&["A", "B", "C", "D"]));
        assert!(!result.complete);
        assert_eq!(result.captured.len(), 3);
    }

    #[test]
    fn empty_registry_with_empty_sample_is_complete() {
        let result = check(&SensorRegistry::default(), &Sample::new());
        assert!(result.complete);
        assert_eq!(result.expected, 0);
    }
}
