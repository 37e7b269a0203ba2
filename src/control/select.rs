use serde::Serialize;

use crate::detect::{Detection, PERSON_CLASS_ID};

/// Which detections count as the target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetCriteria {
    pub class_id: u32,
    /// Exclusive lower bound: a detection at exactly this confidence is rejected.
    pub min_confidence: f32,
}

impl Default for TargetCriteria {
    fn default() -> Self {
        Self {
            class_id: PERSON_CLASS_ID,
            min_confidence: 0.7,
        }
    }
}

impl TargetCriteria {
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.class_id() == self.class_id && detection.confidence() > self.min_confidence
    }

    /// Highest-confidence qualifying detection; the earliest one wins ties.
    ///
    /// `None` is the normal "nobody in view" outcome.
    pub fn select<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        detections
            .iter()
            .filter(|d| self.accepts(d))
            .fold(None, |best: Option<&Detection>, d| match best {
                Some(b) if b.confidence() >= d.confidence() => Some(b),
                _ => Some(d),
            })
    }
}

/// Free-function form of [`TargetCriteria::select`].
pub fn select_target(
    detections: &[Detection],
    class_id: u32,
    min_confidence: f32,
) -> Option<&Detection> {
    TargetCriteria {
        class_id,
        min_confidence,
    }
    .select(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use proptest::prelude::*;

    fn det(x: i32, class_id: u32, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(x, 0, 10, 10), class_id, confidence).unwrap()
    }

    #[test]
    fn picks_most_confident_person() {
        let detections = vec![det(0, 15, 0.75), det(1, 15, 0.95), det(2, 15, 0.8)];
        let best = select_target(&detections, 15, 0.7).unwrap();
        assert_eq!(best.bbox().x, 1);
    }

    #[test]
    fn threshold_is_exclusive() {
        let detections = vec![det(0, 15, 0.7)];
        assert!(select_target(&detections, 15, 0.7).is_none());
    }

    #[test]
    fn other_classes_are_ignored() {
        let detections = vec![det(0, 7, 0.99), det(1, 12, 0.98)];
        assert!(select_target(&detections, 15, 0.7).is_none());
    }

    #[test]
    fn ties_go_to_first_seen() {
        let detections = vec![det(0, 15, 0.6), det(1, 15, 0.9), det(2, 15, 0.9)];
        assert_eq!(select_target(&detections, 15, 0.7).unwrap().bbox().x, 1);
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(TargetCriteria::default().select(&[]).is_none());
    }

    proptest! {
        #[test]
        fn selection_is_the_maximum_qualifying_entry(
            entries in prop::collection::vec((0u32..4, 0.0f32..=1.0), 0..24),
            min_confidence in 0.0f32..1.0,
        ) {
            let detections: Vec<Detection> = entries
                .iter()
                .enumerate()
                .map(|(i, (class_id, conf))| det(i as i32, *class_id, *conf))
                .collect();
            let selected = select_target(&detections, 2, min_confidence);
            let qualifying: Vec<&Detection> = detections
                .iter()
                .filter(|d| d.class_id() == 2 && d.confidence() > min_confidence)
                .collect();

            match selected {
                None => prop_assert!(qualifying.is_empty()),
                Some(best) => {
                    prop_assert!(qualifying.iter().all(|d| d.confidence() <= best.confidence()));
                    let first_max = qualifying
                        .iter()
                        .find(|d| d.confidence() == best.confidence())
                        .unwrap();
                    prop_assert_eq!(first_max.bbox().x, best.bbox().x);
                }
            }
        }

        #[test]
        fn entries_at_threshold_never_qualify(conf in 0.0f32..=1.0) {
            let detections = vec![det(0, 15, conf)];
            prop_assert!(select_target(&detections, 15, conf).is_none());
        }
    }
}
