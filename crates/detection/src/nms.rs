//! Greedy non-maximum suppression

use crate::types::BoundingBox;

/// A scored candidate before suppression
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub bbox: BoundingBox,
    pub score: f32,
    pub payload: T,
}

/// Keep the highest-scoring candidates, dropping any box whose IoU with an
/// already kept box exceeds `iou_threshold`. At most `max_keep` survive.
pub fn non_max_suppression<T>(
    mut candidates: Vec<Candidate<T>>,
    iou_threshold: f32,
    max_keep: usize,
) -> Vec<Candidate<T>> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate<T>> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_keep {
            break;
        }
        if kept.iter().all(|k| k.bbox.iou(&candidate.bbox) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cand(x: f32, score: f32) -> Candidate<()> {
        Candidate {
            bbox: BoundingBox::new(x, 0.0, 10.0, 10.0),
            score,
            payload: (),
        }
    }

    #[test]
    fn test_overlapping_boxes_collapse() {
        let candidates = vec![cand(0.0, 0.6), cand(1.0, 0.9), cand(50.0, 0.7)];
        let kept = non_max_suppression(candidates, 0.3, 10);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.7);
    }

    #[test]
    fn test_max_keep() {
        let candidates = vec![cand(0.0, 0.5), cand(100.0, 0.6), cand(200.0, 0.7)];
        let kept = non_max_suppression(candidates, 0.3, 2);
        assert_eq!(kept.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_kept_boxes_never_overlap_past_threshold(
            xs in proptest::collection::vec(0.0f32..100.0, 0..20)
        ) {
            let candidates = xs.iter().enumerate().map(|(i, &x)| cand(x, i as f32)).collect();
            let kept = non_max_suppression(candidates, 0.3, 100);
            for (i, a) in kept.iter().enumerate() {
                for b in kept.iter().skip(i + 1) {
                    prop_assert!(a.bbox.iou(&b.bbox) <= 0.3);
                }
            }
        }
    }
}
