//! Frame and audio evaluation rules

use audio_level::AudioEvent;
use detection::{DetectedObject, Face};
use tracing::debug;

use crate::config::EvaluatorConfig;
use crate::types::{Finding, ViolationType};

/// Detector outputs for one poll
#[derive(Debug, Clone, Copy)]
pub struct FrameObservation<'a> {
    /// Width of the evaluated frame in pixels
    pub frame_width: u32,
    pub faces: &'a [Face],
    /// `None` when object detection failed for this tick
    pub objects: Option<&'a [DetectedObject]>,
}

/// Classify one poll's detector outputs.
///
/// Face rules are evaluated in order and stop at the first hit: face count,
/// then distance, then gaze. Object rules are independent of face rules.
pub fn evaluate_frame(
    observation: &FrameObservation<'_>,
    config: &EvaluatorConfig,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(finding) = evaluate_faces(observation.faces, observation.frame_width, config) {
        findings.push(finding);
    }

    if let Some(objects) = observation.objects {
        if let Some(finding) = evaluate_objects(objects, config) {
            findings.push(finding);
        }
    }

    if !findings.is_empty() {
        debug!(
            "Frame findings: {:?}",
            findings.iter().map(|f| f.violation.as_str()).collect::<Vec<_>>()
        );
    }
    findings
}

fn evaluate_faces(faces: &[Face], frame_width: u32, config: &EvaluatorConfig) -> Option<Finding> {
    let face = match faces {
        [] => return Some(Finding::standard(ViolationType::NoFace)),
        [face] => face,
        _ => return Some(Finding::standard(ViolationType::MultipleFaces)),
    };

    let face_width = face.bbox.width;
    if face_width < frame_width as f32 * config.min_face_width_ratio {
        return Some(Finding::standard(ViolationType::FaceTooFar));
    }

    let nose = face.nose()?;
    let offset = (nose.x - face.bbox.center_x()).abs();
    if offset > face_width * config.looking_away_offset_ratio {
        return Some(Finding::standard(ViolationType::LookingAway));
    }

    None
}

fn evaluate_objects(objects: &[DetectedObject], config: &EvaluatorConfig) -> Option<Finding> {
    let mut labels: Vec<&str> = objects
        .iter()
        .filter(|o| {
            o.confidence >= config.forbidden_min_confidence && config.is_forbidden(&o.label)
        })
        .map(|o| o.label.as_str())
        .collect();

    if labels.is_empty() {
        return None;
    }
    labels.sort_unstable();
    labels.dedup();

    Some(Finding::new(
        ViolationType::ForbiddenObject,
        format!("Suspicious item detected: {}", labels.join(", ")),
    ))
}

/// Map an audio monitor event to its violation
pub fn evaluate_audio(event: &AudioEvent) -> Finding {
    match event {
        AudioEvent::LoudTalking { .. } => Finding::standard(ViolationType::LoudAudio),
        AudioEvent::Shouting { .. } => Finding::standard(ViolationType::Shouting),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detection::{BoundingBox, Point};

    const FRAME_WIDTH: u32 = 640;

    /// Face centered at `cx` with nose at `nose_x`
    fn face(cx: f32, width: f32, nose_x: f32) -> Face {
        Face::new(BoundingBox::new(cx - width / 2.0, 100.0, width, width), 0.95)
            .with_landmarks(vec![
                Point::new(cx - 20.0, 120.0),
                Point::new(cx + 20.0, 120.0),
                Point::new(nose_x, 150.0),
            ])
    }

    fn object(label: &str, confidence: f32) -> DetectedObject {
        DetectedObject {
            label: label.to_string(),
            confidence,
            bbox: BoundingBox::new(0.0, 0.0, 50.0, 50.0),
        }
    }

    fn kinds(faces: &[Face], objects: Option<&[DetectedObject]>) -> Vec<ViolationType> {
        let observation = FrameObservation {
            frame_width: FRAME_WIDTH,
            faces,
            objects,
        };
        evaluate_frame(&observation, &EvaluatorConfig::default())
            .into_iter()
            .map(|f| f.violation)
            .collect()
    }

    #[test]
    fn test_centered_face_is_clean() {
        assert!(kinds(&[face(320.0, 200.0, 320.0)], Some(&[])).is_empty());
    }

    #[test]
    fn test_no_face() {
        assert_eq!(kinds(&[], None), vec![ViolationType::NoFace]);
    }

    #[test]
    fn test_multiple_faces_short_circuits() {
        // Both faces are also too small and looking away
        let faces = [face(100.0, 30.0, 140.0), face(400.0, 30.0, 440.0)];
        assert_eq!(kinds(&faces, None), vec![ViolationType::MultipleFaces]);
    }

    #[test]
    fn test_face_too_far() {
        // 0.12 * 640 = 76.8
        assert_eq!(kinds(&[face(320.0, 70.0, 320.0)], None), vec![ViolationType::FaceTooFar]);
        assert!(kinds(&[face(320.0, 80.0, 320.0)], None).is_empty());
    }

    #[test]
    fn test_looking_away() {
        // 0.18 * 200 = 36
        assert_eq!(kinds(&[face(320.0, 200.0, 360.0)], None), vec![ViolationType::LookingAway]);
        assert!(kinds(&[face(320.0, 200.0, 350.0)], None).is_empty());
    }

    #[test]
    fn test_no_landmarks_skips_gaze() {
        let face = Face::new(BoundingBox::new(220.0, 100.0, 200.0, 200.0), 0.9);
        assert!(kinds(&[face], None).is_empty());
    }

    #[test]
    fn test_forbidden_object_threshold() {
        let faces = [face(320.0, 200.0, 320.0)];
        assert!(kinds(&faces, Some(&[object("cell phone", 0.45)])).is_empty());
        assert_eq!(
            kinds(&faces, Some(&[object("cell phone", 0.5)])),
            vec![ViolationType::ForbiddenObject]
        );
        assert!(kinds(&faces, Some(&[object("cup", 0.99)])).is_empty());
    }

    #[test]
    fn test_desk_peripherals_forbidden() {
        let faces = [face(320.0, 200.0, 320.0)];
        let objects = [object("keyboard", 0.7), object("mouse", 0.6)];
        let observation = FrameObservation {
            frame_width: FRAME_WIDTH,
            faces: &faces,
            objects: Some(&objects),
        };
        let findings = evaluate_frame(&observation, &EvaluatorConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Suspicious item detected: keyboard, mouse");
    }

    #[test]
    fn test_object_rules_independent_of_face_rules() {
        let objects = [object("book", 0.9), object("laptop", 0.8)];
        let observation = FrameObservation {
            frame_width: FRAME_WIDTH,
            faces: &[],
            objects: Some(&objects),
        };
        let findings = evaluate_frame(&observation, &EvaluatorConfig::default());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].violation, ViolationType::NoFace);
        assert_eq!(findings[1].message, "Suspicious item detected: book, laptop");
    }

    #[test]
    fn test_audio_mapping() {
        assert_eq!(
            evaluate_audio(&AudioEvent::Shouting { level_db: -3.0 }).violation,
            ViolationType::Shouting
        );
        assert_eq!(
            evaluate_audio(&AudioEvent::LoudTalking { level_db: -15.0 }).violation,
            ViolationType::LoudAudio
        );
    }
}
