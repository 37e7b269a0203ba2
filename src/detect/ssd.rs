//! Decoding of SSD detection output.
//!
//! The output tensor is `[1, 1, N, 7]`; each row is
//! `[image_id, label, confidence, x1, y1, x2, y2]` with corners relative to
//! the input image. Rows with a negative `image_id` are padding.

use anyhow::{anyhow, Result};

use super::result::{BoundingBox, Detection};

pub const SSD_ROW_LEN: usize = 7;

/// Decode raw SSD rows into detections in frame pixel coordinates.
///
/// Corners are scaled by the original frame size and truncated toward zero.
/// Malformed rows (non-finite values, negative labels) are skipped.
pub fn decode_ssd_output(values: &[f32], frame_width: u32, frame_height: u32) -> Result<Vec<Detection>> {
    if values.len() % SSD_ROW_LEN != 0 {
        return Err(anyhow!(
            "ssd output length {} is not a multiple of {}",
            values.len(),
            SSD_ROW_LEN
        ));
    }

    let w = frame_width as f32;
    let h = frame_height as f32;
    let mut detections = Vec::new();
    for row in values.chunks_exact(SSD_ROW_LEN) {
        let [image_id, label, confidence, x1, y1, x2, y2] = [
            row[0], row[1], row[2], row[3], row[4], row[5], row[6],
        ];
        if image_id < 0.0 {
            continue;
        }
        if !row.iter().all(|v| v.is_finite()) || label < 0.0 {
            log::debug!("skipping malformed ssd row {:?}", row);
            continue;
        }

        let bbox = BoundingBox::from_corners(
            (x1 * w) as i32,
            (y1 * h) as i32,
            (x2 * w) as i32,
            (y2 * h) as i32,
        );
        detections.push(Detection::new(bbox, label as u32, confidence.clamp(0.0, 1.0))?);
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_relative_corners_to_frame() -> Result<()> {
        let rows = [0.0, 15.0, 0.92, 0.25, 0.5, 0.5, 0.75];
        let detections = decode_ssd_output(&rows, 640, 480)?;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox(), BoundingBox::new(160, 240, 160, 120));
        assert_eq!(detections[0].class_id(), 15);
        Ok(())
    }

    #[test]
    fn truncates_toward_zero() -> Result<()> {
        let rows = [0.0, 15.0, 0.9, 0.1001, 0.0, 0.2999, 1.0];
        let detections = decode_ssd_output(&rows, 100, 10)?;
        assert_eq!(detections[0].bbox(), BoundingBox::new(10, 0, 19, 10));
        Ok(())
    }

    #[test]
    fn skips_padding_and_garbage() -> Result<()> {
        let rows = [
            -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, f32::NAN, 0.9, 0.1, 0.1, 0.2, 0.2, //
            0.0, 7.0, 1.4, 0.1, 0.1, 0.2, 0.2,
        ];
        let detections = decode_ssd_output(&rows, 100, 100)?;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id(), 7);
        assert_eq!(detections[0].confidence(), 1.0);
        Ok(())
    }

    #[test]
    fn rejects_ragged_output() {
        assert!(decode_ssd_output(&[0.0; 8], 10, 10).is_err());
    }
}
