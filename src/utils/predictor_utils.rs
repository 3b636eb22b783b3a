//! TIFF predictor reversal
//!
//! Predictors are applied row by row after decompression. Horizontal
//! differencing works on integer samples, the floating point predictor on
//! byte planes of IEEE samples.

/// Undoes horizontal differencing on one row of integer samples
///
/// # Arguments
/// * `row` - Sample words of one row, modified in place
/// * `samples_per_pixel` - Stride between samples of the same band
/// * `bits` - Sample width in bits; sums wrap at this width
pub fn apply_horizontal_predictor(row: &mut [u64], samples_per_pixel: usize, bits: u32) {
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    for i in samples_per_pixel..row.len() {
        row[i] = row[i].wrapping_add(row[i - samples_per_pixel]) & mask;
    }
}

/// Undoes the floating point predictor (Predictor = 3) on one row
///
/// The row holds `samples` values of `bytes_per_sample` bytes each, stored
/// as differenced byte planes, most significant plane first.
///
/// # Returns
/// The row with each sample in big-endian byte order
pub fn undo_floating_point_predictor(
    row: &mut [u8],
    samples_per_pixel: usize,
    samples: usize,
    bytes_per_sample: usize,
) -> Vec<u8> {
    for i in samples_per_pixel..row.len() {
        row[i] = row[i].wrapping_add(row[i - samples_per_pixel]);
    }

    let mut output = vec![0u8; samples * bytes_per_sample];
    for sample in 0..samples {
        for byte in 0..bytes_per_sample {
            output[sample * bytes_per_sample + byte] = row[byte * samples + sample];
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_predictor_wraps() {
        let mut row = vec![250, 10, 0, 1];
        apply_horizontal_predictor(&mut row, 1, 8);
        assert_eq!(row, vec![250, 4, 4, 5]);
    }

    #[test]
    fn test_horizontal_predictor_stride() {
        // two interleaved bands
        let mut row = vec![100, 1, 5, 1, 5, 1];
        apply_horizontal_predictor(&mut row, 2, 16);
        assert_eq!(row, vec![100, 1, 105, 2, 110, 3]);
    }

    #[test]
    fn test_floating_point_predictor() {
        let values = [1.5f32, -2.25, 15.0];
        let samples = values.len();

        // build the predicted row the way a writer would
        let mut planes = vec![0u8; samples * 4];
        for (s, v) in values.iter().enumerate() {
            for (b, byte) in v.to_be_bytes().iter().enumerate() {
                planes[b * samples + s] = *byte;
            }
        }
        for i in (1..planes.len()).rev() {
            planes[i] = planes[i].wrapping_sub(planes[i - 1]);
        }

        let restored = undo_floating_point_predictor(&mut planes, 1, samples, 4);
        let decoded: Vec<f32> = restored
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(decoded, values.to_vec());
    }
}
