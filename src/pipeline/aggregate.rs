use crate::error::PredictError;

/// Index of the largest score; ties go to the lowest index. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Element-wise arithmetic mean of per-frame probability vectors, summed in
/// the order given.
pub fn mean_probabilities(
    per_frame: &[Vec<f32>],
    num_classes: usize,
) -> Result<Vec<f32>, PredictError> {
    if per_frame.is_empty() {
        return Err(PredictError::EmptyInput);
    }

    let mut sum = vec![0.0_f32; num_classes];
    for scores in per_frame {
        check_length(scores, num_classes)?;
        for (acc, value) in sum.iter_mut().zip(scores) {
            *acc += value;
        }
    }

    let count = per_frame.len() as f32;
    for value in &mut sum {
        *value /= count;
    }
    Ok(sum)
}

pub fn check_length(scores: &[f32], num_classes: usize) -> Result<(), PredictError> {
    if scores.len() != num_classes {
        return Err(PredictError::VocabularyMismatch {
            expected: num_classes,
            actual: scores.len(),
        });
    }
    Ok(())
}
