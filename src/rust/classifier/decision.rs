use log::warn;

/// Index of the first maximum in `scores`.
///
/// Ties resolve to the lowest index. NaN ranks above every number, so the
/// first NaN wins, as in numpy. An empty vector yields 0.
pub fn argmax(scores: &[f32]) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            return i;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i).unwrap_or(0)
}

/// Reduces a score vector to a class index in `[0, num_classes)`.
///
/// An index outside that range is replaced by 0.
pub fn decide(scores: &[f32], num_classes: usize) -> usize {
    let index = argmax(scores);
    if index >= num_classes {
        warn!(
            "Predicted index {} outside [0, {}), falling back to class 0",
            index, num_classes
        );
        return 0;
    }
    index
}
