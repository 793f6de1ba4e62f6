use crate::models::Classification;

/// Two lines read positive, one negative; any other count is invalid
pub fn classify(line_count: usize) -> Classification {
    match line_count {
        2 => Classification::Positive,
        1 => Classification::Negative,
        _ => Classification::Invalid,
    }
}
