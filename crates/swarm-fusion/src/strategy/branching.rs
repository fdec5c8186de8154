//! Branching strategy — no fusion, diversity preserved.

use crate::agent::Response;

/// Return every response text unmodified, preserving agent order.
///
/// Used when the caller wants the full spread of answers rather than a
/// single fused decision. Any N ≥ 0 is valid, including zero.
pub fn branch(responses: &[Response]) -> Vec<String> {
    responses.iter().map(|r| r.text.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_preserves_order_and_content() {
        let responses = vec![
            Response::new("a", "first"),
            Response::new("b", "second"),
            Response::new("c", "third"),
        ];
        assert_eq!(branch(&responses), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_branch_on_empty_input() {
        assert!(branch(&[]).is_empty());
    }

    #[test]
    fn test_branch_does_not_modify_text() {
        let responses = vec![Response::new("a", "  verbatim, whitespace kept  ")];
        assert_eq!(branch(&responses), vec!["  verbatim, whitespace kept  "]);
    }
}
