//! Fragment-level suppression of disallowed markers.
//!
//! Upstream fragments can split a marker across chunk boundaries ("<" then
//! "|eot_id|>"), so the filter holds back any trailing text that could still
//! grow into a marker and only forwards once the ambiguity is resolved.

/// A stateful filter over a stream of text fragments.
///
/// `push` forwards clean text, suppresses any text in which a full marker
/// materialized, and holds back a trailing partial match. `flush` releases
/// whatever is still held once the stream ends.
pub struct FragmentFilter {
    markers: Vec<String>,
    held: String,
}

impl FragmentFilter {
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().filter(|m| !m.is_empty()).collect(),
            held: String::new(),
        }
    }

    /// Feed one fragment; returns the text safe to forward, if any.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        let mut combined = std::mem::take(&mut self.held);
        combined.push_str(fragment);

        if self.markers.iter().any(|m| combined.contains(m.as_str())) {
            return None;
        }

        let hold_len = self.longest_partial_marker(&combined);
        let forward_len = combined.len() - hold_len;
        self.held = combined.split_off(forward_len);

        if combined.is_empty() {
            None
        } else {
            Some(combined)
        }
    }

    /// Release any held-back text. Call once the stream has ended; a partial
    /// match that never completed is ordinary output.
    pub fn flush(&mut self) -> Option<String> {
        if self.held.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.held))
        }
    }

    /// Byte length of the longest suffix of `text` that is a proper prefix
    /// of some marker. Full markers were already rejected by `push`.
    fn longest_partial_marker(&self, text: &str) -> usize {
        let mut longest = 0;
        for marker in &self.markers {
            for (len, _) in marker.char_indices().skip(1) {
                if len > longest && text.ends_with(&marker[..len]) {
                    longest = len;
                }
            }
        }
        longest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> FragmentFilter {
        FragmentFilter::new(vec!["<|".into()])
    }

    #[test]
    fn clean_fragments_pass_through_unchanged() {
        let mut f = filter();
        assert_eq!(f.push("안녕").as_deref(), Some("안녕"));
        assert_eq!(f.push("하세요").as_deref(), Some("하세요"));
        assert!(f.flush().is_none());
    }

    #[test]
    fn fragment_containing_marker_is_suppressed_entirely() {
        let mut f = filter();
        assert!(f.push("tail<|eot_id|>").is_none());
    }

    #[test]
    fn marker_split_across_fragments_is_suppressed() {
        let mut f = filter();
        // "<" alone could still become "<|" — held back, nothing forwarded
        assert_eq!(f.push("answer<").as_deref(), Some("answer"));
        // held "<" + "|eot" completes the marker; the whole remainder drops
        assert!(f.push("|eot_id|>").is_none());
        assert!(f.flush().is_none());
    }

    #[test]
    fn partial_match_that_never_completes_is_flushed() {
        let mut f = filter();
        assert_eq!(f.push("2 < 3 and x <").as_deref(), Some("2 < 3 and x "));
        assert_eq!(f.flush().as_deref(), Some("<"));
    }

    #[test]
    fn partial_match_resolved_by_next_fragment() {
        let mut f = filter();
        assert_eq!(f.push("a <").as_deref(), Some("a "));
        // "<b" is not a marker, so the held "<" is released with the rest
        assert_eq!(f.push("b").as_deref(), Some("<b"));
    }

    #[test]
    fn multiple_markers() {
        let mut f = FragmentFilter::new(vec!["<|".into(), "(reference)".into()]);
        assert!(f.push("see (reference) above").is_none());
        assert_eq!(f.push("fine (refer").as_deref(), Some("fine "));
        assert_eq!(f.push("ral ok)").as_deref(), Some("(referral ok)"));
    }

    #[test]
    fn empty_markers_filter_nothing() {
        let mut f = FragmentFilter::new(vec![String::new()]);
        assert_eq!(f.push("anything <| goes").as_deref(), Some("anything <| goes"));
    }

    #[test]
    fn multibyte_text_around_markers() {
        let mut f = filter();
        assert_eq!(f.push("날씨는 <").as_deref(), Some("날씨는 "));
        assert!(f.push("|end_of_text|>").is_none());
    }
}
